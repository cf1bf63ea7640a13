//! Rust 结构与 `JsValue` 之间的转换
//!
//! 浏览器 API 的字典参数（如 getUserMedia 的视频约束）用 serde 结构描述，
//! 再经 `serde-wasm-bindgen` 转成普通 JS 对象。

use js_sys::wasm_bindgen::JsValue;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Serde WASM Bindgen Error: {0}")]
    SerdeWasmBindgen(#[from] serde_wasm_bindgen::Error),
}

/// Serialize a Rust data structure into a plain JS object
pub fn to_value<T: Serialize>(value: &T) -> Result<JsValue, Error> {
    // map 输出为普通对象而不是 Map，浏览器的字典参数只认对象
    let serializer = serde_wasm_bindgen::Serializer::new()
        .serialize_maps_as_objects(true)
        .serialize_missing_as_null(false);
    value.serialize(&serializer).map_err(Error::from)
}
