//! 条码引擎绑定
//!
//! 使用页面中加载的 ZXing 浏览器版（`window.ZXing`）。引擎自行打开指定
//! 摄像头并对每一帧回调 `(result, error)`；结果交给 `ScanSession` 判定。

use super::media;
use crate::capture::{DeviceOwner, EpochTicket, ScannerError};
use std::cell::RefCell;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;
use web_sys::HtmlVideoElement;

#[wasm_bindgen(js_namespace = ZXing)]
extern "C" {
    type BrowserMultiFormatReader;

    #[wasm_bindgen(constructor, catch)]
    fn new() -> Result<BrowserMultiFormatReader, JsValue>;

    #[wasm_bindgen(method, catch, js_name = decodeFromVideoDevice)]
    fn decode_from_video_device(
        this: &BrowserMultiFormatReader,
        device_id: Option<String>,
        video: &HtmlVideoElement,
        callback: &js_sys::Function,
    ) -> Result<js_sys::Promise, JsValue>;

    #[wasm_bindgen(method)]
    fn reset(this: &BrowserMultiFormatReader);
}

#[wasm_bindgen]
extern "C" {
    type DecodeResult;

    #[wasm_bindgen(method, js_name = getText)]
    fn get_text(this: &DecodeResult) -> String;
}

/// 引擎对一帧的回调
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Decoded(String),
    /// 异常名（如 `NotFoundException`）及消息
    Error { name: String, message: String },
}

type FrameCallback = Closure<dyn FnMut(JsValue, JsValue)>;

/// 运行中的引擎及其回调，记录启动它的对话框票据
struct ScannerDriver {
    ticket: EpochTicket,
    reader: BrowserMultiFormatReader,
    video: HtmlVideoElement,
    _callback: FrameCallback,
}

impl Drop for ScannerDriver {
    fn drop(&mut self) {
        self.reader.reset();
        media::release(DeviceOwner::Scanner);
        if let Some(stream) = media::attached_stream(&self.video) {
            media::discard(&stream);
        }
        media::detach_preview(&self.video);
        log::debug!("[Barcode] engine stopped");
    }
}

thread_local! {
    static DRIVER: RefCell<Option<ScannerDriver>> = const { RefCell::new(None) };
}

fn string_prop(value: &JsValue, key: &str) -> String {
    js_sys::Reflect::get(value, &JsValue::from_str(key))
        .ok()
        .and_then(|v| v.as_string())
        .unwrap_or_default()
}

fn frame_of(result: &JsValue, error: &JsValue) -> Option<Frame> {
    if !result.is_null() && !result.is_undefined() {
        let result: &DecodeResult = result.unchecked_ref();
        return Some(Frame::Decoded(result.get_text()));
    }
    if !error.is_null() && !error.is_undefined() {
        return Some(Frame::Error {
            name: string_prop(error, "name"),
            message: string_prop(error, "message"),
        });
    }
    None
}

/// 在指定设备上开始连续解码
///
/// 返回时摄像头已经打开（引擎的 Promise 已完成）。已有的引擎会先被停止。
/// 等待期间引擎若已被更新的票据替换，失败时不会停掉新的引擎。
pub async fn start(
    ticket: EpochTicket,
    device_id: Option<String>,
    video: &HtmlVideoElement,
    on_frame: impl Fn(Frame) + 'static,
) -> Result<(), ScannerError> {
    stop();

    let reader = BrowserMultiFormatReader::new()
        .map_err(|e| ScannerError::Engine(format!("ZXing no disponible: {:?}", e)))?;
    let callback: FrameCallback = Closure::new(move |result: JsValue, error: JsValue| {
        if let Some(frame) = frame_of(&result, &error) {
            on_frame(frame);
        }
    });

    let promise = reader
        .decode_from_video_device(device_id, video, callback.as_ref().unchecked_ref())
        .map_err(|e| ScannerError::Camera(media::camera_error(&e)))?;

    // 先登记再等待，这样在等待期间 stop() 也能释放引擎
    DRIVER.with(|driver| {
        *driver.borrow_mut() = Some(ScannerDriver {
            ticket,
            reader,
            video: video.clone(),
            _callback: callback,
        });
    });

    if let Err(e) = JsFuture::from(promise).await {
        stop_owned(ticket);
        return Err(ScannerError::Camera(media::camera_error(&e)));
    }

    // 预览上的流可能已经属于新的引擎
    if owns(ticket) {
        if let Some(stream) = media::attached_stream(video) {
            media::claim(DeviceOwner::Scanner, &stream);
        }
    }
    Ok(())
}

fn owns(ticket: EpochTicket) -> bool {
    DRIVER.with(|driver| {
        driver
            .borrow()
            .as_ref()
            .is_some_and(|d| d.ticket == ticket)
    })
}

/// 停止引擎并关闭摄像头；可重复调用
pub fn stop() {
    // 先取出再 drop，reset() 可能同步触发回调
    let previous = DRIVER.with(|driver| driver.borrow_mut().take());
    drop(previous);
}

/// 只在引擎仍由 `ticket` 启动时停止它
pub fn stop_owned(ticket: EpochTicket) -> bool {
    let previous = DRIVER.with(|driver| {
        let mut driver = driver.borrow_mut();
        if driver.as_ref().is_some_and(|d| d.ticket == ticket) {
            driver.take()
        } else {
            None
        }
    });
    let stopped = previous.is_some();
    drop(previous);
    stopped
}
