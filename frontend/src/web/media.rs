//! 摄像头的浏览器部分
//!
//! getUserMedia / enumerateDevices 封装、预览挂载，以及从视频帧裁出
//! 居中正方形并编码为 JPEG 文件。视频流统一登记在 `DEVICE` 中，
//! 拍照与扫码不会同时占用摄像头。

use crate::capture::camera::{IDEAL_HEIGHT, IDEAL_WIDTH, check_environment};
use crate::capture::{CameraError, CapturePlan, DeviceOwner, DeviceSlot, FacingMode, TrackSet, VideoInput};
use crate::config::CONFIG;
use crate::media_url::resolve_media_url;
use crate::serde_helper;
use serde::Serialize;
use std::cell::RefCell;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;
use web_sys::{
    Blob, CanvasRenderingContext2d, File, FilePropertyBag, HtmlCanvasElement, HtmlVideoElement,
    MediaDeviceInfo, MediaDeviceKind, MediaDevices, MediaStream, MediaStreamConstraints,
    MediaStreamTrack, MediaStreamTrackState,
};

/// `HTMLMediaElement.HAVE_CURRENT_DATA`
const HAVE_CURRENT_DATA: u16 = 2;

/// 一个 `MediaStream` 的轨道集合
#[derive(Clone)]
pub struct StreamHandle(MediaStream);

impl StreamHandle {
    fn tracks(&self) -> Vec<MediaStreamTrack> {
        self.0
            .get_tracks()
            .iter()
            .filter_map(|track| track.dyn_into::<MediaStreamTrack>().ok())
            .collect()
    }
}

impl TrackSet for StreamHandle {
    fn stop_all(&self) {
        for track in self.tracks() {
            track.stop();
        }
    }

    fn live_tracks(&self) -> usize {
        self.tracks()
            .into_iter()
            .filter(|track| track.ready_state() == MediaStreamTrackState::Live)
            .count()
    }
}

thread_local! {
    static DEVICE: RefCell<DeviceSlot<StreamHandle>> = RefCell::new(DeviceSlot::new());
}

/// 登记新打开的流；其他持有者的流会被停止
pub fn claim(owner: DeviceOwner, stream: &MediaStream) {
    let previous = DEVICE.with(|slot| slot.borrow_mut().install(owner, StreamHandle(stream.clone())));
    if let Some(previous) = previous {
        log::info!("[Media] {:?} took the camera from {:?}", owner, previous);
    }
}

/// 释放指定持有者的流；可重复调用
pub fn release(owner: DeviceOwner) -> bool {
    DEVICE.with(|slot| slot.borrow_mut().release(owner))
}

/// 立即停止一个未登记的流（对话框已关闭后才到达的流）
pub fn discard(stream: &MediaStream) {
    StreamHandle(stream.clone()).stop_all();
    log::debug!("[Media] late stream discarded");
}

#[derive(Serialize)]
struct Ideal<T> {
    ideal: T,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct VideoConstraints {
    facing_mode: Ideal<&'static str>,
    width: Ideal<u32>,
    height: Ideal<u32>,
}

/// 把 getUserMedia 抛出的异常分类
pub fn camera_error(err: &JsValue) -> CameraError {
    if let Some(dom) = err.dyn_ref::<web_sys::DomException>() {
        return CameraError::from_dom_name(&dom.name(), &dom.message());
    }
    if let Some(error) = err.dyn_ref::<js_sys::Error>() {
        return CameraError::from_dom_name(&String::from(error.name()), &String::from(error.message()));
    }
    CameraError::Other(format!("{:?}", err))
}

fn media_devices() -> Result<MediaDevices, CameraError> {
    let window = web_sys::window().ok_or(CameraError::Unsupported)?;
    let navigator = window.navigator();
    // 非安全上下文中 navigator.mediaDevices 直接不存在
    let has_media = js_sys::Reflect::get(&navigator, &JsValue::from_str("mediaDevices"))
        .map(|value| !value.is_undefined() && !value.is_null())
        .unwrap_or(false);
    check_environment(window.is_secure_context(), has_media)?;
    navigator.media_devices().map_err(|e| camera_error(&e))
}

/// 按朝向打开摄像头（理想 1280×720），不含音频
pub async fn open_camera(facing: FacingMode) -> Result<MediaStream, CameraError> {
    let devices = media_devices()?;

    let video = serde_helper::to_value(&VideoConstraints {
        facing_mode: Ideal {
            ideal: facing.as_str(),
        },
        width: Ideal { ideal: IDEAL_WIDTH },
        height: Ideal { ideal: IDEAL_HEIGHT },
    })
    .map_err(|e| CameraError::Other(e.to_string()))?;

    let constraints = MediaStreamConstraints::new();
    constraints.set_video(&video);
    constraints.set_audio(&JsValue::FALSE);

    let promise = devices
        .get_user_media_with_constraints(&constraints)
        .map_err(|e| camera_error(&e))?;
    let stream = JsFuture::from(promise).await.map_err(|e| camera_error(&e))?;
    stream
        .dyn_into::<MediaStream>()
        .map_err(|_| CameraError::Other("getUserMedia returned no stream".into()))
}

/// 列出视频输入设备
pub async fn list_video_inputs() -> Result<Vec<VideoInput>, CameraError> {
    let devices = media_devices()?;
    let promise = devices.enumerate_devices().map_err(|e| camera_error(&e))?;
    let list = JsFuture::from(promise).await.map_err(|e| camera_error(&e))?;
    let list: js_sys::Array = list.unchecked_into();

    Ok(list
        .iter()
        .filter_map(|info| info.dyn_into::<MediaDeviceInfo>().ok())
        .filter(|info| info.kind() == MediaDeviceKind::Videoinput)
        .map(|info| VideoInput {
            device_id: info.device_id(),
            label: info.label(),
        })
        .collect())
}

/// 把流挂到 `<video>` 上并开始播放
pub fn attach_preview(video: &HtmlVideoElement, stream: &MediaStream) {
    video.set_src_object(Some(stream));
    if let Err(e) = video.play() {
        log::warn!("[Media] preview play failed: {:?}", e);
    }
}

pub fn detach_preview(video: &HtmlVideoElement) {
    video.set_src_object(None);
}

/// `<video>` 当前挂载的流（扫码引擎自行打开的流从这里取得）
pub fn attached_stream(video: &HtmlVideoElement) -> Option<MediaStream> {
    video.src_object()
}

fn canvas_error(e: JsValue) -> CameraError {
    CameraError::Other(format!("canvas: {:?}", e))
}

/// 从当前帧裁出居中正方形并编码为 JPEG
///
/// 帧在调用时同步采样；视频尚未出画面时返回 `Ok(None)`。
pub async fn capture_square_jpeg(
    video: &HtmlVideoElement,
    target_side: Option<u32>,
    filename: &str,
) -> Result<Option<File>, CameraError> {
    if video.ready_state() < HAVE_CURRENT_DATA {
        return Ok(None);
    }
    let Some(plan) = CapturePlan::for_frame(video.video_width(), video.video_height(), target_side)
    else {
        return Ok(None);
    };

    let document = web_sys::window()
        .and_then(|w| w.document())
        .ok_or(CameraError::Unsupported)?;
    let canvas: HtmlCanvasElement = document
        .create_element("canvas")
        .map_err(canvas_error)?
        .unchecked_into();
    canvas.set_width(plan.output_side);
    canvas.set_height(plan.output_side);

    let context: CanvasRenderingContext2d = canvas
        .get_context("2d")
        .map_err(canvas_error)?
        .ok_or_else(|| CameraError::Other("canvas 2d context unavailable".into()))?
        .unchecked_into();

    let source = plan.source;
    context
        .draw_image_with_html_video_element_and_sw_and_sh_and_dx_and_dy_and_dw_and_dh(
            video,
            source.x as f64,
            source.y as f64,
            source.side as f64,
            source.side as f64,
            0.0,
            0.0,
            plan.output_side as f64,
            plan.output_side as f64,
        )
        .map_err(canvas_error)?;

    // toBlob 只有回调形式，包装成 Promise
    let quality = JsValue::from_f64(plan.quality);
    let promise = js_sys::Promise::new(&mut |resolve, reject| {
        let callback = Closure::once_into_js(move |blob: JsValue| {
            let _ = resolve.call1(&JsValue::NULL, &blob);
        });
        if let Err(e) =
            canvas.to_blob_with_type_and_encoder_options(callback.unchecked_ref(), "image/jpeg", &quality)
        {
            let _ = reject.call1(&JsValue::NULL, &e);
        }
    });
    let blob = JsFuture::from(promise).await.map_err(canvas_error)?;
    if blob.is_null() || blob.is_undefined() {
        return Ok(None);
    }
    let blob: Blob = blob.unchecked_into();

    let options = FilePropertyBag::new();
    options.set_type("image/jpeg");
    let parts = js_sys::Array::of1(&blob);
    let file = File::new_with_blob_sequence_and_options(&parts, filename, &options)
        .map_err(canvas_error)?;
    log::debug!("[Media] captured {} ({} bytes)", filename, file.size());
    Ok(Some(file))
}

/// 后端返回的照片地址在当前页面下的可用形式
pub fn photo_src(raw: &str) -> String {
    let page = web_sys::window()
        .and_then(|w| w.location().href().ok())
        .and_then(|href| url::Url::parse(&href).ok());
    match page {
        Some(page) => resolve_media_url(raw, &page, &CONFIG.dev_ports, CONFIG.media_port),
        None => raw.to_string(),
    }
}

/// 文件选择框中选中的第一个文件
pub fn picked_file(ev: &web_sys::Event) -> Option<File> {
    ev.target()
        .and_then(|target| target.dyn_into::<web_sys::HtmlInputElement>().ok())
        .and_then(|input| input.files())
        .and_then(|files| files.get(0))
}

/// 本地预览用的 `blob:` 地址；用完要 `revoke_preview_url`
pub fn preview_url(file: &File) -> Option<String> {
    web_sys::Url::create_object_url_with_blob(file).ok()
}

pub fn revoke_preview_url(url: &str) {
    let _ = web_sys::Url::revoke_object_url(url);
}
