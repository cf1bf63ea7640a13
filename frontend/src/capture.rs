//! 拍照与扫码
//!
//! - `camera`: 拍照状态、错误映射、居中正方形裁剪
//! - `scanner`: 扫码会话与接受规则
//! - `device`: 视频流独占与对话框票据
//!
//! 浏览器部分（getUserMedia、canvas、条码引擎）在 `web::media` 和 `web::barcode` 中。

pub mod camera;
pub mod device;
pub mod scanner;

pub use camera::{CameraError, CameraState, CapturePlan, FacingMode};
pub use device::{CaptureEpoch, DeviceOwner, DeviceSlot, EpochTicket, TrackSet};
pub use scanner::{ScanEvent, ScanSession, ScanStatus, ScannerError, VideoInput};
