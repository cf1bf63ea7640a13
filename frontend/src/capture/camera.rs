//! 拍照控制器的纯逻辑部分：约束、错误映射、居中正方形裁剪

use thiserror::Error;

/// JPEG 压缩质量
pub const JPEG_QUALITY: f64 = 0.85;
/// 登记照片的输出边长
pub const PHOTO_SIDE: u32 = 800;
pub const IDEAL_WIDTH: u32 = 1280;
pub const IDEAL_HEIGHT: u32 = 720;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FacingMode {
    #[default]
    Environment,
    User,
}

impl FacingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            FacingMode::Environment => "environment",
            FacingMode::User => "user",
        }
    }

    pub fn toggled(&self) -> Self {
        match self {
            FacingMode::Environment => FacingMode::User,
            FacingMode::User => FacingMode::Environment,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CameraError {
    #[error("permission denied")]
    PermissionDenied,
    #[error("device not found")]
    DeviceNotFound,
    #[error("device busy")]
    DeviceBusy,
    #[error("insecure context")]
    InsecureContext,
    #[error("media devices unsupported")]
    Unsupported,
    #[error("{0}")]
    Other(String),
}

impl CameraError {
    /// 根据 `DOMException.name` 分类
    pub fn from_dom_name(name: &str, message: &str) -> Self {
        match name {
            "NotAllowedError" | "PermissionDeniedError" => CameraError::PermissionDenied,
            "SecurityError" => CameraError::InsecureContext,
            "NotFoundError" | "DevicesNotFoundError" | "OverconstrainedError" => {
                CameraError::DeviceNotFound
            }
            "NotReadableError" | "TrackStartError" | "AbortError" => CameraError::DeviceBusy,
            "TypeError" | "NotSupportedError" => CameraError::Unsupported,
            _ => CameraError::Other(if message.is_empty() {
                name.to_string()
            } else {
                message.to_string()
            }),
        }
    }

    pub fn user_message(&self) -> String {
        match self {
            CameraError::PermissionDenied => {
                "Permiso de cámara denegado. Habilítelo en la configuración del navegador.".into()
            }
            CameraError::DeviceNotFound => "No se encontró ninguna cámara en el dispositivo.".into(),
            CameraError::DeviceBusy => {
                "La cámara está siendo usada por otra aplicación. Ciérrela e intente de nuevo.".into()
            }
            CameraError::InsecureContext => {
                "La cámara solo está disponible en HTTPS o localhost.".into()
            }
            CameraError::Unsupported => "Este navegador no permite acceder a la cámara.".into(),
            CameraError::Other(detail) => format!("No se pudo iniciar la cámara: {}", detail),
        }
    }
}

/// 调用 getUserMedia 之前的环境检查
pub fn check_environment(is_secure_context: bool, has_media_devices: bool) -> Result<(), CameraError> {
    if !is_secure_context {
        return Err(CameraError::InsecureContext);
    }
    if !has_media_devices {
        return Err(CameraError::Unsupported);
    }
    Ok(())
}

/// 视频帧中的源区域
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRect {
    pub x: u32,
    pub y: u32,
    pub side: u32,
}

impl CropRect {
    /// 居中正方形，边长为宽高的较小值；帧尺寸为 0 表示流尚未就绪
    pub fn center_square(width: u32, height: u32) -> Option<Self> {
        if width == 0 || height == 0 {
            return None;
        }
        let side = width.min(height);
        Some(Self {
            x: (width - side) / 2,
            y: (height - side) / 2,
            side,
        })
    }
}

/// 一次拍照的绘制参数
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CapturePlan {
    pub source: CropRect,
    /// 画布边长
    pub output_side: u32,
    pub quality: f64,
}

impl CapturePlan {
    pub fn for_frame(width: u32, height: u32, target_side: Option<u32>) -> Option<Self> {
        let source = CropRect::center_square(width, height)?;
        Some(Self {
            source,
            output_side: target_side.filter(|s| *s > 0).unwrap_or(source.side),
            quality: JPEG_QUALITY,
        })
    }
}

/// 拍照对话框的状态
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CameraStatus {
    #[default]
    Idle,
    Starting,
    Live,
    Failed(CameraError),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct CameraState {
    pub facing: FacingMode,
    pub status: CameraStatus,
}

impl CameraState {
    pub fn starting(&mut self) {
        self.status = CameraStatus::Starting;
    }

    pub fn live(&mut self) {
        self.status = CameraStatus::Live;
    }

    pub fn failed(&mut self, err: CameraError) {
        log::warn!("[Camera] {}", err);
        self.status = CameraStatus::Failed(err);
    }

    pub fn stopped(&mut self) {
        self.status = CameraStatus::Idle;
    }

    /// 切换前后摄像头，返回新的朝向；调用方负责停止旧流并重新启动
    pub fn toggle_facing(&mut self) -> FacingMode {
        self.facing = self.facing.toggled();
        self.status = CameraStatus::Starting;
        self.facing
    }

    /// 设备错误后可以用同一朝向重试
    pub fn can_retry(&self) -> bool {
        matches!(self.status, CameraStatus::Failed(_))
    }

    /// 保持当前朝向重新启动；返回要打开的朝向
    pub fn retry(&mut self) -> FacingMode {
        self.status = CameraStatus::Starting;
        self.facing
    }

    /// 只有流就绪时才能拍照
    pub fn can_capture(&self) -> bool {
        self.status == CameraStatus::Live
    }

    pub fn error_message(&self) -> Option<String> {
        match &self.status {
            CameraStatus::Failed(err) => Some(err.user_message()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crop_is_centered_square() {
        assert_eq!(
            CropRect::center_square(1280, 720),
            Some(CropRect { x: 280, y: 0, side: 720 })
        );
        assert_eq!(
            CropRect::center_square(480, 640),
            Some(CropRect { x: 0, y: 80, side: 480 })
        );
        assert_eq!(CropRect::center_square(0, 720), None);
    }

    #[test]
    fn plan_uses_target_side_when_given() {
        let plan = CapturePlan::for_frame(1920, 1080, Some(PHOTO_SIDE)).unwrap();
        assert_eq!(plan.source.side, 1080);
        assert_eq!(plan.output_side, 800);
        assert_eq!(plan.quality, 0.85);

        let native = CapturePlan::for_frame(640, 480, None).unwrap();
        assert_eq!(native.output_side, 480);
        assert!(CapturePlan::for_frame(0, 0, Some(800)).is_none());
    }

    #[test]
    fn dom_exceptions_map_to_distinct_causes() {
        assert_eq!(CameraError::from_dom_name("NotAllowedError", ""), CameraError::PermissionDenied);
        assert_eq!(CameraError::from_dom_name("NotFoundError", ""), CameraError::DeviceNotFound);
        assert_eq!(CameraError::from_dom_name("OverconstrainedError", ""), CameraError::DeviceNotFound);
        assert_eq!(CameraError::from_dom_name("NotReadableError", ""), CameraError::DeviceBusy);
        assert_eq!(CameraError::from_dom_name("SecurityError", ""), CameraError::InsecureContext);
        assert_eq!(
            CameraError::from_dom_name("WeirdError", "boom"),
            CameraError::Other("boom".into())
        );
    }

    #[test]
    fn environment_checks_come_before_media_access() {
        assert_eq!(check_environment(false, true), Err(CameraError::InsecureContext));
        assert_eq!(check_environment(true, false), Err(CameraError::Unsupported));
        assert_eq!(check_environment(true, true), Ok(()));
    }

    #[test]
    fn permission_denied_disables_capture() {
        let mut state = CameraState::default();
        state.starting();
        assert!(!state.can_capture());
        state.failed(CameraError::PermissionDenied);
        assert!(!state.can_capture());
        assert!(state.error_message().unwrap().starts_with("Permiso de cámara denegado"));

        state.starting();
        state.live();
        assert!(state.can_capture());
        assert_eq!(state.toggle_facing(), FacingMode::User);
        assert!(!state.can_capture());
    }

    #[test]
    fn retry_after_device_error_keeps_facing() {
        let mut state = CameraState::default();
        state.toggle_facing();
        state.failed(CameraError::DeviceBusy);
        assert!(state.can_retry());

        assert_eq!(state.retry(), FacingMode::User);
        assert_eq!(state.facing, FacingMode::User);
        assert_eq!(state.status, CameraStatus::Starting);
        assert!(!state.can_retry());
        assert_eq!(state.error_message(), None);

        state.live();
        assert!(!state.can_retry());
    }
}
