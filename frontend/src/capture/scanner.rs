//! 扫码控制器的纯逻辑部分
//!
//! 解码循环由浏览器中的条码引擎驱动，每一帧的结果交给 `ScanSession`：
//! 通过规则则停止并只回调一次；不通过则给出提示并继续扫描。

use super::camera::CameraError;
use super::device::EpochTicket;
use bobinas_shared::AcceptanceRule;
use thiserror::Error;

/// 摄像头标签中表示后置摄像头的关键字
pub const REAR_CAMERA_HINTS: [&str; 5] = ["back", "rear", "trasera", "environment", "posterior"];

/// 引擎在当前帧没有找到条码时的错误名，属于正常噪声
pub const NO_CODE_IN_FRAME: &str = "NotFoundException";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScannerError {
    #[error("no camera found")]
    NoCameraFound,
    /// 打开摄像头失败（权限、占用等）
    #[error(transparent)]
    Camera(#[from] CameraError),
    #[error("scanner engine error: {0}")]
    Engine(String),
}

impl ScannerError {
    pub fn user_message(&self) -> String {
        match self {
            ScannerError::NoCameraFound => "No se encontró ninguna cámara para escanear.".into(),
            ScannerError::Camera(err) => err.user_message(),
            ScannerError::Engine(detail) => format!("No se pudo iniciar el escáner: {}", detail),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoInput {
    pub device_id: String,
    pub label: String,
}

/// 优先选择标签像后置摄像头的设备，否则取第一个
pub fn pick_camera(devices: &[VideoInput]) -> Result<&VideoInput, ScannerError> {
    devices
        .iter()
        .find(|d| {
            let label = d.label.to_lowercase();
            REAR_CAMERA_HINTS.iter().any(|hint| label.contains(hint))
        })
        .or_else(|| devices.first())
        .ok_or(ScannerError::NoCameraFound)
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ScanStatus {
    #[default]
    Idle,
    Starting,
    Scanning,
    Accepted(String),
    Failed(ScannerError),
}

/// 一帧解码结果的处理方式
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanEvent {
    /// 停止扫描并回调这个值
    Accepted(String),
    /// 不符合规则，继续扫描
    Rejected(String),
    /// 会话已结束或未开始，忽略
    Ignored,
}

/// 一次扫码会话
///
/// 每次打开对话框领取一张 `EpochTicket`，会话记住开始它的那张票。
/// 迟到的旧启动只能结束自己开始的会话，不会影响重新打开后的新会话。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanSession {
    rule: AcceptanceRule,
    status: ScanStatus,
    message: Option<String>,
    owner: Option<EpochTicket>,
}

impl ScanSession {
    pub fn new(rule: AcceptanceRule) -> Self {
        Self {
            rule,
            status: ScanStatus::Idle,
            message: None,
            owner: None,
        }
    }

    pub fn rule(&self) -> AcceptanceRule {
        self.rule
    }

    pub fn status(&self) -> &ScanStatus {
        &self.status
    }

    /// 最近一次被拒绝的提示
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn is_active(&self) -> bool {
        matches!(self.status, ScanStatus::Starting | ScanStatus::Scanning)
    }

    fn owned_by(&self, ticket: EpochTicket) -> bool {
        self.owner == Some(ticket)
    }

    /// 开始扫描；已经在扫描时返回 false（防止重入）
    pub fn begin(&mut self, ticket: EpochTicket) -> bool {
        if self.is_active() {
            return false;
        }
        self.status = ScanStatus::Starting;
        self.message = None;
        self.owner = Some(ticket);
        true
    }

    pub fn started(&mut self, ticket: EpochTicket) {
        if self.owned_by(ticket) && self.status == ScanStatus::Starting {
            self.status = ScanStatus::Scanning;
        }
    }

    pub fn failed(&mut self, ticket: EpochTicket, err: ScannerError) {
        if !self.owned_by(ticket) {
            log::debug!("[Scanner] stale start failed: {}", err);
            return;
        }
        log::warn!("[Scanner] {}", err);
        self.status = ScanStatus::Failed(err);
    }

    pub fn on_decoded(&mut self, ticket: EpochTicket, raw: &str) -> ScanEvent {
        if !self.owned_by(ticket) || self.status != ScanStatus::Scanning {
            return ScanEvent::Ignored;
        }
        match self.rule.check(raw) {
            Ok(value) => {
                self.status = ScanStatus::Accepted(value.clone());
                self.message = None;
                ScanEvent::Accepted(value)
            }
            Err(err) => {
                let message = format!("Código inválido \"{}\": {}", raw.trim(), err);
                self.message = Some(message.clone());
                ScanEvent::Rejected(message)
            }
        }
    }

    /// 解码错误从不停止循环；返回是否值得记录
    pub fn on_decode_error(&self, name: &str) -> bool {
        self.status == ScanStatus::Scanning && name != NO_CODE_IN_FRAME
    }

    /// 结束会话（关闭对话框）；可重复调用
    pub fn stop(&mut self) -> bool {
        let was_active = self.is_active();
        if was_active {
            self.status = ScanStatus::Idle;
        }
        self.owner = None;
        was_active
    }

    /// 放弃由 `ticket` 开始的启动；会话已属于更新的票时不做任何事
    pub fn abandon(&mut self, ticket: EpochTicket) -> bool {
        if !self.owned_by(ticket) {
            return false;
        }
        self.stop()
    }

    /// 对话框重新打开时重置
    pub fn reset(&mut self) {
        self.status = ScanStatus::Idle;
        self.message = None;
        self.owner = None;
    }

    pub fn error_message(&self) -> Option<String> {
        match &self.status {
            ScanStatus::Failed(err) => Some(err.user_message()),
            _ => self.message.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::device::CaptureEpoch;

    fn input(id: &str, label: &str) -> VideoInput {
        VideoInput {
            device_id: id.into(),
            label: label.into(),
        }
    }

    fn scanning(rule: AcceptanceRule) -> (ScanSession, EpochTicket) {
        let mut epoch = CaptureEpoch::default();
        let ticket = epoch.open();
        let mut session = ScanSession::new(rule);
        assert!(session.begin(ticket));
        session.started(ticket);
        (session, ticket)
    }

    #[test]
    fn prefers_rear_camera_label() {
        let devices = vec![
            input("a", "FaceTime HD Camera"),
            input("b", "Cámara trasera 2"),
            input("c", "Back Camera"),
        ];
        assert_eq!(pick_camera(&devices).unwrap().device_id, "b");

        let plain = vec![input("x", ""), input("y", "USB Camera")];
        assert_eq!(pick_camera(&plain).unwrap().device_id, "x");

        assert_eq!(pick_camera(&[]), Err(ScannerError::NoCameraFound));
    }

    #[test]
    fn start_is_not_reentrant() {
        let mut epoch = CaptureEpoch::default();
        let ticket = epoch.open();
        let mut session = ScanSession::new(AcceptanceRule::BOBINA_HU);
        assert!(session.begin(ticket));
        assert!(!session.begin(ticket));
        session.started(ticket);
        assert!(!session.begin(ticket));
    }

    #[test]
    fn accepts_exactly_once() {
        let (mut session, ticket) = scanning(AcceptanceRule::BOBINA_HU);
        assert_eq!(
            session.on_decoded(ticket, "123456789"),
            ScanEvent::Accepted("123456789".into())
        );
        assert_eq!(session.on_decoded(ticket, "987654321"), ScanEvent::Ignored);
        assert_eq!(session.status(), &ScanStatus::Accepted("123456789".into()));
        assert!(!session.is_active());
    }

    #[test]
    fn rejected_code_keeps_scanning() {
        let (mut session, ticket) = scanning(AcceptanceRule::BOBINA_HU);
        assert!(matches!(session.on_decoded(ticket, "12345"), ScanEvent::Rejected(_)));
        assert!(session.is_active());
        assert!(session.message().unwrap().contains("12345"));

        assert!(matches!(
            session.on_decoded(ticket, " 123456789 "),
            ScanEvent::Rejected(_)
        ));
        assert_eq!(
            session.on_decoded(ticket, "123456789"),
            ScanEvent::Accepted("123456789".into())
        );
        assert_eq!(session.message(), None);
    }

    #[test]
    fn inventory_rule_accepts_free_form_serials() {
        let (mut session, ticket) = scanning(AcceptanceRule::INVENTORY_SERIAL);
        assert_eq!(
            session.on_decoded(ticket, " SN-AB/12 "),
            ScanEvent::Accepted("SN-AB/12".into())
        );
    }

    #[test]
    fn frame_noise_is_not_reported() {
        let (session, _) = scanning(AcceptanceRule::BOBINA_HU);
        assert!(!session.on_decode_error(NO_CODE_IN_FRAME));
        assert!(session.on_decode_error("ChecksumException"));
    }

    #[test]
    fn stop_is_idempotent_and_ignores_late_frames() {
        let (mut session, ticket) = scanning(AcceptanceRule::BOBINA_HU);
        assert!(session.stop());
        assert!(!session.stop());
        assert_eq!(session.on_decoded(ticket, "123456789"), ScanEvent::Ignored);
    }

    #[test]
    fn late_start_from_closed_dialog_leaves_reopened_session_alone() {
        let mut epoch = CaptureEpoch::default();
        let mut session = ScanSession::new(AcceptanceRule::BOBINA_HU);

        // 第一次打开，权限请求还没返回
        let first = epoch.open();
        session.reset();
        assert!(session.begin(first));

        // 关闭后重新打开
        epoch.close();
        session.stop();
        let second = epoch.open();
        session.reset();
        assert!(session.begin(second));

        // 第一次的启动迟到：票已失效，只能放弃自己的会话
        assert!(!epoch.is_current(first));
        assert!(!session.abandon(first));
        session.failed(first, ScannerError::Engine("reset".into()));
        session.started(first);
        assert_eq!(session.status(), &ScanStatus::Starting);

        session.started(second);
        assert_eq!(session.status(), &ScanStatus::Scanning);
        assert_eq!(session.on_decoded(first, "111111111"), ScanEvent::Ignored);
        assert_eq!(
            session.on_decoded(second, "123456789"),
            ScanEvent::Accepted("123456789".into())
        );
    }

    #[test]
    fn abandon_ends_only_the_owning_start() {
        let mut epoch = CaptureEpoch::default();
        let ticket = epoch.open();
        let mut session = ScanSession::new(AcceptanceRule::BOBINA_HU);
        assert!(session.begin(ticket));
        assert!(session.abandon(ticket));
        assert_eq!(session.status(), &ScanStatus::Idle);
        assert!(!session.abandon(ticket));
    }
}
