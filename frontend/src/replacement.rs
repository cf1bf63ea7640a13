//! bobina 登记与 líder 授权替换流程
//!
//! 状态机：
//!
//! ```text
//! Idle ─submit→ SubmitAttempted ─created→ Registered
//!                     │ HU 已存在
//!                     ▼
//!            ConfirmReplacement ─confirm→ AwaitingLeadAuthorization ⇄ Authorizing ─ok→ Replaced
//! ```
//!
//! 任何非终止状态都可以 `cancel()` 回到 Idle，同时清除 líder 凭据与错误信息。
//! 异步结果带有 `FlowTicket`，取消或重新提交后到达的旧结果会被丢弃。
//!
//! 状态转换是纯函数，网络部分在 `submit_registration` / `authorize_replacement` 中。

#[cfg(test)]
mod tests;

use crate::api::{ApiClient, ApiError, HttpTransport};
use crate::forms::RegistrationDraft;
use bobinas_shared::{Bobina, LeadCredentials, NewBobina, Role};

pub const LEAD_CREDENTIALS_REQUIRED: &str = "Ingrese usuario y contraseña del líder";
pub const LEAD_REJECTED: &str = "Credenciales de líder inválidas";

// =========================================================
// 状态
// =========================================================

#[derive(Debug, Clone, PartialEq, Default)]
pub enum FlowState {
    #[default]
    Idle,
    /// 登记请求进行中
    SubmitAttempted,
    /// HU 已存在，等待用户确认是否替换
    ConfirmReplacement { existing: Option<Bobina> },
    /// líder 授权弹窗已打开
    AwaitingLeadAuthorization {
        existing: Option<Bobina>,
        error: Option<String>,
    },
    /// 正在验证 líder 凭据并执行替换
    Authorizing { existing: Option<Bobina> },
    /// 新登记成功（终止）
    Registered(Bobina),
    /// 替换成功（终止）
    Replaced(Bobina),
}

impl FlowState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, FlowState::Registered(_) | FlowState::Replaced(_))
    }

    /// 有请求在进行中，触发按钮应禁用
    pub fn is_busy(&self) -> bool {
        matches!(self, FlowState::SubmitAttempted | FlowState::Authorizing { .. })
    }

    pub fn shows_confirmation(&self) -> bool {
        matches!(self, FlowState::ConfirmReplacement { .. })
    }

    /// 授权弹窗可见（验证中也保持打开）
    pub fn shows_lead_dialog(&self) -> bool {
        matches!(
            self,
            FlowState::AwaitingLeadAuthorization { .. } | FlowState::Authorizing { .. }
        )
    }

    pub fn existing(&self) -> Option<&Bobina> {
        match self {
            FlowState::ConfirmReplacement { existing }
            | FlowState::AwaitingLeadAuthorization { existing, .. }
            | FlowState::Authorizing { existing } => existing.as_ref(),
            _ => None,
        }
    }

    pub fn lead_error(&self) -> Option<&str> {
        match self {
            FlowState::AwaitingLeadAuthorization { error, .. } => error.as_deref(),
            _ => None,
        }
    }

    pub fn success_message(&self) -> Option<&'static str> {
        match self {
            FlowState::Registered(_) => Some("Bobina registrada correctamente"),
            FlowState::Replaced(_) => Some("Bobina reemplazada correctamente"),
            _ => None,
        }
    }
}

/// 异步结果的归属凭证
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlowTicket(u32);

// =========================================================
// 异步操作的结果
// =========================================================

#[derive(Debug, Clone)]
pub enum SubmitOutcome {
    Created(Bobina),
    /// HU 已存在；能查到时附带已有记录
    Duplicate(Option<Bobina>),
    Rejected(ApiError),
}

#[derive(Debug, Clone)]
pub enum AuthorizeOutcome {
    Replaced(Bobina),
    /// líder 凭据被拒绝，弹窗保持打开
    Denied(String),
    Failed(ApiError),
}

// =========================================================
// ReplacementFlow
// =========================================================

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReplacementFlow {
    state: FlowState,
    credentials: LeadCredentials,
    generation: u32,
}

impl ReplacementFlow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &FlowState {
        &self.state
    }

    pub fn credentials(&self) -> &LeadCredentials {
        &self.credentials
    }

    fn ticket(&self) -> FlowTicket {
        FlowTicket(self.generation)
    }

    fn is_current(&self, ticket: FlowTicket) -> bool {
        ticket.0 == self.generation
    }

    /// Idle → SubmitAttempted；请求进行中或处于其他状态时返回 None
    pub fn begin_submit(&mut self) -> Option<FlowTicket> {
        if self.state != FlowState::Idle {
            return None;
        }
        self.generation = self.generation.wrapping_add(1);
        self.state = FlowState::SubmitAttempted;
        Some(self.ticket())
    }

    /// 处理登记结果；被拒绝时返回错误，由表单展示
    pub fn finish_submit(&mut self, ticket: FlowTicket, outcome: SubmitOutcome) -> Option<ApiError> {
        if !self.is_current(ticket) || self.state != FlowState::SubmitAttempted {
            log::debug!("[Replacement] dropping stale submit outcome");
            return None;
        }
        match outcome {
            SubmitOutcome::Created(bobina) => {
                self.state = FlowState::Registered(bobina);
                None
            }
            SubmitOutcome::Duplicate(existing) => {
                self.state = FlowState::ConfirmReplacement { existing };
                None
            }
            SubmitOutcome::Rejected(err) => {
                self.state = FlowState::Idle;
                Some(err)
            }
        }
    }

    /// ConfirmReplacement → AwaitingLeadAuthorization
    pub fn confirm(&mut self) -> bool {
        match std::mem::take(&mut self.state) {
            FlowState::ConfirmReplacement { existing } => {
                self.credentials = LeadCredentials::default();
                self.state = FlowState::AwaitingLeadAuthorization {
                    existing,
                    error: None,
                };
                true
            }
            other => {
                self.state = other;
                false
            }
        }
    }

    pub fn set_lead_username(&mut self, username: String) {
        if matches!(self.state, FlowState::AwaitingLeadAuthorization { .. }) {
            self.credentials.username = username;
        }
    }

    pub fn set_lead_password(&mut self, password: String) {
        if matches!(self.state, FlowState::AwaitingLeadAuthorization { .. }) {
            self.credentials.password = password;
        }
    }

    /// AwaitingLeadAuthorization → Authorizing
    ///
    /// 凭据不完整时留在当前状态并给出提示。
    pub fn begin_authorize(&mut self) -> Option<(FlowTicket, LeadCredentials)> {
        match std::mem::take(&mut self.state) {
            FlowState::AwaitingLeadAuthorization { existing, .. } => {
                if !self.credentials.is_complete() {
                    self.state = FlowState::AwaitingLeadAuthorization {
                        existing,
                        error: Some(LEAD_CREDENTIALS_REQUIRED.to_string()),
                    };
                    return None;
                }
                self.generation = self.generation.wrapping_add(1);
                self.state = FlowState::Authorizing { existing };
                Some((self.ticket(), self.credentials.clone()))
            }
            other => {
                self.state = other;
                None
            }
        }
    }

    pub fn finish_authorize(&mut self, ticket: FlowTicket, outcome: AuthorizeOutcome) {
        if !self.is_current(ticket) {
            log::debug!("[Replacement] dropping stale authorization outcome");
            return;
        }
        let existing = match std::mem::take(&mut self.state) {
            FlowState::Authorizing { existing } => existing,
            other => {
                self.state = other;
                return;
            }
        };
        match outcome {
            AuthorizeOutcome::Replaced(bobina) => {
                self.credentials = LeadCredentials::default();
                self.state = FlowState::Replaced(bobina);
            }
            AuthorizeOutcome::Denied(message) => {
                // 每次失败都重新提示，不限制次数；只清除密码
                self.credentials.password.clear();
                self.state = FlowState::AwaitingLeadAuthorization {
                    existing,
                    error: Some(message),
                };
            }
            AuthorizeOutcome::Failed(err) => {
                self.state = FlowState::AwaitingLeadAuthorization {
                    existing,
                    error: Some(err.to_string()),
                };
            }
        }
    }

    /// 任意非终止状态回到 Idle，清除授权相关的临时数据
    pub fn cancel(&mut self) -> bool {
        if self.state.is_terminal() {
            return false;
        }
        if self.state != FlowState::Idle {
            log::debug!("[Replacement] cancelled from {:?}", self.state);
        }
        self.generation = self.generation.wrapping_add(1);
        self.state = FlowState::Idle;
        self.credentials = LeadCredentials::default();
        true
    }

    /// 终止状态在提示展示完毕后回到 Idle
    pub fn reset(&mut self) {
        self.generation = self.generation.wrapping_add(1);
        self.state = FlowState::Idle;
        self.credentials = LeadCredentials::default();
    }
}

// =========================================================
// 成功后的表单重置
// =========================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetPolicy {
    /// 保留客户名，方便连续录入
    KeepCliente,
    Full,
}

impl ResetPolicy {
    pub fn for_role(role: Role) -> Self {
        match role {
            Role::Embarcador => ResetPolicy::KeepCliente,
            _ => ResetPolicy::Full,
        }
    }

    pub fn next_draft(&self, previous: &RegistrationDraft) -> RegistrationDraft {
        match self {
            ResetPolicy::KeepCliente => RegistrationDraft::with_cliente(Some(previous.cliente.clone())),
            ResetPolicy::Full => RegistrationDraft::default(),
        }
    }
}

// =========================================================
// 网络部分
// =========================================================

/// 提交登记；HU 重复时尽量带回已有记录
pub async fn submit_registration<T: HttpTransport>(
    api: &ApiClient<T>,
    bobina: &NewBobina,
    foto: T::File,
    filename: &str,
) -> SubmitOutcome {
    match api.create_bobina(bobina, foto, filename, None).await {
        Ok(created) => {
            log::info!("[Replacement] registered bobina {}", created.hu);
            SubmitOutcome::Created(created)
        }
        Err(err) if err.is_duplicate_hu() => {
            let existing = match err {
                ApiError::Conflict {
                    existing: Some(existing),
                    ..
                } => Some(existing),
                _ => api.find_bobina_by_hu(&bobina.hu).await.unwrap_or_else(|e| {
                    log::warn!("[Replacement] cannot load existing bobina: {}", e);
                    None
                }),
            };
            log::info!("[Replacement] HU {} already registered", bobina.hu);
            SubmitOutcome::Duplicate(existing)
        }
        Err(err) => SubmitOutcome::Rejected(err),
    }
}

/// 验证 líder 凭据，通过后立即用同一份凭据和原表单执行替换
pub async fn authorize_replacement<T: HttpTransport>(
    api: &ApiClient<T>,
    bobina: &NewBobina,
    foto: T::File,
    filename: &str,
    credentials: &LeadCredentials,
) -> AuthorizeOutcome {
    match api.verify_lead(credentials).await {
        Ok(verification) if verification.valid => {}
        Ok(_) => return AuthorizeOutcome::Denied(LEAD_REJECTED.to_string()),
        Err(ApiError::Unauthorized(message)) => return AuthorizeOutcome::Denied(message),
        Err(ApiError::Validation { message, .. }) => return AuthorizeOutcome::Denied(message),
        Err(err) => return AuthorizeOutcome::Failed(err),
    }

    match api
        .create_bobina(bobina, foto, filename, Some(credentials))
        .await
    {
        Ok(replaced) => {
            log::info!(
                "[Replacement] bobina {} replaced, authorized by {}",
                replaced.hu,
                credentials.username.trim()
            );
            AuthorizeOutcome::Replaced(replaced)
        }
        Err(ApiError::Unauthorized(message)) => AuthorizeOutcome::Denied(message),
        Err(err) => AuthorizeOutcome::Failed(err),
    }
}
