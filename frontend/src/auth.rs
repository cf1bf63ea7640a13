//! 认证模块
//!
//! 管理当前用户与会话生命周期（恢复、登录、登出、强制登出），与路由系统解耦。
//! 路由服务通过注入的角色信号来检查访问权限。

use crate::api::{ApiClient, ApiError, UnauthorizedHook};
use crate::config::CONFIG;
use crate::session::{LogoutReason, Restored};
use crate::web::http::GlooTransport;
use crate::web::router::mark_login_redirect;
use crate::web::storage::browser_session;
use crate::web::timer::now;
use crate::web::{activity, barcode};
use bobinas_shared::{Role, Session, SessionUser};
use leptos::prelude::*;
use leptos::task::spawn_local;
use std::sync::Arc;

/// 浏览器中使用的 API 客户端
pub type Api = ApiClient<GlooTransport>;

/// 认证状态
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AuthState {
    /// 当前用户，未登录为 None
    pub user: Option<SessionUser>,
    /// 是否正在恢复 / 校验会话
    pub is_loading: bool,
}

/// 认证上下文
///
/// 包含读写信号，通过 Context 在组件间共享。
#[derive(Clone, Copy)]
pub struct AuthContext {
    /// 认证状态（只读）
    pub state: ReadSignal<AuthState>,
    /// 设置认证状态（写入）
    pub set_state: WriteSignal<AuthState>,
}

impl AuthContext {
    /// 创建新的认证上下文
    pub fn new() -> Self {
        let (state, set_state) = signal(AuthState::default());
        Self { state, set_state }
    }

    /// 当前角色信号（用于路由服务注入）
    pub fn role_signal(&self) -> Signal<Option<Role>> {
        let state = self.state;
        Signal::derive(move || state.with(|s| s.user.as_ref().map(|u| u.role)))
    }

    fn sign_out(&self) {
        self.set_state.set(AuthState::default());
    }
}

impl Default for AuthContext {
    fn default() -> Self {
        Self::new()
    }
}

/// 从 Context 获取认证上下文
pub fn use_auth() -> AuthContext {
    use_context::<AuthContext>().expect("AuthContext should be provided")
}

/// 从 Context 获取 API 客户端
pub fn use_api() -> Api {
    use_context::<Api>().expect("Api should be provided")
}

/// 创建 API 客户端；受保护接口返回 401 时以 `Unauthorized` 原因强制登出
pub fn build_api(ctx: AuthContext) -> Api {
    let on_unauthorized: UnauthorizedHook = Arc::new(move || {
        force_logout(&ctx, LogoutReason::Unauthorized);
    });
    ApiClient::new(
        GlooTransport,
        &CONFIG.api_base_url,
        Arc::new(browser_session()),
        on_unauthorized,
    )
}

/// 初始化认证状态
///
/// 从 LocalStorage 恢复会话：超过不活动窗口的会话直接作废，
/// 其余的先按缓存用户显示，再用 `GET /me` 校验。
pub fn init_auth(ctx: &AuthContext, api: &Api) {
    let session = browser_session();
    match session.restore(now(), CONFIG.inactivity_window()) {
        Restored::None => {}
        Restored::Expired => mark_login_redirect(LogoutReason::Inactivity),
        Restored::Active(stored) => {
            ctx.set_state.set(AuthState {
                user: Some(stored.user.clone()),
                is_loading: true,
            });
            let ctx = *ctx;
            let api = api.clone();
            spawn_local(async move {
                match api.me().await {
                    Ok(user) => {
                        let user = SessionUser::from(user);
                        session.save(&Session {
                            token: stored.token,
                            user: user.clone(),
                            last_activity: now(),
                        });
                        ctx.set_state.set(AuthState {
                            user: Some(user),
                            is_loading: false,
                        });
                        log::info!("[Auth] Session restored");
                    }
                    // 401 已经由 API 客户端触发强制登出
                    Err(ApiError::SessionExpired) => {}
                    Err(e) => {
                        log::warn!("[Auth] Cannot revalidate session: {}", e);
                        session.clear();
                        ctx.sign_out();
                    }
                }
            });
        }
    }
}

/// 登录并保存会话
///
/// 失败时返回可直接显示的错误信息。
pub async fn login(ctx: &AuthContext, api: &Api, username: &str, password: &str) -> Result<(), String> {
    let response = api
        .login(username, password)
        .await
        .map_err(|e| e.to_string())?;

    let user = SessionUser {
        id: response.user_id,
        username: response
            .username
            .unwrap_or_else(|| username.trim().to_string()),
        role: response.role,
    };
    let saved = browser_session().save(&Session {
        token: response.token,
        user: user.clone(),
        last_activity: now(),
    });
    if !saved {
        return Err("No se pudo guardar la sesión en el navegador.".into());
    }

    log::info!("[Auth] {} signed in as {}", user.username, user.role.as_str());
    ctx.set_state.set(AuthState {
        user: Some(user),
        is_loading: false,
    });
    Ok(())
}

/// 用户主动登出
///
/// 服务端登出尽力而为；本地状态无论如何都会清除。
pub async fn logout(ctx: &AuthContext, api: &Api) {
    if let Err(e) = api.logout().await {
        log::warn!("[Auth] Server logout failed: {}", e);
    }
    force_logout(ctx, LogoutReason::Manual);
}

/// 清除会话并回到登录页；可重复调用
///
/// 导航由路由服务的角色监听完成，这里只写入原因标记。
pub fn force_logout(ctx: &AuthContext, reason: LogoutReason) {
    browser_session().clear();
    activity::uninstall();
    barcode::stop();
    if ctx.state.with_untracked(|s| s.user.is_none()) {
        return;
    }
    log::info!("[Auth] Signed out ({:?})", reason);
    mark_login_redirect(reason);
    ctx.sign_out();
}

/// 有会话时监视不活动，超时后强制登出
pub fn watch_inactivity(ctx: AuthContext) {
    let session = browser_session();
    activity::install(
        CONFIG.inactivity_window(),
        move |at| {
            session.touch(at);
        },
        move || {
            // 不在定时器回调里拆除监视器
            spawn_local(async move {
                force_logout(&ctx, LogoutReason::Inactivity);
            });
        },
    );
}
