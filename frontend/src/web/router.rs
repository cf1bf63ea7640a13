//! 路由服务模块 - 核心引擎
//!
//! 封装了 web_sys 的 History API，实现高内聚：
//! 所有对 window.history 的操作都集中在此模块。
//! 实现了"监听 -> 验证 -> 处理 -> 加载"的导航流程。

use leptos::prelude::*;
use wasm_bindgen::prelude::*;

use super::route::AppRoute;
use crate::session::LogoutReason;
use bobinas_shared::Role;

/// 获取当前浏览器路径
fn current_path() -> String {
    web_sys::window()
        .and_then(|w| w.location().pathname().ok())
        .unwrap_or_else(|| "/".to_string())
}

/// 当前查询串（含 `?`）
pub fn current_search() -> String {
    web_sys::window()
        .and_then(|w| w.location().search().ok())
        .unwrap_or_default()
}

/// 推送 History 状态（内部工具函数）
fn push_history_state(path: &str) {
    if let Some(window) = web_sys::window() {
        if let Ok(history) = window.history() {
            let _ = history.push_state_with_url(&JsValue::NULL, "", Some(path));
        }
    }
}

/// 替换 History 状态（内部工具函数，用于重定向）
fn replace_history_state(path: &str) {
    if let Some(window) = web_sys::window() {
        if let Ok(history) = window.history() {
            let _ = history.replace_state_with_url(&JsValue::NULL, "", Some(path));
        }
    }
}

/// 登出前先把地址换成带原因标记的登录页
///
/// 随后角色变为 None，`setup_auth_redirect` 重定向到登录页时会保留这个查询串。
pub fn mark_login_redirect(reason: LogoutReason) {
    let path = AppRoute::login_path(reason);
    log::info!("[Router] Redirecting to login ({:?})", reason);
    replace_history_state(&path);
}

/// 路由器服务
///
/// 封装所有路由操作，通过 Signal 驱动界面更新。
/// 通过注入当前角色信号实现与认证系统的解耦。
#[derive(Clone, Copy)]
pub struct RouterService {
    /// 当前路由（只读信号）
    current_route: ReadSignal<AppRoute>,
    /// 设置当前路由（写入信号）
    set_route: WriteSignal<AppRoute>,
    /// 当前登录用户的角色，未登录为 None（注入的信号，实现解耦）
    role: Signal<Option<Role>>,
}

impl RouterService {
    /// 创建新的路由服务
    fn new(role: Signal<Option<Role>>) -> Self {
        // 1. 初始化当前路由（从 URL 解析）
        let path = current_path();
        let initial_route = AppRoute::from_path(&path);
        let (current_route, set_route) = signal(initial_route);

        Self {
            current_route,
            set_route,
            role,
        }
    }

    /// 获取当前路由信号
    pub fn current_route(&self) -> ReadSignal<AppRoute> {
        self.current_route
    }

    /// **核心方法：导航与守卫**
    ///
    /// 流程：请求 -> 验证(Guard) -> 处理 -> 加载
    pub fn go(&self, target_route: AppRoute) {
        let role = self.role.get_untracked();

        // --- Step 1: 验证目标路由 ---
        let resolved = target_route.guard(role);
        if resolved != target_route {
            log::info!(
                "[Router] {} not available for {:?}, redirecting to {}",
                target_route,
                role,
                resolved
            );
            push_history_state(resolved.to_path());
            self.set_route.set(resolved);
            return;
        }

        // --- Step 2: 加载页面 (更新状态) ---
        push_history_state(target_route.to_path());
        self.set_route.set(target_route);
    }

    /// 初始化浏览器后退/前进按钮监听
    fn init_popstate_listener(&self) {
        let set_route = self.set_route;
        let role = self.role;

        let closure = Closure::<dyn Fn()>::new(move || {
            let target_route = AppRoute::from_path(&current_path());
            // popstate 时也执行守卫逻辑
            let resolved = target_route.guard(role.get_untracked());
            if resolved != target_route {
                replace_history_state(resolved.to_path());
            }
            set_route.set(resolved);
        });

        if let Some(window) = web_sys::window() {
            let _ = window
                .add_event_listener_with_callback("popstate", closure.as_ref().unchecked_ref());
        }

        // 泄漏闭包以保持监听器存活
        closure.forget();
    }

    /// 设置登录状态变化时的自动重定向
    fn setup_auth_redirect(&self) {
        let current_route = self.current_route;
        let set_route = self.set_route;
        let role = self.role;

        // 使用 Effect 监听角色变化（登录 / 登出 / 会话恢复）
        Effect::new(move |_| {
            let role = role.get();
            let route = current_route.get_untracked();
            let resolved = match role {
                // 强制登出时地址已经被换成登录页
                None if AppRoute::from_path(&current_path()) == AppRoute::Login => AppRoute::Login,
                _ => route.guard(role),
            };
            if resolved == route {
                return;
            }
            // 登出时保留地址中的原因标记
            if resolved == AppRoute::Login {
                let search = current_search();
                replace_history_state(&format!("{}{}", resolved.to_path(), search));
            } else {
                push_history_state(resolved.to_path());
            }
            set_route.set(resolved);
            log::info!("[Router] Auth state changed, now at {}", resolved);
        });
    }
}

/// 提供路由服务到 Context 并初始化
fn provide_router(role: Signal<Option<Role>>) -> RouterService {
    let router = RouterService::new(role);

    // 初始化监听器
    router.init_popstate_listener();
    router.setup_auth_redirect();

    provide_context(router);
    router
}

/// 从 Context 获取路由服务
pub fn use_router() -> RouterService {
    use_context::<RouterService>()
        .expect("RouterService not found in context. Ensure Router is provided.")
}

// ============================================================================
// UI 组件
// ============================================================================

/// 路由器根组件
///
/// 提供路由上下文，应在 App 根部使用。
#[component]
pub fn Router(
    /// 当前角色信号
    role: Signal<Option<Role>>,
    /// 子组件
    children: Children,
) -> impl IntoView {
    // 提供路由服务到 Context
    provide_router(role);

    children()
}

/// 路由出口组件
///
/// 根据当前路由状态渲染对应的组件。
#[component]
pub fn RouterOutlet(
    /// 路由匹配函数：接收当前路由，返回对应视图
    matcher: fn(AppRoute) -> AnyView,
) -> impl IntoView {
    let router = use_router();

    move || {
        let current = router.current_route().get();
        matcher(current)
    }
}

/// 站内链接，点击时走路由服务而不是整页跳转
#[component]
pub fn Link(
    route: AppRoute,
    #[prop(optional, into)] class: String,
    children: Children,
) -> impl IntoView {
    let router = use_router();
    let on_click = move |ev: web_sys::MouseEvent| {
        ev.prevent_default();
        router.go(route);
    };

    view! {
        <a href=route.to_path() class=class on:click=on_click>
            {children()}
        </a>
    }
}
