//! Bobinas 前端应用
//!
//! 采用 Context-Driven 的高内聚低耦合架构：
//! - `web::route`: 路由定义与角色权限（领域模型）
//! - `web::router`: 路由服务（核心引擎）
//! - `auth`: 认证状态与会话生命周期
//! - `api` / `session` / `capture` / `replacement` / `forms`: 不依赖 DOM 的逻辑，可在主机上测试
//! - `components`: UI 组件层

mod api;
mod auth;
mod capture;
pub mod config;
mod forms;
mod media_url;
mod replacement;
mod serde_helper;
mod session;

mod components {
    pub mod bobinas;
    pub mod camera_dialog;
    pub mod configs;
    pub mod dashboard;
    pub mod feedback;
    pub mod icons;
    pub mod inventory;
    pub mod layout;
    pub mod login;
    pub mod pagination;
    pub mod registrar_bobina;
    pub mod scanner_dialog;
    pub mod users;
}

use crate::auth::{AuthContext, build_api, init_auth, watch_inactivity};
use crate::components::bobinas::BobinasPage;
use crate::components::configs::ConfigsPage;
use crate::components::dashboard::DashboardPage;
use crate::components::inventory::InventoryPage;
use crate::components::layout::Shell;
use crate::components::login::LoginPage;
use crate::components::registrar_bobina::RegistrarBobinaPage;
use crate::components::users::UsersPage;

use leptos::prelude::*;

// 浏览器 API 封装模块
// 纯逻辑模块（session、capture、api）通过 trait 使用这里的实现。
pub(crate) mod web {
    pub mod activity;
    pub mod barcode;
    pub mod http;
    pub mod media;
    pub mod route;
    pub mod router;
    pub mod storage;
    pub mod timer;
}

use web::route::AppRoute;
use web::router::{Link, Router, RouterOutlet};

/// 路由匹配函数
///
/// 根据 AppRoute 枚举返回对应的视图组件；受保护页面包在 `Shell` 中。
fn route_matcher(route: AppRoute) -> AnyView {
    let page = match route {
        AppRoute::Login => return view! { <LoginPage /> }.into_any(),
        AppRoute::NotFound => return not_found(),
        AppRoute::Dashboard => view! { <DashboardPage /> }.into_any(),
        AppRoute::Bobinas => view! { <BobinasPage /> }.into_any(),
        AppRoute::RegistrarBobina => view! { <RegistrarBobinaPage /> }.into_any(),
        AppRoute::Usuarios => view! { <UsersPage /> }.into_any(),
        AppRoute::Configuraciones => view! { <ConfigsPage /> }.into_any(),
        AppRoute::Inventario => view! { <InventoryPage /> }.into_any(),
    };
    view! { <Shell>{page}</Shell> }.into_any()
}

fn not_found() -> AnyView {
    view! {
        <div class="flex items-center justify-center min-h-screen bg-base-200">
            <div class="text-center">
                <h1 class="text-6xl font-bold text-error">"404"</h1>
                <p class="text-xl mt-4">"Página no encontrada"</p>
                <Link route=AppRoute::Login class="btn btn-primary mt-6">"Volver al inicio"</Link>
            </div>
        </div>
    }
    .into_any()
}

#[component]
pub fn App() -> impl IntoView {
    // 1. 创建认证上下文与 API 客户端
    let auth_ctx = AuthContext::new();
    provide_context(auth_ctx);
    let api = build_api(auth_ctx);
    provide_context(api.clone());

    // 2. 从 LocalStorage 恢复会话
    init_auth(&auth_ctx, &api);

    // 3. 登录期间监视不活动
    let signed_in = Memo::new(move |_| auth_ctx.state.with(|s| s.user.is_some()));
    Effect::new(move |_| {
        if signed_in.get() {
            watch_inactivity(auth_ctx);
        } else {
            web::activity::uninstall();
        }
    });

    view! {
        // 4. 路由器组件：注入角色信号实现守卫
        <Router role=auth_ctx.role_signal()>
            <RouterOutlet matcher=route_matcher />
        </Router>
    }
}
