//! 已登录页面的外壳：侧边栏（按角色过滤）与顶部栏

use crate::auth::{logout, use_api, use_auth};
use crate::components::icons::*;
use crate::web::route::AppRoute;
use crate::web::router::{Link, use_router};
use leptos::prelude::*;
use leptos::task::spawn_local;

fn nav_icon(route: AppRoute) -> AnyView {
    match route {
        AppRoute::Dashboard => view! { <LayoutDashboard attr:class="h-5 w-5" /> }.into_any(),
        AppRoute::RegistrarBobina => view! { <PackagePlus attr:class="h-5 w-5" /> }.into_any(),
        AppRoute::Bobinas => view! { <Package attr:class="h-5 w-5" /> }.into_any(),
        AppRoute::Inventario => view! { <ClipboardList attr:class="h-5 w-5" /> }.into_any(),
        AppRoute::Configuraciones => view! { <Settings attr:class="h-5 w-5" /> }.into_any(),
        AppRoute::Usuarios => view! { <Users attr:class="h-5 w-5" /> }.into_any(),
        _ => ().into_any(),
    }
}

#[component]
pub fn Shell(children: Children) -> impl IntoView {
    let auth = use_auth();
    let api = use_api();
    let router = use_router();
    let (logging_out, set_logging_out) = signal(false);

    let user = move || auth.state.get().user;
    let navigation = move || {
        auth.state
            .with(|s| s.user.as_ref().map(|u| AppRoute::navigation_for(u.role)))
            .unwrap_or_default()
    };

    let on_logout = move |_| {
        if logging_out.get_untracked() {
            return;
        }
        set_logging_out.set(true);
        let api = api.clone();
        spawn_local(async move {
            logout(&auth, &api).await;
            set_logging_out.set(false);
        });
    };

    view! {
        <div class="drawer lg:drawer-open">
            <input id="app-drawer" type="checkbox" class="drawer-toggle" />
            <div class="drawer-content flex flex-col min-h-screen bg-base-200">
                <div class="navbar bg-base-100 shadow-sm sticky top-0 z-30">
                    <div class="flex-none lg:hidden">
                        <label for="app-drawer" aria-label="abrir menú" class="btn btn-square btn-ghost">
                            <Menu attr:class="h-5 w-5" />
                        </label>
                    </div>
                    <div class="flex-1">
                        <span class="text-lg font-semibold px-2">
                            {move || router.current_route().get().title()}
                        </span>
                    </div>
                    <div class="flex-none gap-2 items-center">
                        {move || user().map(|u| view! {
                            <div class="hidden sm:flex flex-col items-end leading-tight mr-2">
                                <span class="font-medium">{u.username.clone()}</span>
                                <span class="text-xs text-base-content/60">{u.role.label()}</span>
                            </div>
                        })}
                        <button
                            on:click=on_logout
                            disabled=move || logging_out.get()
                            class="btn btn-outline btn-error btn-sm gap-2"
                        >
                            <LogOut attr:class="h-4 w-4" /> "Salir"
                        </button>
                    </div>
                </div>
                <main class="p-4 md:p-8 flex-1">
                    <div class="max-w-7xl mx-auto space-y-6">{children()}</div>
                </main>
            </div>
            <div class="drawer-side z-40">
                <label for="app-drawer" aria-label="cerrar menú" class="drawer-overlay"></label>
                <aside class="bg-base-100 min-h-full w-64 flex flex-col">
                    <div class="flex items-center gap-2 p-4 border-b border-base-200">
                        <Package attr:class="h-6 w-6 text-primary" />
                        <span class="text-xl font-bold">"Bobinas"</span>
                    </div>
                    <ul class="menu p-4 gap-1 w-full">
                        <For
                            each=navigation
                            key=|route| *route
                            children=move |route| {
                                // 路由变化时整个页面会重新渲染
                                let class = if router.current_route().get_untracked() == route {
                                    "active"
                                } else {
                                    ""
                                };
                                view! {
                                    <li>
                                        <Link route=route class=class>
                                            {nav_icon(route)}
                                            {route.title()}
                                        </Link>
                                    </li>
                                }
                            }
                        />
                    </ul>
                </aside>
            </div>
        </div>
    }
}
