use crate::auth::{use_api, use_auth};
use crate::components::bobinas::RetentionBadge;
use crate::components::feedback::{Notice, NoticeToast, notice_signal};
use crate::components::icons::*;
use crate::web::route::AppRoute;
use crate::web::router::Link;
use bobinas_shared::date::format_fecha;
use bobinas_shared::{Bobina, BobinaFilter, Role, RetentionStatus, SortOrder};
use leptos::prelude::*;
use leptos::task::spawn_local;

/// 首页上显示的即将到期记录数
const UPCOMING_LIMIT: usize = 5;

#[derive(Debug, Clone, Default)]
struct Stats {
    bobinas: Option<u64>,
    /// 按剩余天数升序的第一页中已到期或即将到期的记录
    upcoming: Vec<Bobina>,
    configs: Option<usize>,
    users: Option<u64>,
}

#[component]
pub fn DashboardPage() -> impl IntoView {
    let auth = use_auth();
    let api = use_api();

    let (stats, set_stats) = signal(Stats::default());
    let (loading, set_loading) = signal(true);
    let notice = notice_signal();

    let role = move || auth.state.with(|s| s.user.as_ref().map(|u| u.role));

    let load_stats = move || {
        let Some(role) = role() else {
            return;
        };
        let api = api.clone();
        set_loading.set(true);
        spawn_local(async move {
            let mut next = Stats::default();
            let filter = BobinaFilter {
                orden_dias: Some(SortOrder::Asc),
                ..BobinaFilter::default()
            };
            match api.list_bobinas(&filter).await {
                Ok(page) => {
                    next.bobinas = Some(page.total);
                    next.upcoming = page
                        .data
                        .into_iter()
                        .filter(|b| {
                            !b.is_replaced()
                                && matches!(
                                    b.retention_status(),
                                    RetentionStatus::Expired | RetentionStatus::ExpiringSoon
                                )
                        })
                        .take(UPCOMING_LIMIT)
                        .collect();
                }
                Err(e) => notice.set(Some(Notice::error(format!("Error al cargar bobinas: {}", e)))),
            }
            if AppRoute::Configuraciones.allows(role) {
                match api.list_configs().await {
                    Ok(configs) => next.configs = Some(configs.len()),
                    Err(e) => log::warn!("[Dashboard] configs: {}", e),
                }
            }
            if AppRoute::Usuarios.allows(role) {
                match api.list_users(1).await {
                    Ok(page) => next.users = Some(page.total),
                    Err(e) => log::warn!("[Dashboard] users: {}", e),
                }
            }
            set_stats.set(next);
            set_loading.set(false);
        });
    };

    // 初始加载
    load_stats();

    let count = |value: Option<u64>| value.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string());

    let greeting = move || {
        auth.state
            .with(|s| s.user.as_ref().map(|u| format!("Hola, {}", u.username)))
            .unwrap_or_default()
    };

    let shortcuts = move || {
        role()
            .map(|role| {
                [AppRoute::RegistrarBobina, AppRoute::Inventario]
                    .into_iter()
                    .filter(|route| route.allows(role))
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default()
    };

    view! {
        <NoticeToast notice=notice />

        <div class="flex items-center justify-between">
            <div>
                <h2 class="text-2xl font-bold">{greeting}</h2>
                <p class="text-base-content/70 text-sm">
                    {move || role().map(|r| r.label()).unwrap_or_default()}
                </p>
            </div>
            <button on:click=move |_| load_stats() disabled=move || loading.get() class="btn btn-ghost btn-circle">
                <RefreshCw attr:class=move || if loading.get() { "h-5 w-5 animate-spin" } else { "h-5 w-5" } />
            </button>
        </div>

        <Show when=move || role() == Some(Role::Embarcador)>
            <div class="alert alert-info">
                <PackagePlus attr:class="h-6 w-6" />
                <span>"Registre cada bobina con su HU, cliente y una foto antes del embarque."</span>
            </div>
        </Show>

        <div class="stats shadow w-full stats-vertical md:stats-horizontal bg-base-100">
            <div class="stat">
                <div class="stat-figure text-primary">
                    <Package attr:class="h-8 w-8" />
                </div>
                <div class="stat-title">"Bobinas registradas"</div>
                <div class="stat-value text-primary">{move || count(stats.get().bobinas)}</div>
            </div>

            <div class="stat">
                <div class="stat-figure text-warning">
                    <AlertTriangle attr:class="h-8 w-8" />
                </div>
                <div class="stat-title">"Por vencer (7 días)"</div>
                <div class="stat-value text-warning">{move || stats.with(|s| s.upcoming.len())}</div>
            </div>

            <Show when=move || stats.with(|s| s.configs.is_some())>
                <div class="stat">
                    <div class="stat-figure text-secondary">
                        <Settings attr:class="h-8 w-8" />
                    </div>
                    <div class="stat-title">"Reglas de retención"</div>
                    <div class="stat-value text-secondary">
                        {move || count(stats.get().configs.map(|c| c as u64))}
                    </div>
                </div>
            </Show>

            <Show when=move || stats.with(|s| s.users.is_some())>
                <div class="stat">
                    <div class="stat-figure text-accent">
                        <Users attr:class="h-8 w-8" />
                    </div>
                    <div class="stat-title">"Usuarios"</div>
                    <div class="stat-value text-accent">{move || count(stats.get().users)}</div>
                </div>
            </Show>
        </div>

        <div class="flex flex-wrap gap-2">
            <For
                each=shortcuts
                key=|route| *route
                children=move |route| {
                    view! {
                        <Link route=route class="btn btn-primary btn-outline gap-2">
                            <Plus attr:class="h-4 w-4" />
                            {route.title()}
                        </Link>
                    }
                }
            />
        </div>

        <div class="card bg-base-100 shadow-xl">
            <div class="card-body p-0">
                <div class="p-6 pb-2">
                    <h3 class="card-title">"Próximas a vencer"</h3>
                    <p class="text-base-content/70 text-sm">"Bobinas con menos días de retención restantes."</p>
                </div>
                <div class="overflow-x-auto w-full">
                    <table class="table table-zebra w-full">
                        <thead>
                            <tr>
                                <th>"HU"</th>
                                <th>"Cliente"</th>
                                <th class="hidden md:table-cell">"Embarque"</th>
                                <th>"Retención"</th>
                            </tr>
                        </thead>
                        <tbody>
                            <Show when=move || !loading.get() && stats.with(|s| s.upcoming.is_empty())>
                                <tr>
                                    <td colspan="4" class="text-center py-8 text-base-content/50">
                                        "No hay bobinas por vencer."
                                    </td>
                                </tr>
                            </Show>
                            <For
                                each=move || stats.get().upcoming
                                key=|b| b.id
                                children=move |bobina| {
                                    view! {
                                        <tr>
                                            <td class="font-mono">{bobina.hu.clone()}</td>
                                            <td>{bobina.cliente.clone()}</td>
                                            <td class="hidden md:table-cell">
                                                {bobina.fecha_embarque.as_deref().map(format_fecha).unwrap_or_default()}
                                            </td>
                                            <td><RetentionBadge dias=bobina.dias_restantes /></td>
                                        </tr>
                                    }
                                }
                            />
                        </tbody>
                    </table>
                </div>
            </div>
        </div>
    }
}
