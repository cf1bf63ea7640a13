//! bobina 列表：筛选、分页、详情与编辑

use crate::auth::{use_api, use_auth};
use crate::components::feedback::{
    ErrorAlert, FieldError, Notice, NoticeToast, busy_label, notice_signal, sync_modal,
};
use crate::components::icons::*;
use crate::components::pagination::Pagination;
use crate::forms::photo_filename;
use crate::web::media::{photo_src, picked_file};
use crate::web::timer::now;
use bobinas_shared::date::{format_fecha, parse_fecha, query_fecha};
use bobinas_shared::{Bobina, BobinaFilter, FieldErrors, Page, RetentionStatus, Role, SortOrder};
use leptos::prelude::*;
use leptos::task::spawn_local;

/// 可以修改已登记 bobina 的角色
const EDITOR_ROLES: [Role; 2] = [Role::Admin, Role::Lider];

/// 剩余保留天数的状态徽章
#[component]
pub fn RetentionBadge(dias: Option<i64>) -> impl IntoView {
    let (class, text) = match RetentionStatus::from_days(dias) {
        RetentionStatus::Expired => ("badge badge-error", "Vencida".to_string()),
        RetentionStatus::ExpiringSoon => (
            "badge badge-warning",
            format!("{} días", dias.unwrap_or_default()),
        ),
        RetentionStatus::Active => (
            "badge badge-success",
            format!("{} días", dias.unwrap_or_default()),
        ),
        RetentionStatus::Unknown => ("badge badge-ghost", "Sin fecha".to_string()),
    };
    view! { <span class=class>{text}</span> }
}

fn update_filter(filter: RwSignal<BobinaFilter>, change: impl FnOnce(&mut BobinaFilter)) {
    filter.set(filter.get_untracked().with_change(change));
}

fn order_value(order: Option<SortOrder>) -> &'static str {
    order.map(|o| o.as_str()).unwrap_or("")
}

fn parse_order(value: &str) -> Option<SortOrder> {
    match value {
        "asc" => Some(SortOrder::Asc),
        "desc" => Some(SortOrder::Desc),
        _ => None,
    }
}

#[component]
pub fn BobinasPage() -> impl IntoView {
    let auth = use_auth();
    let api = use_api();

    let filter = RwSignal::new(BobinaFilter {
        page: 1,
        ..BobinaFilter::default()
    });
    let (page, set_page) = signal(Page::<Bobina>::default());
    let (loading, set_loading) = signal(true);
    let (clientes, set_clientes) = signal(Vec::<String>::new());
    let selected = RwSignal::new(None::<Bobina>);
    let notice = notice_signal();
    // 筛选快速变化时只采用最后一次请求的结果
    let request_seq = StoredValue::new(0u32);

    let can_edit = auth
        .state
        .with_untracked(|s| s.user.as_ref().is_some_and(|u| EDITOR_ROLES.contains(&u.role)));

    {
        let api = api.clone();
        spawn_local(async move {
            match api.list_clientes().await {
                Ok(list) => set_clientes.set(list),
                Err(e) => log::warn!("[Bobinas] clientes: {}", e),
            }
        });
    }

    // 筛选条件变化时重新加载
    Effect::new(move |_| {
        let current = filter.get();
        let seq = request_seq.get_value() + 1;
        request_seq.set_value(seq);
        set_loading.set(true);
        let api = api.clone();
        spawn_local(async move {
            let result = api.list_bobinas(&current).await;
            if request_seq.get_value() != seq {
                return;
            }
            match result {
                Ok(data) => set_page.set(data),
                Err(e) => notice.set(Some(Notice::error(format!("Error al cargar bobinas: {}", e)))),
            }
            set_loading.set(false);
        });
    });

    let on_saved = Callback::new(move |updated: Bobina| {
        set_page.update(|p| {
            if let Some(slot) = p.data.iter_mut().find(|b| b.id == updated.id) {
                *slot = updated.clone();
            }
        });
        selected.set(None);
        notice.set(Some(Notice::success("Bobina actualizada")));
    });

    view! {
        <NoticeToast notice=notice />

        <div class="card bg-base-100 shadow">
            <div class="card-body grid gap-4 md:grid-cols-5">
                <label class="input input-bordered flex items-center gap-2 md:col-span-2">
                    <Search attr:class="h-4 w-4 opacity-60" />
                    <input
                        type="search"
                        class="grow"
                        placeholder="Buscar por HU"
                        prop:value=move || filter.with(|f| f.search.clone())
                        on:change=move |ev| {
                            let value = event_target_value(&ev);
                            update_filter(filter, move |f| f.search = value);
                        }
                    />
                </label>
                <select
                    class="select select-bordered"
                    on:change=move |ev| {
                        let value = event_target_value(&ev);
                        update_filter(filter, move |f| f.cliente = value);
                    }
                >
                    <option value="" selected=move || filter.with(|f| f.cliente.is_empty())>"Todos los clientes"</option>
                    <For
                        each=move || clientes.get()
                        key=|c| c.clone()
                        children=move |cliente| {
                            let value = cliente.clone();
                            let label = cliente.clone();
                            view! {
                                <option value=cliente selected=move || filter.with(|f| f.cliente == value)>
                                    {label}
                                </option>
                            }
                        }
                    />
                </select>
                <input
                    type="date"
                    class="input input-bordered"
                    title="Embarque desde"
                    prop:value=move || filter.with(|f| f.fecha_inicio.map(query_fecha).unwrap_or_default())
                    on:change=move |ev| {
                        let value = parse_fecha(&event_target_value(&ev));
                        update_filter(filter, move |f| f.fecha_inicio = value);
                    }
                />
                <input
                    type="date"
                    class="input input-bordered"
                    title="Embarque hasta"
                    prop:value=move || filter.with(|f| f.fecha_fin.map(query_fecha).unwrap_or_default())
                    on:change=move |ev| {
                        let value = parse_fecha(&event_target_value(&ev));
                        update_filter(filter, move |f| f.fecha_fin = value);
                    }
                />
                <select
                    class="select select-bordered md:col-span-2"
                    prop:value=move || order_value(filter.with(|f| f.orden_dias))
                    on:change=move |ev| {
                        let value = parse_order(&event_target_value(&ev));
                        update_filter(filter, move |f| f.orden_dias = value);
                    }
                >
                    <option value="">"Orden: más recientes"</option>
                    <option value="asc">"Menos días restantes primero"</option>
                    <option value="desc">"Más días restantes primero"</option>
                </select>
                <button
                    class="btn btn-ghost md:col-start-5"
                    on:click=move |_| filter.set(BobinaFilter { page: 1, ..BobinaFilter::default() })
                >
                    "Limpiar filtros"
                </button>
            </div>
        </div>

        <Show when=move || loading.get() && page.with(|p| p.data.is_empty())>
            <div class="flex justify-center py-12">
                <span class="loading loading-spinner loading-lg text-primary"></span>
            </div>
        </Show>
        <Show when=move || !loading.get() && page.with(|p| p.data.is_empty())>
            <div class="text-center py-12 text-base-content/50">"No se encontraron bobinas."</div>
        </Show>

        <div class="grid gap-4 sm:grid-cols-2 lg:grid-cols-3 xl:grid-cols-4">
            <For
                each=move || page.get().data
                key=|b| (b.id, b.fecha_reemplazo.clone(), b.cliente.clone(), b.foto_url.clone())
                children=move |bobina| {
                    let open = bobina.clone();
                    view! { <BobinaCard bobina=bobina on_open=move |_: ()| selected.set(Some(open.clone())) /> }
                }
            />
        </div>

        <div class="card bg-base-100 shadow">
            <Pagination
                current=Signal::derive(move || page.with(|p| p.current_page))
                last=Signal::derive(move || page.with(|p| p.last_page))
                total=Signal::derive(move || page.with(|p| p.total))
                disabled=loading
                on_change=move |next: u32| filter.update(|f| f.page = next)
            />
        </div>

        <BobinaDialog selected=selected can_edit=can_edit on_saved=on_saved />
    }
}

#[component]
fn BobinaCard(bobina: Bobina, #[prop(into)] on_open: Callback<()>) -> impl IntoView {
    let photo = bobina.foto_url.as_deref().map(photo_src);
    let replaced = bobina.is_replaced();

    view! {
        <div class="card bg-base-100 shadow hover:shadow-lg cursor-pointer" on:click=move |_| on_open.run(())>
            <figure class="aspect-square bg-base-200">
                {match photo {
                    Some(src) => view! { <img src=src alt="foto" loading="lazy" class="object-cover w-full h-full" /> }.into_any(),
                    None => view! { <Camera attr:class="h-12 w-12 opacity-30" /> }.into_any(),
                }}
            </figure>
            <div class="card-body p-4 gap-1">
                <div class="flex items-center justify-between">
                    <span class="font-mono font-bold">{bobina.hu.clone()}</span>
                    <RetentionBadge dias=bobina.dias_restantes />
                </div>
                <span class="text-sm">{bobina.cliente.clone()}</span>
                <span class="text-xs text-base-content/60">
                    {bobina.fecha_embarque.as_deref().map(format_fecha).unwrap_or_default()}
                </span>
                {replaced.then(|| view! { <span class="badge badge-info badge-outline badge-sm">"Reemplazada"</span> })}
            </div>
        </div>
    }
}

/// 详情与编辑对话框
#[component]
fn BobinaDialog(
    selected: RwSignal<Option<Bobina>>,
    can_edit: bool,
    on_saved: Callback<Bobina>,
) -> impl IntoView {
    let api = use_api();
    let dialog_ref = NodeRef::<leptos::html::Dialog>::new();
    sync_modal(dialog_ref, Signal::derive(move || selected.with(Option::is_some)));

    let (cliente, set_cliente) = signal(String::new());
    let foto = RwSignal::new_local(None::<web_sys::File>);
    let (saving, set_saving) = signal(false);
    let (errors, set_errors) = signal(FieldErrors::default());
    let (error_msg, set_error_msg) = signal(Option::<String>::None);

    // 打开时用所选记录填充表单
    Effect::new(move |_| {
        if let Some(bobina) = selected.get() {
            set_cliente.set(bobina.cliente.clone());
            foto.set(None);
            set_errors.set(FieldErrors::default());
            set_error_msg.set(None);
        }
    });

    let close = move || {
        if !saving.get_untracked() {
            selected.set(None);
        }
    };

    let on_submit = move |ev: leptos::web_sys::SubmitEvent| {
        ev.prevent_default();
        let Some(bobina) = selected.get_untracked() else {
            return;
        };
        if saving.get_untracked() {
            return;
        }
        let value = cliente.get_untracked();
        if value.trim().is_empty() {
            set_errors.set(FieldErrors::single("cliente", "El cliente es obligatorio"));
            return;
        }
        let file = foto
            .get_untracked()
            .map(|f| (f, photo_filename(&bobina.hu, now())));

        set_saving.set(true);
        set_errors.set(FieldErrors::default());
        set_error_msg.set(None);
        let api = api.clone();
        spawn_local(async move {
            match api.update_bobina(bobina.id, &value, file).await {
                Ok(updated) => {
                    set_saving.set(false);
                    on_saved.run(updated);
                }
                Err(e) => {
                    if let Some(fields) = e.field_errors() {
                        set_errors.set(fields.clone());
                    }
                    set_error_msg.set(Some(e.to_string()));
                    set_saving.set(false);
                }
            }
        });
    };

    let detail = move || {
        selected.get().map(|bobina| {
            let photo = bobina.foto_url.as_deref().map(photo_src);
            view! {
                <div class="grid gap-4 md:grid-cols-2">
                    {photo.map(|src| view! { <img src=src alt="foto" class="rounded-box w-full aspect-square object-cover" /> })}
                    <div class="space-y-2 text-sm">
                        <p><span class="font-semibold">"HU: "</span><span class="font-mono">{bobina.hu.clone()}</span></p>
                        <p><span class="font-semibold">"Cliente: "</span>{bobina.cliente.clone()}</p>
                        <p>
                            <span class="font-semibold">"Embarque: "</span>
                            {bobina.fecha_embarque.as_deref().map(format_fecha).unwrap_or_default()}
                        </p>
                        <p><span class="font-semibold">"Retención: "</span><RetentionBadge dias=bobina.dias_restantes /></p>
                        {bobina.fecha_reemplazo.clone().map(|fecha| view! {
                            <div class="alert alert-info text-xs flex-col items-start gap-1">
                                <span>"Reemplazada el " {format_fecha(&fecha)}</span>
                                <span>"Reemplazó: " {bobina.reemplazador.clone().unwrap_or_default()}</span>
                                <span>"Aprobó: " {bobina.aprobador.clone().unwrap_or_default()}</span>
                            </div>
                        })}
                    </div>
                </div>
            }
        })
    };

    let actions = if can_edit {
        view! {
            <form on:submit=on_submit class="space-y-4 mt-6">
                <ErrorAlert message=error_msg />
                <div class="form-control">
                    <label for="edit_cliente" class="label">
                        <span class="label-text">"Cliente"</span>
                    </label>
                    <input id="edit_cliente"
                        type="text"
                        class="input input-bordered w-full"
                        prop:value=cliente
                        on:input=move |ev| set_cliente.set(event_target_value(&ev))
                    />
                    <FieldError errors=errors field="cliente" />
                </div>
                <div class="form-control">
                    <label for="edit_foto" class="label">
                        <span class="label-text">"Nueva foto (opcional)"</span>
                    </label>
                    <input id="edit_foto"
                        type="file"
                        accept="image/*"
                        class="file-input file-input-bordered w-full"
                        on:change=move |ev| foto.set(picked_file(&ev))
                    />
                    <FieldError errors=errors field="foto" />
                </div>
                <div class="modal-action">
                    <button type="button" class="btn btn-ghost" on:click=move |_| close()>"Cerrar"</button>
                    <button type="submit" disabled=move || saving.get() class="btn btn-primary">
                        {move || busy_label(saving.get(), "Guardar", "Guardando...")}
                    </button>
                </div>
            </form>
        }
        .into_any()
    } else {
        view! {
            <div class="modal-action">
                <button type="button" class="btn" on:click=move |_| close()>"Cerrar"</button>
            </div>
        }
        .into_any()
    };

    view! {
        <dialog class="modal" node_ref=dialog_ref on:close=move |_| close()>
            <div class="modal-box max-w-2xl">
                <h3 class="font-bold text-lg mb-4">"Detalle de bobina"</h3>
                {detail}

                {actions}
            </div>
            <form method="dialog" class="modal-backdrop">
                <button>"close"</button>
            </form>
        </dialog>
    }
}
