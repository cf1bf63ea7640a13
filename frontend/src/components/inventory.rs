//! 库存目录：搜索、分页、增删改，以及扫码登记
//!
//! 扫码结果不限格式，交给 `POST /inventario/scan`，返回已有或新登记的条目。

use crate::auth::use_api;
use crate::components::feedback::{
    ConfirmDialog, ErrorAlert, FieldError, Notice, NoticeToast, busy_label, notice_signal, sync_modal,
};
use crate::components::icons::*;
use crate::components::pagination::Pagination;
use crate::components::scanner_dialog::ScannerDialog;
use crate::forms::InventoryDraft;
use bobinas_shared::{AcceptanceRule, FieldErrors, InventoryItem, Page};
use leptos::prelude::*;
use leptos::task::spawn_local;

#[component]
pub fn InventoryPage() -> impl IntoView {
    let api = use_api();

    let (search, set_search) = signal(String::new());
    let (page_no, set_page_no) = signal(1u32);
    let (page, set_page) = signal(Page::<InventoryItem>::default());
    let (loading, set_loading) = signal(true);
    let (reload, set_reload) = signal(0u32);
    let request_seq = StoredValue::new(0u32);
    let notice = notice_signal();

    let form_target = RwSignal::new(None::<Option<InventoryItem>>);
    let deleting = RwSignal::new(None::<InventoryItem>);
    let (delete_busy, set_delete_busy) = signal(false);
    let scanner_open = RwSignal::new(false);
    let (scanning, set_scanning) = signal(false);
    // 最近一次扫码得到的条目，在表格中高亮
    let (highlight, set_highlight) = signal(None::<u64>);

    {
        let api = api.clone();
        Effect::new(move |_| {
            let term = search.get();
            let page_no = page_no.get();
            reload.track();
            let seq = request_seq.get_value() + 1;
            request_seq.set_value(seq);
            set_loading.set(true);
            let api = api.clone();
            spawn_local(async move {
                let result = api.list_inventory(&term, page_no).await;
                if request_seq.get_value() != seq {
                    return;
                }
                match result {
                    Ok(data) => set_page.set(data),
                    Err(e) => notice.set(Some(Notice::error(format!("Error al cargar inventario: {}", e)))),
                }
                set_loading.set(false);
            });
        });
    }

    let on_saved = Callback::new(move |item: InventoryItem| {
        form_target.set(None);
        notice.set(Some(Notice::success(format!("Artículo {} guardado", item.hu))));
        set_reload.update(|n| *n += 1);
    });

    let on_scan = {
        let api = api.clone();
        move |code: String| {
            scanner_open.set(false);
            set_scanning.set(true);
            let api = api.clone();
            spawn_local(async move {
                match api.scan_inventory(&code).await {
                    Ok(item) => {
                        notice.set(Some(Notice::success(format!("Artículo {} registrado", item.hu))));
                        set_highlight.set(Some(item.id));
                        // 只显示扫到的条目
                        set_page_no.set(1);
                        set_search.set(item.hu);
                        set_reload.update(|n| *n += 1);
                    }
                    Err(e) => notice.set(Some(Notice::error(format!("No se pudo registrar {}: {}", code, e)))),
                }
                set_scanning.set(false);
            });
        }
    };

    let on_confirm_delete = move |_: ()| {
        let Some(item) = deleting.get_untracked() else {
            return;
        };
        if delete_busy.get_untracked() {
            return;
        }
        set_delete_busy.set(true);
        let api = api.clone();
        spawn_local(async move {
            match api.delete_inventory_item(item.id).await {
                Ok(()) => {
                    notice.set(Some(Notice::success(format!("Artículo {} eliminado", item.hu))));
                    let last_on_page = page.with_untracked(|p| p.data.len() == 1 && p.current_page > 1);
                    if last_on_page {
                        set_page_no.update(|n| *n -= 1);
                    } else {
                        set_reload.update(|n| *n += 1);
                    }
                }
                Err(e) => notice.set(Some(Notice::error(format!("No se pudo eliminar: {}", e)))),
            }
            set_delete_busy.set(false);
            deleting.set(None);
        });
    };

    view! {
        <NoticeToast notice=notice />

        <div class="flex flex-col md:flex-row gap-2 md:items-center justify-between">
            <label class="input input-bordered flex items-center gap-2 md:w-96">
                <Search attr:class="h-4 w-4 opacity-60" />
                <input
                    type="search"
                    class="grow"
                    placeholder="Buscar código o descripción"
                    prop:value=search
                    on:change=move |ev| {
                        set_highlight.set(None);
                        set_page_no.set(1);
                        set_search.set(event_target_value(&ev));
                    }
                />
            </label>
            <div class="flex gap-2">
                <button
                    class="btn btn-secondary gap-2"
                    disabled=move || scanning.get()
                    on:click=move |_| scanner_open.set(true)
                >
                    <ScanLine attr:class="h-4 w-4" />
                    {move || busy_label(scanning.get(), "Escanear", "Registrando...")}
                </button>
                <button class="btn btn-primary gap-2" on:click=move |_| form_target.set(Some(None))>
                    <Plus attr:class="h-4 w-4" />
                    "Nuevo artículo"
                </button>
            </div>
        </div>

        <div class="card bg-base-100 shadow-xl">
            <div class="overflow-x-auto w-full">
                <table class="table w-full">
                    <thead>
                        <tr>
                            <th>"Código"</th>
                            <th>"Descripción"</th>
                            <th class="text-right">"Acciones"</th>
                        </tr>
                    </thead>
                    <tbody>
                        <Show when=move || !loading.get() && page.with(|p| p.data.is_empty())>
                            <tr>
                                <td colspan="3" class="text-center py-8 text-base-content/50">"Sin artículos."</td>
                            </tr>
                        </Show>
                        <For
                            each=move || page.get().data
                            key=|item| (item.id, item.hu.clone(), item.descripcion.clone())
                            children=move |item| {
                                let id = item.id;
                                let edit = item.clone();
                                let remove = item.clone();
                                view! {
                                    <tr class=move || if highlight.get() == Some(id) { "bg-success/20" } else { "" }>
                                        <td class="font-mono">{item.hu.clone()}</td>
                                        <td>{item.descripcion.clone().unwrap_or_default()}</td>
                                        <td class="text-right space-x-1">
                                            <button
                                                class="btn btn-ghost btn-sm btn-square"
                                                title="Editar"
                                                on:click=move |_| form_target.set(Some(Some(edit.clone())))
                                            >
                                                <Pencil attr:class="h-4 w-4" />
                                            </button>
                                            <button
                                                class="btn btn-ghost btn-sm btn-square text-error"
                                                title="Eliminar"
                                                on:click=move |_| deleting.set(Some(remove.clone()))
                                            >
                                                <Trash2 attr:class="h-4 w-4" />
                                            </button>
                                        </td>
                                    </tr>
                                }
                            }
                        />
                    </tbody>
                </table>
            </div>
            <Pagination
                current=Signal::derive(move || page.with(|p| p.current_page))
                last=Signal::derive(move || page.with(|p| p.last_page))
                total=Signal::derive(move || page.with(|p| p.total))
                disabled=loading
                on_change=move |next: u32| set_page_no.set(next)
            />
        </div>

        <InventoryFormDialog target=form_target on_saved=on_saved />

        <ScannerDialog
            open=scanner_open
            rule=AcceptanceRule::INVENTORY_SERIAL
            title="Escanear artículo"
            on_scan=on_scan
            on_close=move |_: ()| scanner_open.set(false)
        />

        <ConfirmDialog
            open=Signal::derive(move || deleting.with(Option::is_some))
            title="Eliminar artículo"
            message=Signal::derive(move || {
                deleting
                    .with(|i| i.as_ref().map(|i| format!("¿Eliminar el artículo {}?", i.hu)))
                    .unwrap_or_default()
            })
            busy=delete_busy
            on_confirm=on_confirm_delete
            on_cancel=move |_: ()| deleting.set(None)
        />
    }
}

#[component]
fn InventoryFormDialog(
    target: RwSignal<Option<Option<InventoryItem>>>,
    on_saved: Callback<InventoryItem>,
) -> impl IntoView {
    let api = use_api();
    let dialog_ref = NodeRef::<leptos::html::Dialog>::new();
    sync_modal(dialog_ref, Signal::derive(move || target.with(Option::is_some)));

    let draft = RwSignal::new(InventoryDraft::default());
    let (saving, set_saving) = signal(false);
    let (errors, set_errors) = signal(FieldErrors::default());
    let (error_msg, set_error_msg) = signal(Option::<String>::None);

    let editing_id = move || target.with(|t| t.as_ref().and_then(|i| i.as_ref().map(|i| i.id)));

    Effect::new(move |_| {
        if let Some(item) = target.get() {
            draft.set(item.as_ref().map(InventoryDraft::from).unwrap_or_default());
            set_errors.set(FieldErrors::default());
            set_error_msg.set(None);
        }
    });

    let close = move || {
        if !saving.get_untracked() {
            target.set(None);
        }
    };

    let on_submit = move |ev: leptos::web_sys::SubmitEvent| {
        ev.prevent_default();
        if saving.get_untracked() {
            return;
        }
        let payload = match draft.with_untracked(InventoryDraft::validate) {
            Ok(payload) => payload,
            Err(fields) => {
                set_errors.set(fields);
                return;
            }
        };
        let id = editing_id();
        set_saving.set(true);
        set_errors.set(FieldErrors::default());
        set_error_msg.set(None);
        let api = api.clone();
        spawn_local(async move {
            let result = match id {
                Some(id) => api.update_inventory_item(id, &payload).await,
                None => api.create_inventory_item(&payload).await,
            };
            set_saving.set(false);
            match result {
                Ok(item) => on_saved.run(item),
                Err(e) => {
                    if let Some(fields) = e.field_errors() {
                        set_errors.set(fields.clone());
                    }
                    set_error_msg.set(Some(e.to_string()));
                }
            }
        });
    };

    view! {
        <dialog class="modal" node_ref=dialog_ref on:close=move |_| close()>
            <div class="modal-box">
                <h3 class="font-bold text-lg mb-4">
                    {move || if editing_id().is_some() { "Editar artículo" } else { "Nuevo artículo" }}
                </h3>
                <form class="space-y-4" on:submit=on_submit>
                    <ErrorAlert message=error_msg />
                    <div class="form-control">
                        <label for="item_hu" class="label">
                            <span class="label-text">"Código"</span>
                        </label>
                        <input
                            id="item_hu"
                            type="text"
                            autocomplete="off"
                            class="input input-bordered w-full font-mono"
                            prop:value=move || draft.with(|d| d.hu.clone())
                            on:input=move |ev| draft.update(|d| d.hu = event_target_value(&ev))
                        />
                        <FieldError errors=errors field="hu" />
                    </div>
                    <div class="form-control">
                        <label for="item_descripcion" class="label">
                            <span class="label-text">"Descripción"</span>
                        </label>
                        <textarea
                            id="item_descripcion"
                            class="textarea textarea-bordered w-full"
                            prop:value=move || draft.with(|d| d.descripcion.clone())
                            on:input=move |ev| draft.update(|d| d.descripcion = event_target_value(&ev))
                        ></textarea>
                        <FieldError errors=errors field="descripcion" />
                    </div>
                    <div class="modal-action">
                        <button type="button" class="btn btn-ghost" on:click=move |_| close()>"Cancelar"</button>
                        <button type="submit" class="btn btn-primary" disabled=move || saving.get()>
                            {move || busy_label(saving.get(), "Guardar", "Guardando...")}
                        </button>
                    </div>
                </form>
            </div>
        </dialog>
    }
}
