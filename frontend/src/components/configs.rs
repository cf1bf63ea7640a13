//! 保留规则：每个客户一条，没有规则的客户使用默认天数

use crate::auth::use_api;
use crate::components::feedback::{
    ConfirmDialog, ErrorAlert, FieldError, Notice, NoticeToast, busy_label, notice_signal, sync_modal,
};
use crate::components::icons::*;
use crate::config::CONFIG;
use crate::forms::ConfigDraft;
use bobinas_shared::date::format_fecha;
use bobinas_shared::{FieldErrors, RetentionConfig};
use leptos::prelude::*;
use leptos::task::spawn_local;

#[component]
pub fn ConfigsPage() -> impl IntoView {
    let api = use_api();

    let (configs, set_configs) = signal(Vec::<RetentionConfig>::new());
    let (loading, set_loading) = signal(true);
    let (reload, set_reload) = signal(0u32);
    let notice = notice_signal();

    let form_target = RwSignal::new(None::<Option<RetentionConfig>>);
    let deleting = RwSignal::new(None::<RetentionConfig>);
    let (delete_busy, set_delete_busy) = signal(false);

    {
        let api = api.clone();
        Effect::new(move |_| {
            reload.track();
            set_loading.set(true);
            let api = api.clone();
            spawn_local(async move {
                match api.list_configs().await {
                    Ok(mut list) => {
                        list.sort_by(|a, b| a.cliente.to_lowercase().cmp(&b.cliente.to_lowercase()));
                        set_configs.set(list);
                    }
                    Err(e) => notice.set(Some(Notice::error(format!("Error al cargar configuraciones: {}", e)))),
                }
                set_loading.set(false);
            });
        });
    }

    let on_saved = Callback::new(move |config: RetentionConfig| {
        form_target.set(None);
        notice.set(Some(Notice::success(format!("Regla de {} guardada", config.cliente))));
        set_reload.update(|n| *n += 1);
    });

    let on_confirm_delete = move |_: ()| {
        let Some(config) = deleting.get_untracked() else {
            return;
        };
        if delete_busy.get_untracked() {
            return;
        }
        set_delete_busy.set(true);
        let api = api.clone();
        spawn_local(async move {
            match api.delete_config(config.id).await {
                Ok(()) => {
                    set_configs.update(|list| list.retain(|c| c.id != config.id));
                    notice.set(Some(Notice::success(format!("Regla de {} eliminada", config.cliente))));
                }
                Err(e) => notice.set(Some(Notice::error(format!("No se pudo eliminar: {}", e)))),
            }
            set_delete_busy.set(false);
            deleting.set(None);
        });
    };

    view! {
        <NoticeToast notice=notice />

        <div class="flex flex-col sm:flex-row sm:items-center justify-between gap-2">
            <p class="text-sm text-base-content/70">
                {format!(
                    "Los clientes sin regla usan la retención por defecto de {} días.",
                    CONFIG.default_retention_days,
                )}
            </p>
            <button class="btn btn-primary gap-2" on:click=move |_| form_target.set(Some(None))>
                <Plus attr:class="h-4 w-4" />
                "Nueva regla"
            </button>
        </div>

        <div class="card bg-base-100 shadow-xl">
            <div class="overflow-x-auto w-full">
                <table class="table table-zebra w-full">
                    <thead>
                        <tr>
                            <th>"Cliente"</th>
                            <th>"Días de retención"</th>
                            <th class="hidden md:table-cell">"Actualizado"</th>
                            <th class="text-right">"Acciones"</th>
                        </tr>
                    </thead>
                    <tbody>
                        <Show when=move || loading.get() && configs.with(Vec::is_empty)>
                            <tr>
                                <td colspan="4" class="text-center py-8">
                                    <span class="loading loading-spinner text-primary"></span>
                                </td>
                            </tr>
                        </Show>
                        <Show when=move || !loading.get() && configs.with(Vec::is_empty)>
                            <tr>
                                <td colspan="4" class="text-center py-8 text-base-content/50">
                                    "No hay reglas de retención."
                                </td>
                            </tr>
                        </Show>
                        <For
                            each=move || configs.get()
                            key=|c| (c.id, c.cliente.clone(), c.dias_retencion)
                            children=move |config| {
                                let edit = config.clone();
                                let remove = config.clone();
                                view! {
                                    <tr>
                                        <td class="font-medium">{config.cliente.clone()}</td>
                                        <td>{config.dias_retencion}</td>
                                        <td class="hidden md:table-cell text-sm text-base-content/60">
                                            {config.updated_at.as_deref().map(format_fecha).unwrap_or_default()}
                                        </td>
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
        </div>

        <ConfigFormDialog target=form_target on_saved=on_saved />

        <ConfirmDialog
            open=Signal::derive(move || deleting.with(Option::is_some))
            title="Eliminar regla"
            message=Signal::derive(move || {
                deleting
                    .with(|c| c.as_ref().map(|c| format!("¿Eliminar la regla de {}?", c.cliente)))
                    .unwrap_or_default()
            })
            busy=delete_busy
            on_confirm=on_confirm_delete
            on_cancel=move |_: ()| deleting.set(None)
        />
    }
}

#[component]
fn ConfigFormDialog(
    target: RwSignal<Option<Option<RetentionConfig>>>,
    on_saved: Callback<RetentionConfig>,
) -> impl IntoView {
    let api = use_api();
    let dialog_ref = NodeRef::<leptos::html::Dialog>::new();
    sync_modal(dialog_ref, Signal::derive(move || target.with(Option::is_some)));

    let draft = RwSignal::new(ConfigDraft::default());
    let (saving, set_saving) = signal(false);
    let (errors, set_errors) = signal(FieldErrors::default());
    let (error_msg, set_error_msg) = signal(Option::<String>::None);

    let editing_id = move || target.with(|t| t.as_ref().and_then(|c| c.as_ref().map(|c| c.id)));

    Effect::new(move |_| {
        if let Some(config) = target.get() {
            draft.set(config.as_ref().map(ConfigDraft::from).unwrap_or_default());
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
        let payload = match draft.with_untracked(ConfigDraft::validate) {
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
                Some(id) => api.update_config(id, &payload).await,
                None => api.create_config(&payload).await,
            };
            set_saving.set(false);
            match result {
                Ok(config) => on_saved.run(config),
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
                    {move || if editing_id().is_some() { "Editar regla" } else { "Nueva regla" }}
                </h3>
                <form class="space-y-4" on:submit=on_submit>
                    <ErrorAlert message=error_msg />
                    <div class="form-control">
                        <label for="config_cliente" class="label">
                            <span class="label-text">"Cliente"</span>
                        </label>
                        <input
                            id="config_cliente"
                            type="text"
                            class="input input-bordered w-full"
                            prop:value=move || draft.with(|d| d.cliente.clone())
                            on:input=move |ev| draft.update(|d| d.cliente = event_target_value(&ev))
                        />
                        <FieldError errors=errors field="cliente" />
                    </div>
                    <div class="form-control">
                        <label for="config_dias" class="label">
                            <span class="label-text">"Días de retención"</span>
                        </label>
                        <input
                            id="config_dias"
                            type="number"
                            min="1"
                            step="1"
                            class="input input-bordered w-full"
                            prop:value=move || draft.with(|d| d.dias_retencion.clone())
                            on:input=move |ev| draft.update(|d| d.dias_retencion = event_target_value(&ev))
                        />
                        <FieldError errors=errors field="dias_retencion" />
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
