//! bobina 登记页
//!
//! HU（手输或扫码）、客户名与照片（选图或拍照）。HU 已存在时先确认，
//! 再由 líder 输入凭据授权替换。

use crate::auth::{use_api, use_auth};
use crate::components::camera_dialog::CameraDialog;
use crate::components::feedback::{
    ErrorAlert, FieldError, Notice, NoticeToast, busy_label, notice_signal, sync_modal,
};
use crate::components::icons::*;
use crate::components::scanner_dialog::ScannerDialog;
use crate::config::CONFIG;
use crate::forms::{RegistrationDraft, photo_filename};
use crate::replacement::{ReplacementFlow, ResetPolicy, authorize_replacement, submit_registration};
use crate::web::media::{picked_file, preview_url, revoke_preview_url};
use crate::web::storage::browser_session;
use crate::web::timer::now;
use bobinas_shared::date::format_fecha;
use bobinas_shared::{AcceptanceRule, FieldErrors, NewBobina, Role};
use leptos::prelude::*;
use leptos::task::spawn_local;
use std::time::Duration;

#[component]
pub fn RegistrarBobinaPage() -> impl IntoView {
    let auth = use_auth();
    let api = use_api();

    let draft = RwSignal::new(RegistrationDraft::with_cliente(browser_session().last_cliente()));
    let foto = RwSignal::new_local(None::<web_sys::File>);
    let preview = RwSignal::new(None::<String>);
    let flow = RwSignal::new(ReplacementFlow::new());
    // 等待授权期间保留原表单
    let pending = RwSignal::new(None::<(NewBobina, String)>);
    let (errors, set_errors) = signal(FieldErrors::default());
    let (error_msg, set_error_msg) = signal(Option::<String>::None);
    let (clientes, set_clientes) = signal(Vec::<String>::new());
    let scanner_open = RwSignal::new(false);
    let camera_open = RwSignal::new(false);
    let notice = notice_signal();
    let file_ref = NodeRef::<leptos::html::Input>::new();

    {
        let api = api.clone();
        spawn_local(async move {
            match api.list_clientes().await {
                Ok(list) => set_clientes.set(list),
                Err(e) => log::warn!("[Registro] clientes: {}", e),
            }
        });
    }

    let set_photo = move |file: Option<web_sys::File>| {
        if let Some(url) = preview.get_untracked() {
            revoke_preview_url(&url);
        }
        preview.set(file.as_ref().and_then(preview_url));
        if file.is_none() {
            if let Some(input) = file_ref.get_untracked() {
                input.set_value("");
            }
        }
        foto.set(file);
    };

    on_cleanup(move || {
        if let Some(url) = preview.get_untracked() {
            revoke_preview_url(&url);
        }
    });

    // 成功后展示提示，稍后按角色重置表单
    Effect::new(move |_| {
        let Some(message) = flow.with(|f| f.state().success_message()) else {
            return;
        };
        notice.set(Some(Notice::success(message)));
        browser_session().remember_cliente(&draft.with_untracked(|d| d.cliente.clone()));
        let role = auth
            .state
            .with_untracked(|s| s.user.as_ref().map(|u| u.role))
            .unwrap_or(Role::Embarcador);
        set_timeout(
            move || {
                flow.update(|f| f.reset());
                draft.update(|d| *d = ResetPolicy::for_role(role).next_draft(d));
                pending.set(None);
                set_errors.set(FieldErrors::default());
                set_photo(None);
            },
            Duration::from_millis(CONFIG.form_reset_delay_ms as u64),
        );
    });

    let on_submit = {
        let api = api.clone();
        move |ev: leptos::web_sys::SubmitEvent| {
            ev.prevent_default();
            let has_photo = foto.with_untracked(Option::is_some);
            let bobina = match draft.with_untracked(|d| d.validate(has_photo)) {
                Ok(bobina) => bobina,
                Err(fields) => {
                    set_errors.set(fields);
                    return;
                }
            };
            let Some(file) = foto.get_untracked() else {
                return;
            };
            let Some(ticket) = flow.try_update(|f| f.begin_submit()).flatten() else {
                return;
            };

            let filename = photo_filename(&bobina.hu, now());
            pending.set(Some((bobina.clone(), filename.clone())));
            set_errors.set(FieldErrors::default());
            set_error_msg.set(None);

            let api = api.clone();
            spawn_local(async move {
                let outcome = submit_registration(&api, &bobina, file, &filename).await;
                let rejected = flow.try_update(|f| f.finish_submit(ticket, outcome)).flatten();
                if let Some(err) = rejected {
                    if let Some(fields) = err.field_errors() {
                        set_errors.set(fields.clone());
                    }
                    set_error_msg.set(Some(err.to_string()));
                }
            });
        }
    };

    let on_authorize = move |ev: leptos::web_sys::SubmitEvent| {
        ev.prevent_default();
        let Some((ticket, credentials)) = flow.try_update(|f| f.begin_authorize()).flatten() else {
            return;
        };
        let (Some((bobina, filename)), Some(file)) = (pending.get_untracked(), foto.get_untracked())
        else {
            flow.update(|f| {
                f.cancel();
            });
            return;
        };
        let api = api.clone();
        spawn_local(async move {
            let outcome = authorize_replacement(&api, &bobina, file, &filename, &credentials).await;
            flow.update(|f| f.finish_authorize(ticket, outcome));
        });
    };

    let cancel_flow = move || {
        flow.update(|f| {
            f.cancel();
        });
        pending.set(None);
    };

    let busy = move || flow.with(|f| f.state().is_busy());
    let done = move || flow.with(|f| f.state().is_terminal());
    let submittable = move || {
        let has_photo = foto.with(Option::is_some);
        draft.with(|d| d.is_submittable(has_photo))
    };
    let hu_invalid = move || {
        draft.with(|d| !d.hu.trim().is_empty() && !AcceptanceRule::BOBINA_HU.accepts(&d.hu))
    };

    let confirm_ref = NodeRef::<leptos::html::Dialog>::new();
    sync_modal(
        confirm_ref,
        Signal::derive(move || flow.with(|f| f.state().shows_confirmation())),
    );
    let lead_ref = NodeRef::<leptos::html::Dialog>::new();
    sync_modal(
        lead_ref,
        Signal::derive(move || flow.with(|f| f.state().shows_lead_dialog())),
    );

    let existing_summary = move || {
        flow.with(|f| {
            f.state().existing().map(|b| {
                let fecha = b.fecha_embarque.as_deref().map(format_fecha).unwrap_or_default();
                format!("Cliente: {} · Embarque: {}", b.cliente, fecha)
            })
        })
    };

    view! {
        <NoticeToast notice=notice />

        <div class="card bg-base-100 shadow-xl max-w-2xl">
            <form class="card-body gap-4" on:submit=on_submit>
                <ErrorAlert message=error_msg />

                <div class="form-control">
                    <label for="hu" class="label">
                        <span class="label-text">"HU (9 dígitos)"</span>
                    </label>
                    <div class="join w-full">
                        <input
                            id="hu"
                            type="text"
                            inputmode="numeric"
                            maxlength="9"
                            autocomplete="off"
                            class="input input-bordered join-item w-full font-mono"
                            class:input-error=hu_invalid
                            placeholder="123456789"
                            prop:value=move || draft.with(|d| d.hu.clone())
                            on:input=move |ev| draft.update(|d| d.hu = event_target_value(&ev))
                            disabled=move || busy() || done()
                        />
                        <button
                            type="button"
                            class="btn btn-secondary join-item gap-2"
                            disabled=move || busy() || done()
                            on:click=move |_| scanner_open.set(true)
                        >
                            <ScanLine attr:class="h-4 w-4" />
                            "Escanear"
                        </button>
                    </div>
                    <FieldError errors=errors field="hu" />
                </div>

                <div class="form-control">
                    <label for="cliente" class="label">
                        <span class="label-text">"Cliente"</span>
                    </label>
                    <input
                        id="cliente"
                        type="text"
                        list="clientes-registro"
                        class="input input-bordered w-full"
                        prop:value=move || draft.with(|d| d.cliente.clone())
                        on:input=move |ev| draft.update(|d| d.cliente = event_target_value(&ev))
                        disabled=move || busy() || done()
                    />
                    <datalist id="clientes-registro">
                        <For
                            each=move || clientes.get()
                            key=|c| c.clone()
                            children=move |cliente| view! { <option value=cliente></option> }
                        />
                    </datalist>
                    <FieldError errors=errors field="cliente" />
                </div>

                <div class="form-control">
                    <label for="foto" class="label">
                        <span class="label-text">"Foto"</span>
                    </label>
                    <div class="flex flex-col sm:flex-row gap-2">
                        <input
                            id="foto"
                            node_ref=file_ref
                            type="file"
                            accept="image/*"
                            class="file-input file-input-bordered w-full"
                            on:change=move |ev| set_photo(picked_file(&ev))
                            disabled=move || busy() || done()
                        />
                        <button
                            type="button"
                            class="btn btn-outline gap-2"
                            disabled=move || busy() || done()
                            on:click=move |_| camera_open.set(true)
                        >
                            <Camera attr:class="h-4 w-4" />
                            "Tomar foto"
                        </button>
                    </div>
                    <FieldError errors=errors field="foto" />
                    {move || preview.get().map(|src| view! {
                        <img src=src alt="vista previa" class="mt-3 w-48 h-48 object-cover rounded-box border border-base-300" />
                    })}
                </div>

                <div class="card-actions justify-end mt-2">
                    <button
                        type="submit"
                        class="btn btn-primary"
                        disabled=move || busy() || done() || !submittable()
                    >
                        {move || busy_label(busy(), "Registrar", "Enviando...")}
                    </button>
                </div>
            </form>
        </div>

        <ScannerDialog
            open=scanner_open
            rule=AcceptanceRule::BOBINA_HU
            title="Escanear HU"
            on_scan=move |hu: String| {
                draft.update(|d| d.hu = hu);
                scanner_open.set(false);
            }
            on_close=move |_: ()| scanner_open.set(false)
        />

        <CameraDialog
            open=camera_open
            hu=Signal::derive(move || draft.with(|d| d.hu.clone()))
            on_capture=move |file: web_sys::File| set_photo(Some(file))
            on_close=move |_: ()| camera_open.set(false)
        />

        // HU 已存在时的确认
        <dialog
            class="modal"
            node_ref=confirm_ref
            on:close=move |_| {
                if flow.with_untracked(|f| f.state().shows_confirmation()) {
                    cancel_flow();
                }
            }
        >
            <div class="modal-box">
                <h3 class="font-bold text-lg flex items-center gap-2">
                    <AlertTriangle attr:class="h-5 w-5 text-warning" />
                    "HU ya registrado"
                </h3>
                <p class="py-4">
                    "El HU " <span class="font-mono font-bold">{move || draft.with(|d| d.hu.clone())}</span>
                    " ya existe. ¿Desea reemplazar la bobina? Se requiere autorización de un líder."
                </p>
                {move || existing_summary().map(|text| view! { <p class="text-sm text-base-content/70">{text}</p> })}
                <div class="modal-action">
                    <button type="button" class="btn btn-ghost" on:click=move |_| cancel_flow()>"Cancelar"</button>
                    <button
                        type="button"
                        class="btn btn-warning"
                        on:click=move |_| {
                            flow.update(|f| {
                                f.confirm();
                            });
                        }
                    >
                        "Reemplazar"
                    </button>
                </div>
            </div>
        </dialog>

        // líder 授权
        <dialog
            class="modal"
            node_ref=lead_ref
            on:close=move |_| {
                if flow.with_untracked(|f| f.state().shows_lead_dialog()) {
                    cancel_flow();
                }
            }
        >
            <div class="modal-box">
                <h3 class="font-bold text-lg flex items-center gap-2">
                    <KeyRound attr:class="h-5 w-5" />
                    "Autorización de líder"
                </h3>
                <form class="space-y-4 mt-4" on:submit=on_authorize>
                    {move || flow.with(|f| f.state().lead_error().map(str::to_string)).map(|text| view! {
                        <div role="alert" class="alert alert-error text-sm py-2">
                            <span>{text}</span>
                        </div>
                    })}
                    <div class="form-control">
                        <label for="lider_username" class="label">
                            <span class="label-text">"Usuario líder"</span>
                        </label>
                        <input
                            id="lider_username"
                            type="text"
                            autocomplete="off"
                            class="input input-bordered w-full"
                            prop:value=move || flow.with(|f| f.credentials().username.clone())
                            on:input=move |ev| flow.update(|f| f.set_lead_username(event_target_value(&ev)))
                            disabled=busy
                        />
                    </div>
                    <div class="form-control">
                        <label for="lider_password" class="label">
                            <span class="label-text">"Contraseña"</span>
                        </label>
                        <input
                            id="lider_password"
                            type="password"
                            autocomplete="off"
                            class="input input-bordered w-full"
                            prop:value=move || flow.with(|f| f.credentials().password.clone())
                            on:input=move |ev| flow.update(|f| f.set_lead_password(event_target_value(&ev)))
                            disabled=busy
                        />
                    </div>
                    <div class="modal-action">
                        <button type="button" class="btn btn-ghost" on:click=move |_| cancel_flow()>"Cancelar"</button>
                        <button type="submit" class="btn btn-primary" disabled=busy>
                            {move || busy_label(busy(), "Autorizar", "Verificando...")}
                        </button>
                    </div>
                </form>
            </div>
        </dialog>
    }
}
