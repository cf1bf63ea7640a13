use crate::auth::{use_api, use_auth};
use crate::components::feedback::{
    ConfirmDialog, ErrorAlert, FieldError, Notice, NoticeToast, busy_label, notice_signal, sync_modal,
};
use crate::components::icons::*;
use crate::components::pagination::Pagination;
use crate::forms::UserDraft;
use bobinas_shared::date::format_fecha;
use bobinas_shared::{FieldErrors, Page, Role, User};
use leptos::prelude::*;
use leptos::task::spawn_local;

#[component]
pub fn UsersPage() -> impl IntoView {
    let auth = use_auth();
    let api = use_api();

    let (page_no, set_page_no) = signal(1u32);
    let (page, set_page) = signal(Page::<User>::default());
    let (loading, set_loading) = signal(true);
    // 刷新计数；变化时重新加载当前页
    let (reload, set_reload) = signal(0u32);
    let request_seq = StoredValue::new(0u32);
    let notice = notice_signal();

    // None = 关闭，Some(None) = 新建，Some(Some(user)) = 编辑
    let form_target = RwSignal::new(None::<Option<User>>);
    let deleting = RwSignal::new(None::<User>);
    let (delete_busy, set_delete_busy) = signal(false);

    let current_user_id = auth.state.with_untracked(|s| s.user.as_ref().map(|u| u.id));

    {
        let api = api.clone();
        Effect::new(move |_| {
            let page_no = page_no.get();
            reload.track();
            let seq = request_seq.get_value() + 1;
            request_seq.set_value(seq);
            set_loading.set(true);
            let api = api.clone();
            spawn_local(async move {
                let result = api.list_users(page_no).await;
                if request_seq.get_value() != seq {
                    return;
                }
                match result {
                    Ok(data) => set_page.set(data),
                    Err(e) => notice.set(Some(Notice::error(format!("Error al cargar usuarios: {}", e)))),
                }
                set_loading.set(false);
            });
        });
    }

    let on_saved = Callback::new(move |(user, created): (User, bool)| {
        form_target.set(None);
        let text = if created {
            format!("Usuario {} creado", user.username)
        } else {
            format!("Usuario {} actualizado", user.username)
        };
        notice.set(Some(Notice::success(text)));
        set_reload.update(|n| *n += 1);
    });

    let on_confirm_delete = move |_: ()| {
        let Some(user) = deleting.get_untracked() else {
            return;
        };
        if delete_busy.get_untracked() {
            return;
        }
        set_delete_busy.set(true);
        let api = api.clone();
        spawn_local(async move {
            match api.delete_user(user.id).await {
                Ok(()) => {
                    notice.set(Some(Notice::success(format!("Usuario {} eliminado", user.username))));
                    // 删除最后一条时退回上一页
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

        <div class="flex justify-end">
            <button class="btn btn-primary gap-2" on:click=move |_| form_target.set(Some(None))>
                <Plus attr:class="h-4 w-4" />
                "Nuevo usuario"
            </button>
        </div>

        <div class="card bg-base-100 shadow-xl">
            <div class="overflow-x-auto w-full">
                <table class="table table-zebra w-full">
                    <thead>
                        <tr>
                            <th>"Usuario"</th>
                            <th>"Rol"</th>
                            <th class="hidden md:table-cell">"Creado"</th>
                            <th class="text-right">"Acciones"</th>
                        </tr>
                    </thead>
                    <tbody>
                        <Show when=move || !loading.get() && page.with(|p| p.data.is_empty())>
                            <tr>
                                <td colspan="4" class="text-center py-8 text-base-content/50">"No hay usuarios."</td>
                            </tr>
                        </Show>
                        <For
                            each=move || page.get().data
                            key=|u| (u.id, u.username.clone(), u.role)
                            children=move |user| {
                                let is_self = current_user_id == Some(user.id);
                                let edit = user.clone();
                                let remove = user.clone();
                                view! {
                                    <tr>
                                        <td class="font-medium">{user.username.clone()}</td>
                                        <td><span class="badge badge-outline">{user.role.label()}</span></td>
                                        <td class="hidden md:table-cell text-sm text-base-content/60">
                                            {user.created_at.as_deref().map(format_fecha).unwrap_or_default()}
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
                                                disabled=is_self
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

        <UserFormDialog target=form_target on_saved=on_saved />

        <ConfirmDialog
            open=Signal::derive(move || deleting.with(Option::is_some))
            title="Eliminar usuario"
            message=Signal::derive(move || {
                deleting
                    .with(|u| u.as_ref().map(|u| format!("¿Eliminar al usuario {}?", u.username)))
                    .unwrap_or_default()
            })
            busy=delete_busy
            on_confirm=on_confirm_delete
            on_cancel=move |_: ()| deleting.set(None)
        />
    }
}

#[component]
fn UserFormDialog(
    target: RwSignal<Option<Option<User>>>,
    /// 保存后的用户，以及是否为新建
    on_saved: Callback<(User, bool)>,
) -> impl IntoView {
    let api = use_api();
    let dialog_ref = NodeRef::<leptos::html::Dialog>::new();
    sync_modal(dialog_ref, Signal::derive(move || target.with(Option::is_some)));

    let draft = RwSignal::new(UserDraft::default());
    let (saving, set_saving) = signal(false);
    let (errors, set_errors) = signal(FieldErrors::default());
    let (error_msg, set_error_msg) = signal(Option::<String>::None);

    let editing_id = move || target.with(|t| t.as_ref().and_then(|u| u.as_ref().map(|u| u.id)));

    Effect::new(move |_| {
        if let Some(user) = target.get() {
            draft.set(user.as_ref().map(UserDraft::from).unwrap_or_default());
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
        let id = editing_id();
        let payload = match draft.with_untracked(|d| d.validate(id.is_some())) {
            Ok(payload) => payload,
            Err(fields) => {
                set_errors.set(fields);
                return;
            }
        };
        set_saving.set(true);
        set_errors.set(FieldErrors::default());
        set_error_msg.set(None);
        let api = api.clone();
        spawn_local(async move {
            let result = match id {
                Some(id) => api.update_user(id, &payload).await,
                None => api.create_user(&payload).await,
            };
            set_saving.set(false);
            match result {
                Ok(user) => on_saved.run((user, id.is_none())),
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
                    {move || if editing_id().is_some() { "Editar usuario" } else { "Nuevo usuario" }}
                </h3>
                <form class="space-y-4" on:submit=on_submit>
                    <ErrorAlert message=error_msg />
                    <div class="form-control">
                        <label for="user_username" class="label">
                            <span class="label-text">"Usuario"</span>
                        </label>
                        <input
                            id="user_username"
                            type="text"
                            autocomplete="off"
                            class="input input-bordered w-full"
                            prop:value=move || draft.with(|d| d.username.clone())
                            on:input=move |ev| draft.update(|d| d.username = event_target_value(&ev))
                        />
                        <FieldError errors=errors field="username" />
                    </div>
                    <div class="form-control">
                        <label for="user_role" class="label">
                            <span class="label-text">"Rol"</span>
                        </label>
                        <select
                            id="user_role"
                            class="select select-bordered w-full"
                            prop:value=move || draft.with(|d| d.role.as_str())
                            on:change=move |ev| {
                                if let Some(role) = Role::parse(&event_target_value(&ev)) {
                                    draft.update(|d| d.role = role);
                                }
                            }
                        >
                            {Role::ALL
                                .into_iter()
                                .map(|role| view! { <option value=role.as_str()>{role.label()}</option> })
                                .collect_view()}
                        </select>
                        <FieldError errors=errors field="role" />
                    </div>
                    <div class="form-control">
                        <label for="user_password" class="label">
                            <span class="label-text">
                                {move || if editing_id().is_some() { "Contraseña (dejar vacío para no cambiar)" } else { "Contraseña" }}
                            </span>
                        </label>
                        <input
                            id="user_password"
                            type="password"
                            autocomplete="new-password"
                            class="input input-bordered w-full"
                            prop:value=move || draft.with(|d| d.password.clone())
                            on:input=move |ev| draft.update(|d| d.password = event_target_value(&ev))
                        />
                        <FieldError errors=errors field="password" />
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
