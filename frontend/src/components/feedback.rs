//! 通知提示、字段错误与模态框的公共部件

use bobinas_shared::FieldErrors;
use leptos::prelude::*;
use std::time::Duration;

/// 右上角的临时提示
#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub message: String,
    pub is_error: bool,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            is_error: false,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            is_error: true,
        }
    }
}

/// 创建提示信号；3秒后自动清除
pub fn notice_signal() -> RwSignal<Option<Notice>> {
    let notice = RwSignal::new(None::<Notice>);
    Effect::new(move |_| {
        if notice.with(Option::is_some) {
            set_timeout(move || notice.set(None), Duration::from_secs(3));
        }
    });
    notice
}

#[component]
pub fn NoticeToast(notice: RwSignal<Option<Notice>>) -> impl IntoView {
    move || {
        notice.get().map(|n| {
            let class = if n.is_error {
                "alert alert-error shadow-lg"
            } else {
                "alert alert-success shadow-lg"
            };
            view! {
                <div class="toast toast-top toast-end z-50">
                    <div class=class>
                        <span>{n.message}</span>
                    </div>
                </div>
            }
        })
    }
}

/// 表单顶部的错误条
#[component]
pub fn ErrorAlert(#[prop(into)] message: Signal<Option<String>>) -> impl IntoView {
    move || {
        message.get().map(|text| {
            view! {
                <div role="alert" class="alert alert-error text-sm py-2">
                    <span>{text}</span>
                </div>
            }
        })
    }
}

/// 单个字段下方的错误提示
#[component]
pub fn FieldError(#[prop(into)] errors: Signal<FieldErrors>, field: &'static str) -> impl IntoView {
    move || {
        errors.with(|e| e.first(field).map(str::to_string)).map(|text| {
            view! {
                <label class="label">
                    <span class="label-text-alt text-error">{text}</span>
                </label>
            }
        })
    }
}

/// 提交按钮文字：进行中时显示 spinner
pub fn busy_label(busy: bool, idle: &'static str, working: &'static str) -> AnyView {
    if busy {
        view! { <span class="loading loading-spinner"></span> {working} }.into_any()
    } else {
        idle.into_any()
    }
}

/// 让 `<dialog>` 跟随 open 信号显示 / 关闭
pub fn sync_modal(dialog_ref: NodeRef<leptos::html::Dialog>, open: Signal<bool>) {
    Effect::new(move |_| {
        let open = open.get();
        if let Some(dialog) = dialog_ref.get() {
            if open {
                if !dialog.open() {
                    let _ = dialog.show_modal();
                }
            } else if dialog.open() {
                dialog.close();
            }
        }
    });
}

/// 删除等不可撤销操作的确认框
#[component]
pub fn ConfirmDialog(
    #[prop(into)] open: Signal<bool>,
    title: &'static str,
    #[prop(into)] message: Signal<String>,
    #[prop(into)] busy: Signal<bool>,
    #[prop(into)] on_confirm: Callback<()>,
    #[prop(into)] on_cancel: Callback<()>,
) -> impl IntoView {
    let dialog_ref = NodeRef::<leptos::html::Dialog>::new();
    sync_modal(dialog_ref, open);

    view! {
        <dialog
            class="modal"
            node_ref=dialog_ref
            on:close=move |_| {
                if open.get_untracked() && !busy.get_untracked() {
                    on_cancel.run(());
                }
            }
        >
            <div class="modal-box">
                <h3 class="font-bold text-lg">{title}</h3>
                <p class="py-4">{move || message.get()}</p>
                <div class="modal-action">
                    <button type="button" class="btn btn-ghost" disabled=move || busy.get() on:click=move |_| on_cancel.run(())>
                        "Cancelar"
                    </button>
                    <button type="button" class="btn btn-error" disabled=move || busy.get() on:click=move |_| on_confirm.run(())>
                        {move || busy_label(busy.get(), "Eliminar", "Eliminando...")}
                    </button>
                </div>
            </div>
        </dialog>
    }
}
