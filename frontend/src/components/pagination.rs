use crate::components::icons::{ChevronLeft, ChevronRight};
use leptos::prelude::*;

/// 上一页 / 下一页
#[component]
pub fn Pagination(
    #[prop(into)] current: Signal<u32>,
    #[prop(into)] last: Signal<u32>,
    #[prop(into)] total: Signal<u64>,
    #[prop(into)] disabled: Signal<bool>,
    #[prop(into)] on_change: Callback<u32>,
) -> impl IntoView {
    let has_previous = move || current.get() > 1;
    let has_next = move || current.get() < last.get();

    view! {
        <div class="flex items-center justify-between p-4">
            <span class="text-sm text-base-content/60">
                {move || format!("{} registros · página {} de {}", total.get(), current.get(), last.get().max(1))}
            </span>
            <div class="join">
                <button
                    class="join-item btn btn-sm"
                    disabled=move || disabled.get() || !has_previous()
                    on:click=move |_| on_change.run(current.get_untracked().saturating_sub(1).max(1))
                >
                    <ChevronLeft attr:class="h-4 w-4" />
                </button>
                <button
                    class="join-item btn btn-sm"
                    disabled=move || disabled.get() || !has_next()
                    on:click=move |_| on_change.run(current.get_untracked() + 1)
                >
                    <ChevronRight attr:class="h-4 w-4" />
                </button>
            </div>
        </div>
    }
}
