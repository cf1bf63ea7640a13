//! 拍照对话框
//!
//! 打开时启动摄像头（默认后置），可切换前后摄像头；拍照得到居中正方形
//! JPEG 后交给调用方并关闭。关闭后才到达的视频流会被立即停止。

use crate::capture::camera::PHOTO_SIDE;
use crate::capture::{CameraState, CaptureEpoch, DeviceOwner, EpochTicket};
use crate::components::feedback::{busy_label, sync_modal};
use crate::components::icons::{Camera, RefreshCw, SwitchCamera, X};
use crate::forms::photo_filename;
use crate::web::media;
use crate::web::timer::now;
use leptos::prelude::*;
use leptos::task::spawn_local;

#[component]
pub fn CameraDialog(
    #[prop(into)] open: Signal<bool>,
    /// 用于生成文件名
    #[prop(into)]
    hu: Signal<String>,
    #[prop(into)] on_capture: Callback<web_sys::File>,
    #[prop(into)] on_close: Callback<()>,
) -> impl IntoView {
    let dialog_ref = NodeRef::<leptos::html::Dialog>::new();
    let video_ref = NodeRef::<leptos::html::Video>::new();
    sync_modal(dialog_ref, open);

    let camera = RwSignal::new(CameraState::default());
    let epoch = StoredValue::new(CaptureEpoch::default());
    let (capturing, set_capturing) = signal(false);
    let (hint, set_hint) = signal(Option::<String>::None);

    let next_ticket = move || {
        let mut current = epoch.get_value();
        let ticket = current.open();
        epoch.set_value(current);
        ticket
    };

    let close_epoch = move || {
        let mut current = epoch.get_value();
        current.close();
        epoch.set_value(current);
    };

    let stop_stream = move || {
        media::release(DeviceOwner::Camera);
        if let Some(video) = video_ref.get_untracked() {
            media::detach_preview(&video);
        }
    };

    let start_stream = move |ticket: EpochTicket| {
        let facing = camera.with_untracked(|c| c.facing);
        camera.update(|c| c.starting());
        spawn_local(async move {
            let result = media::open_camera(facing).await;
            if !epoch.get_value().is_current(ticket) {
                if let Ok(stream) = result {
                    media::discard(&stream);
                }
                return;
            }
            match result {
                Ok(stream) => {
                    media::claim(DeviceOwner::Camera, &stream);
                    if let Some(video) = video_ref.get_untracked() {
                        media::attach_preview(&video, &stream);
                    }
                    camera.update(|c| c.live());
                }
                Err(e) => camera.update(|c| c.failed(e)),
            }
        });
    };

    Effect::new(move |_| {
        if open.get() {
            set_hint.set(None);
            start_stream(next_ticket());
        } else {
            close_epoch();
            stop_stream();
            camera.update(|c| c.stopped());
        }
    });

    on_cleanup(move || {
        close_epoch();
        media::release(DeviceOwner::Camera);
    });

    let on_toggle = move |_| {
        stop_stream();
        camera.update(|c| {
            c.toggle_facing();
        });
        start_stream(next_ticket());
    };

    let on_retry = move |_| {
        stop_stream();
        set_hint.set(None);
        camera.update(|c| {
            c.retry();
        });
        start_stream(next_ticket());
    };

    let on_shoot = move |_| {
        if capturing.get_untracked() || !camera.with_untracked(CameraState::can_capture) {
            return;
        }
        let Some(video) = video_ref.get_untracked() else {
            return;
        };
        let filename = photo_filename(&hu.get_untracked(), now());
        set_capturing.set(true);
        set_hint.set(None);
        spawn_local(async move {
            match media::capture_square_jpeg(&video, Some(PHOTO_SIDE), &filename).await {
                Ok(Some(file)) => {
                    on_capture.run(file);
                    on_close.run(());
                }
                Ok(None) => set_hint.set(Some("La cámara aún no está lista, intente de nuevo.".into())),
                Err(e) => camera.update(|c| c.failed(e)),
            }
            set_capturing.set(false);
        });
    };

    let error_message = move || camera.with(CameraState::error_message).or_else(|| hint.get());

    view! {
        <dialog class="modal" node_ref=dialog_ref on:close=move |_| on_close.run(())>
            <div class="modal-box max-w-lg">
                <div class="flex items-center justify-between mb-4">
                    <h3 class="font-bold text-lg">"Tomar foto"</h3>
                    <button type="button" class="btn btn-sm btn-circle btn-ghost" on:click=move |_| on_close.run(())>
                        <X attr:class="h-4 w-4" />
                    </button>
                </div>

                <div class="relative aspect-square bg-black rounded-box overflow-hidden">
                    <video
                        node_ref=video_ref
                        class="w-full h-full object-cover"
                        autoplay=true
                        muted=true
                        playsinline=true
                    ></video>
                    // 取景框：实际裁剪的是居中正方形
                    <div class="absolute inset-6 border-2 border-white/70 rounded-lg pointer-events-none"></div>
                    <Show when=move || !camera.with(CameraState::can_capture) && camera.with(|c| c.error_message().is_none())>
                        <div class="absolute inset-0 flex items-center justify-center">
                            <span class="loading loading-spinner loading-lg text-white"></span>
                        </div>
                    </Show>
                </div>

                {move || error_message().map(|text| view! {
                    <div role="alert" class="alert alert-error text-sm mt-4">
                        <span>{text}</span>
                    </div>
                })}

                <div class="modal-action">
                    <Show when=move || camera.with(CameraState::can_retry)>
                        <button type="button" class="btn btn-ghost gap-2" on:click=on_retry>
                            <RefreshCw attr:class="h-4 w-4" />
                            "Reintentar"
                        </button>
                    </Show>
                    <button type="button" class="btn btn-ghost gap-2" on:click=on_toggle>
                        <SwitchCamera attr:class="h-4 w-4" />
                        "Cambiar cámara"
                    </button>
                    <button
                        type="button"
                        class="btn btn-primary gap-2"
                        disabled=move || capturing.get() || !camera.with(CameraState::can_capture)
                        on:click=on_shoot
                    >
                        <Camera attr:class="h-4 w-4" />
                        {move || busy_label(capturing.get(), "Capturar", "Procesando...")}
                    </button>
                </div>
            </div>
        </dialog>
    }
}
