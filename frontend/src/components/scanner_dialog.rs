//! 扫码对话框
//!
//! 打开后稍等片刻（等待 `<video>` 挂载）自动开始扫描，优先使用后置摄像头。
//! 符合规则的第一个结果回调一次并停止；不符合时提示并继续扫描。

use crate::capture::scanner::pick_camera;
use crate::capture::{CaptureEpoch, EpochTicket, ScanEvent, ScanSession, ScanStatus};
use crate::components::feedback::sync_modal;
use crate::components::icons::{RefreshCw, ScanLine, X};
use crate::config::CONFIG;
use crate::web::barcode::{self, Frame};
use crate::web::media;
use bobinas_shared::AcceptanceRule;
use leptos::prelude::*;
use leptos::task::spawn_local;
use std::time::Duration;

#[component]
pub fn ScannerDialog(
    #[prop(into)] open: Signal<bool>,
    rule: AcceptanceRule,
    title: &'static str,
    #[prop(into)] on_scan: Callback<String>,
    #[prop(into)] on_close: Callback<()>,
) -> impl IntoView {
    let dialog_ref = NodeRef::<leptos::html::Dialog>::new();
    let video_ref = NodeRef::<leptos::html::Video>::new();
    sync_modal(dialog_ref, open);

    let session = RwSignal::new(ScanSession::new(rule));
    let epoch = StoredValue::new(CaptureEpoch::default());

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

    // 每次启动的帧回调只作用于自己的票据
    let frame_handler = move |ticket: EpochTicket| {
        move |frame: Frame| match frame {
            Frame::Decoded(text) => {
                let mut event = ScanEvent::Ignored;
                session.update(|s| event = s.on_decoded(ticket, &text));
                match event {
                    ScanEvent::Accepted(value) => {
                        log::info!("[Scanner] accepted {}", value);
                        // 引擎不能在自己的帧回调里 reset
                        spawn_local(async move {
                            barcode::stop_owned(ticket);
                            on_scan.run(value);
                        });
                    }
                    ScanEvent::Rejected(message) => log::debug!("[Scanner] {}", message),
                    ScanEvent::Ignored => {}
                }
            }
            Frame::Error { name, message } => {
                if session.with_untracked(|s| s.on_decode_error(&name)) {
                    log::debug!("[Scanner] {}: {}", name, message);
                }
            }
        }
    };

    // 迟到的启动只放弃自己的会话和引擎
    let abandon = move |ticket: EpochTicket| {
        barcode::stop_owned(ticket);
        session.update(|s| {
            s.abandon(ticket);
        });
    };

    let start = move |ticket: EpochTicket| {
        if !epoch.get_value().is_current(ticket) {
            return;
        }
        let mut began = false;
        session.update(|s| began = s.begin(ticket));
        if !began {
            return;
        }
        spawn_local(async move {
            let devices = match media::list_video_inputs().await {
                Ok(devices) => devices,
                Err(e) => {
                    session.update(|s| s.failed(ticket, e.into()));
                    return;
                }
            };
            if !epoch.get_value().is_current(ticket) {
                abandon(ticket);
                return;
            }
            let device_id = match pick_camera(&devices) {
                Ok(device) => device.device_id.clone(),
                Err(e) => {
                    session.update(|s| s.failed(ticket, e));
                    return;
                }
            };
            let Some(video) = video_ref.get_untracked() else {
                abandon(ticket);
                return;
            };

            // 有些浏览器在授权前不给 deviceId
            let device_id = (!device_id.is_empty()).then_some(device_id);
            let result = barcode::start(ticket, device_id, &video, frame_handler(ticket)).await;
            if !epoch.get_value().is_current(ticket) {
                abandon(ticket);
                return;
            }
            match result {
                Ok(()) => session.update(|s| s.started(ticket)),
                Err(e) => session.update(|s| s.failed(ticket, e)),
            }
        });
    };

    let schedule_start = move || {
        let ticket = next_ticket();
        session.update(|s| s.reset());
        set_timeout(
            move || start(ticket),
            Duration::from_millis(CONFIG.scanner_start_delay_ms as u64),
        );
    };

    Effect::new(move |_| {
        if open.get() {
            schedule_start();
        } else {
            close_epoch();
            barcode::stop();
            session.update(|s| {
                s.stop();
            });
        }
    });

    on_cleanup(move || {
        close_epoch();
        barcode::stop();
    });

    let on_retry = move |_| {
        barcode::stop();
        schedule_start();
    };

    let is_active = move || session.with(ScanSession::is_active);
    let failed = move || session.with(|s| matches!(s.status(), ScanStatus::Failed(_)));

    view! {
        <dialog class="modal" node_ref=dialog_ref on:close=move |_| on_close.run(())>
            <div class="modal-box max-w-lg">
                <div class="flex items-center justify-between mb-4">
                    <h3 class="font-bold text-lg flex items-center gap-2">
                        <ScanLine attr:class="h-5 w-5" />
                        {title}
                    </h3>
                    <button type="button" class="btn btn-sm btn-circle btn-ghost" on:click=move |_| on_close.run(())>
                        <X attr:class="h-4 w-4" />
                    </button>
                </div>

                <div class="relative aspect-video bg-black rounded-box overflow-hidden">
                    <video
                        node_ref=video_ref
                        class="w-full h-full object-cover"
                        autoplay=true
                        muted=true
                        playsinline=true
                    ></video>
                    <div class="absolute inset-x-8 top-1/2 h-0.5 bg-error/80 pointer-events-none"></div>
                </div>

                <p class="text-sm text-base-content/70 mt-3">
                    {move || if is_active() { "Apunte la cámara al código." } else { "" }}
                </p>

                {move || session.with(ScanSession::error_message).map(|text| view! {
                    <div role="alert" class="alert alert-warning text-sm mt-2">
                        <span>{text}</span>
                    </div>
                })}

                <div class="modal-action">
                    <Show when=failed>
                        <button type="button" class="btn btn-ghost gap-2" on:click=on_retry>
                            <RefreshCw attr:class="h-4 w-4" />
                            "Reintentar"
                        </button>
                    </Show>
                    <button type="button" class="btn" on:click=move |_| on_close.run(())>"Cancelar"</button>
                </div>
            </div>
        </dialog>
    }
}
