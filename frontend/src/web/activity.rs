//! 不活动监视器的 DOM 部分
//!
//! 仅在存在会话时安装：在 window 上注册交互事件监听，
//! 登出或组件卸载时移除所有监听并取消定时器。

use super::timer::{SystemClock, TimeoutScheduler};
use crate::session::activity::{ACTIVITY_EVENTS, ActivityMonitor};
use bobinas_shared::Timestamp;
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;

/// mousemove 之类的高频事件最多每隔这么久处理一次
const THROTTLE_MS: f64 = 1_000.0;

type Monitor = ActivityMonitor<SystemClock, TimeoutScheduler>;

struct DomListener {
    event: &'static str,
    closure: Closure<dyn FnMut(web_sys::Event)>,
}

/// 监视器及其 DOM 监听；drop 时全部释放
struct ActivityGuard {
    monitor: Rc<Monitor>,
    listeners: Vec<DomListener>,
}

impl Drop for ActivityGuard {
    fn drop(&mut self) {
        self.monitor.stop();
        if let Some(window) = web_sys::window() {
            for listener in &self.listeners {
                let _ = window.remove_event_listener_with_callback_and_bool(
                    listener.event,
                    listener.closure.as_ref().unchecked_ref(),
                    true,
                );
            }
        }
        log::debug!("[Activity] listeners removed");
    }
}

thread_local! {
    static GUARD: RefCell<Option<ActivityGuard>> = const { RefCell::new(None) };
}

/// 开始监视；已有的监视器会先被替换
pub fn install(
    window_length: Duration,
    on_activity: impl Fn(Timestamp) + 'static,
    on_expire: impl FnOnce() + 'static,
) {
    uninstall();
    let Some(window) = web_sys::window() else {
        return;
    };

    let monitor = Rc::new(ActivityMonitor::start(
        SystemClock,
        TimeoutScheduler::default(),
        window_length,
        on_activity,
        on_expire,
    ));

    let last_seen = Rc::new(Cell::new(0.0_f64));
    let listeners = ACTIVITY_EVENTS
        .iter()
        .map(|&event| {
            let monitor = Rc::downgrade(&monitor);
            let last_seen = last_seen.clone();
            let closure = Closure::<dyn FnMut(web_sys::Event)>::new(move |_: web_sys::Event| {
                let now = js_sys::Date::now();
                if now - last_seen.get() < THROTTLE_MS {
                    return;
                }
                last_seen.set(now);
                if let Some(monitor) = monitor.upgrade() {
                    monitor.notify_activity();
                }
            });
            // 捕获阶段注册，元素内部的滚动也能收到
            if let Err(e) = window.add_event_listener_with_callback_and_bool(
                event,
                closure.as_ref().unchecked_ref(),
                true,
            ) {
                log::warn!("[Activity] cannot listen to {}: {:?}", event, e);
            }
            DomListener { event, closure }
        })
        .collect();

    GUARD.with(|guard| {
        *guard.borrow_mut() = Some(ActivityGuard { monitor, listeners });
    });
}

/// 停止监视并移除监听；可重复调用
pub fn uninstall() {
    // 先取出再 drop，避免在借用期间执行回调
    let previous = GUARD.with(|guard| guard.borrow_mut().take());
    drop(previous);
}
