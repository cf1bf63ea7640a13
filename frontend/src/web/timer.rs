//! 定时器封装模块
//!
//! `session::activity` 所需的时钟与单槽调度器的浏览器实现。

use crate::session::activity::{Clock, Scheduler};
use bobinas_shared::Timestamp;
use gloo_timers::callback::Timeout;
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

/// `Date.now()`
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        now()
    }
}

pub fn now() -> Timestamp {
    Timestamp::new(js_sys::Date::now() as i64)
}

/// 基于 `setTimeout` 的单槽调度器
///
/// 新任务替换旧任务；被替换或 drop 的 `Timeout` 会自动清除。
#[derive(Clone, Default)]
pub struct TimeoutScheduler {
    slot: Rc<RefCell<Option<Timeout>>>,
}

impl Scheduler for TimeoutScheduler {
    fn schedule(&self, delay: Duration, task: Box<dyn FnOnce()>) {
        let millis = delay.as_millis().min(u32::MAX as u128) as u32;
        let slot = self.slot.clone();
        let timeout = Timeout::new(millis, move || {
            // 先取出已触发的句柄，任务里可能会重新调度
            let fired = slot.borrow_mut().take();
            task();
            drop(fired);
        });
        // 旧的 Timeout 在这里被 drop，即被取消
        self.slot.borrow_mut().replace(timeout);
    }

    fn cancel(&self) {
        self.slot.borrow_mut().take();
    }
}
