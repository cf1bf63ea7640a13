//! 不活动自动登出
//!
//! 单一滚动定时器：每次用户交互都会把截止时间推后一个窗口；
//! 定时器到期且期间无交互时，执行一次登出回调。
//!
//! 时钟和调度器通过 trait 注入，浏览器中使用 `Date.now()` 与 `setTimeout`，
//! 测试中使用手动推进的实现。

use bobinas_shared::Timestamp;
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use std::time::Duration;

/// 会重置计时的 DOM 事件
pub const ACTIVITY_EVENTS: [&str; 8] = [
    "mousemove",
    "mousedown",
    "keydown",
    "scroll",
    "touchstart",
    "resize",
    "focus",
    "pointerdown",
];

pub trait Clock {
    fn now(&self) -> Timestamp;
}

/// 单槽调度器：`schedule` 会替换尚未触发的任务
pub trait Scheduler {
    fn schedule(&self, delay: Duration, task: Box<dyn FnOnce()>);
    fn cancel(&self);
}

// =========================================================
// 纯状态：截止时间计算
// =========================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InactivityTracker {
    window: Duration,
    last_activity: Timestamp,
}

impl InactivityTracker {
    pub fn new(window: Duration, now: Timestamp) -> Self {
        Self {
            window,
            last_activity: now,
        }
    }

    pub fn record(&mut self, now: Timestamp) {
        if now > self.last_activity {
            self.last_activity = now;
        }
    }

    pub fn deadline(&self) -> Timestamp {
        self.last_activity + self.window
    }

    pub fn remaining(&self, now: Timestamp) -> Duration {
        self.deadline() - now
    }

    pub fn is_expired(&self, now: Timestamp) -> bool {
        now >= self.deadline()
    }
}

// =========================================================
// ActivityMonitor
// =========================================================

struct Inner<C, S> {
    clock: C,
    scheduler: S,
    tracker: RefCell<InactivityTracker>,
    on_activity: Box<dyn Fn(Timestamp)>,
    on_expire: RefCell<Option<Box<dyn FnOnce()>>>,
    stopped: Cell<bool>,
}

/// 不活动监视器
///
/// 持有唯一的定时器。被 drop 或 `stop()` 后取消定时器，不会再触发登出。
pub struct ActivityMonitor<C: Clock + 'static, S: Scheduler + 'static> {
    inner: Rc<Inner<C, S>>,
}

impl<C: Clock + 'static, S: Scheduler + 'static> ActivityMonitor<C, S> {
    pub fn start(
        clock: C,
        scheduler: S,
        window: Duration,
        on_activity: impl Fn(Timestamp) + 'static,
        on_expire: impl FnOnce() + 'static,
    ) -> Self {
        let now = clock.now();
        let inner = Rc::new(Inner {
            clock,
            scheduler,
            tracker: RefCell::new(InactivityTracker::new(window, now)),
            on_activity: Box::new(on_activity),
            on_expire: RefCell::new(Some(Box::new(on_expire))),
            stopped: Cell::new(false),
        });
        (inner.on_activity)(now);
        arm(&inner);
        log::debug!("[Activity] monitor started, window {:?}", window);
        Self { inner }
    }

    /// 记录一次用户交互并重置计时
    pub fn notify_activity(&self) {
        if self.inner.stopped.get() {
            return;
        }
        let now = self.inner.clock.now();
        self.inner.tracker.borrow_mut().record(now);
        (self.inner.on_activity)(now);
        arm(&self.inner);
    }

    pub fn stop(&self) {
        if !self.inner.stopped.replace(true) {
            self.inner.scheduler.cancel();
            self.inner.on_expire.borrow_mut().take();
            log::debug!("[Activity] monitor stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        !self.inner.stopped.get()
    }

    pub fn deadline(&self) -> Timestamp {
        self.inner.tracker.borrow().deadline()
    }
}

impl<C: Clock + 'static, S: Scheduler + 'static> Drop for ActivityMonitor<C, S> {
    fn drop(&mut self) {
        self.stop();
    }
}

fn arm<C: Clock + 'static, S: Scheduler + 'static>(inner: &Rc<Inner<C, S>>) {
    let remaining = inner.tracker.borrow().remaining(inner.clock.now());
    let weak: Weak<Inner<C, S>> = Rc::downgrade(inner);
    inner.scheduler.schedule(
        remaining,
        Box::new(move || {
            if let Some(inner) = weak.upgrade() {
                on_timer(&inner);
            }
        }),
    );
}

fn on_timer<C: Clock + 'static, S: Scheduler + 'static>(inner: &Rc<Inner<C, S>>) {
    if inner.stopped.get() {
        return;
    }
    let now = inner.clock.now();
    let expired = inner.tracker.borrow().is_expired(now);
    if !expired {
        // 定时器比截止时间早触发（时钟漂移），重新计时
        arm(inner);
        return;
    }
    inner.stopped.set(true);
    let callback = inner.on_expire.borrow_mut().take();
    if let Some(callback) = callback {
        log::info!("[Activity] inactivity window elapsed, logging out");
        callback();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW_MS: i64 = 180_000;

    #[derive(Clone, Default)]
    struct ManualClock(Rc<Cell<i64>>);

    impl Clock for ManualClock {
        fn now(&self) -> Timestamp {
            Timestamp::new(self.0.get())
        }
    }

    type Pending = Rc<RefCell<Option<(i64, Box<dyn FnOnce()>)>>>;

    #[derive(Clone)]
    struct ManualScheduler {
        clock: ManualClock,
        pending: Pending,
    }

    impl Scheduler for ManualScheduler {
        fn schedule(&self, delay: Duration, task: Box<dyn FnOnce()>) {
            let due = self.clock.0.get() + delay.as_millis() as i64;
            *self.pending.borrow_mut() = Some((due, task));
        }

        fn cancel(&self) {
            self.pending.borrow_mut().take();
        }
    }

    struct Harness {
        clock: ManualClock,
        scheduler: ManualScheduler,
        logged_out: Rc<Cell<u32>>,
        persisted: Rc<Cell<i64>>,
    }

    impl Harness {
        fn new(start_ms: i64) -> Self {
            let clock = ManualClock::default();
            clock.0.set(start_ms);
            let scheduler = ManualScheduler {
                clock: clock.clone(),
                pending: Rc::new(RefCell::new(None)),
            };
            Self {
                clock,
                scheduler,
                logged_out: Rc::new(Cell::new(0)),
                persisted: Rc::new(Cell::new(-1)),
            }
        }

        fn start(&self) -> ActivityMonitor<ManualClock, ManualScheduler> {
            let logged_out = self.logged_out.clone();
            let persisted = self.persisted.clone();
            ActivityMonitor::start(
                self.clock.clone(),
                self.scheduler.clone(),
                Duration::from_millis(WINDOW_MS as u64),
                move |ts| persisted.set(ts.as_millis()),
                move || logged_out.set(logged_out.get() + 1),
            )
        }

        /// 推进时钟并执行所有到期任务
        fn advance(&self, ms: i64) {
            self.clock.0.set(self.clock.0.get() + ms);
            loop {
                let due = matches!(
                    &*self.scheduler.pending.borrow(),
                    Some((due, _)) if *due <= self.clock.0.get()
                );
                if !due {
                    break;
                }
                let task = self.scheduler.pending.borrow_mut().take();
                if let Some((_, task)) = task {
                    task();
                }
            }
        }
    }

    #[test]
    fn tracker_deadline_moves_with_activity() {
        let mut tracker = InactivityTracker::new(Duration::from_secs(10), Timestamp::new(0));
        assert_eq!(tracker.deadline(), Timestamp::new(10_000));
        tracker.record(Timestamp::new(4_000));
        assert_eq!(tracker.remaining(Timestamp::new(5_000)), Duration::from_secs(9));
        // 时钟回拨不会缩短期限
        tracker.record(Timestamp::new(1_000));
        assert_eq!(tracker.deadline(), Timestamp::new(14_000));
        assert!(tracker.is_expired(Timestamp::new(14_000)));
    }

    #[test]
    fn logs_out_after_full_window_without_activity() {
        let h = Harness::new(1_000);
        let monitor = h.start();
        assert_eq!(h.persisted.get(), 1_000);

        h.advance(WINDOW_MS - 1);
        assert_eq!(h.logged_out.get(), 0);

        h.advance(1);
        assert_eq!(h.logged_out.get(), 1);
        assert!(!monitor.is_running());
    }

    #[test]
    fn activity_before_expiry_resets_countdown() {
        let h = Harness::new(0);
        let monitor = h.start();

        h.advance(WINDOW_MS - 1);
        monitor.notify_activity();
        assert_eq!(h.persisted.get(), WINDOW_MS - 1);

        h.advance(WINDOW_MS - 1);
        assert_eq!(h.logged_out.get(), 0, "countdown must restart on activity");

        h.advance(1);
        assert_eq!(h.logged_out.get(), 1);
    }

    #[test]
    fn expiry_fires_only_once() {
        let h = Harness::new(0);
        let monitor = h.start();
        h.advance(WINDOW_MS);
        monitor.notify_activity();
        h.advance(WINDOW_MS * 3);
        assert_eq!(h.logged_out.get(), 1);
    }

    #[test]
    fn stop_cancels_pending_timer() {
        let h = Harness::new(0);
        let monitor = h.start();
        monitor.stop();
        assert!(h.scheduler.pending.borrow().is_none());

        h.advance(WINDOW_MS * 2);
        assert_eq!(h.logged_out.get(), 0);
    }

    #[test]
    fn dropping_monitor_releases_timer() {
        let h = Harness::new(0);
        {
            let _monitor = h.start();
        }
        assert!(h.scheduler.pending.borrow().is_none());
        h.advance(WINDOW_MS);
        assert_eq!(h.logged_out.get(), 0);
    }
}
