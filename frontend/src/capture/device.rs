//! 摄像头独占与迟到的流
//!
//! 同一时刻只有一个控制器（拍照或扫码）持有视频流。

/// 一个视频流的全部轨道
pub trait TrackSet {
    /// 停止所有轨道
    fn stop_all(&self);
    /// 仍处于 live 状态的轨道数
    fn live_tracks(&self) -> usize;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceOwner {
    Camera,
    Scanner,
}

/// 当前活动视频流的唯一持有位置
pub struct DeviceSlot<H: TrackSet> {
    active: Option<(DeviceOwner, H)>,
}

impl<H: TrackSet> Default for DeviceSlot<H> {
    fn default() -> Self {
        Self { active: None }
    }
}

impl<H: TrackSet> DeviceSlot<H> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn owner(&self) -> Option<DeviceOwner> {
        self.active.as_ref().map(|(owner, _)| *owner)
    }

    pub fn is_held_by(&self, owner: DeviceOwner) -> bool {
        self.owner() == Some(owner)
    }

    /// 安装新的流；之前的流（无论属于谁）先全部停止
    pub fn install(&mut self, owner: DeviceOwner, handle: H) -> Option<DeviceOwner> {
        let previous = self.active.take().map(|(prev_owner, prev)| {
            prev.stop_all();
            log::debug!("[Device] {:?} released for {:?}", prev_owner, owner);
            prev_owner
        });
        self.active = Some((owner, handle));
        previous
    }

    /// 释放指定持有者的流；持有者不符时什么也不做。可重复调用。
    pub fn release(&mut self, owner: DeviceOwner) -> bool {
        if !self.is_held_by(owner) {
            return false;
        }
        self.release_all()
    }

    pub fn release_all(&mut self) -> bool {
        match self.active.take() {
            Some((owner, handle)) => {
                handle.stop_all();
                log::debug!("[Device] {:?} stream stopped", owner);
                true
            }
            None => false,
        }
    }
}

/// 对话框打开次数的计数
///
/// 每次打开拍照 / 扫码对话框都领取一张票；对话框关闭后旧票失效，
/// 之后才到达的流必须立即停止而不是绑定到预览元素上。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CaptureEpoch {
    current: u64,
    open: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EpochTicket(u64);

impl CaptureEpoch {
    pub fn open(&mut self) -> EpochTicket {
        self.current += 1;
        self.open = true;
        EpochTicket(self.current)
    }

    pub fn close(&mut self) {
        self.current += 1;
        self.open = false;
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn is_current(&self, ticket: EpochTicket) -> bool {
        self.open && ticket.0 == self.current
    }
}

#[cfg(test)]
pub(crate) mod mock {
    use super::TrackSet;
    use std::cell::Cell;
    use std::rc::Rc;

    /// 记录 stop 调用的假视频流
    #[derive(Debug, Clone)]
    pub struct MockStream {
        live: Rc<Cell<usize>>,
    }

    impl MockStream {
        pub fn with_tracks(count: usize) -> Self {
            Self {
                live: Rc::new(Cell::new(count)),
            }
        }
    }

    impl TrackSet for MockStream {
        fn stop_all(&self) {
            self.live.set(0);
        }

        fn live_tracks(&self) -> usize {
            self.live.get()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mock::MockStream;
    use super::*;

    #[test]
    fn installing_a_new_owner_stops_the_previous_stream() {
        let mut slot = DeviceSlot::new();
        let scanner = MockStream::with_tracks(1);
        slot.install(DeviceOwner::Scanner, scanner.clone());

        let camera = MockStream::with_tracks(2);
        assert_eq!(
            slot.install(DeviceOwner::Camera, camera.clone()),
            Some(DeviceOwner::Scanner)
        );

        assert_eq!(scanner.live_tracks(), 0);
        assert_eq!(camera.live_tracks(), 2);
        assert!(slot.is_held_by(DeviceOwner::Camera));
    }

    #[test]
    fn release_is_idempotent_and_owner_scoped() {
        let mut slot = DeviceSlot::new();
        let camera = MockStream::with_tracks(2);
        slot.install(DeviceOwner::Camera, camera.clone());

        assert!(!slot.release(DeviceOwner::Scanner));
        assert_eq!(camera.live_tracks(), 2);

        assert!(slot.release(DeviceOwner::Camera));
        assert_eq!(camera.live_tracks(), 0);
        assert!(slot.owner().is_none());
        assert!(!slot.release(DeviceOwner::Camera));
        assert!(!slot.release_all());
    }

    #[test]
    fn closing_invalidates_outstanding_tickets() {
        let mut epoch = CaptureEpoch::default();
        assert!(!epoch.is_open());
        let first = epoch.open();
        assert!(epoch.is_open());
        assert!(epoch.is_current(first));

        epoch.close();
        assert!(!epoch.is_open());
        assert!(!epoch.is_current(first));

        let second = epoch.open();
        assert!(!epoch.is_current(first));
        assert!(epoch.is_current(second));
    }
}
