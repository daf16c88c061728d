//! Continuous per-frame tick driven by the host's redraw callback
//!
//! The host asks [`FrameScheduler::wants_frame`] whether to request a redraw and calls
//! [`FrameScheduler::begin_frame`] when the redraw arrives. A frame that began must be
//! rescheduled or the loop stops.

/// Identifier of one outstanding frame request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameRequestId(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    /// Created but never started
    Idle,
    /// A frame request is outstanding
    Scheduled(FrameRequestId),
    /// Inside a tick, between `begin_frame` and `reschedule`
    Running,
    /// Cancelled; the scheduler never ticks again
    Stopped,
}

#[derive(Debug)]
pub struct FrameScheduler {
    state: SchedulerState,
    next_request: u64,
    ticks: u64,
}

impl Default for FrameScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameScheduler {
    pub fn new() -> Self {
        Self {
            state: SchedulerState::Idle,
            next_request: 0,
            ticks: 0,
        }
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    /// Completed ticks since start
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    fn request(&mut self) -> FrameRequestId {
        self.next_request += 1;
        let id = FrameRequestId(self.next_request);
        self.state = SchedulerState::Scheduled(id);
        id
    }

    /// Issues the first frame request. Only an idle scheduler can start.
    pub fn start(&mut self) -> Option<FrameRequestId> {
        match self.state {
            SchedulerState::Idle => Some(self.request()),
            _ => None,
        }
    }

    /// Consumes the outstanding request; returns `false` when no tick should run
    pub fn begin_frame(&mut self) -> bool {
        match self.state {
            SchedulerState::Scheduled(_) => {
                self.state = SchedulerState::Running;
                true
            }
            _ => false,
        }
    }

    /// Ends the running tick and requests the next frame
    pub fn reschedule(&mut self) -> Option<FrameRequestId> {
        match self.state {
            SchedulerState::Running => {
                self.ticks += 1;
                Some(self.request())
            }
            _ => None,
        }
    }

    /// Stops the loop. Cancelling a scheduler that never started or was already
    /// cancelled does nothing.
    ///
    /// Returns the request that was outstanding, if any.
    pub fn cancel(&mut self) -> Option<FrameRequestId> {
        match self.state {
            SchedulerState::Scheduled(id) => {
                self.state = SchedulerState::Stopped;
                Some(id)
            }
            SchedulerState::Running => {
                self.state = SchedulerState::Stopped;
                None
            }
            SchedulerState::Idle | SchedulerState::Stopped => None,
        }
    }

    /// Whether the host should request a redraw
    pub fn wants_frame(&self) -> bool {
        matches!(self.state, SchedulerState::Scheduled(_))
    }

    pub fn is_stopped(&self) -> bool {
        self.state == SchedulerState::Stopped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tick_cycle() {
        let mut scheduler = FrameScheduler::new();
        assert!(!scheduler.wants_frame());
        assert!(!scheduler.begin_frame());

        let first = scheduler.start().unwrap();
        assert!(scheduler.wants_frame());
        assert!(scheduler.start().is_none());

        assert!(scheduler.begin_frame());
        assert!(!scheduler.wants_frame());
        let second = scheduler.reschedule().unwrap();

        assert_ne!(first, second);
        assert_eq!(scheduler.ticks(), 1);
    }

    #[test]
    fn test_cancel_is_idempotent() {
        let mut never_started = FrameScheduler::new();
        assert!(never_started.cancel().is_none());
        assert!(never_started.cancel().is_none());

        let mut scheduler = FrameScheduler::new();
        let id = scheduler.start().unwrap();
        assert_eq!(scheduler.cancel(), Some(id));
        assert!(scheduler.cancel().is_none());
        assert!(scheduler.is_stopped());
        assert!(!scheduler.begin_frame());
        assert!(scheduler.start().is_none());
    }

    #[test]
    fn test_cancel_during_tick_prevents_reschedule() {
        let mut scheduler = FrameScheduler::new();
        scheduler.start();
        scheduler.begin_frame();
        scheduler.cancel();
        assert!(scheduler.reschedule().is_none());
        assert!(!scheduler.wants_frame());
    }
}
