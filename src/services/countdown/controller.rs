//! One repeating timer per countdown, owned through a handle that cancels
//! the timer task when dropped.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

use super::remaining::{format_remaining, remaining_until, CountdownPhase};

pub const TICK_INTERVAL: Duration = Duration::from_millis(1000);

/// Source of "now" for countdown ticks.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Latest value published by a controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountdownState {
    pub target: Option<DateTime<Utc>>,
    pub remaining_ms: u64,
    /// Ticks delivered by the current timer
    pub ticks: u64,
}

impl CountdownState {
    fn compute(target: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Self {
        Self {
            target,
            remaining_ms: remaining_until(target, now),
            ticks: 0,
        }
    }

    pub fn phase(&self) -> CountdownPhase {
        CountdownPhase::from_remaining(self.remaining_ms)
    }

    pub fn display(&self) -> String {
        format_remaining(self.remaining_ms)
    }
}

/// Owned timer task. Dropping the handle aborts the task.
struct TimerHandle(JoinHandle<()>);

impl TimerHandle {
    fn is_finished(&self) -> bool {
        self.0.is_finished()
    }
}

impl Drop for TimerHandle {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Drives the countdown for one target time.
///
/// Must be created inside a tokio runtime for the timer to run; without one
/// the controller holds a static value computed at creation.
pub struct CountdownController {
    target: Option<DateTime<Utc>>,
    clock: Arc<dyn Clock>,
    state: Arc<watch::Sender<CountdownState>>,
    timer: Option<TimerHandle>,
}

impl CountdownController {
    pub fn start(target: Option<DateTime<Utc>>, clock: Arc<dyn Clock>) -> Self {
        let initial = CountdownState::compute(target, clock.now());
        let (sender, _) = watch::channel(initial);
        let mut controller = Self {
            target,
            clock,
            state: Arc::new(sender),
            timer: None,
        };
        controller.arm();
        controller
    }

    pub fn target(&self) -> Option<DateTime<Utc>> {
        self.target
    }

    pub fn current(&self) -> CountdownState {
        *self.state.borrow()
    }

    pub fn display(&self) -> String {
        self.current().display()
    }

    /// Observers keep receiving values across retargets.
    pub fn subscribe(&self) -> watch::Receiver<CountdownState> {
        self.state.subscribe()
    }

    pub fn is_ticking(&self) -> bool {
        self.timer.as_ref().is_some_and(|timer| !timer.is_finished())
    }

    /// Points the countdown at a new target. Returns false when unchanged.
    pub fn retarget(&mut self, target: Option<DateTime<Utc>>) -> bool {
        if target == self.target {
            return false;
        }
        self.target = target;
        self.arm();
        true
    }

    /// Cancels the timer; the last published value stays readable.
    pub fn stop(&mut self) {
        self.timer = None;
    }

    // Only place a timer is started; the previous one is cancelled first.
    fn arm(&mut self) {
        drop(self.timer.take());

        let fresh = CountdownState::compute(self.target, self.clock.now());
        self.state.send_replace(fresh);

        if fresh.phase() == CountdownPhase::Expired {
            return;
        }

        if tokio::runtime::Handle::try_current().is_err() {
            log::warn!("No async runtime available; countdown for {:?} will not tick", self.target);
            return;
        }

        self.timer = Some(spawn_timer(
            self.target,
            Arc::clone(&self.clock),
            Arc::clone(&self.state),
        ));
    }
}

fn spawn_timer(
    target: Option<DateTime<Utc>>,
    clock: Arc<dyn Clock>,
    state: Arc<watch::Sender<CountdownState>>,
) -> TimerHandle {
    let task = tokio::spawn(async move {
        let mut interval = time::interval_at(Instant::now() + TICK_INTERVAL, TICK_INTERVAL);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            interval.tick().await;
            let remaining_ms = remaining_until(target, clock.now());
            state.send_modify(|current| {
                current.remaining_ms = remaining_ms;
                current.ticks += 1;
            });

            if remaining_ms == 0 {
                log::debug!("Countdown for {:?} reached zero", target);
                break;
            }
        }
    });
    TimerHandle(task)
}
