mod board;
mod controller;
mod remaining;

pub use board::{CountdownBoard, ReconcileSummary};
pub use controller::{Clock, CountdownController, CountdownState, SystemClock, TICK_INTERVAL};
pub use remaining::{
    format_remaining, remaining_until, time_remaining_ms, CountdownPhase, TimeBreakdown,
    TIMES_UP_MESSAGE,
};

#[cfg(test)]
pub(crate) use controller::test_support;
