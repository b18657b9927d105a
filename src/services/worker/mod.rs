//! Background worker that owns the policy list, the countdown timers and
//! the API session.
//!
//! The UI thread never awaits anything: it sends `DashboardCommand`s and
//! reads the latest `DashboardSnapshot`. All state changes happen on one
//! worker thread running a current-thread tokio runtime.

mod engine;

use std::rc::Rc;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::{mpsc, watch};
use tokio::task::LocalSet;
use tokio::time::{self, Interval, MissedTickBehavior};

use crate::models::policy::{Policy, PolicyDraft, PolicyId};
use crate::services::api::{Credentials, PolicyApi};
use crate::services::countdown::{Clock, CountdownState, SystemClock, TICK_INTERVAL};
use crate::services::notification::NotificationService;

pub use self::engine::DashboardCore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DashboardCommand {
    SignIn(Credentials),
    SignUp(Credentials),
    SignOut,
    Refresh,
    Delete(PolicyId),
    Create(PolicyDraft),
    Update(PolicyId, PolicyDraft),
    OpenForEdit(PolicyId),
    CloseEditor,
    Shutdown,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SessionState {
    #[default]
    SignedOut,
    SigningIn,
    SignedIn {
        email: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Info,
    Warning,
    Error,
}

/// One-shot message for the UI. `serial` increases monotonically.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub serial: u64,
    pub level: NoticeLevel,
    pub message: String,
}

/// A policy fetched fresh for the edit form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditTarget {
    pub serial: u64,
    pub policy: Policy,
}

/// Result of the latest create or update, so the form knows when to close.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveReport {
    pub serial: u64,
    pub error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct PolicyRow {
    pub policy: Policy,
    pub countdown: watch::Receiver<CountdownState>,
}

#[derive(Debug, Clone, Default)]
pub struct DashboardSnapshot {
    pub session: SessionState,
    pub rows: Vec<PolicyRow>,
    pub busy: bool,
    pub last_error: Option<String>,
    pub notices: Vec<Notice>,
    pub editing: Option<EditTarget>,
    pub last_save: Option<SaveReport>,
}

impl DashboardSnapshot {
    pub fn is_signed_in(&self) -> bool {
        matches!(self.session, SessionState::SignedIn { .. })
    }
}

/// Receives policies whose countdown just reached zero.
pub trait ExpiryNotifier {
    fn policy_expired(&self, policy: &Policy);
}

impl ExpiryNotifier for NotificationService {
    fn policy_expired(&self, policy: &Policy) {
        if let Err(err) = self.show_policy_expired(policy) {
            log::warn!("Failed to show expiry notification: {}", err);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerConfig {
    /// 0 disables background refresh
    pub refresh_interval: Duration,
    pub notifications_enabled: bool,
}

type RepaintFn = Box<dyn Fn() + Send>;

/// Handle to the worker thread. Dropping it shuts the worker down.
pub struct DashboardWorker {
    commands: mpsc::UnboundedSender<DashboardCommand>,
    snapshot: watch::Receiver<DashboardSnapshot>,
    thread: Option<JoinHandle<()>>,
}

impl DashboardWorker {
    pub fn spawn(
        config: WorkerConfig,
        api: Box<dyn PolicyApi + Send>,
        repaint: RepaintFn,
    ) -> Result<Self> {
        Self::spawn_with_clock(config, api, Arc::new(SystemClock), repaint)
    }

    pub fn spawn_with_clock(
        config: WorkerConfig,
        api: Box<dyn PolicyApi + Send>,
        clock: Arc<dyn Clock>,
        repaint: RepaintFn,
    ) -> Result<Self> {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (snapshot_tx, snapshot_rx) = watch::channel(DashboardSnapshot::default());

        let thread = thread::Builder::new()
            .name("dashboard-worker".to_string())
            .spawn(move || run(config, api, clock, repaint, command_rx, snapshot_tx))
            .context("Failed to start dashboard worker thread")?;

        Ok(Self {
            commands: command_tx,
            snapshot: snapshot_rx,
            thread: Some(thread),
        })
    }

    pub fn send(&self, command: DashboardCommand) {
        if self.commands.send(command).is_err() {
            log::error!("Dashboard worker is gone; command dropped");
        }
    }

    pub fn snapshot(&self) -> DashboardSnapshot {
        self.snapshot.borrow().clone()
    }

    pub fn shutdown(&mut self) {
        let _ = self.commands.send(DashboardCommand::Shutdown);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                log::error!("Dashboard worker panicked");
            }
        }
    }
}

impl Drop for DashboardWorker {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run(
    config: WorkerConfig,
    api: Box<dyn PolicyApi + Send>,
    clock: Arc<dyn Clock>,
    repaint: RepaintFn,
    mut commands: mpsc::UnboundedReceiver<DashboardCommand>,
    snapshot: watch::Sender<DashboardSnapshot>,
) {
    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => {
            log::error!("Failed to build worker runtime: {}", err);
            return;
        }
    };

    let api: Rc<dyn PolicyApi> = Rc::from(api as Box<dyn PolicyApi>);
    let notifier = NotificationService::new(config.notifications_enabled);
    let local = LocalSet::new();

    local.block_on(&runtime, async move {
        let core = DashboardCore::new(api, clock, Box::new(notifier), snapshot, repaint);

        let mut expiry_check = time::interval(TICK_INTERVAL);
        expiry_check.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut refresh = refresh_timer(config.refresh_interval);

        log::info!("Dashboard worker started");
        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    None | Some(DashboardCommand::Shutdown) => break,
                    Some(command) => {
                        tokio::task::spawn_local(Rc::clone(&core).handle(command));
                    }
                },
                _ = expiry_check.tick() => core.check_expired(),
                _ = next_refresh(&mut refresh) => {
                    if core.is_signed_in() {
                        log::debug!("Periodic policy refresh");
                        tokio::task::spawn_local(Rc::clone(&core).handle(DashboardCommand::Refresh));
                    }
                }
            }
        }
        log::info!("Dashboard worker stopping");
    });
}

fn refresh_timer(period: Duration) -> Option<Interval> {
    if period.is_zero() {
        return None;
    }
    let mut interval = time::interval_at(time::Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    Some(interval)
}

async fn next_refresh(refresh: &mut Option<Interval>) {
    match refresh {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}
