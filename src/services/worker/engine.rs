use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::sync::Arc;

use tokio::sync::watch;

use super::{
    DashboardCommand, DashboardSnapshot, EditTarget, ExpiryNotifier, Notice, NoticeLevel,
    PolicyRow, SaveReport, SessionState,
};
use crate::models::policy::{Policy, PolicyDraft, PolicyId};
use crate::services::api::{ApiError, AuthToken, Credentials, PolicyApi};
use crate::services::countdown::{Clock, CountdownBoard};
use crate::services::policy_sync::{LoadOutcome, PolicySynchronizer};

const MAX_NOTICES: usize = 20;

struct Session {
    email: String,
    sync: PolicySynchronizer,
}

#[derive(Default)]
struct SharedState {
    signing_in: bool,
    in_flight: usize,
    last_error: Option<String>,
    notices: VecDeque<Notice>,
    editing: Option<EditTarget>,
    last_save: Option<SaveReport>,
    serial: u64,
}

impl SharedState {
    fn next_serial(&mut self) -> u64 {
        self.serial += 1;
        self.serial
    }

    fn push_notice(&mut self, level: NoticeLevel, message: String) {
        let serial = self.next_serial();
        self.notices.push_back(Notice {
            serial,
            level,
            message,
        });
        while self.notices.len() > MAX_NOTICES {
            self.notices.pop_front();
        }
    }

    fn record_save(&mut self, error: Option<String>) {
        let serial = self.next_serial();
        self.last_save = Some(SaveReport { serial, error });
    }
}

/// Dashboard state machine. Lives on a single-threaded runtime; every
/// command runs as its own local task and state is only touched between
/// awaits.
pub struct DashboardCore {
    api: Rc<dyn PolicyApi>,
    notifier: Box<dyn ExpiryNotifier>,
    session: RefCell<Option<Rc<Session>>>,
    board: RefCell<CountdownBoard>,
    shared: RefCell<SharedState>,
    snapshot: watch::Sender<DashboardSnapshot>,
    repaint: Box<dyn Fn()>,
}

/// Counts an operation as in flight until dropped.
struct InFlight<'a>(&'a DashboardCore);

impl<'a> InFlight<'a> {
    fn begin(core: &'a DashboardCore) -> Self {
        core.shared.borrow_mut().in_flight += 1;
        core.publish();
        Self(core)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        {
            let mut shared = self.0.shared.borrow_mut();
            shared.in_flight = shared.in_flight.saturating_sub(1);
        }
        self.0.publish();
    }
}

impl DashboardCore {
    pub fn new(
        api: Rc<dyn PolicyApi>,
        clock: Arc<dyn Clock>,
        notifier: Box<dyn ExpiryNotifier>,
        snapshot: watch::Sender<DashboardSnapshot>,
        repaint: Box<dyn Fn()>,
    ) -> Rc<Self> {
        Rc::new(Self {
            api,
            notifier,
            session: RefCell::new(None),
            board: RefCell::new(CountdownBoard::new(clock)),
            shared: RefCell::new(SharedState::default()),
            snapshot,
            repaint,
        })
    }

    pub fn is_signed_in(&self) -> bool {
        self.session.borrow().is_some()
    }

    pub fn live_timers(&self) -> usize {
        self.board.borrow().live_timers()
    }

    pub async fn handle(self: Rc<Self>, command: DashboardCommand) {
        log::debug!("Handling {:?}", command);
        match command {
            DashboardCommand::SignIn(credentials) => self.sign_in(credentials).await,
            DashboardCommand::SignUp(credentials) => self.sign_up(credentials).await,
            DashboardCommand::SignOut => self.sign_out(),
            DashboardCommand::Refresh => self.refresh().await,
            DashboardCommand::Delete(id) => self.delete(id).await,
            DashboardCommand::Create(draft) => self.save(None, draft).await,
            DashboardCommand::Update(id, draft) => self.save(Some(id), draft).await,
            DashboardCommand::OpenForEdit(id) => self.open_for_edit(id).await,
            DashboardCommand::CloseEditor => {
                self.shared.borrow_mut().editing = None;
                self.publish();
            }
            // Handled by the worker loop
            DashboardCommand::Shutdown => {}
        }
    }

    async fn sign_in(&self, credentials: Credentials) {
        if let Err(message) = credentials.validate() {
            self.notice(NoticeLevel::Error, message);
            return;
        }

        self.shared.borrow_mut().signing_in = true;
        self.publish();

        let result = self.api.sign_in(&credentials).await;
        let token = match result {
            Ok(token) => token,
            Err(err) => {
                log::warn!("Sign-in failed for {}: {}", credentials.email, err);
                let message = if err.is_unauthorized() {
                    "Invalid email or password".to_string()
                } else {
                    format!("Sign-in failed: {}", err)
                };
                {
                    let mut shared = self.shared.borrow_mut();
                    shared.signing_in = false;
                    shared.last_error = Some(message.clone());
                    shared.push_notice(NoticeLevel::Error, message);
                }
                self.publish();
                return;
            }
        };

        let email = self.resolve_email(&token, &credentials).await;
        log::info!("Signed in as {}", email);

        let session = Rc::new(Session {
            email,
            sync: PolicySynchronizer::new(Rc::clone(&self.api), token),
        });
        self.board.borrow_mut().clear();
        self.session.replace(Some(Rc::clone(&session)));
        {
            let mut shared = self.shared.borrow_mut();
            shared.signing_in = false;
            shared.last_error = None;
            shared.editing = None;
        }

        self.load(&session).await;
    }

    async fn resolve_email(&self, token: &AuthToken, credentials: &Credentials) -> String {
        match self.api.current_user(token).await {
            Ok(user) => user.email,
            Err(err) => {
                log::warn!("Could not read current user, using sign-in email: {}", err);
                credentials.email.clone()
            }
        }
    }

    async fn sign_up(&self, credentials: Credentials) {
        if let Err(message) = credentials.validate() {
            self.notice(NoticeLevel::Error, message);
            return;
        }

        let result = {
            let _busy = InFlight::begin(self);
            self.api.sign_up(&credentials).await
        };

        match result {
            Ok(account) => {
                log::info!("Created account {}", account.email);
                self.notice(
                    NoticeLevel::Success,
                    format!("Account created for {}", account.email),
                );
                self.sign_in(credentials).await;
            }
            Err(err) => {
                log::warn!("Sign-up failed for {}: {}", credentials.email, err);
                self.fail(format!("Sign-up failed: {}", err));
            }
        }
    }

    fn sign_out(&self) {
        if let Some(session) = self.session.replace(None) {
            log::info!("Signed out {}", session.email);
        }
        let cancelled = self.board.borrow_mut().clear();
        log::debug!("Cancelled {} countdown timers on sign-out", cancelled);
        {
            let mut shared = self.shared.borrow_mut();
            shared.editing = None;
            shared.last_error = None;
            shared.push_notice(NoticeLevel::Info, "Signed out".to_string());
        }
        self.publish();
    }

    async fn refresh(&self) {
        let Some(session) = self.current_session() else {
            return;
        };
        self.load(&session).await;
    }

    async fn load(&self, session: &Rc<Session>) {
        let outcome = {
            let _busy = InFlight::begin(self);
            session.sync.load_policies().await
        };

        if !self.is_current(session) {
            return;
        }
        self.apply_outcome(outcome);
    }

    async fn delete(&self, id: PolicyId) {
        let Some(session) = self.current_session() else {
            return;
        };

        let result = {
            let _busy = InFlight::begin(self);
            session.sync.delete_policy(id).await
        };

        if !self.is_current(&session) {
            return;
        }

        match result {
            Ok(outcome) => {
                self.notice(NoticeLevel::Success, "Policy deleted".to_string());
                self.apply_outcome(outcome);
            }
            Err(err) => self.report(&format!("Failed to delete policy {}", id), err),
        }
    }

    async fn save(&self, id: Option<PolicyId>, draft: PolicyDraft) {
        if let Err(message) = draft.validate() {
            self.reject_save(message);
            return;
        }

        let Some(session) = self.current_session() else {
            self.reject_save("Not signed in".to_string());
            return;
        };

        let result = {
            let _busy = InFlight::begin(self);
            match id {
                Some(id) => session.sync.update_policy(id, &draft).await,
                None => session.sync.create_policy(&draft).await,
            }
        };

        if !self.is_current(&session) {
            return;
        }

        match result {
            Ok((policy, outcome)) => {
                {
                    let mut shared = self.shared.borrow_mut();
                    shared.record_save(None);
                    shared.editing = None;
                    shared.push_notice(
                        NoticeLevel::Success,
                        format!("Saved '{}'", policy.subject),
                    );
                }
                self.apply_outcome(outcome);
            }
            Err(err) => {
                let verb = if id.is_some() { "update" } else { "create" };
                let context = format!("Failed to {} policy", verb);
                self.shared
                    .borrow_mut()
                    .record_save(Some(format!("{}: {}", context, err)));
                self.report(&context, err);
            }
        }
    }

    fn reject_save(&self, message: String) {
        {
            let mut shared = self.shared.borrow_mut();
            shared.record_save(Some(message.clone()));
            shared.push_notice(NoticeLevel::Error, message);
        }
        self.publish();
    }

    async fn open_for_edit(&self, id: PolicyId) {
        let Some(session) = self.current_session() else {
            return;
        };

        let result = {
            let _busy = InFlight::begin(self);
            session.sync.fetch_policy(id).await
        };

        if !self.is_current(&session) {
            return;
        }

        match result {
            Ok(policy) => {
                {
                    let mut shared = self.shared.borrow_mut();
                    let serial = shared.next_serial();
                    shared.editing = Some(EditTarget { serial, policy });
                }
                self.publish();
            }
            Err(err) => self.report(&format!("Failed to open policy {}", id), err),
        }
    }

    /// Reports countdowns that just reached zero. Called once per tick.
    pub fn check_expired(&self) {
        let expired = self.board.borrow_mut().take_expired();
        if expired.is_empty() {
            return;
        }

        let Some(session) = self.current_session() else {
            return;
        };
        let policies = session.sync.policies();
        for id in expired {
            let Some(policy) = policies.iter().find(|policy| policy.id == id) else {
                continue;
            };
            log::info!("Policy {} ('{}') expired", policy.id, policy.subject);
            self.notifier.policy_expired(policy);
            self.shared
                .borrow_mut()
                .push_notice(NoticeLevel::Warning, format!("'{}' has expired", policy.subject));
        }
        self.publish();
    }

    fn apply_outcome(&self, outcome: LoadOutcome) {
        match outcome {
            LoadOutcome::Replaced { .. } => {
                self.shared.borrow_mut().last_error = None;
                self.publish();
            }
            LoadOutcome::Stale { .. } => {}
            LoadOutcome::Failed(err) => self.report("Failed to load policies", err),
        }
    }

    fn report(&self, context: &str, err: ApiError) {
        log::warn!("{}: {}", context, err);
        if err.is_unauthorized() {
            self.session.replace(None);
            self.board.borrow_mut().clear();
            {
                let mut shared = self.shared.borrow_mut();
                shared.editing = None;
                shared.last_error = Some("Session expired; sign in again".to_string());
                shared.push_notice(
                    NoticeLevel::Warning,
                    "Session expired; sign in again".to_string(),
                );
            }
            self.publish();
            return;
        }
        self.fail(format!("{}: {}", context, err));
    }

    fn fail(&self, message: String) {
        {
            let mut shared = self.shared.borrow_mut();
            shared.last_error = Some(message.clone());
            shared.push_notice(NoticeLevel::Error, message);
        }
        self.publish();
    }

    fn notice(&self, level: NoticeLevel, message: String) {
        self.shared.borrow_mut().push_notice(level, message);
        self.publish();
    }

    fn current_session(&self) -> Option<Rc<Session>> {
        self.session.borrow().clone()
    }

    fn is_current(&self, session: &Rc<Session>) -> bool {
        self.session
            .borrow()
            .as_ref()
            .is_some_and(|current| Rc::ptr_eq(current, session))
    }

    fn publish(&self) {
        let session = self.current_session();
        let shared = self.shared.borrow();

        let (state, rows) = match &session {
            Some(session) => {
                let policies: Vec<Policy> = session.sync.policies();
                let mut board = self.board.borrow_mut();
                board.reconcile(&policies);
                let rows = policies
                    .into_iter()
                    .filter_map(|policy| {
                        board.receiver(policy.id).map(|countdown| PolicyRow { policy, countdown })
                    })
                    .collect();
                (
                    SessionState::SignedIn {
                        email: session.email.clone(),
                    },
                    rows,
                )
            }
            None if shared.signing_in => (SessionState::SigningIn, Vec::new()),
            None => (SessionState::SignedOut, Vec::new()),
        };

        self.snapshot.send_replace(DashboardSnapshot {
            session: state,
            rows,
            busy: shared.in_flight > 0,
            last_error: shared.last_error.clone(),
            notices: shared.notices.iter().cloned().collect(),
            editing: shared.editing.clone(),
            last_save: shared.last_save.clone(),
        });
        drop(shared);
        (self.repaint)();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::policy::PolicyStatus;
    use crate::services::api::{MockPolicyApi, UserAccount};
    use crate::services::countdown::test_support::PausedClock;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use std::cell::Cell;

    fn origin() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 19, 9, 0, 0).unwrap()
    }

    fn policy(id: i64, expires_in_secs: i64) -> Policy {
        Policy {
            id: PolicyId(id),
            sender_id: Some(1),
            recipients: "friend@example.com".to_string(),
            subject: format!("policy {}", id),
            body: "open the safe".to_string(),
            expiration_date: (origin() + Duration::seconds(expires_in_secs)).to_rfc3339(),
            attachments: Vec::new(),
            status: PolicyStatus::Active,
        }
    }

    #[derive(Default)]
    struct RecordingNotifier {
        fired: Rc<RefCell<Vec<PolicyId>>>,
    }

    impl ExpiryNotifier for RecordingNotifier {
        fn policy_expired(&self, policy: &Policy) {
            self.fired.borrow_mut().push(policy.id);
        }
    }

    struct Harness {
        core: Rc<DashboardCore>,
        snapshot: watch::Receiver<DashboardSnapshot>,
        fired: Rc<RefCell<Vec<PolicyId>>>,
        repaints: Rc<Cell<usize>>,
    }

    fn harness(api: MockPolicyApi) -> Harness {
        let (sender, snapshot) = watch::channel(DashboardSnapshot::default());
        let notifier = RecordingNotifier::default();
        let fired = Rc::clone(&notifier.fired);
        let repaints = Rc::new(Cell::new(0));
        let counter = Rc::clone(&repaints);
        let core = DashboardCore::new(
            Rc::new(api),
            Arc::new(PausedClock::new(origin())),
            Box::new(notifier),
            sender,
            Box::new(move || counter.set(counter.get() + 1)),
        );
        Harness {
            core,
            snapshot,
            fired,
            repaints,
        }
    }

    fn signed_in_api(policies: Vec<Policy>) -> MockPolicyApi {
        let mut api = MockPolicyApi::new();
        api.expect_sign_in()
            .returning(|_| Ok(AuthToken::new("jwt")));
        api.expect_current_user().returning(|_| {
            Ok(UserAccount {
                id: Some(1),
                email: "me@example.com".to_string(),
                is_active: true,
            })
        });
        api.expect_list_policies()
            .returning(move |_| Ok(policies.clone()));
        api
    }

    async fn sign_in(core: &Rc<DashboardCore>) {
        Rc::clone(core)
            .handle(DashboardCommand::SignIn(Credentials::new(
                "me@example.com",
                "secret123",
            )))
            .await;
    }

    #[tokio::test(start_paused = true)]
    async fn sign_in_loads_rows_with_countdowns() {
        let h = harness(signed_in_api(vec![policy(1, 90_061), policy(2, 30)]));
        sign_in(&h.core).await;

        let snapshot = h.snapshot.borrow().clone();
        assert_eq!(
            snapshot.session,
            SessionState::SignedIn {
                email: "me@example.com".to_string()
            }
        );
        assert_eq!(snapshot.rows.len(), 2);
        assert_eq!(snapshot.rows[0].countdown.borrow().display(), "1d 1h 1m 1s");
        assert!(!snapshot.busy);
        assert_eq!(h.core.live_timers(), 2);
        assert!(h.repaints.get() > 0);
    }

    #[tokio::test(start_paused = true)]
    async fn invalid_credentials_never_reach_the_api() {
        let h = harness(MockPolicyApi::new());
        Rc::clone(&h.core)
            .handle(DashboardCommand::SignIn(Credentials::new("nobody", "x")))
            .await;

        let snapshot = h.snapshot.borrow().clone();
        assert_eq!(snapshot.session, SessionState::SignedOut);
        assert_eq!(snapshot.notices.len(), 1);
        assert_eq!(snapshot.notices[0].level, NoticeLevel::Error);
    }

    #[tokio::test(start_paused = true)]
    async fn rejected_sign_in_stays_signed_out() {
        let mut api = MockPolicyApi::new();
        api.expect_sign_in()
            .returning(|_| Err(ApiError::Unauthorized));
        let h = harness(api);
        sign_in(&h.core).await;

        let snapshot = h.snapshot.borrow().clone();
        assert_eq!(snapshot.session, SessionState::SignedOut);
        assert_eq!(snapshot.last_error.as_deref(), Some("Invalid email or password"));
    }

    #[tokio::test(start_paused = true)]
    async fn sign_out_clears_rows_and_timers() {
        let h = harness(signed_in_api(vec![policy(1, 600), policy(2, 600)]));
        sign_in(&h.core).await;
        assert_eq!(h.core.live_timers(), 2);

        Rc::clone(&h.core).handle(DashboardCommand::SignOut).await;

        let snapshot = h.snapshot.borrow().clone();
        assert_eq!(snapshot.session, SessionState::SignedOut);
        assert!(snapshot.rows.is_empty());
        assert_eq!(h.core.live_timers(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn unauthorized_reload_ends_the_session() {
        let mut api = signed_in_api(Vec::new());
        api.expect_delete_policy()
            .returning(|_, _| Err(ApiError::Unauthorized));
        let h = harness(api);
        sign_in(&h.core).await;

        Rc::clone(&h.core)
            .handle(DashboardCommand::Delete(PolicyId(4)))
            .await;

        let snapshot = h.snapshot.borrow().clone();
        assert_eq!(snapshot.session, SessionState::SignedOut);
        assert!(!h.core.is_signed_in());
    }

    #[tokio::test(start_paused = true)]
    async fn invalid_draft_is_not_sent() {
        let h = harness(signed_in_api(Vec::new()));
        sign_in(&h.core).await;

        Rc::clone(&h.core)
            .handle(DashboardCommand::Create(PolicyDraft::default()))
            .await;

        let snapshot = h.snapshot.borrow().clone();
        let report = snapshot.last_save.unwrap();
        assert!(report.error.is_some());
        assert_eq!(snapshot.notices.last().unwrap().level, NoticeLevel::Error);
    }

    #[tokio::test(start_paused = true)]
    async fn expiry_notifies_once() {
        let h = harness(signed_in_api(vec![policy(1, 2), policy(2, 3_600)]));
        sign_in(&h.core).await;

        h.core.check_expired();
        assert!(h.fired.borrow().is_empty());

        tokio::time::sleep(std::time::Duration::from_secs(3)).await;
        h.core.check_expired();
        h.core.check_expired();

        assert_eq!(*h.fired.borrow(), vec![PolicyId(1)]);
        let snapshot = h.snapshot.borrow().clone();
        assert_eq!(snapshot.rows[0].countdown.borrow().display(), "Time's up!");
        assert_eq!(snapshot.notices.last().unwrap().level, NoticeLevel::Warning);
    }

    #[tokio::test(start_paused = true)]
    async fn open_for_edit_publishes_target() {
        let mut api = signed_in_api(vec![policy(7, 600)]);
        api.expect_get_policy()
            .returning(|_, id| Ok(policy(id.0, 600)));
        let h = harness(api);
        sign_in(&h.core).await;

        Rc::clone(&h.core)
            .handle(DashboardCommand::OpenForEdit(PolicyId(7)))
            .await;
        let editing = h.snapshot.borrow().editing.clone().unwrap();
        assert_eq!(editing.policy.id, PolicyId(7));

        Rc::clone(&h.core).handle(DashboardCommand::CloseEditor).await;
        assert!(h.snapshot.borrow().editing.is_none());
    }
}
