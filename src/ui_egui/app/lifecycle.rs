use std::time::Duration;

use anyhow::Result;

use super::confirm::{ConfirmAction, ConfirmDialogState, ConfirmResult};
use super::login::LoginFormState;
use super::policy_form::{self, FormAction, PolicyFormState};
use super::policy_table::{render_policy_table, TableAction};
use super::toast::ToastManager;
use super::DashboardApp;
use crate::models::settings::Settings;
use crate::services::api::HttpPolicyApi;
use crate::services::settings::SettingsService;
use crate::services::worker::{
    DashboardCommand, DashboardWorker, SessionState, WorkerConfig,
};

impl DashboardApp {
    pub fn new(
        cc: &eframe::CreationContext<'_>,
        settings: Settings,
        settings_service: SettingsService,
    ) -> Result<Self> {
        let api = HttpPolicyApi::new(&settings)?;
        log::info!("Using policy API at {}", api.base_url());

        let repaint_ctx = cc.egui_ctx.clone();
        let worker = DashboardWorker::spawn(
            WorkerConfig {
                refresh_interval: Duration::from_secs(settings.refresh_interval_secs),
                notifications_enabled: settings.notifications_enabled,
            },
            Box::new(api),
            Box::new(move || repaint_ctx.request_repaint()),
        )?;

        let is_dark = apply_system_theme(&cc.egui_ctx);
        let login = LoginFormState::new(settings.last_email.as_deref());

        Ok(Self {
            snapshot: worker.snapshot(),
            worker,
            settings,
            settings_service,
            login,
            form: None,
            opened_edit: 0,
            confirm_dialog: ConfirmDialogState::new(),
            toast_manager: ToastManager::new(),
            is_dark,
        })
    }

    pub(super) fn handle_update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.snapshot = self.worker.snapshot();
        self.toast_manager.absorb(&self.snapshot.notices);
        self.sync_form_with_worker();

        self.render_status_bar(ctx);

        egui::CentralPanel::default().show(ctx, |ui| match self.snapshot.session.clone() {
            SessionState::SignedIn { .. } => self.render_dashboard(ui),
            SessionState::SigningIn => self.login.render_disabled(ui),
            SessionState::SignedOut => {
                self.form = None;
                if let Some(command) = self.login.render(ui, false) {
                    self.remember_email();
                    self.worker.send(command);
                }
            }
        });

        self.render_form(ctx);
        self.render_confirm_dialog(ctx);
        self.toast_manager.render(ctx, self.is_dark);

        // Countdown cells change every second without a worker publish
        if self.snapshot.is_signed_in() && !self.snapshot.rows.is_empty() {
            ctx.request_repaint_after(Duration::from_secs(1));
        }
    }

    pub(super) fn handle_exit(&mut self) {
        log::info!("Shutting down dashboard");
        self.worker.shutdown();
    }

    fn render_dashboard(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.heading("Policies");
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                if ui.button("➕ Create Policy").clicked() && self.form.is_none() {
                    self.form = Some(PolicyFormState::create(policy_form::today()));
                }
                if ui.button("⟳ Refresh").clicked() {
                    self.worker.send(DashboardCommand::Refresh);
                }
                if self.snapshot.busy {
                    ui.spinner();
                }
            });
        });
        ui.separator();

        let actions = render_policy_table(ui, &self.snapshot.rows, self.is_dark);
        if self.confirm_dialog.is_open() {
            return;
        }
        for action in actions {
            match action {
                TableAction::Edit(id) => self.worker.send(DashboardCommand::OpenForEdit(id)),
                TableAction::Delete { id, subject } => self
                    .confirm_dialog
                    .request(ConfirmAction::DeletePolicy { id, subject }),
            }
        }
    }

    /// Opens fetched edit targets and closes the form once a save lands.
    fn sync_form_with_worker(&mut self) {
        if let Some(target) = &self.snapshot.editing {
            if target.serial > self.opened_edit {
                self.opened_edit = target.serial;
                self.form = Some(PolicyFormState::edit(&target.policy, policy_form::today()));
            }
        }

        let Some(form) = &mut self.form else {
            return;
        };
        match form.save_outcome(self.snapshot.last_save.as_ref()) {
            Some(Ok(())) => self.close_form(),
            Some(Err(error)) => form.submit_failed(error),
            None => {}
        }
    }

    fn render_form(&mut self, ctx: &egui::Context) {
        let Some(form) = &mut self.form else {
            return;
        };

        let seen_serial = self
            .snapshot
            .last_save
            .as_ref()
            .map_or(0, |report| report.serial);
        match form.render(ctx, seen_serial) {
            FormAction::None => {}
            FormAction::Submit(command) => self.worker.send(command),
            FormAction::ConfirmDiscard => self.confirm_dialog.request(ConfirmAction::DiscardChanges),
            FormAction::Close => self.close_form(),
        }
    }

    fn close_form(&mut self) {
        self.form = None;
        self.worker.send(DashboardCommand::CloseEditor);
    }

    fn render_confirm_dialog(&mut self, ctx: &egui::Context) {
        let (result, action) = self.confirm_dialog.render(ctx);
        if result != ConfirmResult::Confirmed {
            return;
        }
        match action {
            Some(ConfirmAction::DeletePolicy { id, .. }) => {
                self.worker.send(DashboardCommand::Delete(id));
            }
            Some(ConfirmAction::DiscardChanges) => self.close_form(),
            None => {}
        }
    }

    fn remember_email(&mut self) {
        let email = self.login.email.trim().to_string();
        if self.settings.last_email.as_deref() == Some(email.as_str()) {
            return;
        }
        if let Err(err) = self.settings_service.remember_last_email(&email) {
            log::warn!("Failed to save settings: {:#}", err);
            self.toast_manager.error("Could not save settings");
        }
        self.settings.last_email = Some(email);
    }
}

/// Follows the OS light/dark preference. Returns true for dark.
fn apply_system_theme(ctx: &egui::Context) -> bool {
    let is_dark = match dark_light::detect() {
        dark_light::Mode::Dark => true,
        dark_light::Mode::Light => false,
        dark_light::Mode::Default => ctx.style().visuals.dark_mode,
    };
    ctx.set_visuals(if is_dark {
        egui::Visuals::dark()
    } else {
        egui::Visuals::light()
    });
    is_dark
}
