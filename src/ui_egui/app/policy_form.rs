use chrono::{Duration, Local, NaiveDate};
use egui::RichText;
use egui_extras::DatePickerButton;

use crate::models::policy::{Policy, PolicyDraft, PolicyId, PolicyStatus};
use crate::services::worker::{DashboardCommand, SaveReport};
use crate::utils::date::{parse_expiration, to_wire_date};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormMode {
    Create,
    Edit(PolicyId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormAction {
    None,
    Submit(DashboardCommand),
    /// Close was requested while the draft has unsaved edits
    ConfirmDiscard,
    Close,
}

#[derive(Debug, Clone)]
pub struct PolicyFormState {
    pub mode: FormMode,
    pub draft: PolicyDraft,
    pub expiration: NaiveDate,
    pub error: Option<String>,
    /// Save report serial seen when the form was submitted
    pub submitted_after: Option<u64>,
    original: PolicyDraft,
    original_expiration: NaiveDate,
}

impl PolicyFormState {
    pub fn create(today: NaiveDate) -> Self {
        let expiration = today + Duration::days(30);
        let draft = PolicyDraft {
            expiration_date: to_wire_date(expiration),
            ..PolicyDraft::default()
        };
        Self::with_draft(FormMode::Create, draft, expiration)
    }

    pub fn edit(policy: &Policy, today: NaiveDate) -> Self {
        let expiration = parse_expiration(&policy.expiration_date)
            .map(|at| at.date_naive())
            .unwrap_or(today);
        Self::with_draft(FormMode::Edit(policy.id), policy.to_draft(), expiration)
    }

    fn with_draft(mode: FormMode, draft: PolicyDraft, expiration: NaiveDate) -> Self {
        Self {
            mode,
            original: draft.clone(),
            original_expiration: expiration,
            draft,
            expiration,
            error: None,
            submitted_after: None,
        }
    }

    pub fn title(&self) -> String {
        match self.mode {
            FormMode::Create => "Create Policy".to_string(),
            FormMode::Edit(id) => format!("Edit Policy #{}", id),
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.draft != self.original || self.expiration != self.original_expiration
    }

    pub fn is_submitting(&self) -> bool {
        self.submitted_after.is_some()
    }

    /// Validates the draft and builds the save command.
    pub fn to_command(&mut self) -> Result<DashboardCommand, String> {
        if self.expiration != self.original_expiration
            || parse_expiration(&self.draft.expiration_date).is_none()
        {
            self.draft.expiration_date = to_wire_date(self.expiration);
        }
        if self.mode == FormMode::Create {
            self.draft.status = PolicyStatus::Active;
        }
        self.draft.validate()?;

        Ok(match self.mode {
            FormMode::Create => DashboardCommand::Create(self.draft.clone()),
            FormMode::Edit(id) => DashboardCommand::Update(id, self.draft.clone()),
        })
    }

    /// Outcome of our submit, once the worker reports a save newer than it.
    pub fn save_outcome(&self, report: Option<&SaveReport>) -> Option<Result<(), String>> {
        let before = self.submitted_after?;
        let report = report.filter(|report| report.serial > before)?;
        Some(match &report.error {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        })
    }

    fn attach_files(&mut self) {
        let Some(paths) = rfd::FileDialog::new()
            .set_title("Attach files")
            .pick_files()
        else {
            return;
        };

        for path in paths {
            let Some(name) = path.file_name().map(|name| name.to_string_lossy().to_string())
            else {
                continue;
            };
            if !self.draft.add_attachment(name.as_str()) {
                log::debug!("Attachment '{}' already listed", name);
            }
        }
    }

    /// `seen_serial` is the serial of the latest save report, if any.
    pub fn render(&mut self, ctx: &egui::Context, seen_serial: u64) -> FormAction {
        let mut action = FormAction::None;
        let mut open = true;
        let submitting = self.is_submitting();

        egui::Window::new(self.title())
            .id(egui::Id::new("policy_form"))
            .collapsible(false)
            .resizable(true)
            .default_width(460.0)
            .open(&mut open)
            .show(ctx, |ui| {
                ui.add_enabled_ui(!submitting, |ui| {
                    egui::Grid::new("policy_form_grid")
                        .num_columns(2)
                        .spacing([12.0, 8.0])
                        .show(ui, |ui| {
                            ui.label("Recipients");
                            ui.add(
                                egui::TextEdit::singleline(&mut self.draft.recipients)
                                    .hint_text("Space separated email addresses")
                                    .desired_width(320.0),
                            );
                            ui.end_row();

                            ui.label("Subject");
                            ui.add(
                                egui::TextEdit::singleline(&mut self.draft.subject)
                                    .desired_width(320.0),
                            );
                            ui.end_row();

                            ui.label("Body");
                            ui.add(
                                egui::TextEdit::multiline(&mut self.draft.body)
                                    .desired_rows(6)
                                    .desired_width(320.0),
                            );
                            ui.end_row();

                            ui.label("Expiration");
                            ui.add(DatePickerButton::new(&mut self.expiration).id_source("policy_expiration"));
                            ui.end_row();

                            if matches!(self.mode, FormMode::Edit(_)) {
                                ui.label("Status");
                                ui.horizontal(|ui| {
                                    ui.radio_value(&mut self.draft.status, PolicyStatus::Active, "Active");
                                    ui.radio_value(
                                        &mut self.draft.status,
                                        PolicyStatus::Inactive,
                                        "Inactive",
                                    );
                                });
                                ui.end_row();
                            }

                            ui.label("Attachments");
                            ui.vertical(|ui| {
                                let mut removed = None;
                                for name in &self.draft.attachments {
                                    ui.horizontal(|ui| {
                                        ui.label(name);
                                        if ui.small_button("✖").on_hover_text("Remove").clicked() {
                                            removed = Some(name.clone());
                                        }
                                    });
                                }
                                if let Some(name) = removed {
                                    self.draft.remove_attachment(&name);
                                }
                                if ui.button("📎 Attach files…").clicked() {
                                    self.attach_files();
                                }
                            });
                            ui.end_row();
                        });
                });

                if let Some(error) = &self.error {
                    ui.add_space(6.0);
                    ui.colored_label(ui.visuals().error_fg_color, error);
                }

                ui.add_space(10.0);
                ui.separator();
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    let label = match self.mode {
                        FormMode::Create => "Create Policy",
                        FormMode::Edit(_) => "Save Changes",
                    };
                    let save = ui.add_enabled(!submitting, egui::Button::new(RichText::new(label).strong()));
                    if save.clicked() {
                        match self.to_command() {
                            Ok(command) => {
                                self.error = None;
                                self.submitted_after = Some(seen_serial);
                                action = FormAction::Submit(command);
                            }
                            Err(message) => self.error = Some(message),
                        }
                    }
                    if ui.button("Cancel").clicked() {
                        action = self.close_action();
                    }
                    if submitting {
                        ui.spinner();
                    }
                });
            });

        if !open {
            action = self.close_action();
        }
        action
    }

    fn close_action(&self) -> FormAction {
        if self.is_dirty() && !self.is_submitting() {
            FormAction::ConfirmDiscard
        } else {
            FormAction::Close
        }
    }

    /// Re-enables the form after a failed save.
    pub fn submit_failed(&mut self, message: String) {
        self.submitted_after = None;
        self.error = Some(message);
    }
}

pub fn today() -> NaiveDate {
    Local::now().date_naive()
}
