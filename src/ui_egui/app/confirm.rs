//! Confirmation dialog for destructive actions.

use egui::{Context, RichText};

use crate::models::policy::PolicyId;

/// Action awaiting confirmation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmAction {
    /// Delete a policy; its mail will never be sent
    DeletePolicy { id: PolicyId, subject: String },
    /// Close the policy form without saving
    DiscardChanges,
}

impl ConfirmAction {
    /// Get the dialog title
    pub fn title(&self) -> &'static str {
        match self {
            ConfirmAction::DeletePolicy { .. } => "Delete Policy",
            ConfirmAction::DiscardChanges => "Discard Changes",
        }
    }

    /// Get the confirmation message
    pub fn message(&self) -> String {
        match self {
            ConfirmAction::DeletePolicy { subject, .. } => format!(
                "Are you sure you want to delete \"{}\"?\n\nIts mail will never be sent. This cannot be undone.",
                subject
            ),
            ConfirmAction::DiscardChanges => {
                "You have unsaved changes.\n\nAre you sure you want to discard them?".to_string()
            }
        }
    }

    /// Get the confirm button text
    pub fn confirm_text(&self) -> &'static str {
        match self {
            ConfirmAction::DeletePolicy { .. } => "Delete",
            ConfirmAction::DiscardChanges => "Discard",
        }
    }

    /// Whether this action is destructive (shows a red button)
    pub fn is_destructive(&self) -> bool {
        matches!(self, ConfirmAction::DeletePolicy { .. })
    }
}

/// Result of the confirmation dialog
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmResult {
    /// User confirmed the action
    Confirmed,
    /// User cancelled (button or Escape)
    Cancelled,
    /// Dialog is still open (or nothing to confirm)
    Pending,
}

/// State for the confirmation dialog
#[derive(Debug, Default)]
pub struct ConfirmDialogState {
    /// The action waiting for an answer, if any
    pending_action: Option<ConfirmAction>,
}

impl ConfirmDialogState {
    /// Create a new closed dialog
    pub fn new() -> Self {
        Self::default()
    }

    /// Open the dialog for an action, replacing any pending one
    pub fn request(&mut self, action: ConfirmAction) {
        self.pending_action = Some(action);
    }

    /// Check if the dialog is showing
    pub fn is_open(&self) -> bool {
        self.pending_action.is_some()
    }

    /// Renders the dialog. On `Confirmed` the action is handed back.
    pub fn render(&mut self, ctx: &Context) -> (ConfirmResult, Option<ConfirmAction>) {
        let Some(action) = &self.pending_action else {
            return (ConfirmResult::Pending, None);
        };

        let mut result = ConfirmResult::Pending;

        egui::Window::new(action.title())
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
            .show(ctx, |ui| {
                ui.set_min_width(300.0);
                ui.set_max_width(400.0);
                ui.add_space(10.0);

                if action.is_destructive() {
                    ui.horizontal(|ui| {
                        ui.label(
                            RichText::new("⚠")
                                .size(24.0)
                                .color(egui::Color32::from_rgb(220, 150, 50)),
                        );
                        ui.vertical(|ui| {
                            ui.label(action.message());
                        });
                    });
                } else {
                    ui.label(action.message());
                }

                ui.add_space(15.0);
                ui.separator();
                ui.add_space(10.0);

                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    let confirm_button = if action.is_destructive() {
                        egui::Button::new(
                            RichText::new(action.confirm_text()).color(egui::Color32::WHITE),
                        )
                        .fill(egui::Color32::from_rgb(180, 60, 60))
                    } else {
                        egui::Button::new(action.confirm_text())
                    };

                    if ui.add(confirm_button).clicked() {
                        result = ConfirmResult::Confirmed;
                    }
                    ui.add_space(10.0);
                    if ui.button("Cancel").clicked() {
                        result = ConfirmResult::Cancelled;
                    }
                });
                ui.add_space(5.0);
            });

        if ctx.input(|i| i.key_pressed(egui::Key::Escape)) {
            result = ConfirmResult::Cancelled;
        }

        match result {
            ConfirmResult::Pending => (result, None),
            ConfirmResult::Confirmed => (result, self.pending_action.take()),
            ConfirmResult::Cancelled => {
                self.pending_action = None;
                (result, None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delete_message_names_the_policy() {
        let action = ConfirmAction::DeletePolicy {
            id: PolicyId(3),
            subject: "Safe combination".to_string(),
        };
        assert!(action.message().contains("\"Safe combination\""));
        assert!(action.is_destructive());
        assert_eq!(action.confirm_text(), "Delete");
        assert!(!ConfirmAction::DiscardChanges.is_destructive());
    }

    #[test]
    fn request_opens_dialog() {
        let mut dialog = ConfirmDialogState::new();
        assert!(!dialog.is_open());
        dialog.request(ConfirmAction::DiscardChanges);
        assert!(dialog.is_open());
    }
}
