use egui::{Color32, RichText};
use egui_extras::{Column, TableBuilder};

use crate::models::policy::{Policy, PolicyId, PolicyStatus};
use crate::services::countdown::CountdownPhase;
use crate::services::worker::PolicyRow;
use crate::utils::date::format_date_local;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableAction {
    Edit(PolicyId),
    Delete { id: PolicyId, subject: String },
}

pub fn expiration_label(policy: &Policy) -> String {
    policy
        .expires_at()
        .map(format_date_local)
        .unwrap_or_else(|| "Invalid date".to_string())
}

pub fn recipients_label(policy: &Policy) -> String {
    policy.recipient_list().join(", ")
}

fn status_color(status: PolicyStatus, is_dark: bool) -> Color32 {
    match (status, is_dark) {
        (PolicyStatus::Active, true) => Color32::from_rgb(100, 220, 120),
        (PolicyStatus::Active, false) => Color32::from_rgb(30, 120, 50),
        (PolicyStatus::Inactive, true) => Color32::from_gray(150),
        (PolicyStatus::Inactive, false) => Color32::from_gray(110),
    }
}

/// Renders the policies table. Countdown cells read each row's latest
/// tick, so the table stays live as long as the UI keeps repainting.
pub fn render_policy_table(ui: &mut egui::Ui, rows: &[PolicyRow], is_dark: bool) -> Vec<TableAction> {
    let mut actions = Vec::new();

    if rows.is_empty() {
        ui.add_space(20.0);
        ui.vertical_centered(|ui| {
            ui.label(RichText::new("No policies yet. Create one to get started.").weak());
        });
        return actions;
    }

    let row_height = 28.0;
    TableBuilder::new(ui)
        .striped(true)
        .resizable(true)
        .cell_layout(egui::Layout::left_to_right(egui::Align::Center))
        .column(Column::initial(220.0).at_least(120.0).clip(true))
        .column(Column::initial(200.0).at_least(100.0).clip(true))
        .column(Column::initial(120.0).at_least(90.0))
        .column(Column::initial(130.0).at_least(110.0))
        .column(Column::initial(80.0).at_least(70.0))
        .column(Column::remainder().at_least(110.0))
        .header(row_height, |mut header| {
            for title in [
                "Recipients",
                "Subject",
                "Expiration Date",
                "Time to Trigger",
                "Status",
                "",
            ] {
                header.col(|ui| {
                    ui.strong(title);
                });
            }
        })
        .body(|mut body| {
            for row in rows {
                let policy = &row.policy;
                let countdown = *row.countdown.borrow();

                body.row(row_height, |mut table_row| {
                    table_row.col(|ui| {
                        ui.label(recipients_label(policy));
                    });
                    table_row.col(|ui| {
                        ui.label(&policy.subject);
                    });
                    table_row.col(|ui| {
                        ui.label(expiration_label(policy));
                    });
                    table_row.col(|ui| {
                        let text = RichText::new(countdown.display()).monospace();
                        let text = if countdown.phase() == CountdownPhase::Expired {
                            text.color(ui.visuals().warn_fg_color)
                        } else {
                            text
                        };
                        ui.label(text);
                    });
                    table_row.col(|ui| {
                        ui.label(
                            RichText::new(policy.status.label())
                                .color(status_color(policy.status, is_dark)),
                        );
                    });
                    table_row.col(|ui| {
                        if ui.small_button("✏ Edit").clicked() {
                            actions.push(TableAction::Edit(policy.id));
                        }
                        if ui.small_button("🗑 Delete").clicked() {
                            actions.push(TableAction::Delete {
                                id: policy.id,
                                subject: policy.subject.clone(),
                            });
                        }
                    });
                });
            }
        });

    actions
}
