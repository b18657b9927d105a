use egui::RichText;

use super::DashboardApp;
use crate::services::countdown::CountdownPhase;
use crate::services::worker::{DashboardCommand, SessionState};

impl DashboardApp {
    pub(super) fn render_status_bar(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::bottom("status_bar")
            .exact_height(24.0)
            .show(ctx, |ui| {
                ui.horizontal_centered(|ui| {
                    match &self.snapshot.session {
                        SessionState::SignedIn { email } => {
                            ui.label(RichText::new(format!("👤 {}", email)).small());
                            ui.separator();
                            let expired = self
                                .snapshot
                                .rows
                                .iter()
                                .filter(|row| row.countdown.borrow().phase() == CountdownPhase::Expired)
                                .count();
                            ui.label(
                                RichText::new(format!(
                                    "{} polic{} · {} expired",
                                    self.snapshot.rows.len(),
                                    if self.snapshot.rows.len() == 1 { "y" } else { "ies" },
                                    expired
                                ))
                                .small(),
                            );
                        }
                        SessionState::SigningIn => {
                            ui.label(RichText::new("Signing in…").small());
                        }
                        SessionState::SignedOut => {
                            ui.label(RichText::new("Not signed in").small());
                        }
                    }

                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        if self.snapshot.is_signed_in() && ui.small_button("Sign out").clicked() {
                            self.form = None;
                            self.worker.send(DashboardCommand::SignOut);
                        }
                        if let Some(error) = &self.snapshot.last_error {
                            ui.label(
                                RichText::new(format!("⚠ {}", error))
                                    .small()
                                    .color(ui.visuals().warn_fg_color),
                            );
                        }
                        ui.label(RichText::new(self.settings.api_url.as_str()).small().weak());
                    });
                });
            });
    }
}
