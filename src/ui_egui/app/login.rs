use egui::RichText;

use crate::services::api::{Credentials, MIN_PASSWORD_LEN};
use crate::services::worker::DashboardCommand;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoginMode {
    #[default]
    SignIn,
    SignUp,
}

#[derive(Debug, Default)]
pub struct LoginFormState {
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub mode: LoginMode,
    pub error: Option<String>,
}

impl LoginFormState {
    pub fn new(last_email: Option<&str>) -> Self {
        Self {
            email: last_email.unwrap_or_default().to_string(),
            ..Self::default()
        }
    }

    /// Builds the command for the current mode, or a message for the user.
    pub fn submit(&mut self) -> Result<DashboardCommand, String> {
        let credentials = Credentials::new(self.email.as_str(), self.password.as_str());
        credentials.validate()?;

        let command = match self.mode {
            LoginMode::SignIn => DashboardCommand::SignIn(credentials),
            LoginMode::SignUp => {
                if self.password != self.confirm_password {
                    return Err("Passwords do not match".to_string());
                }
                DashboardCommand::SignUp(credentials)
            }
        };

        self.password.clear();
        self.confirm_password.clear();
        Ok(command)
    }

    pub fn toggle_mode(&mut self) {
        self.mode = match self.mode {
            LoginMode::SignIn => LoginMode::SignUp,
            LoginMode::SignUp => LoginMode::SignIn,
        };
        self.error = None;
        self.confirm_password.clear();
    }

    /// Shows the form greyed out while a sign-in is in flight.
    pub fn render_disabled(&mut self, ui: &mut egui::Ui) {
        if let Some(command) = self.render(ui, true) {
            log::debug!("Ignoring {:?} while signing in", command);
        }
    }

    pub fn render(&mut self, ui: &mut egui::Ui, signing_in: bool) -> Option<DashboardCommand> {
        let mut command = None;

        ui.vertical_centered(|ui| {
            ui.add_space(60.0);
            ui.heading(match self.mode {
                LoginMode::SignIn => "Please log in to continue.",
                LoginMode::SignUp => "Create an account",
            });
            ui.add_space(20.0);

            egui::Grid::new("login_grid")
                .num_columns(2)
                .spacing([12.0, 8.0])
                .show(ui, |ui| {
                    ui.label("Email");
                    ui.add(
                        egui::TextEdit::singleline(&mut self.email)
                            .hint_text("Enter your email address")
                            .desired_width(260.0),
                    );
                    ui.end_row();

                    ui.label("Password");
                    let password = ui.add(
                        egui::TextEdit::singleline(&mut self.password)
                            .password(true)
                            .hint_text(format!("At least {} characters", MIN_PASSWORD_LEN))
                            .desired_width(260.0),
                    );
                    ui.end_row();

                    let mut submitted_by_enter =
                        password.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));

                    if self.mode == LoginMode::SignUp {
                        ui.label("Confirm");
                        let confirm = ui.add(
                            egui::TextEdit::singleline(&mut self.confirm_password)
                                .password(true)
                                .desired_width(260.0),
                        );
                        ui.end_row();
                        submitted_by_enter = confirm.lost_focus()
                            && ui.input(|i| i.key_pressed(egui::Key::Enter));
                    }

                    if submitted_by_enter && !signing_in {
                        command = Some(());
                    }
                });

            ui.add_space(12.0);
            let label = match self.mode {
                LoginMode::SignIn => "Log in",
                LoginMode::SignUp => "Sign up",
            };
            ui.add_enabled_ui(!signing_in, |ui| {
                if ui.button(RichText::new(label).strong()).clicked() {
                    command = Some(());
                }
            });
            if signing_in {
                ui.add_space(6.0);
                ui.spinner();
            }

            if let Some(error) = &self.error {
                ui.add_space(8.0);
                ui.colored_label(ui.visuals().error_fg_color, error);
            }

            ui.add_space(12.0);
            let toggle = match self.mode {
                LoginMode::SignIn => "Don't have an account? Sign up",
                LoginMode::SignUp => "Already have an account? Log in",
            };
            if ui.link(toggle).clicked() {
                self.toggle_mode();
            }
        });

        command.and_then(|()| match self.submit() {
            Ok(command) => {
                self.error = None;
                Some(command)
            }
            Err(message) => {
                self.error = Some(message);
                None
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_in_clears_password_after_submit() {
        let mut form = LoginFormState::new(Some("me@example.com"));
        form.password = "secret123".to_string();

        let command = form.submit().unwrap();
        assert!(matches!(command, DashboardCommand::SignIn(ref c) if c.email == "me@example.com"));
        assert!(form.password.is_empty());
    }

    #[test]
    fn disabled_render_never_submits() {
        let ctx = egui::Context::default();
        let mut form = LoginFormState::new(Some("me@example.com"));
        form.password = "secret123".to_string();

        let mut input = egui::RawInput::default();
        input.events.push(egui::Event::Key {
            key: egui::Key::Enter,
            physical_key: None,
            pressed: true,
            repeat: false,
            modifiers: egui::Modifiers::NONE,
        });
        let _ = ctx.run(input, |ctx| {
            egui::CentralPanel::default().show(ctx, |ui| form.render_disabled(ui));
        });

        // submit() clears the password, so it must still be there
        assert_eq!(form.password, "secret123");
        assert_eq!(form.error, None);
    }

    #[test]
    fn sign_up_requires_matching_passwords() {
        let mut form = LoginFormState::new(None);
        form.toggle_mode();
        form.email = "new@example.com".to_string();
        form.password = "secret123".to_string();
        form.confirm_password = "secret124".to_string();

        assert_eq!(form.submit().unwrap_err(), "Passwords do not match");
        // nothing was sent, so the typed password stays
        assert_eq!(form.password, "secret123");

        form.confirm_password = "secret123".to_string();
        assert!(matches!(form.submit(), Ok(DashboardCommand::SignUp(_))));
    }

    #[test]
    fn short_password_is_rejected() {
        let mut form = LoginFormState::new(Some("me@example.com"));
        form.password = "abc".to_string();
        assert!(form.submit().is_err());
    }
}
