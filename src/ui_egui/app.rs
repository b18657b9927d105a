mod confirm;
mod lifecycle;
mod login;
mod policy_form;
mod policy_table;
mod status_bar;
mod toast;

use self::confirm::ConfirmDialogState;
use self::login::LoginFormState;
use self::policy_form::PolicyFormState;
use self::toast::ToastManager;
use crate::models::settings::Settings;
use crate::services::settings::SettingsService;
use crate::services::worker::{DashboardSnapshot, DashboardWorker};

const MIN_ROOT_WIDTH: f32 = 720.0;
const MIN_ROOT_HEIGHT: f32 = 420.0;

pub struct DashboardApp {
    worker: DashboardWorker,
    settings: Settings,
    settings_service: SettingsService,
    /// Latest state published by the worker, refreshed every frame
    snapshot: DashboardSnapshot,
    login: LoginFormState,
    form: Option<PolicyFormState>,
    /// Serial of the last edit target turned into a form
    opened_edit: u64,
    confirm_dialog: ConfirmDialogState,
    toast_manager: ToastManager,
    is_dark: bool,
}

impl eframe::App for DashboardApp {
    fn update(&mut self, ctx: &egui::Context, frame: &mut eframe::Frame) {
        self.handle_update(ctx, frame);
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        self.handle_exit();
    }
}

pub fn native_options() -> eframe::NativeOptions {
    eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("Dead Man's Switch")
            .with_inner_size([1100.0, 640.0])
            .with_min_inner_size([MIN_ROOT_WIDTH, MIN_ROOT_HEIGHT]),
        ..Default::default()
    }
}
