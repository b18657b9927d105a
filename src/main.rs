// Dead Man's Switch Dashboard
// Main entry point

use dms_dashboard::services::settings::SettingsService;
use dms_dashboard::ui_egui::{native_options, DashboardApp};

fn main() -> eframe::Result {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    log::info!("Starting Dead Man's Switch dashboard");

    let settings_service = SettingsService::default_location();
    let settings = settings_service.load_effective();
    log::info!(
        "Loaded settings from {} (refresh every {}s)",
        settings_service.path().display(),
        settings.refresh_interval_secs
    );

    eframe::run_native(
        "Dead Man's Switch",
        native_options(),
        Box::new(move |cc| {
            let app = DashboardApp::new(cc, settings, settings_service)?;
            Ok(Box::new(app))
        }),
    )
}
