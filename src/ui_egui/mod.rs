mod app;

pub use app::{native_options, DashboardApp};
