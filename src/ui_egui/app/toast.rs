//! Brief, non-blocking feedback messages in the bottom-right corner.
//!
//! Worker notices ("Policy deleted", "Session expired", expiries) are turned
//! into toasts once each, tracked by their serial.

use egui::{Color32, Context, Pos2, RichText};
use std::time::{Duration, Instant};

use crate::services::worker::{Notice, NoticeLevel};

/// Toast notification type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastLevel {
    /// Operation succeeded (policy saved, account created)
    Success,
    /// Informational message (signed out)
    Info,
    /// Needs attention (policy expired, session expired)
    Warning,
    /// Operation failed
    Error,
}

impl From<NoticeLevel> for ToastLevel {
    fn from(level: NoticeLevel) -> Self {
        match level {
            NoticeLevel::Success => ToastLevel::Success,
            NoticeLevel::Info => ToastLevel::Info,
            NoticeLevel::Warning => ToastLevel::Warning,
            NoticeLevel::Error => ToastLevel::Error,
        }
    }
}

impl ToastLevel {
    /// Get the icon for this toast level
    pub fn icon(&self) -> &'static str {
        match self {
            ToastLevel::Success => "✓",
            ToastLevel::Info => "ℹ",
            ToastLevel::Warning => "⚠",
            ToastLevel::Error => "✗",
        }
    }

    /// Get the background color for this toast level
    pub fn background_color(&self, is_dark_theme: bool) -> Color32 {
        match (self, is_dark_theme) {
            (ToastLevel::Success, true) => Color32::from_rgb(30, 70, 40),
            (ToastLevel::Info, true) => Color32::from_rgb(30, 50, 80),
            (ToastLevel::Warning, true) => Color32::from_rgb(80, 60, 20),
            (ToastLevel::Error, true) => Color32::from_rgb(80, 30, 30),
            (ToastLevel::Success, false) => Color32::from_rgb(220, 255, 220),
            (ToastLevel::Info, false) => Color32::from_rgb(220, 235, 255),
            (ToastLevel::Warning, false) => Color32::from_rgb(255, 245, 200),
            (ToastLevel::Error, false) => Color32::from_rgb(255, 220, 220),
        }
    }

    /// Get the text color for this toast level
    pub fn text_color(&self, is_dark_theme: bool) -> Color32 {
        match (self, is_dark_theme) {
            (ToastLevel::Success, true) => Color32::from_rgb(100, 220, 120),
            (ToastLevel::Info, true) => Color32::from_rgb(100, 180, 255),
            (ToastLevel::Warning, true) => Color32::from_rgb(255, 200, 80),
            (ToastLevel::Error, true) => Color32::from_rgb(255, 120, 120),
            (ToastLevel::Success, false) => Color32::from_rgb(30, 120, 50),
            (ToastLevel::Info, false) => Color32::from_rgb(30, 80, 150),
            (ToastLevel::Warning, false) => Color32::from_rgb(150, 100, 0),
            (ToastLevel::Error, false) => Color32::from_rgb(180, 40, 40),
        }
    }

    /// Errors and warnings stay up longer
    fn duration(&self) -> Duration {
        match self {
            ToastLevel::Success | ToastLevel::Info => Duration::from_secs(3),
            ToastLevel::Warning | ToastLevel::Error => Duration::from_secs(6),
        }
    }
}

/// A single toast notification
#[derive(Debug, Clone)]
pub struct Toast {
    /// The message to display
    pub message: String,
    /// The type of toast
    pub level: ToastLevel,
    /// When the toast was created
    pub created_at: Instant,
    /// How long to show the toast
    pub duration: Duration,
}

impl Toast {
    /// Create a new toast with the level's default duration
    pub fn new(message: impl Into<String>, level: ToastLevel) -> Self {
        Self {
            message: message.into(),
            level,
            created_at: Instant::now(),
            duration: level.duration(),
        }
    }

    /// Check if the toast has expired
    pub fn is_expired(&self) -> bool {
        self.created_at.elapsed() >= self.duration
    }

    /// Fades out over the last half second
    pub fn opacity(&self) -> f32 {
        let elapsed = self.created_at.elapsed();
        let fade_start = self.duration.saturating_sub(Duration::from_millis(500));

        if elapsed >= self.duration {
            0.0
        } else if elapsed >= fade_start {
            ((self.duration - elapsed).as_secs_f32() / 0.5).clamp(0.0, 1.0)
        } else {
            1.0
        }
    }
}

/// Manages the active toasts
#[derive(Debug, Default)]
pub struct ToastManager {
    toasts: Vec<Toast>,
    /// Serial of the newest worker notice already shown
    last_serial: u64,
}

impl ToastManager {
    /// Create a new toast manager
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a toast
    pub fn add(&mut self, toast: Toast) {
        self.toasts.push(toast);
    }

    /// Add an error toast
    pub fn error(&mut self, message: impl Into<String>) {
        self.add(Toast::new(message, ToastLevel::Error));
    }

    /// Adds a toast for every notice newer than the last one seen.
    /// Returns how many were added.
    pub fn absorb(&mut self, notices: &[Notice]) -> usize {
        let last_seen = self.last_serial;
        let mut added = 0;
        for notice in notices.iter().filter(|notice| notice.serial > last_seen) {
            self.add(Toast::new(notice.message.clone(), notice.level.into()));
            self.last_serial = notice.serial;
            added += 1;
        }
        added
    }

    /// Remove expired toasts
    pub fn cleanup(&mut self) {
        self.toasts.retain(|toast| !toast.is_expired());
    }

    /// Render all active toasts, newest at the bottom
    pub fn render(&mut self, ctx: &Context, is_dark_theme: bool) {
        self.cleanup();

        if self.toasts.is_empty() {
            return;
        }

        // Keep animating the fade
        ctx.request_repaint();

        let screen_rect = ctx.screen_rect();
        let toast_width = 320.0;
        let toast_height = 40.0;
        let margin = 10.0;
        let spacing = 5.0;

        for (i, toast) in self.toasts.iter().enumerate() {
            let opacity = toast.opacity();
            if opacity <= 0.0 {
                continue;
            }

            let y_offset = (i as f32) * (toast_height + spacing);
            let pos = Pos2::new(
                screen_rect.right() - toast_width - margin,
                screen_rect.bottom() - toast_height - margin - y_offset - 30.0,
            );

            egui::Area::new(egui::Id::new(("toast", i)))
                .fixed_pos(pos)
                .order(egui::Order::Foreground)
                .show(ctx, |ui| {
                    let bg = toast.level.background_color(is_dark_theme);
                    let fg = toast.level.text_color(is_dark_theme);
                    let bg = Color32::from_rgba_unmultiplied(
                        bg.r(),
                        bg.g(),
                        bg.b(),
                        (230.0 * opacity) as u8,
                    );
                    let fg = Color32::from_rgba_unmultiplied(
                        fg.r(),
                        fg.g(),
                        fg.b(),
                        (255.0 * opacity) as u8,
                    );

                    egui::Frame::none()
                        .fill(bg)
                        .rounding(6.0)
                        .inner_margin(egui::Margin::symmetric(12.0, 8.0))
                        .stroke(egui::Stroke::new(1.0, fg.gamma_multiply(0.3)))
                        .show(ui, |ui| {
                            ui.set_min_width(toast_width - 24.0);
                            ui.horizontal(|ui| {
                                ui.label(RichText::new(toast.level.icon()).color(fg).strong());
                                ui.label(RichText::new(&toast.message).color(fg));
                            });
                        });
                });
        }
    }
}
