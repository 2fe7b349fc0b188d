use egui::{Color32, Visuals};
use shared::domain::Theme;

pub fn visuals_for(theme: Theme) -> Visuals {
    match theme {
        Theme::Light => Visuals::light(),
        Theme::Dark => Visuals::dark(),
    }
}

/// Label of the top-bar button, naming the theme it switches to.
pub fn toggle_label(theme: Theme) -> &'static str {
    match theme {
        Theme::Light => "🌙 Dark mode",
        Theme::Dark => "☀ Light mode",
    }
}

pub fn error_color(theme: Theme) -> Color32 {
    match theme {
        Theme::Light => Color32::from_rgb(190, 30, 30),
        Theme::Dark => Color32::from_rgb(255, 110, 110),
    }
}
