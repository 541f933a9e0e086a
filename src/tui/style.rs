//! Color constants for the TUI.

use ratatui::style::Color;

use crate::sim::types::{DispatchSignal, ResourceMode};

/// Header bar foreground.
pub const HEADER_FG: Color = Color::White;
/// Header bar background.
pub const HEADER_BG: Color = Color::DarkGray;
/// Footer help text color.
pub const FOOTER_FG: Color = Color::DarkGray;
/// Year progress gauge color.
pub const PROGRESS: Color = Color::Cyan;
/// DR active indicator color.
pub const DR_ACTIVE: Color = Color::Magenta;
/// Error banner color.
pub const ERROR: Color = Color::Red;
/// Event log line belonging to a DR narrative.
pub const NARRATIVE: Color = Color::Yellow;

/// Color of the dispatch signal label.
pub fn signal_color(signal: DispatchSignal) -> Color {
    match signal {
        DispatchSignal::Normal => Color::Green,
        DispatchSignal::Reduction => DR_ACTIVE,
    }
}

/// Color of a resource row.
pub fn mode_color(mode: ResourceMode) -> Color {
    match mode {
        ResourceMode::Standard => Color::Gray,
        ResourceMode::Dr => DR_ACTIVE,
    }
}
