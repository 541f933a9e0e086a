//! Keyboard input handling for the TUI.

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use super::runtime::App;
use crate::sim::types::ResourceId;

/// Maps a key event to an application action.
///
/// Guards on [`KeyEventKind::Press`] to avoid double-fire on some terminals.
pub fn handle_key(app: &mut App, key: KeyEvent) {
    if key.kind != KeyEventKind::Press {
        return;
    }
    match key.code {
        KeyCode::Char('q') => app.quit = true,
        KeyCode::Esc if app.jump_input.is_empty() => app.quit = true,
        KeyCode::Esc => app.jump_input.clear(),
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => app.quit = true,
        KeyCode::Char(' ') => app.toggle_running(),
        KeyCode::Char('+' | '=') | KeyCode::Right => app.speed_up(),
        KeyCode::Char('-') | KeyCode::Left => app.speed_down(),
        KeyCode::Char('r') => app.restart(),
        KeyCode::Char('x') => app.recover(),
        KeyCode::Char(d @ '0'..='9') => app.push_jump_digit(d),
        KeyCode::Backspace => app.pop_jump_digit(),
        KeyCode::Enter => app.submit_jump(),
        KeyCode::Char('s') => app.click(ResourceId::Solar),
        KeyCode::Char('w') => app.click(ResourceId::Wind),
        KeyCode::Char('b') => app.click(ResourceId::Battery),
        KeyCode::Char('h') => app.click(ResourceId::Hvac),
        KeyCode::Char('e') => app.click(ResourceId::Ev),
        _ => {}
    }
}
