use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::app::{App, Panel};

/// Handle a key event.
pub fn handle_key_event(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') => app.quit(),
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => app.quit(),
        KeyCode::Tab => app.toggle_focus(),
        _ => match app.focus {
            Panel::Tree => handle_tree_key(app, key),
            Panel::Diagnostics => handle_diagnostics_key(app, key),
        },
    }
}

fn handle_tree_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('j') | KeyCode::Down => app.select_next(),
        KeyCode::Char('k') | KeyCode::Up => app.select_previous(),
        KeyCode::Char('g') | KeyCode::Home => app.select_first(),
        KeyCode::Char('G') | KeyCode::End => app.select_last(),
        KeyCode::Char('l') | KeyCode::Right | KeyCode::Enter => app.expand_selected(),
        KeyCode::Char('h') | KeyCode::Left => app.collapse_selected(),
        KeyCode::Char('d') => app.analyze_selected(),
        KeyCode::Char('b') => app.probe_selected_binding(),
        KeyCode::Char('r') => app.reload(),
        _ => {}
    }
}

fn handle_diagnostics_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('j') | KeyCode::Down => app.next_finding(),
        KeyCode::Char('k') | KeyCode::Up => app.previous_finding(),
        _ => {}
    }
}
