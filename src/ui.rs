use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    widgets::{Block, Borders},
    Frame,
};

use crate::app::{App, Panel};
use crate::components::diagnostics::DiagnosticsWidget;
use crate::components::status_bar::StatusBarWidget;
use crate::components::tree::TreeWidget;
use crate::theme::ThemeColors;

/// Render the whole frame: tree panel, findings panel, status bar.
pub fn render(app: &mut App, theme: &ThemeColors, frame: &mut Frame) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(1)])
        .split(frame.area());

    let panels = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(chunks[0]);

    render_tree(app, theme, frame, panels[0]);
    render_diagnostics(app, theme, frame, panels[1]);
    render_status_bar(app, theme, frame, chunks[1]);
}

fn panel_block<'a>(title: &'a str, focused: bool, theme: &ThemeColors) -> Block<'a> {
    let border_color = if focused {
        theme.border_focused_fg
    } else {
        theme.border_fg
    };
    Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
}

fn render_tree(app: &mut App, theme: &ThemeColors, frame: &mut Frame, area: Rect) {
    // account for the block border before scrolling
    let visible_height = area.height.saturating_sub(2) as usize;
    app.update_scroll(visible_height);

    let block = panel_block("Visual Tree", app.focus == Panel::Tree, theme);
    let widget =
        TreeWidget::new(&app.flat_rows, app.selected_index, app.scroll_offset, theme).block(block);
    frame.render_widget(widget, area);
}

fn render_diagnostics(app: &App, theme: &ThemeColors, frame: &mut Frame, area: Rect) {
    let title = if app.findings.is_empty() {
        "Findings".to_string()
    } else {
        format!("Findings ({})", app.findings.len())
    };
    let block = panel_block(&title, app.focus == Panel::Diagnostics, theme);
    let widget = DiagnosticsWidget::new(&app.findings, app.findings_selected, theme).block(block);
    frame.render_widget(widget, area);
}

fn render_status_bar(app: &App, theme: &ThemeColors, frame: &mut Frame, area: Rect) {
    let path = app.selected_path();
    let mut widget = StatusBarWidget::new(&path, theme);
    if let Some((message, is_error)) = &app.status_message {
        widget = widget.status_message(message, *is_error);
    }
    frame.render_widget(widget, area);
}
