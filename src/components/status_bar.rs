use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::Widget,
};

use crate::theme::ThemeColors;

/// Status bar widget that displays the selection path, key hints, or status messages.
pub struct StatusBarWidget<'a> {
    path_str: &'a str,
    theme: &'a ThemeColors,
    status_message: Option<&'a str>,
    is_error: bool,
}

impl<'a> StatusBarWidget<'a> {
    pub fn new(path_str: &'a str, theme: &'a ThemeColors) -> Self {
        Self {
            path_str,
            theme,
            status_message: None,
            is_error: false,
        }
    }

    pub fn status_message(mut self, msg: &'a str, is_error: bool) -> Self {
        self.status_message = Some(msg);
        self.is_error = is_error;
        self
    }
}

impl<'a> Widget for StatusBarWidget<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.height == 0 || area.width == 0 {
            return;
        }

        let width = area.width as usize;

        if let Some(msg) = self.status_message {
            let style = if self.is_error {
                Style::default()
                    .bg(self.theme.error_fg)
                    .fg(self.theme.status_fg)
            } else {
                Style::default().fg(self.theme.success_fg)
            };

            // Pad or truncate message to fill full width
            let display: String = if msg.len() >= width {
                msg.chars().take(width).collect()
            } else {
                format!("{:<width$}", msg, width = width)
            };

            let line = Line::from(Span::styled(display, style));
            buf.set_line(area.x, area.y, &line, area.width);
            return;
        }

        // Normal bar: [selection path] [key hints]
        let key_hints = " l:expand  h:collapse  d:diagnose  b:binding  r:reload  q:quit ";
        let hints_len = key_hints.len();

        // Truncate on char boundaries; the path carries scene-derived UTF-8.
        let path_budget = width.saturating_sub(hints_len).saturating_sub(1);
        let path_chars = self.path_str.chars().count();
        let path_display = if path_chars > path_budget {
            if path_budget > 3 {
                let tail: String = self
                    .path_str
                    .chars()
                    .skip(path_chars - (path_budget - 3))
                    .collect();
                format!("...{tail}")
            } else {
                self.path_str.chars().take(path_budget).collect()
            }
        } else {
            self.path_str.to_string()
        };

        let pad = width
            .saturating_sub(path_display.chars().count())
            .saturating_sub(hints_len);

        let path_style = Style::default().fg(self.theme.status_fg);
        let hints_style = Style::default()
            .fg(self.theme.dim_fg)
            .add_modifier(Modifier::DIM);

        let line = Line::from(vec![
            Span::styled(path_display, path_style),
            Span::raw(" ".repeat(pad)),
            Span::styled(key_hints, hints_style),
        ]);
        buf.set_line(area.x, area.y, &line, area.width);
    }
}
