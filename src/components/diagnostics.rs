use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Widget},
};

use crate::diagnostics::{DiagnosticItem, DiagnosticLevel};
use crate::theme::ThemeColors;

/// Findings panel: one line per diagnostic item, colored by level.
pub struct DiagnosticsWidget<'a> {
    findings: &'a [DiagnosticItem],
    selected: usize,
    theme: &'a ThemeColors,
    block: Option<Block<'a>>,
}

impl<'a> DiagnosticsWidget<'a> {
    pub fn new(findings: &'a [DiagnosticItem], selected: usize, theme: &'a ThemeColors) -> Self {
        Self {
            findings,
            selected,
            theme,
            block: None,
        }
    }

    pub fn block(mut self, block: Block<'a>) -> Self {
        self.block = block.into();
        self
    }

    fn level_color(&self, level: DiagnosticLevel) -> ratatui::style::Color {
        match level {
            DiagnosticLevel::Info => self.theme.info_fg,
            DiagnosticLevel::Warning => self.theme.warning_fg,
            DiagnosticLevel::Error => self.theme.error_fg,
        }
    }
}

impl<'a> Widget for DiagnosticsWidget<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let inner_area = if let Some(block) = &self.block {
            let inner = block.inner(area);
            block.clone().render(area, buf);
            inner
        } else {
            area
        };

        let visible_height = inner_area.height as usize;
        if visible_height == 0 {
            return;
        }

        if self.findings.is_empty() {
            let line = Line::from(Span::styled(
                "no findings (press d on a tree node)",
                Style::default().fg(self.theme.dim_fg),
            ));
            buf.set_line(inner_area.x, inner_area.y, &line, inner_area.width);
            return;
        }

        // keep the selected finding visible
        let scroll = self.selected.saturating_sub(visible_height.saturating_sub(1));

        for (i, (idx, finding)) in self
            .findings
            .iter()
            .enumerate()
            .skip(scroll)
            .take(visible_height)
            .enumerate()
        {
            let y = inner_area.y + i as u16;
            let marker_style = Style::default().fg(self.level_color(finding.level()));
            let text_style = if idx == self.selected {
                Style::default()
                    .bg(self.theme.diag_selected_bg)
                    .fg(self.theme.diag_fg)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(self.theme.diag_fg)
            };

            let line = Line::from(vec![
                Span::styled(format!("{:7} ", finding.level().to_string()), marker_style),
                Span::styled(finding.message().to_string(), text_style),
            ]);
            buf.set_line(inner_area.x, y, &line, inner_area.width);
        }
    }
}
