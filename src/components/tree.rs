use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Widget},
};

use crate::app::{FlatRow, RowStyle};
use crate::theme::ThemeColors;

/// Tree widget that renders the mirror tree with box-drawing characters.
pub struct TreeWidget<'a> {
    rows: &'a [FlatRow],
    selected: usize,
    scroll: usize,
    theme: &'a ThemeColors,
    block: Option<Block<'a>>,
}

impl<'a> TreeWidget<'a> {
    pub fn new(
        rows: &'a [FlatRow],
        selected: usize,
        scroll: usize,
        theme: &'a ThemeColors,
    ) -> Self {
        Self {
            rows,
            selected,
            scroll,
            theme,
            block: None,
        }
    }

    pub fn block(mut self, block: Block<'a>) -> Self {
        self.block = block.into();
        self
    }

    /// Build the prefix string for tree indentation using box-drawing characters.
    ///
    /// We need to know the ancestor chain to draw continuation lines correctly.
    fn build_prefix(row: &FlatRow, rows: &[FlatRow], row_index: usize) -> String {
        if row.depth == 0 {
            return String::new();
        }

        let mut parts: Vec<&str> = Vec::new();

        // For each ancestor level (1..depth), determine if it's the last
        // sibling at that level by walking backwards from the current row.
        for d in 1..row.depth {
            let mut ancestor_is_last = false;
            for j in (0..row_index).rev() {
                if rows[j].depth == d {
                    ancestor_is_last = rows[j].is_last_sibling;
                    break;
                }
                if rows[j].depth < d {
                    break;
                }
            }
            if ancestor_is_last {
                parts.push("   ");
            } else {
                parts.push("│  ");
            }
        }

        if row.is_last_sibling {
            parts.push("└──");
        } else {
            parts.push("├──");
        }

        parts.join("")
    }

    /// Expansion marker for the row.
    fn row_indicator(row: &FlatRow) -> &'static str {
        if row.style == RowStyle::Placeholder {
            return "   ";
        }
        if row.is_expandable {
            if row.is_expanded {
                "▾ "
            } else {
                "▸ "
            }
        } else {
            "  "
        }
    }
}

impl<'a> Widget for TreeWidget<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let inner_area = if let Some(block) = &self.block {
            let inner = block.inner(area);
            block.clone().render(area, buf);
            inner
        } else {
            area
        };

        let visible_height = inner_area.height as usize;
        if self.rows.is_empty() || visible_height == 0 {
            return;
        }

        let visible_rows = self
            .rows
            .iter()
            .enumerate()
            .skip(self.scroll)
            .take(visible_height);

        for (i, (idx, row)) in visible_rows.enumerate() {
            let y = inner_area.y + i as u16;
            if y >= inner_area.y + inner_area.height {
                break;
            }

            let prefix = Self::build_prefix(row, self.rows, idx);
            let indicator = Self::row_indicator(row);

            let style = if idx == self.selected {
                Style::default()
                    .bg(self.theme.tree_selected_bg)
                    .fg(self.theme.tree_selected_fg)
                    .add_modifier(Modifier::BOLD)
            } else {
                match row.style {
                    RowStyle::Element => Style::default().fg(self.theme.tree_element_fg),
                    RowStyle::Dictionary => Style::default()
                        .fg(self.theme.tree_dictionary_fg)
                        .add_modifier(Modifier::BOLD),
                    RowStyle::Resource => Style::default().fg(self.theme.tree_resource_fg),
                    RowStyle::ResourceError => Style::default().fg(self.theme.error_fg),
                    RowStyle::Placeholder => Style::default()
                        .fg(self.theme.tree_placeholder_fg)
                        .add_modifier(Modifier::ITALIC),
                }
            };

            let line_content = format!("{}{}{}", prefix, indicator, row.label);
            let line = Line::from(Span::styled(line_content, style));

            let line_area = Rect::new(inner_area.x, y, inner_area.width, 1);
            buf.set_line(line_area.x, line_area.y, &line, line_area.width);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::App;
    use crate::config::AppConfig;
    use crate::scene;
    use crate::theme;

    fn make_app() -> App {
        let text = r#"{
            "contexts": [
                { "id": 0, "windows": [
                    { "title": "main", "visible": true,
                      "root": { "type": "Window", "name": "main",
                                "children": [ { "type": "Grid" },
                                              { "type": "StatusBar" } ] } } ] }
            ]
        }"#;
        let contexts = scene::parse(text).unwrap();
        App::new(contexts, &AppConfig::default()).unwrap()
    }

    fn rendered_text(app: &App, width: u16, height: u16) -> String {
        let tc = theme::dark_theme();
        let widget = TreeWidget::new(&app.flat_rows, app.selected_index, app.scroll_offset, &tc);
        let area = Rect::new(0, 0, width, height);
        let mut buf = Buffer::empty(area);
        widget.render(area, &mut buf);
        (0..height)
            .map(|y| {
                (0..width)
                    .map(|x| buf.cell((x, y)).unwrap().symbol().to_string())
                    .collect::<String>()
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn renders_labels_with_connectors() {
        let mut app = make_app();
        let text = rendered_text(&app, 60, 4);
        assert!(text.contains("Window \"main\""));
        assert!(text.contains("├──"));
        assert!(text.contains("└──"));
        assert!(text.contains("Grid"));
        assert!(text.contains("StatusBar"));
        app.shutdown();
    }

    #[test]
    fn zero_area_does_not_panic() {
        let mut app = make_app();
        rendered_text(&app, 0, 0);
        app.shutdown();
    }
}
