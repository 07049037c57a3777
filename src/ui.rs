use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::Stylize,
    symbols::border,
    text::{Line, Span, Text},
    widgets::{Block, Paragraph, Widget},
};

use crate::domain::TadConfig;
use crate::model::{ColumnView, UIData, ViewData};
use crate::session::ChartKind;

pub struct TadUI {
    config: TadConfig,
}

impl TadUI {
    pub fn new(config: &TadConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    pub fn draw(&self, uidata: &UIData, frame: &mut Frame) {
        let [title_area, body_area, status_area] = Layout::vertical([
            Constraint::Length(1),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .areas(frame.area());

        Line::from(format!(" {}", uidata.title).bold()).render(title_area, frame.buffer_mut());

        match &uidata.view {
            ViewData::Empty => Self::draw_empty(body_area, frame),
            ViewData::Table {
                columns,
                index,
                selected_row,
            } => Self::draw_table(columns, index, *selected_row, body_area, frame),
            ViewData::Text {
                title,
                body,
                scroll,
            } => Self::draw_text(title, body, *scroll, body_area, frame),
            ViewData::Checklist {
                title,
                items,
                cursor,
                boxes,
            } => Self::draw_checklist(title, items, *cursor, *boxes, body_area, frame),
            ViewData::ColumnForm {
                name,
                name_cursor,
                default,
                default_cursor,
                focus,
            } => Self::draw_column_form(
                name,
                *name_cursor,
                default,
                *default_cursor,
                *focus,
                body_area,
                frame,
            ),
            ViewData::RowForm {
                fields,
                cursor,
                on_value,
            } => Self::draw_row_form(fields, *cursor, *on_value, body_area, frame),
            ViewData::Chart {
                title,
                kind,
                entries,
                total,
            } => self.draw_chart(title, *kind, entries, *total, body_area, frame),
        }

        Self::draw_status(uidata, status_area, frame);
    }

    fn draw_empty(area: Rect, frame: &mut Frame) {
        let block = Block::bordered()
            .title(Line::from(" tad - CSV Analyzer ".bold()).centered())
            .border_set(border::THICK);
        let text = Text::from(vec![
            Line::default(),
            Line::from("No CSV loaded.").centered(),
            Line::default(),
            Line::from(vec![
                "Press ".into(),
                "o".blue().bold(),
                " to load a file, ".into(),
                "?".blue().bold(),
                " for help.".into(),
            ])
            .centered(),
        ]);
        frame.render_widget(Paragraph::new(text).block(block), area);
    }

    fn draw_table(
        columns: &[ColumnView],
        index: &ColumnView,
        selected_row: usize,
        area: Rect,
        frame: &mut Frame,
    ) {
        let mut lines = Vec::with_capacity(index.data.len() + 1);

        let mut header = format!("{:>width$} ", "", width = index.width);
        for col in columns {
            header.push_str(&format!("{:<width$} ", clip(&col.name, col.width), width = col.width));
        }
        lines.push(Line::from(header.bold().underlined()));

        for (ridx, idx_cell) in index.data.iter().enumerate() {
            let mut row = format!("{:>width$} ", idx_cell, width = index.width);
            for col in columns {
                let cell = col.data.get(ridx).map(String::as_str).unwrap_or("");
                row.push_str(&format!("{:<width$} ", clip(cell, col.width), width = col.width));
            }
            if ridx == selected_row {
                lines.push(Line::from(row.reversed()));
            } else {
                lines.push(Line::from(row));
            }
        }

        frame.render_widget(Paragraph::new(lines), area);
    }

    fn draw_text(title: &str, body: &str, scroll: usize, area: Rect, frame: &mut Frame) {
        let block = Block::bordered().title(Line::from(format!(" {title} ").bold()));
        frame.render_widget(
            Paragraph::new(body.to_string())
                .scroll((scroll as u16, 0))
                .block(block),
            area,
        );
    }

    fn draw_checklist(
        title: &str,
        items: &[(String, bool)],
        cursor: usize,
        boxes: bool,
        area: Rect,
        frame: &mut Frame,
    ) {
        let block = Block::bordered().title(Line::from(format!(" {title} ").bold()));
        let mut lines = Vec::with_capacity(items.len());
        for (idx, (name, checked)) in items.iter().enumerate() {
            let text = if boxes {
                format!("[{}] {}", if *checked { "x" } else { " " }, name)
            } else {
                name.clone()
            };
            if idx == cursor {
                lines.push(Line::from(text.reversed()));
            } else {
                lines.push(Line::from(text));
            }
        }
        frame.render_widget(Paragraph::new(lines).block(block), area);
    }

    fn draw_column_form(
        name: &str,
        name_cursor: usize,
        default: &str,
        default_cursor: usize,
        focus: usize,
        area: Rect,
        frame: &mut Frame,
    ) {
        let block = Block::bordered().title(Line::from(" Add New Column ".bold()));
        let lines = vec![
            field_line("Column Name:  ", name, name_cursor, focus == 0),
            field_line("Default Value: ", default, default_cursor, focus == 1),
            Line::default(),
            Line::from("Tab switches fields, Enter adds the column, Esc cancels.".dim()),
        ];
        frame.render_widget(Paragraph::new(lines).block(block), area);
    }

    fn draw_row_form(
        fields: &[(String, bool, String, usize)],
        cursor: usize,
        on_value: bool,
        area: Rect,
        frame: &mut Frame,
    ) {
        let block = Block::bordered().title(Line::from(" Add New Row ".bold()));
        let label_width = fields
            .iter()
            .map(|(name, ..)| name.chars().count())
            .max()
            .unwrap_or(0);

        let mut lines = Vec::with_capacity(fields.len() + 2);
        for (idx, (name, include, value, value_cursor)) in fields.iter().enumerate() {
            let focused = idx == cursor;
            let tick = if *include { "x" } else { " " };
            let checkbox = format!("[{tick}]");
            let label = format!(" {name:<label_width$}  ");

            let mut spans: Vec<Span> = Vec::new();
            if focused && !on_value {
                spans.push(checkbox.reversed());
            } else {
                spans.push(checkbox.into());
            }
            spans.push(label.into());
            spans.extend(edit_spans(value, *value_cursor, focused && on_value));
            lines.push(Line::from(spans));
        }
        lines.push(Line::default());
        lines.push(Line::from(
            "Space ticks a column, Tab moves on, Enter adds the row, Esc cancels.".dim(),
        ));
        frame.render_widget(Paragraph::new(lines).block(block), area);
    }

    fn draw_chart(
        &self,
        title: &str,
        kind: ChartKind,
        entries: &[(String, usize)],
        total: usize,
        area: Rect,
        frame: &mut Frame,
    ) {
        let block = Block::bordered().title(Line::from(format!(" {title} ").bold()));
        let label_width = entries
            .iter()
            .map(|(v, _)| v.chars().count())
            .max()
            .unwrap_or(0)
            .clamp(5, self.config.max_column_width);
        let max_count = entries.iter().map(|(_, c)| *c).max().unwrap_or(1).max(1);
        // label + count + percent columns, the rest of the line is bar space.
        let bar_space = (area.width as usize).saturating_sub(label_width + 18).max(1);

        let mut lines = Vec::with_capacity(entries.len());
        for (value, count) in entries {
            let bar_len = (count * bar_space).div_ceil(max_count);
            let label = format!("{:<label_width$} {count:>6}  ", clip(value, label_width));
            let mut spans: Vec<Span> = vec![label.into()];
            match kind {
                ChartKind::Bar => {
                    spans.push("█".repeat(bar_len).blue());
                }
                ChartKind::Pie => {
                    let share = *count as f64 * 100.0 / total.max(1) as f64;
                    spans.push(format!("{share:5.1}%  ").into());
                    spans.push("█".repeat(bar_len).blue());
                }
            }
            lines.push(Line::from(spans));
        }
        frame.render_widget(Paragraph::new(lines).block(block), area);
    }

    fn draw_status(uidata: &UIData, area: Rect, frame: &mut Frame) {
        let line = match &uidata.prompt {
            Some((label, input, cursor)) => {
                let mut spans: Vec<Span> = vec![format!(" {label}: ").bold()];
                spans.extend(edit_spans(input, *cursor, true));
                Line::from(spans)
            }
            None => Line::from(format!(" {}", uidata.status_message).dim()),
        };
        line.render(area, frame.buffer_mut());
    }
}

fn field_line<'a>(label: &'a str, text: &'a str, cursor: usize, focused: bool) -> Line<'a> {
    let mut spans: Vec<Span> = vec![label.into()];
    spans.extend(edit_spans(text, cursor, focused));
    Line::from(spans)
}

/// Splits editable text into spans with the cursor position reversed.
fn edit_spans<'a>(text: &'a str, cursor: usize, focused: bool) -> Vec<Span<'a>> {
    if !focused {
        return vec![text.into()];
    }
    let byte_pos = text
        .char_indices()
        .nth(cursor)
        .map(|(idx, _)| idx)
        .unwrap_or(text.len());
    let (before, rest) = text.split_at(byte_pos);
    let mut chars = rest.chars();
    let under = chars.next();
    let after = chars.as_str();
    vec![
        Span::from(before),
        match under {
            Some(c) => Span::from(c.to_string()).reversed(),
            None => Span::from(" ").reversed(),
        },
        Span::from(after),
    ]
}

fn clip(value: &str, width: usize) -> String {
    if value.chars().count() <= width {
        return value.to_string();
    }
    if width < 3 {
        return value.chars().take(width).collect();
    }
    let mut clipped: String = value.chars().take(width - 3).collect();
    clipped.push_str("...");
    clipped
}
