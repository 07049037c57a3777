use std::collections::HashMap;

use ratatui::crossterm::event::{KeyCode, KeyEvent};
use tracing::trace;

/// What a form does with a raw key event.
#[derive(Debug, PartialEq)]
pub enum FormEvent {
    Consumed,
    Submit,
    Cancel,
}

/// Single-line text editor with a character cursor.
#[derive(Default, Clone)]
pub struct LineEdit {
    text: String,
    cursor: usize,
}

impl LineEdit {
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Applies an edit key. Returns false for keys that are not edits, so
    /// the surrounding form can interpret them.
    pub fn handle(&mut self, key: KeyEvent) -> bool {
        match key.code {
            KeyCode::Char(chr) => {
                self.text.insert(self.byte_pos(self.cursor), chr);
                self.cursor += 1;
            }
            KeyCode::Backspace => {
                if self.cursor > 0 {
                    self.cursor -= 1;
                    self.text.remove(self.byte_pos(self.cursor));
                }
            }
            KeyCode::Delete => {
                if self.cursor < self.char_len() {
                    self.text.remove(self.byte_pos(self.cursor));
                }
            }
            KeyCode::Left => self.cursor = self.cursor.saturating_sub(1),
            KeyCode::Right => {
                if self.cursor < self.char_len() {
                    self.cursor += 1;
                }
            }
            KeyCode::Home => self.cursor = 0,
            KeyCode::End => self.cursor = self.char_len(),
            _ => return false,
        }
        true
    }

    fn char_len(&self) -> usize {
        self.text.chars().count()
    }

    fn byte_pos(&self, char_pos: usize) -> usize {
        self.text
            .char_indices()
            .nth(char_pos)
            .map(|(byte_idx, _)| byte_idx)
            .unwrap_or(self.text.len())
    }
}

/// One-line input collecting a file path.
#[derive(Default)]
pub struct Prompt {
    pub input: LineEdit,
}

impl Prompt {
    pub fn handle(&mut self, key: KeyEvent) -> FormEvent {
        match key.code {
            KeyCode::Esc => FormEvent::Cancel,
            KeyCode::Enter => FormEvent::Submit,
            _ => {
                self.input.handle(key);
                FormEvent::Consumed
            }
        }
    }
}

/// The two-field "Add New Column" form: column name and default value.
#[derive(Default)]
pub struct ColumnForm {
    pub name: LineEdit,
    pub default: LineEdit,
    pub focus: usize,
}

impl ColumnForm {
    pub fn handle(&mut self, key: KeyEvent) -> FormEvent {
        match key.code {
            KeyCode::Esc => FormEvent::Cancel,
            KeyCode::Enter => FormEvent::Submit,
            KeyCode::Tab | KeyCode::Down => {
                self.focus = (self.focus + 1) % 2;
                FormEvent::Consumed
            }
            KeyCode::BackTab | KeyCode::Up => {
                self.focus = (self.focus + 1) % 2;
                FormEvent::Consumed
            }
            _ => {
                let field = if self.focus == 0 {
                    &mut self.name
                } else {
                    &mut self.default
                };
                field.handle(key);
                FormEvent::Consumed
            }
        }
    }
}

/// Which half of an add-row field has keyboard focus.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RowFocus {
    Include,
    Value,
}

pub struct RowField {
    pub name: String,
    pub include: bool,
    pub value: LineEdit,
}

/// The "Add New Row" form: per column a checkbox paired with a value entry.
/// Tab and the arrow keys walk checkbox -> entry -> next checkbox; Space
/// toggles the focused checkbox; any other key edits the focused entry.
pub struct RowForm {
    pub fields: Vec<RowField>,
    pub cursor: usize,
    pub focus: RowFocus,
}

impl RowForm {
    pub fn new(columns: Vec<String>) -> Self {
        let fields = columns
            .into_iter()
            .map(|name| RowField {
                name,
                include: false,
                value: LineEdit::default(),
            })
            .collect();
        RowForm {
            fields,
            cursor: 0,
            focus: RowFocus::Include,
        }
    }

    pub fn handle(&mut self, key: KeyEvent) -> FormEvent {
        match key.code {
            KeyCode::Esc => return FormEvent::Cancel,
            KeyCode::Enter => return FormEvent::Submit,
            _ if self.fields.is_empty() => (),
            KeyCode::Tab | KeyCode::Down => self.next(),
            KeyCode::BackTab | KeyCode::Up => self.prev(),
            KeyCode::Char(' ') if self.focus == RowFocus::Include => {
                let field = &mut self.fields[self.cursor];
                field.include = !field.include;
                trace!("Toggled \"{}\" -> {}", field.name, field.include);
            }
            _ => {
                if self.focus == RowFocus::Value {
                    self.fields[self.cursor].value.handle(key);
                }
            }
        }
        FormEvent::Consumed
    }

    pub fn values(&self) -> HashMap<String, String> {
        self.fields
            .iter()
            .map(|f| (f.name.clone(), f.value.text().to_string()))
            .collect()
    }

    pub fn includes(&self) -> HashMap<String, bool> {
        self.fields
            .iter()
            .map(|f| (f.name.clone(), f.include))
            .collect()
    }

    fn next(&mut self) {
        match self.focus {
            RowFocus::Include => self.focus = RowFocus::Value,
            RowFocus::Value => {
                self.focus = RowFocus::Include;
                self.cursor = (self.cursor + 1) % self.fields.len();
            }
        }
    }

    fn prev(&mut self) {
        match self.focus {
            RowFocus::Include => {
                self.focus = RowFocus::Value;
                self.cursor = (self.cursor + self.fields.len() - 1) % self.fields.len();
            }
            RowFocus::Value => self.focus = RowFocus::Include,
        }
    }
}

/// Cursor-driven list with a checkbox per entry. Also used single-select
/// (chart targets), where only the cursor position matters.
pub struct Checklist {
    pub items: Vec<(String, bool)>,
    pub cursor: usize,
}

impl Checklist {
    pub fn new(items: Vec<String>) -> Self {
        Checklist {
            items: items.into_iter().map(|name| (name, false)).collect(),
            cursor: 0,
        }
    }

    pub fn up(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn down(&mut self) {
        if self.cursor + 1 < self.items.len() {
            self.cursor += 1;
        }
    }

    pub fn toggle(&mut self) {
        if let Some((_, checked)) = self.items.get_mut(self.cursor) {
            *checked = !*checked;
        }
    }

    pub fn checked(&self) -> Vec<String> {
        self.items
            .iter()
            .filter(|(_, checked)| *checked)
            .map(|(name, _)| name.clone())
            .collect()
    }

    pub fn current(&self) -> Option<&str> {
        self.items.get(self.cursor).map(|(name, _)| name.as_str())
    }
}
