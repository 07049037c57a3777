use std::cmp::min;
use std::path::PathBuf;

use ratatui::crossterm::event::KeyEvent;
use tracing::{info, trace};

use crate::domain::{HELP_TEXT, Message, PromptKind, TadConfig, TadError};
use crate::forms::{Checklist, ColumnForm, FormEvent, Prompt, RowFocus, RowForm};
use crate::session::{ChartKind, CountTarget, TableSession, expand_path};

#[derive(Debug, PartialEq)]
pub enum Status {
    Ready,
    Quitting,
}

/// Which interactive section is on screen. Every modus except Table maps to
/// one section of the analyzer: column listing, column-data selection, the
/// add-column/add-row forms, chart target picking, the chart itself, a path
/// prompt, or the help popup.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Modus {
    Table,
    Columns,
    Select,
    Values,
    AddColumn,
    AddRow,
    ChartTarget(ChartKind),
    Chart,
    Prompt(PromptKind),
    Help,
}

/// One rendered column slice handed to the ui.
#[derive(Clone)]
pub struct ColumnView {
    pub name: String,
    pub width: usize,
    pub data: Vec<String>,
}

/// Precomputed, render-ready content. The ui never touches the session.
pub enum ViewData {
    Empty,
    Table {
        columns: Vec<ColumnView>,
        index: ColumnView,
        selected_row: usize,
    },
    Text {
        title: String,
        body: String,
        scroll: usize,
    },
    Checklist {
        title: String,
        items: Vec<(String, bool)>,
        cursor: usize,
        boxes: bool,
    },
    ColumnForm {
        name: String,
        name_cursor: usize,
        default: String,
        default_cursor: usize,
        focus: usize,
    },
    RowForm {
        // (column, include, value, value cursor)
        fields: Vec<(String, bool, String, usize)>,
        cursor: usize,
        on_value: bool,
    },
    Chart {
        title: String,
        kind: ChartKind,
        entries: Vec<(String, usize)>,
        total: usize,
    },
}

pub struct UIData {
    pub title: String,
    pub view: ViewData,
    pub status_message: String,
    /// When set, the status line becomes an input line: (label, text, cursor).
    pub prompt: Option<(String, String, usize)>,
}

pub struct Model {
    config: TadConfig,
    pub status: Status,
    session: TableSession,
    modus: Modus,
    previous_modus: Modus,
    cursor_row: usize,
    offset_row: usize,
    offset_col: usize,
    text_title: String,
    text_body: String,
    text_scroll: usize,
    select: Checklist,
    target: Checklist,
    column_form: ColumnForm,
    row_form: RowForm,
    prompt: Prompt,
    chart_title: String,
    chart_kind: ChartKind,
    chart_entries: Vec<(String, usize)>,
    width: usize,
    height: usize,
    status_message: String,
    uidata: UIData,
}

impl Model {
    pub fn init(config: &TadConfig, width: usize, height: usize) -> Self {
        let mut model = Self {
            config: config.clone(),
            status: Status::Ready,
            session: TableSession::new(),
            modus: Modus::Table,
            previous_modus: Modus::Table,
            cursor_row: 0,
            offset_row: 0,
            offset_col: 0,
            text_title: String::new(),
            text_body: String::new(),
            text_scroll: 0,
            select: Checklist::new(Vec::new()),
            target: Checklist::new(Vec::new()),
            column_form: ColumnForm::default(),
            row_form: RowForm::new(Vec::new()),
            prompt: Prompt::default(),
            chart_title: String::new(),
            chart_kind: ChartKind::Bar,
            chart_entries: Vec::new(),
            width,
            height,
            status_message: "Started tad! Press ? for help.".to_string(),
            uidata: UIData {
                title: "tad".to_string(),
                view: ViewData::Empty,
                status_message: String::new(),
                prompt: None,
            },
        };
        model.rebuild_uidata();
        model
    }

    pub fn get_uidata(&self) -> &UIData {
        &self.uidata
    }

    /// Forms and prompts consume keys verbatim instead of mapped messages.
    pub fn raw_keyevents(&self) -> bool {
        matches!(
            self.modus,
            Modus::AddColumn | Modus::AddRow | Modus::Prompt(_)
        )
    }

    /// Load attempt for the path given on the command line.
    pub fn load_initial(&mut self, path: PathBuf) {
        self.finish_load(path);
        self.rebuild_uidata();
    }

    pub fn update(&mut self, message: Message) -> Result<(), TadError> {
        trace!("Update: Modus {:?}, Message {:?}", self.modus, message);
        if let Message::Resize(width, height) = message {
            self.resize(width, height);
            self.rebuild_uidata();
            return Ok(());
        }

        match self.modus {
            Modus::Table => match message {
                Message::Quit => self.quit(),
                Message::Help => self.enter_help(),
                Message::MoveUp => self.move_selection_up(1),
                Message::MoveDown => self.move_selection_down(1),
                Message::MovePageUp => self.move_selection_up(self.view_rows()),
                Message::MovePageDown => self.move_selection_down(self.view_rows()),
                Message::MoveBeginning => self.move_selection_beginning(),
                Message::MoveEnd => self.move_selection_end(),
                Message::MoveLeft => self.shift_columns_left(),
                Message::MoveRight => self.shift_columns_right(),
                Message::OpenFile => self.enter_prompt(PromptKind::Load),
                Message::ExportFile => self.enter_export_prompt(),
                Message::ShowColumns => self.enter_columns(),
                Message::SelectColumns => self.enter_select(),
                Message::AddColumn => self.enter_add_column(),
                Message::AddRow => self.enter_add_row(),
                Message::BarChart => self.enter_chart_target(ChartKind::Bar),
                Message::PieChart => self.enter_chart_target(ChartKind::Pie),
                _ => (),
            },
            Modus::Columns | Modus::Values => match message {
                Message::Quit => self.quit(),
                Message::Help => self.enter_help(),
                Message::MoveUp => self.scroll_text_up(1),
                Message::MoveDown => self.scroll_text_down(1),
                Message::MovePageUp => self.scroll_text_up(self.view_rows()),
                Message::MovePageDown => self.scroll_text_down(self.view_rows()),
                Message::MoveBeginning => self.text_scroll = 0,
                Message::Exit | Message::Enter => self.leave_to_table(),
                _ => (),
            },
            Modus::Select => match message {
                Message::Quit => self.quit(),
                Message::Help => self.enter_help(),
                Message::MoveUp => self.select.up(),
                Message::MoveDown => self.select.down(),
                Message::Toggle => self.select.toggle(),
                Message::Enter => self.show_selected_values(),
                Message::Exit => self.leave_to_table(),
                _ => (),
            },
            Modus::ChartTarget(kind) => match message {
                Message::Quit => self.quit(),
                Message::Help => self.enter_help(),
                Message::MoveUp => self.target.up(),
                Message::MoveDown => self.target.down(),
                Message::Enter => self.show_chart(kind),
                Message::Exit => self.leave_to_table(),
                _ => (),
            },
            Modus::Chart => match message {
                Message::Quit => self.quit(),
                Message::Help => self.enter_help(),
                Message::Exit | Message::Enter => self.leave_to_table(),
                _ => (),
            },
            Modus::AddColumn => {
                if let Message::RawKey(key) = message {
                    self.add_column_input(key);
                }
            }
            Modus::AddRow => {
                if let Message::RawKey(key) = message {
                    self.add_row_input(key);
                }
            }
            Modus::Prompt(kind) => {
                if let Message::RawKey(key) = message {
                    self.prompt_input(kind, key);
                }
            }
            Modus::Help => match message {
                Message::Quit => self.quit(),
                Message::Exit | Message::Enter | Message::Help => {
                    self.modus = self.previous_modus;
                    self.previous_modus = Modus::Help;
                }
                _ => (),
            },
        }

        self.rebuild_uidata();
        Ok(())
    }

    pub fn quit(&mut self) {
        self.status = Status::Quitting;
    }

    // -------------------- modus transitions ---------------------- //

    fn leave_to_table(&mut self) {
        self.previous_modus = self.modus;
        self.modus = Modus::Table;
    }

    fn enter_help(&mut self) {
        self.previous_modus = self.modus;
        self.modus = Modus::Help;
    }

    fn enter_prompt(&mut self, kind: PromptKind) {
        self.prompt = Prompt::default();
        self.previous_modus = self.modus;
        self.modus = Modus::Prompt(kind);
    }

    fn enter_export_prompt(&mut self) {
        if !self.session.is_loaded() {
            self.set_status_message(TadError::NoTableLoaded.to_string());
            return;
        }
        self.enter_prompt(PromptKind::Export);
    }

    fn enter_columns(&mut self) {
        match self.session.column_names() {
            Ok(names) => {
                self.text_title = "Available Columns".to_string();
                self.text_body = names.join("\n");
                self.text_scroll = 0;
                self.previous_modus = self.modus;
                self.modus = Modus::Columns;
            }
            Err(e) => self.set_status_message(e.to_string()),
        }
    }

    fn enter_select(&mut self) {
        match self.session.column_names() {
            Ok(names) => {
                self.select = Checklist::new(names);
                self.previous_modus = self.modus;
                self.modus = Modus::Select;
            }
            Err(e) => self.set_status_message(e.to_string()),
        }
    }

    fn enter_add_column(&mut self) {
        if !self.session.is_loaded() {
            self.set_status_message(TadError::NoTableLoaded.to_string());
            return;
        }
        self.column_form = ColumnForm::default();
        self.previous_modus = self.modus;
        self.modus = Modus::AddColumn;
    }

    fn enter_add_row(&mut self) {
        match self.session.column_names() {
            Ok(names) => {
                self.row_form = RowForm::new(names);
                self.previous_modus = self.modus;
                self.modus = Modus::AddRow;
            }
            Err(e) => self.set_status_message(e.to_string()),
        }
    }

    fn enter_chart_target(&mut self, kind: ChartKind) {
        match self.session.column_names() {
            Ok(names) => {
                let mut items = vec!["All Columns".to_string()];
                items.extend(names);
                self.target = Checklist::new(items);
                self.previous_modus = self.modus;
                self.modus = Modus::ChartTarget(kind);
            }
            Err(e) => self.set_status_message(e.to_string()),
        }
    }

    // -------------------- operations ---------------------- //

    fn show_selected_values(&mut self) {
        let selected = self.select.checked();
        match self.session.column_values(&selected) {
            Ok(body) => {
                self.text_title = "Selected Column Data".to_string();
                self.text_body = body;
                self.text_scroll = 0;
                self.previous_modus = self.modus;
                self.modus = Modus::Values;
            }
            Err(e) => self.set_status_message(e.to_string()),
        }
    }

    fn add_column_input(&mut self, key: KeyEvent) {
        match self.column_form.handle(key) {
            FormEvent::Cancel => self.leave_to_table(),
            FormEvent::Submit => {
                let name = self.column_form.name.text().to_string();
                let default = self.column_form.default.text().to_string();
                match self.session.add_column(&name, &default) {
                    Ok(()) => {
                        self.set_status_message(format!("Added column '{}'.", name.trim()));
                        self.leave_to_table();
                    }
                    // Form keeps its content so the user can fix the input.
                    Err(e) => self.set_status_message(e.to_string()),
                }
            }
            FormEvent::Consumed => (),
        }
    }

    fn add_row_input(&mut self, key: KeyEvent) {
        match self.row_form.handle(key) {
            FormEvent::Cancel => self.leave_to_table(),
            FormEvent::Submit => {
                let values = self.row_form.values();
                let includes = self.row_form.includes();
                match self.session.add_row(&values, &includes) {
                    Ok(()) => {
                        self.set_status_message("New row added.");
                        self.leave_to_table();
                    }
                    Err(e) => self.set_status_message(e.to_string()),
                }
            }
            FormEvent::Consumed => (),
        }
    }

    fn prompt_input(&mut self, kind: PromptKind, key: KeyEvent) {
        match self.prompt.handle(key) {
            FormEvent::Cancel => self.leave_to_table(),
            FormEvent::Submit => {
                let path = expand_path(self.prompt.input.text());
                match kind {
                    PromptKind::Load => {
                        if self.finish_load(path) {
                            self.leave_to_table();
                        }
                    }
                    PromptKind::Export => match self.session.export(&path) {
                        Ok(()) => {
                            self.set_status_message(format!(
                                "Exported CSV to: {}",
                                path.display()
                            ));
                            self.leave_to_table();
                        }
                        Err(e) => self.set_status_message(e.to_string()),
                    },
                }
            }
            FormEvent::Consumed => (),
        }
    }

    fn finish_load(&mut self, path: PathBuf) -> bool {
        match self.session.load(&path) {
            Ok(report) => {
                // A new table invalidates every view derived from the old one.
                self.cursor_row = 0;
                self.offset_row = 0;
                self.offset_col = 0;
                self.select = Checklist::new(Vec::new());
                self.target = Checklist::new(Vec::new());
                self.row_form = RowForm::new(Vec::new());
                self.set_status_message(format!(
                    "Loaded CSV with {} rows and {} columns.",
                    report.rows, report.cols
                ));
                info!(
                    "Loaded {} ({}x{}) in {}ms",
                    path.display(),
                    report.rows,
                    report.cols,
                    report.elapsed_ms
                );
                true
            }
            Err(e) => {
                self.set_status_message(e.to_string());
                false
            }
        }
    }

    fn show_chart(&mut self, kind: ChartKind) {
        let target = match self.target.cursor {
            0 => CountTarget::AllColumns,
            _ => match self.target.current() {
                Some(name) => CountTarget::Column(name.to_string()),
                None => return,
            },
        };
        match self
            .session
            .chart_counts(&target, kind, self.config.chart_limit)
        {
            Ok(entries) => {
                self.chart_title = match (&target, kind) {
                    (CountTarget::AllColumns, _) => {
                        format!("Top {} Values Across All Columns", self.config.chart_limit)
                    }
                    (CountTarget::Column(name), ChartKind::Bar) => {
                        format!("Top {} Values in '{name}'", self.config.chart_limit)
                    }
                    (CountTarget::Column(name), ChartKind::Pie) => {
                        format!("Distribution of '{name}'")
                    }
                };
                self.chart_kind = kind;
                self.chart_entries = entries;
                self.previous_modus = self.modus;
                self.modus = Modus::Chart;
            }
            Err(e) => self.set_status_message(e.to_string()),
        }
    }

    // -------------------- table browsing ---------------------- //

    fn view_rows(&self) -> usize {
        // One line each for the title, the header and the status line.
        self.height.saturating_sub(3).max(1)
    }

    fn nrows(&self) -> usize {
        self.session.table().map(|t| t.nrows()).unwrap_or(0)
    }

    fn resize(&mut self, width: usize, height: usize) {
        trace!(
            "UI was resized! w:{}->{}, h:{}->{}",
            self.width, width, self.height, height
        );
        self.width = width;
        self.height = height;
        self.cursor_row = min(self.cursor_row, self.view_rows() - 1);
    }

    fn move_selection_up(&mut self, size: usize) {
        let abs = (self.offset_row + self.cursor_row).saturating_sub(size);
        if abs < self.offset_row {
            self.offset_row = abs;
        }
        self.cursor_row = abs - self.offset_row;
    }

    fn move_selection_down(&mut self, size: usize) {
        let nrows = self.nrows();
        if nrows == 0 {
            return;
        }
        let abs = min(self.offset_row + self.cursor_row + size, nrows - 1);
        let height = self.view_rows();
        if abs >= self.offset_row + height {
            self.offset_row = abs + 1 - height;
        }
        self.cursor_row = abs - self.offset_row;
    }

    fn move_selection_beginning(&mut self) {
        self.cursor_row = 0;
        self.offset_row = 0;
    }

    fn move_selection_end(&mut self) {
        let nrows = self.nrows();
        if nrows == 0 {
            return;
        }
        self.offset_row = nrows.saturating_sub(self.view_rows());
        self.cursor_row = nrows - 1 - self.offset_row;
    }

    fn shift_columns_left(&mut self) {
        self.offset_col = self.offset_col.saturating_sub(1);
    }

    fn shift_columns_right(&mut self) {
        let ncols = self.session.table().map(|t| t.ncols()).unwrap_or(0);
        if self.offset_col + 1 < ncols {
            self.offset_col += 1;
        }
    }

    fn scroll_text_up(&mut self, size: usize) {
        self.text_scroll = self.text_scroll.saturating_sub(size);
    }

    fn scroll_text_down(&mut self, size: usize) {
        let lines = self.text_body.lines().count();
        self.text_scroll = min(
            self.text_scroll + size,
            lines.saturating_sub(self.view_rows()),
        );
    }

    fn set_status_message(&mut self, message: impl Into<String>) {
        self.status_message = message.into();
    }

    // -------------------- view building ---------------------- //

    fn rebuild_uidata(&mut self) {
        let title = match self.session.table() {
            Ok(table) => format!("{}  [{}x{}]", table.name, table.nrows(), table.ncols()),
            Err(_) => "tad".to_string(),
        };

        let view = match self.modus {
            Modus::Table => self.table_view(),
            Modus::Columns | Modus::Values => ViewData::Text {
                title: self.text_title.clone(),
                body: self.text_body.clone(),
                scroll: self.text_scroll,
            },
            Modus::Select => ViewData::Checklist {
                title: "Select Columns to Show Data".to_string(),
                items: self.select.items.clone(),
                cursor: self.select.cursor,
                boxes: true,
            },
            Modus::ChartTarget(kind) => ViewData::Checklist {
                title: match kind {
                    ChartKind::Bar => "Bar Chart - Select Column".to_string(),
                    ChartKind::Pie => "Pie Chart - Select Column".to_string(),
                },
                items: self.target.items.clone(),
                cursor: self.target.cursor,
                boxes: false,
            },
            Modus::AddColumn => ViewData::ColumnForm {
                name: self.column_form.name.text().to_string(),
                name_cursor: self.column_form.name.cursor(),
                default: self.column_form.default.text().to_string(),
                default_cursor: self.column_form.default.cursor(),
                focus: self.column_form.focus,
            },
            Modus::AddRow => ViewData::RowForm {
                fields: self
                    .row_form
                    .fields
                    .iter()
                    .map(|f| {
                        (
                            f.name.clone(),
                            f.include,
                            f.value.text().to_string(),
                            f.value.cursor(),
                        )
                    })
                    .collect(),
                cursor: self.row_form.cursor,
                on_value: self.row_form.focus == RowFocus::Value,
            },
            Modus::Chart => ViewData::Chart {
                title: self.chart_title.clone(),
                kind: self.chart_kind,
                entries: self.chart_entries.clone(),
                total: self.chart_entries.iter().map(|(_, c)| c).sum(),
            },
            Modus::Prompt(_) => self.table_view(),
            Modus::Help => ViewData::Text {
                title: "Help".to_string(),
                body: HELP_TEXT.to_string(),
                scroll: 0,
            },
        };

        let prompt = match self.modus {
            Modus::Prompt(kind) => {
                let label = match kind {
                    PromptKind::Load => "Load CSV from",
                    PromptKind::Export => "Export CSV to",
                };
                Some((
                    label.to_string(),
                    self.prompt.input.text().to_string(),
                    self.prompt.input.cursor(),
                ))
            }
            _ => None,
        };

        self.uidata = UIData {
            title,
            view,
            status_message: self.status_message.clone(),
            prompt,
        };
    }

    fn table_view(&self) -> ViewData {
        let Ok(table) = self.session.table() else {
            return ViewData::Empty;
        };

        let rbegin = self.offset_row;
        let rend = min(rbegin + self.view_rows(), table.nrows());

        let index_data: Vec<String> = (rbegin..rend).map(|ridx| ridx.to_string()).collect();
        let index_width = index_data.last().map(|s| s.len()).unwrap_or(1);
        let index = ColumnView {
            name: String::new(),
            width: index_width,
            data: index_data,
        };

        let mut columns = Vec::new();
        let budget = self.width.saturating_sub(index_width + 1);
        let mut used = 0;
        for column in &table.columns()[min(self.offset_col, table.ncols())..] {
            let width = min(column.max_width(), self.config.max_column_width).max(1);
            if !columns.is_empty() && used + width + 1 > budget {
                break;
            }
            let data = column.data[rbegin..rend]
                .iter()
                .map(|v| v.replace("\r\n", " ↵ ").replace('\n', " ↵ "))
                .collect();
            columns.push(ColumnView {
                name: column.name.clone(),
                width,
                data,
            });
            used += width + 1;
        }

        ViewData::Table {
            columns,
            index,
            selected_row: self.cursor_row,
        }
    }
}
