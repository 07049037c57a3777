use std::fmt;
use std::io::Error;

use polars::error::PolarsError;
use ratatui::crossterm::event::KeyEvent;

/// Runtime knobs shared by the controller, model and ui.
#[derive(Debug, Clone)]
pub struct TadConfig {
    pub event_poll_time: u64,
    pub max_column_width: usize,
    pub chart_limit: usize,
}

impl Default for TadConfig {
    fn default() -> Self {
        TadConfig {
            event_poll_time: 100,
            max_column_width: 32,
            chart_limit: 10,
        }
    }
}

/// Every fallible operation in tad returns exactly one of these kinds.
/// The `Display` text is what the ui shows the user, verbatim.
#[derive(Debug)]
pub enum TadError {
    IoError(Error),
    PolarsError(PolarsError),
    LoadingFailed(String),
    WriteFailed(String),
    FileNotFound,
    PermissionDenied,
    UnknownFileType,
    NoTableLoaded,
    EmptySelection,
    NoColumnsSelected,
    UnknownColumn(String),
    DuplicateColumn(String),
    EmptyName,
    MissingValue(String),
    UnsupportedAggregation,
}

impl From<Error> for TadError {
    fn from(err: Error) -> Self {
        TadError::IoError(err)
    }
}

impl From<PolarsError> for TadError {
    fn from(err: PolarsError) -> Self {
        TadError::PolarsError(err)
    }
}

impl fmt::Display for TadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TadError::IoError(e) => write!(f, "I/O error: {e}"),
            TadError::PolarsError(e) => write!(f, "Failed to read tabular data: {e}"),
            TadError::LoadingFailed(cause) => write!(f, "Failed to load CSV: {cause}"),
            TadError::WriteFailed(cause) => write!(f, "Failed to save CSV: {cause}"),
            TadError::FileNotFound => write!(f, "File not found."),
            TadError::PermissionDenied => write!(f, "Permission denied."),
            TadError::UnknownFileType => write!(f, "Not a CSV file."),
            TadError::NoTableLoaded => write!(f, "No CSV loaded."),
            TadError::EmptySelection => write!(f, "Select at least one column."),
            TadError::NoColumnsSelected => {
                write!(f, "Please select at least one column for new row data.")
            }
            TadError::UnknownColumn(name) => write!(f, "Column '{name}' not found."),
            TadError::DuplicateColumn(name) => write!(f, "Column '{name}' already exists."),
            TadError::EmptyName => write!(f, "Please enter a column name."),
            TadError::MissingValue(name) => {
                write!(f, "Please enter data for column '{name}'.")
            }
            TadError::UnsupportedAggregation => write!(
                f,
                "Pie chart for all columns is not supported. Please select a specific column."
            ),
        }
    }
}

/// Messages the controller produces from key events. The model interprets
/// them depending on its current modus; irrelevant messages are ignored.
#[derive(Debug)]
pub enum Message {
    Quit,
    Help,
    Enter,
    Exit,
    MoveUp,
    MoveDown,
    MoveLeft,
    MoveRight,
    MovePageUp,
    MovePageDown,
    MoveBeginning,
    MoveEnd,
    Toggle,
    OpenFile,
    ExportFile,
    ShowColumns,
    SelectColumns,
    AddColumn,
    AddRow,
    BarChart,
    PieChart,
    Resize(usize, usize),
    RawKey(KeyEvent),
}

/// What a one-line path prompt is collecting input for.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PromptKind {
    Load,
    Export,
}

pub const HELP_TEXT: &str = "\
tad - tabular data analyzer and editor

  o          load a CSV file
  e          export the table to a CSV file
  c          list the available columns
  s          select columns and show their data
  a          add a column (name + default value)
  r          add a row (tick columns, fill values)
  b          bar chart of the top value counts
  p          pie chart of a column's value counts
  arrows     move / scroll
  PgUp/PgDn  page up / down
  Home/End   jump to first / last row
  Space      toggle a checkbox
  Enter      confirm / submit
  Esc        back to the table view
  ?          this help
  q          quit
";
