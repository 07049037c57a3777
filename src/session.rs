use polars::prelude::*;
use rayon::prelude::*;
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, trace};

use crate::domain::TadError;

/// One named column holding every cell as text, one entry per row.
pub struct Column {
    pub name: String,
    pub data: Vec<String>,
}

impl Column {
    pub fn as_string(&self) -> String {
        format!("\"{}\", # rows {}", self.name, self.data.len())
    }

    /// Widest cell (or the name itself) in characters, for table rendering.
    pub fn max_width(&self) -> usize {
        self.data
            .iter()
            .map(|v| v.chars().count())
            .max()
            .unwrap_or(0)
            .max(self.name.chars().count())
    }
}

/// The in-memory table: ordered columns with unique names, every column
/// holding exactly one value per row.
pub struct Table {
    pub name: String,
    columns: Vec<Column>,
}

impl Table {
    pub fn nrows(&self) -> usize {
        self.columns.first().map(|c| c.data.len()).unwrap_or(0)
    }

    pub fn ncols(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }
}

/// Summary of a successful load, for the status line.
#[derive(Debug)]
pub struct LoadReport {
    pub rows: usize,
    pub cols: usize,
    pub elapsed_ms: u128,
}

/// What a frequency aggregation runs over.
#[derive(Debug, Clone, PartialEq)]
pub enum CountTarget {
    Column(String),
    AllColumns,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ChartKind {
    Bar,
    Pie,
}

/// Holds at most one live [`Table`] and provides every data operation the
/// ui is allowed to perform on it. Operations either succeed or fail with a
/// single [`TadError`]; a failure never leaves the table half-mutated.
pub struct TableSession {
    table: Option<Table>,
}

impl TableSession {
    pub fn new() -> Self {
        TableSession { table: None }
    }

    pub fn is_loaded(&self) -> bool {
        self.table.is_some()
    }

    pub fn table(&self) -> Result<&Table, TadError> {
        self.table.as_ref().ok_or(TadError::NoTableLoaded)
    }

    /// Parses a CSV file into a fresh table, replacing any previous one.
    /// The header line names the columns; every cell is materialized as text.
    pub fn load(&mut self, path: &Path) -> Result<LoadReport, TadError> {
        Self::check_file(path)?;
        let frame = LazyCsvReader::new(PlPath::Local(path.into()))
            .with_has_header(true)
            .finish()?;

        // Materialize every column as strings in its own rayon task.
        let start_time = Instant::now();
        let df = frame.collect()?;
        let c_: Result<Vec<Column>, _> = df
            .get_column_names()
            .par_iter()
            .map(|name| Self::stringify_column(&df, name))
            .collect();
        let columns = c_?;

        let elapsed_ms = start_time.elapsed().as_millis();
        info!("Loading data took {elapsed_ms}ms ...");
        for c in columns.iter() {
            debug!("Column: {}", c.as_string());
        }

        let name = path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("???")
            .to_string();
        let rows = columns.first().map(|c| c.data.len()).unwrap_or(0);
        let cols = columns.len();

        self.table = Some(Table { name, columns });
        Ok(LoadReport {
            rows,
            cols,
            elapsed_ms,
        })
    }

    /// Column names in their defined order.
    pub fn column_names(&self) -> Result<Vec<String>, TadError> {
        Ok(self.table()?.column_names())
    }

    /// Display-ready projection of the selected columns: a header line and
    /// one line per row with the row index in the leftmost gutter.
    pub fn column_values(&self, selected: &[String]) -> Result<String, TadError> {
        let table = self.table()?;
        if selected.is_empty() {
            return Err(TadError::EmptySelection);
        }
        let mut cols = Vec::with_capacity(selected.len());
        for name in selected {
            let col = table
                .column(name)
                .ok_or_else(|| TadError::UnknownColumn(name.clone()))?;
            cols.push(col);
        }

        let nrows = table.nrows();
        let idx_width = nrows.saturating_sub(1).to_string().len();
        let widths: Vec<usize> = cols.iter().map(|c| c.max_width()).collect();

        let mut out = String::new();
        out.push_str(&" ".repeat(idx_width));
        for (col, width) in cols.iter().zip(widths.iter().copied()) {
            out.push_str("  ");
            out.push_str(&format!("{:<width$}", col.name));
        }
        out.push('\n');
        for ridx in 0..nrows {
            out.push_str(&format!("{ridx:>idx_width$}"));
            for (col, width) in cols.iter().zip(widths.iter().copied()) {
                out.push_str("  ");
                out.push_str(&format!("{:<width$}", col.data[ridx]));
            }
            out.push('\n');
        }
        Ok(out)
    }

    /// Appends a column and backfills every existing row with `default`.
    pub fn add_column(&mut self, name: &str, default: &str) -> Result<(), TadError> {
        let table = self.table.as_mut().ok_or(TadError::NoTableLoaded)?;
        let name = name.trim();
        if name.is_empty() {
            return Err(TadError::EmptyName);
        }
        if table.column(name).is_some() {
            return Err(TadError::DuplicateColumn(name.to_string()));
        }
        let nrows = table.nrows();
        table.columns.push(Column {
            name: name.to_string(),
            data: vec![default.to_string(); nrows],
        });
        trace!("Added column \"{name}\" with default \"{default}\"");
        Ok(())
    }

    /// Appends one row. A column marked in `include` takes its entry from
    /// `values`, every other column takes the empty string. Validation runs
    /// before any mutation, so a failure appends nothing.
    pub fn add_row(
        &mut self,
        values: &HashMap<String, String>,
        include: &HashMap<String, bool>,
    ) -> Result<(), TadError> {
        let table = self.table.as_mut().ok_or(TadError::NoTableLoaded)?;

        let included: Vec<&Column> = table
            .columns
            .iter()
            .filter(|c| include.get(&c.name).copied().unwrap_or(false))
            .collect();
        if included.is_empty() {
            return Err(TadError::NoColumnsSelected);
        }
        for col in &included {
            let blank = values
                .get(&col.name)
                .map(|v| v.trim().is_empty())
                .unwrap_or(true);
            if blank {
                return Err(TadError::MissingValue(col.name.clone()));
            }
        }

        for col in table.columns.iter_mut() {
            let cell = if include.get(&col.name).copied().unwrap_or(false) {
                values.get(&col.name).cloned().unwrap_or_default()
            } else {
                String::new()
            };
            col.data.push(cell);
        }
        trace!("Appended row, table now has {} rows", table.nrows());
        Ok(())
    }

    /// Writes the table as CSV: header line, rows in order, no index column.
    pub fn export(&self, path: &Path) -> Result<(), TadError> {
        let table = self.table()?;
        let series: Vec<polars::prelude::Column> = table
            .columns
            .iter()
            .map(|c| Series::new(c.name.as_str().into(), &c.data).into_column())
            .collect();
        let mut df =
            DataFrame::new(series).map_err(|e| TadError::WriteFailed(e.to_string()))?;
        let mut file =
            fs::File::create(path).map_err(|e| TadError::WriteFailed(e.to_string()))?;
        CsvWriter::new(&mut file)
            .include_header(true)
            .finish(&mut df)
            .map_err(|e| TadError::WriteFailed(e.to_string()))?;
        info!("Exported {} rows to {}", table.nrows(), path.display());
        Ok(())
    }

    /// Top `limit` distinct values by occurrence count, descending. Ties keep
    /// first-appearance order of a row-major scan. With `AllColumns` the
    /// counts of identical text are summed across every column.
    pub fn top_value_counts(
        &self,
        target: &CountTarget,
        limit: usize,
    ) -> Result<Vec<(String, usize)>, TadError> {
        let table = self.table()?;
        let cols: Vec<&Column> = match target {
            CountTarget::Column(name) => vec![
                table
                    .column(name)
                    .ok_or_else(|| TadError::UnknownColumn(name.clone()))?,
            ],
            CountTarget::AllColumns => table.columns.iter().collect(),
        };

        let mut counts: HashMap<&str, usize> = HashMap::new();
        let mut order: Vec<&str> = Vec::new();
        for ridx in 0..table.nrows() {
            for col in &cols {
                let value = col.data[ridx].as_str();
                match counts.get_mut(value) {
                    Some(count) => *count += 1,
                    None => {
                        counts.insert(value, 1);
                        order.push(value);
                    }
                }
            }
        }

        let mut ranked: Vec<(String, usize)> = order
            .into_iter()
            .map(|v| (v.to_string(), counts[v]))
            .collect();
        // Stable sort: equal counts stay in first-appearance order.
        ranked.sort_by(|a, b| b.1.cmp(&a.1));
        ranked.truncate(limit);
        Ok(ranked)
    }

    /// The aggregation feeding a chart view. A pie over all columns has no
    /// meaningful whole, so that combination is rejected up front.
    pub fn chart_counts(
        &self,
        target: &CountTarget,
        kind: ChartKind,
        limit: usize,
    ) -> Result<Vec<(String, usize)>, TadError> {
        if kind == ChartKind::Pie && *target == CountTarget::AllColumns {
            return Err(TadError::UnsupportedAggregation);
        }
        self.top_value_counts(target, limit)
    }

    fn check_file(path: &Path) -> Result<(), TadError> {
        let metadata = fs::metadata(path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => TadError::FileNotFound,
            ErrorKind::PermissionDenied => TadError::PermissionDenied,
            _ => TadError::IoError(e),
        })?;
        if !metadata.is_file() {
            return Err(TadError::LoadingFailed("Not a file!".into()));
        }
        match path
            .extension()
            .and_then(|s| s.to_str())
            .map(|s| s.to_uppercase())
            .as_deref()
        {
            Some("CSV") => Ok(()),
            _ => Err(TadError::UnknownFileType),
        }
    }

    fn stringify_column(df: &DataFrame, col_name: &str) -> Result<Column, PolarsError> {
        let col = df.column(col_name)?.cast(&DataType::String)?;
        let series = col.str()?;
        let mut data = Vec::with_capacity(series.len());
        for value in series.into_iter() {
            // Nulls become empty cells so export round-trips cleanly.
            data.push(value.map(|s| s.to_string()).unwrap_or_default());
        }
        Ok(Column {
            name: col_name.to_string(),
            data,
        })
    }
}

/// Expands `~` and environment variables in a user-entered path.
pub fn expand_path(input: &str) -> PathBuf {
    match shellexpand::full(input) {
        Ok(expanded) => PathBuf::from(expanded.into_owned()),
        Err(_) => PathBuf::from(input),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::Builder;

    fn csv_file(content: &str) -> tempfile::NamedTempFile {
        let file = Builder::new().suffix(".csv").tempfile().unwrap();
        fs::write(file.path(), content).unwrap();
        file
    }

    fn loaded_session(content: &str) -> TableSession {
        let file = csv_file(content);
        let mut session = TableSession::new();
        session.load(file.path()).unwrap();
        session
    }

    const SAMPLE: &str = "name,age\nA,10\nB,20\nC,30\n";

    #[test]
    fn load_reports_shape_and_keeps_columns_in_order() {
        let file = csv_file(SAMPLE);
        let mut session = TableSession::new();
        let report = session.load(file.path()).unwrap();
        assert_eq!(report.rows, 3);
        assert_eq!(report.cols, 2);
        assert_eq!(session.column_names().unwrap(), vec!["name", "age"]);
    }

    #[test]
    fn every_column_has_one_value_per_row() {
        let session = loaded_session(SAMPLE);
        let table = session.table().unwrap();
        for col in table.columns() {
            assert_eq!(col.data.len(), table.nrows());
        }
    }

    #[test]
    fn load_replaces_the_previous_table_wholesale() {
        let mut session = TableSession::new();
        let first = csv_file(SAMPLE);
        session.load(first.path()).unwrap();
        let second = csv_file("city,country\nParis,FR\n");
        session.load(second.path()).unwrap();
        assert_eq!(session.column_names().unwrap(), vec!["city", "country"]);
        assert_eq!(session.table().unwrap().nrows(), 1);
    }

    #[test]
    fn load_of_missing_file_fails() {
        let mut session = TableSession::new();
        let err = session.load(Path::new("/no/such/file.csv")).unwrap_err();
        assert!(matches!(err, TadError::FileNotFound));
    }

    #[test]
    fn load_rejects_non_csv_extension() {
        let file = Builder::new().suffix(".txt").tempfile().unwrap();
        fs::write(file.path(), SAMPLE).unwrap();
        let mut session = TableSession::new();
        let err = session.load(file.path()).unwrap_err();
        assert!(matches!(err, TadError::UnknownFileType));
    }

    #[test]
    fn load_of_empty_file_fails_and_keeps_the_previous_table() {
        let mut session = TableSession::new();
        let first = csv_file(SAMPLE);
        session.load(first.path()).unwrap();
        let empty = csv_file("");
        assert!(session.load(empty.path()).is_err());
        assert_eq!(session.column_names().unwrap(), vec!["name", "age"]);
    }

    #[test]
    fn load_of_a_row_with_extra_fields_fails_the_whole_load() {
        let mut session = TableSession::new();
        let first = csv_file(SAMPLE);
        session.load(first.path()).unwrap();
        let ragged = csv_file("name,age\nA,10\nB,20,EXTRA\n");
        let err = session.load(ragged.path()).unwrap_err();
        assert!(matches!(err, TadError::PolarsError(_)));
        // The failed load leaves the previous table untouched.
        assert_eq!(session.table().unwrap().nrows(), 3);
    }

    #[test]
    fn empty_session_reports_no_table_loaded() {
        let session = TableSession::new();
        assert!(matches!(
            session.column_names().unwrap_err(),
            TadError::NoTableLoaded
        ));
        assert!(matches!(
            session.column_values(&["name".into()]).unwrap_err(),
            TadError::NoTableLoaded
        ));
        assert!(matches!(
            session
                .top_value_counts(&CountTarget::AllColumns, 10)
                .unwrap_err(),
            TadError::NoTableLoaded
        ));
    }

    #[test]
    fn column_values_shows_index_and_selected_columns_only() {
        let session = loaded_session(SAMPLE);
        let text = session.column_values(&["age".into()]).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].contains("age"));
        assert!(!lines[0].contains("name"));
        assert!(lines[1].starts_with('0'));
        assert!(lines[1].contains("10"));
        assert!(lines[3].starts_with('2'));
        assert!(lines[3].contains("30"));
    }

    #[test]
    fn column_values_rejects_empty_and_unknown_selection() {
        let session = loaded_session(SAMPLE);
        assert!(matches!(
            session.column_values(&[]).unwrap_err(),
            TadError::EmptySelection
        ));
        let err = session
            .column_values(&["name".into(), "missing".into()])
            .unwrap_err();
        assert!(matches!(err, TadError::UnknownColumn(name) if name == "missing"));
    }

    #[test]
    fn add_column_backfills_every_row_with_the_default() {
        let mut session = loaded_session(SAMPLE);
        session.add_column("city", "NA").unwrap();
        assert_eq!(
            session.column_names().unwrap(),
            vec!["name", "age", "city"]
        );
        let table = session.table().unwrap();
        let city = table.column("city").unwrap();
        assert_eq!(city.data, vec!["NA", "NA", "NA"]);
    }

    #[test]
    fn add_column_rejects_duplicates_and_leaves_table_unchanged() {
        let mut session = loaded_session(SAMPLE);
        let err = session.add_column("age", "0").unwrap_err();
        assert!(matches!(err, TadError::DuplicateColumn(name) if name == "age"));
        let table = session.table().unwrap();
        assert_eq!(table.ncols(), 2);
        assert_eq!(table.nrows(), 3);
    }

    #[test]
    fn add_column_rejects_blank_names() {
        let mut session = loaded_session(SAMPLE);
        assert!(matches!(
            session.add_column("   ", "x").unwrap_err(),
            TadError::EmptyName
        ));
        assert_eq!(session.table().unwrap().ncols(), 2);
    }

    #[test]
    fn add_row_requires_at_least_one_included_column() {
        let mut session = loaded_session(SAMPLE);
        let values = HashMap::new();
        let include = HashMap::from([("name".to_string(), false), ("age".to_string(), false)]);
        let err = session.add_row(&values, &include).unwrap_err();
        assert!(matches!(err, TadError::NoColumnsSelected));
        assert_eq!(session.table().unwrap().nrows(), 3);
    }

    #[test]
    fn add_row_rejects_blank_values_for_included_columns() {
        let mut session = loaded_session(SAMPLE);
        let values = HashMap::from([
            ("name".to_string(), "D".to_string()),
            ("age".to_string(), "   ".to_string()),
        ]);
        let include = HashMap::from([("name".to_string(), true), ("age".to_string(), true)]);
        let err = session.add_row(&values, &include).unwrap_err();
        assert!(matches!(err, TadError::MissingValue(name) if name == "age"));
        assert_eq!(session.table().unwrap().nrows(), 3);
    }

    #[test]
    fn add_row_fills_excluded_columns_with_empty_strings() {
        let mut session = loaded_session(SAMPLE);
        session.add_column("city", "NA").unwrap();
        let values = HashMap::from([
            ("name".to_string(), "D".to_string()),
            ("age".to_string(), "40".to_string()),
        ]);
        let include = HashMap::from([
            ("name".to_string(), true),
            ("age".to_string(), true),
            ("city".to_string(), false),
        ]);
        session.add_row(&values, &include).unwrap();
        let table = session.table().unwrap();
        assert_eq!(table.nrows(), 4);
        assert_eq!(table.column("name").unwrap().data[3], "D");
        assert_eq!(table.column("age").unwrap().data[3], "40");
        assert_eq!(table.column("city").unwrap().data[3], "");
    }

    #[test]
    fn counts_follow_first_appearance_on_ties() {
        let session = loaded_session(SAMPLE);
        let counts = session
            .top_value_counts(&CountTarget::Column("age".into()), 10)
            .unwrap();
        assert_eq!(
            counts,
            vec![
                ("10".to_string(), 1),
                ("20".to_string(), 1),
                ("30".to_string(), 1),
            ]
        );
    }

    #[test]
    fn counts_respect_the_limit_and_order_by_count() {
        let session = loaded_session("v\nx\ny\nx\nx\ny\nz\n");
        let counts = session
            .top_value_counts(&CountTarget::Column("v".into()), 2)
            .unwrap();
        assert_eq!(
            counts,
            vec![("x".to_string(), 3), ("y".to_string(), 2)]
        );
    }

    #[test]
    fn all_columns_counts_merge_identical_text_across_columns() {
        let session = loaded_session("A,B\nx,x\ny,z\n");
        let counts = session
            .top_value_counts(&CountTarget::AllColumns, 10)
            .unwrap();
        assert_eq!(counts[0], ("x".to_string(), 2));
        assert_eq!(counts[1], ("y".to_string(), 1));
        assert_eq!(counts[2], ("z".to_string(), 1));
    }

    #[test]
    fn counts_reject_unknown_columns() {
        let session = loaded_session(SAMPLE);
        let err = session
            .top_value_counts(&CountTarget::Column("missing".into()), 10)
            .unwrap_err();
        assert!(matches!(err, TadError::UnknownColumn(name) if name == "missing"));
    }

    #[test]
    fn pie_over_all_columns_is_rejected() {
        let session = loaded_session(SAMPLE);
        let err = session
            .chart_counts(&CountTarget::AllColumns, ChartKind::Pie, 10)
            .unwrap_err();
        assert!(matches!(err, TadError::UnsupportedAggregation));
        // Bar over all columns stays fine.
        assert!(
            session
                .chart_counts(&CountTarget::AllColumns, ChartKind::Bar, 10)
                .is_ok()
        );
    }

    #[test]
    fn failed_operations_leave_the_session_usable() {
        let mut session = loaded_session(SAMPLE);
        session.add_column("age", "0").unwrap_err();
        session.add_row(&HashMap::new(), &HashMap::new()).unwrap_err();
        session.load(Path::new("/no/such/file.csv")).unwrap_err();
        assert_eq!(session.column_names().unwrap(), vec!["name", "age"]);
        assert_eq!(session.table().unwrap().nrows(), 3);
    }

    #[test]
    fn export_without_a_table_fails() {
        let session = TableSession::new();
        let err = session.export(Path::new("/tmp/out.csv")).unwrap_err();
        assert!(matches!(err, TadError::NoTableLoaded));
    }

    #[test]
    fn export_to_an_unwritable_destination_reports_the_cause() {
        let session = loaded_session(SAMPLE);
        let err = session
            .export(Path::new("/no/such/dir/out.csv"))
            .unwrap_err();
        assert!(matches!(err, TadError::WriteFailed(_)));
    }

    #[test]
    fn export_then_load_round_trips_the_edited_table() {
        let mut session = loaded_session(SAMPLE);
        session.add_column("city", "NA").unwrap();
        let values = HashMap::from([
            ("name".to_string(), "D, jr.".to_string()),
            ("age".to_string(), "40".to_string()),
        ]);
        let include = HashMap::from([
            ("name".to_string(), true),
            ("age".to_string(), true),
            ("city".to_string(), false),
        ]);
        session.add_row(&values, &include).unwrap();

        let out = Builder::new().suffix(".csv").tempfile().unwrap();
        session.export(out.path()).unwrap();

        // No index column sneaks into the header.
        let written = fs::read_to_string(out.path()).unwrap();
        assert!(written.starts_with("name,age,city"));

        let mut reloaded = TableSession::new();
        reloaded.load(out.path()).unwrap();
        assert_eq!(
            reloaded.column_names().unwrap(),
            vec!["name", "age", "city"]
        );
        let table = reloaded.table().unwrap();
        assert_eq!(table.nrows(), 4);
        assert_eq!(table.column("name").unwrap().data[3], "D, jr.");
        assert_eq!(table.column("city").unwrap().data[0], "NA");
        assert_eq!(table.column("city").unwrap().data[3], "");
    }

    #[test]
    fn scenario_from_three_row_file() {
        let mut session = loaded_session(SAMPLE);
        assert_eq!(session.column_names().unwrap(), vec!["name", "age"]);
        session.add_column("city", "NA").unwrap();
        assert_eq!(session.table().unwrap().column("city").unwrap().data[0], "NA");

        let values = HashMap::from([
            ("name".to_string(), "D".to_string()),
            ("age".to_string(), "40".to_string()),
        ]);
        let include = HashMap::from([
            ("name".to_string(), true),
            ("age".to_string(), true),
            ("city".to_string(), false),
        ]);
        session.add_row(&values, &include).unwrap();

        let counts = session
            .top_value_counts(&CountTarget::Column("age".into()), 10)
            .unwrap();
        assert_eq!(
            counts,
            vec![
                ("10".to_string(), 1),
                ("20".to_string(), 1),
                ("30".to_string(), 1),
                ("40".to_string(), 1),
            ]
        );
    }
}
