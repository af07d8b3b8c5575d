//! Collects auction events into column tables.
//!
//! A `tracing` subscriber turns every info-level event into one row of the
//! table named after the event's target. Columns appear as fields are first
//! seen, in field order, and rows that lack a field are filled with a zero value.
//!
//! # Usage
//!
//! ```ignore
//! // In simulation code:
//! tracing::info!(target: "clear", round, winner, price);
//!
//! // In test:
//! let mut rec = instrument::ScopedRecorder::new("data", "ties");
//! // ... run rounds ...
//! let clears = &rec.get()["clear"];
//! ```

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::field::{Field, Visit};
use tracing::span::{Attributes, Record};
use tracing::{Event, Id, Metadata, Subscriber};

pub use polars;

// === Tables ===

#[derive(Debug, Clone, PartialEq)]
pub enum TypedColumn {
    U64(Vec<u64>),
    I64(Vec<i64>),
    F64(Vec<f64>),
    Bool(Vec<bool>),
    Str(Vec<String>),
}

impl TypedColumn {
    pub fn len(&self) -> usize {
        match self {
            TypedColumn::U64(v) => v.len(),
            TypedColumn::I64(v) => v.len(),
            TypedColumn::F64(v) => v.len(),
            TypedColumn::Bool(v) => v.len(),
            TypedColumn::Str(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn fill_to(&mut self, rows: usize) {
        let missing = rows.saturating_sub(self.len());
        match self {
            TypedColumn::U64(v) => v.extend(std::iter::repeat_n(0, missing)),
            TypedColumn::I64(v) => v.extend(std::iter::repeat_n(0, missing)),
            TypedColumn::F64(v) => v.extend(std::iter::repeat_n(0.0, missing)),
            TypedColumn::Bool(v) => v.extend(std::iter::repeat_n(false, missing)),
            TypedColumn::Str(v) => v.extend(std::iter::repeat_n(String::new(), missing)),
        }
    }
}

/// Values a column can hold; the first value seen for a field fixes its type.
trait ColumnValue: Sized {
    fn empty_column() -> TypedColumn;
    /// Appends to `column`, returning the value back if the types disagree.
    fn push_into(self, column: &mut TypedColumn) -> Option<Self>;
}

macro_rules! column_value {
    ($ty:ty, $variant:ident) => {
        impl ColumnValue for $ty {
            fn empty_column() -> TypedColumn {
                TypedColumn::$variant(Vec::new())
            }

            fn push_into(self, column: &mut TypedColumn) -> Option<Self> {
                match column {
                    TypedColumn::$variant(v) => {
                        v.push(self);
                        None
                    }
                    _ => Some(self),
                }
            }
        }
    };
}

column_value!(u64, U64);
column_value!(i64, I64);
column_value!(f64, F64);
column_value!(bool, Bool);
column_value!(String, Str);

/// Rows of one event target. Columns keep the order their fields were first seen.
#[derive(Debug, Clone, Default)]
pub struct DynamicTable {
    columns: Vec<(String, TypedColumn)>,
    row_count: usize,
}

impl DynamicTable {
    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(name, _)| name.as_str())
    }

    pub fn column(&self, name: &str) -> Option<&TypedColumn> {
        self.columns
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, col)| col)
    }

    pub fn u64s(&self, name: &str) -> Option<&[u64]> {
        match self.column(name)? {
            TypedColumn::U64(v) => Some(v),
            _ => None,
        }
    }

    pub fn i64s(&self, name: &str) -> Option<&[i64]> {
        match self.column(name)? {
            TypedColumn::I64(v) => Some(v),
            _ => None,
        }
    }

    pub fn f64s(&self, name: &str) -> Option<&[f64]> {
        match self.column(name)? {
            TypedColumn::F64(v) => Some(v),
            _ => None,
        }
    }

    /// Append `value` to the current row. A field whose type changes between
    /// events keeps its first type; the mismatched value is dropped and the
    /// cell is zero-filled.
    fn push<V: ColumnValue>(&mut self, name: &str, value: V) {
        let index = match self.columns.iter().position(|(n, _)| n == name) {
            Some(index) => index,
            None => {
                let mut column = V::empty_column();
                column.fill_to(self.row_count);
                self.columns.push((name.to_string(), column));
                self.columns.len() - 1
            }
        };
        let column = &mut self.columns[index].1;
        if column.len() == self.row_count {
            let _ = value.push_into(column);
        }
    }

    fn finish_row(&mut self) {
        self.row_count += 1;
        for (_, column) in &mut self.columns {
            column.fill_to(self.row_count);
        }
    }
}

/// Tables keyed by tracing target.
#[derive(Debug, Clone, Default)]
pub struct Recorder {
    pub tables: BTreeMap<String, DynamicTable>,
}

impl Recorder {
    pub fn table(&self, target: &str) -> Option<&DynamicTable> {
        self.tables.get(target)
    }
}

thread_local! {
    static RECORDER: RefCell<Recorder> = RefCell::default();
}

// === Subscriber ===

struct RowVisitor<'a> {
    table: &'a mut DynamicTable,
}

impl Visit for RowVisitor<'_> {
    fn record_u64(&mut self, field: &Field, value: u64) {
        self.table.push(field.name(), value);
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.table.push(field.name(), value);
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.table.push(field.name(), value);
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.table.push(field.name(), value);
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.table.push(field.name(), value.to_string());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        self.table.push(field.name(), format!("{value:?}"));
    }
}

/// Records info-level events into the thread-local [`Recorder`]. Spans are ignored.
pub struct DataFrameSubscriber;

impl Subscriber for DataFrameSubscriber {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.is_event() && *metadata.level() <= tracing::Level::INFO
    }

    fn new_span(&self, _span: &Attributes<'_>) -> Id {
        Id::from_u64(1)
    }

    fn record(&self, _span: &Id, _values: &Record<'_>) {}

    fn record_follows_from(&self, _span: &Id, _follows: &Id) {}

    fn event(&self, event: &Event<'_>) {
        let target = event.metadata().target();
        RECORDER.with(|r| {
            let mut recorder = r.borrow_mut();
            let table = recorder.tables.entry(target.to_string()).or_default();
            event.record(&mut RowVisitor { table: &mut *table });
            table.finish_row();
        });
    }

    fn enter(&self, _span: &Id) {}

    fn exit(&self, _span: &Id) {}
}

/// Install [`DataFrameSubscriber`] as the global default. Later calls are no-ops.
pub fn install_subscriber() {
    let _ = tracing::subscriber::set_global_default(DataFrameSubscriber);
}

/// Take everything recorded on this thread so far.
pub fn drain() -> Recorder {
    RECORDER.with(|r| std::mem::take(&mut *r.borrow_mut()))
}

pub fn clear() {
    RECORDER.with(|r| *r.borrow_mut() = Recorder::default());
}

// === Polars ===

use polars::prelude::*;

fn io_error(e: std::io::Error) -> PolarsError {
    PolarsError::IO {
        error: e.into(),
        msg: None,
    }
}

impl DynamicTable {
    pub fn to_dataframe(&self) -> PolarsResult<DataFrame> {
        let columns = self
            .columns
            .iter()
            .map(|(name, col)| match col {
                TypedColumn::U64(v) => Column::new(name.into(), v),
                TypedColumn::I64(v) => Column::new(name.into(), v),
                TypedColumn::F64(v) => Column::new(name.into(), v),
                TypedColumn::Bool(v) => Column::new(name.into(), v),
                TypedColumn::Str(v) => Column::new(name.into(), v),
            })
            .collect();
        DataFrame::new(columns)
    }
}

impl Recorder {
    pub fn to_dataframes(&self) -> PolarsResult<BTreeMap<String, DataFrame>> {
        self.tables
            .iter()
            .map(|(name, table)| Ok((name.clone(), table.to_dataframe()?)))
            .collect()
    }
}

pub fn drain_to_dataframes() -> PolarsResult<BTreeMap<String, DataFrame>> {
    drain().to_dataframes()
}

/// Write each frame to `{dir}/{name}.parquet`.
pub fn save_parquet(dfs: &mut BTreeMap<String, DataFrame>, dir: &Path) -> PolarsResult<()> {
    std::fs::create_dir_all(dir).map_err(io_error)?;
    for (name, df) in dfs.iter_mut() {
        let file = std::fs::File::create(dir.join(format!("{name}.parquet"))).map_err(io_error)?;
        ParquetWriter::new(file).finish(df)?;
    }
    Ok(())
}

/// Write one frame as CSV with a header row.
pub fn save_csv(df: &mut DataFrame, path: &Path) -> PolarsResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(io_error)?;
    }
    let file = std::fs::File::create(path).map_err(io_error)?;
    CsvWriter::new(file).include_header(true).finish(df)
}

/// Replace anything but ASCII alphanumerics with `_`, capped at 60 chars.
fn sanitize(name: &str) -> String {
    name.chars()
        .take(60)
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

/// Clears recorded data on creation and writes it out as parquet on drop.
///
/// Output goes to `{parent}/{name}/`, one file per event target, followed by
/// an empty `_ready` file once every table is written. Reruns with the same
/// name overwrite the previous output.
///
/// ```ignore
/// let mut rec = instrument::ScopedRecorder::new("data", "tie_rates");
/// // ... run rounds ...
/// let dfs = rec.get();
/// // rec drops -> data/tie_rates/{bid,clear}.parquet + _ready
/// ```
pub struct ScopedRecorder {
    run_dir: PathBuf,
    run_name: String,
    dfs: Option<BTreeMap<String, DataFrame>>,
}

impl ScopedRecorder {
    pub fn new(parent: impl Into<PathBuf>, name: &str) -> Self {
        let run_name = sanitize(name);
        let run_dir = parent.into().join(&run_name);
        clear();
        install_subscriber();
        Self {
            run_dir,
            run_name,
            dfs: None,
        }
    }

    /// Frames recorded so far. The first call drains the recorder; later calls
    /// return the same frames.
    pub fn get(&mut self) -> &BTreeMap<String, DataFrame> {
        let run_name = &self.run_name;
        self.dfs.get_or_insert_with(|| match drain_to_dataframes() {
            Ok(dfs) => dfs,
            Err(e) => {
                eprintln!("ScopedRecorder({run_name}): could not build frames: {e}");
                BTreeMap::new()
            }
        })
    }

    pub fn run_name(&self) -> &str {
        &self.run_name
    }

    pub fn run_dir(&self) -> &Path {
        &self.run_dir
    }
}

impl Drop for ScopedRecorder {
    fn drop(&mut self) {
        let mut dfs = match self.dfs.take() {
            Some(dfs) => dfs,
            None => match drain_to_dataframes() {
                Ok(dfs) => dfs,
                Err(e) => {
                    eprintln!("ScopedRecorder({}): could not build frames: {e}", self.run_name);
                    return;
                }
            },
        };
        if dfs.is_empty() {
            return;
        }
        if let Err(e) = save_parquet(&mut dfs, &self.run_dir) {
            eprintln!("ScopedRecorder({}): failed to write parquet: {e}", self.run_name);
            return;
        }
        let sentinel = self.run_dir.join("_ready");
        if let Err(e) = std::fs::File::create(&sentinel) {
            eprintln!("ScopedRecorder({}): failed to write _ready sentinel: {e}", self.run_name);
        } else {
            eprintln!(
                "ScopedRecorder: wrote {} tables to {}",
                dfs.len(),
                self.run_dir.display()
            );
        }
    }
}
