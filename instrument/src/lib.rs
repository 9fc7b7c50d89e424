//! Event capture for simulation runs.
//!
//! A `tracing` subscriber turns every structured event into a row of the
//! table named by the event's target. Columns appear the first time a field
//! is seen; rows that lack a field hold a null there. Tables convert to
//! polars DataFrames and can be written out as parquet.
//!
//! # Usage
//!
//! ```ignore
//! // In simulation code:
//! tracing::info!(target: "sale", tick, unit_id, amount, sold);
//!
//! // In a test:
//! let mut run = instrument::RunRecorder::new("runs", "rent_cap", 7);
//! // ... step the simulation ...
//! let sales = &run.get()["sale"];
//! ```

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::field::{Field, Visit};
use tracing::span::{Attributes, Record};
use tracing::{Event, Id, Metadata, Subscriber};

/// One column; `None` marks a row where the field was absent.
#[derive(Debug, Clone, PartialEq)]
pub enum TypedColumn {
    U64(Vec<Option<u64>>),
    I64(Vec<Option<i64>>),
    F64(Vec<Option<f64>>),
    Bool(Vec<Option<bool>>),
    Str(Vec<Option<String>>),
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

    fn pad_to(&mut self, rows: usize) {
        let missing = rows.saturating_sub(self.len());
        match self {
            TypedColumn::U64(v) => v.extend(std::iter::repeat_n(None, missing)),
            TypedColumn::I64(v) => v.extend(std::iter::repeat_n(None, missing)),
            TypedColumn::F64(v) => v.extend(std::iter::repeat_n(None, missing)),
            TypedColumn::Bool(v) => v.extend(std::iter::repeat_n(None, missing)),
            TypedColumn::Str(v) => v.extend(std::iter::repeat_n(None, missing)),
        }
    }
}

/// Rows of one event target, stored column-wise.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DynamicTable {
    pub columns: BTreeMap<String, TypedColumn>,
    pub row_count: usize,
}

impl DynamicTable {
    /// Bring every column level with `row_count`
    fn align(&mut self) {
        for col in self.columns.values_mut() {
            col.pad_to(self.row_count);
        }
    }

    pub fn column(&self, name: &str) -> Option<&TypedColumn> {
        self.columns.get(name)
    }

    /// Values of a u64 column, nulls dropped
    pub fn u64s(&self, name: &str) -> Vec<u64> {
        match self.columns.get(name) {
            Some(TypedColumn::U64(v)) => v.iter().flatten().copied().collect(),
            _ => Vec::new(),
        }
    }

    /// Values of an f64 column, nulls dropped
    pub fn f64s(&self, name: &str) -> Vec<f64> {
        match self.columns.get(name) {
            Some(TypedColumn::F64(v)) => v.iter().flatten().copied().collect(),
            _ => Vec::new(),
        }
    }
}

/// Every table recorded on this thread, keyed by event target.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Recorder {
    pub tables: BTreeMap<String, DynamicTable>,
}

impl Recorder {
    pub fn table(&self, target: &str) -> Option<&DynamicTable> {
        self.tables.get(target)
    }

    pub fn rows(&self, target: &str) -> usize {
        self.tables.get(target).map_or(0, |t| t.row_count)
    }
}

thread_local! {
    static RECORDER: RefCell<Recorder> = RefCell::default();
}

/// Writes one event's fields into the current row.
struct RowVisitor<'a> {
    table: &'a mut DynamicTable,
}

impl RowVisitor<'_> {
    fn slot<T>(
        &mut self,
        field: &Field,
        make: fn(Vec<Option<T>>) -> TypedColumn,
        value: T,
        fallback: impl FnOnce(&mut TypedColumn, T),
    ) where
        T: Clone,
    {
        let rows = self.table.row_count;
        let col = self
            .table
            .columns
            .entry(field.name().to_string())
            .or_insert_with(|| make(vec![None; rows]));
        fallback(col, value);
    }
}

impl Visit for RowVisitor<'_> {
    fn record_u64(&mut self, field: &Field, value: u64) {
        self.slot(field, TypedColumn::U64, value, |col, v| match col {
            TypedColumn::U64(c) => c.push(Some(v)),
            TypedColumn::F64(c) => c.push(Some(v as f64)),
            TypedColumn::I64(c) => c.push(i64::try_from(v).ok()),
            _ => {}
        });
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.slot(field, TypedColumn::I64, value, |col, v| match col {
            TypedColumn::I64(c) => c.push(Some(v)),
            TypedColumn::U64(c) => c.push(u64::try_from(v).ok()),
            TypedColumn::F64(c) => c.push(Some(v as f64)),
            _ => {}
        });
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.slot(field, TypedColumn::F64, value, |col, v| {
            if let TypedColumn::F64(c) = col {
                c.push(Some(v));
            }
        });
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.slot(field, TypedColumn::Bool, value, |col, v| {
            if let TypedColumn::Bool(c) = col {
                c.push(Some(v));
            }
        });
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.slot(field, TypedColumn::Str, value.to_string(), |col, v| {
            if let TypedColumn::Str(c) = col {
                c.push(Some(v));
            }
        });
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        self.record_str(field, &format!("{value:?}"));
    }
}

/// Subscriber that records INFO and more severe events into the
/// thread-local [`Recorder`]. Spans are ignored.
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
        let target = event.metadata().target().to_string();
        RECORDER.with(|r| {
            let mut recorder = r.borrow_mut();
            let table = recorder.tables.entry(target).or_default();
            event.record(&mut RowVisitor { table });
            table.row_count += 1;
            table.align();
        });
    }

    fn enter(&self, _span: &Id) {}

    fn exit(&self, _span: &Id) {}
}

/// Install [`DataFrameSubscriber`] process-wide. Later calls are no-ops.
pub fn install_subscriber() {
    let _ = tracing::subscriber::set_global_default(DataFrameSubscriber);
}

/// Take everything recorded on this thread
pub fn drain() -> Recorder {
    RECORDER.with(|r| std::mem::take(&mut *r.borrow_mut()))
}

pub fn clear() {
    RECORDER.with(|r| *r.borrow_mut() = Recorder::default());
}

/// Run `f` under a thread-scoped [`DataFrameSubscriber`] and return its
/// result with everything it recorded
pub fn capture<T>(f: impl FnOnce() -> T) -> (T, Recorder) {
    clear();
    let out = tracing::subscriber::with_default(DataFrameSubscriber, f);
    (out, drain())
}

// === Polars ===

use polars::prelude::*;

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
    /// Tables that fail to convert are skipped
    pub fn to_dataframes(&self) -> BTreeMap<String, DataFrame> {
        self.tables
            .iter()
            .filter_map(|(name, table)| table.to_dataframe().ok().map(|df| (name.clone(), df)))
            .collect()
    }
}

pub fn drain_to_dataframes() -> BTreeMap<String, DataFrame> {
    drain().to_dataframes()
}

fn io_error(err: std::io::Error) -> PolarsError {
    PolarsError::IO {
        error: err.into(),
        msg: None,
    }
}

/// Write each table to `{dir}/{target}.parquet`
pub fn save_parquet(dfs: &mut BTreeMap<String, DataFrame>, dir: &Path) -> PolarsResult<()> {
    std::fs::create_dir_all(dir).map_err(io_error)?;
    for (name, df) in dfs.iter_mut() {
        let file = std::fs::File::create(dir.join(format!("{name}.parquet"))).map_err(io_error)?;
        ParquetWriter::new(file).finish(df)?;
    }
    Ok(())
}

/// Lowercase alphanumerics, everything else `_`, at most 60 chars
fn sanitize(name: &str) -> String {
    name.chars()
        .take(60)
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect()
}

/// Directory name for one scenario run. The same scenario and seed always
/// map to the same directory, so reruns overwrite rather than accumulate.
pub fn run_name(scenario: &str, seed: u64) -> String {
    format!("{}_seed{}", sanitize(scenario), seed)
}

/// Guard for one instrumented run.
///
/// Creation clears the thread's recorder and installs the subscriber.
/// [`RunRecorder::get`] drains the recorded tables for analysis. On drop
/// the tables go to `{parent}/{scenario}_seed{seed}/*.parquet`, followed
/// by a `_ready` marker.
pub struct RunRecorder {
    run_dir: PathBuf,
    run_name: String,
    dfs: Option<BTreeMap<String, DataFrame>>,
}

impl RunRecorder {
    pub fn new(parent: impl Into<PathBuf>, scenario: &str, seed: u64) -> Self {
        let run_name = run_name(scenario, seed);
        let run_dir = parent.into().join(&run_name);
        clear();
        install_subscriber();
        Self {
            run_dir,
            run_name,
            dfs: None,
        }
    }

    /// Drained tables; the first call drains, later calls reuse them
    pub fn get(&mut self) -> &BTreeMap<String, DataFrame> {
        self.dfs.get_or_insert_with(drain_to_dataframes)
    }

    pub fn run_name(&self) -> &str {
        &self.run_name
    }

    pub fn run_dir(&self) -> &Path {
        &self.run_dir
    }
}

impl Drop for RunRecorder {
    fn drop(&mut self) {
        let mut dfs = self.dfs.take().unwrap_or_else(drain_to_dataframes);
        if dfs.is_empty() {
            return;
        }
        if let Err(e) = save_parquet(&mut dfs, &self.run_dir) {
            eprintln!("RunRecorder({}): parquet write failed: {e}", self.run_name);
            return;
        }
        match std::fs::File::create(self.run_dir.join("_ready")) {
            Ok(_) => eprintln!(
                "RunRecorder: wrote {} tables to {}",
                dfs.len(),
                self.run_dir.display()
            ),
            Err(e) => eprintln!("RunRecorder({}): _ready marker failed: {e}", self.run_name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing::subscriber::with_default;

    #[test]
    fn test_events_become_rows_by_target() {
        clear();
        with_default(DataFrameSubscriber, || {
            tracing::info!(target: "sale", tick = 1u64, unit_id = 7u64, amount = 90_000.0, sold = true);
            tracing::info!(target: "sale", tick = 1u64, unit_id = 8u64, amount = 50_000.0, sold = false);
            tracing::info!(target: "tick", tick = 1u64, homeless = 0.25);
        });

        let recorder = drain();
        assert_eq!(recorder.rows("sale"), 2);
        assert_eq!(recorder.rows("tick"), 1);
        let sales = recorder.table("sale").unwrap();
        assert_eq!(sales.u64s("unit_id"), vec![7, 8]);
        assert_eq!(sales.f64s("amount"), vec![90_000.0, 50_000.0]);
        assert_eq!(
            sales.column("sold"),
            Some(&TypedColumn::Bool(vec![Some(true), Some(false)]))
        );
    }

    #[test]
    fn test_missing_fields_are_null() {
        clear();
        with_default(DataFrameSubscriber, || {
            tracing::info!(target: "relocation", tick = 3u64, reason = "upgrade");
            tracing::info!(target: "relocation", tick = 4u64, to_unit = 12u64);
            tracing::info!(target: "relocation", tick = 5u64, reason = "priced_out");
        });

        let table = drain().tables.remove("relocation").unwrap();
        assert_eq!(table.row_count, 3);
        assert_eq!(
            table.column("reason"),
            Some(&TypedColumn::Str(vec![
                Some("upgrade".to_string()),
                None,
                Some("priced_out".to_string()),
            ]))
        );
        assert_eq!(
            table.column("to_unit"),
            Some(&TypedColumn::U64(vec![None, Some(12), None]))
        );
    }

    #[test]
    fn test_debug_level_is_ignored_and_warn_kept() {
        clear();
        with_default(DataFrameSubscriber, || {
            tracing::debug!(target: "command", tick = 1u64);
            tracing::warn!(target: "command", tick = 2u64, error = "unknown unit 9");
        });
        let recorder = drain();
        assert_eq!(recorder.table("command").unwrap().u64s("tick"), vec![2]);
    }

    #[test]
    fn test_table_converts_to_dataframe_with_nulls() {
        clear();
        with_default(DataFrameSubscriber, || {
            tracing::info!(target: "offer", tick = 1u64, amount = 10.0);
            tracing::info!(target: "offer", tick = 2u64);
        });
        let dfs = drain_to_dataframes();
        let df = &dfs["offer"];
        assert_eq!(df.height(), 2);
        assert_eq!(df.column("amount").unwrap().null_count(), 1);
    }

    #[test]
    fn test_capture_scopes_recording() {
        let (n, recorder) = capture(|| {
            tracing::info!(target: "rent", tick = 1u64, new_rent = 980.0);
            7
        });
        assert_eq!(n, 7);
        assert_eq!(recorder.table("rent").unwrap().f64s("new_rent"), vec![980.0]);
        assert_eq!(drain(), Recorder::default());
    }

    #[test]
    fn test_run_name_is_deterministic() {
        assert_eq!(run_name("Rent cap: 3%", 42), "rent_cap__3__seed42");
        assert_eq!(run_name("Rent cap: 3%", 42), run_name("Rent cap: 3%", 42));
        assert_eq!(run_name(&"x".repeat(100), 1).len(), "_seed1".len() + 60);
    }
}
