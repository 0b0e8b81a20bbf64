mod entry;

pub use entry::{Direction, LogEntry, Timestamp};

use crate::error::Result;
use arrow::{
    array::{
        Array, ArrayBuilder, ArrayRef, AsArray, BooleanArray, Float64Array, Float64Builder,
        StringArray, StringBuilder,
    },
    compute::{
        self,
        kernels::cmp::{eq, gt, lt},
    },
    datatypes::{DataType, Field, Float64Type, Schema, SchemaRef},
    record_batch::RecordBatch,
};
use arrow_arith::boolean::and;
use std::sync::Arc;
use tracing::trace;

const TIMESTAMP_COL: usize = 0;
const LOG_TYPE_COL: usize = 1;
const SEVERITY_COL: usize = 2;

pub const DEFAULT_BATCH_ROWS: usize = 1024;

/// Predicates supported by [`EntryStore::mean_severity`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Filter<'a> {
    /// Type equality after trimming surrounding whitespace on both sides.
    Type(&'a str),
    /// Strictly before or after a timestamp.
    Range { direction: Direction, pivot: Timestamp },
    /// Strictly before or after a timestamp, with an exact (untrimmed) type match.
    RangeAndType {
        direction: Direction,
        pivot: Timestamp,
        log_type: &'a str,
    },
}

impl Filter<'_> {
    /// Row mask over one batch. Null (not-a-number) timestamps produce null
    /// mask slots, which `filter` treats as unselected.
    fn evaluate(&self, batch: &RecordBatch) -> Result<BooleanArray> {
        match *self {
            Filter::Type(log_type) => {
                let wanted = log_type.trim();
                Ok(batch
                    .column(LOG_TYPE_COL)
                    .as_string::<i32>()
                    .iter()
                    .map(|stored| stored.map(|stored| stored.trim() == wanted))
                    .collect())
            }
            Filter::Range { direction, pivot } => range_mask(batch, direction, pivot),
            Filter::RangeAndType {
                direction,
                pivot,
                log_type,
            } => {
                let in_range = range_mask(batch, direction, pivot)?;
                let same_type = eq(
                    batch.column(LOG_TYPE_COL),
                    &StringArray::new_scalar(log_type),
                )?;
                Ok(and(&in_range, &same_type)?)
            }
        }
    }
}

fn range_mask(batch: &RecordBatch, direction: Direction, pivot: Timestamp) -> Result<BooleanArray> {
    let Some(pivot) = pivot.value() else {
        return Ok(BooleanArray::from(vec![false; batch.num_rows()]));
    };
    // Arrow orders floats totally (NaN last, -0.0 below 0.0). Neither reaches
    // the kernel: not-a-number is stored as null and `Timestamp` folds -0.0.
    let pivot = Float64Array::new_scalar(pivot);
    let timestamps = batch.column(TIMESTAMP_COL);
    let mask = match direction {
        Direction::Before => lt(timestamps, &pivot)?,
        Direction::After => gt(timestamps, &pivot)?,
    };
    Ok(mask)
}

/// Rows appended since the last sealed batch.
struct PendingRows {
    timestamps: Float64Builder,
    log_types: StringBuilder,
    severities: Float64Builder,
}

impl PendingRows {
    fn new() -> Self {
        Self {
            timestamps: Float64Builder::new(),
            log_types: StringBuilder::new(),
            severities: Float64Builder::new(),
        }
    }

    fn len(&self) -> usize {
        self.severities.len()
    }

    fn push(&mut self, entry: &LogEntry) {
        self.timestamps.append_option(entry.timestamp.value());
        self.log_types.append_value(&entry.log_type);
        self.severities.append_value(entry.severity);
    }

    fn finish(&mut self, schema: &SchemaRef) -> Result<RecordBatch> {
        let columns: Vec<ArrayRef> = vec![
            Arc::new(self.timestamps.finish()),
            Arc::new(self.log_types.finish()),
            Arc::new(self.severities.finish()),
        ];
        Ok(RecordBatch::try_new(schema.clone(), columns)?)
    }

    fn snapshot(&self, schema: &SchemaRef) -> Result<RecordBatch> {
        let columns: Vec<ArrayRef> = vec![
            Arc::new(self.timestamps.finish_cloned()),
            Arc::new(self.log_types.finish_cloned()),
            Arc::new(self.severities.finish_cloned()),
        ];
        Ok(RecordBatch::try_new(schema.clone(), columns)?)
    }
}

/// Append-only, insertion-ordered log entry store using Apache Arrow.
///
/// Entries accumulate in column builders and are sealed into immutable
/// record batches every `batch_rows` rows. Queries scan the sealed batches
/// followed by a snapshot of the pending rows, so iteration order always
/// matches insertion order.
pub struct EntryStore {
    schema: SchemaRef,
    batches: Vec<RecordBatch>,
    pending: PendingRows,
    batch_rows: usize,
    len: usize,
}

impl EntryStore {
    pub fn new() -> Self {
        Self::with_batch_rows(DEFAULT_BATCH_ROWS)
    }

    pub fn with_batch_rows(batch_rows: usize) -> Self {
        let schema = Arc::new(Schema::new(vec![
            Field::new("timestamp", DataType::Float64, true),
            Field::new("log_type", DataType::Utf8, false),
            Field::new("severity", DataType::Float64, false),
        ]));

        Self {
            schema,
            batches: Vec::new(),
            pending: PendingRows::new(),
            batch_rows: batch_rows.max(1),
            len: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Append an entry. Values are stored as given; NaN severities and
    /// not-a-number timestamps are kept, not rejected.
    pub fn append(&mut self, entry: &LogEntry) -> Result<()> {
        self.pending.push(entry);
        self.len += 1;

        if self.pending.len() >= self.batch_rows {
            let batch = self.pending.finish(&self.schema)?;
            trace!(rows = batch.num_rows(), sealed = self.batches.len() + 1, "sealed entry batch");
            self.batches.push(batch);
        }

        Ok(())
    }

    /// All batches in insertion order, including a snapshot of unsealed rows.
    pub fn batches(&self) -> Result<Vec<RecordBatch>> {
        let mut batches = self.batches.clone();
        if self.pending.len() > 0 {
            batches.push(self.pending.snapshot(&self.schema)?);
        }
        Ok(batches)
    }

    pub fn entries(&self) -> Result<Vec<LogEntry>> {
        let mut entries = Vec::with_capacity(self.len);
        for batch in self.batches()? {
            let timestamps = batch.column(TIMESTAMP_COL).as_primitive::<Float64Type>();
            let log_types = batch.column(LOG_TYPE_COL).as_string::<i32>();
            let severities = batch.column(SEVERITY_COL).as_primitive::<Float64Type>();

            for row in 0..batch.num_rows() {
                let timestamp = timestamps.is_valid(row).then(|| timestamps.value(row));
                entries.push(LogEntry {
                    timestamp: timestamp.into(),
                    log_type: log_types.value(row).to_owned(),
                    severity: severities.value(row),
                });
            }
        }
        Ok(entries)
    }

    /// Arithmetic mean of `severity` over the entries matching `filter`.
    ///
    /// Severities are summed left to right in insertion order. Returns
    /// exactly `0.0` when nothing matches.
    pub fn mean_severity(&self, filter: &Filter<'_>) -> Result<f64> {
        let mut total = 0.0;
        let mut count = 0usize;

        for batch in self.batches()? {
            let mask = filter.evaluate(&batch)?;
            let matched = compute::filter(batch.column(SEVERITY_COL).as_ref(), &mask)?;
            let severities = matched.as_primitive::<Float64Type>();

            total = severities.values().iter().fold(total, |sum, severity| sum + severity);
            count += severities.len();
        }

        if count == 0 {
            return Ok(0.0);
        }
        Ok(total / count as f64)
    }
}

impl Default for EntryStore {
    fn default() -> Self {
        Self::new()
    }
}
