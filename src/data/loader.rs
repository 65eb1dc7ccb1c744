use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use arrow::array::{
    Array, AsArray, Float32Array, Float64Array, Int32Array, Int64Array, StringArray,
    UInt32Array, UInt64Array,
};
use arrow::datatypes::DataType;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::model::{
    DEPARTMENT, Dataset, LATITUDE, LONGITUDE, MEAN_SALARY, REGION, REQUIRED_COLUMNS, TOTAL_FIRMS,
    TOTAL_POPULATION, TOWN, TownRecord, TownTable,
};
use super::schema::SchemaError;

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Load a town table and validate it into a [`Dataset`].
///
/// A schema mismatch (missing identifier or segment column) rejects the
/// whole file.
pub fn open_dataset(path: &Path) -> Result<Dataset> {
    let table = load_file(path)?;
    let dataset = Dataset::new(table)
        .with_context(|| format!("validating columns of {}", path.display()))?;
    log::info!(
        "Loaded {} towns ({} measure columns) from {}",
        dataset.len(),
        dataset.table.measure_names().len(),
        path.display()
    );
    Ok(dataset)
}

/// Load the wide town table from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.csv`     – one header row, one row per town (the reference format)
/// * `.parquet` – same columns, flat scalar types
/// * `.json`    – `[{ "Town": "...", "mean_salary": 13.2, ... }, ...]`
pub fn load_file(path: &Path) -> Result<TownTable> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "csv" => load_csv(path),
        "parquet" | "pq" => load_parquet(path),
        "json" => load_json(path),
        other => bail!("Unsupported file extension: .{other}"),
    }
}

// ---------------------------------------------------------------------------
// Format-independent row assembly
// ---------------------------------------------------------------------------

/// A cell as read from any of the supported formats.
#[derive(Debug, Clone, PartialEq)]
enum RawCell {
    Text(String),
    Number(f64),
    Null,
}

impl RawCell {
    fn text(&self) -> String {
        match self {
            RawCell::Text(s) => s.trim().to_string(),
            RawCell::Number(n) if n.fract() == 0.0 && n.is_finite() => format!("{}", *n as i64),
            RawCell::Number(n) => n.to_string(),
            RawCell::Null => String::new(),
        }
    }

    /// Empty, unparsable and non-finite cells are missing.
    fn float(&self) -> Option<f64> {
        let v = match self {
            RawCell::Text(s) => s.trim().parse::<f64>().ok()?,
            RawCell::Number(n) => *n,
            RawCell::Null => return None,
        };
        v.is_finite().then_some(v)
    }

    /// Non-negative integers; `"1234.0"` is accepted as written by pandas.
    fn count(&self) -> Option<u64> {
        if let RawCell::Text(s) = self {
            if let Ok(n) = s.trim().parse::<u64>() {
                return Some(n);
            }
        }
        let v = self.float()?;
        (v >= 0.0 && v.fract() == 0.0).then_some(v as u64)
    }
}

/// Where each required column and each measure sits in a source row.
#[derive(Debug)]
struct ColumnLayout {
    town: usize,
    region: usize,
    department: usize,
    latitude: usize,
    longitude: usize,
    population: usize,
    firms: usize,
    mean_salary: usize,
    measures: Vec<(String, usize)>,
}

impl ColumnLayout {
    fn from_headers(headers: &[String]) -> Result<Self, SchemaError> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h == name)
                .ok_or_else(|| SchemaError::MissingIdentifier(name.to_string()))
        };
        let measures = headers
            .iter()
            .enumerate()
            .filter(|(_, h)| !REQUIRED_COLUMNS.contains(&h.as_str()))
            .map(|(i, h)| (h.clone(), i))
            .collect();
        Ok(Self {
            town: find(TOWN)?,
            region: find(REGION)?,
            department: find(DEPARTMENT)?,
            latitude: find(LATITUDE)?,
            longitude: find(LONGITUDE)?,
            population: find(TOTAL_POPULATION)?,
            firms: find(TOTAL_FIRMS)?,
            mean_salary: find(MEAN_SALARY)?,
            measures,
        })
    }

    fn measure_names(&self) -> Vec<String> {
        self.measures.iter().map(|(name, _)| name.clone()).collect()
    }

    /// `None` for rows without a town name.
    fn build(&self, cells: &[RawCell]) -> Option<TownRecord> {
        let cell = |i: usize| cells.get(i).unwrap_or(&RawCell::Null);
        let town = cell(self.town).text();
        if town.is_empty() {
            return None;
        }
        Some(TownRecord {
            town,
            region: cell(self.region).text(),
            department: cell(self.department).text(),
            latitude: cell(self.latitude).float(),
            longitude: cell(self.longitude).float(),
            total_population: cell(self.population).count(),
            total_firms: cell(self.firms).count(),
            mean_salary: cell(self.mean_salary).float(),
            measures: self.measures.iter().map(|&(_, i)| cell(i).float()).collect(),
        })
    }
}

/// Accumulates rows and reports how many were dropped.
struct TableBuilder {
    layout: ColumnLayout,
    towns: Vec<TownRecord>,
    skipped: usize,
}

impl TableBuilder {
    fn new(headers: &[String]) -> Result<Self> {
        Ok(Self {
            layout: ColumnLayout::from_headers(headers)?,
            towns: Vec::new(),
            skipped: 0,
        })
    }

    fn push(&mut self, cells: &[RawCell]) {
        match self.layout.build(cells) {
            Some(t) => self.towns.push(t),
            None => self.skipped += 1,
        }
    }

    fn finish(self) -> TownTable {
        if self.skipped > 0 {
            log::warn!("Skipped {} rows without a town name", self.skipped);
        }
        TownTable::new(self.towns, self.layout.measure_names())
    }
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

fn load_csv(path: &Path) -> Result<TownTable> {
    let mut reader = csv::Reader::from_path(path).context("opening CSV")?;
    let headers: Vec<String> = reader
        .headers()
        .context("reading CSV headers")?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut builder = TableBuilder::new(&headers)?;
    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;
        let cells: Vec<RawCell> = record
            .iter()
            .map(|v| {
                if v.trim().is_empty() {
                    RawCell::Null
                } else {
                    RawCell::Text(v.to_string())
                }
            })
            .collect();
        builder.push(&cells);
    }
    Ok(builder.finish())
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Records-oriented JSON, as written by `df.to_json(orient='records')`.
/// The column set is taken from the first record.
fn load_json(path: &Path) -> Result<TownTable> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    let root: JsonValue = serde_json::from_str(&text).context("parsing JSON")?;

    let records = root.as_array().context("Expected top-level JSON array")?;

    let headers: Vec<String> = match records.first() {
        Some(first) => first
            .as_object()
            .context("Row 0 is not a JSON object")?
            .keys()
            .cloned()
            .collect(),
        None => REQUIRED_COLUMNS.iter().map(|c| c.to_string()).collect(),
    };

    let mut builder = TableBuilder::new(&headers)?;
    for (i, rec) in records.iter().enumerate() {
        let obj = rec
            .as_object()
            .with_context(|| format!("Row {i} is not a JSON object"))?;
        let cells: Vec<RawCell> = headers
            .iter()
            .map(|h| json_to_cell(obj.get(h)))
            .collect();
        builder.push(&cells);
    }
    Ok(builder.finish())
}

fn json_to_cell(val: Option<&JsonValue>) -> RawCell {
    match val {
        Some(JsonValue::String(s)) => RawCell::Text(s.clone()),
        Some(JsonValue::Number(n)) => n.as_f64().map_or(RawCell::Null, RawCell::Number),
        _ => RawCell::Null,
    }
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Works with files written by both **Pandas** (`df.to_parquet()`) and
/// **Polars** (`df.write_parquet()`), and with the sample generator.
fn load_parquet(path: &Path) -> Result<TownTable> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .context("reading parquet metadata")?;
    let headers: Vec<String> = builder
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .collect();
    let reader = builder.build().context("building parquet reader")?;

    let mut table = TableBuilder::new(&headers)?;
    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        for row in 0..batch.num_rows() {
            let cells: Vec<RawCell> = batch
                .columns()
                .iter()
                .map(|col| arrow_cell(col, row))
                .collect();
            table.push(&cells);
        }
    }
    Ok(table.finish())
}

/// Extract a single cell from an Arrow column at a given row.
fn arrow_cell(col: &Arc<dyn Array>, row: usize) -> RawCell {
    if col.is_null(row) {
        return RawCell::Null;
    }
    let any = col.as_any();
    match col.data_type() {
        DataType::Utf8 => any
            .downcast_ref::<StringArray>()
            .map_or(RawCell::Null, |a| RawCell::Text(a.value(row).to_string())),
        DataType::LargeUtf8 => RawCell::Text(col.as_string::<i64>().value(row).to_string()),
        DataType::Int32 => any
            .downcast_ref::<Int32Array>()
            .map_or(RawCell::Null, |a| RawCell::Number(a.value(row) as f64)),
        DataType::Int64 => any
            .downcast_ref::<Int64Array>()
            .map_or(RawCell::Null, |a| RawCell::Number(a.value(row) as f64)),
        DataType::UInt32 => any
            .downcast_ref::<UInt32Array>()
            .map_or(RawCell::Null, |a| RawCell::Number(a.value(row) as f64)),
        DataType::UInt64 => any
            .downcast_ref::<UInt64Array>()
            .map_or(RawCell::Null, |a| RawCell::Number(a.value(row) as f64)),
        DataType::Float32 => any
            .downcast_ref::<Float32Array>()
            .map_or(RawCell::Null, |a| RawCell::Number(a.value(row) as f64)),
        DataType::Float64 => any
            .downcast_ref::<Float64Array>()
            .map_or(RawCell::Null, |a| RawCell::Number(a.value(row))),
        other => {
            log::debug!("unsupported parquet column type {other:?}, reading as missing");
            RawCell::Null
        }
    }
}
