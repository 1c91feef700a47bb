use std::collections::BTreeSet;
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use arrow::array::{Array, ArrayRef, AsArray};
use arrow::compute::cast;
use arrow::datatypes::{DataType, Float64Type, TimeUnit, TimestampMillisecondType};
use chrono::{NaiveDate, NaiveDateTime};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::file::reader::ChunkReader;
use serde_json::Value as JsonValue;
use thiserror::Error;

use super::model::{AQI_COLUMN, CITY_COLUMN, Dataset, Pollutant, Reading, Schema};

/// Preferred timestamp column; `Date` is used only when this is absent.
const DATETIME_COLUMN: &str = "Datetime";
const DATE_COLUMN: &str = "Date";

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d-%m-%Y", "%m/%d/%Y", "%Y/%m/%d"];

/// Cell spellings read as missing.
const NULL_TOKENS: &[&str] = &[
    "", "NA", "N/A", "n/a", "NaN", "nan", "-NaN", "null", "NULL", "None", "#N/A", "<NA>",
];

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Fatal load failure. The dashboard is not shown when this is returned.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("cannot open {}: {source}", path.display())]
    NotFound {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("malformed data in {}: {source:#}", path.display())]
    Malformed {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },
    #[error("unsupported file extension: .{extension}")]
    Unsupported { extension: String },
}

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load an air-quality dataset from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.csv` (or no extension) – header row, one reading per line
/// * `.json`    – `[{ "City": "Delhi", "Date": "2020-01-01", "AQI": 45, ... }, ...]`
/// * `.parquet` – one column per field, dates as text, Date32/64 or Timestamp
///
/// Rows without a city or a parseable timestamp are dropped. The result is
/// ordered by timestamp.
pub fn load_file(path: &Path) -> Result<Dataset, LoadError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    if !matches!(ext.as_str(), "csv" | "" | "json" | "parquet" | "pq") {
        return Err(LoadError::Unsupported { extension: ext });
    }

    let file = File::open(path).map_err(|source| LoadError::NotFound {
        path: path.to_path_buf(),
        source,
    })?;

    let table = match ext.as_str() {
        "json" => read_json(BufReader::new(file)),
        "parquet" | "pq" => read_parquet(file),
        _ => read_csv(BufReader::new(file)),
    };

    table
        .and_then(into_dataset)
        .map_err(|source| LoadError::Malformed {
            path: path.to_path_buf(),
            source,
        })
}

// ---------------------------------------------------------------------------
// Raw rows and cleaning
// ---------------------------------------------------------------------------

/// A parsed row before the retention check.
#[derive(Debug, Default)]
struct RawRow {
    city: Option<String>,
    timestamp: Option<NaiveDateTime>,
    aqi: Option<f64>,
    levels: Vec<(Pollutant, Option<f64>)>,
}

impl RawRow {
    fn into_reading(self) -> Option<Reading> {
        let reading = Reading::new(self.city?, self.timestamp?, self.aqi);
        Some(
            self.levels
                .into_iter()
                .fold(reading, |r, (pollutant, value)| r.with_level(pollutant, value)),
        )
    }
}

#[derive(Debug)]
struct RawTable {
    schema: Schema,
    rows: Vec<RawRow>,
}

/// Keep rows with both a city and a timestamp, then order by time.
fn into_dataset(table: RawTable) -> Result<Dataset> {
    let total = table.rows.len();
    let readings: Vec<Reading> = table
        .rows
        .into_iter()
        .filter_map(RawRow::into_reading)
        .collect();

    if readings.is_empty() {
        bail!("no rows with both a city and a valid timestamp ({total} rows read)");
    }
    log::debug!(
        "Dropped {} of {total} rows lacking city or timestamp",
        total - readings.len()
    );

    Ok(Dataset::from_readings(readings, table.schema))
}

/// Column names the loader understands, resolved against a header.
#[derive(Debug)]
struct Columns<K> {
    city: K,
    timestamp: K,
    aqi: Option<K>,
    pollutants: Vec<(Pollutant, K)>,
}

impl<K: Copy> Columns<K> {
    /// `lookup` maps a column name to its key (index or name) in the source.
    fn resolve(lookup: impl Fn(&str) -> Option<K>) -> Result<Self> {
        let city = lookup(CITY_COLUMN).context("missing 'City' column")?;
        let timestamp = lookup(DATETIME_COLUMN)
            .or_else(|| lookup(DATE_COLUMN))
            .context("missing 'Datetime' or 'Date' column")?;
        let pollutants = Pollutant::ALL
            .into_iter()
            .filter_map(|p| lookup(p.column()).map(|k| (p, k)))
            .collect();
        Ok(Columns {
            city,
            timestamp,
            aqi: lookup(AQI_COLUMN),
            pollutants,
        })
    }
}

// ---------------------------------------------------------------------------
// Cell parsing
// ---------------------------------------------------------------------------

fn is_null_token(s: &str) -> bool {
    NULL_TOKENS.contains(&s.trim())
}

fn parse_text(s: &str) -> Option<String> {
    if is_null_token(s) {
        None
    } else {
        Some(s.trim().to_string())
    }
}

/// Parse a numeric cell; unparseable and non-finite values are missing.
fn parse_number(s: &str) -> Option<f64> {
    if is_null_token(s) {
        return None;
    }
    s.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parse a timestamp cell; failures yield `None` rather than an error.
pub(crate) fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    if is_null_token(s) {
        return None;
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// CSV layout: header row with column names, one reading per record.
/// Short records are padded with missing values.
fn read_csv<R: Read>(reader: R) -> Result<RawTable> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(reader);
    let headers: Vec<String> = reader
        .headers()
        .context("reading CSV headers")?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let columns = Columns::resolve(|name| headers.iter().position(|h| h == name))?;
    let schema = Schema::from_columns(headers.iter().map(String::as_str));

    let mut rows = Vec::new();
    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;
        let cell = |idx: usize| record.get(idx).unwrap_or("");

        rows.push(RawRow {
            city: parse_text(cell(columns.city)),
            timestamp: parse_timestamp(cell(columns.timestamp)),
            aqi: columns.aqi.and_then(|idx| parse_number(cell(idx))),
            levels: columns
                .pollutants
                .iter()
                .map(|&(p, idx)| (p, parse_number(cell(idx))))
                .collect(),
        });
    }

    Ok(RawTable { schema, rows })
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Expected JSON schema (records-oriented, the default `df.to_json(orient='records')`):
///
/// ```json
/// [
///   { "City": "Delhi", "Date": "2020-01-01", "PM2.5": 120.4, "AQI": 310 },
///   ...
/// ]
/// ```
fn read_json<R: Read>(reader: R) -> Result<RawTable> {
    let root: JsonValue = serde_json::from_reader(reader).context("parsing JSON")?;
    let records = root
        .as_array()
        .context("Expected top-level JSON array")?;

    let objects = records
        .iter()
        .enumerate()
        .map(|(i, rec)| {
            rec.as_object()
                .with_context(|| format!("Row {i} is not a JSON object"))
        })
        .collect::<Result<Vec<_>>>()?;

    let keys: BTreeSet<&str> = objects
        .iter()
        .flat_map(|obj| obj.keys().map(String::as_str))
        .collect();
    let columns = Columns::resolve(|name| keys.get(name).copied())?;
    let schema = Schema::from_columns(keys.iter().copied());

    let rows = objects
        .iter()
        .map(|obj| RawRow {
            city: obj.get(columns.city).and_then(json_text),
            timestamp: obj
                .get(columns.timestamp)
                .and_then(json_text)
                .and_then(|s| parse_timestamp(&s)),
            aqi: columns.aqi.and_then(|k| obj.get(k)).and_then(json_number),
            levels: columns
                .pollutants
                .iter()
                .map(|&(p, k)| (p, obj.get(k).and_then(json_number)))
                .collect(),
        })
        .collect();

    Ok(RawTable { schema, rows })
}

fn json_text(val: &JsonValue) -> Option<String> {
    match val {
        JsonValue::String(s) => parse_text(s),
        JsonValue::Number(n) => Some(n.to_string()),
        JsonValue::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn json_number(val: &JsonValue) -> Option<f64> {
    match val {
        JsonValue::Number(n) => n.as_f64().filter(|v| v.is_finite()),
        JsonValue::String(s) => parse_number(s),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet file with one column per field.
///
/// Works with files written by both **Pandas** (`df.to_parquet()`) and
/// **Polars** (`df.write_parquet()`). Numeric columns of any width are
/// widened to `f64`; the timestamp column may be text, Date32, Date64 or
/// Timestamp.
fn read_parquet<T: ChunkReader + 'static>(source: T) -> Result<RawTable> {
    let builder = ParquetRecordBatchReaderBuilder::try_new(source)
        .context("reading parquet metadata")?;
    let arrow_schema = builder.schema().clone();
    let reader = builder.build().context("building parquet reader")?;

    let columns = Columns::resolve(|name| arrow_schema.index_of(name).ok())?;
    let schema = Schema::from_columns(arrow_schema.fields().iter().map(|f| f.name().as_str()));

    let mut rows = Vec::new();
    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;

        let cities = text_cells(batch.column(columns.city)).context("reading 'City'")?;
        let timestamps =
            timestamp_cells(batch.column(columns.timestamp)).context("reading timestamps")?;
        let aqi = match columns.aqi {
            Some(idx) => Some(number_cells(batch.column(idx)).context("reading 'AQI'")?),
            None => None,
        };
        let levels = columns
            .pollutants
            .iter()
            .map(|&(p, idx)| {
                number_cells(batch.column(idx))
                    .with_context(|| format!("reading '{p}'"))
                    .map(|values| (p, values))
            })
            .collect::<Result<Vec<_>>>()?;

        for row in 0..batch.num_rows() {
            rows.push(RawRow {
                city: cities[row].clone(),
                timestamp: timestamps[row],
                aqi: aqi.as_ref().and_then(|values| values[row]),
                levels: levels.iter().map(|(p, values)| (*p, values[row])).collect(),
            });
        }
    }

    Ok(RawTable { schema, rows })
}

// -- Arrow helpers --

fn text_cells(col: &ArrayRef) -> Result<Vec<Option<String>>> {
    let utf8 = cast(col, &DataType::Utf8).context("casting to text")?;
    let strings = utf8.as_string::<i32>();
    Ok((0..strings.len())
        .map(|row| {
            if strings.is_null(row) {
                None
            } else {
                parse_text(strings.value(row))
            }
        })
        .collect())
}

/// Widen any numeric column to `f64`. Unparseable text becomes null.
fn number_cells(col: &ArrayRef) -> Result<Vec<Option<f64>>> {
    let floats = cast(col, &DataType::Float64).context("casting to Float64")?;
    let floats = floats.as_primitive::<Float64Type>();
    Ok(floats
        .iter()
        .map(|v| v.filter(|x| x.is_finite()))
        .collect())
}

fn timestamp_cells(col: &ArrayRef) -> Result<Vec<Option<NaiveDateTime>>> {
    match col.data_type() {
        DataType::Utf8 | DataType::LargeUtf8 | DataType::Utf8View => Ok(text_cells(col)?
            .into_iter()
            .map(|s| s.and_then(|s| parse_timestamp(&s)))
            .collect()),
        DataType::Date32 | DataType::Date64 | DataType::Timestamp(_, _) => {
            let millis = cast(col, &DataType::Timestamp(TimeUnit::Millisecond, None))
                .context("casting to Timestamp")?;
            let millis = millis.as_primitive::<TimestampMillisecondType>();
            Ok((0..millis.len())
                .map(|row| {
                    if millis.is_null(row) {
                        None
                    } else {
                        millis.value_as_datetime(row)
                    }
                })
                .collect())
        }
        other => bail!("Expected text, date or timestamp column, got {other:?}"),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use arrow::array::{Date32Array, Float64Array, Int64Array, StringArray};
    use arrow::datatypes::{Field, Schema as ArrowSchema};
    use arrow::record_batch::RecordBatch;
    use parquet::arrow::ArrowWriter;

    use super::*;

    fn load_csv_str(text: &str) -> Result<Dataset> {
        read_csv(text.as_bytes()).and_then(into_dataset)
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_csv_drops_rows_missing_city_or_date() {
        let text = "\
City,Date,PM2.5,AQI
Delhi,2020-01-02,100.5,220
,2020-01-01,10,30
Mumbai,not-a-date,20,40
NA,2020-01-03,1,2
Mumbai,2020-01-01,30.0,80
";
        let ds = load_csv_str(text).unwrap();
        assert_eq!(ds.len(), 2);
        assert!(ds.readings().iter().all(|r| !r.city.is_empty()));
        assert_eq!(ds.readings()[0].city, "Mumbai");
        assert_eq!(ds.readings()[1].city, "Delhi");
        assert_eq!(ds.readings()[1].aqi, Some(220.0));
        assert_eq!(ds.readings()[1].level(Pollutant::Pm25), Some(100.5));
    }

    #[test]
    fn test_csv_keeps_every_pollutant_column() {
        let text = "\
City,Date,PM2.5,PM10,NO2,SO2,O3,CO
  Delhi ,2020-01-01,1,2,3,4,5,
";
        let ds = load_csv_str(text).unwrap();
        let r = &ds.readings()[0];
        assert_eq!(r.city, "Delhi");
        let levels: Vec<Option<f64>> = Pollutant::ALL.iter().map(|&p| r.level(p)).collect();
        assert_eq!(
            levels,
            [Some(1.0), Some(2.0), Some(3.0), Some(4.0), Some(5.0), None]
        );
        assert!(!ds.schema().has_aqi);
    }

    #[test]
    fn test_csv_row_count_delta_matches_missing_cities() {
        let good = "Delhi,2020-01-01,45\nMumbai,2020-01-02,80\nChennai,2020-01-03,60\n";
        let bad = ",2020-01-04,10\n,2020-01-05,20\n";
        let ds = load_csv_str(&format!("City,Date,AQI\n{good}{bad}")).unwrap();
        assert_eq!(ds.len(), 3);
    }

    #[test]
    fn test_csv_prefers_datetime_column() {
        let text = "\
City,Date,Datetime,AQI
Delhi,2020-01-01,2020-01-05 10:00:00,1
Delhi,2020-01-02,,2
";
        let ds = load_csv_str(text).unwrap();
        // The second row has no Datetime, so Date is not consulted.
        assert_eq!(ds.len(), 1);
        assert_eq!(ds.readings()[0].date(), date("2020-01-05"));
    }

    #[test]
    fn test_csv_sorted_with_stable_ties() {
        let text = "\
City,Date,AQI
B,2020-01-02,1
C,2020-01-01,2
A,2020-01-02,3
D,2020-01-01,4
";
        let ds = load_csv_str(text).unwrap();
        let order: Vec<&str> = ds.readings().iter().map(|r| r.city.as_str()).collect();
        assert_eq!(order, ["C", "D", "B", "A"]);
        assert!(ds
            .readings()
            .windows(2)
            .all(|w| w[0].timestamp <= w[1].timestamp));
    }

    #[test]
    fn test_csv_missing_and_bad_numbers_are_null() {
        let text = "\
City,Date,PM10,AQI
Delhi,2020-01-01,abc,
Delhi,2020-01-02,NaN,nan
Delhi,2020-01-03,12
";
        let ds = load_csv_str(text).unwrap();
        assert_eq!(ds.len(), 3);
        assert!(ds.readings().iter().all(|r| r.aqi.is_none()));
        assert_eq!(ds.readings()[2].level(Pollutant::Pm10), Some(12.0));
        assert!(ds.schema().has_aqi);
        assert!(!ds.schema().has_pollutant(Pollutant::Pm25));
    }

    #[test]
    fn test_csv_missing_city_column_is_error() {
        let err = load_csv_str("Town,Date,AQI\nDelhi,2020-01-01,1\n").unwrap_err();
        assert!(err.to_string().contains("City"));
    }

    #[test]
    fn test_csv_without_usable_rows_is_error() {
        assert!(load_csv_str("City,Date,AQI\n").is_err());
        assert!(load_csv_str("City,Date,AQI\n,2020-01-01,5\n").is_err());
    }

    #[test]
    fn test_parse_timestamp_formats() {
        let midnight = date("2020-03-04").and_hms_opt(0, 0, 0);
        assert_eq!(parse_timestamp("2020-03-04"), midnight);
        assert_eq!(parse_timestamp("04-03-2020"), midnight);
        assert_eq!(parse_timestamp("03/04/2020"), midnight);
        assert_eq!(
            parse_timestamp("2020-03-04 13:30:00"),
            date("2020-03-04").and_hms_opt(13, 30, 0)
        );
        assert_eq!(
            parse_timestamp("2020-03-04T13:30:00.250"),
            date("2020-03-04").and_hms_milli_opt(13, 30, 0, 250)
        );
        assert_eq!(parse_timestamp("2020-03-04 13:30:00+05:30"), None);
        assert_eq!(parse_timestamp("yesterday"), None);
        assert_eq!(parse_timestamp("NaT"), None);
    }

    #[test]
    fn test_json_records() {
        let text = r#"[
            {"City": "Delhi", "Date": "2020-01-02", "AQI": 220, "PM2.5": "150.5"},
            {"City": null, "Date": "2020-01-01", "AQI": 10},
            {"City": "Mumbai", "Date": "2020-01-01", "AQI": null}
        ]"#;
        let ds = read_json(text.as_bytes()).and_then(into_dataset).unwrap();
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.readings()[0].city, "Mumbai");
        assert_eq!(ds.readings()[0].aqi, None);
        assert_eq!(ds.readings()[1].level(Pollutant::Pm25), Some(150.5));
        assert!(ds.schema().has_pollutant(Pollutant::Pm25));
    }

    #[test]
    fn test_json_rejects_non_array() {
        assert!(read_json(r#"{"City": "Delhi"}"#.as_bytes()).is_err());
    }

    #[test]
    fn test_parquet_date32_and_int_columns() {
        let schema = Arc::new(ArrowSchema::new(vec![
            Field::new("City", DataType::Utf8, true),
            Field::new("Date", DataType::Date32, true),
            Field::new("AQI", DataType::Int64, true),
            Field::new("O3", DataType::Float64, true),
        ]));
        let epoch = date("1970-01-01");
        let day = |s: &str| (date(s) - epoch).num_days() as i32;
        let batch = RecordBatch::try_new(
            schema.clone(),
            vec![
                Arc::new(StringArray::from(vec![Some("Delhi"), None, Some("Mumbai")])),
                Arc::new(Date32Array::from(vec![
                    Some(day("2020-01-02")),
                    Some(day("2020-01-01")),
                    Some(day("2020-01-01")),
                ])),
                Arc::new(Int64Array::from(vec![Some(220), Some(5), None])),
                Arc::new(Float64Array::from(vec![Some(31.5), None, Some(f64::NAN)])),
            ],
        )
        .unwrap();

        let mut buf = Vec::new();
        let mut writer = ArrowWriter::try_new(&mut buf, schema, None).unwrap();
        writer.write(&batch).unwrap();
        writer.close().unwrap();

        let ds = read_parquet(bytes::Bytes::from(buf))
            .and_then(into_dataset)
            .unwrap();
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.readings()[0].city, "Mumbai");
        assert_eq!(ds.readings()[0].level(Pollutant::O3), None);
        assert_eq!(ds.readings()[1].aqi, Some(220.0));
        assert_eq!(ds.readings()[1].date(), date("2020-01-02"));
        assert!(!ds.schema().has_pollutant(Pollutant::Co));
    }

    #[test]
    fn test_load_file_missing_is_not_found() {
        let err = load_file(Path::new("/definitely/not/here/city_day.csv")).unwrap_err();
        assert!(matches!(err, LoadError::NotFound { .. }));
    }

    #[test]
    fn test_load_file_unsupported_extension() {
        let err = load_file(Path::new("readings.xlsx")).unwrap_err();
        assert!(matches!(err, LoadError::Unsupported { ref extension } if extension == "xlsx"));
    }
}
