use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{ArrayRef, Float64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use chrono::{Datelike, Duration, NaiveDate};
use parquet::arrow::ArrowWriter;

const POLLUTANTS: [&str; 6] = ["PM2.5", "PM10", "NO2", "SO2", "O3", "CO"];

/// City name and typical level of each pollutant, in `POLLUTANTS` order.
const CITIES: [(&str, [f64; 6]); 8] = [
    ("Delhi", [115.0, 230.0, 50.0, 15.0, 38.0, 1.6]),
    ("Lucknow", [105.0, 190.0, 35.0, 9.0, 33.0, 1.9]),
    ("Kolkata", [70.0, 130.0, 38.0, 9.0, 30.0, 0.8]),
    ("Ahmedabad", [68.0, 120.0, 60.0, 55.0, 40.0, 14.0]),
    ("Mumbai", [48.0, 105.0, 30.0, 13.0, 33.0, 0.7]),
    ("Hyderabad", [45.0, 95.0, 28.0, 8.0, 34.0, 0.6]),
    ("Chennai", [40.0, 60.0, 17.0, 7.0, 33.0, 1.1]),
    ("Bengaluru", [36.0, 88.0, 27.0, 6.0, 34.0, 1.3]),
];

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }

    /// `Some(value)` except for a `missing` fraction of draws.
    fn maybe(&mut self, value: f64, missing: f64) -> Option<f64> {
        (self.next_f64() >= missing).then_some(value)
    }
}

/// Piecewise-linear sub-index over `(conc_lo, conc_hi, index_lo, index_hi)`.
fn sub_index(conc: f64, breakpoints: &[(f64, f64, f64, f64)]) -> f64 {
    for &(c_lo, c_hi, i_lo, i_hi) in breakpoints {
        if conc <= c_hi {
            return i_lo + (conc - c_lo).max(0.0) * (i_hi - i_lo) / (c_hi - c_lo);
        }
    }
    500.0
}

/// AQI as the worse of the PM2.5 and PM10 sub-indices (CPCB breakpoints).
fn aqi(pm25: f64, pm10: f64) -> f64 {
    let pm25_index = sub_index(
        pm25,
        &[
            (0.0, 30.0, 0.0, 50.0),
            (30.0, 60.0, 50.0, 100.0),
            (60.0, 90.0, 100.0, 200.0),
            (90.0, 120.0, 200.0, 300.0),
            (120.0, 250.0, 300.0, 400.0),
            (250.0, 380.0, 400.0, 500.0),
        ],
    );
    let pm10_index = sub_index(
        pm10,
        &[
            (0.0, 50.0, 0.0, 50.0),
            (50.0, 100.0, 50.0, 100.0),
            (100.0, 250.0, 100.0, 200.0),
            (250.0, 350.0, 200.0, 300.0),
            (350.0, 430.0, 300.0, 400.0),
            (430.0, 510.0, 400.0, 500.0),
        ],
    );
    pm25_index.max(pm10_index).round()
}

/// Winter peak, monsoon trough.
fn seasonal_factor(day: NaiveDate) -> f64 {
    let phase = 2.0 * std::f64::consts::PI * (day.ordinal0() as f64 - 10.0) / 365.0;
    1.0 + 0.55 * phase.cos()
}

struct Row {
    city: Option<String>,
    date: String,
    levels: [Option<f64>; 6],
    aqi: Option<f64>,
}

fn fmt_cell(v: Option<f64>) -> String {
    v.map(|x| format!("{x:.2}")).unwrap_or_default()
}

fn main() -> Result<()> {
    let mut rng = SimpleRng::new(42);

    let start = NaiveDate::from_ymd_opt(2019, 1, 1).context("start date")?;
    let n_days = 731;

    let mut rows = Vec::new();
    for offset in 0..n_days {
        let day = start + Duration::days(offset);
        let season = seasonal_factor(day);
        for (city, typical) in &CITIES {
            let mut levels = [None; 6];
            for (slot, &base) in levels.iter_mut().zip(typical) {
                let value = rng.gauss(base * season, base * 0.2).max(0.0);
                *slot = rng.maybe(value, 0.03);
            }
            let index = match (levels[0], levels[1]) {
                (Some(pm25), Some(pm10)) => rng.maybe(aqi(pm25, pm10), 0.02),
                _ => None,
            };
            rows.push(Row {
                city: Some(city.to_string()),
                date: day.format("%Y-%m-%d").to_string(),
                levels,
                aqi: index,
            });
        }
    }

    // A few unusable rows the loader is expected to drop.
    for date in ["2019-06-01", "2020-02-14", "2020-09-30"] {
        rows.push(Row {
            city: None,
            date: date.to_string(),
            levels: [Some(10.0); 6],
            aqi: Some(42.0),
        });
    }
    rows.push(Row {
        city: Some("Delhi".into()),
        date: "not a date".into(),
        levels: [None; 6],
        aqi: Some(180.0),
    });

    // Write CSV
    let csv_path = "city_day.csv";
    let mut writer = csv::Writer::from_path(csv_path).context("creating CSV output")?;
    let mut header = vec!["City", "Date"];
    header.extend(POLLUTANTS);
    header.push("AQI");
    writer.write_record(&header).context("writing CSV header")?;
    for row in &rows {
        let mut record = vec![row.city.clone().unwrap_or_default(), row.date.clone()];
        record.extend(row.levels.iter().map(|&v| fmt_cell(v)));
        record.push(fmt_cell(row.aqi));
        writer.write_record(&record).context("writing CSV row")?;
    }
    writer.flush().context("flushing CSV output")?;

    // Build Arrow arrays
    let city_array = StringArray::from(rows.iter().map(|r| r.city.as_deref()).collect::<Vec<_>>());
    let date_array = StringArray::from(rows.iter().map(|r| r.date.as_str()).collect::<Vec<_>>());
    let mut fields = vec![
        Field::new("City", DataType::Utf8, true),
        Field::new("Date", DataType::Utf8, false),
    ];
    let mut columns: Vec<ArrayRef> = vec![Arc::new(city_array), Arc::new(date_array)];
    for (i, name) in POLLUTANTS.iter().enumerate() {
        fields.push(Field::new(*name, DataType::Float64, true));
        columns.push(Arc::new(Float64Array::from(
            rows.iter().map(|r| r.levels[i]).collect::<Vec<_>>(),
        )));
    }
    fields.push(Field::new("AQI", DataType::Float64, true));
    columns.push(Arc::new(Float64Array::from(
        rows.iter().map(|r| r.aqi).collect::<Vec<_>>(),
    )));

    let schema = Arc::new(Schema::new(fields));
    let batch = RecordBatch::try_new(schema.clone(), columns).context("building record batch")?;

    // Write Parquet
    let parquet_path = "city_day.parquet";
    let file = std::fs::File::create(parquet_path).context("creating parquet output")?;
    let mut writer = ArrowWriter::try_new(file, schema, None).context("creating parquet writer")?;
    writer.write(&batch).context("writing parquet batch")?;
    writer.close().context("closing parquet writer")?;

    println!(
        "Wrote {} rows for {} cities over {n_days} days to {csv_path} and {parquet_path}",
        rows.len(),
        CITIES.len()
    );
    Ok(())
}
