use std::collections::BTreeSet;
use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};

/// Header name of the air-quality index column.
pub const AQI_COLUMN: &str = "AQI";
/// Header name of the city column.
pub const CITY_COLUMN: &str = "City";

// ---------------------------------------------------------------------------
// Pollutant – the six measured fields
// ---------------------------------------------------------------------------

/// One of the six pollutant measurements carried per reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Pollutant {
    Pm25,
    Pm10,
    No2,
    So2,
    O3,
    Co,
}

impl Pollutant {
    /// All pollutants in picker order.
    pub const ALL: [Pollutant; 6] = [
        Pollutant::Pm25,
        Pollutant::Pm10,
        Pollutant::No2,
        Pollutant::So2,
        Pollutant::O3,
        Pollutant::Co,
    ];

    /// Column header used in the source files.
    pub fn column(self) -> &'static str {
        match self {
            Pollutant::Pm25 => "PM2.5",
            Pollutant::Pm10 => "PM10",
            Pollutant::No2 => "NO2",
            Pollutant::So2 => "SO2",
            Pollutant::O3 => "O3",
            Pollutant::Co => "CO",
        }
    }

    /// Reverse lookup from a header name.
    pub fn from_column(name: &str) -> Option<Pollutant> {
        Pollutant::ALL.into_iter().find(|p| p.column() == name)
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Pollutant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

// ---------------------------------------------------------------------------
// Reading – one row of the dataset
// ---------------------------------------------------------------------------

/// A single cleaned row. City and timestamp are always present; every
/// measurement may be missing.
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    pub city: String,
    pub timestamp: NaiveDateTime,
    pub aqi: Option<f64>,
    levels: [Option<f64>; 6],
}

impl Reading {
    pub fn new(city: impl Into<String>, timestamp: NaiveDateTime, aqi: Option<f64>) -> Self {
        Reading {
            city: city.into(),
            timestamp,
            aqi,
            levels: [None; 6],
        }
    }

    /// Builder-style setter for one pollutant value.
    pub fn with_level(mut self, pollutant: Pollutant, value: Option<f64>) -> Self {
        self.set_level(pollutant, value);
        self
    }

    fn set_level(&mut self, pollutant: Pollutant, value: Option<f64>) {
        self.levels[pollutant.index()] = value;
    }

    pub fn level(&self, pollutant: Pollutant) -> Option<f64> {
        self.levels[pollutant.index()]
    }

    /// Calendar date of the reading, used for interval membership.
    pub fn date(&self) -> NaiveDate {
        self.timestamp.date()
    }
}

// ---------------------------------------------------------------------------
// Schema – which optional columns the source carried
// ---------------------------------------------------------------------------

/// Optional columns present in the source header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schema {
    pub has_aqi: bool,
    pub pollutants: BTreeSet<Pollutant>,
}

impl Schema {
    /// Build from the header names of a source.
    pub fn from_columns<'a>(columns: impl IntoIterator<Item = &'a str>) -> Self {
        let mut schema = Schema::default();
        for col in columns {
            if col == AQI_COLUMN {
                schema.has_aqi = true;
            } else if let Some(p) = Pollutant::from_column(col) {
                schema.pollutants.insert(p);
            }
        }
        schema
    }

    /// Schema with every optional column present.
    #[cfg(test)]
    pub fn full() -> Self {
        Schema {
            has_aqi: true,
            pollutants: Pollutant::ALL.into_iter().collect(),
        }
    }

    pub fn has_pollutant(&self, pollutant: Pollutant) -> bool {
        self.pollutants.contains(&pollutant)
    }
}

// ---------------------------------------------------------------------------
// Dataset – the complete cleaned, time-ordered table
// ---------------------------------------------------------------------------

/// The loaded dataset. Read-only after construction.
#[derive(Debug, Clone)]
pub struct Dataset {
    readings: Vec<Reading>,
    schema: Schema,
    /// Sorted set of distinct city names.
    cities: BTreeSet<String>,
}

impl Dataset {
    /// Order readings by timestamp (stable, so ties keep input order) and
    /// build the city index.
    pub fn from_readings(mut readings: Vec<Reading>, schema: Schema) -> Self {
        readings.sort_by_key(|r| r.timestamp);
        let cities = readings.iter().map(|r| r.city.clone()).collect();
        Dataset {
            readings,
            schema,
            cities,
        }
    }

    pub fn readings(&self) -> &[Reading] {
        &self.readings
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn cities(&self) -> &BTreeSet<String> {
        &self.cities
    }

    /// First and last calendar date covered, if any rows exist.
    pub fn date_span(&self) -> Option<(NaiveDate, NaiveDate)> {
        let first = self.readings.first()?;
        let last = self.readings.last()?;
        Some((first.date(), last.date()))
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }
}
