use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use thiserror::Error;

use super::filter::FilteredView;
use super::model::{AQI_COLUMN, Pollutant};

// ---------------------------------------------------------------------------
// Unavailable: a single KPI or chart could not be computed
// ---------------------------------------------------------------------------

/// Why a derived value is missing. Local to one display element.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Unavailable {
    #[error("no rows match the current selection")]
    EmptyView,
    #[error("{0} data not found in dataset")]
    MissingField(&'static str),
    #[error("no {0} values in the current selection")]
    NoValues(&'static str),
}

/// Field present in the schema and view non-empty, in that order.
fn require(view: &FilteredView<'_>, present: bool, field: &'static str) -> Result<(), Unavailable> {
    if !present {
        Err(Unavailable::MissingField(field))
    } else if view.is_empty() {
        Err(Unavailable::EmptyView)
    } else {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Means
// ---------------------------------------------------------------------------

/// Running sum/count; nulls never reach it.
#[derive(Debug, Clone, Copy, Default)]
struct Mean {
    sum: f64,
    count: usize,
}

impl Mean {
    fn push(&mut self, value: f64) {
        self.sum += value;
        self.count += 1;
    }

    fn value(self) -> Option<f64> {
        (self.count > 0).then(|| self.sum / self.count as f64)
    }
}

/// Arithmetic mean of the AQI over every row in view, ignoring nulls.
pub fn overall_mean(view: &FilteredView<'_>) -> Result<f64, Unavailable> {
    require(view, view.schema().has_aqi, AQI_COLUMN)?;
    let mut mean = Mean::default();
    view.rows().filter_map(|r| r.aqi).for_each(|v| mean.push(v));
    mean.value().ok_or(Unavailable::NoValues(AQI_COLUMN))
}

/// Per-city AQI means, ordered by each city's first row with a non-null
/// AQI. Cities with no AQI values are absent.
fn city_means<'a>(view: &FilteredView<'a>) -> Vec<(&'a str, f64)> {
    let mut order: Vec<(&'a str, Mean)> = Vec::new();
    let mut slot: BTreeMap<&'a str, usize> = BTreeMap::new();

    for reading in view.rows() {
        let Some(aqi) = reading.aqi else {
            continue;
        };
        let idx = *slot.entry(reading.city.as_str()).or_insert_with(|| {
            order.push((reading.city.as_str(), Mean::default()));
            order.len() - 1
        });
        order[idx].1.push(aqi);
    }

    order
        .into_iter()
        .filter_map(|(city, mean)| mean.value().map(|m| (city, m)))
        .collect()
}

/// Cities with the highest and lowest mean AQI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtremeCities {
    pub worst: String,
    pub best: String,
}

/// Worst (max mean) and best (min mean) city. Ties go to the city whose
/// first non-null AQI reading comes earliest in the view; rows with a null
/// AQI do not count towards that order.
pub fn extreme_city(view: &FilteredView<'_>) -> Result<ExtremeCities, Unavailable> {
    require(view, view.schema().has_aqi, AQI_COLUMN)?;
    let means = city_means(view);
    let (first, rest) = means
        .split_first()
        .ok_or(Unavailable::NoValues(AQI_COLUMN))?;

    let mut worst = *first;
    let mut best = *first;
    for &(city, mean) in rest {
        if mean > worst.1 {
            worst = (city, mean);
        }
        if mean < best.1 {
            best = (city, mean);
        }
    }

    Ok(ExtremeCities {
        worst: worst.0.to_string(),
        best: best.0.to_string(),
    })
}

/// Mean AQI per city, keyed (and iterated) by city name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CityAggregate {
    means: BTreeMap<String, f64>,
}

impl CityAggregate {
    #[cfg(test)]
    pub fn get(&self, city: &str) -> Option<f64> {
        self.means.get(city).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.means.iter().map(|(c, m)| (c.as_str(), *m))
    }

    pub fn len(&self) -> usize {
        self.means.len()
    }

    pub fn is_empty(&self) -> bool {
        self.means.is_empty()
    }
}

/// Full per-city mapping; same computation as [`extreme_city`].
pub fn per_city_means(view: &FilteredView<'_>) -> CityAggregate {
    CityAggregate {
        means: city_means(view)
            .into_iter()
            .map(|(city, mean)| (city.to_string(), mean))
            .collect(),
    }
}

/// [`per_city_means`] for the comparison chart, with the reason when there
/// is nothing to draw.
pub fn city_comparison(view: &FilteredView<'_>) -> Result<CityAggregate, Unavailable> {
    require(view, view.schema().has_aqi, AQI_COLUMN)?;
    let means = per_city_means(view);
    if means.is_empty() {
        Err(Unavailable::NoValues(AQI_COLUMN))
    } else {
        Ok(means)
    }
}

// ---------------------------------------------------------------------------
// Pollutant tables for the trend and distribution charts
// ---------------------------------------------------------------------------

/// One point of the pollutant trend table.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesPoint {
    pub timestamp: NaiveDateTime,
    pub city: String,
    pub value: f64,
}

/// `(timestamp, city, value)` rows with a non-null pollutant value, in
/// view order.
pub fn pollutant_series(
    view: &FilteredView<'_>,
    pollutant: Pollutant,
) -> Result<Vec<SeriesPoint>, Unavailable> {
    require(view, view.schema().has_pollutant(pollutant), pollutant.column())?;
    let points: Vec<SeriesPoint> = view
        .rows()
        .filter_map(|r| {
            r.level(pollutant).map(|value| SeriesPoint {
                timestamp: r.timestamp,
                city: r.city.clone(),
                value,
            })
        })
        .collect();
    if points.is_empty() {
        return Err(Unavailable::NoValues(pollutant.column()));
    }
    Ok(points)
}

/// Box-plot summary of one city's pollutant values.
#[derive(Debug, Clone, PartialEq)]
pub struct Distribution {
    pub city: String,
    pub count: usize,
    pub lower_whisker: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub upper_whisker: f64,
    /// Values beyond 1.5 IQR of the box.
    pub outliers: Vec<f64>,
}

impl Distribution {
    /// Returns `None` for an empty slice.
    fn from_values(city: &str, mut values: Vec<f64>) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        values.sort_by(f64::total_cmp);

        let q1 = quantile(&values, 0.25);
        let median = quantile(&values, 0.5);
        let q3 = quantile(&values, 0.75);
        let fence = 1.5 * (q3 - q1);
        let (lo_fence, hi_fence) = (q1 - fence, q3 + fence);

        let within = |v: &f64| (lo_fence..=hi_fence).contains(v);
        let lower_whisker = values.iter().copied().find(|v| within(v)).unwrap_or(q1);
        let upper_whisker = values.iter().copied().rev().find(|v| within(v)).unwrap_or(q3);
        let outliers = values.iter().copied().filter(|v| !within(v)).collect();

        Some(Distribution {
            city: city.to_string(),
            count: values.len(),
            lower_whisker,
            q1,
            median,
            q3,
            upper_whisker,
            outliers,
        })
    }
}

/// Linear-interpolated quantile of sorted, non-empty data.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

/// Per-city distribution of a pollutant, ordered by city name.
pub fn pollutant_distribution(
    view: &FilteredView<'_>,
    pollutant: Pollutant,
) -> Result<Vec<Distribution>, Unavailable> {
    require(view, view.schema().has_pollutant(pollutant), pollutant.column())?;
    let mut by_city: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    for reading in view.rows() {
        if let Some(v) = reading.level(pollutant) {
            by_city.entry(reading.city.as_str()).or_default().push(v);
        }
    }
    let boxes: Vec<Distribution> = by_city
        .into_iter()
        .filter_map(|(city, values)| Distribution::from_values(city, values))
        .collect();
    if boxes.is_empty() {
        return Err(Unavailable::NoValues(pollutant.column()));
    }
    Ok(boxes)
}
