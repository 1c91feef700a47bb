use super::aggregate::{
    self, CityAggregate, Distribution, ExtremeCities, SeriesPoint, Unavailable,
};
use super::alert::{self, CityAlert};
use super::filter::{Selection, filter};
use super::model::{Dataset, Pollutant};

/// Everything the dashboard draws for one selection. Each element fails on
/// its own; an `Err` in one field leaves the others intact.
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardSummary {
    pub pollutant: Pollutant,
    /// Rows in the filtered view.
    pub row_count: usize,
    pub mean_aqi: Result<f64, Unavailable>,
    pub extremes: Result<ExtremeCities, Unavailable>,
    pub city_means: Result<CityAggregate, Unavailable>,
    pub series: Result<Vec<SeriesPoint>, Unavailable>,
    pub distribution: Result<Vec<Distribution>, Unavailable>,
    pub alerts: Vec<CityAlert>,
}

/// One full recomputation pass: filter, aggregate, classify.
pub fn summarize(dataset: &Dataset, selection: &Selection) -> DashboardSummary {
    let view = filter(dataset, selection);
    log::debug!(
        "Selection {:?} {}..={} {} matched {} rows",
        selection.cities,
        selection.start,
        selection.end,
        selection.pollutant,
        view.len()
    );

    DashboardSummary {
        pollutant: selection.pollutant,
        row_count: view.len(),
        mean_aqi: aggregate::overall_mean(&view),
        extremes: aggregate::extreme_city(&view),
        city_means: aggregate::city_comparison(&view),
        series: aggregate::pollutant_series(&view, selection.pollutant),
        distribution: aggregate::pollutant_distribution(&view, selection.pollutant),
        alerts: alert::latest_alerts(&view, &selection.cities),
    }
}
