use std::collections::BTreeSet;

use chrono::NaiveDate;

use super::model::{Dataset, Pollutant, Reading, Schema};

// ---------------------------------------------------------------------------
// Selection: the user-chosen filter parameters
// ---------------------------------------------------------------------------

/// Cities, inclusive date interval and pollutant chosen by the user.
///
/// An empty city set selects nothing, and so does `start > end`; neither is
/// reordered or widened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub cities: BTreeSet<String>,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub pollutant: Pollutant,
}

impl Selection {
    /// Initial selection for a freshly loaded dataset: the preferred cities
    /// that actually occur, the full date span and PM2.5.
    pub fn default_for(dataset: &Dataset, preferred_cities: &[String]) -> Option<Self> {
        let (start, end) = dataset.date_span()?;
        let cities = preferred_cities
            .iter()
            .filter(|c| dataset.cities().contains(*c))
            .cloned()
            .collect();
        Some(Selection {
            cities,
            start,
            end,
            pollutant: Pollutant::Pm25,
        })
    }

    /// Row membership: city in the set and calendar date within bounds.
    pub fn matches(&self, reading: &Reading) -> bool {
        let date = reading.date();
        self.cities.contains(&reading.city) && self.start <= date && date <= self.end
    }
}

// ---------------------------------------------------------------------------
// FilteredView: rows of a dataset passing a selection
// ---------------------------------------------------------------------------

/// Borrowed subset of a [`Dataset`], kept in dataset (timestamp) order.
#[derive(Debug, Clone)]
pub struct FilteredView<'a> {
    dataset: &'a Dataset,
    indices: Vec<usize>,
}

impl<'a> FilteredView<'a> {
    /// View over every row of the dataset.
    pub fn all(dataset: &'a Dataset) -> Self {
        FilteredView {
            dataset,
            indices: (0..dataset.len()).collect(),
        }
    }

    /// Apply a selection to this view's rows, producing a narrower view.
    pub fn filter(&self, selection: &Selection) -> FilteredView<'a> {
        let readings = self.dataset.readings();
        let indices = self
            .indices
            .iter()
            .copied()
            .filter(|&i| selection.matches(&readings[i]))
            .collect();
        FilteredView {
            dataset: self.dataset,
            indices,
        }
    }

    /// Rows in view order.
    pub fn rows(&self) -> impl DoubleEndedIterator<Item = &'a Reading> + '_ {
        let readings = self.dataset.readings();
        self.indices.iter().map(move |&i| &readings[i])
    }

    pub fn schema(&self) -> &'a Schema {
        self.dataset.schema()
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

impl PartialEq for FilteredView<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.dataset, other.dataset) && self.indices == other.indices
    }
}

/// Rows of `dataset` matching `selection`. Pure: the result depends only on
/// the two arguments.
pub fn filter<'a>(dataset: &'a Dataset, selection: &Selection) -> FilteredView<'a> {
    FilteredView::all(dataset).filter(selection)
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDateTime;

    use super::*;

    fn ts(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M").unwrap()
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn sample() -> Dataset {
        Dataset::from_readings(
            vec![
                Reading::new("Delhi", ts("2020-01-01 00:00"), Some(45.0)),
                Reading::new("Mumbai", ts("2020-01-01 00:00"), Some(80.0)),
                Reading::new("Delhi", ts("2020-01-02 00:00"), Some(220.0)),
                Reading::new("Chennai", ts("2020-01-03 18:30"), Some(60.0)),
                Reading::new("Delhi", ts("2020-01-04 00:00"), None),
            ],
            Schema::full(),
        )
    }

    fn selection(cities: &[&str], start: &str, end: &str) -> Selection {
        Selection {
            cities: cities.iter().map(|c| c.to_string()).collect(),
            start: date(start),
            end: date(end),
            pollutant: Pollutant::Pm25,
        }
    }

    #[test]
    fn test_filter_by_city_and_interval() {
        let ds = sample();
        let view = filter(&ds, &selection(&["Delhi"], "2020-01-02", "2020-01-04"));
        let aqi: Vec<Option<f64>> = view.rows().map(|r| r.aqi).collect();
        assert_eq!(aqi, [Some(220.0), None]);
    }

    #[test]
    fn test_filter_bounds_are_inclusive_whole_days() {
        let ds = sample();
        let view = filter(&ds, &selection(&["Chennai"], "2020-01-03", "2020-01-03"));
        assert_eq!(view.len(), 1);
    }

    #[test]
    fn test_empty_city_set_yields_empty_view() {
        let ds = sample();
        let view = filter(&ds, &selection(&[], "2020-01-01", "2020-01-04"));
        assert!(view.is_empty());
    }

    #[test]
    fn test_reversed_interval_yields_empty_view() {
        let ds = sample();
        let view = filter(&ds, &selection(&["Delhi", "Mumbai"], "2020-01-04", "2020-01-01"));
        assert!(view.is_empty());
    }

    #[test]
    fn test_unknown_city_yields_empty_view() {
        let ds = sample();
        assert!(filter(&ds, &selection(&["Kolkata"], "2020-01-01", "2020-01-04")).is_empty());
    }

    #[test]
    fn test_filter_is_idempotent() {
        let ds = sample();
        let sel = selection(&["Delhi", "Chennai"], "2020-01-02", "2020-01-04");
        let once = filter(&ds, &sel);
        let twice = once.filter(&sel);
        assert_eq!(once, twice);
        assert_eq!(filter(&ds, &sel), once);
    }

    #[test]
    fn test_filter_preserves_dataset_order() {
        let ds = sample();
        let cities = ["Delhi", "Mumbai", "Chennai"];
        let view = filter(&ds, &selection(&cities, "2020-01-01", "2020-01-04"));
        assert_eq!(view.indices, [0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_default_selection_keeps_only_known_cities() {
        let ds = sample();
        let preferred: Vec<String> = ["Delhi", "Kolkata", "Chennai"]
            .iter()
            .map(|c| c.to_string())
            .collect();
        let sel = Selection::default_for(&ds, &preferred).unwrap();
        assert_eq!(sel.cities.len(), 2);
        assert!(sel.cities.contains("Chennai"));
        assert_eq!(sel.start, date("2020-01-01"));
        assert_eq!(sel.end, date("2020-01-04"));
        assert_eq!(sel.pollutant, Pollutant::Pm25);
    }
}
