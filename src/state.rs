use std::path::Path;

use crate::color::CityColors;
use crate::config::DashboardConfig;
use crate::data::filter::Selection;
use crate::data::loader;
use crate::data::model::Dataset;
use crate::data::summary::{DashboardSummary, summarize};

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// The full UI state, independent of rendering.
pub struct AppState {
    /// Loaded dataset (None until a file loads successfully).
    pub dataset: Option<Dataset>,

    /// Current filter parameters.
    pub selection: Option<Selection>,

    /// Derived values for `selection`, rebuilt on every change.
    pub summary: Option<DashboardSummary>,

    /// One colour per city, shared by all charts.
    pub colors: Option<CityColors>,

    /// Cities preselected after a load.
    pub preferred_cities: Vec<String>,

    /// Load error shown instead of the dashboard.
    pub status_message: Option<String>,
}

impl AppState {
    pub fn new(config: &DashboardConfig) -> Self {
        Self {
            dataset: None,
            selection: None,
            summary: None,
            colors: None,
            preferred_cities: config.default_cities.clone(),
            status_message: None,
        }
    }

    /// Load a file. On failure the previous dataset is discarded too, so no
    /// partial dashboard is left on screen.
    pub fn load(&mut self, path: &Path) {
        match loader::load_file(path) {
            Ok(dataset) => {
                log::info!(
                    "Loaded {} readings for {} cities from {}",
                    dataset.len(),
                    dataset.cities().len(),
                    path.display()
                );
                self.set_dataset(dataset);
            }
            Err(e) => {
                log::error!("Failed to load file: {e}");
                self.dataset = None;
                self.selection = None;
                self.summary = None;
                self.colors = None;
                self.status_message = Some(format!("Error loading data: {e}"));
            }
        }
    }

    /// Ingest a newly loaded dataset, initialise selection and colours.
    pub fn set_dataset(&mut self, dataset: Dataset) {
        self.selection = Selection::default_for(&dataset, &self.preferred_cities);
        self.colors = Some(CityColors::new(dataset.cities()));
        self.dataset = Some(dataset);
        self.status_message = None;
        self.recompute();
    }

    /// Replace the selection, recomputing only when it actually changed.
    pub fn set_selection(&mut self, selection: Selection) {
        if self.selection.as_ref() != Some(&selection) {
            self.selection = Some(selection);
            self.recompute();
        }
    }

    /// Rebuild the summary from scratch for the current selection.
    pub fn recompute(&mut self) {
        self.summary = match (&self.dataset, &self.selection) {
            (Some(ds), Some(sel)) => Some(summarize(ds, sel)),
            _ => None,
        };
    }

    /// Whether a load failed and nothing else should be drawn.
    pub fn load_failed(&self) -> bool {
        self.dataset.is_none() && self.status_message.is_some()
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::data::model::{Pollutant, Reading, Schema};

    fn dataset() -> Dataset {
        let day = |d| {
            NaiveDate::from_ymd_opt(2021, 3, d)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap()
        };
        Dataset::from_readings(
            vec![
                Reading::new("Delhi", day(1), Some(300.0)),
                Reading::new("Chennai", day(2), Some(40.0)),
                Reading::new("Jaipur", day(3), Some(90.0)),
            ],
            Schema::full(),
        )
    }

    #[test]
    fn test_set_dataset_preselects_and_summarizes() {
        let mut state = AppState::new(&DashboardConfig::default());
        state.set_dataset(dataset());

        let sel = state.selection.as_ref().unwrap();
        assert_eq!(sel.cities.len(), 2);
        assert!(!sel.cities.contains("Jaipur"));

        let summary = state.summary.as_ref().unwrap();
        assert_eq!(summary.row_count, 2);
        assert_eq!(summary.extremes.as_ref().unwrap().worst, "Delhi");
    }

    #[test]
    fn test_selection_change_recomputes() {
        let mut state = AppState::new(&DashboardConfig::default());
        state.set_dataset(dataset());

        let mut sel = state.selection.clone().unwrap();
        sel.cities.insert("Jaipur".into());
        sel.pollutant = Pollutant::Co;
        state.set_selection(sel);

        let summary = state.summary.as_ref().unwrap();
        assert_eq!(summary.row_count, 3);
        assert_eq!(summary.pollutant, Pollutant::Co);
        assert_eq!(summary.alerts.len(), 3);
    }

    #[test]
    fn test_failed_load_clears_dashboard() {
        let mut state = AppState::new(&DashboardConfig::default());
        state.set_dataset(dataset());
        state.load(Path::new("/no/such/dir/city_day.csv"));

        assert!(state.load_failed());
        assert!(state.summary.is_none());
        assert!(state.status_message.is_some());
    }
}
