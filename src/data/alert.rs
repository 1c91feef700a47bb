//! AQI alert bands for the latest reading of each selected city.

use std::fmt;

use super::filter::FilteredView;

/// Severity bands, in ascending order of severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AlertLevel {
    Good,
    Moderate,
    Poor,
    Severe,
}

impl AlertLevel {
    pub fn label(self) -> &'static str {
        match self {
            AlertLevel::Good => "Good",
            AlertLevel::Moderate => "Moderate",
            AlertLevel::Poor => "Poor",
            AlertLevel::Severe => "Severe",
        }
    }
}

impl fmt::Display for AlertLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Map a single AQI value to its band. Upper bounds are inclusive:
/// `<= 50` Good, `<= 100` Moderate, `<= 200` Poor, above that Severe.
pub fn classify(aqi: f64) -> AlertLevel {
    if aqi <= 50.0 {
        AlertLevel::Good
    } else if aqi <= 100.0 {
        AlertLevel::Moderate
    } else if aqi <= 200.0 {
        AlertLevel::Poor
    } else {
        AlertLevel::Severe
    }
}

/// Alert state for one city.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AlertStatus {
    Level { level: AlertLevel, aqi: f64 },
    /// No row for the city in view, or its latest row has no AQI.
    NoData,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CityAlert {
    pub city: String,
    pub status: AlertStatus,
}

/// Classify the latest row (by dataset order) of one city in the view.
pub fn latest_alert(view: &FilteredView<'_>, city: &str) -> AlertStatus {
    view.rows()
        .rev()
        .find(|r| r.city == city)
        .and_then(|r| r.aqi)
        .map_or(AlertStatus::NoData, |aqi| AlertStatus::Level {
            level: classify(aqi),
            aqi,
        })
}

/// One alert per city, in the order given.
pub fn latest_alerts<'c>(
    view: &FilteredView<'_>,
    cities: impl IntoIterator<Item = &'c String>,
) -> Vec<CityAlert> {
    cities
        .into_iter()
        .map(|city| CityAlert {
            city: city.clone(),
            status: latest_alert(view, city),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, NaiveDateTime};

    use super::*;
    use crate::data::filter::{Selection, filter};
    use crate::data::model::{Dataset, Pollutant, Reading, Schema};

    fn ts(s: &str) -> NaiveDateTime {
        NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_classify_boundaries() {
        assert_eq!(classify(0.0), AlertLevel::Good);
        assert_eq!(classify(50.0), AlertLevel::Good);
        assert_eq!(classify(50.1), AlertLevel::Moderate);
        assert_eq!(classify(100.0), AlertLevel::Moderate);
        assert_eq!(classify(100.1), AlertLevel::Poor);
        assert_eq!(classify(200.0), AlertLevel::Poor);
        assert_eq!(classify(200.1), AlertLevel::Severe);
        assert_eq!(classify(999.0), AlertLevel::Severe);
    }

    #[test]
    fn test_levels_are_ordered() {
        assert!(AlertLevel::Good < AlertLevel::Moderate);
        assert!(AlertLevel::Moderate < AlertLevel::Poor);
        assert!(AlertLevel::Poor < AlertLevel::Severe);
    }

    #[test]
    fn test_latest_alerts_per_city() {
        let ds = Dataset::from_readings(
            vec![
                Reading::new("Delhi", ts("2020-01-01"), Some(45.0)),
                Reading::new("Delhi", ts("2020-01-02"), Some(220.0)),
                Reading::new("Mumbai", ts("2020-01-01"), Some(80.0)),
                Reading::new("Pune", ts("2020-01-01"), Some(30.0)),
                Reading::new("Pune", ts("2020-01-02"), None),
            ],
            Schema::full(),
        );
        let cities: Vec<String> = ["Delhi", "Mumbai", "Pune", "Kolkata"]
            .iter()
            .map(|c| c.to_string())
            .collect();
        let sel = Selection {
            cities: cities.iter().cloned().collect(),
            start: ts("2020-01-01").date(),
            end: ts("2020-01-02").date(),
            pollutant: Pollutant::Pm25,
        };
        let view = filter(&ds, &sel);
        let alerts = latest_alerts(&view, &cities);

        assert_eq!(
            alerts[0].status,
            AlertStatus::Level {
                level: AlertLevel::Severe,
                aqi: 220.0
            }
        );
        assert_eq!(
            alerts[1].status,
            AlertStatus::Level {
                level: AlertLevel::Moderate,
                aqi: 80.0
            }
        );
        // Latest Pune row has no AQI; earlier values are not used.
        assert_eq!(alerts[2].status, AlertStatus::NoData);
        assert_eq!(alerts[3].city, "Kolkata");
        assert_eq!(alerts[3].status, AlertStatus::NoData);
    }
}
