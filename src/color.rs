use std::collections::{BTreeMap, BTreeSet};

use eframe::egui::Color32;
use palette::{Hsl, IntoColor, Mix, Srgb};

use crate::data::alert::AlertLevel;

// ---------------------------------------------------------------------------
// Color palette generator
// ---------------------------------------------------------------------------

fn to_color32(rgb: Srgb) -> Color32 {
    Color32::from_rgb(
        (rgb.red * 255.0) as u8,
        (rgb.green * 255.0) as u8,
        (rgb.blue * 255.0) as u8,
    )
}

/// Generates `n` visually distinct colours using evenly spaced hues.
pub fn generate_palette(n: usize) -> Vec<Color32> {
    (0..n)
        .map(|i| {
            let hue = (i as f32 / n as f32) * 360.0;
            to_color32(Hsl::new(hue, 0.70, 0.50).into_color())
        })
        .collect()
}

// ---------------------------------------------------------------------------
// City colours: one stable colour per city across all charts
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct CityColors {
    mapping: BTreeMap<String, Color32>,
    default_color: Color32,
}

impl CityColors {
    /// Assign colours to every city in the dataset (name order).
    pub fn new(cities: &BTreeSet<String>) -> Self {
        let mapping = cities
            .iter()
            .cloned()
            .zip(generate_palette(cities.len()))
            .collect();
        CityColors {
            mapping,
            default_color: Color32::GRAY,
        }
    }

    pub fn color_for(&self, city: &str) -> Color32 {
        self.mapping
            .get(city)
            .copied()
            .unwrap_or(self.default_color)
    }
}

// ---------------------------------------------------------------------------
// AQI colours
// ---------------------------------------------------------------------------

/// Banner colour for an alert band.
pub fn alert_color(level: AlertLevel) -> Color32 {
    match level {
        AlertLevel::Good => Color32::from_rgb(46, 160, 67),
        AlertLevel::Moderate => Color32::from_rgb(212, 167, 44),
        AlertLevel::Poor => Color32::from_rgb(230, 120, 30),
        AlertLevel::Severe => Color32::from_rgb(207, 34, 46),
    }
}

/// Green → yellow → red ramp for a value inside `[min, max]`.
pub fn aqi_ramp(value: f64, min: f64, max: f64) -> Color32 {
    let t = if max > min {
        ((value - min) / (max - min)).clamp(0.0, 1.0) as f32
    } else {
        0.5
    };
    let green: Hsl = Srgb::new(0.10, 0.60, 0.25).into_color();
    let yellow: Hsl = Srgb::new(0.95, 0.85, 0.30).into_color();
    let red: Hsl = Srgb::new(0.80, 0.10, 0.15).into_color();
    let hsl = if t < 0.5 {
        green.mix(yellow, t * 2.0)
    } else {
        yellow.mix(red, (t - 0.5) * 2.0)
    };
    to_color32(hsl.into_color())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_palette_size() {
        assert!(generate_palette(0).is_empty());
        assert_eq!(generate_palette(5).len(), 5);
    }

    #[test]
    fn test_city_colors_are_distinct_and_stable() {
        let cities: BTreeSet<String> = ["Delhi", "Mumbai", "Chennai"]
            .iter()
            .map(|c| c.to_string())
            .collect();
        let colors = CityColors::new(&cities);
        assert_ne!(colors.color_for("Delhi"), colors.color_for("Mumbai"));
        assert_eq!(colors.color_for("Delhi"), CityColors::new(&cities).color_for("Delhi"));
        assert_eq!(colors.color_for("Atlantis"), Color32::GRAY);
    }

    #[test]
    fn test_aqi_ramp_ends() {
        let low = aqi_ramp(0.0, 0.0, 100.0);
        let high = aqi_ramp(100.0, 0.0, 100.0);
        assert!(low.g() > low.r());
        assert!(high.r() > high.g());
    }
}
