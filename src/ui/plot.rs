use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDateTime};
use eframe::egui::{Color32, RichText, Stroke, Ui};
use egui_plot::{
    Bar, BarChart, BoxElem, BoxPlot, BoxSpread, Legend, Line, Plot, PlotPoints, Points,
};

use crate::color::{CityColors, aqi_ramp};
use crate::data::aggregate::Unavailable;
use crate::data::summary::DashboardSummary;

const PLOT_HEIGHT: f32 = 300.0;
const SECONDS_PER_DAY: f64 = 86_400.0;

fn placeholder(ui: &mut Ui, reason: &Unavailable) {
    ui.label(RichText::new(format!("Chart unavailable: {reason}")).weak());
}

fn city_color(colors: Option<&CityColors>, city: &str) -> Color32 {
    colors.map_or(Color32::LIGHT_BLUE, |cm| cm.color_for(city))
}

// -- Axis helpers --

/// Plot x coordinate for a timestamp: fractional days since the Unix epoch.
fn to_plot_x(ts: NaiveDateTime) -> f64 {
    ts.and_utc().timestamp() as f64 / SECONDS_PER_DAY
}

fn format_plot_x(x: f64) -> String {
    DateTime::from_timestamp((x * SECONDS_PER_DAY).round() as i64, 0)
        .map(|dt| dt.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}

/// Label for a category axis where category `i` sits at `x == i`.
fn category_label(names: &[String], x: f64) -> String {
    let idx = x.round();
    if (x - idx).abs() > 1e-6 || idx < 0.0 {
        return String::new();
    }
    names.get(idx as usize).cloned().unwrap_or_default()
}

// ---------------------------------------------------------------------------
// Pollutant trend (line chart)
// ---------------------------------------------------------------------------

/// Pollutant level over time, one line per city.
pub fn trend_plot(ui: &mut Ui, summary: &DashboardSummary, colors: Option<&CityColors>) {
    ui.heading(format!("{} Levels Over Time", summary.pollutant));
    let points = match &summary.series {
        Ok(points) => points,
        Err(reason) => return placeholder(ui, reason),
    };

    let mut by_city: BTreeMap<&str, Vec<[f64; 2]>> = BTreeMap::new();
    for p in points {
        by_city
            .entry(p.city.as_str())
            .or_default()
            .push([to_plot_x(p.timestamp), p.value]);
    }

    Plot::new("trend_plot")
        .legend(Legend::default())
        .height(PLOT_HEIGHT)
        .x_axis_label("Date")
        .y_axis_label(summary.pollutant.column())
        .x_axis_formatter(|mark, _range| format_plot_x(mark.value))
        .allow_boxed_zoom(true)
        .allow_drag(true)
        .allow_scroll(true)
        .allow_zoom(true)
        .show(ui, |plot_ui| {
            for (city, pts) in by_city {
                let color = city_color(colors, city);
                plot_ui.line(
                    Line::new(PlotPoints::from(pts.clone()))
                        .name(city)
                        .color(color)
                        .width(1.5),
                );
                plot_ui.points(
                    Points::new(PlotPoints::from(pts))
                        .name(city)
                        .color(color)
                        .radius(2.0),
                );
            }
        });
}

// ---------------------------------------------------------------------------
// City-wise AQI comparison (bar chart)
// ---------------------------------------------------------------------------

/// Mean AQI per city, coloured from green (lowest) to red (highest).
pub fn city_bar_chart(ui: &mut Ui, summary: &DashboardSummary) {
    ui.heading("Average AQI by City");
    let means = match &summary.city_means {
        Ok(means) => means,
        Err(reason) => return placeholder(ui, reason),
    };

    let (min, max) = means
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), (_, m)| (lo.min(m), hi.max(m)));
    let last_bar = means.len().saturating_sub(1) as f64;
    let names: Vec<String> = means.iter().map(|(c, _)| c.to_string()).collect();
    let bars: Vec<Bar> = means
        .iter()
        .enumerate()
        .map(|(i, (city, mean))| {
            Bar::new(i as f64, mean)
                .name(city)
                .fill(aqi_ramp(mean, min, max))
                .width(0.6)
        })
        .collect();

    Plot::new("city_bar_plot")
        .height(PLOT_HEIGHT)
        .y_axis_label("AQI")
        .x_axis_formatter(move |mark, _range| category_label(&names, mark.value))
        .include_x(-0.5)
        .include_x(last_bar + 0.5)
        .allow_drag(false)
        .allow_scroll(false)
        .show(ui, |plot_ui| {
            plot_ui.bar_chart(BarChart::new(bars).name("Average AQI"));
        });
}

// ---------------------------------------------------------------------------
// Pollutant distribution (box plot)
// ---------------------------------------------------------------------------

/// Five-number summary per city with outliers drawn as points.
pub fn distribution_plot(ui: &mut Ui, summary: &DashboardSummary, colors: Option<&CityColors>) {
    ui.heading(format!("{} Distribution", summary.pollutant));
    let boxes = match &summary.distribution {
        Ok(boxes) => boxes,
        Err(reason) => return placeholder(ui, reason),
    };

    let names: Vec<String> = boxes.iter().map(|d| d.city.clone()).collect();

    Plot::new("distribution_plot")
        .legend(Legend::default())
        .height(PLOT_HEIGHT)
        .y_axis_label(summary.pollutant.column())
        .x_axis_formatter(move |mark, _range| category_label(&names, mark.value))
        .show(ui, |plot_ui| {
            for (i, d) in boxes.iter().enumerate() {
                let x = i as f64;
                let color = city_color(colors, &d.city);
                let spread = BoxSpread::new(d.lower_whisker, d.q1, d.median, d.q3, d.upper_whisker);
                let elem = BoxElem::new(x, spread)
                    .name(&d.city)
                    .box_width(0.5)
                    .fill(color.linear_multiply(0.3))
                    .stroke(Stroke::new(1.5, color));
                plot_ui.box_plot(BoxPlot::new(vec![elem]).name(&d.city));

                if !d.outliers.is_empty() {
                    let outliers: PlotPoints = d.outliers.iter().map(|&v| [x, v]).collect();
                    plot_ui.points(Points::new(outliers).name(&d.city).color(color).radius(2.5));
                }
            }
        });
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    #[test]
    fn test_plot_x_round_trips_dates() {
        let ts = NaiveDate::from_ymd_opt(2020, 2, 29)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        assert_eq!(format_plot_x(to_plot_x(ts)), "2020-02-29");
    }

    #[test]
    fn test_category_label_only_on_integers() {
        let names = vec!["Chennai".to_string(), "Delhi".to_string()];
        assert_eq!(category_label(&names, 1.0), "Delhi");
        assert_eq!(category_label(&names, 0.5), "");
        assert_eq!(category_label(&names, 2.0), "");
        assert_eq!(category_label(&names, -1.0), "");
    }
}
