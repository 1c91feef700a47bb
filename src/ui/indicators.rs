use eframe::egui::{self, Color32, RichText, Ui};

use crate::color::alert_color;
use crate::data::aggregate::Unavailable;
use crate::data::alert::AlertStatus;
use crate::data::summary::DashboardSummary;

// ---------------------------------------------------------------------------
// KPI cards
// ---------------------------------------------------------------------------

/// Average AQI, worst city and best city side by side.
pub fn kpi_row(ui: &mut Ui, summary: &DashboardSummary) {
    ui.heading("Overall Air Quality Indicators");
    ui.columns(3, |cols: &mut [Ui]| {
        kpi_card(
            &mut cols[0],
            "Average AQI",
            summary.mean_aqi.as_ref().map(|v| format!("{v:.1}")),
        );
        kpi_card(
            &mut cols[1],
            "Worst Air Quality City",
            summary.extremes.as_ref().map(|e| e.worst.clone()),
        );
        kpi_card(
            &mut cols[2],
            "Best Air Quality City",
            summary.extremes.as_ref().map(|e| e.best.clone()),
        );
    });
}

fn kpi_card(ui: &mut Ui, title: &str, value: Result<String, &Unavailable>) {
    egui::Frame::group(ui.style()).show(ui, |ui: &mut Ui| {
        ui.set_min_width(ui.available_width());
        ui.label(RichText::new(title).weak());
        match value {
            Ok(v) => ui.label(RichText::new(v).size(26.0).strong()),
            Err(reason) => ui
                .label(RichText::new("n/a").size(26.0))
                .on_hover_text(reason.to_string()),
        };
    });
}

// ---------------------------------------------------------------------------
// Alert banners
// ---------------------------------------------------------------------------

/// One banner per selected city for its latest reading.
pub fn alert_list(ui: &mut Ui, summary: &DashboardSummary) {
    ui.heading("Latest AQI Alerts");
    if summary.alerts.is_empty() {
        ui.label("No cities selected.");
        return;
    }
    for alert in &summary.alerts {
        match alert.status {
            AlertStatus::Level { level, aqi } => {
                egui::Frame::default()
                    .fill(alert_color(level))
                    .inner_margin(6.0)
                    .show(ui, |ui: &mut Ui| {
                        ui.set_min_width(ui.available_width());
                        ui.label(
                            RichText::new(format!("{}: {level} (AQI: {aqi:.1})", alert.city))
                                .color(Color32::WHITE)
                                .strong(),
                        );
                    });
            }
            AlertStatus::NoData => {
                ui.label(format!("{}: No recent AQI data available.", alert.city));
            }
        }
        ui.add_space(2.0);
    }
}
