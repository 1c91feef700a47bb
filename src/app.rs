use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};

use crate::state::AppState;
use crate::ui::{indicators, panels, plot};

// ---------------------------------------------------------------------------
// eframe App implementation
// ---------------------------------------------------------------------------

pub struct DashboardApp {
    pub state: AppState,
}

impl DashboardApp {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }
}

impl eframe::App for DashboardApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // ---- Top panel: menu bar ----
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            panels::top_bar(ui, &mut self.state);
        });

        // ---- A failed load replaces the whole dashboard ----
        if self.state.load_failed() {
            egui::CentralPanel::default().show(ctx, |ui| {
                ui.centered_and_justified(|ui: &mut Ui| {
                    ui.heading(
                        RichText::new("Error loading data file. Use File → Open… to pick another.")
                            .color(Color32::RED),
                    );
                });
            });
            return;
        }

        // ---- Left side panel: filters ----
        egui::SidePanel::left("filter_panel")
            .default_width(220.0)
            .resizable(true)
            .show(ctx, |ui| {
                panels::side_panel(ui, &mut self.state);
            });

        // ---- Central panel: KPIs, charts, alerts ----
        egui::CentralPanel::default().show(ctx, |ui| {
            let Some(summary) = &self.state.summary else {
                ui.centered_and_justified(|ui: &mut Ui| {
                    ui.heading("Open a file to view air-quality data  (File → Open…)");
                });
                return;
            };
            let colors = self.state.colors.as_ref();

            ScrollArea::vertical()
                .auto_shrink([false, false])
                .show(ui, |ui: &mut Ui| {
                    indicators::kpi_row(ui, summary);
                    ui.separator();
                    plot::trend_plot(ui, summary, colors);
                    ui.separator();
                    plot::city_bar_chart(ui, summary);
                    ui.separator();
                    plot::distribution_plot(ui, summary, colors);
                    ui.separator();
                    indicators::alert_list(ui, summary);
                });
        });
    }
}
