use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};
use egui_extras::DatePickerButton;

use crate::data::model::Pollutant;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Left side panel – filter widgets
// ---------------------------------------------------------------------------

/// Render the left filter panel.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Filter Options");
    ui.separator();

    let (Some(dataset), Some(current)) = (&state.dataset, &state.selection) else {
        ui.label("No dataset loaded.");
        return;
    };

    // Clone what we need so we can mutate state after the widgets run.
    let all_cities = dataset.cities().clone();
    let span = dataset.date_span();
    let colors = state.colors.clone();
    let mut selection = current.clone();

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            // ---- Cities ----
            let header_text = format!(
                "Cities  ({}/{})",
                selection.cities.len(),
                all_cities.len()
            );
            egui::CollapsingHeader::new(RichText::new(header_text).strong())
                .id_salt("cities")
                .default_open(true)
                .show(ui, |ui: &mut Ui| {
                    ui.horizontal(|ui: &mut Ui| {
                        if ui.small_button("All").clicked() {
                            selection.cities = all_cities.clone();
                        }
                        if ui.small_button("None").clicked() {
                            selection.cities.clear();
                        }
                    });

                    for city in &all_cities {
                        let mut checked = selection.cities.contains(city);
                        let mut text = RichText::new(city);
                        if let Some(cm) = &colors {
                            text = text.color(cm.color_for(city));
                        }
                        if ui.checkbox(&mut checked, text).changed() {
                            if checked {
                                selection.cities.insert(city.clone());
                            } else {
                                selection.cities.remove(city);
                            }
                        }
                    }
                });
            ui.separator();

            // ---- Date range ----
            ui.strong("Date range");
            egui::Grid::new("date_range").num_columns(2).show(ui, |ui: &mut Ui| {
                ui.label("From");
                ui.add(DatePickerButton::new(&mut selection.start).id_salt("date_start"));
                ui.end_row();
                ui.label("To");
                ui.add(DatePickerButton::new(&mut selection.end).id_salt("date_end"));
                ui.end_row();
            });
            if let Some((first, last)) = span {
                if ui.small_button("Full range").clicked() {
                    selection.start = first;
                    selection.end = last;
                }
            }
            if selection.start > selection.end {
                ui.label(
                    RichText::new("Start is after end; nothing selected.").color(Color32::YELLOW),
                );
            }
            ui.separator();

            // ---- Pollutant ----
            ui.strong("Pollutant");
            egui::ComboBox::from_id_salt("pollutant")
                .selected_text(selection.pollutant.column())
                .show_ui(ui, |ui: &mut Ui| {
                    for p in Pollutant::ALL {
                        ui.selectable_value(&mut selection.pollutant, p, p.column());
                    }
                });
        });

    // Recompute the summary if anything changed.
    state.set_selection(selection);
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Open…").clicked() {
                open_file_dialog(state);
                ui.close_menu();
            }
        });

        ui.separator();

        if let Some(ds) = &state.dataset {
            let selected = state.summary.as_ref().map_or(0, |s| s.row_count);
            ui.label(format!(
                "{} readings from {} cities, {selected} in selection",
                ds.len(),
                ds.cities().len(),
            ));
        }

        if let Some(msg) = &state.status_message {
            ui.separator();
            ui.label(RichText::new(msg).color(Color32::RED));
        }
    });
}

// ---------------------------------------------------------------------------
// File dialog
// ---------------------------------------------------------------------------

pub fn open_file_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Open air-quality data")
        .add_filter("Supported files", &["csv", "json", "parquet", "pq"])
        .add_filter("CSV", &["csv"])
        .add_filter("JSON", &["json"])
        .add_filter("Parquet", &["parquet", "pq"])
        .pick_file();

    if let Some(path) = file {
        state.load(&path);
    }
}
