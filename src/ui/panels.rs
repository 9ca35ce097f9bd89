use std::path::PathBuf;

use eframe::egui::{self, Color32, DragValue, RichText, ScrollArea, Ui};

use crate::color::trace_color;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Left side panel – spectra, background, calibration
// ---------------------------------------------------------------------------

/// Render the left control panel.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Spectra");
    ui.separator();

    if state.spectra.is_empty() {
        ui.label("No spectrum loaded.");
        return;
    }

    let mut to_remove = None;

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            // ---- Loaded spectra ----
            for idx in 0..state.spectra.len() {
                ui.horizontal(|ui: &mut Ui| {
                    let color = trace_color(&state.colors, idx);
                    let loaded = &mut state.spectra[idx];
                    ui.checkbox(&mut loaded.visible, "");
                    let text = RichText::new(&loaded.label).color(color);
                    if ui
                        .selectable_label(state.selected == Some(idx), text)
                        .clicked()
                    {
                        state.select(idx);
                    }
                    if ui.small_button("✖").clicked() {
                        to_remove = Some(idx);
                    }
                });
            }
            ui.separator();

            // ---- Background subtraction ----
            ui.strong("Background");
            let current = state
                .background
                .and_then(|i| state.spectra.get(i))
                .map(|l| l.label.clone())
                .unwrap_or_else(|| "None".to_string());
            egui::ComboBox::from_id_salt("background")
                .selected_text(current)
                .show_ui(ui, |ui: &mut Ui| {
                    ui.selectable_value(&mut state.background, None, "None");
                    for (idx, loaded) in state.spectra.iter().enumerate() {
                        ui.selectable_value(&mut state.background, Some(idx), &loaded.label);
                    }
                });
            ui.add_enabled(
                state.background.is_some(),
                egui::Checkbox::new(&mut state.subtract_background, "Subtract from others"),
            );
            ui.separator();

            // ---- Energy calibration of the selected spectrum ----
            ui.strong("Energy scale");
            let Some(selected) = state.selected_spectrum() else {
                return;
            };
            ui.label(match selected.spectrum.slope() {
                Some(slope) => format!("{slope} keV/bin x val + {}", selected.spectrum.origin()),
                None => "uncalibrated (bins)".to_string(),
            });
            ui.horizontal(|ui: &mut Ui| {
                ui.label("keV/bin");
                ui.add(DragValue::new(&mut state.slope_input).speed(0.001));
            });
            ui.horizontal(|ui: &mut Ui| {
                ui.label("origin");
                ui.add(DragValue::new(&mut state.origin_input).speed(0.1));
            });
            ui.horizontal(|ui: &mut Ui| {
                if ui.button("Apply").clicked() {
                    state.apply_calibration();
                }
                if ui.button("Reset energy scale").clicked() {
                    state.reset_energy_scale();
                }
            });
        });

    if let Some(idx) = to_remove {
        state.remove_spectrum(idx);
    }
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
            let can_export = state.selected.is_some();
            if ui
                .add_enabled(can_export, egui::Button::new("Export CSV…"))
                .clicked()
            {
                export_file_dialog(state);
                ui.close_menu();
            }
        });

        ui.separator();

        if let Some(loaded) = state.selected_spectrum() {
            ui.label(format!(
                "{}: {} channels, {:.2} counts/s total",
                loaded.label,
                loaded.spectrum.len(),
                loaded.spectrum.total_counts()
            ));
        }

        if let Some(msg) = &state.status_message {
            ui.separator();
            ui.label(RichText::new(msg).color(Color32::RED));
        }
    });
}

// ---------------------------------------------------------------------------
// File dialogs
// ---------------------------------------------------------------------------

pub fn open_file_dialog(state: &mut AppState) {
    let files = rfd::FileDialog::new()
        .set_title("Open HPGe spectrum")
        .add_filter("Spectrum dumps", &["txt", "dat", "asc"])
        .add_filter("All files", &["*"])
        .pick_files();

    for path in files.unwrap_or_default() {
        state.open_path(&path);
    }
}

pub fn export_file_dialog(state: &mut AppState) {
    let suggested = state
        .selected_spectrum()
        .map(|l| format!("{}.csv", l.label))
        .unwrap_or_else(|| "spectrum.csv".to_string());
    let file: Option<PathBuf> = rfd::FileDialog::new()
        .set_title("Export spectrum")
        .set_file_name(suggested)
        .add_filter("CSV", &["csv"])
        .save_file();

    if let Some(path) = file {
        if let Err(e) = state.export_selected(&path) {
            log::error!("Failed to export spectrum: {e:#}");
            state.status_message = Some(format!("Error: {e:#}"));
        }
    }
}
