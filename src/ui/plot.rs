use eframe::egui::{Color32, RichText, Ui};
use egui_plot::{Legend, Plot, PlotPoints, Points};

use crate::color::trace_color;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Spectrum plot (central panel)
// ---------------------------------------------------------------------------

/// Render every visible spectrum as a scatter of counts per second.
pub fn spectrum_plot(ui: &mut Ui, state: &AppState) {
    if state.spectra.is_empty() {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.heading("Open a spectrum file to view it  (File → Open…)");
        });
        return;
    }

    // Traces that cannot be background-subtracted are reported, not drawn.
    let mut skipped = Vec::new();

    Plot::new("spectrum_plot")
        .legend(Legend::default())
        .x_axis_label(state.axis_label())
        .y_axis_label("Counts / s")
        .allow_boxed_zoom(true)
        .allow_drag(true)
        .allow_scroll(true)
        .allow_zoom(true)
        .show(ui, |plot_ui| {
            for (idx, loaded) in state.spectra.iter().enumerate() {
                if !loaded.visible {
                    continue;
                }
                let trace = match state.trace(idx) {
                    Ok(trace) => trace,
                    Err(e) => {
                        skipped.push(format!("{}: {e}", loaded.label));
                        continue;
                    }
                };

                let radius = if state.selected == Some(idx) { 2.0 } else { 1.2 };
                let points = Points::new(PlotPoints::from(trace.points()))
                    .name(&loaded.label)
                    .color(trace_color(&state.colors, idx))
                    .radius(radius);

                plot_ui.points(points);
            }
        });

    for msg in skipped {
        ui.label(RichText::new(msg).color(Color32::RED));
    }
}
