use std::borrow::Cow;
use std::path::Path;

use anyhow::{Context, Result};
use eframe::egui::Color32;

use hpge_viewer::data::{export, load_path, DimensionMismatch, Spectrum};

use crate::color::generate_palette;

// ---------------------------------------------------------------------------
// Loaded spectra
// ---------------------------------------------------------------------------

/// A spectrum opened in the viewer, with its display settings.
pub struct LoadedSpectrum {
    /// File name shown in the legend.
    pub label: String,
    pub spectrum: Spectrum,
    pub visible: bool,
}

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// The full UI state, independent of rendering.
pub struct AppState {
    /// Spectra in the order they were opened.
    pub spectra: Vec<LoadedSpectrum>,

    /// Spectrum targeted by calibration and export.
    pub selected: Option<usize>,

    /// Spectrum subtracted from the others when `subtract_background` is on.
    pub background: Option<usize>,
    pub subtract_background: bool,

    /// Calibration being edited for the selected spectrum.
    pub slope_input: f64,
    pub origin_input: f64,

    /// One trace colour per loaded spectrum.
    pub colors: Vec<Color32>,

    /// Status / error message shown in the UI.
    pub status_message: Option<String>,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            spectra: Vec::new(),
            selected: None,
            background: None,
            subtract_background: false,
            slope_input: 1.0,
            origin_input: 0.0,
            colors: Vec::new(),
            status_message: None,
        }
    }
}

impl AppState {
    /// Load a spectrum file and add it to the view, reporting failures in
    /// the status line.
    pub fn open_path(&mut self, path: &Path) {
        match load_path(path).with_context(|| format!("loading {}", path.display())) {
            Ok(spectrum) => {
                log::info!(
                    "Loaded {} channels from {}",
                    spectrum.len(),
                    path.display()
                );
                let label = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| path.display().to_string());
                self.add_spectrum(label, spectrum);
            }
            Err(e) => {
                log::error!("Failed to load file: {e:#}");
                self.status_message = Some(format!("Error: {e:#}"));
            }
        }
    }

    /// Ingest a newly loaded spectrum and select it.
    pub fn add_spectrum(&mut self, label: String, spectrum: Spectrum) {
        self.spectra.push(LoadedSpectrum {
            label,
            spectrum,
            visible: true,
        });
        self.colors = generate_palette(self.spectra.len());
        self.select(self.spectra.len() - 1);
        self.status_message = None;
    }

    pub fn remove_spectrum(&mut self, idx: usize) {
        if idx >= self.spectra.len() {
            return;
        }
        self.spectra.remove(idx);
        self.colors = generate_palette(self.spectra.len());

        let shift = |slot: Option<usize>| match slot {
            Some(i) if i == idx => None,
            Some(i) if i > idx => Some(i - 1),
            other => other,
        };
        self.background = shift(self.background);
        if self.background.is_none() {
            self.subtract_background = false;
        }
        match shift(self.selected) {
            Some(i) => self.select(i),
            None if !self.spectra.is_empty() => self.select(0),
            None => self.selected = None,
        }
    }

    /// Select a spectrum and load its calibration into the editor.
    pub fn select(&mut self, idx: usize) {
        let Some(loaded) = self.spectra.get(idx) else {
            return;
        };
        self.selected = Some(idx);
        self.slope_input = loaded.spectrum.slope().unwrap_or(1.0);
        self.origin_input = loaded.spectrum.origin();
    }

    pub fn selected_spectrum(&self) -> Option<&LoadedSpectrum> {
        self.selected.and_then(|i| self.spectra.get(i))
    }

    /// Apply the edited slope/origin to the selected spectrum.
    pub fn apply_calibration(&mut self) {
        let (slope, origin) = (self.slope_input, self.origin_input);
        if let Some(loaded) = self.selected.and_then(|i| self.spectra.get_mut(i)) {
            loaded.spectrum.set_energy_scale(slope, origin);
            log::info!("{}: energy = {slope} keV/bin x val + {origin}", loaded.label);
        }
    }

    /// Show the selected spectrum in raw bins again.
    pub fn reset_energy_scale(&mut self) {
        if let Some(loaded) = self.selected.and_then(|i| self.spectra.get_mut(i)) {
            loaded.spectrum.reset_energy_scale();
        }
        self.slope_input = 1.0;
        self.origin_input = 0.0;
    }

    /// The counts to draw for spectrum `idx`, background-subtracted when
    /// requested.
    pub fn trace(&self, idx: usize) -> Result<Cow<'_, Spectrum>, DimensionMismatch> {
        let own = &self.spectra[idx].spectrum;
        match self.background {
            Some(bg) if self.subtract_background && bg != idx => {
                (own - &self.spectra[bg].spectrum).map(Cow::Owned)
            }
            _ => Ok(Cow::Borrowed(own)),
        }
    }

    /// X axis title, following the selected spectrum's energy scale.
    pub fn axis_label(&self) -> &'static str {
        match self.selected_spectrum() {
            Some(loaded) if loaded.spectrum.energy_scale().is_calibrated() => "Energy (keV)",
            _ => "Channel",
        }
    }

    /// Write the selected spectrum, as displayed, to a CSV file.
    pub fn export_selected(&self, path: &Path) -> Result<()> {
        let idx = self.selected.context("no spectrum selected")?;
        let trace = self.trace(idx)?;
        export::export_csv(&trace, path)?;
        log::info!("Exported {} channels to {}", trace.len(), path.display());
        Ok(())
    }
}
