use std::fmt;
use std::ops::Sub;

use super::error::DimensionMismatch;

/// Name given to every count series produced by the loader.
pub const SPECTRUM_NAME: &str = "spectrum";

// ---------------------------------------------------------------------------
// EnergyScale – linear channel → energy calibration
// ---------------------------------------------------------------------------

/// How the channel axis maps to physical energy.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum EnergyScale {
    /// Raw bin units.
    #[default]
    Channels,
    /// `energy = slope * channel + origin`, in keV.
    Calibrated { slope: f64, origin: f64 },
}

impl EnergyScale {
    /// Map a channel position to the displayed axis value.
    pub fn apply(&self, channel: f64) -> f64 {
        match *self {
            EnergyScale::Channels => channel,
            EnergyScale::Calibrated { slope, origin } => slope * channel + origin,
        }
    }

    pub fn is_calibrated(&self) -> bool {
        matches!(self, EnergyScale::Calibrated { .. })
    }

    /// Axis label for plots and exports.
    pub fn unit(&self) -> &'static str {
        match self {
            EnergyScale::Channels => "channel",
            EnergyScale::Calibrated { .. } => "keV",
        }
    }
}

// ---------------------------------------------------------------------------
// Spectrum – one HPGe count series
// ---------------------------------------------------------------------------

/// An energy spectrum measured with an HPGe detector.
///
/// Counts are stored in channel order and their number never changes after
/// construction. The energy scale is independent of the counts and can be
/// set or cleared freely.
#[derive(Debug, Clone, PartialEq)]
pub struct Spectrum {
    name: String,
    counts: Vec<f64>,
    /// Explicit index labels; `None` means plain 0-based channels.
    labels: Option<Vec<f64>>,
    scale: EnergyScale,
}

impl Spectrum {
    /// Wrap a count series as-is, uncalibrated.
    pub fn new(counts: Vec<f64>) -> Self {
        Spectrum {
            name: SPECTRUM_NAME.to_string(),
            counts,
            labels: None,
            scale: EnergyScale::Channels,
        }
    }

    /// Wrap a count series whose positions carry explicit index labels.
    pub fn with_index(counts: Vec<f64>, labels: Vec<f64>) -> Result<Self, DimensionMismatch> {
        if counts.len() != labels.len() {
            return Err(DimensionMismatch {
                left: counts.len(),
                right: labels.len(),
            });
        }
        Ok(Spectrum {
            labels: Some(labels),
            ..Spectrum::new(counts)
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The count series, one value per channel.
    pub fn data(&self) -> &[f64] {
        &self.counts
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn energy_scale(&self) -> EnergyScale {
        self.scale
    }

    /// keV per bin, or `None` when uncalibrated.
    pub fn slope(&self) -> Option<f64> {
        match self.scale {
            EnergyScale::Channels => None,
            EnergyScale::Calibrated { slope, .. } => Some(slope),
        }
    }

    /// Energy offset, 0.0 when uncalibrated.
    pub fn origin(&self) -> f64 {
        match self.scale {
            EnergyScale::Channels => 0.0,
            EnergyScale::Calibrated { origin, .. } => origin,
        }
    }

    pub fn set_energy_scale(&mut self, slope: f64, origin: f64) {
        self.scale = EnergyScale::Calibrated { slope, origin };
    }

    /// Drop the calibration and any index labels, showing the spectrum in bins.
    pub fn reset_energy_scale(&mut self) {
        self.labels = None;
        self.scale = EnergyScale::Channels;
    }

    /// Index value of every position: the explicit labels, or 0..n.
    pub fn index(&self) -> Vec<f64> {
        match &self.labels {
            Some(labels) => labels.clone(),
            None => (0..self.counts.len()).map(|i| i as f64).collect(),
        }
    }

    /// X coordinate of every channel: the index, mapped through the energy
    /// scale when calibrated.
    pub fn energy_axis(&self) -> Vec<f64> {
        let scale = self.scale;
        self.index().into_iter().map(|i| scale.apply(i)).collect()
    }

    /// `[x, y]` pairs ready for plotting.
    pub fn points(&self) -> Vec<[f64; 2]> {
        self.energy_axis()
            .into_iter()
            .zip(self.counts.iter())
            .map(|(x, &y)| [x, y])
            .collect()
    }

    pub fn total_counts(&self) -> f64 {
        self.counts.iter().sum()
    }

    /// Channel-wise difference `self - other`.
    ///
    /// The result keeps this spectrum's name, index and energy scale; the
    /// other operand's calibration is ignored.
    pub fn checked_sub(&self, other: &Spectrum) -> Result<Spectrum, DimensionMismatch> {
        if self.len() != other.len() {
            return Err(DimensionMismatch {
                left: self.len(),
                right: other.len(),
            });
        }
        let counts = self
            .counts
            .iter()
            .zip(other.counts.iter())
            .map(|(a, b)| a - b)
            .collect();
        Ok(Spectrum {
            name: self.name.clone(),
            counts,
            labels: self.labels.clone(),
            scale: self.scale,
        })
    }
}

impl Sub for &Spectrum {
    type Output = Result<Spectrum, DimensionMismatch>;

    fn sub(self, other: Self) -> Self::Output {
        self.checked_sub(other)
    }
}

impl fmt::Display for Spectrum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Spectrum:")?;
        match self.slope() {
            Some(slope) => writeln!(
                f,
                "Energy scale: {slope} keV/bin x val + {}",
                self.origin()
            )?,
            None => writeln!(f, "Energy scale: None keV/bin x val + {}", self.origin())?,
        }
        write!(
            f,
            "{}: {} channels, {:.4} total",
            self.name,
            self.len(),
            self.total_counts()
        )
    }
}
