use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use super::model::Spectrum;

#[derive(Debug, Serialize)]
struct Row {
    channel: usize,
    energy: f64,
    counts: f64,
}

/// Write one `channel,energy,counts` row per channel.
///
/// `energy` follows the spectrum's energy scale, so it repeats the channel
/// number when the spectrum is uncalibrated.
pub fn write_csv<W: Write>(spectrum: &Spectrum, writer: W) -> Result<()> {
    let mut csv = csv::Writer::from_writer(writer);
    for (channel, (energy, &counts)) in spectrum
        .energy_axis()
        .into_iter()
        .zip(spectrum.data())
        .enumerate()
    {
        csv.serialize(Row {
            channel,
            energy,
            counts,
        })
        .with_context(|| format!("writing channel {channel}"))?;
    }
    csv.flush().context("flushing CSV output")?;
    Ok(())
}

/// Export a spectrum to a CSV file.
pub fn export_csv(spectrum: &Spectrum, path: &Path) -> Result<()> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("creating {}", path.display()))?;
    write_csv(spectrum, file)
}
