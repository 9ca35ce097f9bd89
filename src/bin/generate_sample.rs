use std::fs::File;
use std::io::{BufWriter, Write};

use anyhow::{Context, Result};

use hpge_viewer::data::{HEADER_LENGTH, LIVE_TIME_PREFIX};

const CHANNELS: usize = 4096;
const COLUMNS: usize = 8;
const LIVE_TIME: f64 = 3600.0;
const KEV_PER_CHANNEL: f64 = 0.5;

fn gaussian(x: f64, mu: f64, sigma: f64, amplitude: f64) -> f64 {
    amplitude * (-(x - mu).powi(2) / (2.0 * sigma.powi(2))).exp()
}

/// Expected count rate (counts/s) per channel: exponential Compton
/// continuum plus Gaussian photopeaks.
fn expected_rate(channel: usize, peaks: &[(f64, f64, f64)]) -> f64 {
    let energy = channel as f64 * KEV_PER_CHANNEL;
    let continuum = 0.8 * (-energy / 400.0).exp() + 0.01;
    let lines: f64 = peaks
        .iter()
        .map(|&(mu, sigma, amp)| gaussian(energy, mu, sigma, amp))
        .sum();
    continuum + lines
}

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }

    /// Counting statistics, Gaussian approximation of Poisson noise.
    fn counts(&mut self, expected: f64) -> u64 {
        self.gauss(expected, expected.sqrt()).round().max(0.0) as u64
    }
}

fn write_header<W: Write>(out: &mut W) -> Result<()> {
    let lines = [
        "Spectrum: synthetic HPGe calibration source".to_string(),
        "Detector: HPGe coaxial, 40% relative efficiency".to_string(),
        "Start Time: 2026-01-01 00:00:00".to_string(),
        format!("Real Time: {:.1}", LIVE_TIME * 1.02),
        format!("{LIVE_TIME_PREFIX} {LIVE_TIME:.1}"),
        format!("Channels: {CHANNELS}"),
    ];
    for line in &lines {
        writeln!(out, "{line}")?;
    }
    for i in lines.len()..HEADER_LENGTH {
        writeln!(out, "# reserved {}", i + 1)?;
    }
    Ok(())
}

fn main() -> Result<()> {
    let mut rng = SimpleRng::new(42);

    // (energy keV, sigma keV, peak rate counts/s): Cs-137 and Co-60 lines.
    let peaks = [
        (661.7, 0.9, 4.0),
        (1173.2, 1.1, 1.6),
        (1332.5, 1.2, 1.4),
        (32.0, 0.6, 0.9),
    ];

    let output_path = "sample_spectrum.txt";
    let file = File::create(output_path).context("creating output file")?;
    let mut out = BufWriter::new(file);

    write_header(&mut out)?;

    for row_start in (0..CHANNELS).step_by(COLUMNS) {
        write!(out, "{row_start:>8}")?;
        for channel in row_start..row_start + COLUMNS {
            let counts = rng.counts(expected_rate(channel, &peaks) * LIVE_TIME);
            write!(out, " {counts:>8}")?;
        }
        writeln!(out)?;
    }
    out.flush().context("writing output file")?;

    println!(
        "Wrote {CHANNELS} channels ({} rows x {COLUMNS} columns) to {output_path}",
        CHANNELS / COLUMNS
    );
    Ok(())
}
