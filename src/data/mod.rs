//! Data layer: spectrum model, loading, and export.
//!
//! Architecture:
//! ```text
//!  HPGe text dump (52-line header + count table)
//!        │
//!        ▼
//!   ┌──────────────┐
//!   │ SpectrumSource│  named, line-readable, closable handle
//!   └──────────────┘
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  loader   │  live time from header, table → flat counts / live time
//!   └──────────┘
//!        │
//!        ▼
//!   ┌──────────┐
//!   │ Spectrum  │  counts + energy scale, channel-wise subtraction
//!   └──────────┘
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  export   │  channel,energy,counts CSV
//!   └──────────┘
//! ```

pub mod error;
pub mod export;
pub mod loader;
pub mod model;
pub mod source;

pub use error::{DimensionMismatch, ParseError, TableParseError};
pub use loader::{load_path, parse, parse_with, LoaderOptions, HEADER_LENGTH, LIVE_TIME_PREFIX};
pub use model::{EnergyScale, Spectrum};
pub use source::{NamedSource, SpectrumSource};
