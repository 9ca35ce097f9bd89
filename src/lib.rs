//! Loading and arithmetic for HPGe gamma-ray spectra.

pub mod data;

pub use data::{
    load_path, parse, parse_with, DimensionMismatch, EnergyScale, LoaderOptions, NamedSource,
    ParseError, Spectrum, SpectrumSource, TableParseError,
};
