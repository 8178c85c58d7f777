//! Features computed from exported event waveforms.
//!
//! Spectral descriptors of the current signal are the usual starting
//! point for classifying the appliance behind an event.

pub mod helpers;
pub mod spectral;

// Re-export commonly used types
pub use spectral::{
    FeatureError, FilterType, FormulaSet, MainsFrequency, SpectralConfig, SpectralFeatures, POWER_FREQUENCY,
    SAMPLING_RATE,
};
