//! Spectral features of a current waveform.
//!
//! All spectra are amplitude spectra of the real FFT over a window of
//! the peak-normalized signal. Unless configured otherwise the window is
//! the largest power of two that fits the signal, e.g. 8192 samples for a
//! 2 s event at 6400 Hz.

use crate::features::helpers::{argmax, geo_mean, mean, normalize, rms};
use rustfft::{num_complex::Complex, FftPlanner};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Mains frequency in Hz.
pub const POWER_FREQUENCY: f64 = 50.0;

/// Samples per second of the recordings.
pub const SAMPLING_RATE: f64 = 6400.0;

/// Replaces zero amplitudes before taking logarithms.
const FLATNESS_FLOOR: f64 = 0.00001;

/// Errors raised while computing features.
#[derive(Debug, Error, PartialEq)]
pub enum FeatureError {
    #[error("signal has {len} samples, window needs {window}")]
    TooShort { len: usize, window: usize },

    #[error("mains frequency of {0}Hz is not in the spectral frequencies of this window")]
    MainsNotInSpectrum(f64),
}

/// How the mains frequency is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum MainsFrequency {
    /// The configured power frequency
    Power,
    /// A specific frequency, which must be an FFT bin
    Custom(f64),
    /// The frequency with peak amplitude
    Peak,
}

/// Attenuation applied below the cutoff of a high pass filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterType {
    /// Set low frequencies to zero
    Zero,
    /// Scale by `f / cutoff`
    Linear,
    /// Scale by `(f / cutoff)^2`
    Quadratic,
    /// Pass everything
    None,
}

/// Which definition is used for the odd/even ratio, the third tristimulus
/// component and the spectral centroid.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormulaSet {
    /// Values of the established feature set: `h1 / h2`, harmonics 5–9 and
    /// a centroid weighting amplitudes by `1 / f`
    #[default]
    Compatible,
    /// Mean odd over mean even harmonics, harmonics 5–10 and a centroid
    /// weighting amplitudes by `f`
    Textbook,
}

/// Parameters for feature computation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpectralConfig {
    pub power_frequency: f64,
    pub sampling_rate: f64,
    /// Number of harmonics to extract
    pub harmonics: usize,
    /// FFT window, defaults to the largest power of two that fits
    pub window: Option<usize>,
    pub filter_type: FilterType,
    /// High pass cutoff in Hz
    pub filter_frequency: f64,
    #[serde(default)]
    pub formulas: FormulaSet,
}

impl Default for SpectralConfig {
    fn default() -> Self {
        Self {
            power_frequency: POWER_FREQUENCY,
            sampling_rate: SAMPLING_RATE,
            harmonics: 20,
            window: None,
            filter_type: FilterType::Zero,
            filter_frequency: 1000.0,
            formulas: FormulaSet::Compatible,
        }
    }
}

/// Largest power of two not exceeding `len`.
pub fn default_window(len: usize) -> usize {
    if len == 0 {
        0
    } else {
        1 << (usize::BITS - 1 - len.leading_zeros())
    }
}

/// Window length that produced a spectrum of `bins` bins.
fn window_from_spectrum(bins: usize) -> usize {
    bins.saturating_sub(1) * 2
}

/// Amplitude spectrum for positive frequencies of the first `window` samples.
pub fn spectrum(current: &[f64], window: usize) -> Result<Vec<f64>, FeatureError> {
    if window == 0 || current.len() < window {
        return Err(FeatureError::TooShort {
            len: current.len(),
            window,
        });
    }

    let mut buffer: Vec<Complex<f64>> = normalize(&current[..window])
        .into_iter()
        .map(|x| Complex::new(x, 0.0))
        .collect();

    let mut planner = FftPlanner::<f64>::new();
    planner.plan_fft_forward(window).process(&mut buffer);

    Ok(buffer[..window / 2 + 1].iter().map(|c| c.norm()).collect())
}

/// Frequencies (Hz) of the bins produced by [`spectrum`] for `window`.
pub fn spectral_frequencies(window: usize, sampling_rate: f64) -> Vec<f64> {
    if window == 0 {
        return Vec::new();
    }
    (0..=window / 2)
        .map(|k| k as f64 * sampling_rate / window as f64)
        .collect()
}

/// Index of the bin closest to each of the first `n` harmonics.
pub fn harmonics_indices(frequencies: &[f64], n: usize, power_frequency: f64) -> Vec<usize> {
    (1..=n)
        .map(|h| {
            let target = h as f64 * power_frequency;
            let distances: Vec<f64> = frequencies
                .iter()
                .map(|f| -(f.max(0.0) - target).abs())
                .collect();
            argmax(&distances).unwrap_or(0)
        })
        .collect()
}

/// Amplitudes of the first `config.harmonics` harmonics.
pub fn harmonics(current: &[f64], config: &SpectralConfig) -> Result<Vec<f64>, FeatureError> {
    harmonics_n(current, config.harmonics, config)
}

fn harmonics_n(current: &[f64], n: usize, config: &SpectralConfig) -> Result<Vec<f64>, FeatureError> {
    let window = config.window.unwrap_or_else(|| default_window(current.len()));
    let amplitudes = spectrum(current, window)?;
    Ok(harmonics_from_spectrum(&amplitudes, n, config))
}

fn harmonics_from_spectrum(amplitudes: &[f64], n: usize, config: &SpectralConfig) -> Vec<f64> {
    let window = window_from_spectrum(amplitudes.len());
    let frequencies = spectral_frequencies(window, config.sampling_rate);
    harmonics_indices(&frequencies, n, config.power_frequency)
        .into_iter()
        .map(|idx| amplitudes.get(idx).copied().unwrap_or(0.0))
        .collect()
}

/// Amplitude at the mains frequency bin.
pub fn mains_frequency_amplitude(
    amplitudes: &[f64],
    mains: MainsFrequency,
    config: &SpectralConfig,
) -> Result<f64, FeatureError> {
    let frequencies =
        spectral_frequencies(window_from_spectrum(amplitudes.len()), config.sampling_rate);

    let target = match mains {
        MainsFrequency::Power => config.power_frequency,
        MainsFrequency::Custom(f) => f,
        MainsFrequency::Peak => argmax(amplitudes)
            .and_then(|idx| frequencies.get(idx).copied())
            .unwrap_or(0.0),
    };

    frequencies
        .iter()
        .position(|&f| f == target)
        .and_then(|idx| amplitudes.get(idx).copied())
        .ok_or(FeatureError::MainsNotInSpectrum(target))
}

/// First harmonic over second harmonic; NaN with fewer than two harmonics.
pub fn odd_even_ratio(harmonics: &[f64]) -> f64 {
    match (harmonics.first(), harmonics.get(1)) {
        (Some(odd), Some(even)) => odd / even,
        _ => f64::NAN,
    }
}

/// Mean of all odd harmonics over mean of all even harmonics.
pub fn odd_even_mean_ratio(harmonics: &[f64]) -> f64 {
    let odd: Vec<f64> = harmonics.iter().step_by(2).copied().collect();
    let even: Vec<f64> = harmonics.iter().skip(1).step_by(2).copied().collect();
    mean(&odd) / mean(&even)
}

/// Geometric mean over arithmetic mean of the spectrum.
pub fn spectral_flatness(amplitudes: &[f64]) -> f64 {
    let floored: Vec<f64> = amplitudes
        .iter()
        .map(|&x| if x == 0.0 { FLATNESS_FLOOR } else { x })
        .collect();
    geo_mean(&floored) / mean(&floored)
}

/// Harmonic amplitudes relative to the mains amplitude.
pub fn harmonics_energy_distribution(harmonics: &[f64], mains_amplitude: f64) -> Vec<f64> {
    harmonics.iter().map(|h| h / mains_amplitude).collect()
}

/// Share of the 1st, 2nd–4th and 5th–9th harmonics in the harmonic sum.
pub fn tristimulus(harmonics: &[f64]) -> [f64; 3] {
    tristimulus_upto(harmonics, 9)
}

/// Like [`tristimulus`], with the third component covering harmonics 5–10.
pub fn tristimulus_extended(harmonics: &[f64]) -> [f64; 3] {
    tristimulus_upto(harmonics, 10)
}

fn tristimulus_upto(harmonics: &[f64], last: usize) -> [f64; 3] {
    let total: f64 = harmonics.iter().sum();
    let t1 = harmonics.first().copied().unwrap_or(0.0);
    let t2: f64 = harmonics.iter().skip(1).take(3).sum();
    let t3: f64 = harmonics.iter().skip(4).take(last.saturating_sub(4)).sum();
    [t1 / total, t2 / total, t3 / total]
}

/// RMS of the harmonics relative to the mains amplitude.
pub fn total_harmonic_distortion(harmonics: &[f64], mains_amplitude: f64) -> f64 {
    rms(harmonics) / mains_amplitude
}

/// Sum of `x_f / f` over the sum of amplitudes, ignoring the DC bin.
pub fn spectral_centroid(amplitudes: &[f64], sampling_rate: f64) -> f64 {
    centroid_by(amplitudes, sampling_rate, |x, f| x / f)
}

/// Amplitude-weighted mean frequency, ignoring the DC bin.
pub fn spectral_centroid_weighted(amplitudes: &[f64], sampling_rate: f64) -> f64 {
    centroid_by(amplitudes, sampling_rate, |x, f| x * f)
}

fn centroid_by(amplitudes: &[f64], sampling_rate: f64, weight: impl Fn(f64, f64) -> f64) -> f64 {
    let frequencies =
        spectral_frequencies(window_from_spectrum(amplitudes.len()), sampling_rate);
    let weighted: f64 = amplitudes
        .iter()
        .zip(&frequencies)
        .skip(1)
        .map(|(&x, &f)| weight(x, f))
        .sum();
    let total: f64 = amplitudes.iter().skip(1).sum();
    weighted / total
}

fn centroid_for(amplitudes: &[f64], config: &SpectralConfig) -> f64 {
    match config.formulas {
        FormulaSet::Compatible => spectral_centroid(amplitudes, config.sampling_rate),
        FormulaSet::Textbook => spectral_centroid_weighted(amplitudes, config.sampling_rate),
    }
}

/// Amplitude-weighted mean harmonic order over the first 50 harmonics.
pub fn harmonic_spectral_centroid(
    current: &[f64],
    config: &SpectralConfig,
) -> Result<f64, FeatureError> {
    let harmonics = harmonics_n(current, 50, config)?;
    Ok(harmonic_order_centroid(&harmonics))
}

fn harmonic_order_centroid(harmonics: &[f64]) -> f64 {
    let weighted: f64 = harmonics
        .iter()
        .enumerate()
        .map(|(i, h)| h * (i + 1) as f64)
        .sum();
    weighted / harmonics.iter().sum::<f64>()
}

/// Peak amplitude over mean amplitude.
pub fn signal_to_signal_mean_ratio(amplitudes: &[f64]) -> f64 {
    let peak = amplitudes.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    peak / mean(amplitudes)
}

/// Amplitude of the second harmonic.
pub fn second_harmonic(harmonics: &[f64]) -> Option<f64> {
    harmonics.get(1).copied()
}

/// Attenuate amplitudes below `cutoff` Hz.
pub fn high_pass_filter(
    amplitudes: &[f64],
    filter_type: FilterType,
    cutoff: f64,
    sampling_rate: f64,
) -> Vec<f64> {
    let frequencies =
        spectral_frequencies(window_from_spectrum(amplitudes.len()), sampling_rate);

    amplitudes
        .iter()
        .zip(&frequencies)
        .map(|(&x, &f)| {
            let factor = if f >= cutoff {
                1.0
            } else {
                match filter_type {
                    FilterType::Zero => 0.0,
                    FilterType::Linear => f / cutoff,
                    FilterType::Quadratic => (f / cutoff).powi(2),
                    FilterType::None => 1.0,
                }
            };
            x * factor
        })
        .collect()
}

/// Spectral centroid of the high pass filtered spectrum.
pub fn high_frequency_spectral_centroid(amplitudes: &[f64], config: &SpectralConfig) -> f64 {
    let filtered = high_pass_filter(
        amplitudes,
        config.filter_type,
        config.filter_frequency,
        config.sampling_rate,
    );
    centroid_for(&filtered, config)
}

/// Spectral flatness of the high pass filtered spectrum.
pub fn high_frequency_spectral_flatness(amplitudes: &[f64], config: &SpectralConfig) -> f64 {
    spectral_flatness(&high_pass_filter(
        amplitudes,
        config.filter_type,
        config.filter_frequency,
        config.sampling_rate,
    ))
}

/// Mean amplitude of the high pass filtered spectrum.
pub fn high_frequency_spectral_mean(amplitudes: &[f64], config: &SpectralConfig) -> f64 {
    mean(&high_pass_filter(
        amplitudes,
        config.filter_type,
        config.filter_frequency,
        config.sampling_rate,
    ))
}

/// All spectral features of one current waveform.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpectralFeatures {
    /// FFT window used
    pub window: usize,
    pub harmonics: Vec<f64>,
    pub mains_amplitude: f64,
    pub odd_even_ratio: f64,
    pub spectral_flatness: f64,
    pub harmonics_energy_distribution: Vec<f64>,
    pub tristimulus: [f64; 3],
    pub total_harmonic_distortion: f64,
    pub spectral_centroid: f64,
    pub harmonic_spectral_centroid: f64,
    pub signal_to_signal_mean_ratio: f64,
    pub second_harmonic: Option<f64>,
    pub high_frequency_spectral_centroid: f64,
    pub high_frequency_spectral_flatness: f64,
    pub high_frequency_spectral_mean: f64,
}

impl SpectralFeatures {
    /// Compute every feature from `current`.
    pub fn compute(current: &[f64], config: &SpectralConfig) -> Result<Self, FeatureError> {
        let window = config.window.unwrap_or_else(|| default_window(current.len()));
        let amplitudes = spectrum(current, window)?;
        let harmonics = harmonics_from_spectrum(&amplitudes, config.harmonics, config);
        let mains_amplitude = mains_frequency_amplitude(&amplitudes, MainsFrequency::Power, config)?;
        let harmonic_centroid =
            harmonic_order_centroid(&harmonics_from_spectrum(&amplitudes, 50, config));

        let (odd_even, tristimulus) = match config.formulas {
            FormulaSet::Compatible => (odd_even_ratio(&harmonics), tristimulus(&harmonics)),
            FormulaSet::Textbook => (
                odd_even_mean_ratio(&harmonics),
                tristimulus_extended(&harmonics),
            ),
        };

        Ok(Self {
            window,
            odd_even_ratio: odd_even,
            spectral_flatness: spectral_flatness(&amplitudes),
            harmonics_energy_distribution: harmonics_energy_distribution(
                &harmonics,
                mains_amplitude,
            ),
            tristimulus,
            total_harmonic_distortion: total_harmonic_distortion(&harmonics, mains_amplitude),
            spectral_centroid: centroid_for(&amplitudes, config),
            harmonic_spectral_centroid: harmonic_centroid,
            signal_to_signal_mean_ratio: signal_to_signal_mean_ratio(&amplitudes),
            second_harmonic: second_harmonic(&harmonics),
            high_frequency_spectral_centroid: high_frequency_spectral_centroid(&amplitudes, config),
            high_frequency_spectral_flatness: high_frequency_spectral_flatness(&amplitudes, config),
            high_frequency_spectral_mean: high_frequency_spectral_mean(&amplitudes, config),
            mains_amplitude,
            harmonics,
        })
    }
}
