//! Frequency-band aggregation over a byte magnitude spectrum.
//!
//! The analyser publishes `fft_size / 2` unsigned byte magnitudes per frame.
//! This module turns a Hz range into a mean normalized energy in [0, 1] and
//! buckets the three bands that drive the particle tint and depth mapping.

/// Transform window length; the spectrum holds half this many samples.
pub const DEFAULT_FFT_SIZE: usize = 2048;

/// Sample rate assumed when no capture device dictates one.
pub const DEFAULT_SAMPLE_RATE_HZ: u32 = 48_000;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FreqRange {
    pub low_hz: f32,
    pub high_hz: f32,
}

impl FreqRange {
    pub const fn new(low_hz: f32, high_hz: f32) -> Self {
        Self { low_hz, high_hz }
    }
}

pub const BASS: FreqRange = FreqRange::new(20.0, 140.0);
pub const LOW_MID: FreqRange = FreqRange::new(140.0, 400.0);
pub const MID: FreqRange = FreqRange::new(400.0, 2_600.0);
pub const HIGH_MID: FreqRange = FreqRange::new(2_600.0, 5_200.0);
pub const TREBLE: FreqRange = FreqRange::new(5_200.0, 14_000.0);

/// All predefined bands, low to high.
pub const BANDS: [FreqRange; 5] = [BASS, LOW_MID, MID, HIGH_MID, TREBLE];

/// Mean normalized energy of `spectrum` within `range`, in [0, 1].
///
/// Index bounds are `round(hz / nyquist * len)` clamped into the buffer and
/// averaged inclusively. Empty buffers, empty or inverted ranges and a zero
/// sample rate all yield 0 rather than dividing by zero or reading past the
/// end.
pub fn range_energy(spectrum: &[u8], range: FreqRange, sample_rate_hz: u32) -> f32 {
    if spectrum.is_empty() || sample_rate_hz == 0 || range.high_hz <= range.low_hz {
        return 0.0;
    }
    let nyquist = sample_rate_hz as f32 / 2.0;
    let scale = spectrum.len() as f32 / nyquist;
    let last = spectrum.len() - 1;
    let low = ((range.low_hz * scale).round() as usize).min(last);
    let high = ((range.high_hz * scale).round() as usize).min(last);
    if high < low {
        return 0.0;
    }

    let mut total = 0u32;
    for &m in &spectrum[low..=high] {
        total += m as u32;
    }
    let count = (high - low + 1) as f32;
    (total as f32 / count) / 255.0
}

/// The per-frame energy triple feeding the depth mapper.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BandEnergies {
    pub bass: f32,
    pub mid: f32,
    pub treble: f32,
}

impl BandEnergies {
    pub fn sample(spectrum: &[u8], sample_rate_hz: u32) -> Self {
        Self {
            bass: range_energy(spectrum, BASS, sample_rate_hz),
            mid: range_energy(spectrum, MID, sample_rate_hz),
            treble: range_energy(spectrum, TREBLE, sample_rate_hz),
        }
    }

    /// Shared material color for the frame: loud bands darken their channel.
    pub fn tint(&self) -> [f32; 3] {
        [
            (1.0 - self.bass).clamp(0.0, 1.0),
            (1.0 - self.mid).clamp(0.0, 1.0),
            (1.0 - self.treble).clamp(0.0, 1.0),
        ]
    }
}
