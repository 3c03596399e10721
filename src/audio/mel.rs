//! Slaney-style mel filterbank.
//!
//! Below 1 kHz the mel scale is linear (200/3 Hz per mel), above it is
//! logarithmic with 27 mels per factor of 6.4. Each triangular filter is
//! area-normalized so that wide high-frequency filters do not dominate.

const F_SP: f32 = 200.0 / 3.0;
const MIN_LOG_HZ: f32 = 1000.0;
const MIN_LOG_MEL: f32 = MIN_LOG_HZ / F_SP;

fn log_step() -> f32 {
    6.4f32.ln() / 27.0
}

pub fn hz_to_mel(hz: f32) -> f32 {
    if hz >= MIN_LOG_HZ {
        MIN_LOG_MEL + (hz / MIN_LOG_HZ).ln() / log_step()
    } else {
        hz / F_SP
    }
}

pub fn mel_to_hz(mel: f32) -> f32 {
    if mel >= MIN_LOG_MEL {
        MIN_LOG_HZ * (log_step() * (mel - MIN_LOG_MEL)).exp()
    } else {
        mel * F_SP
    }
}

/// One triangular filter, stored as its non-zero span of FFT bins.
#[derive(Clone, Debug)]
struct MelFilter {
    start_bin: usize,
    weights: Vec<f32>,
}

#[derive(Clone, Debug)]
pub struct MelFilterbank {
    filters: Vec<MelFilter>,
    n_fft_bins: usize,
}

impl MelFilterbank {
    pub fn new(sample_rate: u32, n_fft: usize, n_mels: usize) -> Self {
        let n_fft_bins = n_fft / 2 + 1;
        let nyquist = sample_rate as f32 / 2.0;

        let fft_freqs: Vec<f32> = (0..n_fft_bins)
            .map(|k| k as f32 * sample_rate as f32 / n_fft as f32)
            .collect();

        // n_mels + 2 edges: each filter spans edges[m]..edges[m + 2]
        let max_mel = hz_to_mel(nyquist);
        let edges: Vec<f32> = (0..n_mels + 2)
            .map(|i| mel_to_hz(max_mel * i as f32 / (n_mels + 1) as f32))
            .collect();

        let filters = (0..n_mels)
            .map(|m| {
                let (lo, center, hi) = (edges[m], edges[m + 1], edges[m + 2]);
                let enorm = 2.0 / (hi - lo);

                let full: Vec<f32> = fft_freqs
                    .iter()
                    .map(|&f| {
                        let rising = (f - lo) / (center - lo);
                        let falling = (hi - f) / (hi - center);
                        rising.min(falling).max(0.0) * enorm
                    })
                    .collect();

                let start_bin = full.iter().position(|&w| w > 0.0).unwrap_or(0);
                let end_bin = full
                    .iter()
                    .rposition(|&w| w > 0.0)
                    .map_or(start_bin, |i| i + 1);

                MelFilter {
                    start_bin,
                    weights: full[start_bin..end_bin].to_vec(),
                }
            })
            .collect();

        Self { filters, n_fft_bins }
    }

    pub fn n_mels(&self) -> usize {
        self.filters.len()
    }

    /// Projects one power-spectrum column onto the mel bands.
    pub fn apply(&self, power: &[f32], out: &mut [f32]) {
        debug_assert_eq!(power.len(), self.n_fft_bins);
        for (filter, slot) in self.filters.iter().zip(out.iter_mut()) {
            *slot = filter
                .weights
                .iter()
                .zip(&power[filter.start_bin..])
                .map(|(w, p)| w * p)
                .sum();
        }
    }
}
