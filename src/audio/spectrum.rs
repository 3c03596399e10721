use rayon::prelude::*;
use rustfft::{num_complex::Complex, FftPlanner};
use serde::Deserialize;

use super::decode::AudioSignal;
use super::mel::MelFilterbank;
use crate::error::VisualizerError;

const AMPLITUDE_FLOOR: f32 = 1e-5;
const POWER_FLOOR: f32 = 1e-10;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Transform {
    /// STFT magnitude in dB
    Stft,
    /// Mel-filterbank power in dB
    Mel,
}

#[derive(Clone, Debug)]
pub struct AnalysisSettings {
    pub transform: Transform,
    pub fps: u32,
    pub n_fft: usize,
    pub n_mels: usize,
    pub top_db: f32,
    /// Rate the input is resampled to before analysis.
    pub sample_rate: u32,
}

/// Decibel-scaled time/frequency energy, one column per video frame.
///
/// Values are relative to the loudest cell, so the maximum is 0 dB and
/// nothing is quieter than `-top_db`.
#[derive(Clone, Debug)]
pub struct SpectralMatrix {
    bins: usize,
    frames: usize,
    /// Column-major: `values[frame * bins + bin]`
    values: Vec<f32>,
    hop_length: usize,
    sample_rate: u32,
}

impl SpectralMatrix {
    pub fn from_columns(bins: usize, columns: Vec<Vec<f32>>, hop_length: usize, sample_rate: u32) -> Self {
        let frames = columns.len();
        let mut values = Vec::with_capacity(bins * frames);
        for column in columns {
            debug_assert_eq!(column.len(), bins);
            values.extend(column);
        }
        Self {
            bins,
            frames,
            values,
            hop_length,
            sample_rate,
        }
    }

    pub fn bins(&self) -> usize {
        self.bins
    }

    pub fn frames(&self) -> usize {
        self.frames
    }

    pub fn hop_length(&self) -> usize {
        self.hop_length
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn column(&self, frame: usize) -> &[f32] {
        let start = frame * self.bins;
        &self.values[start..start + self.bins]
    }

    /// `(min, max)` over every cell, `(0, 0)` when empty.
    pub fn value_range(&self) -> (f32, f32) {
        if self.values.is_empty() {
            return (0.0, 0.0);
        }
        self.values
            .iter()
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)))
    }
}

pub fn hop_length(sample_rate: u32, fps: u32) -> Result<usize, VisualizerError> {
    if fps == 0 {
        return Err(VisualizerError::InvalidConfig("fps must be positive".into()));
    }
    let hop = (sample_rate / fps) as usize;
    if hop == 0 {
        return Err(VisualizerError::InvalidConfig(format!(
            "fps {} exceeds the sample rate {}",
            fps, sample_rate
        )));
    }
    Ok(hop)
}

pub fn analyze(audio: &AudioSignal, settings: &AnalysisSettings) -> Result<SpectralMatrix, VisualizerError> {
    if settings.n_fft < 2 || !settings.n_fft.is_power_of_two() {
        return Err(VisualizerError::InvalidConfig(format!(
            "n_fft must be a power of two, got {}",
            settings.n_fft
        )));
    }
    if settings.transform == Transform::Mel && settings.n_mels == 0 {
        return Err(VisualizerError::InvalidConfig("n_mels must be positive".into()));
    }

    let hop = hop_length(audio.sample_rate, settings.fps)?;
    let n_fft = settings.n_fft;
    let n_frames = 1 + audio.samples.len() / hop;

    log::info!(
        "Spectrogram: {:?}, n_fft={}, hop={} ({} fps), {} frames",
        settings.transform, n_fft, hop, settings.fps, n_frames
    );

    let mut planner = FftPlanner::<f32>::new();
    let fft = planner.plan_fft_forward(n_fft);
    let window = hann_window(n_fft);
    let half = n_fft / 2 + 1;

    let mel_bank = match settings.transform {
        Transform::Mel => Some(MelFilterbank::new(audio.sample_rate, n_fft, settings.n_mels)),
        Transform::Stft => None,
    };

    let columns: Vec<Vec<f32>> = (0..n_frames)
        .into_par_iter()
        .map(|frame_idx| {
            let mut buffer = centered_frame(&audio.samples, frame_idx * hop, &window);
            fft.process(&mut buffer);

            let spectrum = &buffer[..half];
            match &mel_bank {
                Some(bank) => {
                    let power: Vec<f32> = spectrum.iter().map(|c| c.norm_sqr()).collect();
                    let mut mel = vec![0.0f32; bank.n_mels()];
                    bank.apply(&power, &mut mel);
                    mel
                }
                None => spectrum.iter().map(|c| c.norm()).collect(),
            }
        })
        .collect();

    let bins = mel_bank.as_ref().map_or(half, |b| b.n_mels());
    let mut matrix = SpectralMatrix::from_columns(bins, columns, hop, audio.sample_rate);

    match settings.transform {
        Transform::Stft => amplitude_to_db(&mut matrix.values, settings.top_db),
        Transform::Mel => power_to_db(&mut matrix.values, settings.top_db),
    }

    Ok(matrix)
}

/// Windowed analysis frame whose center sits on `center`, zero-padded at both ends.
fn centered_frame(samples: &[f32], center: usize, window: &[f32]) -> Vec<Complex<f32>> {
    let n_fft = window.len();
    let half = (n_fft / 2) as isize;
    (0..n_fft)
        .map(|i| {
            let idx = center as isize - half + i as isize;
            let s = if idx >= 0 && (idx as usize) < samples.len() {
                samples[idx as usize]
            } else {
                0.0
            };
            Complex::new(s * window[i], 0.0)
        })
        .collect()
}

/// `20·log10(|X| / peak)`, floored at `max - top_db`.
pub fn amplitude_to_db(values: &mut [f32], top_db: f32) {
    to_db(values, 20.0, AMPLITUDE_FLOOR, top_db);
}

/// `10·log10(P / peak)`, floored at `max - top_db`.
pub fn power_to_db(values: &mut [f32], top_db: f32) {
    to_db(values, 10.0, POWER_FLOOR, top_db);
}

fn to_db(values: &mut [f32], scale: f32, floor: f32, top_db: f32) {
    let peak = values.iter().copied().fold(0.0f32, f32::max);
    let reference = scale * peak.max(floor).log10();

    let mut max_db = f32::NEG_INFINITY;
    for v in values.iter_mut() {
        *v = scale * v.max(floor).log10() - reference;
        max_db = max_db.max(*v);
    }

    let floor_db = max_db - top_db;
    for v in values.iter_mut() {
        *v = v.max(floor_db);
    }
}

/// Periodic Hann window (DFT-even), matching the usual STFT convention.
fn hann_window(size: usize) -> Vec<f32> {
    (0..size)
        .map(|i| 0.5 * (1.0 - (2.0 * std::f32::consts::PI * i as f32 / size as f32).cos()))
        .collect()
}
