use rubato::{Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction};

use super::decode::{AudioSignal, DecodeError};

/// Rate every analysis default (window length, mel range, hop) is tuned for.
pub const DEFAULT_SAMPLE_RATE: u32 = 22050;

const SINC_LEN: usize = 256;

/// Resamples mono audio to `target_rate` with a windowed-sinc interpolator.
///
/// The result has `round(len * target / source)` samples, time-aligned with
/// the input. Audio already at `target_rate` is returned unchanged.
pub fn resample(signal: AudioSignal, target_rate: u32) -> Result<AudioSignal, DecodeError> {
    if signal.sample_rate == target_rate {
        return Ok(signal);
    }
    let failed = |source: Box<dyn std::error::Error + Send + Sync>| DecodeError::Resample {
        rate: target_rate,
        source,
    };

    let params = SincInterpolationParameters {
        sinc_len: SINC_LEN,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };

    let ratio = target_rate as f64 / signal.sample_rate as f64;
    let expected = (signal.samples.len() as f64 * ratio).round() as usize;

    // Trailing zeros flush the filter's delay line in a single call.
    let mut input = signal.samples;
    input.resize(input.len() + 2 * SINC_LEN, 0.0);

    let mut resampler = SincFixedIn::<f32>::new(ratio, 1.0, params, input.len(), 1)
        .map_err(|e| failed(Box::new(e)))?;
    let delay = resampler.output_delay();

    let output = resampler
        .process(&[input], None)
        .map_err(|e| failed(Box::new(e)))?;
    let channel = output.into_iter().next().unwrap_or_default();

    let start = delay.min(channel.len());
    let end = (delay + expected).min(channel.len());
    let samples = channel[start..end].to_vec();

    log::info!(
        "Resampled {}Hz -> {}Hz ({} samples)",
        signal.sample_rate,
        target_rate,
        samples.len()
    );

    Ok(AudioSignal {
        samples,
        sample_rate: target_rate,
    })
}
