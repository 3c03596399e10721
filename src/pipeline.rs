use std::path::{Path, PathBuf};

use crate::animate::{Animation, AnimationStats};
use crate::audio::decode::load_audio;
use crate::audio::spectrum::{analyze, AnalysisSettings};
use crate::encode::ffmpeg::{EncoderSettings, FfmpegEncoder, FfmpegError};
use crate::encode::mux::{mux_audio, MuxSettings, TempVideo};
use crate::error::VisualizerError;
use crate::prompt::validate_audio_path;
use crate::render::canvas::Canvas;
use crate::render::heatmap::HeatmapRenderer;
use crate::render::waveform::WaveformRenderer;
use crate::render::{FrameSource, RenderConfig, Style};

/// Everything one render needs, fully resolved from CLI, config and defaults.
#[derive(Clone, Debug)]
pub struct RunOptions {
    pub input: PathBuf,
    pub output: PathBuf,
    pub style: Style,
    pub analysis: AnalysisSettings,
    pub render: RenderConfig,
    /// `output` is ignored; the pipeline decides where frames are encoded to.
    pub encoder: EncoderSettings,
    /// `None` produces a silent video.
    pub mux: Option<MuxSettings>,
    pub show_progress: bool,
}

/// Renderer ready to be driven, plus the animation that drives it.
pub struct PreparedRender {
    pub animation: Animation,
    pub source: Box<dyn FrameSource>,
}

/// Load, analyze, render, encode and (optionally) mux. Returns the output path.
pub fn run(opts: &RunOptions) -> Result<PathBuf, VisualizerError> {
    let mut prepared = prepare(opts)?;

    let temp = opts.mux.as_ref().map(|_| TempVideo::beside(&opts.output));
    let video_path = temp.as_ref().map_or(opts.output.as_path(), |t| t.path());

    log::info!("Rendering {} frames...", prepared.animation.total_frames());
    let stats = encode_frames(&mut prepared, &opts.render, &opts.encoder, video_path)?;
    if stats.frozen_frames > 0 {
        log::info!("{} frames held past the end of the spectrogram", stats.frozen_frames);
    }

    if let Some(ref mux) = opts.mux {
        log::info!("Adding audio...");
        mux_audio(
            mux,
            video_path,
            &opts.input,
            &opts.output,
            prepared.animation.duration_secs(),
        )
        .map_err(VisualizerError::Mux)?;
    }

    log::info!("Video saved as {}", opts.output.display());
    Ok(opts.output.clone())
}

/// Decodes and analyzes the input, then builds the renderer for `opts.style`.
pub fn prepare(opts: &RunOptions) -> Result<PreparedRender, VisualizerError> {
    opts.render.validate()?;
    validate_audio_path(&opts.input)?;

    if opts.analysis.sample_rate == 0 {
        return Err(VisualizerError::InvalidConfig("sample_rate must be positive".into()));
    }

    log::info!("Loading audio file...");
    let audio = load_audio(&opts.input, opts.analysis.sample_rate)?;

    log::info!("Calculating spectrogram...");
    let matrix = analyze(&audio, &opts.analysis)?;
    let mut animation = Animation::new(matrix.frames(), opts.render.fps);
    if !opts.show_progress {
        animation = animation.without_progress();
    }

    log::info!(
        "Setting up {:?} visualization: {} frames x {} bins (hop {} @ {}Hz), {:.2}s",
        opts.style,
        matrix.frames(),
        matrix.bins(),
        matrix.hop_length(),
        matrix.sample_rate(),
        animation.duration_secs()
    );

    let source: Box<dyn FrameSource> = match opts.style {
        Style::Heatmap => Box::new(HeatmapRenderer::new(&matrix, &opts.render)),
        Style::Waveform => Box::new(WaveformRenderer::new(matrix, &opts.render)),
    };

    Ok(PreparedRender { animation, source })
}

fn encode_frames(
    prepared: &mut PreparedRender,
    render: &RenderConfig,
    settings: &EncoderSettings,
    video_path: &Path,
) -> Result<AnimationStats, VisualizerError> {
    let settings = EncoderSettings {
        output: video_path.to_path_buf(),
        ..settings.clone()
    };

    let mut canvas = Canvas::new(render.width, render.height).ok_or_else(|| {
        VisualizerError::InvalidConfig(format!("cannot draw a {}x{} frame", render.width, render.height))
    })?;
    let mut encoder = FfmpegEncoder::new(&settings).map_err(VisualizerError::Encode)?;

    match prepared
        .animation
        .run(prepared.source.as_mut(), &mut canvas, &mut encoder)
    {
        Ok(stats) => {
            encoder.finish().map_err(VisualizerError::Encode)?;
            Ok(stats)
        }
        Err(pipe_err) => {
            // A broken pipe usually means ffmpeg already exited; its stderr says why.
            let err = match encoder.finish() {
                Err(failed @ FfmpegError::Failed { .. }) => failed,
                _ => pipe_err,
            };
            Err(VisualizerError::Encode(err))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animate::FrameSink;
    use crate::audio::spectrum::Transform;
    use std::f32::consts::PI;

    #[derive(Default)]
    struct CountingSink {
        frames: usize,
        bytes_per_frame: usize,
    }

    impl FrameSink for CountingSink {
        type Error = std::convert::Infallible;

        fn write_frame(&mut self, rgba_pixels: &[u8]) -> Result<(), Self::Error> {
            self.frames += 1;
            self.bytes_per_frame = rgba_pixels.len();
            Ok(())
        }
    }

    fn write_sine_wav(path: &Path, sample_rate: u32, seconds: f32) {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        let n = (sample_rate as f32 * seconds) as usize;
        for i in 0..n {
            let s = (2.0 * PI * 440.0 * i as f32 / sample_rate as f32).sin();
            writer.write_sample((s * 0.5 * i16::MAX as f32) as i16).unwrap();
        }
        writer.finalize().unwrap();
    }

    fn options(input: PathBuf, style: Style) -> RunOptions {
        let render = RenderConfig {
            width: 64,
            height: 48,
            dpi: 10.0,
            ..RenderConfig::default()
        };
        RunOptions {
            output: input.with_extension("mp4"),
            input,
            style,
            analysis: AnalysisSettings {
                transform: style.default_transform(),
                fps: render.fps,
                n_fft: 2048,
                n_mels: 128,
                top_db: 80.0,
                sample_rate: 22050,
            },
            encoder: EncoderSettings {
                program: "definitely-not-an-ffmpeg-binary".into(),
                output: PathBuf::new(),
                width: render.width,
                height: render.height,
                fps: render.fps,
                codec: "libx264".into(),
                pix_fmt: "yuv420p".into(),
                crf: 18,
                bitrate: None,
            },
            render,
            mux: None,
            show_progress: false,
        }
    }

    #[test]
    fn two_second_sine_renders_one_frame_per_hop() {
        let dir = tempfile::tempdir().unwrap();
        let wav = dir.path().join("sine.wav");
        write_sine_wav(&wav, 22050, 2.0);

        for style in [Style::Heatmap, Style::Waveform] {
            let mut prepared = prepare(&options(wav.clone(), style)).unwrap();
            let mut canvas = Canvas::new(64, 48).unwrap();
            let mut sink = CountingSink::default();
            let stats = prepared
                .animation
                .run(prepared.source.as_mut(), &mut canvas, &mut sink)
                .unwrap();

            // hop = 22050 / 30 = 735; centered framing adds one column
            assert_eq!(sink.frames, 1 + 44100 / 735);
            assert_eq!(stats.frames_written, sink.frames);
            assert_eq!(stats.frozen_frames, 0);
            assert_eq!(sink.bytes_per_frame, 64 * 48 * 4);

            let video_secs = prepared.animation.duration_secs();
            assert!((video_secs - 2.0).abs() <= 1.0 / 30.0 + 1e-6);
        }
    }

    #[test]
    fn transform_override_is_honored() {
        let dir = tempfile::tempdir().unwrap();
        let wav = dir.path().join("sine.wav");
        write_sine_wav(&wav, 22050, 0.5);

        let mut opts = options(wav, Style::Waveform);
        opts.analysis.transform = Transform::Stft;
        let prepared = prepare(&opts).unwrap();
        assert_eq!(prepared.animation.total_frames(), 1 + 11025 / 735);
    }

    #[test]
    fn file_rate_does_not_change_the_frame_count() {
        let dir = tempfile::tempdir().unwrap();
        let wav = dir.path().join("cd.wav");
        write_sine_wav(&wav, 44100, 2.0);

        let prepared = prepare(&options(wav, Style::Heatmap)).unwrap();
        assert_eq!(prepared.animation.total_frames(), 61);
    }

    #[test]
    fn zero_sample_rate_is_invalid_config() {
        let dir = tempfile::tempdir().unwrap();
        let wav = dir.path().join("sine.wav");
        write_sine_wav(&wav, 8000, 0.1);

        let mut opts = options(wav, Style::Heatmap);
        opts.analysis.sample_rate = 0;
        assert!(matches!(prepare(&opts), Err(VisualizerError::InvalidConfig(_))));
    }

    #[test]
    fn failures_map_to_their_class() {
        let dir = tempfile::tempdir().unwrap();

        let missing = options(dir.path().join("missing.wav"), Style::Heatmap);
        assert!(matches!(run(&missing), Err(VisualizerError::InputNotFound(_))));

        let txt = dir.path().join("notes.txt");
        std::fs::write(&txt, b"la la la").unwrap();
        assert!(matches!(
            run(&options(txt, Style::Heatmap)),
            Err(VisualizerError::UnsupportedFormat(_))
        ));

        let corrupt = dir.path().join("corrupt.wav");
        std::fs::write(&corrupt, b"RIFF....WAVEjunk").unwrap();
        assert!(matches!(
            run(&options(corrupt, Style::Heatmap)),
            Err(VisualizerError::Decode(_))
        ));

        let wav = dir.path().join("ok.wav");
        write_sine_wav(&wav, 8000, 0.2);
        assert!(matches!(
            run(&options(wav.clone(), Style::Heatmap)),
            Err(VisualizerError::Encode(FfmpegError::Spawn { .. }))
        ));

        let mut odd = options(wav, Style::Heatmap);
        odd.render.width = 63;
        assert!(matches!(run(&odd), Err(VisualizerError::InvalidConfig(_))));
    }

    #[test]
    fn failed_muxed_run_leaves_no_temp_video() {
        let dir = tempfile::tempdir().unwrap();
        let wav = dir.path().join("clip.wav");
        write_sine_wav(&wav, 8000, 0.2);

        let mut opts = options(wav, Style::Waveform);
        opts.mux = Some(MuxSettings::default());
        assert!(run(&opts).is_err());
        assert!(!dir.path().join("clip.silent.mp4").exists());
    }
}
