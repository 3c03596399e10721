mod animate;
mod audio;
mod cli;
mod config;
mod encode;
mod error;
mod pipeline;
mod prompt;
mod render;

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

use audio::spectrum::AnalysisSettings;
use cli::Cli;
use config::Config;
use encode::ffmpeg::EncoderSettings;
use encode::mux::MuxSettings;
use error::VisualizerError;
use pipeline::RunOptions;
use render::{palette, RenderConfig, Style};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let cli = Cli::parse();

    let cfg = match config::find_config_path(cli.config.as_deref()) {
        Some(path) => match config::load_config(&path) {
            Ok(cfg) => {
                log::info!("Loaded config from {}", path.display());
                cfg
            }
            Err(err) => {
                log::warn!("{:#}", err);
                Config::default()
            }
        },
        None => Config::default(),
    };

    let input = match cli.input.clone() {
        Some(path) => path,
        None => {
            let stdin = std::io::stdin();
            let mut stdout = std::io::stdout();
            match prompt::prompt_for_audio(&mut stdin.lock(), &mut stdout)? {
                Some(path) => path,
                None => return Ok(()),
            }
        }
    };

    println!("\nProcessing {}... please wait.", input.display());

    let result = resolve_options(&cli, &cfg, input).and_then(|opts| pipeline::run(&opts));
    match result {
        Ok(output) => {
            println!("\nDone! Visualization saved to '{}'", output.display());
            Ok(())
        }
        Err(err) => {
            println!("\nFailed to create visualization: {}", error::describe(&err));
            std::process::exit(if err.is_input_error() { 2 } else { 1 });
        }
    }
}

/// Merges CLI flags over the config file over the style's defaults.
fn resolve_options(cli: &Cli, cfg: &Config, input: PathBuf) -> Result<RunOptions, VisualizerError> {
    let style = cli.style.or(cfg.output.style).unwrap_or(Style::Heatmap);
    let fps = cli.fps.unwrap_or(cfg.output.fps);
    let width = cli.width.unwrap_or(cfg.output.width);
    let height = cli.height.unwrap_or(cfg.output.height);

    let wave_colors = cfg
        .waveform
        .colors
        .iter()
        .map(|c| {
            palette::parse_hex(c)
                .ok_or_else(|| VisualizerError::InvalidConfig(format!("bad color {:?}, expected #RRGGBB", c)))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let render = RenderConfig {
        width,
        height,
        dpi: cfg.output.dpi,
        fps,
        wave_colors,
        glow_tiers: cfg.waveform.glow.clone(),
        colorbar: cfg.heatmap.colorbar && !cli.no_colorbar,
        ..RenderConfig::default()
    };

    let analysis = AnalysisSettings {
        transform: cli.transform.unwrap_or_else(|| style.default_transform()),
        fps,
        n_fft: cfg.analysis.n_fft,
        n_mels: cfg.analysis.n_mels,
        top_db: cfg.analysis.top_db,
        sample_rate: cfg.analysis.sample_rate,
    };

    let bitrate = cli
        .bitrate
        .clone()
        .or_else(|| cfg.output.bitrate.clone())
        .or_else(|| style.default_bitrate().map(str::to_string));

    let encoder = EncoderSettings {
        program: cfg.output.ffmpeg.clone(),
        output: cli.output.clone(),
        width,
        height,
        fps,
        codec: cli.codec.clone().unwrap_or_else(|| cfg.output.codec.clone()),
        pix_fmt: cli.pix_fmt.clone().unwrap_or_else(|| cfg.output.pix_fmt.clone()),
        crf: cli.crf.unwrap_or(cfg.output.crf),
        bitrate,
    };

    let mux = cli
        .mux_choice()
        .unwrap_or_else(|| style.muxes_audio_by_default())
        .then(|| MuxSettings {
            program: cfg.output.ffmpeg.clone(),
            ..MuxSettings::default()
        });

    log::info!("Input: {}", input.display());
    log::info!("Output: {}", cli.output.display());
    log::info!("Style: {:?} ({:?}), {}x{} @ {}fps", style, analysis.transform, width, height, fps);

    Ok(RunOptions {
        input,
        output: cli.output.clone(),
        style,
        analysis,
        render,
        encoder,
        mux,
        show_progress: !cli.no_progress,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use audio::spectrum::Transform;

    fn resolve(args: &[&str], toml: &str) -> Result<RunOptions, VisualizerError> {
        let mut argv = vec!["spectrovid"];
        argv.extend_from_slice(args);
        let cli = Cli::parse_from(argv);
        let cfg: Config = toml::from_str(toml).unwrap();
        resolve_options(&cli, &cfg, PathBuf::from("song.wav"))
    }

    #[test]
    fn heatmap_is_the_silent_default() {
        let opts = resolve(&[], "").unwrap();
        assert_eq!(opts.style, Style::Heatmap);
        assert_eq!(opts.analysis.transform, Transform::Stft);
        assert!(opts.mux.is_none());
        assert_eq!(opts.encoder.bitrate, None);
        assert_eq!(opts.output, PathBuf::from("visualization.mp4"));
        assert_eq!((opts.render.width, opts.render.height), (1200, 800));
        assert_eq!(opts.analysis.sample_rate, 22050);
    }

    #[test]
    fn waveform_defaults_to_mel_with_audio() {
        let opts = resolve(&["-s", "waveform"], "").unwrap();
        assert_eq!(opts.analysis.transform, Transform::Mel);
        assert!(opts.mux.is_some());
        assert_eq!(opts.encoder.bitrate.as_deref(), Some("5000k"));
    }

    #[test]
    fn cli_beats_config_beats_defaults() {
        let toml = "[output]\nstyle = \"waveform\"\nfps = 24\nwidth = 640\n";
        let opts = resolve(&["--fps", "60", "--silent"], toml).unwrap();
        assert_eq!(opts.style, Style::Waveform);
        assert_eq!(opts.render.fps, 60);
        assert_eq!(opts.analysis.fps, 60);
        assert_eq!(opts.render.width, 640);
        assert!(opts.mux.is_none());
    }

    #[test]
    fn bad_color_is_invalid_config() {
        let err = resolve(&[], "[waveform]\ncolors = [\"purple\"]\n").unwrap_err();
        assert!(matches!(err, VisualizerError::InvalidConfig(_)));
    }

    #[test]
    fn no_colorbar_flag_wins() {
        let opts = resolve(&["--no-colorbar"], "").unwrap();
        assert!(!opts.render.colorbar);
    }
}
