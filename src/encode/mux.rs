use std::path::{Path, PathBuf};

use super::ffmpeg::{self, path_arg, FfmpegError};

#[derive(Clone, Debug)]
pub struct MuxSettings {
    pub program: String,
    pub video_codec: String,
    pub audio_codec: String,
    pub audio_bitrate: String,
}

impl Default for MuxSettings {
    fn default() -> Self {
        Self {
            program: "ffmpeg".into(),
            video_codec: "libx264".into(),
            audio_codec: "aac".into(),
            audio_bitrate: "192k".into(),
        }
    }
}

/// Silent intermediate video that is deleted when dropped.
///
/// Sits next to the final output as `<stem>.silent.mp4` and is overwritten
/// by the next run if a crash ever leaves it behind.
pub struct TempVideo {
    path: PathBuf,
}

impl TempVideo {
    pub fn beside(output: &Path) -> Self {
        let stem = output
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "output".to_string());
        Self {
            path: output.with_file_name(format!("{}.silent.mp4", stem)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempVideo {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => log::debug!("Removed {}", self.path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => log::warn!("Failed to remove {}: {}", self.path.display(), e),
        }
    }
}

/// Attaches `audio` to the silent `video`, padding or trimming the audio
/// track to exactly `duration_secs`.
pub fn mux_audio(
    settings: &MuxSettings,
    video: &Path,
    audio: &Path,
    output: &Path,
    duration_secs: f64,
) -> Result<(), FfmpegError> {
    let args = mux_args(settings, video, audio, output, duration_secs);
    ffmpeg::run_to_completion(&settings.program, &args)?;
    log::info!("Muxed audio into {}", output.display());
    Ok(())
}

pub fn mux_args(settings: &MuxSettings, video: &Path, audio: &Path, output: &Path, duration_secs: f64) -> Vec<String> {
    vec![
        "-y".to_string(),
        "-i".into(), path_arg(video),
        "-i".into(), path_arg(audio),
        "-map".into(), "0:v:0".into(),
        "-map".into(), "1:a:0".into(),
        "-c:v".into(), settings.video_codec.clone(),
        "-c:a".into(), settings.audio_codec.clone(),
        "-b:a".into(), settings.audio_bitrate.clone(),
        "-af".into(), "apad".into(),
        "-t".into(), format!("{:.3}", duration_secs),
        path_arg(output),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn temp_video_sits_next_to_output() {
        let temp = TempVideo::beside(Path::new("renders/song.mp4"));
        assert_eq!(temp.path(), Path::new("renders/song.silent.mp4"));
    }

    #[test]
    fn temp_video_is_removed_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("clip.mp4");
        let path = {
            let temp = TempVideo::beside(&output);
            std::fs::write(temp.path(), b"frames").unwrap();
            temp.path().to_path_buf()
        };
        assert!(!path.exists());
    }

    #[test]
    fn dropping_unwritten_temp_video_is_quiet() {
        let dir = tempfile::tempdir().unwrap();
        drop(TempVideo::beside(&dir.path().join("never.mp4")));
    }

    #[test]
    fn mux_args_trim_audio_to_video_duration() {
        let args = mux_args(
            &MuxSettings::default(),
            Path::new("a.silent.mp4"),
            Path::new("song.m4a"),
            Path::new("a.mp4"),
            61.0 / 30.0,
        );
        let joined = args.join(" ");
        assert!(joined.contains("-i a.silent.mp4 -i song.m4a"));
        assert!(joined.contains("-map 0:v:0 -map 1:a:0"));
        assert!(joined.contains("-c:v libx264 -c:a aac"));
        assert!(joined.contains("-af apad -t 2.033"));
        assert!(joined.ends_with("a.mp4"));
    }

    #[test]
    fn mux_failure_is_reported() {
        let settings = MuxSettings {
            program: "definitely-not-an-ffmpeg-binary".into(),
            ..MuxSettings::default()
        };
        let err = mux_audio(&settings, Path::new("v.mp4"), Path::new("a.wav"), Path::new("o.mp4"), 1.0)
            .unwrap_err();
        assert!(matches!(err, FfmpegError::Spawn { .. }));
    }
}
