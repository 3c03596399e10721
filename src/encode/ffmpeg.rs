use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};

use thiserror::Error;

use crate::animate::FrameSink;

#[derive(Debug, Error)]
pub enum FfmpegError {
    #[error("failed to spawn `{program}` (is ffmpeg installed?)")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write frame to ffmpeg")]
    Pipe(#[source] std::io::Error),

    #[error("failed to wait for ffmpeg")]
    Wait(#[source] std::io::Error),

    #[error("ffmpeg exited with {status}:\n{stderr}")]
    Failed { status: ExitStatus, stderr: String },
}

/// How the rendered frames are turned into a video stream.
#[derive(Clone, Debug)]
pub struct EncoderSettings {
    pub program: String,
    pub output: PathBuf,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub codec: String,
    pub pix_fmt: String,
    pub crf: u32,
    /// When set, uses `-b:v` instead of `-crf`.
    pub bitrate: Option<String>,
}

/// Silent video encoder fed raw RGBA frames over ffmpeg's stdin.
pub struct FfmpegEncoder {
    child: Option<Child>,
}

impl FfmpegEncoder {
    pub fn new(settings: &EncoderSettings) -> Result<Self, FfmpegError> {
        let child = Command::new(&settings.program)
            .args(encoder_args(settings))
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| FfmpegError::Spawn {
                program: settings.program.clone(),
                source,
            })?;

        log::info!(
            "FFmpeg encoder started: {}x{} @ {}fps, codec={}",
            settings.width,
            settings.height,
            settings.fps,
            settings.codec
        );

        Ok(Self { child: Some(child) })
    }

    pub fn finish(mut self) -> Result<(), FfmpegError> {
        let Some(mut child) = self.child.take() else {
            return Ok(());
        };

        // Close stdin to signal EOF
        drop(child.stdin.take());

        let output = child.wait_with_output().map_err(FfmpegError::Wait)?;
        check_status(output.status, &output.stderr)?;

        log::info!("FFmpeg encoding complete");
        Ok(())
    }
}

impl FrameSink for FfmpegEncoder {
    type Error = FfmpegError;

    fn write_frame(&mut self, rgba_pixels: &[u8]) -> Result<(), FfmpegError> {
        let stdin = self
            .child
            .as_mut()
            .and_then(|c| c.stdin.as_mut())
            .ok_or_else(|| FfmpegError::Pipe(std::io::ErrorKind::BrokenPipe.into()))?;
        stdin.write_all(rgba_pixels).map_err(FfmpegError::Pipe)
    }
}

impl Drop for FfmpegEncoder {
    fn drop(&mut self) {
        // Only reached without finish(), i.e. on an error path.
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

pub fn encoder_args(settings: &EncoderSettings) -> Vec<String> {
    let mut args = vec![
        "-y".to_string(),
        "-f".into(), "rawvideo".into(),
        "-pixel_format".into(), "rgba".into(),
        "-video_size".into(), format!("{}x{}", settings.width, settings.height),
        "-framerate".into(), settings.fps.to_string(),
        "-i".into(), "pipe:0".into(),
        "-c:v".into(), settings.codec.clone(),
        "-pix_fmt".into(), settings.pix_fmt.clone(),
    ];

    if let Some(ref br) = settings.bitrate {
        args.extend(["-b:v".to_string(), br.clone()]);
    } else {
        args.extend(["-crf".to_string(), settings.crf.to_string()]);
        args.extend(["-preset".to_string(), "medium".to_string()]);
    }

    args.extend(["-an".to_string(), path_arg(&settings.output)]);
    args
}

/// Runs a one-shot ffmpeg command to completion.
pub fn run_to_completion(program: &str, args: &[String]) -> Result<(), FfmpegError> {
    log::debug!("Running {} {}", program, args.join(" "));
    let output = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .output()
        .map_err(|source| FfmpegError::Spawn {
            program: program.to_string(),
            source,
        })?;
    check_status(output.status, &output.stderr)
}

fn check_status(status: ExitStatus, stderr: &[u8]) -> Result<(), FfmpegError> {
    if status.success() {
        return Ok(());
    }
    Err(FfmpegError::Failed {
        status,
        stderr: String::from_utf8_lossy(stderr).into_owned(),
    })
}

pub(crate) fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
