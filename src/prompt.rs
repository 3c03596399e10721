use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use crate::error::VisualizerError;

/// Audio file extensions accepted as input, matched case-insensitively.
pub const SUPPORTED_EXTENSIONS: [&str; 3] = ["wav", "mp3", "m4a"];

/// Checks that `path` exists and has a supported audio extension.
pub fn validate_audio_path(path: &Path) -> Result<(), VisualizerError> {
    if !path.exists() {
        return Err(VisualizerError::InputNotFound(path.to_path_buf()));
    }
    let supported = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| SUPPORTED_EXTENSIONS.iter().any(|s| e.eq_ignore_ascii_case(s)))
        .unwrap_or(false);
    if !supported {
        return Err(VisualizerError::UnsupportedFormat(path.to_path_buf()));
    }
    Ok(())
}

/// Asks for an audio file until a valid one is given.
///
/// Returns `None` if the input ends before a valid path was entered.
pub fn prompt_for_audio<R: BufRead, W: Write>(input: &mut R, out: &mut W) -> io::Result<Option<PathBuf>> {
    writeln!(out, "\nspectrovid: audio spectrogram video renderer")?;
    writeln!(out, "Supported formats: {}", supported_list())?;

    let mut line = String::new();
    loop {
        write!(out, "\nAudio file path: ")?;
        out.flush()?;

        line.clear();
        if input.read_line(&mut line)? == 0 {
            writeln!(out)?;
            return Ok(None);
        }

        let path = PathBuf::from(unquote(line.trim()));
        match validate_audio_path(&path) {
            Ok(()) => return Ok(Some(path)),
            Err(e) => writeln!(out, "Error: {}. Please try again.", e)?,
        }
    }
}

fn supported_list() -> String {
    SUPPORTED_EXTENSIONS
        .iter()
        .map(|e| format!(".{}", e))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Strips one pair of matching quotes, as left by drag-and-drop into a terminal.
fn unquote(s: &str) -> &str {
    for q in ['"', '\''] {
        if s.len() >= 2 && s.starts_with(q) && s.ends_with(q) {
            return &s[1..s.len() - 1];
        }
    }
    s
}
