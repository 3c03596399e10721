use indicatif::{ProgressBar, ProgressStyle};

use crate::render::canvas::Canvas;
use crate::render::{FrameOutcome, FrameSource};

/// Consumer of finished RGBA frames, in presentation order.
pub trait FrameSink {
    type Error;

    fn write_frame(&mut self, rgba_pixels: &[u8]) -> Result<(), Self::Error>;
}

/// Summary of a completed animation run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AnimationStats {
    pub frames_written: usize,
    pub frozen_frames: usize,
}

/// Fixed-rate sequencer: one render and one sink write per tick, in order.
pub struct Animation {
    total_frames: usize,
    fps: u32,
    show_progress: bool,
}

impl Animation {
    pub fn new(total_frames: usize, fps: u32) -> Self {
        Self {
            total_frames,
            fps,
            show_progress: true,
        }
    }

    pub fn without_progress(mut self) -> Self {
        self.show_progress = false;
        self
    }

    pub fn total_frames(&self) -> usize {
        self.total_frames
    }

    /// Playback length of the produced frame sequence.
    pub fn duration_secs(&self) -> f64 {
        self.total_frames as f64 / self.fps as f64
    }

    pub fn run<S, K>(&self, source: &mut S, canvas: &mut Canvas, sink: &mut K) -> Result<AnimationStats, K::Error>
    where
        S: FrameSource + ?Sized,
        K: FrameSink + ?Sized,
    {
        let pb = if self.show_progress {
            let pb = ProgressBar::new(self.total_frames as u64);
            if let Ok(style) = ProgressStyle::default_bar()
                .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} frames ({eta} remaining)")
            {
                pb.set_style(style.progress_chars("=>-"));
            }
            pb
        } else {
            ProgressBar::hidden()
        };

        let mut stats = AnimationStats {
            frames_written: 0,
            frozen_frames: 0,
        };

        for tick in 0..self.total_frames {
            if source.render(tick, canvas) == FrameOutcome::Frozen {
                stats.frozen_frames += 1;
            }
            sink.write_frame(canvas.pixels())?;
            stats.frames_written += 1;
            pb.set_position(tick as u64 + 1);
        }

        pb.finish_with_message("Rendering complete");
        Ok(stats)
    }
}
