use super::canvas::{Canvas, PlotArea};
use super::palette::{self, Rgb};
use super::{FrameOutcome, FrameSource, RenderConfig};
use crate::audio::spectrum::SpectralMatrix;

/// Share of the plot width given up to the colorbar, and the gap before it.
const COLORBAR_FRACTION: f32 = 0.15;
const COLORBAR_PAD: f32 = 0.05;
/// Colorbar height-to-width ratio.
const COLORBAR_ASPECT: f32 = 20.0;

/// Cyclic left shift of a matrix's columns, expressed as an index mapping.
///
/// Screen column `j` at tick `t` shows source column `(j + t) mod n`, so the
/// spectrogram scrolls left and wraps around without copying any data.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScrollingView {
    columns: usize,
    offset: usize,
}

impl ScrollingView {
    pub fn at_tick(columns: usize, tick: usize) -> Self {
        let offset = if columns == 0 { 0 } else { tick % columns };
        Self { columns, offset }
    }

    pub fn source_column(&self, screen_column: usize) -> usize {
        (screen_column + self.offset) % self.columns
    }
}

#[derive(Clone, Copy, Debug)]
struct PixelRect {
    x: u32,
    y: u32,
    width: u32,
    height: u32,
}

impl PixelRect {
    fn from_f32(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x: x.round().max(0.0) as u32,
            y: y.round().max(0.0) as u32,
            width: width.round().max(1.0) as u32,
            height: height.round().max(1.0) as u32,
        }
    }
}

/// Scrolling spectrogram image with an optional palette colorbar.
pub struct HeatmapRenderer {
    bins: usize,
    frames: usize,
    /// Palette index per cell, same column-major layout as the matrix.
    levels: Vec<u8>,
    lut: Vec<Rgb>,
    heat: PixelRect,
    colorbar: Option<PixelRect>,
    /// Screen x → unshifted matrix column
    column_of_x: Vec<usize>,
    /// Screen y → frequency bin, low frequencies at the bottom
    bin_of_y: Vec<usize>,
}

impl HeatmapRenderer {
    pub fn new(matrix: &SpectralMatrix, config: &RenderConfig) -> Self {
        let area = PlotArea::with_default_margins(config.width, config.height, (0.0, 1.0), (0.0, 1.0));

        let (heat, colorbar) = if config.colorbar {
            let heat_w = area.width * (1.0 - COLORBAR_FRACTION - COLORBAR_PAD);
            let bar_x = area.x + area.width * (1.0 - COLORBAR_FRACTION);
            let bar_w = (area.height / COLORBAR_ASPECT).min(area.width * COLORBAR_FRACTION);
            (
                PixelRect::from_f32(area.x, area.y, heat_w, area.height),
                Some(PixelRect::from_f32(bar_x, area.y, bar_w, area.height)),
            )
        } else {
            (PixelRect::from_f32(area.x, area.y, area.width, area.height), None)
        };

        let (bins, frames) = (matrix.bins(), matrix.frames());
        let column_of_x = (0..heat.width as usize)
            .map(|sx| (sx * frames / heat.width as usize).min(frames.saturating_sub(1)))
            .collect();
        let bin_of_y = (0..heat.height as usize)
            .map(|sy| ((heat.height as usize - 1 - sy) * bins / heat.height as usize).min(bins.saturating_sub(1)))
            .collect();

        Self {
            bins,
            frames,
            levels: quantize(matrix),
            lut: palette::magma_lut(),
            heat,
            colorbar,
            column_of_x,
            bin_of_y,
        }
    }

    fn draw_colorbar(&self, canvas: &mut Canvas) {
        let Some(bar) = self.colorbar else {
            return;
        };
        for sy in 0..bar.height {
            let level = (bar.height - 1 - sy) as usize * 255 / (bar.height as usize - 1).max(1);
            canvas.fill_rect(bar.x as f32, (bar.y + sy) as f32, bar.width as f32, 1.0, self.lut[level]);
        }
    }
}

impl FrameSource for HeatmapRenderer {
    fn render(&mut self, tick: usize, canvas: &mut Canvas) -> FrameOutcome {
        canvas.clear(palette::BLACK);
        self.draw_colorbar(canvas);

        if self.frames == 0 || self.bins == 0 {
            return FrameOutcome::Drawn;
        }

        let view = ScrollingView::at_tick(self.frames, tick);
        let (max_x, max_y) = (canvas.width() as usize, canvas.height() as usize);

        for (sx, &col) in self.column_of_x.iter().enumerate() {
            let x = self.heat.x as usize + sx;
            if x >= max_x {
                break;
            }
            let start = view.source_column(col) * self.bins;
            let levels = &self.levels[start..start + self.bins];
            for (sy, &bin) in self.bin_of_y.iter().enumerate() {
                let y = self.heat.y as usize + sy;
                if y >= max_y {
                    break;
                }
                canvas.put(x, y, self.lut[levels[bin] as usize]);
            }
        }

        FrameOutcome::Drawn
    }
}

/// Maps every cell to a 0..=255 palette index across the matrix's value range.
fn quantize(matrix: &SpectralMatrix) -> Vec<u8> {
    let (lo, hi) = matrix.value_range();
    let span = hi - lo;
    let mut levels = Vec::with_capacity(matrix.bins() * matrix.frames());
    for frame in 0..matrix.frames() {
        levels.extend(matrix.column(frame).iter().map(|&v| {
            if span > 0.0 {
                ((v - lo) / span * 255.0).round().clamp(0.0, 255.0) as u8
            } else {
                0
            }
        }));
    }
    levels
}
