use tiny_skia::{Color, LineCap, LineJoin, Paint, PathBuilder, Pixmap, Rect, Stroke, Transform};

use super::palette::Rgb;

/// Fractions of the canvas used by the plot area (matplotlib's default subplot box).
const MARGIN_LEFT: f32 = 0.125;
const MARGIN_RIGHT: f32 = 0.9;
const MARGIN_BOTTOM: f32 = 0.11;
const MARGIN_TOP: f32 = 0.88;

/// Frame that renderers draw into, one per run.
///
/// Backed by a premultiplied `Pixmap` that is kept opaque everywhere, so its
/// bytes are also valid straight RGBA and can be piped to the encoder as-is.
pub struct Canvas {
    pixmap: Pixmap,
}

impl Canvas {
    /// `None` when either dimension is zero.
    pub fn new(width: u32, height: u32) -> Option<Self> {
        let mut pixmap = Pixmap::new(width, height)?;
        pixmap.fill(Color::BLACK);
        Some(Self { pixmap })
    }

    pub fn width(&self) -> u32 {
        self.pixmap.width()
    }

    pub fn height(&self) -> u32 {
        self.pixmap.height()
    }

    pub fn pixels(&self) -> &[u8] {
        self.pixmap.data()
    }

    #[cfg(test)]
    pub fn pixel(&self, x: u32, y: u32) -> Rgb {
        let px = self.pixmap.pixel(x, y).expect("pixel inside canvas");
        [px.red(), px.green(), px.blue()]
    }

    pub fn clear(&mut self, color: Rgb) {
        self.pixmap.fill(Color::from_rgba8(color[0], color[1], color[2], 255));
    }

    /// Overwrites one pixel; out-of-bounds writes are ignored.
    pub fn put(&mut self, x: usize, y: usize, color: Rgb) {
        let (w, h) = (self.width() as usize, self.height() as usize);
        if x >= w || y >= h {
            return;
        }
        let i = (y * w + x) * 4;
        self.pixmap.data_mut()[i..i + 3].copy_from_slice(&color);
    }

    /// Fills the rectangle `[x, x+w) × [y, y+h)`, clipped to the canvas.
    pub fn fill_rect(&mut self, x: f32, y: f32, w: f32, h: f32, color: Rgb) {
        let Some(rect) = Rect::from_xywh(x, y, w, h) else {
            return;
        };
        self.pixmap.fill_rect(rect, &paint(color, 1.0), Transform::identity(), None);
    }

    /// Strokes an anti-aliased polyline (pixel coordinates) with uniform alpha.
    ///
    /// The polyline is one path, so overlapping segments and joints are
    /// composited once. Non-finite points split it into separate subpaths.
    pub fn stroke_polyline(&mut self, points: &[(f32, f32)], width: f32, color: Rgb, alpha: f32) {
        if width <= 0.0 || alpha <= 0.0 {
            return;
        }

        let mut pb = PathBuilder::new();
        let mut prev: Option<(f32, f32)> = None;
        let mut in_subpath = false;
        for &(x, y) in points {
            if !(x.is_finite() && y.is_finite()) {
                prev = None;
                in_subpath = false;
                continue;
            }
            if let Some((px, py)) = prev {
                if !in_subpath {
                    pb.move_to(px, py);
                    in_subpath = true;
                }
                pb.line_to(x, y);
            }
            prev = Some((x, y));
        }
        let Some(path) = pb.finish() else {
            return;
        };

        // matplotlib's solid line defaults: projecting caps, round joins
        let stroke = Stroke {
            width,
            line_cap: LineCap::Square,
            line_join: LineJoin::Round,
            ..Stroke::default()
        };
        self.pixmap
            .stroke_path(&path, &paint(color, alpha), &stroke, Transform::identity(), None);
    }
}

fn paint(color: Rgb, alpha: f32) -> Paint<'static> {
    let a = (alpha.clamp(0.0, 1.0) * 255.0).round() as u8;
    let mut paint = Paint::default();
    paint.set_color_rgba8(color[0], color[1], color[2], a);
    paint.anti_alias = true;
    paint
}

/// Pixel rectangle of the plot area plus the data limits it displays.
#[derive(Clone, Copy, Debug)]
pub struct PlotArea {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub x_limits: (f32, f32),
    pub y_limits: (f32, f32),
}

impl PlotArea {
    pub fn with_default_margins(canvas_width: u32, canvas_height: u32, x_limits: (f32, f32), y_limits: (f32, f32)) -> Self {
        let (w, h) = (canvas_width as f32, canvas_height as f32);
        Self {
            x: w * MARGIN_LEFT,
            y: h * (1.0 - MARGIN_TOP),
            width: w * (MARGIN_RIGHT - MARGIN_LEFT),
            height: h * (MARGIN_TOP - MARGIN_BOTTOM),
            x_limits,
            y_limits,
        }
    }

    /// Data coordinates to pixel coordinates; y grows upward in data space.
    pub fn to_pixel(&self, x: f32, y: f32) -> (f32, f32) {
        let (x0, x1) = self.x_limits;
        let (y0, y1) = self.y_limits;
        let px = self.x + (x - x0) / (x1 - x0) * self.width;
        let py = self.y + (1.0 - (y - y0) / (y1 - y0)) * self.height;
        (px, py)
    }
}
