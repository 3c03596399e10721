use std::f32::consts::PI;

use serde::Deserialize;

use super::canvas::{Canvas, PlotArea};
use super::palette::{self, Rgb};
use super::{FrameOutcome, FrameSource, RenderConfig};
use crate::audio::spectrum::SpectralMatrix;

/// Number of x samples per curve, spread evenly over `[0, X_SPAN]`.
pub const WAVE_SAMPLES: usize = 100;
pub const X_SPAN: f32 = 100.0;
/// Vertical offset between the stacked glow strokes of one wave.
pub const TIER_OFFSET: f32 = 0.1;

const SHADOW_ALPHA: f32 = 0.2;
const SHADOW_DARKEN: f32 = 0.3;
const OUTLINE_ALPHA: f32 = 0.1;
const OUTLINE_EXTRA_PT: f32 = 1.0;

/// One stroke of a glowing curve: line width in points and its opacity.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
pub struct GlowTier {
    pub width: f32,
    pub alpha: f32,
}

/// A polyline in data coordinates, labeled with its wave group and glow tier.
#[derive(Clone, Debug, PartialEq)]
pub struct Curve {
    pub group: usize,
    pub tier: usize,
    pub points: Vec<(f32, f32)>,
}

/// `linspace(0, X_SPAN, WAVE_SAMPLES)`, endpoints included.
pub fn x_domain() -> Vec<f32> {
    let step = X_SPAN / (WAVE_SAMPLES - 1) as f32;
    (0..WAVE_SAMPLES).map(|i| i as f32 * step).collect()
}

/// Min-max normalizes a column to `[0, 1]`.
///
/// A constant column (silence) or one containing non-finite values has no
/// usable range and normalizes to all zeros.
pub fn normalize_column(column: &[f32]) -> Vec<f32> {
    let (lo, hi) = column
        .iter()
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    let span = hi - lo;
    if !span.is_finite() || span <= 0.0 || column.iter().any(|v| !v.is_finite()) {
        return vec![0.0; column.len()];
    }
    column.iter().map(|&v| (v - lo) / span).collect()
}

/// Sum of three harmonics for wave group `index` at `tick`, sampled on `xs`.
///
/// Amplitude is twice the column's mean energy; each harmonic doubles the
/// spatial frequency, halves the amplitude and drifts twice as fast.
pub fn wave(normalized: &[f32], tick: usize, index: usize, xs: &[f32]) -> Vec<f32> {
    let amplitude = if normalized.is_empty() {
        0.0
    } else {
        normalized.iter().sum::<f32>() / normalized.len() as f32 * 2.0
    };
    let base_freq = 2.0 * PI / X_SPAN;
    let harmonic = (index + 1) as f32;
    let t = tick as f32;

    xs.iter()
        .map(|&x| {
            amplitude * (x * base_freq * harmonic + t / 10.0).sin()
                + amplitude / 2.0 * (x * base_freq * 2.0 * harmonic + t / 5.0).sin()
                + amplitude / 4.0 * (x * base_freq * 4.0 * harmonic + t / 2.5).sin()
        })
        .collect()
}

/// All curves for one tick: `groups` waves, each stacked `tiers` times.
pub fn frame_curves(column: &[f32], tick: usize, groups: usize, tiers: usize) -> Vec<Curve> {
    let normalized = normalize_column(column);
    let xs = x_domain();
    let mut curves = Vec::with_capacity(groups * tiers);
    for group in 0..groups {
        let ys = wave(&normalized, tick, group, &xs);
        for tier in 0..tiers {
            let lift = TIER_OFFSET * tier as f32;
            curves.push(Curve {
                group,
                tier,
                points: xs.iter().zip(&ys).map(|(&x, &y)| (x, y + lift)).collect(),
            });
        }
    }
    curves
}

/// Three neon waves whose amplitude follows each column's spectral energy.
pub struct WaveformRenderer {
    matrix: SpectralMatrix,
    colors: Vec<Rgb>,
    tiers: Vec<GlowTier>,
    area: PlotArea,
    px_per_pt: f32,
}

impl WaveformRenderer {
    pub fn new(matrix: SpectralMatrix, config: &RenderConfig) -> Self {
        Self {
            matrix,
            colors: config.wave_colors.clone(),
            tiers: config.glow_tiers.clone(),
            area: PlotArea::with_default_margins(config.width, config.height, config.x_limits, config.y_limits),
            px_per_pt: config.dpi / 72.0,
        }
    }

    fn stroke(&self, canvas: &mut Canvas, curve: &Curve) {
        let color = self.colors[curve.group];
        let tier = self.tiers[curve.tier];
        let width = tier.width * self.px_per_pt;
        let points: Vec<(f32, f32)> = curve
            .points
            .iter()
            .map(|&(x, y)| self.area.to_pixel(x, y))
            .collect();

        canvas.stroke_polyline(&points, width, palette::darken(color, SHADOW_DARKEN), SHADOW_ALPHA);
        canvas.stroke_polyline(
            &points,
            width + OUTLINE_EXTRA_PT * self.px_per_pt,
            palette::WHITE,
            OUTLINE_ALPHA,
        );
        canvas.stroke_polyline(&points, width, color, tier.alpha);
    }
}

impl FrameSource for WaveformRenderer {
    fn render(&mut self, tick: usize, canvas: &mut Canvas) -> FrameOutcome {
        // Past the last column the previous frame stays on the canvas.
        if tick >= self.matrix.frames() {
            log::debug!("Tick {} is past the last spectral column, holding frame", tick);
            return FrameOutcome::Frozen;
        }

        canvas.clear(palette::BLACK);
        let curves = frame_curves(self.matrix.column(tick), tick, self.colors.len(), self.tiers.len());
        for curve in &curves {
            self.stroke(canvas, curve);
        }
        FrameOutcome::Drawn
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> RenderConfig {
        RenderConfig {
            width: 120,
            height: 80,
            dpi: 10.0,
            ..RenderConfig::default()
        }
    }

    #[test]
    fn x_domain_includes_both_ends() {
        let xs = x_domain();
        assert_eq!(xs.len(), 100);
        assert_eq!(xs[0], 0.0);
        assert!((xs[99] - 100.0).abs() < 1e-4);
    }

    #[test]
    fn normalize_maps_to_unit_range() {
        let n = normalize_column(&[-80.0, -40.0, 0.0]);
        assert_eq!(n, vec![0.0, 0.5, 1.0]);
    }

    #[test]
    fn silent_column_gives_flat_wave() {
        let n = normalize_column(&[0.0; 128]);
        assert!(n.iter().all(|&v| v == 0.0));

        let xs = x_domain();
        let ys = wave(&n, 17, 1, &xs);
        assert_eq!(ys.len(), 100);
        assert!(ys.iter().all(|&y| y == 0.0));
    }

    #[test]
    fn non_finite_column_does_not_produce_nan() {
        let n = normalize_column(&[f32::NEG_INFINITY, 0.0, -3.0]);
        assert!(n.iter().all(|v| v.is_finite()));
        let ys = wave(&n, 0, 0, &x_domain());
        assert!(ys.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn wave_is_deterministic() {
        let n = normalize_column(&[-60.0, -20.0, -5.0, 0.0]);
        let xs = x_domain();
        assert_eq!(wave(&n, 42, 2, &xs), wave(&n, 42, 2, &xs));
    }

    #[test]
    fn wave_matches_harmonic_formula() {
        // mean = 0.5, so amplitude = 1
        let n = [0.0, 1.0];
        let ys = wave(&n, 10, 0, &[25.0]);
        let base = 2.0 * PI / 100.0;
        let expected = (25.0 * base + 1.0).sin()
            + 0.5 * (25.0 * base * 2.0 + 2.0).sin()
            + 0.25 * (25.0 * base * 4.0 + 4.0).sin();
        assert!((ys[0] - expected).abs() < 1e-5);
    }

    #[test]
    fn tiers_are_stacked_by_offset() {
        let curves = frame_curves(&[-10.0, 0.0], 3, 3, 3);
        assert_eq!(curves.len(), 9);
        let base = &curves[3];
        let lifted = &curves[5];
        assert_eq!((base.group, base.tier), (1, 0));
        assert_eq!((lifted.group, lifted.tier), (1, 2));
        for (a, b) in base.points.iter().zip(&lifted.points) {
            assert_eq!(a.0, b.0);
            assert!((b.1 - a.1 - 0.2).abs() < 1e-5);
        }
    }

    #[test]
    fn renders_waves_then_freezes_past_the_end() {
        let columns = vec![vec![-80.0, -10.0, 0.0], vec![-80.0, -80.0, 0.0]];
        let matrix = SpectralMatrix::from_columns(3, columns, 1, 1);
        let mut renderer = WaveformRenderer::new(matrix, &config());
        let mut canvas = Canvas::new(120, 80).unwrap();

        assert_eq!(renderer.render(1, &mut canvas), FrameOutcome::Drawn);
        let last = canvas.pixels().to_vec();
        assert!(last.chunks(4).any(|px| px[..3] != [0, 0, 0]));

        assert_eq!(renderer.render(2, &mut canvas), FrameOutcome::Frozen);
        assert_eq!(canvas.pixels(), &last[..]);
        assert_eq!(renderer.render(50, &mut canvas), FrameOutcome::Frozen);
        assert_eq!(canvas.pixels(), &last[..]);
    }
}
