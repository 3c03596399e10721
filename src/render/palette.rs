pub type Rgb = [u8; 3];

pub const BLACK: Rgb = [0, 0, 0];
pub const WHITE: Rgb = [255, 255, 255];

/// Control points sampled from matplotlib's `magma` colormap.
const MAGMA_STOPS: [(f32, [f32; 3]); 10] = [
    (0.000, [0.001462, 0.000466, 0.013866]),
    (0.125, [0.078815, 0.054184, 0.211667]),
    (0.250, [0.232077, 0.059889, 0.437695]),
    (0.375, [0.390384, 0.100379, 0.501864]),
    (0.500, [0.550287, 0.161158, 0.505719]),
    (0.625, [0.716387, 0.214982, 0.475290]),
    (0.750, [0.868793, 0.287728, 0.409303]),
    (0.875, [0.967671, 0.439703, 0.359810]),
    (0.9375, [0.994738, 0.624350, 0.427397]),
    (1.000, [0.987053, 0.991438, 0.749504]),
];

/// Magma color for `t` in `[0, 1]`; out-of-range values are clamped.
pub fn magma(t: f32) -> Rgb {
    let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.0 };
    let upper = MAGMA_STOPS
        .iter()
        .position(|&(pos, _)| pos >= t)
        .unwrap_or(MAGMA_STOPS.len() - 1)
        .max(1);
    let (p0, c0) = MAGMA_STOPS[upper - 1];
    let (p1, c1) = MAGMA_STOPS[upper];
    let f = ((t - p0) / (p1 - p0)).clamp(0.0, 1.0);

    let mut out = [0u8; 3];
    for ch in 0..3 {
        let v = c0[ch] + (c1[ch] - c0[ch]) * f;
        out[ch] = (v * 255.0).round() as u8;
    }
    out
}

/// 256-entry lookup table for quantized palette indices.
pub fn magma_lut() -> Vec<Rgb> {
    (0..256).map(|i| magma(i as f32 / 255.0)).collect()
}

/// Parses `#RRGGBB` (the leading `#` is optional).
pub fn parse_hex(s: &str) -> Option<Rgb> {
    let hex = s.trim().trim_start_matches('#');
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    Some([channel(0)?, channel(2)?, channel(4)?])
}

/// Scales a color toward black, used for drop shadows.
pub fn darken(color: Rgb, factor: f32) -> Rgb {
    color.map(|c| (c as f32 * factor).round().clamp(0.0, 255.0) as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hex_colors() {
        assert_eq!(parse_hex("#FF00FF"), Some([255, 0, 255]));
        assert_eq!(parse_hex("00ffff"), Some([0, 255, 255]));
        assert_eq!(parse_hex("#FF1493"), Some([255, 20, 147]));
        assert_eq!(parse_hex("#FFF"), None);
        assert_eq!(parse_hex("#GG0000"), None);
    }

    #[test]
    fn magma_endpoints_and_monotone_brightness() {
        assert_eq!(magma(0.0), [0, 0, 4]);
        assert_eq!(magma(1.0), [252, 253, 191]);
        assert_eq!(magma(-3.0), magma(0.0));
        assert_eq!(magma(f32::NAN), magma(0.0));

        let lut = magma_lut();
        assert_eq!(lut.len(), 256);
        let luma = |c: Rgb| c[0] as u32 + c[1] as u32 + c[2] as u32;
        assert!(luma(lut[0]) < luma(lut[128]));
        assert!(luma(lut[128]) < luma(lut[255]));
    }

    #[test]
    fn darken_scales_channels() {
        assert_eq!(darken([200, 100, 0], 0.5), [100, 50, 0]);
    }
}
