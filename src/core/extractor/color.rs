//! RGB to HSV conversion.

/// Convert an 8-bit RGB triple to `(hue_degrees, saturation)`.
///
/// Hue is in `[0, 360)`, saturation in `[0, 1]`. Value is dropped: the
/// HSV-mean fingerprint ignores brightness so lighting changes do not move it.
/// Greys (including black and white) map to `(0, 0)`.
pub fn rgb_to_hsv(r: u8, g: u8, b: u8) -> (f64, f64) {
    let r = r as f64 / 255.0;
    let g = g as f64 / 255.0;
    let b = b as f64 / 255.0;

    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let diff = max - min;

    let saturation = if max == 0.0 { 0.0 } else { diff / max };

    let hue = if diff == 0.0 {
        0.0
    } else if max == r {
        ((g - b) / diff + if g < b { 6.0 } else { 0.0 }) / 6.0
    } else if max == g {
        ((b - r) / diff + 2.0) / 6.0
    } else {
        ((r - g) / diff + 4.0) / 6.0
    };

    (hue * 360.0, saturation)
}
