use crate::colorutils::{self, Color};
use crate::imagefield::{ImageField, CHANNELS};

fn sample_int(field: &ImageField, x: usize, y: usize) -> [f32; CHANNELS] {
    field.at(x % field.width(), y % field.height())
}

fn lerp(a: [f32; CHANNELS], b: [f32; CHANNELS], t: f32) -> [f32; CHANNELS] {
    let mut out = a;
    for i in 0..CHANNELS {
        out[i] = a[i] + (b[i] - a[i]) * t;
    }
    out
}

/// Bilinearly samples `field` at the continuous position `(fx, fy)`.
///
/// Positions outside `[0, width] x [0, height]` yield `None`. The right and
/// bottom neighbours wrap around, so sampling exactly on the far edge blends
/// towards the first row or column.
pub fn sample(field: &ImageField, fx: f64, fy: f64) -> Option<Color> {
    if !(0.0..=field.width() as f64).contains(&fx) {
        return None;
    }
    if !(0.0..=field.height() as f64).contains(&fy) {
        return None;
    }

    let ix = fx.floor();
    let iy = fy.floor();
    let (x, y) = (ix as usize, iy as usize);

    // Sample four points
    let aa = sample_int(field, x, y);
    let ba = sample_int(field, x + 1, y);
    let ab = sample_int(field, x, y + 1);
    let bb = sample_int(field, x + 1, y + 1);

    let tx = (fx - ix) as f32;
    let ca = lerp(aa, ba, tx);
    let cb = lerp(ab, bb, tx);

    Some(colorutils::from_components(lerp(ca, cb, (fy - iy) as f32)))
}
