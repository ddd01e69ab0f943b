//! Color type and the small wave/contrast helpers the procedural shaders are built from.

/// Linear RGB color, nominally in [0, 1] per channel until output scaling.
pub type Color = palette::LinSrgb<f32>;

pub fn black() -> Color {
    Color::new(0.0, 0.0, 0.0)
}

pub fn white() -> Color {
    Color::new(1.0, 1.0, 1.0)
}

pub fn from_components(components: [f32; 3]) -> Color {
    Color::new(components[0], components[1], components[2])
}

pub fn scale(color: Color, factor: f32) -> Color {
    Color::new(color.red * factor, color.green * factor, color.blue * factor)
}

/// Cosine wave of the given period, shifted by `offset` periods and remapped to [minn, maxx].
pub fn cos(x: f64, offset: f64, period: f64, minn: f64, maxx: f64) -> f64 {
    let value = ((x / period - offset) * std::f64::consts::PI * 2.0).cos() / 2.0 + 0.5;
    value * (maxx - minn) + minn
}

/// Pushes `value` away from `center` by `mult`.
pub fn contrast(value: f64, center: f64, mult: f64) -> f64 {
    (value - center) * mult + center
}

/// Linear remap from [old_min, old_max] to [new_min, new_max]. Does not clamp.
pub fn remap(x: f64, old_min: f64, old_max: f64, new_min: f64, new_max: f64) -> f64 {
    let zero_to_one = (x - old_min) / (old_max - old_min);
    zero_to_one * (new_max - new_min) + new_min
}

#[cfg(test)]
pub(crate) fn nearly_equal(a: f64, b: f64, epsilon: f64) -> bool {
    let diff = (a - b).abs();

    if a == b {
        // shortcut, handles infinities
        true
    } else if a == 0.0 || b == 0.0 || (a.abs() + b.abs()) < f64::MIN_POSITIVE {
        // relative error is meaningless this close to zero
        diff < epsilon
    } else {
        diff / (a.abs() + b.abs()).min(f64::MAX) < epsilon
    }
}
