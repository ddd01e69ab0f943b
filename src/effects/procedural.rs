use rand::rngs::StdRng;
use rand::Rng;

use crate::colorutils::{contrast, cos, remap, Color};
use crate::effects::{FrameContext, LightingEffect};
use crate::layout::Coordinate;

const TWINKLE_SPEED: f64 = 0.07;
const TWINKLE_DENSITY: f64 = 0.1;

/// Slow wave across the pixel index, dark most of the time.
fn fade_wave(t: f64, ii: usize, n_pixels: usize) -> f64 {
    cos(t - ii as f64 / n_pixels as f64, 0.0, 7.0, 0.0, 1.0).powi(20)
}

/// Moves every 7th pixel to a new location in color space.
fn pixel_shift(ii: usize, n: f64) -> [f64; 3] {
    if ii % 7 != 0 {
        return [0.0; 3];
    }

    [
        ((ii * 123) % 5) as f64 / n * 32.12,
        ((ii * 137) % 5) as f64 / n * 22.23,
        ((ii * 147) % 7) as f64 / n * 44.34,
    ]
}

/// Computes the color of one pixel.
///
/// * `t` - seconds since the animation started
/// * `wall_time` - wall-clock seconds, drives the twinkle phase
/// * `ii` - index of the pixel, starting at 0
/// * `n_pixels` - total number of pixels
/// * `random_value` - constant random value in [0, 1) for this pixel
///
/// Returns a color nominally in [0, 1] that can overshoot around twinkles.
pub fn pixel_color(
    t: f64,
    wall_time: f64,
    coordinate: &Coordinate,
    ii: usize,
    n_pixels: usize,
    random_value: f64,
) -> Color {
    let n = n_pixels.max(1) as f64;

    // moving stripes for x, y and z
    let Coordinate { mut x, mut y, mut z } = *coordinate;
    y += cos(x + 0.2 * z, 0.0, 1.0, 0.0, 0.6);
    z += cos(x, 0.0, 1.0, 0.0, 0.3);
    x += cos(y + z, 0.0, 1.5, 0.0, 0.2);

    // rotate
    let (mut x, mut y, mut z) = (y, z, x);

    let [dx, dy, dz] = pixel_shift(ii, n);
    x += dx;
    y += dy;
    z += dz;

    let channels = [x, y, z].map(|v| contrast(cos(v, t / 4.0, 2.0, 0.0, 1.0), 0.5, 1.5));

    let fade = fade_wave(t, ii, n_pixels.max(1));

    // twinkle occasional pixels, lined up with the fade wave
    let twinkle = (random_value * 7.0 + wall_time * TWINKLE_SPEED).rem_euclid(1.0);
    let twinkle = (twinkle * 2.0 - 1.0).abs();
    let twinkle = remap(twinkle, 0.0, 1.0, -1.0 / TWINKLE_DENSITY, 1.1).clamp(-0.5, 1.1);
    let twinkle = (twinkle.powi(5) * fade).clamp(-0.3, 1.0);

    let [r, g, b] = channels.map(|v| (v * fade + twinkle) as f32);
    Color::new(r, g, b)
}

/// Full-layout wave pattern with twinkles, replaces whatever is below it.
pub struct Procedural {
    random_values: Vec<f64>,
    t: f64,
    wall_time: f64,
}

impl Procedural {
    pub fn new(pixel_count: usize, mut rng: StdRng) -> Procedural {
        Procedural {
            random_values: (0..pixel_count).map(|_| rng.gen::<f64>()).collect(),
            t: 0.0,
            wall_time: 0.0,
        }
    }
}

impl LightingEffect for Procedural {
    fn name(&self) -> &str {
        "procedural"
    }

    fn begin_frame(&mut self, frame: &FrameContext) {
        self.t = frame.elapsed;
        self.wall_time = frame.wall_time;
    }

    fn shade(&mut self, _color: Color, coordinate: &Coordinate, index: usize) -> Option<Color> {
        let random_value = *self.random_values.get(index)?;
        Some(pixel_color(
            self.t,
            self.wall_time,
            coordinate,
            index,
            self.random_values.len(),
            random_value,
        ))
    }
}
