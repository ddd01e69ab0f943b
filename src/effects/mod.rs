pub(crate) mod flash;
pub(crate) mod procedural;
pub(crate) mod sun;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::colorutils::Color;
use crate::config::EffectConfig;
use crate::imagefield::{self, ImageError};
use crate::layout::Coordinate;

/// Per-frame timing shared by all effects.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameContext {
    /// Frames rendered before this one.
    pub frame: u64,
    /// Wall-clock time in seconds since the Unix epoch.
    pub wall_time: f64,
    /// Seconds since the render loop started.
    pub elapsed: f64,
}

impl FrameContext {
    pub fn new(frame: u64, wall_time: f64, start_time: f64) -> FrameContext {
        FrameContext {
            frame,
            wall_time,
            elapsed: wall_time - start_time,
        }
    }
}

/// A stateful per-pixel color shader.
///
/// `begin_frame` runs once per frame before any `shade` call of that frame.
/// `shade` then runs once per coordinate, in layout order, and gets the color
/// composed so far by the preceding effects. Returning `None` keeps it.
pub trait LightingEffect {
    fn name(&self) -> &str;

    fn begin_frame(&mut self, _frame: &FrameContext) {}

    fn shade(&mut self, color: Color, coordinate: &Coordinate, index: usize) -> Option<Color>;
}

/// Instantiates the configured effects in order. Every effect gets its own
/// random stream derived from `rng`.
pub fn build_effects(
    configs: &[EffectConfig],
    pixel_count: usize,
    rng: &mut StdRng,
) -> Result<Vec<Box<dyn LightingEffect>>, ImageError> {
    let mut effects: Vec<Box<dyn LightingEffect>> = Vec::with_capacity(configs.len());

    for config in configs {
        let effect_rng = StdRng::seed_from_u64(rng.gen());
        let effect: Box<dyn LightingEffect> = match config {
            EffectConfig::Sun { image, rot } => {
                let field = imagefield::load_image(image)?;
                Box::new(sun::Sun::new(field, *rot, effect_rng))
            }
            EffectConfig::Flash { probability } => {
                Box::new(flash::Flash::new(*probability, effect_rng))
            }
            EffectConfig::Procedural => {
                Box::new(procedural::Procedural::new(pixel_count, effect_rng))
            }
        };

        log::info!("Effect {}: {}", effects.len(), effect.name());
        effects.push(effect);
    }

    Ok(effects)
}
