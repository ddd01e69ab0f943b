use rand::rngs::StdRng;
use rand::Rng;

use crate::colorutils::{self, Color};
use crate::effects::LightingEffect;
use crate::layout::Coordinate;

/// Chance of one draw out of `0..=200` hitting zero.
pub const DEFAULT_FLASH_PROBABILITY: f64 = 1.0 / 201.0;

/// Randomly lights single pixels full white for one frame.
pub struct Flash {
    probability: f64,
    rng: StdRng,
}

impl Flash {
    pub fn new(probability: f64, rng: StdRng) -> Flash {
        Flash {
            probability: probability.clamp(0.0, 1.0),
            rng,
        }
    }
}

impl LightingEffect for Flash {
    fn name(&self) -> &str {
        "flash"
    }

    fn shade(&mut self, _color: Color, _coordinate: &Coordinate, _index: usize) -> Option<Color> {
        if self.rng.gen_bool(self.probability) {
            Some(colorutils::white())
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;

    use super::*;
    use crate::effects::FrameContext;

    #[test]
    fn flash_rate_converges_to_probability() {
        let mut flash = Flash::new(DEFAULT_FLASH_PROBABILITY, StdRng::seed_from_u64(42));
        let coordinate = Coordinate::new(0.0, 0.0, 0.0);
        let (frames, pixels) = (400, 500);

        let mut flashes = 0;
        for frame in 0..frames {
            flash.begin_frame(&FrameContext::new(frame, frame as f64, 0.0));
            for index in 0..pixels {
                if flash.shade(colorutils::black(), &coordinate, index).is_some() {
                    flashes += 1;
                }
            }
        }

        let draws = (frames * pixels as u64) as f64;
        let rate = flashes as f64 / draws;
        // five standard deviations
        let tolerance = 5.0 * (DEFAULT_FLASH_PROBABILITY * (1.0 - DEFAULT_FLASH_PROBABILITY) / draws).sqrt();
        assert!(
            (rate - DEFAULT_FLASH_PROBABILITY).abs() < tolerance,
            "rate {rate} too far from {DEFAULT_FLASH_PROBABILITY}"
        );
    }

    #[test]
    fn flashes_are_drawn_per_pixel() {
        let mut flash = Flash::new(0.5, StdRng::seed_from_u64(3));
        let coordinate = Coordinate::new(0.0, 0.0, 0.0);
        let hits: Vec<bool> = (0..64)
            .map(|index| flash.shade(colorutils::black(), &coordinate, index).is_some())
            .collect();

        assert!(hits.iter().any(|hit| *hit));
        assert!(hits.iter().any(|hit| !*hit));
    }

    #[test]
    fn flash_is_full_white() {
        let mut flash = Flash::new(1.0, StdRng::seed_from_u64(0));
        let color = flash
            .shade(Color::new(0.3, 0.2, 0.1), &Coordinate::new(0.0, 0.0, 0.0), 0)
            .unwrap();
        assert_eq!(color, Color::new(1.0, 1.0, 1.0));

        let mut never = Flash::new(0.0, StdRng::seed_from_u64(0));
        assert_eq!(never.shade(color, &Coordinate::new(0.0, 0.0, 0.0), 0), None);
    }

    #[test]
    fn probability_is_clamped() {
        let mut flash = Flash::new(7.0, StdRng::seed_from_u64(0));
        assert!(flash
            .shade(colorutils::black(), &Coordinate::new(0.0, 0.0, 0.0), 0)
            .is_some());
    }
}
