use rand::rngs::StdRng;
use rand::Rng;

use crate::colorutils::Color;
use crate::effects::{FrameContext, LightingEffect};
use crate::imagefield::ImageField;
use crate::layout::Coordinate;
use crate::sampler;
use crate::transform::Transform;

/// Projects an image onto the layout through a slowly wandering camera.
pub struct Sun {
    image: ImageField,
    rot: f64,
    tick: f64,
    rng: StdRng,
    frame: Option<SunFrame>,
}

struct SunFrame {
    camera: Transform,
}

impl Sun {
    pub fn new(image: ImageField, rot: f64, rng: StdRng) -> Sun {
        Sun {
            image,
            rot,
            tick: 0.0,
            rng,
            frame: None,
        }
    }

    fn camera(&self, time: f64) -> Transform {
        let maxsize = self.image.max_dimension() as f64;
        Transform::identity()
            .rotate([0.0, 2.0, 0.0], time + self.rot)
            .scale(maxsize)
            .translate([time.sin(), 0.0, (time + self.tick).sin()])
    }
}

impl LightingEffect for Sun {
    fn name(&self) -> &str {
        "sun"
    }

    fn begin_frame(&mut self, frame: &FrameContext) {
        self.tick += self.rng.gen_range(0..=10) as f64 / 100.0;
        self.frame = Some(SunFrame {
            camera: self.camera(frame.wall_time),
        });
    }

    fn shade(&mut self, _color: Color, coordinate: &Coordinate, _index: usize) -> Option<Color> {
        let frame = self.frame.as_ref()?;
        let [x, _, y] = frame.camera.apply(coordinate.to_array());
        sampler::sample(&self.image, x, y)
    }
}
