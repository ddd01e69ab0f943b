use crate::colorutils::{self, Color};
use crate::effects::{FrameContext, LightingEffect};
use crate::layout::Coordinate;

/// Owns the layout and the color buffer that effects are composed into.
pub struct Renderer {
    coordinates: Vec<Coordinate>,
    buffer: Vec<Color>,
}

impl Renderer {
    pub fn new(coordinates: Vec<Coordinate>) -> Renderer {
        let buffer = vec![colorutils::black(); coordinates.len()];
        Renderer {
            coordinates,
            buffer,
        }
    }

    pub fn pixel_count(&self) -> usize {
        self.coordinates.len()
    }

    /// Renders one frame: resets the buffer to black, then runs every effect
    /// in order over the whole layout. Later effects see earlier output.
    pub fn render(
        &mut self,
        effects: &mut [Box<dyn LightingEffect>],
        frame: &FrameContext,
    ) -> &[Color] {
        self.buffer.fill(colorutils::black());

        for effect in effects.iter_mut() {
            apply_effect(effect.as_mut(), &self.coordinates, &mut self.buffer, frame);
        }

        &self.buffer
    }
}

pub fn apply_effect(
    effect: &mut dyn LightingEffect,
    coordinates: &[Coordinate],
    buffer: &mut [Color],
    frame: &FrameContext,
) {
    debug_assert_eq!(coordinates.len(), buffer.len());

    effect.begin_frame(frame);
    for (index, (coordinate, pixel)) in coordinates.iter().zip(buffer.iter_mut()).enumerate() {
        if let Some(color) = effect.shade(*pixel, coordinate, index) {
            *pixel = color;
        }
    }
}
