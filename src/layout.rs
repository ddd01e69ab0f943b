use std::fs;
use std::path::Path;

use thiserror::Error;

/// Position of one physical pixel.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Coordinate {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Coordinate {
    pub fn new(x: f64, y: f64, z: f64) -> Coordinate {
        Coordinate { x, y, z }
    }

    pub fn to_array(self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }
}

#[derive(Error, Debug)]
pub enum LayoutError {
    #[error("Cannot read layout file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("Cannot parse layout: {0}")]
    Parse(#[from] json::Error),

    #[error("Layout must be a JSON array of pixel entries")]
    NotAnArray,

    #[error("Layout entry {index} has a malformed point: {point}")]
    MalformedPoint { index: usize, point: String },

    #[error("Layout contains no pixels")]
    Empty,
}

pub fn load_layout(path: &Path) -> Result<Vec<Coordinate>, LayoutError> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(source) => {
            return Err(LayoutError::Io {
                path: path.display().to_string(),
                source,
            })
        }
    };

    parse_layout(&contents)
}

/// Parses an Open Pixel Control layout. Entries without a `point` key are
/// skipped, the order of the remaining entries is the pixel order.
pub fn parse_layout(contents: &str) -> Result<Vec<Coordinate>, LayoutError> {
    let layout = json::parse(contents)?;
    if !layout.is_array() {
        return Err(LayoutError::NotAnArray);
    }

    let mut coordinates = Vec::with_capacity(layout.len());
    for (index, entry) in layout.members().enumerate() {
        if !entry.has_key("point") {
            continue;
        }

        let point = &entry["point"];
        let components: Vec<f64> = point.members().filter_map(|v| v.as_f64()).collect();
        if !point.is_array() || point.len() != 3 || components.len() != 3 {
            return Err(LayoutError::MalformedPoint {
                index,
                point: point.dump(),
            });
        }

        coordinates.push(Coordinate::new(components[0], components[1], components[2]));
    }

    if coordinates.is_empty() {
        return Err(LayoutError::Empty);
    }

    Ok(coordinates)
}
