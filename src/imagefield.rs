//! Images as 2D float color fields.
//!
//! The field's first axis (`width`, addressed by `x`) runs down the image rows
//! and the second axis (`height`, addressed by `y`) runs along the columns, so
//! `x` and `y` follow matrix indexing of the decoded picture.
//!
//! Decoded images are cached next to the source file as `<file>.field.json`.
//! When decoding is not compiled in or fails, the cache is loaded instead.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[cfg(test)]
use crate::colorutils::{self, Color};

pub const CHANNELS: usize = 3;

#[derive(Error, Debug)]
pub enum ImageError {
    #[error("Image field must not be empty, got {width}x{height}")]
    Empty { width: usize, height: usize },

    #[error("Image field of {width}x{height} needs {expected} samples, got {actual}")]
    SampleCount {
        width: usize,
        height: usize,
        expected: usize,
        actual: usize,
    },

    #[error("No image decoder compiled in, cannot decode {path}")]
    #[cfg_attr(feature = "decode", allow(dead_code))]
    DecoderUnavailable { path: String },

    #[error("Cannot decode image {path}: {message}")]
    Decode { path: String, message: String },

    #[error("Cannot access image cache {path}: {source}")]
    CacheIo {
        path: String,
        source: std::io::Error,
    },

    #[error("Malformed image cache {path}: {source}")]
    CacheFormat {
        path: String,
        source: serde_json::Error,
    },

    #[error("Image {path} is unavailable ({decode}) and has no usable cache ({cache})")]
    Unavailable {
        path: String,
        decode: String,
        cache: String,
    },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ImageField {
    width: usize,
    height: usize,
    samples: Vec<[f32; CHANNELS]>,
}

impl ImageField {
    pub fn new(
        width: usize,
        height: usize,
        samples: Vec<[f32; CHANNELS]>,
    ) -> Result<ImageField, ImageError> {
        if width == 0 || height == 0 {
            return Err(ImageError::Empty { width, height });
        }

        let expected = width * height;
        if samples.len() != expected {
            return Err(ImageError::SampleCount {
                width,
                height,
                expected,
                actual: samples.len(),
            });
        }

        Ok(ImageField {
            width,
            height,
            samples,
        })
    }

    pub fn from_fn<F>(width: usize, height: usize, f: F) -> Result<ImageField, ImageError>
    where
        F: Fn(usize, usize) -> [f32; CHANNELS],
    {
        let mut samples = Vec::with_capacity(width * height);
        for x in 0..width {
            for y in 0..height {
                samples.push(f(x, y));
            }
        }

        ImageField::new(width, height, samples)
    }

    #[cfg(test)]
    pub fn constant(width: usize, height: usize, color: Color) -> Result<ImageField, ImageError> {
        let (r, g, b) = color.into_components();
        ImageField::from_fn(width, height, |_, _| [r, g, b])
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Longest axis of the field counting the color channels, so tiny images
    /// never scale below `CHANNELS`.
    pub fn max_dimension(&self) -> usize {
        self.width.max(self.height).max(CHANNELS)
    }

    /// Raw sample at `(x, y)`. Panics when out of range.
    pub fn at(&self, x: usize, y: usize) -> [f32; CHANNELS] {
        assert!(x < self.width && y < self.height);
        self.samples[x * self.height + y]
    }

    #[cfg(test)]
    pub fn color_at(&self, x: usize, y: usize) -> Color {
        colorutils::from_components(self.at(x, y))
    }

    fn save_cache(&self, path: &Path) -> Result<(), ImageError> {
        let file = File::create(path).map_err(|source| ImageError::CacheIo {
            path: path.display().to_string(),
            source,
        })?;

        serde_json::to_writer(BufWriter::new(file), self).map_err(|source| {
            ImageError::CacheFormat {
                path: path.display().to_string(),
                source,
            }
        })
    }

    fn load_cache(path: &Path) -> Result<ImageField, ImageError> {
        let file = File::open(path).map_err(|source| ImageError::CacheIo {
            path: path.display().to_string(),
            source,
        })?;

        let field: ImageField =
            serde_json::from_reader(BufReader::new(file)).map_err(|source| {
                ImageError::CacheFormat {
                    path: path.display().to_string(),
                    source,
                }
            })?;

        // The cache is external input, re-check the shape invariants.
        ImageField::new(field.width, field.height, field.samples)
    }
}

pub fn cache_path(image_path: &Path) -> PathBuf {
    let mut name = image_path.as_os_str().to_owned();
    name.push(".field.json");
    PathBuf::from(name)
}

/// Loads `path` as a field normalized to [0, 1], falling back to the cached copy.
pub fn load_image(path: &Path) -> Result<ImageField, ImageError> {
    let cache = cache_path(path);

    match decode(path) {
        Ok(field) => {
            if let Err(err) = field.save_cache(&cache) {
                log::warn!("Failed to cache image field: {err}");
            }
            log::info!(
                "Loaded image {} ({}x{})",
                path.display(),
                field.width(),
                field.height()
            );
            Ok(field)
        }
        Err(decode_err) => {
            log::warn!("{decode_err}. Trying to load from {}", cache.display());
            match ImageField::load_cache(&cache) {
                Ok(field) => Ok(field),
                Err(cache_err) => Err(ImageError::Unavailable {
                    path: path.display().to_string(),
                    decode: decode_err.to_string(),
                    cache: cache_err.to_string(),
                }),
            }
        }
    }
}

#[cfg(feature = "decode")]
fn decode(path: &Path) -> Result<ImageField, ImageError> {
    let image = image::open(path).map_err(|err| ImageError::Decode {
        path: path.display().to_string(),
        message: err.to_string(),
    })?;

    // Drops alpha, scales integer formats to [0, 1].
    let rgb = image.to_rgb32f();
    let (columns, rows) = rgb.dimensions();
    ImageField::from_fn(rows as usize, columns as usize, |x, y| {
        rgb.get_pixel(y as u32, x as u32).0
    })
}

#[cfg(not(feature = "decode"))]
fn decode(path: &Path) -> Result<ImageField, ImageError> {
    Err(ImageError::DecoderUnavailable {
        path: path.display().to_string(),
    })
}
