use std::io::Write;
use std::net::TcpStream;

use thiserror::Error;

use crate::colorutils::Color;

/// Normalized colors are multiplied by this before they are sent.
pub const OUTPUT_SCALE: f32 = 256.0;

const CMD_SET_PIXEL_COLORS: u8 = 0;
const HEADER_LEN: usize = 4;

#[derive(Error, Debug)]
pub enum SinkError {
    #[error("Cannot connect to {addr}: {source}")]
    Connect {
        addr: String,
        source: std::io::Error,
    },

    #[error("Failed to send frame to {addr}: {source}")]
    Send {
        addr: String,
        source: std::io::Error,
    },

    #[error("{pixels} pixels do not fit into one OPC message")]
    FrameTooLarge { pixels: usize },
}

/// Anything that accepts a frame of colors in the [0, 255] range.
pub trait PixelSink {
    fn put_pixels(&mut self, channel: u8, pixels: &[Color]) -> Result<(), SinkError>;
}

fn to_byte(value: f32) -> u8 {
    // NaN saturates to 0
    value.clamp(0.0, 255.0) as u8
}

/// Writes a "set pixel colors" message for `pixels` into `buffer`.
pub fn encode_pixels(channel: u8, pixels: &[Color], buffer: &mut Vec<u8>) -> Result<(), SinkError> {
    let data_len = pixels.len() * 3;
    let len = match u16::try_from(data_len) {
        Ok(len) => len,
        Err(_) => {
            return Err(SinkError::FrameTooLarge {
                pixels: pixels.len(),
            })
        }
    };

    buffer.clear();
    buffer.reserve(HEADER_LEN + data_len);
    buffer.push(channel);
    buffer.push(CMD_SET_PIXEL_COLORS);
    buffer.extend_from_slice(&len.to_be_bytes());
    for pixel in pixels {
        buffer.push(to_byte(pixel.red));
        buffer.push(to_byte(pixel.green));
        buffer.push(to_byte(pixel.blue));
    }

    Ok(())
}

/// Open Pixel Control client over TCP.
///
/// Connects lazily and drops the connection after any error, so the next
/// frame tries again. The server may come and go while we keep rendering.
pub struct OpcOutput {
    target_addr: String,
    stream: Option<TcpStream>,
    buffer: Vec<u8>,
}

impl OpcOutput {
    pub fn new(target_addr: &str) -> OpcOutput {
        OpcOutput {
            target_addr: target_addr.to_string(),
            stream: None,
            buffer: Vec::with_capacity(512),
        }
    }

    #[cfg(test)]
    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    pub fn connect(&mut self) -> Result<(), SinkError> {
        if self.stream.is_some() {
            return Ok(());
        }

        let stream = match TcpStream::connect(&self.target_addr) {
            Ok(stream) => stream,
            Err(source) => {
                return Err(SinkError::Connect {
                    addr: self.target_addr.clone(),
                    source,
                })
            }
        };

        if let Err(err) = stream.set_nodelay(true) {
            log::debug!("Cannot disable Nagle on {}: {err}", self.target_addr);
        }

        log::info!("Connected to {}", self.target_addr);
        self.stream = Some(stream);
        Ok(())
    }
}

impl PixelSink for OpcOutput {
    fn put_pixels(&mut self, channel: u8, pixels: &[Color]) -> Result<(), SinkError> {
        encode_pixels(channel, pixels, &mut self.buffer)?;
        self.connect()?;

        let stream = match self.stream.as_mut() {
            Some(stream) => stream,
            None => return Ok(()),
        };

        if let Err(source) = stream.write_all(&self.buffer) {
            self.stream = None;
            return Err(SinkError::Send {
                addr: self.target_addr.clone(),
                source,
            });
        }

        Ok(())
    }
}
