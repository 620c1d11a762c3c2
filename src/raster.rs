//! The pixel buffer an engine writes into.

use crate::{
    error::{Error, Result},
    screen,
};

/// Row-major packed `0x00RRGGBB` pixels. Row 0 is the top of the image.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Raster {
    size: screen::Size,
    pixels: Vec<u32>,
}

impl Raster {
    pub fn new(width: u32, height: u32) -> Result<Self> {
        let size = screen::Size::new(width, height);
        if size.is_empty() {
            return Err(Error::InvalidArgument(format!(
                "raster must not be empty, got {width}x{height}"
            )));
        }

        Ok(Self {
            size,
            pixels: vec![0; size.pixel_count()],
        })
    }

    /// Reallocates the pixels if the dimensions change. New pixels are black.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        if (width, height) != (self.size.width, self.size.height) {
            *self = Self::new(width, height)?;
        }
        Ok(())
    }

    pub fn size(&self) -> screen::Size {
        self.size
    }

    pub fn width(&self) -> u32 {
        self.size.width
    }

    pub fn height(&self) -> u32 {
        self.size.height
    }

    pub fn pixels(&self) -> &[u32] {
        &self.pixels
    }

    pub fn pixels_mut(&mut self) -> &mut [u32] {
        &mut self.pixels
    }

    pub fn pixel(&self, column: u32, row: u32) -> u32 {
        self.pixels[row as usize * self.size.width as usize + column as usize]
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.pixels)
    }
}
