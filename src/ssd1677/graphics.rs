//! Framebuffer for the 4.26" panel, drawable with embedded-graphics
//!
//! The buffer is kept in the controller's native layout (800×480, MSB first,
//! bit set = white) so it can be streamed to RAM as is. Rotation is applied
//! per pixel when drawing.

use core::convert::Infallible;

use embedded_graphics::{pixelcolor::BinaryColor, prelude::*};

use crate::ssd1677::{BUFFER_SIZE, HEIGHT, WIDTH};

const WHITE_BYTE: u8 = 0xFF;
const ROW_BYTES: usize = WIDTH as usize / 8;

/// Display rotation, clockwise
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DisplayRotation {
    /// No rotation, 800×480 landscape
    #[default]
    Rotate0,
    /// Rotate by 90 degrees clockwise, 480×800 portrait
    Rotate90,
    /// Rotate by 180 degrees clockwise
    Rotate180,
    /// Rotate by 270 degrees clockwise, 480×800 portrait
    Rotate270,
}

/// Full frame buffer for the GDEQ0426T82
pub struct Display4in26 {
    buffer: Vec<u8>,
    rotation: DisplayRotation,
}

impl Default for Display4in26 {
    fn default() -> Self {
        Self::new()
    }
}

impl Display4in26 {
    /// An all-white frame in landscape orientation
    pub fn new() -> Self {
        Self {
            buffer: vec![WHITE_BYTE; BUFFER_SIZE],
            rotation: DisplayRotation::default(),
        }
    }

    pub fn set_rotation(&mut self, rotation: DisplayRotation) {
        self.rotation = rotation;
    }

    /// Raw bytes in controller order
    pub fn buffer(&self) -> &[u8] {
        &self.buffer
    }

    /// Color at a logical (rotated) position, `None` when off screen
    pub fn pixel(&self, point: Point) -> Option<BinaryColor> {
        let (index, bit) = self.locate(point)?;
        if self.buffer[index] & bit == 0 {
            Some(BinaryColor::On)
        } else {
            Some(BinaryColor::Off)
        }
    }

    fn set_pixel(&mut self, point: Point, color: BinaryColor) {
        let Some((index, bit)) = self.locate(point) else {
            return;
        };
        match color {
            BinaryColor::On => self.buffer[index] &= !bit,
            BinaryColor::Off => self.buffer[index] |= bit,
        }
    }

    /// Map a logical position to a byte index and bit mask in the native buffer
    fn locate(&self, point: Point) -> Option<(usize, u8)> {
        let size = self.size();
        if point.x < 0
            || point.y < 0
            || point.x >= size.width as i32
            || point.y >= size.height as i32
        {
            return None;
        }

        let (x, y) = (point.x as u32, point.y as u32);
        let (w, h) = (u32::from(WIDTH), u32::from(HEIGHT));
        let (nx, ny) = match self.rotation {
            DisplayRotation::Rotate0 => (x, y),
            DisplayRotation::Rotate90 => (w - 1 - y, x),
            DisplayRotation::Rotate180 => (w - 1 - x, h - 1 - y),
            DisplayRotation::Rotate270 => (y, h - 1 - x),
        };

        let index = ny as usize * ROW_BYTES + nx as usize / 8;
        let bit = 0x80u8 >> (nx % 8);
        Some((index, bit))
    }
}

impl OriginDimensions for Display4in26 {
    fn size(&self) -> Size {
        match self.rotation {
            DisplayRotation::Rotate0 | DisplayRotation::Rotate180 => {
                Size::new(u32::from(WIDTH), u32::from(HEIGHT))
            }
            DisplayRotation::Rotate90 | DisplayRotation::Rotate270 => {
                Size::new(u32::from(HEIGHT), u32::from(WIDTH))
            }
        }
    }
}

impl DrawTarget for Display4in26 {
    type Color = BinaryColor;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(point, color) in pixels {
            self.set_pixel(point, color);
        }
        Ok(())
    }

    fn clear(&mut self, color: Self::Color) -> Result<(), Self::Error> {
        let fill = match color {
            BinaryColor::On => 0x00,
            BinaryColor::Off => WHITE_BYTE,
        };
        self.buffer.fill(fill);
        Ok(())
    }
}
