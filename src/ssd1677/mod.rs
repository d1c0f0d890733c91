//! SSD1677 ePaper Display Driver
//!
//! Used in the XTeInk X4 (GDEQ0426T82, 4.26" 800×480 black/white panel).
//!
//! ### Usage
//! This driver does not hide that you're working with one buffer for black/white. To
//! display something you:
//!
//! 1. first create a [`graphics::Display4in26`] and draw things onto it with
//!    [`embedded_graphics`](https://github.com/embedded-graphics/embedded-graphics).
//! 1. then send the buffer to the panel with [`driver::Ssd1677::display_frame`]
//!
//! The first frame after init is a full refresh, later frames use the faster
//! partial waveform over the whole window.

pub mod cmd;
pub mod driver;
pub mod flag;
pub mod graphics;
pub mod interface;
pub mod pins;

/// Native width (source lines), pixels horizontally
pub const WIDTH: u16 = 800;

/// Native height (gate lines), pixels vertically
pub const HEIGHT: u16 = 480;

/// Bytes in one full 1-bit frame
pub const BUFFER_SIZE: usize = (WIDTH as usize / 8) * HEIGHT as usize;
