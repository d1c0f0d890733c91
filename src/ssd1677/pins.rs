//! Pin definitions for the XTeInk X4
//!
//! GPIO assignments of the e-paper panel and the battery sense divider.

/// Pin configuration constants for the SSD1677 display and peripherals
pub struct Pins;

#[allow(dead_code)]
impl Pins {
    // SPI Display pins
    /// SPI Clock pin
    pub const SCK: u8 = 8;
    /// SPI Master Out Slave In
    pub const MOSI: u8 = 10;
    /// Chip Select pin for SPI display
    pub const CS: u8 = 21;
    /// Data/Command control pin (High for data, Low for command)
    pub const DC: u8 = 4;
    /// Reset pin for display
    pub const RST: u8 = 5;
    /// Busy status pin (High when display is busy)
    pub const BSY: u8 = 6;

    // Other pins
    /// Battery voltage through a 1:2 divider (ADC1 channel 0)
    pub const BATTERY: u8 = 0;
}
