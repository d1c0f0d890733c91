/// Flag values and constants used with the SSD1677 commands.
pub struct Flag;
#[allow(missing_docs)]
impl Flag {
    // Driver Output Control (0x01), third byte
    pub const DRIVER_OUTPUT_INTERLACED: u8 = 0x02;

    // Booster Soft Start Control (0x0C)
    pub const BOOSTER_SOFT_START: [u8; 5] = [0xAE, 0xC7, 0xC3, 0xC0, 0x40];

    // Data Entry Mode (0x11) flags
    pub const DATA_ENTRY_INCRX_DECRY: u8 = 0x01; // X increment, Y decrement

    // Deep Sleep Mode (0x10) flags
    pub const DEEP_SLEEP_MODE_1: u8 = 0x01; // Enter deep sleep, RAM retained

    // Temperature Sensor Control (0x18) flags
    pub const INTERNAL_TEMP_SENSOR: u8 = 0x80;

    // Border Waveform Control (0x3C) flags
    pub const BORDER_WAVEFORM_WHITE: u8 = 0x01;

    // Display Update Control 1 (0x21) flags
    pub const DISPLAY_UPDATE_NORMAL: u8 = 0x00; // compare current and previous RAM
    pub const DISPLAY_UPDATE_BYPASS_PREVIOUS: u8 = 0x40; // previous RAM read as 0

    // Display Update Control 2 (0x22) sequences
    pub const DISPLAY_UPDATE_FULL: u8 = 0xF7; // power on, OTP full LUT, power off
    pub const DISPLAY_UPDATE_PARTIAL: u8 = 0xFC; // power on, OTP partial LUT, keep analog on

    // RAM fill patterns
    pub const RAM_ALL_WHITE: u8 = 0xFF;
}
