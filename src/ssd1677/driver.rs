//! SSD1677 Display Driver Implementation
//!
//! High-level operations on top of [`DisplayInterface`]: power-on init,
//! streaming a frame into RAM, triggering refreshes and deep sleep.
//!
//! ## RAM addressing
//!
//! The panel is mounted so that gate lines run bottom to top. Data entry
//! mode is X increment / Y decrement, with the Y window starting at the last
//! gate line. A frame buffer in native order therefore lands upright.
//!
//! ## Refresh modes
//!
//! - Full: OTP full waveform, flashes the panel, clears ghosting.
//! - Partial: differential waveform comparing the BW RAM (0x24) with the
//!   previous-frame RAM (0x26). After every partial refresh the new frame is
//!   copied into 0x26 so the next comparison starts from what is on glass.

pub use display_interface::DisplayError;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};
use embedded_hal::spi::SpiDevice;

use crate::ssd1677::interface::DisplayInterface;
use crate::ssd1677::{cmd::Cmd, flag::Flag, BUFFER_SIZE, HEIGHT, WIDTH};

/// Which waveform a refresh uses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshMode {
    Full,
    Partial,
}

/// SSD1677 E-Paper Display Driver
pub struct Ssd1677<SPI, BSY, DC, RST, DELAY> {
    /// The display interface
    interface: DisplayInterface<SPI, BSY, DC, RST, DELAY>,
    /// Next `display_frame` must use the full waveform
    needs_full_refresh: bool,
}

impl<SPI, BSY, DC, RST, DELAY> Ssd1677<SPI, BSY, DC, RST, DELAY>
where
    SPI: SpiDevice,
    BSY: InputPin,
    DC: OutputPin,
    RST: OutputPin,
    DELAY: DelayNs,
{
    /// Create and initialize the display driver
    pub fn new(spi: SPI, busy: BSY, dc: DC, rst: RST, delay: DELAY) -> Result<Self, DisplayError> {
        let interface = DisplayInterface::new(spi, busy, dc, rst, delay);
        let mut ssd1677 = Ssd1677 {
            interface,
            needs_full_refresh: true,
        };
        ssd1677.init()?;
        Ok(ssd1677)
    }

    /// Reset and configure the controller
    ///
    /// Also used to wake the panel from deep sleep.
    pub fn init(&mut self) -> Result<(), DisplayError> {
        log::info!("Initializing SSD1677 e-paper display");

        self.interface.reset()?;

        self.interface.cmd(Cmd::SW_RESET)?;
        self.interface.wait_busy_low();

        self.interface
            .cmd_with_data(Cmd::TEMP_CONTROL, &[Flag::INTERNAL_TEMP_SENSOR])?;
        self.interface
            .cmd_with_data(Cmd::BOOST_SOFT_START_CONTROL, &Flag::BOOSTER_SOFT_START)?;

        // Gate count is the native height
        let last_gate = HEIGHT - 1;
        self.interface.cmd_with_data(
            Cmd::DRIVER_CONTROL,
            &[
                (last_gate & 0xFF) as u8,
                (last_gate >> 8) as u8,
                Flag::DRIVER_OUTPUT_INTERLACED,
            ],
        )?;

        self.interface
            .cmd_with_data(Cmd::BORDER_WAVEFORM_CONTROL, &[Flag::BORDER_WAVEFORM_WHITE])?;

        self.set_full_ram_window()?;
        self.interface.wait_busy_low();

        self.needs_full_refresh = true;
        Ok(())
    }

    /// Whole-panel RAM window with the address counters at its start
    fn set_full_ram_window(&mut self) -> Result<(), DisplayError> {
        let x_end = WIDTH - 1;
        let y_start = HEIGHT - 1;

        self.interface
            .cmd_with_data(Cmd::DATA_ENTRY_MODE, &[Flag::DATA_ENTRY_INCRX_DECRY])?;

        // X in pixels, little endian
        self.interface.cmd_with_data(
            Cmd::SET_RAMX_START_END,
            &[0x00, 0x00, (x_end & 0xFF) as u8, (x_end >> 8) as u8],
        )?;

        // Y counts down from the last gate line
        self.interface.cmd_with_data(
            Cmd::SET_RAMY_START_END,
            &[(y_start & 0xFF) as u8, (y_start >> 8) as u8, 0x00, 0x00],
        )?;

        self.interface
            .cmd_with_data(Cmd::SET_RAMX_COUNTER, &[0x00, 0x00])?;
        self.interface.cmd_with_data(
            Cmd::SET_RAMY_COUNTER,
            &[(y_start & 0xFF) as u8, (y_start >> 8) as u8],
        )?;
        Ok(())
    }

    fn check_len(buffer: &[u8]) -> Result<(), DisplayError> {
        if buffer.len() != BUFFER_SIZE {
            log::error!(
                "Frame buffer is {} bytes, expected {}",
                buffer.len(),
                BUFFER_SIZE
            );
            return Err(DisplayError::OutOfBoundsError);
        }
        Ok(())
    }

    /// Stream a full frame into one RAM plane
    fn write_ram(&mut self, command: u8, buffer: &[u8]) -> Result<(), DisplayError> {
        self.set_full_ram_window()?;
        self.interface.cmd_with_data(command, buffer)
    }

    /// Write a frame into the BW RAM without refreshing
    pub fn write_frame(&mut self, buffer: &[u8]) -> Result<(), DisplayError> {
        Self::check_len(buffer)?;
        self.write_ram(Cmd::WRITE_BW_DATA, buffer)
    }

    /// Run the update sequence for whatever is in RAM
    pub fn refresh(&mut self, mode: RefreshMode) -> Result<(), DisplayError> {
        let (ctrl1, ctrl2) = match mode {
            RefreshMode::Full => (
                Flag::DISPLAY_UPDATE_BYPASS_PREVIOUS,
                Flag::DISPLAY_UPDATE_FULL,
            ),
            RefreshMode::Partial => (Flag::DISPLAY_UPDATE_NORMAL, Flag::DISPLAY_UPDATE_PARTIAL),
        };
        log::debug!("Refreshing panel ({:?})", mode);

        self.interface
            .cmd_with_data(Cmd::DISPLAY_UPDATE_CTRL1, &[ctrl1])?;
        self.interface
            .cmd_with_data(Cmd::DISPLAY_UPDATE_CTRL2, &[ctrl2])?;
        self.interface.cmd(Cmd::MASTER_ACTIVATE)?;
        self.interface.wait_busy_low();
        Ok(())
    }

    /// Write a frame and show it
    ///
    /// The first frame after init uses the full waveform and seeds the
    /// previous-frame RAM; later frames use the partial waveform.
    pub fn display_frame(&mut self, buffer: &[u8]) -> Result<(), DisplayError> {
        Self::check_len(buffer)?;

        if self.needs_full_refresh {
            self.write_frame(buffer)?;
            self.write_ram(Cmd::WRITE_PREVIOUS_DATA, buffer)?;
            self.refresh(RefreshMode::Full)?;
            self.needs_full_refresh = false;
        } else {
            self.write_frame(buffer)?;
            self.refresh(RefreshMode::Partial)?;
            self.write_ram(Cmd::WRITE_PREVIOUS_DATA, buffer)?;
        }
        Ok(())
    }

    /// Fill both RAM planes with white and run a full refresh
    pub fn clear(&mut self) -> Result<(), DisplayError> {
        for command in [Cmd::WRITE_BW_DATA, Cmd::WRITE_PREVIOUS_DATA] {
            self.set_full_ram_window()?;
            self.interface.cmd(command)?;
            self.interface
                .data_x_times(Flag::RAM_ALL_WHITE, BUFFER_SIZE)?;
        }
        self.refresh(RefreshMode::Full)?;
        self.needs_full_refresh = false;
        Ok(())
    }

    /// Enter deep sleep, RAM retained; `init` wakes the panel
    pub fn sleep(&mut self) -> Result<(), DisplayError> {
        log::info!("Putting display into deep sleep");
        self.interface
            .cmd_with_data(Cmd::DEEP_SLEEP_MODE, &[Flag::DEEP_SLEEP_MODE_1])?;
        self.needs_full_refresh = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ssd1677::interface::fakes::*;
    use std::cell::Cell;
    use std::rc::Rc;

    type TestDriver = Ssd1677<FakeSpi, FakeBusy, FakeDc, FakeRst, FakeDelay>;

    fn driver() -> (TestDriver, WireLog) {
        let log = WireLog::default();
        let busy = FakeBusy {
            busy_polls: Rc::new(Cell::new(0)),
        };
        let driver = Ssd1677::new(
            FakeSpi(log.clone()),
            busy,
            FakeDc(log.clone()),
            FakeRst,
            FakeDelay::default(),
        )
        .unwrap();
        log.borrow_mut().clear();
        (driver, log)
    }

    fn commands(log: &WireLog) -> Vec<u8> {
        transactions(log).into_iter().map(|(c, _)| c).collect()
    }

    fn ram_writes(log: &WireLog) -> Vec<u8> {
        commands(log)
            .into_iter()
            .filter(|c| *c == Cmd::WRITE_BW_DATA || *c == Cmd::WRITE_PREVIOUS_DATA)
            .collect()
    }

    fn ctrl2_values(log: &WireLog) -> Vec<u8> {
        transactions(log)
            .into_iter()
            .filter(|(c, _)| *c == Cmd::DISPLAY_UPDATE_CTRL2)
            .map(|(_, d)| d[0])
            .collect()
    }

    #[test]
    fn init_sends_reset_and_gate_count() {
        let log = WireLog::default();
        let busy = FakeBusy {
            busy_polls: Rc::new(Cell::new(3)),
        };
        Ssd1677::new(
            FakeSpi(log.clone()),
            busy,
            FakeDc(log.clone()),
            FakeRst,
            FakeDelay::default(),
        )
        .unwrap();

        let tx = transactions(&log);
        assert_eq!(tx[0], (Cmd::SW_RESET, vec![]));
        let driver_control = tx.iter().find(|(c, _)| *c == Cmd::DRIVER_CONTROL).unwrap();
        assert_eq!(driver_control.1, vec![0xDF, 0x01, 0x02]);
    }

    #[test]
    fn ram_window_counts_y_down_from_last_gate() {
        let (mut driver, log) = driver();
        driver.write_frame(&vec![0xFF; BUFFER_SIZE]).unwrap();

        let tx = transactions(&log);
        let find = |cmd: u8| tx.iter().find(|(c, _)| *c == cmd).unwrap().1.clone();
        assert_eq!(find(Cmd::DATA_ENTRY_MODE), vec![0x01]);
        assert_eq!(find(Cmd::SET_RAMX_START_END), vec![0x00, 0x00, 0x1F, 0x03]);
        assert_eq!(find(Cmd::SET_RAMY_START_END), vec![0xDF, 0x01, 0x00, 0x00]);
        assert_eq!(find(Cmd::SET_RAMY_COUNTER), vec![0xDF, 0x01]);
        assert_eq!(find(Cmd::WRITE_BW_DATA).len(), BUFFER_SIZE);
        // no refresh triggered
        assert!(!commands(&log).contains(&Cmd::MASTER_ACTIVATE));
    }

    #[test]
    fn first_frame_is_full_then_partial() {
        let (mut driver, log) = driver();
        let frame = vec![0xAA; BUFFER_SIZE];

        driver.display_frame(&frame).unwrap();
        assert_eq!(ctrl2_values(&log), vec![Flag::DISPLAY_UPDATE_FULL]);
        assert_eq!(
            ram_writes(&log),
            vec![Cmd::WRITE_BW_DATA, Cmd::WRITE_PREVIOUS_DATA]
        );

        log.borrow_mut().clear();
        driver.display_frame(&frame).unwrap();
        assert_eq!(ctrl2_values(&log), vec![Flag::DISPLAY_UPDATE_PARTIAL]);
        // previous-frame RAM is refreshed after the update
        let cmds = commands(&log);
        let activate = cmds.iter().position(|c| *c == Cmd::MASTER_ACTIVATE).unwrap();
        let previous = cmds
            .iter()
            .position(|c| *c == Cmd::WRITE_PREVIOUS_DATA)
            .unwrap();
        assert!(previous > activate);
    }

    #[test]
    fn sleep_forces_full_refresh_on_next_frame() {
        let (mut driver, log) = driver();
        let frame = vec![0xFF; BUFFER_SIZE];
        driver.display_frame(&frame).unwrap();
        driver.sleep().unwrap();
        assert!(transactions(&log).contains(&(Cmd::DEEP_SLEEP_MODE, vec![0x01])));

        log.borrow_mut().clear();
        driver.init().unwrap();
        driver.display_frame(&frame).unwrap();
        assert_eq!(ctrl2_values(&log), vec![Flag::DISPLAY_UPDATE_FULL]);
    }

    #[test]
    fn wrong_buffer_size_is_rejected() {
        let (mut driver, log) = driver();
        let result = driver.display_frame(&[0xFF; 16]);
        assert!(matches!(result, Err(DisplayError::OutOfBoundsError)));
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn clear_fills_both_planes_white() {
        let (mut driver, log) = driver();
        driver.clear().unwrap();
        let tx = transactions(&log);
        for plane in [Cmd::WRITE_BW_DATA, Cmd::WRITE_PREVIOUS_DATA] {
            let data = &tx.iter().find(|(c, _)| *c == plane).unwrap().1;
            assert_eq!(data.len(), BUFFER_SIZE);
            assert!(data.iter().all(|b| *b == 0xFF));
        }
        assert_eq!(ctrl2_values(&log), vec![Flag::DISPLAY_UPDATE_FULL]);
    }

    #[test]
    fn frame_after_boot_clear_is_partial() {
        let (mut driver, log) = driver();
        driver.clear().unwrap();
        log.borrow_mut().clear();

        driver.display_frame(&vec![0x00; BUFFER_SIZE]).unwrap();
        assert_eq!(ctrl2_values(&log), vec![Flag::DISPLAY_UPDATE_PARTIAL]);
    }
}
