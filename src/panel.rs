//! The physical screen: SSD1677 driver plus a portrait framebuffer
//!
//! Drawing goes through a [`Frame`] guard. The guard is the only way to
//! touch the framebuffer and it always ends with the frame being pushed to
//! the panel, either explicitly through [`Frame::commit`] or when dropped.

use anyhow::anyhow;
use display_interface::DisplayError;
use embedded_graphics::{pixelcolor::BinaryColor, prelude::*};
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};
use embedded_hal::spi::SpiDevice;

use crate::app::Screen;
use crate::render::{render_notice, render_state, LinkStatus, Notice};
use crate::ssd1677::driver::Ssd1677;
use crate::ssd1677::graphics::{Display4in26, DisplayRotation};
use crate::state::DisplayState;

/// Panel mounted in portrait: rotated so the status bar sits at the bottom
pub const PANEL_ROTATION: DisplayRotation = DisplayRotation::Rotate270;

pub struct Panel<SPI, BSY, DC, RST, DELAY> {
    driver: Ssd1677<SPI, BSY, DC, RST, DELAY>,
    display: Display4in26,
}

impl<SPI, BSY, DC, RST, DELAY> Panel<SPI, BSY, DC, RST, DELAY>
where
    SPI: SpiDevice,
    BSY: InputPin,
    DC: OutputPin,
    RST: OutputPin,
    DELAY: DelayNs,
{
    pub fn new(driver: Ssd1677<SPI, BSY, DC, RST, DELAY>) -> Self {
        let mut display = Display4in26::new();
        display.set_rotation(PANEL_ROTATION);
        Self { driver, display }
    }

    /// Start drawing a new frame
    pub fn begin_frame(&mut self) -> Frame<'_, SPI, BSY, DC, RST, DELAY> {
        Frame {
            panel: self,
            flushed: false,
        }
    }

    #[cfg(test)]
    pub fn display(&self) -> &Display4in26 {
        &self.display
    }

    fn flush(&mut self) -> Result<(), DisplayError> {
        self.driver.display_frame(self.display.buffer())
    }
}

/// Scoped access to the framebuffer
///
/// Implements [`DrawTarget`]. The frame is sent to the panel by `commit`,
/// or on drop if it was not committed.
pub struct Frame<'a, SPI, BSY, DC, RST, DELAY>
where
    SPI: SpiDevice,
    BSY: InputPin,
    DC: OutputPin,
    RST: OutputPin,
    DELAY: DelayNs,
{
    panel: &'a mut Panel<SPI, BSY, DC, RST, DELAY>,
    flushed: bool,
}

impl<SPI, BSY, DC, RST, DELAY> Frame<'_, SPI, BSY, DC, RST, DELAY>
where
    SPI: SpiDevice,
    BSY: InputPin,
    DC: OutputPin,
    RST: OutputPin,
    DELAY: DelayNs,
{
    /// Push the frame to the panel and report the result
    pub fn commit(mut self) -> Result<(), DisplayError> {
        self.flushed = true;
        self.panel.flush()
    }
}

impl<SPI, BSY, DC, RST, DELAY> Drop for Frame<'_, SPI, BSY, DC, RST, DELAY>
where
    SPI: SpiDevice,
    BSY: InputPin,
    DC: OutputPin,
    RST: OutputPin,
    DELAY: DelayNs,
{
    fn drop(&mut self) {
        if self.flushed {
            return;
        }
        if let Err(e) = self.panel.flush() {
            log::error!("Failed to flush frame on drop: {:?}", e);
        }
    }
}

impl<SPI, BSY, DC, RST, DELAY> OriginDimensions for Frame<'_, SPI, BSY, DC, RST, DELAY>
where
    SPI: SpiDevice,
    BSY: InputPin,
    DC: OutputPin,
    RST: OutputPin,
    DELAY: DelayNs,
{
    fn size(&self) -> Size {
        self.panel.display.size()
    }
}

impl<SPI, BSY, DC, RST, DELAY> DrawTarget for Frame<'_, SPI, BSY, DC, RST, DELAY>
where
    SPI: SpiDevice,
    BSY: InputPin,
    DC: OutputPin,
    RST: OutputPin,
    DELAY: DelayNs,
{
    type Color = BinaryColor;
    type Error = core::convert::Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        self.panel.display.draw_iter(pixels)
    }

    fn clear(&mut self, color: Self::Color) -> Result<(), Self::Error> {
        self.panel.display.clear(color)
    }
}

impl<SPI, BSY, DC, RST, DELAY> Screen for Panel<SPI, BSY, DC, RST, DELAY>
where
    SPI: SpiDevice,
    BSY: InputPin,
    DC: OutputPin,
    RST: OutputPin,
    DELAY: DelayNs,
{
    fn show_state(&mut self, state: &DisplayState, links: LinkStatus) -> anyhow::Result<()> {
        let mut frame = self.begin_frame();
        render_state(&mut frame, state, links).unwrap_or_else(|e| match e {});
        frame
            .commit()
            .map_err(|e| anyhow!("Failed to refresh panel: {:?}", e))
    }

    fn show_notice(&mut self, notice: &Notice<'_>) -> anyhow::Result<()> {
        let mut frame = self.begin_frame();
        render_notice(&mut frame, notice).unwrap_or_else(|e| match e {});
        frame
            .commit()
            .map_err(|e| anyhow!("Failed to refresh panel: {:?}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ssd1677::cmd::Cmd;
    use crate::ssd1677::interface::fakes::*;
    use std::cell::Cell;
    use std::rc::Rc;

    type TestPanel = Panel<FakeSpi, FakeBusy, FakeDc, FakeRst, FakeDelay>;

    fn panel() -> (TestPanel, WireLog) {
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
        (Panel::new(driver), log)
    }

    fn refreshes(log: &WireLog) -> usize {
        transactions(log)
            .iter()
            .filter(|(c, _)| *c == Cmd::MASTER_ACTIVATE)
            .count()
    }

    #[test]
    fn frame_is_portrait() {
        let (mut panel, _) = panel();
        let frame = panel.begin_frame();
        assert_eq!(frame.size(), Size::new(480, 800));
        frame.commit().unwrap();
    }

    #[test]
    fn commit_refreshes_exactly_once() {
        let (mut panel, log) = panel();
        let mut frame = panel.begin_frame();
        frame.clear(BinaryColor::Off).unwrap();
        frame.commit().unwrap();
        assert_eq!(refreshes(&log), 1);
    }

    #[test]
    fn dropped_frame_is_still_flushed() {
        let (mut panel, log) = panel();
        {
            let mut frame = panel.begin_frame();
            Pixel(Point::new(10, 10), BinaryColor::On)
                .draw(&mut frame)
                .unwrap();
        }
        assert_eq!(refreshes(&log), 1);
        assert_eq!(
            panel.display().pixel(Point::new(10, 10)),
            Some(BinaryColor::On)
        );
    }

    #[test]
    fn screen_renders_state_into_the_buffer() {
        let (mut panel, log) = panel();
        let state = DisplayState::new();
        panel.show_state(&state, LinkStatus::default()).unwrap();
        assert_eq!(refreshes(&log), 1);
        assert!(panel.display().buffer().iter().any(|b| *b != 0xFF));

        panel.show_notice(&Notice::new("WiFi Setup")).unwrap();
        assert_eq!(refreshes(&log), 2);
    }
}
