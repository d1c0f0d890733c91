//! Display interface using SPI
use display_interface::DisplayError;
use embedded_hal::{
    delay::DelayNs,
    digital::{InputPin, OutputPin},
    spi::SpiDevice,
};

const RESET_DELAY_MS: u32 = 10;
const BUSY_POLL_MS: u32 = 1;
const BUSY_WAIT_TIMEOUT_MS: u32 = 10_000;

/// Larger writes are split so the SPI driver never needs one huge DMA transfer
pub(crate) const SPI_CHUNK_SIZE: usize = 4096;

/// The connection to the panel controller
pub struct DisplayInterface<SPI, BSY, DC, RST, DELAY> {
    /// SPI device
    spi: SPI,
    /// High while the controller is busy
    busy: BSY,
    /// Data/Command Control Pin (High for data, Low for command)
    dc: DC,
    /// Pin for Reseting
    rst: RST,
    /// Delay provider for reset pulses and busy polling
    pub(crate) delay: DELAY,
}

impl<SPI, BSY, DC, RST, DELAY> DisplayInterface<SPI, BSY, DC, RST, DELAY> {
    pub fn new(spi: SPI, busy: BSY, dc: DC, rst: RST, delay: DELAY) -> Self {
        DisplayInterface {
            spi,
            busy,
            dc,
            rst,
            delay,
        }
    }
}

impl<SPI, BSY, DC, RST, DELAY> DisplayInterface<SPI, BSY, DC, RST, DELAY>
where
    SPI: SpiDevice,
    BSY: InputPin,
    DC: OutputPin,
    RST: OutputPin,
    DELAY: DelayNs,
{
    /// Basic function for sending commands
    pub(crate) fn cmd(&mut self, command: u8) -> Result<(), DisplayError> {
        // low for commands
        self.dc.set_low().map_err(|_| DisplayError::DCError)?;

        self.spi.write(&[command]).map_err(|e| {
            log::error!("SPI write error for command 0x{:02X}: {:?}", command, e);
            DisplayError::BusWriteError
        })
    }

    /// Basic function for sending an array of u8-values of data over spi
    pub(crate) fn data(&mut self, data: &[u8]) -> Result<(), DisplayError> {
        // high for data
        self.dc.set_high().map_err(|_| DisplayError::DCError)?;

        for chunk in data.chunks(SPI_CHUNK_SIZE) {
            self.spi
                .write(chunk)
                .map_err(|_| DisplayError::BusWriteError)?;
        }
        Ok(())
    }

    /// Basic function for sending a command and the data belonging to it.
    pub(crate) fn cmd_with_data(&mut self, command: u8, data: &[u8]) -> Result<(), DisplayError> {
        self.cmd(command)?;
        self.data(data)
    }

    /// Send the same byte `repetitions` times, used to fill a whole RAM plane
    pub(crate) fn data_x_times(&mut self, val: u8, repetitions: usize) -> Result<(), DisplayError> {
        // high for data
        self.dc.set_high().map_err(|_| DisplayError::DCError)?;

        const CHUNK_SIZE: usize = 64;
        let buffer = [val; CHUNK_SIZE];

        let mut remaining = repetitions;
        while remaining > 0 {
            let n = remaining.min(CHUNK_SIZE);
            self.spi
                .write(&buffer[..n])
                .map_err(|_| DisplayError::BusWriteError)?;
            remaining -= n;
        }

        log::debug!("Completed sending {} bytes of 0x{:02X}", repetitions, val);
        Ok(())
    }

    /// Wait for the busy pin to go LOW, giving up after a timeout
    ///
    /// A stuck panel must not hang the main loop, so a timeout or a pin read
    /// error is logged and treated as idle.
    pub fn wait_busy_low(&mut self) {
        let mut waited_ms = 0u32;

        loop {
            match self.busy.is_high() {
                Ok(false) => {
                    if waited_ms > 0 {
                        log::debug!("BUSY released after ~{} ms", waited_ms);
                    }
                    return;
                }
                Ok(true) => {}
                Err(_) => {
                    log::error!("Error reading BUSY pin state - assuming not busy to continue");
                    return;
                }
            }

            if waited_ms >= BUSY_WAIT_TIMEOUT_MS {
                log::error!(
                    "TIMEOUT waiting for BUSY pin to go LOW after {} ms",
                    BUSY_WAIT_TIMEOUT_MS
                );
                return;
            }

            self.delay.delay_ms(BUSY_POLL_MS);
            waited_ms += BUSY_POLL_MS;
        }
    }

    /// Hardware reset pulse on RST
    pub(crate) fn reset(&mut self) -> Result<(), DisplayError> {
        self.rst.set_high().map_err(|_| DisplayError::RSError)?;
        self.delay.delay_ms(RESET_DELAY_MS);
        self.rst.set_low().map_err(|_| DisplayError::RSError)?;
        self.delay.delay_ms(RESET_DELAY_MS);
        self.rst.set_high().map_err(|_| DisplayError::RSError)?;
        self.delay.delay_ms(RESET_DELAY_MS);
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::fakes::*;
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    fn interface(
        busy_polls: u32,
    ) -> (
        DisplayInterface<FakeSpi, FakeBusy, FakeDc, FakeRst, FakeDelay>,
        WireLog,
        FakeDelay,
    ) {
        let log = WireLog::default();
        let delay = FakeDelay::default();
        let busy = FakeBusy {
            busy_polls: Rc::new(Cell::new(busy_polls)),
        };
        let di = DisplayInterface::new(
            FakeSpi(log.clone()),
            busy,
            FakeDc(log.clone()),
            FakeRst,
            delay.clone(),
        );
        (di, log, delay)
    }

    #[test]
    fn command_then_data_toggles_dc() {
        let (mut di, log, _) = interface(0);
        di.cmd_with_data(0x44, &[0x00, 0x31]).unwrap();
        assert_eq!(
            *log.borrow(),
            vec![
                Wire::Dc(false),
                Wire::Bytes(vec![0x44]),
                Wire::Dc(true),
                Wire::Bytes(vec![0x00, 0x31]),
            ]
        );
    }

    #[test]
    fn large_data_is_chunked() {
        let (mut di, log, _) = interface(0);
        let payload = vec![0xAB; SPI_CHUNK_SIZE * 2 + 10];
        di.data(&payload).unwrap();

        let sizes: Vec<usize> = log
            .borrow()
            .iter()
            .filter_map(|w| match w {
                Wire::Bytes(b) => Some(b.len()),
                Wire::Dc(_) => None,
            })
            .collect();
        assert_eq!(sizes, vec![SPI_CHUNK_SIZE, SPI_CHUNK_SIZE, 10]);
    }

    #[test]
    fn repeated_byte_sends_exact_count() {
        let (mut di, log, _) = interface(0);
        di.cmd(0x26).unwrap();
        di.data_x_times(0xFF, 1000).unwrap();
        let tx = transactions(&log);
        assert_eq!(tx.len(), 1);
        assert_eq!(tx[0].0, 0x26);
        assert_eq!(tx[0].1.len(), 1000);
        assert!(tx[0].1.iter().all(|b| *b == 0xFF));
    }

    #[test]
    fn busy_wait_polls_until_released() {
        let (mut di, _, delay) = interface(25);
        di.wait_busy_low();
        assert_eq!(delay.total_ms.get(), 25);
    }

    #[test]
    fn busy_wait_gives_up_after_timeout() {
        let (mut di, _, delay) = interface(u32::MAX);
        di.wait_busy_low();
        assert_eq!(delay.total_ms.get(), u64::from(BUSY_WAIT_TIMEOUT_MS));
    }
}
