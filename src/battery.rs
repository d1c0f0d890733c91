//! Battery level
//!
//! The cell is measured through a resistor divider on an ADC pin. The
//! voltage-to-percent mapping is linear between two calibration points.

/// Board specific conversion from ADC counts to a charge estimate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatteryCalibration {
    /// Cell voltage reported as 0%
    pub empty_mv: u32,
    /// Cell voltage reported as 100%
    pub full_mv: u32,
    /// Divider ratio between the cell and the ADC pin
    pub divider_ratio: u32,
    /// ADC full-scale voltage
    pub adc_ref_mv: u32,
    /// ADC full-scale count
    pub adc_max: u32,
}

impl Default for BatteryCalibration {
    /// XTeInk X4: 1:2 divider, 12-bit ADC at 3.3 V, Li-Po 3.0 V to 4.2 V
    fn default() -> Self {
        Self {
            empty_mv: 3000,
            full_mv: 4200,
            divider_ratio: 2,
            adc_ref_mv: 3300,
            adc_max: 4095,
        }
    }
}

impl BatteryCalibration {
    /// Cell voltage for a raw ADC reading
    pub fn millivolts(&self, raw: u16) -> u32 {
        u32::from(raw) * self.divider_ratio * self.adc_ref_mv / self.adc_max.max(1)
    }

    /// Charge estimate for a raw ADC reading, clamped to 0..=100
    pub fn percent_from_raw(&self, raw: u16) -> i32 {
        let mv = self.millivolts(raw) as i32;
        let span = (self.full_mv as i32 - self.empty_mv as i32).max(1);
        ((mv - self.empty_mv as i32) * 100 / span).clamp(0, 100)
    }
}

#[cfg(target_os = "espidf")]
pub use adc::AdcBattery;

#[cfg(target_os = "espidf")]
mod adc {
    use anyhow::Result;
    use esp_idf_svc::hal::adc::attenuation::DB_11;
    use esp_idf_svc::hal::adc::oneshot::config::AdcChannelConfig;
    use esp_idf_svc::hal::adc::oneshot::{AdcChannelDriver, AdcDriver};
    use esp_idf_svc::hal::adc::ADC1;
    use esp_idf_svc::hal::gpio::Gpio0;

    use super::BatteryCalibration;
    use crate::app::BatteryGauge;

    /// Battery sense on GPIO0 (ADC1 channel 0)
    pub struct AdcBattery {
        channel: AdcChannelDriver<'static, Gpio0, AdcDriver<'static, ADC1>>,
        calibration: BatteryCalibration,
    }

    impl AdcBattery {
        pub fn new(adc: ADC1, pin: Gpio0, calibration: BatteryCalibration) -> Result<Self> {
            let driver = AdcDriver::new(adc)?;
            let config = AdcChannelConfig {
                attenuation: DB_11,
                ..Default::default()
            };
            let channel = AdcChannelDriver::new(driver, pin, &config)?;
            Ok(Self {
                channel,
                calibration,
            })
        }
    }

    impl BatteryGauge for AdcBattery {
        fn read_percent(&mut self) -> Option<i32> {
            match self.channel.read_raw() {
                Ok(raw) => Some(self.calibration.percent_from_raw(raw)),
                Err(e) => {
                    log::warn!("Battery ADC read failed: {}", e);
                    None
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_calibration_covers_the_lipo_range() {
        let cal = BatteryCalibration::default();
        // 3.0 V on the cell is 1.5 V at the pin
        let empty_raw = (1500 * 4095 / 3300) as u16;
        let full_raw = (2100 * 4095 / 3300) as u16;
        assert!(cal.percent_from_raw(empty_raw) <= 1);
        assert!(cal.percent_from_raw(full_raw) >= 99);
        assert_eq!(cal.percent_from_raw(0), 0);
        assert_eq!(cal.percent_from_raw(4095), 100);
    }

    #[test]
    fn midpoint_is_about_half() {
        let cal = BatteryCalibration::default();
        let mid_raw = (1800 * 4095 / 3300) as u16;
        let pct = cal.percent_from_raw(mid_raw);
        assert!((49..=51).contains(&pct), "{pct}");
    }

    #[test]
    fn calibration_points_are_honored() {
        let cal = BatteryCalibration {
            empty_mv: 3300,
            full_mv: 4100,
            ..BatteryCalibration::default()
        };
        let raw_for = |mv: u32| (mv / 2 * 4095 / 3300) as u16;
        assert_eq!(cal.percent_from_raw(raw_for(3200)), 0);
        assert!((49..=51).contains(&cal.percent_from_raw(raw_for(3700))));
        assert_eq!(cal.percent_from_raw(raw_for(4200)), 100);
    }
}
