//! Compiled-in configuration
//!
//! The device has no CLI and reads no environment at runtime. Everything that
//! would normally be configuration lives here as constants.

use core::time::Duration;

/// MQTT broker (free public broker, no auth)
pub const MQTT_BROKER_URL: &str = "mqtt://broker.hivemq.com:1883";

/// Topic the device subscribes to. Change this to something unique per setup!
/// Format: `tamagotchi/<your-unique-id>/display`
pub const MQTT_TOPIC: &str = "tamagotchi/demo/display";

/// MQTT client id (should be unique per device)
pub const MQTT_CLIENT_ID: &str = "tamagotchi-xteink";

/// Largest inbound payload the client buffers
pub const MQTT_BUFFER_SIZE: usize = 1024;

/// Soft AP name shown while the device needs Wi-Fi credentials
pub const AP_NAME: &str = "Tamagotchi-Setup";

/// How long a provisioning portal stays up before giving up
pub const PORTAL_TIMEOUT: Duration = Duration::from_secs(180);

/// Name shown on the boot screens
pub const DEVICE_TITLE: &str = "Tamagotchi";

/// Portrait width of the panel in pixels
pub const DISPLAY_WIDTH: u32 = 480;
/// Portrait height of the panel in pixels
pub const DISPLAY_HEIGHT: u32 = 800;

/// Control loop pacing
pub const LOOP_DELAY_MS: u32 = 10;

/// Delay before restarting when first-boot provisioning fails
pub const RESTART_DELAY_MS: u32 = 3000;

/// Timing thresholds of the control loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopTiming {
    /// Minimum time between two non-forced panel refreshes
    pub min_refresh: Duration,
    /// Battery resample period
    pub battery_interval: Duration,
    /// Wi-Fi health check period
    pub wifi_check_interval: Duration,
    /// Inactivity before the mood falls back to sleeping
    pub idle_timeout: Duration,
    /// Minimum spacing between broker reconnect attempts
    pub reconnect_interval: Duration,
}

impl Default for LoopTiming {
    fn default() -> Self {
        Self {
            min_refresh: Duration::from_millis(2000),
            battery_interval: Duration::from_secs(60),
            wifi_check_interval: Duration::from_secs(180),
            idle_timeout: Duration::from_secs(300),
            reconnect_interval: Duration::from_millis(5000),
        }
    }
}
