//! Control loop
//!
//! [`App`] owns all device state and runs one `tick` per loop iteration.
//! Hardware is reached through the small traits below so the whole loop can
//! run on the host against scripted fakes.

use core::time::Duration;

use crate::config::{AP_NAME, DEVICE_TITLE, LoopTiming, MQTT_TOPIC, PORTAL_TIMEOUT};
use crate::ingest::ingest;
use crate::policy::{PolicyTimers, ReconnectGate};
use crate::render::{LinkStatus, Notice};
use crate::scheduler::RedrawScheduler;
use crate::state::{DisplayState, CONNECTED_ACTIVITY};


/// Station-mode Wi-Fi with a provisioning portal
pub trait Network {
    fn is_connected(&self) -> bool;
    /// Join a remembered network, falling back to the portal; blocks
    fn auto_connect(&mut self, ap_name: &str, timeout: Duration) -> bool;
    /// Run the provisioning portal until credentials work or `timeout`; blocks
    fn start_config_portal(&mut self, ap_name: &str, timeout: Duration) -> bool;
}

/// Broker connection delivering inbound messages
pub trait Transport {
    fn connect(&mut self) -> bool;
    fn is_connected(&self) -> bool;
    fn subscribe(&mut self, topic: &str) -> bool;
    /// Deliver queued messages as `(topic, payload)`
    fn service(&mut self, on_message: &mut dyn FnMut(&str, &[u8]));
}

pub trait BatteryGauge {
    /// Charge estimate in percent, `None` when the reading failed
    fn read_percent(&mut self) -> Option<i32>;
}

/// Whatever shows frames to the user
pub trait Screen {
    fn show_state(&mut self, state: &DisplayState, links: LinkStatus) -> anyhow::Result<()>;
    fn show_notice(&mut self, notice: &Notice<'_>) -> anyhow::Result<()>;
}

/// Collaborators borrowed for one `boot` or `tick`
pub struct Devices<'a> {
    /// Time since boot; read again after every blocking call
    pub clock: &'a dyn Fn() -> Duration,
    pub network: &'a mut dyn Network,
    pub transport: &'a mut dyn Transport,
    pub battery: &'a mut dyn BatteryGauge,
    pub screen: &'a mut dyn Screen,
}

impl Devices<'_> {
    fn now(&self) -> Duration {
        (self.clock)()
    }

    fn links(&self) -> LinkStatus {
        LinkStatus {
            wifi: self.network.is_connected(),
            mqtt: self.transport.is_connected(),
        }
    }

    fn notice(&mut self, notice: Notice<'_>) {
        if let Err(e) = self.screen.show_notice(&notice) {
            log::error!("Failed to show notice '{}': {:#}", notice.title, e);
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BootError {
    #[error("no Wi-Fi network could be joined or provisioned")]
    ProvisioningFailed,
}

pub struct App {
    state: DisplayState,
    scheduler: RedrawScheduler,
    timers: PolicyTimers,
    reconnect: ReconnectGate,
    /// Connectivity shown by the last successful state render
    shown_links: Option<LinkStatus>,
}

impl App {
    pub fn new(timing: LoopTiming, now: Duration) -> Self {
        Self {
            state: DisplayState::new(),
            scheduler: RedrawScheduler::new(timing.min_refresh),
            timers: PolicyTimers::new(timing, now),
            reconnect: ReconnectGate::new(timing.reconnect_interval),
            shown_links: None,
        }
    }

    pub fn state(&self) -> &DisplayState {
        &self.state
    }

    /// Bring up Wi-Fi and the broker, then draw the first frame
    ///
    /// Fails only when no network could be joined; the caller restarts.
    pub fn boot(&mut self, dev: &mut Devices<'_>) -> Result<(), BootError> {
        log::info!("{} - XTeInk X4 Display", DEVICE_TITLE);
        dev.notice(Notice::new(DEVICE_TITLE).with_detail("Starting..."));

        let connect_hint = format!("Connect to: {}", AP_NAME);
        dev.notice(Notice::new("WiFi Setup").with_detail(&connect_hint));

        if !dev.network.auto_connect(AP_NAME, PORTAL_TIMEOUT) {
            log::error!("WiFi failed");
            dev.notice(Notice::new("WiFi Failed").with_detail("Restarting..."));
            return Err(BootError::ProvisioningFailed);
        }
        log::info!("WiFi connected!");

        dev.notice(
            Notice::new(DEVICE_TITLE)
                .with_subtitle("WiFi OK!")
                .with_detail("Connecting to MQTT..."),
        );
        self.connect_transport(dev);

        // provisioning and the broker connect may have blocked for minutes
        let now = dev.now();
        self.state.touch_event_time(now);
        if let Some(percent) = dev.battery.read_percent() {
            self.state.set_battery(percent);
        }
        self.state.mark_dirty();
        self.render(now, true, dev);
        Ok(())
    }

    /// One pass of the main loop
    pub fn tick(&mut self, dev: &mut Devices<'_>) {
        let now = dev.now();
        self.service_transport(now, dev);

        if self.timers.battery_due(now) {
            if let Some(percent) = dev.battery.read_percent() {
                if self.state.set_battery(percent) {
                    log::info!("Battery now {}%", self.state.battery_percent());
                }
            }
        }

        if self.timers.wifi_check_due(now) && !dev.network.is_connected() {
            self.recover_wifi(dev);
        }

        let now = dev.now();
        self.timers.apply_idle_timeout(&mut self.state, now);

        self.render(now, false, dev);
    }

    fn service_transport(&mut self, now: Duration, dev: &mut Devices<'_>) {
        if !dev.transport.is_connected() {
            if self.reconnect.try_begin(now) && self.connect_transport(dev) {
                self.reconnect.reset();
            }
            return;
        }

        let state = &mut self.state;
        dev.transport.service(&mut |topic, payload| {
            log::info!("MQTT message on {} ({} bytes)", topic, payload.len());
            if let Err(e) = ingest(state, payload, now) {
                log::debug!("Ignored payload on {}: {}", topic, e);
            }
        });
    }

    /// Connect and subscribe; the activity line announces success
    fn connect_transport(&mut self, dev: &mut Devices<'_>) -> bool {
        log::info!("Connecting to MQTT broker...");
        if !dev.transport.connect() {
            log::warn!("MQTT connect failed");
            return false;
        }

        if dev.transport.subscribe(MQTT_TOPIC) {
            log::info!("Subscribed to: {}", MQTT_TOPIC);
        } else {
            log::warn!("Failed to subscribe to {}", MQTT_TOPIC);
        }
        self.state.set_activity(CONNECTED_ACTIVITY);
        true
    }

    fn recover_wifi(&mut self, dev: &mut Devices<'_>) {
        log::warn!("WiFi disconnected - starting config portal");
        let connect_hint = format!("Connect to: {}", AP_NAME);
        dev.notice(Notice::new("WiFi Lost").with_detail(&connect_hint));

        if dev.network.start_config_portal(AP_NAME, PORTAL_TIMEOUT) {
            log::info!("WiFi reconnected!");
            dev.notice(
                Notice::new(DEVICE_TITLE)
                    .with_subtitle("WiFi OK!")
                    .with_detail("Reconnecting MQTT..."),
            );
            self.connect_transport(dev);
            self.state.mark_dirty();
        } else {
            log::warn!("Config portal timed out");
            dev.notice(Notice::new("WiFi Failed").with_detail("Will retry..."));
        }

        // the notice replaced the state screen
        self.render(dev.now(), true, dev);
    }

    fn render(&mut self, now: Duration, force: bool, dev: &mut Devices<'_>) {
        let links = dev.links();
        if self.shown_links.is_some_and(|shown| shown != links) {
            log::info!("Connectivity changed: wifi={} mqtt={}", links.wifi, links.mqtt);
            self.state.mark_dirty();
        }

        let screen = &mut *dev.screen;
        let result = self.scheduler.maybe_render(&mut self.state, force, now, |state| {
            screen.show_state(state, links)
        });
        match result {
            Ok(true) => self.shown_links = Some(links),
            Ok(false) => {}
            Err(e) => log::error!("Display update failed: {:#}", e),
        }
    }
}
