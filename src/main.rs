#[cfg(target_os = "espidf")]
use anyhow::Context;

#[cfg(target_os = "espidf")]
use esp_idf_svc::{
    eventloop::EspSystemEventLoop,
    hal::{
        delay::{Delay, FreeRtos},
        gpio,
        peripherals::Peripherals,
        prelude::*,
        spi,
    },
    nvs::EspDefaultNvsPartition,
};

#[cfg(target_os = "espidf")]
use moodink::{
    app::{App, Devices},
    battery::{AdcBattery, BatteryCalibration},
    config,
    mqtt::MqttTransport,
    panel::Panel,
    ssd1677::{driver::Ssd1677, pins::Pins},
    wifi::{WifiManager, WifiNetwork},
};

// https://docs.esp-rs.org/esp-idf-svc/esp_idf_svc/
#[cfg(target_os = "espidf")]
fn main() -> anyhow::Result<()> {
    // It is necessary to call this function once. Otherwise some patches to the runtime
    // implemented by esp-idf-sys might not link properly. See https://github.com/esp-rs/esp-idf-template/issues/71
    esp_idf_svc::sys::link_patches();

    // Bind the log crate to the ESP Logging facilities
    esp_idf_svc::log::EspLogger::initialize_default();

    let boot_time = std::time::Instant::now();

    let peripherals = Peripherals::take().context("Could not take peripherals")?;
    let pins = peripherals.pins;
    let sys_loop = EspSystemEventLoop::take()?;
    let nvs = EspDefaultNvsPartition::take()?;

    log::info!(
        "Configuring SPI for the panel (SCK {}, MOSI {}, CS {}, DC {}, RST {}, BUSY {})",
        Pins::SCK,
        Pins::MOSI,
        Pins::CS,
        Pins::DC,
        Pins::RST,
        Pins::BSY
    );
    let spi = spi::SpiDeviceDriver::new_single(
        peripherals.spi2,
        pins.gpio8,
        pins.gpio10,
        Option::<gpio::AnyIOPin>::None, // No MISO needed for display
        Some(pins.gpio21),
        &spi::SpiDriverConfig::new().dma(spi::Dma::Auto(4096)),
        &spi::SpiConfig::new().baudrate(10.MHz().into()),
    )
    .context("Could not create SPI device driver")?;

    let mut ssd1677 = Ssd1677::new(
        spi,
        gpio::PinDriver::input(pins.gpio6)?,  // Pins::BSY
        gpio::PinDriver::output(pins.gpio4)?, // Pins::DC
        gpio::PinDriver::output(pins.gpio5)?, // Pins::RST
        Delay::new_default(),
    )
    .map_err(|e| anyhow::anyhow!("Could not create EPD driver: {:?}", e))?;
    // start from a white panel with both RAM planes in sync
    ssd1677
        .clear()
        .map_err(|e| anyhow::anyhow!("Could not clear EPD: {:?}", e))?;
    let mut panel = Panel::new(ssd1677);

    // Pins::BATTERY
    let mut battery = AdcBattery::new(
        peripherals.adc1,
        pins.gpio0,
        BatteryCalibration::default(),
    )?;

    let networks: Vec<WifiNetwork<'static>> = option_env!("WIFI_SSID")
        .map(|ssid| {
            let password = option_env!("WIFI_PASS").unwrap_or("");
            let network = WifiNetwork::new(ssid, password);
            if password.is_empty() {
                network.with_auth(embedded_svc::wifi::AuthMethod::None)
            } else {
                network
            }
        })
        .into_iter()
        .collect();
    let mut network = WifiManager::new(peripherals.modem, sys_loop, nvs, &networks)?;

    let mut transport = MqttTransport::new(
        config::MQTT_BROKER_URL,
        config::MQTT_CLIENT_ID,
        config::MQTT_BUFFER_SIZE,
    );

    let mut app = App::new(config::LoopTiming::default(), boot_time.elapsed());
    let clock = || boot_time.elapsed();
    let mut devices = Devices {
        clock: &clock,
        network: &mut network,
        transport: &mut transport,
        battery: &mut battery,
        screen: &mut panel,
    };

    if let Err(e) = app.boot(&mut devices) {
        log::error!("Boot failed: {}", e);
        FreeRtos::delay_ms(config::RESTART_DELAY_MS);
        esp_idf_svc::hal::reset::restart();
    }

    loop {
        app.tick(&mut devices);
        FreeRtos::delay_ms(config::LOOP_DELAY_MS);
    }
}

#[cfg(not(target_os = "espidf"))]
fn main() {
    eprintln!("moodink runs on the XTeInk X4 (riscv32imc-esp-espidf); use `cargo test` on the host");
}
