//! Wi-Fi station with a soft-AP provisioning portal
//!
//! Networks are tried in this order: the credentials ESP-IDF remembered in
//! NVS, then the compiled-in known networks, then the portal. The portal is a
//! tiny HTTP form served on an open access point.

/// Credentials submitted through the portal form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub ssid: String,
    pub password: String,
}

/// Largest form body accepted by the portal
pub const MAX_FORM_LEN: usize = 256;

const PORTAL_PAGE: &str = "<!DOCTYPE html><html><head><meta name=\"viewport\" \
content=\"width=device-width,initial-scale=1\"><title>WiFi Setup</title></head>\
<body><h1>WiFi Setup</h1><form method=\"post\" action=\"/save\">\
<p><label>SSID<br><input name=\"ssid\" maxlength=\"32\"></label></p>\
<p><label>Password<br><input name=\"password\" type=\"password\" maxlength=\"64\"></label></p>\
<p><button type=\"submit\">Save</button></p></form></body></html>";

const SAVED_PAGE: &str = "<!DOCTYPE html><html><body><h1>Saved</h1>\
<p>The device is joining the network. This access point will close.</p></body></html>";

/// Parse an `application/x-www-form-urlencoded` body with `ssid` and `password`
///
/// Returns `None` when the SSID is missing, empty or too long.
pub fn parse_credentials_form(body: &[u8]) -> Option<Credentials> {
    let body = core::str::from_utf8(body).ok()?;
    let mut ssid = None;
    let mut password = String::new();

    for pair in body.split('&') {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        match key {
            "ssid" => ssid = Some(url_decode(value)?),
            "password" => password = url_decode(value)?,
            _ => {}
        }
    }

    let ssid = ssid.filter(|s| !s.is_empty() && s.len() <= 32)?;
    if password.len() > 64 {
        return None;
    }
    Some(Credentials { ssid, password })
}

fn url_decode(value: &str) -> Option<String> {
    let bytes = value.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'+' => out.push(b' '),
            b'%' => {
                let hex = core::str::from_utf8(bytes.get(i + 1..i + 3)?).ok()?;
                out.push(u8::from_str_radix(hex, 16).ok()?);
                i += 2;
            }
            b => out.push(b),
        }
        i += 1;
    }
    String::from_utf8(out).ok()
}

#[cfg(target_os = "espidf")]
pub use esp::{WifiManager, WifiNetwork};

#[cfg(target_os = "espidf")]
mod esp {
    use core::time::Duration;
    use std::sync::{Arc, Mutex};
    use std::time::Instant;

    use anyhow::{anyhow, Context, Result};
    use embedded_svc::http::Headers;
    use embedded_svc::wifi::{
        AccessPointConfiguration, AuthMethod, ClientConfiguration, Configuration,
    };
    use esp_idf_svc::eventloop::EspSystemEventLoop;
    use esp_idf_svc::hal::modem::Modem;
    use esp_idf_svc::http::server::{Configuration as HttpConfiguration, EspHttpServer};
    use esp_idf_svc::http::Method;
    use esp_idf_svc::io::{Read, Write};
    use esp_idf_svc::nvs::{EspNvsPartition, NvsDefault};
    use esp_idf_svc::wifi::{BlockingWifi, EspWifi};
    use log::{info, warn};

    use super::{parse_credentials_form, Credentials, MAX_FORM_LEN, PORTAL_PAGE, SAVED_PAGE};
    use crate::app::Network;

    const PORTAL_POLL: Duration = Duration::from_millis(250);

    #[derive(Debug)]
    pub struct WifiNetwork<'a> {
        pub ssid: &'a str,
        pub password: &'a str,
        pub auth_method: AuthMethod,
    }

    impl<'a> WifiNetwork<'a> {
        pub const fn new(ssid: &'a str, password: &'a str) -> Self {
            Self {
                ssid,
                password,
                auth_method: AuthMethod::WPA2Personal,
            }
        }

        pub const fn with_auth(mut self, auth_method: AuthMethod) -> Self {
            self.auth_method = auth_method;
            self
        }
    }

    pub struct WifiManager<'a> {
        networks: &'a [WifiNetwork<'a>],
        wifi: Box<BlockingWifi<EspWifi<'static>>>,
    }

    impl<'a> WifiManager<'a> {
        pub fn new(
            modem: Modem,
            sys_loop: EspSystemEventLoop,
            nvs: EspNvsPartition<NvsDefault>,
            networks: &'a [WifiNetwork<'a>],
        ) -> Result<Self> {
            let wifi = Box::new(BlockingWifi::wrap(
                EspWifi::new(modem, sys_loop.clone(), Some(nvs))?,
                sys_loop,
            )?);
            Ok(Self { networks, wifi })
        }

        /// Credentials ESP-IDF kept in NVS from an earlier session
        fn stored_client(&self) -> Option<ClientConfiguration> {
            match self.wifi.get_configuration() {
                Ok(Configuration::Client(client)) | Ok(Configuration::Mixed(client, _))
                    if !client.ssid.is_empty() =>
                {
                    Some(client)
                }
                _ => None,
            }
        }

        fn scan_networks(&mut self) -> Result<Vec<String>> {
            self.wifi
                .set_configuration(&Configuration::Client(ClientConfiguration::default()))?;
            self.wifi.start()?;

            let ap_infos = self.wifi.scan()?;
            Ok(ap_infos.iter().map(|ap| ap.ssid.to_string()).collect())
        }

        fn join(&mut self, client: ClientConfiguration) -> Result<()> {
            info!("Attempting to connect to network: {}", client.ssid);
            self.wifi.set_configuration(&Configuration::Client(client))?;
            self.wifi.start()?;
            self.wifi.connect()?;
            self.wifi.wait_netif_up()?;

            if let Ok(ip_info) = self.wifi.wifi().sta_netif().get_ip_info() {
                info!("IP: {}", ip_info.ip);
            }
            Ok(())
        }

        fn join_known(&mut self) -> Result<()> {
            let available = self.scan_networks()?;
            info!("Found {} available networks", available.len());

            let networks = self.networks;
            for network in networks {
                if !available.iter().any(|ssid| ssid == network.ssid) {
                    continue;
                }
                let client = ClientConfiguration {
                    ssid: network
                        .ssid
                        .try_into()
                        .map_err(|_| anyhow!("SSID too long: {}", network.ssid))?,
                    password: network
                        .password
                        .try_into()
                        .map_err(|_| anyhow!("Password too long for {}", network.ssid))?,
                    auth_method: network.auth_method,
                    ..Default::default()
                };
                match self.join(client) {
                    Ok(()) => {
                        info!("Successfully connected to {}", network.ssid);
                        return Ok(());
                    }
                    Err(e) => warn!("Failed to connect to {}: {}", network.ssid, e),
                }
            }

            Err(anyhow!("No known networks available"))
        }

        fn run_portal(&mut self, ap_name: &str, timeout: Duration) -> Result<()> {
            let ap = AccessPointConfiguration {
                ssid: ap_name
                    .try_into()
                    .map_err(|_| anyhow!("AP name too long: {}", ap_name))?,
                auth_method: AuthMethod::None,
                ..Default::default()
            };
            self.wifi.set_configuration(&Configuration::Mixed(
                ClientConfiguration::default(),
                ap.clone(),
            ))?;
            self.wifi.start()?;
            info!("Config portal up on AP '{}'", ap_name);

            let submitted: Arc<Mutex<Option<Credentials>>> = Arc::new(Mutex::new(None));
            let mut server = EspHttpServer::new(&HttpConfiguration::default())
                .context("Failed to start portal HTTP server")?;

            server.fn_handler::<anyhow::Error, _>("/", Method::Get, |req| {
                req.into_ok_response()?
                    .write_all(PORTAL_PAGE.as_bytes())
                    .map_err(|e| anyhow!("{:?}", e))
            })?;

            let slot = submitted.clone();
            server.fn_handler::<anyhow::Error, _>("/save", Method::Post, move |mut req| {
                let len = (req.content_len().unwrap_or(0) as usize).min(MAX_FORM_LEN);
                let mut body = vec![0u8; len];
                req.read_exact(&mut body)
                    .map_err(|e| anyhow!("Failed to read form: {:?}", e))?;

                match parse_credentials_form(&body) {
                    Some(credentials) => {
                        info!("Portal received credentials for '{}'", credentials.ssid);
                        if let Ok(mut slot) = slot.lock() {
                            *slot = Some(credentials);
                        }
                        req.into_ok_response()?
                            .write_all(SAVED_PAGE.as_bytes())
                            .map_err(|e| anyhow!("{:?}", e))
                    }
                    None => {
                        req.into_status_response(400)?
                            .write_all(b"Missing SSID")
                            .map_err(|e| anyhow!("{:?}", e))
                    }
                }
            })?;

            let started = Instant::now();
            while started.elapsed() < timeout {
                let credentials = submitted.lock().ok().and_then(|mut slot| slot.take());
                if let Some(credentials) = credentials {
                    let client = ClientConfiguration {
                        ssid: credentials
                            .ssid
                            .as_str()
                            .try_into()
                            .map_err(|_| anyhow!("SSID too long"))?,
                        password: credentials
                            .password
                            .as_str()
                            .try_into()
                            .map_err(|_| anyhow!("Password too long"))?,
                        auth_method: if credentials.password.is_empty() {
                            AuthMethod::None
                        } else {
                            AuthMethod::WPA2Personal
                        },
                        ..Default::default()
                    };
                    self.wifi
                        .set_configuration(&Configuration::Mixed(client, ap.clone()))?;
                    match self.wifi.connect().and_then(|_| self.wifi.wait_netif_up()) {
                        Ok(()) => {
                            info!("Joined '{}' from portal", credentials.ssid);
                            drop(server);
                            // leave AP mode, keeping the new credentials
                            if let Ok(Configuration::Mixed(client, _)) =
                                self.wifi.get_configuration()
                            {
                                self.join(client)?;
                            }
                            return Ok(());
                        }
                        Err(e) => warn!("Portal credentials did not work: {}", e),
                    }
                }
                std::thread::sleep(PORTAL_POLL);
            }

            drop(server);
            self.wifi.stop()?;
            Err(anyhow!("Config portal timed out after {}s", timeout.as_secs()))
        }
    }

    impl Network for WifiManager<'_> {
        fn is_connected(&self) -> bool {
            self.wifi.is_connected().unwrap_or(false)
        }

        fn auto_connect(&mut self, ap_name: &str, timeout: Duration) -> bool {
            if let Some(client) = self.stored_client() {
                let ssid = client.ssid.to_string();
                match self.join(client) {
                    Ok(()) => return true,
                    Err(e) => warn!("Stored network {} failed: {}", ssid, e),
                }
            }

            match self.join_known() {
                Ok(()) => return true,
                Err(e) => warn!("{}", e),
            }

            self.start_config_portal(ap_name, timeout)
        }

        fn start_config_portal(&mut self, ap_name: &str, timeout: Duration) -> bool {
            match self.run_portal(ap_name, timeout) {
                Ok(()) => true,
                Err(e) => {
                    warn!("{:#}", e);
                    false
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn form_with_encoded_values() {
        let creds = parse_credentials_form(b"ssid=Cafe+Wifi&password=p%40ss%26word").unwrap();
        assert_eq!(creds.ssid, "Cafe Wifi");
        assert_eq!(creds.password, "p@ss&word");
    }

    #[test]
    fn open_network_has_empty_password() {
        let creds = parse_credentials_form(b"ssid=guest").unwrap();
        assert_eq!(creds.password, "");
        let creds = parse_credentials_form(b"password=&ssid=guest&extra=1").unwrap();
        assert_eq!(creds.ssid, "guest");
    }

    #[test]
    fn missing_or_invalid_ssid_is_rejected() {
        assert_eq!(parse_credentials_form(b"password=secret"), None);
        assert_eq!(parse_credentials_form(b"ssid=&password=secret"), None);
        assert_eq!(parse_credentials_form(b"ssid=bad%zz"), None);
        assert_eq!(parse_credentials_form(b"ssid=cut%4"), None);
        let long = format!("ssid={}", "a".repeat(33));
        assert_eq!(parse_credentials_form(long.as_bytes()), None);
    }
}
