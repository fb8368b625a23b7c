//! WiFi station link for ESP32-C3.
//!
//! Unlike a blocking connect, [`Esp32Link::associate`] only starts the
//! association; progress is observed through [`LinkDriver::is_up`] so the
//! node keeps servicing its loop while the radio works.
//!
//! # Example
//!
//! ```ignore
//! use light_node::hal::esp32::Esp32Link;
//! use light_node::traits::LinkDriver;
//!
//! let mut link = Esp32Link::new(peripherals.modem, sysloop, Some(nvs))?;
//! link.associate("MyNetwork", "secret123");
//! while !link.is_up() { /* keep ticking */ }
//! ```

use crate::traits::LinkDriver;
use esp_idf_hal::modem::Modem;
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use esp_idf_svc::wifi::{ClientConfiguration, Configuration, EspWifi};
use std::net::Ipv4Addr;

/// Station-mode WiFi link.
pub struct Esp32Link<'a> {
    wifi: EspWifi<'a>,
}

impl<'a> Esp32Link<'a> {
    /// Initialize the WiFi driver without connecting.
    ///
    /// # Errors
    ///
    /// Returns an error if the driver cannot be created.
    pub fn new(
        modem: Modem,
        sysloop: EspSystemEventLoop,
        nvs: Option<EspDefaultNvsPartition>,
    ) -> anyhow::Result<Self> {
        let wifi = EspWifi::new(modem, sysloop, nvs)?;
        Ok(Self { wifi })
    }

    /// Get the current IP address, if connected.
    pub fn ip_addr(&self) -> Option<Ipv4Addr> {
        self.wifi.sta_netif().get_ip_info().ok().map(|info| info.ip)
    }

    fn start_association(&mut self, ssid: &str, password: &str) -> anyhow::Result<()> {
        let mut ssid_buf: heapless::String<32> = heapless::String::new();
        ssid_buf
            .push_str(ssid)
            .map_err(|_| anyhow::anyhow!("SSID longer than 32 bytes"))?;

        let mut pass_buf: heapless::String<64> = heapless::String::new();
        pass_buf
            .push_str(password)
            .map_err(|_| anyhow::anyhow!("password longer than 64 bytes"))?;

        self.wifi
            .set_configuration(&Configuration::Client(ClientConfiguration {
                ssid: ssid_buf,
                password: pass_buf,
                ..Default::default()
            }))?;

        if !self.wifi.is_started()? {
            self.wifi.start()?;
        }
        self.wifi.connect()?;
        Ok(())
    }
}

impl LinkDriver for Esp32Link<'_> {
    fn associate(&mut self, ssid: &str, password: &str) -> bool {
        match self.start_association(ssid, password) {
            Ok(()) => true,
            Err(error) => {
                tracing::warn!(%error, "WiFi association failed to start");
                false
            }
        }
    }

    fn is_up(&self) -> bool {
        self.wifi.is_connected().unwrap_or(false) && self.wifi.sta_netif().is_up().unwrap_or(false)
    }
}
