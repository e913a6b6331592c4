//! Serial port settings and the `serialport`-backed opener

use super::{ConnectionError, PortOpener, SerialIo};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Serial port flow control type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlowControl {
    /// No flow control
    #[default]
    None,
    /// Hardware flow control (RTS/CTS)
    Hardware,
    /// Software flow control (XON/XOFF)
    Software,
}

/// Serial port parity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Parity {
    /// No parity
    #[default]
    None,
    /// Odd parity
    Odd,
    /// Even parity
    Even,
}

impl std::str::FromStr for Parity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" | "n" => Ok(Self::None),
            "odd" | "o" => Ok(Self::Odd),
            "even" | "e" => Ok(Self::Even),
            other => Err(format!("unknown parity {other:?}")),
        }
    }
}

/// Serial port configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialSettings {
    /// Port name (e.g., COM3, /dev/ttyUSB0)
    pub port: String,
    /// Baud rate
    pub baud_rate: u32,
    /// Blocking read timeout in milliseconds
    pub timeout_ms: u64,
    /// Data bits (5, 6, 7, 8)
    pub data_bits: u8,
    /// Parity
    pub parity: Parity,
    /// Stop bits (1, 2)
    pub stop_bits: u8,
    /// Flow control
    pub flow_control: FlowControl,
}

impl SerialSettings {
    /// Settings with 8N1 framing and a one second read timeout
    pub fn new(port: &str, baud_rate: u32) -> Self {
        Self {
            port: port.to_string(),
            baud_rate,
            timeout_ms: 1000,
            data_bits: 8,
            parity: Parity::None,
            stop_bits: 1,
            flow_control: FlowControl::None,
        }
    }

    /// Set read timeout
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Set data bits
    #[must_use]
    pub fn data_bits(mut self, bits: u8) -> Self {
        self.data_bits = bits;
        self
    }

    /// Set stop bits
    #[must_use]
    pub fn stop_bits(mut self, bits: u8) -> Self {
        self.stop_bits = bits;
        self
    }

    /// Set parity
    #[must_use]
    pub fn parity(mut self, parity: Parity) -> Self {
        self.parity = parity;
        self
    }

    /// Set flow control
    #[must_use]
    pub fn flow_control(mut self, flow: FlowControl) -> Self {
        self.flow_control = flow;
        self
    }

    /// Read timeout as a duration
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Reject framing the driver cannot express
    pub fn validate(&self) -> Result<(), ConnectionError> {
        if self.port.trim().is_empty() {
            return Err(ConnectionError::InvalidConfiguration("serial port is not set".into()));
        }
        if self.baud_rate == 0 {
            return Err(ConnectionError::InvalidConfiguration("baud rate must be positive".into()));
        }
        if !(5..=8).contains(&self.data_bits) {
            return Err(ConnectionError::InvalidConfiguration(format!(
                "data bits must be 5-8, got {}",
                self.data_bits
            )));
        }
        if !matches!(self.stop_bits, 1 | 2) {
            return Err(ConnectionError::InvalidConfiguration(format!(
                "stop bits must be 1 or 2, got {}",
                self.stop_bits
            )));
        }
        Ok(())
    }
}

impl Default for SerialSettings {
    fn default() -> Self {
        Self::new("", 9600)
    }
}

impl fmt::Display for SerialSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} @ {} baud ({}{}{} {})",
            self.port,
            self.baud_rate,
            self.data_bits,
            match self.parity {
                Parity::None => "N",
                Parity::Odd => "O",
                Parity::Even => "E",
            },
            self.stop_bits,
            match self.flow_control {
                FlowControl::None => "No FC",
                FlowControl::Hardware => "HW FC",
                FlowControl::Software => "SW FC",
            }
        )
    }
}

/// Opens real devices through `serialport`
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemPortOpener;

impl PortOpener for SystemPortOpener {
    fn open(&mut self, settings: &SerialSettings) -> Result<Box<dyn SerialIo>, ConnectionError> {
        settings.validate()?;

        let data_bits = match settings.data_bits {
            5 => serialport::DataBits::Five,
            6 => serialport::DataBits::Six,
            7 => serialport::DataBits::Seven,
            _ => serialport::DataBits::Eight,
        };

        let stop_bits = match settings.stop_bits {
            2 => serialport::StopBits::Two,
            _ => serialport::StopBits::One,
        };

        let parity = match settings.parity {
            Parity::Odd => serialport::Parity::Odd,
            Parity::Even => serialport::Parity::Even,
            Parity::None => serialport::Parity::None,
        };

        let flow_control = match settings.flow_control {
            FlowControl::Hardware => serialport::FlowControl::Hardware,
            FlowControl::Software => serialport::FlowControl::Software,
            FlowControl::None => serialport::FlowControl::None,
        };

        let port = serialport::new(&settings.port, settings.baud_rate)
            .data_bits(data_bits)
            .stop_bits(stop_bits)
            .parity(parity)
            .flow_control(flow_control)
            .timeout(settings.read_timeout())
            .open()
            .map_err(|e| match e.kind() {
                serialport::ErrorKind::NoDevice => ConnectionError::PortNotFound(settings.port.clone()),
                serialport::ErrorKind::Io(std::io::ErrorKind::NotFound) => {
                    ConnectionError::PortNotFound(settings.port.clone())
                }
                serialport::ErrorKind::Io(std::io::ErrorKind::PermissionDenied) => {
                    ConnectionError::PermissionDenied(settings.port.clone())
                }
                _ => ConnectionError::OpenFailed {
                    port: settings.port.clone(),
                    reason: e.to_string(),
                },
            })?;

        Ok(Box::new(port))
    }
}

/// List available serial ports
pub fn list_ports() -> Result<Vec<serialport::SerialPortInfo>, ConnectionError> {
    serialport::available_ports().map_err(|e| ConnectionError::Io(e.into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_defaults() {
        let settings = SerialSettings::new("/dev/ttyUSB0", 115_200);
        assert_eq!(settings.read_timeout(), Duration::from_secs(1));
        assert_eq!(settings.to_string(), "/dev/ttyUSB0 @ 115200 baud (8N1 No FC)");
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_settings_validation() {
        assert!(SerialSettings::default().validate().is_err());
        assert!(SerialSettings::new("COM3", 9600).data_bits(9).validate().is_err());
        assert!(SerialSettings::new("COM3", 9600).stop_bits(3).validate().is_err());
        assert!(SerialSettings::new("COM3", 0).validate().is_err());
    }

    #[test]
    fn test_parity_from_str() {
        assert_eq!("E".parse::<Parity>(), Ok(Parity::Even));
        assert_eq!("none".parse::<Parity>(), Ok(Parity::None));
        assert!("mark".parse::<Parity>().is_err());
    }

    #[test]
    fn test_open_missing_device_fails() {
        let mut opener = SystemPortOpener;
        let settings = SerialSettings::new("/dev/adcplink-does-not-exist", 9600);
        assert!(opener.open(&settings).is_err());
    }
}
