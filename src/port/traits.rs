//! Core traits and mode types for the transport layer.
//!
//! A [`Connector`] opens named devices and produces [`Transport`] handles.
//! Both the serialport-backed implementation and the in-memory mock plug in
//! here, so the guarded port never depends on a concrete driver.

use super::error::PortError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Everything needed to open and baseline a port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortConfiguration {
    /// Device name, e.g. `/dev/ttyUSB0` or `COM3`.
    pub name: String,

    /// Baud rate (bits per second). Must be positive.
    pub baud_rate: u32,

    /// Number of data bits (5, 6, 7, or 8).
    pub data_bits: DataBits,

    /// Number of stop bits.
    pub stop_bits: StopBits,

    /// Parity checking mode.
    pub parity: Parity,

    /// Baseline read timeout programmed right after open. Zero leaves the
    /// driver default in place.
    pub timeout: Duration,
}

impl PortConfiguration {
    /// 8N1 at the given baud rate with no baseline read timeout.
    pub fn new(name: impl Into<String>, baud_rate: u32) -> Self {
        Self {
            name: name.into(),
            baud_rate,
            data_bits: DataBits::Eight,
            stop_bits: StopBits::One,
            parity: Parity::None,
            timeout: Duration::ZERO,
        }
    }

    pub fn data_bits(mut self, data_bits: DataBits) -> Self {
        self.data_bits = data_bits;
        self
    }

    pub fn stop_bits(mut self, stop_bits: StopBits) -> Self {
        self.stop_bits = stop_bits;
        self
    }

    pub fn parity(mut self, parity: Parity) -> Self {
        self.parity = parity;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// The line settings handed to a [`Connector`].
    pub fn mode(&self) -> Mode {
        Mode {
            baud_rate: self.baud_rate,
            data_bits: self.data_bits,
            stop_bits: self.stop_bits,
            parity: self.parity,
        }
    }

    /// Reject settings no device can honour.
    pub fn validate(&self) -> Result<(), PortError> {
        if self.name.is_empty() {
            return Err(PortError::config("device name is empty"));
        }
        if self.baud_rate == 0 {
            return Err(PortError::config("baud rate must be positive"));
        }
        Ok(())
    }
}

/// Line settings applied when a device is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mode {
    pub baud_rate: u32,
    pub data_bits: DataBits,
    pub stop_bits: StopBits,
    pub parity: Parity,
}

/// Number of data bits per character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataBits {
    Five,
    Six,
    Seven,
    Eight,
}

impl TryFrom<u8> for DataBits {
    type Error = PortError;

    fn try_from(bits: u8) -> Result<Self, Self::Error> {
        match bits {
            5 => Ok(DataBits::Five),
            6 => Ok(DataBits::Six),
            7 => Ok(DataBits::Seven),
            8 => Ok(DataBits::Eight),
            other => Err(PortError::config(format!("unsupported data bits: {other}"))),
        }
    }
}

impl From<DataBits> for serialport::DataBits {
    fn from(bits: DataBits) -> Self {
        match bits {
            DataBits::Five => serialport::DataBits::Five,
            DataBits::Six => serialport::DataBits::Six,
            DataBits::Seven => serialport::DataBits::Seven,
            DataBits::Eight => serialport::DataBits::Eight,
        }
    }
}

/// Parity checking modes.
///
/// Owned by this crate rather than borrowed from a driver, so Mark and Space
/// exist even where a particular driver cannot express them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Parity {
    None,
    Odd,
    Even,
    Mark,
    Space,
}

impl fmt::Display for Parity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Parity::None => "none",
            Parity::Odd => "odd",
            Parity::Even => "even",
            Parity::Mark => "mark",
            Parity::Space => "space",
        };
        f.write_str(name)
    }
}

impl std::str::FromStr for Parity {
    type Err = PortError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" | "n" => Ok(Parity::None),
            "odd" | "o" => Ok(Parity::Odd),
            "even" | "e" => Ok(Parity::Even),
            "mark" | "m" => Ok(Parity::Mark),
            "space" | "s" => Ok(Parity::Space),
            other => Err(PortError::config(format!("unknown parity: {other}"))),
        }
    }
}

/// `serialport` only knows none/odd/even.
impl TryFrom<Parity> for serialport::Parity {
    type Error = PortError;

    fn try_from(parity: Parity) -> Result<Self, Self::Error> {
        match parity {
            Parity::None => Ok(serialport::Parity::None),
            Parity::Odd => Ok(serialport::Parity::Odd),
            Parity::Even => Ok(serialport::Parity::Even),
            Parity::Mark | Parity::Space => Err(PortError::config(format!(
                "{parity} parity is not supported by the serialport driver"
            ))),
        }
    }
}

/// Number of stop bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopBits {
    One,
    Two,
}

impl TryFrom<u8> for StopBits {
    type Error = PortError;

    fn try_from(bits: u8) -> Result<Self, Self::Error> {
        match bits {
            1 => Ok(StopBits::One),
            2 => Ok(StopBits::Two),
            other => Err(PortError::config(format!("unsupported stop bits: {other}"))),
        }
    }
}

impl From<StopBits> for serialport::StopBits {
    fn from(bits: StopBits) -> Self {
        match bits {
            StopBits::One => serialport::StopBits::One,
            StopBits::Two => serialport::StopBits::Two,
        }
    }
}

/// A blocking, non-cancellable device handle.
///
/// Methods take `&self`: a write abandoned by the guarded port may still be
/// running on a worker thread while the owner issues the next read, so
/// implementations lock internally and must not serialise reads behind
/// writes.
pub trait Transport: Send + Sync + fmt::Debug + 'static {
    /// Blocking read, bounded by the last programmed read timeout.
    fn read(&self, buffer: &mut [u8]) -> Result<usize, PortError>;

    /// Blocking write. Unbounded unless the driver bounds it itself.
    fn write(&self, data: &[u8]) -> Result<usize, PortError>;

    /// Program the timeout used by subsequent reads.
    fn set_read_timeout(&self, timeout: Duration) -> Result<(), PortError>;

    /// Release the device. Later calls report [`PortError::NotOpen`].
    fn close(&self) -> Result<(), PortError>;
}

/// Opens devices by name and enumerates what is available.
///
/// Cloned onto the worker thread that performs a cancellable open.
pub trait Connector: Clone + Send + 'static {
    type Transport: Transport;

    /// Blocking open of `name` with the given line settings.
    fn open(&self, name: &str, mode: &Mode) -> Result<Self::Transport, PortError>;

    /// Names of the devices this connector can currently open.
    fn available_ports(&self) -> Result<Vec<String>, PortError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_configuration_is_8n1() {
        let config = PortConfiguration::new("/dev/ttyUSB0", 9600);
        assert_eq!(config.baud_rate, 9600);
        assert_eq!(config.data_bits, DataBits::Eight);
        assert_eq!(config.stop_bits, StopBits::One);
        assert_eq!(config.parity, Parity::None);
        assert_eq!(config.timeout, Duration::ZERO);
    }

    #[test]
    fn test_mode_projection() {
        let config = PortConfiguration::new("COM3", 115200)
            .data_bits(DataBits::Seven)
            .stop_bits(StopBits::Two)
            .parity(Parity::Mark)
            .timeout(Duration::from_secs(3));

        let mode = config.mode();
        assert_eq!(mode.baud_rate, 115200);
        assert_eq!(mode.data_bits, DataBits::Seven);
        assert_eq!(mode.stop_bits, StopBits::Two);
        assert_eq!(mode.parity, Parity::Mark);
    }

    #[test]
    fn test_validate_rejects_zero_baud() {
        let config = PortConfiguration::new("/dev/null", 0);
        assert!(matches!(config.validate(), Err(PortError::Config(_))));

        let config = PortConfiguration::new("", 9600);
        assert!(matches!(config.validate(), Err(PortError::Config(_))));
    }

    #[test]
    fn test_data_bits_from_integer() {
        assert_eq!(DataBits::try_from(5).unwrap(), DataBits::Five);
        assert_eq!(DataBits::try_from(8).unwrap(), DataBits::Eight);
        assert!(DataBits::try_from(9).is_err());
        assert!(DataBits::try_from(4).is_err());
    }

    #[test]
    fn test_stop_bits_from_integer() {
        assert_eq!(StopBits::try_from(1).unwrap(), StopBits::One);
        assert_eq!(StopBits::try_from(2).unwrap(), StopBits::Two);
        assert!(StopBits::try_from(3).is_err());
    }

    #[test]
    fn test_parity_conversion() {
        let even: serialport::Parity = Parity::Even.try_into().unwrap();
        assert_eq!(even, serialport::Parity::Even);

        let mark: Result<serialport::Parity, _> = Parity::Mark.try_into();
        assert!(matches!(mark, Err(PortError::Config(_))));
        let space: Result<serialport::Parity, _> = Parity::Space.try_into();
        assert!(space.is_err());
    }

    #[test]
    fn test_parity_parse_and_display() {
        assert_eq!("Odd".parse::<Parity>().unwrap(), Parity::Odd);
        assert_eq!("s".parse::<Parity>().unwrap(), Parity::Space);
        assert!("sideways".parse::<Parity>().is_err());
        assert_eq!(Parity::Mark.to_string(), "mark");
    }

    #[test]
    fn test_data_and_stop_bits_conversion() {
        let bits: serialport::DataBits = DataBits::Six.into();
        assert_eq!(bits, serialport::DataBits::Six);
        let stop: serialport::StopBits = StopBits::Two.into();
        assert_eq!(stop, serialport::StopBits::Two);
    }
}
