//! ICSP pin access through the Linux GPIO character device
//!
//! PGC is always an output. PGD and MCLR change direction during a session:
//! PGD is released while the target shifts data out, and MCLR is released
//! (left to the board pull-up) when no session is active.

use std::time::{Duration, Instant};

use crate::error::{LinuxGpioError, Result};

use gpiocdev::line::{Offset, Value};
use gpiocdev::request::{Config, Request};

use picflasher_core::programmer::{Direction, IcspPins, Pin};

/// Delays at or above this length sleep instead of spinning
const SPIN_LIMIT_US: u32 = 100;

/// Configuration for opening a Linux GPIO ICSP link
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinuxGpioIcspConfig {
    /// Device path (e.g., "/dev/gpiochip0")
    pub device: String,
    /// PGC line offset
    pub clock: Offset,
    /// PGD line offset
    pub data: Offset,
    /// MCLR line offset
    pub mclr: Offset,
}

impl LinuxGpioIcspConfig {
    /// Create a configuration for the given device path and lines
    pub fn new(device: impl Into<String>, clock: Offset, data: Offset, mclr: Offset) -> Self {
        Self {
            device: device.into(),
            clock,
            data,
            mclr,
        }
    }
}

fn level(high: bool) -> Value {
    if high {
        Value::Active
    } else {
        Value::Inactive
    }
}

/// Linux GPIO ICSP link
pub struct LinuxGpioIcsp {
    request: Request,
    /// Full line configuration, kept so direction changes can be re-applied
    config: Config,
    clock: Offset,
    data: Offset,
    mclr: Offset,
    data_dir: Direction,
    mclr_dir: Direction,
}

impl LinuxGpioIcsp {
    /// Request the three lines
    ///
    /// PGC and PGD start as low outputs, MCLR starts released.
    pub fn open(config: &LinuxGpioIcspConfig) -> Result<Self> {
        if config.device.is_empty() {
            return Err(LinuxGpioError::NoDevice);
        }
        for (a, b) in [
            (config.clock, config.data),
            (config.clock, config.mclr),
            (config.data, config.mclr),
        ] {
            if a == b {
                return Err(LinuxGpioError::DuplicateLine(a));
            }
        }

        log::debug!("linux_gpio: Opening device {}", config.device);

        let mut lines = Config::default();
        lines.with_line(config.clock).as_output(Value::Inactive);
        lines.with_line(config.data).as_output(Value::Inactive);
        lines.with_line(config.mclr).as_input();

        let request = Request::from_config(lines.clone())
            .on_chip(&config.device)
            .with_consumer("picflasher")
            .request()
            .map_err(|source| LinuxGpioError::LineRequestFailed {
                path: config.device.clone(),
                source,
            })?;

        log::info!(
            "linux_gpio: Opened {} (clk={}, data={}, mclr={})",
            config.device,
            config.clock,
            config.data,
            config.mclr
        );

        Ok(Self {
            request,
            config: lines,
            clock: config.clock,
            data: config.data,
            mclr: config.mclr,
            data_dir: Direction::Output,
            mclr_dir: Direction::Input,
        })
    }

    fn offset(&self, pin: Pin) -> Offset {
        match pin {
            Pin::Clock => self.clock,
            Pin::Data => self.data,
            Pin::Mclr => self.mclr,
        }
    }

    fn direction(&self, pin: Pin) -> Direction {
        match pin {
            Pin::Clock => Direction::Output,
            Pin::Data => self.data_dir,
            Pin::Mclr => self.mclr_dir,
        }
    }
}

impl IcspPins for LinuxGpioIcsp {
    fn set_direction(&mut self, pin: Pin, direction: Direction) {
        // PGC never changes direction
        if pin == Pin::Clock || self.direction(pin) == direction {
            return;
        }
        match pin {
            Pin::Data => self.data_dir = direction,
            _ => self.mclr_dir = direction,
        }

        let offset = self.offset(pin);
        let line = self.config.with_line(offset);
        match direction {
            Direction::Input => line.as_input(),
            Direction::Output => line.as_output(Value::Inactive),
        };
        if let Err(e) = self.request.reconfigure(&self.config) {
            log::error!("Failed to set direction of {:?}: {}", pin, e);
        }
    }

    fn write(&mut self, pin: Pin, high: bool) {
        if self.direction(pin) == Direction::Input {
            log::trace!("linux_gpio: ignoring write to released {:?}", pin);
            return;
        }
        if let Err(e) = self.request.set_value(self.offset(pin), level(high)) {
            log::error!("Failed to set {:?}: {}", pin, e);
        }
    }

    fn read(&mut self, pin: Pin) -> bool {
        match self.request.value(self.offset(pin)) {
            Ok(Value::Active) => true,
            Ok(Value::Inactive) => false,
            Err(e) => {
                log::error!("Failed to get {:?}: {}", pin, e);
                false
            }
        }
    }

    fn delay_us(&mut self, us: u32) {
        if us >= SPIN_LIMIT_US {
            std::thread::sleep(Duration::from_micros(us as u64));
            return;
        }
        let until = Instant::now() + Duration::from_micros(us as u64);
        while Instant::now() < until {
            std::hint::spin_loop();
        }
    }
}

/// Parse programmer options from a list of key-value pairs
///
/// # Supported Options
///
/// - `dev=/dev/gpiochipN` - GPIO chip device path (required, or use gpiochip)
/// - `gpiochip=N` - GPIO chip number (alternative to dev)
/// - `clk=N` or `pgc=N` - PGC line offset (required)
/// - `data=N` or `pgd=N` - PGD line offset (required)
/// - `mclr=N` - MCLR line offset (required)
pub fn parse_options(options: &[(&str, &str)]) -> std::result::Result<LinuxGpioIcspConfig, String> {
    let mut config = LinuxGpioIcspConfig::default();
    let mut clock = None;
    let mut data = None;
    let mut mclr = None;
    let mut gpiochip: Option<u32> = None;

    let line = |name: &str, value: &str| -> std::result::Result<Option<Offset>, String> {
        value
            .parse()
            .map(Some)
            .map_err(|_| format!("Invalid {} value: {}", name, value))
    };

    for (key, value) in options {
        match *key {
            "dev" => {
                config.device = value.to_string();
            }
            "gpiochip" => {
                gpiochip = Some(
                    value
                        .parse()
                        .map_err(|_| format!("Invalid gpiochip value: {}", value))?,
                );
            }
            "clk" | "pgc" => clock = line("clk", value)?,
            "data" | "pgd" => data = line("data", value)?,
            "mclr" => mclr = line("mclr", value)?,
            _ => {
                log::warn!("linux_gpio: Unknown option: {}={}", key, value);
            }
        }
    }

    if config.device.is_empty() {
        if let Some(n) = gpiochip {
            if n > 9 {
                return Err("Maximum gpiochip number supported is 9".to_string());
            }
            config.device = format!("/dev/gpiochip{}", n);
        } else {
            return Err("Either 'dev' or 'gpiochip' must be specified.\n\
                 e.g. linux_gpio:dev=/dev/gpiochip0,clk=23,data=24,mclr=18"
                .to_string());
        }
    } else if gpiochip.is_some() {
        return Err("Only one of 'dev' or 'gpiochip' can be specified".to_string());
    }

    config.clock = clock.ok_or("Missing required parameter: clk")?;
    config.data = data.ok_or("Missing required parameter: data")?;
    config.mclr = mclr.ok_or("Missing required parameter: mclr")?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_dev_path() {
        let config = parse_options(&[
            ("dev", "/dev/gpiochip1"),
            ("clk", "23"),
            ("data", "24"),
            ("mclr", "18"),
        ])
        .unwrap();
        assert_eq!(config, LinuxGpioIcspConfig::new("/dev/gpiochip1", 23, 24, 18));
    }

    #[test]
    fn test_parse_gpiochip_and_aliases() {
        let config =
            parse_options(&[("gpiochip", "0"), ("pgc", "5"), ("pgd", "6"), ("mclr", "13")])
                .unwrap();
        assert_eq!(config.device, "/dev/gpiochip0");
        assert_eq!((config.clock, config.data, config.mclr), (5, 6, 13));
    }

    #[test]
    fn test_parse_requires_device() {
        let err = parse_options(&[("clk", "1"), ("data", "2"), ("mclr", "3")]).unwrap_err();
        assert!(err.contains("'dev' or 'gpiochip'"));

        let err = parse_options(&[
            ("dev", "/dev/gpiochip0"),
            ("gpiochip", "0"),
            ("clk", "1"),
            ("data", "2"),
            ("mclr", "3"),
        ])
        .unwrap_err();
        assert!(err.contains("Only one"));

        assert!(parse_options(&[("gpiochip", "10"), ("clk", "1"), ("data", "2"), ("mclr", "3")])
            .is_err());
    }

    #[test]
    fn test_parse_requires_every_line() {
        let err = parse_options(&[("gpiochip", "0"), ("clk", "1"), ("data", "2")]).unwrap_err();
        assert_eq!(err, "Missing required parameter: mclr");

        let err = parse_options(&[("gpiochip", "0"), ("clk", "x"), ("data", "2"), ("mclr", "3")])
            .unwrap_err();
        assert_eq!(err, "Invalid clk value: x");
    }
}
