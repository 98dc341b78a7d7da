//! Configuration for the `serio` command-line tool.
//!
//! TOML-based, with environment variable overrides. The library itself never
//! reads it; `Config::port_configuration` turns it into the
//! [`PortConfiguration`](crate::PortConfiguration) that `GuardedPort::open`
//! takes.
//!
//! # Configuration Resolution
//!
//! 1. `SERIO_CONFIG` environment variable (explicit path)
//! 2. `./serio.toml` (current directory)
//! 3. `serio.toml` in the platform config directory
//! 4. Built-in defaults (no file required)
//!
//! # Environment Overrides
//!
//! The pattern is `SERIO_<SECTION>_<KEY>`, for example:
//! - `SERIO_PORT_NAME=/dev/ttyACM0`
//! - `SERIO_PORT_BAUD_RATE=9600`
//! - `SERIO_TIMEOUTS_DEADLINE_MS=0`
//!
//! # Example
//!
//! ```toml
//! [port]
//! name = "/dev/ttyUSB0"
//! baud_rate = 115200
//! parity = "none"
//! read_timeout_ms = 3000
//!
//! [timeouts]
//! open_ms = 10000
//! write_ms = 2000
//! deadline_ms = 5000
//!
//! [logging]
//! level = "info"
//! format = "pretty"
//! ```

mod error;
mod loader;
mod schema;

pub use error::{ConfigError, ConfigResult};
pub use loader::{
    get_default_config_dir, get_default_config_path, resolve_config_path, ConfigLoader,
};
pub use schema::{Config, LogFormat, LoggingConfig, PortSection, TimeoutsConfig};
