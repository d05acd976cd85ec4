pub mod clock;
pub mod config;
pub mod error;
pub mod history;
pub mod relay;
pub mod thermostat;
pub mod topics;
pub mod types;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ControllerConfig, Settings};
pub use error::{ErrorKind, Result, ThermostatError, UnknownVariant};
pub use history::TemperatureHistory;
pub use relay::Relay;
pub use thermostat::ThermostatController;
pub use topics::*;
pub use types::{ControllerStatus, PowerState, TemperatureReading, ThermostatMode};
