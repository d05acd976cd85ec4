use serde::{Deserialize, Serialize};

use crate::{
    error::{Result, ThermostatError},
    types::ThermostatMode,
};

pub const SETPOINT_MIN: i32 = 0;
pub const SETPOINT_MAX: i32 = 100;

pub const CALIBRATION_MIN: i32 = -5;
pub const CALIBRATION_MAX: i32 = 5;

pub const DIFFERENTIAL_MIN: i32 = 0;
pub const DIFFERENTIAL_MAX: i32 = 5;

pub const DEFAULT_QUEUE_LEN: usize = 10;
pub const DEFAULT_WINDOW_LEN_SECS: u64 = 60 * 60;

/// Construction parameters. Validated once when a controller is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Maximum number of readings kept in history.
    pub queue_len: usize,
    /// Horizon for windowed history queries and trend.
    pub window_len_secs: u64,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            queue_len: DEFAULT_QUEUE_LEN,
            window_len_secs: DEFAULT_WINDOW_LEN_SECS,
        }
    }
}

impl ControllerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.queue_len == 0 {
            return Err(ThermostatError::InvalidConfig(
                "temperature queue_len must be a positive integer",
            ));
        }
        if self.window_len_secs == 0 {
            return Err(ThermostatError::InvalidConfig(
                "temperature window_len must be a positive integer",
            ));
        }
        Ok(())
    }
}

/// Operator-facing settings. The controller only ever holds values that
/// passed its setters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub setpoint: Option<i32>,
    pub heat_setpoint: Option<i32>,
    pub cool_setpoint: Option<i32>,
    pub differential: i32,
    pub calibration: i32,
    pub mode: ThermostatMode,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            setpoint: None,
            heat_setpoint: None,
            cool_setpoint: None,
            differential: 1,
            calibration: 0,
            mode: ThermostatMode::Single,
        }
    }
}

pub(crate) fn check_range(field: &'static str, value: i32, min: i32, max: i32) -> Result<i32> {
    if (min..=max).contains(&value) {
        Ok(value)
    } else {
        Err(ThermostatError::OutOfRange {
            field,
            value,
            min,
            max,
        })
    }
}
