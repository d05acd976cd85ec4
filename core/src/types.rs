use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::UnknownVariant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThermostatMode {
    /// One setpoint drives both heating and cooling.
    #[default]
    Single,
    /// Separate heat and cool setpoints.
    Dual,
    Heat,
    Cool,
}

impl ThermostatMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Single => "single",
            Self::Dual => "dual",
            Self::Heat => "heat",
            Self::Cool => "cool",
        }
    }
}

impl fmt::Display for ThermostatMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ThermostatMode {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "single" => Ok(Self::Single),
            "dual" => Ok(Self::Dual),
            "heat" => Ok(Self::Heat),
            "cool" => Ok(Self::Cool),
            _ => Err(UnknownVariant(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PowerState {
    Online,
    Offline,
}

impl PowerState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Online => "online",
            Self::Offline => "offline",
        }
    }
}

impl FromStr for PowerState {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "online" | "on" => Ok(Self::Online),
            "offline" | "off" => Ok(Self::Offline),
            _ => Err(UnknownVariant(s.to_string())),
        }
    }
}

/// A calibrated reading and the time it was accepted, in seconds since the
/// Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TemperatureReading {
    pub value: f64,
    pub timestamp: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ControllerStatus {
    pub mode: &'static str,
    pub state: &'static str,
    pub setpoint: Option<i32>,
    #[serde(rename = "heatSetpoint")]
    pub heat_setpoint: Option<i32>,
    #[serde(rename = "coolSetpoint")]
    pub cool_setpoint: Option<i32>,
    pub differential: i32,
    pub calibration: i32,
    #[serde(rename = "currentTemp")]
    pub current_temp: Option<f64>,
    #[serde(rename = "avgTempChange")]
    pub avg_temp_change: f64,
    pub heating: bool,
    pub cooling: bool,
    #[serde(rename = "historyLen")]
    pub history_len: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_parses_case_insensitively() {
        assert_eq!("DUAL".parse::<ThermostatMode>(), Ok(ThermostatMode::Dual));
        assert_eq!(" cool ".parse::<ThermostatMode>(), Ok(ThermostatMode::Cool));
        assert!("auto".parse::<ThermostatMode>().is_err());
    }

    #[test]
    fn mode_serializes_lowercase() {
        let json = serde_json::to_string(&ThermostatMode::Heat).unwrap();
        assert_eq!(json, "\"heat\"");
    }

    #[test]
    fn power_state_accepts_on_off_aliases() {
        assert_eq!("ON".parse::<PowerState>(), Ok(PowerState::Online));
        assert_eq!("offline".parse::<PowerState>(), Ok(PowerState::Offline));
        assert!("standby".parse::<PowerState>().is_err());
    }
}
