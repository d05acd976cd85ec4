use thiserror::Error;

/// Coarse classification of [`ThermostatError`], for callers that only need
/// to decide how to react.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Range,
    Consistency,
    Config,
    Offline,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ThermostatError {
    #[error("{field} {value}° is out of range ({min}° to {max}°)")]
    OutOfRange {
        field: &'static str,
        value: i32,
        min: i32,
        max: i32,
    },
    #[error("{field} {value}° invalid relative to {other_field} ({other}°)")]
    InconsistentSetpoint {
        field: &'static str,
        value: i32,
        other_field: &'static str,
        other: i32,
    },
    #[error("invalid controller config: {0}")]
    InvalidConfig(&'static str),
    #[error("cannot set temperature while thermostat is offline")]
    Offline,
}

impl ThermostatError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::OutOfRange { .. } => ErrorKind::Range,
            Self::InconsistentSetpoint { .. } => ErrorKind::Consistency,
            Self::InvalidConfig(_) => ErrorKind::Config,
            Self::Offline => ErrorKind::Offline,
        }
    }
}

pub type Result<T> = std::result::Result<T, ThermostatError>;

/// A mode or state name that does not match any known variant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown value '{0}'")]
pub struct UnknownVariant(pub String);
