pub const TOPIC_SENSOR_TEMP: &str = "thermostat/sensor/temperature";

pub const TOPIC_CONTROLLER_STATE: &str = "thermostat/controller/state";
pub const TOPIC_RELAY_HEATING: &str = "thermostat/relay/heating";
pub const TOPIC_RELAY_COOLING: &str = "thermostat/relay/cooling";

pub const TOPIC_CMD_MODE: &str = "thermostat/cmnd/mode";
pub const TOPIC_CMD_STATE: &str = "thermostat/cmnd/state";
pub const TOPIC_CMD_SETPOINT: &str = "thermostat/cmnd/setpoint";
pub const TOPIC_CMD_HEAT_SETPOINT: &str = "thermostat/cmnd/setpoint/heat";
pub const TOPIC_CMD_COOL_SETPOINT: &str = "thermostat/cmnd/setpoint/cool";
