use tracing::{debug, info, Span};

use crate::{
    clock::{Clock, SystemClock},
    config::{
        check_range, ControllerConfig, Settings, CALIBRATION_MAX, CALIBRATION_MIN,
        DIFFERENTIAL_MAX, DIFFERENTIAL_MIN, SETPOINT_MAX, SETPOINT_MIN,
    },
    error::{Result, ThermostatError},
    history::TemperatureHistory,
    relay::Relay,
    types::{ControllerStatus, PowerState, TemperatureReading, ThermostatMode},
};

/// Thermostat with a bounded temperature memory, single or dual setpoints and
/// two latched relay outputs.
///
/// All methods are synchronous. Callers sharing one controller across tasks
/// must serialize access themselves, e.g. behind a single mutex.
#[derive(Debug)]
pub struct ThermostatController<C = SystemClock> {
    config: ControllerConfig,
    settings: Settings,
    state: PowerState,
    history: TemperatureHistory,
    heating: Relay,
    cooling: Relay,
    clock: C,
    span: Span,
}

impl ThermostatController<SystemClock> {
    pub fn new(config: ControllerConfig) -> Result<Self> {
        Self::with_clock(config, SystemClock, Span::none())
    }
}

impl<C: Clock> ThermostatController<C> {
    /// Builds a controller reading time from `clock` and emitting its log
    /// events under `span`.
    pub fn with_clock(config: ControllerConfig, clock: C, span: Span) -> Result<Self> {
        config.validate()?;

        let mut controller = Self {
            config,
            settings: Settings::default(),
            state: PowerState::Online,
            history: TemperatureHistory::new(config.queue_len),
            heating: Relay::new(),
            cooling: Relay::new(),
            clock,
            span,
        };
        controller.set_mode_single();
        controller.set_state_online();
        Ok(controller)
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn setpoint(&self) -> Option<i32> {
        self.settings.setpoint
    }

    pub fn heat_setpoint(&self) -> Option<i32> {
        self.settings.heat_setpoint
    }

    pub fn cool_setpoint(&self) -> Option<i32> {
        self.settings.cool_setpoint
    }

    pub fn calibration(&self) -> i32 {
        self.settings.calibration
    }

    pub fn differential(&self) -> i32 {
        self.settings.differential
    }

    pub fn mode(&self) -> ThermostatMode {
        self.settings.mode
    }

    pub fn state(&self) -> PowerState {
        self.state
    }

    pub fn online(&self) -> bool {
        self.state == PowerState::Online
    }

    /// Most recently recorded (calibrated) temperature.
    pub fn current_temp(&self) -> Option<f64> {
        self.history.latest().map(|reading| reading.value)
    }

    pub fn heating(&self) -> &Relay {
        &self.heating
    }

    pub fn cooling(&self) -> &Relay {
        &self.cooling
    }

    pub fn is_heating(&self) -> bool {
        self.heating.is_set()
    }

    pub fn is_cooling(&self) -> bool {
        self.cooling.is_set()
    }

    /// Average change between consecutive readings inside the window.
    pub fn avg_temp_change(&self) -> f64 {
        self.history.mean_change_since(self.window_start())
    }

    /// Snapshot of the history, either all of it or only the readings inside
    /// the window. Oldest first.
    pub fn temp_history(&self, full: bool) -> Vec<TemperatureReading> {
        if full {
            self.history.snapshot()
        } else {
            self.history.since(self.window_start())
        }
    }

    pub fn set_state_online(&mut self) {
        self.state = PowerState::Online;
        info!(parent: &self.span, "thermostat online");
    }

    pub fn set_state_offline(&mut self) {
        self.state = PowerState::Offline;
        info!(parent: &self.span, "thermostat offline");
        self.heating.clear();
        self.cooling.clear();
    }

    pub fn set_state(&mut self, state: PowerState) {
        match state {
            PowerState::Online => self.set_state_online(),
            PowerState::Offline => self.set_state_offline(),
        }
    }

    pub fn set_mode_single(&mut self) {
        self.enter_mode(ThermostatMode::Single);
    }

    pub fn set_mode_dual(&mut self) {
        self.enter_mode(ThermostatMode::Dual);
    }

    pub fn set_mode_heat(&mut self) {
        self.enter_mode(ThermostatMode::Heat);
    }

    pub fn set_mode_cool(&mut self) {
        self.enter_mode(ThermostatMode::Cool);
    }

    pub fn set_mode(&mut self, mode: ThermostatMode) {
        self.enter_mode(mode);
    }

    pub fn set_setpoint(&mut self, value: i32) -> Result<i32> {
        let setpoint = check_range("setpoint", value, SETPOINT_MIN, SETPOINT_MAX)?;
        self.settings.setpoint = Some(setpoint);
        info!(parent: &self.span, setpoint, "setpoint set");
        Ok(setpoint)
    }

    pub fn set_cool_setpoint(&mut self, value: i32) -> Result<i32> {
        let cool_setpoint = check_range("cool setpoint", value, SETPOINT_MIN, SETPOINT_MAX)?;
        if let Some(heat_setpoint) = self.settings.heat_setpoint {
            if cool_setpoint < heat_setpoint + self.settings.differential {
                return Err(ThermostatError::InconsistentSetpoint {
                    field: "cool setpoint",
                    value: cool_setpoint,
                    other_field: "heat setpoint",
                    other: heat_setpoint,
                });
            }
        }
        self.settings.cool_setpoint = Some(cool_setpoint);
        info!(parent: &self.span, cool_setpoint, "cool setpoint set");
        Ok(cool_setpoint)
    }

    pub fn set_heat_setpoint(&mut self, value: i32) -> Result<i32> {
        let heat_setpoint = check_range("heat setpoint", value, SETPOINT_MIN, SETPOINT_MAX)?;
        if let Some(cool_setpoint) = self.settings.cool_setpoint {
            if heat_setpoint > cool_setpoint - self.settings.differential {
                return Err(ThermostatError::InconsistentSetpoint {
                    field: "heat setpoint",
                    value: heat_setpoint,
                    other_field: "cool setpoint",
                    other: cool_setpoint,
                });
            }
        }
        self.settings.heat_setpoint = Some(heat_setpoint);
        info!(parent: &self.span, heat_setpoint, "heat setpoint set");
        Ok(heat_setpoint)
    }

    /// Offset added to every raw reading.
    pub fn set_calibration(&mut self, value: i32) -> Result<i32> {
        let calibration = check_range("calibration", value, CALIBRATION_MIN, CALIBRATION_MAX)?;
        self.settings.calibration = calibration;
        info!(parent: &self.span, calibration, "calibration set");
        Ok(calibration)
    }

    /// Tolerance around a setpoint before a relay is engaged. Existing
    /// setpoint pairs are not re-checked against the new value.
    pub fn set_differential(&mut self, value: i32) -> Result<i32> {
        let differential = check_range("differential", value, DIFFERENTIAL_MIN, DIFFERENTIAL_MAX)?;
        self.settings.differential = differential;
        info!(parent: &self.span, differential, "differential set");
        Ok(differential)
    }

    /// Records a raw sensor reading, applies calibration and re-evaluates the
    /// relays.
    pub fn set_temp(&mut self, value: f64) -> Result<()> {
        if !self.online() {
            return Err(ThermostatError::Offline);
        }

        debug!(parent: &self.span, raw = value, "received temperature");
        let calibrated = value + f64::from(self.settings.calibration);
        if self.settings.calibration != 0 {
            debug!(parent: &self.span, calibrated, "calibrated temperature");
        }

        self.history.push(TemperatureReading {
            value: calibrated,
            timestamp: self.clock.now(),
        });

        self.update_relays();
        Ok(())
    }

    pub fn status(&self) -> ControllerStatus {
        ControllerStatus {
            mode: self.settings.mode.as_str(),
            state: self.state.as_str(),
            setpoint: self.settings.setpoint,
            heat_setpoint: self.settings.heat_setpoint,
            cool_setpoint: self.settings.cool_setpoint,
            differential: self.settings.differential,
            calibration: self.settings.calibration,
            current_temp: self.current_temp(),
            avg_temp_change: self.avg_temp_change(),
            heating: self.is_heating(),
            cooling: self.is_cooling(),
            history_len: self.history.len(),
        }
    }

    fn enter_mode(&mut self, mode: ThermostatMode) {
        self.settings.mode = mode;
        self.heating.clear();
        self.cooling.clear();
        info!(parent: &self.span, mode = mode.as_str(), "thermostat mode set");
    }

    fn window_start(&self) -> f64 {
        self.clock.now() - self.config.window_len_secs as f64
    }

    fn should_heat(&self) -> bool {
        let Some(temp) = self.current_temp() else {
            return false;
        };
        let differential = f64::from(self.settings.differential);

        let target = match self.settings.mode {
            ThermostatMode::Cool => return false,
            ThermostatMode::Single => self.settings.setpoint,
            ThermostatMode::Dual | ThermostatMode::Heat => self.settings.heat_setpoint,
        };
        target.is_some_and(|setpoint| temp < f64::from(setpoint) - differential)
    }

    fn should_cool(&self) -> bool {
        let Some(temp) = self.current_temp() else {
            return false;
        };
        let differential = f64::from(self.settings.differential);

        let target = match self.settings.mode {
            ThermostatMode::Heat => return false,
            ThermostatMode::Single => self.settings.setpoint,
            ThermostatMode::Dual | ThermostatMode::Cool => self.settings.cool_setpoint,
        };
        target.is_some_and(|setpoint| temp > f64::from(setpoint) + differential)
    }

    // Each relay only moves on its own edge.
    fn update_relays(&self) {
        if self.should_heat() {
            if self.heating.set() {
                info!(parent: &self.span, "heating on");
            }
        } else if self.heating.clear() {
            info!(parent: &self.span, "heating off");
        }

        if self.should_cool() {
            if self.cooling.set() {
                info!(parent: &self.span, "cooling on");
            }
        } else if self.cooling.clear() {
            info!(parent: &self.span, "cooling off");
        }
    }
}
