use std::{collections::HashMap, net::SocketAddr, str::FromStr, sync::Arc, time::Duration};

use anyhow::Context;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use rumqttc::{AsyncClient, Event, Incoming, MqttOptions, QoS};
use serde::{Deserialize, Serialize};
use tokio::{
    net::TcpListener,
    sync::{watch, Mutex},
};
use tracing::{info, info_span, warn};

use thermostat_core::{
    Clock, ErrorKind, PowerState, Settings, SystemClock, ThermostatController, ThermostatError,
    ThermostatMode, TOPIC_CMD_COOL_SETPOINT, TOPIC_CMD_HEAT_SETPOINT, TOPIC_CMD_MODE,
    TOPIC_CMD_SETPOINT, TOPIC_CMD_STATE, TOPIC_CONTROLLER_STATE, TOPIC_RELAY_COOLING,
    TOPIC_RELAY_HEATING, TOPIC_SENSOR_TEMP,
};

use crate::config::RuntimeConfig;

#[derive(Clone)]
struct AppState {
    controller: Arc<Mutex<ThermostatController>>,
    mqtt: AsyncClient,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

#[derive(Debug, Deserialize)]
struct HistoryQuery {
    #[serde(default = "default_full")]
    full: bool,
}

fn default_full() -> bool {
    true
}

const MAX_MQTT_PAYLOAD_BYTES: usize = 512;

pub async fn run() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let path = RuntimeConfig::path_from_env();
    let mut runtime = RuntimeConfig::load(&path).await?;
    runtime.apply_env_overrides(|key| std::env::var(key).ok());

    let controller = ThermostatController::with_clock(
        runtime.controller,
        SystemClock,
        info_span!("thermostat"),
    )
    .context("invalid controller config")?;
    let controller = configure(controller, &runtime.settings).context("invalid initial settings")?;

    let heating = controller.heating().subscribe();
    let cooling = controller.cooling().subscribe();

    let mut mqtt_options =
        MqttOptions::new(runtime.mqtt.client_id.clone(), runtime.mqtt.host.clone(), runtime.mqtt.port);
    if !runtime.mqtt.user.is_empty() {
        mqtt_options.set_credentials(runtime.mqtt.user.clone(), runtime.mqtt.pass.clone());
    }
    let (mqtt, eventloop) = AsyncClient::new(mqtt_options, 64);

    let app_state = AppState {
        controller: Arc::new(Mutex::new(controller)),
        mqtt,
    };

    subscribe_topics(&app_state.mqtt).await?;
    spawn_mqtt_loop(app_state.clone(), eventloop);
    spawn_relay_publisher(app_state.mqtt.clone(), TOPIC_RELAY_HEATING, heating);
    spawn_relay_publisher(app_state.mqtt.clone(), TOPIC_RELAY_COOLING, cooling);
    spawn_state_publish_loop(app_state.clone());

    let app = router(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], runtime.http_port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind controller server at {addr}"))?;

    info!("controller listening on http://{addr}");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

fn router(app_state: AppState) -> Router {
    Router::new()
        .route("/api/status", get(handle_get_status))
        .route("/api/history", get(handle_get_history))
        .route("/api/temp", post(handle_set_temp))
        .route("/api/setpoint", post(handle_set_setpoint))
        .route("/api/setpoint/heat", post(handle_set_heat_setpoint))
        .route("/api/setpoint/cool", post(handle_set_cool_setpoint))
        .route("/api/calibration", post(handle_set_calibration))
        .route("/api/differential", post(handle_set_differential))
        .route("/api/mode", post(handle_set_mode))
        .route("/api/state", post(handle_set_state))
        .with_state(app_state)
}

/// Applies the configured settings through the validating setters.
/// Differential goes first so the setpoint pair is checked against it.
fn configure<C: Clock>(
    mut controller: ThermostatController<C>,
    settings: &Settings,
) -> thermostat_core::Result<ThermostatController<C>> {
    controller.set_differential(settings.differential)?;
    controller.set_calibration(settings.calibration)?;
    if let Some(setpoint) = settings.setpoint {
        controller.set_setpoint(setpoint)?;
    }
    if let Some(heat) = settings.heat_setpoint {
        controller.set_heat_setpoint(heat)?;
    }
    if let Some(cool) = settings.cool_setpoint {
        controller.set_cool_setpoint(cool)?;
    }
    controller.set_mode(settings.mode);
    Ok(controller)
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!("failed to listen for shutdown signal: {err}");
    }
    info!("controller shutting down");
}

async fn subscribe_topics(mqtt: &AsyncClient) -> anyhow::Result<()> {
    let topics = [
        TOPIC_SENSOR_TEMP,
        TOPIC_CMD_MODE,
        TOPIC_CMD_STATE,
        TOPIC_CMD_SETPOINT,
        TOPIC_CMD_HEAT_SETPOINT,
        TOPIC_CMD_COOL_SETPOINT,
    ];

    for topic in topics {
        mqtt.subscribe(topic, QoS::AtMostOnce)
            .await
            .with_context(|| format!("failed to subscribe to {topic}"))?;
    }
    Ok(())
}

fn spawn_mqtt_loop(app_state: AppState, mut eventloop: rumqttc::EventLoop) {
    tokio::spawn(async move {
        loop {
            match eventloop.poll().await {
                Ok(Event::Incoming(Incoming::Publish(message))) => {
                    if let Err(err) =
                        handle_mqtt_message(&app_state, &message.topic, &message.payload).await
                    {
                        warn!("mqtt message handling error: {err:#}");
                    }
                }
                Ok(Event::Incoming(Incoming::ConnAck(_))) => {
                    info!("mqtt connected");
                }
                Ok(_) => {}
                Err(err) => {
                    warn!("mqtt poll error: {err}");
                    tokio::time::sleep(Duration::from_secs(2)).await;
                }
            }
        }
    });
}

/// Mirrors one relay onto a retained topic, starting with its current value.
fn spawn_relay_publisher(mqtt: AsyncClient, topic: &'static str, mut relay: watch::Receiver<bool>) {
    tokio::spawn(async move {
        loop {
            let on = *relay.borrow_and_update();
            if let Err(err) = mqtt
                .publish(topic, QoS::AtLeastOnce, true, relay_payload(on))
                .await
            {
                warn!("relay publish on {topic} failed: {err}");
            }
            if relay.changed().await.is_err() {
                break;
            }
        }
    });
}

fn spawn_state_publish_loop(app_state: AppState) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(10));
        loop {
            interval.tick().await;

            let payload = {
                let controller = app_state.controller.lock().await;
                serde_json::to_vec(&controller.status())
            };

            match payload {
                Ok(body) => {
                    if let Err(err) = app_state
                        .mqtt
                        .publish(TOPIC_CONTROLLER_STATE, QoS::AtLeastOnce, true, body)
                        .await
                    {
                        warn!("controller state publish failed: {err}");
                    }
                }
                Err(err) => warn!("controller state serialization failed: {err}"),
            }
        }
    });
}

async fn handle_mqtt_message(
    app_state: &AppState,
    topic: &str,
    payload: &[u8],
) -> anyhow::Result<()> {
    if payload.len() > MAX_MQTT_PAYLOAD_BYTES {
        warn!(
            "dropping oversized MQTT payload on topic {} ({} bytes)",
            topic,
            payload.len()
        );
        return Ok(());
    }

    let message = std::str::from_utf8(payload).context("non utf8 mqtt payload")?;
    let mut controller = app_state.controller.lock().await;
    apply_command(&mut *controller, topic, message)
}

/// Routes one MQTT message to the controller. Unknown topics are ignored.
fn apply_command<C: Clock>(
    controller: &mut ThermostatController<C>,
    topic: &str,
    message: &str,
) -> anyhow::Result<()> {
    match topic {
        TOPIC_SENSOR_TEMP => {
            let temp: f64 = parse_payload(message)?;
            anyhow::ensure!(temp.is_finite(), "non-finite temperature '{message}'");
            controller
                .set_temp(temp)
                .context("rejected sensor reading")?;
        }
        TOPIC_CMD_MODE => controller.set_mode(parse_payload::<ThermostatMode>(message)?),
        TOPIC_CMD_STATE => controller.set_state(parse_payload::<PowerState>(message)?),
        TOPIC_CMD_SETPOINT => {
            controller.set_setpoint(parse_payload(message)?)?;
        }
        TOPIC_CMD_HEAT_SETPOINT => {
            controller.set_heat_setpoint(parse_payload(message)?)?;
        }
        TOPIC_CMD_COOL_SETPOINT => {
            controller.set_cool_setpoint(parse_payload(message)?)?;
        }
        _ => {}
    }
    Ok(())
}

fn parse_payload<T>(message: &str) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    message
        .trim()
        .parse::<T>()
        .map_err(|err| anyhow::anyhow!("invalid payload '{message}': {err}"))
}

async fn handle_get_status(State(state): State<AppState>) -> Response {
    let status = state.controller.lock().await.status();
    Json(status).into_response()
}

async fn handle_get_history(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> Response {
    let history = state.controller.lock().await.temp_history(query.full);
    Json(history).into_response()
}

async fn handle_set_temp(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let temp = match query_value::<f64>(&params) {
        Ok(temp) if temp.is_finite() => temp,
        Ok(_) => return error_response(StatusCode::BAD_REQUEST, "Invalid temperature value"),
        Err(message) => return error_response(StatusCode::BAD_REQUEST, message),
    };

    let result = state.controller.lock().await.set_temp(temp);
    match result {
        Ok(()) => handle_get_status(State(state)).await,
        Err(err) => thermostat_error_response(&err),
    }
}

async fn handle_set_setpoint(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    update_setting(state, &params, ThermostatController::set_setpoint).await
}

async fn handle_set_heat_setpoint(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    update_setting(state, &params, ThermostatController::set_heat_setpoint).await
}

async fn handle_set_cool_setpoint(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    update_setting(state, &params, ThermostatController::set_cool_setpoint).await
}

async fn handle_set_calibration(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    update_setting(state, &params, ThermostatController::set_calibration).await
}

async fn handle_set_differential(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    update_setting(state, &params, ThermostatController::set_differential).await
}

async fn update_setting<F>(state: AppState, params: &HashMap<String, String>, apply: F) -> Response
where
    F: FnOnce(&mut ThermostatController, i32) -> thermostat_core::Result<i32>,
{
    let value = match query_value::<i32>(params) {
        Ok(value) => value,
        Err(message) => return error_response(StatusCode::BAD_REQUEST, message),
    };

    let result = {
        let mut controller = state.controller.lock().await;
        apply(&mut *controller, value)
    };
    match result {
        Ok(_) => handle_get_status(State(state)).await,
        Err(err) => thermostat_error_response(&err),
    }
}

async fn handle_set_mode(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let Ok(mode) = query_value::<ThermostatMode>(&params) else {
        return error_response(
            StatusCode::BAD_REQUEST,
            "Invalid mode. Use 'single', 'dual', 'heat' or 'cool'",
        );
    };

    state.controller.lock().await.set_mode(mode);
    handle_get_status(State(state)).await
}

async fn handle_set_state(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let Ok(power) = query_value::<PowerState>(&params) else {
        return error_response(
            StatusCode::BAD_REQUEST,
            "Invalid state. Use 'online' or 'offline'",
        );
    };

    state.controller.lock().await.set_state(power);
    handle_get_status(State(state)).await
}

fn query_value<T: FromStr>(params: &HashMap<String, String>) -> Result<T, &'static str> {
    let value = params.get("value").ok_or("Missing 'value' parameter")?;
    value.trim().parse::<T>().map_err(|_| "Invalid 'value' parameter")
}

fn relay_payload(on: bool) -> &'static str {
    if on {
        "ON"
    } else {
        "OFF"
    }
}

fn error_status(err: &ThermostatError) -> StatusCode {
    match err.kind() {
        ErrorKind::Range | ErrorKind::Consistency | ErrorKind::Config => StatusCode::BAD_REQUEST,
        ErrorKind::Offline => StatusCode::CONFLICT,
    }
}

fn thermostat_error_response(err: &ThermostatError) -> Response {
    error_response(error_status(err), &err.to_string())
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(ErrorBody {
            error: message.to_string(),
        }),
    )
        .into_response()
}
