//! Axum-based HTTP server for the kiosk.
//!
//! Provides REST endpoints for:
//! - GET `/api/angles` - Current and target angles
//! - GET `/api/state` - Full controller snapshot
//! - POST `/api/control/{axis}/{direction}` - Jog one axis (GET also accepted)
//! - POST `/api/move` - Relative move
//! - POST `/api/angle` - Absolute angle
//! - POST `/api/reset` - Return all axes to zero
//! - POST `/api/tare` - Make the current pose zero
//! - POST `/api/estop` - Emergency stop
//! - `/api/robot/*` - Robot info, speech, navigation and joystick
//! - GET `/` - Web UI (serves index.html)

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{Html, IntoResponse},
    routing::{get, post},
    Json, Router,
};
use parking_lot::Mutex;
use tower_http::cors::{Any, CorsLayer};

use crate::config::WebConfig;
use crate::controller::{ControllerSnapshot, MotorController};
use crate::error::{ControlError, RobotError};
use crate::traits::{Direction, PulseDriver, RobotInfo, RobotLink};

use super::api::{
    AnglesResponse, ApiResponse, CommandResponse, GotoRequest, JoystickRequest, MoveRequest,
    RotateRequest, SetAngleRequest, TtsRequest,
};

// ============================================================================
// Shared State
// ============================================================================

/// State shared by every handler: the motion controller and, when
/// connected, the robot.
pub struct KioskState<D: PulseDriver + 'static> {
    controller: Arc<MotorController<D>>,
    robot: Option<Mutex<Box<dyn RobotLink>>>,
}

impl<D: PulseDriver + 'static> KioskState<D> {
    /// State without a robot.
    pub fn new(controller: Arc<MotorController<D>>) -> Self {
        Self {
            controller,
            robot: None,
        }
    }

    /// Attach a robot.
    pub fn with_robot(mut self, robot: Box<dyn RobotLink>) -> Self {
        self.robot = Some(Mutex::new(robot));
        self
    }

    /// The motion controller.
    pub fn controller(&self) -> &Arc<MotorController<D>> {
        &self.controller
    }

    /// Whether a robot is attached.
    pub fn has_robot(&self) -> bool {
        self.robot.is_some()
    }

    fn with_robot_link<T>(
        &self,
        f: impl FnOnce(&mut dyn RobotLink) -> Result<T, RobotError>,
    ) -> Result<T, RobotError> {
        let robot = self.robot.as_ref().ok_or(RobotError::Unavailable)?;
        let mut guard = robot.lock();
        f(&mut **guard)
    }
}

type Shared<D> = State<Arc<KioskState<D>>>;
type CommandResult = (StatusCode, Json<ApiResponse<CommandResponse>>);

fn accepted(response: CommandResponse) -> CommandResult {
    (StatusCode::OK, Json(ApiResponse::ok(response)))
}

fn rejected(status: StatusCode, message: impl Into<String>) -> CommandResult {
    (status, Json(ApiResponse::err(message)))
}

fn control_error(e: ControlError) -> CommandResult {
    let status = match e {
        ControlError::UnknownAxis(_) => StatusCode::NOT_FOUND,
        ControlError::InvalidAngle(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    rejected(status, e.to_string())
}

fn robot_error(e: RobotError) -> CommandResult {
    let status = match e {
        RobotError::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
        RobotError::EmptyText | RobotError::EmptyLocation => StatusCode::BAD_REQUEST,
        _ => StatusCode::BAD_GATEWAY,
    };
    rejected(status, e.to_string())
}

fn bad_body(e: JsonRejection) -> CommandResult {
    rejected(StatusCode::BAD_REQUEST, e.body_text())
}

// ============================================================================
// Motion Handlers
// ============================================================================

/// GET /api/angles - Current and target angles
async fn get_angles<D: PulseDriver + 'static>(
    State(state): Shared<D>,
) -> Json<ApiResponse<AnglesResponse>> {
    let snapshot = state.controller.snapshot();
    Json(ApiResponse::ok(AnglesResponse::from(&snapshot)))
}

/// GET /api/state - Full controller snapshot
async fn get_state<D: PulseDriver + 'static>(
    State(state): Shared<D>,
) -> Json<ApiResponse<ControllerSnapshot>> {
    Json(ApiResponse::ok(state.controller.snapshot()))
}

/// /api/control/{axis}/{direction} - Jog by the axis's configured size
async fn jog<D: PulseDriver + 'static>(
    State(state): Shared<D>,
    Path((axis, direction)): Path<(String, String)>,
) -> CommandResult {
    let Some(direction) = Direction::from_text(&direction) else {
        return rejected(
            StatusCode::BAD_REQUEST,
            format!("invalid direction '{}'", direction),
        );
    };
    match state.controller.jog(&axis, direction) {
        Ok(steps) => accepted(
            CommandResponse::accepted("jog")
                .with_steps(direction.sign() * i64::from(steps)),
        ),
        Err(e) => control_error(e),
    }
}

/// POST /api/move - Relative move
///
/// Accepts JSON: `{"motor": "m1", "direction": "forward", "steps": 100}`
async fn move_motor<D: PulseDriver + 'static>(
    State(state): Shared<D>,
    body: Result<Json<MoveRequest>, JsonRejection>,
) -> CommandResult {
    let req = match body {
        Ok(Json(req)) => req,
        Err(e) => return bad_body(e),
    };
    match state
        .controller
        .move_motor(&req.motor, req.direction, req.steps)
    {
        Ok(()) => accepted(
            CommandResponse::accepted("queued")
                .with_steps(req.direction.sign() * i64::from(req.steps)),
        ),
        Err(e) => control_error(e),
    }
}

/// POST /api/angle - Absolute angle
///
/// Accepts JSON: `{"motor": "m1", "angle": 45.0}`
async fn set_angle<D: PulseDriver + 'static>(
    State(state): Shared<D>,
    body: Result<Json<SetAngleRequest>, JsonRejection>,
) -> CommandResult {
    let req = match body {
        Ok(Json(req)) => req,
        Err(e) => return bad_body(e),
    };
    match state.controller.set_target_angle(&req.motor, req.angle) {
        Ok(target) => accepted(CommandResponse::accepted("target_set").with_steps(target)),
        Err(e) => control_error(e),
    }
}

/// POST /api/reset - Return every axis to angle zero
async fn reset_angles<D: PulseDriver + 'static>(State(state): Shared<D>) -> CommandResult {
    state.controller.reset_angles();
    accepted(CommandResponse::accepted("returning_to_zero"))
}

/// POST /api/tare - Make the current pose zero
async fn tare_position<D: PulseDriver + 'static>(State(state): Shared<D>) -> CommandResult {
    state.controller.tare_position();
    accepted(CommandResponse::accepted("tared"))
}

/// POST /api/estop - Emergency stop
async fn emergency_stop<D: PulseDriver + 'static>(State(state): Shared<D>) -> CommandResult {
    state.controller.emergency_stop();
    accepted(CommandResponse::accepted("emergency_stop"))
}

// ============================================================================
// Robot Handlers
// ============================================================================

/// GET /api/robot/info - Availability, saved locations, current location
async fn robot_info<D: PulseDriver + 'static>(
    State(state): Shared<D>,
) -> Json<ApiResponse<RobotInfo>> {
    let info = match &state.robot {
        Some(robot) => robot.lock().info(),
        None => RobotInfo::unavailable(),
    };
    Json(ApiResponse::ok(info))
}

/// POST /api/robot/tts - Speak text. Accepts JSON: `{"text": "Hello"}`
async fn robot_tts<D: PulseDriver + 'static>(
    State(state): Shared<D>,
    body: Result<Json<TtsRequest>, JsonRejection>,
) -> CommandResult {
    let req = match body {
        Ok(Json(req)) => req,
        Err(e) => return bad_body(e),
    };
    match state.with_robot_link(|robot| robot.tts(&req.text)) {
        Ok(()) => accepted(CommandResponse::accepted("speaking")),
        Err(e) => robot_error(e),
    }
}

/// POST /api/robot/goto - Drive to a saved location. Accepts JSON: `{"location": "lobby"}`
async fn robot_goto<D: PulseDriver + 'static>(
    State(state): Shared<D>,
    body: Result<Json<GotoRequest>, JsonRejection>,
) -> CommandResult {
    let req = match body {
        Ok(Json(req)) => req,
        Err(e) => return bad_body(e),
    };
    match state.with_robot_link(|robot| robot.goto(&req.location)) {
        Ok(()) => accepted(CommandResponse::accepted("navigating")),
        Err(e) => robot_error(e),
    }
}

/// POST /api/robot/rotate - Rotate in place. Accepts JSON: `{"angle": 90}`
async fn robot_rotate<D: PulseDriver + 'static>(
    State(state): Shared<D>,
    body: Result<Json<RotateRequest>, JsonRejection>,
) -> CommandResult {
    let req = match body {
        Ok(Json(req)) => req,
        Err(e) => return bad_body(e),
    };
    match state.with_robot_link(|robot| robot.rotate(req.angle)) {
        Ok(()) => accepted(CommandResponse::accepted("rotating")),
        Err(e) => robot_error(e),
    }
}

/// POST /api/robot/joystick - Joystick input. Accepts JSON: `{"x": 0.0, "y": 0.5}`
async fn robot_joystick<D: PulseDriver + 'static>(
    State(state): Shared<D>,
    body: Result<Json<JoystickRequest>, JsonRejection>,
) -> CommandResult {
    let req = match body {
        Ok(Json(req)) => req,
        Err(e) => return bad_body(e),
    };
    let (x, y) = req.clamped();
    match state.with_robot_link(|robot| robot.joystick(x, y)) {
        Ok(()) => accepted(CommandResponse::accepted("joystick")),
        Err(e) => robot_error(e),
    }
}

/// POST /api/robot/stop - Stop robot movement
async fn robot_stop<D: PulseDriver + 'static>(State(state): Shared<D>) -> CommandResult {
    match state.with_robot_link(|robot| robot.stop()) {
        Ok(()) => accepted(CommandResponse::accepted("stopped")),
        Err(e) => robot_error(e),
    }
}

// ============================================================================
// Static
// ============================================================================

/// GET / - Serve the web UI
async fn index() -> impl IntoResponse {
    Html(include_str!("../../www/index.html"))
}

/// Fallback handler for 404
async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(ApiResponse::<()>::err("Not found")),
    )
}

// ============================================================================
// Server Builder
// ============================================================================

/// Configuration for the web server
#[derive(Debug, Clone)]
pub struct WebServerConfig {
    /// Address to bind to
    pub addr: SocketAddr,
    /// Whether to enable CORS for all origins
    pub cors_permissive: bool,
}

impl Default for WebServerConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([0, 0, 0, 0], 5001)),
            cors_permissive: true,
        }
    }
}

impl WebServerConfig {
    /// Create a new config with the given address
    pub fn new(addr: impl Into<SocketAddr>) -> Self {
        Self {
            addr: addr.into(),
            ..Default::default()
        }
    }

    /// Set whether CORS should be permissive
    pub fn cors(mut self, permissive: bool) -> Self {
        self.cors_permissive = permissive;
        self
    }

    /// Create from shared WebConfig.
    ///
    /// An unparsable host falls back to all interfaces with a warning.
    pub fn from_config(config: &WebConfig) -> Self {
        let ip = config.host.parse().unwrap_or_else(|_| {
            tracing::warn!("Invalid web host '{}', binding 0.0.0.0", config.host);
            [0, 0, 0, 0].into()
        });
        Self {
            addr: SocketAddr::new(ip, config.port),
            cors_permissive: config.cors_permissive,
        }
    }
}

/// Build the Axum router with all routes
pub fn build_router<D: PulseDriver + 'static>(
    state: Arc<KioskState<D>>,
    config: &WebServerConfig,
) -> Router {
    let mut router = Router::new()
        // Motion
        .route("/api/angles", get(get_angles::<D>))
        .route("/api/state", get(get_state::<D>))
        .route(
            "/api/control/:axis/:direction",
            get(jog::<D>).post(jog::<D>),
        )
        .route("/api/move", post(move_motor::<D>))
        .route("/api/angle", post(set_angle::<D>))
        .route("/api/reset", post(reset_angles::<D>))
        .route("/api/tare", post(tare_position::<D>))
        .route("/api/estop", post(emergency_stop::<D>))
        // Robot
        .route("/api/robot/info", get(robot_info::<D>))
        .route("/api/robot/tts", post(robot_tts::<D>))
        .route("/api/robot/goto", post(robot_goto::<D>))
        .route("/api/robot/rotate", post(robot_rotate::<D>))
        .route("/api/robot/joystick", post(robot_joystick::<D>))
        .route("/api/robot/stop", post(robot_stop::<D>))
        // Web UI
        .route("/", get(index))
        // Fallback
        .fallback(not_found)
        .with_state(state);

    // Add CORS if requested
    if config.cors_permissive {
        router = router.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );
    }

    router
}

/// Start the web server with shared state.
///
/// Runs until `shutdown` resolves, then drains in-flight requests.
pub async fn run_server_with_state<D, F>(
    state: Arc<KioskState<D>>,
    config: WebServerConfig,
    shutdown: F,
) -> Result<(), std::io::Error>
where
    D: PulseDriver + 'static,
    F: std::future::Future<Output = ()> + Send + 'static,
{
    let router = build_router(state, &config);

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    tracing::info!("Web server listening on http://{}", config.addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_config_from_web_config() {
        let config = WebServerConfig::from_config(&WebConfig::default().with_port(8080));
        assert_eq!(config.addr, SocketAddr::from(([0, 0, 0, 0], 8080)));
        assert!(config.cors_permissive);
    }

    #[test]
    fn server_config_invalid_host_falls_back() {
        let web = WebConfig::default().with_host("not an ip");
        let config = WebServerConfig::from_config(&web);
        assert_eq!(config.addr.ip(), std::net::IpAddr::from([0, 0, 0, 0]));
    }

    #[test]
    fn server_config_builder() {
        let config = WebServerConfig::new(([127, 0, 0, 1], 3000)).cors(false);
        assert_eq!(config.addr.port(), 3000);
        assert!(!config.cors_permissive);
    }
}
