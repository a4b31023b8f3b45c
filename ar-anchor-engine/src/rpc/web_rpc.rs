use bevy::ecs::system::SystemParam;
use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use super::tracker_bridge::{BridgeFailure, BridgeLink};
use crate::content::ContentConfigError;
use crate::engine::anchors::anchor_systems::{AnchorFound, AnchorLost};
use crate::engine::anchors::camera_facing::{CameraFacing, SwitchCamera};
use crate::engine::core::app_state::{ViewMode, ViewModeRequest};
use crate::engine::systems::fatal_error::{FatalError, FatalErrorState, ReloadRequested};
use crate::engine::tracking::TrackingSystems;
use crate::engine::tracking::anchor_state::{AnchorStateStore, AnyTargetVisible};
use crate::engine::tracking::channel::TrackerUpdate;
use crate::engine::tracking::driver::{
    CameraFailed, CameraReady, SessionPhaseChanged, TrackingPhase,
};
use crate::engine::tracking::matrix::TargetDimensions;
use crate::engine::tracking::tracker::{TrackerError, VideoSource};

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::JsValue;

#[cfg(target_arch = "wasm32")]
use web_sys::{MessageEvent, window};

/// JSON-RPC 2.0 request structure. Requests without an id are notifications.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct RpcRequest {
    pub jsonrpc: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
    #[serde(default)]
    pub id: Option<serde_json::Value>,
}

/// JSON-RPC 2.0 response structure.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct RpcResponse {
    pub jsonrpc: String,
    pub result: Option<serde_json::Value>,
    pub error: Option<RpcError>,
    pub id: Option<serde_json::Value>,
}

/// JSON-RPC 2.0 notification structure for one-way communication.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct RpcNotification {
    pub jsonrpc: String,
    pub method: String,
    pub params: serde_json::Value,
}

/// JSON-RPC error structure following specification.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RpcError {
    pub code: i32,
    pub message: String,
    pub data: Option<serde_json::Value>,
}

/// Outgoing traffic to the host page.
#[derive(Resource, Default)]
pub struct WebRpcInterface {
    outgoing_notifications: Vec<RpcNotification>,
    outgoing_responses: Vec<RpcResponse>,
}

impl WebRpcInterface {
    /// Send notification to the host page without expecting a response.
    pub fn send_notification(&mut self, method: &str, params: serde_json::Value) {
        self.outgoing_notifications.push(RpcNotification {
            jsonrpc: "2.0".to_string(),
            method: method.to_string(),
            params,
        });
    }

    fn queue_response(&mut self, response: RpcResponse) {
        self.outgoing_responses.push(response);
    }
}

/// Messages that would have been posted to the parent window on a native
/// build, serialised in send order.
#[derive(Resource, Default)]
pub struct RpcOutbox(pub Vec<String>);

/// Raw messages received from the host, waiting for the next frame.
#[derive(Resource, Clone, Default)]
pub struct MessageQueue(std::sync::Arc<std::sync::Mutex<Vec<String>>>);

impl MessageQueue {
    pub fn push(&self, message: impl Into<String>) {
        if let Ok(mut queue) = self.0.lock() {
            queue.push(message.into());
        }
    }

    fn take(&self) -> Vec<String> {
        match self.0.lock() {
            Ok(mut queue) => std::mem::take(&mut *queue),
            Err(_) => Vec::new(),
        }
    }
}

/// JSON-RPC bridge between the canvas and the page hosting the camera and
/// the tracking engine.
pub struct WebRpcPlugin;

impl Plugin for WebRpcPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<WebRpcInterface>()
            .init_resource::<RpcOutbox>()
            .init_resource::<MessageQueue>()
            .init_resource::<BridgeLink>()
            .add_event::<IncomingRpcMessage>()
            .add_event::<CameraReady>()
            .add_event::<CameraFailed>()
            .add_event::<ViewModeRequest>()
            .add_event::<SwitchCamera>()
            .add_event::<AnchorFound>()
            .add_event::<AnchorLost>()
            .add_event::<SessionPhaseChanged>()
            .add_event::<FatalError>()
            .add_event::<ReloadRequested>()
            .add_event::<ContentConfigError>()
            .configure_sets(
                Update,
                (TrackingSystems::Session, TrackingSystems::Notify).chain(),
            )
            .add_systems(
                Update,
                (process_incoming_messages, handle_rpc_messages)
                    .chain()
                    .before(TrackingSystems::Session),
            )
            .add_systems(
                Update,
                (
                    forward_tracker_commands,
                    notify_anchor_transitions,
                    notify_session_phase,
                    notify_fatal_errors,
                    notify_content_errors,
                    notify_reload,
                    send_outgoing_messages,
                )
                    .chain()
                    .in_set(TrackingSystems::Notify),
            );

        #[cfg(target_arch = "wasm32")]
        app.add_systems(Startup, setup_message_listener);
    }
}

#[cfg(target_arch = "wasm32")]
fn setup_message_listener(queue: Res<MessageQueue>) {
    let queue = queue.clone();

    let closure = Closure::wrap(Box::new(move |event: MessageEvent| {
        // Only string payloads can carry JSON-RPC.
        if let Ok(data) = event.data().dyn_into::<js_sys::JsString>() {
            let message_str: String = data.into();
            if message_str.contains("jsonrpc") {
                queue.push(message_str);
            }
        }
    }) as Box<dyn FnMut(MessageEvent)>);

    if let Some(window) = window() {
        if let Err(e) =
            window.add_event_listener_with_callback("message", closure.as_ref().unchecked_ref())
        {
            error!("Failed to register message listener: {:?}", e);
        }
    }

    // Prevent closure from being dropped by transferring ownership to JS.
    closure.forget();
}

/// Event representing one raw message from the host page.
#[derive(Event)]
struct IncomingRpcMessage {
    content: String,
}

fn process_incoming_messages(
    message_queue: Res<MessageQueue>,
    mut message_events: EventWriter<IncomingRpcMessage>,
) {
    for message_str in message_queue.take() {
        message_events.write(IncomingRpcMessage {
            content: message_str,
        });
    }
}

/// Everything the request handlers read or write.
#[derive(SystemParam)]
struct RpcContext<'w, 's> {
    bridge: Res<'w, BridgeLink>,
    camera_ready: EventWriter<'w, CameraReady>,
    camera_failed: EventWriter<'w, CameraFailed>,
    view_requests: EventWriter<'w, ViewModeRequest>,
    switch_camera: EventWriter<'w, SwitchCamera>,
    phase: Option<Res<'w, TrackingPhase>>,
    view_mode: Option<Res<'w, State<ViewMode>>>,
    any_visible: Option<Res<'w, AnyTargetVisible>>,
    store: Option<Res<'w, AnchorStateStore>>,
    facing: Option<Res<'w, CameraFacing>>,
    /// Camera switches sent since the facing resource last changed.
    switches_queued: Local<'s, u32>,
}

fn handle_rpc_messages(
    mut events: EventReader<IncomingRpcMessage>,
    mut rpc_interface: ResMut<WebRpcInterface>,
    mut context: RpcContext,
) {
    // Switches from earlier frames have been applied to the facing resource.
    *context.switches_queued = 0;

    for event in events.read() {
        let request = match serde_json::from_str::<RpcRequest>(&event.content) {
            Ok(request) if request.jsonrpc == "2.0" => request,
            Ok(request) => {
                warn!("Unsupported JSON-RPC version: {}", request.jsonrpc);
                rpc_interface.queue_response(create_error_response(
                    request.id,
                    -32600,
                    "Invalid Request",
                    None,
                ));
                continue;
            }
            Err(parse_error) => {
                warn!("Malformed RPC message: {}", parse_error);
                rpc_interface.queue_response(create_error_response(
                    None,
                    -32600,
                    "Invalid Request",
                    Some(serde_json::json!({"reason": parse_error.to_string()})),
                ));
                continue;
            }
        };

        trace!("Processing method: {}", request.method);
        if let Some(response) = handle_rpc_request(&request, &mut context) {
            rpc_interface.queue_response(response);
        }
    }
}

/// Dispatch one request. Only requests with an id get a response.
fn handle_rpc_request(request: &RpcRequest, context: &mut RpcContext) -> Option<RpcResponse> {
    let result = match request.method.as_str() {
        "tracker_update" => handle_tracker_update(&request.params, context),
        "tracker_targets_loaded" => handle_targets_loaded(&request.params, context),
        "tracker_warmup_done" => handle_warmup_done(&request.params, context),
        "camera_ready" => handle_camera_ready(&request.params, context),
        "camera_failed" => handle_camera_failed(&request.params, context),
        "set_view_mode" => handle_set_view_mode(&request.params, context),
        "switch_camera" => handle_switch_camera(context),
        "get_tracking_state" => handle_get_tracking_state(context),
        _ => {
            warn!("Unknown RPC method: {}", request.method);
            return request.id.clone().map(|id| {
                create_error_response(
                    Some(id),
                    -32601,
                    "Method not found",
                    Some(serde_json::json!({"method": request.method})),
                )
            });
        }
    };

    let id = request.id.clone()?;
    Some(match result {
        Ok(result_value) => RpcResponse {
            jsonrpc: "2.0".to_string(),
            result: Some(result_value),
            error: None,
            id: Some(id),
        },
        Err(error) => RpcResponse {
            jsonrpc: "2.0".to_string(),
            result: None,
            error: Some(error),
            id: Some(id),
        },
    })
}

fn parse_params<T: serde::de::DeserializeOwned>(
    params: &serde_json::Value,
    expected: &str,
) -> Result<T, RpcError> {
    serde_json::from_value(params.clone())
        .map_err(|e| RpcError::invalid_params(&format!("Expected {}: {}", expected, e)))
}

fn handle_tracker_update(
    params: &serde_json::Value,
    context: &mut RpcContext,
) -> Result<serde_json::Value, RpcError> {
    let update: TrackerUpdate = parse_params(params, "an onUpdate payload")?;
    let accepted = context.bridge.forward_update(update);
    Ok(serde_json::json!({ "accepted": accepted }))
}

#[derive(Deserialize)]
struct TargetsLoadedParams {
    #[serde(default)]
    generation: Option<u64>,
    #[serde(default)]
    dimensions: Vec<TargetDimensions>,
    #[serde(default)]
    error: Option<BridgeFailure>,
}

fn handle_targets_loaded(
    params: &serde_json::Value,
    context: &mut RpcContext,
) -> Result<serde_json::Value, RpcError> {
    let params: TargetsLoadedParams = parse_params(params, "'dimensions' or 'error'")?;
    let reply = match params.error {
        Some(failure) => Err(TrackerError::from(failure)),
        None => Ok(params.dimensions),
    };
    let accepted = context.bridge.resolve_targets(params.generation, reply);
    Ok(serde_json::json!({ "accepted": accepted }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WarmupDoneParams {
    #[serde(default)]
    generation: Option<u64>,
    #[serde(default)]
    projection_matrix: Option<Vec<f32>>,
    #[serde(default)]
    error: Option<BridgeFailure>,
}

fn handle_warmup_done(
    params: &serde_json::Value,
    context: &mut RpcContext,
) -> Result<serde_json::Value, RpcError> {
    let params: WarmupDoneParams = parse_params(params, "an optional 'error'")?;
    let projection = match params.projection_matrix {
        Some(values) => Some(
            <[f32; 16]>::try_from(values.as_slice())
                .map_err(|_| RpcError::invalid_params("'projectionMatrix' must have 16 values"))?,
        ),
        None => None,
    };
    let reply = match params.error {
        Some(failure) => Err(TrackerError::from(failure)),
        None => Ok(()),
    };
    let accepted = context
        .bridge
        .resolve_warmup(params.generation, reply, projection);
    Ok(serde_json::json!({ "accepted": accepted }))
}

fn handle_camera_ready(
    params: &serde_json::Value,
    context: &mut RpcContext,
) -> Result<serde_json::Value, RpcError> {
    let video: VideoSource = parse_params(params, "'elementId', 'width' and 'height'")?;
    if video.width == 0 || video.height == 0 {
        return Err(RpcError::invalid_params("Camera stream has no size"));
    }
    context.camera_ready.write(CameraReady(video));
    Ok(serde_json::json!({ "success": true }))
}

fn handle_camera_failed(
    params: &serde_json::Value,
    context: &mut RpcContext,
) -> Result<serde_json::Value, RpcError> {
    #[derive(Deserialize)]
    struct CameraFailedParams {
        #[serde(default)]
        reason: Option<String>,
    }

    let params: CameraFailedParams = parse_params(params, "an optional 'reason'")?;
    context.camera_failed.write(CameraFailed {
        reason: params
            .reason
            .unwrap_or_else(|| "camera unavailable".to_string()),
    });
    Ok(serde_json::json!({ "success": true }))
}

fn handle_set_view_mode(
    params: &serde_json::Value,
    context: &mut RpcContext,
) -> Result<serde_json::Value, RpcError> {
    #[derive(Deserialize)]
    struct ViewModeParams {
        mode: String,
    }

    let params: ViewModeParams = parse_params(params, "'mode'")?;
    let mode = ViewMode::from_name(&params.mode)
        .ok_or_else(|| RpcError::invalid_params(&format!("Unknown view mode: {}", params.mode)))?;
    context.view_requests.write(ViewModeRequest::Set(mode));
    info!("View mode request dispatched: {:?}", mode);

    Ok(serde_json::json!({
        "success": true,
        "requested_mode": mode.name()
    }))
}

fn handle_switch_camera(context: &mut RpcContext) -> Result<serde_json::Value, RpcError> {
    context.switch_camera.write(SwitchCamera);
    *context.switches_queued += 1;
    let current = context.facing.as_ref().is_some_and(|facing| facing.facing_user);
    let next = CameraFacing {
        facing_user: current ^ (*context.switches_queued % 2 == 1),
    };
    Ok(serde_json::json!({
        "success": true,
        "facing_mode": next.facing_mode(),
        "mirrored": next.is_mirrored()
    }))
}

fn handle_get_tracking_state(context: &mut RpcContext) -> Result<serde_json::Value, RpcError> {
    let phase = context.phase.as_ref().map(|phase| phase.0).unwrap_or_default();
    let view_mode = context
        .view_mode
        .as_ref()
        .map(|mode| *mode.get())
        .unwrap_or_default();
    let targets: Vec<serde_json::Value> = context
        .store
        .as_ref()
        .map(|store| {
            store
                .snapshot()
                .iter()
                .map(|(index, matrix)| {
                    serde_json::json!({ "index": index, "visible": !matrix.is_invisible() })
                })
                .collect()
        })
        .unwrap_or_default();

    Ok(serde_json::json!({
        "phase": phase,
        "view_mode": view_mode.name(),
        "any_target_visible": context.any_visible.as_ref().is_some_and(|visible| visible.0),
        "targets": targets
    }))
}

fn forward_tracker_commands(bridge: Res<BridgeLink>, mut rpc_interface: ResMut<WebRpcInterface>) {
    for message in bridge.take_commands() {
        match serde_json::to_value(&message) {
            Ok(params) => rpc_interface.send_notification("tracker_command", params),
            Err(e) => error!("Failed to serialize tracker command: {}", e),
        }
    }
}

fn notify_anchor_transitions(
    mut found: EventReader<AnchorFound>,
    mut lost: EventReader<AnchorLost>,
    mut rpc_interface: ResMut<WebRpcInterface>,
) {
    for event in found.read() {
        rpc_interface.send_notification("target_found", serde_json::json!({ "index": event.index }));
    }
    for event in lost.read() {
        rpc_interface.send_notification("target_lost", serde_json::json!({ "index": event.index }));
    }
}

fn notify_session_phase(
    mut changes: EventReader<SessionPhaseChanged>,
    mut rpc_interface: ResMut<WebRpcInterface>,
) {
    for change in changes.read() {
        rpc_interface.send_notification("session_phase", serde_json::json!({ "phase": change.phase }));
    }
}

fn notify_fatal_errors(
    mut errors: EventReader<FatalError>,
    state: Option<Res<FatalErrorState>>,
    mut rpc_interface: ResMut<WebRpcInterface>,
) {
    for error in errors.read() {
        let countdown = state.as_ref().and_then(|state| state.remaining_secs());
        rpc_interface.send_notification(
            "fatal_error",
            serde_json::json!({
                "kind": error.kind,
                "description": error.description,
                "detail": error.detail,
                "countdown_secs": countdown
            }),
        );
    }
}

fn notify_content_errors(
    mut errors: EventReader<ContentConfigError>,
    mut rpc_interface: ResMut<WebRpcInterface>,
) {
    for error in errors.read() {
        rpc_interface.send_notification(
            "content_error",
            serde_json::json!({ "message": error.message, "fallback": "demo" }),
        );
    }
}

fn notify_reload(
    mut reloads: EventReader<ReloadRequested>,
    mut rpc_interface: ResMut<WebRpcInterface>,
) {
    if reloads.read().last().is_some() {
        rpc_interface.send_notification("reload", serde_json::json!({}));
    }
}

/// Create standardized error response with optional data payload.
fn create_error_response(
    id: Option<serde_json::Value>,
    code: i32,
    message: &str,
    data: Option<serde_json::Value>,
) -> RpcResponse {
    RpcResponse {
        jsonrpc: "2.0".to_string(),
        result: None,
        error: Some(RpcError {
            code,
            message: message.to_string(),
            data,
        }),
        id,
    }
}

/// Send queued notifications and responses to the host page.
fn send_outgoing_messages(
    mut rpc_interface: ResMut<WebRpcInterface>,
    mut outbox: ResMut<RpcOutbox>,
) {
    // Send notifications first.
    for notification in std::mem::take(&mut rpc_interface.outgoing_notifications) {
        send_message_to_parent(&notification, &mut outbox);
    }

    // Send responses second to maintain order.
    for response in std::mem::take(&mut rpc_interface.outgoing_responses) {
        send_message_to_parent(&response, &mut outbox);
    }
}

/// Send serialized message to the parent window.
fn send_message_to_parent<T: Serialize>(message: &T, outbox: &mut RpcOutbox) {
    let json = match serde_json::to_string(message) {
        Ok(json) => json,
        Err(e) => {
            error!("Failed to serialize message: {}", e);
            return;
        }
    };

    #[cfg(target_arch = "wasm32")]
    {
        let _ = outbox;
        if let Some(window) = window() {
            if let Some(parent) = window.parent().ok().flatten() {
                if let Err(e) = parent.post_message(&JsValue::from_str(&json), "*") {
                    error!("Failed to send message to parent: {:?}", e);
                }
            } else {
                warn!("No parent window available for message transmission");
            }
        } else {
            error!("Window object not available");
        }
    }

    #[cfg(not(target_arch = "wasm32"))]
    {
        outbox.0.push(json);
    }
}

/// Standard RPC error constructors.
impl RpcError {
    pub fn invalid_params(message: &str) -> Self {
        Self {
            code: -32602,
            message: message.to_string(),
            data: None,
        }
    }
}
