//! HTTP adapter: translates JSON requests into `Orchestrator` calls and
//! `Orchestrator` results back into JSON responses. Deliberately thin — no
//! control-plane logic lives here.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;

use orc_core::{CoreError, NodeId, Orchestrator, PodId, SchedulingPolicy};

pub fn router(orchestrator: Arc<Orchestrator>) -> Router {
    Router::new()
        .route("/", get(help))
        .route("/nodes", post(admit_node).get(list_nodes))
        .route("/nodes/:node_id/heartbeat", post(record_heartbeat))
        .route("/nodes/:node_id/terminate", post(terminate_node))
        .route("/pods", post(create_pod).get(list_pods))
        .route("/stats", get(stats))
        .layer(TraceLayer::new_for_http())
        .with_state(orchestrator)
}

fn error_response(err: CoreError) -> Response {
    let status = match &err {
        CoreError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        CoreError::NotFound(_) => StatusCode::NOT_FOUND,
        CoreError::NoHealthyNodes
        | CoreError::InsufficientResources
        | CoreError::RaceLost
        | CoreError::RuntimeBackendUnavailable(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(serde_json::json!({ "error": err.to_string() }))).into_response()
}

async fn help() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "service": "orchestrator-simulation",
        "endpoints": {
            "POST /nodes": "admit a node: {cpu_cores: int}",
            "GET /nodes": "list all nodes",
            "POST /nodes/:node_id/heartbeat": "record a heartbeat for a node",
            "POST /nodes/:node_id/terminate": "mark a node unhealthy and reschedule its pods",
            "POST /pods": "create a pod: {cpu_requirement: int, algorithm: string}",
            "GET /pods": "list all pods",
            "GET /stats": "aggregate node and pod statistics",
        },
    }))
}

#[derive(Debug, Deserialize)]
struct AdmitNodeRequest {
    cpu_cores: u32,
}

#[derive(Debug, Serialize)]
struct AdmitNodeResponse {
    node_id: NodeId,
    cpu_cores: u32,
}

async fn admit_node(
    State(orchestrator): State<Arc<Orchestrator>>,
    Json(body): Json<AdmitNodeRequest>,
) -> Response {
    match orchestrator.admit_node(body.cpu_cores) {
        Ok(node_id) => (
            StatusCode::CREATED,
            Json(AdmitNodeResponse {
                node_id,
                cpu_cores: body.cpu_cores,
            }),
        )
            .into_response(),
        Err(err) => error_response(err),
    }
}

async fn list_nodes(State(orchestrator): State<Arc<Orchestrator>>) -> Json<serde_json::Value> {
    let nodes = orc_core::orchestrator::nodes_by_id(orchestrator.list_nodes());
    Json(serde_json::json!({ "nodes": nodes }))
}

async fn record_heartbeat(
    State(orchestrator): State<Arc<Orchestrator>>,
    Path(node_id): Path<String>,
) -> Response {
    match orchestrator.record_heartbeat(&NodeId::from(node_id)) {
        Ok(()) => StatusCode::OK.into_response(),
        Err(err) => error_response(err),
    }
}

async fn terminate_node(
    State(orchestrator): State<Arc<Orchestrator>>,
    Path(node_id): Path<String>,
) -> Response {
    match orchestrator.terminate_node(&NodeId::from(node_id)) {
        Ok(()) => StatusCode::OK.into_response(),
        Err(err) => error_response(err),
    }
}

#[derive(Debug, Deserialize)]
struct CreatePodRequest {
    cpu_requirement: u32,
    algorithm: String,
}

#[derive(Debug, Serialize)]
struct CreatePodResponse {
    pod_id: PodId,
    node_id: NodeId,
    cpu_requirement: u32,
}

async fn create_pod(
    State(orchestrator): State<Arc<Orchestrator>>,
    Json(body): Json<CreatePodRequest>,
) -> Response {
    let policy = match body.algorithm.parse::<SchedulingPolicy>() {
        Ok(policy) => policy,
        Err(err) => return error_response(err),
    };
    match orchestrator.create_pod(body.cpu_requirement, policy) {
        Ok((pod_id, node_id)) => (
            StatusCode::CREATED,
            Json(CreatePodResponse {
                pod_id,
                node_id,
                cpu_requirement: body.cpu_requirement,
            }),
        )
            .into_response(),
        Err(err) => error_response(err),
    }
}

async fn list_pods(State(orchestrator): State<Arc<Orchestrator>>) -> Json<serde_json::Value> {
    let pods = orc_core::orchestrator::pods_by_id(orchestrator.list_pods());
    Json(serde_json::json!({ "pods": pods }))
}

async fn stats(State(orchestrator): State<Arc<Orchestrator>>) -> Json<orc_core::Stats> {
    Json(orchestrator.stats())
}
