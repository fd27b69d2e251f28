use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chatops_slack::{CommandRegistry, UsageMeter};
use chrono::Utc;
use serde::Serialize;
use tracing::{error, info};

#[derive(Clone)]
pub struct HealthState {
    registry: Arc<CommandRegistry>,
    meter: Arc<UsageMeter>,
}

impl HealthState {
    pub fn new(registry: Arc<CommandRegistry>, meter: Arc<UsageMeter>) -> Self {
        Self { registry, meter }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: HealthCheck,
    pub registry: HealthCheck,
    pub commands: usize,
    pub total_requests: u64,
    pub checked_at: String,
}

pub fn router(state: HealthState) -> Router {
    Router::new().route("/health", get(health)).with_state(state)
}

pub async fn spawn(bind_address: &str, port: u16, state: HealthState) -> std::io::Result<()> {
    let address = format!("{bind_address}:{port}");
    let listener = tokio::net::TcpListener::bind(&address).await?;

    info!(
        event_name = "system.health.start",
        bind_address = %address,
        "health endpoint started"
    );

    tokio::spawn(async move {
        if let Err(error) = axum::serve(listener, router(state)).await {
            error!(
                event_name = "system.health.error",
                error = %error,
                "health endpoint server terminated unexpectedly"
            );
        }
    });

    Ok(())
}

pub async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let commands = state.registry.len();
    let registry = registry_check(commands);
    let ready = registry.status == "ready";

    let payload = HealthResponse {
        status: if ready { "ready" } else { "degraded" },
        service: HealthCheck {
            status: "ready",
            detail: "chatops-server runtime initialized".to_string(),
        },
        registry,
        commands,
        total_requests: state.meter.total(),
        checked_at: Utc::now().to_rfc3339(),
    };

    let status_code = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status_code, Json(payload))
}

fn registry_check(commands: usize) -> HealthCheck {
    if commands == 0 {
        return HealthCheck { status: "degraded", detail: "no commands registered".to_string() };
    }
    HealthCheck { status: "ready", detail: format!("{commands} commands routable") }
}
