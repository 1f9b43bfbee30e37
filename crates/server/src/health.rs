use axum::{extract::State, http::StatusCode, Json};
use chrono::Utc;
use serde::Serialize;

use crate::routes::AppState;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: HealthCheck,
    pub signalwire: HealthCheck,
    pub catalog: HealthCheck,
    pub checked_at: String,
}

pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let signalwire = signalwire_check(&state).await;
    let ready = signalwire.status != "degraded";

    let payload = HealthResponse {
        status: if ready { "ready" } else { "degraded" },
        service: HealthCheck {
            status: "ready",
            detail: "santa-server runtime initialized".to_string(),
        },
        signalwire,
        catalog: catalog_check(&state),
        checked_at: Utc::now().to_rfc3339(),
    };

    let status_code = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status_code, Json(payload))
}

async fn signalwire_check(state: &AppState) -> HealthCheck {
    if state.fabric.is_none() {
        return HealthCheck {
            status: "skipped",
            detail: "SignalWire credentials not configured".to_string(),
        };
    }

    match state.handler.get().await {
        Some(handler) if handler.address_id.is_some() => HealthCheck {
            status: "ready",
            detail: format!("SWML handler {} registered", handler.handler_id),
        },
        Some(handler) => HealthCheck {
            status: "degraded",
            detail: format!("SWML handler {} has no call address", handler.handler_id),
        },
        None => HealthCheck {
            status: "degraded",
            detail: "SWML handler not registered".to_string(),
        },
    }
}

fn catalog_check(state: &AppState) -> HealthCheck {
    if state.runtime.catalog_is_live() {
        HealthCheck { status: "live", detail: "RapidAPI product search enabled".to_string() }
    } else {
        HealthCheck { status: "fallback", detail: "serving built-in gift suggestions".to_string() }
    }
}
