use crate::{models::{DiagnosticsResponse, ApiError, ErrorResponse}, AppState};
use axum::{extract::State, http::StatusCode, Json};
use std::sync::{Arc, Mutex, OnceLock};
use sysinfo::System;
use tracing::{error, info};

static SYSTEM_MONITOR: OnceLock<Mutex<System>> = OnceLock::new();

/// Session counters from the dispatcher plus process-level system stats
pub async fn diagnostics(
    State(app_state): State<Arc<AppState>>,
) -> Result<(StatusCode, Json<DiagnosticsResponse>), ApiError> {

    let counts = match app_state.dispatcher.diagnostics().await {
        Some(counts) => counts,
        None => {
            error!("Session dispatcher did not answer diagnostics request");
            return Err(ErrorResponse::reply(StatusCode::SERVICE_UNAVAILABLE, "Session dispatcher stopped"));
        }
    };

    // System stats
    let (cpu_usage, memory_alloc, memory_free, memory_total) = {
        let sys_lock = SYSTEM_MONITOR.get_or_init(|| {
            Mutex::new(System::new_all())
        });
        match sys_lock.lock() {
            Ok(mut sys) => {
                sys.refresh_cpu();
                sys.refresh_memory();
                (
                    sys.global_cpu_info().cpu_usage(),
                    sys.used_memory(),
                    sys.free_memory(),
                    sys.total_memory(),
                )
            }
            Err(_) => (0.0, 0, 0, 0)
        }
    };

    info!(
        "Diagnostics: CPU: {:.2}%, Mem: {}/{} MB (Free: {} MB), Conn: {}, Sessions: {}, Participants: {}",
        cpu_usage,
        memory_alloc / 1024 / 1024,
        memory_total / 1024 / 1024,
        memory_free / 1024 / 1024,
        counts.connections,
        counts.sessions,
        counts.participants
    );

    Ok((
        StatusCode::OK,
        Json(DiagnosticsResponse {
            n_sessions: counts.sessions as u32,
            n_participants: counts.participants as u32,
            n_connections: counts.connections as u32,
            cpu_usage,
            memory_alloc,
            memory_total,
            memory_free,
        }),
    ))
}
