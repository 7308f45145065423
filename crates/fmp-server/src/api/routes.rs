//! HTTP surface: region cache, grid build, mission compile.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};

use fmp_core::compile::{compile_mission, CompileOptions};
use fmp_core::error::{CompileError, GridError};
use fmp_core::export;
use fmp_core::grid::{build_grid, CentroidIndex};
use fmp_core::parser::parse_mission;
use fmp_core::region::RegionSnapshot;

use crate::artifacts;
use crate::state::AppState;

type ApiError = (StatusCode, Json<Value>);

pub fn create_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(health))
        .route("/v1/region/cache", post(region_cache))
        .route("/v1/grid/build", post(grid_build))
        .route("/v1/mission/compile", post(mission_compile))
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

fn bad_request(message: impl Into<String>) -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "error": message.into() })),
    )
}

fn internal_error(err: impl std::fmt::Display, context: &str) -> ApiError {
    tracing::error!(error = %err, "{context}");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": format!("{context} failed") })),
    )
}

/// Cached region snapshot, loading it on first use. Provider failures map
/// to 502 since the fault is upstream.
async fn ensure_region(state: &AppState) -> Result<Arc<RegionSnapshot>, ApiError> {
    state.region.ensure(&state.region_client).await.map_err(|err| {
        tracing::error!(error = %err, "region unavailable");
        (
            StatusCode::BAD_GATEWAY,
            Json(json!({ "error": err.to_string() })),
        )
    })
}

fn region_summary(region: &RegionSnapshot) -> Value {
    let bounds = region.bounds();
    json!({
        "source": region.source,
        "fetched_at": region.fetched_at.to_rfc3339(),
        "bounds": [bounds.min().x, bounds.min().y, bounds.max().x, bounds.max().y],
        "bounds_geographic": region
            .geographic_bounds()
            .map(|r| json!([r.min().x, r.min().y, r.max().x, r.max().y])),
    })
}

#[derive(Debug, Deserialize, Default)]
pub struct RegionCacheRequest {
    #[serde(default)]
    pub force_refresh: bool,
}

async fn region_cache(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RegionCacheRequest>,
) -> Result<Json<Value>, ApiError> {
    let region = if request.force_refresh {
        state
            .region
            .refresh(&state.region_client)
            .await
            .map_err(|err| {
                tracing::error!(error = %err, "region refresh failed");
                (
                    StatusCode::BAD_GATEWAY,
                    Json(json!({ "error": err.to_string() })),
                )
            })?
    } else {
        ensure_region(&state).await?
    };
    Ok(Json(region_summary(&region)))
}

#[derive(Debug, Deserialize)]
pub struct GridBuildRequest {
    pub cell_size: Option<f64>,
}

async fn grid_build(
    State(state): State<Arc<AppState>>,
    Json(request): Json<GridBuildRequest>,
) -> Result<Json<Value>, ApiError> {
    let cell_size = request.cell_size.unwrap_or(1000.0);
    let region = ensure_region(&state).await?;

    let build = build_grid(&region, cell_size).map_err(|err| match err {
        GridError::InvalidCellSize | GridError::TooLarge { .. } => bad_request(err.to_string()),
        GridError::Empty => internal_error(err, "grid build"),
    })?;

    let files = artifacts::write_grid_artifacts(&state.config.data_dir, &build)
        .map_err(|err| internal_error(err, "grid persistence"))?;

    tracing::info!(
        cell_size_m = build.cell_size_m,
        cells = build.cells.len(),
        "grid built"
    );

    let cell_count = build.cells.len();
    let centroid_count = build.centroids.len();
    let bounds = build.bounds;
    let origin = build.origin;
    let grid_lines = export::feature(
        export::multi_line_string_geometry(&build.grid_lines),
        json!({ "cell_size_m": build.cell_size_m }),
    );
    state.register_centroid_index(CentroidIndex::build(cell_size, build.centroids));

    Ok(Json(json!({
        "cell_size_m": cell_size,
        "cells": cell_count,
        "centroids": centroid_count,
        "bounds": [bounds.min().x, bounds.min().y, bounds.max().x, bounds.max().y],
        "origin": { "x": origin.0, "y": origin.1 },
        "grid_lines": grid_lines,
        "region": region.as_geographic_feature(),
        "files": {
            "grid_geojson": files.geojson.display().to_string(),
            "grid_centroids": files.centroids.display().to_string(),
        },
    })))
}

#[derive(Debug, Deserialize)]
pub struct MissionCompileRequest {
    pub mission_text: Option<String>,
    pub step: Option<f64>,
    pub snap_to_grid: Option<bool>,
    pub grid_cell_size: Option<f64>,
}

async fn mission_compile(
    State(state): State<Arc<AppState>>,
    Json(request): Json<MissionCompileRequest>,
) -> Result<Json<Value>, ApiError> {
    let text = match request.mission_text {
        Some(text) if !text.trim().is_empty() => text,
        _ => return Err(bad_request("mission_text is required")),
    };
    let step = request.step.unwrap_or(state.config.default_step_m);
    if !(step > 0.0) {
        return Err(bad_request("step must be positive"));
    }
    let snap_to_grid = request.snap_to_grid.unwrap_or(false);

    let mission = parse_mission(&text).map_err(|err| {
        (
            StatusCode::BAD_REQUEST,
            Json(json!({ "line": err.line, "message": err.message })),
        )
    })?;

    let region = ensure_region(&state).await?;
    let options = CompileOptions {
        step_m: step,
        snap_to_grid,
        grid_cell_size_m: request.grid_cell_size,
    };
    let result =
        compile_mission(&mission, &region, state.as_ref(), &options).map_err(|err| match err {
            CompileError::Validation(violations) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(json!({ "errors": violations })),
            ),
            CompileError::Structural { message, line } => (
                StatusCode::BAD_REQUEST,
                Json(json!({ "line": line, "message": message })),
            ),
            CompileError::Parse(err) => (
                StatusCode::BAD_REQUEST,
                Json(json!({ "line": err.line, "message": err.message })),
            ),
        })?;

    let files = artifacts::write_mission_artifacts(&state.config.data_dir, &result, snap_to_grid)
        .map_err(|err| internal_error(err, "mission persistence"))?;

    tracing::info!(
        mission = %result.mission.name,
        waypoints = result.waypoints.len(),
        total_length_m = result.total_length_m,
        "mission compiled"
    );

    let report = export::compile_report(&result, snap_to_grid);
    let waypoints: Vec<Value> = export::waypoint_rows(&result)
        .into_iter()
        .map(|row| {
            json!({
                "seq": row.seq,
                "x": row.x,
                "y": row.y,
                "z": row.z,
                "lat": row.lat,
                "lon": row.lon,
                "in_region": row.in_region,
                "snapped": row.snapped,
            })
        })
        .collect();

    Ok(Json(json!({
        "mission": {
            "name": result.mission.name,
            "speed_mps": report.speed_mps,
        },
        "totals": {
            "waypoints": result.waypoints.len(),
            "distance_m": report.total_length_m,
            "step_m": result.step_m,
        },
        "waypoints": waypoints,
        "dwell_events": result
            .dwell_events
            .iter()
            .map(|d| json!({ "index": d.index, "duration_s": d.duration_s }))
            .collect::<Vec<_>>(),
        "surface_index": result.surface_index,
        "path": export::path_feature(&result),
        "files": {
            "waypoints_csv": files.waypoints_csv.display().to_string(),
            "path_geojson": files.path_geojson.display().to_string(),
            "report_json": files.report_json.display().to_string(),
        },
    })))
}
