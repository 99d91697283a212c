// 🌐 Web Server - tabbed dashboard shell + chart API (Axum)
//
// Every handler reads the immutable Dashboard; map requests recompute the
// figure synchronously on the request task.

use crate::charts::{BoxSummary, ChartSpec, ColorScale};
use crate::controller::{Dashboard, FilterSelection};
use crate::join::JoinDiagnostics;
use crate::regime::Regime;
use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::debug;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub dashboard: Arc<Dashboard>,
}

impl AppState {
    pub fn new(dashboard: Dashboard) -> Self {
        Self {
            dashboard: Arc::new(dashboard),
        }
    }
}

/// API Response wrapper
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
        }
    }
}

/// Bad selector values coming from the browser
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    UnknownRegime(String),

    #[error("{0}")]
    UnknownColorScale(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::<()>::err(self.to_string())),
        )
            .into_response()
    }
}

// ============================================================================
// Response bodies
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct RegimeOption {
    pub name: String,
    pub slug: String,
}

/// Values for the three selectors of the interactive tab
#[derive(Debug, Serialize, Deserialize)]
pub struct OptionsResponse {
    pub regimes: Vec<RegimeOption>,
    pub departments: Vec<String>,
    pub color_scales: Vec<String>,
    pub default_color_scale: String,
}

#[derive(Debug, Serialize)]
pub struct BoxplotResponse {
    pub figure: ChartSpec,
    pub summaries: Vec<BoxSummary>,
}

/// Query string of the interactive map: `?regime=&department=&scale=`
#[derive(Debug, Deserialize)]
pub struct MapQuery {
    pub regime: Option<String>,
    pub department: Option<String>,
    pub scale: Option<String>,
}

impl MapQuery {
    fn selection(&self) -> Result<FilterSelection, ApiError> {
        let regime = match self.regime.as_deref() {
            Some(value) => value.parse::<Regime>().map_err(ApiError::UnknownRegime)?,
            None => Regime::Contributivo,
        };
        let scale = match self.scale.as_deref() {
            Some(value) if !value.trim().is_empty() => {
                value.parse::<ColorScale>().map_err(ApiError::UnknownColorScale)?
            }
            _ => ColorScale::default(),
        };

        Ok(FilterSelection::new(regime, self.department.as_deref(), scale))
    }
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// GET /api/options - Selector values
async fn get_options(State(state): State<AppState>) -> impl IntoResponse {
    let options = OptionsResponse {
        regimes: Regime::ALL
            .iter()
            .map(|r| RegimeOption {
                name: r.name().to_string(),
                slug: r.slug().to_string(),
            })
            .collect(),
        departments: state.dashboard.departments().to_vec(),
        color_scales: ColorScale::ALL.iter().map(|c| c.name().to_string()).collect(),
        default_color_scale: ColorScale::default().name().to_string(),
    };

    Json(ApiResponse::ok(options))
}

/// GET /api/boxplot - Comparative boxplot across regimes
async fn get_boxplot(State(state): State<AppState>) -> impl IntoResponse {
    Json(ApiResponse::ok(BoxplotResponse {
        figure: state.dashboard.boxplot(),
        summaries: state.dashboard.box_summaries(),
    }))
}

/// GET /api/maps/:regime - Full map of one regime
async fn get_regime_map(
    State(state): State<AppState>,
    Path(regime): Path<String>,
) -> Result<Json<ApiResponse<ChartSpec>>, ApiError> {
    let regime = regime.parse::<Regime>().map_err(ApiError::UnknownRegime)?;
    Ok(Json(ApiResponse::ok(state.dashboard.regime_map(regime))))
}

/// GET /api/map - Interactive map for the current selectors
async fn get_filtered_map(
    State(state): State<AppState>,
    Query(query): Query<MapQuery>,
) -> Result<Json<ApiResponse<ChartSpec>>, ApiError> {
    let selection = query.selection()?;
    debug!(?selection, "recomputing interactive map");
    Ok(Json(ApiResponse::ok(state.dashboard.render_map(&selection))))
}

/// GET /api/diagnostics - Departments dropped by the geometry join
async fn get_diagnostics(State(state): State<AppState>) -> impl IntoResponse {
    let diagnostics: Vec<JoinDiagnostics> = state.dashboard.diagnostics().to_vec();
    Json(ApiResponse::ok(diagnostics))
}

/// GET / - Serve the dashboard shell
async fn serve_index() -> impl IntoResponse {
    Html(include_str!("../web/index.html"))
}

/// GET /static/dashboard.js - Chart loading and selector wiring
async fn serve_script() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "application/javascript; charset=utf-8")],
        include_str!("../web/dashboard.js"),
    )
}

// ============================================================================
// Router
// ============================================================================

pub fn router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/options", get(get_options))
        .route("/boxplot", get(get_boxplot))
        .route("/maps/:regime", get(get_regime_map))
        .route("/map", get(get_filtered_map))
        .route("/diagnostics", get(get_diagnostics))
        .with_state(state);

    Router::new()
        .route("/", get(serve_index))
        .route("/static/dashboard.js", get(serve_script))
        .nest("/api", api_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
}
