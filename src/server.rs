use std::sync::Arc;

use axum::{
    extract::{Json, Path, Query, State},
    http::{Request, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info};

use crate::account_store::{self, AccountStore};
use crate::basemap::Basemap;
use crate::catalog::Catalog;
use crate::config::Config;
use crate::error::{DirectoryError, Result};
use crate::models::{AccountId, City, MarkerColor, RenderKind};
use crate::query::{self, CityFilter};
use crate::renderer::{self, MapRenderer};
use crate::seed;

/// Everything a request needs, built once at startup and shared by reference.
pub struct AppState {
    pub catalog: Arc<Catalog>,
    pub accounts: AccountStore,
    pub renderer: MapRenderer,
}

impl AppState {
    pub fn new(catalog: Arc<Catalog>, accounts: AccountStore, renderer: MapRenderer) -> Self {
        Self { catalog, accounts, renderer }
    }

    pub async fn from_config(config: &Config) -> anyhow::Result<Self> {
        let pool = account_store::open(&config.database_path).await?;
        if let Some(seed_csv) = &config.seed_csv {
            seed::seed_if_empty(&pool, seed_csv).await?;
        }

        let catalog = Arc::new(Catalog::load(&pool).await?);
        let accounts = AccountStore::new(pool, catalog.clone());

        let basemap = match &config.basemap_path {
            Some(path) => Basemap::from_path(path)?,
            None => Basemap::embedded()?,
        };
        let font = match &config.font_path {
            Some(path) => renderer::load_font(path)?,
            None => renderer::embedded_font()?,
        };
        let renderer = MapRenderer::new(basemap, font, config.map_width);

        Ok(Self::new(catalog, accounts, renderer))
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/cities", get(list_cities))
        .route("/cities/{name}", get(get_city))
        .route("/map/city/{name}", get(map_city))
        .route("/map/cities", get(map_filtered))
        .route("/accounts/{id}/cities", get(list_saved_cities).post(save_city))
        .route("/accounts/{id}/map", get(map_saved_cities))
        .route("/accounts/{id}/color", get(get_color).put(set_color))
        .layer(middleware::from_fn(log_request_response))
        .with_state(state)
}

async fn log_request_response(req: Request<axum::body::Body>, next: Next) -> Response {
    let path = req.uri().path().to_string();
    let method = req.method().to_string();
    info!("incoming request: {} {}", method, path);
    let response = next.run(req).await;
    info!("request result: {} for {} {}", response.status(), method, path);
    response
}

#[derive(Deserialize, Debug, Default)]
pub struct FilterParams {
    pub country: Option<String>,
    pub min_population: Option<String>,
    pub max_population: Option<String>,
    pub account: Option<AccountId>,
}

impl FilterParams {
    fn filter(&self) -> Result<CityFilter> {
        CityFilter::from_params(
            self.country.as_deref(),
            self.min_population.as_deref(),
            self.max_population.as_deref(),
        )
    }
}

#[derive(Deserialize, Debug, Default)]
pub struct AccountParam {
    pub account: Option<AccountId>,
}

#[derive(Deserialize, Debug)]
pub struct SaveCityRequest {
    pub name: String,
}

#[derive(Deserialize, Debug)]
pub struct ColorRequest {
    pub color: String,
}

// --- Handlers ---

async fn get_city(State(state): State<Arc<AppState>>, Path(name): Path<String>) -> Response {
    match state.catalog.lookup(&name) {
        Ok(city) => Json(city.clone()).into_response(),
        Err(e) => error_response("city lookup", e),
    }
}

async fn list_cities(State(state): State<Arc<AppState>>, Query(params): Query<FilterParams>) -> Response {
    match params.filter() {
        Ok(filter) => Json(filter.apply(&state.catalog)).into_response(),
        Err(e) => error_response("city query", e),
    }
}

async fn map_city(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    Query(params): Query<AccountParam>,
) -> Response {
    let result: Result<Vec<u8>> = async {
        let city = state.catalog.lookup(&name)?.clone();
        let color = color_for(&state, params.account).await?;
        render_map(state.clone(), vec![city], color, RenderKind::City).await
    }
    .await;

    match result {
        Ok(bytes) => png_response(bytes),
        Err(e) => error_response("city map", e),
    }
}

async fn map_filtered(State(state): State<Arc<AppState>>, Query(params): Query<FilterParams>) -> Response {
    let result: Result<Vec<u8>> = async {
        let filter = params.filter()?;
        let cities = filter.apply(&state.catalog);
        if cities.is_empty() {
            return Err(DirectoryError::NotFound(filter.describe()));
        }
        let color = color_for(&state, params.account).await?;
        render_map(state.clone(), cities, color, filter.kind()).await
    }
    .await;

    match result {
        Ok(bytes) => png_response(bytes),
        Err(e) => error_response("filtered map", e),
    }
}

async fn list_saved_cities(State(state): State<Arc<AppState>>, Path(id): Path<AccountId>) -> Response {
    match query::saved_by_account(&state.accounts, id).await {
        Ok(cities) => Json(cities).into_response(),
        Err(e) => error_response("saved cities", e),
    }
}

async fn save_city(
    State(state): State<Arc<AppState>>,
    Path(id): Path<AccountId>,
    Json(body): Json<SaveCityRequest>,
) -> Response {
    match state.accounts.add_saved_city(id, &body.name).await {
        Ok(true) => (StatusCode::CREATED, Json(json!({ "saved": true }))).into_response(),
        Ok(false) => (
            StatusCode::NOT_FOUND,
            Json(json!({ "saved": false, "message": format!("unknown city '{}'", body.name) })),
        )
            .into_response(),
        Err(e) => error_response("save city", e),
    }
}

async fn map_saved_cities(State(state): State<Arc<AppState>>, Path(id): Path<AccountId>) -> Response {
    let result: Result<Vec<u8>> = async {
        let cities = query::saved_by_account(&state.accounts, id).await?;
        if cities.is_empty() {
            return Err(DirectoryError::NotFound(format!("saved cities of account {}", id)));
        }
        let color = state.accounts.get_marker_color(id).await?;
        render_map(state.clone(), cities, color, RenderKind::Saved).await
    }
    .await;

    match result {
        Ok(bytes) => png_response(bytes),
        Err(e) => error_response("saved map", e),
    }
}

async fn get_color(State(state): State<Arc<AppState>>, Path(id): Path<AccountId>) -> Response {
    match state.accounts.get_marker_color(id).await {
        Ok(color) => Json(json!({ "color": color })).into_response(),
        Err(e) => error_response("get color", e),
    }
}

async fn set_color(
    State(state): State<Arc<AppState>>,
    Path(id): Path<AccountId>,
    Json(body): Json<ColorRequest>,
) -> Response {
    let result: Result<MarkerColor> = async {
        let color: MarkerColor = body.color.parse()?;
        state.accounts.set_marker_color(id, color).await?;
        Ok::<_, DirectoryError>(color)
    }
    .await;

    match result {
        Ok(color) => Json(json!({ "color": color })).into_response(),
        Err(e) => error_response("set color", e),
    }
}

// --- Helpers ---

async fn color_for(state: &AppState, account: Option<AccountId>) -> Result<MarkerColor> {
    match account {
        Some(id) => state.accounts.get_marker_color(id).await,
        None => Ok(MarkerColor::default()),
    }
}

async fn render_map(
    state: Arc<AppState>,
    cities: Vec<City>,
    color: MarkerColor,
    kind: RenderKind,
) -> Result<Vec<u8>> {
    info!("rendering {} map with {} cities in {}", kind, cities.len(), color);
    tokio::task::spawn_blocking(move || state.renderer.render_png(&cities, color))
        .await
        .map_err(|e| DirectoryError::Io(std::io::Error::other(e)))?
}

fn png_response(bytes: Vec<u8>) -> Response {
    ([("content-type", "image/png")], bytes).into_response()
}

fn error_response(context: &str, e: DirectoryError) -> Response {
    match e {
        DirectoryError::NotFound(what) => {
            (StatusCode::NOT_FOUND, format!("no results for {}", what)).into_response()
        }
        DirectoryError::InvalidArgument(msg) => {
            (StatusCode::BAD_REQUEST, msg).into_response()
        }
        other => {
            error!("{} error: {}", context, other);
            (StatusCode::INTERNAL_SERVER_ERROR, format!("error handling {}", context)).into_response()
        }
    }
}
