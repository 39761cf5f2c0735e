//! Daily material rates. Setting today's gold rate reprices every gold
//! product and its market prices.

use axum::{
    extract::{Json, Path, Query, State},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::entities::Material;
use crate::errors::ApiError;
use crate::handlers::common::{ensure_decimal_positive, map_service_error, success_response};
use crate::services::pricing::RatePropagationReport;
use crate::AppState;

#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct SetRateRequest {
    pub material: Material,
    /// Defaults to today (UTC)
    pub rate_date: Option<NaiveDate>,
    pub rate_per_gram: Decimal,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct RateHistoryQuery {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

pub fn rate_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_current_rates).post(set_daily_rate))
        .route("/:material", get(rate_history))
        .route("/:material/reprice", post(reprice_material))
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/rates",
    responses((status = 200, description = "Current rate per material", body = Object)),
    security(("Bearer" = [])),
    tag = "Admin: Rates"
)]
pub async fn list_current_rates(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    let rates = state
        .services
        .rates
        .list_current_rates()
        .await
        .map_err(map_service_error)?;
    Ok(success_response(rates))
}

/// Record the rate for a day. Re-posting a day updates it in place; only a
/// date on or after the current one reprices products.
#[utoipa::path(
    post,
    path = "/api/v1/admin/rates",
    request_body = SetRateRequest,
    responses(
        (status = 200, description = "Rate stored and propagated", body = crate::ApiResponse<RatePropagationReport>),
        (status = 400, description = "Rate must be positive", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Admin: Rates"
)]
pub async fn set_daily_rate(
    State(state): State<AppState>,
    Json(payload): Json<SetRateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    ensure_decimal_positive(&payload.rate_per_gram, "rate_per_gram")?;
    let rate_date = payload
        .rate_date
        .unwrap_or_else(|| Utc::now().date_naive());
    let report = state
        .services
        .rates
        .set_daily_rate(payload.material, rate_date, payload.rate_per_gram)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(report))
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/rates/:material",
    params(
        ("material" = Material, Path, description = "Material"),
        RateHistoryQuery
    ),
    responses((status = 200, description = "Daily rates, newest first", body = Object)),
    security(("Bearer" = [])),
    tag = "Admin: Rates"
)]
pub async fn rate_history(
    State(state): State<AppState>,
    Path(material): Path<Material>,
    Query(query): Query<RateHistoryQuery>,
) -> Result<impl IntoResponse, ApiError> {
    if let (Some(from), Some(to)) = (query.from, query.to) {
        if from > to {
            return Err(ApiError::BadRequest(
                "from must not be after to".to_string(),
            ));
        }
    }
    let history = state
        .services
        .rates
        .list_daily_rates(material, query.from, query.to)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(history))
}

#[utoipa::path(
    post,
    path = "/api/v1/admin/rates/:material/reprice",
    params(("material" = Material, Path, description = "Material")),
    responses(
        (status = 200, description = "Products repriced from the current rate", body = crate::ApiResponse<RatePropagationReport>),
        (status = 404, description = "No current rate for the material", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Admin: Rates"
)]
pub async fn reprice_material(
    State(state): State<AppState>,
    Path(material): Path<Material>,
) -> Result<impl IntoResponse, ApiError> {
    let report = state
        .services
        .rates
        .reprice_material(material)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(report))
}
