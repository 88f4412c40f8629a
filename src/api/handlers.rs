use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::api::requests::{
    CreateReservationRequest, RateTripRequest, TopUpRequest, UserQuery, ValidationError,
};
use crate::api::responses::{
    ApiResponse, BalanceResponse, ErrorResponse, HealthResponse, ReceiptResponse,
    ReservationResponse, ServiceHealth, TripCompletionResponse, TripResponse,
    ValidationErrorDetail, WalletTransactionResponse,
};
use crate::error::AppError;
use crate::services::TripQuote;

use super::routes::AppState;

type HandlerError = (StatusCode, Json<ApiResponse<()>>);

/// Maps a business outcome or infrastructure fault to an HTTP response.
///
/// `PaymentFailed` maps distinctly from `InvalidState` so clients can offer
/// "retry payment" instead of "trip already ended".
fn error_response(error: AppError) -> HandlerError {
    let status = match &error {
        AppError::AlreadyReserved | AppError::VehicleUnavailable | AppError::InvalidState(_) => {
            StatusCode::CONFLICT
        }
        AppError::Expired => StatusCode::GONE,
        AppError::Unauthorized(_) => StatusCode::FORBIDDEN,
        AppError::PaymentFailed(_) | AppError::InsufficientFunds => StatusCode::PAYMENT_REQUIRED,
        AppError::NotFound(_) => StatusCode::NOT_FOUND,
        AppError::Validation(_) => StatusCode::BAD_REQUEST,
        AppError::Database(_) | AppError::Gateway(_) | AppError::Internal(_) => {
            tracing::error!("request aborted: {}", error);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };

    let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
        "internal error".to_string()
    } else {
        error.to_string()
    };

    (
        status,
        Json(ApiResponse::<()>::error(ErrorResponse::new(
            error.code(),
            message,
        ))),
    )
}

fn validation_response(errors: Vec<ValidationError>) -> HandlerError {
    let details: Vec<ValidationErrorDetail> = errors
        .into_iter()
        .map(|e| ValidationErrorDetail {
            field: e.field,
            message: e.message,
        })
        .collect();

    (
        StatusCode::BAD_REQUEST,
        Json(ApiResponse::<()>::error(
            ErrorResponse::new("VALIDATION_ERROR", "Request validation failed")
                .with_details(details),
        )),
    )
}

/// Health check endpoint.
pub async fn health_check(State(state): State<AppState>) -> Json<ApiResponse<HealthResponse>> {
    let db_healthy = match &state.pool {
        Some(pool) => sqlx::query("SELECT 1").fetch_one(pool).await.is_ok(),
        None => true,
    };

    let response = HealthResponse {
        status: if db_healthy {
            "healthy".to_string()
        } else {
            "degraded".to_string()
        },
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now(),
        services: ServiceHealth {
            database: db_healthy,
        },
    };

    Json(ApiResponse::success(response))
}

/// Prometheus metrics endpoint.
pub async fn metrics_endpoint(State(state): State<AppState>) -> Result<String, StatusCode> {
    match &state.metrics_handle {
        Some(handle) => Ok(handle.render()),
        None => Err(StatusCode::NOT_FOUND),
    }
}

// ============================================================================
// Reservation Handlers
// ============================================================================

/// Place an exclusive hold on a vehicle.
pub async fn create_reservation(
    State(state): State<AppState>,
    Json(request): Json<CreateReservationRequest>,
) -> Result<(StatusCode, Json<ApiResponse<ReservationResponse>>), HandlerError> {
    let reservation = state
        .reservations
        .create(request.user_id, request.vehicle_id)
        .await
        .map_err(error_response)?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(ReservationResponse::at(
            reservation,
            chrono::Utc::now(),
        ))),
    ))
}

/// Fetch the caller's live reservation, if any.
pub async fn get_current_reservation(
    State(state): State<AppState>,
    Query(query): Query<UserQuery>,
) -> Result<Json<ApiResponse<ReservationResponse>>, HandlerError> {
    let reservation = state
        .reservations
        .current_for_user(query.user_id)
        .await
        .map_err(error_response)?
        .ok_or_else(|| {
            error_response(AppError::NotFound(format!(
                "no active reservation for user '{}'",
                query.user_id
            )))
        })?;

    Ok(Json(ApiResponse::success(ReservationResponse::at(
        reservation,
        chrono::Utc::now(),
    ))))
}

/// Fetch a reservation with its live countdown.
pub async fn get_reservation(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<UserQuery>,
) -> Result<Json<ApiResponse<ReservationResponse>>, HandlerError> {
    let reservation = state
        .reservations
        .get(id, query.user_id)
        .await
        .map_err(error_response)?;

    Ok(Json(ApiResponse::success(ReservationResponse::at(
        reservation,
        chrono::Utc::now(),
    ))))
}

/// Release a hold. Never charges a fee.
pub async fn cancel_reservation(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<UserQuery>,
) -> Result<Json<ApiResponse<ReservationResponse>>, HandlerError> {
    let reservation = state
        .reservations
        .cancel(id, query.user_id)
        .await
        .map_err(error_response)?;

    Ok(Json(ApiResponse::success(ReservationResponse::at(
        reservation,
        chrono::Utc::now(),
    ))))
}

/// Convert a hold into an active trip.
pub async fn convert_reservation(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<UserQuery>,
) -> Result<(StatusCode, Json<ApiResponse<TripResponse>>), HandlerError> {
    let trip = state
        .trips
        .start_from_reservation(id, query.user_id)
        .await
        .map_err(error_response)?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(TripResponse::from(trip))),
    ))
}

// ============================================================================
// Trip Handlers
// ============================================================================

/// Fetch a trip.
pub async fn get_trip(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<UserQuery>,
) -> Result<Json<ApiResponse<TripResponse>>, HandlerError> {
    let trip = state
        .trips
        .get(id, query.user_id)
        .await
        .map_err(error_response)?;

    Ok(Json(ApiResponse::success(TripResponse::from(trip))))
}

/// List the user's trips, newest first.
pub async fn list_trips(
    State(state): State<AppState>,
    Query(query): Query<UserQuery>,
) -> Result<Json<ApiResponse<Vec<TripResponse>>>, HandlerError> {
    let trips = state
        .trips
        .list_for_user(query.user_id)
        .await
        .map_err(error_response)?;

    Ok(Json(ApiResponse::success(
        trips.into_iter().map(TripResponse::from).collect(),
    )))
}

/// Live fare quote for an active trip.
pub async fn quote_trip(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<UserQuery>,
) -> Result<Json<ApiResponse<TripQuote>>, HandlerError> {
    let quote = state
        .trips
        .quote(id, query.user_id)
        .await
        .map_err(error_response)?;

    Ok(Json(ApiResponse::success(quote)))
}

/// End an active trip: settle payment, issue the receipt, complete.
pub async fn end_trip(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<UserQuery>,
) -> Result<Json<ApiResponse<TripCompletionResponse>>, HandlerError> {
    let (trip, receipt) = state
        .trips
        .end_trip(id, query.user_id)
        .await
        .map_err(error_response)?;

    Ok(Json(ApiResponse::success(TripCompletionResponse {
        trip: TripResponse::from(trip),
        receipt: ReceiptResponse::from(receipt),
    })))
}

/// Cancel an active trip without charge.
pub async fn cancel_trip(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<UserQuery>,
) -> Result<Json<ApiResponse<TripResponse>>, HandlerError> {
    let trip = state
        .trips
        .cancel_trip(id, query.user_id)
        .await
        .map_err(error_response)?;

    Ok(Json(ApiResponse::success(TripResponse::from(trip))))
}

/// Rate a completed trip.
pub async fn rate_trip(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<RateTripRequest>,
) -> Result<Json<ApiResponse<TripResponse>>, HandlerError> {
    if let Err(errors) = request.validate() {
        return Err(validation_response(errors));
    }

    let trip = state
        .trips
        .add_rating(id, request.user_id, request.stars, request.comment)
        .await
        .map_err(error_response)?;

    Ok(Json(ApiResponse::success(TripResponse::from(trip))))
}

// ============================================================================
// Wallet Handlers
// ============================================================================

/// Current wallet balance.
pub async fn get_wallet_balance(
    State(state): State<AppState>,
    Query(query): Query<UserQuery>,
) -> Result<Json<ApiResponse<BalanceResponse>>, HandlerError> {
    let balance = state
        .settlement
        .balance(query.user_id)
        .await
        .map_err(error_response)?;

    Ok(Json(ApiResponse::success(BalanceResponse {
        user_id: query.user_id,
        balance,
    })))
}

/// Add funds to the wallet.
pub async fn top_up_wallet(
    State(state): State<AppState>,
    Json(request): Json<TopUpRequest>,
) -> Result<(StatusCode, Json<ApiResponse<WalletTransactionResponse>>), HandlerError> {
    if let Err(errors) = request.validate() {
        return Err(validation_response(errors));
    }

    let method = request.payment_method.as_deref().unwrap_or("CARD");
    let entry = state
        .settlement
        .top_up(request.user_id, request.amount, method)
        .await
        .map_err(error_response)?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(WalletTransactionResponse::from(entry))),
    ))
}

/// List wallet ledger entries, newest first.
pub async fn list_wallet_transactions(
    State(state): State<AppState>,
    Query(query): Query<UserQuery>,
) -> Result<Json<ApiResponse<Vec<WalletTransactionResponse>>>, HandlerError> {
    let entries = state
        .settlement
        .transactions(query.user_id)
        .await
        .map_err(error_response)?;

    Ok(Json(ApiResponse::success(
        entries
            .into_iter()
            .map(WalletTransactionResponse::from)
            .collect(),
    )))
}

// ============================================================================
// Receipt Handlers
// ============================================================================

/// Fetch a receipt.
pub async fn get_receipt(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<UserQuery>,
) -> Result<Json<ApiResponse<ReceiptResponse>>, HandlerError> {
    let receipt = state
        .receipts
        .get(id, query.user_id)
        .await
        .map_err(error_response)?;

    Ok(Json(ApiResponse::success(ReceiptResponse::from(receipt))))
}

/// Fetch the receipt of a completed trip.
pub async fn get_trip_receipt(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<UserQuery>,
) -> Result<Json<ApiResponse<ReceiptResponse>>, HandlerError> {
    let receipt = state
        .receipts
        .find_by_trip(id, query.user_id)
        .await
        .map_err(error_response)?;

    Ok(Json(ApiResponse::success(ReceiptResponse::from(receipt))))
}

/// List the user's receipts, newest first.
pub async fn list_receipts(
    State(state): State<AppState>,
    Query(query): Query<UserQuery>,
) -> Result<Json<ApiResponse<Vec<ReceiptResponse>>>, HandlerError> {
    let receipts = state
        .receipts
        .list_for_user(query.user_id)
        .await
        .map_err(error_response)?;

    Ok(Json(ApiResponse::success(
        receipts.into_iter().map(ReceiptResponse::from).collect(),
    )))
}
