use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post, put},
};
use uuid::Uuid;

use crate::{
    dto::orders::{CreateOrderRequest, OrderViewList, UpdateOrderStatusRequest},
    error::AppResult,
    middleware::auth::AuthUser,
    models::Order,
    response::ApiResponse,
    services::order_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_order))
        .route("/buyer", get(buyer_orders))
        .route("/farmer", get(farmer_orders))
        .route("/{id}/status", put(update_order_status))
}

#[utoipa::path(
    post,
    path = "/api/orders",
    request_body = CreateOrderRequest,
    responses(
        (status = 200, description = "Place an order; stock is debited atomically", body = ApiResponse<Order>),
        (status = 400, description = "Insufficient quantity available"),
        (status = 403, description = "Not a buyer"),
        (status = 404, description = "Product not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn create_order(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateOrderRequest>,
) -> AppResult<Json<ApiResponse<Order>>> {
    let resp = order_service::create_order(&state, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/orders/buyer",
    responses(
        (status = 200, description = "Buyer order history", body = ApiResponse<OrderViewList>),
        (status = 403, description = "Not a buyer")
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn buyer_orders(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<OrderViewList>>> {
    let resp = order_service::list_buyer_orders(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/orders/farmer",
    responses(
        (status = 200, description = "Farmer order history", body = ApiResponse<OrderViewList>),
        (status = 403, description = "Not a farmer")
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn farmer_orders(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<OrderViewList>>> {
    let resp = order_service::list_farmer_orders(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/orders/{id}/status",
    params(("id" = Uuid, Path, description = "Order ID")),
    request_body = UpdateOrderStatusRequest,
    responses(
        (status = 200, description = "Transition order state", body = ApiResponse<Order>),
        (status = 400, description = "Invalid transition for actor"),
        (status = 403, description = "Not a party to the order"),
        (status = 404, description = "Not Found")
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn update_order_status(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateOrderStatusRequest>,
) -> AppResult<Json<ApiResponse<Order>>> {
    let resp = order_service::update_status(&state, &user, id, payload).await?;
    Ok(Json(resp))
}
