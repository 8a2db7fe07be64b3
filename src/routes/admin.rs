use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, put},
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    dto::orders::OrderView,
    error::AppResult,
    middleware::auth::AuthUser,
    models::{AuditLog, Product, Review, User},
    response::ApiResponse,
    routes::params::AdminListQuery,
    services::admin_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/stats", get(dashboard_stats))
        .route("/analytics", get(analytics))
        .route("/farmers", get(list_farmers))
        .route("/farmers/{id}", put(update_farmer_status))
        .route("/products", get(list_products))
        .route("/products/{id}", put(update_product_status))
        .route("/orders", get(list_orders))
        .route("/reviews", get(list_reviews))
        .route("/reviews/{id}", put(moderate_review))
        .route("/audit-logs", get(list_audit_logs))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateFarmerStatusRequest {
    pub is_verified: Option<bool>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateProductStatusRequest {
    pub status: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ModerateReviewRequest {
    pub flag_status: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DashboardMetrics {
    pub total_farmers: i64,
    pub verified_farmers: i64,
    pub unverified_farmers: i64,
    pub total_products: i64,
    pub active_products: i64,
    pub total_orders: i64,
    pub completed_orders: i64,
    pub total_revenue: i64,
    pub platform_profit: i64,
    pub farmer_earnings: i64,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DashboardAlerts {
    pub pending_verifications: i64,
    pub pending_product_approvals: i64,
    pub reported_reviews: i64,
    pub unresolved_disputes: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DashboardStats {
    pub metrics: DashboardMetrics,
    pub alerts: DashboardAlerts,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DayBucket {
    pub day: String,
    pub orders: i64,
    pub revenue: i64,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TopProduct {
    pub product_id: Uuid,
    pub product_name: String,
    pub total_quantity: i64,
    pub total_revenue: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DayCount {
    pub day: String,
    pub count: i64,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsResponse {
    pub orders_per_day: Vec<DayBucket>,
    pub top_selling_products: Vec<TopProduct>,
    pub new_farmers_trend: Vec<DayCount>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct FarmerList {
    pub items: Vec<User>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AdminProductView {
    #[serde(flatten)]
    pub product: Product,
    pub farmer_name: Option<String>,
    pub farmer_email: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AdminProductList {
    pub items: Vec<AdminProductView>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AdminOrderList {
    pub items: Vec<OrderView>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ReviewView {
    #[serde(flatten)]
    pub review: Review,
    pub buyer_name: Option<String>,
    pub farmer_name: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ReviewList {
    pub items: Vec<ReviewView>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AuditLogView {
    #[serde(flatten)]
    pub log: AuditLog,
    pub admin_name: Option<String>,
    pub admin_email: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AuditLogList {
    pub items: Vec<AuditLogView>,
}

#[utoipa::path(
    get,
    path = "/api/admin/stats",
    responses(
        (status = 200, description = "Dashboard metrics and alerts", body = ApiResponse<DashboardStats>),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn dashboard_stats(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<DashboardStats>>> {
    let resp = admin_service::dashboard_stats(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/admin/analytics",
    responses(
        (status = 200, description = "Trailing 7-day analytics", body = ApiResponse<AnalyticsResponse>),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn analytics(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<AnalyticsResponse>>> {
    let resp = admin_service::analytics(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/admin/farmers",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("keyword" = Option<String>, Query, description = "Substring filter on name")
    ),
    responses(
        (status = 200, description = "Paginated farmer list", body = ApiResponse<FarmerList>),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn list_farmers(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<AdminListQuery>,
) -> AppResult<Json<ApiResponse<FarmerList>>> {
    let resp = admin_service::list_farmers(&state, &user, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/admin/farmers/{id}",
    params(("id" = Uuid, Path, description = "Farmer ID")),
    request_body = UpdateFarmerStatusRequest,
    responses(
        (status = 200, description = "Verify or unverify a farmer", body = ApiResponse<User>),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not Found")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn update_farmer_status(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateFarmerStatusRequest>,
) -> AppResult<Json<ApiResponse<User>>> {
    let resp = admin_service::update_farmer_status(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/admin/products",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("keyword" = Option<String>, Query, description = "Substring filter on crop name"),
        ("status" = Option<String>, Query, description = "Exact status filter")
    ),
    responses(
        (status = 200, description = "Paginated product list", body = ApiResponse<AdminProductList>),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn list_products(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<AdminListQuery>,
) -> AppResult<Json<ApiResponse<AdminProductList>>> {
    let resp = admin_service::list_products(&state, &user, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/admin/products/{id}",
    params(("id" = Uuid, Path, description = "Product ID")),
    request_body = UpdateProductStatusRequest,
    responses(
        (status = 200, description = "Approve/reject/flag a product", body = ApiResponse<Product>),
        (status = 400, description = "Invalid status"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not Found")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn update_product_status(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateProductStatusRequest>,
) -> AppResult<Json<ApiResponse<Product>>> {
    let resp = admin_service::update_product_status(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/admin/orders",
    params(("page" = Option<i64>, Query, description = "Page number, default 1")),
    responses(
        (status = 200, description = "Paginated order list (read-only)", body = ApiResponse<AdminOrderList>),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn list_orders(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<AdminListQuery>,
) -> AppResult<Json<ApiResponse<AdminOrderList>>> {
    let resp = admin_service::list_orders(&state, &user, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/admin/reviews",
    params(("page" = Option<i64>, Query, description = "Page number, default 1")),
    responses(
        (status = 200, description = "Paginated review list", body = ApiResponse<ReviewList>),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn list_reviews(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<AdminListQuery>,
) -> AppResult<Json<ApiResponse<ReviewList>>> {
    let resp = admin_service::list_reviews(&state, &user, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/admin/reviews/{id}",
    params(("id" = Uuid, Path, description = "Review ID")),
    request_body = ModerateReviewRequest,
    responses(
        (status = 200, description = "Flag or hide a review", body = ApiResponse<Review>),
        (status = 400, description = "Invalid flag status"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not Found")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn moderate_review(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<ModerateReviewRequest>,
) -> AppResult<Json<ApiResponse<Review>>> {
    let resp = admin_service::moderate_review(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/admin/audit-logs",
    params(("page" = Option<i64>, Query, description = "Page number, default 1")),
    responses(
        (status = 200, description = "Paginated audit trail, newest first", body = ApiResponse<AuditLogList>),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn list_audit_logs(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<AdminListQuery>,
) -> AppResult<Json<ApiResponse<AuditLogList>>> {
    let resp = admin_service::list_audit_logs(&state, &user, query).await?;
    Ok(Json(resp))
}
