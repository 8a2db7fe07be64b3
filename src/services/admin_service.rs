use std::collections::HashMap;

use chrono::{Duration, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DbBackend, EntityTrait, FromQueryResult,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, Statement, TransactionTrait,
};
use sea_orm::sea_query::Expr;
use sea_orm::sea_query::extension::postgres::PgExpr;
use uuid::Uuid;

use crate::routes::admin::{
    AdminOrderList, AdminProductList, AdminProductView, AnalyticsResponse, AuditLogList,
    AuditLogView, DashboardAlerts, DashboardMetrics, DashboardStats, DayBucket, DayCount,
    FarmerList, ModerateReviewRequest, ReviewList, ReviewView, TopProduct,
    UpdateFarmerStatusRequest, UpdateProductStatusRequest,
};
use crate::routes::params::AdminListQuery;
use crate::services::order_service::order_view_page;
use crate::{
    audit::record_audit,
    entity::{
        audit_logs::{Column as AuditCol, Entity as AuditLogs},
        orders::{Column as OrderCol, Entity as Orders},
        products::{
            ActiveModel as ProductActive, Column as ProdCol, Entity as Products,
        },
        reviews::{ActiveModel as ReviewActive, Column as ReviewCol, Entity as Reviews},
        users::{ActiveModel as UserActive, Column as UserCol, Entity as Users},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::{Product, Review, User},
    response::{ApiResponse, Meta},
    services::product_service::product_from_entity,
    state::AppState,
};

const PAGE_SIZE: i64 = 10;
const AUDIT_PAGE_SIZE: i64 = 15;

/// Fixed 4% platform commission. The halves are rounded independently, so
/// their sum may differ from the revenue by one unit.
pub fn commission_split(revenue: i64) -> (i64, i64) {
    let platform_profit = (revenue as f64 * 0.04).round() as i64;
    let farmer_earnings = (revenue as f64 * 0.96).round() as i64;
    (platform_profit, farmer_earnings)
}

#[derive(Debug, FromQueryResult)]
struct RevenueRow {
    total: i64,
}

pub async fn dashboard_stats(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<DashboardStats>> {
    ensure_admin(user)?;

    let farmers = Users::find().filter(UserCol::Role.eq("farmer"));
    let total_farmers = farmers.clone().count(&state.orm).await? as i64;
    let verified_farmers = farmers
        .clone()
        .filter(UserCol::IsVerified.eq(true))
        .count(&state.orm)
        .await? as i64;
    let unverified_farmers = total_farmers - verified_farmers;

    let total_products = Products::find().count(&state.orm).await? as i64;
    let active_products = Products::find()
        .filter(ProdCol::Status.eq("approved"))
        .count(&state.orm)
        .await? as i64;
    let pending_products = Products::find()
        .filter(ProdCol::Status.eq("pending"))
        .count(&state.orm)
        .await? as i64;

    let total_orders = Orders::find().count(&state.orm).await? as i64;
    let completed_orders = Orders::find()
        .filter(OrderCol::Status.eq("delivered"))
        .count(&state.orm)
        .await? as i64;

    // Revenue counts delivered orders only. SUM(bigint) yields numeric in
    // Postgres, hence the cast.
    let revenue = RevenueRow::find_by_statement(Statement::from_string(
        DbBackend::Postgres,
        "SELECT COALESCE(SUM(total_price), 0)::BIGINT AS total FROM orders WHERE status = 'delivered'",
    ))
    .one(&state.orm)
    .await?
    .map(|r| r.total)
    .unwrap_or(0);

    let (platform_profit, farmer_earnings) = commission_split(revenue);

    let reported_reviews = Reviews::find()
        .filter(ReviewCol::FlagStatus.eq("flagged"))
        .count(&state.orm)
        .await? as i64;
    let unresolved_disputes = Orders::find()
        .filter(OrderCol::Status.eq("disputed"))
        .count(&state.orm)
        .await? as i64;

    let stats = DashboardStats {
        metrics: DashboardMetrics {
            total_farmers,
            verified_farmers,
            unverified_farmers,
            total_products,
            active_products,
            total_orders,
            completed_orders,
            total_revenue: revenue,
            platform_profit,
            farmer_earnings,
        },
        alerts: DashboardAlerts {
            pending_verifications: unverified_farmers,
            pending_product_approvals: pending_products,
            reported_reviews,
            unresolved_disputes,
        },
    };

    Ok(ApiResponse::success("Dashboard stats", stats, None))
}

#[derive(Debug, FromQueryResult)]
struct DayBucketRow {
    day: String,
    orders: i64,
    revenue: i64,
}

#[derive(Debug, FromQueryResult)]
struct TopProductRow {
    product_id: Uuid,
    product_name: String,
    total_quantity: i64,
    total_revenue: i64,
}

#[derive(Debug, FromQueryResult)]
struct DayCountRow {
    day: String,
    count: i64,
}

/// Trailing-7-day analytics. Buckets are sparse: a day with no activity is
/// simply absent from the result.
pub async fn analytics(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<AnalyticsResponse>> {
    ensure_admin(user)?;

    let seven_days_ago = Utc::now() - Duration::days(7);

    let orders_per_day = DayBucketRow::find_by_statement(Statement::from_sql_and_values(
        DbBackend::Postgres,
        r#"
        SELECT to_char(created_at, 'YYYY-MM-DD') AS day,
               COUNT(*)::BIGINT AS orders,
               COALESCE(SUM(total_price), 0)::BIGINT AS revenue
        FROM orders
        WHERE created_at >= $1
        GROUP BY 1
        ORDER BY 1
        "#,
        [seven_days_ago.into()],
    ))
    .all(&state.orm)
    .await?
    .into_iter()
    .map(|r| DayBucket {
        day: r.day,
        orders: r.orders,
        revenue: r.revenue,
    })
    .collect();

    let top_selling_products = TopProductRow::find_by_statement(Statement::from_string(
        DbBackend::Postgres,
        r#"
        SELECT o.product_id,
               COALESCE(p.crop_name, 'removed product') AS product_name,
               SUM(o.quantity_kg)::BIGINT AS total_quantity,
               COALESCE(SUM(o.total_price), 0)::BIGINT AS total_revenue
        FROM orders o
        LEFT JOIN products p ON p.id = o.product_id
        WHERE o.status = 'delivered'
        GROUP BY o.product_id, p.crop_name
        ORDER BY total_quantity DESC, o.product_id
        LIMIT 5
        "#,
    ))
    .all(&state.orm)
    .await?
    .into_iter()
    .map(|r| TopProduct {
        product_id: r.product_id,
        product_name: r.product_name,
        total_quantity: r.total_quantity,
        total_revenue: r.total_revenue,
    })
    .collect();

    let new_farmers_trend = DayCountRow::find_by_statement(Statement::from_sql_and_values(
        DbBackend::Postgres,
        r#"
        SELECT to_char(created_at, 'YYYY-MM-DD') AS day,
               COUNT(*)::BIGINT AS count
        FROM users
        WHERE role = 'farmer' AND created_at >= $1
        GROUP BY 1
        ORDER BY 1
        "#,
        [seven_days_ago.into()],
    ))
    .all(&state.orm)
    .await?
    .into_iter()
    .map(|r| DayCount {
        day: r.day,
        count: r.count,
    })
    .collect();

    let data = AnalyticsResponse {
        orders_per_day,
        top_selling_products,
        new_farmers_trend,
    };

    Ok(ApiResponse::success("Analytics", data, None))
}

pub async fn list_farmers(
    state: &AppState,
    user: &AuthUser,
    query: AdminListQuery,
) -> AppResult<ApiResponse<FarmerList>> {
    ensure_admin(user)?;
    let (page, offset) = query.page_offset(PAGE_SIZE);

    let mut condition = Condition::all().add(UserCol::Role.eq("farmer"));
    if let Some(keyword) = query.keyword.as_ref().filter(|k| !k.is_empty()) {
        condition = condition.add(Expr::col(UserCol::Name).ilike(format!("%{keyword}%")));
    }

    let finder = Users::find().filter(condition);
    let total = finder.clone().count(&state.orm).await? as i64;

    let items: Vec<User> = finder
        .order_by_desc(UserCol::CreatedAt)
        .limit(PAGE_SIZE as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(user_from_entity)
        .collect();

    let meta = Meta::new(page, PAGE_SIZE, total);
    Ok(ApiResponse::success("Farmers", FarmerList { items }, Some(meta)))
}

pub async fn update_farmer_status(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateFarmerStatusRequest,
) -> AppResult<ApiResponse<User>> {
    ensure_admin(user)?;

    let txn = state.orm.begin().await?;

    let farmer = Users::find_by_id(id).one(&txn).await?;
    let farmer = match farmer {
        Some(f) => f,
        None => return Err(AppError::NotFound("Farmer")),
    };

    let is_verified = match payload.is_verified {
        Some(v) => v,
        None => return Err(AppError::Validation("is_verified is required".into())),
    };

    let mut active: UserActive = farmer.into();
    active.is_verified = Set(is_verified);
    let farmer = active.update(&txn).await?;

    record_audit(
        &txn,
        user.user_id,
        "UPDATE_FARMER_STATUS",
        "User",
        farmer.id,
        Some(serde_json::json!({ "is_verified": is_verified })),
    )
    .await?;

    txn.commit().await?;

    Ok(ApiResponse::success(
        "Farmer updated",
        user_from_entity(farmer),
        Some(Meta::empty()),
    ))
}

pub async fn list_products(
    state: &AppState,
    user: &AuthUser,
    query: AdminListQuery,
) -> AppResult<ApiResponse<AdminProductList>> {
    ensure_admin(user)?;
    let (page, offset) = query.page_offset(PAGE_SIZE);

    let mut condition = Condition::all();
    if let Some(keyword) = query.keyword.as_ref().filter(|k| !k.is_empty()) {
        condition = condition.add(Expr::col(ProdCol::CropName).ilike(format!("%{keyword}%")));
    }
    if let Some(status) = query.status.as_ref().filter(|s| !s.is_empty()) {
        condition = condition.add(ProdCol::Status.eq(status.clone()));
    }

    let finder = Products::find().filter(condition);
    let total = finder.clone().count(&state.orm).await? as i64;

    let products = finder
        .order_by_desc(ProdCol::CreatedAt)
        .limit(PAGE_SIZE as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?;

    let farmers = load_users(state, products.iter().map(|p| p.farmer_id)).await?;

    let items = products
        .into_iter()
        .map(|p| {
            let farmer = farmers.get(&p.farmer_id);
            AdminProductView {
                farmer_name: farmer.map(|f| f.0.clone()),
                farmer_email: farmer.map(|f| f.1.clone()),
                product: product_from_entity(p),
            }
        })
        .collect();

    let meta = Meta::new(page, PAGE_SIZE, total);
    Ok(ApiResponse::success(
        "Products",
        AdminProductList { items },
        Some(meta),
    ))
}

pub async fn update_product_status(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateProductStatusRequest,
) -> AppResult<ApiResponse<Product>> {
    ensure_admin(user)?;

    const VALID: [&str; 4] = ["pending", "approved", "rejected", "flagged"];
    if !VALID.contains(&payload.status.as_str()) {
        return Err(AppError::Validation("Invalid product status".into()));
    }

    let txn = state.orm.begin().await?;

    let product = Products::find_by_id(id).one(&txn).await?;
    let product = match product {
        Some(p) => p,
        None => return Err(AppError::NotFound("Product")),
    };

    let mut active: ProductActive = product.into();
    active.status = Set(payload.status.clone());
    active.updated_at = Set(Utc::now().into());
    let product = active.update(&txn).await?;

    record_audit(
        &txn,
        user.user_id,
        "UPDATE_PRODUCT_STATUS",
        "Product",
        product.id,
        Some(serde_json::json!({ "status": payload.status })),
    )
    .await?;

    txn.commit().await?;

    Ok(ApiResponse::success(
        "Product updated",
        product_from_entity(product),
        Some(Meta::empty()),
    ))
}

pub async fn list_orders(
    state: &AppState,
    user: &AuthUser,
    query: AdminListQuery,
) -> AppResult<ApiResponse<AdminOrderList>> {
    ensure_admin(user)?;
    let (page, offset) = query.page_offset(PAGE_SIZE);

    let total = Orders::find().count(&state.orm).await? as i64;
    let items = order_view_page(state, PAGE_SIZE, offset).await?;

    let meta = Meta::new(page, PAGE_SIZE, total);
    Ok(ApiResponse::success(
        "Orders",
        AdminOrderList { items },
        Some(meta),
    ))
}

pub async fn list_reviews(
    state: &AppState,
    user: &AuthUser,
    query: AdminListQuery,
) -> AppResult<ApiResponse<ReviewList>> {
    ensure_admin(user)?;
    let (page, offset) = query.page_offset(PAGE_SIZE);

    let total = Reviews::find().count(&state.orm).await? as i64;
    let reviews = Reviews::find()
        .order_by_desc(ReviewCol::CreatedAt)
        .limit(PAGE_SIZE as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?;

    let users = load_users(
        state,
        reviews
            .iter()
            .flat_map(|r| [r.buyer_id, r.farmer_id]),
    )
    .await?;

    let items = reviews
        .into_iter()
        .map(|r| ReviewView {
            buyer_name: users.get(&r.buyer_id).map(|u| u.0.clone()),
            farmer_name: users.get(&r.farmer_id).map(|u| u.0.clone()),
            review: review_from_entity(r),
        })
        .collect();

    let meta = Meta::new(page, PAGE_SIZE, total);
    Ok(ApiResponse::success("Reviews", ReviewList { items }, Some(meta)))
}

pub async fn moderate_review(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: ModerateReviewRequest,
) -> AppResult<ApiResponse<Review>> {
    ensure_admin(user)?;

    const VALID: [&str; 3] = ["clean", "flagged", "hidden"];
    if !VALID.contains(&payload.flag_status.as_str()) {
        return Err(AppError::Validation("Invalid flag status".into()));
    }

    let txn = state.orm.begin().await?;

    let review = Reviews::find_by_id(id).one(&txn).await?;
    let review = match review {
        Some(r) => r,
        None => return Err(AppError::NotFound("Review")),
    };

    let mut active: ReviewActive = review.into();
    active.flag_status = Set(payload.flag_status.clone());
    let review = active.update(&txn).await?;

    record_audit(
        &txn,
        user.user_id,
        "MODERATE_REVIEW",
        "Review",
        review.id,
        Some(serde_json::json!({ "flag_status": payload.flag_status })),
    )
    .await?;

    txn.commit().await?;

    Ok(ApiResponse::success(
        "Review moderated",
        review_from_entity(review),
        Some(Meta::empty()),
    ))
}

pub async fn list_audit_logs(
    state: &AppState,
    user: &AuthUser,
    query: AdminListQuery,
) -> AppResult<ApiResponse<AuditLogList>> {
    ensure_admin(user)?;
    let (page, offset) = query.page_offset(AUDIT_PAGE_SIZE);

    let total = AuditLogs::find().count(&state.orm).await? as i64;
    let logs = AuditLogs::find()
        .order_by_desc(AuditCol::CreatedAt)
        .limit(AUDIT_PAGE_SIZE as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?;

    let admins = load_users(state, logs.iter().map(|l| l.admin_id)).await?;

    let items = logs
        .into_iter()
        .map(|l| AuditLogView {
            admin_name: admins.get(&l.admin_id).map(|u| u.0.clone()),
            admin_email: admins.get(&l.admin_id).map(|u| u.1.clone()),
            log: crate::models::AuditLog {
                id: l.id,
                admin_id: l.admin_id,
                action: l.action,
                entity_type: l.entity_type,
                entity_id: l.entity_id,
                details: l.details,
                created_at: l.created_at.with_timezone(&Utc),
            },
        })
        .collect();

    let meta = Meta::new(page, AUDIT_PAGE_SIZE, total);
    Ok(ApiResponse::success(
        "Audit logs",
        AuditLogList { items },
        Some(meta),
    ))
}

/// Batch-load (name, email) for a set of user ids.
async fn load_users(
    state: &AppState,
    ids: impl Iterator<Item = Uuid>,
) -> AppResult<HashMap<Uuid, (String, String)>> {
    let ids: Vec<Uuid> = ids.collect();
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    let users = Users::find()
        .filter(UserCol::Id.is_in(ids))
        .all(&state.orm)
        .await?;
    Ok(users
        .into_iter()
        .map(|u| (u.id, (u.name, u.email)))
        .collect())
}

pub fn user_from_entity(model: crate::entity::users::Model) -> User {
    User {
        id: model.id,
        name: model.name,
        email: model.email,
        password_hash: model.password_hash,
        role: model.role,
        is_verified: model.is_verified,
        location: model.location,
        language: model.language,
        average_rating: model.average_rating,
        total_reviews: model.total_reviews,
        created_at: model.created_at.with_timezone(&Utc),
    }
}

pub fn review_from_entity(model: crate::entity::reviews::Model) -> Review {
    Review {
        id: model.id,
        buyer_id: model.buyer_id,
        farmer_id: model.farmer_id,
        order_id: model.order_id,
        rating: model.rating,
        comment: model.comment,
        flag_status: model.flag_status,
        created_at: model.created_at.with_timezone(&Utc),
    }
}
