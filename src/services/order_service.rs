use chrono::Utc;
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DbBackend, EntityTrait, FromQueryResult, QueryFilter, Set,
    Statement, TransactionTrait,
};
use uuid::Uuid;

use crate::dto::orders::{CreateOrderRequest, OrderView, OrderViewList, UpdateOrderStatusRequest};
use crate::{
    entity::{
        orders::{ActiveModel as OrderActive, Entity as Orders, Model as OrderModel},
        products::{Column as ProdCol, Entity as Products},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_role},
    models::Order,
    response::{ApiResponse, Meta},
    state::AppState,
};

/// Which side of the order is requesting a status change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderActor {
    Farmer,
    Buyer,
}

/// The order lifecycle:
///
/// ```text
/// pending --farmer--> accepted --buyer--> delivered
///    \--farmer--> rejected
/// ```
///
/// `rejected` and `delivered` are terminal. `cancelled` and `disputed` exist
/// in the schema but are not reachable through this route. A buyer may not
/// mark a still-pending order delivered; the farmer must accept first.
pub fn validate_transition(
    current: &str,
    requested: &str,
    actor: OrderActor,
) -> Result<(), AppError> {
    let allowed = match actor {
        OrderActor::Farmer => {
            current == "pending" && matches!(requested, "accepted" | "rejected")
        }
        OrderActor::Buyer => current == "accepted" && requested == "delivered",
    };

    if allowed {
        Ok(())
    } else {
        let side = match actor {
            OrderActor::Farmer => "farmer",
            OrderActor::Buyer => "buyer",
        };
        Err(AppError::InvalidTransition(format!(
            "Invalid status update: {side} cannot move order from '{current}' to '{requested}'"
        )))
    }
}

/// Place an order: snapshot the price, then debit stock with a single
/// conditional update (`quantity_kg >= requested` in the WHERE clause), all
/// inside one transaction. Two concurrent orders can never oversell.
pub async fn create_order(
    state: &AppState,
    user: &AuthUser,
    payload: CreateOrderRequest,
) -> AppResult<ApiResponse<Order>> {
    ensure_role(user, "buyer")?;

    if payload.quantity_kg <= 0 {
        return Err(AppError::Validation("Quantity must be positive".into()));
    }

    let txn = state.orm.begin().await?;

    let product = Products::find_by_id(payload.product_id).one(&txn).await?;
    let product = match product {
        Some(p) => p,
        None => return Err(AppError::NotFound("Product")),
    };

    // The guard in the filter is what makes the debit safe under concurrency:
    // zero rows affected means stock was insufficient at commit time.
    let debit = Products::update_many()
        .col_expr(
            ProdCol::QuantityKg,
            Expr::col(ProdCol::QuantityKg).sub(payload.quantity_kg),
        )
        .col_expr(ProdCol::UpdatedAt, Expr::value(Utc::now()))
        .filter(ProdCol::Id.eq(product.id))
        .filter(ProdCol::QuantityKg.gte(payload.quantity_kg))
        .exec(&txn)
        .await?;

    if debit.rows_affected == 0 {
        return Err(AppError::InsufficientStock);
    }

    let total_price = product.price_per_kg * payload.quantity_kg as i64;

    let order = OrderActive {
        id: Set(Uuid::new_v4()),
        buyer_id: Set(user.user_id),
        farmer_id: Set(product.farmer_id),
        product_id: Set(product.id),
        quantity_kg: Set(payload.quantity_kg),
        price_per_kg: Set(product.price_per_kg),
        total_price: Set(total_price),
        status: Set("pending".into()),
        payment_status: Set("pending".into()),
        dispute_reason: Set(None),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&txn)
    .await?;

    txn.commit().await?;

    tracing::info!(
        order_id = %order.id,
        product_id = %order.product_id,
        quantity_kg = order.quantity_kg,
        "order created"
    );

    Ok(ApiResponse::success(
        "Order created",
        order_from_entity(order),
        Some(Meta::empty()),
    ))
}

#[derive(Debug, FromQueryResult)]
struct OrderHistoryRow {
    id: Uuid,
    quantity_kg: i32,
    price_per_kg: i64,
    total_price: i64,
    status: String,
    payment_status: String,
    created_at: chrono::DateTime<chrono::FixedOffset>,
    crop_name: Option<String>,
    product_location: Option<String>,
    buyer_name: Option<String>,
    buyer_email: Option<String>,
    farmer_name: Option<String>,
}

const ORDER_HISTORY_SQL: &str = r#"
    SELECT o.id,
           o.quantity_kg,
           o.price_per_kg,
           o.total_price,
           o.status,
           o.payment_status,
           o.created_at,
           p.crop_name,
           p.location AS product_location,
           b.name AS buyer_name,
           b.email AS buyer_email,
           f.name AS farmer_name
    FROM orders o
    LEFT JOIN products p ON p.id = o.product_id
    LEFT JOIN users b ON b.id = o.buyer_id
    LEFT JOIN users f ON f.id = o.farmer_id
"#;

pub async fn list_buyer_orders(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<OrderViewList>> {
    ensure_role(user, "buyer")?;
    list_history(state, "o.buyer_id", user.user_id).await
}

pub async fn list_farmer_orders(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<OrderViewList>> {
    ensure_role(user, "farmer")?;
    list_history(state, "o.farmer_id", user.user_id).await
}

async fn list_history(
    state: &AppState,
    owner_col: &str,
    owner_id: Uuid,
) -> AppResult<ApiResponse<OrderViewList>> {
    let sql = format!("{ORDER_HISTORY_SQL} WHERE {owner_col} = $1 ORDER BY o.created_at DESC");
    let rows = OrderHistoryRow::find_by_statement(Statement::from_sql_and_values(
        DbBackend::Postgres,
        sql,
        [owner_id.into()],
    ))
    .all(&state.orm)
    .await?;

    let items = rows.into_iter().map(order_view_from_row).collect();
    Ok(ApiResponse::success(
        "Orders",
        OrderViewList { items },
        None,
    ))
}

/// One page of order history across all parties, for the admin panel.
pub async fn order_view_page(
    state: &AppState,
    limit: i64,
    offset: i64,
) -> AppResult<Vec<OrderView>> {
    let sql = format!("{ORDER_HISTORY_SQL} ORDER BY o.created_at DESC LIMIT $1 OFFSET $2");
    let rows = OrderHistoryRow::find_by_statement(Statement::from_sql_and_values(
        DbBackend::Postgres,
        sql,
        [limit.into(), offset.into()],
    ))
    .all(&state.orm)
    .await?;

    Ok(rows.into_iter().map(order_view_from_row).collect())
}

/// Transition an order's status. Only a party to the order may act, and only
/// along the edges `validate_transition` allows; anything else leaves the
/// order untouched.
pub async fn update_status(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateOrderStatusRequest,
) -> AppResult<ApiResponse<Order>> {
    let order = Orders::find_by_id(id).one(&state.orm).await?;
    let order = match order {
        Some(o) => o,
        None => return Err(AppError::NotFound("Order")),
    };

    let actor = if user.role == "farmer" && order.farmer_id == user.user_id {
        OrderActor::Farmer
    } else if user.role == "buyer" && order.buyer_id == user.user_id {
        OrderActor::Buyer
    } else {
        return Err(AppError::Forbidden(
            "Not authorized to update this order".into(),
        ));
    };

    validate_transition(&order.status, &payload.status, actor)?;

    let mut active: OrderActive = order.into();
    active.status = Set(payload.status);
    active.updated_at = Set(Utc::now().into());
    let order = active.update(&state.orm).await?;

    tracing::info!(order_id = %order.id, status = %order.status, "order status updated");

    Ok(ApiResponse::success(
        "Order updated",
        order_from_entity(order),
        Some(Meta::empty()),
    ))
}

fn order_view_from_row(row: OrderHistoryRow) -> OrderView {
    OrderView {
        id: row.id,
        quantity_kg: row.quantity_kg,
        price_per_kg: row.price_per_kg,
        total_price: row.total_price,
        status: row.status,
        payment_status: row.payment_status,
        created_at: row.created_at.with_timezone(&Utc),
        crop_name: row.crop_name,
        product_location: row.product_location,
        buyer_name: row.buyer_name,
        buyer_email: row.buyer_email,
        farmer_name: row.farmer_name,
    }
}

pub fn order_from_entity(model: OrderModel) -> Order {
    Order {
        id: model.id,
        buyer_id: model.buyer_id,
        farmer_id: model.farmer_id,
        product_id: model.product_id,
        quantity_kg: model.quantity_kg,
        price_per_kg: model.price_per_kg,
        total_price: model.total_price,
        status: model.status,
        payment_status: model.payment_status,
        dispute_reason: model.dispute_reason,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    }
}
