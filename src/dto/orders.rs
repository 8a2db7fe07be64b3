use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateOrderRequest {
    pub product_id: Uuid,
    pub quantity_kg: i32,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateOrderStatusRequest {
    pub status: String,
}

/// Order row populated for history views. Product fields are optional: the
/// product may have been deleted since the order was placed.
#[derive(Debug, Serialize, ToSchema)]
pub struct OrderView {
    pub id: Uuid,
    pub quantity_kg: i32,
    pub price_per_kg: i64,
    pub total_price: i64,
    pub status: String,
    pub payment_status: String,
    pub created_at: DateTime<Utc>,
    pub crop_name: Option<String>,
    pub product_location: Option<String>,
    pub buyer_name: Option<String>,
    pub buyer_email: Option<String>,
    pub farmer_name: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderViewList {
    pub items: Vec<OrderView>,
}
