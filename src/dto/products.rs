use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::Product;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateProductRequest {
    pub crop_name: String,
    pub quantity_kg: i32,
    pub price_per_kg: i64,
    pub harvest_date: NaiveDate,
    pub location: String,
    pub category: Option<String>,
    pub description: Option<String>,
    pub is_group_eligible: Option<bool>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateProductRequest {
    pub crop_name: Option<String>,
    pub quantity_kg: Option<i32>,
    pub price_per_kg: Option<i64>,
    pub harvest_date: Option<NaiveDate>,
    pub location: Option<String>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub is_group_eligible: Option<bool>,
}

/// Marketplace row: a product plus its farmer's public reputation fields.
#[derive(Debug, Serialize, ToSchema)]
pub struct MarketplaceProduct {
    #[serde(flatten)]
    pub product: Product,
    pub farmer_name: Option<String>,
    pub farmer_average_rating: Option<f64>,
    pub farmer_total_reviews: Option<i32>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MarketplaceList {
    pub items: Vec<MarketplaceProduct>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProductList {
    pub items: Vec<Product>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DeletedProduct {
    pub id: Uuid,
}
