use chrono::Utc;
use sea_orm::ActiveValue::NotSet;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DbBackend, EntityTrait, FromQueryResult, ModelTrait,
    QueryFilter, QueryOrder, Set, Statement,
};
use uuid::Uuid;

use crate::dto::products::{
    CreateProductRequest, DeletedProduct, MarketplaceList, MarketplaceProduct, ProductList,
    UpdateProductRequest,
};
use crate::{
    entity::products::{
        ActiveModel as ProductActive, Column as ProdCol, Entity as Products, Model as ProductModel,
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_role},
    models::Product,
    response::{ApiResponse, Meta},
    state::AppState,
};

#[derive(Debug, FromQueryResult)]
struct MarketplaceRow {
    id: Uuid,
    farmer_id: Uuid,
    crop_name: String,
    quantity_kg: i32,
    price_per_kg: i64,
    harvest_date: chrono::NaiveDate,
    location: String,
    description: Option<String>,
    category: String,
    status: String,
    is_group_eligible: bool,
    created_at: chrono::DateTime<chrono::FixedOffset>,
    updated_at: chrono::DateTime<chrono::FixedOffset>,
    farmer_name: Option<String>,
    farmer_average_rating: Option<f64>,
    farmer_total_reviews: Option<i32>,
}

/// Marketplace view: every listing, newest first, with the farmer's public
/// reputation attached. LEFT JOIN so a missing farmer row does not hide the
/// listing.
pub async fn list_marketplace(state: &AppState) -> AppResult<ApiResponse<MarketplaceList>> {
    let rows = MarketplaceRow::find_by_statement(Statement::from_string(
        DbBackend::Postgres,
        r#"
        SELECT p.*,
               u.name AS farmer_name,
               u.average_rating AS farmer_average_rating,
               u.total_reviews AS farmer_total_reviews
        FROM products p
        LEFT JOIN users u ON u.id = p.farmer_id
        ORDER BY p.created_at DESC
        "#,
    ))
    .all(&state.orm)
    .await?;

    let items = rows
        .into_iter()
        .map(|row| MarketplaceProduct {
            product: Product {
                id: row.id,
                farmer_id: row.farmer_id,
                crop_name: row.crop_name,
                quantity_kg: row.quantity_kg,
                price_per_kg: row.price_per_kg,
                harvest_date: row.harvest_date,
                location: row.location,
                description: row.description,
                category: row.category,
                status: row.status,
                is_group_eligible: row.is_group_eligible,
                created_at: row.created_at.with_timezone(&Utc),
                updated_at: row.updated_at.with_timezone(&Utc),
            },
            farmer_name: row.farmer_name,
            farmer_average_rating: row.farmer_average_rating,
            farmer_total_reviews: row.farmer_total_reviews,
        })
        .collect();

    Ok(ApiResponse::success(
        "Products",
        MarketplaceList { items },
        None,
    ))
}

pub async fn list_my_products(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<ProductList>> {
    ensure_role(user, "farmer")?;

    let items = Products::find()
        .filter(ProdCol::FarmerId.eq(user.user_id))
        .order_by_desc(ProdCol::CreatedAt)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(product_from_entity)
        .collect();

    Ok(ApiResponse::success(
        "My products",
        ProductList { items },
        None,
    ))
}

pub async fn create_product(
    state: &AppState,
    user: &AuthUser,
    payload: CreateProductRequest,
) -> AppResult<ApiResponse<Product>> {
    ensure_role(user, "farmer")?;

    let category = match payload.category.filter(|c| !c.trim().is_empty()) {
        Some(c) => c,
        None => return Err(AppError::Validation("Category is required".into())),
    };
    if payload.quantity_kg < 0 {
        return Err(AppError::Validation("Quantity must not be negative".into()));
    }

    let product = ProductActive {
        id: Set(Uuid::new_v4()),
        farmer_id: Set(user.user_id),
        crop_name: Set(payload.crop_name),
        quantity_kg: Set(payload.quantity_kg),
        price_per_kg: Set(payload.price_per_kg),
        harvest_date: Set(payload.harvest_date),
        location: Set(payload.location),
        description: Set(payload.description),
        category: Set(category),
        status: Set("pending".into()),
        is_group_eligible: Set(payload.is_group_eligible.unwrap_or(false)),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    Ok(ApiResponse::success(
        "Product created",
        product_from_entity(product),
        Some(Meta::empty()),
    ))
}

pub async fn update_product(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateProductRequest,
) -> AppResult<ApiResponse<Product>> {
    ensure_role(user, "farmer")?;

    let existing = find_owned(state, user, id).await?;

    // Partial merge: only supplied fields overwrite.
    let mut active: ProductActive = existing.into();
    if let Some(crop_name) = payload.crop_name {
        active.crop_name = Set(crop_name);
    }
    if let Some(quantity_kg) = payload.quantity_kg {
        if quantity_kg < 0 {
            return Err(AppError::Validation("Quantity must not be negative".into()));
        }
        active.quantity_kg = Set(quantity_kg);
    }
    if let Some(price_per_kg) = payload.price_per_kg {
        active.price_per_kg = Set(price_per_kg);
    }
    if let Some(harvest_date) = payload.harvest_date {
        active.harvest_date = Set(harvest_date);
    }
    if let Some(location) = payload.location {
        active.location = Set(location);
    }
    if let Some(category) = payload.category {
        active.category = Set(category);
    }
    if let Some(description) = payload.description {
        active.description = Set(Some(description));
    }
    if let Some(is_group_eligible) = payload.is_group_eligible {
        active.is_group_eligible = Set(is_group_eligible);
    }
    active.updated_at = Set(Utc::now().into());

    let product = active.update(&state.orm).await?;

    Ok(ApiResponse::success(
        "Product updated",
        product_from_entity(product),
        Some(Meta::empty()),
    ))
}

pub async fn delete_product(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<DeletedProduct>> {
    ensure_role(user, "farmer")?;

    let existing = find_owned(state, user, id).await?;
    existing.delete(&state.orm).await?;

    Ok(ApiResponse::success(
        "Product removed",
        DeletedProduct { id },
        Some(Meta::empty()),
    ))
}

async fn find_owned(state: &AppState, user: &AuthUser, id: Uuid) -> AppResult<ProductModel> {
    let product = Products::find_by_id(id).one(&state.orm).await?;
    let product = match product {
        Some(p) => p,
        None => return Err(AppError::NotFound("Product")),
    };

    if product.farmer_id != user.user_id {
        return Err(AppError::Forbidden(
            "Not authorized to modify this product".into(),
        ));
    }
    Ok(product)
}

pub fn product_from_entity(model: ProductModel) -> Product {
    Product {
        id: model.id,
        farmer_id: model.farmer_id,
        crop_name: model.crop_name,
        quantity_kg: model.quantity_kg,
        price_per_kg: model.price_per_kg,
        harvest_date: model.harvest_date,
        location: model.location,
        description: model.description,
        category: model.category,
        status: model.status,
        is_group_eligible: model.is_group_eligible,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    }
}
