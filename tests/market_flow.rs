use agrilink_api::{
    db::{create_orm_conn, create_pool},
    dto::orders::{CreateOrderRequest, UpdateOrderStatusRequest},
    dto::products::{CreateProductRequest, UpdateProductRequest},
    entity::{
        audit_logs::{Column as AuditCol, Entity as AuditLogs},
        products::Entity as Products,
        reviews::ActiveModel as ReviewActive,
        users::ActiveModel as UserActive,
    },
    error::AppError,
    middleware::auth::AuthUser,
    routes::admin::{ModerateReviewRequest, UpdateFarmerStatusRequest},
    routes::params::AdminListQuery,
    services::{admin_service, order_service, product_service},
    state::AppState,
};
use chrono::NaiveDate;
use sea_orm::ActiveValue::NotSet;
use sea_orm::{ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set, Statement};
use std::sync::OnceLock;
use uuid::Uuid;

// Both tests truncate the shared database, so they must not interleave.
static DB_LOCK: OnceLock<tokio::sync::Mutex<()>> = OnceLock::new();

async fn db_guard() -> tokio::sync::MutexGuard<'static, ()> {
    DB_LOCK.get_or_init(|| tokio::sync::Mutex::new(())).lock().await
}

// Full marketplace flow: farmer lists produce, buyer orders against stock,
// both sides walk the order lifecycle, and the admin panel reflects it all.
#[tokio::test]
async fn list_order_deliver_and_admin_flow() -> anyhow::Result<()> {
    let _guard = db_guard().await;
    let state = match setup_state().await? {
        Some(state) => state,
        None => return Ok(()),
    };

    let farmer_id = create_user(&state, "Asha Patel", "farmer@test.local", "farmer").await?;
    let buyer_id = create_user(&state, "Ben Okafor", "buyer@test.local", "buyer").await?;
    let admin_id = create_user(&state, "Root Admin", "admin@test.local", "admin").await?;

    let farmer = auth(farmer_id, "farmer");
    let buyer = auth(buyer_id, "buyer");
    let admin = auth(admin_id, "admin");

    // Farmer lists 100kg of potatoes at 10/kg.
    let product = product_service::create_product(
        &state,
        &farmer,
        product_request("Potatoes", 100, 10),
    )
    .await?
    .data
    .unwrap();
    assert_eq!(product.status, "pending");

    // Buyers cannot list produce.
    let err = product_service::create_product(&state, &buyer, product_request("Weeds", 1, 1))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    // Missing category is a validation failure.
    let mut no_category = product_request("Onions", 10, 5);
    no_category.category = None;
    let err = product_service::create_product(&state, &farmer, no_category)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    // Buyer orders 30kg: total snapshots price, stock drops to 70.
    let order = order_service::create_order(
        &state,
        &buyer,
        CreateOrderRequest {
            product_id: product.id,
            quantity_kg: 30,
        },
    )
    .await?
    .data
    .unwrap();
    assert_eq!(order.total_price, 300);
    assert_eq!(order.price_per_kg, 10);
    assert_eq!(order.status, "pending");
    assert_eq!(stock_of(&state, product.id).await?, 70);

    // Buyer cannot deliver a pending order; farmer cannot deliver at all.
    let err = order_service::update_status(&state, &buyer, order.id, status("delivered"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidTransition(_)));
    let err = order_service::update_status(&state, &farmer, order.id, status("delivered"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidTransition(_)));

    // A stranger to the order is rejected outright.
    let err = order_service::update_status(&state, &admin, order.id, status("accepted"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    // Farmer accepts, buyer delivers.
    let accepted = order_service::update_status(&state, &farmer, order.id, status("accepted"))
        .await?
        .data
        .unwrap();
    assert_eq!(accepted.status, "accepted");
    let delivered = order_service::update_status(&state, &buyer, order.id, status("delivered"))
        .await?
        .data
        .unwrap();
    assert_eq!(delivered.status, "delivered");

    // Editing the product price later must not touch the order's snapshot.
    product_service::update_product(
        &state,
        &farmer,
        product.id,
        UpdateProductRequest {
            price_per_kg: Some(99),
            ..Default::default()
        },
    )
    .await?;
    let history = order_service::list_buyer_orders(&state, &buyer).await?.data.unwrap();
    assert_eq!(history.items.len(), 1);
    assert_eq!(history.items[0].total_price, 300);
    assert_eq!(history.items[0].crop_name.as_deref(), Some("Potatoes"));

    // Ordering more than the remaining 70kg fails before any mutation.
    let err = order_service::create_order(
        &state,
        &buyer,
        CreateOrderRequest {
            product_id: product.id,
            quantity_kg: 71,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::InsufficientStock));
    assert_eq!(stock_of(&state, product.id).await?, 70);

    // Admin dashboard: one delivered order of 300 at the 4%/96% split.
    let stats = admin_service::dashboard_stats(&state, &admin).await?.data.unwrap();
    assert_eq!(stats.metrics.total_farmers, 1);
    assert_eq!(stats.metrics.total_orders, 1);
    assert_eq!(stats.metrics.completed_orders, 1);
    assert_eq!(stats.metrics.total_revenue, 300);
    assert_eq!(stats.metrics.platform_profit, 12);
    assert_eq!(stats.metrics.farmer_earnings, 288);
    assert_eq!(stats.alerts.pending_verifications, 1);

    // Moderation writes exactly one audit row per action.
    let verified = admin_service::update_farmer_status(
        &state,
        &admin,
        farmer_id,
        UpdateFarmerStatusRequest {
            is_verified: Some(true),
        },
    )
    .await?
    .data
    .unwrap();
    assert!(verified.is_verified);

    let review = ReviewActive {
        id: Set(Uuid::new_v4()),
        buyer_id: Set(buyer_id),
        farmer_id: Set(farmer_id),
        order_id: Set(Some(order.id)),
        rating: Set(4),
        comment: Set(Some("Good potatoes".into())),
        flag_status: Set("clean".into()),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;
    admin_service::moderate_review(
        &state,
        &admin,
        review.id,
        ModerateReviewRequest {
            flag_status: "flagged".into(),
        },
    )
    .await?;

    let audits = AuditLogs::find()
        .filter(AuditCol::AdminId.eq(admin_id))
        .all(&state.orm)
        .await?;
    assert_eq!(audits.len(), 2);
    assert!(audits.iter().any(|a| {
        a.action == "UPDATE_FARMER_STATUS" && a.entity_type == "User" && a.entity_id == farmer_id
    }));
    assert!(audits.iter().any(|a| {
        a.action == "MODERATE_REVIEW" && a.entity_type == "Review" && a.entity_id == review.id
    }));

    // Flagged review now shows up in the alerts.
    let stats = admin_service::dashboard_stats(&state, &admin).await?.data.unwrap();
    assert_eq!(stats.alerts.reported_reviews, 1);

    // Pagination meta on the farmer listing.
    let farmers = admin_service::list_farmers(&state, &admin, AdminListQuery::default()).await?;
    let meta = farmers.meta.unwrap();
    assert_eq!(meta.total, Some(1));
    assert_eq!(meta.pages, Some(1));
    let farmers = admin_service::list_farmers(
        &state,
        &admin,
        AdminListQuery {
            keyword: Some("asha".into()),
            ..Default::default()
        },
    )
    .await?
    .data
    .unwrap();
    assert_eq!(farmers.items.len(), 1, "keyword match is case-insensitive");

    // Non-admins are shut out of the panel.
    let err = admin_service::dashboard_stats(&state, &farmer).await.unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    Ok(())
}

// Two buyers race for the last of the stock: the conditional decrement lets at
// most one of them win, and the stock never goes negative.
#[tokio::test]
async fn concurrent_orders_never_oversell() -> anyhow::Result<()> {
    let _guard = db_guard().await;
    let state = match setup_state().await? {
        Some(state) => state,
        None => return Ok(()),
    };

    let farmer_id = create_user(&state, "Lena Farmer", "race-farmer@test.local", "farmer").await?;
    let buyer_a = create_user(&state, "Buyer A", "race-a@test.local", "buyer").await?;
    let buyer_b = create_user(&state, "Buyer B", "race-b@test.local", "buyer").await?;

    let farmer = auth(farmer_id, "farmer");
    let product = product_service::create_product(
        &state,
        &farmer,
        product_request("Tomatoes", 100, 18),
    )
    .await?
    .data
    .unwrap();

    let request = |q| CreateOrderRequest {
        product_id: product.id,
        quantity_kg: q,
    };

    let auth_a = auth(buyer_a, "buyer");
    let auth_b = auth(buyer_b, "buyer");
    let (first, second) = tokio::join!(
        order_service::create_order(&state, &auth_a, request(60)),
        order_service::create_order(&state, &auth_b, request(60)),
    );

    let successes = [&first, &second].iter().filter(|r| r.is_ok()).count();
    assert_eq!(successes, 1, "exactly one of the competing orders may win");
    for result in [first, second] {
        if let Err(err) = result {
            assert!(matches!(err, AppError::InsufficientStock));
        }
    }

    assert_eq!(stock_of(&state, product.id).await?, 40);

    Ok(())
}

async fn setup_state() -> anyhow::Result<Option<AppState>> {
    // Allow skipping when no DB is configured in the environment.
    let database_url = match std::env::var("TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
    {
        Ok(url) => url,
        Err(_) => {
            eprintln!(
                "Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run integration flow tests."
            );
            return Ok(None);
        }
    };

    let pool = create_pool(&database_url).await?;
    sqlx::migrate!("./migrations").run(&pool).await?;
    let orm = create_orm_conn(&database_url).await?;

    // Clean tables between runs.
    let backend = orm.get_database_backend();
    orm.execute(Statement::from_string(
        backend,
        "TRUNCATE TABLE group_listing_members, group_listings, audit_logs, reviews, orders, products, users CASCADE",
    ))
    .await?;

    Ok(Some(AppState { pool, orm }))
}

fn auth(user_id: Uuid, role: &str) -> AuthUser {
    AuthUser {
        user_id,
        role: role.into(),
    }
}

fn status(s: &str) -> UpdateOrderStatusRequest {
    UpdateOrderStatusRequest { status: s.into() }
}

fn product_request(crop: &str, quantity_kg: i32, price_per_kg: i64) -> CreateProductRequest {
    CreateProductRequest {
        crop_name: crop.into(),
        quantity_kg,
        price_per_kg,
        harvest_date: NaiveDate::from_ymd_opt(2026, 8, 1).expect("valid date"),
        location: "Nashik".into(),
        category: Some("vegetables".into()),
        description: None,
        is_group_eligible: None,
    }
}

async fn stock_of(state: &AppState, product_id: Uuid) -> anyhow::Result<i32> {
    let product = Products::find_by_id(product_id)
        .one(&state.orm)
        .await?
        .expect("product exists");
    Ok(product.quantity_kg)
}

async fn create_user(
    state: &AppState,
    name: &str,
    email: &str,
    role: &str,
) -> anyhow::Result<Uuid> {
    let user = UserActive {
        id: Set(Uuid::new_v4()),
        name: Set(name.to_string()),
        email: Set(email.to_string()),
        password_hash: Set("dummy".into()),
        role: Set(role.into()),
        is_verified: Set(false),
        location: Set(None),
        language: Set(None),
        average_rating: Set(0.0),
        total_reviews: Set(0),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    Ok(user.id)
}
