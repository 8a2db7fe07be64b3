use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        auth::{LoginRequest, LoginResponse, RegisterRequest},
        orders::{
            CreateOrderRequest, OrderView, OrderViewList, UpdateOrderStatusRequest,
        },
        products::{
            CreateProductRequest, DeletedProduct, MarketplaceList, MarketplaceProduct,
            ProductList, UpdateProductRequest,
        },
    },
    models::{AuditLog, GroupListing, Order, Product, Review, User},
    response::Meta,
    routes::{admin, auth, health, orders, products},
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        auth::register,
        auth::login,
        auth::profile,
        products::list_products,
        products::create_product,
        products::my_products,
        products::update_product,
        products::delete_product,
        orders::create_order,
        orders::buyer_orders,
        orders::farmer_orders,
        orders::update_order_status,
        admin::dashboard_stats,
        admin::analytics,
        admin::list_farmers,
        admin::update_farmer_status,
        admin::list_products,
        admin::update_product_status,
        admin::list_orders,
        admin::list_reviews,
        admin::moderate_review,
        admin::list_audit_logs,
    ),
    components(
        schemas(
            User,
            Product,
            Order,
            Review,
            AuditLog,
            GroupListing,
            Meta,
            RegisterRequest,
            LoginRequest,
            LoginResponse,
            CreateProductRequest,
            UpdateProductRequest,
            MarketplaceProduct,
            MarketplaceList,
            ProductList,
            DeletedProduct,
            CreateOrderRequest,
            UpdateOrderStatusRequest,
            OrderView,
            OrderViewList,
            admin::UpdateFarmerStatusRequest,
            admin::UpdateProductStatusRequest,
            admin::ModerateReviewRequest,
            admin::DashboardStats,
            admin::DashboardMetrics,
            admin::DashboardAlerts,
            admin::AnalyticsResponse,
            admin::DayBucket,
            admin::TopProduct,
            admin::DayCount,
            admin::FarmerList,
            admin::AdminProductView,
            admin::AdminProductList,
            admin::AdminOrderList,
            admin::ReviewView,
            admin::ReviewList,
            admin::AuditLogView,
            admin::AuditLogList,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Registration, login and identity"),
        (name = "Products", description = "Marketplace listings"),
        (name = "Orders", description = "Order placement and lifecycle"),
        (name = "Admin", description = "Moderation, stats and analytics"),
        (name = "Health", description = "Liveness"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<openapi::OpenApi> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
