use argon2::{
    Argon2, PasswordHasher,
    password_hash::{SaltString, rand_core::OsRng},
};
use agrilink_api::{config::AppConfig, db::create_pool};
use chrono::NaiveDate;
use uuid::Uuid;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let pool = create_pool(&config.database_url).await?;
    // Ensure migrations are applied.
    sqlx::migrate!("./migrations").run(&pool).await?;

    let admin_id = ensure_user(&pool, "Platform Admin", "admin@agrilink.test", "admin123", "admin").await?;
    let farmer_id = ensure_user(&pool, "Asha Patel", "asha@agrilink.test", "farmer123", "farmer").await?;
    let buyer_id = ensure_user(&pool, "Ben Okafor", "ben@agrilink.test", "buyer123", "buyer").await?;
    seed_products(&pool, farmer_id).await?;

    println!("Seed completed. Admin: {admin_id}, Farmer: {farmer_id}, Buyer: {buyer_id}");
    Ok(())
}

async fn ensure_user(
    pool: &sqlx::PgPool,
    name: &str,
    email: &str,
    password: &str,
    role: &str,
) -> anyhow::Result<Uuid> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!(e.to_string()))?
        .to_string();

    let row: Option<(Uuid,)> = sqlx::query_as(
        r#"
        INSERT INTO users (id, name, email, password_hash, role, is_verified)
        VALUES ($1, $2, $3, $4, $5, $6)
        ON CONFLICT (email) DO UPDATE SET role = EXCLUDED.role
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(name)
    .bind(email)
    .bind(password_hash)
    .bind(role)
    .bind(role == "admin")
    .fetch_optional(pool)
    .await?;

    let user_id = match row {
        Some((id,)) => id,
        None => {
            let existing: (Uuid,) = sqlx::query_as("SELECT id FROM users WHERE email = $1")
                .bind(email)
                .fetch_one(pool)
                .await?;
            existing.0
        }
    };

    println!("Ensured user {email} (role={role})");
    Ok(user_id)
}

async fn seed_products(pool: &sqlx::PgPool, farmer_id: Uuid) -> anyhow::Result<()> {
    let harvest = NaiveDate::from_ymd_opt(2026, 8, 1).expect("valid date");
    let products = [
        ("Potatoes", 100, 10, "vegetables", "Nashik"),
        ("Tomatoes", 250, 18, "vegetables", "Nashik"),
        ("Alphonso Mangoes", 40, 120, "fruits", "Ratnagiri"),
        ("Basmati Rice", 500, 65, "grains", "Karnal"),
    ];

    for (crop, qty, price, category, location) in products {
        sqlx::query(
            r#"
            INSERT INTO products
                (id, farmer_id, crop_name, quantity_kg, price_per_kg, harvest_date,
                 location, category, status)
            SELECT $1, $2, $3, $4, $5, $6, $7, $8, 'approved'
            WHERE NOT EXISTS (
                SELECT 1 FROM products WHERE farmer_id = $2 AND crop_name = $3
            )
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(farmer_id)
        .bind(crop)
        .bind(qty)
        .bind(price as i64)
        .bind(harvest)
        .bind(location)
        .bind(category)
        .execute(pool)
        .await?;
    }

    println!("Seeded products");
    Ok(())
}
