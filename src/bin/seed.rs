use chrono::Utc;
use storefront_api::{
    config::AppConfig,
    db::{create_orm_conn, run_migrations},
    models::{Category, DiscountCode, Product, Role, User},
    services::auth_service::hash_password,
    store::{PageRequest, ProductFilter, Store},
};
use uuid::Uuid;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt().with_env_filter("info").init();

    let config = AppConfig::from_env()?;
    let url = config
        .database_url
        .as_deref()
        .ok_or_else(|| anyhow::anyhow!("DATABASE_URL is not set"))?;
    let conn = create_orm_conn(url).await?;
    run_migrations(&conn).await?;
    let store = Store::orm(conn);

    let admin_id = ensure_user(&store, "admin", "admin@example.com", "admin123", Role::Admin).await?;
    let user_id = ensure_user(&store, "user", "user@example.com", "user123", Role::User).await?;
    seed_catalog(&store).await?;
    ensure_discount(&store, "WELCOME10", 10.0).await?;

    println!("Seed completed. Admin ID: {admin_id}, User ID: {user_id}");
    Ok(())
}

async fn ensure_user(
    store: &Store,
    username: &str,
    email: &str,
    password: &str,
    role: Role,
) -> anyhow::Result<Uuid> {
    if let Some(existing) = store.users.find_by_username(username).await? {
        println!("User {username} already exists");
        return Ok(existing.id);
    }

    let user = store
        .users
        .save(User {
            id: Uuid::new_v4(),
            username: username.to_string(),
            email: email.to_string(),
            password_hash: hash_password(password)?,
            role,
            created_at: Utc::now(),
        })
        .await?;

    println!("Ensured user {username} (role={role})");
    Ok(user.id)
}

async fn ensure_category(store: &Store, name: &str, description: &str) -> anyhow::Result<Uuid> {
    if let Some(existing) = store.categories.find_by_name(name).await? {
        return Ok(existing.id);
    }
    let category = store
        .categories
        .save(Category {
            id: Uuid::new_v4(),
            name: name.to_string(),
            description: Some(description.to_string()),
        })
        .await?;
    Ok(category.id)
}

async fn seed_catalog(store: &Store) -> anyhow::Result<()> {
    let apparel = ensure_category(store, "Apparel", "Things to wear").await?;
    let kitchen = ensure_category(store, "Kitchen", "Mugs, bottles and the like").await?;
    let books = ensure_category(store, "Books", "Printed and digital reading").await?;

    let products = vec![
        ("Crab Hoodie", "Warm hoodie with an orange crab", 55.0, 50, apparel),
        ("Logo Mug", "Coffee tastes better from it", 12.0, 100, kitchen),
        ("Sticker Pack", "Decorate your laptop", 5.0, 200, apparel),
        ("E-book: Async Patterns", "Learn async programming patterns", 25.0, 75, books),
    ];

    for (name, desc, price, stock, category_id) in products {
        let filter = ProductFilter {
            name_contains: Some(name.to_string()),
            ..Default::default()
        };
        let (found, _) = store.products.find(&filter, PageRequest::all()).await?;
        if found.iter().any(|p| p.name == name) {
            continue;
        }

        store
            .products
            .save(Product {
                id: Uuid::new_v4(),
                name: name.to_string(),
                description: Some(desc.to_string()),
                price,
                stock,
                image_url: None,
                category_id,
                created_at: Utc::now(),
            })
            .await?;
    }

    println!("Seeded products");
    Ok(())
}

async fn ensure_discount(store: &Store, code: &str, percentage: f64) -> anyhow::Result<()> {
    if store.discounts.find_by_code(code).await?.is_none() {
        store
            .discounts
            .save(DiscountCode {
                id: Uuid::new_v4(),
                code: code.to_string(),
                discount_percentage: percentage,
                active: true,
            })
            .await?;
        println!("Seeded discount code {code}");
    }
    Ok(())
}
