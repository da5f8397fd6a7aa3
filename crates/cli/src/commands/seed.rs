//! Demo catalog seeding.
//!
//! Inserts a small set of categories, products, and variants for local
//! development and integration testing. Running against a non-empty catalog
//! is a no-op.

use rust_decimal::Decimal;

use super::CommandError;

struct SeedProduct {
    title: &'static str,
    brand: &'static str,
    category: &'static str,
    price: Decimal,
    mrp: Option<Decimal>,
    stock: i32,
    tags: &'static [&'static str],
    popularity: i32,
    variants: &'static [(&'static str, &'static str, &'static str, i32)],
}

const CATEGORIES: &[(&str, &str)] = &[
    ("Footwear", "Shoes for trail and street"),
    ("Apparel", "Everyday and outdoor clothing"),
    ("Accessories", "Bags, bottles, and small gear"),
];

fn seed_products() -> Vec<SeedProduct> {
    vec![
        SeedProduct {
            title: "Trail Runner 2",
            brand: "Summit",
            category: "Footwear",
            price: Decimal::new(12900, 2),
            mrp: Some(Decimal::new(15900, 2)),
            stock: 0,
            tags: &["running", "outdoor"],
            popularity: 90,
            variants: &[
                ("tr2-black-42", "Black", "42", 12),
                ("tr2-black-43", "Black", "43", 8),
                ("tr2-red-42", "Red", "42", 5),
            ],
        },
        SeedProduct {
            title: "Everyday Tee",
            brand: "Cascade",
            category: "Apparel",
            price: Decimal::new(2400, 2),
            mrp: None,
            stock: 0,
            tags: &["cotton", "basics"],
            popularity: 70,
            variants: &[
                ("tee-white-m", "White", "M", 30),
                ("tee-white-l", "White", "L", 25),
                ("tee-navy-m", "Navy", "M", 18),
            ],
        },
        SeedProduct {
            title: "Canvas Tote",
            brand: "Cascade",
            category: "Accessories",
            price: Decimal::new(1800, 2),
            mrp: Some(Decimal::new(2200, 2)),
            stock: 40,
            tags: &["bags"],
            popularity: 55,
            variants: &[],
        },
        SeedProduct {
            title: "Insulated Bottle 750ml",
            brand: "Summit",
            category: "Accessories",
            price: Decimal::new(3200, 2),
            mrp: None,
            stock: 64,
            tags: &["hydration", "outdoor"],
            popularity: 80,
            variants: &[],
        },
    ]
}

/// Seed the catalog. No-op when products already exist.
///
/// # Errors
///
/// Returns `CommandError` if the database is unreachable or an insert fails.
pub async fn run() -> Result<(), CommandError> {
    let pool = super::connect().await?;

    let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM product")
        .fetch_one(&pool)
        .await?;
    if existing > 0 {
        tracing::info!("Catalog already has {existing} products, skipping seed");
        return Ok(());
    }

    for (name, description) in CATEGORIES {
        sqlx::query(
            "INSERT INTO category (name, description) VALUES ($1, $2) \
             ON CONFLICT (name) DO NOTHING",
        )
        .bind(name)
        .bind(description)
        .execute(&pool)
        .await?;
    }

    for product in seed_products() {
        let tags: Vec<String> = product.tags.iter().map(ToString::to_string).collect();
        let product_id: i32 = sqlx::query_scalar(
            "INSERT INTO product \
                 (title, brand, category_id, price, mrp, stock, tags, popularity) \
             SELECT $1, $2, c.id, $3, $4, $5, $6, $7 FROM category c WHERE c.name = $8 \
             RETURNING id",
        )
        .bind(product.title)
        .bind(product.brand)
        .bind(product.price)
        .bind(product.mrp)
        .bind(product.stock)
        .bind(&tags)
        .bind(product.popularity)
        .bind(product.category)
        .fetch_one(&pool)
        .await?;

        for (sku, color, size, stock) in product.variants {
            sqlx::query(
                "INSERT INTO product_variant (product_id, sku, color, size, stock) \
                 VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(product_id)
            .bind(sku)
            .bind(color)
            .bind(size)
            .bind(stock)
            .execute(&pool)
            .await?;
        }

        tracing::info!("Seeded product {}", product.title);
    }

    tracing::info!("Seed complete");
    Ok(())
}
