//! Catalog seeding for local environments: sellers and products.

use anyhow::{bail, Result};
use bzr_db::NewSeller;
use bzr_schemas::ProductRow;
use sqlx::PgPool;
use uuid::Uuid;

pub async fn add_seller(
    pool: &PgPool,
    name: String,
    bank_account_name: String,
    bank_account_holder: String,
    bank_account_number: String,
) -> Result<Uuid> {
    let seller = NewSeller {
        id: Uuid::new_v4(),
        name,
        bank_account_name,
        bank_account_holder,
        bank_account_number,
    };
    bzr_db::insert_seller(pool, &seller).await?;
    Ok(seller.id)
}

pub struct NewProductArgs {
    pub seller_id: Uuid,
    pub name: String,
    pub category: String,
    pub price: i64,
    pub sku: String,
    pub stock: i64,
    pub file_id: Option<Uuid>,
}

pub async fn add_product(pool: &PgPool, args: NewProductArgs) -> Result<Uuid> {
    if args.price < 0 {
        bail!("price must be >= 0, got {}", args.price);
    }
    if args.stock < 0 {
        bail!("stock must be >= 0, got {}", args.stock);
    }

    let row = ProductRow {
        id: Uuid::new_v4(),
        name: args.name,
        category: args.category,
        price: args.price,
        sku: args.sku,
        stock: args.stock,
        seller_id: args.seller_id,
        file_id: args.file_id,
    };
    bzr_db::insert_product(pool, &row).await?;
    Ok(row.id)
}
