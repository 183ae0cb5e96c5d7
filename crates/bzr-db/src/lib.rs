use anyhow::{Context, Result};
use sqlx::{postgres::PgPoolOptions, PgPool};
use uuid::Uuid;

mod store;

pub use store::PgStore;

pub const ENV_DB_URL: &str = "BZR_DATABASE_URL";

/// Connect to Postgres using BZR_DATABASE_URL.
pub async fn connect_from_env() -> Result<PgPool> {
    connect_from_env_var(ENV_DB_URL, 10).await
}

/// Connect using the URL held in `env_var`. The URL itself never appears in
/// config files or error messages.
pub async fn connect_from_env_var(env_var: &str, max_connections: u32) -> Result<PgPool> {
    let url = std::env::var(env_var).with_context(|| format!("missing env var {env_var}"))?;
    connect(&url, max_connections).await
}

pub async fn connect(url: &str, max_connections: u32) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(url)
        .await
        .context("failed to connect to Postgres")?;

    Ok(pool)
}

/// Run embedded SQLx migrations.
pub async fn migrate(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("db migrate failed")?;
    Ok(())
}

/// Simple status query (connectivity + schema presence).
pub async fn status(pool: &PgPool) -> Result<DbStatus> {
    let (one,): (i32,) = sqlx::query_as::<_, (i32,)>("select 1")
        .fetch_one(pool)
        .await
        .context("status connectivity query failed")?;
    let ok = one == 1;

    let (exists,): (bool,) = sqlx::query_as::<_, (bool,)>(
        r#"
        select exists (
            select 1
            from information_schema.tables
            where table_schema='public' and table_name='purchases'
        )
        "#,
    )
    .fetch_one(pool)
    .await
    .context("status table-exists query failed")?;

    let unpaid = if exists {
        let (n,): (i64,) = sqlx::query_as::<_, (i64,)>(
            "select count(*)::bigint from purchases where status = 'unpaid'",
        )
        .fetch_one(pool)
        .await
        .context("status unpaid count failed")?;
        n
    } else {
        0
    };

    Ok(DbStatus {
        ok,
        has_purchases_table: exists,
        unpaid_purchases: unpaid,
    })
}

#[derive(Debug, Clone)]
pub struct DbStatus {
    pub ok: bool,
    pub has_purchases_table: bool,
    pub unpaid_purchases: i64,
}

// ---------------------------------------------------------------------------
// Catalog seeding (operators and DB-backed tests)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct NewSeller {
    pub id: Uuid,
    pub name: String,
    pub bank_account_name: String,
    pub bank_account_holder: String,
    pub bank_account_number: String,
}

pub async fn insert_seller(pool: &PgPool, seller: &NewSeller) -> Result<()> {
    sqlx::query(
        r#"
        insert into sellers (
          id, name, bank_account_name, bank_account_holder, bank_account_number
        ) values (
          $1, $2, $3, $4, $5
        )
        "#,
    )
    .bind(seller.id)
    .bind(&seller.name)
    .bind(&seller.bank_account_name)
    .bind(&seller.bank_account_holder)
    .bind(&seller.bank_account_number)
    .execute(pool)
    .await
    .context("insert_seller failed")?;

    Ok(())
}

pub async fn insert_product(pool: &PgPool, product: &bzr_schemas::ProductRow) -> Result<()> {
    sqlx::query(
        r#"
        insert into products (
          id, seller_id, name, category, price, sku, stock, file_id
        ) values (
          $1, $2, $3, $4, $5, $6, $7, $8
        )
        "#,
    )
    .bind(product.id)
    .bind(product.seller_id)
    .bind(&product.name)
    .bind(&product.category)
    .bind(product.price)
    .bind(&product.sku)
    .bind(product.stock)
    .bind(product.file_id)
    .execute(pool)
    .await
    .context("insert_product failed")?;

    Ok(())
}

pub async fn product_stock(pool: &PgPool, product_id: Uuid) -> Result<Option<i64>> {
    let row: Option<(i64,)> = sqlx::query_as("select stock from products where id = $1")
        .bind(product_id)
        .fetch_optional(pool)
        .await
        .context("product_stock failed")?;
    Ok(row.map(|(s,)| s))
}
