//! Postgres implementation of the purchase storage traits.

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use bzr_purchase::{PurchaseStore, StockDecrement, StoreTx};
use bzr_schemas::{
    BankDetails, ContactType, PaymentObligation, ProductRow, Purchase, PurchaseStatus,
    PurchasedItemSnapshot,
};
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::types::Json;
use sqlx::{Acquire, PgPool, Postgres, Row, Transaction};
use uuid::Uuid;

const PURCHASE_COLUMNS: &str = r#"
  id,
  purchased_items,
  payment_obligations,
  total_price,
  status,
  sender_name,
  sender_contact_type,
  sender_contact_detail,
  created_at,
  updated_at
"#;

#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl PurchaseStore for PgStore {
    async fn begin(&self) -> Result<Box<dyn StoreTx>> {
        let tx = self.pool.begin().await.context("begin transaction failed")?;
        Ok(Box::new(PgTx { tx }))
    }

    async fn fetch_purchase(&self, id: Uuid) -> Result<Option<Purchase>> {
        let row = sqlx::query(&format!(
            "select {PURCHASE_COLUMNS} from purchases where id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("fetch_purchase failed")?;

        row.as_ref().map(purchase_from_row).transpose()
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("select 1")
            .execute(&self.pool)
            .await
            .context("ping failed")?;
        Ok(())
    }
}

/// Rolls back on drop unless committed.
struct PgTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl StoreTx for PgTx {
    async fn product_by_id(&mut self, id: Uuid) -> Result<Option<ProductRow>> {
        let row = sqlx::query(
            r#"
            select id, name, category, price, sku, stock, seller_id, file_id
            from products
            where id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await
        .context("product_by_id failed")?;

        row.map(|row| -> Result<ProductRow> {
            Ok(ProductRow {
                id: row.try_get("id")?,
                name: row.try_get("name")?,
                category: row.try_get("category")?,
                price: row.try_get("price")?,
                sku: row.try_get("sku")?,
                stock: row.try_get("stock")?,
                seller_id: row.try_get("seller_id")?,
                file_id: row.try_get("file_id")?,
            })
        })
        .transpose()
    }

    async fn seller_bank_details(&mut self, seller_id: Uuid) -> Result<Option<BankDetails>> {
        // Savepoint: a failed lookup must not abort the enclosing transaction.
        let mut sp = Acquire::begin(&mut *self.tx)
            .await
            .context("seller_bank_details savepoint failed")?;

        let row = sqlx::query(
            r#"
            select bank_account_name, bank_account_holder, bank_account_number
            from sellers
            where id = $1
            "#,
        )
        .bind(seller_id)
        .fetch_optional(&mut *sp)
        .await
        .context("seller_bank_details failed")?;

        let details = row
            .map(|row| -> Result<BankDetails> {
                Ok(BankDetails {
                    bank_account_name: row.try_get("bank_account_name")?,
                    bank_account_holder: row.try_get("bank_account_holder")?,
                    bank_account_number: row.try_get("bank_account_number")?,
                })
            })
            .transpose()?;

        sp.commit().await.context("seller_bank_details release failed")?;
        Ok(details)
    }

    async fn insert_purchase(&mut self, p: &Purchase) -> Result<()> {
        sqlx::query(
            r#"
            insert into purchases (
              id, purchased_items, payment_obligations, total_price, status,
              sender_name, sender_contact_type, sender_contact_detail,
              created_at, updated_at
            ) values (
              $1, $2, $3, $4, $5, $6, $7, $8, $9, $10
            )
            "#,
        )
        .bind(p.id)
        .bind(Json(&p.purchased_items))
        .bind(Json(&p.payment_obligations))
        .bind(p.total_price)
        .bind(p.status.as_str())
        .bind(&p.sender_name)
        .bind(p.sender_contact_type.as_str())
        .bind(&p.sender_contact_detail)
        .bind(p.created_at)
        .bind(p.updated_at)
        .execute(&mut *self.tx)
        .await
        .context("insert_purchase failed")?;

        Ok(())
    }

    async fn purchase_for_update(&mut self, id: Uuid) -> Result<Option<Purchase>> {
        let row = sqlx::query(&format!(
            "select {PURCHASE_COLUMNS} from purchases where id = $1 for update"
        ))
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await
        .context("purchase_for_update failed")?;

        row.as_ref().map(purchase_from_row).transpose()
    }

    async fn decrement_stock(&mut self, product_id: Uuid, qty: i64) -> Result<StockDecrement> {
        let res = sqlx::query(
            r#"
            update products
            set stock = stock - $2,
                updated_at = now()
            where id = $1
              and stock >= $2
            "#,
        )
        .bind(product_id)
        .bind(qty)
        .execute(&mut *self.tx)
        .await
        .context("decrement_stock update failed")?;

        if res.rows_affected() == 1 {
            return Ok(StockDecrement::Applied);
        }

        let current: Option<(i64,)> = sqlx::query_as("select stock from products where id = $1")
            .bind(product_id)
            .fetch_optional(&mut *self.tx)
            .await
            .context("decrement_stock probe failed")?;

        Ok(match current {
            Some((available,)) => StockDecrement::Insufficient { available },
            None => StockDecrement::Missing,
        })
    }

    async fn mark_paid(&mut self, id: Uuid, at: DateTime<Utc>) -> Result<()> {
        let res = sqlx::query(
            r#"
            update purchases
            set status = 'paid',
                updated_at = $2
            where id = $1
              and status = 'unpaid'
            "#,
        )
        .bind(id)
        .bind(at)
        .execute(&mut *self.tx)
        .await
        .context("mark_paid failed")?;

        if res.rows_affected() != 1 {
            bail!("mark_paid: purchase {id} was not unpaid");
        }
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let PgTx { tx } = *self;
        tx.commit().await.context("commit failed")?;
        Ok(())
    }
}

fn purchase_from_row(row: &PgRow) -> Result<Purchase> {
    let status: String = row.try_get("status")?;
    let contact_type: String = row.try_get("sender_contact_type")?;
    let items: Json<Vec<PurchasedItemSnapshot>> = row.try_get("purchased_items")?;
    let obligations: Json<Vec<PaymentObligation>> = row.try_get("payment_obligations")?;

    Ok(Purchase {
        id: row.try_get("id")?,
        purchased_items: items.0,
        payment_obligations: obligations.0,
        total_price: row.try_get("total_price")?,
        status: PurchaseStatus::parse(&status)
            .ok_or_else(|| anyhow!("invalid purchase status: {status}"))?,
        sender_name: row.try_get("sender_name")?,
        sender_contact_type: ContactType::parse(&contact_type)
            .ok_or_else(|| anyhow!("invalid sender contact type: {contact_type}"))?,
        sender_contact_detail: row.try_get("sender_contact_detail")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}
