//! Postgres store implementation over sqlx.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::{
    BillingPeriod, ClientRecord, Order, OrderStatus, Payment, PaymentProvider, PaymentStatus,
    PlanRecord,
};

use super::{DirectoryStore, OrderStore, PaymentStore, StoreError, StoreResult};

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        PgStore { pool }
    }
}

type PaymentRow = (
    Uuid,
    Uuid,
    i64,
    String,
    String,
    Option<String>,
    Option<String>,
    Option<String>,
    Option<String>,
    DateTime<Utc>,
    Option<DateTime<Utc>>,
);

fn payment_from_row(row: PaymentRow) -> StoreResult<Payment> {
    let status = PaymentStatus::parse(&row.3).ok_or_else(|| StoreError::InvalidColumn {
        column: "payments.status",
        value: row.3.clone(),
    })?;
    let provider = PaymentProvider::parse(&row.4).ok_or_else(|| StoreError::InvalidColumn {
        column: "payments.provider",
        value: row.4.clone(),
    })?;

    Ok(Payment::restore(
        row.0, row.1, row.2, status, provider, row.5, row.6, row.7, row.8, row.9, row.10,
    ))
}

type OrderRow = (Uuid, Uuid, Uuid, DateTime<Utc>, DateTime<Utc>, String);

const SELECT_PAYMENT: &str = "SELECT id, order_id, amount_minor, status, provider, transaction_id, \
     checkout_url, qr_code, failure_reason, created_at, approved_at FROM payments";

impl PgStore {
    fn order_from_row(row: OrderRow, payments: Vec<Payment>) -> StoreResult<Order> {
        let status = OrderStatus::parse(&row.5).ok_or_else(|| StoreError::InvalidColumn {
            column: "orders.status",
            value: row.5.clone(),
        })?;

        Ok(Order::restore(
            row.0, row.1, row.2, row.3, row.4, status, payments,
        ))
    }

    async fn payments_for_order(&self, order_id: Uuid) -> StoreResult<Vec<Payment>> {
        let rows = sqlx::query_as::<_, PaymentRow>(&format!(
            "{SELECT_PAYMENT} WHERE order_id = $1 ORDER BY created_at"
        ))
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(payment_from_row).collect()
    }
}

#[async_trait]
impl OrderStore for PgStore {
    async fn add(&self, order: &Order) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO orders (id, client_id, plan_id, start_date, end_date, status)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(order.id())
        .bind(order.client_id())
        .bind(order.plan_id())
        .bind(order.start_date())
        .bind(order.end_date())
        .bind(order.status().as_str())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn update(&self, order: &Order) -> StoreResult<()> {
        sqlx::query(
            r#"
            UPDATE orders
            SET status = $1, updated_at = NOW()
            WHERE id = $2
            "#,
        )
        .bind(order.status().as_str())
        .bind(order.id())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_by_id(&self, id: Uuid) -> StoreResult<Option<Order>> {
        let row = sqlx::query_as::<_, OrderRow>(
            "SELECT id, client_id, plan_id, start_date, end_date, status FROM orders WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let payments = self.payments_for_order(row.0).await?;
        Ok(Some(Self::order_from_row(row, payments)?))
    }

    async fn list_by_client(&self, client_id: Uuid) -> StoreResult<Vec<Order>> {
        let rows = sqlx::query_as::<_, OrderRow>(
            "SELECT id, client_id, plan_id, start_date, end_date, status FROM orders \
             WHERE client_id = $1 ORDER BY start_date DESC",
        )
        .bind(client_id)
        .fetch_all(&self.pool)
        .await?;

        let mut orders = Vec::with_capacity(rows.len());
        for row in rows {
            let payments = self.payments_for_order(row.0).await?;
            orders.push(Self::order_from_row(row, payments)?);
        }
        Ok(orders)
    }
}

#[async_trait]
impl PaymentStore for PgStore {
    async fn add(&self, payment: &Payment) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO payments
                (id, order_id, amount_minor, status, provider, transaction_id,
                 checkout_url, qr_code, failure_reason, created_at, approved_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(payment.id())
        .bind(payment.order_id())
        .bind(payment.amount_minor())
        .bind(payment.status().as_str())
        .bind(payment.provider().as_str())
        .bind(payment.transaction_id())
        .bind(payment.checkout_url())
        .bind(payment.qr_code())
        .bind(payment.failure_reason())
        .bind(payment.created_at())
        .bind(payment.approved_at())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn update(&self, payment: &Payment) -> StoreResult<()> {
        sqlx::query(
            r#"
            UPDATE payments
            SET status = $1, transaction_id = $2, checkout_url = $3, qr_code = $4,
                failure_reason = $5, approved_at = $6, updated_at = NOW()
            WHERE id = $7
            "#,
        )
        .bind(payment.status().as_str())
        .bind(payment.transaction_id())
        .bind(payment.checkout_url())
        .bind(payment.qr_code())
        .bind(payment.failure_reason())
        .bind(payment.approved_at())
        .bind(payment.id())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn update_if_pending(&self, payment: &Payment) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE payments
            SET status = $1, transaction_id = $2, checkout_url = $3, qr_code = $4,
                failure_reason = $5, approved_at = $6, updated_at = NOW()
            WHERE id = $7 AND status = 'pending'
            "#,
        )
        .bind(payment.status().as_str())
        .bind(payment.transaction_id())
        .bind(payment.checkout_url())
        .bind(payment.qr_code())
        .bind(payment.failure_reason())
        .bind(payment.approved_at())
        .bind(payment.id())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn get_by_id(&self, id: Uuid) -> StoreResult<Option<Payment>> {
        let row = sqlx::query_as::<_, PaymentRow>(&format!("{SELECT_PAYMENT} WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(payment_from_row).transpose()
    }

    async fn list_by_client(&self, client_id: Uuid) -> StoreResult<Vec<Payment>> {
        let rows = sqlx::query_as::<_, PaymentRow>(
            "SELECT p.id, p.order_id, p.amount_minor, p.status, p.provider, p.transaction_id, \
             p.checkout_url, p.qr_code, p.failure_reason, p.created_at, p.approved_at \
             FROM payments p JOIN orders o ON o.id = p.order_id \
             WHERE o.client_id = $1 ORDER BY p.created_at DESC",
        )
        .bind(client_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(payment_from_row).collect()
    }
}

#[async_trait]
impl DirectoryStore for PgStore {
    async fn get_client(&self, id: Uuid) -> StoreResult<Option<ClientRecord>> {
        let row = sqlx::query_as::<_, (Uuid, String, String)>(
            "SELECT id, name, email FROM clients WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(id, name, email)| ClientRecord { id, name, email }))
    }

    async fn get_plan(&self, id: Uuid) -> StoreResult<Option<PlanRecord>> {
        let row = sqlx::query_as::<_, (Uuid, String, String, i64, String, bool)>(
            "SELECT id, name, description, price_minor, billing_period, active \
             FROM plans WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let Some((id, name, description, price_minor, period, active)) = row else {
            return Ok(None);
        };

        let billing_period =
            BillingPeriod::parse(&period).ok_or_else(|| StoreError::InvalidColumn {
                column: "plans.billing_period",
                value: period,
            })?;

        Ok(Some(PlanRecord {
            id,
            name,
            description,
            price_minor,
            billing_period,
            active,
        }))
    }
}
