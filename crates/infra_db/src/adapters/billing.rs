//! PostgreSQL billing store
//!
//! Implements every billing port over one pool. Queries are built at run
//! time with `sqlx::query_as` and mapped through the row types in
//! `crate::rows`.

use std::collections::HashMap;
use std::time::Instant;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::types::Json;
use sqlx::PgPool;
use tracing::{debug, instrument};
use uuid::Uuid;

use core_kernel::{
    AdapterHealth, ClientId, DomainPort, HealthCheckResult, HealthCheckable, InvoiceId, NotificationId,
    PortError, ReminderId, UserId,
};
use domain_billing::{
    Client, ClientStore, DueReminder, HistoryNote, Invoice, InvoiceStatus, InvoiceStore,
    Notification, NotificationSink, NotificationStore, Reminder, ReminderStatus, ReminderStore, SettingsStore,
    UserSettings,
};

use crate::error::DatabaseError;
use crate::rows::{
    ClientRow, InvoiceRow, NotificationRow, ReminderRow, CLIENT_COLUMNS, INVOICE_COLUMNS, NOTIFICATION_COLUMNS,
    REMINDER_COLUMNS,
};

const ADAPTER_ID: &str = "postgres-billing-store";

/// PostgreSQL-backed implementation of the billing ports
#[derive(Debug, Clone)]
pub struct PgBillingStore {
    pool: PgPool,
}

impl PgBillingStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn invoices_by_ids(&self, ids: &[Uuid]) -> Result<HashMap<Uuid, Invoice>, DatabaseError> {
        let rows: Vec<InvoiceRow> = sqlx::query_as(&format!(
            "SELECT {} FROM invoices WHERE id = ANY($1)",
            INVOICE_COLUMNS
        ))
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| Ok((row.id, Invoice::try_from(row)?)))
            .collect()
    }

    async fn clients_by_ids(&self, ids: &[Uuid]) -> Result<HashMap<Uuid, Client>, DatabaseError> {
        let rows: Vec<ClientRow> = sqlx::query_as(&format!(
            "SELECT {} FROM clients WHERE id = ANY($1)",
            CLIENT_COLUMNS
        ))
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|row| (row.id, Client::from(row))).collect())
    }

    async fn settings_by_users(&self, ids: &[Uuid]) -> Result<HashMap<Uuid, UserSettings>, DatabaseError> {
        let rows: Vec<(Uuid, Json<UserSettings>)> =
            sqlx::query_as("SELECT user_id, settings FROM user_settings WHERE user_id = ANY($1)")
                .bind(ids)
                .fetch_all(&self.pool)
                .await?;

        Ok(rows.into_iter().map(|(id, settings)| (id, settings.0)).collect())
    }

    /// Conditional reminder update; distinguishes a missing reminder from
    /// one that already left `pending`
    async fn finish_reminder(
        &self,
        id: ReminderId,
        status: ReminderStatus,
        sent_date: Option<DateTime<Utc>>,
        ai_message: Option<&str>,
        error_message: Option<&str>,
    ) -> Result<bool, PortError> {
        let result = sqlx::query(
            "UPDATE reminders \
             SET status = $2, \
                 sent_date = COALESCE($3, sent_date), \
                 ai_message = COALESCE($4, ai_message), \
                 error_message = COALESCE($5, error_message) \
             WHERE id = $1 AND status = 'pending'",
        )
        .bind(Uuid::from(id))
        .bind(status.as_str())
        .bind(sent_date)
        .bind(ai_message)
        .bind(error_message)
        .execute(&self.pool)
        .await
        .map_err(DatabaseError::from)?;

        if result.rows_affected() == 1 {
            return Ok(true);
        }

        let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM reminders WHERE id = $1)")
            .bind(Uuid::from(id))
            .fetch_one(&self.pool)
            .await
            .map_err(DatabaseError::from)?;

        if exists {
            Ok(false)
        } else {
            Err(DatabaseError::not_found("Reminder", id).into())
        }
    }
}

impl DomainPort for PgBillingStore {}

#[async_trait]
impl HealthCheckable for PgBillingStore {
    async fn health_check(&self) -> HealthCheckResult {
        let start = Instant::now();
        let result = sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await;
        let latency_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok(_) => HealthCheckResult::new(ADAPTER_ID, AdapterHealth::Healthy, latency_ms),
            Err(e) => HealthCheckResult::new(ADAPTER_ID, AdapterHealth::Unhealthy, latency_ms)
                .with_message(format!("Database error: {}", e)),
        }
    }
}

#[async_trait]
impl InvoiceStore for PgBillingStore {
    #[instrument(skip(self), fields(invoice_id = %id))]
    async fn get_invoice(&self, id: InvoiceId) -> Result<Invoice, PortError> {
        let row: Option<InvoiceRow> = sqlx::query_as(&format!(
            "SELECT {} FROM invoices WHERE id = $1",
            INVOICE_COLUMNS
        ))
        .bind(Uuid::from(id))
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::from)?;

        let row = row.ok_or_else(|| DatabaseError::not_found("Invoice", id))?;
        Ok(Invoice::try_from(row)?)
    }

    async fn insert_invoice(&self, invoice: &Invoice) -> Result<(), PortError> {
        sqlx::query(
            "INSERT INTO invoices (id, user_id, client_id, invoice_number, amount, currency, \
             due_date, description, status, payment_url, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)",
        )
        .bind(Uuid::from(invoice.id))
        .bind(Uuid::from(invoice.user_id))
        .bind(invoice.client_id.map(Uuid::from))
        .bind(&invoice.invoice_number)
        .bind(invoice.amount.amount())
        .bind(invoice.currency().code())
        .bind(invoice.due_date)
        .bind(&invoice.description)
        .bind(invoice.status.as_str())
        .bind(&invoice.payment_url)
        .bind(invoice.created_at)
        .bind(invoice.updated_at)
        .execute(&self.pool)
        .await
        .map_err(DatabaseError::from)?;

        debug!(invoice_id = %invoice.id, "Inserted invoice");
        Ok(())
    }

    #[instrument(skip(self, now), fields(invoice_id = %id))]
    async fn update_status_if(
        &self,
        id: InvoiceId,
        expected: InvoiceStatus,
        to: InvoiceStatus,
        now: DateTime<Utc>,
    ) -> Result<bool, PortError> {
        let result = sqlx::query(
            "UPDATE invoices SET status = $3, updated_at = $4 WHERE id = $1 AND status = $2",
        )
        .bind(Uuid::from(id))
        .bind(expected.as_str())
        .bind(to.as_str())
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(DatabaseError::from)?;

        if result.rows_affected() == 1 {
            return Ok(true);
        }
        // distinguish "status moved" from "no such invoice"
        self.get_invoice(id).await.map(|_| false)
    }

    async fn sweep_overdue(&self, today: NaiveDate, now: DateTime<Utc>) -> Result<Vec<Invoice>, PortError> {
        let rows: Vec<InvoiceRow> = sqlx::query_as(&format!(
            "UPDATE invoices SET status = 'overdue', updated_at = $2 \
             WHERE status = 'sent' AND due_date < $1 \
             RETURNING {}",
            INVOICE_COLUMNS
        ))
        .bind(today)
        .bind(now)
        .fetch_all(&self.pool)
        .await
        .map_err(DatabaseError::from)?;

        rows.into_iter()
            .map(|row| Invoice::try_from(row).map_err(PortError::from))
            .collect()
    }

    async fn set_payment_url(&self, id: InvoiceId, url: &str, now: DateTime<Utc>) -> Result<(), PortError> {
        let result = sqlx::query("UPDATE invoices SET payment_url = $2, updated_at = $3 WHERE id = $1")
            .bind(Uuid::from(id))
            .bind(url)
            .bind(now)
            .execute(&self.pool)
            .await
            .map_err(DatabaseError::from)?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::not_found("Invoice", id).into());
        }
        Ok(())
    }

    async fn invoices_for_client(&self, client_id: ClientId) -> Result<Vec<Invoice>, PortError> {
        let rows: Vec<InvoiceRow> = sqlx::query_as(&format!(
            "SELECT {} FROM invoices WHERE client_id = $1 ORDER BY created_at",
            INVOICE_COLUMNS
        ))
        .bind(Uuid::from(client_id))
        .fetch_all(&self.pool)
        .await
        .map_err(DatabaseError::from)?;

        rows.into_iter()
            .map(|row| Invoice::try_from(row).map_err(PortError::from))
            .collect()
    }

    async fn invoices_for_user(
        &self,
        user_id: UserId,
        status: Option<InvoiceStatus>,
        limit: u32,
    ) -> Result<Vec<Invoice>, PortError> {
        let rows: Vec<InvoiceRow> = sqlx::query_as(&format!(
            "SELECT {} FROM invoices \
             WHERE user_id = $1 AND ($2::text IS NULL OR status = $2) \
             ORDER BY created_at DESC LIMIT $3",
            INVOICE_COLUMNS
        ))
        .bind(Uuid::from(user_id))
        .bind(status.map(|s| s.as_str()))
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(DatabaseError::from)?;

        rows.into_iter()
            .map(|row| Invoice::try_from(row).map_err(PortError::from))
            .collect()
    }

    #[instrument(skip(self), fields(invoice_id = %id))]
    async fn delete_invoice(&self, id: InvoiceId) -> Result<bool, PortError> {
        let mut tx = self.pool.begin().await.map_err(DatabaseError::from)?;

        sqlx::query("DELETE FROM reminders WHERE invoice_id = $1")
            .bind(Uuid::from(id))
            .execute(&mut *tx)
            .await
            .map_err(DatabaseError::from)?;
        let deleted = sqlx::query("DELETE FROM invoices WHERE id = $1")
            .bind(Uuid::from(id))
            .execute(&mut *tx)
            .await
            .map_err(DatabaseError::from)?
            .rows_affected();

        tx.commit().await.map_err(DatabaseError::from)?;
        Ok(deleted > 0)
    }
}

#[async_trait]
impl ClientStore for PgBillingStore {
    async fn get_client(&self, id: ClientId) -> Result<Client, PortError> {
        let row: Option<ClientRow> = sqlx::query_as(&format!(
            "SELECT {} FROM clients WHERE id = $1",
            CLIENT_COLUMNS
        ))
        .bind(Uuid::from(id))
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::from)?;

        row.map(Client::from)
            .ok_or_else(|| DatabaseError::not_found("Client", id).into())
    }

    async fn find_client_by_email(&self, user_id: UserId, email: &str) -> Result<Option<Client>, PortError> {
        let row: Option<ClientRow> = sqlx::query_as(&format!(
            "SELECT {} FROM clients WHERE user_id = $1 AND email = $2",
            CLIENT_COLUMNS
        ))
        .bind(Uuid::from(user_id))
        .bind(domain_billing::client::normalize_email(email))
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::from)?;

        Ok(row.map(Client::from))
    }

    async fn insert_client(&self, client: &Client) -> Result<(), PortError> {
        sqlx::query(
            "INSERT INTO clients (id, user_id, name, email, phone, whatsapp, history_notes, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(Uuid::from(client.id))
        .bind(Uuid::from(client.user_id))
        .bind(&client.name)
        .bind(&client.email)
        .bind(&client.phone)
        .bind(client.whatsapp)
        .bind(Json(&client.history_notes))
        .bind(client.created_at)
        .bind(client.updated_at)
        .execute(&self.pool)
        .await
        .map_err(DatabaseError::from)?;
        Ok(())
    }

    async fn append_history_note(
        &self,
        id: ClientId,
        note: &HistoryNote,
        now: DateTime<Utc>,
    ) -> Result<(), PortError> {
        // jsonb append keeps existing notes untouched
        let result = sqlx::query(
            "UPDATE clients \
             SET history_notes = history_notes || jsonb_build_array($2::jsonb), updated_at = $3 \
             WHERE id = $1",
        )
        .bind(Uuid::from(id))
        .bind(Json(note))
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(DatabaseError::from)?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::not_found("Client", id).into());
        }
        Ok(())
    }
}

#[async_trait]
impl ReminderStore for PgBillingStore {
    async fn insert_reminders(&self, reminders: &[Reminder]) -> Result<u64, PortError> {
        let mut tx = self.pool.begin().await.map_err(DatabaseError::from)?;
        let mut inserted = 0;

        for reminder in reminders {
            let result = sqlx::query(
                "INSERT INTO reminders (id, invoice_id, type, escalation_level, scheduled_date, \
                 status, sent_date, ai_message, error_message, created_at) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
                 ON CONFLICT (invoice_id, type, escalation_level, scheduled_date) DO NOTHING",
            )
            .bind(Uuid::from(reminder.id))
            .bind(Uuid::from(reminder.invoice_id))
            .bind(reminder.channel.as_str())
            .bind(i16::from(reminder.escalation_level.number()))
            .bind(reminder.scheduled_date)
            .bind(reminder.status.as_str())
            .bind(reminder.sent_date)
            .bind(&reminder.ai_message)
            .bind(&reminder.error_message)
            .bind(reminder.created_at)
            .execute(&mut *tx)
            .await
            .map_err(DatabaseError::from)?;
            inserted += result.rows_affected();
        }

        tx.commit().await.map_err(DatabaseError::from)?;
        Ok(inserted)
    }

    async fn reminders_for_invoice(&self, invoice_id: InvoiceId) -> Result<Vec<Reminder>, PortError> {
        let rows: Vec<ReminderRow> = sqlx::query_as(&format!(
            "SELECT {} FROM reminders WHERE invoice_id = $1 ORDER BY scheduled_date, escalation_level",
            REMINDER_COLUMNS
        ))
        .bind(Uuid::from(invoice_id))
        .fetch_all(&self.pool)
        .await
        .map_err(DatabaseError::from)?;

        rows.into_iter()
            .map(|row| Reminder::try_from(row).map_err(PortError::from))
            .collect()
    }

    #[instrument(skip(self))]
    async fn fetch_due(&self, now: DateTime<Utc>, limit: u32) -> Result<Vec<DueReminder>, PortError> {
        let rows: Vec<ReminderRow> = sqlx::query_as(&format!(
            "SELECT {} FROM reminders \
             WHERE status = 'pending' AND scheduled_date <= $1 \
             ORDER BY scheduled_date, escalation_level \
             LIMIT $2",
            REMINDER_COLUMNS
        ))
        .bind(now)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(DatabaseError::from)?;

        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let reminders = rows
            .into_iter()
            .map(Reminder::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        let invoice_ids: Vec<Uuid> = reminders.iter().map(|r| Uuid::from(r.invoice_id)).collect();
        let invoices = self.invoices_by_ids(&invoice_ids).await?;

        let client_ids: Vec<Uuid> = invoices.values().filter_map(|i| i.client_id.map(Uuid::from)).collect();
        let user_ids: Vec<Uuid> = invoices.values().map(|i| Uuid::from(i.user_id)).collect();
        let clients = self.clients_by_ids(&client_ids).await?;
        let settings = self.settings_by_users(&user_ids).await?;

        debug!(count = reminders.len(), "Fetched due reminders");

        Ok(reminders
            .into_iter()
            .filter_map(|reminder| {
                let invoice = invoices.get(&Uuid::from(reminder.invoice_id))?.clone();
                let client = invoice
                    .client_id
                    .and_then(|id| clients.get(&Uuid::from(id)).cloned());
                let settings = settings
                    .get(&Uuid::from(invoice.user_id))
                    .cloned()
                    .unwrap_or_default();
                Some(DueReminder {
                    reminder,
                    invoice,
                    client,
                    settings,
                })
            })
            .collect())
    }

    async fn mark_sent(&self, id: ReminderId, sent_at: DateTime<Utc>, message: &str) -> Result<bool, PortError> {
        self.finish_reminder(id, ReminderStatus::Sent, Some(sent_at), Some(message), None)
            .await
    }

    async fn mark_failed(&self, id: ReminderId, error: &str) -> Result<bool, PortError> {
        self.finish_reminder(id, ReminderStatus::Failed, None, None, Some(error))
            .await
    }

    async fn mark_cancelled(&self, id: ReminderId) -> Result<bool, PortError> {
        self.finish_reminder(id, ReminderStatus::Cancelled, None, None, None)
            .await
    }

    async fn cancel_pending_for_invoice(&self, invoice_id: InvoiceId) -> Result<u64, PortError> {
        let result = sqlx::query(
            "UPDATE reminders SET status = 'cancelled' WHERE invoice_id = $1 AND status = 'pending'",
        )
        .bind(Uuid::from(invoice_id))
        .execute(&self.pool)
        .await
        .map_err(DatabaseError::from)?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl SettingsStore for PgBillingStore {
    async fn user_settings(&self, user_id: UserId) -> Result<UserSettings, PortError> {
        let settings: Option<Json<UserSettings>> =
            sqlx::query_scalar("SELECT settings FROM user_settings WHERE user_id = $1")
                .bind(Uuid::from(user_id))
                .fetch_optional(&self.pool)
                .await
                .map_err(DatabaseError::from)?;

        Ok(settings.map(|s| s.0).unwrap_or_default())
    }
}

#[async_trait]
impl NotificationSink for PgBillingStore {
    async fn notify(&self, notification: &Notification) -> Result<(), PortError> {
        sqlx::query(
            "INSERT INTO notifications (id, user_id, title, message, type, read, link, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(Uuid::from(notification.id))
        .bind(Uuid::from(notification.user_id))
        .bind(&notification.title)
        .bind(&notification.message)
        .bind(notification.severity.as_str())
        .bind(notification.read)
        .bind(&notification.link)
        .bind(notification.created_at)
        .execute(&self.pool)
        .await
        .map_err(DatabaseError::from)?;
        Ok(())
    }
}

#[async_trait]
impl NotificationStore for PgBillingStore {
    async fn recent_notifications(&self, user_id: UserId, limit: u32) -> Result<Vec<Notification>, PortError> {
        let rows: Vec<NotificationRow> = sqlx::query_as(&format!(
            "SELECT {} FROM notifications WHERE user_id = $1 ORDER BY created_at DESC LIMIT $2",
            NOTIFICATION_COLUMNS
        ))
        .bind(Uuid::from(user_id))
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(DatabaseError::from)?;

        rows.into_iter()
            .map(|row| Notification::try_from(row).map_err(PortError::from))
            .collect()
    }

    async fn mark_notification_read(&self, user_id: UserId, id: NotificationId) -> Result<bool, PortError> {
        let result = sqlx::query("UPDATE notifications SET read = TRUE WHERE id = $1 AND user_id = $2")
            .bind(Uuid::from(id))
            .bind(Uuid::from(user_id))
            .execute(&self.pool)
            .await
            .map_err(DatabaseError::from)?;
        Ok(result.rows_affected() > 0)
    }

    async fn mark_all_notifications_read(&self, user_id: UserId) -> Result<u64, PortError> {
        let result = sqlx::query("UPDATE notifications SET read = TRUE WHERE user_id = $1 AND NOT read")
            .bind(Uuid::from(user_id))
            .execute(&self.pool)
            .await
            .map_err(DatabaseError::from)?;
        Ok(result.rows_affected())
    }
}
