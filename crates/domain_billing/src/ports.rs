//! Billing Domain Ports
//!
//! Store interfaces the billing services depend on. The PostgreSQL adapter in
//! `infra_db` implements all of them on one struct; the in-memory [`mock`]
//! store does the same for tests.
//!
//! Status and reminder updates are conditional: they name the state they
//! expect to find and report whether a row actually changed. Callers use the
//! boolean to stay idempotent when two runs race on the same record.
//!
//! ```rust,ignore
//! let store = Arc::new(PgBillingStore::new(pool));
//! let manager = LifecycleManager::new(store.clone(), store.clone(), store.clone(), store.clone(), clock);
//! ```

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use core_kernel::{
    ClientId, DomainPort, HealthCheckable, InvoiceId, NotificationId, PortError, ReminderId, UserId,
};

use crate::client::{Client, HistoryNote};
use crate::invoice::{Invoice, InvoiceStatus};
use crate::notification::Notification;
use crate::reminder::Reminder;
use crate::settings::UserSettings;

/// A due reminder joined with everything needed to deliver it
#[derive(Debug, Clone)]
pub struct DueReminder {
    pub reminder: Reminder,
    pub invoice: Invoice,
    pub client: Option<Client>,
    /// Owner settings, passed through untouched
    pub settings: UserSettings,
}

/// Invoice persistence
#[async_trait]
pub trait InvoiceStore: DomainPort + HealthCheckable {
    /// Retrieves an invoice, or `PortError::NotFound`
    async fn get_invoice(&self, id: InvoiceId) -> Result<Invoice, PortError>;

    async fn insert_invoice(&self, invoice: &Invoice) -> Result<(), PortError>;

    /// Sets `to` only if the stored status is still `expected`
    ///
    /// # Returns
    ///
    /// `true` when the row changed
    async fn update_status_if(
        &self,
        id: InvoiceId,
        expected: InvoiceStatus,
        to: InvoiceStatus,
        now: DateTime<Utc>,
    ) -> Result<bool, PortError>;

    /// Moves every `sent` invoice with `due_date < today` to `overdue` in one
    /// statement and returns the rows it changed
    async fn sweep_overdue(
        &self,
        today: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<Vec<Invoice>, PortError>;

    async fn set_payment_url(
        &self,
        id: InvoiceId,
        url: &str,
        now: DateTime<Utc>,
    ) -> Result<(), PortError>;

    async fn invoices_for_client(&self, client_id: ClientId) -> Result<Vec<Invoice>, PortError>;

    /// A user's invoices, newest first, at most `limit`
    async fn invoices_for_user(
        &self,
        user_id: UserId,
        status: Option<InvoiceStatus>,
        limit: u32,
    ) -> Result<Vec<Invoice>, PortError>;

    /// Deletes an invoice and all of its reminders
    ///
    /// # Returns
    ///
    /// `false` when there was no such invoice
    async fn delete_invoice(&self, id: InvoiceId) -> Result<bool, PortError>;
}

/// Client persistence
#[async_trait]
pub trait ClientStore: DomainPort {
    async fn get_client(&self, id: ClientId) -> Result<Client, PortError>;

    /// Looks up a client by normalised email within one user's clients
    async fn find_client_by_email(
        &self,
        user_id: UserId,
        email: &str,
    ) -> Result<Option<Client>, PortError>;

    async fn insert_client(&self, client: &Client) -> Result<(), PortError>;

    /// Appends to the history in order; existing notes are never rewritten
    async fn append_history_note(
        &self,
        id: ClientId,
        note: &HistoryNote,
        now: DateTime<Utc>,
    ) -> Result<(), PortError>;
}

/// Reminder persistence
#[async_trait]
pub trait ReminderStore: DomainPort {
    /// Inserts reminders, skipping any that duplicate an existing
    /// (invoice, channel, level, scheduled_date)
    ///
    /// # Returns
    ///
    /// The number of rows inserted
    async fn insert_reminders(&self, reminders: &[Reminder]) -> Result<u64, PortError>;

    async fn reminders_for_invoice(&self, invoice_id: InvoiceId) -> Result<Vec<Reminder>, PortError>;

    /// Pending reminders with `scheduled_date <= now`, oldest first, at most
    /// `limit`
    async fn fetch_due(&self, now: DateTime<Utc>, limit: u32) -> Result<Vec<DueReminder>, PortError>;

    /// Pending → sent. Returns `false` if the reminder was no longer pending.
    async fn mark_sent(
        &self,
        id: ReminderId,
        sent_at: DateTime<Utc>,
        message: &str,
    ) -> Result<bool, PortError>;

    /// Pending → failed
    async fn mark_failed(&self, id: ReminderId, error: &str) -> Result<bool, PortError>;

    /// Pending → cancelled
    async fn mark_cancelled(&self, id: ReminderId) -> Result<bool, PortError>;

    /// Cancels every pending reminder of an invoice
    async fn cancel_pending_for_invoice(&self, invoice_id: InvoiceId) -> Result<u64, PortError>;
}

/// Per-user settings lookup
#[async_trait]
pub trait SettingsStore: DomainPort {
    /// Settings for a user; defaults when none are stored
    async fn user_settings(&self, user_id: UserId) -> Result<UserSettings, PortError>;
}

/// Fire-and-forget notification delivery
#[async_trait]
pub trait NotificationSink: DomainPort {
    async fn notify(&self, notification: &Notification) -> Result<(), PortError>;
}

/// Reading back a user's notifications
#[async_trait]
pub trait NotificationStore: NotificationSink {
    /// Newest first, at most `limit`
    async fn recent_notifications(&self, user_id: UserId, limit: u32) -> Result<Vec<Notification>, PortError>;

    /// Marks one of the user's notifications read. `false` when the user has
    /// no notification with that id.
    async fn mark_notification_read(&self, user_id: UserId, id: NotificationId) -> Result<bool, PortError>;

    /// Marks every unread notification of the user read and returns how many
    /// changed
    async fn mark_all_notifications_read(&self, user_id: UserId) -> Result<u64, PortError>;
}

/// Mock adapter for testing
///
/// Holds everything in memory and is shared by cloning. Useful for unit tests
/// without a database.
#[cfg(any(test, feature = "mock"))]
pub mod mock {
    use super::*;
    use core_kernel::{AdapterHealth, HealthCheckResult};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use tokio::sync::RwLock;

    use crate::reminder::ReminderStatus;

    /// In-memory implementation of every billing store port
    #[derive(Debug, Clone, Default)]
    pub struct InMemoryBillingStore {
        invoices: Arc<RwLock<HashMap<InvoiceId, Invoice>>>,
        clients: Arc<RwLock<HashMap<ClientId, Client>>>,
        reminders: Arc<RwLock<HashMap<ReminderId, Reminder>>>,
        settings: Arc<RwLock<HashMap<UserId, UserSettings>>>,
        notifications: Arc<RwLock<Vec<Notification>>>,
        unavailable: Arc<AtomicBool>,
        mark_sent_failing: Arc<AtomicBool>,
    }

    impl InMemoryBillingStore {
        /// Creates an empty store
        pub fn new() -> Self {
            Self::default()
        }

        /// Stores settings for a user
        pub async fn put_settings(&self, user_id: UserId, settings: UserSettings) {
            self.settings.write().await.insert(user_id, settings);
        }

        /// Every notification emitted so far
        pub async fn notifications(&self) -> Vec<Notification> {
            self.notifications.read().await.clone()
        }

        /// Snapshot of all reminders, ordered by schedule
        pub async fn all_reminders(&self) -> Vec<Reminder> {
            let mut all: Vec<Reminder> = self.reminders.read().await.values().cloned().collect();
            all.sort_by_key(|r| (r.scheduled_date, r.escalation_level));
            all
        }

        /// Makes sweeps, fetches and health checks fail as if the database
        /// were down
        pub fn set_unavailable(&self, unavailable: bool) {
            self.unavailable.store(unavailable, Ordering::SeqCst);
        }

        /// Makes `mark_sent` fail with a connection error
        pub fn set_mark_sent_failing(&self, failing: bool) {
            self.mark_sent_failing.store(failing, Ordering::SeqCst);
        }

        fn check_available(&self) -> Result<(), PortError> {
            if self.unavailable.load(Ordering::SeqCst) {
                Err(PortError::connection("in-memory store marked unavailable"))
            } else {
                Ok(())
            }
        }

        async fn set_reminder_status(
            &self,
            id: ReminderId,
            update: impl FnOnce(&mut Reminder),
        ) -> Result<bool, PortError> {
            let mut reminders = self.reminders.write().await;
            let reminder = reminders
                .get_mut(&id)
                .ok_or_else(|| PortError::not_found("Reminder", id))?;
            if reminder.status != ReminderStatus::Pending {
                return Ok(false);
            }
            update(reminder);
            Ok(true)
        }
    }

    impl DomainPort for InMemoryBillingStore {}

    #[async_trait]
    impl HealthCheckable for InMemoryBillingStore {
        async fn health_check(&self) -> HealthCheckResult {
            let status = if self.unavailable.load(Ordering::SeqCst) {
                AdapterHealth::Unhealthy
            } else {
                AdapterHealth::Healthy
            };
            HealthCheckResult::new("in-memory-billing-store", status, 0)
        }
    }

    #[async_trait]
    impl InvoiceStore for InMemoryBillingStore {
        async fn get_invoice(&self, id: InvoiceId) -> Result<Invoice, PortError> {
            self.invoices
                .read()
                .await
                .get(&id)
                .cloned()
                .ok_or_else(|| PortError::not_found("Invoice", id))
        }

        async fn insert_invoice(&self, invoice: &Invoice) -> Result<(), PortError> {
            let mut invoices = self.invoices.write().await;
            if invoices.contains_key(&invoice.id) {
                return Err(PortError::conflict(format!("invoice {} already exists", invoice.id)));
            }
            invoices.insert(invoice.id, invoice.clone());
            Ok(())
        }

        async fn update_status_if(
            &self,
            id: InvoiceId,
            expected: InvoiceStatus,
            to: InvoiceStatus,
            now: DateTime<Utc>,
        ) -> Result<bool, PortError> {
            let mut invoices = self.invoices.write().await;
            let invoice = invoices
                .get_mut(&id)
                .ok_or_else(|| PortError::not_found("Invoice", id))?;
            if invoice.status != expected {
                return Ok(false);
            }
            invoice.status = to;
            invoice.updated_at = now;
            Ok(true)
        }

        async fn sweep_overdue(
            &self,
            today: NaiveDate,
            now: DateTime<Utc>,
        ) -> Result<Vec<Invoice>, PortError> {
            self.check_available()?;
            let mut invoices = self.invoices.write().await;
            let mut swept = Vec::new();
            for invoice in invoices.values_mut() {
                if invoice.status == InvoiceStatus::Sent && invoice.due_date < today {
                    invoice.status = InvoiceStatus::Overdue;
                    invoice.updated_at = now;
                    swept.push(invoice.clone());
                }
            }
            Ok(swept)
        }

        async fn set_payment_url(
            &self,
            id: InvoiceId,
            url: &str,
            now: DateTime<Utc>,
        ) -> Result<(), PortError> {
            let mut invoices = self.invoices.write().await;
            let invoice = invoices
                .get_mut(&id)
                .ok_or_else(|| PortError::not_found("Invoice", id))?;
            invoice.payment_url = Some(url.to_string());
            invoice.updated_at = now;
            Ok(())
        }

        async fn invoices_for_client(&self, client_id: ClientId) -> Result<Vec<Invoice>, PortError> {
            let mut found: Vec<Invoice> = self
                .invoices
                .read()
                .await
                .values()
                .filter(|i| i.client_id == Some(client_id))
                .cloned()
                .collect();
            found.sort_by_key(|i| i.created_at);
            Ok(found)
        }

        async fn invoices_for_user(
            &self,
            user_id: UserId,
            status: Option<InvoiceStatus>,
            limit: u32,
        ) -> Result<Vec<Invoice>, PortError> {
            let mut found: Vec<Invoice> = self
                .invoices
                .read()
                .await
                .values()
                .filter(|i| i.user_id == user_id && status.map_or(true, |s| i.status == s))
                .cloned()
                .collect();
            found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            found.truncate(limit as usize);
            Ok(found)
        }

        async fn delete_invoice(&self, id: InvoiceId) -> Result<bool, PortError> {
            if self.invoices.write().await.remove(&id).is_none() {
                return Ok(false);
            }
            self.reminders.write().await.retain(|_, r| r.invoice_id != id);
            Ok(true)
        }
    }

    #[async_trait]
    impl ClientStore for InMemoryBillingStore {
        async fn get_client(&self, id: ClientId) -> Result<Client, PortError> {
            self.clients
                .read()
                .await
                .get(&id)
                .cloned()
                .ok_or_else(|| PortError::not_found("Client", id))
        }

        async fn find_client_by_email(
            &self,
            user_id: UserId,
            email: &str,
        ) -> Result<Option<Client>, PortError> {
            let email = crate::client::normalize_email(email);
            Ok(self
                .clients
                .read()
                .await
                .values()
                .find(|c| c.user_id == user_id && c.email == email)
                .cloned())
        }

        async fn insert_client(&self, client: &Client) -> Result<(), PortError> {
            let mut clients = self.clients.write().await;
            let duplicate = clients
                .values()
                .any(|c| c.user_id == client.user_id && c.email == client.email);
            if duplicate {
                return Err(PortError::conflict(format!("client {} already exists", client.email)));
            }
            clients.insert(client.id, client.clone());
            Ok(())
        }

        async fn append_history_note(
            &self,
            id: ClientId,
            note: &HistoryNote,
            now: DateTime<Utc>,
        ) -> Result<(), PortError> {
            let mut clients = self.clients.write().await;
            let client = clients
                .get_mut(&id)
                .ok_or_else(|| PortError::not_found("Client", id))?;
            client.history_notes.push(note.clone());
            client.updated_at = now;
            Ok(())
        }
    }

    #[async_trait]
    impl ReminderStore for InMemoryBillingStore {
        async fn insert_reminders(&self, reminders: &[Reminder]) -> Result<u64, PortError> {
            let mut stored = self.reminders.write().await;
            let mut inserted = 0;
            for reminder in reminders {
                let duplicate = stored.values().any(|r| {
                    r.invoice_id == reminder.invoice_id
                        && r.channel == reminder.channel
                        && r.escalation_level == reminder.escalation_level
                        && r.scheduled_date == reminder.scheduled_date
                });
                if !duplicate {
                    stored.insert(reminder.id, reminder.clone());
                    inserted += 1;
                }
            }
            Ok(inserted)
        }

        async fn reminders_for_invoice(&self, invoice_id: InvoiceId) -> Result<Vec<Reminder>, PortError> {
            let mut found: Vec<Reminder> = self
                .reminders
                .read()
                .await
                .values()
                .filter(|r| r.invoice_id == invoice_id)
                .cloned()
                .collect();
            found.sort_by_key(|r| (r.scheduled_date, r.escalation_level));
            Ok(found)
        }

        async fn fetch_due(&self, now: DateTime<Utc>, limit: u32) -> Result<Vec<DueReminder>, PortError> {
            self.check_available()?;
            let mut due: Vec<Reminder> = self
                .reminders
                .read()
                .await
                .values()
                .filter(|r| r.is_due(now))
                .cloned()
                .collect();
            due.sort_by_key(|r| (r.scheduled_date, r.escalation_level));
            due.truncate(limit as usize);

            let invoices = self.invoices.read().await;
            let clients = self.clients.read().await;
            let settings = self.settings.read().await;

            Ok(due
                .into_iter()
                .filter_map(|reminder| {
                    let invoice = invoices.get(&reminder.invoice_id)?.clone();
                    let client = invoice.client_id.and_then(|id| clients.get(&id).cloned());
                    let settings = settings.get(&invoice.user_id).cloned().unwrap_or_default();
                    Some(DueReminder {
                        reminder,
                        invoice,
                        client,
                        settings,
                    })
                })
                .collect())
        }

        async fn mark_sent(
            &self,
            id: ReminderId,
            sent_at: DateTime<Utc>,
            message: &str,
        ) -> Result<bool, PortError> {
            if self.mark_sent_failing.load(Ordering::SeqCst) {
                return Err(PortError::connection("in-memory store rejected mark_sent"));
            }
            self.set_reminder_status(id, |r| {
                r.status = ReminderStatus::Sent;
                r.sent_date = Some(sent_at);
                r.ai_message = Some(message.to_string());
            })
            .await
        }

        async fn mark_failed(&self, id: ReminderId, error: &str) -> Result<bool, PortError> {
            self.set_reminder_status(id, |r| {
                r.status = ReminderStatus::Failed;
                r.error_message = Some(error.to_string());
            })
            .await
        }

        async fn mark_cancelled(&self, id: ReminderId) -> Result<bool, PortError> {
            self.set_reminder_status(id, |r| r.status = ReminderStatus::Cancelled)
                .await
        }

        async fn cancel_pending_for_invoice(&self, invoice_id: InvoiceId) -> Result<u64, PortError> {
            let mut cancelled = 0;
            for reminder in self.reminders.write().await.values_mut() {
                if reminder.invoice_id == invoice_id && reminder.status == ReminderStatus::Pending {
                    reminder.status = ReminderStatus::Cancelled;
                    cancelled += 1;
                }
            }
            Ok(cancelled)
        }
    }

    #[async_trait]
    impl SettingsStore for InMemoryBillingStore {
        async fn user_settings(&self, user_id: UserId) -> Result<UserSettings, PortError> {
            Ok(self
                .settings
                .read()
                .await
                .get(&user_id)
                .cloned()
                .unwrap_or_default())
        }
    }

    #[async_trait]
    impl NotificationSink for InMemoryBillingStore {
        async fn notify(&self, notification: &Notification) -> Result<(), PortError> {
            self.notifications.write().await.push(notification.clone());
            Ok(())
        }
    }

    #[async_trait]
    impl NotificationStore for InMemoryBillingStore {
        async fn recent_notifications(&self, user_id: UserId, limit: u32) -> Result<Vec<Notification>, PortError> {
            let mut found: Vec<Notification> = self
                .notifications
                .read()
                .await
                .iter()
                .filter(|n| n.user_id == user_id)
                .cloned()
                .collect();
            found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            found.truncate(limit as usize);
            Ok(found)
        }

        async fn mark_notification_read(&self, user_id: UserId, id: NotificationId) -> Result<bool, PortError> {
            let mut notifications = self.notifications.write().await;
            match notifications.iter_mut().find(|n| n.id == id && n.user_id == user_id) {
                Some(notification) => {
                    notification.read = true;
                    Ok(true)
                }
                None => Ok(false),
            }
        }

        async fn mark_all_notifications_read(&self, user_id: UserId) -> Result<u64, PortError> {
            let mut changed = 0;
            for notification in self.notifications.write().await.iter_mut() {
                if notification.user_id == user_id && !notification.read {
                    notification.read = true;
                    changed += 1;
                }
            }
            Ok(changed)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mock::InMemoryBillingStore;
    use super::*;
    use crate::reminder::{Channel, EscalationLevel, ReminderStatus};
    use core_kernel::{Currency, Money};
    use rust_decimal_macros::dec;

    fn invoice(due: NaiveDate, status: InvoiceStatus) -> Invoice {
        let mut invoice = Invoice::new(
            UserId::new(),
            "INV-100",
            Money::new(dec!(500), Currency::USD),
            due,
            Utc::now(),
        )
        .unwrap();
        invoice.status = status;
        invoice
    }

    #[tokio::test]
    async fn test_update_status_if_is_conditional() {
        let store = InMemoryBillingStore::new();
        let inv = invoice(NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(), InvoiceStatus::Sent);
        store.insert_invoice(&inv).await.unwrap();

        let changed = store
            .update_status_if(inv.id, InvoiceStatus::Draft, InvoiceStatus::Paid, Utc::now())
            .await
            .unwrap();
        assert!(!changed);

        let changed = store
            .update_status_if(inv.id, InvoiceStatus::Sent, InvoiceStatus::Overdue, Utc::now())
            .await
            .unwrap();
        assert!(changed);
        assert_eq!(store.get_invoice(inv.id).await.unwrap().status, InvoiceStatus::Overdue);
    }

    #[tokio::test]
    async fn test_sweep_only_touches_sent_past_due() {
        let store = InMemoryBillingStore::new();
        let today = NaiveDate::from_ymd_opt(2024, 1, 11).unwrap();
        let past_sent = invoice(NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(), InvoiceStatus::Sent);
        let due_today = invoice(today, InvoiceStatus::Sent);
        let past_draft = invoice(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(), InvoiceStatus::Draft);
        for inv in [&past_sent, &due_today, &past_draft] {
            store.insert_invoice(inv).await.unwrap();
        }

        let swept = store.sweep_overdue(today, Utc::now()).await.unwrap();
        assert_eq!(swept.len(), 1);
        assert_eq!(swept[0].id, past_sent.id);
    }

    #[tokio::test]
    async fn test_marking_a_terminal_reminder_is_refused() {
        let store = InMemoryBillingStore::new();
        let reminder = Reminder::pending(
            InvoiceId::new(),
            Channel::Email,
            EscalationLevel::Polite,
            Utc::now(),
            Utc::now(),
        );
        store.insert_reminders(std::slice::from_ref(&reminder)).await.unwrap();

        assert!(store.mark_sent(reminder.id, Utc::now(), "hello").await.unwrap());
        assert!(!store.mark_failed(reminder.id, "late failure").await.unwrap());

        let stored = store.all_reminders().await;
        assert_eq!(stored[0].status, ReminderStatus::Sent);
        assert!(stored[0].error_message.is_none());
    }

    #[tokio::test]
    async fn test_insert_reminders_skips_duplicates() {
        let store = InMemoryBillingStore::new();
        let at = Utc::now();
        let invoice_id = InvoiceId::new();
        let first = Reminder::pending(invoice_id, Channel::Email, EscalationLevel::Polite, at, at);
        let again = Reminder::pending(invoice_id, Channel::Email, EscalationLevel::Polite, at, at);

        assert_eq!(store.insert_reminders(&[first]).await.unwrap(), 1);
        assert_eq!(store.insert_reminders(&[again]).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_unavailable_store_fails_fetch() {
        let store = InMemoryBillingStore::new();
        store.set_unavailable(true);
        let err = store.fetch_due(Utc::now(), 10).await.unwrap_err();
        assert!(err.is_transient());
        assert!(!store.health_check().await.is_healthy());
    }

    #[tokio::test]
    async fn test_notifications_read_back_per_user() {
        use crate::notification::Severity;

        let store = InMemoryBillingStore::new();
        let user = UserId::new();
        let start = Utc::now();
        let older = Notification::new(user, Severity::Warning, "Invoice overdue", "INV-1", start);
        let newer = Notification::new(user, Severity::Success, "Reminder sent", "INV-1", start + chrono::Duration::minutes(5));
        let other = Notification::new(UserId::new(), Severity::Info, "Elsewhere", "INV-9", start);
        for n in [&older, &newer, &other] {
            store.notify(n).await.unwrap();
        }

        let recent = store.recent_notifications(user, 20).await.unwrap();
        assert_eq!(recent.iter().map(|n| n.id).collect::<Vec<_>>(), vec![newer.id, older.id]);

        assert!(store.mark_notification_read(user, older.id).await.unwrap());
        assert!(!store.mark_notification_read(user, other.id).await.unwrap());
        assert_eq!(store.mark_all_notifications_read(user).await.unwrap(), 1);
        assert_eq!(store.mark_all_notifications_read(user).await.unwrap(), 0);
        assert!(store.recent_notifications(user, 20).await.unwrap().iter().all(|n| n.read));
    }

    #[tokio::test]
    async fn test_mark_sent_failure_hook() {
        let store = InMemoryBillingStore::new();
        let reminder = Reminder::pending(
            InvoiceId::new(),
            Channel::Email,
            EscalationLevel::Polite,
            Utc::now(),
            Utc::now(),
        );
        store.insert_reminders(std::slice::from_ref(&reminder)).await.unwrap();
        store.set_mark_sent_failing(true);

        assert!(store.mark_sent(reminder.id, Utc::now(), "hello").await.is_err());
        assert_eq!(store.all_reminders().await[0].status, ReminderStatus::Pending);
    }
}
