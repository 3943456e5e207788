//! Invoice lifecycle
//!
//! The invoice status is a small state machine:
//!
//! ```text
//! draft ──► sent ──► overdue
//!             │         │
//!             └──► paid ◄┘   (paid is absorbing)
//! ```
//!
//! [`plan_transition`] is the pure rule table. [`LifecycleManager`] applies
//! it against the stores and carries out the side effect each transition
//! requires. A status is never corrected silently: anything outside the
//! table is an `InvalidTransition`.

use std::sync::Arc;

use tracing::{info, warn};

use core_kernel::{ClientId, Clock, InvoiceId, Money, PortError, UserId};

use crate::client::{Client, ClientDetails, HistoryNote};
use crate::error::BillingError;
use crate::invoice::{Invoice, InvoiceStatus};
use crate::ports::{ClientStore, InvoiceStore, ReminderStore};
use crate::reminder::{Channel, EscalationLevel, Reminder};
use crate::scheduler::ReminderScheduler;
use crate::stats::ClientStats;

/// What has to happen alongside a status change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionEffect {
    /// Store the three-level reminder plan
    SchedulePlan,
    /// Status change only
    StatusOnly,
    /// Cancel every pending reminder of the invoice
    CancelPending,
    /// Already in the target state; nothing to do
    NoOp,
}

/// Looks up a transition in the lifecycle table
pub fn plan_transition(
    from: InvoiceStatus,
    to: InvoiceStatus,
) -> Result<TransitionEffect, BillingError> {
    use InvoiceStatus::*;

    match (from, to) {
        (Draft, Sent) => Ok(TransitionEffect::SchedulePlan),
        (Sent, Overdue) => Ok(TransitionEffect::StatusOnly),
        (Sent, Paid) | (Overdue, Paid) => Ok(TransitionEffect::CancelPending),
        (Paid, Paid) => Ok(TransitionEffect::NoOp),
        _ => Err(BillingError::InvalidTransition { from, to }),
    }
}

/// Request to create an invoice, optionally with a client to find or create
#[derive(Debug, Clone)]
pub struct NewInvoice {
    pub invoice_number: String,
    pub amount: Money,
    pub due_date: chrono::NaiveDate,
    pub description: Option<String>,
    pub client: Option<ClientDetails>,
    /// `Draft` or `Sent`
    pub status: InvoiceStatus,
}

/// Applies lifecycle transitions and their side effects
pub struct LifecycleManager {
    invoices: Arc<dyn InvoiceStore>,
    clients: Arc<dyn ClientStore>,
    reminders: Arc<dyn ReminderStore>,
    scheduler: Arc<ReminderScheduler>,
    clock: Arc<dyn Clock>,
}

impl LifecycleManager {
    pub fn new(
        invoices: Arc<dyn InvoiceStore>,
        clients: Arc<dyn ClientStore>,
        reminders: Arc<dyn ReminderStore>,
        scheduler: Arc<ReminderScheduler>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            invoices,
            clients,
            reminders,
            scheduler,
            clock,
        }
    }

    /// Fetches an invoice owned by `user_id`
    ///
    /// Invoices of other users are reported as not found.
    pub async fn get_owned(&self, user_id: UserId, id: InvoiceId) -> Result<Invoice, BillingError> {
        let invoice = self
            .invoices
            .get_invoice(id)
            .await
            .map_err(|e| BillingError::from_invoice_lookup(e, id))?;
        if invoice.user_id != user_id {
            return Err(BillingError::InvoiceNotFound(id.to_string()));
        }
        Ok(invoice)
    }

    pub async fn get_client_owned(&self, user_id: UserId, id: ClientId) -> Result<Client, BillingError> {
        let client = self
            .clients
            .get_client(id)
            .await
            .map_err(|e| BillingError::from_client_lookup(e, id))?;
        if client.user_id != user_id {
            return Err(BillingError::ClientNotFound(id.to_string()));
        }
        Ok(client)
    }

    /// The user's invoices, newest first, optionally of one status
    pub async fn list_invoices(
        &self,
        user_id: UserId,
        status: Option<InvoiceStatus>,
        limit: u32,
    ) -> Result<Vec<Invoice>, BillingError> {
        Ok(self.invoices.invoices_for_user(user_id, status, limit).await?)
    }

    /// Deletes an owned invoice along with its reminders
    pub async fn delete_invoice(&self, user_id: UserId, id: InvoiceId) -> Result<(), BillingError> {
        self.get_owned(user_id, id).await?;
        if !self.invoices.delete_invoice(id).await? {
            return Err(BillingError::InvoiceNotFound(id.to_string()));
        }
        info!(invoice_id = %id, user_id = %user_id, "Deleted invoice");
        Ok(())
    }

    pub async fn reminders_for(&self, invoice_id: InvoiceId) -> Result<Vec<Reminder>, BillingError> {
        Ok(self.reminders.reminders_for_invoice(invoice_id).await?)
    }

    /// Creates an invoice, finding or creating its client first
    ///
    /// The client is matched by email within the user's clients. A `Sent`
    /// invoice is stored as a draft and then sent through [`Self::transition`],
    /// so its reminder plan is created the same way as for any other send.
    pub async fn create_invoice(&self, user_id: UserId, request: NewInvoice) -> Result<Invoice, BillingError> {
        if !matches!(request.status, InvoiceStatus::Draft | InvoiceStatus::Sent) {
            return Err(BillingError::validation(format!(
                "new invoices start as draft or sent, not {}",
                request.status
            )));
        }

        let now = self.clock.now();

        // Step 1: client
        let client_id = match request.client {
            Some(details) => Some(self.find_or_create_client(user_id, details).await?.id),
            None => None,
        };

        // Step 2: invoice
        let mut invoice = Invoice::new(user_id, request.invoice_number, request.amount, request.due_date, now)?;
        if let Some(client_id) = client_id {
            invoice = invoice.with_client(client_id);
        }
        if let Some(description) = request.description {
            invoice = invoice.with_description(description);
        }
        self.invoices.insert_invoice(&invoice).await?;

        info!(
            invoice_id = %invoice.id,
            user_id = %user_id,
            amount = %invoice.amount,
            "Created invoice"
        );

        if request.status == InvoiceStatus::Sent {
            return self.transition(invoice.id, InvoiceStatus::Sent).await;
        }
        Ok(invoice)
    }

    async fn find_or_create_client(&self, user_id: UserId, details: ClientDetails) -> Result<Client, BillingError> {
        if let Some(existing) = self.clients.find_client_by_email(user_id, &details.email).await? {
            return Ok(existing);
        }

        let client = Client::new(user_id, details, self.clock.now())?;
        match self.clients.insert_client(&client).await {
            Ok(()) => {
                info!(client_id = %client.id, "Created client");
                Ok(client)
            }
            // Lost a race with a concurrent insert of the same email
            Err(e @ PortError::Conflict { .. }) => self
                .clients
                .find_client_by_email(user_id, &client.email)
                .await?
                .ok_or(BillingError::Store(e)),
            Err(e) => Err(e.into()),
        }
    }

    /// Moves an invoice to `to`, applying the side effect of the transition
    ///
    /// # Errors
    ///
    /// - `InvalidTransition` when the table does not allow the move
    /// - `Conflict` when the invoice changed status concurrently and the move
    ///   is no longer valid
    pub async fn transition(&self, id: InvoiceId, to: InvoiceStatus) -> Result<Invoice, BillingError> {
        let invoice = self
            .invoices
            .get_invoice(id)
            .await
            .map_err(|e| BillingError::from_invoice_lookup(e, id))?;
        let from = invoice.status;
        let effect = plan_transition(from, to)?;

        if effect == TransitionEffect::NoOp {
            return Ok(invoice);
        }

        let now = self.clock.now();
        let changed = self.invoices.update_status_if(id, from, to, now).await?;
        if !changed {
            let current = self.invoices.get_invoice(id).await?;
            if plan_transition(current.status, to)? == TransitionEffect::NoOp {
                return Ok(current);
            }
            return Err(BillingError::Conflict(format!(
                "invoice {} changed from {} to {} during the update",
                id, from, current.status
            )));
        }

        let mut updated = invoice;
        updated.status = to;
        updated.updated_at = now;

        info!(invoice_id = %id, %from, %to, "Invoice status changed");

        match effect {
            TransitionEffect::SchedulePlan => {
                self.scheduler.schedule_plan(&updated).await?;
            }
            TransitionEffect::CancelPending => {
                let cancelled = self.reminders.cancel_pending_for_invoice(id).await?;
                info!(invoice_id = %id, cancelled, "Cancelled pending reminders");
                self.record_payment(&updated).await;
            }
            TransitionEffect::StatusOnly | TransitionEffect::NoOp => {}
        }

        Ok(updated)
    }

    /// Queues a reminder on an explicit channel, scheduled now
    pub async fn enqueue_reminder(
        &self,
        user_id: UserId,
        id: InvoiceId,
        channel: Channel,
        level: EscalationLevel,
    ) -> Result<Reminder, BillingError> {
        let invoice = self.get_owned(user_id, id).await?;
        self.scheduler.enqueue(&invoice, channel, level).await
    }

    pub async fn client_stats(&self, user_id: UserId, client_id: ClientId) -> Result<ClientStats, BillingError> {
        let client = self.get_client_owned(user_id, client_id).await?;
        let invoices = self.invoices.invoices_for_client(client_id).await?;
        Ok(ClientStats::compute(&client, &invoices))
    }

    async fn record_payment(&self, invoice: &Invoice) {
        let Some(client_id) = invoice.client_id else {
            return;
        };
        let today = self.clock.today();
        let note = HistoryNote::payment(
            today,
            invoice.id,
            &invoice.invoice_number,
            invoice.days_late(today),
        );
        if let Err(e) = self
            .clients
            .append_history_note(client_id, &note, self.clock.now())
            .await
        {
            warn!(invoice_id = %invoice.id, error = %e, "Failed to record payment in client history");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_allows_lifecycle_moves() {
        assert_eq!(
            plan_transition(InvoiceStatus::Draft, InvoiceStatus::Sent).unwrap(),
            TransitionEffect::SchedulePlan
        );
        assert_eq!(
            plan_transition(InvoiceStatus::Sent, InvoiceStatus::Overdue).unwrap(),
            TransitionEffect::StatusOnly
        );
        assert_eq!(
            plan_transition(InvoiceStatus::Overdue, InvoiceStatus::Paid).unwrap(),
            TransitionEffect::CancelPending
        );
        assert_eq!(
            plan_transition(InvoiceStatus::Paid, InvoiceStatus::Paid).unwrap(),
            TransitionEffect::NoOp
        );
    }

    #[test]
    fn test_table_rejects_everything_else() {
        let rejected = [
            (InvoiceStatus::Draft, InvoiceStatus::Paid),
            (InvoiceStatus::Draft, InvoiceStatus::Overdue),
            (InvoiceStatus::Draft, InvoiceStatus::Draft),
            (InvoiceStatus::Sent, InvoiceStatus::Sent),
            (InvoiceStatus::Sent, InvoiceStatus::Draft),
            (InvoiceStatus::Overdue, InvoiceStatus::Sent),
            (InvoiceStatus::Overdue, InvoiceStatus::Overdue),
            (InvoiceStatus::Paid, InvoiceStatus::Sent),
            (InvoiceStatus::Paid, InvoiceStatus::Overdue),
            (InvoiceStatus::Paid, InvoiceStatus::Draft),
        ];
        for (from, to) in rejected {
            let err = plan_transition(from, to).unwrap_err();
            assert!(
                matches!(err, BillingError::InvalidTransition { from: f, to: t } if f == from && t == to),
                "{} -> {} should be rejected",
                from,
                to
            );
        }
    }
}


#[cfg(test)]
mod proptests {
    use super::manager_tests::{harness, request};
    use super::*;
    use chrono::NaiveDate;
    use proptest::prelude::*;

    fn any_status() -> impl Strategy<Value = InvoiceStatus> {
        prop::sample::select(InvoiceStatus::ALL.to_vec())
    }

    proptest! {
        #[test]
        fn nothing_leaves_paid(to in any_status()) {
            let result = plan_transition(InvoiceStatus::Paid, to);
            if to == InvoiceStatus::Paid {
                prop_assert_eq!(result.unwrap(), TransitionEffect::NoOp);
            } else {
                prop_assert!(result.is_err());
            }
        }

        #[test]
        fn nothing_returns_to_draft(from in any_status()) {
            prop_assert!(plan_transition(from, InvoiceStatus::Draft).is_err());
        }
    }

    #[tokio::test]
    async fn test_list_is_newest_first_and_filtered() {
        let h = harness(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        let user = UserId::new();
        let mut first = request(InvoiceStatus::Draft);
        first.invoice_number = "INV-A".to_string();
        let first = h.manager.create_invoice(user, first).await.unwrap();
        h.clock.advance(chrono::Duration::hours(1));
        let mut second = request(InvoiceStatus::Sent);
        second.invoice_number = "INV-B".to_string();
        let second = h.manager.create_invoice(user, second).await.unwrap();
        h.manager.create_invoice(UserId::new(), request(InvoiceStatus::Draft)).await.unwrap();

        let all = h.manager.list_invoices(user, None, 50).await.unwrap();
        let ids: Vec<InvoiceId> = all.iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![second.id, first.id]);

        let drafts = h.manager.list_invoices(user, Some(InvoiceStatus::Draft), 50).await.unwrap();
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].id, first.id);

        assert_eq!(h.manager.list_invoices(user, None, 1).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_removes_invoice_and_reminders() {
        let h = harness(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        let user = UserId::new();
        let invoice = h.manager.create_invoice(user, request(InvoiceStatus::Sent)).await.unwrap();
        assert_eq!(h.store.all_reminders().await.len(), 3);

        let err = h.manager.delete_invoice(UserId::new(), invoice.id).await.unwrap_err();
        assert!(matches!(err, BillingError::InvoiceNotFound(_)));
        assert_eq!(h.store.all_reminders().await.len(), 3);

        h.manager.delete_invoice(user, invoice.id).await.unwrap();
        assert!(h.store.all_reminders().await.is_empty());
        assert!(matches!(
            h.manager.get_owned(user, invoice.id).await,
            Err(BillingError::InvoiceNotFound(_))
        ));
    }
}
