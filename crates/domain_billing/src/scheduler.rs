//! Reminder scheduling
//!
//! Two jobs live here:
//!
//! - building the three-step reminder plan when an invoice is sent, anchored
//!   at its due date (+0, +7, +14 days, all by email)
//! - the overdue sweep, which moves every `sent` invoice whose due date has
//!   passed to `overdue` and tells the owner
//!
//! Both are safe to repeat. Planning twice inserts nothing the second time,
//! and the sweep only matches invoices that are still `sent`.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use core_kernel::Clock;

use crate::error::BillingError;
use crate::invoice::{Invoice, InvoiceStatus};
use crate::notification::{Notification, Severity};
use crate::ports::{InvoiceStore, NotificationSink, ReminderStore};
use crate::reminder::{scheduled_for, Channel, EscalationLevel, Reminder};

/// Creates reminder plans and runs the overdue sweep
pub struct ReminderScheduler {
    invoices: Arc<dyn InvoiceStore>,
    reminders: Arc<dyn ReminderStore>,
    notifications: Arc<dyn NotificationSink>,
    clock: Arc<dyn Clock>,
}

impl ReminderScheduler {
    pub fn new(
        invoices: Arc<dyn InvoiceStore>,
        reminders: Arc<dyn ReminderStore>,
        notifications: Arc<dyn NotificationSink>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            invoices,
            reminders,
            notifications,
            clock,
        }
    }

    /// The three pending email reminders for an invoice
    pub fn plan_for(invoice: &Invoice, now: DateTime<Utc>) -> Vec<Reminder> {
        EscalationLevel::ALL
            .iter()
            .map(|level| {
                Reminder::pending(
                    invoice.id,
                    Channel::Email,
                    *level,
                    scheduled_for(invoice.due_date, *level),
                    now,
                )
            })
            .collect()
    }

    /// Stores the plan for a sent invoice
    ///
    /// # Returns
    ///
    /// The number of reminders actually inserted; zero when the plan
    /// already exists
    pub async fn schedule_plan(&self, invoice: &Invoice) -> Result<u64, BillingError> {
        let plan = Self::plan_for(invoice, self.clock.now());
        let inserted = self.reminders.insert_reminders(&plan).await?;

        if inserted == 0 {
            debug!(invoice_id = %invoice.id, "Reminder plan already present");
        } else {
            info!(
                invoice_id = %invoice.id,
                due_date = %invoice.due_date,
                inserted,
                "Scheduled reminder plan"
            );
        }
        Ok(inserted)
    }

    /// Queues a one-off reminder for right now
    ///
    /// Used when the user explicitly asks for a reminder on a chosen
    /// channel; the next processing run picks it up.
    pub async fn enqueue(
        &self,
        invoice: &Invoice,
        channel: Channel,
        level: EscalationLevel,
    ) -> Result<Reminder, BillingError> {
        if !invoice.status.is_collectible() {
            return Err(BillingError::validation(format!(
                "cannot queue a reminder for a {} invoice",
                invoice.status
            )));
        }

        let now = self.clock.now();
        let reminder = Reminder::pending(invoice.id, channel, level, now, now);
        self.reminders
            .insert_reminders(std::slice::from_ref(&reminder))
            .await?;

        info!(
            invoice_id = %invoice.id,
            reminder_id = %reminder.id,
            channel = %channel,
            level = level.number(),
            "Queued manual reminder"
        );
        Ok(reminder)
    }

    /// Marks every sent, past-due invoice as overdue
    ///
    /// One warning notification goes to the owner of each swept invoice.
    /// Notification failures are logged and otherwise ignored.
    pub async fn sweep_overdue(&self) -> Result<Vec<Invoice>, BillingError> {
        let now = self.clock.now();
        let today = self.clock.today();
        let swept = self.invoices.sweep_overdue(today, now).await?;

        if !swept.is_empty() {
            info!(count = swept.len(), %today, "Marked invoices overdue");
        }

        for invoice in &swept {
            debug_assert_eq!(invoice.status, InvoiceStatus::Overdue);
            let notification = Notification::new(
                invoice.user_id,
                Severity::Warning,
                "Invoice overdue",
                format!(
                    "Invoice {} for {} is now overdue",
                    invoice.invoice_number, invoice.amount
                ),
                now,
            )
            .with_link(invoice.link());

            if let Err(e) = self.notifications.notify(&notification).await {
                warn!(invoice_id = %invoice.id, error = %e, "Failed to emit overdue notification");
            }
        }

        Ok(swept)
    }
}
