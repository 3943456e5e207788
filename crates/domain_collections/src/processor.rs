//! Escalation processor
//!
//! One run:
//!
//! 1. the overdue sweep
//! 2. fetch up to `batch_limit` due pending reminders with their invoice,
//!    client and owner settings
//! 3. process each reminder independently, at most `max_concurrency` at a
//!    time
//!
//! Every fetched reminder leaves the run in a terminal state (sent, failed
//! or cancelled), so running again never sends it twice. A reminder that
//! errors or panics is marked failed and the rest of the batch carries on.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use futures::{FutureExt, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, info_span, warn, Instrument};

use core_kernel::{Clock, ReminderId};
use domain_billing::{
    Channel, Client, ClientStore, DueReminder, HistoryNote, Invoice, InvoiceStatus, InvoiceStore,
    Notification, NotificationSink, Reminder, ReminderScheduler, ReminderStore, Severity,
};
use domain_messaging::{ChannelDispatcher, ChannelSettings, ComposedMessage, MessageComposer, PaymentLinkProvider};

use crate::error::CollectionsError;

const PANIC_MESSAGE: &str = "Unexpected error while processing reminder";

/// Counts reported by one run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub processed: usize,
    pub sent: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl RunSummary {
    fn record(&mut self, outcome: Outcome) {
        self.processed += 1;
        match outcome {
            Outcome::Sent => self.sent += 1,
            Outcome::Failed => self.failed += 1,
            Outcome::Skipped => self.skipped += 1,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProcessorConfig {
    /// Maximum reminders fetched per run
    pub batch_limit: u32,
    /// Reminders processed concurrently
    pub max_concurrency: usize,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            batch_limit: 100,
            max_concurrency: 4,
        }
    }
}

/// Everything a run talks to
#[derive(Clone)]
pub struct Collaborators {
    pub invoices: Arc<dyn InvoiceStore>,
    pub clients: Arc<dyn ClientStore>,
    pub reminders: Arc<dyn ReminderStore>,
    pub notifications: Arc<dyn NotificationSink>,
    pub scheduler: Arc<ReminderScheduler>,
    pub composer: Arc<MessageComposer>,
    pub dispatcher: Arc<ChannelDispatcher>,
    /// Optional; without it reminders go out with no payment link
    pub payment_links: Option<Arc<dyn PaymentLinkProvider>>,
    pub clock: Arc<dyn Clock>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Sent,
    Failed,
    Skipped,
}

/// Runs the escalation pipeline
pub struct EscalationProcessor {
    deps: Collaborators,
    /// System-wide channel settings each owner's settings are laid over
    defaults: ChannelSettings,
    config: ProcessorConfig,
}

impl EscalationProcessor {
    pub fn new(deps: Collaborators, defaults: ChannelSettings, config: ProcessorConfig) -> Self {
        Self {
            deps,
            defaults,
            config,
        }
    }

    /// Executes one run
    ///
    /// Only a failing sweep or a failing fetch aborts the run.
    pub async fn run(&self) -> Result<RunSummary, CollectionsError> {
        let span = info_span!("escalation_run", batch_limit = self.config.batch_limit);
        async move {
            let started = Instant::now();

            let swept = self.deps.scheduler.sweep_overdue().await?;
            let now = self.deps.clock.now();
            let due = self.deps.reminders.fetch_due(now, self.config.batch_limit).await?;

            if due.is_empty() {
                info!(swept = swept.len(), "No pending reminders");
                return Ok(RunSummary::default());
            }

            let concurrency = self.config.max_concurrency.max(1);
            let outcomes: Vec<Outcome> = futures::stream::iter(due)
                .map(|item| self.process_guarded(item))
                .buffer_unordered(concurrency)
                .collect()
                .await;

            let mut summary = RunSummary::default();
            for outcome in outcomes {
                summary.record(outcome);
            }

            info!(
                swept = swept.len(),
                processed = summary.processed,
                sent = summary.sent,
                failed = summary.failed,
                skipped = summary.skipped,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Escalation run complete"
            );
            Ok(summary)
        }
        .instrument(span)
        .await
    }

    /// Processes one reminder, turning errors and panics into a failed
    /// reminder
    async fn process_guarded(&self, due: DueReminder) -> Outcome {
        let id = due.reminder.id;
        let invoice_id = due.invoice.id;

        match AssertUnwindSafe(self.process(due)).catch_unwind().await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(e)) => {
                error!(reminder_id = %id, %invoice_id, error = %e, "Reminder processing failed");
                self.mark_failed_quietly(id, &e.to_string()).await;
                Outcome::Failed
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                error!(reminder_id = %id, %invoice_id, error = %message, "Reminder processing panicked");
                self.mark_failed_quietly(id, &message).await;
                Outcome::Failed
            }
        }
    }

    async fn process(&self, due: DueReminder) -> Result<Outcome, CollectionsError> {
        let DueReminder {
            reminder,
            mut invoice,
            client,
            settings,
        } = due;

        if !invoice.status.is_collectible() {
            self.deps.reminders.mark_cancelled(reminder.id).await?;
            info!(
                reminder_id = %reminder.id,
                invoice_id = %invoice.id,
                status = %invoice.status,
                "Invoice no longer collectible, reminder cancelled"
            );
            return Ok(Outcome::Skipped);
        }

        let Some(client) = client else {
            return self.fail(&reminder, "No client found for invoice").await;
        };

        let destination = match destination_for(reminder.channel, &client) {
            Some(destination) => destination,
            None => {
                let message = format!(
                    "Client has no phone number for {} delivery",
                    reminder.channel.label()
                );
                return self.fail(&reminder, &message).await;
            }
        };

        let settings = self.defaults.merged_with(&settings);

        if invoice.payment_url.is_none() {
            self.attach_payment_link(&mut invoice, &client, &settings).await;
        }

        let composed = self
            .deps
            .composer
            .compose(
                &invoice,
                Some(&client),
                reminder.escalation_level,
                reminder.channel,
                &settings,
            )
            .await;

        let result = self
            .deps
            .dispatcher
            .send(reminder.channel, &destination, &composed.outbound(), &settings)
            .await;

        match result {
            Ok(outcome) if outcome.success => Ok(self.record_sent(&reminder, &invoice, &client, &composed).await),
            Ok(outcome) => {
                let message = outcome.error.unwrap_or_else(|| "Unknown delivery error".to_string());
                self.fail(&reminder, &message).await
            }
            Err(e) => self.fail(&reminder, &e.to_string()).await,
        }
    }

    /// Best effort; the reminder goes out without a link on any failure
    async fn attach_payment_link(&self, invoice: &mut Invoice, client: &Client, settings: &ChannelSettings) {
        let Some(provider) = &self.deps.payment_links else {
            return;
        };
        if settings.paystack_secret_key.is_none() {
            return;
        }

        match provider.create_link(invoice, &client.email, settings).await {
            Ok(url) => {
                if let Err(e) = self
                    .deps
                    .invoices
                    .set_payment_url(invoice.id, &url, self.deps.clock.now())
                    .await
                {
                    warn!(invoice_id = %invoice.id, error = %e, "Could not cache payment link");
                }
                invoice.payment_url = Some(url);
            }
            Err(e) => {
                warn!(invoice_id = %invoice.id, error = %e, "Payment link unavailable");
            }
        }
    }

    async fn record_sent(
        &self,
        reminder: &Reminder,
        invoice: &Invoice,
        client: &Client,
        composed: &ComposedMessage,
    ) -> Outcome {
        let now = self.deps.clock.now();
        let today = self.deps.clock.today();

        // the message is already out, so a store error here is logged only
        match self.deps.reminders.mark_sent(reminder.id, now, &composed.body).await {
            Ok(true) => {}
            Ok(false) => warn!(reminder_id = %reminder.id, "Reminder left pending state during delivery"),
            Err(e) => error!(
                reminder_id = %reminder.id,
                error = %e,
                "Reminder delivered but could not be marked sent"
            ),
        }

        info!(
            reminder_id = %reminder.id,
            invoice_id = %invoice.id,
            channel = %reminder.channel,
            level = reminder.escalation_level.number(),
            ai_generated = composed.ai_generated,
            "Reminder sent"
        );

        let note = HistoryNote::reminder(
            today,
            invoice.id,
            format!(
                "Level {} {} reminder sent",
                reminder.escalation_level.number(),
                reminder.channel.label()
            ),
        );
        if let Err(e) = self.deps.clients.append_history_note(client.id, &note, now).await {
            warn!(client_id = %client.id, error = %e, "Could not record reminder in client history");
        }

        let notification = Notification::new(
            invoice.user_id,
            Severity::Success,
            "Reminder sent",
            format!(
                "Level {} {} reminder for invoice {} sent to {}",
                reminder.escalation_level.number(),
                reminder.channel.label(),
                invoice.invoice_number,
                client.name
            ),
            now,
        )
        .with_link(invoice.link());
        if let Err(e) = self.deps.notifications.notify(&notification).await {
            warn!(invoice_id = %invoice.id, error = %e, "Failed to emit reminder notification");
        }

        if invoice.status == InvoiceStatus::Sent && invoice.is_past_due(today) {
            match self
                .deps
                .invoices
                .update_status_if(invoice.id, InvoiceStatus::Sent, InvoiceStatus::Overdue, now)
                .await
            {
                Ok(true) => debug!(invoice_id = %invoice.id, "Invoice marked overdue after reminder"),
                Ok(false) => {}
                Err(e) => warn!(invoice_id = %invoice.id, error = %e, "Could not mark invoice overdue"),
            }
        }

        Outcome::Sent
    }

    async fn fail(&self, reminder: &Reminder, message: &str) -> Result<Outcome, CollectionsError> {
        self.deps.reminders.mark_failed(reminder.id, message).await?;
        warn!(
            reminder_id = %reminder.id,
            invoice_id = %reminder.invoice_id,
            channel = %reminder.channel,
            level = reminder.escalation_level.number(),
            error = message,
            "Reminder failed"
        );
        Ok(Outcome::Failed)
    }

    async fn mark_failed_quietly(&self, id: ReminderId, message: &str) {
        if let Err(e) = self.deps.reminders.mark_failed(id, message).await {
            error!(reminder_id = %id, error = %e, "Could not record reminder failure");
        }
    }
}

fn destination_for(channel: Channel, client: &Client) -> Option<String> {
    if channel.needs_phone() {
        client.phone.clone().filter(|p| !p.trim().is_empty())
    } else {
        Some(client.email.clone())
    }
}

/// Text of a panic payload, when it carries one
fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        PANIC_MESSAGE.to_string()
    }
}
