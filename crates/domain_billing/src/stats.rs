//! Client payment statistics

use serde::{Deserialize, Serialize};

use crate::client::{Client, HistoryKind, HistoryNote};
use crate::invoice::{Invoice, InvoiceStatus};

/// Payment behaviour summarised from a client's history notes
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PaymentHistory {
    pub payment_count: usize,
    pub late_count: usize,
    /// Mean lateness over the late payments only
    pub average_days_late: Option<f64>,
}

impl PaymentHistory {
    pub fn from_notes(notes: &[HistoryNote]) -> Self {
        let payments: Vec<&HistoryNote> = notes
            .iter()
            .filter(|n| n.kind == HistoryKind::Payment)
            .collect();
        let late: Vec<i64> = payments
            .iter()
            .filter_map(|n| n.days_late)
            .filter(|d| *d > 0)
            .collect();

        let average_days_late = if late.is_empty() {
            None
        } else {
            Some(late.iter().sum::<i64>() as f64 / late.len() as f64)
        };

        Self {
            payment_count: payments.len(),
            late_count: late.len(),
            average_days_late,
        }
    }

    /// Share of payments that were on time, as a percentage
    pub fn on_time_rate(&self) -> Option<f64> {
        if self.payment_count == 0 {
            return None;
        }
        let on_time = self.payment_count - self.late_count;
        Some(on_time as f64 * 100.0 / self.payment_count as f64)
    }
}

/// Statistics shown for one client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientStats {
    pub total_invoices: usize,
    pub paid_invoices: usize,
    pub history: PaymentHistory,
    pub on_time_rate: Option<f64>,
    /// Mean of `updated_at - created_at` over paid invoices, in days.
    ///
    /// This is a proxy, not the real time to payment: `updated_at` moves on
    /// any later edit of the invoice, and `created_at` is not the date the
    /// invoice was sent. Treat it as an approximation.
    pub average_days_to_payment: Option<f64>,
}

impl ClientStats {
    pub fn compute(client: &Client, invoices: &[Invoice]) -> Self {
        let history = PaymentHistory::from_notes(&client.history_notes);

        let paid: Vec<&Invoice> = invoices
            .iter()
            .filter(|i| i.status == InvoiceStatus::Paid)
            .collect();
        let average_days_to_payment = if paid.is_empty() {
            None
        } else {
            let total_days: f64 = paid
                .iter()
                .map(|i| (i.updated_at - i.created_at).num_seconds() as f64 / 86_400.0)
                .sum();
            Some(total_days / paid.len() as f64)
        };

        Self {
            total_invoices: invoices.len(),
            paid_invoices: paid.len(),
            on_time_rate: history.on_time_rate(),
            history,
            average_days_to_payment,
        }
    }
}
