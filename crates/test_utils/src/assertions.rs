//! Custom Test Assertions
//!
//! Assertion helpers for domain types that give more meaningful messages
//! than plain `assert_eq!`.

use core_kernel::{InvoiceId, Money};
use domain_billing::mock::InMemoryBillingStore;
use domain_billing::{InvoiceStore, Reminder, ReminderStatus};

/// Asserts that two Money values are equal in amount and currency
pub fn assert_money_eq(actual: &Money, expected: &Money) {
    assert_eq!(
        actual.currency(),
        expected.currency(),
        "Currency mismatch: actual={}, expected={}",
        actual.currency(),
        expected.currency()
    );
    assert_eq!(
        actual.amount(),
        expected.amount(),
        "Amount mismatch: actual={}, expected={}",
        actual,
        expected
    );
}

/// Asserts that every reminder has the given status
pub fn assert_all_reminders(reminders: &[Reminder], status: ReminderStatus) {
    for reminder in reminders {
        assert_eq!(
            reminder.status, status,
            "Reminder {} (level {}, {}) is {}, expected {}",
            reminder.id, reminder.escalation_level, reminder.channel, reminder.status, status
        );
    }
}

/// Asserts that no reminder is left pending
pub fn assert_no_pending(reminders: &[Reminder]) {
    let pending: Vec<String> = reminders
        .iter()
        .filter(|r| r.status == ReminderStatus::Pending)
        .map(|r| r.id.to_string())
        .collect();
    assert!(pending.is_empty(), "Reminders still pending: {:?}", pending);
}

/// Asserts the stored status of an invoice
pub async fn assert_invoice_status(
    store: &InMemoryBillingStore,
    id: InvoiceId,
    expected: domain_billing::InvoiceStatus,
) {
    let invoice = store.get_invoice(id).await.expect("invoice not stored");
    assert_eq!(
        invoice.status, expected,
        "Invoice {} is {}, expected {}",
        invoice.invoice_number, invoice.status, expected
    );
}
