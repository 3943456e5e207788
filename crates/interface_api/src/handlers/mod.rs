//! Request handlers

pub mod clients;
pub mod cron;
pub mod health;
pub mod invoices;
pub mod notifications;
