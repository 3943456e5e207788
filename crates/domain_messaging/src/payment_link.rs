//! Hosted payment links
//!
//! Links are optional. The collections run asks for one before composing a
//! reminder and carries on without it when the provider is not configured
//! or refuses.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use domain_billing::Invoice;

use crate::error::PaymentLinkError;
use crate::settings::ChannelSettings;

pub const PAYSTACK_API_URL: &str = "https://api.paystack.co";

#[async_trait]
pub trait PaymentLinkProvider: Send + Sync {
    /// A URL the client can pay the invoice at
    async fn create_link(
        &self,
        invoice: &Invoice,
        payer_email: &str,
        settings: &ChannelSettings,
    ) -> Result<String, PaymentLinkError>;
}

#[derive(Debug, Serialize)]
struct InitializeRequest<'a> {
    email: &'a str,
    /// Minor units (kobo, cents)
    amount: i64,
    currency: &'a str,
    metadata: InitializeMetadata<'a>,
}

#[derive(Debug, Serialize)]
struct InitializeMetadata<'a> {
    invoice_id: String,
    invoice_number: &'a str,
}

#[derive(Debug, Default, Deserialize)]
struct InitializeResponse {
    #[serde(default)]
    status: bool,
    #[serde(default)]
    message: String,
    #[serde(default)]
    data: Option<InitializeData>,
}

#[derive(Debug, Deserialize)]
struct InitializeData {
    authorization_url: String,
}

/// Paystack transaction links
pub struct PaystackLinkProvider {
    http: reqwest::Client,
    base_url: String,
}

impl PaystackLinkProvider {
    pub fn new(http: reqwest::Client) -> Self {
        Self::with_base_url(http, PAYSTACK_API_URL)
    }

    pub fn with_base_url(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl PaymentLinkProvider for PaystackLinkProvider {
    async fn create_link(
        &self,
        invoice: &Invoice,
        payer_email: &str,
        settings: &ChannelSettings,
    ) -> Result<String, PaymentLinkError> {
        let secret = settings
            .paystack_secret_key
            .as_deref()
            .ok_or(PaymentLinkError::NotConfigured)?;

        let amount = invoice
            .amount
            .to_minor_units()
            .map_err(|e| PaymentLinkError::InvalidAmount(e.to_string()))?;
        if amount <= 0 {
            return Err(PaymentLinkError::InvalidAmount(invoice.amount.to_string()));
        }

        let request = InitializeRequest {
            email: payer_email,
            amount,
            currency: invoice.currency().code(),
            metadata: InitializeMetadata {
                invoice_id: invoice.id.to_string(),
                invoice_number: &invoice.invoice_number,
            },
        };

        let response = self
            .http
            .post(format!("{}/transaction/initialize", self.base_url))
            .bearer_auth(secret)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let raw = response.text().await?;
        let body: InitializeResponse = serde_json::from_str(&raw).unwrap_or_default();

        match body.data {
            Some(data) if status.is_success() && body.status => {
                debug!(invoice_id = %invoice.id, "Created payment link");
                Ok(data.authorization_url)
            }
            _ => Err(PaymentLinkError::Api {
                status: status.as_u16(),
                message: body.message,
            }),
        }
    }
}
