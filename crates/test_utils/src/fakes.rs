//! Fake Collaborators
//!
//! Scripted stand-ins for the outbound providers, so the escalation run and
//! the composer can be exercised without network access. Every fake records
//! what it was asked to do.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use domain_billing::Invoice;
use domain_messaging::{
    AiError, AiSettings, ChannelError, ChannelSender, ChannelSettings, ContentGenerator, GeneratedReminder,
    GeneratorFactory, OutboundMessage, PaymentLinkError, PaymentLinkProvider, ReminderContext,
    SendOutcome,
};

/// A message a fake sender was asked to deliver
#[derive(Debug, Clone)]
pub struct SentMessage {
    pub destination: String,
    pub message: OutboundMessage,
}

/// How a [`ScriptedSender`] answers
#[derive(Debug, Clone)]
pub enum SendBehavior {
    Accept,
    Reject(String),
    Error(String),
    Panic,
}

/// Channel sender with a fixed answer that records every request
#[derive(Clone)]
pub struct ScriptedSender {
    behavior: SendBehavior,
    sent: Arc<Mutex<Vec<SentMessage>>>,
}

impl ScriptedSender {
    pub fn new(behavior: SendBehavior) -> Self {
        Self {
            behavior,
            sent: Arc::default(),
        }
    }

    pub fn accepting() -> Self {
        Self::new(SendBehavior::Accept)
    }

    pub fn rejecting(error: impl Into<String>) -> Self {
        Self::new(SendBehavior::Reject(error.into()))
    }

    /// Everything this sender was asked to deliver
    pub async fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl ChannelSender for ScriptedSender {
    async fn send(
        &self,
        destination: &str,
        message: &OutboundMessage,
        _settings: &ChannelSettings,
    ) -> Result<SendOutcome, ChannelError> {
        self.sent.lock().await.push(SentMessage {
            destination: destination.to_string(),
            message: message.clone(),
        });

        match &self.behavior {
            SendBehavior::Accept => Ok(SendOutcome::ok(Some("msg_fake".to_string()))),
            SendBehavior::Reject(error) => Ok(SendOutcome::failed(error.clone())),
            SendBehavior::Error(error) => Err(ChannelError::Network(error.clone())),
            SendBehavior::Panic => panic!("scripted sender panic"),
        }
    }
}

/// Content generator returning a fixed reply, or failing
#[derive(Clone)]
pub struct StubGenerator {
    reply: Option<GeneratedReminder>,
    calls: Arc<AtomicUsize>,
}

impl StubGenerator {
    pub fn replying(reply: GeneratedReminder) -> Self {
        Self {
            reply: Some(reply),
            calls: Arc::default(),
        }
    }

    pub fn failing() -> Self {
        Self {
            reply: None,
            calls: Arc::default(),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContentGenerator for StubGenerator {
    fn name(&self) -> &'static str {
        "stub"
    }

    async fn generate(&self, _context: &ReminderContext) -> Result<GeneratedReminder, AiError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.reply.clone().ok_or(AiError::Api {
            status: 503,
            body: "stub provider unavailable".to_string(),
        })
    }
}

/// Generator factory that hands out one generator, or none
#[derive(Clone, Default)]
pub struct StubGeneratorFactory {
    generator: Option<StubGenerator>,
}

impl StubGeneratorFactory {
    /// Never selects a provider, so composition always uses templates
    pub fn templates_only() -> Self {
        Self::default()
    }

    pub fn with(generator: StubGenerator) -> Self {
        Self {
            generator: Some(generator),
        }
    }
}

impl GeneratorFactory for StubGeneratorFactory {
    fn for_settings(&self, _settings: &AiSettings) -> Option<Arc<dyn ContentGenerator>> {
        self.generator
            .clone()
            .map(|g| Arc::new(g) as Arc<dyn ContentGenerator>)
    }
}

/// Payment-link provider returning a URL derived from the invoice number
#[derive(Clone, Default)]
pub struct StubPaymentLinks {
    fail: bool,
    calls: Arc<AtomicUsize>,
}

impl StubPaymentLinks {
    pub fn working() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            calls: Arc::default(),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PaymentLinkProvider for StubPaymentLinks {
    async fn create_link(
        &self,
        invoice: &Invoice,
        _payer_email: &str,
        _settings: &ChannelSettings,
    ) -> Result<String, PaymentLinkError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(PaymentLinkError::Api {
                status: 400,
                message: "Invalid key".to_string(),
            });
        }
        Ok(format!("https://pay.test/{}", invoice.invoice_number))
    }
}
