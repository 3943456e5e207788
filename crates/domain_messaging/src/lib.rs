//! Reminder content and delivery
//!
//! - [`templates`]: deterministic wording per escalation level and channel
//! - [`ai`]: optional AI-personalised content from Groq, OpenAI, xAI or Gemini
//! - [`composer`]: picks AI or template content for one reminder
//! - [`channels`]: email (Resend), SMS and WhatsApp (Twilio) senders
//! - [`payment_link`]: hosted payment links (Paystack)
//! - [`settings`]: the resolved per-reminder provider settings

pub mod ai;
pub mod channels;
pub mod composer;
pub mod error;
pub mod format;
pub mod payment_link;
pub mod settings;
pub mod templates;
pub mod tone;

pub use ai::{ContentGenerator, GeneratedReminder, GeneratorFactory, HttpGeneratorFactory, ReminderContext};
pub use channels::{normalize_phone, ChannelDispatcher, ChannelSender, OutboundMessage, SendOutcome};
pub use composer::{ComposedMessage, MessageComposer};
pub use error::{AiError, ChannelError, PaymentLinkError};
pub use payment_link::{PaymentLinkProvider, PaystackLinkProvider};
pub use settings::{AiProviderKind, AiSettings, ChannelSettings, TwilioSettings};
