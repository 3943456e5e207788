//! Reminder composition
//!
//! [`MessageComposer::compose`] always produces a message. When the resolved
//! settings select an AI provider its content is used; any provider failure
//! falls back to the deterministic templates. Both paths guarantee that the
//! text names the invoice number and the formatted amount, and both end with
//! the payment link when the invoice has one.

use std::sync::Arc;

use tracing::{debug, warn};

use domain_billing::{Channel, Client, EscalationLevel, Invoice};

use crate::ai::{history_summary, GeneratedReminder, GeneratorFactory, ReminderContext};
use crate::channels::OutboundMessage;
use crate::settings::ChannelSettings;
use crate::templates::{email_template, sms_template, whatsapp_template, TemplateFacts};
use crate::tone::tone_for;

/// A reminder ready to hand to a channel sender
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposedMessage {
    /// Email only
    pub subject: Option<String>,
    pub body: String,
    /// Email only
    pub html: Option<String>,
    pub tone: String,
    pub suggested_action: Option<String>,
    pub ai_generated: bool,
}

impl ComposedMessage {
    pub fn outbound(&self) -> OutboundMessage {
        OutboundMessage {
            subject: self.subject.clone(),
            text: self.body.clone(),
            html: self.html.clone(),
        }
    }
}

pub struct MessageComposer {
    factory: Arc<dyn GeneratorFactory>,
}

impl MessageComposer {
    pub fn new(factory: Arc<dyn GeneratorFactory>) -> Self {
        Self { factory }
    }

    pub async fn compose(
        &self,
        invoice: &Invoice,
        client: Option<&Client>,
        level: EscalationLevel,
        channel: Channel,
        settings: &ChannelSettings,
    ) -> ComposedMessage {
        let facts = TemplateFacts::new(invoice, client, settings.business_name.as_deref());

        if let Some(generator) = self.factory.for_settings(&settings.ai) {
            let context = ReminderContext {
                invoice_number: facts.invoice_number.clone(),
                amount: facts.amount.clone(),
                due_date: facts.due_date.clone(),
                description: facts.description.clone(),
                client_name: facts.client_name.clone(),
                history_summary: history_summary(client),
                level,
            };

            match generator.generate(&context).await {
                Ok(generated) => {
                    debug!(provider = generator.name(), invoice_id = %invoice.id, "Using generated reminder content");
                    return from_generated(generated, level, channel, &facts);
                }
                Err(e) => {
                    warn!(
                        provider = generator.name(),
                        invoice_id = %invoice.id,
                        error = %e,
                        "Content generation failed, falling back to template"
                    );
                }
            }
        }

        from_template(level, channel, &facts)
    }
}

/// Template rendering for one (level, channel)
pub fn from_template(level: EscalationLevel, channel: Channel, facts: &TemplateFacts) -> ComposedMessage {
    let tone = tone_for(level).label.to_string();
    match channel {
        Channel::Email => {
            let template = email_template(level, facts, None);
            ComposedMessage {
                subject: Some(template.subject),
                body: template.text,
                html: Some(template.html),
                tone,
                suggested_action: None,
                ai_generated: false,
            }
        }
        Channel::Sms => ComposedMessage {
            subject: None,
            body: sms_template(level, facts),
            html: None,
            tone,
            suggested_action: None,
            ai_generated: false,
        },
        Channel::Whatsapp => ComposedMessage {
            subject: None,
            body: whatsapp_template(level, facts),
            html: None,
            tone,
            suggested_action: None,
            ai_generated: false,
        },
    }
}

fn from_generated(
    generated: GeneratedReminder,
    level: EscalationLevel,
    channel: Channel,
    facts: &TemplateFacts,
) -> ComposedMessage {
    let mut message = generated.message.trim().to_string();
    if !message.contains(&facts.invoice_number) || !message.contains(&facts.amount) {
        message.push_str(&format!(
            "\n\nReference: invoice {} for {}, due {}.",
            facts.invoice_number, facts.amount, facts.due_date
        ));
    }

    let tone = if generated.tone.trim().is_empty() {
        tone_for(level).label.to_string()
    } else {
        generated.tone
    };

    match channel {
        Channel::Email => {
            let template = email_template(level, facts, Some(&message));
            let subject = if generated.subject.trim().is_empty() {
                template.subject
            } else {
                generated.subject.trim().to_string()
            };
            ComposedMessage {
                subject: Some(subject),
                body: template.text,
                html: Some(template.html),
                tone,
                suggested_action: generated.suggested_action,
                ai_generated: true,
            }
        }
        Channel::Sms | Channel::Whatsapp => {
            if let Some(url) = &facts.payment_url {
                message.push_str(&format!("\n\nPay: {}", url));
            }
            ComposedMessage {
                subject: None,
                body: message,
                html: None,
                tone,
                suggested_action: generated.suggested_action,
                ai_generated: true,
            }
        }
    }
}
