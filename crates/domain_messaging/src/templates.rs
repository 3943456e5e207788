//! Deterministic reminder templates
//!
//! One template per (escalation level × channel). Email gets a subject, an
//! HTML body and a plain-text body; SMS and WhatsApp get a short text, the
//! WhatsApp variant a little friendlier. Every template names the invoice
//! number and the formatted amount.

use domain_billing::{Client, EscalationLevel, Invoice};

use crate::format::{escape_html, format_date};

const FALLBACK_CLIENT_NAME: &str = "Valued Client";

/// The invoice facts every template draws from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateFacts {
    pub invoice_number: String,
    pub amount: String,
    pub due_date: String,
    pub description: Option<String>,
    pub client_name: String,
    pub first_name: String,
    pub business_name: Option<String>,
    pub payment_url: Option<String>,
}

impl TemplateFacts {
    pub fn new(invoice: &Invoice, client: Option<&Client>, business_name: Option<&str>) -> Self {
        let client_name = client
            .map(|c| c.name.clone())
            .unwrap_or_else(|| FALLBACK_CLIENT_NAME.to_string());
        let first_name = client
            .map(|c| c.first_name().to_string())
            .unwrap_or_else(|| "there".to_string());

        Self {
            invoice_number: invoice.invoice_number.clone(),
            amount: invoice.amount.format(),
            due_date: format_date(invoice.due_date),
            description: invoice.description.clone(),
            client_name,
            first_name,
            business_name: business_name.map(str::to_string),
            payment_url: invoice.payment_url.clone(),
        }
    }

    fn sender(&self) -> &str {
        self.business_name.as_deref().unwrap_or("us")
    }
}

/// Email subject and bodies
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailTemplate {
    pub subject: String,
    pub html: String,
    pub text: String,
}

struct EmailStyle {
    accent: &'static str,
    panel: &'static str,
    due_label: &'static str,
}

fn style_for(level: EscalationLevel) -> EmailStyle {
    match level {
        EscalationLevel::Polite => EmailStyle {
            accent: "#10b981",
            panel: "#f0fdf4",
            due_label: "Due Date",
        },
        EscalationLevel::Firm => EmailStyle {
            accent: "#f59e0b",
            panel: "#fef3c7",
            due_label: "Original Due Date",
        },
        EscalationLevel::Urgent => EmailStyle {
            accent: "#dc2626",
            panel: "#fef2f2",
            due_label: "Overdue Since",
        },
    }
}

/// Subject line for an email reminder
pub fn email_subject(level: EscalationLevel, invoice_number: &str) -> String {
    match level {
        EscalationLevel::Polite => format!("Friendly Reminder: Invoice {} Due", invoice_number),
        EscalationLevel::Firm => format!("Important: Invoice {} Payment Overdue", invoice_number),
        EscalationLevel::Urgent => format!("URGENT: Final Notice for Invoice {}", invoice_number),
    }
}

fn paragraphs(level: EscalationLevel, facts: &TemplateFacts) -> Vec<String> {
    let number = &facts.invoice_number;
    let amount = &facts.amount;
    let due = &facts.due_date;
    match level {
        EscalationLevel::Polite => vec![
            format!(
                "This is a friendly reminder from {} that invoice {} for {} is due on {}.",
                facts.sender(),
                number,
                amount,
                due
            ),
            "If you've already sent payment, please disregard this message. Otherwise, I would appreciate it if you could process the payment at your earliest convenience.".to_string(),
            "Please don't hesitate to reach out if you have any questions.".to_string(),
        ],
        EscalationLevel::Firm => vec![
            format!("I'm following up regarding invoice {} for {}, which was due on {} and is now overdue.", number, amount, due),
            "Timely payments help us maintain our service quality and continue our professional relationship. Please process the payment within the next 7 days to avoid any service impacts.".to_string(),
            "If there are any issues with the invoice, please contact me immediately so we can resolve them.".to_string(),
        ],
        EscalationLevel::Urgent => vec![
            format!("FINAL NOTICE: invoice {} for {} has been overdue since {} and remains unpaid.", number, amount, due),
            "Despite our previous reminders, we have not received payment. Continued non-payment may result in late fees being applied to your account, suspension of services, or referral to a collection agency.".to_string(),
            "To avoid these consequences, please process the payment immediately or contact us to discuss a payment arrangement.".to_string(),
        ],
    }
}

fn closing(level: EscalationLevel) -> &'static str {
    match level {
        EscalationLevel::Polite => "Best regards",
        EscalationLevel::Firm => "Thank you for your attention to this matter.",
        EscalationLevel::Urgent => "This matter requires your urgent attention.",
    }
}

/// Email template for a level; `custom_body` replaces the standard wording
pub fn email_template(
    level: EscalationLevel,
    facts: &TemplateFacts,
    custom_body: Option<&str>,
) -> EmailTemplate {
    let style = style_for(level);

    let body_paragraphs: Vec<String> = match custom_body {
        Some(body) => body
            .split("\n\n")
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .collect(),
        None => {
            let mut p = vec![format!("Dear {},", facts.client_name)];
            p.extend(paragraphs(level, facts));
            p.push(closing(level).to_string());
            p
        }
    };

    let mut text = body_paragraphs.join("\n\n");
    if let Some(url) = &facts.payment_url {
        text.push_str(&format!("\n\nPay online: {}", url));
    }

    let html = render_html(&style, facts, &body_paragraphs);

    EmailTemplate {
        subject: email_subject(level, &facts.invoice_number),
        html,
        text,
    }
}

fn render_html(style: &EmailStyle, facts: &TemplateFacts, body: &[String]) -> String {
    let mut content = String::new();
    for paragraph in body {
        content.push_str(&format!(
            "<p style=\"margin: 0 0 20px 0; color: #374151; font-size: 16px; line-height: 1.6;\">{}</p>\n",
            escape_html(paragraph).replace('\n', "<br>")
        ));
    }

    let pay_button = facts
        .payment_url
        .as_deref()
        .map(|url| {
            format!(
                "<p style=\"margin: 20px 0; text-align: center;\"><a href=\"{}\" style=\"background-color: {}; color: #ffffff; padding: 12px 24px; border-radius: 6px; text-decoration: none; font-weight: 600;\">Pay Now</a></p>\n",
                escape_html(url),
                style.accent
            )
        })
        .unwrap_or_default();

    let footer = facts
        .business_name
        .as_deref()
        .map(|name| {
            format!(
                "<p style=\"margin: 0; color: #374151; font-size: 14px;\">Sent on behalf of <strong>{}</strong></p>",
                escape_html(name)
            )
        })
        .unwrap_or_default();

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head><meta charset="UTF-8"><title>Invoice Reminder</title></head>
<body style="margin: 0; padding: 0; font-family: 'Segoe UI', Tahoma, sans-serif; background-color: #f4f4f5;">
<table role="presentation" style="width: 600px; max-width: 100%; margin: 40px auto; background-color: #ffffff; border-top: 6px solid {accent};">
<tr><td style="padding: 40px;">
{content}<div style="background-color: {panel}; border-radius: 8px; padding: 20px; margin: 20px 0;">
<table style="width: 100%; border-collapse: collapse;">
<tr><td style="color: #6b7280;">Invoice Number:</td><td style="text-align: right; font-weight: 600;">{number}</td></tr>
<tr><td style="color: #6b7280;">Amount Due:</td><td style="text-align: right; font-weight: 700; color: {accent};">{amount}</td></tr>
<tr><td style="color: #6b7280;">{due_label}:</td><td style="text-align: right; font-weight: 600;">{due}</td></tr>
</table>
</div>
{pay_button}</td></tr>
<tr><td style="background-color: #f9fafb; padding: 20px 40px; text-align: center;">{footer}</td></tr>
</table>
</body>
</html>"#,
        accent = style.accent,
        panel = style.panel,
        content = content,
        number = escape_html(&facts.invoice_number),
        amount = escape_html(&facts.amount),
        due_label = style.due_label,
        due = escape_html(&facts.due_date),
        pay_button = pay_button,
        footer = footer,
    )
}

/// Short SMS text for a level
pub fn sms_template(level: EscalationLevel, facts: &TemplateFacts) -> String {
    let name = &facts.first_name;
    let number = &facts.invoice_number;
    let amount = &facts.amount;
    let mut message = match level {
        EscalationLevel::Polite => format!(
            "{}, this is a friendly reminder about invoice {} ({}). Please process payment at your convenience. Questions? Reply to this message.",
            name, number, amount
        ),
        EscalationLevel::Firm => format!(
            "{}, invoice {} ({}) is now overdue. Please process payment within 7 days to avoid service impacts. Contact us if you need assistance.",
            name, number, amount
        ),
        EscalationLevel::Urgent => format!(
            "URGENT: {}, invoice {} ({}) requires immediate attention. Late fees may apply. Please pay now or contact us immediately.",
            name, number, amount
        ),
    };
    if let Some(url) = &facts.payment_url {
        message.push_str(&format!(" Pay: {}", url));
    }
    message
}

/// WhatsApp text for a level
pub fn whatsapp_template(level: EscalationLevel, facts: &TemplateFacts) -> String {
    let name = &facts.first_name;
    let number = &facts.invoice_number;
    let amount = &facts.amount;
    let mut message = match level {
        EscalationLevel::Polite => format!(
            "Hi {}! 👋\n\nJust a friendly reminder about invoice {} for {}.\n\nPlease let me know if you have any questions! 🙏",
            name, number, amount
        ),
        EscalationLevel::Firm => format!(
            "Hi {},\n\nI wanted to follow up on invoice {} ({}), which is now overdue.\n\nCould you please process the payment this week? If there are any issues, I'm happy to discuss. 🤝",
            name, number, amount
        ),
        EscalationLevel::Urgent => format!(
            "Hi {},\n\n⚠️ URGENT: Invoice {} ({}) needs immediate attention.\n\nPlease process payment today to avoid late fees. Call or message me if you need to discuss a payment plan.",
            name, number, amount
        ),
    };
    if let Some(url) = &facts.payment_url {
        message.push_str(&format!("\n\nPay here: {}", url));
    }
    message
}
