use domain_billing::{Client, PaymentHistory};

use crate::tone::tone_for;

use super::ReminderContext;

pub const SYSTEM_PROMPT: &str = "You are a helpful assistant that generates professional payment reminder emails. Always respond with valid JSON.";

/// One or two sentences on the client's payment record
pub fn history_summary(client: Option<&Client>) -> String {
    let Some(client) = client else {
        return "No previous interaction history available.".to_string();
    };
    if client.history_notes.is_empty() {
        return "This is a new client with no payment history.".to_string();
    }

    let history = PaymentHistory::from_notes(&client.history_notes);
    let mut summary = format!("Client has {} previous payment(s).", history.payment_count);
    match history.average_days_late {
        Some(avg) => summary.push_str(&format!(
            " {} were late (avg {} days late).",
            history.late_count,
            avg.round() as i64
        )),
        None if history.payment_count > 0 => {
            summary.push_str(" All previous payments were on time.")
        }
        None => {}
    }
    summary
}

/// User prompt for a reminder
pub fn build_prompt(context: &ReminderContext) -> String {
    let tone = tone_for(context.level);
    let description = context
        .description
        .as_deref()
        .unwrap_or("Professional services");

    format!(
        r#"You are helping a freelancer or small business owner send payment reminders. Generate a personalized reminder for an unpaid invoice.

INVOICE DETAILS:
- Invoice Number: {number}
- Amount: {amount}
- Due Date: {due}
- Description: {description}

CLIENT INFO:
- Name: {client}
- {history}

ESCALATION LEVEL: {level}/3 ({urgency})
TONE: {tone}
OBJECTIVE: {objective}

Generate a reminder with:
1. A compelling subject line (max 60 chars)
2. A personalized message body (2-3 paragraphs, professional) that states the invoice number and the amount exactly as written above
3. If the client has late payment history, subtly reference wanting to maintain a good relationship
4. For level 3, mention potential late fees or next steps

Respond in JSON format:
{{
  "subject": "Subject line here",
  "message": "Full email body here",
  "tone": "{label}",
  "suggestedAction": "Optional suggestion for the sender"
}}"#,
        number = context.invoice_number,
        amount = context.amount,
        due = context.due_date,
        description = description,
        client = context.client_name,
        history = context.history_summary,
        level = context.level.number(),
        urgency = tone.urgency,
        tone = tone.tone,
        objective = tone.objective,
        label = tone.label,
    )
}
