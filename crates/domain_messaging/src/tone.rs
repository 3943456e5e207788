//! Tone profiles per escalation level

use domain_billing::EscalationLevel;

/// How a reminder at a given level should read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToneProfile {
    /// Short label stored with generated content
    pub label: &'static str,
    pub tone: &'static str,
    pub urgency: &'static str,
    pub objective: &'static str,
}

pub fn tone_for(level: EscalationLevel) -> ToneProfile {
    match level {
        EscalationLevel::Polite => ToneProfile {
            label: "polite",
            tone: "polite and friendly",
            urgency: "gentle nudge",
            objective: "kindly remind them of the upcoming or recent due date",
        },
        EscalationLevel::Firm => ToneProfile {
            label: "firm",
            tone: "professional but firm",
            urgency: "important follow-up",
            objective: "emphasize the importance of timely payment and potential impacts",
        },
        EscalationLevel::Urgent => ToneProfile {
            label: "urgent",
            tone: "urgent and direct",
            urgency: "final notice",
            objective: "warn about late fees, service suspension, or collection actions",
        },
    }
}
