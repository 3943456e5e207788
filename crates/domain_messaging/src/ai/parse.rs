use super::GeneratedReminder;
use crate::error::AiError;

/// Extracts the first JSON object from a provider reply
///
/// Replies often wrap the object in a markdown code fence or add a sentence
/// around it; everything outside the outermost braces is ignored.
pub fn parse_generated(raw: &str) -> Result<GeneratedReminder, AiError> {
    let start = raw.find('{').ok_or(AiError::EmptyResponse)?;
    let end = raw
        .rfind('}')
        .filter(|end| *end > start)
        .ok_or_else(|| AiError::Parse("unterminated JSON object".to_string()))?;

    let generated: GeneratedReminder = serde_json::from_str(&raw[start..=end])
        .map_err(|e| AiError::Parse(e.to_string()))?;

    if generated.message.trim().is_empty() {
        return Err(AiError::Parse("message is empty".to_string()));
    }
    Ok(generated)
}
