//! Wire message ↔ backend turn translation.

use gembridge_core::BackendMessage;

use crate::models::ChatMessage;

/// Convert wire messages into backend turns, preserving order.
///
/// system → `System`, user → `Human`, assistant → `Assistant`. Roles have
/// already been validated by the contract layer, so the mapping is total.
pub fn to_backend_messages(messages: &[ChatMessage]) -> Vec<BackendMessage> {
    messages
        .iter()
        .map(|m| BackendMessage::new(m.role, m.content.clone()))
        .collect()
}

/// Convert backend output text into wire content. No escaping or truncation.
pub fn from_backend_text(text: String) -> String {
    text
}
