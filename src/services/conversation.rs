use crate::models::{Conversation, Message};

const TITLE_MAX_CHARS: usize = 50;

/// Truncate text to a short title for conversations.
pub fn truncate_title(text: &str) -> String {
    let trimmed = text.trim();
    let first_line = trimmed.lines().next().unwrap_or(trimmed);
    if first_line.chars().count() > TITLE_MAX_CHARS {
        let head: String = first_line.chars().take(TITLE_MAX_CHARS - 3).collect();
        format!("{}...", head.trim_end())
    } else {
        first_line.to_string()
    }
}

/// Put `conversation` at the head of `list`, dropping any older entry with
/// the same id so ids stay unique.
pub fn prepend_unique(list: &mut Vec<Conversation>, conversation: Conversation) {
    list.retain(|c| c.id != conversation.id);
    list.insert(0, conversation);
}

/// Replace the pending message `pending_id` with its finalized form, keeping
/// its position. Returns false when the message is no longer in the list.
pub fn finalize_pending(messages: &mut [Message], pending_id: &str) -> bool {
    match messages.iter_mut().find(|m| m.id == pending_id) {
        Some(slot) => {
            *slot = slot.finalized();
            true
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_title_untouched() {
        assert_eq!(truncate_title("What is the TAM?"), "What is the TAM?");
    }

    #[test]
    fn test_long_title_truncated_on_char_boundary() {
        let text = "é".repeat(80);
        let title = truncate_title(&text);
        assert!(title.ends_with("..."));
        assert_eq!(title.chars().count(), 50);
    }

    #[test]
    fn test_title_uses_first_line() {
        assert_eq!(truncate_title("  Cloud GTM\nmore detail"), "Cloud GTM");
    }

    #[test]
    fn test_prepend_keeps_ids_unique() {
        let mut list = vec![
            Conversation::new("a", None),
            Conversation::new("b", None),
        ];
        prepend_unique(&mut list, Conversation::new("b", Some("renamed".into())));
        let ids: Vec<_> = list.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);
        assert_eq!(list[0].title.as_deref(), Some("renamed"));
    }

    #[test]
    fn test_finalize_pending_in_place() {
        let pending = Message::pending_user("hello");
        let mut messages = vec![pending.clone()];
        assert!(finalize_pending(&mut messages, &pending.id));
        assert!(!messages[0].is_pending());
        assert_eq!(messages[0].content, "hello");
        assert!(!finalize_pending(&mut messages, &pending.id));
    }
}
