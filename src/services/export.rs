use crate::models::{Conversation, Message, Role, SourceCitation};

pub fn export_to_markdown(
    conversation: Option<&Conversation>,
    messages: &[Message],
    sources: &[SourceCitation],
) -> String {
    let title = conversation.map_or("New conversation", |c| c.display_title());
    let mut output = format!("# {}\n\n", title);
    if let Some(conversation) = conversation {
        output.push_str(&format!(
            "> Started: {} | Updated: {}\n\n",
            conversation.created_at.format("%Y-%m-%d %H:%M"),
            conversation.updated_at.format("%Y-%m-%d %H:%M")
        ));
    }

    output.push_str("---\n\n");

    for msg in messages {
        let role_label = match msg.role {
            Role::User => "You",
            Role::Assistant => "Insight",
            Role::System => "System",
        };
        output.push_str(&format!("### {}\n\n{}\n\n", role_label, msg.content));
        if !msg.citations.is_empty() {
            output.push_str(&format!("_Cited: {}_\n\n", msg.citations.join(", ")));
        }
    }

    if !sources.is_empty() {
        output.push_str("## Sources\n\n");
        for (i, source) in sources.iter().enumerate() {
            output.push_str(&format!(
                "{}. **{}** ({}, {}) {:.0}% match\n",
                i + 1,
                source.title,
                source.practice_area,
                source.content_type,
                source.similarity * 100.0
            ));
        }
        output.push('\n');
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_export_includes_transcript_and_sources() {
        let conversation = Conversation::new("c1", Some("AI Platform Market Analysis".into()));
        let messages = vec![
            Message::pending_user("What is the TAM?").finalized(),
            Message::assistant("$292B by 2030.", vec!["doc-1".into()]),
        ];
        let sources = vec![SourceCitation::new(
            Some("doc-1"),
            "AI Platforms Market Intelligence",
            "AI Platforms",
            "market_data",
            "Market sizing...",
            0.98,
        )];

        let md = export_to_markdown(Some(&conversation), &messages, &sources);
        assert!(md.starts_with("# AI Platform Market Analysis\n"));
        assert!(md.contains("### You\n\nWhat is the TAM?"));
        assert!(md.contains("### Insight\n\n$292B by 2030."));
        assert!(md.contains("_Cited: doc-1_"));
        assert!(md.contains("1. **AI Platforms Market Intelligence** (AI Platforms, market_data) 98% match"));
    }

    #[test]
    fn test_export_without_conversation() {
        let md = export_to_markdown(None, &[], &[]);
        assert_eq!(md, "# New conversation\n\n---\n\n");
    }
}
