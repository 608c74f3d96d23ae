//! Prompt formatting for recalled records.

use crate::model::MemoryRecord;

/// Text returned by [`format_context`] when nothing was recalled.
pub const NO_HISTORY_SENTINEL: &str = "No relevant conversation history found.";

/// Format recalled records as `ROLE: content` lines, in the given order.
pub fn format_context(records: &[MemoryRecord]) -> String {
    if records.is_empty() {
        return NO_HISTORY_SENTINEL.to_string();
    }
    records
        .iter()
        .map(|record| {
            format!(
                "{}: {}",
                record.role.as_str().to_uppercase(),
                record.content
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::{NO_HISTORY_SENTINEL, format_context};
    use crate::model::{MemoryRecord, Role};
    use chrono::Utc;
    use pretty_assertions::assert_eq;
    use uuid::Uuid;

    fn record(role: Role, content: &str) -> MemoryRecord {
        MemoryRecord {
            id: Uuid::new_v4(),
            session_id: Uuid::nil(),
            role,
            content: content.to_string(),
            created_at: Utc::now(),
            seq: 0,
        }
    }

    #[test]
    fn empty_input_yields_sentinel() {
        assert_eq!(format_context(&[]), NO_HISTORY_SENTINEL);
    }

    #[test]
    fn records_are_joined_in_order() {
        let records = vec![
            record(Role::Assistant, "hi there"),
            record(Role::User, "how are you"),
            record(Role::Other("critic".to_string()), "too short"),
        ];
        assert_eq!(
            format_context(&records),
            "ASSISTANT: hi there\nUSER: how are you\nCRITIC: too short"
        );
    }
}
