use crate::api::ConversationSummary;

/// Picker entry id for the synthetic "start a new conversation" row. Server
/// conversation ids never collide with it.
pub const NEW_CONVERSATION_ID: &str = "+new";

#[derive(Debug, Clone)]
pub struct PickerItem {
    pub id: String,
    pub label: String,
}

#[derive(Debug, Clone)]
pub struct PickerState {
    pub title: String,
    pub items: Vec<PickerItem>,
    pub selected: usize,
}

impl PickerState {
    pub fn new<T: Into<String>>(title: T, items: Vec<PickerItem>, selected: usize) -> Self {
        Self {
            title: title.into(),
            items,
            selected,
        }
    }

    pub fn selected_id(&self) -> Option<&str> {
        self.items.get(self.selected).map(|i| i.id.as_str())
    }

    pub fn move_up(&mut self) {
        if !self.items.is_empty() {
            if self.selected == 0 {
                self.selected = self.items.len() - 1;
            } else {
                self.selected -= 1;
            }
        }
    }

    pub fn move_down(&mut self) {
        if !self.items.is_empty() {
            self.selected = (self.selected + 1) % self.items.len();
        }
    }

    /// Drop the item with the given id, keeping the selection on a valid
    /// row. Used after a conversation is deleted from inside the picker.
    pub fn remove_item(&mut self, id: &str) {
        self.items.retain(|item| item.id != id);
        if self.selected >= self.items.len() && !self.items.is_empty() {
            self.selected = self.items.len() - 1;
        }
    }
}

/// Build the conversation picker from the server's listing. The first row
/// always starts a fresh conversation; the current one is preselected when
/// it appears in the listing.
pub fn conversation_picker(
    summaries: &[ConversationSummary],
    active_id: Option<&str>,
) -> PickerState {
    let mut items = Vec::with_capacity(summaries.len() + 1);
    items.push(PickerItem {
        id: NEW_CONVERSATION_ID.to_string(),
        label: "[ New conversation ]".to_string(),
    });
    for summary in summaries {
        items.push(PickerItem {
            id: summary.id.clone(),
            label: conversation_label(summary),
        });
    }
    let selected = active_id
        .and_then(|id| items.iter().position(|item| item.id == id))
        .unwrap_or(0);
    PickerState::new("Conversations", items, selected)
}

fn conversation_label(summary: &ConversationSummary) -> String {
    let stamp = summary
        .updated_at
        .unwrap_or(summary.created_at)
        .format("%Y-%m-%d %H:%M");
    format!("{}  ({stamp})", summary.title)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn summary(id: &str, title: &str) -> ConversationSummary {
        ConversationSummary {
            id: id.to_string(),
            title: title.to_string(),
            created_at: Utc.with_ymd_and_hms(2025, 11, 3, 9, 12, 0).unwrap(),
            updated_at: None,
        }
    }

    #[test]
    fn new_conversation_row_comes_first() {
        let picker = conversation_picker(&[summary("conv-1", "Dachausbau")], None);
        assert_eq!(picker.items.len(), 2);
        assert_eq!(picker.selected_id(), Some(NEW_CONVERSATION_ID));
        assert!(picker.items[1].label.starts_with("Dachausbau"));
        assert!(picker.items[1].label.contains("2025-11-03"));
    }

    #[test]
    fn active_conversation_is_preselected() {
        let picker = conversation_picker(
            &[summary("conv-1", "Dachausbau"), summary("conv-2", "Keller")],
            Some("conv-2"),
        );
        assert_eq!(picker.selected_id(), Some("conv-2"));
    }

    #[test]
    fn selection_wraps_both_ways() {
        let mut picker = conversation_picker(&[summary("conv-1", "Dachausbau")], None);
        picker.move_up();
        assert_eq!(picker.selected_id(), Some("conv-1"));
        picker.move_down();
        assert_eq!(picker.selected_id(), Some(NEW_CONVERSATION_ID));
    }

    #[test]
    fn remove_item_keeps_selection_in_bounds() {
        let mut picker = conversation_picker(
            &[summary("conv-1", "Dachausbau"), summary("conv-2", "Keller")],
            Some("conv-2"),
        );
        picker.remove_item("conv-2");
        assert_eq!(picker.items.len(), 2);
        assert!(picker.selected < picker.items.len());
        assert!(picker.selected_id().is_some());
    }
}
