//! Bucket-list items and their field normalization.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Result, StoreError};

/// Globally unique item identifier (UUID v4).
pub type ItemId = Uuid;

/// A single bucket-list entry.
///
/// `completed_at` is present exactly when `completed` is true. The pair is
/// only written through [`Item::set_completed`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: ItemId,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

/// Caller-supplied fields for a new item, before validation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NewItem {
    pub title: String,
    pub description: Option<String>,
}

impl NewItem {
    pub fn new(title: impl Into<String>, description: Option<&str>) -> Self {
        Self {
            title: title.into(),
            description: description.map(str::to_string),
        }
    }
}

impl Item {
    /// Build a fresh, active item stamped with the current time.
    ///
    /// The title is trimmed and must not be empty; a blank description is
    /// stored as absent.
    pub fn new(title: &str, description: Option<&str>) -> Result<Self> {
        Ok(Self {
            id: Uuid::new_v4(),
            title: normalize_title(title)?,
            description: normalize_description(description),
            completed: false,
            created_at: Utc::now(),
            completed_at: None,
        })
    }

    /// Set the completion flag, keeping `completed_at` coupled to it.
    ///
    /// Returns whether the flag changed. Setting the current value again
    /// leaves the timestamp untouched.
    pub fn set_completed(&mut self, completed: bool) -> bool {
        if self.completed == completed {
            return false;
        }
        self.completed = completed;
        self.completed_at = completed.then(Utc::now);
        true
    }

    /// Check the per-item invariants a decoded item must satisfy.
    pub fn check_invariants(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(StoreError::Validation(format!(
                "item {} has an empty title",
                self.id
            )));
        }
        match (self.completed, self.completed_at.is_some()) {
            (true, false) => Err(StoreError::Validation(format!(
                "item {} is completed but has no completedAt",
                self.id
            ))),
            (false, true) => Err(StoreError::Validation(format!(
                "item {} is not completed but has a completedAt",
                self.id
            ))),
            _ => Ok(()),
        }
    }

    pub fn is_active(&self) -> bool {
        !self.completed
    }
}

/// Trim a title, rejecting one that is empty afterwards.
pub fn normalize_title(title: &str) -> Result<String> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(StoreError::Validation("title must not be empty".into()));
    }
    Ok(trimmed.to_string())
}

/// Trim a description; blank collapses to `None`.
pub fn normalize_description(description: Option<&str>) -> Option<String> {
    description
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_item_is_active_without_completed_at() {
        let item = Item::new("Visit Tokyo", Some("Cherry blossoms in spring")).unwrap();
        assert_eq!(item.title, "Visit Tokyo");
        assert_eq!(item.description.as_deref(), Some("Cherry blossoms in spring"));
        assert!(!item.completed);
        assert!(item.completed_at.is_none());
        assert!(item.check_invariants().is_ok());
    }

    #[test]
    fn new_item_trims_input() {
        let item = Item::new("  Learn to surf \n", Some("   ")).unwrap();
        assert_eq!(item.title, "Learn to surf");
        assert!(item.description.is_none());
    }

    #[test]
    fn blank_title_is_rejected() {
        assert!(matches!(Item::new("", None), Err(StoreError::Validation(_))));
        assert!(matches!(Item::new(" \t ", None), Err(StoreError::Validation(_))));
    }

    #[test]
    fn set_completed_couples_timestamp() {
        let mut item = Item::new("Write a book", None).unwrap();

        assert!(item.set_completed(true));
        assert!(item.completed);
        let stamped = item.completed_at.expect("completed_at set");

        // Same value again keeps the original timestamp
        assert!(!item.set_completed(true));
        assert_eq!(item.completed_at, Some(stamped));

        assert!(item.set_completed(false));
        assert!(!item.completed);
        assert!(item.completed_at.is_none());
    }

    #[test]
    fn invariant_violations_are_reported() {
        let mut item = Item::new("Run a marathon", None).unwrap();
        item.completed = true;
        assert!(item.check_invariants().is_err());

        item.completed = false;
        item.completed_at = Some(Utc::now());
        assert!(item.check_invariants().is_err());
    }

    #[test]
    fn wire_format_uses_camel_case_and_omits_absent_fields() {
        let item = Item::new("Visit Tokyo", None).unwrap();
        let json = serde_json::to_value(&item).unwrap();
        let obj = json.as_object().unwrap();

        assert!(obj.contains_key("createdAt"));
        assert_eq!(obj["id"], serde_json::Value::String(item.id.to_string()));
        assert!(!obj.contains_key("description"));
        assert!(!obj.contains_key("completedAt"));
    }

    #[test]
    fn decodes_record_written_by_hand() {
        let json = r#"{
            "id": "6f1c2a4e-8b1d-4c53-9a57-1f0d2f0b9e11",
            "title": "Learn to surf",
            "description": "Take lessons in Hawaii or California",
            "completed": true,
            "createdAt": "2024-03-01T09:30:00.000Z",
            "completedAt": "2024-06-12T17:05:42.123Z"
        }"#;
        let item: Item = serde_json::from_str(json).unwrap();
        assert!(item.completed);
        assert!(item.completed_at.is_some());
        assert!(item.check_invariants().is_ok());
    }
}
