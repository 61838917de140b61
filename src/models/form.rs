//! Nomination criteria forms
//!
//! A form is the question set a nomination must answer. Forms are global
//! (not tied to a cycle); names are unique among active forms. Once a
//! submitted nomination references a form, fields change only through the
//! replace-all update.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Form {
    pub id: Uuid,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// One question on a form
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormField {
    pub id: Uuid,
    pub form_id: Uuid,
    pub label: String,
    /// Stable key answers are recorded under; unique within the form
    pub field_key: String,
    /// Free-form type tag: TEXT, SELECT, RATING, ...
    pub field_type: String,
    pub is_required: bool,
    pub order_index: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation: Option<serde_json::Value>,
}

/// One recorded answer on a nomination
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormAnswer {
    pub field_key: String,
    pub value: serde_json::Value,
}

/// Field definition supplied when creating or replacing form fields
#[derive(Debug, Clone, Deserialize)]
pub struct FieldSpec {
    pub label: String,
    pub field_key: String,
    pub field_type: String,
    #[serde(default)]
    pub is_required: bool,
    /// Zero means "use list position"
    #[serde(default)]
    pub order_index: i64,
    pub options: Option<serde_json::Value>,
    pub validation: Option<serde_json::Value>,
}

impl FieldSpec {
    /// Resolve the effective order index for a field at list position `idx`.
    pub fn effective_order(&self, idx: usize) -> i64 {
        if self.order_index > 0 {
            self.order_index
        } else {
            idx as i64
        }
    }
}

/// Returns the first duplicated field_key, if any.
pub fn find_duplicate_key(fields: &[FieldSpec]) -> Option<&str> {
    let mut seen = std::collections::HashSet::new();
    fields
        .iter()
        .find(|f| !seen.insert(f.field_key.as_str()))
        .map(|f| f.field_key.as_str())
}

#[derive(Debug, Deserialize)]
pub struct CreateFormRequest {
    pub name: String,
    pub description: Option<String>,
    pub fields: Vec<FieldSpec>,
}

/// Replace-all update: the field list supplied here becomes the form's
/// entire field set.
#[derive(Debug, Deserialize)]
pub struct UpdateFormRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub fields: Vec<FieldSpec>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(key: &str, order: i64) -> FieldSpec {
        FieldSpec {
            label: key.to_uppercase(),
            field_key: key.to_string(),
            field_type: "TEXT".to_string(),
            is_required: false,
            order_index: order,
            options: None,
            validation: None,
        }
    }

    #[test]
    fn test_find_duplicate_key() {
        let fields = vec![spec("a", 0), spec("b", 0), spec("a", 0)];
        assert_eq!(find_duplicate_key(&fields), Some("a"));
    }

    #[test]
    fn test_find_duplicate_key_none() {
        let fields = vec![spec("a", 0), spec("b", 0)];
        assert_eq!(find_duplicate_key(&fields), None);
        assert_eq!(find_duplicate_key(&[]), None);
    }

    #[test]
    fn test_effective_order_falls_back_to_position() {
        assert_eq!(spec("a", 0).effective_order(3), 3);
        assert_eq!(spec("a", 7).effective_order(3), 7);
    }
}
