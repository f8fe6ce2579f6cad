//! Workspace data model and identifier canonicalization
//!
//! Gameplan serializes workspace identifiers as either JSON numbers or
//! strings depending on the endpoint. [`WorkspaceId`] is the one place that
//! reconciles the two: every id that enters the crate, whether from a
//! response body or from a caller, goes through [`WorkspaceId::canonical`]
//! or [`WorkspaceId::parse`].

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use std::collections::HashMap;
use std::fmt;

/// Unread discussion count per integer workspace key
pub type UnreadCounts = HashMap<i64, u64>;

/// Canonical workspace identifier
///
/// Integer ids are stored in plain decimal form (`7`, never `"07"` or
/// `7.0`); any other id is stored trimmed. An id is never empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct WorkspaceId(String);

impl WorkspaceId {
    /// Canonicalize a textual id. Blank input has no id.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        if let Ok(n) = trimmed.parse::<i64>() {
            return Some(Self(n.to_string()));
        }
        let integral = trimmed.parse::<f64>().ok().and_then(integral_to_id);
        Some(Self(integral.unwrap_or_else(|| trimmed.to_string())))
    }

    /// Canonicalize an id as it appears on the wire
    pub fn canonical(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Self::parse(s),
            Value::Number(n) => Some(Self(number_to_id(n)?)),
            _ => None,
        }
    }

    /// Integer key used by the unread-count map, if the id is numeric
    pub fn as_key(&self) -> Option<i64> {
        self.0.parse().ok()
    }

    /// The canonical string form
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn number_to_id(n: &Number) -> Option<String> {
    if let Some(i) = n.as_i64() {
        return Some(i.to_string());
    }
    if let Some(u) = n.as_u64() {
        return Some(u.to_string());
    }
    let f = n.as_f64()?;
    Some(integral_to_id(f).unwrap_or_else(|| n.to_string()))
}

/// Decimal form of a float that holds an exact integer
fn integral_to_id(f: f64) -> Option<String> {
    (f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64)
        .then(|| (f as i64).to_string())
}

impl fmt::Display for WorkspaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<i64> for WorkspaceId {
    fn from(n: i64) -> Self {
        Self(n.to_string())
    }
}

impl AsRef<str> for WorkspaceId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for WorkspaceId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Self::canonical(&value)
            .ok_or_else(|| de::Error::custom(format!("invalid workspace id: {}", value)))
    }
}

/// Workspace member
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    /// User id (email) of the member
    pub user: String,
}

/// A workspace with its members
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workspace {
    pub id: WorkspaceId,
    pub title: String,
    pub icon: Option<String>,
    pub owner_team: Option<String>,
    pub archived_at: Option<String>,
    pub is_private: bool,
    pub last_modified: Option<String>,
    pub task_count: u64,
    pub discussion_count: u64,
    pub members: Vec<Member>,
}

impl Workspace {
    /// Whether the workspace has been archived
    pub fn is_archived(&self) -> bool {
        self.archived_at.is_some()
    }
}

/// Workspace record as returned by `get_gp_projects_with_members`
#[derive(Debug, Clone, Deserialize)]
pub struct RawWorkspace {
    #[serde(default)]
    pub name: Value,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub team: Value,
    #[serde(default)]
    pub archived_at: Option<String>,
    #[serde(default, deserialize_with = "flag")]
    pub is_private: bool,
    #[serde(default)]
    pub modified: Option<String>,
    #[serde(default)]
    pub tasks_count: Option<u64>,
    #[serde(default)]
    pub discussions_count: Option<u64>,
    #[serde(default)]
    pub members: Vec<Member>,
}

impl RawWorkspace {
    /// Convert to a [`Workspace`], canonicalizing ids
    pub fn into_workspace(self) -> Result<Workspace, String> {
        let id = WorkspaceId::canonical(&self.name)
            .ok_or_else(|| format!("workspace has no usable id: {}", self.name))?;
        let owner_team = WorkspaceId::canonical(&self.team).map(|team| team.0);

        Ok(Workspace {
            id,
            title: self.title.unwrap_or_default(),
            icon: self.icon.filter(|icon| !icon.is_empty()),
            owner_team,
            archived_at: self.archived_at,
            is_private: self.is_private,
            last_modified: self.modified,
            task_count: self.tasks_count.unwrap_or(0),
            discussion_count: self.discussions_count.unwrap_or(0),
            members: self.members,
        })
    }
}

/// Frappe check fields arrive as 0/1, occasionally as booleans or strings.
fn flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Bool(b) => b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => matches!(s.trim(), "1" | "true" | "True"),
        _ => false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_canonicalizes_integers() {
        assert_eq!(WorkspaceId::parse("2").unwrap().as_str(), "2");
        assert_eq!(WorkspaceId::parse(" 007 ").unwrap().as_str(), "7");
        assert_eq!(WorkspaceId::parse("+12").unwrap().as_str(), "12");
        assert_eq!(WorkspaceId::parse("design").unwrap().as_str(), "design");
    }

    #[test]
    fn parse_agrees_with_canonical_on_floats() {
        for (text, number) in [("2.0", json!(2.0)), (" 7.00 ", json!(7.0)), ("2.5", json!(2.5))] {
            assert_eq!(WorkspaceId::parse(text), WorkspaceId::canonical(&number));
        }
        assert_eq!(WorkspaceId::parse("2.0").unwrap().as_key(), Some(2));
        assert_eq!(WorkspaceId::parse("NaN").unwrap().as_str(), "NaN");
    }

    #[test]
    fn parse_rejects_blank() {
        assert!(WorkspaceId::parse("").is_none());
        assert!(WorkspaceId::parse("   ").is_none());
    }

    #[test]
    fn canonical_number_matches_string() {
        assert_eq!(
            WorkspaceId::canonical(&json!(2)),
            WorkspaceId::canonical(&json!("2"))
        );
        assert_eq!(WorkspaceId::canonical(&json!(2.0)).unwrap().as_str(), "2");
        assert!(WorkspaceId::canonical(&json!(null)).is_none());
        assert!(WorkspaceId::canonical(&json!({"id": 1})).is_none());
    }

    #[test]
    fn as_key_only_for_numeric_ids() {
        assert_eq!(WorkspaceId::from(42).as_key(), Some(42));
        assert_eq!(WorkspaceId::parse("eng").unwrap().as_key(), None);
    }

    #[test]
    fn deserialize_accepts_mixed_ids() {
        let ids: Vec<WorkspaceId> = serde_json::from_value(json!([1, "2", " 3 "])).unwrap();
        let ids: Vec<&str> = ids.iter().map(WorkspaceId::as_str).collect();
        assert_eq!(ids, ["1", "2", "3"]);

        assert!(serde_json::from_value::<WorkspaceId>(json!("")).is_err());
    }

    #[test]
    fn raw_workspace_maps_wire_fields() {
        let raw: RawWorkspace = serde_json::from_value(json!({
            "name": 4,
            "title": "Eng",
            "icon": "",
            "team": 9,
            "archived_at": null,
            "is_private": 1,
            "modified": "2024-05-01 10:00:00.000000",
            "tasks_count": 12,
            "discussions_count": null,
            "members": [{"user": "a@example.com"}]
        }))
        .unwrap();

        let workspace = raw.into_workspace().unwrap();
        assert_eq!(workspace.id.as_str(), "4");
        assert_eq!(workspace.title, "Eng");
        assert_eq!(workspace.icon, None);
        assert_eq!(workspace.owner_team.as_deref(), Some("9"));
        assert!(workspace.is_private);
        assert!(!workspace.is_archived());
        assert_eq!(workspace.task_count, 12);
        assert_eq!(workspace.discussion_count, 0);
        assert_eq!(workspace.members[0].user, "a@example.com");
    }

    #[test]
    fn raw_workspace_without_id_is_rejected() {
        let raw: RawWorkspace = serde_json::from_value(json!({"title": "Orphan"})).unwrap();
        assert!(raw.into_workspace().is_err());
    }
}
