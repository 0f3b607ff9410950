//! Wire types for the engine backend

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Actions the engine can perform when a gesture is recognized
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GestureAction {
    PrevTab,
    NextTab,
    MediaPause,
    VolumeUp,
    VolumeDown,
    NextTrack,
    PrevTrack,
    OpenApp,
    CloseApp,
}

impl GestureAction {
    pub const ALL: [GestureAction; 9] = [
        GestureAction::PrevTab,
        GestureAction::NextTab,
        GestureAction::MediaPause,
        GestureAction::VolumeUp,
        GestureAction::VolumeDown,
        GestureAction::NextTrack,
        GestureAction::PrevTrack,
        GestureAction::OpenApp,
        GestureAction::CloseApp,
    ];

    /// Wire name, e.g. `media_pause`
    pub fn as_str(&self) -> &'static str {
        match self {
            GestureAction::PrevTab => "prev_tab",
            GestureAction::NextTab => "next_tab",
            GestureAction::MediaPause => "media_pause",
            GestureAction::VolumeUp => "volume_up",
            GestureAction::VolumeDown => "volume_down",
            GestureAction::NextTrack => "next_track",
            GestureAction::PrevTrack => "prev_track",
            GestureAction::OpenApp => "open_app",
            GestureAction::CloseApp => "close_app",
        }
    }
}

impl fmt::Display for GestureAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GestureAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        GestureAction::ALL
            .into_iter()
            .find(|action| action.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| wanted.to_string())
    }
}

/// Action of a gesture as listed by the backend.
///
/// The backend stores whatever action string it was given, so values outside
/// [`GestureAction`] are kept verbatim rather than failing the whole list.
/// New gestures are still checked against [`GestureAction`] before sending.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ListedAction {
    Known(GestureAction),
    Unrecognized(String),
}

impl Default for ListedAction {
    fn default() -> Self {
        ListedAction::Unrecognized(String::new())
    }
}

impl From<GestureAction> for ListedAction {
    fn from(action: GestureAction) -> Self {
        ListedAction::Known(action)
    }
}

impl PartialEq<GestureAction> for ListedAction {
    fn eq(&self, other: &GestureAction) -> bool {
        matches!(self, ListedAction::Known(action) if action == other)
    }
}

impl fmt::Display for ListedAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ListedAction::Known(action) => f.write_str(action.as_str()),
            ListedAction::Unrecognized(raw) => f.write_str(raw),
        }
    }
}

impl Serialize for ListedAction {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ListedAction {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Option::<serde_json::Value>::deserialize(deserializer)?;
        Ok(match value {
            Some(serde_json::Value::String(raw)) => match raw.parse::<GestureAction>() {
                Ok(action) => ListedAction::Known(action),
                Err(_) => ListedAction::Unrecognized(raw),
            },
            Some(serde_json::Value::Null) | None => ListedAction::default(),
            Some(other) => ListedAction::Unrecognized(other.to_string()),
        })
    }
}

/// A gesture definition owned by the backend registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gesture {
    pub id: i64,

    pub name: String,

    #[serde(default)]
    pub action: ListedAction,

    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub description: Option<String>,

    /// Finger count captured by a recording, if the gesture was saved from one
    #[serde(default, deserialize_with = "lenient_finger_count")]
    pub fingers: Option<u8>,
}

/// Body of `POST /api/gestures`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewGesture {
    pub name: String,
    pub action: GestureAction,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fingers: Option<u8>,
}

/// Body of `GET /api/gestures`
#[derive(Debug, Clone, Deserialize)]
pub struct GestureList {
    pub gestures: Vec<Gesture>,
}

/// Body of a successful `POST /api/gestures`
#[derive(Debug, Clone, Deserialize)]
pub struct CreatedGesture {
    #[serde(default)]
    pub success: bool,
    pub gesture: Option<Gesture>,
}

/// Snapshot returned by `GET /api/engine/status`
///
/// Only `last_gesture` and `last_action` drive the display. The other two
/// fields are informational and never change the local run state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct EngineStatus {
    #[serde(default)]
    pub last_gesture: Option<String>,

    #[serde(default)]
    pub last_action: Option<String>,

    #[serde(default)]
    pub status: Option<String>,

    #[serde(default)]
    pub finger_count: Option<i32>,
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.trim().is_empty()))
}

/// The backend stores `fingers` as whatever the client sent: a number,
/// a numeric string, or "" when unset.
fn lenient_finger_count<'de, D>(deserializer: D) -> Result<Option<u8>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => n.as_u64().and_then(|n| u8::try_from(n).ok()),
        Some(serde_json::Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_parse_is_case_insensitive() {
        assert_eq!("VOLUME_UP".parse::<GestureAction>(), Ok(GestureAction::VolumeUp));
        assert_eq!(" open_app ".parse::<GestureAction>(), Ok(GestureAction::OpenApp));
        assert_eq!("fly_away".parse::<GestureAction>(), Err("fly_away".to_string()));
    }

    #[test]
    fn test_gesture_list_tolerates_backend_quirks() {
        let json = r#"{
            "next_id": 4,
            "gestures": [
                {"id": 1, "name": "Fist", "action": "media_pause", "description": "", "fingers": ""},
                {"id": 2, "name": "Peace", "action": "prev_tab", "description": "two up", "fingers": "2"},
                {"id": 3, "name": "Palm", "action": "volume_up", "fingers": 5}
            ]
        }"#;

        let list: GestureList = serde_json::from_str(json).unwrap();
        assert_eq!(list.gestures.len(), 3);
        assert_eq!(list.gestures[0].description, None);
        assert_eq!(list.gestures[0].fingers, None);
        assert_eq!(list.gestures[1].description.as_deref(), Some("two up"));
        assert_eq!(list.gestures[1].fingers, Some(2));
        assert_eq!(list.gestures[2].description, None);
        assert_eq!(list.gestures[2].fingers, Some(5));
    }

    #[test]
    fn test_unexpected_action_does_not_break_the_list() {
        let json = r#"{
            "gestures": [
                {"id": 1, "name": "Snap", "action": "screenshot"},
                {"id": 2, "name": "Fist", "action": "media_pause"},
                {"id": 3, "name": "Odd", "action": 7},
                {"id": 4, "name": "Bare"}
            ]
        }"#;

        let list: GestureList = serde_json::from_str(json).unwrap();
        assert_eq!(list.gestures.len(), 4);
        assert_eq!(
            list.gestures[0].action,
            ListedAction::Unrecognized("screenshot".to_string())
        );
        assert_eq!(list.gestures[0].action.to_string(), "screenshot");
        assert_eq!(list.gestures[1].action, GestureAction::MediaPause);
        assert_eq!(list.gestures[2].action.to_string(), "7");
        assert_eq!(list.gestures[3].action, ListedAction::default());
    }

    #[test]
    fn test_new_gesture_omits_unset_fingers() {
        let body = NewGesture {
            name: "Wave".to_string(),
            action: GestureAction::OpenApp,
            description: String::new(),
            fingers: None,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"name": "Wave", "action": "open_app", "description": ""})
        );
    }

    #[test]
    fn test_status_with_nulls() {
        let status: EngineStatus = serde_json::from_str(
            r#"{"status": "stopped", "last_action": null, "last_gesture": null, "finger_count": -1}"#,
        )
        .unwrap();
        assert_eq!(status.last_action, None);
        assert_eq!(status.last_gesture, None);
        assert_eq!(status.status.as_deref(), Some("stopped"));
        assert_eq!(status.finger_count, Some(-1));
    }
}
