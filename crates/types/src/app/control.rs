// Path: crates/types/src/app/control.rs

use crate::error::BridgeError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Maximum length of a selector accepted from the agent.
pub const MAX_SELECTOR_LEN: usize = 512;
/// Maximum length of a command value (e.g. text to type).
pub const MAX_COMMAND_VALUE_LEN: usize = 16 * 1024;

/// A UI manipulation issued by the agent, e.g. `{"action":"CLICK","selector":"#buy"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ControlCommand {
    /// The action kind (`CLICK`, `TYPE`, ...), interpreted by the renderer.
    pub action: String,
    /// The target element selector.
    pub selector: String,
    /// Optional payload such as the text to type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl ControlCommand {
    /// Field-level validation applied at the boundary before the command is stored.
    pub fn validate(&self) -> Result<(), BridgeError> {
        if self.action.trim().is_empty() {
            return Err(BridgeError::InvalidCommand("action must not be empty".into()));
        }
        if self.selector.trim().is_empty() {
            return Err(BridgeError::InvalidCommand(
                "selector must not be empty".into(),
            ));
        }
        if self.selector.len() > MAX_SELECTOR_LEN {
            return Err(BridgeError::InvalidCommand(format!(
                "selector exceeds {} bytes",
                MAX_SELECTOR_LEN
            )));
        }
        if let Some(v) = &self.value {
            if v.len() > MAX_COMMAND_VALUE_LEN {
                return Err(BridgeError::InvalidCommand(format!(
                    "value exceeds {} bytes",
                    MAX_COMMAND_VALUE_LEN
                )));
            }
        }
        Ok(())
    }
}

/// The only acknowledgement the control flow gives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchStatus {
    /// The command was written to the command slot; nothing more is promised.
    Dispatched,
}

/// Response to `POST /control`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlAck {
    /// Always `dispatched`.
    pub status: DispatchStatus,
    /// The command as accepted.
    pub command: ControlCommand,
}

/// The opaque serialized UI state produced by the renderer.
///
/// The runtime stores and relays it verbatim and never inspects it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UiSnapshot(String);

impl UiSnapshot {
    /// The placeholder served when no snapshot has been written yet.
    pub const EMPTY: &'static str = "{}";

    /// Wraps a raw snapshot.
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// The empty-object placeholder.
    pub fn empty() -> Self {
        Self(Self::EMPTY.to_string())
    }

    /// The raw text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the snapshot, returning the raw text.
    pub fn into_inner(self) -> String {
        self.0
    }

    /// Agent-side helper: decodes the `elements` array of a snapshot.
    /// Unknown shapes decode to an empty list.
    pub fn elements(&self) -> Vec<UiElement> {
        serde_json::from_str::<Value>(&self.0)
            .ok()
            .and_then(|mut v| v.get_mut("elements").map(Value::take))
            .and_then(|v| serde_json::from_value(v).ok())
            .unwrap_or_default()
    }
}

impl Default for UiSnapshot {
    fn default() -> Self {
        Self::empty()
    }
}

/// One element of a UI snapshot as emitted by the renderer bridge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct UiElement {
    /// The element identifier the agent uses to build selectors.
    #[serde(default)]
    pub id: Option<String>,
    /// The element tag name.
    #[serde(default)]
    pub tag: Option<String>,
    /// Visible text.
    #[serde(default)]
    pub text: Option<String>,
    /// Any other attributes (action category, geometry, visibility, ...).
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

impl UiElement {
    /// The CSS selector an agent would target: `#id` when known, the tag otherwise.
    pub fn selector(&self) -> Option<String> {
        match (&self.id, &self.tag) {
            (Some(id), _) if !id.is_empty() && id != "unknown" => Some(format!("#{}", id)),
            (_, Some(tag)) => Some(tag.clone()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn command_rejects_unknown_fields() {
        let res: Result<ControlCommand, _> = serde_json::from_value(json!({
            "action": "CLICK",
            "selector": "#buy",
            "script": "alert(1)"
        }));
        assert!(res.is_err());
    }

    #[test]
    fn command_requires_selector() {
        let res: Result<ControlCommand, _> = serde_json::from_value(json!({"action": "CLICK"}));
        assert!(res.is_err());

        let cmd = ControlCommand {
            action: "CLICK".into(),
            selector: "   ".into(),
            value: None,
        };
        assert!(cmd.validate().is_err());
    }

    #[test]
    fn ack_echoes_command_without_null_value() {
        let ack = ControlAck {
            status: DispatchStatus::Dispatched,
            command: ControlCommand {
                action: "CLICK".into(),
                selector: "#buy-button".into(),
                value: None,
            },
        };
        assert_eq!(
            serde_json::to_value(&ack).unwrap(),
            json!({"status": "dispatched", "command": {"action": "CLICK", "selector": "#buy-button"}})
        );
    }

    #[test]
    fn snapshot_elements_decode() {
        let snap = UiSnapshot::new(
            r#"{"elements":[{"id":"connect-btn","action":"click","text":"Connect Wallet"},{"tag":"button","text":"Claim"}]}"#,
        );
        let els = snap.elements();
        assert_eq!(els.len(), 2);
        assert_eq!(els[0].selector().as_deref(), Some("#connect-btn"));
        assert_eq!(els[0].attributes["action"], "click");
        assert_eq!(els[1].selector().as_deref(), Some("button"));

        assert!(UiSnapshot::empty().elements().is_empty());
        assert!(UiSnapshot::new("not json").elements().is_empty());
    }
}
