use serde::{Deserialize, Serialize};

/// Transport connection identity, doubling as the participant id.
pub type ConnectionId = String;

/// Externally supplied, case-sensitive session name.
pub type SessionId = String;

/// Fixed palette participants draw their color from.
pub const COLOR_PALETTE: [&str; 8] = [
    "#3B82F6", "#EF4444", "#10B981", "#F59E0B",
    "#8B5CF6", "#06B6D4", "#F97316", "#84CC16",
];

/// 1-based cursor location inside the shared document.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct CursorPosition {
    pub line: u32,
    pub column: u32,
}

impl CursorPosition {
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }

    pub fn is_valid(&self) -> bool {
        self.line >= 1 && self.column >= 1
    }
}

/// A connection's membership record inside one session.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub id: ConnectionId,
    pub display_name: String,
    pub color_tag: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor: Option<CursorPosition>,
}

impl Participant {
    pub fn new(id: impl Into<ConnectionId>, display_name: impl Into<String>, color_tag: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            color_tag: color_tag.into(),
            cursor: None,
        }
    }
}
