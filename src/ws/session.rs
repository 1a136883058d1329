use std::collections::HashMap;
use tracing::trace;

use crate::models::{ConnectionId, Participant, SessionId, SyncSnapshotMessage};

/// Document and language state of one named room plus its participants.
///
/// Both `document_text` and `language` are last-writer-wins: whatever the
/// dispatcher applied most recently replaces the previous value outright.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: SessionId,
    pub document_text: String,
    pub language: String,
    pub participants: HashMap<ConnectionId, Participant>,
}

impl Session {
    pub fn new(id: &str, language: &str) -> Self {
        Self {
            id: id.to_string(),
            document_text: welcome_document(id),
            language: language.to_string(),
            participants: HashMap::new(),
        }
    }

    pub fn apply_code_change(&mut self, text: String) {
        trace!("Session {} document replaced ({} bytes)", self.id, text.len());
        self.document_text = text;
    }

    pub fn apply_language_change(&mut self, language: String) {
        trace!("Session {} language set to {}", self.id, language);
        self.language = language;
    }

    pub fn participant(&self, connection_id: &str) -> Option<&Participant> {
        self.participants.get(connection_id)
    }

    pub fn participant_count(&self) -> usize {
        self.participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    /// Full state handed to a newly joined connection.
    pub fn snapshot(&self) -> SyncSnapshotMessage {
        let mut participants: Vec<Participant> = self.participants.values().cloned().collect();
        participants.sort_by(|a, b| a.id.cmp(&b.id));
        SyncSnapshotMessage {
            document_text: self.document_text.clone(),
            language: self.language.clone(),
            participants,
        }
    }
}

/// Seed document for a freshly created session.
pub fn welcome_document(session_id: &str) -> String {
    format!(
        r#"// Welcome to Code Pad Room: {session_id}
// Real-time collaborative coding with AI assistance!

// Example 1: Buggy function for AI testing
function calculateSum(a, b) {{
  return a + b + 1; // BUG: Adding extra 1!
}}

// Example 2: Function with potential issues
function processUserData(users) {{
  var result = [];
  for (var i = 0; i <= users.length; i++) {{ // BUG: <= instead of <
    if (users[i].age > 18) {{
      result.push(users[i].name.toUpperCase()); // BUG: No null check
    }}
  }}
  return result;
}}

// Example 3: Poor code style
function messy_function(x,y,z){{
var a=x+y;var b=a*z;if(b>100){{return true;}}else{{return false;}}}}

// Select any code above and try the AI actions:
// Fix - Debug and fix bugs
// Refactor - Improve code quality
// Explain - Understand the code
// Test - Generate unit tests"#
    )
}
