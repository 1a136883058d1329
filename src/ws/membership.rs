use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info};

use crate::models::{CursorPosition, Participant, SyncSnapshotMessage, COLOR_PALETTE};
use super::session::Session;

/// Result of a join: the new record and the catch-up snapshot for its connection.
#[derive(Debug, Clone)]
pub struct JoinOutcome {
    pub participant: Participant,
    pub snapshot: SyncSnapshotMessage,
}

/// Join, leave and cursor operations over a session's participant set.
///
/// Owns the random source used for fallback names and colors so tests can
/// seed it.
pub struct MembershipManager {
    rng: StdRng,
}

impl MembershipManager {
    pub fn new(rng: StdRng) -> Self {
        Self { rng }
    }

    pub fn from_entropy() -> Self {
        Self::new(StdRng::from_entropy())
    }

    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }

    pub fn join(&mut self, session: &mut Session, connection_id: &str, requested_name: Option<&str>) -> JoinOutcome {
        let display_name = match requested_name.map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => format!("User{}", self.rng.gen_range(0..1000)),
        };
        let color_tag = COLOR_PALETTE[self.rng.gen_range(0..COLOR_PALETTE.len())];

        let participant = Participant::new(connection_id, display_name, color_tag);
        session.participants.insert(connection_id.to_string(), participant.clone());

        info!(
            "Participant {} ({}) joined session {}, now {} participants",
            participant.display_name,
            connection_id,
            session.id,
            session.participant_count()
        );

        JoinOutcome {
            participant,
            snapshot: session.snapshot(),
        }
    }

    pub fn leave(&self, session: &mut Session, connection_id: &str) -> Option<Participant> {
        let removed = session.participants.remove(connection_id);
        if let Some(participant) = &removed {
            info!(
                "Participant {} ({}) left session {}, {} remaining",
                participant.display_name,
                connection_id,
                session.id,
                session.participant_count()
            );
        }
        removed
    }

    /// Move a participant's cursor. Absent participants are ignored.
    pub fn update_cursor(&self, session: &mut Session, connection_id: &str, position: CursorPosition) -> Option<Participant> {
        match session.participants.get_mut(connection_id) {
            Some(participant) => {
                participant.cursor = Some(position);
                Some(participant.clone())
            }
            None => {
                debug!("Cursor update for unknown participant {} in session {}", connection_id, session.id);
                None
            }
        }
    }
}
