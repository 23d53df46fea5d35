use crate::widget::{Participant, Participants};

/// Participants currently in the call, local first.
///
/// Updated by the session event loop. Read by native UI layers.
#[derive(Debug, Clone, Default)]
pub struct ParticipantRoster {
    participants: Vec<Participant>,
}

impl ParticipantRoster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the roster with a fresh `participants()` snapshot.
    pub fn sync(&mut self, snapshot: &Participants) {
        self.participants = snapshot.iter().cloned().collect();
    }

    pub fn upsert(&mut self, participant: Participant) {
        match self
            .participants
            .iter_mut()
            .find(|p| p.session_id == participant.session_id)
        {
            Some(existing) => *existing = participant,
            None if participant.local => self.participants.insert(0, participant),
            None => self.participants.push(participant),
        }
    }

    pub fn remove(&mut self, session_id: &str) {
        self.participants.retain(|p| p.session_id != session_id);
    }

    pub fn participants(&self) -> &[Participant] {
        &self.participants
    }

    pub fn local(&self) -> Option<&Participant> {
        self.participants.iter().find(|p| p.local)
    }

    pub fn display_names(&self) -> Vec<String> {
        self.participants
            .iter()
            .map(|p| p.display_name().to_string())
            .collect()
    }

    pub fn participant_count(&self) -> usize {
        self.participants.len()
    }

    pub fn clear(&mut self) {
        self.participants.clear();
    }
}

/// Tracks whether the local camera was on, to drive the live-stream
/// placeholder overlay.
#[derive(Debug, Clone, Default)]
pub struct ParticipantView {
    local_video_on: Option<bool>,
}

impl ParticipantView {
    /// Record the latest local video flag. Returns `Some(show_overlay)` when
    /// the flag changed since the previous observation; an unknown camera
    /// counts as on, so a first "off" already shows the overlay.
    pub fn observe_local_video(&mut self, video: bool) -> Option<bool> {
        let was_on = self.local_video_on.replace(video).unwrap_or(true);
        (was_on != video).then_some(!video)
    }

    /// Overlay state to start a stream with; an unknown camera counts as on.
    pub fn show_overlay(&self) -> bool {
        !self.local_video_on.unwrap_or(true)
    }

    pub fn reset(&mut self) {
        self.local_video_on = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_participant(session_id: &str, name: Option<&str>, local: bool) -> Participant {
        Participant {
            session_id: session_id.to_string(),
            user_name: name.map(str::to_string),
            local,
            video: true,
            audio: true,
            screen: false,
        }
    }

    #[test]
    fn upsert_and_retrieve_participant() {
        let mut roster = ParticipantRoster::new();
        roster.upsert(make_participant("p1", Some("Alice"), false));
        assert_eq!(roster.participant_count(), 1);
        assert_eq!(roster.display_names(), vec!["Alice"]);
    }

    #[test]
    fn upsert_replaces_existing_entry() {
        let mut roster = ParticipantRoster::new();
        roster.upsert(make_participant("p1", Some("Alice"), false));
        let mut updated = make_participant("p1", Some("Alice B."), false);
        updated.video = false;
        roster.upsert(updated);
        assert_eq!(roster.participant_count(), 1);
        assert_eq!(roster.display_names(), vec!["Alice B."]);
        assert!(!roster.participants()[0].video);
    }

    #[test]
    fn local_participant_listed_first() {
        let mut roster = ParticipantRoster::new();
        roster.upsert(make_participant("p1", Some("Alice"), false));
        roster.upsert(make_participant("me", None, true));
        assert_eq!(roster.display_names(), vec!["Guest", "Alice"]);
        assert_eq!(roster.local().unwrap().session_id, "me");
    }

    #[test]
    fn remove_and_clear() {
        let mut roster = ParticipantRoster::new();
        roster.upsert(make_participant("p1", Some("Alice"), false));
        roster.upsert(make_participant("p2", Some("Bob"), false));
        roster.remove("p1");
        assert_eq!(roster.display_names(), vec!["Bob"]);
        roster.clear();
        assert_eq!(roster.participant_count(), 0);
    }

    #[test]
    fn sync_takes_snapshot_order() {
        let mut roster = ParticipantRoster::new();
        roster.upsert(make_participant("stale", None, false));
        roster.sync(&Participants {
            local: Some(make_participant("me", Some("Me"), true)),
            remote: vec![make_participant("p2", Some("Bob"), false)],
        });
        assert_eq!(roster.display_names(), vec!["Me", "Bob"]);
    }

    #[test]
    fn view_reports_only_changes() {
        let mut view = ParticipantView::default();
        assert!(!view.show_overlay());
        assert_eq!(view.observe_local_video(true), None);
        assert_eq!(view.observe_local_video(true), None);
        assert_eq!(view.observe_local_video(false), Some(true));
        assert!(view.show_overlay());
        assert_eq!(view.observe_local_video(true), Some(false));
        view.reset();
        assert_eq!(view.observe_local_video(false), Some(true));
        assert_eq!(view.observe_local_video(false), None);
    }
}
