//! Call state machine.
//!
//! The widget only reports lifecycle events; this module turns them into an
//! explicit [`CallState`] and, for every transition, the list of
//! [`UiDirective`]s a shell must apply. Nothing here touches a UI.

use crate::stats::NetworkStatsView;
use crate::widget::WidgetEvent;

pub const INSTRUCTION_IDLE: &str =
    "To get started, enter an existing room URL or create a temporary demo room";
pub const INSTRUCTION_IN_CALL: &str = "Copy and share the URL to invite others";
pub const CREATE_BUTTON_IDLE: &str = "Create demo room";
pub const CREATE_BUTTON_BUSY: &str = "Creating room...";
pub const CREATE_BUTTON_COPY: &str = "Copy room link";
pub const RECORDING_BUTTON_START: &str = "Start recording";
pub const RECORDING_BUTTON_STOP: &str = "Stop recording";
pub const SHARE_BUTTON_START: &str = "Share screen";
pub const SHARE_BUTTON_STOP: &str = "Stop screenshare";
pub const TRACKS_BUTTON_SUBSCRIBED: &str = "Unsubscribe from video and audio";
pub const TRACKS_BUTTON_UNSUBSCRIBED: &str = "Subscribe to video and audio";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CallState {
    #[default]
    Idle,
    Lobby,
    InCall,
    Error,
}

/// Containers a shell can show or hide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Panel {
    Home,
    Lobby,
    CallPanel,
    ErrorPanel,
    ExpiresCountdown,
    NetworkLoading,
    JoinButton,
}

/// Text-bearing elements a shell can relabel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextSlot {
    Instruction,
    CreateButton,
    ErrorMessage,
    RecordingButton,
    ShareButton,
    TracksButton,
    Countdown,
}

#[derive(Debug, Clone, PartialEq)]
pub enum UiDirective {
    Show(Panel),
    Hide(Panel),
    SetText { slot: TextSlot, text: String },
    SetJoinEnabled(bool),
    SetRoomUrl(String),
    NetworkStats(NetworkStatsView),
    Participants(Vec<String>),
    ProfileOverlay(bool),
}

impl UiDirective {
    pub fn text(slot: TextSlot, text: impl Into<String>) -> Self {
        UiDirective::SetText {
            slot,
            text: text.into(),
        }
    }
}

/// What moves the state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Trigger {
    JoiningMeeting,
    JoinedMeeting,
    LeftMeeting,
    Failed { message: String },
}

impl Trigger {
    /// Lifecycle events that drive the state machine; all others return `None`.
    pub fn from_widget_event(event: &WidgetEvent) -> Option<Self> {
        match event {
            WidgetEvent::JoiningMeeting => Some(Trigger::JoiningMeeting),
            WidgetEvent::JoinedMeeting => Some(Trigger::JoinedMeeting),
            WidgetEvent::LeftMeeting => Some(Trigger::LeftMeeting),
            WidgetEvent::Error { message } => Some(Trigger::Failed {
                message: message.clone(),
            }),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub from: CallState,
    pub to: CallState,
    pub directives: Vec<UiDirective>,
}

/// Transition table. `None` means the trigger is ignored in `from`.
pub fn transition(from: CallState, trigger: &Trigger) -> Option<Transition> {
    use CallState::*;

    let (to, directives) = match (from, trigger) {
        (Idle | Error, Trigger::JoiningMeeting) => (
            Lobby,
            vec![
                UiDirective::Hide(Panel::ErrorPanel),
                UiDirective::Hide(Panel::Home),
                UiDirective::Show(Panel::Lobby),
            ],
        ),
        (Idle | Lobby | Error, Trigger::JoinedMeeting) => (
            InCall,
            vec![
                UiDirective::Hide(Panel::ErrorPanel),
                UiDirective::Hide(Panel::Home),
                UiDirective::Hide(Panel::Lobby),
                UiDirective::Show(Panel::CallPanel),
                UiDirective::Show(Panel::NetworkLoading),
                UiDirective::Hide(Panel::JoinButton),
                UiDirective::text(TextSlot::Instruction, INSTRUCTION_IN_CALL),
            ],
        ),
        (Lobby | InCall, Trigger::LeftMeeting) => (
            Idle,
            vec![
                UiDirective::Hide(Panel::CallPanel),
                UiDirective::Hide(Panel::Lobby),
                UiDirective::Hide(Panel::ExpiresCountdown),
                UiDirective::Show(Panel::Home),
                UiDirective::Show(Panel::JoinButton),
                UiDirective::text(TextSlot::Instruction, INSTRUCTION_IDLE),
                UiDirective::text(TextSlot::CreateButton, CREATE_BUTTON_IDLE),
            ],
        ),
        (_, Trigger::Failed { message }) => (
            Error,
            vec![
                UiDirective::Hide(Panel::Lobby),
                UiDirective::Hide(Panel::CallPanel),
                UiDirective::Show(Panel::Home),
                UiDirective::Show(Panel::JoinButton),
                UiDirective::Show(Panel::ErrorPanel),
                UiDirective::text(TextSlot::ErrorMessage, message.clone()),
            ],
        ),
        _ => return None,
    };

    Some(Transition {
        from,
        to,
        directives,
    })
}

/// Recording button relabel for `recording-started` / `recording-stopped`.
pub fn recording_directive(recording: bool) -> UiDirective {
    let label = if recording {
        RECORDING_BUTTON_STOP
    } else {
        RECORDING_BUTTON_START
    };
    UiDirective::text(TextSlot::RecordingButton, label)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failed(msg: &str) -> Trigger {
        Trigger::Failed {
            message: msg.to_string(),
        }
    }

    #[test]
    fn happy_path_walks_idle_lobby_in_call_idle() {
        let t = transition(CallState::Idle, &Trigger::JoiningMeeting).unwrap();
        assert_eq!(t.to, CallState::Lobby);
        assert!(t.directives.contains(&UiDirective::Show(Panel::Lobby)));

        let t = transition(t.to, &Trigger::JoinedMeeting).unwrap();
        assert_eq!(t.to, CallState::InCall);
        assert!(t.directives.contains(&UiDirective::Show(Panel::CallPanel)));
        assert!(t.directives.contains(&UiDirective::Hide(Panel::JoinButton)));

        let t = transition(t.to, &Trigger::LeftMeeting).unwrap();
        assert_eq!(t.to, CallState::Idle);
        assert!(t.directives.contains(&UiDirective::Show(Panel::Home)));
        assert!(
            t.directives
                .contains(&UiDirective::text(TextSlot::CreateButton, CREATE_BUTTON_IDLE))
        );
    }

    #[test]
    fn joined_without_lobby_is_accepted() {
        let t = transition(CallState::Idle, &Trigger::JoinedMeeting).unwrap();
        assert_eq!(t.to, CallState::InCall);
    }

    #[test]
    fn failure_shows_error_layout_from_any_state() {
        for from in [
            CallState::Idle,
            CallState::Lobby,
            CallState::InCall,
            CallState::Error,
        ] {
            let t = transition(from, &failed("boom")).unwrap();
            assert_eq!(t.to, CallState::Error);
            assert!(t.directives.contains(&UiDirective::Show(Panel::ErrorPanel)));
            assert!(
                t.directives
                    .contains(&UiDirective::text(TextSlot::ErrorMessage, "boom"))
            );
            // error layout, not the initial layout
            assert!(
                !t.directives
                    .contains(&UiDirective::text(TextSlot::Instruction, INSTRUCTION_IDLE))
            );
        }
    }

    #[test]
    fn ignored_triggers_return_none() {
        assert!(transition(CallState::Idle, &Trigger::LeftMeeting).is_none());
        assert!(transition(CallState::InCall, &Trigger::JoiningMeeting).is_none());
        assert!(transition(CallState::InCall, &Trigger::JoinedMeeting).is_none());
        assert!(transition(CallState::Error, &Trigger::LeftMeeting).is_none());
    }

    #[test]
    fn retry_after_error_hides_error_panel() {
        let t = transition(CallState::Error, &Trigger::JoiningMeeting).unwrap();
        assert_eq!(t.to, CallState::Lobby);
        assert_eq!(t.directives[0], UiDirective::Hide(Panel::ErrorPanel));
    }

    #[test]
    fn only_lifecycle_events_become_triggers() {
        assert_eq!(
            Trigger::from_widget_event(&WidgetEvent::JoinedMeeting),
            Some(Trigger::JoinedMeeting)
        );
        assert_eq!(
            Trigger::from_widget_event(&WidgetEvent::Error {
                message: "ejected".into()
            }),
            Some(failed("ejected"))
        );
        assert_eq!(Trigger::from_widget_event(&WidgetEvent::Loaded), None);
        assert_eq!(Trigger::from_widget_event(&WidgetEvent::RecordingStarted), None);
    }

    #[test]
    fn recording_labels() {
        assert_eq!(
            recording_directive(true),
            UiDirective::text(TextSlot::RecordingButton, "Stop recording")
        );
        assert_eq!(
            recording_directive(false),
            UiDirective::text(TextSlot::RecordingButton, "Start recording")
        );
    }
}
