use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::CallError;
use crate::livestream::{LiveStreamLayout, LiveStreamOptions};
use crate::stats::NetworkStats;

/// Events emitted by the embedded call widget.
#[derive(Debug, Clone, PartialEq)]
pub enum WidgetEvent {
    Loaded,
    StartedCamera,
    CameraError { message: String },
    JoiningMeeting,
    JoinedMeeting,
    RecordingStarted,
    RecordingStopped,
    RecordingStats(serde_json::Value),
    RecordingError { message: String },
    AppMessage { from_id: String, data: serde_json::Value },
    InputEvent(serde_json::Value),
    Error { message: String },
    ParticipantJoined(Participant),
    ParticipantUpdated(Participant),
    ParticipantLeft(Participant),
    LeftMeeting,
}

impl WidgetEvent {
    /// Event name as the widget reports it.
    pub fn name(&self) -> &'static str {
        match self {
            WidgetEvent::Loaded => "loaded",
            WidgetEvent::StartedCamera => "started-camera",
            WidgetEvent::CameraError { .. } => "camera-error",
            WidgetEvent::JoiningMeeting => "joining-meeting",
            WidgetEvent::JoinedMeeting => "joined-meeting",
            WidgetEvent::RecordingStarted => "recording-started",
            WidgetEvent::RecordingStopped => "recording-stopped",
            WidgetEvent::RecordingStats(_) => "recording-stats",
            WidgetEvent::RecordingError { .. } => "recording-error",
            WidgetEvent::AppMessage { .. } => "app-message",
            WidgetEvent::InputEvent(_) => "input-event",
            WidgetEvent::Error { .. } => "error",
            WidgetEvent::ParticipantJoined(_) => "participant-joined",
            WidgetEvent::ParticipantUpdated(_) => "participant-updated",
            WidgetEvent::ParticipantLeft(_) => "participant-left",
            WidgetEvent::LeftMeeting => "left-meeting",
        }
    }
}

/// A call participant as the widget describes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub session_id: String,
    #[serde(default)]
    pub user_name: Option<String>,
    #[serde(default)]
    pub local: bool,
    #[serde(default)]
    pub video: bool,
    #[serde(default)]
    pub audio: bool,
    #[serde(default)]
    pub screen: bool,
}

impl Participant {
    pub fn display_name(&self) -> &str {
        match self.user_name.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ => "Guest",
        }
    }
}

/// Result of the widget's `participants()` query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Participants {
    /// Absent until the widget has a local participant.
    pub local: Option<Participant>,
    pub remote: Vec<Participant>,
}

impl Participants {
    pub fn iter(&self) -> impl Iterator<Item = &Participant> {
        self.local.iter().chain(self.remote.iter())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinOptions {
    pub url: String,
    pub show_leave_button: bool,
}

/// Command surface of the embedded call widget.
///
/// Implementations forward to the vendor SDK. Commands issued in a state the
/// SDK does not accept (e.g. toggling media before joining) come back as
/// `CallError::Widget`.
#[async_trait]
pub trait CallWidget: Send + Sync {
    async fn join(&self, options: JoinOptions) -> Result<(), CallError>;
    async fn leave(&self) -> Result<(), CallError>;
    fn participants(&self) -> Participants;

    async fn set_local_video(&self, enabled: bool) -> Result<(), CallError>;
    async fn set_local_audio(&self, enabled: bool) -> Result<(), CallError>;
    async fn start_screen_share(&self) -> Result<(), CallError>;
    async fn stop_screen_share(&self) -> Result<(), CallError>;
    async fn start_recording(&self) -> Result<(), CallError>;
    async fn stop_recording(&self) -> Result<(), CallError>;
    async fn get_network_stats(&self) -> Result<NetworkStats, CallError>;
    async fn set_subscribe_to_tracks_automatically(&self, enabled: bool)
    -> Result<(), CallError>;

    fn is_fullscreen(&self) -> bool;
    async fn request_fullscreen(&self) -> Result<(), CallError>;
    async fn exit_fullscreen(&self) -> Result<(), CallError>;

    fn show_local_video(&self) -> bool;
    async fn set_show_local_video(&self, show: bool) -> Result<(), CallError>;
    fn show_participants_bar(&self) -> bool;
    async fn set_show_participants_bar(&self, show: bool) -> Result<(), CallError>;

    async fn start_live_streaming(&self, options: LiveStreamOptions) -> Result<(), CallError>;
    async fn update_live_streaming(&self, layout: LiveStreamLayout) -> Result<(), CallError>;
    async fn stop_live_streaming(&self) -> Result<(), CallError>;
}

/// In-memory widget for tests and headless demos.
///
/// Behaves like the vendor SDK closely enough to drive a session: joining
/// emits the lobby and joined events, media commands emit
/// `participant-updated`, and commands before joining are rejected.
pub mod mock {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use tokio::sync::mpsc;

    use super::*;
    use crate::errors::JoinFailure;
    use crate::stats::{LatestStats, StatsSummary};

    pub const LOCAL_SESSION_ID: &str = "local-session";

    struct MockState {
        joined: bool,
        local: Participant,
        remote: Vec<Participant>,
        recording: bool,
        fullscreen: bool,
        show_local_video: bool,
        show_participants_bar: bool,
        subscribe_tracks: bool,
        live_stream: Option<LiveStreamLayout>,
        commands: Vec<String>,
    }

    pub struct MockWidget {
        state: Mutex<MockState>,
        events: mpsc::UnboundedSender<WidgetEvent>,
        join_error: Option<String>,
        join_calls: AtomicUsize,
        stats_polls: AtomicUsize,
    }

    impl MockWidget {
        /// A widget that accepts any well-formed room URL.
        pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<WidgetEvent>) {
            Self::build(None)
        }

        /// A widget whose join always fails with `message`.
        pub fn rejecting_join(
            message: &str,
        ) -> (Arc<Self>, mpsc::UnboundedReceiver<WidgetEvent>) {
            Self::build(Some(message.to_string()))
        }

        fn build(join_error: Option<String>) -> (Arc<Self>, mpsc::UnboundedReceiver<WidgetEvent>) {
            let (tx, rx) = mpsc::unbounded_channel();
            let widget = Self {
                state: Mutex::new(MockState {
                    joined: false,
                    local: Participant {
                        session_id: LOCAL_SESSION_ID.to_string(),
                        user_name: None,
                        local: true,
                        video: true,
                        audio: true,
                        screen: false,
                    },
                    remote: Vec::new(),
                    recording: false,
                    fullscreen: false,
                    show_local_video: true,
                    show_participants_bar: true,
                    subscribe_tracks: true,
                    live_stream: None,
                    commands: Vec::new(),
                }),
                events: tx,
                join_error,
                join_calls: AtomicUsize::new(0),
                stats_polls: AtomicUsize::new(0),
            };
            (Arc::new(widget), rx)
        }

        /// Inject an event as if the SDK had emitted it.
        pub fn emit(&self, event: WidgetEvent) {
            let _ = self.events.send(event);
        }

        /// Add a remote participant and emit `participant-joined`.
        pub fn add_remote(&self, participant: Participant) {
            self.state.lock().unwrap().remote.push(participant.clone());
            self.emit(WidgetEvent::ParticipantJoined(participant));
        }

        pub fn join_calls(&self) -> usize {
            self.join_calls.load(Ordering::SeqCst)
        }

        pub fn stats_polls(&self) -> usize {
            self.stats_polls.load(Ordering::SeqCst)
        }

        pub fn commands(&self) -> Vec<String> {
            self.state.lock().unwrap().commands.clone()
        }

        pub fn is_recording(&self) -> bool {
            self.state.lock().unwrap().recording
        }

        pub fn subscribes_to_tracks(&self) -> bool {
            self.state.lock().unwrap().subscribe_tracks
        }

        pub fn live_stream_layout(&self) -> Option<LiveStreamLayout> {
            self.state.lock().unwrap().live_stream.clone()
        }

        /// Runs `f` on the state of a joined widget, logging the command.
        fn joined_command<T>(
            &self,
            command: &str,
            f: impl FnOnce(&mut MockState) -> T,
        ) -> Result<T, CallError> {
            let mut state = self.state.lock().unwrap();
            state.commands.push(command.to_string());
            if !state.joined {
                return Err(CallError::Widget(format!("{command}: not in a meeting")));
            }
            Ok(f(&mut state))
        }

        fn update_local(
            &self,
            command: &str,
            f: impl FnOnce(&mut Participant),
        ) -> Result<(), CallError> {
            let local = self.joined_command(command, |state| {
                f(&mut state.local);
                state.local.clone()
            })?;
            self.emit(WidgetEvent::ParticipantUpdated(local));
            Ok(())
        }
    }

    #[async_trait]
    impl CallWidget for MockWidget {
        async fn join(&self, options: JoinOptions) -> Result<(), CallError> {
            self.join_calls.fetch_add(1, Ordering::SeqCst);
            if options.url.trim().is_empty() {
                return Err(JoinFailure::MissingUrl.into());
            }
            if url::Url::parse(&options.url).is_err() {
                return Err(JoinFailure::MalformedUrl(options.url).into());
            }
            if let Some(message) = &self.join_error {
                return Err(JoinFailure::Rejected(message.clone()).into());
            }

            let local = {
                let mut state = self.state.lock().unwrap();
                state.commands.push("join".to_string());
                state.joined = true;
                state.local.clone()
            };
            self.emit(WidgetEvent::JoiningMeeting);
            self.emit(WidgetEvent::JoinedMeeting);
            self.emit(WidgetEvent::ParticipantJoined(local));
            Ok(())
        }

        async fn leave(&self) -> Result<(), CallError> {
            self.joined_command("leave", |state| {
                state.joined = false;
                state.recording = false;
                state.live_stream = None;
            })?;
            self.emit(WidgetEvent::LeftMeeting);
            Ok(())
        }

        fn participants(&self) -> Participants {
            let state = self.state.lock().unwrap();
            Participants {
                local: state.joined.then(|| state.local.clone()),
                remote: state.remote.clone(),
            }
        }

        async fn set_local_video(&self, enabled: bool) -> Result<(), CallError> {
            self.update_local("setLocalVideo", |p| p.video = enabled)
        }

        async fn set_local_audio(&self, enabled: bool) -> Result<(), CallError> {
            self.update_local("setLocalAudio", |p| p.audio = enabled)
        }

        async fn start_screen_share(&self) -> Result<(), CallError> {
            self.update_local("startScreenShare", |p| p.screen = true)
        }

        async fn stop_screen_share(&self) -> Result<(), CallError> {
            self.update_local("stopScreenShare", |p| p.screen = false)
        }

        async fn start_recording(&self) -> Result<(), CallError> {
            self.joined_command("startRecording", |state| state.recording = true)?;
            self.emit(WidgetEvent::RecordingStarted);
            Ok(())
        }

        async fn stop_recording(&self) -> Result<(), CallError> {
            self.joined_command("stopRecording", |state| state.recording = false)?;
            self.emit(WidgetEvent::RecordingStopped);
            Ok(())
        }

        async fn get_network_stats(&self) -> Result<NetworkStats, CallError> {
            self.stats_polls.fetch_add(1, Ordering::SeqCst);
            Ok(NetworkStats {
                stats: StatsSummary {
                    latest: LatestStats {
                        video_send_bits_per_second: 250_000.0,
                        video_recv_bits_per_second: 750_000.0,
                    },
                    worst_video_send_packet_loss: 0.01,
                    worst_video_recv_packet_loss: 0.05,
                },
            })
        }

        async fn set_subscribe_to_tracks_automatically(
            &self,
            enabled: bool,
        ) -> Result<(), CallError> {
            self.joined_command("setSubscribeToTracksAutomatically", |state| {
                state.subscribe_tracks = enabled
            })
        }

        fn is_fullscreen(&self) -> bool {
            self.state.lock().unwrap().fullscreen
        }

        async fn request_fullscreen(&self) -> Result<(), CallError> {
            self.joined_command("requestFullscreen", |state| state.fullscreen = true)
        }

        async fn exit_fullscreen(&self) -> Result<(), CallError> {
            self.joined_command("exitFullscreen", |state| state.fullscreen = false)
        }

        fn show_local_video(&self) -> bool {
            self.state.lock().unwrap().show_local_video
        }

        async fn set_show_local_video(&self, show: bool) -> Result<(), CallError> {
            self.joined_command("setShowLocalVideo", |state| state.show_local_video = show)
        }

        fn show_participants_bar(&self) -> bool {
            self.state.lock().unwrap().show_participants_bar
        }

        async fn set_show_participants_bar(&self, show: bool) -> Result<(), CallError> {
            self.joined_command("setShowParticipantsBar", |state| {
                state.show_participants_bar = show
            })
        }

        async fn start_live_streaming(&self, options: LiveStreamOptions) -> Result<(), CallError> {
            self.joined_command("startLiveStreaming", |state| {
                state.live_stream = Some(options.layout)
            })
        }

        async fn update_live_streaming(&self, layout: LiveStreamLayout) -> Result<(), CallError> {
            self.joined_command("updateLiveStreaming", |state| {
                state.live_stream = Some(layout)
            })
        }

        async fn stop_live_streaming(&self) -> Result<(), CallError> {
            self.joined_command("stopLiveStreaming", |state| state.live_stream = None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mock::MockWidget;
    use super::*;

    #[test]
    fn event_names_match_widget_wire_names() {
        assert_eq!(WidgetEvent::JoiningMeeting.name(), "joining-meeting");
        assert_eq!(WidgetEvent::LeftMeeting.name(), "left-meeting");
        assert_eq!(
            WidgetEvent::InputEvent(serde_json::Value::Null).name(),
            "input-event"
        );
    }

    #[test]
    fn display_name_falls_back_to_guest() {
        let mut p = Participant {
            session_id: "s1".into(),
            user_name: None,
            local: false,
            video: false,
            audio: false,
            screen: false,
        };
        assert_eq!(p.display_name(), "Guest");
        p.user_name = Some(String::new());
        assert_eq!(p.display_name(), "Guest");
        p.user_name = Some("Alice".into());
        assert_eq!(p.display_name(), "Alice");
    }

    #[test]
    fn participant_parses_from_widget_json() {
        let p: Participant = serde_json::from_value(serde_json::json!({
            "session_id": "abc",
            "user_name": "Bob",
            "video": true
        }))
        .unwrap();
        assert_eq!(p.session_id, "abc");
        assert!(p.video);
        assert!(!p.audio);
        assert!(!p.local);
    }

    #[test]
    fn join_options_serialize_camel_case() {
        let opts = JoinOptions {
            url: "https://example.daily.co/room".into(),
            show_leave_button: true,
        };
        let json = serde_json::to_value(&opts).unwrap();
        assert_eq!(json["showLeaveButton"], true);
    }

    #[tokio::test]
    async fn mock_join_emits_lobby_then_joined() {
        let (widget, mut events) = MockWidget::new();
        widget
            .join(JoinOptions {
                url: "https://example.daily.co/room".into(),
                show_leave_button: true,
            })
            .await
            .unwrap();

        assert_eq!(events.recv().await, Some(WidgetEvent::JoiningMeeting));
        assert_eq!(events.recv().await, Some(WidgetEvent::JoinedMeeting));
        assert!(matches!(
            events.recv().await,
            Some(WidgetEvent::ParticipantJoined(p)) if p.local
        ));
        assert!(widget.participants().local.is_some());
    }

    #[tokio::test]
    async fn mock_rejects_commands_before_join() {
        let (widget, _events) = MockWidget::new();
        assert!(matches!(
            widget.set_local_video(false).await,
            Err(CallError::Widget(_))
        ));
        assert!(widget.participants().local.is_none());
    }
}
