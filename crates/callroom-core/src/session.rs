use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tracing::Instrument;
use uuid::Uuid;

use crate::config::CallConfig;
use crate::controls::{MediaState, MeetingControls};
use crate::errors::{CallError, JoinFailure, PROVISION_ERROR_MESSAGE};
use crate::events::{CallEvent, CallEventListener, EventEmitter};
use crate::participants::ParticipantRoster;
use crate::provision::{Countdown, Room, RoomProvisioner, countdown_text, validate_room_url};
use crate::state::{
    CREATE_BUTTON_BUSY, CREATE_BUTTON_COPY, CREATE_BUTTON_IDLE, CallState, Panel, TextSlot,
    Trigger, UiDirective, recording_directive, transition,
};
use crate::stats::StatsPoller;
use crate::widget::{CallWidget, JoinOptions, Participant, WidgetEvent};

/// Mutable per-session state, guarded by one lock.
#[derive(Default)]
struct SessionState {
    state: CallState,
    room: Option<Room>,
    room_url_input: String,
    roster: ParticipantRoster,
    poller: Option<StatsPoller>,
    countdown: Option<JoinHandle<()>>,
}

/// What the event loop and the public API both need.
struct Shared {
    widget: Arc<dyn CallWidget>,
    emitter: EventEmitter,
    controls: MeetingControls,
    inner: Mutex<SessionState>,
    stats_interval: Duration,
    countdown_interval: Duration,
}

/// One call session: the widget handle, the current room and the call state.
///
/// Built once with [`CallSession::initialize`], which starts the loop that
/// maps widget events to state transitions and UI directives. Torn down with
/// [`CallSession::teardown`].
pub struct CallSession {
    id: Uuid,
    provisioner: RoomProvisioner,
    shared: Arc<Shared>,
    event_loop: Option<JoinHandle<()>>,
}

impl CallSession {
    /// Wrap `widget` and start consuming its `events`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn initialize(
        config: CallConfig,
        widget: Arc<dyn CallWidget>,
        events: mpsc::UnboundedReceiver<WidgetEvent>,
    ) -> Result<Self, CallError> {
        let id = Uuid::new_v4();
        let provisioner = RoomProvisioner::new(&config)?;
        let emitter = EventEmitter::new();
        let controls = MeetingControls::new(
            widget.clone(),
            emitter.clone(),
            Arc::new(Mutex::new(MediaState::default())),
            config.live_stream_rtmp_url.clone(),
        );

        let shared = Arc::new(Shared {
            widget,
            emitter,
            controls,
            inner: Mutex::new(SessionState::default()),
            stats_interval: config.stats_interval(),
            countdown_interval: config.countdown_interval(),
        });

        let span = tracing::info_span!("call_session", %id);
        let event_loop = tokio::spawn(Self::event_loop(shared.clone(), events).instrument(span));

        tracing::info!(session = %id, "call session initialized");
        Ok(Self {
            id,
            provisioner,
            shared,
            event_loop: Some(event_loop),
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Register a listener for call events.
    pub fn add_listener(&self, listener: Arc<dyn CallEventListener>) {
        self.shared.emitter.add_listener(listener);
    }

    /// Device and session toggles bound to this session's widget.
    pub fn controls(&self) -> MeetingControls {
        self.shared.controls.clone()
    }

    pub async fn state(&self) -> CallState {
        self.shared.inner.lock().await.state
    }

    pub async fn room(&self) -> Option<Room> {
        self.shared.inner.lock().await.room.clone()
    }

    pub async fn participants(&self) -> Vec<Participant> {
        self.shared.inner.lock().await.roster.participants().to_vec()
    }

    pub async fn is_polling_stats(&self) -> bool {
        self.shared
            .inner
            .lock()
            .await
            .poller
            .as_ref()
            .is_some_and(StatsPoller::is_running)
    }

    /// Room URL field changed. Enables the join action only for a valid URL.
    pub async fn on_room_url_input(&self, input: &str) -> bool {
        let valid = validate_room_url(input).is_ok();
        self.shared.inner.lock().await.room_url_input = input.trim().to_string();
        self.shared
            .emitter
            .emit(CallEvent::Ui(UiDirective::SetJoinEnabled(valid)));
        valid
    }

    /// Join the call at `url`.
    ///
    /// An empty URL fails without reaching the widget. Any failure switches
    /// to the error layout; nothing is retried.
    pub async fn join_call(&self, url: &str) -> Result<(), CallError> {
        let url = url.trim();
        let result = if url.is_empty() {
            Err(CallError::Join(JoinFailure::MissingUrl))
        } else {
            tracing::info!("joining {url}");
            self.shared
                .widget
                .join(JoinOptions {
                    url: url.to_string(),
                    show_leave_button: true,
                })
                .await
        };

        let failure = match result {
            Ok(()) => return Ok(()),
            Err(CallError::Join(failure)) => failure,
            Err(other) => JoinFailure::Rejected(other.to_string()),
        };
        let err = CallError::Join(failure);
        tracing::error!("join failed: {err}");
        self.shared
            .apply(Trigger::Failed {
                message: err.user_message(),
            })
            .await;
        Err(err)
    }

    /// Provision a demo room and put its link in the URL field.
    pub async fn create_demo_room(&self) -> Result<Room, CallError> {
        let emitter = &self.shared.emitter;
        emitter.emit(CallEvent::Ui(UiDirective::text(
            TextSlot::CreateButton,
            CREATE_BUTTON_BUSY,
        )));

        let room = match self.provisioner.create_room().await {
            Ok(room) => room,
            Err(e) => {
                emitter.emit(CallEvent::Ui(UiDirective::text(
                    TextSlot::CreateButton,
                    CREATE_BUTTON_IDLE,
                )));
                let state = self.shared.inner.lock().await.state;
                if matches!(state, CallState::Lobby | CallState::InCall) {
                    // the widget is still in the meeting; keep the call layout
                    emitter.emit_all([
                        UiDirective::Show(Panel::ErrorPanel),
                        UiDirective::text(TextSlot::ErrorMessage, PROVISION_ERROR_MESSAGE),
                    ]);
                } else {
                    self.shared
                        .apply(Trigger::Failed {
                            message: PROVISION_ERROR_MESSAGE.to_string(),
                        })
                        .await;
                }
                return Err(e);
            }
        };

        {
            let mut inner = self.shared.inner.lock().await;
            if let Some(previous) = inner.countdown.take() {
                previous.abort();
            }
            inner.countdown = Some(self.shared.start_countdown(&room));
            inner.room_url_input = room.url.clone();
            inner.room = Some(room.clone());
        }

        emitter.emit(CallEvent::RoomCreated(room.clone()));
        emitter.emit_all([
            UiDirective::SetRoomUrl(room.url.clone()),
            UiDirective::SetJoinEnabled(true),
            UiDirective::text(TextSlot::CreateButton, CREATE_BUTTON_COPY),
            UiDirective::Show(Panel::ExpiresCountdown),
        ]);
        Ok(room)
    }

    /// Provision a room and join it. A provisioning failure never reaches
    /// the widget.
    pub async fn create_room_and_join(&self) -> Result<Room, CallError> {
        let room = self.create_demo_room().await?;
        self.join_call(&room.url).await?;
        Ok(room)
    }

    /// The link currently in the URL field, for the shell to put on the
    /// clipboard.
    pub async fn copy_link(&self) -> Result<String, CallError> {
        let url = self.shared.inner.lock().await.room_url_input.clone();
        if url.is_empty() {
            return Err(CallError::NoRoom);
        }
        tracing::info!("copied room link");
        self.shared.emitter.emit(CallEvent::LinkCopied(url.clone()));
        Ok(url)
    }

    /// Ask the widget to leave; the `left-meeting` event does the rest.
    pub async fn leave_call(&self) -> Result<(), CallError> {
        self.shared.widget.leave().await
    }

    /// Stop background work and leave any active call.
    pub async fn teardown(mut self) {
        if let Some(handle) = self.event_loop.take() {
            handle.abort();
        }
        let state = {
            let mut inner = self.shared.inner.lock().await;
            if let Some(mut poller) = inner.poller.take() {
                poller.stop();
            }
            if let Some(countdown) = inner.countdown.take() {
                countdown.abort();
            }
            inner.state
        };
        if matches!(state, CallState::Lobby | CallState::InCall) {
            if let Err(e) = self.shared.widget.leave().await {
                tracing::warn!("leave during teardown failed: {e}");
            }
        }
        tracing::info!(session = %self.id, "call session torn down");
    }

    async fn event_loop(shared: Arc<Shared>, mut events: mpsc::UnboundedReceiver<WidgetEvent>) {
        while let Some(event) = events.recv().await {
            tracing::debug!(event = event.name(), "widget event");
            shared.handle_event(&event).await;
            shared.emitter.emit(CallEvent::Widget(event));
        }
        tracing::info!("widget event loop ended");
    }
}

impl Drop for CallSession {
    fn drop(&mut self) {
        if let Some(handle) = self.event_loop.take() {
            handle.abort();
        }
    }
}

impl Shared {
    /// Run one trigger through the transition table and apply the result.
    async fn apply(&self, trigger: Trigger) -> CallState {
        let mut inner = self.inner.lock().await;
        let Some(t) = transition(inner.state, &trigger) else {
            tracing::debug!(state = ?inner.state, ?trigger, "trigger ignored");
            return inner.state;
        };

        inner.state = t.to;
        if t.from == CallState::InCall && t.to != CallState::InCall {
            if let Some(mut poller) = inner.poller.take() {
                poller.stop();
            }
        }
        if t.to == CallState::InCall && t.from != CallState::InCall {
            inner.poller = Some(StatsPoller::start(
                self.widget.clone(),
                self.emitter.clone(),
                self.stats_interval,
            ));
        }
        drop(inner);

        tracing::info!(from = ?t.from, to = ?t.to, "call state changed");
        self.emitter.emit(CallEvent::StateChanged {
            from: t.from,
            to: t.to,
        });
        self.emitter.emit_all(t.directives);
        t.to
    }

    async fn handle_event(&self, event: &WidgetEvent) {
        if let Some(trigger) = Trigger::from_widget_event(event) {
            self.apply(trigger).await;
        }

        match event {
            WidgetEvent::LeftMeeting => {
                self.controls.reset().await;
                {
                    let mut inner = self.inner.lock().await;
                    inner.roster.clear();
                    inner.room = None;
                    if let Some(countdown) = inner.countdown.take() {
                        countdown.abort();
                    }
                }
                self.emitter
                    .emit(CallEvent::Ui(UiDirective::Participants(Vec::new())));
            }
            WidgetEvent::RecordingStarted => {
                self.controls.set_recording(true).await;
                self.emitter.emit(CallEvent::Ui(recording_directive(true)));
            }
            WidgetEvent::RecordingStopped => {
                self.controls.set_recording(false).await;
                self.emitter.emit(CallEvent::Ui(recording_directive(false)));
            }
            WidgetEvent::ParticipantJoined(p) | WidgetEvent::ParticipantUpdated(p) => {
                if p.local {
                    if let Err(e) = self.controls.observe_local_video(p.video).await {
                        tracing::warn!("live stream overlay update failed: {e}");
                    }
                }
                let snapshot = self.widget.participants();
                self.refresh_roster(|roster| {
                    roster.sync(&snapshot);
                    roster.upsert(p.clone());
                })
                .await;
            }
            WidgetEvent::ParticipantLeft(p) => {
                let snapshot = self.widget.participants();
                self.refresh_roster(|roster| {
                    roster.sync(&snapshot);
                    roster.remove(&p.session_id);
                })
                .await;
            }
            WidgetEvent::Error { message } => tracing::error!("widget error: {message}"),
            WidgetEvent::CameraError { message } => tracing::warn!("camera error: {message}"),
            WidgetEvent::RecordingError { message } => {
                tracing::warn!("recording error: {message}")
            }
            _ => {}
        }
    }

    async fn refresh_roster(&self, update: impl FnOnce(&mut ParticipantRoster)) {
        let names = {
            let mut inner = self.inner.lock().await;
            update(&mut inner.roster);
            inner.roster.display_names()
        };
        self.emitter
            .emit(CallEvent::Ui(UiDirective::Participants(names)));
    }

    /// Tick the expiry countdown until the room expires.
    fn start_countdown(&self, room: &Room) -> JoinHandle<()> {
        let mut countdown = Countdown::new(room);
        let emitter = self.emitter.clone();
        let period = self.countdown_interval;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                if let Some(remaining) = countdown.tick(Utc::now()) {
                    emitter.emit(CallEvent::Ui(UiDirective::text(
                        TextSlot::Countdown,
                        countdown_text(remaining),
                    )));
                }
                if countdown.is_finished() {
                    tracing::info!("demo room expired");
                    break;
                }
            }
        })
    }
}
