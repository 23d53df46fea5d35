use std::sync::Arc;
use tokio::sync::Mutex;

use crate::errors::CallError;
use crate::events::{CallEvent, EventEmitter};
use crate::livestream::{LiveStreamLayout, LiveStreamOptions};
use crate::participants::ParticipantView;
use crate::state::{
    SHARE_BUTTON_START, SHARE_BUTTON_STOP, TRACKS_BUTTON_SUBSCRIBED, TRACKS_BUTTON_UNSUBSCRIBED,
    TextSlot, UiDirective,
};
use crate::widget::CallWidget;

/// Session-level media flags the widget has no query for.
#[derive(Debug, Clone)]
pub struct MediaState {
    pub recording: bool,
    pub subscribed_to_tracks: bool,
    pub live_streaming: bool,
    pub view: ParticipantView,
}

impl Default for MediaState {
    fn default() -> Self {
        Self {
            recording: false,
            subscribed_to_tracks: true,
            live_streaming: false,
            view: ParticipantView::default(),
        }
    }
}

/// Device and session toggles for the call panel.
///
/// Each toggle reads the current state, inverts it and calls the matching
/// widget command. Nothing checks that the call is joined first; the widget
/// rejects what it cannot do and that error is returned as-is.
#[derive(Clone)]
pub struct MeetingControls {
    widget: Arc<dyn CallWidget>,
    emitter: EventEmitter,
    media: Arc<Mutex<MediaState>>,
    rtmp_url: Option<String>,
}

impl MeetingControls {
    pub fn new(
        widget: Arc<dyn CallWidget>,
        emitter: EventEmitter,
        media: Arc<Mutex<MediaState>>,
        rtmp_url: Option<String>,
    ) -> Self {
        Self {
            widget,
            emitter,
            media,
            rtmp_url,
        }
    }

    /// Toggle the camera. Returns the new local video flag.
    pub async fn toggle_camera(&self) -> Result<bool, CallError> {
        let enabled = !self.widget.participants().local.is_some_and(|p| p.video);
        self.widget.set_local_video(enabled).await?;
        tracing::info!("camera enabled: {enabled}");
        Ok(enabled)
    }

    /// Toggle the microphone. Returns the new local audio flag.
    pub async fn toggle_mic(&self) -> Result<bool, CallError> {
        let enabled = !self.widget.participants().local.is_some_and(|p| p.audio);
        self.widget.set_local_audio(enabled).await?;
        tracing::info!("microphone enabled: {enabled}");
        Ok(enabled)
    }

    /// Start or stop sharing the screen and relabel the share button.
    pub async fn toggle_screenshare(&self) -> Result<bool, CallError> {
        let sharing = self.widget.participants().local.is_some_and(|p| p.screen);
        let label = if sharing {
            self.widget.stop_screen_share().await?;
            SHARE_BUTTON_START
        } else {
            self.widget.start_screen_share().await?;
            SHARE_BUTTON_STOP
        };
        self.emitter
            .emit(CallEvent::Ui(UiDirective::text(TextSlot::ShareButton, label)));
        tracing::info!("screen share active: {}", !sharing);
        Ok(!sharing)
    }

    pub async fn toggle_fullscreen(&self) -> Result<bool, CallError> {
        if self.widget.is_fullscreen() {
            self.widget.exit_fullscreen().await?;
            Ok(false)
        } else {
            self.widget.request_fullscreen().await?;
            Ok(true)
        }
    }

    /// Show or hide the local video tile.
    pub async fn toggle_local_video(&self) -> Result<bool, CallError> {
        let show = !self.widget.show_local_video();
        self.widget.set_show_local_video(show).await?;
        Ok(show)
    }

    pub async fn toggle_participants_bar(&self) -> Result<bool, CallError> {
        let show = !self.widget.show_participants_bar();
        self.widget.set_show_participants_bar(show).await?;
        Ok(show)
    }

    /// Start or stop recording. The button label follows the widget's
    /// `recording-started` / `recording-stopped` events.
    pub async fn toggle_recording(&self) -> Result<bool, CallError> {
        let recording = self.media.lock().await.recording;
        if recording {
            self.widget.stop_recording().await?;
        } else {
            self.widget.start_recording().await?;
        }
        self.media.lock().await.recording = !recording;
        tracing::info!("recording: {}", !recording);
        Ok(!recording)
    }

    /// Switch automatic track subscription and relabel the tracks button.
    pub async fn toggle_track_subscription(&self) -> Result<bool, CallError> {
        let subscribe = !self.media.lock().await.subscribed_to_tracks;
        self.widget
            .set_subscribe_to_tracks_automatically(subscribe)
            .await?;
        self.media.lock().await.subscribed_to_tracks = subscribe;

        let label = if subscribe {
            TRACKS_BUTTON_SUBSCRIBED
        } else {
            TRACKS_BUTTON_UNSUBSCRIBED
        };
        self.emitter
            .emit(CallEvent::Ui(UiDirective::text(TextSlot::TracksButton, label)));
        Ok(subscribe)
    }

    pub async fn is_recording(&self) -> bool {
        self.media.lock().await.recording
    }

    pub async fn is_live_streaming(&self) -> bool {
        self.media.lock().await.live_streaming
    }

    pub async fn start_live_streaming(&self) -> Result<(), CallError> {
        let rtmp_url = self
            .rtmp_url
            .clone()
            .ok_or_else(|| CallError::Config("live_stream_rtmp_url is not set".into()))?;
        let show_overlay = self.media.lock().await.view.show_overlay();

        self.widget
            .start_live_streaming(LiveStreamOptions::new(rtmp_url, show_overlay))
            .await?;
        self.media.lock().await.live_streaming = true;

        tracing::info!("live streaming started (overlay: {show_overlay})");
        self.emitter
            .emit(CallEvent::Ui(UiDirective::ProfileOverlay(show_overlay)));
        Ok(())
    }

    pub async fn update_live_streaming(&self, show_overlay: bool) -> Result<(), CallError> {
        self.widget
            .update_live_streaming(LiveStreamLayout::with_overlay(show_overlay))
            .await?;
        tracing::debug!("live stream layout updated (overlay: {show_overlay})");
        self.emitter
            .emit(CallEvent::Ui(UiDirective::ProfileOverlay(show_overlay)));
        Ok(())
    }

    pub async fn stop_live_streaming(&self) -> Result<(), CallError> {
        self.widget.stop_live_streaming().await?;
        self.media.lock().await.live_streaming = false;
        tracing::info!("live streaming stopped");
        self.emitter
            .emit(CallEvent::Ui(UiDirective::ProfileOverlay(false)));
        Ok(())
    }

    /// Feed the local participant's video flag from `participant-updated`.
    ///
    /// When the flag flips during a live stream, the stream layout is
    /// updated so the placeholder shows exactly while the camera is off.
    pub(crate) async fn observe_local_video(&self, video: bool) -> Result<(), CallError> {
        let (changed, streaming) = {
            let mut media = self.media.lock().await;
            (media.view.observe_local_video(video), media.live_streaming)
        };
        match changed {
            Some(show_overlay) if streaming => self.update_live_streaming(show_overlay).await,
            _ => Ok(()),
        }
    }

    /// Called from the event loop on `recording-started` / `recording-stopped`.
    pub(crate) async fn set_recording(&self, recording: bool) {
        self.media.lock().await.recording = recording;
    }

    /// Forget per-call flags after leaving.
    pub(crate) async fn reset(&self) {
        let mut media = self.media.lock().await;
        media.recording = false;
        media.live_streaming = false;
        media.view.reset();
    }
}
