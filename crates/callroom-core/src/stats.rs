use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tokio::task::JoinHandle;

use crate::events::{CallEvent, EventEmitter};
use crate::state::{Panel, UiDirective};
use crate::widget::CallWidget;

/// Payload of the widget's `getNetworkStats` query.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct NetworkStats {
    pub stats: StatsSummary,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsSummary {
    pub latest: LatestStats,
    #[serde(default)]
    pub worst_video_send_packet_loss: f64,
    #[serde(default)]
    pub worst_video_recv_packet_loss: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LatestStats {
    #[serde(default)]
    pub video_send_bits_per_second: f64,
    #[serde(default)]
    pub video_recv_bits_per_second: f64,
}

/// Network stats as shown in the call panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkStatsView {
    pub video_send_kbps: u64,
    pub video_recv_kbps: u64,
    pub worst_send_loss_pct: u64,
    pub worst_recv_loss_pct: u64,
}

impl From<&NetworkStats> for NetworkStatsView {
    fn from(stats: &NetworkStats) -> Self {
        let s = &stats.stats;
        Self {
            video_send_kbps: floor_non_negative(s.latest.video_send_bits_per_second / 1000.0),
            video_recv_kbps: floor_non_negative(s.latest.video_recv_bits_per_second / 1000.0),
            worst_send_loss_pct: floor_non_negative(s.worst_video_send_packet_loss * 100.0),
            worst_recv_loss_pct: floor_non_negative(s.worst_video_recv_packet_loss * 100.0),
        }
    }
}

impl NetworkStatsView {
    /// One display line per metric.
    pub fn lines(&self) -> Vec<String> {
        vec![
            format!("Video send: {} kb/s", self.video_send_kbps),
            format!("Video recv: {} kb/s", self.video_recv_kbps),
            format!("Worst send packet loss: {}%", self.worst_send_loss_pct),
            format!("Worst recv packet loss: {}%", self.worst_recv_loss_pct),
        ]
    }
}

fn floor_non_negative(value: f64) -> u64 {
    if value.is_finite() && value > 0.0 {
        value.floor() as u64
    } else {
        0
    }
}

/// Periodic network-stat poll bound to the in-call state.
///
/// The task is aborted on `stop()` and on drop, so a leave-then-rejoin
/// cycle never leaves an old poller running.
pub struct StatsPoller {
    handle: Option<JoinHandle<()>>,
}

impl StatsPoller {
    /// Start polling. The first poll happens one full `period` after start.
    pub fn start(widget: Arc<dyn CallWidget>, emitter: EventEmitter, period: Duration) -> Self {
        let handle = tokio::spawn(async move {
            let mut ticker =
                tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            loop {
                ticker.tick().await;
                match widget.get_network_stats().await {
                    Ok(stats) => {
                        let view = NetworkStatsView::from(&stats);
                        tracing::debug!(?view, "network stats updated");
                        emitter.emit(CallEvent::Ui(UiDirective::NetworkStats(view)));
                        emitter.emit(CallEvent::Ui(UiDirective::Hide(Panel::NetworkLoading)));
                    }
                    Err(e) => tracing::warn!("network stats unavailable: {e}"),
                }
            }
        });
        tracing::info!("network stats poller started (every {period:?})");
        Self {
            handle: Some(handle),
        }
    }

    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            tracing::info!("network stats poller stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for StatsPoller {
    fn drop(&mut self) {
        self.stop();
    }
}
