//! Callroom core call logic.
//!
//! Headless controller for an embedded call widget: provisions demo rooms,
//! tracks the call state and tells native or web shells which panels to
//! show. The widget itself sits behind the [`CallWidget`] trait.

pub mod config;
pub mod controls;
pub mod errors;
pub mod events;
pub mod livestream;
pub mod logging;
pub mod participants;
pub mod provision;
pub mod session;
pub mod state;
pub mod stats;
pub mod widget;

pub use config::CallConfig;
pub use controls::MeetingControls;
pub use errors::{CallError, JoinFailure};
pub use events::{CallEvent, CallEventListener, EventRecorder};
pub use provision::{Room, RoomProvisioner};
pub use session::CallSession;
pub use state::{CallState, Panel, TextSlot, UiDirective};
pub use widget::{CallWidget, Participant, WidgetEvent};
