use std::sync::Arc;

use crate::provision::Room;
use crate::state::{CallState, UiDirective};
use crate::widget::WidgetEvent;

/// Events emitted by the core to UI listeners.
#[derive(Debug, Clone)]
pub enum CallEvent {
    StateChanged { from: CallState, to: CallState },
    Ui(UiDirective),
    /// Every widget event, forwarded as-is after the session handled it.
    Widget(WidgetEvent),
    RoomCreated(Room),
    LinkCopied(String),
}

/// Trait for receiving events from the core.
/// Implementations must be Send + Sync (called from tokio tasks).
pub trait CallEventListener: Send + Sync {
    fn on_event(&self, event: CallEvent);
}

/// Internal event emitter that dispatches to registered listeners.
#[derive(Clone, Default)]
pub struct EventEmitter {
    listeners: Arc<std::sync::RwLock<Vec<Arc<dyn CallEventListener>>>>,
}

impl EventEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_listener(&self, listener: Arc<dyn CallEventListener>) {
        match self.listeners.write() {
            Ok(mut listeners) => listeners.push(listener),
            Err(poisoned) => poisoned.into_inner().push(listener),
        }
    }

    pub fn emit(&self, event: CallEvent) {
        let listeners = match self.listeners.read() {
            Ok(listeners) => listeners,
            Err(poisoned) => poisoned.into_inner(),
        };
        for listener in listeners.iter() {
            listener.on_event(event.clone());
        }
    }

    pub fn emit_all(&self, directives: impl IntoIterator<Item = UiDirective>) {
        for directive in directives {
            self.emit(CallEvent::Ui(directive));
        }
    }
}

/// Listener that keeps every event, for tests and shells that poll.
#[derive(Default)]
pub struct EventRecorder {
    events: std::sync::Mutex<Vec<CallEvent>>,
}

impl EventRecorder {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<CallEvent> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Only the UI directives, in emission order.
    pub fn directives(&self) -> Vec<UiDirective> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                CallEvent::Ui(d) => Some(d),
                _ => None,
            })
            .collect()
    }
}

impl CallEventListener for EventRecorder {
    fn on_event(&self, event: CallEvent) {
        match self.events.lock() {
            Ok(mut events) => events.push(event),
            Err(poisoned) => poisoned.into_inner().push(event),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Panel;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingListener {
        count: Arc<AtomicUsize>,
    }

    impl CallEventListener for CountingListener {
        fn on_event(&self, _event: CallEvent) {
            self.count.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn emitter_dispatches_to_listener() {
        let emitter = EventEmitter::new();
        let count = Arc::new(AtomicUsize::new(0));
        let listener = Arc::new(CountingListener { count: count.clone() });

        emitter.add_listener(listener);
        emitter.emit(CallEvent::StateChanged {
            from: CallState::Idle,
            to: CallState::Lobby,
        });

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn emitter_dispatches_to_multiple_listeners() {
        let emitter = EventEmitter::new();
        let count1 = Arc::new(AtomicUsize::new(0));
        let count2 = Arc::new(AtomicUsize::new(0));

        emitter.add_listener(Arc::new(CountingListener { count: count1.clone() }));
        emitter.add_listener(Arc::new(CountingListener { count: count2.clone() }));

        emitter.emit(CallEvent::LinkCopied("https://example.daily.co/r".into()));

        assert_eq!(count1.load(Ordering::SeqCst), 1);
        assert_eq!(count2.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn recorder_keeps_directives_in_order() {
        let emitter = EventEmitter::new();
        let recorder = EventRecorder::new();
        emitter.add_listener(recorder.clone());

        emitter.emit_all([
            UiDirective::Hide(Panel::Home),
            UiDirective::Show(Panel::Lobby),
        ]);
        emitter.emit(CallEvent::Widget(WidgetEvent::Loaded));

        assert_eq!(recorder.events().len(), 3);
        assert_eq!(
            recorder.directives(),
            vec![UiDirective::Hide(Panel::Home), UiDirective::Show(Panel::Lobby)]
        );
    }
}
