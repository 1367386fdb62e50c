//! Boundary channel between the gameplay core and its presentation host
//!
//! Messages are typed variants rather than event-name strings. On the wire
//! they serialize as `{"event": "score-update", "payload": {...}}` and
//! `{"command": "toggle-pause", "payload": true}`.

use serde::{Deserialize, Serialize};

use crate::sim::{Category, ScoreBoard};

/// Core -> host
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "payload", rename_all = "kebab-case")]
pub enum CoreEvent {
    /// Full board after every catch and every reset
    ScoreUpdate(ScoreBoard),
    /// A category reached max
    GameOver(Category),
}

/// Discriminant used to filter subscriptions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    ScoreUpdate,
    GameOver,
}

impl CoreEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            CoreEvent::ScoreUpdate(_) => EventKind::ScoreUpdate,
            CoreEvent::GameOver(_) => EventKind::GameOver,
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Host -> core
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", content = "payload", rename_all = "kebab-case")]
pub enum HostCommand {
    /// `true` pauses, `false` resumes
    TogglePause(bool),
    /// Continue after an earned category
    ResumeGame,
    /// Full reset
    RestartGame,
    /// Flip the music preference
    ToggleAudio,
}

impl HostCommand {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

pub type SubscriptionId = u64;

type Handler = Box<dyn FnMut(&CoreEvent)>;

struct Subscriber {
    id: SubscriptionId,
    /// `None` receives everything
    kind: Option<EventKind>,
    handler: Handler,
}

/// Single-threaded publish/subscribe fan-out for [`CoreEvent`]s
#[derive(Default)]
pub struct EventBus {
    subscribers: Vec<Subscriber>,
    next_id: SubscriptionId,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Receive only events of `kind`
    pub fn subscribe(
        &mut self,
        kind: EventKind,
        handler: impl FnMut(&CoreEvent) + 'static,
    ) -> SubscriptionId {
        self.add(Some(kind), Box::new(handler))
    }

    /// Receive every event
    pub fn subscribe_all(&mut self, handler: impl FnMut(&CoreEvent) + 'static) -> SubscriptionId {
        self.add(None, Box::new(handler))
    }

    fn add(&mut self, kind: Option<EventKind>, handler: Handler) -> SubscriptionId {
        self.next_id += 1;
        let id = self.next_id;
        self.subscribers.push(Subscriber { id, kind, handler });
        id
    }

    /// Returns false if `id` was not registered
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|s| s.id != id);
        self.subscribers.len() != before
    }

    /// Drop every subscription (teardown)
    pub fn clear(&mut self) {
        self.subscribers.clear();
    }

    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }

    /// Deliver to matching subscribers; returns how many received it
    pub fn publish(&mut self, event: &CoreEvent) -> usize {
        let kind = event.kind();
        let mut delivered = 0;
        for sub in &mut self.subscribers {
            if sub.kind.is_none_or(|k| k == kind) {
                (sub.handler)(event);
                delivered += 1;
            }
        }
        delivered
    }
}
