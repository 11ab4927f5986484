//! Messaging
//!
//! Everything the fight core says goes through a [`Messenger`]: either to a
//! whole venue or to one participant.

use std::collections::VecDeque;

use hecs::Entity;
use parking_lot::Mutex;

/// Who should see a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Recipient {
    /// Everyone at the venue
    Venue(Entity),
    /// A single participant
    Participant(Entity),
}

/// Categories for message filtering/coloring
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageCategory {
    Combat,
    Turn,
    Item,
    System,
    Warning,
}

/// A message on its way to someone
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameMessage {
    pub recipient: Recipient,
    pub text: String,
    pub category: MessageCategory,
}

/// Presentation collaborator. Fights deliver with their own lock
/// released, so delivery may take a while and may call back in.
pub trait Messenger: Send + Sync {
    fn deliver(&self, message: GameMessage);

    fn broadcast(&self, venue: Entity, text: &str, category: MessageCategory) {
        self.deliver(GameMessage {
            recipient: Recipient::Venue(venue),
            text: text.to_string(),
            category,
        });
    }

    fn notify(&self, who: Entity, text: &str, category: MessageCategory) {
        self.deliver(GameMessage {
            recipient: Recipient::Participant(who),
            text: text.to_string(),
            category,
        });
    }
}

/// Keeps only this many messages
const DEFAULT_CAPACITY: usize = 500;

/// In-memory message log. Also echoes every message to the debug log.
pub struct MessageLog {
    messages: Mutex<VecDeque<GameMessage>>,
    capacity: usize,
}

impl MessageLog {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            messages: Mutex::new(VecDeque::new()),
            capacity: capacity.max(1),
        }
    }

    /// Snapshot of everything still held
    pub fn messages(&self) -> Vec<GameMessage> {
        self.messages.lock().iter().cloned().collect()
    }

    /// Texts sent to one recipient, oldest first
    pub fn texts_for(&self, recipient: Recipient) -> Vec<String> {
        self.messages
            .lock()
            .iter()
            .filter(|m| m.recipient == recipient)
            .map(|m| m.text.clone())
            .collect()
    }

    /// Whether any message contains `needle`
    pub fn contains(&self, needle: &str) -> bool {
        self.messages.lock().iter().any(|m| m.text.contains(needle))
    }

    /// Take everything, leaving the log empty
    pub fn drain(&self) -> Vec<GameMessage> {
        self.messages.lock().drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.messages.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.lock().is_empty()
    }
}

impl Default for MessageLog {
    fn default() -> Self {
        Self::new()
    }
}

impl Messenger for MessageLog {
    fn deliver(&self, message: GameMessage) {
        log::debug!("[{:?}] {:?}: {}", message.category, message.recipient, message.text);
        let mut messages = self.messages.lock();
        messages.push_back(message);
        while messages.len() > self.capacity {
            messages.pop_front();
        }
    }
}
