//! Topic-keyed, single-subscriber notification fan-out. Each topic holds at
//! most one live subscriber; a second `subscribe` call for the same topic
//! replaces the first. A subscriber whose channel has disconnected is
//! dropped the next time its topic fires, mirroring how the game-loop
//! runtime's pubsub reaps dead subscribers lazily rather than eagerly.

use std::collections::HashMap;

use crossbeam_channel::Sender;
use nvm_core::block::{BlockId, JobResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventTopic {
    JobEnd,
    JobError,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotificationEvent {
    pub block_id: BlockId,
    pub result: JobResult,
}

impl NotificationEvent {
    pub fn topic(self) -> EventTopic {
        match self.result {
            JobResult::Ok => EventTopic::JobEnd,
            _ => EventTopic::JobError,
        }
    }
}

#[derive(Default)]
pub struct PubSub {
    subscribers: HashMap<EventTopic, Sender<NotificationEvent>>,
}

impl PubSub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, topic: EventTopic, sender: Sender<NotificationEvent>) {
        self.subscribers.insert(topic, sender);
    }

    pub fn unsubscribe(&mut self, topic: EventTopic) {
        self.subscribers.remove(&topic);
    }

    pub fn broadcast(&mut self, event: NotificationEvent) {
        let topic = event.topic();
        if let Some(subscriber) = self.subscribers.get(&topic) {
            if subscriber.send(event).is_err() {
                self.subscribers.remove(&topic);
            }
        }
    }
}
