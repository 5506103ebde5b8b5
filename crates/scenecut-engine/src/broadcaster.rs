//! Status fan-out to subscribers.
//!
//! Every subscriber gets its own unbounded queue, so a slow reader never
//! delays the publisher or other readers. A subscriber whose receiver is gone
//! is dropped on the next publish. There is no replay: a late subscriber
//! polls the registry for the current state.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{mpsc, RwLock};
use tracing::trace;

use scenecut_models::{StatusMessage, VideoId};

/// Identifies one subscription, usable to unsubscribe.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle {
    id: u64,
    video_id: VideoId,
}

impl SubscriptionHandle {
    pub fn video_id(&self) -> &VideoId {
        &self.video_id
    }
}

/// Receiving end of a subscription.
#[derive(Debug)]
pub struct Subscription {
    handle: SubscriptionHandle,
    rx: mpsc::UnboundedReceiver<StatusMessage>,
}

impl Subscription {
    pub fn handle(&self) -> SubscriptionHandle {
        self.handle.clone()
    }

    /// Next message, or `None` once unsubscribed and drained.
    pub async fn recv(&mut self) -> Option<StatusMessage> {
        self.rx.recv().await
    }

    /// Next message if one is already queued.
    pub fn try_recv(&mut self) -> Option<StatusMessage> {
        self.rx.try_recv().ok()
    }
}

type Subscribers = Vec<(u64, mpsc::UnboundedSender<StatusMessage>)>;

/// Per-video publish/subscribe hub.
#[derive(Debug, Default)]
pub struct StatusBroadcaster {
    topics: RwLock<HashMap<VideoId, Subscribers>>,
    next_id: AtomicU64,
}

impl StatusBroadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn subscribe(&self, video_id: &VideoId) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::unbounded_channel();

        self.topics
            .write()
            .await
            .entry(video_id.clone())
            .or_default()
            .push((id, tx));

        Subscription {
            handle: SubscriptionHandle {
                id,
                video_id: video_id.clone(),
            },
            rx,
        }
    }

    /// Deliver `message` to every live subscriber of `video_id`.
    ///
    /// Returns the number of subscribers reached.
    pub async fn publish(&self, video_id: &VideoId, message: StatusMessage) -> usize {
        let mut delivered = 0;
        let mut disconnected = Vec::new();

        {
            let topics = self.topics.read().await;
            let Some(subscribers) = topics.get(video_id) else {
                return 0;
            };
            for (id, tx) in subscribers {
                if tx.send(message.clone()).is_ok() {
                    delivered += 1;
                } else {
                    disconnected.push(*id);
                }
            }
        }

        if !disconnected.is_empty() {
            trace!(video_id = %video_id, count = disconnected.len(), "Dropping disconnected subscribers");
            let mut topics = self.topics.write().await;
            if let Some(subscribers) = topics.get_mut(video_id) {
                subscribers.retain(|(id, _)| !disconnected.contains(id));
                if subscribers.is_empty() {
                    topics.remove(video_id);
                }
            }
        }

        delivered
    }

    /// Remove a subscription. Unknown or already removed handles are ignored.
    pub async fn unsubscribe(&self, handle: &SubscriptionHandle) {
        let mut topics = self.topics.write().await;
        if let Some(subscribers) = topics.get_mut(&handle.video_id) {
            subscribers.retain(|(id, _)| *id != handle.id);
            if subscribers.is_empty() {
                topics.remove(&handle.video_id);
            }
        }
    }

    pub async fn subscriber_count(&self, video_id: &VideoId) -> usize {
        self.topics.read().await.get(video_id).map_or(0, Vec::len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scenecut_models::StatusKind;

    fn message(id: &VideoId, progress: u8) -> StatusMessage {
        StatusMessage {
            video_id: id.clone(),
            status: StatusKind::Processing,
            progress: Some(progress),
            stage: None,
            clips: None,
            video_info: None,
            error: None,
        }
    }

    #[tokio::test]
    async fn test_fan_out_in_order() {
        let hub = StatusBroadcaster::new();
        let id = VideoId::from("v1");
        let mut a = hub.subscribe(&id).await;
        let mut b = hub.subscribe(&id).await;

        for pct in [5, 15, 30] {
            assert_eq!(hub.publish(&id, message(&id, pct)).await, 2);
        }

        for sub in [&mut a, &mut b] {
            let seen: Vec<u8> = (0..3).filter_map(|_| sub.try_recv()).filter_map(|m| m.progress).collect();
            assert_eq!(seen, vec![5, 15, 30]);
        }
    }

    #[tokio::test]
    async fn test_topics_are_isolated() {
        let hub = StatusBroadcaster::new();
        let mut other = hub.subscribe(&VideoId::from("other")).await;

        let id = VideoId::from("v1");
        assert_eq!(hub.publish(&id, message(&id, 5)).await, 0);
        assert!(other.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_unsubscribed_receives_nothing() {
        let hub = StatusBroadcaster::new();
        let id = VideoId::from("v1");
        let mut sub = hub.subscribe(&id).await;
        let handle = sub.handle();

        hub.unsubscribe(&handle).await;
        hub.publish(&id, message(&id, 5)).await;

        assert!(sub.recv().await.is_none(), "channel closes once removed");
        // Removing twice is fine
        hub.unsubscribe(&handle).await;
        assert_eq!(hub.subscriber_count(&id).await, 0);
    }

    #[tokio::test]
    async fn test_dropped_subscriber_is_pruned() {
        let hub = StatusBroadcaster::new();
        let id = VideoId::from("v1");
        let dropped = hub.subscribe(&id).await;
        let handle = dropped.handle();
        let mut live = hub.subscribe(&id).await;
        drop(dropped);

        assert_eq!(hub.publish(&id, message(&id, 5)).await, 1);
        assert_eq!(hub.subscriber_count(&id).await, 1);
        assert!(live.try_recv().is_some());

        // Unsubscribing a disconnected handle never errors
        hub.unsubscribe(&handle).await;
    }
}
