//! Private messaging and the unread-message counter.
//!
//! The unread count is recomputed from the message store on every change and
//! published as an `unread_message_count` notification. Sends and reads for
//! the same recipient are serialized so the published sequence of counts is
//! consistent with the store.

pub mod store;

use std::sync::{Arc, Mutex};

use dashmap::DashMap;
use serde_json::json;
use thiserror::Error;
use tracing::debug;

use haulboard_core::{DomainError, SharedClock, UserId};
use haulboard_social::{Message, Page, PageRequest};

use crate::error::StoreError;
use crate::notifications::{NotificationStore, NotificationStoreError, UNREAD_MESSAGE_COUNT};

pub use store::{InMemoryMessageStore, MessageStore};

#[derive(Debug, Error)]
pub enum InboxError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Notification(#[from] NotificationStoreError),
}

pub struct Inbox<M, N> {
    messages: M,
    notifications: N,
    clock: SharedClock,
    recipients: DashMap<UserId, Arc<Mutex<()>>>,
}

impl<M, N> Inbox<M, N>
where
    M: MessageStore,
    N: NotificationStore,
{
    pub fn new(messages: M, notifications: N, clock: SharedClock) -> Self {
        Self {
            messages,
            notifications,
            clock,
            recipients: DashMap::new(),
        }
    }

    fn recipient_lock(&self, user: UserId) -> Arc<Mutex<()>> {
        self.recipients.entry(user).or_default().value().clone()
    }

    /// Store a message and publish the recipient's new unread count.
    pub fn send_message(
        &self,
        sender: UserId,
        recipient: UserId,
        body: &str,
    ) -> Result<Message, InboxError> {
        let lock = self.recipient_lock(recipient);
        let _guard = lock.lock().map_err(|_| StoreError::poisoned())?;

        let message = Message::new(sender, recipient, body, self.clock.now())?;
        self.messages.insert(message.clone())?;

        let unread = self.unread_locked(recipient)?;
        self.notifications
            .append(recipient, UNREAD_MESSAGE_COUNT, json!(unread))?;
        debug!(sender_id = %sender, recipient_id = %recipient, unread, "message sent");
        Ok(message)
    }

    pub fn unread_count(&self, user: UserId) -> Result<usize, InboxError> {
        self.unread_locked(user)
    }

    fn unread_locked(&self, user: UserId) -> Result<usize, InboxError> {
        let last_read = self.messages.last_read(user)?;
        Ok(self.messages.count_received_after(user, last_read)?)
    }

    /// Mark everything read, publish a zero count, and return one page of
    /// received messages (newest first).
    pub fn read_messages(&self, user: UserId, request: PageRequest) -> Result<Page<Message>, InboxError> {
        {
            let lock = self.recipient_lock(user);
            let _guard = lock.lock().map_err(|_| StoreError::poisoned())?;
            self.messages.set_last_read(user, self.clock.now())?;
            self.notifications.append(user, UNREAD_MESSAGE_COUNT, json!(0))?;
        }

        let rows = self
            .messages
            .received_window(user, request.offset(), request.per_page().saturating_add(1))?;
        Ok(Page::from_lookahead(rows, request))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notifications::InMemoryNotificationStore;
    use haulboard_core::ManualClock;

    struct Fixture {
        inbox: Arc<Inbox<InMemoryMessageStore, Arc<InMemoryNotificationStore>>>,
        notifications: Arc<InMemoryNotificationStore>,
        clock: Arc<ManualClock>,
    }

    fn fixture() -> Fixture {
        let clock = Arc::new(ManualClock::fixed());
        let shared: SharedClock = clock.clone();
        let notifications = Arc::new(InMemoryNotificationStore::new(shared.clone()));
        let inbox = Arc::new(Inbox::new(InMemoryMessageStore::new(), notifications.clone(), shared));
        Fixture {
            inbox,
            notifications,
            clock,
        }
    }

    fn counts(fx: &Fixture, user: UserId) -> Vec<u64> {
        fx.notifications
            .since(user, 0.0)
            .unwrap()
            .into_iter()
            .filter(|n| n.name == UNREAD_MESSAGE_COUNT)
            .filter_map(|n| n.payload.as_u64())
            .collect()
    }

    #[test]
    fn counts_up_then_resets_on_read() {
        let fx = fixture();
        let (alice, bob) = (UserId::new(), UserId::new());

        for body in ["hi", "you there?", "ping"] {
            fx.clock.advance(chrono::Duration::seconds(1));
            fx.inbox.send_message(alice, bob, body).unwrap();
        }
        assert_eq!(fx.inbox.unread_count(bob).unwrap(), 3);

        fx.clock.advance(chrono::Duration::seconds(1));
        let page = fx.inbox.read_messages(bob, PageRequest::first(2).unwrap()).unwrap();
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.items[0].body, "ping");
        assert!(page.has_next);
        assert_eq!(fx.inbox.unread_count(bob).unwrap(), 0);

        fx.clock.advance(chrono::Duration::seconds(1));
        fx.inbox.send_message(alice, bob, "again").unwrap();

        assert_eq!(counts(&fx, bob), vec![1, 2, 3, 0, 1]);
        assert!(counts(&fx, alice).is_empty());
    }

    #[test]
    fn empty_body_is_rejected_without_notification() {
        let fx = fixture();
        let (alice, bob) = (UserId::new(), UserId::new());

        assert!(matches!(
            fx.inbox.send_message(alice, bob, "  "),
            Err(InboxError::Domain(DomainError::Validation(_)))
        ));
        assert!(counts(&fx, bob).is_empty());
    }

    #[test]
    fn concurrent_sends_publish_every_count_once() {
        let fx = fixture();
        let (alice, bob) = (UserId::new(), UserId::new());

        std::thread::scope(|s| {
            for i in 0..8 {
                let inbox = fx.inbox.clone();
                s.spawn(move || inbox.send_message(alice, bob, &format!("msg {i}")).unwrap());
            }
        });

        assert_eq!(counts(&fx, bob), (1..=8).collect::<Vec<u64>>());
        assert_eq!(fx.inbox.unread_count(bob).unwrap(), 8);
    }
}
