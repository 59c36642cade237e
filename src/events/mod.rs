//! Event Processing Module
//!
//! Handlers emit a [`DomainEvent`] after a write commits. The processor
//! turns events into notifications, re-checks achievements, and pushes
//! notifications to an optional webhook.
//!
//! Events go through an [`EventDispatcher`]. In production a bounded
//! queue feeds a background consumer task; tests process inline so
//! results are visible as soon as the request returns.

use chrono::Utc;
use reqwest::Client;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::achievements;
use crate::cache::{self, Cache};
use crate::models::Notification;
use crate::store::{Store, StoreError};

pub type EventResult<T> = Result<T, EventError>;

#[derive(Error, Debug)]
pub enum EventError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
    #[error("Delivery error: {0}")]
    Delivery(String),
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomainEvent {
    FriendRequestSent {
        request_id: String,
        sender_id: String,
        receiver_id: String,
    },
    FriendRequestAccepted {
        request_id: String,
        sender_id: String,
        receiver_id: String,
    },
    WishListCreated {
        user_id: String,
        wish_list_id: String,
    },
    WishCreated {
        user_id: String,
        wish_id: String,
    },
    WishReserved {
        wish_id: String,
        owner_id: String,
        reserver_id: String,
    },
    ReservationCancelled {
        wish_id: String,
        owner_id: String,
        reserver_id: String,
    },
}

impl DomainEvent {
    pub fn name(&self) -> &'static str {
        match self {
            DomainEvent::FriendRequestSent { .. } => "friend_request.sent",
            DomainEvent::FriendRequestAccepted { .. } => "friend_request.accepted",
            DomainEvent::WishListCreated { .. } => "wish_list.created",
            DomainEvent::WishCreated { .. } => "wish.created",
            DomainEvent::WishReserved { .. } => "wish.reserved",
            DomainEvent::ReservationCancelled { .. } => "reservation.cancelled",
        }
    }
}

/// Result of processing an event
#[derive(Debug, Default)]
pub struct ProcessResult {
    pub notifications_created: usize,
    pub achievements_granted: Vec<String>,
    pub deliveries_failed: usize,
}

/// Event processor handles notification fan-out and achievement checks
pub struct EventProcessor {
    store: Arc<Store>,
    cache: Cache,
    http_client: Client,
    webhook_url: Option<String>,
}

impl EventProcessor {
    pub fn new(store: Arc<Store>, cache: Cache) -> Self {
        Self {
            store,
            cache,
            http_client: Client::builder()
                .timeout(std::time::Duration::from_secs(10))
                .build()
                .unwrap_or_else(|_| Client::new()),
            webhook_url: None,
        }
    }

    /// POST every new notification to `url` as JSON
    pub fn with_webhook(mut self, url: Option<String>) -> Self {
        self.webhook_url = url;
        self
    }

    pub async fn process(&self, event: &DomainEvent) -> EventResult<ProcessResult> {
        let mut result = ProcessResult::default();
        log::debug!("Processing event {}", event.name());

        match event {
            DomainEvent::FriendRequestSent {
                request_id,
                sender_id,
                receiver_id,
            } => {
                let sender = self.display_name(sender_id);
                let notification = notification(
                    receiver_id,
                    "friend_request",
                    Some(sender_id),
                    ("friend_request", request_id),
                    "New friend request",
                    format!("{} wants to be your friend", sender),
                );
                self.notify(notification, &mut result).await?;
            }
            DomainEvent::FriendRequestAccepted {
                request_id,
                sender_id,
                receiver_id,
            } => {
                let receiver = self.display_name(receiver_id);
                let notification = notification(
                    sender_id,
                    "friend_accepted",
                    Some(receiver_id),
                    ("friend_request", request_id),
                    "Friend request accepted",
                    format!("{} accepted your friend request", receiver),
                );
                self.notify(notification, &mut result).await?;
                self.check_achievements(sender_id, &mut result).await?;
                self.check_achievements(receiver_id, &mut result).await?;
            }
            DomainEvent::WishListCreated { user_id, .. } | DomainEvent::WishCreated { user_id, .. } => {
                self.check_achievements(user_id, &mut result).await?;
            }
            DomainEvent::WishReserved {
                wish_id,
                owner_id,
                reserver_id,
            } => {
                // No actor: the owner must not learn who is buying the gift
                let notification = notification(
                    owner_id,
                    "wish_reserved",
                    None,
                    ("wish", wish_id),
                    "A wish was reserved",
                    format!("Someone reserved {}", self.wish_title(wish_id)),
                );
                self.notify(notification, &mut result).await?;
                self.check_achievements(reserver_id, &mut result).await?;
            }
            DomainEvent::ReservationCancelled { wish_id, owner_id, .. } => {
                let notification = notification(
                    owner_id,
                    "reservation_cancelled",
                    None,
                    ("wish", wish_id),
                    "A reservation was cancelled",
                    format!("{} is available again", self.wish_title(wish_id)),
                );
                self.notify(notification, &mut result).await?;
            }
        }

        Ok(result)
    }

    async fn check_achievements(&self, user_id: &str, result: &mut ProcessResult) -> EventResult<()> {
        let granted = achievements::evaluate(&self.store, user_id)?;
        if granted.is_empty() {
            return Ok(());
        }
        self.cache.forget_pattern(&cache::user_pattern(user_id));

        for achievement in granted {
            let notification = notification(
                user_id,
                "achievement_unlocked",
                None,
                ("achievement", achievement.key),
                &format!("Achievement unlocked: {}", achievement.title),
                achievement.description.to_string(),
            );
            self.notify(notification, result).await?;
            result.achievements_granted.push(achievement.key.to_string());
        }
        Ok(())
    }

    async fn notify(&self, notification: Notification, result: &mut ProcessResult) -> EventResult<()> {
        self.store.create_notification(&notification)?;
        result.notifications_created += 1;

        if let Some(ref url) = self.webhook_url {
            if let Err(e) = self.deliver(url, &notification).await {
                log::warn!("Failed to deliver notification {}: {}", notification.id, e);
                result.deliveries_failed += 1;
            }
        }
        Ok(())
    }

    async fn deliver(&self, url: &str, notification: &Notification) -> EventResult<()> {
        let response = self
            .http_client
            .post(url)
            .header("X-Wishlist-Notification", &notification.notification_type)
            .json(notification)
            .send()
            .await
            .map_err(|e| EventError::Delivery(format!("HTTP error: {}", e)))?;

        if !response.status().is_success() {
            return Err(EventError::Delivery(format!("HTTP {} from {}", response.status(), url)));
        }
        Ok(())
    }

    fn display_name(&self, user_id: &str) -> String {
        self.store
            .get_user(user_id)
            .map(|u| u.display_name)
            .unwrap_or_else(|_| "Someone".to_string())
    }

    fn wish_title(&self, wish_id: &str) -> String {
        self.store
            .get_wish(wish_id)
            .map(|w| format!("\"{}\"", w.title))
            .unwrap_or_else(|_| "a wish".to_string())
    }

    /// Start the queue consumer and return a dispatcher that feeds it
    pub fn spawn_worker(self: Arc<Self>, capacity: usize) -> EventDispatcher {
        let (sender, mut receiver) = mpsc::channel::<DomainEvent>(capacity.max(1));
        let processor = self.clone();

        tokio::spawn(async move {
            while let Some(event) = receiver.recv().await {
                run(&processor, &event).await;
            }
            log::info!("Event worker stopped");
        });

        EventDispatcher::Queued {
            sender,
            processor: self,
        }
    }
}

fn notification(
    user_id: &str,
    notification_type: &str,
    actor_id: Option<&str>,
    resource: (&str, &str),
    title: &str,
    body: String,
) -> Notification {
    Notification {
        id: Uuid::new_v4().to_string(),
        user_id: user_id.to_string(),
        notification_type: notification_type.to_string(),
        actor_id: actor_id.map(String::from),
        resource_type: Some(resource.0.to_string()),
        resource_id: Some(resource.1.to_string()),
        title: title.to_string(),
        body,
        read: false,
        created_at: Utc::now(),
    }
}

async fn run(processor: &EventProcessor, event: &DomainEvent) {
    match processor.process(event).await {
        Ok(result) => log::debug!(
            "Event {} produced {} notification(s)",
            event.name(),
            result.notifications_created
        ),
        Err(e) => log::error!("Failed to process event {}: {}", event.name(), e),
    }
}

/// Where handlers send events. Processing failures are logged, never
/// returned, so a committed write is never reported as failed.
#[derive(Clone)]
pub enum EventDispatcher {
    Inline(Arc<EventProcessor>),
    Queued {
        sender: mpsc::Sender<DomainEvent>,
        processor: Arc<EventProcessor>,
    },
}

impl EventDispatcher {
    pub fn inline(processor: EventProcessor) -> Self {
        EventDispatcher::Inline(Arc::new(processor))
    }

    pub async fn dispatch(&self, event: DomainEvent) {
        match self {
            EventDispatcher::Inline(processor) => run(processor, &event).await,
            EventDispatcher::Queued { sender, processor } => {
                if let Err(mpsc::error::SendError(event)) = sender.send(event).await {
                    log::warn!("Event queue closed, processing {} inline", event.name());
                    run(processor, &event).await;
                }
            }
        }
    }
}
