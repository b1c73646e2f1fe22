//! Outbound collaborator seams for notification delivery and profile lookup.
//!
//! Notifications are fire-and-forget: the core emits them after a successful
//! commit and never lets a delivery failure roll back booking or payment
//! state. Implementations must swallow their own errors.

use async_trait::async_trait;
use uuid::Uuid;

/// What a notification is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    /// A guest requested a reservation; sent to the host.
    BookingRequested,
    /// A reservation was confirmed; sent to the guest.
    BookingConfirmed,
    /// A reservation was cancelled; sent to the host.
    BookingCancelled,
    /// A payment settled successfully; sent to the guest.
    PaymentReceived,
    /// A payment was declined by the gateway; sent to the guest.
    PaymentFailed,
}

impl NotificationKind {
    /// Stable identifier for structured logging and downstream routing.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BookingRequested => "booking_requested",
            Self::BookingConfirmed => "booking_confirmed",
            Self::BookingCancelled => "booking_cancelled",
            Self::PaymentReceived => "payment_received",
            Self::PaymentFailed => "payment_failed",
        }
    }
}

/// A notification handed to the delivery collaborator.
#[derive(Debug, Clone)]
pub struct Notification {
    /// User the notification is addressed to.
    pub recipient: Uuid,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    /// The booking or payment the notification refers to.
    pub reference: Uuid,
}

/// Trait for notification delivery backends.
///
/// Delivery is at-least-once and best-effort from the core's point of view.
/// Implementations should handle failures internally (log, retry, dead-letter)
/// rather than surface them to the caller.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notification: Notification);
}

/// No-op notifier for embedders that wire their own dispatch elsewhere.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpNotifier;

#[async_trait]
impl Notifier for NoOpNotifier {
    async fn notify(&self, _notification: Notification) {
        // No-op
    }
}

/// Notifier that logs every notification at INFO level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

#[async_trait]
impl Notifier for TracingNotifier {
    async fn notify(&self, notification: Notification) {
        tracing::info!(
            target: "quayside::notify",
            kind = notification.kind.as_str(),
            recipient = %notification.recipient,
            reference = %notification.reference,
            "{}: {}",
            notification.title,
            notification.message
        );
    }
}

/// Profile lookup collaborator, used to put a display name in notification
/// text. Returning `None` is always acceptable.
#[async_trait]
pub trait Directory: Send + Sync {
    async fn display_name(&self, user_id: Uuid) -> Option<String>;
}

/// Directory that knows nobody.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDirectory;

#[async_trait]
impl Directory for NoDirectory {
    async fn display_name(&self, _user_id: Uuid) -> Option<String> {
        None
    }
}

/// Test doubles for the collaborator seams.
#[cfg(any(test, feature = "test-stores"))]
pub mod test {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Arc;
    use tokio::sync::Mutex;

    /// Notifier that captures everything it is handed.
    #[derive(Clone, Default)]
    pub struct CaptureNotifier {
        sent: Arc<Mutex<Vec<Notification>>>,
    }

    impl CaptureNotifier {
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        pub async fn sent(&self) -> Vec<Notification> {
            self.sent.lock().await.clone()
        }
    }

    #[async_trait]
    impl Notifier for CaptureNotifier {
        async fn notify(&self, notification: Notification) {
            self.sent.lock().await.push(notification);
        }
    }

    /// Directory backed by a fixed map.
    #[derive(Clone, Default)]
    pub struct StaticDirectory {
        names: HashMap<Uuid, String>,
    }

    impl StaticDirectory {
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        #[must_use]
        pub fn with_user(mut self, user_id: Uuid, name: impl Into<String>) -> Self {
            self.names.insert(user_id, name.into());
            self
        }
    }

    #[async_trait]
    impl Directory for StaticDirectory {
        async fn display_name(&self, user_id: Uuid) -> Option<String> {
            self.names.get(&user_id).cloned()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test::{CaptureNotifier, StaticDirectory};
    use super::*;

    #[tokio::test]
    async fn test_noop_notifier() {
        let notifier = NoOpNotifier;
        notifier
            .notify(Notification {
                recipient: Uuid::new_v4(),
                kind: NotificationKind::BookingRequested,
                title: "New reservation request".to_string(),
                message: "A guest requested your place".to_string(),
                reference: Uuid::new_v4(),
            })
            .await;
        // Just verifies it doesn't panic
    }

    #[tokio::test]
    async fn test_capture_notifier_records_order() {
        let notifier = CaptureNotifier::new();
        let reference = Uuid::new_v4();

        notifier
            .notify(Notification {
                recipient: Uuid::new_v4(),
                kind: NotificationKind::BookingRequested,
                title: "first".to_string(),
                message: String::new(),
                reference,
            })
            .await;
        notifier
            .notify(Notification {
                recipient: Uuid::new_v4(),
                kind: NotificationKind::PaymentReceived,
                title: "second".to_string(),
                message: String::new(),
                reference,
            })
            .await;

        let sent = notifier.sent().await;
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].kind, NotificationKind::BookingRequested);
        assert_eq!(sent[1].kind, NotificationKind::PaymentReceived);
    }

    #[tokio::test]
    async fn test_static_directory() {
        let user = Uuid::new_v4();
        let directory = StaticDirectory::new().with_user(user, "Lan Pham");

        assert_eq!(
            directory.display_name(user).await,
            Some("Lan Pham".to_string())
        );
        assert_eq!(directory.display_name(Uuid::new_v4()).await, None);
    }

    #[test]
    fn test_kind_as_str() {
        assert_eq!(NotificationKind::BookingRequested.as_str(), "booking_requested");
        assert_eq!(NotificationKind::PaymentFailed.as_str(), "payment_failed");
    }
}
