//! Notification boundary.
//!
//! After a command or supervisor intervention settles, the service hands the
//! new views to a [`Notifier`]. Delivery happens after the match lock is
//! released and is fire-and-forget: a failed delivery is logged and never
//! rolls back or blocks the mutation.

mod view;

use tokio::sync::mpsc;
use tracing::warn;

use crate::core::MatchId;
use crate::error::NotifyError;
use crate::model::Match;

pub use view::{PrivateExtra, PrivateState, PublicState, SeatSummary, TurnView};

/// Consumer of state changes, typically a real-time transport.
pub trait Notifier: Send + Sync {
    /// Broadcast the public view of a match.
    fn notify_public(&self, state: &PublicState) -> Result<(), NotifyError>;

    /// Send one seat its private view.
    fn notify_private(&self, state: &PrivateState) -> Result<(), NotifyError>;
}

/// Discards every notification.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn notify_public(&self, _state: &PublicState) -> Result<(), NotifyError> {
        Ok(())
    }

    fn notify_private(&self, _state: &PrivateState) -> Result<(), NotifyError> {
        Ok(())
    }
}

/// A notification as delivered by [`ChannelNotifier`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Notification {
    Public(PublicState),
    Private(PrivateState),
}

impl Notification {
    #[must_use]
    pub fn match_id(&self) -> MatchId {
        match self {
            Notification::Public(s) => s.match_id,
            Notification::Private(s) => s.match_id,
        }
    }
}

/// Forwards notifications into an unbounded tokio channel.
#[derive(Clone, Debug)]
pub struct ChannelNotifier {
    tx: mpsc::UnboundedSender<Notification>,
}

impl ChannelNotifier {
    /// A notifier and the receiving end of its channel.
    #[must_use]
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Notification>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn send(&self, notification: Notification) -> Result<(), NotifyError> {
        self.tx
            .send(notification)
            .map_err(|_| NotifyError("receiver dropped".to_string()))
    }
}

impl Notifier for ChannelNotifier {
    fn notify_public(&self, state: &PublicState) -> Result<(), NotifyError> {
        self.send(Notification::Public(state.clone()))
    }

    fn notify_private(&self, state: &PrivateState) -> Result<(), NotifyError> {
        self.send(Notification::Private(state.clone()))
    }
}

/// Views captured under the match lock, delivered after it is released.
#[derive(Clone, Debug)]
pub struct Outbox {
    public: PublicState,
    private: Vec<PrivateState>,
}

impl Outbox {
    /// Capture the public view and every seat's private view.
    #[must_use]
    pub fn collect(m: &Match) -> Self {
        Self {
            public: PublicState::of(m),
            private: m
                .seats()
                .iter()
                .filter_map(|s| PrivateState::of(m, s.id))
                .collect(),
        }
    }

    #[must_use]
    pub fn public(&self) -> &PublicState {
        &self.public
    }

    /// Hand everything to `notifier`. Failures are logged.
    pub fn deliver(&self, notifier: &dyn Notifier) {
        let match_id = self.public.match_id;
        if let Err(e) = notifier.notify_public(&self.public) {
            warn!(%match_id, error = %e, "public notification failed");
        }
        for state in &self.private {
            if let Err(e) = notifier.notify_private(state) {
                warn!(%match_id, seat = %state.seat.id, error = %e, "private notification failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};

    use crate::core::{EngineConfig, GameRng, SeatId};
    use crate::rules::lobby;

    fn lobby_with_two() -> Match {
        let epoch = DateTime::<Utc>::UNIX_EPOCH;
        let mut m = Match::new(MatchId::new(9), "QWERTY".into(), &EngineConfig::default(), GameRng::new(1), epoch);
        lobby::add_player(&mut m, SeatId::new(1), "ann", "a".into(), epoch).unwrap();
        lobby::add_player(&mut m, SeatId::new(2), "bob", "b".into(), epoch).unwrap();
        m
    }

    #[test]
    fn test_channel_notifier_delivers_everything() {
        let (notifier, mut rx) = ChannelNotifier::channel();
        Outbox::collect(&lobby_with_two()).deliver(&notifier);

        let mut received = Vec::new();
        while let Ok(n) = rx.try_recv() {
            received.push(n);
        }
        assert_eq!(received.len(), 3);
        assert!(matches!(received[0], Notification::Public(_)));
        assert!(received.iter().all(|n| n.match_id() == MatchId::new(9)));
    }

    #[test]
    fn test_dropped_receiver_is_not_fatal() {
        let (notifier, rx) = ChannelNotifier::channel();
        drop(rx);
        let outbox = Outbox::collect(&lobby_with_two());
        assert!(notifier.notify_public(outbox.public()).is_err());
        outbox.deliver(&notifier);
    }
}
