//! # sd-notifications
//!
//! Side channels of the service desk workflows.
//!
//! - [`sink`]: chat delivery (Telegram Bot API, or disabled)
//! - [`realtime`]: typed events fanned out to connected clients
//! - [`notifier`]: the composition the workflows call after a change has
//!   been committed; delivery problems are logged and never returned

pub mod messages;
pub mod notifier;
pub mod realtime;
pub mod sink;

pub use notifier::{Delivery, Notifier};
pub use realtime::{
    BroadcastError, BroadcastHub, Broadcaster, Envelope, NoopBroadcaster, RealtimeEvent, Target,
};
pub use sink::{DisabledSink, NotificationSink, RecordingSink, SinkError, SinkResult, TelegramSink};
