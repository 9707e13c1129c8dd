//! # pulse-worker
//!
//! Background delivery for SocialPulse push messages. Runs in an execution
//! context that cannot reach the foreground event bus, so it renders system
//! notifications directly through a [`NotificationRenderer`].
//!
//! [`NotificationRenderer`]: pulse_core::traits::NotificationRenderer

pub mod handler;
pub mod render;
pub mod runner;

pub use handler::{BackgroundNotificationHandler, DeliveryError};
pub use render::{LogRenderer, RenderedNotification};
pub use runner::BackgroundWorker;
