//! # pulse-realtime
//!
//! Foreground coordination layer for SocialPulse. Provides:
//!
//! - A presence channel holding one live remote subscription per tracked user
//! - A process-local event bus with ordered, re-entrancy-safe dispatch
//! - A notification gateway driving the permission state machine, the
//!   device token lifecycle, and foreground message routing onto the bus
//! - In-memory collaborators for single-process deployments

pub mod bus;
pub mod notification;
pub mod presence;
pub mod retry;

pub use bus::EventBus;
pub use notification::gateway::NotificationGateway;
pub use presence::channel::PresenceChannel;
