//! Live presence tracking over the remote presence store.

pub mod channel;
pub mod decode;
pub mod feed;
pub mod memory_store;
pub mod stream;

pub use channel::PresenceChannel;
pub use memory_store::MemoryPresenceStore;
pub use stream::PresenceStream;
