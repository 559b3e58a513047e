//! Realtime channel: typed event vocabulary, server-side broadcast bus
//! and the client connection with its reconnect state machine.

pub mod client;
pub mod event_bus;
pub mod events;
pub mod registry;

pub use client::{ChannelState, RealtimeClient, RealtimeClientConfig};
pub use event_bus::{create_event_bus, EventBus, EventSubscriber, SharedEventBus};
pub use events::{ClientIntent, EventEnvelope, RealtimeEvent};
pub use registry::{HandlerRegistry, Subscription};
