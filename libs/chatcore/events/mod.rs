//! Event model and dispatch
//!
//! - `event`: the typed event union and its two-phase decoder
//! - `decoder`: the transport-facing `FrameDecoder`
//! - `center`: filtered, weakly-held subscribers

pub mod center;
pub mod decoder;
pub mod event;

pub use center::{
    EventFilter, EventNotificationCenter, EventSubscriber, ScopeContext, Subscription,
    SubscriptionId,
};
pub use decoder::ChatFrameDecoder;
pub use event::{ChatEvent, DecodeError, DomainEvent, EventType};
