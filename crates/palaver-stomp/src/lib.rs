//! # palaver-stomp
//!
//! The STOMP messaging layer: frame codec, per-frame authentication, the
//! destination authorization policy, and the subscription/delivery broker.
//!
//! A connection is admitted once at handshake time, but every frame on the
//! resulting session is run through [`interceptor::FrameInterceptor`] so the
//! session's identity is re-established no matter which worker processes the
//! frame, then checked against the [`policy::DestinationPolicy`] before any
//! business handler sees it.

pub mod broker;
pub mod error;
pub mod frame;
pub mod interceptor;
pub mod policy;

pub use broker::{MessageBroker, Subscription};
pub use error::FrameError;
pub use frame::{headers, Command, Frame};
pub use interceptor::{ConnectionAttributes, FrameContext, FrameInterceptor};
pub use policy::{Access, DestinationPolicy, FrameDirection};
