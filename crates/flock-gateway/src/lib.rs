//! Websocket gateway: browsers connect here and receive the backend's
//! realtime changes as `GatewayEvent`s.

pub mod connection;
pub mod dispatcher;
pub mod realtime;
pub mod token;

pub use dispatcher::Dispatcher;
pub use realtime::{Change, ChangeHandler, ChangeKind, RealtimeBridge};
pub use token::TokenVerifier;
