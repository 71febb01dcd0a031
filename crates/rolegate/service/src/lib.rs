//! Rolegate Service - the boundary between the privileged store and views
//!
//! Views never touch the [`AccessConfigStore`] directly. They talk to a
//! [`ConfigService`] through a [`ConfigClient`]; the bundled
//! [`ServiceHandle`] carries JSON frames over a channel so the two sides
//! share no memory.
//!
//! [`AccessConfigStore`]: rolegate_store::AccessConfigStore

#![deny(unsafe_code)]

mod client;
mod error;
mod protocol;
mod roles;
mod service;

pub use client::{ConfigClient, ServiceHandle};
pub use error::{ServiceError, ServiceResult};
pub use protocol::{ConfigRequest, ServiceReply};
pub use roles::{has_any_role, has_role};
pub use service::ConfigService;
