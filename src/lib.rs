//! Storefront client core: persisted bearer session plus the request gateway
//! every API call goes through.
//!
//! SYSTEM CONTEXT
//! ==============
//! `storage` persists the two session keys, `session` owns login state,
//! `gateway` injects tenant/auth headers and reacts to 401s, `navigation`
//! turns expiry events into a redirect, and `services` wrap the upstream
//! endpoints the pages call.

pub mod config;
pub mod gateway;
pub mod navigation;
pub mod services;
pub mod session;
pub mod storage;
pub mod transport;

#[cfg(test)]
mod test_helpers;

pub use config::StorefrontConfig;
pub use gateway::{ApiError, RequestBody, RequestGateway, RequestOptions, SessionEvent};
pub use session::{Session, SessionStore, User};
