//! Aether Market Core - Shared domain types.
//!
//! This crate provides the types shared by the storefront server and its
//! integration tests:
//! - typed identifiers, prices and statuses mirrored from the remote shop API
//! - the visitor's cart and its bookkeeping rules
//! - the authenticated session record and its persisted form
//!
//! # Architecture
//!
//! The core crate contains only types and pure logic - no I/O, no HTTP
//! clients, no cookie handling. Persisted state crosses the boundary as
//! strings and comes back as `Result<_, DecodeError>`, leaving the caller to
//! decide whether to log, alert or reset.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for ids, prices, emails and statuses
//! - [`cart`] - Cart lines keyed by product and variant
//! - [`session`] - Authenticated user session and the auth state machine

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod decode;
pub mod session;
pub mod types;

pub use cart::{Cart, CartLine, LineKey};
pub use decode::DecodeError;
pub use session::{AuthState, BearerToken, ProfileUpdate, Session, User};
pub use types::*;
