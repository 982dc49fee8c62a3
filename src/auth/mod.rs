//! Authentication module for cloudshelf.
//!
//! This module provides the session port the listing and the mutation
//! coordinator use to resolve the current account.

mod session;

pub use session::{AccountSession, SessionPort, SessionStore, SessionSubscription};
