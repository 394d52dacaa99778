//! API handlers for Sesio.
//!
//! This module organizes the service's route handlers: session lifecycle and
//! password reset under [`auth`], plus the health and landing routes.

pub mod auth;
pub mod health;
pub mod root;
