//! TabSync: mirrors a browser's open tabs into a shared document store and
//! executes tab commands other devices queue for it.
//!
//! This library crate exposes all modules for use by the binaries and integration tests.

pub mod app;
pub mod browser;
pub mod database;
pub mod managers;
pub mod platform;
pub mod rpc_handler;
pub mod services;
pub mod store;
pub mod sync;
pub mod types;
