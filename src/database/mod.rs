//! TabSync local state database.
//!
//! Provides SQLite connection management and schema migrations for the
//! device-side state that lives outside the remote store: the store-access
//! config blob, the local device id and the cached device name.
//!
//! # Usage
//!
//! ```no_run
//! use tabsync::database::Database;
//!
//! // Open a persistent database
//! let db = Database::open("tabsync.db").expect("failed to open database");
//!
//! // Or use an in-memory database for testing
//! let db = Database::open_in_memory().expect("failed to open in-memory database");
//!
//! // Access the underlying connection for queries
//! let conn = db.connection();
//! ```

pub mod connection;
pub mod migrations;

pub use connection::Database;
