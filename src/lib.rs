//! # Docstore
//!
//! A generic document store adapter: records describe their namespace and
//! identifier, and any backend implementing [`store::Store`] can create,
//! read, update, delete and page through them.
//!
//! ## Features
//!
//! - **Store Module**: Backend-neutral store API, record capability traits,
//!   MongoDB and in-memory backends, and a URL-based factory
//! - **Logging Module**: Optional `tracing` subscriber bootstrap
//!
//! ## Optional Features
//!
//! - `mongo` (default): MongoDB backend
//!
//! ## Example
//!
//! ```rust
//! use docstore::store::{ListOpt, Sort};
//!
//! let opt = ListOpt::new(2, 25, Sort::CreatedDesc);
//! assert_eq!(opt.skip()?, 50);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs)]
#![warn(clippy::all)]

// Re-export core error types
pub use error::{Error, Result};

// Core modules
pub mod error;
pub mod logging;
pub mod store;

// Re-export commonly used types
pub mod prelude {
    //! Common types and traits for convenient importing

    pub use crate::error::{Error, Result, StoreError, StoreResult};
    pub use crate::store::{
        AnyStore, IdSetter, Item, ListOpt, MemoryStore, MongoConfig, MongoStore, Sort, Store,
        StoreBackend, StoreFactory, TimeTracker,
    };
}

// Version information
/// The version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// The name of this crate
pub const CRATE_NAME: &str = env!("CARGO_PKG_NAME");
