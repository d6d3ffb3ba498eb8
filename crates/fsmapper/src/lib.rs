//! Merged virtual filesystem for module development servers.
//!
//! Several physical directory trees (module families below a module root,
//! declared components and a document root) are explored once at startup
//! and presented as a single namespace. [`FsMapper`] answers `head`, `get`,
//! `subscribe` and `unsubscribe` requests against it.

pub mod config;
pub mod error;
pub mod explore;
pub mod mapping;
pub mod namespace;
pub mod query;
pub mod resolve;
pub mod types;

pub use config::MapperConfig;
pub use error::{MapperError, Result};
pub use explore::{explore, DirNode, ExploreOptions, TreeEntry};
pub use mapping::ComponentTable;
pub use namespace::{MappingSource, Namespace, NamespaceEntry};
pub use query::{strip_crawl_marker, FsMapper};
pub use resolve::Resolution;
pub use types::{Command, EntryKind, Listing, Request, Response, Stat, StatInfo};
