//! Config store core.
//!
//! This crate provides:
//! - [`Store`]: load-once document cache with exact version checks
//! - Per-document reader-writer locks with bounded waits
//! - Typed binding of document subtrees onto application structs
//! - Store configuration resolution (explicit path → env → XDG → defaults)
//! - Structured logging setup
//!
//! # Usage
//!
//! ```ignore
//! use cs_core::{Store, StoreConfig};
//!
//! let store = Store::new(StoreConfig::default());
//! let request = store.request("gateway", "file:///etc/gateway.xml", "1.0".parse()?);
//! let document = store.load(&request, &my_parser)?;
//!
//! let server = store.bind::<ServerConfig>("gateway", "")?;
//! println!("port = {}", server.read().port);
//! ```

pub mod bind;
pub mod config;
pub mod logging;
pub mod store;

pub use bind::{effective_path, Bindable, BindingTable, Bound, FieldBinding, SourceKind};
pub use bind::transform::{Transformer, TransformerRegistry};
pub use config::{ConfigSource, StoreConfig};
pub use store::lock::{LockState, LockTicket, ReadGuard, WriteGuard};
pub use store::parser::{DocumentFormat, DocumentParser, LoadRequest, Secret};
pub use store::{DocumentStatus, Store, StoreStatus};

pub use cs_common::{Error, LockMode, Result, TransformError, Version};
pub use cs_tree::{Document, DocumentSnapshot, Header, NodeRef, NodeTree, Settings};
