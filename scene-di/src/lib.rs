//! # scene-di
//!
//! A type-keyed dependency injection container driven by scene lifecycle hooks.
//!
//! - **Registry**: maps a [`Capability`] (any type, including `dyn Trait`) to a
//!   [`Producer`] or a pre-built instance, rejecting duplicates
//! - **Resolver**: [`Container::resolve`] builds each capability once, resolving
//!   constructor dependencies recursively through [`Construct`], caches it as a
//!   singleton and detects cycles
//! - **Injector**: [`Container::inject_into`] fills the members a target declares
//!   through [`Inject`], isolating failures per member and per target
//! - **Lifecycle**: [`Lifecycle`] runs an [`Installer`] and injects [`Scope`]s at
//!   awake, start, scope entry and on demand
//!
//! ## Feature Flags
//!
//! - `tracing` (default): structured logs through the `tracing` crate
//! - `thread-safe`: `Arc` + `RwLock` storage; services must be `Send + Sync`

mod macros;

pub mod capability;
pub mod config;
pub mod construct;
pub mod container;
pub mod error;
pub mod injector;
pub mod instance;
pub mod lifecycle;
pub mod producer;
pub mod registry;
pub mod resolve_guard;
pub mod runtime;

pub use capability::*;
pub use config::*;
pub use construct::*;
pub use container::*;
pub use error::*;
pub use injector::*;
pub use instance::*;
pub use lifecycle::*;
pub use producer::*;
pub use registry::*;
pub use resolve_guard::*;
pub use runtime::{AnyShared, Service, Shared, Store};
