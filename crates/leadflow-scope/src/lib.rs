//! Leadflow Scope Resolver
//!
//! Computes what a given role may see.
//!
//! - [`resolve`]: per-owner prospect visibility
//! - [`resolve_by_group`]: group aggregate views, independent of ownership
//! - [`list_scope_for`]: which list endpoint a role reads from
//! - [`visible_events`]: creator or target-group membership

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod events;
pub mod resolver;

pub use events::{can_see_event, visible_events};
pub use resolver::{is_visible, list_scope_for, resolve, resolve_by_group, ListScope};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
