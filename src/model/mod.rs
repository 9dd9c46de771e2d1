//! # Property Graph Model
//!
//! Storage-level DTOs: what the backend hands to the repositories.
//! Domain value objects (services, debts, ...) live in [`crate::domain`].
//!
//! Design rule: this module is pure data. No I/O, no state, no async.

pub mod node;
pub mod relationship;
pub mod value;
pub mod property_map;

pub use node::{Node, NodeId};
pub use relationship::{Relationship, RelId, Direction};
pub use value::Value;
pub use property_map::PropertyMap;
