//! # Code Cache
//!
//! Stores and looks up previously-generated, already-validated code
//! modules so that repeat or structurally similar instructions skip
//! codegen entirely. See spec.md §4.2.
//!
//! - **[`index`]**: the cache index — lookup strategies, ranking,
//!   eviction, atomic persistence.
//! - **[`registry`]**: the dynamic task type registry tracking task
//!   types the LLM-assisted analyzer invents beyond the built-in set.
//! - **[`types`]**: on-disk shapes.

pub mod index;
pub mod registry;
pub mod types;

pub use index::{CacheError, CodeCache, MatchStrategy};
pub use registry::{DynamicTaskTypeRegistry, RegistryError};
pub use types::{CacheIndex, CachedArtifact, CodeModule, ParameterSignature};
