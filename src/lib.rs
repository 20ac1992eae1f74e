//! render-core: the container and resource layer under a real-time
//! renderer.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: keep every GPU-facing object in a fixed-capacity, handle-indexed
//!   pool, and give the layers above a small hashmap whose cost model is
//!   obvious.
//! - Layers:
//!   - List<T>: growable contiguous storage with an explicit doubling
//!     policy and checked positional removal.
//!   - BucketMap<K, V, S>: a fixed number of buckets, each a pair of
//!     parallel `List`s (keys, values). No rehash ever happens.
//!   - Arena<T>: fixed-capacity slots behind generational `Handle<T>`s.
//!   - ResourceSystem<B>: one arena per resource kind plus a `GpuBackend`;
//!     create/destroy for images, buffers, shaders, materials, meshes,
//!     renderers and render commands.
//!   - ShaderRegistry: shaders loaded from a `ShaderSource` and kept in a
//!     `BucketMap` by file name.
//!
//! Constraints
//! - Single-threaded and synchronous. Mutation goes through `&mut`; there
//!   is no interior mutability and no locking.
//! - Arena capacity comes from `ResourceConfig` and never grows. Taking a
//!   slot from a full arena panics; `try_take` reports it instead.
//! - A handle resolves only while its slot holds the same generation.
//!   Released handles fail with `ArenaError::StaleHandle`.
//! - The bucket count of a `BucketMap` is fixed at construction.
//!   `load_factor`/`longest_bucket` report skew.
//!
//! Hasher
//! - `BucketMap` takes any `BuildHasher`. The default, `FixedState`, is
//!   seeded with constants so bucket placement is reproducible between
//!   runs. `IdentityState` maps integer keys to themselves.
//!
//! Ownership of device objects
//! - Resources hold backend object ids, not owning wrappers. Destroying a
//!   resource releases its device objects and then its slot. Cross
//!   references (material → shader, command → mesh) are plain handles and
//!   are re-checked at submit time; draws with stale references are
//!   skipped with a warning.
//!
//! Notes and non-goals
//! - No thread safety, no persistence, no real GPU driver. The
//!   `HeadlessBackend` stands in for one in tests.
//! - `ResourceSystem::shutdown` must be called before drop to release
//!   device objects; dropping with live resources only logs a warning.

pub mod arena;
pub mod bucket_map;
mod bucket_map_proptest;
pub mod config;
pub mod gpu;
pub mod hash;
pub mod list;
pub mod registry;
pub mod resource;
pub mod shader_source;
pub mod system;

// Public surface
pub use arena::{Arena, ArenaError, Handle};
pub use bucket_map::BucketMap;
pub use config::{ArenaCapacities, ConfigError, ResourceConfig};
pub use gpu::{GpuBackend, GpuError, HeadlessBackend};
pub use hash::{FixedState, IdentityState};
pub use list::{List, ListError};
pub use registry::ShaderRegistry;
pub use resource::{Resource, ResourceError, ResourceKind};
pub use shader_source::{DirShaderSource, MemoryShaderSource, ShaderSource, ShaderSourceError};
pub use system::ResourceSystem;
