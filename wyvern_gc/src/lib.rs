//! # Wyvern GC
//!
//! A stop-the-world tricolour mark-and-sweep garbage collector for the
//! Wyvern VM. The [`Heap`] owns every domain object in a world and is the
//! single authoritative allocator endpoint; [`Handle`]s are plain indices
//! compared by identity.
//!
//! ## Collection algorithm
//!
//! Collection is a full cycle driven by an explicit worklist, so deep
//! object graphs cannot exhaust the host stack:
//!
//! 1. **Reset**: every live object is recoloured white.
//! 2. **Root marking**: the caller's roots are grayed and enqueued.
//! 3. **Trace**: gray objects have their children visited via [`Trace`]
//!    and turn black, until no gray objects remain.
//! 4. **Sweep**: white objects are [`Finalize`]d and dropped; black
//!    objects are recoloured white for the next cycle.
//!
//! The collector never runs concurrently with a mutator: the VM invokes
//! it between fiber slices, when heap invariants are fully re-established.
//! Collection is infallible; tracing a dead handle aborts, and the sweep
//! always makes progress.

#![forbid(unsafe_code)]
#![deny(clippy::unwrap_in_result)]

mod collector;
mod config;
mod finalizer;
mod handle;

pub use collector::{Heap, Trace, Tracer};
pub use config::{Configuration, Statistics, SweepReport};
pub use finalizer::Finalize;
pub use handle::Handle;
