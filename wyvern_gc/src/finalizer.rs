//! Finalizer support for garbage-collected objects.

/// Trait for objects that need custom cleanup before being dropped.
///
/// Objects implementing this trait have their `finalize` method called
/// during the sweep phase, after the object has been determined to be
/// unreachable and before its slot is dropped. This is where auxiliary
/// off-heap state (sockets, host buffers) is released.
///
/// # Contract
///
/// The `finalize` method must not:
/// - Access other garbage-collected objects (they may already be swept)
/// - Allocate new heap objects
/// - Panic (the sweep must always make progress)
///
/// The finalize method is called exactly once per reclaimed object.
pub trait Finalize {
    /// Perform custom cleanup before the object is dropped.
    fn finalize(&self) {}
}
