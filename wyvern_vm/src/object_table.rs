use crate::error::Error::{AllocationFailure, InternalError};
use crate::error::Result;
use crate::object::{HeapObject, Symbol};
use indexmap::IndexMap;
use tracing::trace;
use wyvern_gc::{Configuration, Handle, Heap, SweepReport};

/// The per-world object record: the single authoritative allocator
/// endpoint.
///
/// The table exclusively owns every live domain object through its heap.
/// Alongside the heap it keeps the interned-symbol table (insertion
/// ordered, so it doubles as the builtin-bound-symbol root list), the
/// heart-beat list and the connection list. Those lists hold non-owning
/// handles; the sweep keeps them valid by purging dead entries.
#[derive(Debug)]
pub struct ObjectTable {
    heap: Heap<HeapObject>,
    symbols: IndexMap<String, Handle>,
    heartbeat: Vec<Handle>,
    connections: Vec<Handle>,
}

impl ObjectTable {
    /// Create an empty table with a heap configuration.
    #[must_use]
    pub fn with_config(config: Configuration) -> Self {
        Self {
            heap: Heap::with_config(config),
            symbols: IndexMap::new(),
            heartbeat: Vec::new(),
            connections: Vec::new(),
        }
    }

    /// Create an empty table with the default heap configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(Configuration::default())
    }

    /// Allocate a domain object.
    ///
    /// # Errors
    ///
    /// Returns [`AllocationFailure`] when the heap is exhausted; callers
    /// reached from bytecode turn this into a fiber crash.
    pub fn allocate(&mut self, object: HeapObject) -> Result<Handle> {
        self.heap.alloc(object).ok_or(AllocationFailure)
    }

    /// The object behind a handle.
    ///
    /// # Errors
    ///
    /// Returns an error for a freed handle; holding one is a bug in the
    /// caller, not in script code.
    pub fn get(&self, handle: Handle) -> Result<&HeapObject> {
        self.heap
            .get(handle)
            .ok_or_else(|| InternalError(format!("dead object handle {handle}")))
    }

    /// Mutable access to the object behind a handle.
    ///
    /// # Errors
    ///
    /// Returns an error for a freed handle.
    pub fn get_mut(&mut self, handle: Handle) -> Result<&mut HeapObject> {
        self.heap
            .get_mut(handle)
            .ok_or_else(|| InternalError(format!("dead object handle {handle}")))
    }

    /// Returns `true` when the handle names a live object.
    #[must_use]
    pub fn is_live(&self, handle: Handle) -> bool {
        self.heap.is_live(handle)
    }

    /// Number of live objects.
    #[must_use]
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// Returns `true` when the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Iterate over every live object.
    pub fn iter(&self) -> impl Iterator<Item = (Handle, &HeapObject)> {
        self.heap.iter()
    }

    /// Look up or create the unique symbol for `name`.
    ///
    /// # Errors
    ///
    /// Returns [`AllocationFailure`] when the heap is exhausted.
    pub fn intern(&mut self, name: &str) -> Result<Handle> {
        if let Some(handle) = self.symbols.get(name) {
            return Ok(*handle);
        }
        let handle = self.allocate(HeapObject::Symbol(Symbol::new(name)))?;
        self.symbols.insert(name.to_string(), handle);
        trace!("interned symbol '{name} as {handle}");
        Ok(handle)
    }

    /// The interned symbol for `name`, if it exists.
    #[must_use]
    pub fn lookup_symbol(&self, name: &str) -> Option<Handle> {
        self.symbols.get(name).copied()
    }

    /// Create a fresh symbol outside the interning guarantee. It must be
    /// reachable from some root or the next collection reclaims it.
    ///
    /// # Errors
    ///
    /// Returns [`AllocationFailure`] when the heap is exhausted.
    pub fn gensym(&mut self, name: &str) -> Result<Handle> {
        self.allocate(HeapObject::Symbol(Symbol::new(name)))
    }

    /// The interned-symbol list in insertion order.
    pub fn interned_symbols(&self) -> impl Iterator<Item = Handle> + '_ {
        self.symbols.values().copied()
    }

    /// Add an object to the heart-beat list.
    pub fn add_heartbeat(&mut self, handle: Handle) {
        if !self.heartbeat.contains(&handle) {
            self.heartbeat.push(handle);
        }
    }

    /// Remove an object from the heart-beat list.
    pub fn remove_heartbeat(&mut self, handle: Handle) {
        self.heartbeat.retain(|entry| *entry != handle);
    }

    /// The heart-beat list.
    #[must_use]
    pub fn heartbeat_list(&self) -> &[Handle] {
        &self.heartbeat
    }

    /// Register a connection object.
    pub fn add_connection(&mut self, handle: Handle) {
        self.connections.push(handle);
    }

    /// Unregister a connection object.
    pub fn remove_connection(&mut self, handle: Handle) {
        self.connections.retain(|entry| *entry != handle);
    }

    /// The live connection list.
    #[must_use]
    pub fn connections(&self) -> &[Handle] {
        &self.connections
    }

    /// Run a collection cycle over the given roots, then unlink dead
    /// handles from the auxiliary lists.
    pub fn collect<R>(&mut self, roots: R) -> SweepReport
    where
        R: IntoIterator<Item = Handle>,
    {
        let report = self.heap.collect(roots);
        if report.swept > 0 {
            let heap = &self.heap;
            self.heartbeat.retain(|handle| heap.is_live(*handle));
            self.connections.retain(|handle| heap.is_live(*handle));
        }
        report
    }

    /// Garbage collection statistics for this table.
    #[must_use]
    pub fn statistics(&self) -> wyvern_gc::Statistics {
        self.heap.statistics()
    }
}

impl Default for ObjectTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::Array;

    #[test]
    fn test_intern_is_unique() -> Result<()> {
        let mut table = ObjectTable::new();
        let first = table.intern("foo")?;
        let second = table.intern("foo")?;
        let other = table.intern("bar")?;
        assert_eq!(first, second);
        assert_ne!(first, other);
        Ok(())
    }

    #[test]
    fn test_gensym_is_not_interned() -> Result<()> {
        let mut table = ObjectTable::new();
        let interned = table.intern("foo")?;
        let generated = table.gensym("foo")?;
        assert_ne!(interned, generated);
        assert_eq!(Some(interned), table.lookup_symbol("foo"));
        Ok(())
    }

    #[test]
    fn test_uninterned_symbol_is_collected() -> Result<()> {
        let mut table = ObjectTable::new();
        let interned = table.intern("foo")?;
        let generated = table.gensym("foo")?;
        let roots: Vec<Handle> = table.interned_symbols().collect();
        table.collect(roots);
        assert!(table.is_live(interned));
        assert!(!table.is_live(generated));
        Ok(())
    }

    #[test]
    fn test_collect_purges_heartbeat_list() -> Result<()> {
        let mut table = ObjectTable::new();
        let array = table.allocate(HeapObject::Array(Array::new()))?;
        table.add_heartbeat(array);
        assert_eq!(1, table.heartbeat_list().len());
        table.collect([]);
        assert!(table.heartbeat_list().is_empty());
        Ok(())
    }

    #[test]
    fn test_len_counts_live_objects() -> Result<()> {
        let mut table = ObjectTable::new();
        table.allocate(HeapObject::Array(Array::new()))?;
        table.intern("foo")?;
        assert_eq!(2, table.len());
        assert!(!table.is_empty());
        Ok(())
    }
}
