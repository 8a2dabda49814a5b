use crate::object::Blueprint;
use indexmap::IndexMap;
use std::fmt::Debug;
use wyvern_gc::Handle;

/// The virtual filesystem the world loads blueprints through.
///
/// The compiler and the on-disk layout live behind this boundary: the VM
/// only ever asks for blueprints by virtual path, for reloads, and for the
/// soulmate relation that pairs blueprints across reload cycles. Loaded
/// blueprints are GC roots, surfaced through [`roots`](Filesystem::roots).
pub trait Filesystem: Debug {
    /// The current blueprint for a virtual path.
    fn resolve(&self, path: &str) -> Option<Handle>;

    /// The singleton instance registered for a virtual path, if any.
    fn get_object(&self, path: &str) -> Option<Handle>;

    /// Recompile the source behind a blueprint, returning the replacement
    /// blueprint.
    fn recompile(&self, blueprint: &Blueprint) -> Option<Handle>;

    /// The newest blueprint derived from the same path as the given one.
    fn find_newest_version(&self, blueprint: &Blueprint) -> Option<Handle>;

    /// Whether two blueprints were derived from the same virtual path
    /// across reload cycles.
    fn is_soulmate(&self, a: &Blueprint, b: &Blueprint) -> bool {
        a.path() == b.path()
    }

    /// Every handle the filesystem keeps alive across collections.
    fn roots(&self) -> Vec<Handle>;
}

/// An in-memory filesystem: a path-indexed registry of already-compiled
/// blueprints and singleton objects.
///
/// Tests and the boot sequence populate it with hand-assembled blueprints;
/// re-registering a path models a reload, and `resolve` always answers
/// with the newest registration.
#[derive(Debug, Default)]
pub struct MemoryFilesystem {
    blueprints: IndexMap<String, Vec<Handle>>,
    objects: IndexMap<String, Handle>,
}

impl MemoryFilesystem {
    /// Create an empty filesystem.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a compiled blueprint for a path. Registering a path again
    /// models a reload cycle; earlier registrations stay soulmates of the
    /// new one.
    pub fn register_blueprint<S: Into<String>>(&mut self, path: S, blueprint: Handle) {
        self.blueprints.entry(path.into()).or_default().push(blueprint);
    }

    /// Register a singleton object for a path.
    pub fn register_object<S: Into<String>>(&mut self, path: S, object: Handle) {
        self.objects.insert(path.into(), object);
    }
}

impl Filesystem for MemoryFilesystem {
    fn resolve(&self, path: &str) -> Option<Handle> {
        self.blueprints.get(path)?.last().copied()
    }

    fn get_object(&self, path: &str) -> Option<Handle> {
        self.objects.get(path).copied()
    }

    fn recompile(&self, blueprint: &Blueprint) -> Option<Handle> {
        // There is no compiler behind an in-memory registry; the newest
        // registration stands in for the recompilation result.
        self.resolve(blueprint.path())
    }

    fn find_newest_version(&self, blueprint: &Blueprint) -> Option<Handle> {
        self.resolve(blueprint.path())
    }

    fn roots(&self) -> Vec<Handle> {
        self.blueprints
            .values()
            .flatten()
            .copied()
            .chain(self.objects.values().copied())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::HeapObject;
    use crate::object_table::ObjectTable;

    #[test]
    fn test_resolve_answers_newest_registration() -> crate::Result<()> {
        let mut table = ObjectTable::new();
        let old = table.allocate(HeapObject::Blueprint(Blueprint::new("/world/room", None)))?;
        let new = table.allocate(HeapObject::Blueprint(Blueprint::new("/world/room", None)))?;

        let mut filesystem = MemoryFilesystem::new();
        filesystem.register_blueprint("/world/room", old);
        assert_eq!(Some(old), filesystem.resolve("/world/room"));
        filesystem.register_blueprint("/world/room", new);
        assert_eq!(Some(new), filesystem.resolve("/world/room"));
        assert_eq!(None, filesystem.resolve("/world/void"));
        Ok(())
    }

    #[test]
    fn test_soulmates_share_a_path() {
        let a = Blueprint::new("/world/room", None);
        let b = Blueprint::new("/world/room", None);
        let c = Blueprint::new("/world/hall", None);
        let filesystem = MemoryFilesystem::new();
        assert!(filesystem.is_soulmate(&a, &b));
        assert!(!filesystem.is_soulmate(&a, &c));
    }

    #[test]
    fn test_roots_cover_all_registrations() -> crate::Result<()> {
        let mut table = ObjectTable::new();
        let blueprint =
            table.allocate(HeapObject::Blueprint(Blueprint::new("/world/room", None)))?;
        let mut filesystem = MemoryFilesystem::new();
        filesystem.register_blueprint("/world/room", blueprint);
        assert_eq!(vec![blueprint], filesystem.roots());
        Ok(())
    }
}
