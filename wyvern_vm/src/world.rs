use crate::error::Error::{InternalError, InvalidOperand, PathNotFound};
use crate::error::Result;
use crate::filesystem::{Filesystem, MemoryFilesystem};
use crate::object::{
    Array, Blueprint, Connection, Funcref, Function, HeapObject, Instance, Mapping, Page,
    StringObject, Symbol,
};
use crate::object_table::ObjectTable;
use crate::scheduler::Scheduler;
use crate::value::Value;
use indexmap::IndexMap;
use tracing::debug;
use wyvern_gc::{Handle, SweepReport};

/// The per-world variable block rooted across collections.
///
/// The five proxy slots intercept messages sent to non-object receivers;
/// the connect handler is the funcref a fresh connection's fiber invokes.
#[derive(Clone, Copy, Debug, Default)]
pub struct WorldVars {
    pub nil_proxy: Value,
    pub string_proxy: Value,
    pub array_proxy: Value,
    pub mapping_proxy: Value,
    pub symbol_proxy: Value,
    pub connect_handler: Value,
}

impl WorldVars {
    /// Every slot, for root marking.
    #[must_use]
    pub fn values(&self) -> [Value; 6] {
        [
            self.nil_proxy,
            self.string_proxy,
            self.array_proxy,
            self.mapping_proxy,
            self.symbol_proxy,
            self.connect_handler,
        ]
    }

    /// The proxy installed for a non-object receiver, or nil.
    #[must_use]
    pub fn proxy_for(&self, receiver: &Value, object: Option<&HeapObject>) -> Value {
        match (receiver, object) {
            (Value::Nil, _) => self.nil_proxy,
            (Value::Ref(..), Some(HeapObject::String(..))) => self.string_proxy,
            (Value::Ref(..), Some(HeapObject::Array(..))) => self.array_proxy,
            (Value::Ref(..), Some(HeapObject::Mapping(..))) => self.mapping_proxy,
            (Value::Ref(..), Some(HeapObject::Symbol(..))) => self.symbol_proxy,
            _ => Value::Nil,
        }
    }
}

/// A world: the explicit context threaded through every VM operation.
///
/// Owns the object table, the rooted world variables, the filesystem
/// collaborator and the queues that decouple builtins from the scheduler
/// and the server (pending connection output, GC and shutdown requests).
#[derive(Debug)]
pub struct World {
    objects: ObjectTable,
    vars: WorldVars,
    filesystem: Box<dyn Filesystem>,
    output: Vec<(usize, Vec<u8>)>,
    gc_requested: bool,
    shutdown_requested: bool,
}

impl World {
    /// Create a world with an empty in-memory filesystem.
    #[must_use]
    pub fn new() -> Self {
        Self::with_table(ObjectTable::new())
    }

    /// Create a world over a preconfigured object table.
    #[must_use]
    pub fn with_table(objects: ObjectTable) -> Self {
        Self {
            objects,
            vars: WorldVars::default(),
            filesystem: Box::new(MemoryFilesystem::new()),
            output: Vec::new(),
            gc_requested: false,
            shutdown_requested: false,
        }
    }

    /// The object table.
    #[must_use]
    pub fn objects(&self) -> &ObjectTable {
        &self.objects
    }

    /// Mutable access to the object table.
    pub fn objects_mut(&mut self) -> &mut ObjectTable {
        &mut self.objects
    }

    /// The rooted world variables.
    #[must_use]
    pub fn vars(&self) -> &WorldVars {
        &self.vars
    }

    /// Mutable access to the rooted world variables.
    pub fn vars_mut(&mut self) -> &mut WorldVars {
        &mut self.vars
    }

    /// The filesystem collaborator.
    #[must_use]
    pub fn filesystem(&self) -> &dyn Filesystem {
        self.filesystem.as_ref()
    }

    /// Install a filesystem collaborator.
    pub fn set_filesystem(&mut self, filesystem: Box<dyn Filesystem>) {
        self.filesystem = filesystem;
    }

    // ------------------------------------------------------------------
    // Typed heap access
    // ------------------------------------------------------------------

    fn expect<'a, T>(
        &self,
        found: Option<&'a T>,
        handle: Handle,
        expected: &str,
    ) -> Result<&'a T> {
        match found {
            Some(value) => Ok(value),
            None => Err(InvalidOperand {
                expected: expected.to_string(),
                actual: self
                    .objects
                    .get(handle)
                    .map_or("dead handle", HeapObject::kind_name)
                    .to_string(),
            }),
        }
    }

    /// The string behind a handle.
    ///
    /// # Errors
    ///
    /// Returns an error when the handle names another kind.
    pub fn string(&self, handle: Handle) -> Result<&StringObject> {
        self.expect(self.objects.get(handle)?.as_string(), handle, "string")
    }

    /// The symbol behind a handle.
    ///
    /// # Errors
    ///
    /// Returns an error when the handle names another kind.
    pub fn symbol(&self, handle: Handle) -> Result<&Symbol> {
        self.expect(self.objects.get(handle)?.as_symbol(), handle, "symbol")
    }

    /// A symbol's name.
    ///
    /// # Errors
    ///
    /// Returns an error when the handle names another kind.
    pub fn symbol_name(&self, handle: Handle) -> Result<&str> {
        Ok(self.symbol(handle)?.name())
    }

    /// The array behind a handle.
    ///
    /// # Errors
    ///
    /// Returns an error when the handle names another kind.
    pub fn array(&self, handle: Handle) -> Result<&Array> {
        self.expect(self.objects.get(handle)?.as_array(), handle, "array")
    }

    /// Mutable access to the array behind a handle.
    ///
    /// # Errors
    ///
    /// Returns an error when the handle names another kind.
    pub fn array_mut(&mut self, handle: Handle) -> Result<&mut Array> {
        match self.objects.get_mut(handle)? {
            HeapObject::Array(array) => Ok(array),
            other => Err(InvalidOperand {
                expected: "array".to_string(),
                actual: other.kind_name().to_string(),
            }),
        }
    }

    /// The mapping behind a handle.
    ///
    /// # Errors
    ///
    /// Returns an error when the handle names another kind.
    pub fn mapping(&self, handle: Handle) -> Result<&Mapping> {
        self.expect(self.objects.get(handle)?.as_mapping(), handle, "mapping")
    }

    /// Mutable access to the mapping behind a handle.
    ///
    /// # Errors
    ///
    /// Returns an error when the handle names another kind.
    pub fn mapping_mut(&mut self, handle: Handle) -> Result<&mut Mapping> {
        match self.objects.get_mut(handle)? {
            HeapObject::Mapping(mapping) => Ok(mapping),
            other => Err(InvalidOperand {
                expected: "mapping".to_string(),
                actual: other.kind_name().to_string(),
            }),
        }
    }

    /// The function behind a handle.
    ///
    /// # Errors
    ///
    /// Returns an error when the handle names another kind.
    pub fn function(&self, handle: Handle) -> Result<&Function> {
        self.expect(self.objects.get(handle)?.as_function(), handle, "function")
    }

    /// The funcref behind a handle.
    ///
    /// # Errors
    ///
    /// Returns an error when the handle names another kind.
    pub fn funcref(&self, handle: Handle) -> Result<&Funcref> {
        self.expect(self.objects.get(handle)?.as_funcref(), handle, "funcref")
    }

    /// The blueprint behind a handle.
    ///
    /// # Errors
    ///
    /// Returns an error when the handle names another kind.
    pub fn blueprint(&self, handle: Handle) -> Result<&Blueprint> {
        self.expect(
            self.objects.get(handle)?.as_blueprint(),
            handle,
            "blueprint",
        )
    }

    /// The scripted object behind a handle.
    ///
    /// # Errors
    ///
    /// Returns an error when the handle names another kind.
    pub fn instance(&self, handle: Handle) -> Result<&Instance> {
        self.expect(self.objects.get(handle)?.as_instance(), handle, "object")
    }

    /// Mutable access to the scripted object behind a handle.
    ///
    /// # Errors
    ///
    /// Returns an error when the handle names another kind.
    pub fn instance_mut(&mut self, handle: Handle) -> Result<&mut Instance> {
        match self.objects.get_mut(handle)? {
            HeapObject::Instance(instance) => Ok(instance),
            other => Err(InvalidOperand {
                expected: "object".to_string(),
                actual: other.kind_name().to_string(),
            }),
        }
    }

    /// The connection behind a handle.
    ///
    /// # Errors
    ///
    /// Returns an error when the handle names another kind.
    pub fn connection(&self, handle: Handle) -> Result<&Connection> {
        self.expect(
            self.objects.get(handle)?.as_connection(),
            handle,
            "connection",
        )
    }

    /// Mutable access to the connection behind a handle.
    ///
    /// # Errors
    ///
    /// Returns an error when the handle names another kind.
    pub fn connection_mut(&mut self, handle: Handle) -> Result<&mut Connection> {
        match self.objects.get_mut(handle)? {
            HeapObject::Connection(connection) => Ok(connection),
            other => Err(InvalidOperand {
                expected: "connection".to_string(),
                actual: other.kind_name().to_string(),
            }),
        }
    }

    /// The name of a value's runtime type, consulting the heap for
    /// references.
    #[must_use]
    pub fn type_name(&self, value: Value) -> &'static str {
        match value {
            Value::Ref(handle) => self
                .objects
                .get(handle)
                .map_or("dead handle", HeapObject::kind_name),
            _ => value.tag_name(),
        }
    }

    // ------------------------------------------------------------------
    // Allocation
    // ------------------------------------------------------------------

    /// Allocate a string value.
    ///
    /// # Errors
    ///
    /// Returns an error when the object table is exhausted.
    pub fn alloc_string<B: Into<Vec<u8>>>(&mut self, bytes: B) -> Result<Value> {
        let handle = self
            .objects
            .allocate(HeapObject::String(StringObject::new(bytes)))?;
        Ok(Value::Ref(handle))
    }

    /// Allocate an array value from its elements.
    ///
    /// # Errors
    ///
    /// Returns an error when the object table is exhausted.
    pub fn alloc_array(&mut self, values: Vec<Value>) -> Result<Value> {
        let handle = self
            .objects
            .allocate(HeapObject::Array(Array::from_values(values)))?;
        Ok(Value::Ref(handle))
    }

    /// Allocate an empty mapping value.
    ///
    /// # Errors
    ///
    /// Returns an error when the object table is exhausted.
    pub fn alloc_mapping(&mut self) -> Result<Value> {
        let handle = self.objects.allocate(HeapObject::Mapping(Mapping::new()))?;
        Ok(Value::Ref(handle))
    }

    /// Allocate a funcref value binding a receiver to a message symbol.
    ///
    /// # Errors
    ///
    /// Returns an error when the object table is exhausted.
    pub fn alloc_funcref(&mut self, receiver: Value, message: Handle) -> Result<Value> {
        let handle = self
            .objects
            .allocate(HeapObject::Funcref(Funcref::new(receiver, message)))?;
        Ok(Value::Ref(handle))
    }

    /// Allocate a compiled function.
    ///
    /// # Errors
    ///
    /// Returns an error when the object table is exhausted.
    pub fn alloc_function(&mut self, function: Function) -> Result<Handle> {
        self.objects.allocate(HeapObject::Function(function))
    }

    /// Allocate a blueprint.
    ///
    /// # Errors
    ///
    /// Returns an error when the object table is exhausted.
    pub fn alloc_blueprint(&mut self, blueprint: Blueprint) -> Result<Handle> {
        self.objects.allocate(HeapObject::Blueprint(blueprint))
    }

    /// Look up or create the unique symbol for a name.
    ///
    /// # Errors
    ///
    /// Returns an error when the object table is exhausted.
    pub fn intern(&mut self, name: &str) -> Result<Handle> {
        self.objects.intern(name)
    }

    /// Attach a compiled function to a blueprint under its bound name.
    /// This is the surface the compiler drives after building a function.
    ///
    /// # Errors
    ///
    /// Returns an error when either handle names another kind.
    pub fn function_in_blueprint(&mut self, function: Handle, blueprint: Handle) -> Result<()> {
        match self.objects.get_mut(function)? {
            HeapObject::Function(compiled) => compiled.set_blueprint(blueprint),
            other => {
                return Err(InvalidOperand {
                    expected: "function".to_string(),
                    actual: other.kind_name().to_string(),
                });
            }
        }
        match self.objects.get_mut(blueprint)? {
            HeapObject::Blueprint(compiled) => {
                compiled.add_method(function);
                Ok(())
            }
            other => Err(InvalidOperand {
                expected: "blueprint".to_string(),
                actual: other.kind_name().to_string(),
            }),
        }
    }

    // ------------------------------------------------------------------
    // Value equality
    // ------------------------------------------------------------------

    /// Value equality: structural on primitives, bytewise content for
    /// strings, identity for every other heap kind. Unrelated kinds
    /// compare unequal.
    #[must_use]
    pub fn value_eq(&self, left: Value, right: Value) -> bool {
        match (left, right) {
            (Value::Nil, Value::Nil) => true,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Char(a), Value::Char(b)) => a == b,
            (Value::Ref(a), Value::Ref(b)) => {
                if a == b {
                    return true;
                }
                match (self.objects.get(a), self.objects.get(b)) {
                    (Ok(HeapObject::String(a)), Ok(HeapObject::String(b))) => {
                        a.bytes() == b.bytes()
                    }
                    _ => false,
                }
            }
            _ => false,
        }
    }

    // ------------------------------------------------------------------
    // Mappings
    // ------------------------------------------------------------------

    /// The value stored under `key`, or nil on a miss. Deleted (nil
    /// valued) entries are indistinguishable from absent ones.
    ///
    /// # Errors
    ///
    /// Returns an error when the handle names another kind.
    pub fn mapping_get(&self, mapping: Handle, key: Value) -> Result<Value> {
        let mapping = self.mapping(mapping)?;
        for (entry_key, entry_value) in mapping.entries() {
            if self.value_eq(*entry_key, key) {
                return Ok(*entry_value);
            }
        }
        Ok(Value::Nil)
    }

    /// Store `value` under `key`: replace the entry with an equal key,
    /// else reuse a deleted slot, else append.
    ///
    /// # Errors
    ///
    /// Returns an error when the handle names another kind.
    pub fn mapping_put(&mut self, mapping: Handle, key: Value, value: Value) -> Result<()> {
        let existing = {
            let entries = self.mapping(mapping)?;
            entries
                .entries()
                .iter()
                .position(|(entry_key, _)| self.value_eq(*entry_key, key))
        };
        let mapping = self.mapping_mut(mapping)?;
        if let Some(index) = existing {
            mapping.set_value(index, value);
        } else if let Some(index) = mapping.first_free_slot() {
            mapping.set_entry(index, key, value);
        } else {
            mapping.push_entry(key, value);
        }
        Ok(())
    }

    /// The keys of live entries in first-insertion order, as a new array.
    ///
    /// # Errors
    ///
    /// Returns an error when the handle names another kind or the object
    /// table is exhausted.
    pub fn mapping_keys(&mut self, mapping: Handle) -> Result<Value> {
        let keys: Vec<Value> = self.mapping(mapping)?.live_keys().collect();
        self.alloc_array(keys)
    }

    // ------------------------------------------------------------------
    // Blueprints and instances
    // ------------------------------------------------------------------

    /// The inheritance chain of a blueprint, base first.
    ///
    /// # Errors
    ///
    /// Returns an error when a chain link names another kind.
    pub fn blueprint_chain(&self, master: Handle) -> Result<Vec<Handle>> {
        let mut chain = Vec::new();
        let mut current = Some(master);
        while let Some(handle) = current {
            chain.push(handle);
            current = self.blueprint(handle)?.parent();
            if chain.len() > self.objects.len() {
                return Err(InternalError("blueprint parent cycle".to_string()));
            }
        }
        chain.reverse();
        Ok(chain)
    }

    /// Instantiate a blueprint chain: one page per blueprint, base first,
    /// every slot nil.
    ///
    /// # Errors
    ///
    /// Returns an error when the object table is exhausted.
    pub fn instantiate(&mut self, master: Handle) -> Result<Handle> {
        let chain = self.blueprint_chain(master)?;
        let mut pages = Vec::with_capacity(chain.len());
        for blueprint in chain {
            let slot_count = self.blueprint(blueprint)?.vars().len();
            pages.push(Page::new(blueprint, slot_count));
        }
        self.objects
            .allocate(HeapObject::Instance(Instance::new(pages)))
    }

    /// Whether two blueprints are the same or soulmates (derived from the
    /// same path across reloads).
    ///
    /// # Errors
    ///
    /// Returns an error when a handle names another kind.
    pub fn is_soulmate(&self, a: Handle, b: Handle) -> Result<bool> {
        if a == b {
            return Ok(true);
        }
        let left = self.blueprint(a)?;
        let right = self.blueprint(b)?;
        Ok(self.filesystem.is_soulmate(left, right))
    }

    /// The index of the page owned by the soulmate of `blueprint`.
    ///
    /// # Errors
    ///
    /// Returns an error when a handle names another kind.
    pub fn page_index(&self, instance: Handle, blueprint: Handle) -> Result<Option<usize>> {
        let pages = self.instance(instance)?.pages();
        for (index, page) in pages.iter().enumerate() {
            if self.is_soulmate(page.blueprint(), blueprint)? {
                return Ok(Some(index));
            }
        }
        Ok(None)
    }

    /// Read instance slot `index` relative to `blueprint`'s page.
    ///
    /// # Errors
    ///
    /// Returns an error when the slot does not exist.
    pub fn member_slot(&self, instance: Handle, blueprint: Handle, index: usize) -> Result<Value> {
        let page = self
            .page_index(instance, blueprint)?
            .ok_or_else(|| crate::error::Error::InvalidMemberIndex(index))?;
        self.instance(instance)?.pages()[page]
            .slot(index)
            .ok_or(crate::error::Error::InvalidMemberIndex(index))
    }

    /// Write instance slot `index` relative to `blueprint`'s page.
    ///
    /// # Errors
    ///
    /// Returns an error when the slot does not exist.
    pub fn set_member_slot(
        &mut self,
        instance: Handle,
        blueprint: Handle,
        index: usize,
        value: Value,
    ) -> Result<()> {
        let page = self
            .page_index(instance, blueprint)?
            .ok_or_else(|| crate::error::Error::InvalidMemberIndex(index))?;
        let object = self.instance_mut(instance)?;
        if object.pages_mut()[page].set_slot(index, value) {
            Ok(())
        } else {
            Err(crate::error::Error::InvalidMemberIndex(index))
        }
    }

    /// Find the page and slot of the instance variable named by `symbol`,
    /// searching the most derived page first so reloads shadow correctly.
    ///
    /// # Errors
    ///
    /// Returns an error when a handle names another kind.
    pub fn member_by_name(
        &self,
        instance: Handle,
        symbol: Handle,
    ) -> Result<Option<(usize, usize)>> {
        let name = self.symbol_name(symbol)?;
        let pages = self.instance(instance)?.pages();
        for (page_index, page) in pages.iter().enumerate().rev() {
            let blueprint = self.blueprint(page.blueprint())?;
            for (slot_index, var) in blueprint.vars().iter().enumerate() {
                if self.symbol_name(var.name())? == name {
                    return Ok(Some((page_index, slot_index)));
                }
            }
        }
        Ok(None)
    }

    /// Resolve a message on a blueprint chain: scan the methods of the
    /// starting blueprint, then ascend through the parents. First match
    /// wins.
    ///
    /// # Errors
    ///
    /// Returns an error when a chain link names another kind.
    pub fn resolve_method(&self, start: Handle, message: Handle) -> Result<Option<Handle>> {
        let name = self.symbol_name(message)?;
        let mut current = Some(start);
        while let Some(handle) = current {
            let blueprint = self.blueprint(handle)?;
            for method in blueprint.methods() {
                let function = self.function(*method)?;
                if function.name() == message || self.symbol_name(function.name())? == name {
                    return Ok(Some(*method));
                }
            }
            current = blueprint.parent();
        }
        Ok(None)
    }

    /// Rewrite an instance's page list against a reloaded master
    /// blueprint: soulmate pages keep their slots (resized to the new
    /// layout), new chain levels get fresh pages, removed levels are
    /// discarded.
    ///
    /// # Errors
    ///
    /// Returns an error when a handle names another kind.
    pub fn switch_blueprint(&mut self, instance: Handle, new_master: Handle) -> Result<()> {
        let chain = self.blueprint_chain(new_master)?;
        let mut pages = Vec::with_capacity(chain.len());
        for blueprint in chain {
            let slot_count = self.blueprint(blueprint)?.vars().len();
            let paired = {
                let old_pages = self.instance(instance)?.pages();
                old_pages
                    .iter()
                    .find(|page| {
                        self.is_soulmate(page.blueprint(), blueprint)
                            .unwrap_or(false)
                    })
                    .cloned()
            };
            let page = if let Some(mut page) = paired {
                page.rebind(blueprint, slot_count);
                page
            } else {
                Page::new(blueprint, slot_count)
            };
            pages.push(page);
        }
        debug!(
            "switching {instance} to blueprint {new_master} with {} pages",
            pages.len()
        );
        self.instance_mut(instance)?.replace_pages(pages);
        Ok(())
    }

    /// Bring an instance up to the newest version of its master
    /// blueprint, if the filesystem has one.
    ///
    /// # Errors
    ///
    /// Returns an error when a handle names another kind.
    pub fn refresh_instance(&mut self, instance: Handle) -> Result<()> {
        let Some(master) = self.instance(instance)?.master() else {
            return Ok(());
        };
        let newest = {
            let blueprint = self.blueprint(master)?;
            self.filesystem.find_newest_version(blueprint)
        };
        match newest {
            Some(newest) if newest != master => self.switch_blueprint(instance, newest),
            _ => Ok(()),
        }
    }

    /// Resolve a virtual path to its blueprint.
    ///
    /// # Errors
    ///
    /// Returns an error when the path does not resolve.
    pub fn resolve_path(&self, path: &str) -> Result<Handle> {
        self.filesystem
            .resolve(path)
            .ok_or_else(|| PathNotFound(path.to_string()))
    }

    /// Move an object within the containment tree: unlink it from its
    /// current parent's child chain, then prepend it to `destination`'s
    /// children (or leave it parentless for a nil destination).
    ///
    /// # Errors
    ///
    /// Returns an error when a handle names another kind.
    pub fn move_instance(&mut self, object: Handle, destination: Value) -> Result<()> {
        let object_value = Value::Ref(object);
        let old_parent = self.instance(object)?.parent();

        // Unlink from the old parent's child chain.
        if let Some(parent) = old_parent.handle() {
            let sibling = self.instance(object)?.sibling();
            let first_child = self.instance(parent)?.child();
            if self.value_eq(first_child, object_value) {
                self.instance_mut(parent)?.set_child(sibling);
            } else {
                let mut cursor = first_child;
                while let Some(current) = cursor.handle() {
                    let next = self.instance(current)?.sibling();
                    if self.value_eq(next, object_value) {
                        self.instance_mut(current)?.set_sibling(sibling);
                        break;
                    }
                    cursor = next;
                }
            }
        }

        // Link into the destination's child chain.
        match destination.handle() {
            Some(parent) => {
                let first_child = self.instance(parent)?.child();
                let moved = self.instance_mut(object)?;
                moved.set_parent(destination);
                moved.set_sibling(first_child);
                self.instance_mut(parent)?.set_child(object_value);
            }
            None => {
                let moved = self.instance_mut(object)?;
                moved.set_parent(Value::Nil);
                moved.set_sibling(Value::Nil);
            }
        }
        Ok(())
    }

    /// Render a value for player output. Containers render shallowly with
    /// a bounded depth so cyclic structures terminate.
    #[must_use]
    pub fn display_value(&self, value: Value) -> String {
        self.display_value_depth(value, 3)
    }

    fn display_value_depth(&self, value: Value, depth: usize) -> String {
        let Some(handle) = value.handle() else {
            return match value {
                Value::Char(char) => char.to_string(),
                other => other.to_string(),
            };
        };
        let Ok(object) = self.objects.get(handle) else {
            return format!("{handle}");
        };
        match object {
            HeapObject::String(string) => string.to_text().into_owned(),
            HeapObject::Symbol(symbol) => symbol.to_string(),
            HeapObject::Array(array) => {
                if depth == 0 {
                    return "({...})".to_string();
                }
                let elements: Vec<String> = array
                    .values()
                    .iter()
                    .map(|element| self.display_value_depth(*element, depth - 1))
                    .collect();
                format!("({{{}}})", elements.join(", "))
            }
            HeapObject::Mapping(mapping) => {
                if depth == 0 {
                    return "([...])".to_string();
                }
                let entries: Vec<String> = mapping
                    .entries()
                    .iter()
                    .filter(|(_, entry_value)| !entry_value.is_nil())
                    .map(|(key, entry_value)| {
                        format!(
                            "{}: {}",
                            self.display_value_depth(*key, depth - 1),
                            self.display_value_depth(*entry_value, depth - 1)
                        )
                    })
                    .collect();
                format!("([{}])", entries.join(", "))
            }
            HeapObject::Function(function) => {
                let name = self
                    .symbol_name(function.name())
                    .unwrap_or("<anonymous>");
                format!("<function {name}>")
            }
            HeapObject::Funcref(funcref) => {
                let name = self.symbol_name(funcref.message()).unwrap_or("<dead>");
                format!("<funcref '{name}>")
            }
            HeapObject::Blueprint(blueprint) => format!("<blueprint {}>", blueprint.path()),
            HeapObject::Instance(instance) => match instance.master() {
                Some(master) => match self.blueprint(master) {
                    Ok(blueprint) => format!("<object {}>", blueprint.path()),
                    Err(..) => "<object>".to_string(),
                },
                None => "<object>".to_string(),
            },
            HeapObject::Connection(connection) => {
                format!("<connection {}>", connection.token())
            }
        }
    }

    // ------------------------------------------------------------------
    // Connections and output
    // ------------------------------------------------------------------

    /// Wrap a freshly accepted socket token in a connection object and
    /// register it.
    ///
    /// # Errors
    ///
    /// Returns an error when the object table is exhausted.
    pub fn create_connection(&mut self, token: usize) -> Result<Handle> {
        let handle = self
            .objects
            .allocate(HeapObject::Connection(Connection::new(token)))?;
        self.objects.add_connection(handle);
        Ok(handle)
    }

    /// The registered connection for a socket token.
    #[must_use]
    pub fn connection_by_token(&self, token: usize) -> Option<Handle> {
        self.objects
            .connections()
            .iter()
            .copied()
            .find(|handle| {
                self.connection(*handle)
                    .map(|connection| connection.token() == token)
                    .unwrap_or(false)
            })
    }

    /// The registered connection whose player equals `player`.
    #[must_use]
    pub fn connection_for_player(&self, player: Value) -> Option<Handle> {
        self.objects.connections().iter().copied().find(|handle| {
            self.connection(*handle)
                .map(|connection| self.value_eq(connection.player(), player))
                .unwrap_or(false)
        })
    }

    /// Queue bytes for a connection; the scheduler flushes the queue
    /// through the server after each pass.
    pub fn enqueue_output(&mut self, token: usize, bytes: Vec<u8>) {
        self.output.push((token, bytes));
    }

    /// Drain the pending connection output.
    pub fn take_output(&mut self) -> Vec<(usize, Vec<u8>)> {
        std::mem::take(&mut self.output)
    }

    // ------------------------------------------------------------------
    // Collection
    // ------------------------------------------------------------------

    /// Ask the scheduler to run a collection cycle at the next safe
    /// point.
    pub fn request_gc(&mut self) {
        self.gc_requested = true;
    }

    /// Consume a pending GC request.
    pub fn take_gc_request(&mut self) -> bool {
        std::mem::take(&mut self.gc_requested)
    }

    /// Ask the driver loop to shut the world down.
    pub fn request_shutdown(&mut self) {
        self.shutdown_requested = true;
    }

    /// Whether shutdown has been requested.
    #[must_use]
    pub fn shutdown_requested(&self) -> bool {
        self.shutdown_requested
    }

    /// Run a full collection cycle.
    ///
    /// Roots: every fiber owned by the scheduler (stacks, frames,
    /// accumulators, fiber variables), the world variable block, the
    /// interned-symbol list, the live connections (and through them their
    /// player objects) and whatever the filesystem keeps loaded.
    pub fn collect(&mut self, scheduler: &Scheduler) -> SweepReport {
        let mut roots: Vec<Handle> = Vec::new();
        scheduler.roots(&mut roots);
        for value in self.vars.values() {
            if let Some(handle) = value.handle() {
                roots.push(handle);
            }
        }
        roots.extend(self.objects.interned_symbols());
        roots.extend_from_slice(self.objects.connections());
        roots.extend(self.filesystem.roots());
        self.objects.collect(roots)
    }

    /// Live object counts per kind.
    #[must_use]
    pub fn kind_counts(&self) -> IndexMap<&'static str, usize> {
        let mut counts = IndexMap::new();
        for (_, object) in self.objects.iter() {
            *counts.entry(object.kind_name()).or_insert(0) += 1;
        }
        counts
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}
