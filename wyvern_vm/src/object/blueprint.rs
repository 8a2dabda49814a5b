use wyvern_bytecode::TypeTag;
use wyvern_gc::Handle;

/// One declared instance variable of a blueprint: the slot's name symbol
/// and its declared type.
#[derive(Clone, Copy, Debug)]
pub struct VarDef {
    name: Handle,
    type_tag: TypeTag,
}

impl VarDef {
    /// Declare a variable.
    #[must_use]
    pub fn new(name: Handle, type_tag: TypeTag) -> Self {
        Self { name, type_tag }
    }

    /// The variable's name symbol.
    #[must_use]
    pub fn name(&self) -> Handle {
        self.name
    }

    /// The variable's declared type.
    #[must_use]
    pub fn type_tag(&self) -> TypeTag {
        self.type_tag
    }
}

/// The compiled form of a scripted source file.
///
/// A blueprint carries the instance-variable layout its instances' pages
/// are sized by, the list of methods compiled into it, and a parent
/// blueprint (single inheritance). Reloading a source file produces a new
/// blueprint with the same virtual path; blueprints sharing a path across
/// reload cycles are *soulmates*, which is how instances keep their slots
/// through [`switch_blueprint`](crate::World::switch_blueprint).
#[derive(Clone, Debug)]
pub struct Blueprint {
    path: String,
    parent: Option<Handle>,
    vars: Vec<VarDef>,
    methods: Vec<Handle>,
}

impl Blueprint {
    /// Create a blueprint for a virtual path.
    pub fn new<S: Into<String>>(path: S, parent: Option<Handle>) -> Self {
        Self {
            path: path.into(),
            parent,
            vars: Vec::new(),
            methods: Vec::new(),
        }
    }

    /// The virtual path the blueprint was compiled from.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The parent blueprint, if any.
    #[must_use]
    pub fn parent(&self) -> Option<Handle> {
        self.parent
    }

    /// The instance-variable layout.
    #[must_use]
    pub fn vars(&self) -> &[VarDef] {
        &self.vars
    }

    /// Declare an instance variable, returning its slot offset.
    pub fn add_var(&mut self, var: VarDef) -> usize {
        self.vars.push(var);
        self.vars.len() - 1
    }

    /// The methods compiled into this blueprint, in definition order.
    #[must_use]
    pub fn methods(&self) -> &[Handle] {
        &self.methods
    }

    pub(crate) fn add_method(&mut self, function: Handle) {
        self.methods.push(function);
    }
}
