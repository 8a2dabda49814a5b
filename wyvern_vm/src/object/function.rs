use crate::value::Value;
use wyvern_bytecode::{FunctionFlags, Instruction, TypeTag, assemble};
use wyvern_gc::Handle;

/// An immutable compiled function.
///
/// A function owns its flat bytecode stream plus the side tables the
/// stream's word operands index: constants, referenced type tags and label
/// offsets. It knows its local-slot count, its flags, the symbol it is
/// bound to and the blueprint it was compiled into (driver functions built
/// outside any blueprint have none).
#[derive(Clone, Debug)]
pub struct Function {
    name: Handle,
    blueprint: Option<Handle>,
    code: Vec<u8>,
    constants: Vec<Value>,
    types: Vec<TypeTag>,
    labels: Vec<u16>,
    locals: usize,
    flags: FunctionFlags,
}

impl Function {
    /// The symbol the function is bound to.
    #[must_use]
    pub fn name(&self) -> Handle {
        self.name
    }

    /// The enclosing blueprint, if any.
    #[must_use]
    pub fn blueprint(&self) -> Option<Handle> {
        self.blueprint
    }

    pub(crate) fn set_blueprint(&mut self, blueprint: Handle) {
        self.blueprint = Some(blueprint);
    }

    /// The bytecode stream.
    #[must_use]
    pub fn code(&self) -> &[u8] {
        &self.code
    }

    /// The constants table.
    #[must_use]
    pub fn constants(&self) -> &[Value] {
        &self.constants
    }

    /// The referenced-types table.
    #[must_use]
    pub fn types(&self) -> &[TypeTag] {
        &self.types
    }

    /// The label-offsets table maintained by the code writer.
    #[must_use]
    pub fn labels(&self) -> &[u16] {
        &self.labels
    }

    /// Number of local slots, parameters included.
    #[must_use]
    pub fn locals(&self) -> usize {
        self.locals
    }

    /// The compiler-attached flags.
    #[must_use]
    pub fn flags(&self) -> FunctionFlags {
        self.flags
    }

    /// Whether excess arguments are gathered into the last local slot.
    #[must_use]
    pub fn is_varargs(&self) -> bool {
        self.flags.contains(FunctionFlags::VARARGS)
    }
}

/// Builder assembling a [`Function`]; the surface the compiler's code
/// writer drives.
#[derive(Debug)]
pub struct FunctionBuilder {
    name: Handle,
    code: Vec<u8>,
    constants: Vec<Value>,
    types: Vec<TypeTag>,
    labels: Vec<u16>,
    locals: usize,
    flags: FunctionFlags,
}

impl FunctionBuilder {
    /// Start building a function bound to the given name symbol.
    #[must_use]
    pub fn new(name: Handle) -> Self {
        Self {
            name,
            code: Vec::new(),
            constants: Vec::new(),
            types: Vec::new(),
            labels: Vec::new(),
            locals: 0,
            flags: FunctionFlags::empty(),
        }
    }

    /// Install the bytecode stream.
    #[must_use]
    pub fn code(mut self, code: Vec<u8>) -> Self {
        self.code = code;
        self
    }

    /// Assemble and install the bytecode stream from instructions.
    ///
    /// # Errors
    ///
    /// Returns an error if an instruction cannot be serialized.
    pub fn instructions(mut self, instructions: &[Instruction]) -> wyvern_bytecode::Result<Self> {
        self.code = assemble(instructions)?;
        Ok(self)
    }

    /// Append a constant, returning its table index.
    pub fn constant(&mut self, value: Value) -> i16 {
        self.constants.push(value);
        i16::try_from(self.constants.len() - 1).unwrap_or(i16::MAX)
    }

    /// Append a referenced type, returning its table index.
    pub fn referenced_type(&mut self, tag: TypeTag) -> i16 {
        self.types.push(tag);
        i16::try_from(self.types.len() - 1).unwrap_or(i16::MAX)
    }

    /// Record a label offset.
    pub fn label(&mut self, offset: u16) {
        self.labels.push(offset);
    }

    /// Set the local-slot count, parameters included.
    #[must_use]
    pub fn locals(mut self, locals: usize) -> Self {
        self.locals = locals;
        self
    }

    /// Set the compiler flags.
    #[must_use]
    pub fn flags(mut self, flags: FunctionFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Finish the function. It is attached to a blueprint separately via
    /// [`World::function_in_blueprint`](crate::World::function_in_blueprint).
    #[must_use]
    pub fn build(self) -> Function {
        Function {
            name: self.name,
            blueprint: None,
            code: self.code,
            constants: self.constants,
            types: self.types,
            labels: self.labels,
            locals: self.locals,
            flags: self.flags,
        }
    }
}
