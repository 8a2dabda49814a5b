//! The builtin registry: the fixed set of native functions scripts reach
//! by sending a message that resolves to no method.
//!
//! At world construction every builtin name is interned and bound to its
//! native function on the symbol itself, so dispatch is one interner
//! lookup. The names are the VM's public ABI.

mod control;
mod io;
mod objects;
mod system;
mod values;

use crate::error::Result;
use crate::object::{BuiltinFn, HeapObject};
use crate::world::World;
use tracing::debug;

/// The builtin table: name to native function.
const BUILTINS: &[(&str, BuiltinFn)] = &[
    ("pause", control::pause),
    ("wait_for_input", control::wait_for_input),
    ("input_to", control::input_to),
    ("call", control::call),
    ("stop", control::stop),
    ("this_player", control::this_player),
    ("set_this_player", control::set_this_player),
    ("print", io::print),
    ("write", io::write),
    ("heartbeat_on", objects::heartbeat_on),
    ("heartbeat_off", objects::heartbeat_off),
    ("move_object", objects::move_object),
    ("the_object", objects::the_object),
    ("resolve", objects::resolve),
    ("update_object", objects::update_object),
    ("stash", objects::stash),
    ("set_stash", objects::set_stash),
    ("gc", system::gc),
    ("crash", system::crash),
    ("shutdown", system::shutdown),
    ("typeof", values::type_of),
    ("gensym", values::gensym),
    ("keys", values::keys),
    ("substr", values::substr),
    ("strlen", values::strlen),
];

/// Intern and bind the builtin table into a world.
///
/// # Errors
///
/// Returns an error when the object table is exhausted.
pub fn install(world: &mut World) -> Result<()> {
    for (name, builtin) in BUILTINS {
        let symbol = world.intern(name)?;
        if let HeapObject::Symbol(symbol) = world.objects_mut().get_mut(symbol)? {
            symbol.bind_builtin(*builtin);
        }
    }
    debug!("installed {} builtins", BUILTINS.len());
    Ok(())
}
