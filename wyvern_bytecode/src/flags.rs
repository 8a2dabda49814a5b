use bitflags::bitflags;
use std::fmt;

bitflags! {
    /// Flags attached to a compiled function by the compiler.
    #[derive(Clone, Copy, Debug, Eq, PartialEq)]
    pub struct FunctionFlags: u16 {
        /// Arguments beyond the fixed locals are gathered into an array in
        /// the last local slot.
        const VARARGS = 0x0001;
    }
}

impl fmt::Display for FunctionFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut flags = Vec::new();
        if self.contains(FunctionFlags::VARARGS) {
            flags.push("varargs");
        }
        write!(f, "({})", flags.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_empty() {
        assert!(FunctionFlags::empty().is_empty());
    }

    #[test]
    fn test_display() {
        assert_eq!("()", FunctionFlags::empty().to_string());
        assert_eq!("(varargs)", FunctionFlags::VARARGS.to_string());
    }
}
