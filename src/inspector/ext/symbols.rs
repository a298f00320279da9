//! Resolve code addresses to symbol names.
use alloc::string::String;

use crate::inspector::{InspectResult, Inspector};

/// Inspector Extension - map a code address to a symbol.
pub trait SymbolLookup: Inspector {
    /// Return the (demangled) name of the function containing `addr`, or
    /// `None` if the address is not covered by any known symbol.
    fn symbolize(&mut self, addr: u64) -> InspectResult<Option<String>, Self>;
}

define_ext!(SymbolLookupOps, SymbolLookup);
