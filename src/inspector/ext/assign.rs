//! Call methods on objects inside the live process.
use crate::inspector::{InspectResult, Inspector};

/// Inspector Extension - invoke a member function in the debugged process.
///
/// Used by the edit path: rather than building new container layouts by
/// hand, the decoder asks the process to run its own assignment operator.
pub trait AssignValue: Inspector {
    /// Call `object.method(args...)` where `object` is the value of type
    /// `type_name` living at `addr`.
    ///
    /// Each entry in `args` is a C++ source expression, e.g. `"hello"` or
    /// `L"hello"`. The return value of the call is discarded.
    fn call_method(
        &mut self,
        type_name: &str,
        addr: u64,
        method: &str,
        args: &[&str],
    ) -> InspectResult<(), Self>;
}

define_ext!(AssignValueOps, AssignValue);
