//! The [`Inspector`] trait and its optional extensions.
//!
//! An `Inspector` is the decoder's only window into the debugged process. It
//! is implemented by the host debugger, and exposes memory reads, type
//! lookups, and the host's per-node UI state (which nodes are expanded, which
//! display format the user picked).
//!
//! ### Optional extensions
//!
//! Capabilities that not every host can offer (calling functions inside the
//! live process, symbolizing addresses) follow the "Inlineable Dyn Extension
//! Trait" pattern: the host opts in by overriding the corresponding
//! `support_*` method to return `Some(self)`. When a method is left at its
//! default `None`, the decoder gracefully degrades (e.g. a string can no
//! longer be edited).

use alloc::string::String;

use crate::abi::{Endianness, Platform};
use crate::format::DisplayFormat;
use crate::node::Value;

pub mod ext;
mod memory;

pub use memory::InspectorExt;

/// Size and alignment of a type, as reported by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDesc {
    /// Normalized type name.
    pub name: String,
    /// `sizeof(T)` in bytes.
    pub size: u64,
    /// `alignof(T)` in bytes.
    pub align: u64,
}

impl TypeDesc {
    /// Convenience constructor.
    pub fn new(name: impl Into<String>, size: u64, align: u64) -> TypeDesc {
        TypeDesc {
            name: name.into(),
            size,
            align,
        }
    }
}

/// The error type for methods on [`Inspector`] and its extensions.
#[derive(Debug)]
#[non_exhaustive]
pub enum InspectError<E> {
    /// The host hit an unrecoverable error. The decode is aborted and the
    /// error is propagated all the way back to the caller.
    Fatal(E),
    /// The requested memory could not be read.
    Unreadable {
        /// First address of the failed read.
        addr: u64,
        /// Length of the failed read.
        len: usize,
    },
    /// The host does not know the named type.
    UnknownType(String),
    /// Some other recoverable error.
    NonFatal,
}

impl<E> InspectError<E> {
    /// Whether this error must abort the whole decode instead of degrading a
    /// single node.
    pub fn is_fatal(&self) -> bool {
        matches!(self, InspectError::Fatal(_))
    }
}

/// A specialized `Result` type for [`Inspector`] operations.
pub type InspectResult<T, I> = Result<T, InspectError<<I as Inspector>::Error>>;

/// Host-provided access to the debugged process.
pub trait Inspector {
    /// A host-specific **fatal** error.
    type Error;

    /// The runtime flavor of the debugged process.
    fn platform(&self) -> Platform;

    /// Target pointer size in bytes. Defaults to 8.
    #[inline(always)]
    fn pointer_size(&self) -> usize {
        8
    }

    /// Target byte order. Defaults to little-endian.
    #[inline(always)]
    fn endianness(&self) -> Endianness {
        Endianness::Little
    }

    /// Fill `buf` with the bytes starting at `addr`.
    ///
    /// Unmapped or otherwise inaccessible memory should be reported as
    /// [`InspectError::Unreadable`], so the decoder can show a placeholder
    /// instead of aborting.
    fn read_bytes(&mut self, addr: u64, buf: &mut [u8]) -> InspectResult<(), Self>;

    /// Look up the size and alignment of the named type.
    fn resolve_type(&mut self, name: &str) -> InspectResult<TypeDesc, Self>;

    /// Whether the user expanded the node at `path`.
    ///
    /// Paths are dot-separated node labels, starting with the name passed in
    /// [`ValueRef`](crate::ValueRef), e.g. `local.v.[3]`.
    fn is_expanded(&self, path: &str) -> bool;

    /// The display format the user selected for the node at `path`.
    #[inline(always)]
    fn item_format(&self, path: &str) -> DisplayFormat {
        let _ = path;
        DisplayFormat::Automatic
    }

    /// Read a pointer-sized value at `addr`.
    fn read_pointer(&mut self, addr: u64) -> InspectResult<u64, Self> {
        let width = self.pointer_size();
        self.read_scalar(addr, width)
    }

    /// Read an unsigned integer of `width` bytes (at most 8) at `addr`.
    fn read_scalar(&mut self, addr: u64, width: usize) -> InspectResult<u64, Self> {
        let mut buf = [0u8; 8];
        let buf = buf.get_mut(..width).ok_or(InspectError::NonFatal)?;
        self.read_bytes(addr, buf)?;
        crate::scalar::decode_unsigned(buf, self.endianness()).ok_or(InspectError::NonFatal)
    }

    /// Whether `addr` looks like a valid pointer into the target.
    ///
    /// The default implementation probes a single byte at `addr`.
    fn check_pointer(&mut self, addr: u64) -> bool {
        let mut probe = [0u8; 1];
        addr != 0 && self.read_bytes(addr, &mut probe).is_ok()
    }

    /// Render a value that has no container decoder (`int`, user structs...).
    ///
    /// Returning `Ok(None)` falls back to the built-in scalar rendering, and
    /// finally to [`Value::Raw`], which asks the host to display the value
    /// with its generic struct view.
    #[inline(always)]
    fn render_value(&mut self, ty: &TypeDesc, addr: u64) -> InspectResult<Option<Value>, Self> {
        let _ = (ty, addr);
        Ok(None)
    }

    /// Support for calling methods inside the live process.
    #[inline(always)]
    fn support_assign(&mut self) -> Option<ext::assign::AssignValueOps<'_, Self>> {
        None
    }

    /// Support for resolving code addresses to symbol names.
    #[inline(always)]
    fn support_symbols(&mut self) -> Option<ext::symbols::SymbolLookupOps<'_, Self>> {
        None
    }
}
