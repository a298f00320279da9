use alloc::string::String;
use core::fmt::{self, Debug, Display};

use crate::inspector::InspectError;

/// A decoded header failed a bounds check.
///
/// Sanity violations never escape the node they were detected in: nested
/// nodes turn them into a [`Value::Degraded`](crate::Value::Degraded)
/// placeholder, and only a failing top-level node reports them to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SanityViolation {
    /// A size or count is negative or above the sanity ceiling.
    CountOutOfRange {
        /// What was being counted.
        what: &'static str,
        /// The decoded value.
        count: i64,
        /// The ceiling it was checked against.
        max: u64,
    },
    /// `size > capacity`.
    SizeExceedsCapacity {
        /// Decoded size.
        size: u64,
        /// Decoded capacity.
        capacity: u64,
    },
    /// A non-null pointer failed the host's pointer check.
    BadPointer {
        /// Which field held the pointer.
        what: &'static str,
        /// The pointer value.
        addr: u64,
    },
    /// An `end` pointer lies before its `begin` pointer, or the distance
    /// between them isn't a whole number of elements.
    BadRange {
        /// Start of the range.
        begin: u64,
        /// End of the range.
        end: u64,
    },
    /// A string refcount below the `-1` "never shared" sentinel.
    Refcount(i64),
    /// An element type with size zero, which would make indexing meaningless.
    ZeroSizedElement(String),
    /// A structure walk needed more pointer dereferences than allowed. Most
    /// likely the links form a cycle.
    HopBudgetExhausted,
    /// Adding a field offset or element index to a decoded pointer would
    /// run past the end of the address space.
    AddressOverflow {
        /// The pointer the offset was added to.
        base: u64,
    },
}

impl Display for SanityViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use self::SanityViolation::*;
        match self {
            CountOutOfRange { what, count, max } => {
                write!(f, "{} {} outside of [0, {}]", what, count, max)
            }
            SizeExceedsCapacity { size, capacity } => {
                write!(f, "size {} exceeds capacity {}", size, capacity)
            }
            BadPointer { what, addr } => write!(f, "invalid {} pointer {:#x}", what, addr),
            BadRange { begin, end } => write!(f, "bad range [{:#x}, {:#x})", begin, end),
            Refcount(r) => write!(f, "refcount {} below -1", r),
            ZeroSizedElement(t) => write!(f, "element type `{}` has size 0", t),
            HopBudgetExhausted => write!(f, "pointer-hop budget exhausted"),
            AddressOverflow { base } => {
                write!(f, "address arithmetic on {:#x} overflows", base)
            }
        }
    }
}

/// An error which may occur while decoding a value.
#[derive(Debug)]
#[non_exhaustive]
pub enum DecodeError<E> {
    /// No decoder is registered for this type name. The host should fall back
    /// to its generic display.
    UnrecognizedLayout(String),
    /// The value's header failed a sanity check.
    Sanity(SanityViolation),
    /// The inspector reported an error.
    Inspect(InspectError<E>),
    /// Nested decoders (e.g. pointers to pointers to containers) went deeper
    /// than the configured limit.
    DepthExceeded(usize),
    /// The type cannot be edited, or the inspector can't call into the
    /// process.
    EditUnsupported(String),
}

impl<E> From<InspectError<E>> for DecodeError<E> {
    fn from(e: InspectError<E>) -> Self {
        DecodeError::Inspect(e)
    }
}

impl<E> From<SanityViolation> for DecodeError<E> {
    fn from(e: SanityViolation) -> Self {
        DecodeError::Sanity(e)
    }
}

impl<E> DecodeError<E> {
    /// Whether the error should abort the whole decode rather than degrade a
    /// single node.
    pub fn is_fatal(&self) -> bool {
        match self {
            DecodeError::Inspect(e) => e.is_fatal(),
            _ => false,
        }
    }
}

impl<E: Debug> Display for InspectError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InspectError::Fatal(e) => write!(f, "Inspector threw a fatal error: {:?}", e),
            InspectError::Unreadable { addr, len } => {
                write!(f, "could not read {} bytes at {:#x}", len, addr)
            }
            InspectError::UnknownType(name) => write!(f, "unknown type `{}`", name),
            InspectError::NonFatal => write!(f, "Inspector reported a non-fatal error"),
        }
    }
}

impl<E: Debug> Display for DecodeError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use self::DecodeError::*;
        match self {
            UnrecognizedLayout(name) => write!(f, "no decoder registered for `{}`", name),
            Sanity(e) => write!(f, "corrupted or unrecognized layout: {}", e),
            Inspect(e) => write!(f, "{}", e),
            DepthExceeded(depth) => write!(f, "nesting deeper than {} levels", depth),
            EditUnsupported(name) => write!(f, "`{}` cannot be edited", name),
        }
    }
}

cfg_if::cfg_if! {
    if #[cfg(feature = "std")] {
        impl<E: Debug> std::error::Error for InspectError<E> {}
        impl<E: Debug> std::error::Error for DecodeError<E> {}
    } else if #[cfg(feature = "core_error")] {
        impl<E: Debug> core::error::Error for InspectError<E> {}
        impl<E: Debug> core::error::Error for DecodeError<E> {}
    }
}
