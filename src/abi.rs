//! Target platform tags and per-ABI field offset tables.
//!
//! Every decoder reads its header fields through one of the layout tables in
//! this module. A table is computed once per decoded node from the target's
//! pointer size and the selected [`AbiVariant`], so the decoders themselves
//! never branch on the platform per field.

use crate::typename::TypeName;

/// Runtime flavor of the debugged process, as reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    /// Regular EASTL build.
    Standard,
    /// EASTL build with debug checks enabled. Uses the standard layouts.
    DebugChecked,
    /// QNX-like runtime (Dinkumware container layouts).
    AlternateRuntimeA,
    /// MSVC-like runtime.
    AlternateRuntimeB,
}

/// Byte order of the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endianness {
    /// Least significant byte first.
    Little,
    /// Most significant byte first.
    Big,
}

/// The family of container layouts used to decode one value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbiVariant {
    /// EASTL's own layouts (standard and debug-checked targets).
    Eastl,
    /// The inline-namespace `__1::` layouts.
    LibCxx,
    /// Dinkumware layouts used by QNX-like runtimes.
    Dinkumware,
    /// MSVC-like layouts.
    Msvc,
}

impl AbiVariant {
    /// Pick the layout family for `name` on `platform`.
    ///
    /// Names inside a `__1` namespace always use the `__1::` layouts,
    /// regardless of what the platform reports.
    pub fn select(platform: Platform, name: &TypeName) -> AbiVariant {
        if name.in_namespace("__1") {
            return AbiVariant::LibCxx;
        }

        match platform {
            Platform::Standard | Platform::DebugChecked => AbiVariant::Eastl,
            Platform::AlternateRuntimeA => AbiVariant::Dinkumware,
            Platform::AlternateRuntimeB => AbiVariant::Msvc,
        }
    }

    /// Both alternate runtimes share most node-based layouts.
    pub fn is_dinkumware_like(self) -> bool {
        matches!(self, AbiVariant::Dinkumware | AbiVariant::Msvc)
    }
}

/// Round `offset` up to the next multiple of `align`, or `None` if the
/// result doesn't fit in 64 bits.
pub fn align_up(offset: u64, align: u64) -> Option<u64> {
    if align <= 1 {
        return Some(offset);
    }
    Some(offset.checked_add(align - 1)? / align * align)
}

/// Layout facts shared by every table: variant, pointer size, byte order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Abi {
    /// Selected layout family.
    pub variant: AbiVariant,
    /// Pointer size in bytes.
    pub ptr: u64,
    /// Target byte order.
    pub endian: Endianness,
}

/// `{begin, end, capacity}` pointer triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VectorLayout {
    pub begin: u64,
    pub end: u64,
    pub capacity: u64,
}

/// Where a list keeps its cached element count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CachedSize {
    /// The layout always stores the count at this offset.
    Always(u64),
    /// The count is only present when the container is exactly `type_size`
    /// bytes large. Older layouts have to be counted by hand.
    IfTypeSize { offset: u64, type_size: u64 },
}

/// Where the list's sentinel node lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sentinel {
    /// The sentinel node is embedded at this offset.
    Inline(u64),
    /// A pointer to the sentinel node is stored at this offset.
    Indirect(u64),
}

/// Doubly linked list with a sentinel node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListLayout {
    pub sentinel: Sentinel,
    pub size: CachedSize,
    /// Offset of `next` inside a node.
    pub next: u64,
    /// Unaligned start of the element inside a node.
    pub value: u64,
}

/// How the tree header is organised, and which successor algorithm applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeShape {
    /// Anchor node embedded at `header`; anchor.left is the leftmost node.
    Anchor,
    /// `begin_node` pointer at `header`, end node embedded right after it.
    EndNode,
    /// Pointer to a nil head node at `header`; head.parent is the root.
    NilHead,
}

/// Balanced binary search tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeLayout {
    pub shape: TreeShape,
    pub header: u64,
    pub size: u64,
    pub left: u64,
    pub right: u64,
    pub parent: u64,
    /// Offset of the `is_nil` byte, for layouts that have one.
    pub is_nil: Option<u64>,
    /// Unaligned start of the element inside a node.
    pub value: u64,
}

/// Hash table organisation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashLayout {
    /// Array of singly linked chains. The node stores the element first and
    /// the `next` pointer after it (aligned to pointer size).
    Buckets {
        array: u64,
        bucket_count: u64,
        element_count: u64,
    },
    /// Single list threading every element; buckets only index into it.
    GlobalList {
        first: u64,
        size: u64,
        next: u64,
        value: u64,
    },
    /// A full doubly linked list embedded at `offset`.
    EmbeddedList { offset: u64, list: ListLayout },
}

/// String representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StringLayout {
    /// Data pointer at `data`; `{length, capacity, refcount}` words live
    /// right before the character buffer.
    RefCounted { data: u64 },
    /// First byte selects an inline short form or a `{cap, size, data}`
    /// long form.
    ShortLong {
        long_size: u64,
        long_data: u64,
    },
    /// Small buffer of `inline_bytes` at `buffer`, overlapped by the data
    /// pointer once `capacity` outgrows it.
    SmallBuffer {
        buffer: u64,
        size: u64,
        capacity: u64,
        inline_bytes: u64,
        refcount_before_data: bool,
    },
}

/// Iterator fields inside an EASTL deque iterator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DequeIterLayout {
    pub current: u64,
    pub begin: u64,
    pub array_ptr: u64,
}

/// Segmented double-ended queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DequeLayout {
    /// EASTL: two full iterators delimit the contents.
    Iterators {
        begin: u64,
        end: u64,
        iter: DequeIterLayout,
    },
    /// Block map plus `{start, size}` counters.
    BlockMap { map_begin: u64, start: u64, size: u64 },
}

/// Numeric array without capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValarrayLayout {
    SizeData { size: u64, data: u64 },
    BeginEnd { begin: u64, end: u64 },
}

impl Abi {
    /// Create the layout facts for one decode call.
    pub fn new(variant: AbiVariant, ptr: u64, endian: Endianness) -> Abi {
        Abi {
            variant,
            ptr,
            endian,
        }
    }

    pub fn vector(&self) -> VectorLayout {
        VectorLayout {
            begin: 0,
            end: self.ptr,
            capacity: 2 * self.ptr,
        }
    }

    pub fn list(&self) -> ListLayout {
        let p = self.ptr;
        if self.variant.is_dinkumware_like() {
            ListLayout {
                sentinel: Sentinel::Indirect(p),
                size: CachedSize::Always(2 * p),
                next: 0,
                value: 2 * p,
            }
        } else {
            ListLayout {
                sentinel: Sentinel::Inline(0),
                size: CachedSize::IfTypeSize {
                    offset: 2 * p,
                    type_size: 3 * p,
                },
                next: 0,
                value: 2 * p,
            }
        }
    }

    pub fn tree(&self) -> TreeLayout {
        let p = self.ptr;
        match self.variant {
            AbiVariant::Eastl => TreeLayout {
                shape: TreeShape::Anchor,
                header: 0,
                size: 4 * p,
                right: 0,
                left: p,
                parent: 2 * p,
                is_nil: None,
                value: 4 * p,
            },
            AbiVariant::LibCxx => TreeLayout {
                shape: TreeShape::EndNode,
                header: 0,
                size: 2 * p,
                left: 0,
                right: p,
                parent: 2 * p,
                is_nil: None,
                value: 4 * p,
            },
            AbiVariant::Dinkumware | AbiVariant::Msvc => TreeLayout {
                shape: TreeShape::NilHead,
                header: p,
                size: 2 * p,
                left: 0,
                parent: p,
                right: 2 * p,
                is_nil: Some(3 * p + 1),
                value: 3 * p + 2,
            },
        }
    }

    pub fn hashtable(&self) -> HashLayout {
        let p = self.ptr;
        match self.variant {
            AbiVariant::Eastl => HashLayout::Buckets {
                array: 0,
                bucket_count: p,
                element_count: 2 * p,
            },
            AbiVariant::LibCxx => HashLayout::GlobalList {
                first: 2 * p,
                size: 3 * p,
                next: 0,
                value: 2 * p,
            },
            AbiVariant::Dinkumware | AbiVariant::Msvc => HashLayout::EmbeddedList {
                offset: p,
                list: self.list(),
            },
        }
    }

    /// `unordered_set` and `unordered_multiset`. On EASTL targets they thread
    /// every element on one list from `_M_before_begin`, with nodes laid out
    /// as `{next, value}`.
    pub fn unordered_set(&self) -> HashLayout {
        let p = self.ptr;
        match self.variant {
            AbiVariant::Eastl => HashLayout::GlobalList {
                first: 2 * p,
                size: 3 * p,
                next: 0,
                value: p,
            },
            _ => self.hashtable(),
        }
    }

    /// Offset of the wrapped iterator in a `__gnu_debug::_Safe_iterator`,
    /// past its `{sequence, version, prior, next}` bookkeeping.
    pub fn safe_iterator_current(&self) -> u64 {
        4 * self.ptr
    }

    pub fn string(&self) -> StringLayout {
        let p = self.ptr;
        match self.variant {
            AbiVariant::Eastl => StringLayout::RefCounted { data: 0 },
            AbiVariant::LibCxx => StringLayout::ShortLong {
                long_size: p,
                long_data: 2 * p,
            },
            AbiVariant::Dinkumware => StringLayout::SmallBuffer {
                buffer: 0,
                size: 16,
                capacity: 16 + p,
                inline_bytes: 16,
                refcount_before_data: true,
            },
            AbiVariant::Msvc => StringLayout::SmallBuffer {
                buffer: p,
                size: p + 16,
                capacity: 2 * p + 16,
                inline_bytes: 16,
                refcount_before_data: false,
            },
        }
    }

    pub fn deque(&self) -> DequeLayout {
        let p = self.ptr;
        match self.variant {
            AbiVariant::LibCxx => DequeLayout::BlockMap {
                map_begin: p,
                start: 4 * p,
                size: 5 * p,
            },
            _ => DequeLayout::Iterators {
                begin: 2 * p,
                end: 6 * p,
                iter: DequeIterLayout {
                    current: 0,
                    begin: p,
                    array_ptr: 3 * p,
                },
            },
        }
    }

    pub fn valarray(&self) -> ValarrayLayout {
        let p = self.ptr;
        match self.variant {
            AbiVariant::LibCxx => ValarrayLayout::BeginEnd { begin: 0, end: p },
            AbiVariant::Msvc => ValarrayLayout::SizeData { data: 0, size: p },
            AbiVariant::Eastl | AbiVariant::Dinkumware => {
                ValarrayLayout::SizeData { size: 0, data: p }
            }
        }
    }
}
