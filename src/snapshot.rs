//! An [`Inspector`] over captured memory, for offline decoding.
//!
//! A `Snapshot` holds a set of memory regions and a table of type sizes. It
//! has no process behind it, so it never reports fatal errors: reads outside
//! of every region come back as [`InspectError::Unreadable`].

use alloc::collections::{BTreeMap, BTreeSet};
use alloc::string::String;
use alloc::vec::Vec;
use core::convert::Infallible;
use core::fmt::{self, Display};

use crate::abi::{Endianness, Platform};
use crate::format::DisplayFormat;
use crate::inspector::{InspectError, InspectResult, Inspector, TypeDesc};
use crate::typename::normalize;

/// An error which may occur when writing into a [`Snapshot`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnapshotError {
    /// The write isn't fully contained in a single region.
    Unmapped {
        /// Start of the write.
        addr: u64,
        /// Length of the write.
        len: usize,
    },
    /// The new region overlaps an existing one.
    Overlap(u64),
}

impl Display for SnapshotError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SnapshotError::Unmapped { addr, len } => {
                write!(f, "{} bytes at {:#x} are not mapped", len, addr)
            }
            SnapshotError::Overlap(base) => {
                write!(f, "region at {:#x} overlaps an existing region", base)
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for SnapshotError {}

#[derive(Debug, Clone)]
struct Region {
    base: u64,
    bytes: Vec<u8>,
}

impl Region {
    fn end(&self) -> u64 {
        self.base.saturating_add(self.bytes.len() as u64)
    }

    fn slice(&self, addr: u64, len: usize) -> Option<core::ops::Range<usize>> {
        let start = addr.checked_sub(self.base)? as usize;
        let end = start.checked_add(len)?;
        if end > self.bytes.len() {
            return None;
        }
        Some(start..end)
    }
}

#[derive(Debug, Clone)]
enum Expansion {
    All,
    Paths(BTreeSet<String>),
}

/// Captured target memory plus the type metadata needed to decode it.
#[derive(Debug, Clone)]
pub struct Snapshot {
    platform: Platform,
    pointer_size: usize,
    endian: Endianness,
    regions: Vec<Region>,
    types: BTreeMap<String, TypeDesc>,
    expansion: Expansion,
    formats: BTreeMap<String, DisplayFormat>,
}

impl Snapshot {
    /// Create an empty snapshot, with the built-in C++ scalar types already
    /// registered for the given pointer size. Nothing is expanded.
    pub fn new(platform: Platform, pointer_size: usize) -> Snapshot {
        let mut snap = Snapshot {
            platform,
            pointer_size,
            endian: Endianness::Little,
            regions: Vec::new(),
            types: BTreeMap::new(),
            expansion: Expansion::Paths(BTreeSet::new()),
            formats: BTreeMap::new(),
        };
        snap.register_builtins();
        snap
    }

    fn register_builtins(&mut self) {
        let p = self.pointer_size as u64;
        let wchar = match self.platform {
            Platform::AlternateRuntimeB => 2,
            _ => 4,
        };
        let long = match self.platform {
            Platform::AlternateRuntimeB => 4,
            _ => p,
        };

        let builtins: &[(&str, u64)] = &[
            ("bool", 1),
            ("char", 1),
            ("signed char", 1),
            ("unsigned char", 1),
            ("char8_t", 1),
            ("int8_t", 1),
            ("uint8_t", 1),
            ("short", 2),
            ("unsigned short", 2),
            ("char16_t", 2),
            ("int16_t", 2),
            ("uint16_t", 2),
            ("int", 4),
            ("unsigned int", 4),
            ("unsigned", 4),
            ("float", 4),
            ("char32_t", 4),
            ("int32_t", 4),
            ("uint32_t", 4),
            ("wchar_t", wchar),
            ("long", long),
            ("unsigned long", long),
            ("long long", 8),
            ("unsigned long long", 8),
            ("double", 8),
            ("int64_t", 8),
            ("uint64_t", 8),
            ("size_t", p),
            ("ssize_t", p),
            ("ptrdiff_t", p),
            ("eastl_size_t", p),
        ];

        for &(name, size) in builtins {
            // 32-bit targets only align 8-byte scalars to 4
            let align = size.min(p).max(1);
            self.define_type(name, size, align);
        }
    }

    /// Builder-style setter for the target byte order.
    pub fn with_endianness(mut self, endian: Endianness) -> Snapshot {
        self.endian = endian;
        self
    }

    /// Builder-style: mark every node as expanded.
    pub fn expand_all(mut self) -> Snapshot {
        self.expansion = Expansion::All;
        self
    }

    /// Mark the node at `path` as expanded.
    pub fn expand(&mut self, path: &str) {
        match &mut self.expansion {
            Expansion::All => {}
            Expansion::Paths(paths) => {
                paths.insert(String::from(path));
            }
        }
    }

    /// Select the display format of the node at `path`.
    pub fn set_format(&mut self, path: &str, format: DisplayFormat) {
        self.formats.insert(String::from(path), format);
    }

    /// Register (or replace) a type's size and alignment.
    pub fn define_type(&mut self, name: &str, size: u64, align: u64) {
        let name = normalize(name);
        self.types
            .insert(name.clone(), TypeDesc::new(name, size, align));
    }

    /// Add a region of captured memory starting at `base`.
    pub fn add_region(&mut self, base: u64, bytes: Vec<u8>) -> Result<(), SnapshotError> {
        let end = base.saturating_add(bytes.len() as u64);
        if self.regions.iter().any(|r| base < r.end() && r.base < end) {
            return Err(SnapshotError::Overlap(base));
        }
        self.regions.push(Region { base, bytes });
        Ok(())
    }

    /// Overwrite bytes inside an existing region.
    pub fn write_bytes(&mut self, addr: u64, data: &[u8]) -> Result<(), SnapshotError> {
        for region in self.regions.iter_mut() {
            if let Some(range) = region.slice(addr, data.len()) {
                region.bytes[range].copy_from_slice(data);
                return Ok(());
            }
        }
        Err(SnapshotError::Unmapped {
            addr,
            len: data.len(),
        })
    }
}

impl Inspector for Snapshot {
    type Error = Infallible;

    fn platform(&self) -> Platform {
        self.platform
    }

    fn pointer_size(&self) -> usize {
        self.pointer_size
    }

    fn endianness(&self) -> Endianness {
        self.endian
    }

    fn read_bytes(&mut self, addr: u64, buf: &mut [u8]) -> InspectResult<(), Self> {
        for region in &self.regions {
            if let Some(range) = region.slice(addr, buf.len()) {
                buf.copy_from_slice(&region.bytes[range]);
                return Ok(());
            }
        }
        Err(InspectError::Unreadable {
            addr,
            len: buf.len(),
        })
    }

    fn resolve_type(&mut self, name: &str) -> InspectResult<TypeDesc, Self> {
        let name = normalize(name);
        if name.ends_with('*') || name.ends_with('&') {
            let p = self.pointer_size as u64;
            return Ok(TypeDesc::new(name, p, p));
        }
        match self.types.get(&name) {
            Some(desc) => Ok(desc.clone()),
            None => Err(InspectError::UnknownType(name)),
        }
    }

    fn is_expanded(&self, path: &str) -> bool {
        match &self.expansion {
            Expansion::All => true,
            Expansion::Paths(paths) => paths.contains(path),
        }
    }

    fn item_format(&self, path: &str) -> DisplayFormat {
        self.formats
            .get(path)
            .copied()
            .unwrap_or(DisplayFormat::Automatic)
    }
}
