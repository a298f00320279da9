use std::convert::Infallible;

use anyhow::{anyhow, bail};
use layout_decoder::abi::{Endianness, Platform};
use layout_decoder::inspector::ext::assign::{AssignValue, AssignValueOps};
use layout_decoder::inspector::{InspectError, InspectResult, Inspector, TypeDesc};
use layout_decoder::snapshot::Snapshot;
use layout_decoder::DisplayFormat;

/// Where the fake heap starts handing out memory.
const HEAP_BASE: u64 = 0x10_0000;

/// A pretend debuggee: a bump-allocated heap of container layouts, plus the
/// ability to run `assign` on strings living in it.
pub struct FakeProcess {
    mem: Snapshot,
    ptr: u64,
    heap: u64,
    lost_at: Option<u64>,
}

/// Lift a snapshot error into the harness' error type.
fn lift(e: InspectError<Infallible>) -> InspectError<anyhow::Error> {
    match e {
        InspectError::Fatal(never) => match never {},
        InspectError::Unreadable { addr, len } => InspectError::Unreadable { addr, len },
        InspectError::UnknownType(name) => InspectError::UnknownType(name),
        _ => InspectError::NonFatal,
    }
}

impl FakeProcess {
    pub fn new(platform: Platform, pointer_size: usize) -> FakeProcess {
        let p = pointer_size as u64;
        let mut mem = Snapshot::new(platform, pointer_size);
        // EASTL strings are a single data pointer
        mem.define_type("eastl::string", p, p);
        mem.define_type("eastl::wstring", p, p);

        FakeProcess {
            mem,
            ptr: p,
            heap: HEAP_BASE,
            lost_at: None,
        }
    }

    /// Builder-style: every node is expanded.
    pub fn expanded(mut self) -> FakeProcess {
        self.mem = self.mem.expand_all();
        self
    }

    /// Pointer size in bytes.
    pub fn ptr(&self) -> u64 {
        self.ptr
    }

    /// Reads touching `addr` fail as if the connection to the debuggee was
    /// lost.
    pub fn lose_connection_at(&mut self, addr: u64) {
        self.lost_at = Some(addr);
    }

    pub fn expand(&mut self, path: &str) {
        self.mem.expand(path);
    }

    pub fn set_format(&mut self, path: &str, format: DisplayFormat) {
        self.mem.set_format(path, format);
    }

    pub fn define_type(&mut self, name: &str, size: u64, align: u64) {
        self.mem.define_type(name, size, align);
    }

    /// Encode pointer-sized words in target byte order.
    pub fn words(&self, ws: &[u64]) -> Vec<u8> {
        let p = self.ptr as usize;
        ws.iter().flat_map(|w| w.to_le_bytes()[..p].to_vec()).collect()
    }

    /// Copy `bytes` onto the heap and return their address.
    ///
    /// Every allocation is followed by a pointer's worth of slack, so
    /// one-past-the-end pointers stay readable.
    pub fn alloc(&mut self, mut bytes: Vec<u8>) -> anyhow::Result<u64> {
        let addr = (self.heap + 15) & !15;
        bytes.resize(bytes.len() + self.ptr as usize, 0);
        self.heap = addr + bytes.len() as u64;
        self.mem.add_region(addr, bytes)?;
        Ok(addr)
    }

    pub fn alloc_words(&mut self, ws: &[u64]) -> anyhow::Result<u64> {
        let bytes = self.words(ws);
        self.alloc(bytes)
    }

    pub fn write(&mut self, addr: u64, bytes: &[u8]) -> anyhow::Result<()> {
        Ok(self.mem.write_bytes(addr, bytes)?)
    }

    pub fn write_word(&mut self, addr: u64, word: u64) -> anyhow::Result<()> {
        let bytes = self.words(&[word]);
        self.write(addr, &bytes)
    }

    /// Size in bytes of one `wchar_t` on this target.
    pub fn wchar_size(&mut self) -> anyhow::Result<u64> {
        match self.mem.resolve_type("wchar_t") {
            Ok(desc) => Ok(desc.size),
            Err(e) => bail!("wchar_t: {}", lift(e)),
        }
    }
}

impl Inspector for FakeProcess {
    type Error = anyhow::Error;

    fn platform(&self) -> Platform {
        self.mem.platform()
    }

    fn pointer_size(&self) -> usize {
        self.ptr as usize
    }

    fn endianness(&self) -> Endianness {
        Endianness::Little
    }

    fn read_bytes(&mut self, addr: u64, buf: &mut [u8]) -> InspectResult<(), Self> {
        if let Some(lost) = self.lost_at {
            if (addr..addr.saturating_add(buf.len() as u64)).contains(&lost) {
                return Err(InspectError::Fatal(anyhow!("connection lost")));
            }
        }
        self.mem.read_bytes(addr, buf).map_err(lift)
    }

    fn resolve_type(&mut self, name: &str) -> InspectResult<TypeDesc, Self> {
        self.mem.resolve_type(name).map_err(lift)
    }

    fn is_expanded(&self, path: &str) -> bool {
        self.mem.is_expanded(path)
    }

    fn item_format(&self, path: &str) -> DisplayFormat {
        self.mem.item_format(path)
    }

    fn support_assign(&mut self) -> Option<AssignValueOps<'_, Self>> {
        Some(self)
    }
}

/// Parse a `"..."` or `L"..."` literal. Returns the text and whether it is
/// wide.
fn parse_literal(lit: &str) -> Option<(String, bool)> {
    let (wide, rest) = match lit.strip_prefix('L') {
        Some(rest) => (true, rest),
        None => (false, lit),
    };
    let inner = rest.strip_prefix('"')?.strip_suffix('"')?;
    Some((inner.replace("\\\"", "\""), wide))
}

impl FakeProcess {
    fn assign(&mut self, addr: u64, method: &str, args: &[&str]) -> anyhow::Result<()> {
        let (text, wide) = match (method, args) {
            ("assign", [lit]) => parse_literal(lit).ok_or_else(|| anyhow!("bad literal {}", lit))?,
            _ => bail!("no method `{}` taking {} arguments", method, args.len()),
        };
        match self.mem.platform() {
            Platform::Standard | Platform::DebugChecked => {}
            other => bail!("assign is not simulated on {:?}", other),
        }

        let data = if wide {
            self.wide_rep(&text)?
        } else {
            self.string_rep(&text)?
        };
        self.write_word(addr, data)
    }
}

impl AssignValue for FakeProcess {
    fn call_method(
        &mut self,
        type_name: &str,
        addr: u64,
        method: &str,
        args: &[&str],
    ) -> InspectResult<(), Self> {
        log::debug!("{}@{:#x}.{}({:?})", type_name, addr, method, args);
        self.assign(addr, method, args).map_err(InspectError::Fatal)
    }
}
