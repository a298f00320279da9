use alloc::format;
use alloc::string::{String, ToString};

use crate::abi::{align_up, Abi, AbiVariant, Endianness, Platform};
use crate::catalogue::{Catalogue, ContainerKind, ElementArgs, LayoutDescriptor};
use crate::error::{DecodeError, SanityViolation};
use crate::format::DisplayFormat;
use crate::inspector::{InspectError, Inspector, TypeDesc};
use crate::node::{DecodedNode, Special, Value};
use crate::scalar::render_builtin;
use crate::typename::TypeName;

mod builder;
mod contiguous;
mod deque;
mod edit;
mod hashtable;
mod list;
mod misc;
mod pointer;
mod string;
mod tree;

pub use builder::{LayoutDecoderBuilder, LayoutDecoderBuilderError, Limits};

pub(crate) type DecodeResult<T, I> = Result<T, DecodeError<<I as Inspector>::Error>>;

/// A value in the debugged process: where it lives, what it is, and what the
/// front-end calls it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValueRef<'a> {
    /// Label of the root node. Also the first component of every node path.
    pub name: &'a str,
    /// Declared C++ type name.
    pub type_name: &'a str,
    /// Address of the value.
    pub addr: u64,
}

impl<'a> ValueRef<'a> {
    /// Convenience constructor.
    pub fn new(name: &'a str, type_name: &'a str, addr: u64) -> ValueRef<'a> {
        ValueRef {
            name,
            type_name,
            addr,
        }
    }
}

/// Decodes container layouts into [`DecodedNode`] trees.
///
/// A `LayoutDecoder` is immutable once built, and holds no per-call state:
/// the same instance can serve any number of inspectors.
#[derive(Debug, Clone)]
pub struct LayoutDecoder {
    limits: Limits,
    catalogue: Catalogue,
}

impl Default for LayoutDecoder {
    fn default() -> Self {
        LayoutDecoder::new()
    }
}

impl LayoutDecoder {
    /// Create a decoder with the standard catalogue and default limits.
    pub fn new() -> LayoutDecoder {
        LayoutDecoder {
            limits: Limits::default(),
            catalogue: Catalogue::standard(),
        }
    }

    /// Create a [`LayoutDecoderBuilder`] to customize limits.
    pub fn builder() -> LayoutDecoderBuilder {
        LayoutDecoderBuilder::new()
    }

    /// The limits this decoder was built with.
    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    /// The catalogue this decoder was built with.
    pub fn catalogue(&self) -> &Catalogue {
        &self.catalogue
    }

    /// Whether `type_name` has a decoder. Does not touch target memory.
    pub fn has_decoder(&self, type_name: &str) -> bool {
        self.descriptor(type_name).is_some()
    }

    /// The layout descriptor registered for `type_name`.
    pub fn descriptor(&self, type_name: &str) -> Option<&LayoutDescriptor> {
        self.catalogue.lookup_str(type_name)
    }

    /// Display formats offered for `type_name`, besides `Automatic`.
    pub fn display_formats(&self, type_name: &str) -> &'static [DisplayFormat] {
        match self.descriptor(type_name) {
            Some(desc) => desc.formats,
            None => &[],
        }
    }

    /// Decode the value described by `value`.
    ///
    /// Errors in nested elements are reported in-band, as degraded child
    /// nodes. An error is only returned when the root value itself can't be
    /// decoded, or when the inspector reports a fatal error.
    pub fn decode<I: Inspector + ?Sized>(
        &self,
        inspector: &mut I,
        value: ValueRef<'_>,
    ) -> DecodeResult<DecodedNode, I> {
        let ty = match TypeName::parse(value.type_name) {
            Some(ty) => ty,
            None => {
                debug!("cannot parse type name `{}`", value.type_name);
                return Err(DecodeError::UnrecognizedLayout(value.type_name.to_string()));
            }
        };

        let desc = match self.catalogue.lookup(&ty) {
            Some(desc) => *desc,
            None => {
                debug!("no decoder for `{}`", ty);
                return Err(DecodeError::UnrecognizedLayout(ty.as_str().to_string()));
            }
        };

        let mut cx = DecodeCx::new(self, inspector);
        let subject = cx.subject(
            value.name.to_string(),
            value.name.to_string(),
            ty,
            desc,
            value.addr,
            0,
        );
        let res = cx.dispatch(&subject);
        if let Err(DecodeError::Sanity(v)) = &res {
            warn!("{}: {}", subject.path, v);
        }
        res
    }
}

/// One value to decode, after its descriptor and ABI variant were selected.
pub(crate) struct Subject {
    pub label: String,
    pub path: String,
    pub ty: TypeName,
    pub desc: LayoutDescriptor,
    pub abi: Abi,
    pub addr: u64,
    pub depth: usize,
}

impl Subject {
    pub fn node(&self) -> DecodedNode {
        DecodedNode::new(self.label.clone())
    }

    pub fn child_path(&self, label: &str) -> String {
        format!("{}.{}", self.path, label)
    }

    /// Address of the field `off` bytes into the value.
    pub fn field(&self, off: u64) -> Result<u64, SanityViolation> {
        at(self.addr, off)
    }
}

/// `base + off`, refusing to wrap around the address space.
pub(crate) fn at(base: u64, off: u64) -> Result<u64, SanityViolation> {
    base.checked_add(off).ok_or(SanityViolation::AddressOverflow { base })
}

/// Address of a value stored `off` bytes into the node at `node`.
pub(crate) fn value_at(node: u64, off: u64, align: u64) -> Result<u64, SanityViolation> {
    let addr = at(node, off)?;
    align_up(addr, align).ok_or(SanityViolation::AddressOverflow { base: node })
}

/// Address of element `i` of an array at `base`.
pub(crate) fn index_addr(base: u64, i: u64, stride: u64) -> Result<u64, SanityViolation> {
    i.checked_mul(stride)
        .and_then(|off| base.checked_add(off))
        .ok_or(SanityViolation::AddressOverflow { base })
}

pub(crate) fn index_label(i: u64) -> String {
    format!("[{}]", i)
}

/// Key and mapped types laid out like `pair<const K, V>`.
#[derive(Debug, Clone)]
pub(crate) struct PairShape {
    pub key: TypeName,
    pub mapped: TypeName,
    pub second: u64,
}

/// The element type of a container, with its size and alignment resolved.
#[derive(Debug, Clone)]
pub(crate) enum Element {
    Value(TypeName),
    Pair(PairShape),
}

#[derive(Debug, Clone)]
pub(crate) struct ElementDesc {
    pub kind: Element,
    pub size: u64,
    pub align: u64,
}

impl ElementDesc {
    /// Distance between consecutive elements of an array.
    pub fn stride(&self) -> Result<u64, SanityViolation> {
        match self.size {
            0 => Err(SanityViolation::ZeroSizedElement(self.name())),
            n => Ok(n),
        }
    }

    pub fn name(&self) -> String {
        match &self.kind {
            Element::Value(ty) => ty.as_str().to_string(),
            Element::Pair(p) => format!("pair<{},{}>", p.key, p.mapped),
        }
    }

    pub fn is_pair(&self) -> bool {
        matches!(self.kind, Element::Pair(_))
    }
}

/// Remaining pointer dereferences for one structure walk.
pub(crate) struct Hops(u64);

impl Hops {
    pub fn take(&mut self) -> bool {
        match self.0 {
            0 => false,
            _ => {
                self.0 -= 1;
                true
            }
        }
    }
}

/// Per-call decoding state.
pub(crate) struct DecodeCx<'a, I: Inspector + ?Sized> {
    pub inspector: &'a mut I,
    pub limits: &'a Limits,
    catalogue: &'a Catalogue,
    platform: Platform,
    pub ptr: u64,
    pub endian: Endianness,
}

impl<'a, I: Inspector + ?Sized> DecodeCx<'a, I> {
    fn new(decoder: &'a LayoutDecoder, inspector: &'a mut I) -> DecodeCx<'a, I> {
        DecodeCx {
            platform: inspector.platform(),
            ptr: inspector.pointer_size() as u64,
            endian: inspector.endianness(),
            inspector,
            limits: &decoder.limits,
            catalogue: &decoder.catalogue,
        }
    }

    fn subject(
        &self,
        label: String,
        path: String,
        ty: TypeName,
        desc: LayoutDescriptor,
        addr: u64,
        depth: usize,
    ) -> Subject {
        let abi = Abi::new(AbiVariant::select(self.platform, &ty), self.ptr, self.endian);
        Subject {
            label,
            path,
            ty,
            desc,
            abi,
            addr,
            depth,
        }
    }

    fn dispatch(&mut self, s: &Subject) -> DecodeResult<DecodedNode, I> {
        #[cfg(feature = "trace-nodes")]
        trace!("{}: {} @ {:#x} ({:?})", s.path, s.ty, s.addr, s.abi.variant);

        use self::ContainerKind as K;
        match s.desc.kind {
            K::Vector => contiguous::vector(self, s),
            K::Array => contiguous::array(self, s),
            K::Valarray => contiguous::valarray(self, s),
            K::Deque => deque::decode(self, s),
            K::List => list::decode(self, s),
            K::Tree => tree::decode(self, s),
            K::TreeIterator => tree::iterator(self, s),
            K::HashTable | K::UnorderedSet => hashtable::decode(self, s),
            K::String => string::decode(self, s),
            K::SmartPtr => pointer::smart_ptr(self, s),
            K::Optional => pointer::optional(self, s),
            K::Pair => misc::pair(self, s),
            K::Complex => misc::complex(self, s),
            K::Function => misc::function(self, s),
            K::Stack => misc::stack(self, s),
            K::SafeIterator => misc::safe_iterator(self, s),
            K::OnceFlag => misc::once_flag(self, s),
        }
    }

    pub fn hops(&self) -> Hops {
        Hops(self.limits.hop_budget)
    }

    pub fn is_expanded(&self, path: &str) -> bool {
        self.inspector.is_expanded(path)
    }

    pub fn format(&self, path: &str) -> DisplayFormat {
        self.inspector.item_format(path)
    }

    pub fn read_pointer(&mut self, addr: u64) -> DecodeResult<u64, I> {
        Ok(self.inspector.read_pointer(addr)?)
    }

    pub fn read_scalar(&mut self, addr: u64, width: usize) -> DecodeResult<u64, I> {
        Ok(self.inspector.read_scalar(addr, width)?)
    }

    /// Validate a header count against a sanity ceiling.
    pub fn check_count(
        &self,
        what: &'static str,
        count: i64,
        max: u64,
    ) -> Result<u64, SanityViolation> {
        if count < 0 || count as u64 > max {
            return Err(SanityViolation::CountOutOfRange { what, count, max });
        }
        Ok(count as u64)
    }

    /// Null is fine; anything else must pass the host's pointer check.
    pub fn check_pointer(&mut self, what: &'static str, addr: u64) -> Result<(), SanityViolation> {
        if addr != 0 && !self.inspector.check_pointer(addr) {
            return Err(SanityViolation::BadPointer { what, addr });
        }
        Ok(())
    }

    pub fn type_desc(&mut self, ty: &TypeName) -> DecodeResult<TypeDesc, I> {
        let name = ty.as_str();
        if name.ends_with('*') {
            return Ok(TypeDesc::new(name, self.ptr, self.ptr));
        }
        Ok(self.inspector.resolve_type(name)?)
    }

    /// Resolve the element type of `s` according to its descriptor.
    pub fn element_of(&mut self, s: &Subject) -> DecodeResult<ElementDesc, I> {
        self.element_for(&s.ty, s.desc.element)
    }

    fn element_for(&mut self, ty: &TypeName, args: ElementArgs) -> DecodeResult<ElementDesc, I> {
        let missing = || DecodeError::UnrecognizedLayout(ty.as_str().to_string());

        match args {
            ElementArgs::None => Err(missing()),
            ElementArgs::First => self.element(ty.arg_type(0).ok_or_else(missing)?),
            ElementArgs::Second => self.element(ty.arg_type(1).ok_or_else(missing)?),
            ElementArgs::KeyValue => {
                let key = ty.arg_type(0).ok_or_else(missing)?;
                let mapped = ty.arg_type(1).ok_or_else(missing)?;
                self.pair(key, mapped)
            }
            ElementArgs::Innermost => {
                let inner = ty
                    .arg_type(0)
                    .and_then(|t| t.arg_type(0))
                    .and_then(|t| t.arg_type(0))
                    .ok_or_else(missing)?;
                self.element(inner)
            }
            ElementArgs::Parent => {
                let parent = ty.parent().ok_or_else(missing)?;
                let desc = self.catalogue.lookup(&parent).copied().ok_or_else(missing)?;
                match desc.element {
                    ElementArgs::Parent => Err(missing()),
                    args => self.element_for(&parent, args),
                }
            }
        }
    }

    /// Describe a value of type `ty` stored as a container element. `pair`
    /// types get their layout computed from the key and mapped types.
    pub fn element(&mut self, ty: &TypeName) -> DecodeResult<ElementDesc, I> {
        let is_pair = matches!(
            self.catalogue.lookup(ty),
            Some(LayoutDescriptor {
                kind: ContainerKind::Pair,
                ..
            })
        );
        if is_pair {
            if let (Some(k), Some(v)) = (ty.arg_type(0), ty.arg_type(1)) {
                return self.pair(k, v);
            }
        }

        let desc = self.type_desc(ty)?;
        Ok(ElementDesc {
            kind: Element::Value(ty.clone()),
            size: desc.size,
            align: desc.align,
        })
    }

    pub fn pair(&mut self, key: &TypeName, mapped: &TypeName) -> DecodeResult<ElementDesc, I> {
        let k = self.type_desc(key)?;
        let v = self.type_desc(mapped)?;
        let second = value_at(0, k.size, v.align)?;
        let align = k.align.max(v.align).max(1);
        Ok(ElementDesc {
            kind: Element::Pair(PairShape {
                key: key.clone(),
                mapped: mapped.clone(),
                second,
            }),
            size: value_at(second, v.size, align)?,
            align,
        })
    }

    /// Decode any value: with its container decoder if it has one, as a leaf
    /// otherwise.
    pub fn decode_value(
        &mut self,
        label: String,
        path: String,
        ty: &TypeName,
        addr: u64,
        depth: usize,
    ) -> DecodeResult<DecodedNode, I> {
        if depth > self.limits.max_depth {
            return Err(DecodeError::DepthExceeded(self.limits.max_depth));
        }

        match self.catalogue.lookup(ty).copied() {
            Some(desc) => {
                let s = self.subject(label, path, ty.clone(), desc, addr, depth);
                self.dispatch(&s)
            }
            None => self.leaf(label, ty, addr),
        }
    }

    fn leaf(&mut self, label: String, ty: &TypeName, addr: u64) -> DecodeResult<DecodedNode, I> {
        let raw = || Value::Raw {
            type_name: ty.as_str().to_string(),
            addr,
        };

        let desc = match self.type_desc(ty) {
            Ok(desc) => desc,
            Err(DecodeError::Inspect(InspectError::UnknownType(_))) => {
                return Ok(DecodedNode::leaf(label, raw()))
            }
            Err(e) => return Err(e),
        };

        if let Some(value) = self.inspector.render_value(&desc, addr)? {
            return Ok(DecodedNode::leaf(label, value));
        }

        if (1..=8).contains(&desc.size) {
            let mut buf = [0u8; 8];
            let buf = &mut buf[..desc.size as usize];
            self.inspector.read_bytes(addr, buf)?;
            if let Some(value) = render_builtin(ty.as_str(), buf, self.endian) {
                return Ok(DecodedNode::leaf(label, value));
            }
        }

        Ok(DecodedNode::leaf(label, raw()))
    }

    /// Decode a value of type `ty` as a child of `parent`, degrading
    /// non-fatal errors.
    pub fn emit_value(
        &mut self,
        parent: &Subject,
        label: String,
        ty: &TypeName,
        addr: u64,
    ) -> DecodeResult<DecodedNode, I> {
        let path = parent.child_path(&label);
        let res = self.decode_value(label.clone(), path.clone(), ty, addr, parent.depth + 1);
        self.settle(label, &path, res)
    }

    /// Decode one element of `parent` at `addr`, degrading non-fatal errors.
    pub fn emit(
        &mut self,
        parent: &Subject,
        label: String,
        elem: &ElementDesc,
        addr: u64,
    ) -> DecodeResult<DecodedNode, I> {
        let path = parent.child_path(&label);
        let res = self.decode_element(label.clone(), path.clone(), elem, addr, parent.depth + 1);
        self.settle(label, &path, res)
    }

    /// Emit the element stored `off` bytes into the node at `node`. A node
    /// pointer too close to the top of the address space degrades the child.
    pub fn emit_in_node(
        &mut self,
        parent: &Subject,
        label: String,
        elem: &ElementDesc,
        node: u64,
        off: u64,
    ) -> DecodeResult<DecodedNode, I> {
        match value_at(node, off, elem.align) {
            Ok(addr) => self.emit(parent, label, elem, addr),
            Err(v) => {
                let path = parent.child_path(&label);
                self.settle(label, &path, Err(v.into()))
            }
        }
    }

    fn decode_element(
        &mut self,
        label: String,
        path: String,
        elem: &ElementDesc,
        addr: u64,
        depth: usize,
    ) -> DecodeResult<DecodedNode, I> {
        match &elem.kind {
            Element::Value(ty) => self.decode_value(label, path, ty, addr, depth),
            Element::Pair(p) => self.decode_pair(label, path, p, addr, depth),
        }
    }

    /// Turn a child's error into a degraded node, unless it is fatal.
    pub fn settle(
        &mut self,
        label: String,
        path: &str,
        res: DecodeResult<DecodedNode, I>,
    ) -> DecodeResult<DecodedNode, I> {
        match res {
            Ok(node) => {
                #[cfg(feature = "trace-nodes")]
                trace!("{} = {}", path, node.summary());
                Ok(node)
            }
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                if let DecodeError::Sanity(v) = &e {
                    warn!("{}: {}", path, v);
                } else {
                    debug!("{}: degraded", path);
                }
                Ok(DecodedNode::leaf(label, degraded(&e)))
            }
        }
    }

    /// Decode a key/value pair: `first` / `second` children, the key summary
    /// in `key`, and the mapped summary as the value.
    pub fn decode_pair(
        &mut self,
        label: String,
        path: String,
        p: &PairShape,
        addr: u64,
        depth: usize,
    ) -> DecodeResult<DecodedNode, I> {
        if depth > self.limits.max_depth {
            return Err(DecodeError::DepthExceeded(self.limits.max_depth));
        }

        let first_path = format!("{}.first", path);
        let res = self.decode_value("first".into(), first_path.clone(), &p.key, addr, depth + 1);
        let first = self.settle("first".into(), &first_path, res)?;

        let second_path = format!("{}.second", path);
        let res = match at(addr, p.second) {
            Ok(second) => self.decode_value(
                "second".into(),
                second_path.clone(),
                &p.mapped,
                second,
                depth + 1,
            ),
            Err(v) => Err(v.into()),
        };
        let second = self.settle("second".into(), &second_path, res)?;

        let mut node = DecodedNode::new(label);
        node.key = Some(summary_value(&first));
        node.value = summary_value(&second);
        node.expandable = true;
        if self.is_expanded(&path) {
            node.children = Some(crate::node::Children {
                nodes: alloc::vec![first, second],
                truncated: false,
            });
        }
        Ok(node)
    }
}

/// A node's value column as a `Value`, folding item counts into text.
pub(crate) fn summary_value(node: &DecodedNode) -> Value {
    match (&node.value, node.item_count) {
        (Value::Empty, Some(_)) => Value::Text(node.summary()),
        (value, _) => value.clone(),
    }
}

/// Show a map element compactly: the key becomes the label.
pub(crate) fn compact(mut node: DecodedNode) -> DecodedNode {
    if let Some(key) = node.key.take() {
        node.label = key.to_string();
    }
    node
}

fn degraded<E>(e: &DecodeError<E>) -> Value {
    match e {
        DecodeError::Sanity(v) => Value::Degraded(v.to_string()),
        DecodeError::DepthExceeded(depth) => {
            Value::Degraded(format!("nested deeper than {} levels", depth))
        }
        DecodeError::UnrecognizedLayout(name) => {
            Value::Degraded(format!("unrecognized layout `{}`", name))
        }
        _ => Value::Special(Special::NotAccessible),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::Snapshot;

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn decoder_is_shareable() {
        assert_send_sync::<LayoutDecoder>();
    }

    #[test]
    fn catalogue_queries() {
        let dec = LayoutDecoder::new();
        assert!(dec.has_decoder("eastl::vector<int, eastl::allocator>"));
        assert!(dec.has_decoder("eastl::__debug::map<int, int>"));
        assert!(!dec.has_decoder("MyStruct"));
        assert_eq!(
            dec.display_formats("eastl::wstring"),
            &[DisplayFormat::Simple, DisplayFormat::Separate]
        );
        assert!(dec.display_formats("MyStruct").is_empty());
    }

    #[test]
    fn unknown_types_are_unrecognized() {
        let dec = LayoutDecoder::new();
        let mut snap = Snapshot::new(Platform::Standard, 8);
        let err = dec
            .decode(&mut snap, ValueRef::new("x", "MyStruct", 0x1000))
            .unwrap_err();
        assert!(matches!(err, DecodeError::UnrecognizedLayout(name) if name == "MyStruct"));

        let err = dec
            .decode(&mut snap, ValueRef::new("x", "eastl::vector<int", 0x1000))
            .unwrap_err();
        assert!(matches!(err, DecodeError::UnrecognizedLayout(_)));
    }

    #[test]
    fn unreadable_root_is_an_error() {
        let dec = LayoutDecoder::new();
        let mut snap = Snapshot::new(Platform::Standard, 8);
        let err = dec
            .decode(&mut snap, ValueRef::new("v", "eastl::vector<int>", 0x1000))
            .unwrap_err();
        assert!(matches!(
            err,
            DecodeError::Inspect(InspectError::Unreadable { addr: 0x1000, .. })
        ));
    }

    #[test]
    fn pair_shapes() {
        let dec = LayoutDecoder::new();
        let mut snap = Snapshot::new(Platform::Standard, 8);
        let mut cx = DecodeCx::new(&dec, &mut snap);

        let k = TypeName::parse("char").unwrap();
        let v = TypeName::parse("double").unwrap();
        let p = cx.pair(&k, &v).unwrap();
        assert_eq!((p.size, p.align), (16, 8));
        match p.kind {
            Element::Pair(shape) => assert_eq!(shape.second, 8),
            Element::Value(_) => panic!("expected a pair"),
        }

        let ty = TypeName::parse("eastl::pair<int, int>").unwrap();
        let e = cx.element(&ty).unwrap();
        assert!(e.is_pair());
        assert_eq!(e.size, 8);
    }
}
