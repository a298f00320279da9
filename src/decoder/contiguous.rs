//! `vector`, `array` and `valarray`: elements laid out back to back.

use alloc::vec::Vec;

use crate::abi::ValarrayLayout;
use crate::error::{DecodeError, SanityViolation};
use crate::format::DisplayFormat;
use crate::inspector::Inspector;
use crate::node::{Children, DecodedNode, ItemCount, Value};

use super::{index_addr, index_label, DecodeCx, DecodeResult, ElementDesc, Subject};

const MAX_CHILDREN: u64 = 10_000;

pub(super) fn vector<I: Inspector + ?Sized>(
    cx: &mut DecodeCx<'_, I>,
    s: &Subject,
) -> DecodeResult<DecodedNode, I> {
    let l = s.abi.vector();
    let begin = cx.read_pointer(s.field(l.begin)?)?;
    let end = cx.read_pointer(s.field(l.end)?)?;
    let capacity = cx.read_pointer(s.field(l.capacity)?)?;

    let elem = cx.element_of(s)?;
    let stride = elem.stride()?;

    if end < begin || (end - begin) % stride != 0 {
        return Err(SanityViolation::BadRange { begin, end }.into());
    }
    let size = (end - begin) / stride;

    if size > 0 {
        cx.check_pointer("begin", begin)?;
        cx.check_pointer("end", end)?;
        cx.check_pointer("capacity", capacity)?;
        if capacity < end {
            return Err(SanityViolation::SizeExceedsCapacity {
                size,
                capacity: capacity.saturating_sub(begin) / stride,
            }
            .into());
        }
    }
    let size = cx.check_count("size", size as i64, cx.limits.max_sane_count)?;

    elements(cx, s, &elem, begin, size)
}

pub(super) fn array<I: Inspector + ?Sized>(
    cx: &mut DecodeCx<'_, I>,
    s: &Subject,
) -> DecodeResult<DecodedNode, I> {
    let n = s
        .ty
        .arg_value(1)
        .ok_or_else(|| DecodeError::UnrecognizedLayout(s.ty.as_str().into()))?;
    let size = cx.check_count("array length", n, cx.limits.max_sane_count)?;
    let elem = cx.element_of(s)?;
    elem.stride()?;

    elements(cx, s, &elem, s.addr, size)
}

pub(super) fn valarray<I: Inspector + ?Sized>(
    cx: &mut DecodeCx<'_, I>,
    s: &Subject,
) -> DecodeResult<DecodedNode, I> {
    let elem = cx.element_of(s)?;
    let stride = elem.stride()?;

    let (data, size) = match s.abi.valarray() {
        ValarrayLayout::SizeData { size, data } => {
            let size = cx.read_pointer(s.field(size)?)?;
            (cx.read_pointer(s.field(data)?)?, size)
        }
        ValarrayLayout::BeginEnd { begin, end } => {
            let begin = cx.read_pointer(s.field(begin)?)?;
            let end = cx.read_pointer(s.field(end)?)?;
            if end < begin {
                return Err(SanityViolation::BadRange { begin, end }.into());
            }
            (begin, (end - begin) / stride)
        }
    };

    let size = cx.check_count("size", size as i64, cx.limits.max_sane_count)?;
    if size > 0 {
        cx.check_pointer("data", data)?;
    }

    elements(cx, s, &elem, data, size)
}

/// Emit `size` elements starting at `base`, or a single array descriptor
/// when the user picked the plot format.
fn elements<I: Inspector + ?Sized>(
    cx: &mut DecodeCx<'_, I>,
    s: &Subject,
    elem: &ElementDesc,
    base: u64,
    size: u64,
) -> DecodeResult<DecodedNode, I> {
    let mut node = s.node();
    node.item_count = Some(ItemCount::Exact(size));

    if cx.format(&s.path) == DisplayFormat::ArrayPlot {
        node.value = Value::Array {
            type_name: elem.name(),
            addr: base,
            count: size,
        };
        return Ok(node);
    }

    node.expandable = size > 0;
    if !node.expandable || !cx.is_expanded(&s.path) {
        return Ok(node);
    }

    let shown = size.min(cx.limits.children(MAX_CHILDREN));
    // the shown elements must not run off the end of the address space
    index_addr(base, shown, elem.size)?;
    let mut nodes = Vec::with_capacity(shown as usize);
    for i in 0..shown {
        nodes.push(cx.emit(s, index_label(i), elem, base + i * elem.size)?);
    }
    node.children = Some(Children {
        nodes,
        truncated: shown < size,
    });
    Ok(node)
}
