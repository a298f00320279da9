//! Doubly linked lists with a sentinel node.

use alloc::vec::Vec;

use crate::abi::{CachedSize, ListLayout, Sentinel};
use crate::inspector::Inspector;
use crate::node::{Children, DecodedNode, ItemCount};

use super::{at, index_label, DecodeCx, DecodeResult, ElementDesc, Subject};

pub(super) const MAX_CHILDREN: u64 = 1000;

/// The two ends of a list: where walking starts, and the node that ends it.
pub(super) struct Ends {
    pub sentinel: u64,
    pub first: u64,
}

pub(super) fn ends<I: Inspector + ?Sized>(
    cx: &mut DecodeCx<'_, I>,
    addr: u64,
    l: &ListLayout,
) -> DecodeResult<Ends, I> {
    let sentinel = match l.sentinel {
        Sentinel::Inline(off) => at(addr, off)?,
        Sentinel::Indirect(off) => cx.read_pointer(at(addr, off)?)?,
    };
    let first = cx.read_pointer(at(sentinel, l.next)?)?;
    Ok(Ends { sentinel, first })
}

pub(super) fn decode<I: Inspector + ?Sized>(
    cx: &mut DecodeCx<'_, I>,
    s: &Subject,
) -> DecodeResult<DecodedNode, I> {
    let l = s.abi.list();
    let ends = ends(cx, s.addr, &l)?;

    let cached = match l.size {
        CachedSize::Always(off) => Some(off),
        CachedSize::IfTypeSize { offset, type_size } => match cx.type_desc(&s.ty) {
            Ok(desc) if desc.size == type_size => Some(offset),
            Ok(_) => None,
            Err(e) if e.is_fatal() => return Err(e),
            // no type info: fall back to counting
            Err(_) => None,
        },
    };

    let count = match cached {
        Some(off) => {
            let size = cx.read_pointer(s.field(off)?)?;
            ItemCount::Exact(cx.check_count("size", size as i64, cx.limits.max_sane_count)?)
        }
        None => count_nodes(cx, s, &ends, l.next)?,
    };

    let mut node = s.node();
    node.item_count = Some(count);
    node.expandable = count.get() > 0;
    if !node.expandable || !cx.is_expanded(&s.path) {
        return Ok(node);
    }

    let elem = cx.element_of(s)?;
    node.children = Some(walk(cx, s, &ends, &l, &elem, count)?);
    Ok(node)
}

/// Count nodes by chasing `next`, stopping after `list_count_cap` nodes.
fn count_nodes<I: Inspector + ?Sized>(
    cx: &mut DecodeCx<'_, I>,
    s: &Subject,
    ends: &Ends,
    next: u64,
) -> DecodeResult<ItemCount, I> {
    let cap = cx.limits.list_count_cap;
    let mut hops = cx.hops();
    let mut p = ends.first;
    let mut n = 0;

    while p != ends.sentinel && p != 0 && n <= cap {
        if !hops.take() {
            warn!("{}: pointer-hop budget exhausted after {} nodes", s.path, n);
            return Ok(ItemCount::AtLeast(n));
        }
        n += 1;
        p = cx.read_pointer(at(p, next)?)?;
    }

    Ok(if n > cap {
        ItemCount::AtLeast(cap)
    } else {
        ItemCount::Exact(n)
    })
}

/// Emit list elements from `ends.first` until the sentinel, a null link,
/// `count`, or the child cap, whichever comes first.
pub(super) fn walk<I: Inspector + ?Sized>(
    cx: &mut DecodeCx<'_, I>,
    s: &Subject,
    ends: &Ends,
    l: &ListLayout,
    elem: &ElementDesc,
    count: ItemCount,
) -> DecodeResult<Children, I> {
    let want = count.get().min(cx.limits.children(MAX_CHILDREN));
    let mut hops = cx.hops();
    let mut nodes = Vec::new();
    let mut p = ends.first;

    while (nodes.len() as u64) < want && p != ends.sentinel && p != 0 && hops.take() {
        let label = index_label(nodes.len() as u64);
        nodes.push(cx.emit_in_node(s, label, elem, p, l.value)?);
        let link = match at(p, l.next) {
            Ok(link) => link,
            Err(v) => {
                warn!("{}: list walk stopped: {}", s.path, v);
                break;
            }
        };
        p = match cx.read_pointer(link) {
            Ok(next) => next,
            Err(e) if e.is_fatal() => return Err(e),
            Err(_) => break,
        };
    }

    let truncated = count.is_truncated() || (nodes.len() as u64) < count.get();
    Ok(Children { nodes, truncated })
}
