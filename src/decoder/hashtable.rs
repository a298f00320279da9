//! Hash tables: `hash_map`, `unordered_set` and friends.

use alloc::vec::Vec;

use crate::abi::{CachedSize, HashLayout};
use crate::catalogue::ContainerKind;
use crate::format::DisplayFormat;
use crate::inspector::Inspector;
use crate::node::{Children, DecodedNode, ItemCount};

use super::{
    at, compact, index_addr, index_label, list, value_at, DecodeCx, DecodeResult, ElementDesc,
    Subject,
};

const MAX_BUCKET_CHILDREN: u64 = 10_000;
const MAX_LIST_CHILDREN: u64 = 1000;

pub(super) fn decode<I: Inspector + ?Sized>(
    cx: &mut DecodeCx<'_, I>,
    s: &Subject,
) -> DecodeResult<DecodedNode, I> {
    let layout = match s.desc.kind {
        ContainerKind::UnorderedSet => s.abi.unordered_set(),
        _ => s.abi.hashtable(),
    };

    let size_off = match layout {
        HashLayout::Buckets { element_count, .. } => element_count,
        HashLayout::GlobalList { size, .. } => size,
        HashLayout::EmbeddedList { offset, list } => match list.size {
            CachedSize::Always(off) => offset + off,
            CachedSize::IfTypeSize { offset: off, .. } => offset + off,
        },
    };
    let size = cx.read_pointer(s.field(size_off)?)?;
    let size = cx.check_count("size", size as i64, cx.limits.max_sane_tree_count)?;

    let mut node = s.node();
    node.item_count = Some(ItemCount::Exact(size));
    node.expandable = size > 0;
    if !node.expandable || !cx.is_expanded(&s.path) {
        return Ok(node);
    }

    let elem = cx.element_of(s)?;
    let mut children = match layout {
        HashLayout::Buckets {
            array,
            bucket_count,
            ..
        } => buckets(cx, s, &elem, array, bucket_count, size)?,
        HashLayout::GlobalList {
            first, next, value, ..
        } => global_list(cx, s, &elem, first, next, value, size)?,
        HashLayout::EmbeddedList { offset, list } => {
            let ends = list::ends(cx, s.field(offset)?, &list)?;
            list::walk(cx, s, &ends, &list, &elem, ItemCount::Exact(size))?
        }
    };

    if elem.is_pair() && cx.format(&s.path) == DisplayFormat::CompactMap {
        children.nodes = children.nodes.into_iter().map(compact).collect();
    }
    node.children = Some(children);
    Ok(node)
}

/// Walk each bucket's chain in bucket order. A node stores its element
/// first, followed by the `next` pointer.
fn buckets<I: Inspector + ?Sized>(
    cx: &mut DecodeCx<'_, I>,
    s: &Subject,
    elem: &ElementDesc,
    array_off: u64,
    count_off: u64,
    size: u64,
) -> DecodeResult<Children, I> {
    let array = cx.read_pointer(s.field(array_off)?)?;
    let bucket_count = cx.read_pointer(s.field(count_off)?)?;
    let bucket_count =
        cx.check_count("bucket count", bucket_count as i64, cx.limits.max_sane_tree_count)?;
    cx.check_pointer("bucket array", array)?;

    let next_off = value_at(0, elem.size, cx.ptr)?;
    let want = size.min(cx.limits.children(MAX_BUCKET_CHILDREN));
    let mut hops = cx.hops();
    let mut nodes = Vec::new();

    // every bucket read and every chain link draws from the hop budget
    'buckets: for b in 0..bucket_count {
        if nodes.len() as u64 >= want {
            break;
        }
        if !hops.take() {
            warn!("{}: pointer-hop budget exhausted at bucket {}", s.path, b);
            break;
        }
        let mut p = cx.read_pointer(index_addr(array, b, cx.ptr)?)?;
        while p != 0 {
            if nodes.len() as u64 >= want {
                break 'buckets;
            }
            if !hops.take() {
                warn!("{}: pointer-hop budget exhausted", s.path);
                break 'buckets;
            }
            let label = index_label(nodes.len() as u64);
            nodes.push(cx.emit(s, label, elem, p)?);
            p = match at(p, next_off) {
                Ok(link) => match cx.read_pointer(link) {
                    Ok(next) => next,
                    Err(e) if e.is_fatal() => return Err(e),
                    Err(_) => 0,
                },
                Err(_) => 0,
            };
        }
    }

    Ok(Children {
        truncated: (nodes.len() as u64) < size,
        nodes,
    })
}

/// Follow the single list threading every element, starting at the
/// before-begin node's `next`.
fn global_list<I: Inspector + ?Sized>(
    cx: &mut DecodeCx<'_, I>,
    s: &Subject,
    elem: &ElementDesc,
    first: u64,
    next: u64,
    value: u64,
    size: u64,
) -> DecodeResult<Children, I> {
    let want = size.min(cx.limits.children(MAX_LIST_CHILDREN));
    let mut hops = cx.hops();
    let mut nodes = Vec::new();
    let mut p = cx.read_pointer(s.field(first)?)?;

    while p != 0 && (nodes.len() as u64) < want && hops.take() {
        let label = index_label(nodes.len() as u64);
        nodes.push(cx.emit_in_node(s, label, elem, p, value)?);
        let link = match at(p, next) {
            Ok(link) => link,
            Err(_) => break,
        };
        p = match cx.read_pointer(link) {
            Ok(next) => next,
            Err(e) if e.is_fatal() => return Err(e),
            Err(_) => break,
        };
    }

    Ok(Children {
        truncated: (nodes.len() as u64) < size,
        nodes,
    })
}
