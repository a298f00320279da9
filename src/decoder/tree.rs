//! Red-black trees (`map`, `set` and friends) and their iterators.

use alloc::vec::Vec;

use crate::abi::{TreeLayout, TreeShape};
use crate::error::{DecodeError, SanityViolation};
use crate::format::DisplayFormat;
use crate::inspector::Inspector;
use crate::node::{Children, DecodedNode, ItemCount, Special, Value};

use super::{at, compact, index_label, value_at, DecodeCx, DecodeResult, Element, Hops, Subject};

const MAX_CHILDREN: u64 = 1000;

/// Link reads that draw from a shared hop budget.
struct Links<'c, 'a, I: Inspector + ?Sized> {
    cx: &'c mut DecodeCx<'a, I>,
    hops: Hops,
    t: TreeLayout,
}

impl<'c, 'a, I: Inspector + ?Sized> Links<'c, 'a, I> {
    fn read(&mut self, addr: u64) -> DecodeResult<u64, I> {
        if !self.hops.take() {
            return Err(SanityViolation::HopBudgetExhausted.into());
        }
        self.cx.read_pointer(addr)
    }

    fn left(&mut self, node: u64) -> DecodeResult<u64, I> {
        self.read(at(node, self.t.left)?)
    }

    fn right(&mut self, node: u64) -> DecodeResult<u64, I> {
        self.read(at(node, self.t.right)?)
    }

    fn parent(&mut self, node: u64) -> DecodeResult<u64, I> {
        self.read(at(node, self.t.parent)?)
    }

    fn min(&mut self, mut node: u64) -> DecodeResult<u64, I> {
        loop {
            let left = self.left(node)?;
            if left == 0 {
                return Ok(node);
            }
            node = left;
        }
    }
}

/// EASTL: leftmost node from the anchor, then the anchor-aware successor.
fn walk_anchor<I: Inspector + ?Sized>(
    l: &mut Links<'_, '_, I>,
    addr: u64,
    want: u64,
    out: &mut Vec<u64>,
) -> DecodeResult<(), I> {
    let anchor = at(addr, l.t.header)?;
    let mut node = l.left(anchor)?;

    while (out.len() as u64) < want && node != anchor && node != 0 {
        out.push(node);

        let right = l.right(node)?;
        if right != 0 {
            node = l.min(right)?;
            continue;
        }

        let mut parent = l.parent(node)?;
        while node == l.right(parent)? {
            node = parent;
            parent = l.parent(parent)?;
        }
        // the root's parent is the anchor, whose right link is the rightmost node
        if l.right(node)? != parent {
            node = parent;
        }
    }
    Ok(())
}

/// `__1::`: `begin_node` pointer, then `tree_next` until the end node.
fn walk_end_node<I: Inspector + ?Sized>(
    l: &mut Links<'_, '_, I>,
    addr: u64,
    want: u64,
    out: &mut Vec<u64>,
) -> DecodeResult<(), I> {
    let header = at(addr, l.t.header)?;
    let end = at(header, l.cx.ptr)?;
    let mut node = l.read(header)?;

    while (out.len() as u64) < want && node != end && node != 0 {
        out.push(node);

        let right = l.right(node)?;
        if right != 0 {
            node = l.min(right)?;
            continue;
        }

        loop {
            let parent = l.parent(node)?;
            let is_left_child = l.left(parent)? == node;
            node = parent;
            if is_left_child {
                break;
            }
        }
    }
    Ok(())
}

/// Dinkumware: in-order traversal from the root, with the head node standing
/// in for every nil leaf.
fn walk_nil_head<I: Inspector + ?Sized>(
    l: &mut Links<'_, '_, I>,
    addr: u64,
    want: u64,
    out: &mut Vec<u64>,
) -> DecodeResult<(), I> {
    let head = l.read(at(addr, l.t.header)?)?;
    let mut node = l.parent(head)?;
    let mut stack = Vec::new();

    while (out.len() as u64) < want {
        while !is_nil(l, head, node)? {
            stack.push(node);
            node = l.left(node)?;
        }
        let top = match stack.pop() {
            Some(top) => top,
            None => break,
        };
        out.push(top);
        node = l.right(top)?;
    }
    Ok(())
}

fn is_nil<I: Inspector + ?Sized>(
    l: &mut Links<'_, '_, I>,
    head: u64,
    node: u64,
) -> DecodeResult<bool, I> {
    if node == head || node == 0 {
        return Ok(true);
    }
    match l.t.is_nil {
        Some(off) => Ok(l.cx.read_scalar(at(node, off)?, 1)? != 0),
        None => Ok(false),
    }
}

/// Collect up to `want` node addresses in key order. A walk cut short by
/// corrupted links keeps the nodes found so far.
fn in_order<I: Inspector + ?Sized>(
    cx: &mut DecodeCx<'_, I>,
    s: &Subject,
    t: TreeLayout,
    want: u64,
) -> DecodeResult<Vec<u64>, I> {
    let hops = cx.hops();
    let mut links = Links { cx, hops, t };
    let mut out = Vec::new();

    let res = match t.shape {
        TreeShape::Anchor => walk_anchor(&mut links, s.addr, want, &mut out),
        TreeShape::EndNode => walk_end_node(&mut links, s.addr, want, &mut out),
        TreeShape::NilHead => walk_nil_head(&mut links, s.addr, want, &mut out),
    };

    match res {
        Ok(()) => {}
        Err(e) if e.is_fatal() => return Err(e),
        Err(DecodeError::Sanity(v)) => warn!("{}: tree walk stopped: {}", s.path, v),
        Err(_) => debug!("{}: tree walk stopped at an unreadable node", s.path),
    }
    Ok(out)
}

pub(super) fn decode<I: Inspector + ?Sized>(
    cx: &mut DecodeCx<'_, I>,
    s: &Subject,
) -> DecodeResult<DecodedNode, I> {
    let t = s.abi.tree();
    let size = cx.read_pointer(s.field(t.size)?)?;
    let size = cx.check_count("size", size as i64, cx.limits.max_sane_tree_count)?;

    let mut node = s.node();
    node.item_count = Some(ItemCount::Exact(size));
    node.expandable = size > 0;
    if !node.expandable || !cx.is_expanded(&s.path) {
        return Ok(node);
    }

    let elem = cx.element_of(s)?;
    let compact_map = elem.is_pair() && cx.format(&s.path) == DisplayFormat::CompactMap;

    let want = size.min(cx.limits.children(MAX_CHILDREN));
    let addrs = in_order(cx, s, t, want)?;

    let mut nodes = Vec::with_capacity(addrs.len());
    for (i, n) in addrs.into_iter().enumerate() {
        let child = cx.emit_in_node(s, index_label(i as u64), &elem, n, t.value)?;
        nodes.push(if compact_map { compact(child) } else { child });
    }

    node.children = Some(Children {
        truncated: (nodes.len() as u64) < size,
        nodes,
    });
    Ok(node)
}

pub(super) fn iterator<I: Inspector + ?Sized>(
    cx: &mut DecodeCx<'_, I>,
    s: &Subject,
) -> DecodeResult<DecodedNode, I> {
    let t = s.abi.tree();
    // Dinkumware iterators are {proxy, next iterator, node}
    let node_off = if s.abi.variant.is_dinkumware_like() {
        2 * cx.ptr
    } else {
        0
    };
    let target = cx.read_pointer(s.field(node_off)?)?;

    let mut node = s.node();
    if target == 0 {
        node.value = Value::Special(Special::Null);
        return Ok(node);
    }
    node.expandable = true;
    if !cx.is_expanded(&s.path) {
        return Ok(node);
    }

    let elem = cx.element_of(s)?;
    let value = value_at(target, t.value, elem.align)?;

    let mut nodes = Vec::with_capacity(3);
    match &elem.kind {
        Element::Pair(p) => {
            nodes.push(cx.emit_value(s, "first".into(), &p.key, value)?);
            nodes.push(cx.emit_value(s, "second".into(), &p.mapped, at(value, p.second)?)?);
        }
        Element::Value(ty) => nodes.push(cx.emit_value(s, "value".into(), ty, value)?),
    }
    nodes.push(links_node(cx, s, &t, target)?);

    node.children = Some(Children {
        nodes,
        truncated: false,
    });
    Ok(node)
}

/// The `[node]` child: raw `left` / `right` / `parent` links.
fn links_node<I: Inspector + ?Sized>(
    cx: &mut DecodeCx<'_, I>,
    s: &Subject,
    t: &TreeLayout,
    target: u64,
) -> DecodeResult<DecodedNode, I> {
    let path = s.child_path("[node]");
    let mut node = DecodedNode::leaf("[node]", Value::Pointer(target));
    node.expandable = true;
    if !cx.is_expanded(&path) {
        return Ok(node);
    }

    let mut nodes = Vec::with_capacity(3);
    for &(label, off) in &[("left", t.left), ("right", t.right), ("parent", t.parent)] {
        let res = match at(target, off) {
            Ok(link) => cx.read_pointer(link),
            Err(v) => Err(v.into()),
        };
        let value = match res {
            Ok(p) => Value::Pointer(p),
            Err(e) if e.is_fatal() => return Err(e),
            Err(_) => Value::Special(Special::NotAccessible),
        };
        nodes.push(DecodedNode::leaf(label, value));
    }
    node.children = Some(Children {
        nodes,
        truncated: false,
    });
    Ok(node)
}

#[cfg(test)]
mod tests {
    use alloc::vec::Vec;

    use crate::abi::Platform;
    use crate::snapshot::Snapshot;
    use crate::{LayoutDecoder, Value, ValueRef};

    fn words(ws: &[u64]) -> Vec<u8> {
        ws.iter().flat_map(|w| w.to_le_bytes()).collect()
    }

    /// EASTL set<long> {1, 2, 3} rooted at 2, with the anchor at 0x1000.
    fn eastl_set(snap: &mut Snapshot) {
        let anchor = 0x1000;
        let (n1, n2, n3) = (0x2000, 0x2100, 0x2200);
        // anchor: right = rightmost, left = leftmost, parent = root, color; then size
        snap.add_region(anchor, words(&[n3, n1, n2, 0, 3])).unwrap();
        // node: right, left, parent, color, value
        snap.add_region(n1, words(&[0, 0, n2, 0, 1])).unwrap();
        snap.add_region(n2, words(&[n3, n1, anchor, 1, 2])).unwrap();
        snap.add_region(n3, words(&[0, 0, n2, 0, 3])).unwrap();
    }

    #[test]
    fn eastl_set_in_order() {
        let mut snap = Snapshot::new(Platform::Standard, 8).expand_all();
        eastl_set(&mut snap);

        let node = LayoutDecoder::new()
            .decode(&mut snap, ValueRef::new("s", "eastl::set<long>", 0x1000))
            .unwrap();
        assert_eq!(node.summary(), "<3 items>");
        let values: Vec<_> = node.children().iter().map(|c| c.value.clone()).collect();
        assert_eq!(values, [Value::Int(1), Value::Int(2), Value::Int(3)]);
    }

    #[test]
    fn corrupted_links_stop_the_walk() {
        let mut snap = Snapshot::new(Platform::Standard, 8).expand_all();
        eastl_set(&mut snap);
        // node 1 becomes its own right child, and the header claims 100 nodes
        snap.write_bytes(0x2000, &0x2000u64.to_le_bytes()).unwrap();
        snap.write_bytes(0x1000 + 32, &100u64.to_le_bytes()).unwrap();

        let dec = LayoutDecoder::builder().hop_budget(50).build().unwrap();
        let node = dec
            .decode(&mut snap, ValueRef::new("s", "eastl::set<long>", 0x1000))
            .unwrap();
        let children = node.children.unwrap();
        assert!(children.truncated);
        assert!(!children.nodes.is_empty());
        assert!(children.nodes.len() < 100);
    }

    #[test]
    fn wild_leftmost_degrades_the_element() {
        let mut snap = Snapshot::new(Platform::Standard, 8).expand_all();
        snap.add_region(0x1000, words(&[0, 0xffff_ffff_ffff_fff0, 0, 0, 1])).unwrap();

        let node = LayoutDecoder::new()
            .decode(&mut snap, ValueRef::new("s", "eastl::set<long>", 0x1000))
            .unwrap();
        assert_eq!(node.summary(), "<1 item>");
        assert!(matches!(node.children()[0].value, Value::Degraded(_)));
    }

    #[test]
    fn libcxx_map_pairs() {
        let mut snap = Snapshot::new(Platform::Standard, 8).expand_all();
        let tree = 0x1000;
        let end = tree + 8;
        let (a, b) = (0x2000, 0x2100);
        // {begin_node, end_node.left (root), size}
        snap.add_region(tree, words(&[a, b, 2])).unwrap();
        // node: left, right, parent, is_black, key, mapped
        snap.add_region(b, words(&[a, 0, end, 1, 20, 200])).unwrap();
        snap.add_region(a, words(&[0, 0, b, 0, 10, 100])).unwrap();

        let node = LayoutDecoder::new()
            .decode(&mut snap, ValueRef::new("m", "eastl::__1::map<long, long>", tree))
            .unwrap();
        let kids = node.children();
        assert_eq!(kids.len(), 2);
        assert_eq!(kids[0].key, Some(Value::Int(10)));
        assert_eq!(kids[0].value, Value::Int(100));
        assert_eq!(kids[1].child("second").unwrap().value, Value::Int(200));
    }

    #[test]
    fn dinkumware_map_compact() {
        let mut snap = Snapshot::new(Platform::AlternateRuntimeA, 8).expand_all();
        snap.set_format("m", crate::DisplayFormat::CompactMap);
        let head = 0x3000;
        let (a, b) = (0x2000, 0x2100);
        // {proxy, head, size}
        snap.add_region(0x1000, words(&[0, head, 2])).unwrap();
        // node: left, parent, right, color + isnil bytes, then pair at 3p+2 -> 32
        snap.add_region(head, words(&[a, a, b, 0x0100, 0, 0])).unwrap();
        snap.add_region(a, words(&[head, head, b, 0, 1, 11])).unwrap();
        snap.add_region(b, words(&[head, a, head, 0, 2, 22])).unwrap();

        let node = LayoutDecoder::new()
            .decode(&mut snap, ValueRef::new("m", "eastl::map<long, long>", 0x1000))
            .unwrap();
        let kids = node.children();
        assert_eq!(kids.len(), 2);
        assert_eq!(kids[0].label, "1");
        assert_eq!(kids[1].label, "2");
        assert_eq!(kids[1].value, Value::Int(22));
    }

    #[test]
    fn map_iterator() {
        let mut snap = Snapshot::new(Platform::Standard, 8).expand_all();
        let n = 0x2000;
        snap.add_region(n, words(&[0x10, 0x20, 0x30, 0, 7, 70])).unwrap();
        snap.add_region(0x1000, words(&[n])).unwrap();
        snap.add_region(0x1100, words(&[0])).unwrap();

        let dec = LayoutDecoder::new();
        let it = dec
            .decode(
                &mut snap,
                ValueRef::new("it", "eastl::map<long, long>::iterator", 0x1000),
            )
            .unwrap();
        assert_eq!(it.child("first").unwrap().value, Value::Int(7));
        assert_eq!(it.child("second").unwrap().value, Value::Int(70));
        let links = it.child("[node]").unwrap();
        assert_eq!(links.child("parent").unwrap().value, Value::Pointer(0x30));

        let end = dec
            .decode(
                &mut snap,
                ValueRef::new("it", "eastl::set<long>::const_iterator", 0x1100),
            )
            .unwrap();
        assert_eq!(end.summary(), "(null)");
    }
}
