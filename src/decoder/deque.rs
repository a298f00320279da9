use alloc::vec::Vec;

use crate::abi::{DequeIterLayout, DequeLayout};
use crate::inspector::Inspector;
use crate::node::{Children, DecodedNode, ItemCount};

use super::{at, index_addr, index_label, DecodeCx, DecodeResult, ElementDesc, Subject};

const MAX_CHILDREN: u64 = 2000;

/// EASTL's `DEQUE_DEFAULT_SUBARRAY_SIZE`.
fn default_subarray_size(elem_size: u64) -> u64 {
    match elem_size {
        0..=4 => 64,
        5..=8 => 32,
        9..=16 => 16,
        17..=32 => 8,
        _ => 4,
    }
}

struct Iter {
    current: u64,
    begin: u64,
    array_ptr: u64,
}

fn read_iter<I: Inspector + ?Sized>(
    cx: &mut DecodeCx<'_, I>,
    addr: u64,
    l: DequeIterLayout,
) -> DecodeResult<Iter, I> {
    Ok(Iter {
        current: cx.read_pointer(at(addr, l.current)?)?,
        begin: cx.read_pointer(at(addr, l.begin)?)?,
        array_ptr: cx.read_pointer(at(addr, l.array_ptr)?)?,
    })
}

/// Where element `i` lives: the block map entry to read and the offset of the
/// element inside that block.
struct Blocks {
    map: u64,
    block: u64,
    first: u64,
}

pub(super) fn decode<I: Inspector + ?Sized>(
    cx: &mut DecodeCx<'_, I>,
    s: &Subject,
) -> DecodeResult<DecodedNode, I> {
    let elem = cx.element_of(s)?;
    let stride = elem.stride()?;

    let (size, blocks) = match s.abi.deque() {
        DequeLayout::Iterators { begin, end, iter } => {
            let block = match s.ty.arg_value(2) {
                Some(n) if n > 0 => n as u64,
                _ => default_subarray_size(stride),
            };
            let b = read_iter(cx, s.field(begin)?, iter)?;
            let e = read_iter(cx, s.field(end)?, iter)?;

            let arrays = (e.array_ptr.wrapping_sub(b.array_ptr) as i64) / cx.ptr as i64;
            let tail = (e.current.wrapping_sub(e.begin) as i64) / stride as i64;
            let head = (b.current.wrapping_sub(b.begin) as i64) / stride as i64;
            let size = arrays
                .wrapping_mul(block as i64)
                .wrapping_add(tail)
                .wrapping_sub(head);
            let size = cx.check_count("size", size, cx.limits.max_sane_count)?;
            let head = cx.check_count("first element index", head, block - 1)?;
            if size > 0 {
                cx.check_pointer("block map", b.array_ptr)?;
            }

            let blocks = Blocks {
                map: b.array_ptr,
                block,
                first: head,
            };
            (size, blocks)
        }
        DequeLayout::BlockMap {
            map_begin,
            start,
            size,
        } => {
            let map = cx.read_pointer(s.field(map_begin)?)?;
            let start = cx.read_pointer(s.field(start)?)?;
            let size = cx.read_pointer(s.field(size)?)?;
            let size = cx.check_count("size", size as i64, cx.limits.max_sane_count)?;

            let block = if stride < 256 { 4096 / stride } else { 16 };
            let blocks = Blocks {
                map,
                block,
                first: start,
            };
            (size, blocks)
        }
    };

    let mut node = s.node();
    node.item_count = Some(ItemCount::Exact(size));
    node.expandable = size > 0;
    if !node.expandable || !cx.is_expanded(&s.path) {
        return Ok(node);
    }

    let shown = size.min(cx.limits.children(MAX_CHILDREN));
    let mut nodes = Vec::with_capacity(shown as usize);
    for i in 0..shown {
        nodes.push(element(cx, s, &elem, &blocks, i)?);
    }
    node.children = Some(Children {
        nodes,
        truncated: shown < size,
    });
    Ok(node)
}

fn element<I: Inspector + ?Sized>(
    cx: &mut DecodeCx<'_, I>,
    s: &Subject,
    elem: &ElementDesc,
    blocks: &Blocks,
    i: u64,
) -> DecodeResult<DecodedNode, I> {
    let label = index_label(i);
    match locate(cx, blocks, elem.size, i) {
        Ok(addr) => cx.emit(s, label, elem, addr),
        Err(e) => {
            let path = s.child_path(&label);
            cx.settle(label, &path, Err(e))
        }
    }
}

fn locate<I: Inspector + ?Sized>(
    cx: &mut DecodeCx<'_, I>,
    blocks: &Blocks,
    elem_size: u64,
    i: u64,
) -> DecodeResult<u64, I> {
    let idx = at(blocks.first, i)?;
    let entry = index_addr(blocks.map, idx / blocks.block, cx.ptr)?;
    let base = cx.read_pointer(entry)?;
    Ok(index_addr(base, idx % blocks.block, elem_size)?)
}

#[cfg(test)]
mod tests {
    use alloc::vec::Vec;

    use crate::abi::Platform;
    use crate::snapshot::Snapshot;
    use crate::{LayoutDecoder, Special, Value, ValueRef};

    fn words(ws: &[u64]) -> Vec<u8> {
        ws.iter().flat_map(|w| w.to_le_bytes()).collect()
    }

    #[test]
    fn eastl_deque_spans_blocks() {
        // deque<long, allocator, 2>: two blocks of two elements, holding 10, 11, 12
        let mut snap = Snapshot::new(Platform::Standard, 8).expand_all();
        let map = 0x5000;
        let (b0, b1) = (0x6000, 0x7000);
        snap.add_region(map, words(&[b0, b1])).unwrap();
        snap.add_region(b0, words(&[0, 10])).unwrap();
        snap.add_region(b1, words(&[11, 12])).unwrap();

        let header = words(&[
            map, 2, // map pointer, map size
            b0 + 8, b0, b0 + 16, map, // begin iterator
            b1 + 16, b1, b1 + 16, map + 8, // end iterator
        ]);
        snap.add_region(0x1000, header).unwrap();

        let node = LayoutDecoder::new()
            .decode(
                &mut snap,
                ValueRef::new("d", "eastl::deque<long, eastl::allocator, 2>", 0x1000),
            )
            .unwrap();
        assert_eq!(node.summary(), "<3 items>");
        let values: Vec<_> = node.children().iter().map(|c| c.value.clone()).collect();
        assert_eq!(values, [Value::Int(10), Value::Int(11), Value::Int(12)]);
    }

    #[test]
    fn libcxx_deque_unreadable_block_degrades() {
        // block size for an 8-byte element is 512; start at 510 spans two blocks
        let mut snap = Snapshot::new(Platform::Standard, 8).expand_all();
        let map = 0x5000;
        snap.add_region(map, words(&[0x6000, 0xdead_0000])).unwrap();
        snap.add_region(0x6000, alloc::vec![1; 512 * 8]).unwrap();
        snap.add_region(0x1000, words(&[map, map, map + 16, map + 16, 510, 3]))
            .unwrap();

        let node = LayoutDecoder::new()
            .decode(&mut snap, ValueRef::new("d", "eastl::__1::deque<long>", 0x1000))
            .unwrap();
        let children = node.children();
        assert_eq!(children.len(), 3);
        assert_eq!(children[0].value, Value::Int(0x0101_0101_0101_0101));
        assert_eq!(children[2].value, Value::Special(Special::NotAccessible));
    }

    #[test]
    fn libcxx_deque_wild_start_degrades_elements() {
        let mut snap = Snapshot::new(Platform::Standard, 8).expand_all();
        let map = 0x5000;
        snap.add_region(map, words(&[0x6000])).unwrap();
        snap.add_region(0x1000, words(&[map, map, map + 8, map + 8, u64::MAX - 1, 3]))
            .unwrap();

        let node = LayoutDecoder::new()
            .decode(&mut snap, ValueRef::new("d", "eastl::__1::deque<long>", 0x1000))
            .unwrap();
        assert_eq!(node.summary(), "<3 items>");
        let children = node.children();
        assert_eq!(children.len(), 3);
        // the first two map entries lie far outside the capture
        assert_eq!(children[0].value, Value::Special(Special::NotAccessible));
        // the third index wraps past the end of the address space
        assert!(matches!(children[2].value, Value::Degraded(_)));
    }
}
