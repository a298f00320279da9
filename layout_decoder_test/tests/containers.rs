use layout_decoder::abi::Platform;
use layout_decoder::{
    DecodeError, DecodedNode, DisplayFormat, ItemCount, LayoutDecoder, Special, Value, ValueRef,
};
use layout_decoder_test::FakeProcess;

fn init() {
    let _ = pretty_env_logger::try_init();
}

fn values(node: &DecodedNode) -> Vec<Value> {
    node.children().iter().map(|c| c.value.clone()).collect()
}

#[test]
fn vector_children_in_order() -> anyhow::Result<()> {
    init();
    for &ptr in &[4, 8] {
        let mut proc = FakeProcess::new(Platform::Standard, ptr).expanded();
        let xs: Vec<i32> = (0..37).map(|i| i * i - 100).collect();
        let v = proc.vector_of_ints(&xs)?;

        let node = LayoutDecoder::new().decode(&mut proc, ValueRef::new("v", "eastl::vector<int>", v))?;
        assert_eq!(node.item_count, Some(ItemCount::Exact(37)));
        let expected: Vec<Value> = xs.iter().map(|&x| Value::Int(x as i64)).collect();
        assert_eq!(values(&node), expected);
    }
    Ok(())
}

#[test]
fn empty_vector() -> anyhow::Result<()> {
    init();
    let mut proc = FakeProcess::new(Platform::Standard, 8).expanded();
    let v = proc.vector_of_ints(&[])?;

    let node = LayoutDecoder::new().decode(&mut proc, ValueRef::new("v", "eastl::vector<int>", v))?;
    assert_eq!(node.summary(), "<0 items>");
    assert!(!node.expandable);
    Ok(())
}

#[test]
fn vector_of_strings_nests() -> anyhow::Result<()> {
    init();
    let mut proc = FakeProcess::new(Platform::Standard, 8).expanded();
    let v = proc.vector_of_strings(&["alpha", "", "gamma"])?;

    let node = LayoutDecoder::new().decode(
        &mut proc,
        ValueRef::new("v", "eastl::vector<eastl::string, eastl::allocator>", v),
    )?;
    assert_eq!(
        values(&node),
        [
            Value::Text("alpha".into()),
            Value::Text("".into()),
            Value::Text("gamma".into())
        ]
    );
    Ok(())
}

#[test]
fn corrupted_element_degrades_only_itself() -> anyhow::Result<()> {
    init();
    let mut proc = FakeProcess::new(Platform::Standard, 8).expanded();
    let good = proc.string_rep("fine")?;
    let bad = proc.rep(b"x", 1, 0xffff_fffe)?;
    let data = proc.words(&[good, bad, 0xdead_0000]);
    let v = proc.vector(data)?;

    let node = LayoutDecoder::new().decode(
        &mut proc,
        ValueRef::new("v", "eastl::vector<eastl::string>", v),
    )?;
    let kids = node.children();
    assert_eq!(kids.len(), 3);
    assert_eq!(kids[0].value, Value::Text("fine".into()));
    assert!(matches!(kids[1].value, Value::Degraded(_)));
    assert_eq!(kids[2].value, Value::Special(Special::NotAccessible));
    Ok(())
}

#[test]
fn only_expanded_paths_get_children() -> anyhow::Result<()> {
    init();
    let mut proc = FakeProcess::new(Platform::Standard, 8);
    let v = proc.vector_of_strings(&["a", "b"])?;
    let ty = "eastl::vector<eastl::string>";
    let dec = LayoutDecoder::new();

    let node = dec.decode(&mut proc, ValueRef::new("v", ty, v))?;
    assert!(node.expandable);
    assert!(node.children.is_none());

    proc.expand("v");
    let node = dec.decode(&mut proc, ValueRef::new("v", ty, v))?;
    assert_eq!(node.children().len(), 2);
    assert_eq!(node.children()[1].label, "[1]");
    Ok(())
}

#[test]
fn plot_format_yields_an_array_descriptor() -> anyhow::Result<()> {
    init();
    let mut proc = FakeProcess::new(Platform::Standard, 8).expanded();
    proc.set_format("v", DisplayFormat::ArrayPlot);
    let v = proc.vector_of_ints(&[1, 2, 3])?;

    let node = LayoutDecoder::new().decode(&mut proc, ValueRef::new("v", "eastl::vector<int>", v))?;
    assert!(node.children.is_none());
    assert!(matches!(node.value, Value::Array { count: 3, .. }));
    Ok(())
}

#[test]
fn list_in_order() -> anyhow::Result<()> {
    init();
    let mut proc = FakeProcess::new(Platform::Standard, 8).expanded();
    let head = proc.list_of_longs(&[4, -1, 9])?;

    let node = LayoutDecoder::new().decode(&mut proc, ValueRef::new("l", "eastl::list<long>", head))?;
    assert_eq!(node.item_count, Some(ItemCount::Exact(3)));
    assert_eq!(values(&node), [Value::Int(4), Value::Int(-1), Value::Int(9)]);
    Ok(())
}

#[test]
fn cyclic_list_terminates() -> anyhow::Result<()> {
    init();
    let mut proc = FakeProcess::new(Platform::Standard, 8).expanded();
    // two nodes pointing at each other, never reaching the sentinel
    let a = proc.alloc_words(&[0, 0, 1])?;
    let b = proc.alloc_words(&[a, a, 2])?;
    proc.write_word(a, b)?;
    let head = proc.alloc_words(&[a, b])?;

    let dec = LayoutDecoder::builder().list_count_cap(25).build()?;
    let node = dec.decode(&mut proc, ValueRef::new("l", "eastl::list<long>", head))?;
    assert_eq!(node.item_count, Some(ItemCount::AtLeast(25)));
    assert_eq!(node.summary(), "<more than 25 items>");
    let children = node.children.expect("expanded");
    assert!(children.truncated);
    assert_eq!(children.nodes.len(), 25);
    Ok(())
}

#[test]
fn set_keys_strictly_increase() -> anyhow::Result<()> {
    init();
    let mut proc = FakeProcess::new(Platform::Standard, 8).expanded();
    // a deterministic shuffle of 0..200
    let keys: Vec<i64> = (0..200).map(|i| (i * 73) % 200 - 50).collect();
    let set = proc.set_of_longs(&keys)?;

    let node = LayoutDecoder::new().decode(&mut proc, ValueRef::new("s", "eastl::set<long>", set))?;
    assert_eq!(node.item_count, Some(ItemCount::Exact(200)));
    let got: Vec<i64> = node
        .children()
        .iter()
        .map(|c| match c.value {
            Value::Int(v) => v,
            ref other => panic!("unexpected {:?}", other),
        })
        .collect();
    assert_eq!(got.len(), 200);
    assert!(got.windows(2).all(|w| w[0] < w[1]));
    assert_eq!(got[0], -50);
    Ok(())
}

#[test]
fn hash_set_round_trip() -> anyhow::Result<()> {
    init();
    let mut proc = FakeProcess::new(Platform::Standard, 8).expanded();
    let h = proc.hash_set_of_strings(&["a", "b", "c"], 2)?;

    let node = LayoutDecoder::new().decode(
        &mut proc,
        ValueRef::new("h", "eastl::hash_set<eastl::string>", h),
    )?;
    assert_eq!(node.summary(), "<3 items>");
    let mut got: Vec<String> = node.children().iter().map(|c| c.value.to_string()).collect();
    got.sort();
    assert_eq!(got, ["a", "b", "c"]);
    Ok(())
}

#[test]
fn nesting_depth_is_bounded() -> anyhow::Result<()> {
    init();
    let mut proc = FakeProcess::new(Platform::Standard, 8).expanded();
    let p = proc.ptr();
    proc.define_type("eastl::vector<int>", 3 * p, p);

    // vector<vector<int>> holding one inner vector {5}
    let inner = proc.vector_of_ints(&[5])?;
    let header = {
        let mut buf = [0u8; 24];
        // copy the inner vector's three header words
        for (i, chunk) in buf.chunks_mut(8).enumerate() {
            let word = read_word(&mut proc, inner + i as u64 * p)?;
            chunk.copy_from_slice(&word.to_le_bytes());
        }
        buf.to_vec()
    };
    let outer = proc.vector(header)?;
    let ty = "eastl::vector<eastl::vector<int>>";

    let node = LayoutDecoder::new().decode(&mut proc, ValueRef::new("v", ty, outer))?;
    assert_eq!(node.children()[0].children()[0].value, Value::Int(5));

    let dec = LayoutDecoder::builder().max_depth(1).build()?;
    let node = dec.decode(&mut proc, ValueRef::new("v", ty, outer))?;
    let leaf = &node.children()[0].children()[0];
    assert!(matches!(leaf.value, Value::Degraded(_)));
    Ok(())
}

fn read_word(proc: &mut FakeProcess, addr: u64) -> anyhow::Result<u64> {
    use layout_decoder::inspector::InspectorExt;
    Ok(proc.read_u64(addr)?)
}

#[test]
fn unknown_types_are_left_to_the_host() {
    init();
    let mut proc = FakeProcess::new(Platform::Standard, 8);
    let dec = LayoutDecoder::new();
    assert!(!dec.has_decoder("Widget"));
    let err = dec
        .decode(&mut proc, ValueRef::new("w", "Widget", 0x1000))
        .unwrap_err();
    assert!(matches!(err, DecodeError::UnrecognizedLayout(_)));
}
