use layout_decoder::abi::Platform;
use layout_decoder::inspector::InspectError;
use layout_decoder::{DecodeError, LayoutDecoder, SanityViolation, ValueRef};
use layout_decoder_test::FakeProcess;

fn init() {
    let _ = pretty_env_logger::try_init();
}

#[test]
fn fatal_errors_abort_the_whole_decode() -> anyhow::Result<()> {
    init();
    let mut proc = FakeProcess::new(Platform::Standard, 8).expanded();
    let text = proc.string_rep("z")?;
    let v = proc.vector_of_strings(&["a", "b"])?;
    let ty = "eastl::vector<eastl::string>";
    let node = LayoutDecoder::new().decode(&mut proc, ValueRef::new("v", ty, v))?;
    assert_eq!(node.children().len(), 2);

    // the connection drops while reading the characters
    let obj = proc.alloc_words(&[text])?;
    proc.lose_connection_at(text);

    let err = LayoutDecoder::new()
        .decode(&mut proc, ValueRef::new("s", "eastl::string", obj))
        .unwrap_err();
    assert!(err.is_fatal());
    assert!(matches!(err, DecodeError::Inspect(InspectError::Fatal(_))));

    // nested inside a container it is still fatal, not a degraded child
    let data = proc.words(&[text]);
    let v = proc.vector(data)?;
    let err = LayoutDecoder::new()
        .decode(&mut proc, ValueRef::new("v", ty, v))
        .unwrap_err();
    assert!(err.is_fatal());
    Ok(())
}

#[test]
fn insane_counts_are_rejected() -> anyhow::Result<()> {
    init();
    let mut proc = FakeProcess::new(Platform::Standard, 8);
    // an EASTL set header claiming 10^9 nodes
    let set = proc.alloc_words(&[0, 0, 0, 0, 1_000_000_000])?;

    let err = LayoutDecoder::new()
        .decode(&mut proc, ValueRef::new("s", "eastl::set<long>", set))
        .unwrap_err();
    assert!(matches!(
        err,
        DecodeError::Sanity(SanityViolation::CountOutOfRange { .. })
    ));
    Ok(())
}

#[test]
fn vector_pointers_must_be_valid() -> anyhow::Result<()> {
    init();
    let mut proc = FakeProcess::new(Platform::Standard, 8);
    let v = proc.alloc_words(&[0x10, 0x20, 0x20])?;

    let err = LayoutDecoder::new()
        .decode(&mut proc, ValueRef::new("v", "eastl::vector<int>", v))
        .unwrap_err();
    assert!(matches!(
        err,
        DecodeError::Sanity(SanityViolation::BadPointer { .. })
    ));
    Ok(())
}
