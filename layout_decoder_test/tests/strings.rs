use layout_decoder::abi::Platform;
use layout_decoder::inspector::InspectError;
use layout_decoder::{DecodeError, DisplayFormat, LayoutDecoder, SanityViolation, Value, ValueRef};
use layout_decoder_test::FakeProcess;

fn init() {
    let _ = pretty_env_logger::try_init();
}

#[test]
fn refcount_boundaries() -> anyhow::Result<()> {
    init();
    let mut proc = FakeProcess::new(Platform::Standard, 8);
    let dec = LayoutDecoder::new();

    let shared_empty = proc.string_with_refcount("", 0xffff_ffff)?;
    let node = dec.decode(&mut proc, ValueRef::new("s", "eastl::string", shared_empty))?;
    assert_eq!(node.value, Value::Text("".into()));

    // only the low 32 bits hold the refcount
    let upper_garbage = proc.string_with_refcount("ok", 0xabcd_0000_0000_0002)?;
    let node = dec.decode(&mut proc, ValueRef::new("s", "eastl::string", upper_garbage))?;
    assert_eq!(node.value, Value::Text("ok".into()));

    let corrupt = proc.string_with_refcount("x", 0xffff_fffe)?;
    let err = dec
        .decode(&mut proc, ValueRef::new("s", "eastl::string", corrupt))
        .unwrap_err();
    assert!(matches!(
        err,
        DecodeError::Sanity(SanityViolation::Refcount(-2))
    ));
    Ok(())
}

#[test]
fn length_beyond_capacity_is_rejected() -> anyhow::Result<()> {
    init();
    let mut proc = FakeProcess::new(Platform::Standard, 8);
    let data = proc.rep(b"abc", 3, 1)?;
    // capacity 2 < length 3
    proc.write_word(data - 16, 2)?;
    let s = proc.alloc_words(&[data])?;

    let err = LayoutDecoder::new()
        .decode(&mut proc, ValueRef::new("s", "eastl::string", s))
        .unwrap_err();
    assert!(matches!(
        err,
        DecodeError::Sanity(SanityViolation::SizeExceedsCapacity { .. })
    ));
    Ok(())
}

#[test]
fn libcxx_short_long_discriminant() -> anyhow::Result<()> {
    init();
    let mut proc = FakeProcess::new(Platform::Standard, 8);
    let dec = LayoutDecoder::new();
    let long_text = "a string too long for the inline buffer";

    let short = proc.libcxx_string("tiny")?;
    let long = proc.libcxx_string(long_text)?;

    let node = dec.decode(&mut proc, ValueRef::new("s", "eastl::__1::string", short))?;
    assert_eq!(node.value, Value::Text("tiny".into()));
    assert_eq!(node.type_name.as_deref(), Some("eastl::string"));

    let node = dec.decode(&mut proc, ValueRef::new("s", "eastl::__1::string", long))?;
    assert_eq!(node.value, Value::Text(long_text.into()));
    Ok(())
}

#[test]
fn separate_format_keeps_the_full_text() -> anyhow::Result<()> {
    init();
    let mut proc = FakeProcess::new(Platform::Standard, 8).expanded();
    let text: String = core::iter::repeat("0123456789").take(15).collect();
    let s = proc.string(&text)?;
    proc.set_format("s", DisplayFormat::SeparateUtf8String);

    let node = LayoutDecoder::new().decode(&mut proc, ValueRef::new("s", "eastl::string", s))?;
    let summary = node.value.to_string();
    assert!(summary.ends_with("..."));
    assert_eq!(summary.len(), 103);
    assert_eq!(node.child("text").map(|t| t.value.to_string()), Some(text));
    Ok(())
}

#[test]
fn edit_then_decode() -> anyhow::Result<()> {
    init();
    let mut proc = FakeProcess::new(Platform::Standard, 8);
    let dec = LayoutDecoder::new();
    let s = proc.string("before")?;
    let value = ValueRef::new("s", "eastl::string", s);

    dec.edit(&mut proc, value, "hello")?;
    assert_eq!(dec.decode(&mut proc, value)?.value, Value::Text("hello".into()));

    dec.edit(&mut proc, value, "say \"hi\"")?;
    assert_eq!(
        dec.decode(&mut proc, value)?.value,
        Value::Text("say \"hi\"".into())
    );
    Ok(())
}

#[test]
fn edit_wide_string() -> anyhow::Result<()> {
    init();
    let mut proc = FakeProcess::new(Platform::Standard, 8);
    let dec = LayoutDecoder::new();
    let s = proc.wstring("old")?;
    let value = ValueRef::new("w", "eastl::wstring", s);

    assert_eq!(dec.decode(&mut proc, value)?.value, Value::Text("old".into()));
    dec.edit(&mut proc, value, "gr\u{fc}n")?;
    assert_eq!(
        dec.decode(&mut proc, value)?.value,
        Value::Text("gr\u{fc}n".into())
    );
    Ok(())
}

#[test]
fn failed_assign_is_reported() -> anyhow::Result<()> {
    init();
    let mut proc = FakeProcess::new(Platform::AlternateRuntimeB, 8);
    let err = LayoutDecoder::new()
        .edit(&mut proc, ValueRef::new("s", "eastl::string", 0x1000), "x")
        .unwrap_err();
    assert!(matches!(err, DecodeError::Inspect(InspectError::Fatal(_))));
    Ok(())
}
