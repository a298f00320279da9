//! Narrow and wide strings.

use alloc::string::{String, ToString};
use alloc::vec;

use crate::abi::StringLayout;
use crate::catalogue::{DescriptorFlags, ElementArgs};
use crate::error::{DecodeError, SanityViolation};
use crate::format::{render_chars, DisplayFormat};
use crate::inspector::Inspector;
use crate::node::{Children, DecodedNode, Value};
use crate::scalar::sign_extend;
use crate::typename::TypeName;

use super::{at, DecodeCx, DecodeResult, Subject};

/// Where the characters are, and how many of them.
struct Chars {
    data: u64,
    len: u64,
}

fn char_type(s: &Subject) -> Option<TypeName> {
    if s.desc.flags.contains(DescriptorFlags::WIDE) {
        return TypeName::parse("wchar_t");
    }
    match s.desc.element {
        ElementArgs::First => s.ty.arg_type(0).cloned(),
        _ => TypeName::parse("char"),
    }
}

pub(super) fn decode<I: Inspector + ?Sized>(
    cx: &mut DecodeCx<'_, I>,
    s: &Subject,
) -> DecodeResult<DecodedNode, I> {
    let unrecognized = || DecodeError::UnrecognizedLayout(s.ty.as_str().to_string());
    let char_ty = char_type(s).ok_or_else(unrecognized)?;
    let char_size = cx.type_desc(&char_ty)?.size;
    if !(1..=4).contains(&char_size) {
        return Err(unrecognized());
    }

    let mut node = s.node();
    let chars = match s.abi.string() {
        StringLayout::RefCounted { data } => ref_counted(cx, s.field(data)?)?,
        StringLayout::ShortLong {
            long_size,
            long_data,
        } => {
            // `__1::` strings are shown under the plain names
            node.type_name = Some(if s.desc.flags.contains(DescriptorFlags::WIDE) {
                "eastl::wstring".to_string()
            } else {
                "eastl::string".to_string()
            });
            short_long(cx, s.addr, char_size, long_size, long_data)?
        }
        StringLayout::SmallBuffer {
            buffer,
            size,
            capacity,
            inline_bytes,
            refcount_before_data,
        } => {
            let len = cx.read_pointer(s.field(size)?)?;
            let cap = cx.read_pointer(s.field(capacity)?)?;
            check_lengths(cx, len, cap)?;

            if inline_bytes / char_size <= cap {
                let data = cx.read_pointer(s.field(buffer)?)?;
                if refcount_before_data {
                    let refcount = sign_extend(cx.read_scalar(data.wrapping_sub(1), 1)?, 1);
                    if refcount < -1 {
                        return Err(SanityViolation::Refcount(refcount).into());
                    }
                }
                Chars { data, len }
            } else {
                Chars {
                    data: s.field(buffer)?,
                    len,
                }
            }
        }
    };

    let format = cx.format(&s.path);
    let limit = cx.limits.display_string_limit;
    node.value = Value::Text(read_text(cx, &chars, char_size, limit, format)?);

    if format.is_separate() {
        node.expandable = true;
        if cx.is_expanded(&s.path) {
            let limit = cx.limits.separate_string_limit;
            let text = read_text(cx, &chars, char_size, limit, format)?;
            node.children = Some(Children {
                nodes: vec![DecodedNode::leaf("text", Value::Text(text))],
                truncated: false,
            });
        }
    }
    Ok(node)
}

fn check_lengths<I: Inspector + ?Sized>(
    cx: &DecodeCx<'_, I>,
    len: u64,
    cap: u64,
) -> Result<(), SanityViolation> {
    let cap = cx.check_count("capacity", cap as i64, cx.limits.max_sane_string)?;
    if len > cap {
        return Err(SanityViolation::SizeExceedsCapacity {
            size: len,
            capacity: cap,
        });
    }
    Ok(())
}

/// `{length, capacity, refcount}` words sit right before the characters.
fn ref_counted<I: Inspector + ?Sized>(
    cx: &mut DecodeCx<'_, I>,
    addr: u64,
) -> DecodeResult<Chars, I> {
    let data = cx.read_pointer(addr)?;
    let header = data.wrapping_sub(3 * cx.ptr);
    let len = cx.read_pointer(header)?;
    let cap = cx.read_pointer(at(header, cx.ptr)?)?;
    let refcount = cx.read_pointer(at(header, 2 * cx.ptr)?)?;

    let refcount = sign_extend(refcount & 0xffff_ffff, 4);
    if refcount < -1 {
        return Err(SanityViolation::Refcount(refcount).into());
    }
    check_lengths(cx, len, cap)?;
    Ok(Chars { data, len })
}

/// Bit 0 of the first byte clear: short form, length in the remaining bits
/// and characters inline. Set: `{capacity, size, data}` words.
fn short_long<I: Inspector + ?Sized>(
    cx: &mut DecodeCx<'_, I>,
    addr: u64,
    char_size: u64,
    long_size: u64,
    long_data: u64,
) -> DecodeResult<Chars, I> {
    let first = cx.read_scalar(addr, 1)?;
    if first & 1 == 0 {
        return Ok(Chars {
            data: at(addr, char_size)?,
            len: first >> 1,
        });
    }

    let len = cx.read_pointer(at(addr, long_size)?)?;
    let len = cx.check_count("length", len as i64, cx.limits.max_sane_string)?;
    let data = cx.read_pointer(at(addr, long_data)?)?;
    cx.check_pointer("data", data)?;
    Ok(Chars { data, len })
}

fn read_text<I: Inspector + ?Sized>(
    cx: &mut DecodeCx<'_, I>,
    chars: &Chars,
    char_size: u64,
    limit: u64,
    format: DisplayFormat,
) -> DecodeResult<String, I> {
    let shown = chars.len.min(limit);
    let mut buf = vec![0u8; (shown * char_size) as usize];
    if !buf.is_empty() {
        cx.inspector.read_bytes(chars.data, &mut buf)?;
    }
    Ok(render_chars(
        &buf,
        char_size as usize,
        cx.endian,
        format,
        shown < chars.len,
    ))
}
