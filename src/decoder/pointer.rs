use alloc::string::ToString;

use crate::error::DecodeError;
use crate::inspector::Inspector;
use crate::node::{DecodedNode, Special, Value};

use super::{value_at, DecodeCx, DecodeResult, Subject};

/// `shared_ptr`, `weak_ptr` and `unique_ptr`: the pointee stands in for the
/// pointer, under the smart pointer's type name.
pub(super) fn smart_ptr<I: Inspector + ?Sized>(
    cx: &mut DecodeCx<'_, I>,
    s: &Subject,
) -> DecodeResult<DecodedNode, I> {
    let target = cx.read_pointer(s.addr)?;
    if target == 0 {
        let mut node = s.node();
        node.value = Value::Special(Special::Null);
        return Ok(node);
    }

    let pointee = s
        .ty
        .arg_type(0)
        .ok_or_else(|| DecodeError::UnrecognizedLayout(s.ty.as_str().to_string()))?;
    let res = cx.decode_value(s.label.clone(), s.path.clone(), pointee, target, s.depth + 1);
    let mut node = cx.settle(s.label.clone(), &s.path, res)?;
    node.type_name = Some(s.ty.as_str().to_string());
    Ok(node)
}

/// Engaged flag first, payload aligned after it.
pub(super) fn optional<I: Inspector + ?Sized>(
    cx: &mut DecodeCx<'_, I>,
    s: &Subject,
) -> DecodeResult<DecodedNode, I> {
    let engaged = cx.read_scalar(s.addr, 1)?;
    if engaged == 0 {
        let mut node = s.node();
        node.value = Value::Special(Special::Uninitialized);
        return Ok(node);
    }

    let payload = s
        .ty
        .arg_type(0)
        .ok_or_else(|| DecodeError::UnrecognizedLayout(s.ty.as_str().to_string()))?;
    let align = cx.type_desc(payload)?.align;
    let res = match value_at(s.addr, 1, align) {
        Ok(addr) => cx.decode_value(s.label.clone(), s.path.clone(), payload, addr, s.depth + 1),
        Err(v) => Err(v.into()),
    };
    let mut node = cx.settle(s.label.clone(), &s.path, res)?;
    node.type_name = Some(s.ty.as_str().to_string());
    Ok(node)
}
