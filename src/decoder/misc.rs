//! Small vocabulary types: `pair`, `complex`, `function`, `stack`,
//! `once_flag`, and debug-mode iterator wrappers.

use alloc::format;
use alloc::string::ToString;
use alloc::vec;

use crate::error::DecodeError;
use crate::inspector::ext::symbols::SymbolLookup;
use crate::inspector::{Inspector, InspectorExt};
use crate::node::{Children, DecodedNode, Special, Value};
use crate::scalar::sign_extend;
use crate::typename::TypeName;

use super::{summary_value, DecodeCx, DecodeResult, Element, Subject};

fn unrecognized<E>(s: &Subject) -> DecodeError<E> {
    DecodeError::UnrecognizedLayout(s.ty.as_str().to_string())
}

pub(super) fn pair<I: Inspector + ?Sized>(
    cx: &mut DecodeCx<'_, I>,
    s: &Subject,
) -> DecodeResult<DecodedNode, I> {
    match cx.element_of(s)?.kind {
        Element::Pair(p) => cx.decode_pair(s.label.clone(), s.path.clone(), &p, s.addr, s.depth),
        Element::Value(_) => Err(unrecognized(s)),
    }
}

pub(super) fn complex<I: Inspector + ?Sized>(
    cx: &mut DecodeCx<'_, I>,
    s: &Subject,
) -> DecodeResult<DecodedNode, I> {
    let part = s.ty.arg_type(0).ok_or_else(|| unrecognized(s))?;
    let size = cx.type_desc(part)?.size;

    let real = cx.emit_value(s, "real".into(), part, s.addr)?;
    let imag = cx.emit_value(s, "imag".into(), part, s.field(size)?)?;

    let mut node = s.node();
    node.value = Value::Text(format!(
        "({}, {})",
        summary_value(&real),
        summary_value(&imag)
    ));
    node.expandable = true;
    if cx.is_expanded(&s.path) {
        node.children = Some(Children {
            nodes: vec![real, imag],
            truncated: false,
        });
    }
    Ok(node)
}

/// `{functor, _, manager, invoker}`. An empty function has no manager.
pub(super) fn function<I: Inspector + ?Sized>(
    cx: &mut DecodeCx<'_, I>,
    s: &Subject,
) -> DecodeResult<DecodedNode, I> {
    let [functor, _, manager, invoker] = cx.inspector.read_words::<4>(s.addr)?;

    let mut node = s.node();
    node.value = if manager == 0 {
        Value::Special(Special::Null)
    } else if functor > 2 {
        let symbol = match cx.inspector.support_symbols() {
            Some(ops) => ops.symbolize(functor)?,
            None => None,
        };
        node.type_name = Some(s.ty.as_str().to_string());
        match symbol {
            Some(name) => Value::Text(name),
            None => Value::Pointer(functor),
        }
    } else {
        node.type_name = Some(s.ty.as_str().to_string());
        Value::Empty
    };

    node.expandable = true;
    if cx.is_expanded(&s.path) {
        node.children = Some(Children {
            nodes: vec![
                DecodedNode::leaf("functor", Value::Pointer(functor)),
                DecodedNode::leaf("manager", Value::Pointer(manager)),
                DecodedNode::leaf("invoker", Value::Pointer(invoker)),
            ],
            truncated: false,
        });
    }
    Ok(node)
}

/// The underlying container (`c`, the first member) shown in place of the
/// adaptor.
pub(super) fn stack<I: Inspector + ?Sized>(
    cx: &mut DecodeCx<'_, I>,
    s: &Subject,
) -> DecodeResult<DecodedNode, I> {
    let container = match s.ty.arg_type(1) {
        Some(ty) => ty.clone(),
        None => {
            let elem = s.ty.arg_type(0).ok_or_else(|| unrecognized(s))?;
            TypeName::parse(&format!("eastl::deque<{}>", elem)).ok_or_else(|| unrecognized(s))?
        }
    };

    let mut node = cx.decode_value(
        s.label.clone(),
        s.path.clone(),
        &container,
        s.addr,
        s.depth + 1,
    )?;
    node.type_name = Some(s.ty.as_str().to_string());
    Ok(node)
}

/// `__gnu_debug::_Safe_iterator<It, Seq>` shows as the iterator it wraps.
pub(super) fn safe_iterator<I: Inspector + ?Sized>(
    cx: &mut DecodeCx<'_, I>,
    s: &Subject,
) -> DecodeResult<DecodedNode, I> {
    let wrapped = s.ty.arg_type(0).ok_or_else(|| unrecognized(s))?;
    let current = s.field(s.abi.safe_iterator_current())?;

    let mut node = cx.decode_value(
        s.label.clone(),
        s.path.clone(),
        wrapped,
        current,
        s.depth + 1,
    )?;
    node.type_name = Some(wrapped.as_str().to_string());
    Ok(node)
}

pub(super) fn once_flag<I: Inspector + ?Sized>(
    cx: &mut DecodeCx<'_, I>,
    s: &Subject,
) -> DecodeResult<DecodedNode, I> {
    let flag = cx.read_scalar(s.addr, 4)?;
    Ok(DecodedNode::leaf(
        s.label.clone(),
        Value::Int(sign_extend(flag, 4)),
    ))
}
