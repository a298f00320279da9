use alloc::format;
use alloc::string::{String, ToString};

use crate::catalogue::DescriptorFlags;
use crate::error::DecodeError;
use crate::inspector::ext::assign::AssignValue;
use crate::inspector::Inspector;
use crate::typename::TypeName;

use super::{DecodeResult, LayoutDecoder, ValueRef};

/// Quote `text` as a C++ string literal.
fn literal(text: &str, wide: bool) -> String {
    let escaped = text.replace('"', "\\\"");
    format!("{}\"{}\"", if wide { "L" } else { "" }, escaped)
}

impl LayoutDecoder {
    /// Replace the contents of an editable value (a `string` or `wstring`)
    /// with `text`.
    ///
    /// The new contents are assigned by the debugged process itself, through
    /// the inspector's [`AssignValue`] extension. Inspectors without it
    /// return [`DecodeError::EditUnsupported`].
    pub fn edit<I: Inspector + ?Sized>(
        &self,
        inspector: &mut I,
        value: ValueRef<'_>,
        text: &str,
    ) -> DecodeResult<(), I> {
        let unsupported = || DecodeError::EditUnsupported(value.type_name.to_string());

        let desc = TypeName::parse(value.type_name)
            .and_then(|ty| self.catalogue.lookup(&ty).copied())
            .ok_or_else(unsupported)?;
        if !desc.flags.contains(DescriptorFlags::EDITABLE) {
            return Err(unsupported());
        }

        let arg = literal(text, desc.flags.contains(DescriptorFlags::WIDE));
        debug!("{}: assign({})", value.name, arg);

        let ops = inspector.support_assign().ok_or_else(unsupported)?;
        ops.call_method(value.type_name, value.addr, "assign", &[arg.as_str()])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abi::Platform;
    use crate::snapshot::Snapshot;

    #[test]
    fn literals() {
        assert_eq!(literal("hello", false), "\"hello\"");
        assert_eq!(literal("say \"hi\"", true), "L\"say \\\"hi\\\"\"");
    }

    #[test]
    fn edit_needs_an_editable_type_and_the_extension() {
        let dec = LayoutDecoder::new();
        let mut snap = Snapshot::new(Platform::Standard, 8);

        let err = dec
            .edit(&mut snap, ValueRef::new("v", "eastl::vector<int>", 0x1000), "x")
            .unwrap_err();
        assert!(matches!(err, DecodeError::EditUnsupported(_)));

        // snapshots are read-only
        let err = dec
            .edit(&mut snap, ValueRef::new("s", "eastl::string", 0x1000), "x")
            .unwrap_err();
        assert!(matches!(err, DecodeError::EditUnsupported(name) if name == "eastl::string"));
    }
}
