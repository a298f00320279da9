//! Fixed-width integer decoding and built-in rendering of scalar types.

use core::convert::TryInto;

use num_traits::{PrimInt, ToPrimitive};

use crate::abi::Endianness;
use crate::node::Value;

/// Integers that can be decoded from raw target bytes. Implemented for all
/// built-in fixed-width integers.
pub trait FromTargetBytes: PrimInt + ToPrimitive {
    /// Parse `Self` from the first `size_of::<Self>()` bytes of `buf`.
    /// Returns `None` if `buf` is too short.
    fn from_target_bytes(buf: &[u8], endian: Endianness) -> Option<Self>;
}

macro_rules! impl_from_target_bytes {
    ($($num:ty)*) => {
        $(
            impl FromTargetBytes for $num {
                fn from_target_bytes(buf: &[u8], endian: Endianness) -> Option<Self> {
                    let len = core::mem::size_of::<$num>();
                    let raw: [u8; core::mem::size_of::<$num>()] = buf.get(..len)?.try_into().ok()?;
                    Some(match endian {
                        Endianness::Little => <$num>::from_le_bytes(raw),
                        Endianness::Big => <$num>::from_be_bytes(raw),
                    })
                }
            }
        )*
    };
}

impl_from_target_bytes!(u8 u16 u32 u64 i8 i16 i32 i64);

/// Decode an unsigned integer from all of `buf` (1 to 8 bytes).
pub fn decode_unsigned(buf: &[u8], endian: Endianness) -> Option<u64> {
    if buf.is_empty() || buf.len() > 8 {
        return None;
    }

    let mut res = 0u64;
    match endian {
        Endianness::Little => {
            for b in buf.iter().rev().copied() {
                res = (res << 8) | b as u64;
            }
        }
        Endianness::Big => {
            for b in buf.iter().copied() {
                res = (res << 8) | b as u64;
            }
        }
    }
    Some(res)
}

/// Interpret the low `width` bytes of `v` as a two's complement integer.
pub fn sign_extend(v: u64, width: usize) -> i64 {
    if width == 0 || width >= 8 {
        return v as i64;
    }
    let shift = 64 - 8 * width as u32;
    ((v << shift) as i64) >> shift
}

/// Render built-in arithmetic and pointer types straight from their bytes.
///
/// `name` must already be normalized. Returns `None` for anything that is not
/// a recognized scalar, or if `bytes` doesn't match the scalar's width.
pub fn render_builtin(name: &str, bytes: &[u8], endian: Endianness) -> Option<Value> {
    let raw = decode_unsigned(bytes, endian)?;
    let width = bytes.len();

    if name.ends_with('*') {
        return Some(Value::Pointer(raw));
    }

    let value = match name {
        "bool" => Value::Bool(raw != 0),
        "float" if width == 4 => Value::Float(f32::from_bits(raw as u32) as f64),
        "double" if width == 8 => Value::Float(f64::from_bits(raw)),
        "char" | "signed char" | "short" | "int" | "long" | "long long" | "wchar_t"
        | "int8_t" | "int16_t" | "int32_t" | "int64_t" | "ssize_t" | "ptrdiff_t"
        | "char8_t" => Value::Int(sign_extend(raw, width)),
        "unsigned char" | "unsigned short" | "unsigned int" | "unsigned"
        | "unsigned long" | "unsigned long long" | "uint8_t" | "uint16_t" | "uint32_t"
        | "uint64_t" | "size_t" | "char16_t" | "char32_t" | "eastl_size_t" => {
            Value::UInt(raw)
        }
        _ => return None,
    };
    Some(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_both_byte_orders() {
        let bytes = [0x12, 0x34, 0x56, 0x78];
        assert_eq!(
            decode_unsigned(&bytes, Endianness::Little),
            Some(0x7856_3412)
        );
        assert_eq!(decode_unsigned(&bytes, Endianness::Big), Some(0x1234_5678));
        assert_eq!(
            u16::from_target_bytes(&bytes, Endianness::Big),
            Some(0x1234)
        );
        assert_eq!(u64::from_target_bytes(&bytes, Endianness::Little), None);
    }

    #[test]
    fn sign_extension() {
        assert_eq!(sign_extend(0xffff_ffff, 4), -1);
        assert_eq!(sign_extend(0xffff_fffe, 4), -2);
        assert_eq!(sign_extend(0x7f, 1), 127);
        assert_eq!(sign_extend(0x80, 1), -128);
    }

    #[test]
    fn builtin_rendering() {
        let le = Endianness::Little;
        assert_eq!(
            render_builtin("int", &(-5i32).to_le_bytes(), le),
            Some(Value::Int(-5))
        );
        assert_eq!(
            render_builtin("double", &1.5f64.to_le_bytes(), le),
            Some(Value::Float(1.5))
        );
        assert_eq!(
            render_builtin("Foo*", &0x1000u64.to_le_bytes(), le),
            Some(Value::Pointer(0x1000))
        );
        assert_eq!(render_builtin("Foo", &[0; 8], le), None);
    }
}
