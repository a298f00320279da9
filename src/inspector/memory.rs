use crate::inspector::{InspectError, InspectResult, Inspector};
use crate::scalar::FromTargetBytes;

macro_rules! impl_typed_reads {
    ($($num:ty)*) => {
        paste::paste! {
            $(
                #[doc = concat!("Read a `", stringify!($num), "` at `addr` in target byte order.")]
                fn [<read_ $num>](&mut self, addr: u64) -> InspectResult<$num, Self> {
                    self.read_int::<$num>(addr)
                }
            )*
        }
    };
}

/// Typed reads layered on top of [`Inspector::read_bytes`].
///
/// Automatically implemented for every `Inspector`.
pub trait InspectorExt: Inspector {
    /// Read any fixed-width integer at `addr`.
    fn read_int<T: FromTargetBytes>(&mut self, addr: u64) -> InspectResult<T, Self> {
        let mut buf = [0u8; 8];
        let buf = &mut buf[..core::mem::size_of::<T>()];
        self.read_bytes(addr, buf)?;
        T::from_target_bytes(buf, self.endianness()).ok_or(InspectError::NonFatal)
    }

    /// Read `N` consecutive pointer-sized words starting at `addr`.
    fn read_words<const N: usize>(&mut self, addr: u64) -> InspectResult<[u64; N], Self> {
        let ptr = self.pointer_size() as u64;
        let mut out = [0u64; N];
        for (i, word) in out.iter_mut().enumerate() {
            let at = (i as u64)
                .checked_mul(ptr)
                .and_then(|off| addr.checked_add(off))
                .ok_or(InspectError::Unreadable {
                    addr,
                    len: N * ptr as usize,
                })?;
            *word = self.read_pointer(at)?;
        }
        Ok(out)
    }

    impl_typed_reads!(u8 u16 u32 u64 i8 i16 i32 i64);
}

impl<I: Inspector + ?Sized> InspectorExt for I {}
