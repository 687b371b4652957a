//! Fixed-width little-endian scalar encoding
//!
//! Every typed read or write against a byte arena goes through [`Scalar`], so
//! the on-buffer layout is independent of host endianness and alignment.

/// A fixed-width value with an explicit byte encoding
pub trait Scalar: Copy + Sized {
    /// Encoded width in bytes
    const WIDTH: usize;

    /// Encode into the first `WIDTH` bytes of `out`
    fn encode(self, out: &mut [u8]);

    /// Decode from the first `WIDTH` bytes of `bytes`
    fn decode(bytes: &[u8]) -> Self;
}

macro_rules! impl_scalar {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Scalar for $ty {
                const WIDTH: usize = std::mem::size_of::<$ty>();

                #[inline]
                fn encode(self, out: &mut [u8]) {
                    out[..Self::WIDTH].copy_from_slice(&self.to_le_bytes());
                }

                #[inline]
                fn decode(bytes: &[u8]) -> Self {
                    let mut raw = [0u8; std::mem::size_of::<$ty>()];
                    raw.copy_from_slice(&bytes[..Self::WIDTH]);
                    <$ty>::from_le_bytes(raw)
                }
            }
        )*
    };
}

impl_scalar!(u8, i8, i16, i32, i64, i128, u16, u32, u64, f32, f64);

impl Scalar for bool {
    const WIDTH: usize = 1;

    #[inline]
    fn encode(self, out: &mut [u8]) {
        out[0] = self as u8;
    }

    #[inline]
    fn decode(bytes: &[u8]) -> Self {
        bytes[0] != 0
    }
}
