//! Fixed-width little-endian encoding of primitives.
//!
//! Numbers encode to exactly their width in little-endian order. Strings
//! encode as their raw UTF-8 bytes with **no** length prefix; framing is the
//! caller's job (the node codec adds a u16 prefix on top).
//!
//! Two APIs are offered:
//! - Typed: [`encode`] / [`decode`] over any [`FixedWidth`] type, plus
//!   [`encode_str`] / [`decode_str`].
//! - Dynamic: [`encode_scalar`] / [`decode_scalar`] over a tagged
//!   [`Scalar`] and an expected [`ScalarKind`].
//!
//! # Example
//! ```
//! use pagetree::codec::binary;
//!
//! let bytes = binary::encode(0x0102_0304u32);
//! assert_eq!(bytes, [0x04, 0x03, 0x02, 0x01]);
//! assert_eq!(binary::decode::<u32>(&bytes).unwrap(), 0x0102_0304);
//! assert!(binary::decode::<u64>(&bytes).is_err());
//! ```

use std::fmt;

use crate::common::{Error, Result};

/// A primitive with a fixed little-endian width.
pub trait FixedWidth: Sized + Copy {
    /// Dynamic tag for this type.
    const KIND: ScalarKind;
    /// Encoded width in bytes.
    const WIDTH: usize;

    /// Append the little-endian bytes of `self` to `out`.
    fn write_le(self, out: &mut Vec<u8>);

    /// Read a value from exactly `WIDTH` bytes.
    ///
    /// Callers guarantee the length; use [`decode`] for checked input.
    fn read_le(bytes: &[u8]) -> Self;
}

macro_rules! impl_fixed_width {
    ($($ty:ty => $kind:ident),* $(,)?) => {
        $(
            impl FixedWidth for $ty {
                const KIND: ScalarKind = ScalarKind::$kind;
                const WIDTH: usize = std::mem::size_of::<$ty>();

                #[inline]
                fn write_le(self, out: &mut Vec<u8>) {
                    out.extend_from_slice(&self.to_le_bytes());
                }

                #[inline]
                fn read_le(bytes: &[u8]) -> Self {
                    let mut raw = [0u8; std::mem::size_of::<$ty>()];
                    raw.copy_from_slice(bytes);
                    <$ty>::from_le_bytes(raw)
                }
            }
        )*
    };
}

impl_fixed_width! {
    u8 => U8,
    u16 => U16,
    i16 => I16,
    u32 => U32,
    i32 => I32,
    u64 => U64,
    i64 => I64,
    f32 => F32,
    f64 => F64,
}

/// Encode a fixed-width value.
pub fn encode<T: FixedWidth>(value: T) -> Vec<u8> {
    let mut out = Vec::with_capacity(T::WIDTH);
    value.write_le(&mut out);
    out
}

/// Append a fixed-width value to an existing buffer.
#[inline]
pub fn encode_into<T: FixedWidth>(value: T, out: &mut Vec<u8>) {
    value.write_le(out);
}

/// Decode a fixed-width value.
///
/// # Errors
/// - `Error::Deserialization` if `bytes` is empty
/// - `Error::InvalidByteLength` if `bytes.len()` is not exactly `T::WIDTH`
pub fn decode<T: FixedWidth>(bytes: &[u8]) -> Result<T> {
    if bytes.is_empty() {
        return Err(Error::Deserialization("input data is empty".to_string()));
    }
    if bytes.len() != T::WIDTH {
        return Err(Error::InvalidByteLength {
            kind: T::KIND.name(),
            expected: T::WIDTH,
            actual: bytes.len(),
        });
    }
    Ok(T::read_le(bytes))
}

/// Encode a string as its raw bytes (no length prefix).
pub fn encode_str(value: &str) -> Vec<u8> {
    value.as_bytes().to_vec()
}

/// Decode a whole buffer as a UTF-8 string.
///
/// The entire slice is the string; an empty slice is the empty string.
///
/// # Errors
/// Returns `Error::Deserialization` if the bytes are not valid UTF-8.
pub fn decode_str(bytes: &[u8]) -> Result<String> {
    std::str::from_utf8(bytes)
        .map(str::to_owned)
        .map_err(|e| Error::Deserialization(format!("invalid UTF-8 string: {}", e)))
}

/// Tag naming one of the primitive kinds the codec understands.
///
/// Uses `#[repr(u8)]` so the tag itself can be stored in one byte.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    U8 = 1,
    U16 = 2,
    I16 = 3,
    U32 = 4,
    I32 = 5,
    U64 = 6,
    I64 = 7,
    F32 = 8,
    F64 = 9,
    Str = 10,
}

impl ScalarKind {
    const ALL: [ScalarKind; 10] = [
        ScalarKind::U8,
        ScalarKind::U16,
        ScalarKind::I16,
        ScalarKind::U32,
        ScalarKind::I32,
        ScalarKind::U64,
        ScalarKind::I64,
        ScalarKind::F32,
        ScalarKind::F64,
        ScalarKind::Str,
    ];

    /// Convert from a stored tag byte.
    ///
    /// # Errors
    /// Returns `Error::UnsupportedType` for unknown tags.
    pub fn from_u8(value: u8) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| *kind as u8 == value)
            .ok_or_else(|| Error::UnsupportedType(format!("unknown scalar tag {}", value)))
    }

    /// Look a kind up by its name (`"u32"`, `"f64"`, `"string"`, ...).
    ///
    /// # Errors
    /// Returns `Error::UnsupportedType` for unknown names.
    pub fn from_name(name: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name() == name)
            .ok_or_else(|| Error::UnsupportedType(format!("unsupported target type {}", name)))
    }

    /// Name of this kind.
    pub fn name(&self) -> &'static str {
        match self {
            ScalarKind::U8 => "u8",
            ScalarKind::U16 => "u16",
            ScalarKind::I16 => "i16",
            ScalarKind::U32 => "u32",
            ScalarKind::I32 => "i32",
            ScalarKind::U64 => "u64",
            ScalarKind::I64 => "i64",
            ScalarKind::F32 => "f32",
            ScalarKind::F64 => "f64",
            ScalarKind::Str => "string",
        }
    }

    /// Encoded width, or `None` for variable-length strings.
    pub fn width(&self) -> Option<usize> {
        match self {
            ScalarKind::U8 => Some(1),
            ScalarKind::U16 | ScalarKind::I16 => Some(2),
            ScalarKind::U32 | ScalarKind::I32 | ScalarKind::F32 => Some(4),
            ScalarKind::U64 | ScalarKind::I64 | ScalarKind::F64 => Some(8),
            ScalarKind::Str => None,
        }
    }
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A primitive value tagged with its kind.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    U8(u8),
    U16(u16),
    I16(i16),
    U32(u32),
    I32(i32),
    U64(u64),
    I64(i64),
    F32(f32),
    F64(f64),
    Str(String),
}

impl Scalar {
    /// Kind tag of this value.
    pub fn kind(&self) -> ScalarKind {
        match self {
            Scalar::U8(_) => ScalarKind::U8,
            Scalar::U16(_) => ScalarKind::U16,
            Scalar::I16(_) => ScalarKind::I16,
            Scalar::U32(_) => ScalarKind::U32,
            Scalar::I32(_) => ScalarKind::I32,
            Scalar::U64(_) => ScalarKind::U64,
            Scalar::I64(_) => ScalarKind::I64,
            Scalar::F32(_) => ScalarKind::F32,
            Scalar::F64(_) => ScalarKind::F64,
            Scalar::Str(_) => ScalarKind::Str,
        }
    }
}

/// Encode a tagged value. The tag itself is not written.
pub fn encode_scalar(value: &Scalar) -> Vec<u8> {
    match value {
        Scalar::U8(v) => encode(*v),
        Scalar::U16(v) => encode(*v),
        Scalar::I16(v) => encode(*v),
        Scalar::U32(v) => encode(*v),
        Scalar::I32(v) => encode(*v),
        Scalar::U64(v) => encode(*v),
        Scalar::I64(v) => encode(*v),
        Scalar::F32(v) => encode(*v),
        Scalar::F64(v) => encode(*v),
        Scalar::Str(v) => encode_str(v),
    }
}

/// Decode `bytes` as the expected kind.
///
/// # Errors
/// Same as [`decode`] for numeric kinds and [`decode_str`] for strings.
pub fn decode_scalar(bytes: &[u8], kind: ScalarKind) -> Result<Scalar> {
    Ok(match kind {
        ScalarKind::U8 => Scalar::U8(decode(bytes)?),
        ScalarKind::U16 => Scalar::U16(decode(bytes)?),
        ScalarKind::I16 => Scalar::I16(decode(bytes)?),
        ScalarKind::U32 => Scalar::U32(decode(bytes)?),
        ScalarKind::I32 => Scalar::I32(decode(bytes)?),
        ScalarKind::U64 => Scalar::U64(decode(bytes)?),
        ScalarKind::I64 => Scalar::I64(decode(bytes)?),
        ScalarKind::F32 => Scalar::F32(decode(bytes)?),
        ScalarKind::F64 => Scalar::F64(decode(bytes)?),
        ScalarKind::Str => Scalar::Str(decode_str(bytes)?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_little_endian_layout() {
        assert_eq!(encode(0x0102u16), [0x02, 0x01]);
        assert_eq!(encode(-2i16), [0xFE, 0xFF]);
        assert_eq!(encode(0x0807_0605_0403_0201u64), [1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(encode(1.0f32), 0x3F80_0000u32.to_le_bytes());
        assert_eq!(encode(-1i64), [0xFF; 8]);
    }

    #[test]
    fn test_widths_match_kinds() {
        assert_eq!(<u16 as FixedWidth>::WIDTH, 2);
        assert_eq!(<i32 as FixedWidth>::WIDTH, 4);
        assert_eq!(<f64 as FixedWidth>::WIDTH, 8);
        for kind in ScalarKind::ALL {
            if let Some(width) = kind.width() {
                let zero = decode_scalar(&vec![0u8; width], kind).unwrap();
                assert_eq!(encode_scalar(&zero).len(), width);
            }
        }
    }

    #[test]
    fn test_decode_rejects_wrong_length() {
        let err = decode::<u32>(&[1, 2, 3]).unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidByteLength {
                kind: "u32",
                expected: 4,
                actual: 3
            }
        ));

        assert!(decode::<u16>(&[1, 2, 3]).is_err());
        assert!(decode::<f64>(&[0; 4]).is_err());
    }

    #[test]
    fn test_decode_rejects_empty_input() {
        assert!(matches!(decode::<i64>(&[]), Err(Error::Deserialization(_))));
    }

    #[test]
    fn test_float_bits_preserved() {
        let bytes = encode(f32::MIN_POSITIVE);
        assert_eq!(decode::<f32>(&bytes).unwrap(), f32::MIN_POSITIVE);

        let nan = decode::<f64>(&encode(f64::NAN)).unwrap();
        assert!(nan.is_nan());
    }

    #[test]
    fn test_strings_have_no_prefix() {
        assert_eq!(encode_str("abc"), b"abc");
        assert_eq!(encode_str(""), b"");
        assert_eq!(decode_str(b"").unwrap(), "");
        assert_eq!(decode_str("héllo".as_bytes()).unwrap(), "héllo");
    }

    #[test]
    fn test_decode_str_rejects_invalid_utf8() {
        assert!(matches!(
            decode_str(&[0xFF, 0xFE]),
            Err(Error::Deserialization(_))
        ));
    }

    #[test]
    fn test_scalar_dynamic_api() {
        let value = Scalar::I32(-7);
        let bytes = encode_scalar(&value);
        assert_eq!(decode_scalar(&bytes, value.kind()).unwrap(), value);

        let text = Scalar::Str("key".to_string());
        assert_eq!(
            decode_scalar(&encode_scalar(&text), ScalarKind::Str).unwrap(),
            text
        );

        // Same bytes, wrong expectation.
        assert!(decode_scalar(&bytes, ScalarKind::U64).is_err());
    }

    #[test]
    fn test_scalar_kind_lookup() {
        assert_eq!(ScalarKind::from_u8(4).unwrap(), ScalarKind::U32);
        assert_eq!(ScalarKind::from_name("string").unwrap(), ScalarKind::Str);
        assert_eq!(ScalarKind::F32.to_string(), "f32");

        assert!(matches!(
            ScalarKind::from_u8(0),
            Err(Error::UnsupportedType(_))
        ));
        assert!(matches!(
            ScalarKind::from_name("u128"),
            Err(Error::UnsupportedType(_))
        ));
    }
}
