//! Arrays of fixed-size numeric elements.
use std::fmt;

use crate::tags::ByteOrder;

/// Fraction of two signed 32-bit integers, `(numerator, denominator)`.
pub type Rational = (i32, i32);
/// Fraction of two unsigned 32-bit integers, `(numerator, denominator)`.
pub type URational = (u32, u32);

/// A numeric element of a TIFF value array.
pub trait Element: Copy + PartialEq + fmt::Debug + Send + Sync + 'static {
    /// Encoded size in bytes.
    const SIZE: usize;

    /// Decode from exactly `SIZE` bytes.
    fn decode(bytes: &[u8], byte_order: ByteOrder) -> Self;

    fn encode(self, byte_order: ByteOrder, out: &mut Vec<u8>);

    fn parse(text: &str) -> Option<Self>;

    fn fmt_text(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result;

    fn to_i64(self) -> Option<i64>;

    fn to_f64(self) -> Option<f64>;

    fn to_rational(self) -> Option<Rational>;
}

fn array<const N: usize>(bytes: &[u8]) -> [u8; N] {
    let mut buf = [0; N];
    buf.copy_from_slice(&bytes[..N]);
    buf
}

macro_rules! integer_element {
    ($ty:ty, $size:expr) => {
        impl Element for $ty {
            const SIZE: usize = $size;

            #[inline]
            fn decode(bytes: &[u8], byte_order: ByteOrder) -> Self {
                let buf = array::<$size>(bytes);
                match byte_order {
                    ByteOrder::LittleEndian => <$ty>::from_le_bytes(buf),
                    ByteOrder::BigEndian => <$ty>::from_be_bytes(buf),
                }
            }

            #[inline]
            fn encode(self, byte_order: ByteOrder, out: &mut Vec<u8>) {
                match byte_order {
                    ByteOrder::LittleEndian => out.extend_from_slice(&self.to_le_bytes()),
                    ByteOrder::BigEndian => out.extend_from_slice(&self.to_be_bytes()),
                }
            }

            fn parse(text: &str) -> Option<Self> {
                text.parse().ok()
            }

            fn fmt_text(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self)
            }

            fn to_i64(self) -> Option<i64> {
                i64::try_from(self).ok()
            }

            fn to_f64(self) -> Option<f64> {
                Some(f64::from(self))
            }

            fn to_rational(self) -> Option<Rational> {
                i32::try_from(self).ok().map(|n| (n, 1))
            }
        }
    };
}

integer_element!(u16, 2);
integer_element!(i16, 2);
integer_element!(u32, 4);
integer_element!(i32, 4);

macro_rules! float_element {
    ($ty:ty, $bits:ty, $size:expr) => {
        impl Element for $ty {
            const SIZE: usize = $size;

            #[inline]
            fn decode(bytes: &[u8], byte_order: ByteOrder) -> Self {
                <$ty>::from_bits(<$bits as Element>::decode(bytes, byte_order))
            }

            #[inline]
            fn encode(self, byte_order: ByteOrder, out: &mut Vec<u8>) {
                self.to_bits().encode(byte_order, out)
            }

            fn parse(text: &str) -> Option<Self> {
                text.parse().ok()
            }

            fn fmt_text(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self)
            }

            fn to_i64(self) -> Option<i64> {
                float_to_i64(f64::from(self))
            }

            fn to_f64(self) -> Option<f64> {
                Some(f64::from(self))
            }

            fn to_rational(self) -> Option<Rational> {
                float_to_rational(f64::from(self))
            }
        }
    };
}

impl Element for u64 {
    const SIZE: usize = 8;

    #[inline]
    fn decode(bytes: &[u8], byte_order: ByteOrder) -> Self {
        let buf = array::<8>(bytes);
        match byte_order {
            ByteOrder::LittleEndian => u64::from_le_bytes(buf),
            ByteOrder::BigEndian => u64::from_be_bytes(buf),
        }
    }

    #[inline]
    fn encode(self, byte_order: ByteOrder, out: &mut Vec<u8>) {
        match byte_order {
            ByteOrder::LittleEndian => out.extend_from_slice(&self.to_le_bytes()),
            ByteOrder::BigEndian => out.extend_from_slice(&self.to_be_bytes()),
        }
    }

    fn parse(text: &str) -> Option<Self> {
        text.parse().ok()
    }

    fn fmt_text(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self)
    }

    fn to_i64(self) -> Option<i64> {
        i64::try_from(self).ok()
    }

    fn to_f64(self) -> Option<f64> {
        Some(self as f64)
    }

    fn to_rational(self) -> Option<Rational> {
        i32::try_from(self).ok().map(|n| (n, 1))
    }
}

float_element!(f32, u32, 4);
float_element!(f64, u64, 8);

macro_rules! rational_element {
    ($part:ty) => {
        impl Element for ($part, $part) {
            const SIZE: usize = 8;

            #[inline]
            fn decode(bytes: &[u8], byte_order: ByteOrder) -> Self {
                (
                    <$part as Element>::decode(&bytes[..4], byte_order),
                    <$part as Element>::decode(&bytes[4..8], byte_order),
                )
            }

            #[inline]
            fn encode(self, byte_order: ByteOrder, out: &mut Vec<u8>) {
                self.0.encode(byte_order, out);
                self.1.encode(byte_order, out);
            }

            /// Accepts `n/d` or a plain integer `n` (read as `n/1`).
            fn parse(text: &str) -> Option<Self> {
                match text.split_once('/') {
                    Some((n, d)) => Some((n.trim().parse().ok()?, d.trim().parse().ok()?)),
                    None => Some((text.parse().ok()?, 1)),
                }
            }

            fn fmt_text(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}/{}", self.0, self.1)
            }

            fn to_i64(self) -> Option<i64> {
                let (n, d) = (i64::from(self.0), i64::from(self.1));
                n.checked_div(d)
            }

            fn to_f64(self) -> Option<f64> {
                if self.1 == 0 {
                    return None;
                }
                Some(f64::from(self.0) / f64::from(self.1))
            }

            fn to_rational(self) -> Option<Rational> {
                Some((i32::try_from(self.0).ok()?, i32::try_from(self.1).ok()?))
            }
        }
    };
}

rational_element!(u32);
rational_element!(i32);

fn float_to_i64(f: f64) -> Option<i64> {
    let t = f.trunc();
    // `i64::MAX as f64` rounds up to 2^63, which is already out of range.
    if t.is_finite() && t >= i64::MIN as f64 && t < i64::MAX as f64 {
        Some(t as i64)
    } else {
        None
    }
}

/// Approximate `f` by a fraction with a power of ten denominator.
pub(crate) fn float_to_rational(f: f64) -> Option<Rational> {
    if !f.is_finite() {
        return None;
    }

    let mut den: i64 = 1;
    loop {
        let scaled = f * den as f64;
        if scaled.abs() > f64::from(i32::MAX) {
            // Lose precision rather than range, as long as the integral part fits.
            return if den == 1 {
                None
            } else {
                let den = den / 10;
                Some(((f * den as f64).round() as i32, den as i32))
            };
        }
        if scaled.fract() == 0.0 || den == 1_000_000_000 {
            return Some((scaled.round() as i32, den as i32));
        }
        den *= 10;
    }
}

/// A homogeneous array of numbers.
///
/// Remembers the byte order it was decoded with, `None` for values built from text or code.
/// Equality only compares the numbers.
#[derive(Clone, Debug)]
pub struct Numbers<T> {
    values: Vec<T>,
    byte_order: Option<ByteOrder>,
}

impl<T: PartialEq> PartialEq for Numbers<T> {
    fn eq(&self, other: &Self) -> bool {
        self.values == other.values
    }
}

impl<T: Element> Default for Numbers<T> {
    fn default() -> Self {
        Numbers {
            values: Vec::new(),
            byte_order: None,
        }
    }
}

impl<T: Element> Numbers<T> {
    pub fn new(values: Vec<T>) -> Self {
        Numbers {
            values,
            byte_order: None,
        }
    }

    pub fn values(&self) -> &[T] {
        &self.values
    }

    pub fn values_mut(&mut self) -> &mut Vec<T> {
        &mut self.values
    }

    pub fn byte_order(&self) -> Option<ByteOrder> {
        self.byte_order
    }

    pub fn get(&self, n: usize) -> Option<T> {
        self.values.get(n).copied()
    }

    pub fn count(&self) -> usize {
        self.values.len()
    }

    pub fn size(&self) -> usize {
        self.values.len() * T::SIZE
    }

    /// Replace the content with the elements in `bytes`. Trailing bytes that do not form a
    /// complete element are ignored.
    pub fn read(&mut self, bytes: &[u8], byte_order: ByteOrder) {
        let chunks = bytes.chunks_exact(T::SIZE);
        if !chunks.remainder().is_empty() {
            log::debug!(
                "Ignoring {} trailing bytes of a numeric value",
                chunks.remainder().len()
            );
        }
        self.values = chunks.map(|c| T::decode(c, byte_order)).collect();
        self.byte_order = Some(byte_order);
    }

    /// Replace the content with whitespace separated numbers. On error, the value is unchanged
    /// and the offending token is returned.
    pub fn read_str<'a>(&mut self, text: &'a str) -> Result<(), &'a str> {
        let values = text
            .split_whitespace()
            .map(|token| T::parse(token).ok_or(token))
            .collect::<Result<Vec<_>, _>>()?;
        self.values = values;
        self.byte_order = None;
        Ok(())
    }

    pub fn encode(&self, out: &mut Vec<u8>, byte_order: ByteOrder) -> usize {
        let start = out.len();
        out.reserve(self.size());
        for v in &self.values {
            v.encode(byte_order, out);
        }
        out.len() - start
    }
}

impl<T: Element> fmt::Display for Numbers<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, v) in self.values.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            v.fmt_text(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rationals_are_not_simplified() {
        let mut v = Numbers::<URational>::default();
        v.read(&[4, 0, 0, 0, 8, 0, 0, 0], ByteOrder::LittleEndian);
        assert_eq!(v.values(), &[(4, 8)]);
        assert_eq!(v.to_string(), "4/8");
        assert_eq!(v.byte_order(), Some(ByteOrder::LittleEndian));
    }

    #[test]
    fn byte_order_is_respected() {
        let mut v = Numbers::<u16>::default();
        v.read(&[0x12, 0x34, 0x56, 0x78], ByteOrder::BigEndian);
        assert_eq!(v.values(), &[0x1234, 0x5678]);

        let mut out = Vec::new();
        assert_eq!(v.encode(&mut out, ByteOrder::LittleEndian), 4);
        assert_eq!(out, [0x34, 0x12, 0x78, 0x56]);
    }

    #[test]
    fn incomplete_elements_are_dropped() {
        let mut v = Numbers::<u32>::default();
        v.read(&[1, 0, 0, 0, 2, 0], ByteOrder::LittleEndian);
        assert_eq!(v.values(), &[1]);
    }

    #[test]
    fn text_parsing() {
        let mut v = Numbers::<Rational>::default();
        v.read_str("-1/3  7 ").unwrap();
        assert_eq!(v.values(), &[(-1, 3), (7, 1)]);
        assert_eq!(v.byte_order(), None);

        assert_eq!(v.read_str("1/2 x/3"), Err("x/3"));
        assert_eq!(v.values(), &[(-1, 3), (7, 1)], "unchanged on error");

        let mut s = Numbers::<u16>::default();
        assert_eq!(s.read_str("65536"), Err("65536"));
    }

    #[test]
    fn conversions_report_failure() {
        assert_eq!((7u32, 0u32).to_i64(), None);
        assert_eq!((7u32, 0u32).to_f64(), None);
        assert_eq!((u32::MAX, 1u32).to_rational(), None);
        assert_eq!((-7i32, 2i32).to_i64(), Some(-3));
        assert_eq!(f64::NAN.to_i64(), None);
        assert_eq!(1e300f64.to_i64(), None);
        assert_eq!(u32::MAX.to_rational(), None);
    }

    #[test]
    fn float_rationals() {
        assert_eq!(float_to_rational(2.5), Some((25, 10)));
        assert_eq!(float_to_rational(-3.0), Some((-3, 1)));
        assert_eq!(float_to_rational(f64::INFINITY), None);
        assert_eq!(float_to_rational(1e12), None);
    }
}
