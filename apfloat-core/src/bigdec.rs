//! A minimal fixed-point decimal operand for the Newton driver (§4.J):
//! sign, a base-`B` digit vector (most-significant-first, §3), and a scale
//! (count of trailing fractional digits). Schoolbook add/subtract;
//! multiplication delegates to the three-modulus convolver (§4.H) and the
//! carry-CRT finalizer (§4.I) rather than repeating schoolbook multiply.
use crate::{
    carry_crt, context::Context, convolve, digit::Digit,
    error::{ArithmeticError, Error, Result},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BigDecimal<D: Digit> {
    pub negative: bool,
    /// Most-significant-first digits, base `base`. Never empty; a zero
    /// value is represented as `[D::ZERO]`.
    pub digits: Vec<D>,
    /// Number of digits at the tail of `digits` that are fractional.
    pub scale: usize,
    pub base: u64,
}

fn strip_leading_zeros<D: Digit>(digits: Vec<D>) -> Vec<D> {
    let first_nonzero = digits.iter().position(|&d| d != D::ZERO).unwrap_or(digits.len().saturating_sub(1));
    digits[first_nonzero..].to_vec()
}

fn to_u64_vec<D: Digit>(digits: &[D]) -> Vec<u64> {
    digits.iter().map(|d| d.to_u64()).collect()
}

fn from_u64_vec<D: Digit>(digits: Vec<u64>) -> Vec<D> {
    digits.into_iter().map(D::from_u64).collect()
}

/// Pads `a` and `b` (both most-significant-first) to a common scale (by
/// appending zero digits to the shorter fractional part) and a common
/// integer-digit count (by prepending zero digits to the shorter one).
fn align(a_digits: &[u64], a_scale: usize, b_digits: &[u64], b_scale: usize) -> (Vec<u64>, Vec<u64>, usize) {
    let scale = a_scale.max(b_scale);
    let mut a = a_digits.to_vec();
    a.extend(std::iter::repeat(0u64).take(scale - a_scale));
    let mut b = b_digits.to_vec();
    b.extend(std::iter::repeat(0u64).take(scale - b_scale));

    let len = a.len().max(b.len());
    let mut a_full = vec![0u64; len - a.len()];
    a_full.extend(a);
    let mut b_full = vec![0u64; len - b.len()];
    b_full.extend(b);
    (a_full, b_full, scale)
}

fn add_magnitude(a: &[u64], b: &[u64], base: u64) -> Vec<u64> {
    debug_assert_eq!(a.len(), b.len());
    let mut out = vec![0u64; a.len()];
    let mut carry = 0u64;
    for i in (0..a.len()).rev() {
        let s = a[i] + b[i] + carry;
        out[i] = s % base;
        carry = s / base;
    }
    if carry > 0 {
        let mut full = Vec::with_capacity(out.len() + 1);
        full.push(carry);
        full.extend(out);
        full
    } else {
        out
    }
}

/// Subtracts `b` from `a`, assuming `a >= b` (both the same length).
fn sub_magnitude(a: &[u64], b: &[u64], base: u64) -> Vec<u64> {
    debug_assert_eq!(a.len(), b.len());
    let mut out = vec![0u64; a.len()];
    let mut borrow: i64 = 0;
    for i in (0..a.len()).rev() {
        let mut d = a[i] as i64 - b[i] as i64 - borrow;
        if d < 0 {
            d += base as i64;
            borrow = 1;
        } else {
            borrow = 0;
        }
        out[i] = d as u64;
    }
    out
}

impl<D: Digit> BigDecimal<D> {
    pub fn zero(base: u64) -> Self {
        BigDecimal {
            negative: false,
            digits: vec![D::ZERO],
            scale: 0,
            base,
        }
    }

    pub fn from_u64(value: u64, base: u64) -> Self {
        if value == 0 {
            return Self::zero(base);
        }
        let mut digits = Vec::new();
        let mut v = value;
        while v > 0 {
            digits.push(v % base);
            v /= base;
        }
        digits.reverse();
        BigDecimal {
            negative: false,
            digits: from_u64_vec(digits),
            scale: 0,
            base,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.digits.iter().all(|&d| d == D::ZERO)
    }

    /// Total significant digit count — the precision the Newton driver
    /// doubles.
    pub fn precision(&self) -> usize {
        self.digits.len()
    }

    /// Truncates or zero-extends to exactly `target` digits. Extension
    /// appends zero digits at the tail (increasing `scale`, i.e. treated as
    /// added fractional precision); truncation drops digits from the tail
    /// (decreasing `scale`, saturating at zero if the dropped count exceeds
    /// it — i.e. truncating into the integer part).
    pub fn with_precision(&self, target: usize) -> Self {
        let target = target.max(1);
        let len = self.digits.len();
        if len == target {
            return self.clone();
        }
        if len < target {
            let mut digits = self.digits.clone();
            let extra = target - len;
            digits.extend(std::iter::repeat(D::ZERO).take(extra));
            return BigDecimal {
                negative: self.negative,
                digits,
                scale: self.scale + extra,
                base: self.base,
            };
        }
        let drop = len - target;
        let digits = self.digits[..target].to_vec();
        BigDecimal {
            negative: self.negative,
            digits,
            scale: self.scale.saturating_sub(drop),
            base: self.base,
        }
    }

    pub fn negate(&self) -> Self {
        if self.is_zero() {
            return self.clone();
        }
        BigDecimal {
            negative: !self.negative,
            ..self.clone()
        }
    }

    pub fn add(&self, other: &Self) -> Self {
        debug_assert_eq!(self.base, other.base);
        let (a, b, scale) = align(&to_u64_vec(&self.digits), self.scale, &to_u64_vec(&other.digits), other.scale);

        let (negative, magnitude) = if self.negative == other.negative {
            (self.negative, add_magnitude(&a, &b, self.base))
        } else if a >= b {
            (self.negative, sub_magnitude(&a, &b, self.base))
        } else {
            (other.negative, sub_magnitude(&b, &a, self.base))
        };

        let digits = strip_leading_zeros(from_u64_vec(magnitude));
        let is_zero = digits.iter().all(|&d| d == D::ZERO);
        BigDecimal {
            negative: negative && !is_zero,
            digits,
            scale,
            base: self.base,
        }
    }

    pub fn subtract(&self, other: &Self) -> Self {
        self.add(&other.negate())
    }

    /// Exact product via the three-modulus convolver and carry-CRT
    /// finalizer, at full precision (`self.precision() + other.precision()`
    /// significant digits before leading-zero stripping) — the caller
    /// truncates afterward if a shorter result is wanted.
    pub fn multiply(&self, ctx: &Context, other: &Self) -> Result<Self> {
        debug_assert_eq!(self.base, other.base);
        let conv = convolve::multiply(ctx, &self.digits, &other.digits)?;
        let residues: [Vec<u64>; 3] = [
            conv.residues[0].values.clone(),
            conv.residues[1].values.clone(),
            conv.residues[2].values.clone(),
        ];
        let s = residues[0].len();
        let digits_u64 = carry_crt::carry_crt_serial(&residues, s + 1, self.base)?;
        let digits = strip_leading_zeros(from_u64_vec(digits_u64));
        let is_zero = digits.iter().all(|&d| d == D::ZERO);
        Ok(BigDecimal {
            negative: (self.negative != other.negative) && !is_zero,
            digits,
            scale: self.scale + other.scale,
            base: self.base,
        })
    }

    /// Schoolbook long division by a small integer divisor, same digit
    /// length as `self` (the remainder past the last digit is dropped — an
    /// at-most-one-ulp simplification, acceptable since the Newton driver
    /// always re-truncates/re-extends the result to the precision it needs
    /// next).
    pub fn divide_small(&self, divisor: u64) -> Result<Self> {
        if divisor == 0 {
            return Err(Error::Arithmetic(ArithmeticError::ZeroDivisor));
        }
        let mut out = Vec::with_capacity(self.digits.len());
        let mut rem: u128 = 0;
        for d in self.digits.iter().map(|d| d.to_u64()) {
            let acc = rem * self.base as u128 + d as u128;
            out.push((acc / divisor as u128) as u64);
            rem = acc % divisor as u128;
        }
        let digits = strip_leading_zeros(from_u64_vec(out));
        let is_zero = digits.iter().all(|&d| d == D::ZERO);
        Ok(BigDecimal {
            negative: self.negative && !is_zero,
            digits,
            scale: self.scale,
            base: self.base,
        })
    }

    /// Schoolbook multiplication by a small integer factor — the mirror of
    /// [`Self::divide_small`], used where the second operand is a plain count
    /// (e.g. the Gauss-Legendre accumulator's power-of-two weight) rather
    /// than another `BigDecimal` worth routing through the convolver.
    pub fn multiply_small(&self, factor: u64) -> Self {
        if factor == 0 || self.is_zero() {
            return Self::zero(self.base);
        }
        let mut out = vec![0u64; self.digits.len()];
        let mut carry: u128 = 0;
        for (i, d) in self.digits.iter().enumerate().rev() {
            let acc = d.to_u64() as u128 * factor as u128 + carry;
            out[i] = (acc % self.base as u128) as u64;
            carry = acc / self.base as u128;
        }
        let mut digits = from_u64_vec(out);
        while carry > 0 {
            digits.insert(0, D::from_u64((carry % self.base as u128) as u64));
            carry /= self.base as u128;
        }
        let digits = strip_leading_zeros(digits);
        let is_zero = digits.iter().all(|&d| d == D::ZERO);
        BigDecimal {
            negative: self.negative && !is_zero,
            digits,
            scale: self.scale,
            base: self.base,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str, base: u64) -> BigDecimal<u32> {
        let (negative, rest) = match s.strip_prefix('-') {
            Some(r) => (true, r),
            None => (false, s),
        };
        let (int_part, frac_part) = match rest.split_once('.') {
            Some((i, f)) => (i, f),
            None => (rest, ""),
        };
        let digits: Vec<u32> = int_part
            .chars()
            .chain(frac_part.chars())
            .map(|c| c.to_digit(10).unwrap())
            .collect();
        BigDecimal {
            negative,
            digits,
            scale: frac_part.len(),
            base,
        }
    }

    fn display(v: &BigDecimal<u32>) -> String {
        let mut s: String = v.digits.iter().map(|&d| std::char::from_digit(d, 10).unwrap()).collect();
        if v.scale > 0 {
            while s.len() <= v.scale {
                s.insert(0, '0');
            }
            let point = s.len() - v.scale;
            s.insert(point, '.');
        }
        if v.negative {
            format!("-{s}")
        } else {
            s
        }
    }

    #[test]
    fn add_same_scale() {
        let a = dec("123.45", 10);
        let b = dec("67.89", 10);
        assert_eq!(display(&a.add(&b)), "191.34");
    }

    #[test]
    fn add_different_scale() {
        let a = dec("1.5", 10);
        let b = dec("0.25", 10);
        assert_eq!(display(&a.add(&b)), "1.75");
    }

    #[test]
    fn subtract_to_negative() {
        let a = dec("3", 10);
        let b = dec("10", 10);
        assert_eq!(display(&a.subtract(&b)), "-7");
    }

    #[test]
    fn multiply_matches_known_product() {
        let ctx = Context::default();
        let a = dec("12345", 10);
        let b = dec("6789", 10);
        let product = a.multiply(&ctx, &b).unwrap();
        assert_eq!(display(&product), "83810205");
    }

    #[test]
    fn multiply_tracks_scale() {
        let ctx = Context::default();
        let a = dec("1.5", 10);
        let b = dec("0.2", 10);
        let product = a.multiply(&ctx, &b).unwrap();
        assert_eq!(display(&product), "0.30");
    }

    #[test]
    fn divide_small_exact() {
        let a = dec("100", 10);
        let q = a.divide_small(4).unwrap();
        assert_eq!(display(&q), "25");
    }

    #[test]
    fn multiply_small_matches_known_product() {
        let a = dec("123.45", 10);
        let product = a.multiply_small(7);
        assert_eq!(display(&product), "864.15");
    }

    #[test]
    fn multiply_small_carries_past_the_leading_digit() {
        let a = dec("999", 10);
        let product = a.multiply_small(3);
        assert_eq!(display(&product), "2997");
    }

    #[test]
    fn with_precision_truncates_and_extends() {
        let a = dec("123.456", 10);
        let truncated = a.with_precision(4);
        assert_eq!(display(&truncated), "123.4");
        let extended = a.with_precision(8);
        assert_eq!(display(&extended), "123.45600");
    }
}
