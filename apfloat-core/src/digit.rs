//! The `Digit` element-type abstraction (§3 "Digit").
//!
//! The original design ships four element-type variants (byte/short/word/float
//! sized) that otherwise share every algorithm. Rather than copy-paste a
//! module per width, every component here is generic over `D: Digit`; the
//! width only changes the storage footprint and the largest power of the
//! external radix a single digit can hold. The modular kernel underneath
//! (`modmath`) always computes in `u64`/`u128` regardless of `D` — see
//! `DESIGN.md` for why that collapse is sound.

/// A base-`B` unsigned integer, stored as `Self`, where `B` is picked per
/// radix by [`Digit::max_base`].
pub trait Digit:
    Copy + Clone + Default + PartialEq + Eq + Send + Sync + std::fmt::Debug + 'static
{
    /// Zero element.
    const ZERO: Self;

    fn from_u64(v: u64) -> Self;
    fn to_u64(self) -> u64;

    /// Largest power of `radix` that fits in `Self` while leaving headroom
    /// below the smallest NTT modulus (so `base * base * max_len` stays
    /// representable after CRT reconstruction).
    fn max_base(radix: u64) -> u64 {
        let ceiling = Self::storage_ceiling().min(crate::primes::HEADROOM_CEILING);
        let mut base = 1u64;
        while let Some(next) = base.checked_mul(radix) {
            if next > ceiling {
                break;
            }
            base = next;
        }
        base
    }

    /// Largest value `Self` can physically store (e.g. `u8::MAX as u64 + 1`).
    fn storage_ceiling() -> u64;
}

impl Digit for u8 {
    const ZERO: Self = 0;
    fn from_u64(v: u64) -> Self {
        v as Self
    }
    fn to_u64(self) -> u64 {
        self as u64
    }
    fn storage_ceiling() -> u64 {
        u8::MAX as u64 + 1
    }
}

impl Digit for u16 {
    const ZERO: Self = 0;
    fn from_u64(v: u64) -> Self {
        v as Self
    }
    fn to_u64(self) -> u64 {
        self as u64
    }
    fn storage_ceiling() -> u64 {
        u16::MAX as u64 + 1
    }
}

impl Digit for u32 {
    const ZERO: Self = 0;
    fn from_u64(v: u64) -> Self {
        v as Self
    }
    fn to_u64(self) -> u64 {
        self as u64
    }
    fn storage_ceiling() -> u64 {
        u32::MAX as u64 + 1
    }
}

impl Digit for u64 {
    const ZERO: Self = 0;
    fn from_u64(v: u64) -> Self {
        v
    }
    fn to_u64(self) -> u64 {
        self
    }
    fn storage_ceiling() -> u64 {
        // Word-sized digit: headroom below the primes is the binding
        // constraint long before u64's own range is.
        u64::MAX
    }
}
