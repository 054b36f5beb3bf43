//! The flat error taxonomy of §7, hand-rolled the way
//! `tooling/verifier-server/src/error.rs` rolls its own `AppError`: one
//! `enum`, a manual `Display`, a manual `std::error::Error` impl, no derive
//! macro.
use std::{fmt, path::PathBuf};

#[derive(Debug)]
pub enum Error {
    /// Zero divisor, zero-th root, negative-even root, inverse of zero.
    Arithmetic(ArithmeticError),
    /// Target precision `<= 0`, or infinite precision requested for a
    /// transcendental that needs a bound.
    Precision(PrecisionError),
    /// An exponent or transform length would exceed what the chosen `Digit`
    /// width / prime triple can represent.
    Overflow {
        requested_bits: u64,
        max_bits: u64,
    },
    /// Requested transform length exceeds a prime's `2^m` ceiling.
    TransformLengthExceeded { requested: u64, max_for_prime: u64 },
    /// I/O failure on a disk-backed `DataStorage`.
    BackingStorage {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Internal assertion failed (carry residue nonzero, size mismatch).
    /// These indicate an implementation bug in this crate, not a malformed
    /// caller input; per §7 they are fatal.
    Invariant(&'static str),
}

#[derive(Debug)]
pub enum ArithmeticError {
    ZeroDivisor,
    ZerothRoot,
    NegativeEvenRoot,
    InverseOfZero,
}

#[derive(Debug)]
pub enum PrecisionError {
    NonPositiveTarget,
    Unbounded,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Arithmetic(e) => write!(f, "arithmetic error: {e}"),
            Error::Precision(e) => write!(f, "precision error: {e}"),
            Error::Overflow {
                requested_bits,
                max_bits,
            } => write!(
                f,
                "overflow: requested {requested_bits} bits, max representable is {max_bits}"
            ),
            Error::TransformLengthExceeded {
                requested,
                max_for_prime,
            } => write!(
                f,
                "transform length {requested} exceeds prime ceiling {max_for_prime}"
            ),
            Error::BackingStorage { path, source } => {
                write!(f, "backing storage error on {}: {source}", path.display())
            }
            Error::Invariant(msg) => write!(f, "internal invariant violated: {msg}"),
        }
    }
}

impl fmt::Display for ArithmeticError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArithmeticError::ZeroDivisor => write!(f, "division by zero"),
            ArithmeticError::ZerothRoot => write!(f, "0th root is undefined"),
            ArithmeticError::NegativeEvenRoot => write!(f, "even root of a negative number"),
            ArithmeticError::InverseOfZero => write!(f, "inverse of zero"),
        }
    }
}

impl fmt::Display for PrecisionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrecisionError::NonPositiveTarget => write!(f, "target precision must be positive"),
            PrecisionError::Unbounded => {
                write!(f, "infinite precision requested for a bounded operation")
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::BackingStorage { source, .. } => Some(source),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
