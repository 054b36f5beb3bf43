pub mod bigdec;
pub mod carry_crt;
pub mod context;
pub mod convolve;
pub mod digit;
pub mod error;
pub mod factor3;
pub mod fnt_six_step;
pub mod fnt_table;
pub mod fnt_two_pass;
pub mod message_passer;
pub mod modmath;
pub mod newton;
pub mod parallel;
pub mod primes;
pub mod storage;
pub mod strategy;
#[cfg(test)]
pub(crate) mod testutil;
pub mod wide;

pub use crate::{
    bigdec::BigDecimal,
    context::Context,
    convolve::{ConvolutionResult, Residue},
    digit::Digit,
    error::{ArithmeticError, Error, PrecisionError, Result},
    message_passer::MessagePasser,
    newton::{divide, exp, inverse_root, ln, pi, reciprocal, sqrt},
    primes::{Modulus, MODULI},
};
