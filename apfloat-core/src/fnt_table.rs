//! Table FNT (§4.C): the in-cache, length `n = 2^k` kernel every other
//! strategy (Six-step, Two-pass, Factor-3) is built on top of.
//!
//! Forward is Sande-Tukey decimation-in-frequency (natural order in,
//! bit-reversed order out); inverse is Cooley-Tukey decimation-in-time
//! (bit-reversed order in, natural order out). Composing them directly
//! (`forward_dif` then `inverse_dit`, as the three-modulus convolver does)
//! needs no bit-reversal pass at all — that's the classical trick; a
//! `bit_reverse_permute` is still provided for callers (Six-step, Two-pass)
//! that need a natural-order spectrum to index by `(i, j)`.
use crate::{
    error::{Error, Result},
    modmath::{ModInt, ModRing},
    primes::Modulus,
};

/// Builds the length-`n/2` `wTable` of `w^0 .. w^{n/2-1}` for a power-of-two
/// transform length `n`, the root table described in §3.
pub fn build_root_table(ring: &ModRing, modulus: Modulus, n: usize, inverse: bool) -> Vec<ModInt> {
    debug_assert!(n.is_power_of_two());
    let half = n / 2;
    let mut table = Vec::with_capacity(half.max(1));
    if half == 0 {
        return table;
    }
    let w = ring.nth_root(modulus.g, n as u64, inverse);
    let mut acc = ring.to_montgomery(1);
    for _ in 0..half {
        table.push(acc);
        acc = ring.mul(acc, w);
    }
    table
}

/// Validates `n` against the prime's `2^m` ceiling (§4.C constraint) and that
/// it fits in a signed 32-bit index, matching the original's array-indexing
/// limit.
pub fn check_length(n: usize, modulus: Modulus) -> Result<()> {
    let max = modulus.max_transform_len();
    if n as u64 > max {
        return Err(Error::TransformLengthExceeded {
            requested: n as u64,
            max_for_prime: max,
        });
    }
    if n > i32::MAX as usize {
        return Err(Error::TransformLengthExceeded {
            requested: n as u64,
            max_for_prime: i32::MAX as u64,
        });
    }
    Ok(())
}

/// Forward Sande-Tukey DIF. `values.len()` must be a power of two;
/// `root_table` must have `len()/2` entries (`build_root_table(.., false)`).
/// Leaves `values` in bit-reversed order.
pub fn forward_dif(ring: &ModRing, values: &mut [ModInt], root_table: &[ModInt]) {
    let n = values.len();
    if n <= 1 {
        return;
    }
    debug_assert!(n.is_power_of_two());
    debug_assert_eq!(root_table.len(), n / 2);

    let mut len = n;
    while len > 1 {
        let half = len / 2;
        let stride = n / len;
        if half == 1 {
            // Innermost pair: twiddle is always root_table[0] == 1, so skip
            // the modular multiply (§4.C).
            for block in (0..n).step_by(len) {
                let (u, v) = (values[block], values[block + 1]);
                values[block] = ring.add(u, v);
                values[block + 1] = ring.subtract(u, v);
            }
        } else {
            for block in (0..n).step_by(len) {
                for j in 0..half {
                    let w = root_table[j * stride];
                    let u = values[block + j];
                    let v = values[block + j + half];
                    values[block + j] = ring.add(u, v);
                    values[block + j + half] = ring.mul(ring.subtract(u, v), w);
                }
            }
        }
        len = half;
    }
}

/// Inverse Cooley-Tukey DIT. Expects `values` in bit-reversed order (as
/// `forward_dif` leaves it); `root_table` must be the *inverse* root table
/// (`build_root_table(.., true)`). Leaves `values` in natural order, **not**
/// yet divided by `n` — per §4.C the caller does that division mod the
/// active prime.
pub fn inverse_dit(ring: &ModRing, values: &mut [ModInt], root_table: &[ModInt]) {
    let n = values.len();
    if n <= 1 {
        return;
    }
    debug_assert!(n.is_power_of_two());
    debug_assert_eq!(root_table.len(), n / 2);

    let mut len = 2;
    while len <= n {
        let half = len / 2;
        let stride = n / len;
        if half == 1 {
            for block in (0..n).step_by(len) {
                let (u, v) = (values[block], values[block + 1]);
                values[block] = ring.add(u, v);
                values[block + 1] = ring.subtract(u, v);
            }
        } else {
            for block in (0..n).step_by(len) {
                for j in 0..half {
                    let w = root_table[j * stride];
                    let u = values[block + j];
                    let v = ring.mul(values[block + j + half], w);
                    values[block + j] = ring.add(u, v);
                    values[block + j + half] = ring.subtract(u, v);
                }
            }
        }
        len *= 2;
    }
}

/// Divides every element by `n` mod the active prime — the final step of an
/// inverse transform that `inverse_dit` leaves to the caller.
pub fn scale_by_inverse_length(ring: &ModRing, values: &mut [ModInt], n: usize) {
    if n <= 1 {
        return;
    }
    let inv_n = ring
        .inverse(ring.to_montgomery(n as u64 % ring.modulus))
        .expect("transform length is never a multiple of the prime");
    for v in values.iter_mut() {
        *v = ring.mul(*v, inv_n);
    }
}

pub fn bit_reverse_permutation(n: usize) -> Vec<u32> {
    debug_assert!(n.is_power_of_two());
    let bits = n.trailing_zeros();
    (0..n as u32)
        .map(|i| i.reverse_bits() >> (u32::BITS - bits.max(1)))
        .collect()
}

pub fn apply_bit_reverse_permutation(values: &mut [ModInt], table: &[u32]) {
    let n = values.len();
    for i in 0..n {
        let j = table[i] as usize;
        if i < j {
            values.swap(i, j);
        }
    }
}

/// Natural-order-in, natural-order-out forward transform (used by Six-step
/// and Two-pass, which index the spectrum by `(row, col)`).
pub fn transform_natural(ring: &ModRing, values: &mut [ModInt], root_table: &[ModInt]) {
    let n = values.len();
    forward_dif(ring, values, root_table);
    apply_bit_reverse_permutation(values, &bit_reverse_permutation(n));
}

/// Natural-order-in, natural-order-out inverse transform (division by `n`
/// included).
pub fn inverse_transform_natural(ring: &ModRing, values: &mut [ModInt], root_table: &[ModInt]) {
    let n = values.len();
    apply_bit_reverse_permutation(values, &bit_reverse_permutation(n));
    inverse_dit(ring, values, root_table);
    scale_by_inverse_length(ring, values, n);
}
