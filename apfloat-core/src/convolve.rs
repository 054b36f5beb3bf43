//! Three-modulus convolver (§4.H): for each of the three NTT primes
//! independently, forward-transforms both operands (sharing one storage
//! buffer — the second operand lives in the upper half), multiplies
//! pointwise, and inverse-transforms, producing one residue stream per
//! prime. `carry_crt` combines the three residue streams back into a single
//! base-`B` digit stream.
//!
//! Digit streams are most-significant-first at the public boundary (§3), but
//! positional convolution (`c[k] = sum_{i+j=k} a[i]*b[j]`) is only correct
//! when both operands are indexed by increasing power of the base, i.e.
//! least-significant-first. This module reverses both operands on the way
//! in; the residue streams it produces are therefore LSD-first, which is
//! also what `carry_crt` expects (see its module doc).
use crate::{
    context::Context,
    digit::Digit,
    error::Result,
    modmath::{ModInt, ModRing},
    primes::{Modulus, MODULI},
    storage::Storage,
    strategy::{self, Kernel, Plan},
};

/// The inverse-transformed pointwise product under one prime: `plan.rounded_len`
/// plain (non-Montgomery) residues in `[0, p)`, LSD-first, not yet
/// carry-propagated.
#[derive(Debug, Clone)]
pub struct Residue {
    pub modulus: Modulus,
    pub values: Vec<u64>,
}

/// The three residue streams of §4.H: the same product, viewed modulo each
/// of the three primes.
pub struct ConvolutionResult {
    pub residues: [Residue; 3],
}

/// Transform length needed to convolve operands of `in1_len` and `in2_len`
/// digits without cyclic wraparound corrupting the result.
pub fn transform_length_for(in1_len: usize, in2_len: usize) -> usize {
    in1_len + in2_len
}

fn digits_to_lsd_first_padded<D: Digit>(digits: &[D], len: usize) -> Vec<u64> {
    let mut out: Vec<u64> = digits.iter().rev().map(|d| d.to_u64()).collect();
    out.resize(len, 0);
    out
}

fn convolve_in_memory(ctx: &Context, ring: &ModRing, modulus: Modulus, plan: &Plan, a: &[u64], b: &[u64]) -> Result<Vec<u64>> {
    let l = plan.rounded_len;
    let mut buf: Vec<ModInt> = Vec::with_capacity(2 * l);
    buf.extend(a.iter().map(|&x| ring.to_montgomery(x)));
    buf.extend(b.iter().map(|&x| ring.to_montgomery(x)));

    let (lo, hi) = buf.split_at_mut(l);
    strategy::run_in_memory(ctx, ring, modulus, plan, lo)?;
    strategy::run_in_memory(ctx, ring, modulus, plan, hi)?;
    for i in 0..l {
        lo[i] = ring.mul(lo[i], hi[i]);
    }
    strategy::run_in_memory_inverse(ctx, ring, modulus, plan, lo)?;

    Ok(lo.iter().map(|&x| ring.from_montgomery(x)).collect())
}

fn convolve_on_disk(ctx: &Context, ring: &ModRing, modulus: Modulus, plan: &Plan, a: &[u64], b: &[u64]) -> Result<Vec<u64>> {
    let l = plan.rounded_len;
    let mut sa = Storage::<u64>::new_disk(ctx, l)?;
    let mut sb = Storage::<u64>::new_disk(ctx, l)?;
    let raw_a: Vec<u64> = a.iter().map(|&x| ring.to_montgomery(x).raw()).collect();
    let raw_b: Vec<u64> = b.iter().map(|&x| ring.to_montgomery(x).raw()).collect();
    sa.write(0, &raw_a)?;
    sb.write(0, &raw_b)?;

    strategy::run_on_disk(ctx, ring, modulus, plan, &mut sa)?;
    strategy::run_on_disk(ctx, ring, modulus, plan, &mut sb)?;

    // No single contiguous slice to index like the in-memory path, so the
    // pointwise multiply streams element-by-element.
    for i in 0..l {
        let va = ModInt::from_raw(sa.read(i, 1)?[0]);
        let vb = ModInt::from_raw(sb.read(i, 1)?[0]);
        sa.write(i, &[ring.mul(va, vb).raw()])?;
    }

    strategy::run_on_disk_inverse(ctx, ring, modulus, plan, &mut sa)?;
    Ok(sa
        .read(0, l)?
        .into_iter()
        .map(|r| ring.from_montgomery(ModInt::from_raw(r)))
        .collect())
}

/// The main entry into §4.H: convolves `a` and `b` (most-significant-digit
/// first) under all three NTT primes, producing the three residue streams
/// `carry_crt` combines into the final base-`B` product.
pub fn multiply<D: Digit>(ctx: &Context, a: &[D], b: &[D]) -> Result<ConvolutionResult> {
    let needed = transform_length_for(a.len(), b.len());
    let mut residues: Vec<Residue> = Vec::with_capacity(3);

    for modulus in MODULI {
        let ring = ModRing::from_modulus(modulus);
        let plan = strategy::plan_for(ctx, modulus, needed, std::mem::size_of::<u64>())?;
        let raw_a = digits_to_lsd_first_padded(a, plan.rounded_len);
        let raw_b = digits_to_lsd_first_padded(b, plan.rounded_len);

        let values = match plan.kernel {
            Kernel::Table | Kernel::SixStep => convolve_in_memory(ctx, &ring, modulus, &plan, &raw_a, &raw_b)?,
            Kernel::TwoPass => convolve_on_disk(ctx, &ring, modulus, &plan, &raw_a, &raw_b)?,
        };
        residues.push(Residue { modulus, values });
    }

    Ok(ConvolutionResult {
        residues: residues
            .try_into()
            .unwrap_or_else(|_| unreachable!("MODULI has exactly three entries")),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decimal_digits(mut n: u64) -> Vec<u32> {
        if n == 0 {
            return vec![0];
        }
        let mut digits = Vec::new();
        while n > 0 {
            digits.push((n % 10) as u32);
            n /= 10;
        }
        digits.reverse();
        digits
    }

    /// A residue reduced mod its own prime should, for small enough
    /// operands, equal the plain-integer product reduced mod that prime —
    /// a cheap cross-check before `carry_crt` is wired in to finish the job.
    #[test]
    fn residue_matches_plain_product_mod_each_prime() {
        let ctx = Context::default();
        let a = decimal_digits(12345);
        let b = decimal_digits(6789);
        let product = 12345u64 * 6789u64;

        let result = multiply(&ctx, &a, &b).unwrap();
        for residue in &result.residues {
            // Position 0 of the LSD-first residue is the ones' digit's
            // contribution only once carry-propagated; instead check the
            // whole residue stream sums (weighted by 10^k) to the right
            // value mod the prime, which the raw convolution guarantees
            // without needing carry_crt at all.
            let mut acc: u128 = 0;
            let mut weight: u128 = 1;
            for &v in &residue.values {
                acc = (acc + (v as u128) * weight) % residue.modulus.p as u128;
                weight = (weight * 10) % residue.modulus.p as u128;
            }
            assert_eq!(acc as u64, product % residue.modulus.p);
        }
    }

    #[test]
    fn zero_length_operand_gives_zero_residues() {
        let ctx = Context::default();
        let a: Vec<u32> = vec![];
        let b = decimal_digits(42);
        let result = multiply(&ctx, &a, &b).unwrap();
        for residue in &result.residues {
            assert!(residue.values.iter().all(|&v| v == 0));
        }
    }
}
