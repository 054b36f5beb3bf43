//! Carry-CRT finalizer (§4.I): combines the three residue streams `H`
//! produces back into a single base-`B` digit stream via CRT reconstruction
//! plus carry propagation.
//!
//! As in `convolve`, residue streams are LSD-first internally (index `0` is
//! the least significant convolution position) since that is the only
//! order in which a running carry can thread correctly through a single
//! ascending pass. The final output is reversed back to the public
//! most-significant-first digit stream (§3) before being returned.
use crate::{
    context::Context,
    error::{Error, Result},
    message_passer::MessagePasser,
    parallel,
    primes::{m012, M01, M02, M12, P0, P1, P2, T0, T1, T2},
    wide::U256,
};
use rayon::prelude::*;
use std::sync::Mutex;

fn mulmod_plain(a: u64, b: u64, modulus: u64) -> u64 {
    ((a as u128) * (b as u128) % modulus as u128) as u64
}

/// The CRT reconstruction of the three residues at one position, reduced
/// into `[0, M012)` by conditional subtraction after each add (§4.I step 1-2).
fn crt_sum(residues: &[Vec<u64>; 3], pos: usize, m012: U256) -> U256 {
    let y0 = mulmod_plain(T0, residues[0][pos], P0.p);
    let y1 = mulmod_plain(T1, residues[1][pos], P1.p);
    let y2 = mulmod_plain(T2, residues[2][pos], P2.p);

    let term0 = U256::mul_u128(y0 as u128, M12).reduce_mod(m012);
    let term1 = U256::mul_u128(y1 as u128, M02).reduce_mod(m012);
    let term2 = U256::mul_u128(y2 as u128, M01).reduce_mod(m012);

    let (s1, _) = term0.add(term1);
    let s1 = s1.reduce_mod(m012);
    let (s2, _) = s1.add(term2);
    s2.reduce_mod(m012)
}

/// One step of the running accumulator: adds `sum` to `carry`, divides by
/// `base`, returning `(new_carry, digit)`.
fn step(carry: U256, sum: U256, base: u64) -> (U256, u64) {
    let (acc, overflow) = carry.add(sum);
    debug_assert!(!overflow, "carry-CRT accumulator overflowed 256 bits");
    acc.divmod_u64(base)
}

fn validate(residues: &[Vec<u64>; 3], result_size: usize) -> Result<usize> {
    let s = residues[0].len();
    if residues[1].len() != s || residues[2].len() != s {
        return Err(Error::Invariant("carry-CRT: residue streams have mismatched lengths"));
    }
    if result_size > s {
        return Err(Error::Invariant("carry-CRT: result_size exceeds residue stream length"));
    }
    Ok(s)
}

/// Reverses the LSD-first working digits (plus the final overflow digit)
/// into the public MSD-first stream, discarding the high-order excess from
/// zero-padding (§4.I: "the first `S - resultSize + 1` emitted digits are
/// discarded"). Asserts the §8 property-3 invariant that the residual carry
/// fits in a single base-`B` digit ("top two carry digits are zero").
fn finalize(mut digits_lsd_first: Vec<u64>, carry: U256, base: u64, result_size: usize) -> Result<Vec<u64>> {
    if carry >= U256::from_u64(base) {
        return Err(Error::Invariant(
            "carry-CRT: residual carry exceeds one digit (top two carry digits must be zero)",
        ));
    }
    digits_lsd_first.push(carry.low_u64());
    digits_lsd_first.reverse();
    let discard = digits_lsd_first
        .len()
        .checked_sub(result_size)
        .ok_or(Error::Invariant("carry-CRT: result_size exceeds produced digit count"))?;
    Ok(digits_lsd_first[discard..].to_vec())
}

/// Single-threaded carry-CRT pass (§4.I algorithm, single pass).
pub fn carry_crt_serial(residues: &[Vec<u64>; 3], result_size: usize, base: u64) -> Result<Vec<u64>> {
    let s = validate(residues, result_size)?;
    let m012 = m012();
    let mut carry = U256::ZERO;
    let mut digits_lsd_first = Vec::with_capacity(s + 1);
    for pos in 0..s {
        let sum = crt_sum(residues, pos, m012);
        let (new_carry, digit) = step(carry, sum, base);
        digits_lsd_first.push(digit);
        carry = new_carry;
    }
    finalize(digits_lsd_first, carry, base, result_size)
}

/// Parallel carry-CRT pass (§5 "Parallel mode"). The per-position CRT sums
/// are embarrassingly parallel (computed independently per block); the
/// finish phase that turns those sums into digits is strictly ordered by
/// block offset, each block receiving its predecessor's outgoing carry
/// through a [`MessagePasser`] rather than running on a single thread. Since
/// the finish phase performs the exact same `step` sequence the serial pass
/// would, just split across blocks, the result is identical to
/// [`carry_crt_serial`] for the same inputs (§8 property 4, "parallel =
/// serial").
pub fn carry_crt_parallel(ctx: &Context, residues: &[Vec<u64>; 3], result_size: usize, base: u64) -> Result<Vec<u64>> {
    let s = validate(residues, result_size)?;
    if s == 0 {
        return finalize(Vec::new(), U256::ZERO, base, result_size);
    }
    let num_blocks = ctx.num_processors.max(1).min(s);
    if num_blocks <= 1 {
        return carry_crt_serial(residues, result_size, base);
    }

    let m012 = m012();
    let block_len = s.div_ceil(num_blocks);
    let blocks: Vec<(usize, usize)> = (0..s)
        .step_by(block_len)
        .map(|start| (start, block_len.min(s - start)))
        .collect();

    // Preliminary phase: per-position CRT sums, independent across blocks
    // (§5 "the pointwise multiply in H commutes across the storage" — same
    // idea applies here, one position's sum doesn't depend on any other's).
    // Both phases run inside `ctx`'s thread-count scope so `num_processors`
    // actually bounds how many threads do the work, not just how many
    // blocks the work is split into.
    let passer: MessagePasser<U256> = MessagePasser::new();
    let block_digits: Vec<Mutex<Vec<u64>>> = blocks.iter().map(|_| Mutex::new(Vec::new())).collect();

    parallel::install(ctx, || {
        let block_sums: Vec<Vec<U256>> = blocks
            .par_iter()
            .map(|&(start, len)| (start..start + len).map(|pos| crt_sum(residues, pos, m012)).collect())
            .collect();

        // Finish phase: strictly ordered by block offset via the message passer.
        rayon::scope(|scope| {
            for (idx, sums) in block_sums.iter().enumerate() {
                let passer = &passer;
                let block_digits = &block_digits;
                scope.spawn(move |_| {
                    let mut carry = if idx == 0 { U256::ZERO } else { passer.receive(idx - 1) };
                    let mut digits = Vec::with_capacity(sums.len());
                    for &sum in sums {
                        let (new_carry, digit) = step(carry, sum, base);
                        digits.push(digit);
                        carry = new_carry;
                    }
                    *block_digits[idx].lock().unwrap() = digits;
                    passer.send(idx, carry);
                });
            }
        });
    });

    let final_carry = passer.receive(blocks.len() - 1);
    let mut all_digits = Vec::with_capacity(s + 1);
    for d in &block_digits {
        all_digits.extend(d.lock().unwrap().iter().copied());
    }
    finalize(all_digits, final_carry, base, result_size)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convolve;

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

    fn digits_to_u64(digits: &[u64]) -> u128 {
        digits.iter().fold(0u128, |acc, &d| acc * 10 + d as u128)
    }

    #[test]
    fn matches_known_small_product() {
        let ctx = Context::default();
        let a = decimal_digits(12345);
        let b = decimal_digits(6789);
        let expected = 12345u128 * 6789u128;

        let conv = convolve::multiply(&ctx, &a, &b).unwrap();
        let residues: [Vec<u64>; 3] = [
            conv.residues[0].values.clone(),
            conv.residues[1].values.clone(),
            conv.residues[2].values.clone(),
        ];
        let s = residues[0].len();
        let result = carry_crt_serial(&residues, s + 1, 10).unwrap();
        assert_eq!(digits_to_u64(&result), expected);
    }

    #[test]
    fn spec_example_one() {
        let ctx = Context::default();
        let a: Vec<u32> = "12345678901234567890".chars().map(|c| c.to_digit(10).unwrap()).collect();
        let b: Vec<u32> = "98765432109876543210".chars().map(|c| c.to_digit(10).unwrap()).collect();
        let expected = "1219326311370217952237463801111263526900";

        let conv = convolve::multiply(&ctx, &a, &b).unwrap();
        let residues: [Vec<u64>; 3] = [
            conv.residues[0].values.clone(),
            conv.residues[1].values.clone(),
            conv.residues[2].values.clone(),
        ];
        let s = residues[0].len();
        let result = carry_crt_serial(&residues, s + 1, 10).unwrap();
        let digits: String = result
            .into_iter()
            .skip_while(|&d| d == 0)
            .map(|d| std::char::from_digit(d as u32, 10).unwrap())
            .collect();
        assert_eq!(digits, expected);
    }

    #[test]
    fn parallel_matches_serial() {
        let ctx = Context::default();
        let a: Vec<u32> = "12345678901234567890".chars().map(|c| c.to_digit(10).unwrap()).collect();
        let b: Vec<u32> = "98765432109876543210".chars().map(|c| c.to_digit(10).unwrap()).collect();

        let conv = convolve::multiply(&ctx, &a, &b).unwrap();
        let residues: [Vec<u64>; 3] = [
            conv.residues[0].values.clone(),
            conv.residues[1].values.clone(),
            conv.residues[2].values.clone(),
        ];
        let s = residues[0].len();

        let serial = carry_crt_serial(&residues, s + 1, 10).unwrap();
        let mut many_threads_ctx = ctx.clone();
        many_threads_ctx.num_processors = 6;
        let parallel = carry_crt_parallel(&many_threads_ctx, &residues, s + 1, 10).unwrap();
        assert_eq!(serial, parallel);
    }

    #[test]
    fn mismatched_residue_lengths_is_an_error() {
        let residues: [Vec<u64>; 3] = [vec![1, 2], vec![1, 2, 3], vec![1, 2]];
        assert!(carry_crt_serial(&residues, 2, 10).is_err());
    }

    /// Cross-checks the NTT path end to end against the schoolbook reference
    /// (§8 property 1) for a handful of multi-digit operand pairs.
    #[test]
    fn matches_schoolbook_reference_for_several_operands() {
        use crate::testutil::schoolbook_multiply;

        let ctx = Context::default();
        let cases: [(&[u32], &[u32]); 3] = [
            (&[9, 9, 9, 9], &[9, 9, 9, 9]),
            (&[1, 0, 0, 0, 0, 0, 0, 0, 1], &[7]),
            (&[3, 1, 4, 1, 5, 9, 2, 6], &[2, 7, 1, 8, 2, 8]),
        ];

        for (a, b) in cases {
            let expected = schoolbook_multiply(a, b, 10);
            let conv = convolve::multiply(&ctx, a, b).unwrap();
            let residues: [Vec<u64>; 3] = [
                conv.residues[0].values.clone(),
                conv.residues[1].values.clone(),
                conv.residues[2].values.clone(),
            ];
            let s = residues[0].len();
            let actual = carry_crt_serial(&residues, s + 1, 10).unwrap();
            let actual: Vec<u64> = actual.into_iter().skip_while(|&d| d == 0).collect();
            let actual = if actual.is_empty() { vec![0] } else { actual };
            assert_eq!(actual, expected, "mismatch for {a:?} * {b:?}");
        }
    }
}
