//! Six-step FNT (§4.D): in-RAM but out-of-cache, via a matrix reshape on top
//! of the Table FNT (§4.C).
//!
//! `n = n1 * n2` with both factors close to `sqrt(n)` (here: both powers of
//! two, `n1 = 2^floor(k/2)`, `n2 = 2^ceil(k/2)` for `n = 2^k`, so the inner
//! kernel stays a power-of-two Table FNT). Row/column transforms and the
//! twiddle multiply are independent per §5 and are fanned out with `rayon`,
//! the same parallelism idiom `ntt::ntt_nr` uses for its own row-group
//! butterflies.
//!
//! Indices: with `j = j1*n2 + j2` and `k = k2*n1 + k1`, the decomposition is
//! `X[k] = sum_j2 w2^{j2 k2} * ( w^{j2 k1} * sum_j1 x[j] w1^{j1 k1} )` where
//! `w1 = w^n2` is an `n1`-th root and `w2 = w^n1` is an `n2`-th root. A flat
//! buffer interpreted as an `(n2, n1)` row-major matrix at the very end has
//! position `k2*n1+k1 = k`, so no extra reindexing pass is needed — the last
//! transpose already leaves the result in natural order.
use crate::{
    fnt_table,
    modmath::{ModInt, ModRing},
    primes::Modulus,
};
use rayon::prelude::*;

/// Splits `n = 2^k` into `(n1, n2)` with `n1 <= n2`, both powers of two,
/// both as close to `sqrt(n)` as the power-of-two constraint allows.
pub fn split_dims(n: usize) -> (usize, usize) {
    debug_assert!(n.is_power_of_two());
    let k = n.trailing_zeros();
    let k1 = k / 2;
    (1usize << k1, 1usize << (k - k1))
}

/// Reinterprets a flat `rows * cols` row-major buffer as `cols * rows`.
fn transpose(values: &[ModInt], rows: usize, cols: usize) -> Vec<ModInt> {
    let mut out = vec![ModInt::raw_zero(); rows * cols];
    for i in 0..rows {
        for j in 0..cols {
            out[j * rows + i] = values[i * cols + j];
        }
    }
    out
}

/// Multiplies row `j` of a `(rows, row_len)` matrix by `twiddle^{j * i}` for
/// `i` in `0..row_len`, the elementwise twiddle step of §4.D.
fn apply_twiddle(ring: &ModRing, rows: &mut [ModInt], row_len: usize, twiddle: ModInt) {
    rows.par_chunks_mut(row_len).enumerate().for_each(|(j, row)| {
        let step = ring.pow(twiddle, j as u64);
        let mut w_pow = ring.to_montgomery(1);
        for cell in row.iter_mut() {
            *cell = ring.mul(*cell, w_pow);
            w_pow = ring.mul(w_pow, step);
        }
    });
}

/// Forward six-step transform, natural order in, natural order out (matches
/// `fnt_table::transform_natural`'s contract so the two kernels are
/// interchangeable behind the strategy selector, §4.G).
pub fn transform(ring: &ModRing, modulus: Modulus, values: &mut [ModInt]) {
    let n = values.len();
    if n <= 1 {
        return;
    }
    let (n1, n2) = split_dims(n);

    // Step 1: transpose (n1, n2) -> (n2, n1).
    let mut m = transpose(values, n1, n2);

    // Step 2: transform each of the n2 rows (original columns), length n1.
    let root_n1 = fnt_table::build_root_table(ring, modulus, n1, false);
    m.par_chunks_mut(n1)
        .for_each(|row| fnt_table::transform_natural(ring, row, &root_n1));

    // Step 3: multiply element (j, i) by w_n^{i*j}.
    let w_n = ring.nth_root(modulus.g, n as u64, false);
    apply_twiddle(ring, &mut m, n1, w_n);

    // Step 4: transpose (n2, n1) -> (n1, n2).
    let mut m = transpose(&m, n2, n1);

    // Step 5: transform each of the n1 rows, length n2.
    let root_n2 = fnt_table::build_root_table(ring, modulus, n2, false);
    m.par_chunks_mut(n2)
        .for_each(|row| fnt_table::transform_natural(ring, row, &root_n2));

    // Step 6: transpose (n1, n2) -> (n2, n1); this flat layout is already
    // natural order (see module doc).
    let out = transpose(&m, n1, n2);
    values.copy_from_slice(&out);
}

/// Inverse six-step transform, natural order in and out, division by `n`
/// folded into the two inner inverse transforms (`1/n1 * 1/n2 = 1/n`).
pub fn inverse_transform(ring: &ModRing, modulus: Modulus, values: &mut [ModInt]) {
    let n = values.len();
    if n <= 1 {
        return;
    }
    let (n1, n2) = split_dims(n);

    // Undo step 6: transpose (n2, n1) -> (n1, n2).
    let mut m = transpose(values, n2, n1);

    // Undo step 5: inverse-transform each of the n1 rows, length n2.
    let inv_root_n2 = fnt_table::build_root_table(ring, modulus, n2, true);
    m.par_chunks_mut(n2)
        .for_each(|row| fnt_table::inverse_transform_natural(ring, row, &inv_root_n2));

    // Undo step 4: transpose (n1, n2) -> (n2, n1).
    let mut m = transpose(&m, n1, n2);

    // Undo step 3: multiply by the inverse twiddle.
    let w_n_inv = ring.nth_root(modulus.g, n as u64, true);
    apply_twiddle(ring, &mut m, n1, w_n_inv);

    // Undo step 2: inverse-transform each of the n2 rows, length n1.
    let inv_root_n1 = fnt_table::build_root_table(ring, modulus, n1, true);
    m.par_chunks_mut(n1)
        .for_each(|row| fnt_table::inverse_transform_natural(ring, row, &inv_root_n1));

    // Undo step 1: transpose (n2, n1) -> (n1, n2), the original layout.
    let out = transpose(&m, n2, n1);
    values.copy_from_slice(&out);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primes::MODULI;
    use proptest::prelude::*;

    #[test]
    fn split_dims_multiply_back_to_n() {
        for k in 0..16 {
            let n = 1usize << k;
            let (n1, n2) = split_dims(n);
            assert_eq!(n1 * n2, n);
            assert!(n1 <= n2);
        }
    }

    #[test]
    fn matches_table_fnt_roundtrip() {
        let modulus = MODULI[0];
        let ring = ModRing::from_modulus(modulus);
        for k in 2..10 {
            let n = 1usize << k;
            let values: Vec<u64> = (0..n as u64).map(|i| (i * 31 + 5) % modulus.p).collect();
            let mut v: Vec<ModInt> = values.iter().map(|&x| ring.to_montgomery(x)).collect();
            transform(&ring, modulus, &mut v);
            inverse_transform(&ring, modulus, &mut v);
            let back: Vec<u64> = v.into_iter().map(|x| ring.from_montgomery(x)).collect();
            assert_eq!(back, values, "n={n}");
        }
    }

    #[test]
    fn agrees_with_table_fnt_spectrum() {
        // The six-step spectrum must equal the Table FNT spectrum (after
        // bit-reversal) since both compute the same DFT over the same ring.
        let modulus = MODULI[0];
        let ring = ModRing::from_modulus(modulus);
        let n = 64usize;
        let values: Vec<u64> = (0..n as u64).map(|i| (i * 7 + 1) % modulus.p).collect();

        let mut six = values.iter().map(|&x| ring.to_montgomery(x)).collect::<Vec<_>>();
        transform(&ring, modulus, &mut six);

        let table_fwd = fnt_table::build_root_table(&ring, modulus, n, false);
        let mut table = values.iter().map(|&x| ring.to_montgomery(x)).collect::<Vec<_>>();
        fnt_table::transform_natural(&ring, &mut table, &table_fwd);

        let six_plain: Vec<u64> = six.into_iter().map(|x| ring.from_montgomery(x)).collect();
        let table_plain: Vec<u64> = table.into_iter().map(|x| ring.from_montgomery(x)).collect();
        assert_eq!(six_plain, table_plain);
    }

    proptest! {
        #[test]
        fn roundtrip_random(k in 2u32..8, seed in 0u64..1000) {
            let modulus = MODULI[1];
            let ring = ModRing::from_modulus(modulus);
            let n = 1usize << k;
            let values: Vec<u64> = (0..n).map(|i| (seed + i as u64 * 17) % modulus.p).collect();
            let mut v: Vec<ModInt> = values.iter().map(|&x| ring.to_montgomery(x)).collect();
            transform(&ring, modulus, &mut v);
            inverse_transform(&ring, modulus, &mut v);
            let back: Vec<u64> = v.into_iter().map(|x| ring.from_montgomery(x)).collect();
            prop_assert_eq!(back, values);
        }
    }
}
