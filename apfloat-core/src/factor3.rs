//! Factor-3 wrapper (§4.F): extends a power-of-two strategy (Table or
//! Six-step) to transform lengths `L = 3 * p` for `p` a power of two.
//!
//! The length-3 DFT is the WFTA/Winograd 3-point form: with `w3` a
//! primitive cube root of unity, `w1 = -3/2`, and `w2 = w3 + 1/2`,
//!
//! ```text
//! m1 = x1 + x2
//! X0 = x0 + m1
//! t2 = X0 + w1 * m1         (= x0 - m1/2)
//! u  = w2 * (x1 - x2)       (= w3*(x1-x2) + (x1-x2)/2)
//! X1 = t2 + u
//! X2 = t2 - u
//! ```
//!
//! which is `x0 + w3*x1 + w3^2*x2` and `x0 + w3^2*x1 + w3*x2` respectively
//! (using `w3^2 = -1 - w3`) — the standard radix-3 DFT, computed with two
//! multiplies instead of four.
use crate::{
    modmath::{ModInt, ModRing},
    primes::Modulus,
};

fn neg_three_halves(ring: &ModRing) -> ModInt {
    let two = ring.to_montgomery(2);
    let three = ring.to_montgomery(3);
    ring.negate(
        ring.mod_divide(three, two)
            .expect("2 is invertible mod any of the three NTT primes"),
    )
}

fn half(ring: &ModRing) -> ModInt {
    ring.inverse(ring.to_montgomery(2))
        .expect("2 is invertible mod any of the three NTT primes")
}

/// One length-3 butterfly: `(x0, x1, x2) -> (X0, X1, X2)` using the cube
/// root `w3` (forward: `g^((p-1)/3)`; inverse: its reciprocal).
fn butterfly3(ring: &ModRing, w1: ModInt, w2: ModInt, x0: ModInt, x1: ModInt, x2: ModInt) -> (ModInt, ModInt, ModInt) {
    let m1 = ring.add(x1, x2);
    let m2 = ring.subtract(x1, x2);
    let big_x0 = ring.add(x0, m1);
    let t2 = ring.add(big_x0, ring.mul(w1, m1));
    let u = ring.mul(w2, m2);
    (big_x0, ring.add(t2, u), ring.subtract(t2, u))
}

/// Forward transform of length `3 * p`. `inner` is applied independently to
/// each of the three contiguous length-`p` sub-arrays after the length-3 DFT
/// across columns (§4.F step order).
pub fn transform<F>(ring: &ModRing, modulus: Modulus, values: &mut [ModInt], p: usize, mut inner: F)
where
    F: FnMut(&mut [ModInt]),
{
    debug_assert_eq!(values.len(), 3 * p);
    let w3 = ring.nth_root(modulus.g, 3, false);
    let w1 = neg_three_halves(ring);
    let w2 = ring.add(w3, half(ring));

    let (a, rest) = values.split_at_mut(p);
    let (b, c) = rest.split_at_mut(p);
    for j in 0..p {
        let (y0, y1, y2) = butterfly3(ring, w1, w2, a[j], b[j], c[j]);
        a[j] = y0;
        b[j] = y1;
        c[j] = y2;
    }

    inner(a);
    inner(b);
    inner(c);
}

/// Inverse transform of length `3 * p`: each sub-array is inverse-transformed
/// first ("inverse reverses the order", §4.F), then the inverse length-3 DFT
/// (cube root replaced by its reciprocal, scaled by `1/3`) recombines them.
pub fn inverse_transform<F>(ring: &ModRing, modulus: Modulus, values: &mut [ModInt], p: usize, mut inner: F)
where
    F: FnMut(&mut [ModInt]),
{
    debug_assert_eq!(values.len(), 3 * p);
    let (a, rest) = values.split_at_mut(p);
    let (b, c) = rest.split_at_mut(p);

    inner(a);
    inner(b);
    inner(c);

    let w3_inv = ring.nth_root(modulus.g, 3, true);
    let w1 = neg_three_halves(ring);
    let w2 = ring.add(w3_inv, half(ring));
    let three_inv = ring
        .inverse(ring.to_montgomery(3))
        .expect("3 is invertible mod any of the three NTT primes");

    for j in 0..p {
        let (y0, y1, y2) = butterfly3(ring, w1, w2, a[j], b[j], c[j]);
        a[j] = ring.mul(y0, three_inv);
        b[j] = ring.mul(y1, three_inv);
        c[j] = ring.mul(y2, three_inv);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{fnt_table, primes::MODULI};
    use proptest::prelude::*;

    fn table_inner<'a>(ring: &'a ModRing, modulus: Modulus, forward: bool) -> impl FnMut(&mut [ModInt]) + 'a {
        move |row: &mut [ModInt]| {
            let table = fnt_table::build_root_table(ring, modulus, row.len(), !forward);
            if forward {
                fnt_table::transform_natural(ring, row, &table);
            } else {
                fnt_table::inverse_transform_natural(ring, row, &table);
            }
        }
    }

    #[test]
    fn roundtrip_small() {
        for modulus in MODULI {
            let ring = ModRing::from_modulus(modulus);
            for k in 0..6 {
                let p = 1usize << k;
                let n = 3 * p;
                let values: Vec<u64> = (0..n as u64).map(|i| (i * 5 + 1) % modulus.p).collect();
                let mut v: Vec<ModInt> = values.iter().map(|&x| ring.to_montgomery(x)).collect();

                transform(&ring, modulus, &mut v, p, table_inner(&ring, modulus, true));
                inverse_transform(&ring, modulus, &mut v, p, table_inner(&ring, modulus, false));

                let back: Vec<u64> = v.into_iter().map(|x| ring.from_montgomery(x)).collect();
                assert_eq!(back, values, "p={p}");
            }
        }
    }

    #[test]
    fn length_three_matches_direct_dft() {
        // p = 1: the wrapper degenerates to exactly the bare 3-point DFT,
        // checkable against the textbook matrix directly.
        let modulus = MODULI[0];
        let ring = ModRing::from_modulus(modulus);
        let w = ring.nth_root(modulus.g, 3, false);

        let xs = [7u64, 19, 31];
        let mut v: Vec<ModInt> = xs.iter().map(|&x| ring.to_montgomery(x)).collect();
        transform(&ring, modulus, &mut v, 1, |_| {});
        let got: Vec<u64> = v.iter().map(|&x| ring.from_montgomery(x)).collect();

        let w1 = ring.from_montgomery(w);
        let w2 = mulmod(w1, w1, modulus.p);
        let expect = |coeffs: [u64; 3]| -> u64 {
            let mut acc = 0u128;
            for (x, c) in xs.iter().zip(coeffs.iter()) {
                acc += (*x as u128) * (*c as u128);
            }
            (acc % modulus.p as u128) as u64
        };
        assert_eq!(got[0], expect([1, 1, 1]));
        assert_eq!(got[1], expect([1, w1, w2]));
        assert_eq!(got[2], expect([1, w2, w1]));
    }

    fn mulmod(a: u64, b: u64, p: u64) -> u64 {
        ((a as u128) * (b as u128) % p as u128) as u64
    }

    proptest! {
        #[test]
        fn roundtrip_random(k in 0u32..5, seed in 0u64..1000) {
            let modulus = MODULI[2];
            let ring = ModRing::from_modulus(modulus);
            let p = 1usize << k;
            let n = 3 * p;
            let values: Vec<u64> = (0..n).map(|i| (seed + i as u64 * 23) % modulus.p).collect();
            let mut v: Vec<ModInt> = values.iter().map(|&x| ring.to_montgomery(x)).collect();

            transform(&ring, modulus, &mut v, p, table_inner(&ring, modulus, true));
            inverse_transform(&ring, modulus, &mut v, p, table_inner(&ring, modulus, false));

            let back: Vec<u64> = v.into_iter().map(|x| ring.from_montgomery(x)).collect();
            prop_assert_eq!(back, values);
        }
    }
}
