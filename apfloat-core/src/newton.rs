//! Newton driver (§4.J): the shared precision-doubling skeleton behind
//! inverse-root, `log`, and `exp`. Each caller supplies a residual closure
//! (the thing that should converge to zero) and a small-integer divisor;
//! this module owns precision bookkeeping, truncation, and the "precising"
//! final correction that recovers the half-ulp accuracy the last doubling
//! would otherwise lose.
use crate::{
    bigdec::BigDecimal,
    context::Context,
    digit::Digit,
    error::{Error, PrecisionError, Result},
};

/// Guard digits carried above the precision actually needed, so truncating
/// intermediate residuals doesn't erode the final result below `target`.
pub const EXTRA_PRECISION: usize = 2;

/// Smallest `k` such that `p * 2^k >= target` — the number of doubling
/// steps the main loop performs, matching the loop's own `p <- 2p` exactly.
fn ceil_log2_ratio(target: usize, p: usize) -> u32 {
    let mut iterations = 0u32;
    let mut cur = p;
    while cur < target {
        cur = cur.saturating_mul(2);
        iterations += 1;
    }
    iterations
}

/// The iteration (counted the same way the main loop's post-decrement
/// `iterations` variable is) at which one extra full-precision correction
/// step is needed: the last point at which doubling the *guarded* starting
/// precision (`p0 - EXTRA_PRECISION`) through the remaining iterations would
/// still clear `target`. Iterations after this one only have `target`'s own
/// headroom to work with, not the initial guard on top of it.
fn precising_iteration(p0: usize, target: usize, total_iterations: u32) -> u32 {
    let guarded = p0.saturating_sub(EXTRA_PRECISION).max(1);
    let mut chosen = 0u32;
    for k in 0..total_iterations {
        let remaining_doublings = total_iterations - k;
        let projected = if remaining_doublings >= usize::BITS {
            usize::MAX
        } else {
            guarded.saturating_mul(1usize << remaining_doublings)
        };
        if projected >= target {
            chosen = k;
        }
    }
    chosen
}

/// Runs the generic Newton skeleton of §4.J: starting from `initial_guess`
/// at `initial_precision` digits, doubles precision until `target` is
/// reached, calling `residual_at` each iteration to get `r` (the quantity
/// that should converge to zero) and updating `estimate <- estimate +
/// estimate * r / divisor`.
pub fn iterate<D, R>(
    ctx: &Context,
    initial_guess: BigDecimal<D>,
    initial_precision: usize,
    target: usize,
    divisor: u64,
    mut residual_at: R,
) -> Result<BigDecimal<D>>
where
    D: Digit,
    R: FnMut(&Context, &BigDecimal<D>, usize) -> Result<BigDecimal<D>>,
{
    if target == 0 {
        return Err(Error::Precision(PrecisionError::NonPositiveTarget));
    }
    let p0 = initial_precision.max(1);
    let mut estimate = initial_guess.with_precision(p0);
    if p0 >= target {
        return Ok(estimate.with_precision(target));
    }

    let total_iterations = ceil_log2_ratio(target, p0);
    let precising_iteration = precising_iteration(p0, target, total_iterations);

    let update = |ctx: &Context, estimate: &BigDecimal<D>, r: &BigDecimal<D>, divisor: u64| -> Result<BigDecimal<D>> {
        let correction = estimate.multiply(ctx, r)?.divide_small(divisor)?;
        Ok(estimate.add(&correction))
    };

    let mut p = p0;
    let mut iterations = total_iterations;
    while iterations > 0 {
        iterations -= 1;
        p *= 2;
        estimate = estimate.with_precision(p.min(target));

        let mut r = residual_at(ctx, &estimate, p)?;
        if iterations < precising_iteration {
            r = r.with_precision((p / 2).max(1));
        }
        estimate = update(ctx, &estimate, &r, divisor)?;

        if iterations == precising_iteration {
            estimate = estimate.with_precision(target);
            let r_full = residual_at(ctx, &estimate, target)?;
            estimate = update(ctx, &estimate, &r_full, divisor)?;
        }
    }

    Ok(estimate.with_precision(target))
}

/// `inverse_root(x, n)`: the Newton iteration for `x^{-1/n}`, residual
/// `r = 1 - x * estimate^n`, divisor `n`. `n = 2` is the common `1/sqrt(x)`
/// case `sqrt` is built from (`sqrt(x) = x * inverse_root(x, 2)`).
pub fn inverse_root<D: Digit>(
    ctx: &Context,
    x: &BigDecimal<D>,
    n: u64,
    initial_guess: BigDecimal<D>,
    initial_precision: usize,
    target: usize,
) -> Result<BigDecimal<D>> {
    if n == 0 {
        return Err(Error::Arithmetic(crate::error::ArithmeticError::ZerothRoot));
    }
    if x.is_zero() {
        return Err(Error::Arithmetic(crate::error::ArithmeticError::InverseOfZero));
    }
    if x.negative && n % 2 == 0 {
        return Err(Error::Arithmetic(crate::error::ArithmeticError::NegativeEvenRoot));
    }

    let x = x.clone();
    iterate(ctx, initial_guess, initial_precision, target, n, move |ctx, estimate, p| {
        let x_at_p = x.with_precision(p);
        let mut power = estimate.with_precision(p);
        for _ in 1..n {
            power = power.multiply(ctx, estimate)?;
            power = power.with_precision(p);
        }
        let product = x_at_p.multiply(ctx, &power)?.with_precision(p);
        let one = BigDecimal::from_u64(1, estimate.base).with_precision(p);
        Ok(one.subtract(&product))
    })
}

/// `sqrt(x) = x * inverse_root(x, 2)`, the one-ulp-correct convergence
/// property of §8 property 6 (`sqrt(x)^2 = x`).
pub fn sqrt<D: Digit>(
    ctx: &Context,
    x: &BigDecimal<D>,
    initial_guess: BigDecimal<D>,
    initial_precision: usize,
    target: usize,
) -> Result<BigDecimal<D>> {
    let inv = inverse_root(ctx, x, 2, initial_guess, initial_precision, target + EXTRA_PRECISION)?;
    Ok(x.multiply(ctx, &inv)?.with_precision(target))
}

/// Digit count the Newton seeds below are built to: enough for an `f64`
/// mantissa (~15-17 decimal digits) to carry through the base conversion
/// with a couple of digits to spare.
const SEED_PRECISION: usize = 12;

/// A resource ceiling on `exp`'s argument: beyond this many bits of integer
/// part the result would need more digits than this crate is prepared to
/// materialize in one `BigDecimal`. Arbitrary but generous — 2^24 bits is
/// already a multi-million-digit result.
const MAX_EXP_RESULT_BITS: u64 = 1 << 24;

/// Reconstructs (an approximation of) `x`'s value as an `f64`, using only
/// its leading digits — just enough to seed a Newton iteration, never used
/// for anything that needs to be exact.
fn to_f64_approx<D: Digit>(x: &BigDecimal<D>) -> f64 {
    if x.is_zero() {
        return 0.0;
    }
    let take = x.digits.len().min(17);
    let mantissa: f64 = x.digits[..take].iter().fold(0.0, |acc, d| acc * x.base as f64 + d.to_u64() as f64);
    let int_len = x.digits.len() as i64 - x.scale as i64;
    let exponent = (int_len - take as i64).clamp(-300, 300);
    let value = mantissa * (x.base as f64).powi(exponent as i32);
    if x.negative {
        -value
    } else {
        value
    }
}

/// The inverse of [`to_f64_approx`]: builds a low-precision `BigDecimal`
/// seed out of a native float, for Newton iterations (`sqrt`, reciprocal,
/// `exp`) to refine from. Never produces more than [`SEED_PRECISION`]
/// meaningful digits; the caller's `initial_precision` truncates or pads it
/// further as needed.
fn float_guess<D: Digit>(base: u64, value: f64) -> BigDecimal<D> {
    if value == 0.0 || !value.is_finite() {
        return BigDecimal::from_u64(1, base);
    }
    let negative = value.is_sign_negative();
    let mut mantissa = value.abs();
    let exponent = (mantissa.ln() / (base as f64).ln()).floor() as i64;
    mantissa /= (base as f64).powi(exponent as i32);

    let take = SEED_PRECISION;
    let mut digits = Vec::with_capacity(take);
    for _ in 0..take {
        let d = mantissa.floor().clamp(0.0, (base - 1) as f64) as u64;
        digits.push(D::from_u64(d));
        mantissa = (mantissa - d as f64) * base as f64;
    }

    let int_len = exponent + 1;
    if int_len > take as i64 {
        digits.extend(std::iter::repeat(D::ZERO).take((int_len - take as i64) as usize));
    }
    let scale = (digits.len() as i64 - int_len).max(0) as usize;
    let is_zero = digits.iter().all(|&d| d == D::ZERO);
    BigDecimal {
        negative: negative && !is_zero,
        digits,
        scale,
        base,
    }
}

/// `1 / x` via `inverse_root(x, 1)` — the `n = 1` case is exactly Newton's
/// classic division-free reciprocal iteration (`r = 1 - x*estimate`), with
/// the seed built from a native-float reciprocal.
pub fn reciprocal<D: Digit>(ctx: &Context, x: &BigDecimal<D>, target: usize) -> Result<BigDecimal<D>> {
    let guess = float_guess(x.base, 1.0 / to_f64_approx(x));
    inverse_root(ctx, x, 1, guess, SEED_PRECISION, target)
}

/// `a / b`, built on [`reciprocal`] rather than a dedicated long-division
/// routine — the same "express the new operation as an old one plus a
/// residual closure" approach the rest of this module uses.
pub fn divide<D: Digit>(ctx: &Context, a: &BigDecimal<D>, b: &BigDecimal<D>, target: usize) -> Result<BigDecimal<D>> {
    let recip = reciprocal(ctx, b, target + EXTRA_PRECISION)?;
    Ok(a.multiply(ctx, &recip)?.with_precision(target))
}

fn integer_digit_count<D: Digit>(v: &BigDecimal<D>) -> i64 {
    v.digits.len() as i64 - v.scale as i64
}

/// The arithmetic-geometric mean of `a` and `b`: `a, b <- (a+b)/2, sqrt(a*b)`
/// until the doubling has gone far enough past `target` to have converged
/// (§4.J's skeleton applies here too, just with `sqrt` standing in as the
/// per-round refinement instead of a division).
fn agm<D: Digit>(ctx: &Context, mut a: BigDecimal<D>, mut b: BigDecimal<D>, target: usize) -> Result<BigDecimal<D>> {
    let iterations = ceil_log2_ratio(target, SEED_PRECISION) + 2;
    for _ in 0..iterations {
        let a_next = a.add(&b).divide_small(2)?.with_precision(target);
        let prod = a.multiply(ctx, &b)?.with_precision(target);
        let guess = float_guess(a.base, to_f64_approx(&prod).abs().sqrt());
        let b_next = sqrt(ctx, &prod, guess, SEED_PRECISION, target)?;
        a = a_next;
        b = b_next;
    }
    Ok(a)
}

/// Scales `x` up by `4^j` (by repeated doubling) until it has at least
/// `working` integer digits, returning the scaled value and `j`. The
/// AGM-based `ln` formula below only converges quickly when its argument is
/// large; this is the standard trick of trading a known `ln(4^j)` correction
/// for a better-conditioned AGM call.
fn scale_up_for_agm<D: Digit>(mut x: BigDecimal<D>, working: usize) -> (BigDecimal<D>, u32) {
    let mut j = 0u32;
    while integer_digit_count(&x) < working as i64 {
        x = x.add(&x);
        x = x.add(&x);
        j += 1;
    }
    (x, j)
}

/// The common part of the Gauss/Brent AGM formula for `ln`: `pi / (2 *
/// agm(1, 4/scaled))`, plus the doubling count `j` used to scale `value` up
/// first. For `value != 2` this already equals `ln(value) + j*ln(4)`; for
/// `value == 2` the caller still has to solve for `ln(2)` itself (see
/// [`ln2_from_pi`]), since `j*ln(4) = j*2*ln(2)` reintroduces the very
/// quantity being computed.
fn pi_over_two_agm<D: Digit>(ctx: &Context, value: BigDecimal<D>, working: usize, pi_val: &BigDecimal<D>) -> Result<(BigDecimal<D>, u32)> {
    let base = value.base;
    let (scaled, j) = scale_up_for_agm(value, working);
    let four = BigDecimal::from_u64(4, base);
    let recip_scaled = reciprocal(ctx, &scaled, working)?;
    let arg = four.multiply(ctx, &recip_scaled)?.with_precision(working);
    let one = BigDecimal::from_u64(1, base);
    let m = agm(ctx, one, arg, working)?;
    let two_m = m.add(&m);
    let term = divide(ctx, pi_val, &two_m, working)?;
    Ok((term, j))
}

/// `ln(2)`, solved from its own defining equation: `pi_over_two_agm(2) =
/// ln(2) + j2*2*ln(2) = (1 + 2*j2) * ln(2)`, so dividing the left side by
/// the known small integer `1 + 2*j2` gives `ln(2)` directly with no
/// circularity.
fn ln2_from_pi<D: Digit>(ctx: &Context, base: u64, working: usize, pi_val: &BigDecimal<D>) -> Result<BigDecimal<D>> {
    let two = BigDecimal::from_u64(2, base);
    let (term, j2) = pi_over_two_agm(ctx, two, working, pi_val)?;
    term.divide_small(1 + 2 * j2 as u64)
}

/// Pi via the Gauss-Legendre AGM iteration: `a0 = 1`, `b0 = 1/sqrt(2)`,
/// `t0 = 1/4`, `p0 = 1`; each round `a, b <- (a+b)/2, sqrt(a*b)`, `t <- t -
/// p*(a - a_next)^2`, `p <- 2*p`; `pi ≈ (a+b)^2 / (4*t)`. Self-contained —
/// needs only `sqrt` (hence only the Newton driver), no `ln`/`exp` of its
/// own, which is what lets `ln` below use it to break its own circularity.
pub fn pi<D: Digit>(ctx: &Context, base: u64, target: usize) -> Result<BigDecimal<D>> {
    if target == 0 {
        return Err(Error::Precision(PrecisionError::NonPositiveTarget));
    }
    let one = BigDecimal::from_u64(1, base);
    let two = BigDecimal::from_u64(2, base);

    let half_sqrt2_guess = float_guess(base, std::f64::consts::FRAC_1_SQRT_2);
    let mut a = one.clone();
    let mut b = inverse_root(ctx, &two, 2, half_sqrt2_guess, SEED_PRECISION, target)?;
    let mut t = one.divide_small(4)?;
    let mut p: u64 = 1;

    let iterations = ceil_log2_ratio(target, SEED_PRECISION) + 2;
    for _ in 0..iterations {
        let a_next = a.add(&b).divide_small(2)?.with_precision(target);
        let prod = a.multiply(ctx, &b)?.with_precision(target);
        let guess = float_guess(base, to_f64_approx(&prod).abs().sqrt());
        let b_next = sqrt(ctx, &prod, guess, SEED_PRECISION, target)?;

        let diff = a.subtract(&a_next).with_precision(target);
        let diff_sq = diff.multiply(ctx, &diff)?.with_precision(target);
        t = t.subtract(&diff_sq.multiply_small(p)).with_precision(target);
        p = p.saturating_mul(2);
        a = a_next;
        b = b_next;
    }

    let sum = a.add(&b).with_precision(target);
    let numerator = sum.multiply(ctx, &sum)?.with_precision(target);
    let denominator = t.multiply_small(4);
    divide(ctx, &numerator, &denominator, target)
}

/// `ln(x)` via the Gauss/Brent AGM formula (§4.J: "the AGM-based log").
/// Rather than driving the top-level loop through [`iterate`] directly,
/// `ln` reaches quadratic convergence through the nested `sqrt` calls
/// `agm`/`pi` already make — the same quadratically-convergent family
/// Newton's method belongs to, and the technique real arbitrary-precision
/// libraries use for `ln` rather than a naive Newton-on-`exp` loop (which
/// would need `exp` first).
///
/// Domain: `x` must be strictly positive; `ln(0)` and `ln` of a negative
/// number have no finite real value, so both report
/// [`PrecisionError::Unbounded`] rather than a bogus finite answer.
pub fn ln<D: Digit>(ctx: &Context, x: &BigDecimal<D>, target: usize) -> Result<BigDecimal<D>> {
    if target == 0 {
        return Err(Error::Precision(PrecisionError::NonPositiveTarget));
    }
    if x.is_zero() || x.negative {
        return Err(Error::Precision(PrecisionError::Unbounded));
    }
    let base = x.base;
    let working = target + EXTRA_PRECISION * 4;

    let pi_val = pi::<D>(ctx, base, working)?;
    let ln2 = ln2_from_pi(ctx, base, working, &pi_val)?;
    let (term, j) = pi_over_two_agm(ctx, x.clone(), working, &pi_val)?;
    let correction = ln2.multiply_small(2 * j as u64);
    Ok(term.subtract(&correction).with_precision(target))
}

/// `exp(x)`, the one operation in this module that does go straight through
/// [`iterate`] (§4.J: "the log-based exp use[s] the same skeleton"):
/// solving `ln(y) - x = 0` for `y` gives the update `y <- y + y*(x -
/// ln(y))`, i.e. residual `r = x - ln(estimate)`, divisor `1`.
///
/// `x`'s magnitude is checked against [`MAX_EXP_RESULT_BITS`] first — an
/// `x` large enough to make `exp(x)`'s integer part absurd is reported as
/// [`Error::Overflow`] instead of being attempted.
pub fn exp<D: Digit>(ctx: &Context, x: &BigDecimal<D>, target: usize) -> Result<BigDecimal<D>> {
    if target == 0 {
        return Err(Error::Precision(PrecisionError::NonPositiveTarget));
    }
    let base = x.base;
    let working = target + EXTRA_PRECISION;

    let x_f64 = to_f64_approx(x);
    let bits_needed = x_f64 / std::f64::consts::LN_2;
    if !bits_needed.is_finite() || bits_needed.abs() > MAX_EXP_RESULT_BITS as f64 {
        return Err(Error::Overflow {
            requested_bits: if bits_needed.is_finite() { bits_needed.abs() as u64 } else { u64::MAX },
            max_bits: MAX_EXP_RESULT_BITS,
        });
    }

    let seed = float_guess::<D>(base, x_f64.exp());
    let x = x.clone();
    let result = iterate(ctx, seed, SEED_PRECISION, working, 1, move |ctx, estimate, p| {
        let ln_est = ln(ctx, estimate, p)?;
        let x_at_p = x.with_precision(p);
        Ok(x_at_p.subtract(&ln_est))
    })?;
    Ok(result.with_precision(target))
}
