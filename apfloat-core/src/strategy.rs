//! Strategy selector (§4.G): picks Table / Six-step / Two-pass for a
//! requested transform length given the active `Context`'s cache and memory
//! budgets, wrapping with Factor-3 (§4.F) when the rounded length needs it.
use crate::{
    context::Context,
    error::{Error, Result},
    factor3, fnt_six_step, fnt_table, fnt_two_pass,
    modmath::{ModInt, ModRing},
    parallel,
    primes::Modulus,
    storage::Storage,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kernel {
    Table,
    SixStep,
    TwoPass,
}

/// The selector's decision for one requested transform length: the rounded
/// length actually used, its power-of-two factor (what the underlying
/// kernel transforms), whether a factor of three needs the Factor-3 wrapper,
/// and which power-of-two kernel to use.
#[derive(Debug, Clone, Copy)]
pub struct Plan {
    pub rounded_len: usize,
    pub power_of_two_part: usize,
    pub has_factor_three: bool,
    pub kernel: Kernel,
}

fn smallest_valid_length(requested: usize) -> (usize, usize, bool) {
    let mut p = 1usize;
    loop {
        if p >= requested {
            return (p, p, false);
        }
        if 3 * p >= requested {
            return (3 * p, p, true);
        }
        p <<= 1;
    }
}

/// Builds a [`Plan`] for a requested transform length, per §4.G's procedure.
/// `element_size` is `size_of::<D>()` for the `Digit` type backing the
/// convolution (the `wTable` and data both count against the cache budget).
pub fn plan_for(ctx: &Context, modulus: Modulus, requested_len: usize, element_size: usize) -> Result<Plan> {
    let requested_len = requested_len.max(1);
    let (rounded_len, power_of_two_part, has_factor_three) = smallest_valid_length(requested_len);

    fnt_table::check_length(power_of_two_part, modulus)?;

    let elem_bytes = power_of_two_part * element_size;
    let table_bytes = (power_of_two_part / 2).max(1) * element_size;
    let kernel = if elem_bytes + table_bytes <= ctx.cache_l1_bytes / 2 {
        Kernel::Table
    } else if elem_bytes <= ctx.max_memory_block_bytes && power_of_two_part <= i32::MAX as usize {
        Kernel::SixStep
    } else {
        Kernel::TwoPass
    };

    Ok(Plan {
        rounded_len,
        power_of_two_part,
        has_factor_three,
        kernel,
    })
}

fn in_memory_kernel(kernel: Kernel) -> Result<fn(&ModRing, Modulus, &mut [ModInt])> {
    match kernel {
        Kernel::Table => Ok(|ring, modulus, values| {
            let table = fnt_table::build_root_table(ring, modulus, values.len(), false);
            fnt_table::transform_natural(ring, values, &table);
        }),
        Kernel::SixStep => Ok(fnt_six_step::transform),
        Kernel::TwoPass => Err(Error::Invariant(
            "Two-pass requires disk-backed storage; use run_on_disk instead",
        )),
    }
}

fn in_memory_inverse_kernel(kernel: Kernel) -> Result<fn(&ModRing, Modulus, &mut [ModInt])> {
    match kernel {
        Kernel::Table => Ok(|ring, modulus, values| {
            let table = fnt_table::build_root_table(ring, modulus, values.len(), true);
            fnt_table::inverse_transform_natural(ring, values, &table);
        }),
        Kernel::SixStep => Ok(fnt_six_step::inverse_transform),
        Kernel::TwoPass => Err(Error::Invariant(
            "Two-pass requires disk-backed storage; use run_on_disk instead",
        )),
    }
}

/// Runs the forward transform described by `plan` over in-memory `values`
/// (length `plan.rounded_len`). Valid for `Kernel::Table` and
/// `Kernel::SixStep`; `Kernel::TwoPass` must go through [`run_on_disk`].
/// `Kernel::SixStep`'s row/column fan-out runs inside `ctx`'s thread-count
/// scope (§5/§6 — the context-supplied runner is what governs parallelism
/// here, see `parallel::install`).
pub fn run_in_memory(ctx: &Context, ring: &ModRing, modulus: Modulus, plan: &Plan, values: &mut [ModInt]) -> Result<()> {
    debug_assert_eq!(values.len(), plan.rounded_len);
    let kernel = in_memory_kernel(plan.kernel)?;
    parallel::install(ctx, || {
        if plan.has_factor_three {
            factor3::transform(ring, modulus, values, plan.power_of_two_part, |sub| {
                kernel(ring, modulus, sub)
            });
        } else {
            kernel(ring, modulus, values);
        }
    });
    Ok(())
}

pub fn run_in_memory_inverse(ctx: &Context, ring: &ModRing, modulus: Modulus, plan: &Plan, values: &mut [ModInt]) -> Result<()> {
    debug_assert_eq!(values.len(), plan.rounded_len);
    let kernel = in_memory_inverse_kernel(plan.kernel)?;
    parallel::install(ctx, || {
        if plan.has_factor_three {
            factor3::inverse_transform(ring, modulus, values, plan.power_of_two_part, |sub| {
                kernel(ring, modulus, sub)
            });
        } else {
            kernel(ring, modulus, values);
        }
    });
    Ok(())
}

/// Runs the forward transform for `Kernel::TwoPass` over disk-backed
/// `storage`. Combining Two-pass with the Factor-3 wrapper (a rounded length
/// with both a large power-of-two part and a factor of three) is not
/// implemented — see `DESIGN.md`; `plan_for` still reports it via
/// `has_factor_three` but callers must fall back (e.g. to Six-step-with-
/// Factor-3, §4.G's own suggested fallback) rather than call this.
pub fn run_on_disk(ctx: &Context, ring: &ModRing, modulus: Modulus, plan: &Plan, storage: &mut Storage<u64>) -> Result<()> {
    if plan.kernel != Kernel::TwoPass {
        return Err(Error::Invariant("run_on_disk called with a non-TwoPass plan"));
    }
    if plan.has_factor_three {
        return Err(Error::Invariant(
            "Two-pass + Factor-3 combination is not implemented",
        ));
    }
    parallel::install(ctx, || fnt_two_pass::transform(ctx, ring, modulus, storage))
}

pub fn run_on_disk_inverse(ctx: &Context, ring: &ModRing, modulus: Modulus, plan: &Plan, storage: &mut Storage<u64>) -> Result<()> {
    if plan.kernel != Kernel::TwoPass {
        return Err(Error::Invariant("run_on_disk_inverse called with a non-TwoPass plan"));
    }
    if plan.has_factor_three {
        return Err(Error::Invariant(
            "Two-pass + Factor-3 combination is not implemented",
        ));
    }
    parallel::install(ctx, || fnt_two_pass::inverse_transform(ctx, ring, modulus, storage))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primes::MODULI;

    #[test]
    fn rounds_up_to_power_of_two_or_three_times_power_of_two() {
        assert_eq!(smallest_valid_length(1).0, 1);
        assert_eq!(smallest_valid_length(5).0, 6); // 3*2
        assert_eq!(smallest_valid_length(9).0, 12); // 3*4
        assert_eq!(smallest_valid_length(16).0, 16);
        assert_eq!(smallest_valid_length(17).0, 24); // 3*8, smaller than 32
    }

    #[test]
    fn small_lengths_pick_table() {
        let ctx = Context::default();
        let plan = plan_for(&ctx, MODULI[0], 64, 8).unwrap();
        assert_eq!(plan.kernel, Kernel::Table);
    }

    #[test]
    fn huge_lengths_pick_two_pass() {
        let ctx = Context::default();
        let plan = plan_for(&ctx, MODULI[0], 1 << 28, 8).unwrap();
        assert_eq!(plan.kernel, Kernel::TwoPass);
    }

    #[test]
    fn in_memory_roundtrip_matches_table_fnt_directly() {
        let ctx = Context::default();
        let modulus = MODULI[0];
        let ring = ModRing::from_modulus(modulus);
        let plan = plan_for(&ctx, modulus, 100, 8).unwrap();
        assert!(plan.has_factor_three);
        assert_eq!(plan.rounded_len, 3 * plan.power_of_two_part);

        let values: Vec<u64> = (0..plan.rounded_len as u64).map(|i| (i * 3 + 1) % modulus.p).collect();
        let mut v: Vec<ModInt> = values.iter().map(|&x| ring.to_montgomery(x)).collect();
        run_in_memory(&ctx, &ring, modulus, &plan, &mut v).unwrap();
        run_in_memory_inverse(&ctx, &ring, modulus, &plan, &mut v).unwrap();
        let back: Vec<u64> = v.into_iter().map(|x| ring.from_montgomery(x)).collect();
        assert_eq!(back, values);
    }
}
