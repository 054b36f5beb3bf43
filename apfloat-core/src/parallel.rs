//! The parallel runner of §5/§6: "a single `split(N, worker)` primitive;
//! back it with a thread pool of `numberOfProcessors()` threads."
//!
//! Rather than a custom `ParallelRunnable` trait wrapping `rayon`, this
//! crate takes `rayon`'s own global pool as the runner implementation
//! directly — every parallel site (`fnt_six_step`'s row/column fan-out,
//! `carry_crt`'s parallel finish phase) already calls straight into
//! `rayon::prelude`/`rayon::scope`, the same way `ntt::ntt_nr` fans its own
//! butterflies out with `par_chunks_exact_mut` with no intermediate
//! abstraction. [`install`] is the one piece of glue needed on top of that:
//! it scopes a call to a pool sized from `Context::num_processors`, so the
//! context-supplied thread count actually governs how many threads `rayon`
//! uses for that call instead of silently falling back to the process-wide
//! default (§5 "a parallel runner... is supplied externally from context").
use crate::context::Context;

/// Runs `f` with `rayon`'s current-thread pool scoped to
/// `ctx.num_processors` threads, so every `rayon` call `f` makes (directly,
/// or several frames down through `fnt_six_step`/`carry_crt`) is bounded by
/// the context's thread count rather than the ambient global pool. Falls
/// back to running `f` on the calling thread if the pool fails to build
/// (e.g. a nested `install` on a thread that already owns one) — degrading
/// gracefully, per §5, rather than failing the whole operation over a
/// thread-count preference.
pub fn install<R>(ctx: &Context, f: impl FnOnce() -> R) -> R {
    match rayon::ThreadPoolBuilder::new().num_threads(ctx.num_processors.max(1)).build() {
        Ok(pool) => pool.install(f),
        Err(_) => f(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn install_runs_the_closure_and_returns_its_value() {
        let ctx = Context::default();
        let result = install(&ctx, || 1 + 1);
        assert_eq!(result, 2);
    }

    #[test]
    fn install_honors_a_single_thread_context() {
        let mut ctx = Context::default();
        ctx.num_processors = 1;
        let seen = install(&ctx, || rayon::current_num_threads());
        assert_eq!(seen, 1);
    }
}
