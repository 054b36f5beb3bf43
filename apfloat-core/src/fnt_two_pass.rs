//! Two-pass FNT (§4.E): the same `n1 x n2` matrix decomposition as Six-step,
//! except the matrix is disk-resident. Rows are streamed into RAM through
//! `Storage`, transformed in place with the Table FNT, and written back; the
//! pointwise twiddle multiply is folded into the same read/transform/write
//! pass rather than spent as a separate disk pass.
//!
//! `ModInt` values round-trip through `Storage<u64>` via their raw Montgomery
//! representation (`ModInt::from_raw`/`ModInt::raw`) — the disk format is
//! identical to the in-memory one, just element-at-a-time instead of a
//! contiguous slice.
use crate::{
    context::Context,
    error::Result,
    fnt_table,
    fnt_six_step::split_dims,
    modmath::{ModInt, ModRing},
    primes::Modulus,
    storage::Storage,
};

/// Transposes an `(rows, cols)` row-major disk matrix into `dst`, shaped
/// `(cols, rows)`. Source rows are read in one contiguous block each
/// (`DiskStorage` internally loops in `block_io_bytes`-sized chunks); the
/// scatter into `dst`'s now-discontiguous destination rows is done a cell at
/// a time, which trades I/O locality for a simple, obviously-correct pass.
fn transpose_storage(
    src: &mut Storage<u64>,
    dst: &mut Storage<u64>,
    rows: usize,
    cols: usize,
) -> Result<()> {
    for i in 0..rows {
        let row = src.read(i * cols, cols)?;
        for (j, &v) in row.iter().enumerate() {
            dst.write(j * rows + i, &[v])?;
        }
    }
    Ok(())
}

/// Streams `num_rows` rows of `row_len` elements each through `on_row`,
/// reading, mutating in RAM, then writing back — one disk pass total.
fn process_rows<F>(storage: &mut Storage<u64>, num_rows: usize, row_len: usize, mut on_row: F) -> Result<()>
where
    F: FnMut(usize, &mut [ModInt]),
{
    for r in 0..num_rows {
        let raw = storage.read(r * row_len, row_len)?;
        let mut row: Vec<ModInt> = raw.into_iter().map(ModInt::from_raw).collect();
        on_row(r, &mut row);
        let out: Vec<u64> = row.into_iter().map(ModInt::raw).collect();
        storage.write(r * row_len, &out)?;
    }
    Ok(())
}

/// Multiplies `row[i]` by `twiddle^{i * row_index}` in place.
fn apply_twiddle_row(ring: &ModRing, row: &mut [ModInt], twiddle: ModInt, row_index: usize) {
    let step = ring.pow(twiddle, row_index as u64);
    let mut w_pow = ring.to_montgomery(1);
    for cell in row.iter_mut() {
        *cell = ring.mul(*cell, w_pow);
        w_pow = ring.mul(w_pow, step);
    }
}

/// Forward two-pass transform. `values` holds `n` elements in natural order;
/// on return it holds the natural-order spectrum (same contract as
/// `fnt_six_step::transform`).
pub fn transform(ctx: &Context, ring: &ModRing, modulus: Modulus, values: &mut Storage<u64>) -> Result<()> {
    let n = values.size();
    if n <= 1 {
        return Ok(());
    }
    let (n1, n2) = split_dims(n);

    // Step 1: transpose (n1, n2) -> (n2, n1).
    let mut m = Storage::new_disk(ctx, n)?;
    transpose_storage(values, &mut m, n1, n2)?;

    // Steps 2+3: transform each of the n2 rows (length n1), folding the
    // twiddle multiply into the same pass.
    let root_n1 = fnt_table::build_root_table(ring, modulus, n1, false);
    let w_n = ring.nth_root(modulus.g, n as u64, false);
    process_rows(&mut m, n2, n1, |j, row| {
        fnt_table::transform_natural(ring, row, &root_n1);
        apply_twiddle_row(ring, row, w_n, j);
    })?;

    // Step 4: transpose (n2, n1) -> (n1, n2).
    let mut c = Storage::new_disk(ctx, n)?;
    transpose_storage(&mut m, &mut c, n2, n1)?;

    // Step 5: transform each of the n1 rows (length n2).
    let root_n2 = fnt_table::build_root_table(ring, modulus, n2, false);
    process_rows(&mut c, n1, n2, |_, row| {
        fnt_table::transform_natural(ring, row, &root_n2);
    })?;

    // Step 6: transpose (n1, n2) -> (n2, n1); already natural order.
    transpose_storage(&mut c, values, n1, n2)
}

/// Inverse two-pass transform, mirroring `transform` with inverse roots and
/// inverse twiddle; the `1/n1 * 1/n2 = 1/n` scaling is folded into the two
/// inner inverse transforms.
pub fn inverse_transform(ctx: &Context, ring: &ModRing, modulus: Modulus, values: &mut Storage<u64>) -> Result<()> {
    let n = values.size();
    if n <= 1 {
        return Ok(());
    }
    let (n1, n2) = split_dims(n);

    // Undo step 6: transpose (n2, n1) -> (n1, n2).
    let mut c = Storage::new_disk(ctx, n)?;
    transpose_storage(values, &mut c, n2, n1)?;

    // Undo step 5: inverse-transform each of the n1 rows (length n2).
    let inv_root_n2 = fnt_table::build_root_table(ring, modulus, n2, true);
    process_rows(&mut c, n1, n2, |_, row| {
        fnt_table::inverse_transform_natural(ring, row, &inv_root_n2);
    })?;

    // Undo step 4: transpose (n1, n2) -> (n2, n1).
    let mut m = Storage::new_disk(ctx, n)?;
    transpose_storage(&mut c, &mut m, n1, n2)?;

    // Undo steps 3+2: divide by the twiddle, inverse-transform each of the
    // n2 rows (length n1).
    let inv_root_n1 = fnt_table::build_root_table(ring, modulus, n1, true);
    let w_n_inv = ring.nth_root(modulus.g, n as u64, true);
    process_rows(&mut m, n2, n1, |j, row| {
        apply_twiddle_row(ring, row, w_n_inv, j);
        fnt_table::inverse_transform_natural(ring, row, &inv_root_n1);
    })?;

    // Undo step 1: transpose (n2, n1) -> (n1, n2), the original layout.
    transpose_storage(&mut m, values, n2, n1)
}
