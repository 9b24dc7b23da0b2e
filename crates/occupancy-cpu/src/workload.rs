//! The per-worker computational loop.

use std::hint::black_box;

/// Sum `0..n_work` into a private accumulator.
///
/// The loop counter passes through [`black_box`] so the compiler cannot fold
/// the loop into its closed form.
#[inline(never)]
pub fn accumulate(n_work: u64) -> i64 {
    let mut sum: i64 = 0;
    for i in 0..n_work {
        sum = sum.wrapping_add(black_box(i) as i64);
    }
    sum
}
