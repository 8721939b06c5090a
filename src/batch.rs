//! Wave-based batch execution
//!
//! Items run in consecutive windows ("waves"). Every item of a wave is polled concurrently
//! on the calling task, and the next wave only starts once the whole current wave has
//! settled. One slow item therefore holds back its wave, which keeps the number of open
//! connections predictable for the content host.

use futures::future::join_all;
use std::future::Future;

/// Run `worker` over `items` in waves of at most `wave_size` concurrent futures
///
/// A `wave_size` of 0 is treated as 1. Results come back in input order, one per item.
/// Nothing is spawned, so the worker's futures do not need to be `Send` or `'static`.
///
/// # Examples
///
/// ```
/// use manga_dl::batch::run_in_waves;
///
/// # async fn example() {
/// let doubled = run_in_waves(vec![1, 2, 3], 2, |n| async move { n * 2 }).await;
/// assert_eq!(doubled, vec![2, 4, 6]);
/// # }
/// ```
pub async fn run_in_waves<I, T, R, F, Fut>(items: I, wave_size: usize, mut worker: F) -> Vec<R>
where
    I: IntoIterator<Item = T>,
    F: FnMut(T) -> Fut,
    Fut: Future<Output = R>,
{
    let wave_size = wave_size.max(1);
    let mut items = items.into_iter();
    let mut results = Vec::with_capacity(items.size_hint().0);
    let mut wave_index = 0usize;

    loop {
        let wave: Vec<Fut> = items.by_ref().take(wave_size).map(&mut worker).collect();
        if wave.is_empty() {
            break;
        }

        tracing::trace!(wave = wave_index, size = wave.len(), "starting wave");
        results.extend(join_all(wave).await);
        wave_index += 1;
    }

    results
}
