//! Chunked bounded-concurrency batch execution.
//!
//! Work units are split into consecutive chunks of a fixed size; every unit
//! in a chunk runs on its own OS thread and the whole chunk is joined before
//! the next one starts. This trades some head-of-line blocking for a
//! trivially predictable concurrency ceiling (remote connections, disk I/O).
//! A failing unit never aborts its siblings; the caller inspects each
//! [`UnitOutcome`] afterwards.

use tracing::{debug, info};

/// The result of one work unit, paired back with its input item.
#[derive(Debug)]
pub struct UnitOutcome<T, E> {
    pub item: T,
    pub result: Result<(), E>,
}

impl<T, E> UnitOutcome<T, E> {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Run `work` over `items` with at most `chunk_size` units in flight.
///
/// Chunks are strictly sequential: all units of a chunk complete (success or
/// failure) before the next chunk starts. A `chunk_size` of zero is treated
/// as one. Panics in a work closure are propagated to the caller.
pub fn run_chunked<T, E, F>(items: Vec<T>, chunk_size: usize, work: F) -> Vec<UnitOutcome<T, E>>
where
    T: Sync,
    E: Send,
    F: Fn(&T) -> Result<(), E> + Sync,
{
    let chunk_size = chunk_size.max(1);
    let total = items.len();
    if total == 0 {
        return Vec::new();
    }
    info!("Running {} units in chunks of {}", total, chunk_size);

    let mut outcomes = Vec::with_capacity(total);
    let mut remaining = items;
    let mut chunk_index = 0usize;

    while !remaining.is_empty() {
        chunk_index += 1;
        let rest = remaining.split_off(chunk_size.min(remaining.len()));
        let chunk = std::mem::replace(&mut remaining, rest);
        debug!("Starting chunk {} ({} units)", chunk_index, chunk.len());

        let results: Vec<Result<(), E>> = std::thread::scope(|scope| {
            let handles: Vec<_> = chunk
                .iter()
                .map(|item| scope.spawn(|| work(item)))
                .collect();
            handles
                .into_iter()
                .map(|handle| match handle.join() {
                    Ok(result) => result,
                    Err(panic) => std::panic::resume_unwind(panic),
                })
                .collect()
        });
        debug!("Completed chunk {}", chunk_index);

        outcomes.extend(
            chunk
                .into_iter()
                .zip(results)
                .map(|(item, result)| UnitOutcome { item, result }),
        );
    }

    info!(
        "Completed all {} chunks ({} units, {} failed)",
        chunk_index,
        total,
        outcomes.iter().filter(|o| !o.is_ok()).count()
    );
    outcomes
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[test]
    fn all_units_run_exactly_once() {
        let counter = AtomicUsize::new(0);
        let outcomes = run_chunked((0..17).collect(), 4, |_item| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok::<(), ()>(())
        });
        assert_eq!(outcomes.len(), 17);
        assert_eq!(counter.load(Ordering::SeqCst), 17);
        assert!(outcomes.iter().all(|o| o.is_ok()));
    }

    #[test]
    fn concurrency_never_exceeds_chunk_size() {
        let in_flight = AtomicUsize::new(0);
        let peak = AtomicUsize::new(0);
        run_chunked((0..20).collect(), 3, |_item: &i32| {
            let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            peak.fetch_max(now, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(10));
            in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok::<(), ()>(())
        });
        assert!(peak.load(Ordering::SeqCst) <= 3);
    }

    #[test]
    fn failures_do_not_abort_siblings() {
        let outcomes = run_chunked((0..10).collect(), 5, |item: &i32| {
            if item % 3 == 0 {
                Err(format!("unit {item} failed"))
            } else {
                Ok(())
            }
        });
        assert_eq!(outcomes.len(), 10);
        let failed: Vec<i32> = outcomes
            .iter()
            .filter(|o| !o.is_ok())
            .map(|o| o.item)
            .collect();
        assert_eq!(failed, vec![0, 3, 6, 9]);
    }

    #[test]
    fn items_come_back_in_input_order() {
        let outcomes = run_chunked((0..7).collect(), 2, |_item: &i32| Ok::<(), ()>(()));
        let items: Vec<i32> = outcomes.into_iter().map(|o| o.item).collect();
        assert_eq!(items, vec![0, 1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn zero_chunk_size_is_treated_as_one() {
        let outcomes = run_chunked(vec![1, 2, 3], 0, |_item: &i32| Ok::<(), ()>(()));
        assert_eq!(outcomes.len(), 3);
    }
}
