use std::future::Future;
use std::time::Duration;

use backup_logging::backup_debug;
use futures_util::future::join_all;

/// Process `items` in consecutive batches of `concurrency`, running each batch
/// concurrently and sleeping `delay` between batches.
///
/// Results come back in input order. Failures are the processor's business:
/// it should fold them into `R` so one item cannot abort the run.
pub async fn convert_batch<T, R, F, Fut>(
    items: Vec<T>,
    concurrency: usize,
    delay: Duration,
    processor: F,
) -> Vec<R>
where
    F: FnMut(T) -> Fut,
    Fut: Future<Output = R>,
{
    convert_batch_with(items, concurrency, delay, processor, |_| {}).await
}

/// Same as [`convert_batch`], reporting the number of settled items after
/// every batch.
pub async fn convert_batch_with<T, R, F, Fut, P>(
    items: Vec<T>,
    concurrency: usize,
    delay: Duration,
    mut processor: F,
    mut on_batch: P,
) -> Vec<R>
where
    F: FnMut(T) -> Fut,
    Fut: Future<Output = R>,
    P: FnMut(usize),
{
    let concurrency = concurrency.max(1);
    let total = items.len();
    let mut results = Vec::with_capacity(total);
    let mut remaining = items.into_iter().peekable();
    let mut wave = 0usize;

    while remaining.peek().is_some() {
        let batch: Vec<Fut> = remaining.by_ref().take(concurrency).map(&mut processor).collect();
        wave += 1;
        backup_debug!("Batch {} started with {} item(s)", wave, batch.len());
        results.extend(join_all(batch).await);
        on_batch(results.len());

        if remaining.peek().is_some() && !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }

    results
}
