//! Bounded concurrency runner.
//!
//! Runs a list of task thunks with at most `limit` in flight. Each slot
//! pauses for `spacing` after its task completes before taking the next
//! one, which throttles the request rate independently of `limit`.
//! Results come back in input order. Task failures are returned in their
//! slot; the runner itself never inspects them.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use futures::stream::{self, StreamExt};

/// Progress callback: `(completed, total)`.
pub type Progress<'a> = &'a (dyn Fn(usize, usize) + Send + Sync);

/// Execute `tasks` with bounded concurrency and inter-task spacing.
pub async fn run_with_limit<T, F, Fut>(
    tasks: Vec<F>,
    limit: usize,
    spacing: Duration,
    on_progress: Option<Progress<'_>>,
) -> Vec<T>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = T>,
{
    let total = tasks.len();
    if total == 0 {
        return Vec::new();
    }
    let limit = limit.clamp(1, total);
    let completed = AtomicUsize::new(0);
    let completed = &completed;

    let mut slots: Vec<Option<T>> = (0..total).map(|_| None).collect();

    let mut running = stream::iter(tasks.into_iter().enumerate())
        .map(|(index, task)| async move {
            let output = task().await;
            let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
            if let Some(report) = on_progress {
                report(done, total);
            }
            if !spacing.is_zero() {
                tokio::time::sleep(spacing).await;
            }
            (index, output)
        })
        .buffer_unordered(limit);

    while let Some((index, output)) = running.next().await {
        slots[index] = Some(output);
    }

    slots.into_iter().flatten().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use tokio::time::Instant;

    type BoxedTask = Box<dyn FnOnce() -> futures::future::BoxFuture<'static, usize> + Send>;

    fn tracked_task(
        id: usize,
        ms: u64,
        in_flight: Arc<AtomicUsize>,
        peak: Arc<AtomicUsize>,
        finished: Arc<Mutex<Vec<usize>>>,
    ) -> BoxedTask {
        Box::new(move || {
            Box::pin(async move {
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(ms)).await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
                finished.lock().unwrap().push(id);
                id
            })
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_limit_and_input_order() {
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let finished = Arc::new(Mutex::new(Vec::new()));

        let durations = [400, 100, 50, 10];
        let tasks: Vec<BoxedTask> = durations
            .iter()
            .enumerate()
            .map(|(i, ms)| {
                tracked_task(
                    i + 1,
                    *ms,
                    Arc::clone(&in_flight),
                    Arc::clone(&peak),
                    Arc::clone(&finished),
                )
            })
            .collect();

        let results = run_with_limit(tasks, 2, Duration::ZERO, None).await;

        assert_eq!(results, vec![1, 2, 3, 4]);
        assert_eq!(peak.load(Ordering::SeqCst), 2);
        let finished = finished.lock().unwrap();
        let pos = |id| finished.iter().position(|x| *x == id).unwrap();
        assert!(pos(4) < pos(1), "task 4 should finish before task 1");
    }

    #[tokio::test(start_paused = true)]
    async fn test_spacing_throttles_each_slot() {
        let started = Instant::now();
        let tasks: Vec<_> = (0..4)
            .map(|i| move || async move { i })
            .collect();

        let results = run_with_limit(tasks, 1, Duration::from_millis(500), None).await;

        assert_eq!(results, vec![0, 1, 2, 3]);
        assert!(started.elapsed() >= Duration::from_millis(2000));
    }

    #[tokio::test]
    async fn test_progress_reports_every_completion() {
        let seen = Mutex::new(Vec::new());
        let report: Progress<'_> =
            &|done: usize, total: usize| seen.lock().unwrap().push((done, total));
        let tasks: Vec<_> = (0..3).map(|i| move || async move { i * 2 }).collect();

        let results = run_with_limit(tasks, 3, Duration::ZERO, Some(report)).await;

        assert_eq!(results, vec![0, 2, 4]);
        assert_eq!(*seen.lock().unwrap(), vec![(1, 3), (2, 3), (3, 3)]);
    }

    #[tokio::test]
    async fn test_failures_stay_in_their_slot() {
        let tasks: Vec<_> = (0..3)
            .map(|i| {
                move || async move {
                    if i == 1 { Err(format!("task {i} failed")) } else { Ok(i) }
                }
            })
            .collect();

        let results = run_with_limit(tasks, 2, Duration::ZERO, None).await;

        assert_eq!(results[0], Ok(0));
        assert_eq!(results[1], Err("task 1 failed".to_string()));
        assert_eq!(results[2], Ok(2));
    }

    #[tokio::test]
    async fn test_empty_task_list() {
        let tasks: Vec<fn() -> std::future::Ready<u8>> = Vec::new();
        assert!(run_with_limit(tasks, 2, Duration::ZERO, None).await.is_empty());
    }
}
