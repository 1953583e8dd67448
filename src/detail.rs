//! Fetch-by-id state holder with optional polling, used by detail screens.
//!
//! Fetches and poll ticks run as spawned tasks and report back through an
//! [`UpdateSink`]. The owner feeds those updates into [`DetailPoll::apply`],
//! which drops anything issued for an older id or by another instance.

use futures::future::BoxFuture;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::debug;

pub type Fetcher<T> = Arc<dyn Fn(String) -> BoxFuture<'static, anyhow::Result<T>> + Send + Sync>;
pub type UpdateSink<T> = Arc<dyn Fn(DetailUpdate<T>) + Send + Sync>;
pub type PollPredicate<T> = Arc<dyn Fn(&T) -> bool + Send + Sync>;

static NEXT_INSTANCE: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum UpdateOrigin {
    Fetch,
    Poll,
}

#[derive(Debug)]
pub struct DetailUpdate<T> {
    pub instance: u64,
    generation: u64,
    origin: UpdateOrigin,
    result: Result<T, String>,
}

impl<T> DetailUpdate<T> {
    pub fn origin(&self) -> UpdateOrigin {
        self.origin
    }
}

pub struct DetailOptions<T> {
    pub initial_data: Option<T>,
    pub poll_interval: Option<Duration>,
    pub should_poll: Option<PollPredicate<T>>,
}

impl<T> Default for DetailOptions<T> {
    fn default() -> Self {
        Self {
            initial_data: None,
            poll_interval: None,
            should_poll: None,
        }
    }
}

pub struct DetailPoll<T> {
    instance: u64,
    id: Option<String>,
    data: Option<T>,
    loading: bool,
    error: Option<String>,
    generation: u64,
    fetcher: Fetcher<T>,
    sink: UpdateSink<T>,
    options: DetailOptions<T>,
    poll_task: Option<JoinHandle<()>>,
}

impl<T> DetailPoll<T>
where
    T: Clone + Send + 'static,
{
    pub fn new(fetcher: Fetcher<T>, sink: UpdateSink<T>, options: DetailOptions<T>) -> Self {
        Self {
            instance: NEXT_INSTANCE.fetch_add(1, Ordering::Relaxed),
            id: None,
            data: options.initial_data.clone(),
            loading: false,
            error: None,
            generation: 0,
            fetcher,
            sink,
            options,
            poll_task: None,
        }
    }

    pub fn data(&self) -> Option<&T> {
        self.data.as_ref()
    }

    pub fn loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn polling(&self) -> bool {
        self.poll_task.is_some()
    }

    pub fn set_id(&mut self, id: Option<String>) {
        let id = id.filter(|id| !id.is_empty());
        if id == self.id {
            return;
        }

        self.generation += 1;
        self.disarm_poll();
        self.id = id;
        self.data = self.options.initial_data.clone();
        self.error = None;
        self.loading = self.id.is_some();

        if let Some(id) = self.id.clone() {
            self.spawn_fetch(id);
        }
    }

    /// Re-issues the fetch for the current id, superseding anything in flight.
    pub fn refresh(&mut self) {
        let Some(id) = self.id.clone() else {
            return;
        };
        self.generation += 1;
        self.disarm_poll();
        self.loading = true;
        self.error = None;
        self.spawn_fetch(id);
    }

    pub fn set_poll_interval(&mut self, interval: Option<Duration>) {
        self.options.poll_interval = interval;
        self.rearm_poll();
    }

    /// Commits an update if it belongs to the current id. Returns whether it did.
    pub fn apply(&mut self, update: DetailUpdate<T>) -> bool {
        if update.instance != self.instance || update.generation != self.generation {
            debug!(
                "discarding stale detail update (instance {}, generation {})",
                update.instance, update.generation
            );
            return false;
        }

        match (update.origin, update.result) {
            (UpdateOrigin::Fetch, Ok(data)) => {
                self.data = Some(data);
                self.error = None;
                self.loading = false;
            }
            (UpdateOrigin::Fetch, Err(error)) => {
                self.error = Some(error);
                self.loading = false;
                if self.data.is_none() {
                    self.data = self.options.initial_data.clone();
                }
            }
            (UpdateOrigin::Poll, Ok(data)) => {
                self.data = Some(data);
            }
            (UpdateOrigin::Poll, Err(error)) => {
                debug!("poll failed, keeping last known data: {error}");
            }
        }

        self.rearm_poll();
        true
    }

    fn should_poll(&self) -> bool {
        let interval_set = self
            .options
            .poll_interval
            .is_some_and(|interval| !interval.is_zero());
        let Some(data) = &self.data else {
            return false;
        };
        interval_set
            && self.id.is_some()
            && !self.loading
            && self
                .options
                .should_poll
                .as_ref()
                .is_none_or(|predicate| predicate(data))
    }

    fn rearm_poll(&mut self) {
        self.disarm_poll();
        if !self.should_poll() {
            return;
        }
        let (Some(id), Some(interval)) = (self.id.clone(), self.options.poll_interval) else {
            return;
        };

        let fetcher = self.fetcher.clone();
        let sink = self.sink.clone();
        let instance = self.instance;
        let generation = self.generation;
        self.poll_task = Some(tokio::spawn(async move {
            tokio::time::sleep(interval).await;
            let result = fetcher(id).await.map_err(|error| format!("{error:#}"));
            sink(DetailUpdate {
                instance,
                generation,
                origin: UpdateOrigin::Poll,
                result,
            });
        }));
    }

    fn disarm_poll(&mut self) {
        if let Some(task) = self.poll_task.take() {
            task.abort();
        }
    }

    fn spawn_fetch(&self, id: String) {
        let future = (self.fetcher)(id);
        let sink = self.sink.clone();
        let instance = self.instance;
        let generation = self.generation;
        tokio::spawn(async move {
            let result = future.await.map_err(|error| format!("{error:#}"));
            sink(DetailUpdate {
                instance,
                generation,
                origin: UpdateOrigin::Fetch,
                result,
            });
        });
    }
}

impl<T> Drop for DetailPoll<T> {
    fn drop(&mut self) {
        if let Some(task) = self.poll_task.take() {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{DetailOptions, DetailPoll, DetailUpdate, Fetcher, UpdateOrigin, UpdateSink};
    use futures::FutureExt;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tokio::sync::mpsc;

    #[derive(Debug, Clone, PartialEq)]
    struct Job {
        id: String,
        status: String,
    }

    fn channel_sink() -> (UpdateSink<Job>, mpsc::UnboundedReceiver<DetailUpdate<Job>>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let sink: UpdateSink<Job> = Arc::new(move |update| {
            let _ = tx.send(update);
        });
        (sink, rx)
    }

    /// Answers each call with the next scripted status; `None` is a failure.
    fn scripted_fetcher(
        script: Vec<Option<&'static str>>,
        calls: Arc<AtomicUsize>,
    ) -> Fetcher<Job> {
        let script = Arc::new(Mutex::new(script.into_iter()));
        Arc::new(move |id: String| {
            let call = calls.fetch_add(1, Ordering::SeqCst);
            let next = script
                .lock()
                .map(|mut steps| steps.next().flatten())
                .unwrap_or(None);
            async move {
                match next {
                    Some(status) => Ok(Job {
                        id,
                        status: status.to_string(),
                    }),
                    None => Err(anyhow::anyhow!("call {call} failed")),
                }
            }
            .boxed()
        })
    }

    fn in_progress() -> Arc<dyn Fn(&Job) -> bool + Send + Sync> {
        Arc::new(|job: &Job| job.status == "in_progress")
    }

    #[tokio::test(start_paused = true)]
    async fn no_id_means_no_fetch() {
        let calls = Arc::new(AtomicUsize::new(0));
        let (sink, mut rx) = channel_sink();
        let initial = Job {
            id: "seed".to_string(),
            status: "cached".to_string(),
        };
        let mut detail = DetailPoll::new(
            scripted_fetcher(vec![Some("running")], calls.clone()),
            sink,
            DetailOptions {
                initial_data: Some(initial.clone()),
                poll_interval: Some(Duration::from_secs(1)),
                should_poll: None,
            },
        );
        detail.set_id(None);
        tokio::time::sleep(Duration::from_secs(5)).await;

        assert_eq!(detail.data(), Some(&initial));
        assert!(!detail.loading());
        assert!(detail.error().is_none());
        assert!(!detail.polling());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn id_change_discards_earlier_fetch() {
        let (sink, mut rx) = channel_sink();
        let fetcher: Fetcher<Job> = Arc::new(|id: String| {
            async move {
                let delay = if id == "a" { 100 } else { 10 };
                tokio::time::sleep(Duration::from_millis(delay)).await;
                Ok::<_, anyhow::Error>(Job {
                    status: format!("loaded {id}"),
                    id,
                })
            }
            .boxed()
        });
        let mut detail = DetailPoll::new(fetcher, sink, DetailOptions::default());

        detail.set_id(Some("a".to_string()));
        assert!(detail.loading());
        detail.set_id(Some("b".to_string()));
        assert!(detail.loading());

        let first = rx.recv().await.expect("first update");
        assert!(detail.apply(first));
        assert_eq!(detail.data().map(|job| job.id.as_str()), Some("b"));

        let late = rx.recv().await.expect("late update");
        assert!(!detail.apply(late));
        assert_eq!(detail.data().map(|job| job.id.as_str()), Some("b"));
        assert!(!detail.loading());
    }

    #[tokio::test(start_paused = true)]
    async fn polling_stops_once_predicate_fails() {
        let calls = Arc::new(AtomicUsize::new(0));
        let (sink, mut rx) = channel_sink();
        let mut detail = DetailPoll::new(
            scripted_fetcher(
                vec![
                    Some("in_progress"),
                    Some("in_progress"),
                    Some("complete"),
                    Some("in_progress"),
                ],
                calls.clone(),
            ),
            sink,
            DetailOptions {
                initial_data: None,
                poll_interval: Some(Duration::from_secs(1)),
                should_poll: Some(in_progress()),
            },
        );

        detail.set_id(Some("snap_1".to_string()));
        loop {
            let update = rx.recv().await.expect("update");
            assert!(detail.apply(update));
            if detail.data().is_some_and(|job| job.status == "complete") {
                break;
            }
            assert!(detail.polling());
        }
        assert!(!detail.polling());
        assert_eq!(calls.load(Ordering::SeqCst), 3);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn poll_failure_keeps_last_known_data() {
        let calls = Arc::new(AtomicUsize::new(0));
        let (sink, mut rx) = channel_sink();
        let mut detail = DetailPoll::new(
            scripted_fetcher(vec![Some("in_progress"), None, Some("complete")], calls),
            sink,
            DetailOptions {
                initial_data: None,
                poll_interval: Some(Duration::from_millis(500)),
                should_poll: Some(in_progress()),
            },
        );
        detail.set_id(Some("job_1".to_string()));

        let fetched = rx.recv().await.expect("fetch");
        assert_eq!(fetched.origin(), UpdateOrigin::Fetch);
        assert!(detail.apply(fetched));

        let failed_poll = rx.recv().await.expect("poll");
        assert_eq!(failed_poll.origin(), UpdateOrigin::Poll);
        assert!(detail.apply(failed_poll));
        assert_eq!(
            detail.data().map(|job| job.status.as_str()),
            Some("in_progress")
        );
        assert!(detail.error().is_none());
        assert!(detail.polling());

        let recovered = rx.recv().await.expect("poll");
        assert!(detail.apply(recovered));
        assert_eq!(detail.data().map(|job| job.status.as_str()), Some("complete"));
    }

    #[tokio::test(start_paused = true)]
    async fn changing_interval_rearms_poll() {
        let calls = Arc::new(AtomicUsize::new(0));
        let (sink, mut rx) = channel_sink();
        let mut detail = DetailPoll::new(
            scripted_fetcher(vec![Some("in_progress"), Some("in_progress")], calls.clone()),
            sink,
            DetailOptions {
                initial_data: None,
                poll_interval: None,
                should_poll: Some(in_progress()),
            },
        );
        detail.set_id(Some("bpt_1".to_string()));
        let fetched = rx.recv().await.expect("fetch");
        assert!(detail.apply(fetched));
        assert!(!detail.polling());

        detail.set_poll_interval(Some(Duration::from_secs(1)));
        assert!(detail.polling());
        let polled = rx.recv().await.expect("poll");
        assert_eq!(polled.origin(), UpdateOrigin::Poll);
        assert!(detail.apply(polled));
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        detail.set_poll_interval(None);
        assert!(!detail.polling());
        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn fetch_failure_falls_back_to_initial_data() {
        let (sink, mut rx) = channel_sink();
        let initial = Job {
            id: "dbx_1".to_string(),
            status: "from list".to_string(),
        };
        let mut detail = DetailPoll::new(
            scripted_fetcher(vec![None], Arc::new(AtomicUsize::new(0))),
            sink,
            DetailOptions {
                initial_data: Some(initial.clone()),
                poll_interval: None,
                should_poll: None,
            },
        );
        detail.set_id(Some("dbx_1".to_string()));
        let update = rx.recv().await.expect("update");
        assert!(detail.apply(update));

        assert_eq!(detail.data(), Some(&initial));
        assert_eq!(detail.error(), Some("call 0 failed"));
        assert!(!detail.loading());
    }

    #[tokio::test(start_paused = true)]
    async fn updates_from_other_instances_are_ignored() {
        let (sink, mut rx) = channel_sink();
        let fetcher = scripted_fetcher(
            vec![Some("running"), Some("running")],
            Arc::new(AtomicUsize::new(0)),
        );
        let mut first = DetailPoll::new(fetcher.clone(), sink.clone(), DetailOptions::default());
        let mut second = DetailPoll::new(fetcher, sink, DetailOptions::default());

        first.set_id(Some("dbx_1".to_string()));
        let update = rx.recv().await.expect("update");
        assert!(!second.apply(update));
        assert!(second.data().is_none());

        second.set_id(Some("dbx_1".to_string()));
        let update = rx.recv().await.expect("update");
        assert!(second.apply(update));
        assert!(first.loading());
    }
}
