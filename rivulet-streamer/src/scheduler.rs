use crate::streamer::StreamerEvent;
use crate::transport::{FetchError, StreamingTransport};
use crossbeam_channel::{Receiver, Sender};
use rivulet_base::hashing::HashMap;
use rivulet_base::{CanonicalAssetPath, Priority};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

//
// Download scheduling: a strict-priority queue feeding a fixed pool of
// transfer worker threads. The queue and the retry policy live here; state
// machine transitions do not. Workers report outcomes back to the streamer
// coordinator through its event channel and never touch shared state
// directly.
//

#[derive(Debug, Clone)]
pub struct DownloadTask {
    pub path: CanonicalAssetPath,
    pub priority: Priority,
    pub attempt: u32,
}

/// Priority queue over a plain vector. Insertion scans for the first element
/// of strictly lower priority, so entries are stable within their band. This
/// is O(n) per insert, which is fine at the tens-of-pending-downloads scale
/// this queue sees.
#[derive(Default)]
pub struct DownloadQueue {
    tasks: Vec<DownloadTask>,
}

impl DownloadQueue {
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn contains(
        &self,
        path: &CanonicalAssetPath,
    ) -> bool {
        self.tasks.iter().any(|task| &task.path == path)
    }

    /// Queue a task behind everything of equal or higher priority.
    pub fn push_back(
        &mut self,
        task: DownloadTask,
    ) {
        let position = self
            .tasks
            .iter()
            .position(|queued| queued.priority > task.priority)
            .unwrap_or(self.tasks.len());
        self.tasks.insert(position, task);
    }

    /// Queue a task ahead of everything else. Used for retries so recovery
    /// does not lose its place behind fresh requests.
    pub fn push_front(
        &mut self,
        task: DownloadTask,
    ) {
        self.tasks.insert(0, task);
    }

    pub fn pop_front(&mut self) -> Option<DownloadTask> {
        if self.tasks.is_empty() {
            None
        } else {
            Some(self.tasks.remove(0))
        }
    }
}

struct DownloadRequest {
    path: CanonicalAssetPath,
    url: String,
    attempt: u32,
}

// Thread that takes transfer jobs off the request channel until the finish
// channel is signalled
struct DownloadWorkerThread {
    finish_tx: Sender<()>,
    join_handle: JoinHandle<()>,
}

impl DownloadWorkerThread {
    fn new(
        transport: Arc<dyn StreamingTransport>,
        request_rx: Receiver<DownloadRequest>,
        result_tx: Sender<StreamerEvent>,
        active_request_count: Arc<AtomicUsize>,
        thread_index: usize,
    ) -> Self {
        let (finish_tx, finish_rx) = crossbeam_channel::bounded(1);
        let join_handle = std::thread::Builder::new()
            .name(format!("Download Worker {}", thread_index))
            .spawn(move || loop {
                crossbeam_channel::select! {
                    recv(request_rx) -> msg => {
                        let request = match msg {
                            Ok(request) => request,
                            Err(_) => return,
                        };

                        profiling::scope!("DownloadRequest");
                        log::trace!(
                            "Start transfer {} attempt {}",
                            request.url,
                            request.attempt
                        );
                        let result = transport.fetch(&request.url);

                        // The coordinator may already be gone during shutdown
                        let _ = result_tx.send(StreamerEvent::DownloadComplete {
                            path: request.path,
                            attempt: request.attempt,
                            result,
                        });
                        active_request_count.fetch_sub(1, Ordering::Release);
                    },
                    recv(finish_rx) -> _msg => {
                        return;
                    }
                }
            })
            .expect("failed to spawn download worker thread");

        DownloadWorkerThread {
            finish_tx,
            join_handle,
        }
    }
}

// Spawns N worker threads, proxies transfer jobs to them, and stops the
// threads when the pool is dropped
struct DownloadPool {
    worker_threads: Vec<DownloadWorkerThread>,
    request_tx: Sender<DownloadRequest>,
    active_request_count: Arc<AtomicUsize>,
}

impl DownloadPool {
    fn new(
        transport: Arc<dyn StreamingTransport>,
        worker_count: usize,
        result_tx: Sender<StreamerEvent>,
    ) -> Self {
        let (request_tx, request_rx) = crossbeam_channel::unbounded::<DownloadRequest>();
        let active_request_count = Arc::new(AtomicUsize::new(0));

        let mut worker_threads = Vec::with_capacity(worker_count);
        for thread_index in 0..worker_count {
            let worker = DownloadWorkerThread::new(
                transport.clone(),
                request_rx.clone(),
                result_tx.clone(),
                active_request_count.clone(),
                thread_index,
            );
            worker_threads.push(worker);
        }

        DownloadPool {
            worker_threads,
            request_tx,
            active_request_count,
        }
    }

    fn active_requests(&self) -> usize {
        self.active_request_count.load(Ordering::Acquire)
    }

    fn add_request(
        &self,
        request: DownloadRequest,
    ) {
        self.active_request_count.fetch_add(1, Ordering::Release);
        let _ = self.request_tx.send(request);
    }

    fn finish(self) {
        for worker_thread in &self.worker_threads {
            let _ = worker_thread.finish_tx.send(());
        }

        for worker_thread in self.worker_threads {
            let _ = worker_thread.join_handle.join();
        }
    }
}

/// Outcome of a completed transfer after the retry policy has been applied.
#[derive(Debug)]
pub enum DownloadOutcome {
    /// Bytes arrived, hand them to the caching step
    Fetched(Vec<u8>),
    /// Transfer failed but the task was requeued for another attempt
    Retrying,
    /// Attempts exhausted, terminal failure
    Failed(String),
}

pub struct DownloadScheduler {
    queue: DownloadQueue,
    pool: Option<DownloadPool>,
    in_flight: HashMap<CanonicalAssetPath, Priority>,
    base_url: String,
    max_concurrent: usize,
    retry_attempts: u32,
}

impl Drop for DownloadScheduler {
    fn drop(&mut self) {
        if let Some(pool) = self.pool.take() {
            pool.finish();
        }
    }
}

impl DownloadScheduler {
    pub fn new(
        transport: Arc<dyn StreamingTransport>,
        base_url: String,
        max_concurrent: usize,
        retry_attempts: u32,
        result_tx: Sender<StreamerEvent>,
    ) -> DownloadScheduler {
        let pool = DownloadPool::new(transport, max_concurrent, result_tx);
        DownloadScheduler {
            queue: DownloadQueue::default(),
            pool: Some(pool),
            in_flight: HashMap::default(),
            base_url: base_url.trim_end_matches('/').to_string(),
            max_concurrent,
            retry_attempts,
        }
    }

    pub fn queued_count(&self) -> usize {
        self.queue.len()
    }

    pub fn download_url(
        &self,
        path: &CanonicalAssetPath,
    ) -> String {
        format!("{}/{}", self.base_url, path.as_str())
    }

    /// Queue a download. A path that is already queued or in flight is left
    /// alone; the streamer's record table guarantees completion events fan
    /// out to everyone interested.
    pub fn enqueue(
        &mut self,
        path: CanonicalAssetPath,
        priority: Priority,
    ) {
        if self.queue.contains(&path) || self.in_flight.contains_key(&path) {
            log::debug!("Download for {} already pending, not requeueing", path);
            return;
        }

        log::debug!("Queue download for {} at priority {}", path, priority);
        self.queue.push_back(DownloadTask {
            path,
            priority,
            attempt: 0,
        });
    }

    /// Dispatch queued tasks onto free workers until the pool is saturated
    /// or the queue is drained.
    pub fn pump(&mut self) {
        let pool = match self.pool.as_ref() {
            Some(pool) => pool,
            None => return,
        };

        while pool.active_requests() < self.max_concurrent {
            let task = match self.queue.pop_front() {
                Some(task) => task,
                None => break,
            };

            let url = self.download_url(&task.path);
            log::debug!(
                "Dispatch {} attempt {} of {}",
                url,
                task.attempt + 1,
                self.retry_attempts
            );
            self.in_flight.insert(task.path.clone(), task.priority);
            pool.add_request(DownloadRequest {
                path: task.path,
                url,
                attempt: task.attempt,
            });
        }
    }

    /// Apply the retry policy to a completed transfer. Retriable failures go
    /// back to the front of the queue; the caller pumps afterwards.
    pub fn complete(
        &mut self,
        path: &CanonicalAssetPath,
        attempt: u32,
        result: Result<Vec<u8>, FetchError>,
    ) -> DownloadOutcome {
        let priority = self
            .in_flight
            .remove(path)
            .unwrap_or(Priority::Unknown);

        match result {
            Ok(bytes) => {
                log::debug!("Transfer complete for {} ({} bytes)", path, bytes.len());
                DownloadOutcome::Fetched(bytes)
            }
            Err(error) => {
                let attempts_used = attempt + 1;
                if attempts_used < self.retry_attempts {
                    log::warn!(
                        "Transfer failed for {} (attempt {} of {}): {}, retrying",
                        path,
                        attempts_used,
                        self.retry_attempts,
                        error
                    );
                    self.queue.push_front(DownloadTask {
                        path: path.clone(),
                        priority,
                        attempt: attempts_used,
                    });
                    DownloadOutcome::Retrying
                } else {
                    log::error!(
                        "Transfer failed for {} after {} attempts: {}",
                        path,
                        attempts_used,
                        error
                    );
                    DownloadOutcome::Failed(format!(
                        "download failed after {} attempts: {}",
                        attempts_used, error
                    ))
                }
            }
        }
    }
}
