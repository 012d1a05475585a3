//! Worker pool: one long-lived request loop per worker, hosted on rayon
//! threads, all answering into a single response channel.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::time::Duration;

#[cfg(feature = "parallel")]
use log::info;

use crate::core::{Error, Result};

use super::protocol::{WorkerRequest, WorkerResponse};
#[cfg(feature = "parallel")]
use super::worker::Worker;

/// Upper bound for the automatic pool size.
pub const MAX_AUTO_WORKERS: usize = 8;

/// Whether this build can share one transport region between threads.
/// On wasm that needs the `atomics` target feature (SharedArrayBuffer).
pub fn shared_memory_supported() -> bool {
    cfg!(any(not(target_arch = "wasm32"), target_feature = "atomics"))
}

/// Hardware concurrency minus one for the control thread, in
/// `[1, MAX_AUTO_WORKERS]`. Unknown concurrency counts as 4.
pub fn default_pool_size() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
        .saturating_sub(1)
        .clamp(1, MAX_AUTO_WORKERS)
}

#[cfg(feature = "parallel")]
enum WorkerHost {
    Dedicated(rayon::ThreadPool),
    /// The global pool, set up by `init_thread_pool` on the JS side.
    #[cfg(target_arch = "wasm32")]
    Global,
}

#[cfg(feature = "parallel")]
impl WorkerHost {
    #[cfg(not(target_arch = "wasm32"))]
    fn new(size: usize) -> Result<Self> {
        rayon::ThreadPoolBuilder::new()
            .num_threads(size)
            .thread_name(|i| format!("bouncebox-collide-{i}"))
            .build()
            .map(WorkerHost::Dedicated)
            .map_err(|e| Error::WorkerSpawn(e.to_string()))
    }

    #[cfg(target_arch = "wasm32")]
    fn new(size: usize) -> Result<Self> {
        if !cfg!(target_feature = "atomics") {
            return Err(Error::WorkerSpawn("this build has no thread support".into()));
        }
        let available = rayon::current_num_threads();
        if available < size {
            return Err(Error::WorkerSpawn(format!(
                "thread pool has {available} threads, {size} needed"
            )));
        }
        Ok(WorkerHost::Global)
    }

    fn spawn(&self, job: impl FnOnce() + Send + 'static) {
        match self {
            WorkerHost::Dedicated(pool) => pool.spawn(job),
            #[cfg(target_arch = "wasm32")]
            WorkerHost::Global => rayon::spawn(job),
        }
    }
}

pub struct WorkerPool {
    // Dropped first: closing the request channels ends every worker loop.
    senders: Vec<Sender<WorkerRequest>>,
    responses: Receiver<WorkerResponse>,
    #[cfg(feature = "parallel")]
    _host: WorkerHost,
}

impl WorkerPool {
    /// Start `size` workers. Worker `i` seeds its tie-break generator from
    /// `derive_seed(seed, i)`.
    #[cfg(feature = "parallel")]
    pub fn spawn(size: usize, seed: u32) -> Result<Self> {
        use crate::core::random::derive_seed;

        let size = size.max(1);
        let host = WorkerHost::new(size)?;
        let (reply_tx, responses) = mpsc::channel();
        let mut senders = Vec::with_capacity(size);
        for id in 0..size {
            let (tx, rx) = mpsc::channel();
            let out = reply_tx.clone();
            let worker = Worker::new(id, derive_seed(seed, id as u32));
            host.spawn(move || worker.run(rx, out));
            senders.push(tx);
        }
        info!("collision pool started with {size} workers");
        Ok(Self { senders, responses, _host: host })
    }

    #[cfg(not(feature = "parallel"))]
    pub fn spawn(_size: usize, _seed: u32) -> Result<Self> {
        Err(Error::WorkerSpawn("built without the `parallel` feature".into()))
    }

    pub fn len(&self) -> usize {
        self.senders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.senders.is_empty()
    }

    pub fn send(&self, worker: usize, request: WorkerRequest) -> Result<()> {
        let tx = self.senders.get(worker).ok_or_else(|| Error::invalid(format!("no worker {worker}")))?;
        tx.send(request).map_err(|_| Error::WorkerDisconnected)
    }

    /// Send one request per worker, built by `make(worker_index)`.
    pub fn broadcast(&self, mut make: impl FnMut(usize) -> WorkerRequest) -> Result<()> {
        for worker in 0..self.senders.len() {
            self.send(worker, make(worker))?;
        }
        Ok(())
    }

    pub fn try_recv(&self) -> Result<Option<WorkerResponse>> {
        match self.responses.try_recv() {
            Ok(r) => Ok(Some(r)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(Error::WorkerDisconnected),
        }
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Result<Option<WorkerResponse>> {
        match self.responses.recv_timeout(timeout) {
            Ok(r) => Ok(Some(r)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(Error::WorkerDisconnected),
        }
    }
}
