use std::future::Future;
use std::mem;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use futures_lite::{future, pin};

use crate::error::Result;

/// Describes how a `ThreadPool` should be created.
#[derive(Debug, Clone)]
pub struct ThreadPoolDescriptor {
    /// Number of execution units in the team, including the thread calling `scope`.
    /// `num_threads - 1` worker threads are spawned. Default: 2.
    pub num_threads: usize,
    /// The stack size of the spawned threads. Default: 2 MiB.
    pub stack_size: usize,
    /// Name of the threads. Threads will be named:
    /// {thread_name} ({thread index}), i.e. "Loop team (1)"
    /// Default: "Loop team"
    pub thread_name: String,
}

impl Default for ThreadPoolDescriptor {
    fn default() -> Self {
        Self {
            num_threads: 2,
            stack_size: 2 * 1024 * 1024,
            thread_name: "Loop team".to_owned(),
        }
    }
}

/// Worker threads of a team. Clones of a `ThreadPool` share it; the last one to go stops and
/// joins the workers.
#[derive(Debug)]
struct ThreadPoolInner {
    workers: Vec<JoinHandle<()>>,
    shutdown_tx: async_channel::Sender<()>,
}

impl Drop for ThreadPoolInner {
    fn drop(&mut self) {
        // Workers leave `Executor::run` once the channel is closed.
        self.shutdown_tx.close();

        let panicking = thread::panicking();
        for worker in self.workers.drain(..) {
            let joined = worker.join();
            if !panicking {
                joined.expect("a team worker panicked");
            }
        }
    }
}

/// A fork-join team of execution units.
///
/// Worker threads stay alive for the lifetime of the pool, but work only ever enters the pool
/// through `scope`, which joins everything it forked before returning.
#[derive(Debug, Clone)]
pub struct ThreadPool {
    executor: Arc<async_executor::Executor<'static>>,
    inner: Arc<ThreadPoolInner>,
}

impl ThreadPool {
    /// Create a new `ThreadPool`. A team size of zero is treated as one.
    ///
    /// Fails if the operating system refuses to start one of the worker threads.
    pub fn new(descriptor: &ThreadPoolDescriptor) -> Result<Self> {
        let team_size = descriptor.num_threads.max(1);
        let (shutdown_tx, shutdown_rx) = async_channel::unbounded::<()>();

        let executor = Arc::new(async_executor::Executor::new());
        let mut workers = Vec::with_capacity(team_size - 1);

        // Unit 0 is whoever calls `scope`.
        for i in 1..team_size {
            let ex = Arc::clone(&executor);
            let shutdown_rx = shutdown_rx.clone();

            let thread_name = format!("{} ({})", descriptor.thread_name, i);

            let worker = thread::Builder::new()
                .name(thread_name)
                .stack_size(descriptor.stack_size)
                .spawn(move || {
                    let shutdown_future = ex.run(shutdown_rx.recv());
                    // We expect an async_channel::RecvError once the sender is closed.
                    future::block_on(shutdown_future).unwrap_err();
                })?;

            workers.push(worker);
        }

        tracing::debug!(team_size, "started loop team");

        Ok(Self {
            executor,
            inner: Arc::new(ThreadPoolInner {
                workers,
                shutdown_tx,
            }),
        })
    }

    /// Return the number of execution units of the team, the calling thread included.
    pub fn thread_num(&self) -> usize {
        self.inner.workers.len() + 1
    }

    /// Creates a "fork-join" scope `s` and invokes the closure with a reference to `s`.
    /// This closure can then spawn futures into `s`. When the closure returns, it will block
    /// until all futures that have been spawned into `s` complete, and return their outputs in
    /// spawn order.
    ///
    /// The calling thread takes part in driving the spawned futures, so a team of one still
    /// makes progress.
    pub fn scope<'scope, S, R>(&self, s: S) -> Vec<R>
    where
        S: FnOnce(&mut Scope<'scope, R>) + 'scope + Send,
        R: Send + 'static,
    {
        // SAFETY: This function blocks until all spawned futures complete, so nothing borrowed
        // for 'scope is touched after we return. Rust can't see this, so the executor's
        // lifetime has to be narrowed by hand.
        let executor: &async_executor::Executor = &*self.executor;
        let executor: &'scope async_executor::Executor = unsafe { mem::transmute(executor) };

        let mut scope = Scope {
            executor,
            spawned: Vec::new(),
        };

        s(&mut scope);

        if scope.spawned.is_empty() {
            return Vec::new();
        }

        let joined = async move {
            let mut results = Vec::with_capacity(scope.spawned.len());
            for task in scope.spawned {
                results.push(task.await);
            }
            results
        };
        pin!(joined);

        // A single task isn't driven to completion with `block_on` directly, since a team of one
        // has no worker thread that would ever run it.
        loop {
            if let Some(results) = future::block_on(future::poll_once(&mut joined)) {
                break results;
            }

            self.executor.try_tick();
        }
    }
}

/// Scopes the execution of the units forked by a `ThreadPool::scope` call.
#[derive(Debug)]
pub struct Scope<'scope, R> {
    executor: &'scope async_executor::Executor<'scope>,
    spawned: Vec<async_executor::Task<R>>,
}

impl<'scope, R: Send + 'scope> Scope<'scope, R> {
    /// Forks a unit of work that may borrow from the stack of the thread calling `scope`.
    ///
    /// The parent thread joins on every unit before the scope exits.
    pub fn spawn<Fut: Future<Output = R> + 'scope + Send>(&mut self, f: Fut) {
        let task = self.executor.spawn(f);
        self.spawned.push(task);
    }
}
