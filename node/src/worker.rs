//! Async shell around the controller.
//!
//! One tokio task owns the [`NodeController`]. Block retrieval and backoff
//! sleeps are the only awaits; everything the source or a peer delivers goes
//! through a single ordered queue, so blocks are applied one at a time and a
//! new block never interleaves with a batch.

use std::collections::VecDeque;
use std::future::Future;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, Instrument};

use crate::tracing_spans::request_blocks_span;
use crate::{BlockSource, NextStep, NodeController, NodeError, NodeStatus, SourceBlock};

/// Waits out retry delays. Swapped for a manual clock in tests.
pub trait Sleeper: Send + Sync + 'static {
    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct TokioSleeper;

impl Sleeper for TokioSleeper {
    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send {
        tokio::time::sleep(duration)
    }
}

#[derive(Debug)]
pub enum WorkItem {
    /// A batch pushed by a peer.
    Blocks(Vec<SourceBlock>),
    /// A newly announced block.
    NewBlock(SourceBlock),
    /// Clear the stale flag and catch up from the source again.
    Restart,
    Shutdown,
}

pub struct WorkerHandle {
    sender: mpsc::Sender<WorkItem>,
    status: watch::Receiver<NodeStatus>,
    join: JoinHandle<NodeController>,
}

impl WorkerHandle {
    pub async fn submit(&self, item: WorkItem) -> Result<(), NodeError> {
        self.sender
            .send(item)
            .await
            .map_err(|_| NodeError::WorkerStopped)
    }

    pub fn sender(&self) -> mpsc::Sender<WorkItem> {
        self.sender.clone()
    }

    /// Latest chain height, state and stale flag.
    pub fn status(&self) -> watch::Receiver<NodeStatus> {
        self.status.clone()
    }

    /// Stop the worker and take the controller back.
    pub async fn shutdown(self) -> Result<NodeController, NodeError> {
        // A worker that already exited still hands back its controller.
        let _ = self.sender.send(WorkItem::Shutdown).await;
        self.join.await.map_err(|_| NodeError::WorkerStopped)
    }
}

/// Spawn the worker task. It starts catching up from `source` immediately.
pub fn spawn_worker<S, C>(
    controller: NodeController,
    source: S,
    sleeper: C,
    queue_capacity: usize,
) -> WorkerHandle
where
    S: BlockSource + 'static,
    C: Sleeper,
{
    let (sender, receiver) = mpsc::channel(queue_capacity.max(1));
    let (status_tx, status) = watch::channel(controller.status());
    let worker = Worker {
        controller,
        source,
        sleeper,
        receiver,
        status: status_tx,
        deferred: VecDeque::new(),
    };
    let join = tokio::spawn(worker.run());
    WorkerHandle {
        sender,
        status,
        join,
    }
}

struct Worker<S, C> {
    controller: NodeController,
    source: S,
    sleeper: C,
    receiver: mpsc::Receiver<WorkItem>,
    status: watch::Sender<NodeStatus>,
    /// Items that arrived while a retry delay was running.
    deferred: VecDeque<WorkItem>,
}

impl<S: BlockSource, C: Sleeper> Worker<S, C> {
    async fn run(mut self) -> NodeController {
        info!(role = ?self.source.role(), "ledger worker started");
        let mut next = Some(NextStep::Request {
            from_height: self.controller.start(),
            delay: Duration::ZERO,
        });
        self.publish_status();

        loop {
            if let Some(NextStep::Request { from_height, delay }) = next.take() {
                if !delay.is_zero() && !self.wait(delay).await {
                    break;
                }
                let result = self
                    .source
                    .request_blocks(from_height)
                    .instrument(request_blocks_span(from_height))
                    .await;
                let step = match result {
                    Ok(blocks) => self.controller.on_blocks_received(blocks),
                    Err(e) => self.controller.on_request_failed(&e),
                };
                next = settle(step);
                self.publish_status();
                continue;
            }

            let item = match self.deferred.pop_front() {
                Some(item) => Some(item),
                None => self.receiver.recv().await,
            };
            let step = match item {
                Some(WorkItem::Blocks(blocks)) => self.controller.on_blocks_received(blocks),
                Some(WorkItem::NewBlock(block)) => self.controller.on_new_block_received(block),
                Some(WorkItem::Restart) => Ok(NextStep::Request {
                    from_height: self.controller.start(),
                    delay: Duration::ZERO,
                }),
                Some(WorkItem::Shutdown) | None => break,
            };
            next = settle(step);
            self.publish_status();
        }

        info!(chain_height = self.controller.chain_height(), "ledger worker stopped");
        self.controller
    }

    /// Sleep for `delay`, queueing anything that arrives meanwhile. Returns
    /// `false` if asked to shut down.
    async fn wait(&mut self, delay: Duration) -> bool {
        debug!(delay_ms = delay.as_millis() as u64, "waiting before retry");
        let sleep = self.sleeper.sleep(delay);
        tokio::pin!(sleep);
        loop {
            tokio::select! {
                _ = &mut sleep => return true,
                item = self.receiver.recv() => match item {
                    Some(WorkItem::Shutdown) | None => return false,
                    Some(item) => self.deferred.push_back(item),
                },
            }
        }
    }

    fn publish_status(&self) {
        self.status.send_replace(self.controller.status());
    }
}

fn settle(step: Result<NextStep, NodeError>) -> Option<NextStep> {
    match step {
        Ok(NextStep::Wait) => None,
        Ok(request) => Some(request),
        Err(e) => {
            error!(error = %e, "ledger worker idle");
            None
        }
    }
}
