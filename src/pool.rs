//! Fixed-size worker pool that hashes the same relative file under each root.
//!
//! Jobs are handed over a rendezvous channel, so `submit` blocks while every
//! worker is busy. Each job carries its own one-shot reply channel; results
//! are read back in submission order on the calling thread.

use anyhow::{Context, Result, anyhow};
use crossbeam_channel::{Receiver, Sender, TryRecvError, bounded};
use log::debug;
use std::collections::VecDeque;
use std::path::PathBuf;
use std::thread::{self, JoinHandle};

use crate::hasher;
use crate::utils::Cancel;

#[derive(Debug, Clone)]
pub struct HashJob {
    /// Path relative to the roots.
    pub name: PathBuf,
    /// The file under each root, in root order.
    pub paths: Vec<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct HashResult {
    pub name: PathBuf,
    /// Digest per root, in the same order as `HashJob::paths`.
    pub digests: Vec<(PathBuf, Option<u64>)>,
}

type Envelope = (HashJob, Sender<HashResult>);

pub struct HashPool {
    jobs: Option<Sender<Envelope>>,
    pending: VecDeque<Receiver<HashResult>>,
    workers: Vec<JoinHandle<()>>,
}

impl HashPool {
    pub fn new(worker_count: usize, cancel: Cancel) -> Result<Self> {
        let (tx, rx) = bounded::<Envelope>(0);
        let mut workers = Vec::with_capacity(worker_count.max(1));

        for idx in 0..worker_count.max(1) {
            let rx = rx.clone();
            let cancel = cancel.clone();
            let handle = thread::Builder::new()
                .name(format!("hash-worker-{idx}"))
                .spawn(move || {
                    for (job, reply) in rx.iter() {
                        if cancel.is_cancelled() {
                            continue;
                        }
                        let digests = job
                            .paths
                            .into_iter()
                            .map(|path| {
                                let digest = hasher::compute(&path);
                                (path, digest)
                            })
                            .collect();
                        let _ = reply.send(HashResult {
                            name: job.name,
                            digests,
                        });
                    }
                })
                .context("Failed to spawn hash worker")?;
            workers.push(handle);
        }

        Ok(Self {
            jobs: Some(tx),
            pending: VecDeque::new(),
            workers,
        })
    }

    /// Queues a job, blocking until a worker is free to take it.
    pub fn submit(&mut self, job: HashJob) -> Result<()> {
        let (reply_tx, reply_rx) = bounded(1);
        self.jobs
            .as_ref()
            .ok_or_else(|| anyhow!("Hash pool already shut down"))?
            .send((job, reply_tx))
            .map_err(|_| anyhow!("Hash workers stopped unexpectedly"))?;
        self.pending.push_back(reply_rx);
        Ok(())
    }

    /// Results that are complete at the front of the queue, without blocking.
    pub fn ready(&mut self) -> Vec<HashResult> {
        let mut done = Vec::new();
        while let Some(front) = self.pending.front() {
            match front.try_recv() {
                Ok(result) => {
                    done.push(result);
                    self.pending.pop_front();
                }
                Err(TryRecvError::Disconnected) => {
                    self.pending.pop_front();
                }
                Err(TryRecvError::Empty) => break,
            }
        }
        done
    }

    /// Blocks until every submitted job has finished. Jobs dropped because of
    /// cancellation yield no result.
    pub fn wait(&mut self) -> Vec<HashResult> {
        let mut done = Vec::with_capacity(self.pending.len());
        while let Some(rx) = self.pending.pop_front() {
            if let Ok(result) = rx.recv() {
                done.push(result);
            }
        }
        done
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }
}

impl Drop for HashPool {
    fn drop(&mut self) {
        self.jobs.take();
        for handle in self.workers.drain(..) {
            if handle.join().is_err() {
                debug!("Hash worker panicked");
            }
        }
    }
}
