//! CPU 设备: 在 rayon 线程池上并行执行内核

use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::device::{ComputeDevice, DeviceKind, DeviceSession};
use crate::enumerator::Batch;
use crate::error::{BreakerError, BreakerResult};
use crate::kernel::{KernelContext, run_worker};
use crate::odometer::IndexState;

/// 每个 CPU 线程分配的工作线程数 (种子数)
const WORKERS_PER_THREAD: usize = 64;

#[derive(Debug, Clone)]
pub struct CpuDevice {
    threads: usize,
}

impl CpuDevice {
    /// `threads` 为空时使用全部可用核心
    pub fn new(threads: Option<usize>) -> Self {
        let threads = threads
            .filter(|&n| n > 0)
            .unwrap_or_else(|| {
                std::thread::available_parallelism()
                    .map(|n| n.get())
                    .unwrap_or(1)
            });
        Self { threads }
    }

    pub fn threads(&self) -> usize {
        self.threads
    }
}

impl ComputeDevice for CpuDevice {
    fn name(&self) -> String {
        format!("CPU ({} threads)", self.threads)
    }

    fn kind(&self) -> DeviceKind {
        DeviceKind::Cpu
    }

    fn max_workers(&self) -> usize {
        self.threads * WORKERS_PER_THREAD
    }

    fn open(&self, ctx: &KernelContext, _batch_size: usize) -> BreakerResult<Box<dyn DeviceSession>> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(self.threads)
            .thread_name(|i| format!("cpu-kernel-{}", i))
            .build()
            .map_err(|e| BreakerError::Device {
                device: self.name(),
                message: e.to_string(),
            })?;

        Ok(Box::new(CpuSession {
            pool,
            ctx: ctx.clone(),
        }))
    }
}

struct CpuSession {
    pool: ThreadPool,
    ctx: KernelContext,
}

impl DeviceSession for CpuSession {
    fn run_batch(&mut self, batch: &Batch) -> BreakerResult<Option<IndexState>> {
        let ctx = &self.ctx;
        let found = self.pool.install(|| {
            batch
                .seeds
                .par_iter()
                .enumerate()
                .find_map_any(|(worker, &seed)| run_worker(ctx, seed, batch.is_widened(worker)))
        });
        Ok(found)
    }
}
