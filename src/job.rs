//! 批次作业: 每个计算设备一个控制线程
//!
//! 控制线程在设备上创建资源, 然后循环从共享队列取批次、执行内核、
//! 检查结果。停止标志在每个批次开始前检查一次 (设备上正在执行的
//! 批次总会完成)。所有状态变化通过 `JobEvent` 发送给协调器。

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::Sender;
use log::{debug, error, info};

use crate::device::{DeviceSession, SharedDevice};
use crate::enumerator::{Batch, BatchQueue, first_batch_name_count, names_per_seed};
use crate::error::{BreakerError, BreakerResult};
use crate::kernel::KernelContext;

/// 作业发送给协调器的事件
#[derive(Debug, Clone, PartialEq)]
pub enum JobEvent {
    /// 进度统计
    Progress {
        job: usize,
        device: String,
        elapsed: Duration,
        /// 最近一个批次的最后一个种子 (含前缀/后缀)
        last_name: String,
        /// 累计处理的名称数 (估计值)
        names: u64,
    },
    Found {
        job: usize,
        device: String,
        name: String,
        names: u64,
    },
    Exhausted {
        job: usize,
        device: String,
        names: u64,
    },
    /// 达到名称总数上限, 剩余空间未搜索
    LimitReached {
        job: usize,
        device: String,
        names: u64,
    },
    Failed {
        job: usize,
        device: String,
        error: String,
    },
}

/// 作业状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Created,
    Running,
    Found,
    Exhausted,
    LimitReached,
    Stopped,
    Failed,
}

/// 作业参数
#[derive(Debug, Clone)]
pub struct JobConfig {
    pub ctx: KernelContext,
    /// 已转为大写的前缀
    pub prefix: String,
    /// 已转为大写的后缀
    pub suffix: String,
    pub batch_size: usize,
    /// 进度事件的最小间隔; 为零时每个批次都报告
    pub progress_interval: Duration,
}

pub struct BatchJob {
    id: usize,
    device: SharedDevice,
    queue: BatchQueue,
    config: Arc<JobConfig>,
    stop: Arc<AtomicBool>,
    state: Arc<Mutex<JobState>>,
    handle: Option<JoinHandle<()>>,
}

impl BatchJob {
    pub fn new(id: usize, device: SharedDevice, queue: BatchQueue, config: JobConfig) -> Self {
        Self {
            id,
            device,
            queue,
            config: Arc::new(config),
            stop: Arc::new(AtomicBool::new(false)),
            state: Arc::new(Mutex::new(JobState::Created)),
            handle: None,
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn device_name(&self) -> String {
        self.device.name()
    }

    pub fn state(&self) -> JobState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// 启动控制线程
    pub fn run(&mut self, events: Sender<JobEvent>) -> BreakerResult<()> {
        {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            if *state != JobState::Created {
                return Err(BreakerError::JobFailed(format!(
                    "job {} already started ({:?})",
                    self.id, *state
                )));
            }
            *state = JobState::Running;
        }

        let control = ControlLoop {
            id: self.id,
            device: self.device.clone(),
            queue: self.queue.clone(),
            config: self.config.clone(),
            stop: self.stop.clone(),
            events,
        };
        let state = self.state.clone();

        let handle = thread::Builder::new()
            .name(format!("batch-job-{}", self.id))
            .spawn(move || {
                let result = control.run();
                *state.lock().unwrap_or_else(PoisonError::into_inner) = result;
            })
            .map_err(|e| BreakerError::Device {
                device: self.device.name(),
                message: format!("failed to spawn control thread: {}", e),
            })?;

        self.handle = Some(handle);
        Ok(())
    }

    /// 请求停止; 在下一个批次开始前生效
    pub fn stop(&self) {
        self.stop.store(true, Ordering::Relaxed);
    }

    /// 等待控制线程退出, 返回最终状态
    pub fn join(&mut self) -> BreakerResult<JobState> {
        if let Some(handle) = self.handle.take() {
            handle.join().map_err(|_| {
                BreakerError::JobFailed(format!("control thread of job {} panicked", self.id))
            })?;
        }
        Ok(self.state())
    }
}

impl Drop for BatchJob {
    fn drop(&mut self) {
        self.stop();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

/// 控制线程持有的数据
struct ControlLoop {
    id: usize,
    device: SharedDevice,
    queue: BatchQueue,
    config: Arc<JobConfig>,
    stop: Arc<AtomicBool>,
    events: Sender<JobEvent>,
}

impl ControlLoop {
    fn send(&self, event: JobEvent) {
        // 协调器已退出时忽略
        let _ = self.events.send(event);
    }

    fn fail(&self, device: &str, error: BreakerError) -> JobState {
        error!("[{}] {}", device, error);
        self.send(JobEvent::Failed {
            job: self.id,
            device: device.to_string(),
            error: error.to_string(),
        });
        JobState::Failed
    }

    fn render(&self, digits: &[u8]) -> String {
        format!(
            "{}{}{}",
            self.config.prefix,
            self.config.ctx.charset.decode(digits),
            self.config.suffix
        )
    }

    /// 一个批次覆盖的名称数 (无边界提示时的精确值)
    fn batch_names(&self, batch: &Batch) -> u64 {
        let charset_len = self.config.ctx.charset.len();
        let batch_chars = self.config.ctx.batch_char_count();
        let per_seed = names_per_seed(charset_len, batch_chars);
        let regular = batch.len() as u64 - u64::from(batch.first);
        let widened = if batch.first {
            first_batch_name_count(charset_len, batch_chars)
        } else {
            0
        };
        per_seed.saturating_mul(regular).saturating_add(widened)
    }

    fn run(self) -> JobState {
        let device = self.device.name();
        info!("[{}] Starting batch job {}", device, self.id);

        let mut session: Box<dyn DeviceSession> =
            match self.device.open(&self.config.ctx, self.config.batch_size) {
                Ok(session) => session,
                Err(e) => return self.fail(&device, e),
            };

        let start = Instant::now();
        let mut last_report: Option<Instant> = None;
        let mut names: u64 = 0;

        loop {
            if self.stop.load(Ordering::Relaxed) {
                info!("[{}] Job {} stopped", device, self.id);
                return JobState::Stopped;
            }

            let Some(batch) = self.queue.next_batch(self.config.batch_size) else {
                if self.queue.limit_reached() {
                    info!("[{}] Name limit reached", device);
                    self.send(JobEvent::LimitReached {
                        job: self.id,
                        device,
                        names,
                    });
                    return JobState::LimitReached;
                }
                info!("[{}] Search space exhausted", device);
                self.send(JobEvent::Exhausted {
                    job: self.id,
                    device,
                    names,
                });
                return JobState::Exhausted;
            };

            let found = match session.run_batch(&batch) {
                Ok(found) => found,
                Err(e) => return self.fail(&device, e),
            };
            names = names.saturating_add(self.batch_names(&batch));

            if let Some(state) = found {
                let name = self.render(state.raw());
                // 设备报告的结果在主机端复核
                if !self.config.ctx.targets.matches(name.as_bytes()) {
                    let error = BreakerError::Device {
                        device: device.clone(),
                        message: format!("reported name '{}' does not match the target hashes", name),
                    };
                    return self.fail(&device, error);
                }
                info!("[{}] Name found!", device);
                self.send(JobEvent::Found {
                    job: self.id,
                    device,
                    name,
                    names,
                });
                return JobState::Found;
            }

            let due = last_report
                .is_none_or(|at| at.elapsed() >= self.config.progress_interval);
            if due {
                last_report = Some(Instant::now());
                let last_name = batch
                    .seeds
                    .last()
                    .map(|seed| self.render(seed.raw()))
                    .unwrap_or_default();
                self.send(JobEvent::Progress {
                    job: self.id,
                    device: device.clone(),
                    elapsed: start.elapsed(),
                    last_name,
                    names,
                });
            } else {
                debug!("[{}] batch {} done", device, batch.number);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use crossbeam_channel::unbounded;

    use super::*;
    use crate::charset::Charset;
    use crate::config::{DEFAULT_CHARSET, TargetHashes};
    use crate::cpu::CpuDevice;
    use crate::device::{ComputeDevice, DeviceKind};
    use crate::enumerator::Enumerator;
    use crate::hash::{HashType, PrefixSeeds, hash_string};
    use crate::hints::HintBounds;
    use crate::odometer::IndexState;

    fn job_config(charset: &str, name: &str, c: usize, max_len: usize) -> JobConfig {
        let targets = TargetHashes::new(
            hash_string(name.as_bytes(), HashType::NameA),
            hash_string(name.as_bytes(), HashType::NameB),
        );
        let ctx = KernelContext::new(
            targets,
            PrefixSeeds::new(b""),
            "",
            Charset::new(charset, "").unwrap(),
            HintBounds::none(),
            c,
            max_len,
        );
        JobConfig {
            ctx,
            prefix: String::new(),
            suffix: String::new(),
            batch_size: 16,
            progress_interval: Duration::ZERO,
        }
    }

    fn queue_for(config: &JobConfig) -> BatchQueue {
        BatchQueue::new(
            Enumerator::new(
                config.ctx.charset.len(),
                config.ctx.hints,
                config.ctx.batch_char_count(),
                config.ctx.max_len(),
            )
            .unwrap(),
        )
    }

    /// 对每个批次都报告同一个固定结果的设备
    struct BogusDevice;

    struct BogusSession;

    impl ComputeDevice for BogusDevice {
        fn name(&self) -> String {
            "bogus".to_string()
        }

        fn kind(&self) -> DeviceKind {
            DeviceKind::Cpu
        }

        fn max_workers(&self) -> usize {
            4
        }

        fn open(&self, _ctx: &KernelContext, _batch_size: usize) -> BreakerResult<Box<dyn DeviceSession>> {
            Ok(Box::new(BogusSession))
        }
    }

    impl DeviceSession for BogusSession {
        fn run_batch(&mut self, _batch: &Batch) -> BreakerResult<Option<IndexState>> {
            Ok(Some(IndexState::from_digits(&[0, 1, 0])))
        }
    }

    /// 统计批次数后返回错误的设备
    struct FailingDevice {
        batches: Arc<AtomicUsize>,
    }

    struct FailingSession {
        batches: Arc<AtomicUsize>,
    }

    impl ComputeDevice for FailingDevice {
        fn name(&self) -> String {
            "failing".to_string()
        }

        fn kind(&self) -> DeviceKind {
            DeviceKind::Cpu
        }

        fn max_workers(&self) -> usize {
            4
        }

        fn open(&self, _ctx: &KernelContext, _batch_size: usize) -> BreakerResult<Box<dyn DeviceSession>> {
            Ok(Box::new(FailingSession {
                batches: self.batches.clone(),
            }))
        }
    }

    impl DeviceSession for FailingSession {
        fn run_batch(&mut self, _batch: &Batch) -> BreakerResult<Option<IndexState>> {
            if self.batches.fetch_add(1, Ordering::SeqCst) >= 1 {
                return Err(BreakerError::Device {
                    device: "failing".to_string(),
                    message: "kernel launch failed".to_string(),
                });
            }
            Ok(None)
        }
    }

    #[test]
    fn test_job_finds_name() {
        let config = job_config(DEFAULT_CHARSET, "QZ", 1, 4);
        let queue = queue_for(&config);
        let (tx, rx) = unbounded();
        let mut job = BatchJob::new(0, Arc::new(CpuDevice::new(Some(2))), queue, config);
        assert_eq!(job.state(), JobState::Created);

        job.run(tx).unwrap();
        let found = rx
            .iter()
            .find(|event| !matches!(event, JobEvent::Progress { .. }))
            .unwrap();
        match found {
            JobEvent::Found { name, job: id, .. } => {
                assert_eq!(name, "QZ");
                assert_eq!(id, 0);
            }
            other => panic!("unexpected event {:?}", other),
        }
        assert_eq!(job.join().unwrap(), JobState::Found);
    }

    #[test]
    fn test_job_exhausts_small_space() {
        // "DDD" 不在 {A, B, C} 上
        let config = job_config("ABC", "DDD", 1, 3);
        let queue = queue_for(&config);
        let (tx, rx) = unbounded();
        let mut job = BatchJob::new(3, Arc::new(CpuDevice::new(Some(1))), queue, config);
        job.run(tx).unwrap();

        let events: Vec<JobEvent> = rx.iter().collect();
        match events.last() {
            Some(JobEvent::Exhausted { job, names, .. }) => {
                assert_eq!(*job, 3);
                // 3 + 9 + 27
                assert_eq!(*names, 39);
            }
            other => panic!("unexpected event {:?}", other),
        }
        assert!(events.iter().any(|e| matches!(e, JobEvent::Progress { .. })));
        assert_eq!(job.join().unwrap(), JobState::Exhausted);
    }

    #[test]
    fn test_job_reports_name_limit() {
        // "ZZ" 在空间内, 但上限在第一个批次后生效
        let config = job_config(DEFAULT_CHARSET, "ZZ", 1, 4);
        let queue = BatchQueue::new(
            Enumerator::new(config.ctx.charset.len(), HintBounds::none(), 1, 4)
                .unwrap()
                .with_name_limit(Some(1)),
        );
        let (tx, rx) = unbounded();
        let mut job = BatchJob::new(2, Arc::new(CpuDevice::new(Some(1))), queue, config);
        job.run(tx).unwrap();

        let terminal = rx
            .iter()
            .find(|event| !matches!(event, JobEvent::Progress { .. }))
            .unwrap();
        match terminal {
            JobEvent::LimitReached { job, names, .. } => {
                assert_eq!(job, 2);
                // 第一个批次: 16 个种子, 0 号种子覆盖长度 1 和 2
                assert_eq!(names, 15 * 38 + 38 + 38);
            }
            other => panic!("unexpected event {:?}", other),
        }
        assert_eq!(job.join().unwrap(), JobState::LimitReached);
    }

    #[test]
    fn test_unverified_result_fails_job() {
        let config = job_config("ABC", "CCC", 1, 3);
        let queue = queue_for(&config);
        let (tx, rx) = unbounded();
        let mut job = BatchJob::new(0, Arc::new(BogusDevice), queue, config);
        job.run(tx).unwrap();

        let terminal = rx
            .iter()
            .find(|event| !matches!(event, JobEvent::Progress { .. }))
            .unwrap();
        match terminal {
            JobEvent::Failed { error, .. } => assert!(error.contains("ABA"), "{}", error),
            other => panic!("unexpected event {:?}", other),
        }
        assert_eq!(job.join().unwrap(), JobState::Failed);
    }

    #[test]
    fn test_device_failure_is_reported() {
        let config = job_config(DEFAULT_CHARSET, "UNREACHABLE", 2, 16);
        let queue = queue_for(&config);
        let (tx, rx) = unbounded();
        let batches = Arc::new(AtomicUsize::new(0));
        let device = Arc::new(FailingDevice {
            batches: batches.clone(),
        });
        let mut job = BatchJob::new(1, device, queue, config);
        job.run(tx).unwrap();

        let terminal = rx
            .iter()
            .find(|event| !matches!(event, JobEvent::Progress { .. }))
            .unwrap();
        assert!(matches!(terminal, JobEvent::Failed { job: 1, .. }));
        assert_eq!(job.join().unwrap(), JobState::Failed);
        assert_eq!(batches.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_stop_before_first_batch() {
        let config = job_config(DEFAULT_CHARSET, "UNREACHABLE", 3, 16);
        let queue = queue_for(&config);
        let (tx, rx) = unbounded();
        let mut job = BatchJob::new(0, Arc::new(CpuDevice::new(Some(1))), queue, config);
        job.stop();
        job.run(tx).unwrap();
        assert_eq!(job.join().unwrap(), JobState::Stopped);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_job_cannot_run_twice() {
        let config = job_config("ABC", "DDD", 1, 3);
        let queue = queue_for(&config);
        let (tx, _rx) = unbounded();
        let mut job = BatchJob::new(0, Arc::new(CpuDevice::new(Some(1))), queue, config);
        job.run(tx.clone()).unwrap();
        assert!(job.run(tx).is_err());
        job.join().unwrap();
    }
}
