//! 测试公共模块
//!
//! 提供测试用的公共函数和工具

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use mpq_name_breaker::config::TargetHashes;
use mpq_name_breaker::cpu::CpuDevice;
use mpq_name_breaker::device::{ComputeDevice, DeviceKind, DeviceSession, SharedDevice};
use mpq_name_breaker::enumerator::{Batch, Enumerator};
use mpq_name_breaker::error::{BreakerError, BreakerResult};
use mpq_name_breaker::hash::{HashType, PrefixSeeds, hash_string};
use mpq_name_breaker::hints::HintBounds;
use mpq_name_breaker::kernel::{KernelContext, Worker};
use mpq_name_breaker::odometer::IndexState;
use mpq_name_breaker::Charset;

/// 完整名称的哈希对
pub fn targets_for(name: &str) -> TargetHashes {
    TargetHashes::new(
        hash_string(name.as_bytes(), HashType::NameA),
        hash_string(name.as_bytes(), HashType::NameB),
    )
}

/// 完整名称的十六进制哈希对 (与命令行输入格式相同)
pub fn hex_targets(name: &str) -> (String, String) {
    let targets = targets_for(name);
    (
        format!("{:08X}", targets.hash_a),
        format!("{:08X}", targets.hash_b),
    )
}

/// 不会命中任何候选的内核上下文, 用于枚举测试
pub fn enumeration_context(
    charset: &Charset,
    hints: HintBounds,
    batch_char_count: usize,
    max_len: usize,
) -> KernelContext {
    KernelContext::new(
        TargetHashes::new(0, 0),
        PrefixSeeds::new(b""),
        "",
        charset.clone(),
        hints,
        batch_char_count,
        max_len,
    )
}

/// 按发出顺序展开所有批次的所有种子, 返回候选字符索引序列
pub fn expand_all_batches(ctx: &KernelContext, batch_size: usize) -> Vec<Vec<u8>> {
    let mut enumerator = Enumerator::new(
        ctx.charset.len(),
        ctx.hints,
        ctx.batch_char_count(),
        ctx.max_len(),
    )
    .unwrap();

    let mut out = Vec::new();
    while let Some(batch) = enumerator.next_batch(batch_size) {
        out.extend(expand_batch(ctx, &batch));
    }
    out
}

/// 展开一个批次
pub fn expand_batch(ctx: &KernelContext, batch: &Batch) -> Vec<Vec<u8>> {
    let mut out = Vec::new();
    for (worker_id, seed) in batch.seeds.iter().enumerate() {
        if seed.is_empty() {
            continue;
        }
        let mut worker = Worker::new(ctx, *seed, batch.is_widened(worker_id));
        out.push(worker.state().digits().to_vec());
        while worker.advance() {
            out.push(worker.state().digits().to_vec());
        }
    }
    out
}

/// 朴素枚举: 长度 1..=max_len 的全部索引序列, 按 (长度, 字典序)
pub fn brute_force_indexes(charset_len: usize, max_len: usize) -> Vec<Vec<u8>> {
    let mut out = Vec::new();
    let mut current: Vec<Vec<u8>> = vec![Vec::new()];
    for _ in 0..max_len {
        let mut next = Vec::with_capacity(current.len() * charset_len);
        for prefix in &current {
            for digit in 0..charset_len as u8 {
                let mut name = prefix.clone();
                name.push(digit);
                next.push(name);
            }
        }
        out.extend(next.iter().cloned());
        current = next;
    }
    out
}

/// 字符串前 `min(len, hint.len())` 个位置与提示比较
pub fn within_hints(name: &[u8], before: &[u8], after: &[u8]) -> bool {
    let lower = before.len().min(name.len());
    let upper = after.len().min(name.len());
    name[..lower] >= before[..lower] && name[..upper] <= after[..upper]
}

pub fn cpu_device(threads: usize) -> SharedDevice {
    Arc::new(CpuDevice::new(Some(threads)))
}

/// 记录每个执行过的种子, 然后交给 CPU 设备执行
pub struct RecordingDevice {
    pub name: String,
    pub inner: CpuDevice,
    pub seeds: Arc<Mutex<Vec<IndexState>>>,
}

impl RecordingDevice {
    pub fn new(name: &str, seeds: Arc<Mutex<Vec<IndexState>>>) -> Self {
        Self {
            name: name.to_string(),
            inner: CpuDevice::new(Some(1)),
            seeds,
        }
    }
}

struct RecordingSession {
    inner: Box<dyn DeviceSession>,
    seeds: Arc<Mutex<Vec<IndexState>>>,
}

impl ComputeDevice for RecordingDevice {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn kind(&self) -> DeviceKind {
        DeviceKind::Cpu
    }

    fn max_workers(&self) -> usize {
        8
    }

    fn open(&self, ctx: &KernelContext, batch_size: usize) -> BreakerResult<Box<dyn DeviceSession>> {
        Ok(Box::new(RecordingSession {
            inner: self.inner.open(ctx, batch_size)?,
            seeds: self.seeds.clone(),
        }))
    }
}

impl DeviceSession for RecordingSession {
    fn run_batch(&mut self, batch: &Batch) -> BreakerResult<Option<IndexState>> {
        self.seeds.lock().unwrap().extend(batch.seeds.iter().copied());
        self.inner.run_batch(batch)
    }
}

/// 执行 `ok_batches` 个批次后失败的设备
pub struct FailingDevice {
    pub ok_batches: usize,
    pub runs: Arc<AtomicUsize>,
}

struct FailingSession {
    ok_batches: usize,
    runs: Arc<AtomicUsize>,
}

impl ComputeDevice for FailingDevice {
    fn name(&self) -> String {
        "broken device".to_string()
    }

    fn kind(&self) -> DeviceKind {
        DeviceKind::OpenCL
    }

    fn max_workers(&self) -> usize {
        1 << 20
    }

    fn open(&self, _ctx: &KernelContext, _batch_size: usize) -> BreakerResult<Box<dyn DeviceSession>> {
        Ok(Box::new(FailingSession {
            ok_batches: self.ok_batches,
            runs: self.runs.clone(),
        }))
    }
}

impl DeviceSession for FailingSession {
    fn run_batch(&mut self, _batch: &Batch) -> BreakerResult<Option<IndexState>> {
        if self.runs.fetch_add(1, Ordering::SeqCst) >= self.ok_batches {
            return Err(BreakerError::Device {
                device: "broken device".to_string(),
                message: "CL_OUT_OF_RESOURCES".to_string(),
            });
        }
        Ok(None)
    }
}

/// 检查 OpenCL 是否可用
#[cfg(feature = "opencl")]
pub fn is_opencl_available() -> bool {
    !ocl::Platform::list().is_empty()
}
