//! 对外提供的 Rust 调用接口

use anyhow::{anyhow, bail};
use crossbeam_channel::unbounded;
use log::{info, warn};
use std::time::{Duration, Instant};

use crate::charset::Charset;
use crate::config::{DEFAULT_CHARSET, MAX_GENERATED_CHARS, TargetHashes, default_batch_char_count};
use crate::device::{SharedDevice, best_device, list_devices};
use crate::enumerator::{BatchQueue, Enumerator};
use crate::hash::PrefixSeeds;
use crate::hints::HintBounds;
use crate::job::{BatchJob, JobConfig, JobEvent};
use crate::kernel::KernelContext;

#[derive(Debug, Clone)]
pub struct SearchRequest {
    /// 目标哈希 A (十六进制)
    pub hash_a: String,
    /// 目标哈希 B (十六进制)
    pub hash_b: String,
    pub prefix: String,
    pub suffix: String,
    /// 基础字符集
    pub charset: String,
    /// 追加到字符集的字符
    pub additional_chars: String,
    /// 下界提示
    pub before: String,
    /// 上界提示
    pub after: String,
    /// 每批次种子数; 为空时使用设备最大并行数
    pub batch_size: Option<usize>,
    /// 每个种子展开的字符数; 为空时按设备能力选择
    pub batch_char_count: Option<usize>,
    /// 生成字符串的最大长度
    pub max_length: usize,
    /// 名称总数上限
    pub max_names: Option<u64>,
    /// 使用全部设备 (默认只用最强的一个)
    pub multi_device: bool,
    /// CPU 设备线程数
    pub cpu_threads: Option<usize>,
    pub progress_interval: Duration,
}

impl SearchRequest {
    pub fn new(hash_a: impl Into<String>, hash_b: impl Into<String>) -> Self {
        Self {
            hash_a: hash_a.into(),
            hash_b: hash_b.into(),
            prefix: String::new(),
            suffix: String::new(),
            charset: DEFAULT_CHARSET.to_string(),
            additional_chars: String::new(),
            before: String::new(),
            after: String::new(),
            batch_size: None,
            batch_char_count: None,
            max_length: MAX_GENERATED_CHARS,
            max_names: None,
            multi_device: false,
            cpu_threads: None,
            progress_interval: Duration::from_secs(1),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchOutcome {
    /// 完整名称 (前缀 + 生成部分 + 后缀, 大写)
    Found(String),
    /// 搜索空间已耗尽
    NotFound,
    /// 达到名称总数上限, 剩余空间未搜索
    LimitReached,
}

#[derive(Debug, Clone)]
pub struct SearchResponse {
    pub outcome: SearchOutcome,
    pub found_device: Option<String>,
    pub devices: Vec<String>,
    pub elapsed: Duration,
    /// 处理的名称数 (估计值)
    pub names_processed: u64,
    pub speed: f64,
}

impl SearchResponse {
    pub fn found(&self) -> bool {
        matches!(self.outcome, SearchOutcome::Found(_))
    }

    pub fn name(&self) -> Option<&str> {
        match &self.outcome {
            SearchOutcome::Found(name) => Some(name),
            SearchOutcome::NotFound | SearchOutcome::LimitReached => None,
        }
    }
}

/// 在本机可用设备上搜索
pub fn search(request: SearchRequest) -> anyhow::Result<SearchResponse> {
    // 先校验输入, 避免无效请求初始化设备
    TargetHashes::parse(&request.hash_a, &request.hash_b)?;
    let devices = list_devices(request.cpu_threads);
    search_with_devices(request, devices)
}

/// 在给定设备上搜索
pub fn search_with_devices(
    request: SearchRequest,
    devices: Vec<SharedDevice>,
) -> anyhow::Result<SearchResponse> {
    let targets = TargetHashes::parse(&request.hash_a, &request.hash_b)?;
    let charset = Charset::new(&request.charset, &request.additional_chars)?;
    let hints = HintBounds::new(&charset, &request.before, &request.after)?;
    if request.max_length < 2 || request.max_length > MAX_GENERATED_CHARS {
        bail!(
            "max length must be between 2 and {}, got {}",
            MAX_GENERATED_CHARS,
            request.max_length
        );
    }
    if request.batch_size == Some(0) {
        bail!("batch size must be greater than 0");
    }

    let prefix = request.prefix.to_ascii_uppercase();
    let suffix = request.suffix.to_ascii_uppercase();
    if !prefix.is_ascii() || !suffix.is_ascii() {
        bail!("prefix and suffix must be ASCII");
    }

    let best = best_device(&devices)?;
    let selected = if request.multi_device {
        devices
    } else {
        vec![best.clone()]
    };

    let batch_char_count = request.batch_char_count.unwrap_or_else(|| {
        default_batch_char_count(best.max_workers()).min(request.max_length - 1)
    });

    info!("Charset: {} ({} chars)", charset, charset.len());
    info!("Prefix: '{}', Suffix: '{}'", prefix, suffix);
    if !hints.is_empty() {
        info!("Hints: before '{}', after '{}'", request.before, request.after);
    }
    info!(
        "Batch char count: {}, max length: {}",
        batch_char_count, request.max_length
    );

    let enumerator = Enumerator::new(charset.len(), hints, batch_char_count, request.max_length)?
        .with_name_limit(request.max_names);
    let queue = BatchQueue::new(enumerator);

    // 前缀种子只计算一次
    let seeds = PrefixSeeds::new(prefix.as_bytes());
    let ctx = KernelContext::new(
        targets,
        seeds,
        &suffix,
        charset,
        hints,
        batch_char_count,
        request.max_length,
    );

    let (sender, receiver) = unbounded();
    let mut jobs = Vec::with_capacity(selected.len());
    for (id, device) in selected.iter().enumerate() {
        let batch_size = request.batch_size.unwrap_or_else(|| device.max_workers().max(1));
        let config = JobConfig {
            ctx: ctx.clone(),
            prefix: prefix.clone(),
            suffix: suffix.clone(),
            batch_size,
            progress_interval: request.progress_interval,
        };
        let mut job = BatchJob::new(id, device.clone(), queue.clone(), config);
        info!("Job {}: {} (batch size {})", job.id(), job.device_name(), batch_size);
        if let Err(e) = job.run(sender.clone()) {
            stop_all(&mut jobs);
            return Err(e.into());
        }
        jobs.push(job);
    }
    drop(sender);

    let start_time = Instant::now();
    let mut names_by_job = vec![0u64; jobs.len()];
    let mut running = jobs.len();
    let mut limited = false;
    let mut found_device = None;

    let outcome = loop {
        // 阻塞等待; 所有作业退出后通道断开
        let event = match receiver.recv() {
            Ok(event) => event,
            Err(_) => break Err(anyhow!("all jobs terminated without reporting a result")),
        };
        match event {
            JobEvent::Progress {
                job,
                device,
                elapsed,
                last_name,
                names,
            } => {
                names_by_job[job] = names;
                info!(
                    "[{}] Elapsed time: {:.2?} - Name: {} - Name count: {:.3} billion",
                    device,
                    elapsed,
                    last_name,
                    names as f64 / 1e9
                );
            }
            JobEvent::Found {
                job,
                device,
                name,
                names,
            } => {
                names_by_job[job] = names;
                found_device = Some(device);
                break Ok(SearchOutcome::Found(name));
            }
            JobEvent::Exhausted { job, names, .. } => {
                names_by_job[job] = names;
                running -= 1;
            }
            JobEvent::LimitReached { job, names, .. } => {
                names_by_job[job] = names;
                limited = true;
                running -= 1;
            }
            JobEvent::Failed { device, error, .. } => {
                break Err(anyhow!("device '{}' failed: {}", device, error));
            }
        }
        if running == 0 {
            break Ok(if limited {
                SearchOutcome::LimitReached
            } else {
                SearchOutcome::NotFound
            });
        }
    };

    stop_all(&mut jobs);
    let outcome = outcome?;

    let elapsed = start_time.elapsed();
    let names_processed = names_by_job.iter().fold(0u64, |acc, &n| acc.saturating_add(n));
    let speed = if elapsed.as_secs_f64() > 0.0 {
        names_processed as f64 / elapsed.as_secs_f64()
    } else {
        0.0
    };

    Ok(SearchResponse {
        outcome,
        found_device,
        devices: selected.iter().map(|device| device.name()).collect(),
        elapsed,
        names_processed,
        speed,
    })
}

/// 通知所有作业停止并等待控制线程退出
fn stop_all(jobs: &mut [BatchJob]) {
    for job in jobs.iter() {
        job.stop();
    }
    for job in jobs.iter_mut() {
        if let Err(e) = job.join() {
            warn!("[{}] {}", job.device_name(), e);
        }
    }
}
