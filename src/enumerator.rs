//! 批次名称生成器
//!
//! 种子计数器按 (长度, 字典序) 遍历前导字符; 每个种子再追加
//! `batch_char_count` 个尾部位置, 由计算设备上的一个工作线程展开。

use std::sync::{Arc, Mutex, PoisonError};

use log::debug;

use crate::charset::MAX_CHARSET_LEN;
use crate::config::{MAX_BATCH_CHAR_COUNT, MAX_GENERATED_CHARS};
use crate::error::{BreakerError, BreakerResult};
use crate::hints::HintBounds;
use crate::odometer::{IndexState, Odometer, Step};

/// 一个批次: 若干互不相交的种子
#[derive(Debug, Clone)]
pub struct Batch {
    pub seeds: Vec<IndexState>,
    /// 是否为第一个批次 (其 0 号种子需覆盖所有更短的字符串)
    pub first: bool,
    pub number: u64,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.seeds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seeds.is_empty()
    }

    /// 工作线程 `worker` 是否需要展开所有更短的字符串
    pub fn is_widened(&self, worker: usize) -> bool {
        self.first && worker == 0
    }
}

/// 每个种子展开的名称数 `R^c` (饱和)
pub fn names_per_seed(charset_len: usize, batch_char_count: usize) -> u64 {
    (charset_len as u64).saturating_pow(batch_char_count as u32)
}

/// 第一个批次 0 号种子展开的名称数 `Σ_{i=1..c} R^i + R^c` (无边界提示时)
pub fn first_batch_name_count(charset_len: usize, batch_char_count: usize) -> u64 {
    let per_seed = names_per_seed(charset_len, batch_char_count);
    (1..=batch_char_count)
        .map(|i| names_per_seed(charset_len, i))
        .fold(per_seed, u64::saturating_add)
}

#[derive(Debug)]
pub struct Enumerator {
    odometer: Odometer,
    charset_len: usize,
    batch_char_count: usize,
    max_len: usize,
    batch_number: u64,
    exhausted: bool,
    name_limit: Option<u64>,
    names_dispatched: u64,
}

impl Enumerator {
    /// # Arguments
    /// * `charset_len` - 字符集长度
    /// * `hints` - 边界提示
    /// * `batch_char_count` - 每个种子追加的尾部位置数
    /// * `max_len` - 生成字符串的最大长度 (不超过 `MAX_GENERATED_CHARS`)
    pub fn new(
        charset_len: usize,
        hints: HintBounds,
        batch_char_count: usize,
        max_len: usize,
    ) -> BreakerResult<Self> {
        if !(2..=MAX_CHARSET_LEN).contains(&charset_len) {
            return Err(BreakerError::InvalidBatch(format!(
                "charset must contain 2 to {} characters, got {}",
                MAX_CHARSET_LEN, charset_len
            )));
        }
        if batch_char_count == 0 || batch_char_count > MAX_BATCH_CHAR_COUNT {
            return Err(BreakerError::InvalidBatch(format!(
                "batch char count must be between 1 and {}, got {}",
                MAX_BATCH_CHAR_COUNT, batch_char_count
            )));
        }
        if max_len > MAX_GENERATED_CHARS || batch_char_count >= max_len {
            return Err(BreakerError::InvalidBatch(format!(
                "max length must be in {}..={}, got {}",
                batch_char_count + 1,
                MAX_GENERATED_CHARS,
                max_len
            )));
        }

        Ok(Self {
            odometer: Odometer::new(charset_len, hints),
            charset_len,
            batch_char_count,
            max_len,
            batch_number: 0,
            exhausted: false,
            name_limit: None,
            names_dispatched: 0,
        })
    }

    /// 设置名称总数上限, 达到后不再产生批次
    pub fn with_name_limit(mut self, limit: Option<u64>) -> Self {
        self.name_limit = limit;
        self
    }

    pub fn batch_char_count(&self) -> usize {
        self.batch_char_count
    }

    pub fn names_dispatched(&self) -> u64 {
        self.names_dispatched
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// 名称上限已达到, 但搜索空间尚未耗尽
    pub fn limit_reached(&self) -> bool {
        !self.exhausted
            && self
                .name_limit
                .is_some_and(|limit| self.names_dispatched >= limit)
    }

    /// 推进种子计数器一步; 耗尽时返回 false
    fn next_seed(&mut self) -> bool {
        if self.exhausted {
            return false;
        }
        let seed_max_len = self.max_len - self.batch_char_count;
        if self.odometer.advance(0, seed_max_len) == Step::Exhausted {
            self.exhausted = true;
            return false;
        }
        true
    }

    /// 取出下一个批次, 最多 `size` 个种子
    ///
    /// 搜索空间耗尽或达到名称上限时返回 `None`。
    pub fn next_batch(&mut self, size: usize) -> Option<Batch> {
        if size == 0 {
            return None;
        }
        if let Some(limit) = self.name_limit {
            if self.names_dispatched >= limit {
                return None;
            }
        }

        let first = self.batch_number == 0;
        let mut seeds = Vec::with_capacity(size);
        while seeds.len() < size && self.next_seed() {
            if first && seeds.is_empty() {
                // 0 号种子只有一个字符, 由工作线程自行增长
                seeds.push(*self.odometer.state());
            } else {
                seeds.push(self.odometer.padded(self.batch_char_count));
            }
        }

        if seeds.is_empty() {
            return None;
        }

        let number = self.batch_number;
        self.batch_number += 1;
        let names = names_per_seed(self.charset_len, self.batch_char_count)
            .saturating_mul(seeds.len() as u64);
        self.names_dispatched = self.names_dispatched.saturating_add(names);

        debug!(
            "batch {} with {} seeds (first: {}, exhausted: {})",
            number,
            seeds.len(),
            first,
            self.exhausted
        );

        Some(Batch {
            seeds,
            first,
            number,
        })
    }
}

/// 多个作业共享的批次队列
///
/// 对 `next_batch` 的访问经互斥锁串行化, 保证批次互不相交。
#[derive(Debug, Clone)]
pub struct BatchQueue {
    inner: Arc<Mutex<Enumerator>>,
}

impl BatchQueue {
    pub fn new(enumerator: Enumerator) -> Self {
        Self {
            inner: Arc::new(Mutex::new(enumerator)),
        }
    }

    pub fn next_batch(&self, size: usize) -> Option<Batch> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .next_batch(size)
    }

    pub fn batch_char_count(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .batch_char_count()
    }

    pub fn names_dispatched(&self) -> u64 {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .names_dispatched()
    }

    pub fn limit_reached(&self) -> bool {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .limit_reached()
    }
}
