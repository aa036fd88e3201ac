//! 非加速的参考实现 (单线程, 每个候选完整计算哈希)
//!
//! 用于小规模验证: 结果必须与批次内核一致。

use std::time::{Duration, Instant};

use log::info;

use crate::charset::Charset;
use crate::config::{MAX_GENERATED_CHARS, TargetHashes};
use crate::hash::{HashType, PrefixSeeds, hash_with_seed};

/// 默认尝试上限: 38^8
pub const DEFAULT_REFERENCE_LIMIT: u64 = 4_347_792_138_496;

const REPORT_EVERY: u64 = 1_000_000_000;

/// 按 (长度, 字典序) 顺序产生所有字符串
#[derive(Debug, Clone)]
pub struct NameIterator {
    charset: Charset,
    digits: Vec<u8>,
    max_len: usize,
    done: bool,
}

impl NameIterator {
    pub fn new(charset: Charset, max_len: usize) -> Self {
        Self {
            charset,
            digits: Vec::with_capacity(max_len),
            max_len: max_len.min(MAX_GENERATED_CHARS),
            done: max_len == 0,
        }
    }

    fn step(&mut self) -> bool {
        let last = self.charset.last_index();
        for digit in self.digits.iter_mut().rev() {
            if *digit < last {
                *digit += 1;
                return true;
            }
            *digit = 0;
        }
        if self.digits.len() < self.max_len {
            self.digits.push(0);
            return true;
        }
        false
    }
}

impl Iterator for NameIterator {
    type Item = Vec<u8>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || !self.step() {
            self.done = true;
            return None;
        }
        Some(self.digits.iter().map(|&d| self.charset.byte(d)).collect())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceResult {
    /// 找到的完整名称 (含前缀/后缀)
    pub name: Option<String>,
    /// 已检查的候选数
    pub names: u64,
    pub elapsed: Duration,
}

/// 参考破解: 依次检查每个候选, 先比较哈希 A, 再比较哈希 B
pub fn break_reference(
    targets: TargetHashes,
    prefix: &str,
    suffix: &str,
    charset: Charset,
    max_names: u64,
) -> ReferenceResult {
    let prefix = prefix.to_ascii_uppercase();
    let suffix = suffix.to_ascii_uppercase();
    let seeds = PrefixSeeds::new(prefix.as_bytes());
    let start = Instant::now();

    let mut names = 0;
    let mut candidate = Vec::with_capacity(MAX_GENERATED_CHARS + suffix.len());
    for generated in NameIterator::new(charset, MAX_GENERATED_CHARS) {
        if names >= max_names {
            break;
        }
        names += 1;

        candidate.clear();
        candidate.extend_from_slice(&generated);
        candidate.extend_from_slice(suffix.as_bytes());

        if hash_with_seed(seeds.a, &candidate, HashType::NameA) == targets.hash_a
            && hash_with_seed(seeds.b, &candidate, HashType::NameB) == targets.hash_b
        {
            let name = format!("{}{}", prefix, String::from_utf8_lossy(&candidate));
            info!("Name found: {}", name);
            return ReferenceResult {
                name: Some(name),
                names,
                elapsed: start.elapsed(),
            };
        }

        if names % REPORT_EVERY == 0 {
            info!(
                "Time: {:?} - Name: {}{} - Count: {} billion",
                start.elapsed(),
                prefix,
                String::from_utf8_lossy(&candidate),
                names / REPORT_EVERY
            );
        }
    }

    ReferenceResult {
        name: None,
        names,
        elapsed: start.elapsed(),
    }
}
