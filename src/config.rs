//! 搜索配置和数据结构定义

use hex::FromHex;

use crate::charset::Charset;
use crate::error::{BreakerError, BreakerResult};
use crate::hash::{HashType, PrefixSeeds, hash_string, prefold_target};
use crate::hints::HintBounds;

/// 生成字符串的最大长度 (不含前缀/后缀)
pub const MAX_GENERATED_CHARS: usize = 16;

/// 每个批次元素可展开的最大字符数
pub const MAX_BATCH_CHAR_COUNT: usize = 8;

/// 默认字符集
pub const DEFAULT_CHARSET: &str = "0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ_-";

/// 目标哈希对
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetHashes {
    pub hash_a: u32,
    pub hash_b: u32,
}

impl TargetHashes {
    pub fn new(hash_a: u32, hash_b: u32) -> Self {
        Self { hash_a, hash_b }
    }

    /// 从十六进制字符串解析 (可带 0x 前缀)
    pub fn parse(hash_a: &str, hash_b: &str) -> BreakerResult<Self> {
        Ok(Self {
            hash_a: parse_hash(hash_a)?,
            hash_b: parse_hash(hash_b)?,
        })
    }

    /// 完整名称是否同时产生两个目标哈希
    pub fn matches(&self, name: &[u8]) -> bool {
        hash_string(name, HashType::NameA) == self.hash_a
            && hash_string(name, HashType::NameB) == self.hash_b
    }
}

/// 解析 32 位十六进制哈希值
///
/// # Example
/// ```
/// use mpq_name_breaker::config::parse_hash;
/// assert_eq!(parse_hash("0xFD657910").unwrap(), 0xFD657910);
/// assert_eq!(parse_hash("7f").unwrap(), 0x7F);
/// ```
pub fn parse_hash(value: &str) -> BreakerResult<u32> {
    let trimmed = value.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);

    if digits.is_empty() || digits.len() > 8 {
        return Err(BreakerError::InvalidHash(value.to_string()));
    }

    // 左侧补零到 8 位, 再按大端解码
    let padded = format!("{:0>8}", digits);
    let bytes = <[u8; 4]>::from_hex(&padded)
        .map_err(|_| BreakerError::InvalidHash(value.to_string()))?;
    Ok(u32::from_be_bytes(bytes))
}

/// 根据设备最大并行线程数选择每个批次元素展开的字符数
pub fn default_batch_char_count(max_workers: usize) -> usize {
    if max_workers < 1024 {
        3
    } else if max_workers < 1024 * 32 {
        4
    } else {
        5
    }
}

/// 内核常量 (传递给计算设备)
///
/// 注意：必须与 OpenCL 的 accel_constants_t 结构体完全匹配 (12 个 uint, 48 字节)
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AccelConstants {
    /// 目标哈希 A (有后缀时已预折叠最后一个后缀字符)
    pub hash_a_lookup: u32,
    /// 目标哈希 B (同上)
    pub hash_b_lookup: u32,
    /// 前缀折叠后的哈希 A 种子
    pub prefix_seed1a: u32,
    pub prefix_seed2a: u32,
    /// 前缀折叠后的哈希 B 种子
    pub prefix_seed1b: u32,
    pub prefix_seed2b: u32,
    /// 每个批次元素展开的字符数
    pub batch_char_count: u32,
    /// 后缀字节数
    pub suffix_len: u32,
    /// 下界提示长度
    pub before_len: u32,
    /// 上界提示长度
    pub after_len: u32,
    /// 字符集长度
    pub charset_len: u32,
    /// 生成字符串的最大长度
    pub max_generated_chars: u32,
}

impl AccelConstants {
    pub fn new(
        targets: TargetHashes,
        seeds: PrefixSeeds,
        suffix: &[u8],
        charset: &Charset,
        hints: &HintBounds,
        batch_char_count: usize,
        max_generated_chars: usize,
    ) -> Self {
        Self {
            hash_a_lookup: prefold_target(targets.hash_a, suffix, HashType::NameA),
            hash_b_lookup: prefold_target(targets.hash_b, suffix, HashType::NameB),
            prefix_seed1a: seeds.a.s1,
            prefix_seed2a: seeds.a.s2,
            prefix_seed1b: seeds.b.s1,
            prefix_seed2b: seeds.b.s2,
            batch_char_count: batch_char_count as u32,
            suffix_len: suffix.len() as u32,
            before_len: hints.before().len() as u32,
            after_len: hints.after().len() as u32,
            charset_len: charset.len() as u32,
            max_generated_chars: max_generated_chars as u32,
        }
    }

    /// 按字段顺序展开为 uint 数组 (上传到设备)
    pub fn to_words(&self) -> [u32; 12] {
        [
            self.hash_a_lookup,
            self.hash_b_lookup,
            self.prefix_seed1a,
            self.prefix_seed2a,
            self.prefix_seed1b,
            self.prefix_seed2b,
            self.batch_char_count,
            self.suffix_len,
            self.before_len,
            self.after_len,
            self.charset_len,
            self.max_generated_chars,
        ]
    }
}
