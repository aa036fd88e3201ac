//! 字符集: 有序、去重的大写字节序列, 决定枚举的进制

use std::fmt;

use crate::error::{BreakerError, BreakerResult};

/// 字符索引的 "未设置" 哨兵值, 因此字符集最多 254 个字符
pub const UNSET: u8 = u8::MAX;

pub const MAX_CHARSET_LEN: usize = UNSET as usize - 1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Charset {
    bytes: Vec<u8>,
}

impl Charset {
    /// 由基础字符集和附加字符构建: 转大写、排序、去重
    ///
    /// # Example
    /// ```
    /// use mpq_name_breaker::Charset;
    /// let charset = Charset::new("ba", "Cc").unwrap();
    /// assert_eq!(charset.as_bytes(), b"ABC");
    /// ```
    pub fn new(base: &str, additional: &str) -> BreakerResult<Self> {
        let mut bytes = Vec::with_capacity(base.len() + additional.len());
        for ch in base.bytes().chain(additional.bytes()) {
            if !ch.is_ascii() {
                return Err(BreakerError::InvalidCharset(format!(
                    "non-ASCII byte 0x{:02X}",
                    ch
                )));
            }
            bytes.push(ch.to_ascii_uppercase());
        }
        bytes.sort_unstable();
        bytes.dedup();

        if bytes.len() < 2 {
            return Err(BreakerError::InvalidCharset(format!(
                "need at least 2 distinct characters, got {}",
                bytes.len()
            )));
        }
        if bytes.len() > MAX_CHARSET_LEN {
            return Err(BreakerError::InvalidCharset(format!(
                "at most {} characters are supported",
                MAX_CHARSET_LEN
            )));
        }

        Ok(Self { bytes })
    }

    /// 字符集长度 (进制 R)
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// 最大有效索引 (R - 1)
    pub fn last_index(&self) -> u8 {
        (self.bytes.len() - 1) as u8
    }

    pub fn byte(&self, index: u8) -> u8 {
        self.bytes[index as usize]
    }

    /// 精确查找字符的索引
    pub fn index_of(&self, ch: u8) -> Option<u8> {
        self.bytes
            .binary_search(&ch.to_ascii_uppercase())
            .ok()
            .map(|i| i as u8)
    }

    /// 字节 `>= ch` 的最小索引; 返回值第二项表示是否精确命中
    ///
    /// 没有满足条件的字符时回退到最大索引。
    pub fn ceil_index(&self, ch: u8) -> (u8, bool) {
        let ch = ch.to_ascii_uppercase();
        match self.bytes.binary_search(&ch) {
            Ok(i) => (i as u8, true),
            Err(i) if i < self.bytes.len() => (i as u8, false),
            Err(_) => (self.last_index(), false),
        }
    }

    /// 字节 `<= ch` 的最大索引; 返回值第二项表示是否精确命中
    ///
    /// 没有满足条件的字符时回退到索引 0。
    pub fn floor_index(&self, ch: u8) -> (u8, bool) {
        let ch = ch.to_ascii_uppercase();
        match self.bytes.binary_search(&ch) {
            Ok(i) => (i as u8, true),
            Err(0) => (0, false),
            Err(i) => ((i - 1) as u8, false),
        }
    }

    /// 将索引序列还原为字符串 (遇到 UNSET 停止)
    pub fn decode(&self, indexes: &[u8]) -> String {
        indexes
            .iter()
            .take_while(|&&idx| idx != UNSET)
            .map(|&idx| self.bytes[idx as usize] as char)
            .collect()
    }
}

impl fmt::Display for Charset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // 构建时已保证全部为 ASCII
        for &b in &self.bytes {
            write!(f, "{}", b as char)?;
        }
        Ok(())
    }
}
