//! 字典序边界提示
//!
//! `before` 是下界: 生成的字符串在对应的前导位置上不小于它;
//! `after` 是上界: 生成的字符串在对应的前导位置上不大于它。
//! 边界只在前导字符与提示完全相同时生效, 见 [`crate::odometer::Odometer`]。

use crate::charset::Charset;
use crate::config::MAX_GENERATED_CHARS;
use crate::error::{BreakerError, BreakerResult};

/// 每个位置的字符索引边界 (空表示无边界)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HintBounds {
    before: [u8; MAX_GENERATED_CHARS],
    before_len: u8,
    after: [u8; MAX_GENERATED_CHARS],
    after_len: u8,
}

impl HintBounds {
    /// 无边界
    pub fn none() -> Self {
        Self::default()
    }

    /// 将提示字符串映射为字符索引
    ///
    /// 下界字符映射到 `>=` 它的最小索引, 上界字符映射到 `<=` 它的最大索引。
    /// 一旦某个字符没有精确命中, 提示在该位置之后截断:
    /// 该位置上的取值已经严格位于边界之内, 后续位置不再受约束。
    pub fn new(charset: &Charset, before: &str, after: &str) -> BreakerResult<Self> {
        for (name, hint) in [("before", before), ("after", after)] {
            if hint.len() > MAX_GENERATED_CHARS {
                return Err(BreakerError::InvalidHint(format!(
                    "'{}' hint is longer than {} characters",
                    name, MAX_GENERATED_CHARS
                )));
            }
            if !hint.is_ascii() {
                return Err(BreakerError::InvalidHint(format!(
                    "'{}' hint must be ASCII",
                    name
                )));
            }
        }

        let mut bounds = Self::none();

        for ch in before.bytes() {
            let (index, exact) = charset.ceil_index(ch);
            bounds.before[bounds.before_len as usize] = index;
            bounds.before_len += 1;
            if !exact {
                break;
            }
        }

        for ch in after.bytes() {
            let (index, exact) = charset.floor_index(ch);
            bounds.after[bounds.after_len as usize] = index;
            bounds.after_len += 1;
            if !exact {
                break;
            }
        }

        let shared = bounds.before().len().min(bounds.after().len());
        if bounds.before()[..shared] > bounds.after()[..shared] {
            return Err(BreakerError::InvalidHint(format!(
                "before hint '{}' sorts after the after hint '{}'",
                before, after
            )));
        }

        Ok(bounds)
    }

    /// 直接由索引构建 (索引必须小于字符集长度)
    pub fn from_indexes(before: &[u8], after: &[u8]) -> BreakerResult<Self> {
        if before.len() > MAX_GENERATED_CHARS || after.len() > MAX_GENERATED_CHARS {
            return Err(BreakerError::InvalidHint(format!(
                "hints are limited to {} positions",
                MAX_GENERATED_CHARS
            )));
        }
        let shared = before.len().min(after.len());
        if before[..shared] > after[..shared] {
            return Err(BreakerError::InvalidHint(
                "lower bound sorts after the upper bound".to_string(),
            ));
        }

        let mut bounds = Self::none();
        bounds.before[..before.len()].copy_from_slice(before);
        bounds.before_len = before.len() as u8;
        bounds.after[..after.len()].copy_from_slice(after);
        bounds.after_len = after.len() as u8;
        Ok(bounds)
    }

    pub fn before(&self) -> &[u8] {
        &self.before[..self.before_len as usize]
    }

    pub fn after(&self) -> &[u8] {
        &self.after[..self.after_len as usize]
    }

    pub fn is_empty(&self) -> bool {
        self.before_len == 0 && self.after_len == 0
    }

    /// 位置 `pos` 的下界; `tight` 为当前与下界提示相同的前导位置数
    #[inline(always)]
    pub fn lower(&self, pos: usize, tight: usize) -> u8 {
        if pos < self.before_len as usize && tight >= pos {
            self.before[pos]
        } else {
            0
        }
    }

    /// 位置 `pos` 的上界; `tight` 为当前与上界提示相同的前导位置数
    #[inline(always)]
    pub fn upper(&self, pos: usize, tight: usize, last: u8) -> u8 {
        if pos < self.after_len as usize && tight >= pos {
            self.after[pos]
        } else {
            last
        }
    }
}
