//! 字符索引状态与支持边界提示的混合进制计数器

use std::fmt;

use crate::charset::{MAX_CHARSET_LEN, UNSET};
use crate::config::MAX_GENERATED_CHARS;
use crate::hints::HintBounds;

/// 生成字符串的字符索引; 第一个 UNSET 的位置即有效长度
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct IndexState([u8; MAX_GENERATED_CHARS]);

impl Default for IndexState {
    fn default() -> Self {
        Self([UNSET; MAX_GENERATED_CHARS])
    }
}

impl IndexState {
    /// 由索引序列构建, 超出 `MAX_GENERATED_CHARS` 的部分被忽略
    pub fn from_digits(digits: &[u8]) -> Self {
        let mut state = Self::default();
        let len = digits.len().min(MAX_GENERATED_CHARS);
        state.0[..len].copy_from_slice(&digits[..len]);
        state
    }

    /// 由设备返回的原始行构建 (UNSET 之后的内容被清除)
    pub fn from_raw(raw: [u8; MAX_GENERATED_CHARS]) -> Self {
        let len = raw.iter().position(|&d| d == UNSET).unwrap_or(MAX_GENERATED_CHARS);
        Self::from_digits(&raw[..len])
    }

    pub fn len(&self) -> usize {
        self.0
            .iter()
            .position(|&d| d == UNSET)
            .unwrap_or(MAX_GENERATED_CHARS)
    }

    pub fn is_empty(&self) -> bool {
        self.0[0] == UNSET
    }

    /// 有效部分
    pub fn digits(&self) -> &[u8] {
        &self.0[..self.len()]
    }

    /// 包含 UNSET 填充的完整数组
    pub fn raw(&self) -> &[u8; MAX_GENERATED_CHARS] {
        &self.0
    }
}

impl fmt::Debug for IndexState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("IndexState").field(&self.digits()).finish()
    }
}

/// 一次推进的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// 位置 `pos` 及其右侧发生了变化
    Digit(usize),
    /// 长度加一, 所有位置重置为下界
    Grew,
    /// 在给定的最左进位位置与长度限制内已无下一个状态
    Exhausted,
}

/// 混合进制计数器
///
/// 每个位置的取值范围默认为 `[0, R-1]`; 当前导位置与提示完全相同时,
/// 范围被收紧到提示给出的索引。`before_tight` / `after_tight`
/// 记录当前有多少个前导位置与下界/上界提示相同。
#[derive(Debug, Clone, Copy)]
pub struct Odometer {
    state: IndexState,
    len: usize,
    last: u8,
    hints: HintBounds,
    before_tight: usize,
    after_tight: usize,
}

impl Odometer {
    /// 空计数器 (长度 0); 第一次推进得到长度为 1 的最小字符串
    pub fn new(charset_len: usize, hints: HintBounds) -> Self {
        debug_assert!((2..=MAX_CHARSET_LEN).contains(&charset_len));
        Self {
            state: IndexState::default(),
            len: 0,
            last: (charset_len - 1) as u8,
            hints,
            before_tight: 0,
            after_tight: 0,
        }
    }

    /// 从已有状态继续
    pub fn from_state(state: IndexState, charset_len: usize, hints: HintBounds) -> Self {
        let mut odometer = Self::new(charset_len, hints);
        odometer.state = state;
        odometer.len = state.len();
        for pos in 0..odometer.len {
            odometer.tighten(pos);
        }
        odometer
    }

    pub fn state(&self) -> &IndexState {
        &self.state
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn digit(&self, pos: usize) -> u8 {
        self.state.0[pos]
    }

    /// 与下界/上界提示相同的前导位置数
    pub fn tight(&self) -> (usize, usize) {
        (self.before_tight, self.after_tight)
    }

    #[inline(always)]
    fn lower(&self, pos: usize) -> u8 {
        self.hints.lower(pos, self.before_tight)
    }

    #[inline(always)]
    fn upper(&self, pos: usize) -> u8 {
        self.hints.upper(pos, self.after_tight, self.last)
    }

    /// 位置 `pos` 的值已确定且其左侧不再变化时, 尝试延长两个游标
    #[inline(always)]
    fn tighten(&mut self, pos: usize) {
        let digit = self.state.0[pos];
        if self.before_tight == pos && self.hints.before().get(pos) == Some(&digit) {
            self.before_tight += 1;
        }
        if self.after_tight == pos && self.hints.after().get(pos) == Some(&digit) {
            self.after_tight += 1;
        }
    }

    /// `from` 及其右侧即将改变, 游标回退到不超过 `from`
    #[inline(always)]
    fn release(&mut self, from: usize) {
        self.before_tight = self.before_tight.min(from);
        self.after_tight = self.after_tight.min(from);
    }

    /// 从左到右将 `from..len` 重置为各自的下界
    #[inline(always)]
    fn reset_from(&mut self, from: usize) {
        for pos in from..self.len {
            self.state.0[pos] = self.lower(pos);
            self.tighten(pos);
        }
    }

    /// 推进到下一个状态
    ///
    /// 进位不会越过 `floor`; 只有 `floor == 0` 且长度小于 `max_len` 时才允许增长。
    #[inline]
    pub fn advance(&mut self, floor: usize, max_len: usize) -> Step {
        let mut pos = self.len;
        while pos > floor {
            pos -= 1;
            if self.state.0[pos] < self.upper(pos) {
                self.state.0[pos] += 1;
                self.release(pos);
                self.tighten(pos);
                self.reset_from(pos + 1);
                return Step::Digit(pos);
            }
        }

        if floor == 0 && self.len < max_len {
            self.len += 1;
            self.release(0);
            self.reset_from(0);
            return Step::Grew;
        }

        Step::Exhausted
    }

    /// 在当前状态后追加 `extra` 个位置, 取各自的下界
    pub fn padded(&self, extra: usize) -> IndexState {
        let mut padded = *self;
        let start = padded.len;
        padded.len = (start + extra).min(MAX_GENERATED_CHARS);
        padded.reset_from(start);
        padded.state
    }
}
