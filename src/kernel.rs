//! 搜索内核: 每个工作线程展开一个种子的子范围
//!
//! 每个工作线程缓存 "最后一个字符之前" 的哈希 A 状态; 计数器只改变
//! 低位时只需重新折叠最后一两个字符。哈希 A 命中后才计算哈希 B。
//! 这里的实现由 CPU 设备直接执行, `kernels/search.cl` 是同一算法的
//! OpenCL 版本。

use crate::charset::Charset;
use crate::config::{AccelConstants, MAX_GENERATED_CHARS, TargetHashes};
use crate::hash::{HashState, HashType, PrefixSeeds, matches_lookup};
use crate::hints::HintBounds;
use crate::odometer::{IndexState, Odometer, Step};

/// 内核运行所需的全部只读数据 (对应设备端的各个缓冲区)
#[derive(Debug, Clone)]
pub struct KernelContext {
    pub targets: TargetHashes,
    pub constants: AccelConstants,
    pub charset: Charset,
    pub suffix: Vec<u8>,
    pub hints: HintBounds,
}

impl KernelContext {
    pub fn new(
        targets: TargetHashes,
        seeds: PrefixSeeds,
        suffix: &str,
        charset: Charset,
        hints: HintBounds,
        batch_char_count: usize,
        max_len: usize,
    ) -> Self {
        let suffix = suffix.to_ascii_uppercase().into_bytes();
        let constants = AccelConstants::new(
            targets,
            seeds,
            &suffix,
            &charset,
            &hints,
            batch_char_count,
            max_len,
        );
        Self {
            targets,
            constants,
            charset,
            suffix,
            hints,
        }
    }

    pub fn batch_char_count(&self) -> usize {
        self.constants.batch_char_count as usize
    }

    pub fn max_len(&self) -> usize {
        self.constants.max_generated_chars as usize
    }

    fn prefix_seed_a(&self) -> HashState {
        HashState::new(self.constants.prefix_seed1a, self.constants.prefix_seed2a)
    }

    fn prefix_seed_b(&self) -> HashState {
        HashState::new(self.constants.prefix_seed1b, self.constants.prefix_seed2b)
    }
}

/// 单个工作线程
pub struct Worker<'a> {
    ctx: &'a KernelContext,
    odometer: Odometer,
    widened: bool,
    /// `cache[i]` 为折叠 `digits[0..i]` 之后的哈希 A 状态
    cache: [HashState; MAX_GENERATED_CHARS],
    /// `cache[..cached]` 有效
    cached: usize,
}

impl<'a> Worker<'a> {
    /// `widened` 为真时 (第一个批次的 0 号种子), 工作线程从长度 1 开始
    /// 增长, 覆盖所有不超过 `batch_char_count` 的长度。
    pub fn new(ctx: &'a KernelContext, seed: IndexState, widened: bool) -> Self {
        let mut cache = [HashState::default(); MAX_GENERATED_CHARS];
        cache[0] = ctx.prefix_seed_a();
        Self {
            ctx,
            odometer: Odometer::from_state(seed, ctx.charset.len(), ctx.hints),
            widened,
            cache,
            cached: 1,
        }
    }

    pub fn state(&self) -> &IndexState {
        self.odometer.state()
    }

    /// 当前字符串的哈希 A 状态 (不含后缀)
    #[inline]
    fn state_a(&mut self) -> HashState {
        let table = HashType::NameA.table();
        let len = self.odometer.len();
        while self.cached < len {
            let pos = self.cached - 1;
            let ch = self.ctx.charset.byte(self.odometer.digit(pos));
            self.cache[self.cached] = self.cache[pos].step(table, ch);
            self.cached += 1;
        }
        let last = self.ctx.charset.byte(self.odometer.digit(len - 1));
        self.cache[len - 1].step(table, last)
    }

    /// 哈希 B 状态, 从前缀种子完整计算
    fn state_b(&self) -> HashState {
        let table = HashType::NameB.table();
        self.odometer
            .state()
            .digits()
            .iter()
            .fold(self.ctx.prefix_seed_b(), |state, &d| {
                state.step(table, self.ctx.charset.byte(d))
            })
    }

    /// 当前字符串 (加前缀/后缀) 是否同时匹配两个目标哈希
    #[inline]
    pub fn matches(&mut self) -> bool {
        let state = self.state_a();
        if !matches_lookup(
            state,
            HashType::NameA.table(),
            &self.ctx.suffix,
            self.ctx.constants.hash_a_lookup,
        ) {
            return false;
        }
        // 仅哈希 A 碰撞时继续检查哈希 B
        matches_lookup(
            self.state_b(),
            HashType::NameB.table(),
            &self.ctx.suffix,
            self.ctx.constants.hash_b_lookup,
        )
    }

    /// 推进到子范围内的下一个字符串; 子范围结束时返回 false
    #[inline]
    pub fn advance(&mut self) -> bool {
        let len = self.odometer.len();
        let batch_chars = self.ctx.batch_char_count();
        let floor = if self.widened && len <= batch_chars {
            0
        } else {
            len.saturating_sub(batch_chars)
        };

        match self.odometer.advance(floor, self.ctx.max_len()) {
            Step::Digit(pos) => {
                self.cached = self.cached.min(pos + 1);
                true
            }
            Step::Grew => {
                self.cached = 1;
                true
            }
            Step::Exhausted => false,
        }
    }
}

/// 展开一个种子; 找到匹配时返回对应的字符索引
pub fn run_worker(ctx: &KernelContext, seed: IndexState, widened: bool) -> Option<IndexState> {
    if seed.is_empty() {
        return None;
    }
    let mut worker = Worker::new(ctx, seed, widened);
    loop {
        if worker.matches() {
            return Some(*worker.state());
        }
        if !worker.advance() {
            return None;
        }
    }
}
