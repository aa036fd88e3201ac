//! MPQ 文件名哈希
//!
//! 两个独立的 32 位状态 (s1, s2) 逐字节折叠:
//! `s1' = T[ch] ^ (s1 + s2)`, `s2' = ch + s1' + s2 + (s2 << 5) + 3`。
//! 最终的 s1 即为哈希值。

/// 初始种子 1
pub const HASH_SEED1: u32 = 0x7FED_7FED;
/// 初始种子 2
pub const HASH_SEED2: u32 = 0xEEEE_EEEE;

const CRYPT_TABLE_SIZE: usize = 0x500;
const CRYPT_TABLE_SEED: u32 = 0x0010_0001;

/// MPQ 加密表 (编译期生成)
pub static CRYPT_TABLE: [u32; CRYPT_TABLE_SIZE] = build_crypt_table();

const fn build_crypt_table() -> [u32; CRYPT_TABLE_SIZE] {
    let mut table = [0u32; CRYPT_TABLE_SIZE];
    let mut seed = CRYPT_TABLE_SEED;
    let mut index1 = 0;
    while index1 < 0x100 {
        let mut index2 = index1;
        let mut i = 0;
        while i < 5 {
            seed = (seed * 125 + 3) % 0x2A_AAAB;
            let temp1 = (seed & 0xFFFF) << 0x10;
            seed = (seed * 125 + 3) % 0x2A_AAAB;
            let temp2 = seed & 0xFFFF;
            table[index2] = temp1 | temp2;
            index2 += 0x100;
            i += 1;
        }
        index1 += 1;
    }
    table
}

/// 哈希类型 (对应加密表中的偏移)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashType {
    TableOffset = 0,
    NameA = 1,
    NameB = 2,
    FileKey = 3,
}

impl HashType {
    /// 该哈希类型使用的 256 项查找表
    pub fn table(self) -> &'static [u32] {
        let offset = (self as usize) << 8;
        &CRYPT_TABLE[offset..offset + 0x100]
    }
}

/// 哈希运行状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashState {
    pub s1: u32,
    pub s2: u32,
}

impl Default for HashState {
    fn default() -> Self {
        Self {
            s1: HASH_SEED1,
            s2: HASH_SEED2,
        }
    }
}

impl HashState {
    pub fn new(s1: u32, s2: u32) -> Self {
        Self { s1, s2 }
    }

    /// 折叠单个字节 (字节必须已转为大写)
    #[inline(always)]
    pub fn step(self, table: &[u32], ch: u8) -> Self {
        let ch = ch as u32;
        let s1 = table[ch as usize] ^ self.s1.wrapping_add(self.s2);
        let s2 = ch
            .wrapping_add(s1)
            .wrapping_add(self.s2)
            .wrapping_add(self.s2 << 5)
            .wrapping_add(3);
        Self { s1, s2 }
    }

    /// 依次折叠多个字节
    #[inline]
    pub fn fold(self, table: &[u32], bytes: &[u8]) -> Self {
        bytes.iter().fold(self, |state, &ch| state.step(table, ch))
    }
}

/// 计算字符串的哈希值 (参考实现, 自动转换为大写)
///
/// # Example
/// ```
/// use mpq_name_breaker::hash::{hash_string, HashType};
/// assert_eq!(hash_string(b"(listfile)", HashType::NameA), 0xFD657910);
/// ```
pub fn hash_string(bytes: &[u8], hash_type: HashType) -> u32 {
    let table = hash_type.table();
    bytes
        .iter()
        .fold(HashState::default(), |state, &ch| {
            state.step(table, ch.to_ascii_uppercase())
        })
        .s1
}

/// 从给定种子继续计算哈希 (前缀已预先折叠)
pub fn hash_with_seed(seed: HashState, bytes: &[u8], hash_type: HashType) -> u32 {
    seed.fold(hash_type.table(), bytes).s1
}

/// 预计算的前缀种子 (哈希 A 和哈希 B 各一对)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrefixSeeds {
    pub a: HashState,
    pub b: HashState,
}

impl PrefixSeeds {
    /// 折叠前缀字节; 空前缀得到初始种子
    pub fn new(prefix: &[u8]) -> Self {
        let upper: Vec<u8> = prefix.iter().map(u8::to_ascii_uppercase).collect();
        Self {
            a: HashState::default().fold(HashType::NameA.table(), &upper),
            b: HashState::default().fold(HashType::NameB.table(), &upper),
        }
    }
}

/// 将后缀最后一个字节的异或操作预先应用到目标哈希上
///
/// 预折叠后, 候选字符串只需折叠除最后一个字节之外的后缀,
/// 然后比较 `s1 + s2` 与返回值即可。空后缀时原样返回。
pub fn prefold_target(target: u32, suffix: &[u8], hash_type: HashType) -> u32 {
    match suffix.last() {
        Some(&last) => target ^ hash_type.table()[last as usize],
        None => target,
    }
}

/// 比较折叠状态与 (可能已预折叠的) 目标值
///
/// `state` 为折叠后缀之前的状态; 后缀非空时在此折叠 `suffix[..len - 1]`。
#[inline(always)]
pub fn matches_lookup(state: HashState, table: &[u32], suffix: &[u8], lookup: u32) -> bool {
    match suffix.split_last() {
        Some((_, body)) => {
            let state = state.fold(table, body);
            state.s1.wrapping_add(state.s2) == lookup
        }
        None => state.s1 == lookup,
    }
}
