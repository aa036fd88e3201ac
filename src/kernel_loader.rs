//! OpenCL 内核源代码加载模块
//!
//! 内核源码与主机端共享的常量在这里以 `#define` 的形式拼接到源码前部,
//! 保证两端的状态布局一致。

use crate::charset::UNSET;
use crate::config::MAX_GENERATED_CHARS;

/// 内核入口函数名
pub const KERNEL_NAME: &str = "hash_batch";

/// 加载完整的内核源代码
///
/// # Example
/// ```
/// use mpq_name_breaker::load_kernel_source;
///
/// let source = load_kernel_source();
/// assert!(source.contains("hash_batch"));
/// ```
pub fn load_kernel_source() -> String {
    let mut source = String::new();

    // 1. 主机端共享常量
    source.push_str(&format!("#define MAX_GENERATED_CHARS {}\n", MAX_GENERATED_CHARS));
    source.push_str(&format!("#define UNSET {}\n", UNSET));
    source.push('\n');

    // 2. 主搜索内核
    source.push_str(include_str!("../kernels/search.cl"));

    source
}
