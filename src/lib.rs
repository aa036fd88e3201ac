//! MPQ 文件名哈希破解工具
//!
//! 给定文件名的两个 32 位哈希 (哈希 A / 哈希 B), 在固定字符集上按
//! (长度, 字典序) 穷举候选名称, 直到两个哈希同时匹配或搜索空间耗尽。
//! 计算在 CPU (rayon) 或 OpenCL 设备上并行执行。

pub mod api;
pub mod charset;
pub mod config;
pub mod cpu;
pub mod device;
pub mod enumerator;
pub mod error;
pub mod hash;
pub mod hints;
pub mod job;
pub mod kernel;
pub mod kernel_loader;
pub mod odometer;
#[cfg(feature = "opencl")]
pub mod opencl;
pub mod reference;

pub use api::{SearchOutcome, SearchRequest, SearchResponse, search, search_with_devices};
pub use charset::Charset;
pub use config::{DEFAULT_CHARSET, MAX_GENERATED_CHARS, TargetHashes, parse_hash};
pub use cpu::CpuDevice;
pub use device::{ComputeDevice, DeviceKind, DeviceSession, SharedDevice, list_devices};
pub use error::{BreakerError, BreakerResult};
pub use hash::{HashType, hash_string};
pub use kernel_loader::load_kernel_source;
pub use reference::break_reference;
