//! 计算设备抽象
//!
//! 每个设备由一个作业线程独占; `open` 在作业线程内创建设备端资源
//! (字符集、加密表、后缀、边界提示的副本), 之后逐批执行内核。

use std::fmt;
use std::sync::Arc;

use log::{info, warn};

use crate::cpu::CpuDevice;
use crate::enumerator::Batch;
use crate::error::{BreakerError, BreakerResult};
use crate::kernel::KernelContext;
use crate::odometer::IndexState;

/// 设备类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceKind {
    Cpu,
    OpenCL,
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceKind::Cpu => write!(f, "CPU"),
            DeviceKind::OpenCL => write!(f, "OpenCL"),
        }
    }
}

pub trait ComputeDevice: Send + Sync {
    fn name(&self) -> String;

    fn kind(&self) -> DeviceKind;

    /// 单次调用可并行的最大工作线程数 (默认批次大小)
    fn max_workers(&self) -> usize;

    /// 创建设备端资源; 在作业线程中调用
    fn open(&self, ctx: &KernelContext, batch_size: usize) -> BreakerResult<Box<dyn DeviceSession>>;
}

/// 已初始化的设备
pub trait DeviceSession {
    /// 执行一个批次并阻塞到设备完成, 返回找到的字符索引
    fn run_batch(&mut self, batch: &Batch) -> BreakerResult<Option<IndexState>>;
}

pub type SharedDevice = Arc<dyn ComputeDevice>;

/// 列出所有可用设备 (CPU 设备始终存在)
pub fn list_devices(cpu_threads: Option<usize>) -> Vec<SharedDevice> {
    let mut devices: Vec<SharedDevice> = Vec::new();

    #[cfg(feature = "opencl")]
    match crate::opencl::OpenCLDevice::list() {
        Ok(list) => {
            for device in list {
                devices.push(Arc::new(device));
            }
        }
        Err(e) => warn!("OpenCL unavailable: {}", e),
    }
    #[cfg(not(feature = "opencl"))]
    warn!("Built without the 'opencl' feature, only the CPU device is available");

    devices.push(Arc::new(CpuDevice::new(cpu_threads)));

    for device in &devices {
        info!(
            "Device: {} (Type: {}, workers: {})",
            device.name(),
            device.kind(),
            device.max_workers()
        );
    }
    devices
}

/// 选择并行能力最强的设备
pub fn best_device(devices: &[SharedDevice]) -> BreakerResult<SharedDevice> {
    devices
        .iter()
        .max_by_key(|device| device.max_workers())
        .cloned()
        .ok_or(BreakerError::NoDevice)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cpu_device_always_listed() {
        let devices = list_devices(Some(2));
        assert!(devices.iter().any(|d| d.kind() == DeviceKind::Cpu));
    }

    #[test]
    fn test_best_device_requires_devices() {
        assert!(matches!(best_device(&[]), Err(BreakerError::NoDevice)));
        let cpu: SharedDevice = Arc::new(CpuDevice::new(Some(1)));
        assert_eq!(best_device(&[cpu]).unwrap().kind(), DeviceKind::Cpu);
    }
}
