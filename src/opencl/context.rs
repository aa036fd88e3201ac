//! OpenCL 上下文管理

use log::info;
use ocl::enums::{DeviceInfo, DeviceInfoResult};
use ocl::{Context, Device, Platform, Queue};

use crate::device::{ComputeDevice, DeviceKind, DeviceSession};
use crate::error::BreakerResult;
use crate::kernel::KernelContext;

use super::kernel::OpenCLKernel;

/// OpenCL 上下文结构
pub struct OpenCLContext {
    /// 选择的平台
    pub platform: Platform,
    /// 选择的设备
    pub device: Device,
    /// OpenCL 上下文
    pub context: Context,
    /// 命令队列
    pub queue: Queue,
}

impl OpenCLContext {
    /// 为指定设备创建上下文和命令队列
    pub fn new(platform: Platform, device: Device) -> BreakerResult<Self> {
        let context = Context::builder()
            .platform(platform)
            .devices(device)
            .build()?;

        let queue = Queue::new(&context, device, None)?;

        Ok(Self {
            platform,
            device,
            context,
            queue,
        })
    }
}

/// 一个 OpenCL 设备描述 (尚未创建上下文)
#[derive(Debug, Clone)]
pub struct OpenCLDevice {
    platform: Platform,
    device: Device,
    name: String,
    max_workers: usize,
}

impl OpenCLDevice {
    /// 枚举所有平台上的所有设备
    pub fn list() -> BreakerResult<Vec<Self>> {
        let platforms = Platform::list();
        info!("Found {} OpenCL platform(s)", platforms.len());

        let mut devices = Vec::new();
        for platform in platforms {
            for device in Device::list_all(platform)? {
                let name = device.name()?;
                let compute_units = match device.info(DeviceInfo::MaxComputeUnits)? {
                    DeviceInfoResult::MaxComputeUnits(units) => units as usize,
                    _ => 1,
                };
                let max_workers = compute_units * device.max_wg_size()?;
                info!(
                    "  Platform: {}, Device: {} ({} compute units)",
                    platform.name().unwrap_or_default(),
                    name,
                    compute_units
                );
                devices.push(Self {
                    platform,
                    device,
                    name,
                    max_workers,
                });
            }
        }
        Ok(devices)
    }
}

impl ComputeDevice for OpenCLDevice {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn kind(&self) -> DeviceKind {
        DeviceKind::OpenCL
    }

    fn max_workers(&self) -> usize {
        self.max_workers
    }

    fn open(&self, ctx: &KernelContext, batch_size: usize) -> BreakerResult<Box<dyn DeviceSession>> {
        let cl = OpenCLContext::new(self.platform, self.device)?;
        info!(
            "OpenCL context ready: {} ({} / {})",
            self.name,
            self.device.vendor().unwrap_or_default(),
            self.device.version().map(|v| v.to_string()).unwrap_or_default()
        );
        Ok(Box::new(OpenCLKernel::new(cl, ctx, batch_size)?))
    }
}
