//! OpenCL 内核加载与执行

use log::{debug, info};
use ocl::{Buffer, Kernel, OclPrm, Program, Queue, SpatialDims};

use super::context::OpenCLContext;
use crate::charset::UNSET;
use crate::config::MAX_GENERATED_CHARS;
use crate::device::DeviceSession;
use crate::enumerator::Batch;
use crate::error::{BreakerError, BreakerResult};
use crate::hash::HashType;
use crate::kernel::KernelContext;
use crate::kernel_loader::{KERNEL_NAME, load_kernel_source};
use crate::odometer::IndexState;

/// 搜索内核封装
pub struct OpenCLKernel {
    ctx: OpenCLContext,
    /// OpenCL 程序 (必须保持存活以确保内核正常工作)
    #[allow(dead_code)]
    program: Program,
    kernel: Kernel,
    /// 只读输入缓冲区 (字符集、后缀、提示、常量、加密表)
    #[allow(dead_code)]
    inputs: Vec<Buffer<u8>>,
    #[allow(dead_code)]
    tables: Vec<Buffer<u32>>,
    /// 批次种子缓冲区
    seeds_buffer: Buffer<u8>,
    /// 结果缓冲区
    found_buffer: Buffer<u8>,
    /// 结果写入权 (0 表示尚无工作项命中)
    claim_buffer: Buffer<u32>,
    batch_size: usize,
}

/// 创建只读缓冲区并写入数据; 空数据写入一个占位字节
fn upload<T: OclPrm>(queue: &Queue, data: &[T]) -> BreakerResult<Buffer<T>> {
    let placeholder = [T::default()];
    let data = if data.is_empty() { &placeholder[..] } else { data };
    let buffer = Buffer::<T>::builder()
        .queue(queue.clone())
        .flags(ocl::flags::MEM_READ_ONLY)
        .len(data.len())
        .build()?;
    buffer.write(data).enq()?;
    Ok(buffer)
}

impl OpenCLKernel {
    /// 编译程序并将只读数据复制到设备
    pub fn new(ctx: OpenCLContext, kc: &KernelContext, batch_size: usize) -> BreakerResult<Self> {
        info!("Building OpenCL program...");

        let program = Program::builder()
            .src(load_kernel_source())
            .devices(ctx.device)
            .build(&ctx.context)?;

        info!("OpenCL program built successfully");

        let queue = &ctx.queue;
        let charset = upload(queue, kc.charset.as_bytes())?;
        let suffix = upload(queue, &kc.suffix)?;
        let before = upload(queue, kc.hints.before())?;
        let after = upload(queue, kc.hints.after())?;
        let constants = upload(queue, &kc.constants.to_words())?;
        let crypt_a = upload(queue, HashType::NameA.table())?;
        let crypt_b = upload(queue, HashType::NameB.table())?;

        let seeds_buffer = Buffer::<u8>::builder()
            .queue(queue.clone())
            .flags(ocl::flags::MEM_READ_ONLY)
            .len(batch_size * MAX_GENERATED_CHARS)
            .build()?;

        let found_buffer = Buffer::<u8>::builder()
            .queue(queue.clone())
            .flags(ocl::flags::MEM_READ_WRITE)
            .len(MAX_GENERATED_CHARS)
            .build()?;

        let claim_buffer = Buffer::<u32>::builder()
            .queue(queue.clone())
            .flags(ocl::flags::MEM_READ_WRITE)
            .len(1)
            .build()?;

        let kernel = Kernel::builder()
            .program(&program)
            .name(KERNEL_NAME)
            .queue(queue.clone())
            .global_work_size(SpatialDims::One(batch_size))
            .arg(&charset)
            .arg(&seeds_buffer)
            .arg(&suffix)
            .arg(&before)
            .arg(&after)
            .arg(&constants)
            .arg(&crypt_a)
            .arg(&crypt_b)
            .arg_named("first_batch", 0u32)
            .arg(&found_buffer)
            .arg(&claim_buffer)
            .build()?;

        Ok(Self {
            ctx,
            program,
            kernel,
            inputs: vec![charset, suffix, before, after],
            tables: vec![constants, crypt_a, crypt_b],
            seeds_buffer,
            found_buffer,
            claim_buffer,
            batch_size,
        })
    }
}

impl DeviceSession for OpenCLKernel {
    fn run_batch(&mut self, batch: &Batch) -> BreakerResult<Option<IndexState>> {
        if batch.len() > self.batch_size {
            return Err(BreakerError::InvalidBatch(format!(
                "batch of {} seeds exceeds the device buffer of {}",
                batch.len(),
                self.batch_size
            )));
        }

        // 未使用的行保持 UNSET, 内核直接跳过
        let mut rows = vec![UNSET; self.batch_size * MAX_GENERATED_CHARS];
        for (row, seed) in rows.chunks_mut(MAX_GENERATED_CHARS).zip(&batch.seeds) {
            row.copy_from_slice(seed.raw());
        }
        self.seeds_buffer.write(&rows).enq()?;

        let reset = vec![UNSET; MAX_GENERATED_CHARS];
        self.found_buffer.write(&reset).enq()?;
        self.claim_buffer.write(&[0u32][..]).enq()?;

        self.kernel.set_arg("first_batch", u32::from(batch.first))?;

        debug!("Launching kernel with {} workers", batch.len());
        unsafe {
            self.kernel
                .cmd()
                .global_work_size(SpatialDims::One(batch.len()))
                .enq()?;
        }
        self.ctx.queue.finish()?;

        let mut found = vec![UNSET; MAX_GENERATED_CHARS];
        self.found_buffer.read(&mut found).enq()?;

        if found[0] == UNSET {
            return Ok(None);
        }
        let mut raw = [UNSET; MAX_GENERATED_CHARS];
        raw.copy_from_slice(&found);
        Ok(Some(IndexState::from_raw(raw)))
    }
}

#[cfg(test)]
mod tests {
    use ocl::Platform;

    use super::*;
    use crate::charset::Charset;
    use crate::config::{DEFAULT_CHARSET, TargetHashes};
    use crate::device::ComputeDevice;
    use crate::enumerator::Enumerator;
    use crate::hash::{PrefixSeeds, hash_string};
    use crate::hints::HintBounds;
    use crate::opencl::OpenCLDevice;

    #[test]
    fn test_opencl_kernel_finds_name() {
        if Platform::list().is_empty() {
            println!("警告: 未检测到 OpenCL 设备, 跳过");
            return;
        }
        let Some(device) = OpenCLDevice::list().unwrap().into_iter().next() else {
            return;
        };

        let charset = Charset::new(DEFAULT_CHARSET, "").unwrap();
        let targets = TargetHashes::new(
            hash_string(b"TEST.MPQ", HashType::NameA),
            hash_string(b"TEST.MPQ", HashType::NameB),
        );
        let ctx = KernelContext::new(
            targets,
            PrefixSeeds::new(b""),
            ".MPQ",
            charset.clone(),
            HintBounds::none(),
            3,
            MAX_GENERATED_CHARS,
        );
        let mut session = device.open(&ctx, 64).unwrap();
        let mut enumerator = Enumerator::new(charset.len(), HintBounds::none(), 3, MAX_GENERATED_CHARS).unwrap();
        let batch = enumerator.next_batch(64).unwrap();
        let found = session.run_batch(&batch).unwrap().expect("TEST is in the first batch");
        assert_eq!(charset.decode(found.raw()), "TEST");
    }
}
