//! MPQ 文件名哈希破解工具 - 主程序
//!
//! 使用方式:
//!   cargo run --release -- break --hash-a FD657910 --hash-b 4E9B98A7 --prefix "(" --suffix ")"
//!   cargo run --release -- hash "(listfile)"
//!   cargo run --release --features opencl -- devices

use clap::{Args as ClapArgs, Parser, Subcommand};
use log::info;
use std::time::Duration;

use mpq_name_breaker::{
    Charset, DEFAULT_CHARSET, HashType, MAX_GENERATED_CHARS, SearchOutcome, SearchRequest,
    TargetHashes, break_reference, hash_string, list_devices, reference::DEFAULT_REFERENCE_LIMIT,
    search,
};

/// 命令行参数
#[derive(Parser, Debug)]
#[command(name = "mpq-name-breaker")]
#[command(about = "MPQ 文件名哈希暴力破解")]
#[command(version = "0.1.0")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// 在计算设备上破解哈希对
    Break(BreakArgs),
    /// 计算字符串的哈希
    Hash {
        /// 输入字符串 (自动转为大写)
        value: String,
    },
    /// 列出可用计算设备
    Devices {
        /// CPU 设备线程数
        #[arg(long)]
        cpu_threads: Option<usize>,
    },
    /// 单线程参考实现 (仅用于验证)
    Reference(ReferenceArgs),
}

#[derive(ClapArgs, Debug)]
struct BreakArgs {
    /// 目标哈希 A (十六进制)
    #[arg(long)]
    hash_a: String,

    /// 目标哈希 B (十六进制)
    #[arg(long)]
    hash_b: String,

    /// 已知前缀
    #[arg(long, default_value = "")]
    prefix: String,

    /// 已知后缀
    #[arg(long, default_value = "")]
    suffix: String,

    /// 追加到字符集的字符
    #[arg(long, default_value = "")]
    additional_chars: String,

    /// 基础字符集
    #[arg(long, default_value = DEFAULT_CHARSET)]
    charset: String,

    /// 下界提示: 生成部分不小于该字符串
    #[arg(long, default_value = "")]
    before: String,

    /// 上界提示: 生成部分不大于该字符串
    #[arg(long, default_value = "")]
    after: String,

    /// 每批次种子数 (默认: 设备最大并行数)
    #[arg(long)]
    batch_size: Option<usize>,

    /// 每个种子展开的字符数 (默认: 3/4/5, 取决于设备)
    #[arg(long)]
    batch_char_count: Option<usize>,

    /// 生成部分的最大长度
    #[arg(long, default_value_t = MAX_GENERATED_CHARS)]
    max_length: usize,

    /// 名称总数上限
    #[arg(long)]
    max_names: Option<u64>,

    /// 使用全部可用设备
    #[arg(long, default_value_t = false)]
    multi_device: bool,

    /// CPU 设备线程数
    #[arg(long)]
    cpu_threads: Option<usize>,

    /// 进度输出间隔 (毫秒)
    #[arg(long, default_value = "1000")]
    progress_interval: u64,
}

#[derive(ClapArgs, Debug)]
struct ReferenceArgs {
    #[arg(long)]
    hash_a: String,

    #[arg(long)]
    hash_b: String,

    #[arg(long, default_value = "")]
    prefix: String,

    #[arg(long, default_value = "")]
    suffix: String,

    /// 名称总数上限
    #[arg(long, default_value_t = DEFAULT_REFERENCE_LIMIT)]
    max_names: u64,
}

/// 将命令行参数转换为搜索请求
fn build_request(args: &BreakArgs) -> SearchRequest {
    let mut request = SearchRequest::new(args.hash_a.clone(), args.hash_b.clone());
    request.prefix = args.prefix.clone();
    request.suffix = args.suffix.clone();
    request.charset = args.charset.clone();
    request.additional_chars = args.additional_chars.clone();
    request.before = args.before.clone();
    request.after = args.after.clone();
    request.batch_size = args.batch_size;
    request.batch_char_count = args.batch_char_count;
    request.max_length = args.max_length;
    request.max_names = args.max_names;
    request.multi_device = args.multi_device;
    request.cpu_threads = args.cpu_threads;
    request.progress_interval = Duration::from_millis(args.progress_interval);
    request
}

fn run_break(args: &BreakArgs) -> anyhow::Result<()> {
    info!("参数: {:?}", args);
    let response = search(build_request(args))?;

    println!();
    println!("========================================");
    match &response.outcome {
        SearchOutcome::Found(name) => {
            println!("✓ 找到名称!");
            println!("========================================");
            println!("名称: {}", name);
            if let Some(device) = &response.found_device {
                println!("找到设备: {}", device);
            }
        }
        SearchOutcome::NotFound => {
            println!("✗ 搜索空间已耗尽, 未找到名称");
        }
        SearchOutcome::LimitReached => {
            println!("✗ 已达到名称数上限, 剩余搜索空间未检查");
        }
    }
    println!("搜索时间: {:.2} 秒", response.elapsed.as_secs_f64());
    println!(
        "检查名称数: {} | 平均速度: {:.0} 名称/秒",
        response.names_processed, response.speed
    );
    println!("========================================");
    Ok(())
}

fn run_hash(value: &str) {
    let bytes = value.as_bytes();
    println!("{}", value.to_ascii_uppercase());
    println!("HashA: {:08X}", hash_string(bytes, HashType::NameA));
    println!("HashB: {:08X}", hash_string(bytes, HashType::NameB));
    println!("Table offset: {:08X}", hash_string(bytes, HashType::TableOffset));
}

fn run_devices(cpu_threads: Option<usize>) {
    let devices = list_devices(cpu_threads);
    for (idx, device) in devices.iter().enumerate() {
        println!(
            "[{}] {} ({}) - 最大并行数: {}",
            idx,
            device.name(),
            device.kind(),
            device.max_workers()
        );
    }
}

fn run_reference(args: &ReferenceArgs) -> anyhow::Result<()> {
    let targets = TargetHashes::parse(&args.hash_a, &args.hash_b)?;
    let charset = Charset::new(DEFAULT_CHARSET, "")?;
    let result = break_reference(targets, &args.prefix, &args.suffix, charset, args.max_names);

    match result.name {
        Some(name) => println!("✓ 找到名称: {}", name),
        None => println!("✗ 未找到名称"),
    }
    println!(
        "检查名称数: {} | 搜索时间: {:.2} 秒",
        result.names,
        result.elapsed.as_secs_f64()
    );
    Ok(())
}

/// 主函数
fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    info!("启动 MPQ 文件名哈希破解");

    match &args.command {
        Command::Break(break_args) => run_break(break_args),
        Command::Hash { value } => {
            run_hash(value);
            Ok(())
        }
        Command::Devices { cpu_threads } => {
            run_devices(*cpu_threads);
            Ok(())
        }
        Command::Reference(reference_args) => run_reference(reference_args),
    }
}
