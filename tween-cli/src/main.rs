//! # tween-cli
//!
//! 在终端中运行补间场景，按固定帧步长推进并输出属性值。
//!
//! ## 用法
//!
//! ```bash
//! cargo run -p tween-cli -- run demos/bounce.json
//! cargo run -p tween-cli -- run demos/bounce.json --step 33.3 --every 10
//! cargo run -p tween-cli -- check demos/bounce.json
//! cargo run -p tween-cli -- seek demos/bounce.json --progress 0.5
//! ```
//!
//! 每个输出帧是一行 JSON：`{"time": 16.6, "values": {"hero.x": 1.66}}`。

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde_json::json;
use tracing::{Level, debug, info};
use tween_runtime::{EngineConfig, Scenario, ScenarioInstance, TweenManager, UNBOUNDED_COUNT};

#[derive(Parser, Debug)]
#[command(name = "tween")]
#[command(about = "补间场景运行工具")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// 输出更多日志（-v: debug，-vv: trace）
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// 逐帧运行场景直到所有动画结束
    Run {
        /// 场景文件（JSON）
        scenario: PathBuf,

        /// 引擎配置文件
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// 帧步长（毫秒），默认使用配置中的 seek_step
        #[arg(short, long)]
        step: Option<f64>,

        /// 最长运行时间（毫秒）
        #[arg(long, default_value = "60000")]
        max_time: f64,

        /// 每隔多少帧输出一次
        #[arg(short, long, default_value = "1")]
        every: u32,
    },

    /// 检查场景文件
    Check {
        /// 场景文件（JSON）
        scenario: PathBuf,
    },

    /// 把场景中的每个 Tween 跳到指定进度并输出属性值
    Seek {
        /// 场景文件（JSON）
        scenario: PathBuf,

        /// 目标进度（0..=1）
        #[arg(short, long)]
        progress: f64,

        /// 引擎配置文件
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let stdout = io::stdout();
    let mut out = stdout.lock();
    if let Err(e) = execute(cli.command, &mut out) {
        eprintln!("❌ {:#}", e);
        std::process::exit(1);
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(io::stderr)
        .init();
}

fn execute(command: Commands, out: &mut impl Write) -> anyhow::Result<()> {
    match command {
        Commands::Run {
            scenario,
            config,
            step,
            max_time,
            every,
        } => {
            let config = load_config(config.as_deref())?;
            let step = step.unwrap_or(config.seek_step);
            if !step.is_finite() || step <= 0.0 {
                anyhow::bail!("帧步长必须大于 0，实际为 {}", step);
            }
            let scenario = load_scenario(&scenario)?;
            run_scenario(&scenario, &config, step, max_time, every.max(1), out)
        }
        Commands::Check { scenario } => {
            let path = scenario;
            let scenario = load_scenario(&path)?;
            scenario
                .validate()
                .with_context(|| format!("场景无效: {}", path.display()))?;
            check_scenario(&scenario, out)?;
            writeln!(out, "✅ {}", path.display())?;
            Ok(())
        }
        Commands::Seek {
            scenario,
            progress,
            config,
        } => {
            let config = load_config(config.as_deref())?;
            let scenario = load_scenario(&scenario)?;
            seek_scenario(&scenario, &config, progress, out)
        }
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<EngineConfig> {
    let config = match path {
        Some(path) => EngineConfig::load(path),
        None => EngineConfig::default(),
    };
    config.validate()?;
    Ok(config)
}

fn load_scenario(path: &Path) -> anyhow::Result<Scenario> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("无法读取场景文件: {}", path.display()))?;
    let scenario = Scenario::from_json(&content)
        .with_context(|| format!("场景解析失败: {}", path.display()))?;
    debug!(path = %path.display(), "场景文件已读取");
    Ok(scenario)
}

fn write_frame(out: &mut impl Write, time: f64, instance: &ScenarioInstance) -> io::Result<()> {
    let frame = json!({ "time": time, "values": instance.snapshot() });
    writeln!(out, "{}", frame)
}

fn run_scenario(
    scenario: &Scenario,
    config: &EngineConfig,
    step: f64,
    max_time: f64,
    every: u32,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    let mut manager = TweenManager::with_config(config);
    let instance = scenario.instantiate(&mut manager)?;

    write_frame(out, 0.0, &instance)?;

    let mut time = 0.0;
    let mut frame: u32 = 0;
    loop {
        time += step;
        frame += 1;
        manager.step(time, step);
        // 完成项在下一次 pre_update 才离开活动列表
        manager.pre_update();

        let finished = manager.is_idle();
        let timed_out = time >= max_time;
        if frame % every == 0 || finished || timed_out {
            write_frame(out, time, &instance)?;
        }

        if finished {
            info!(time, frames = frame, "所有动画已结束");
            break;
        }
        if timed_out {
            info!(time, "达到最长运行时间，停止");
            break;
        }
    }

    Ok(())
}

/// 输出场景中每个 Tween/Timeline 的总时长
fn check_scenario(scenario: &Scenario, out: &mut impl Write) -> anyhow::Result<()> {
    let mut manager = TweenManager::new();
    let instance = scenario.instantiate(&mut manager)?;
    manager.pre_update();

    writeln!(out, "{} 个目标", instance.targets.len())?;
    for id in &instance.tweens {
        if let Some(tween) = manager.tween(*id) {
            writeln!(out, "{}: {}", id, format_duration(tween.total_duration()))?;
        }
    }
    for id in &instance.timelines {
        if let Some(timeline) = manager.timeline(*id) {
            writeln!(out, "{}: {}", id, format_duration(timeline.total_duration()))?;
        }
    }
    Ok(())
}

fn format_duration(ms: f64) -> String {
    // 无限循环的总时长以哨兵值计算
    if ms >= UNBOUNDED_COUNT as f64 {
        "∞".to_string()
    } else {
        format!("{:.1}ms", ms)
    }
}

fn seek_scenario(
    scenario: &Scenario,
    config: &EngineConfig,
    progress: f64,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    let mut manager = TweenManager::with_config(config);
    let instance = scenario.instantiate(&mut manager)?;

    // 激活新加入的 Tween
    manager.pre_update();
    for id in &instance.tweens {
        manager.seek(*id, progress)?;
    }

    let frame = json!({ "progress": progress, "values": instance.snapshot() });
    writeln!(out, "{}", frame)?;
    Ok(())
}
