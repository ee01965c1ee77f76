//! # xtask - 开发辅助工具
//!
//! 提供本地质量门禁与开发辅助命令。
//!
//! ## 命令
//!
//! - `check-all`: 运行 fmt、clippy、test
//! - `cov-runtime`: 运行 tween-runtime 覆盖率
//! - `cov-workspace`: 运行 workspace 覆盖率
//! - `scenario-check`: 检查场景文件（JSON 语法、目标引用、数值表达式）

use std::path::{Path, PathBuf};
use std::process::{Command, ExitCode};

use tween_runtime::Scenario;
use walkdir::WalkDir;

/// 运行一条 cargo 命令，失败时返回错误
fn cargo(args: &[&str]) -> anyhow::Result<()> {
    let line = format!("cargo {}", args.join(" "));
    eprintln!("\n==> {line}");
    let status = Command::new("cargo").args(args).status()?;
    if !status.success() {
        anyhow::bail!("{line} failed with {status}");
    }
    Ok(())
}

fn ensure_llvm_cov() -> anyhow::Result<()> {
    let available = Command::new("cargo")
        .args(["llvm-cov", "--version"])
        .status()
        .is_ok_and(|s| s.success());
    if !available {
        anyhow::bail!(
            "cargo llvm-cov 不可用。\n\
请先安装：\n\
  - cargo install cargo-llvm-cov\n\
  - rustup component add llvm-tools-preview\n\
然后重试。"
        );
    }
    Ok(())
}

fn main() -> ExitCode {
    match real_main() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("xtask error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn real_main() -> anyhow::Result<()> {
    let mut args = std::env::args().skip(1);
    let sub = args.next().unwrap_or_else(|| "help".to_string());

    match sub.as_str() {
        "check-all" => {
            cargo(&["fmt", "--all", "--", "--check"])?;
            cargo(&["clippy", "--workspace", "--all-targets"])?;
            cargo(&["test", "--workspace"])?;
        }
        "cov-runtime" => {
            ensure_llvm_cov()?;
            cargo(&["llvm-cov", "-p", "tween-runtime", "--html"])?;
            eprintln!("\nCoverage HTML: target/llvm-cov/html/index.html");
        }
        "cov-workspace" => {
            ensure_llvm_cov()?;
            cargo(&["llvm-cov", "--workspace", "--exclude", "xtask", "--html"])?;
            eprintln!("\nCoverage HTML: target/llvm-cov/html/index.html");
        }
        "scenario-check" => {
            let path = args.next();
            scenario_check(path.as_deref())?;
        }
        "help" | "-h" | "--help" => print_help(),
        other => anyhow::bail!("unknown xtask subcommand: {other}"),
    }

    Ok(())
}

fn print_help() {
    eprintln!(
        r#"xtask - 开发辅助工具

USAGE:
  cargo xtask <command>

COMMANDS:
  check-all       运行 fmt、clippy、test 门禁检查
  cov-runtime     运行 tween-runtime 覆盖率报告
  cov-workspace   运行 workspace 覆盖率报告
  scenario-check  检查场景文件

SCENARIO-CHECK:
  cargo xtask scenario-check [path]

  不带参数：检查 demos/ 下所有 .json 场景文件
  带路径参数：检查指定文件或目录

  检查内容：
    - JSON 结构错误
    - 未定义的目标名
    - 无效的数值表达式与 Timeline 偏移

ALIASES (in .cargo/config.toml):
  cargo check-all     -> cargo xtask check-all
  cargo cov-runtime   -> cargo xtask cov-runtime
  cargo cov-workspace -> cargo xtask cov-workspace
  cargo scenario-check -> cargo xtask scenario-check
"#
    );
}

//=============================================================================
// scenario-check 命令实现
//=============================================================================

/// 默认场景目录（相对于 workspace root）
const DEFAULT_SCENARIO_DIR: &str = "demos";

/// 场景检查结果
#[derive(Default)]
struct ScenarioCheckResult {
    /// 检查的文件数量
    checked: usize,
    /// 跳过的文件（配置文件等非场景 JSON）
    skipped: Vec<PathBuf>,
    /// 出错的文件及原因
    errors: Vec<(PathBuf, String)>,
}

/// 执行场景检查
fn scenario_check(path: Option<&str>) -> anyhow::Result<()> {
    let root = PathBuf::from(path.unwrap_or(DEFAULT_SCENARIO_DIR));
    if !root.exists() {
        anyhow::bail!(
            "路径不存在: {}\n请在 workspace 根目录运行，或指定场景路径",
            root.display()
        );
    }

    let files = collect_scenario_files(&root)?;
    if files.is_empty() {
        eprintln!("未找到场景文件（.json）");
        return Ok(());
    }

    eprintln!("==> 检查 {} 个 JSON 文件...\n", files.len());

    let mut result = ScenarioCheckResult::default();
    for file in &files {
        check_scenario_file(file, &mut result);
    }

    print_check_result(&result);

    if !result.errors.is_empty() {
        anyhow::bail!("场景检查发现错误");
    }

    Ok(())
}

/// 收集路径下的所有 JSON 文件
fn collect_scenario_files(root: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(root) {
        let entry = entry?;
        let path = entry.path();
        if entry.file_type().is_file() && path.extension().is_some_and(|ext| ext == "json") {
            files.push(path.to_path_buf());
        }
    }
    files.sort();
    Ok(files)
}

/// 没有 `targets` 字段的 JSON 不是场景文件
fn looks_like_scenario(content: &str) -> bool {
    content.contains("\"targets\"")
}

/// 检查单个场景文件
fn check_scenario_file(file: &Path, result: &mut ScenarioCheckResult) {
    let content = match std::fs::read_to_string(file) {
        Ok(c) => c,
        Err(e) => {
            result
                .errors
                .push((file.to_path_buf(), format!("无法读取文件 - {}", e)));
            return;
        }
    };

    if !looks_like_scenario(&content) {
        result.skipped.push(file.to_path_buf());
        return;
    }

    result.checked += 1;
    let checked = Scenario::from_json(&content).and_then(|scenario| scenario.validate());
    if let Err(e) = checked {
        result.errors.push((file.to_path_buf(), e.to_string()));
    }
}

/// 输出检查结果
fn print_check_result(result: &ScenarioCheckResult) {
    eprintln!("─────────────────────────────────────────────────────");
    eprintln!("检查完成: {} 个场景", result.checked);
    eprintln!();

    for path in &result.skipped {
        eprintln!("[SKIP] {}: 不是场景文件", path.display());
    }
    for (path, message) in &result.errors {
        eprintln!("[ERROR] {}: {}", path.display(), message);
    }

    eprintln!();
    if result.errors.is_empty() {
        eprintln!("✅ 检查通过，无错误");
    } else {
        eprintln!("❌ {} 个错误", result.errors.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_scenario_files() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("good.json");
        let bad = dir.path().join("nested").join("bad.json");
        let config = dir.path().join("config.json");
        std::fs::create_dir_all(bad.parent().unwrap()).unwrap();
        std::fs::write(
            &good,
            r#"{ "targets": { "a": { "x": 0 } }, "tweens": [ { "targets": ["a"], "props": { "x": 1 } } ] }"#,
        )
        .unwrap();
        std::fs::write(
            &bad,
            r#"{ "targets": {}, "tweens": [ { "targets": ["a"], "props": { "x": 1 } } ] }"#,
        )
        .unwrap();
        std::fs::write(&config, r#"{ "time_scale": 1.0 }"#).unwrap();

        let files = collect_scenario_files(dir.path()).unwrap();
        assert_eq!(files.len(), 3);

        let mut result = ScenarioCheckResult::default();
        for file in &files {
            check_scenario_file(file, &mut result);
        }
        assert_eq!(result.checked, 2);
        assert_eq!(result.skipped, vec![config]);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].0, bad);
    }
}
