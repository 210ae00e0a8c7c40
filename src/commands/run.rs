//! # run 命令实现
//!
//! 构造晶格常数扫描作业、打印运行前报告并顺序执行。
//!
//! ## 功能
//! - 合并 `--params` 列表与 `--range` 等差序列
//! - 解析工作目录（`--workdir` / `$SCRATCH` / basedir）
//! - 选择失败策略与漂移计算方式
//!
//! ## 依赖关系
//! - 使用 `cli/run.rs` 定义的参数
//! - 使用 `sweep/`, `batch/`
//! - 使用 `utils/output.rs`

use crate::batch::{FailurePolicy, JobConfig, RunOptions};
use crate::cli::run::RunArgs;
use crate::error::{Result, SweepError};
use crate::sweep::{DriftMode, LatticeSweep};
use crate::utils::output;

/// 执行 run 命令
pub fn execute(args: RunArgs) -> Result<()> {
    let mut params = args.params.clone();
    if let Some(ref range) = args.range {
        params.extend(parse_range(range)?);
    }

    if params.is_empty() {
        return Err(SweepError::InvalidArgument(
            "No lattice parameters given (use --params and/or --range)".to_string(),
        ));
    }

    if !args.basedir.is_dir() {
        return Err(SweepError::DirectoryNotFound {
            path: args.basedir.display().to_string(),
        });
    }

    let workdir = args.workdir.clone().unwrap_or_else(|| args.basedir.clone());
    let mut config = JobConfig::new(&args.basedir, workdir, &args.vasp_cmd);
    if let Some(ref summary_file) = args.summary_file {
        config.summary_file = summary_file.clone();
    }

    let drift_mode = if args.legacy_drift {
        DriftMode::Legacy
    } else {
        DriftMode::Corrected
    };

    let sweep = LatticeSweep::new(&params, config)?.with_drift_mode(drift_mode);
    sweep.print_info();

    let options = RunOptions {
        dry_run: args.dry_run,
        first_step: args.first_step,
        policy: if args.keep_going {
            FailurePolicy::Continue
        } else {
            FailurePolicy::Abort
        },
    };

    let report = sweep.start(&options)?;

    output::print_separator();
    if report.failed > 0 {
        output::print_warning(&format!("{} step(s) failed:", report.failed));
        for (name, err) in &report.failures {
            println!("  {} {}", name, err);
        }
    }
    output::print_done(&format!(
        "Processed {} steps: {} completed, {} skipped, {} failed",
        report.total(),
        report.success,
        report.skipped,
        report.failed
    ));
    if report.success > 0 {
        output::print_info(&format!(
            "Summary written to '{}'",
            sweep.config().summary_file.display()
        ));
    }

    Ok(())
}

/// `--range` 最多展开的值个数
const MAX_RANGE_STEPS: usize = 10_000;

/// 解析 'start:stop:step' 等差序列（不含 stop）
fn parse_range(expr: &str) -> Result<Vec<f64>> {
    let parts: Vec<&str> = expr.split(':').map(|s| s.trim()).collect();
    if parts.len() != 3 {
        return Err(SweepError::InvalidRange(expr.to_string()));
    }

    let parse = |s: &str| {
        s.parse::<f64>()
            .map_err(|_| SweepError::InvalidRange(expr.to_string()))
    };
    let start = parse(parts[0])?;
    let stop = parse(parts[1])?;
    let step = parse(parts[2])?;

    if step == 0.0 || !step.is_finite() {
        return Err(SweepError::InvalidRange(expr.to_string()));
    }

    let count = ((stop - start) / step).ceil();
    if !count.is_finite() || count > MAX_RANGE_STEPS as f64 {
        return Err(SweepError::InvalidRange(format!(
            "{} (more than {} values)",
            expr, MAX_RANGE_STEPS
        )));
    }
    if count <= 0.0 {
        return Ok(Vec::new());
    }

    Ok((0..count as usize)
        .map(|i| start + i as f64 * step)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_range_excludes_stop() {
        let values = parse_range("5.2:5.8:0.05").unwrap();
        assert_eq!(values.len(), 12);
        assert!((values[0] - 5.2).abs() < 1e-12);
        assert!((values[11] - 5.75).abs() < 1e-9);
    }

    #[test]
    fn test_parse_range_descending() {
        let values = parse_range("5.5:5.0:-0.25").unwrap();
        let names: Vec<String> = values.iter().map(|v| format!("{:.3}", v)).collect();
        assert_eq!(names, vec!["5.500", "5.250"]);
    }

    #[test]
    fn test_parse_range_empty() {
        assert!(parse_range("5.4:5.2:0.1").unwrap().is_empty());
    }

    #[test]
    fn test_parse_range_invalid() {
        assert!(parse_range("5.2:5.8").is_err());
        assert!(parse_range("5.2:5.8:0").is_err());
        assert!(parse_range("a:5.8:0.1").is_err());
        assert!(parse_range("0:inf:0.1").is_err());
    }

    #[test]
    fn test_parse_range_too_many_values() {
        assert!(matches!(
            parse_range("0:1e30:1e-30"),
            Err(SweepError::InvalidRange(_))
        ));
        assert_eq!(parse_range("0:10000:1").unwrap().len(), MAX_RANGE_STEPS);
    }
}
