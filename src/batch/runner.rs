//! # 步骤执行与结果统计
//!
//! 运行外部模拟程序，并汇总每个步骤的处理结果。
//!
//! ## 功能
//! - 通过 `sh -c` 在工作目录中运行模拟命令
//! - 运行期间显示 spinner
//! - 结果收集与汇总报告
//!
//! ## 依赖关系
//! - 被 `batch/job.rs` 调用
//! - 使用 `utils/progress.rs` 创建 spinner

use crate::error::{Result, SweepError};
use crate::utils::progress;

use std::fs::File;
use std::path::Path;
use std::process::{Command, Stdio};

/// 单个步骤处理结果
#[derive(Debug, Clone, PartialEq)]
pub enum ProcessResult {
    /// 处理成功
    Success(String),
    /// 跳过（序号小于起始步或 dry run）
    Skipped(String),
    /// 处理失败
    Failed(String, String), // (步骤名, 错误信息)
}

/// 整个作业的结果统计
#[derive(Debug, Default)]
pub struct RunReport {
    /// 成功数量
    pub success: usize,
    /// 跳过数量
    pub skipped: usize,
    /// 失败数量
    pub failed: usize,
    /// 失败详情
    pub failures: Vec<(String, String)>,
}

impl RunReport {
    /// 合并处理结果
    pub fn merge(&mut self, result: ProcessResult) {
        match result {
            ProcessResult::Success(_) => self.success += 1,
            ProcessResult::Skipped(_) => self.skipped += 1,
            ProcessResult::Failed(name, err) => {
                self.failed += 1;
                self.failures.push((name, err));
            }
        }
    }

    /// 总处理数量
    pub fn total(&self) -> usize {
        self.success + self.skipped + self.failed
    }
}

/// 在 `workdir` 中运行模拟命令，stdout/stderr 写入 `log_path`
pub fn run_command(command: &str, workdir: &Path, log_path: &Path) -> Result<()> {
    let log = File::create(log_path).map_err(|e| SweepError::FileWriteError {
        path: log_path.display().to_string(),
        source: e,
    })?;
    let log_err = log.try_clone().map_err(|e| SweepError::FileWriteError {
        path: log_path.display().to_string(),
        source: e,
    })?;

    let spinner = progress::create_spinner(&format!("Running: {}", command));

    let status = Command::new("sh")
        .arg("-c")
        .arg(command)
        .current_dir(workdir)
        .stdin(Stdio::null())
        .stdout(Stdio::from(log))
        .stderr(Stdio::from(log_err))
        .status();

    spinner.finish_and_clear();

    let status = status.map_err(|_| SweepError::CommandNotFound {
        command: command.to_string(),
    })?;

    if status.success() {
        Ok(())
    } else {
        Err(SweepError::CommandFailed {
            command: command.to_string(),
            stderr: format!("{} (output in {})", status, log_path.display()),
        })
    }
}
