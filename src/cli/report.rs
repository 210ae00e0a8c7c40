//! # report 子命令 CLI 定义
//!
//! 读取汇总文件，估计平衡晶格常数并可选绘图
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/report.rs`

use clap::Args;
use std::path::PathBuf;

/// report 子命令参数
#[derive(Args, Debug)]
pub struct ReportArgs {
    /// Summary file written by 'run'
    #[arg(default_value = "summary.txt")]
    pub summary_file: PathBuf,

    /// Save an E(a) plot to this PNG file
    #[arg(long)]
    pub plot: Option<PathBuf>,
}
