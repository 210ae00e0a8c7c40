//! # CLI 模块
//!
//! 使用 `clap` 定义命令行参数和子命令。
//!
//! ## 命令结构
//! - `run`: 执行晶格常数扫描
//! - `report`: 汇总文件报告与平衡晶格常数估计
//!
//! ## 依赖关系
//! - 被 `main.rs` 使用
//! - 子模块: run, report

pub mod report;
pub mod run;

use clap::{Parser, Subcommand};

/// volsweep - VASP 晶格常数扫描工具
#[derive(Parser)]
#[command(name = "volsweep")]
#[command(author = "Changjiang Wu")]
#[command(version)]
#[command(about = "Lattice parameter sweeps (volume tests) for VASP", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// 可用的子命令
#[derive(Subcommand)]
pub enum Commands {
    /// Run a cubic lattice parameter sweep
    Run(run::RunArgs),

    /// Summarize a sweep and estimate the equilibrium lattice parameter
    Report(report::ReportArgs),
}
