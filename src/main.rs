//! # volsweep - VASP 晶格常数扫描工具
//!
//! 对立方晶胞逐个晶格常数改写 POSCAR、运行 VASP，并把每次计算的
//! 能量、最短键长、受力、压力与耗时汇总为一行制表符分隔的记录。
//!
//! ## 子命令
//! - `run`    - 执行晶格常数扫描
//! - `report` - 汇总文件报告与平衡晶格常数估计
//!
//! ## 依赖关系
//! ```text
//! main.rs
//!   ├── cli/        (命令行参数定义)
//!   ├── commands/   (命令执行逻辑)
//!   │     └── sweep/     (扫描作业与汇总)
//!   │           ├── batch/    (批处理作业执行)
//!   │           ├── parsers/  (vasprun.xml 解析)
//!   │           └── models/   (数据模型)
//!   ├── utils/      (工具函数)
//!   └── error.rs    (错误处理)
//! ```

mod batch;
mod cli;
mod commands;
mod error;
mod models;
mod parsers;
mod sweep;
mod utils;

use clap::Parser;
use cli::Cli;

fn main() {
    // Initialize colored output for Windows compatibility
    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    let cli = Cli::parse();

    if let Err(e) = commands::run(cli.command) {
        utils::output::print_error(&format!("{}", e));
        std::process::exit(1);
    }
}
