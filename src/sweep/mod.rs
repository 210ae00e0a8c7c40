//! # 晶格常数扫描模块
//!
//! 立方晶胞体积测试：逐个晶格常数改写 POSCAR、运行 VASP、汇总结果。
//!
//! ## 依赖关系
//! - 被 `commands/` 使用
//! - 使用 `batch/`, `parsers/`, `models/`
//! - 子模块: driver, step, summary

pub mod driver;
pub mod step;
pub mod summary;

pub use driver::LatticeSweep;
pub use summary::DriftMode;
