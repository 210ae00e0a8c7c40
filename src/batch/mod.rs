//! # 批处理作业模块
//!
//! 顺序执行一组模拟步骤，并在每步前后调用定制钩子。
//!
//! ## 功能
//! - 输入模板的显式配置与校验
//! - 工作目录准备与输出文件收集
//! - 外部模拟程序调用
//! - 失败策略（终止/继续）与结果统计
//!
//! ## 依赖关系
//! - 被 `sweep/` 使用
//! - 使用 `indicatif` 显示运行中的 spinner

pub mod job;
pub mod runner;
pub mod step;
pub mod template;

pub use job::{BatchJob, FailurePolicy, JobConfig, RunOptions};
pub use runner::RunReport;
pub use step::BatchStep;
pub use template::TemplateSet;
