//! # 解析器模块
//!
//! 提供 VASP 输出的解析器，以及汇总计算所依赖的 `RunOutput` 抽象。
//!
//! ## 依赖关系
//! - 被 `sweep/` 模块使用
//! - 使用 `models/` 数据模型
//! - 子模块: vasprun

pub mod vasprun;

use crate::models::IonicStep;

/// 一次计算输出中可供汇总的量
pub trait RunOutput {
    /// 最后一个离子步
    fn final_step(&self) -> Option<&IonicStep>;

    /// k 点数
    fn num_kpoints(&self) -> usize;

    /// 累计 (CPU 时间, 墙钟时间)，单位秒
    fn time_spent(&self) -> (f64, f64);
}
