//! # 数据模型模块
//!
//! 定义晶体结构与离子步数据模型。
//!
//! ## 依赖关系
//! - 被 `parsers/` 和 `sweep/` 使用
//! - 子模块: structure, calculation

pub mod calculation;
pub mod structure;

pub use calculation::IonicStep;
pub use structure::{Atom, Crystal, Lattice};
