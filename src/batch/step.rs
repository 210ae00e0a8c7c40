//! # 批处理步骤抽象
//!
//! 定义 `BatchJob` 调用的定制点：预处理钩子与信息钩子。
//!
//! ## 依赖关系
//! - 被 `batch/job.rs` 调用
//! - 由 `sweep/step.rs` 实现

use super::template::TemplateSet;
use crate::error::Result;
use std::path::{Path, PathBuf};

/// 一个批处理步骤
pub trait BatchStep {
    /// 步骤序号（从 1 开始，决定执行与显示顺序）
    fn index(&self) -> usize;

    /// 步骤名称（用作汇总行的第一列）
    fn name(&self) -> String;

    /// 本步使用的输入模板
    fn templates(&self) -> &TemplateSet;

    /// 在模拟运行前修改 `workdir` 中的输入文件
    fn preprocess(&self, _workdir: &Path) -> Result<()> {
        Ok(())
    }

    /// 预处理的单行说明，用于运行前报告
    fn preprocess_info(&self) -> Option<String> {
        None
    }

    /// 本步输出文件在 `basedir` 中的位置，如 `vasprun.xml.3`
    fn output_file(&self, basedir: &Path, name: &str) -> PathBuf {
        basedir.join(format!("{}.{}", name, self.index()))
    }
}
