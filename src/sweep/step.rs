//! # 晶格常数扫描步骤
//!
//! 每个步骤对应一个晶格常数：运行前把 POSCAR 第二行（缩放因子）
//! 改写为该值。
//!
//! ## 依赖关系
//! - 被 `sweep/driver.rs` 构造
//! - 实现 `batch/step.rs` 中的 `BatchStep`

use crate::batch::{BatchStep, TemplateSet};
use crate::error::{Result, SweepError};

use std::fmt;
use std::fs;
use std::path::Path;

/// 被改写的结构文件
pub const STRUCTURE_FILE: &str = "POSCAR";

/// 单个晶格常数的扫描步骤
#[derive(Debug, Clone)]
pub struct LatticeStep {
    index: usize,
    lattice_parameter: f64,
    templates: TemplateSet,
}

impl LatticeStep {
    pub fn new(index: usize, lattice_parameter: f64, templates: TemplateSet) -> Self {
        LatticeStep {
            index,
            lattice_parameter,
            templates,
        }
    }
}

impl fmt::Display for LatticeStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "a = {:.3}", self.lattice_parameter)
    }
}

impl BatchStep for LatticeStep {
    fn index(&self) -> usize {
        self.index
    }

    fn name(&self) -> String {
        format!("{:.3}", self.lattice_parameter)
    }

    fn templates(&self) -> &TemplateSet {
        &self.templates
    }

    fn preprocess(&self, workdir: &Path) -> Result<()> {
        let path = workdir.join(STRUCTURE_FILE);
        let content = fs::read_to_string(&path).map_err(|e| SweepError::FileReadError {
            path: path.display().to_string(),
            source: e,
        })?;

        let updated = replace_scaling_line(&content, self.lattice_parameter).ok_or_else(|| {
            SweepError::InvalidFormat(format!(
                "{} has fewer than 2 lines",
                path.display()
            ))
        })?;

        fs::write(&path, updated).map_err(|e| SweepError::FileWriteError {
            path: path.display().to_string(),
            source: e,
        })
    }

    fn preprocess_info(&self) -> Option<String> {
        Some(format!(
            "  -> Update POSCAR with new lattice parameter: {:.2}",
            self.lattice_parameter
        ))
    }
}

/// 把第二行替换为 `{:.4}` 格式的值，其余行（含换行符）原样保留
pub fn replace_scaling_line(content: &str, value: f64) -> Option<String> {
    let scaling = format!("{:.4}\n", value);
    let mut lines: Vec<&str> = content.split_inclusive('\n').collect();
    if lines.len() < 2 {
        return None;
    }

    lines[1] = &scaling;
    Some(lines.concat())
}
