//! # 输入模板集合
//!
//! 显式列出作业所需的输入模板名称及其解析后的路径，构造时即校验。
//!
//! ## 依赖关系
//! - 被 `batch/job.rs`, `sweep/` 使用
//! - 无外部模块依赖

use crate::error::{Result, SweepError};
use std::path::{Path, PathBuf};

/// VASP 每步所需的输入文件
pub const REQUIRED_TEMPLATES: [&str; 4] = ["INCAR", "KPOINTS", "POTCAR", "POSCAR"];

/// 模板名到文件路径的映射
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateSet {
    entries: Vec<(String, PathBuf)>,
}

impl TemplateSet {
    /// 所有步共用 `basedir` 中不带序号的模板文件
    pub fn shared(basedir: &Path) -> Result<Self> {
        let mut entries = Vec::with_capacity(REQUIRED_TEMPLATES.len());

        for name in REQUIRED_TEMPLATES {
            let path = basedir.join(name);
            if !path.is_file() {
                return Err(SweepError::MissingTemplate {
                    name: name.to_string(),
                    path: path.display().to_string(),
                });
            }
            entries.push((name.to_string(), path));
        }

        Ok(TemplateSet { entries })
    }

    /// 查找某模板的路径
    pub fn get(&self, name: &str) -> Option<&Path> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, p)| p.as_path())
    }

    /// 遍历 (模板名, 路径)
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Path)> {
        self.entries.iter().map(|(n, p)| (n.as_str(), p.as_path()))
    }
}
