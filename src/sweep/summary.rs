//! # 汇总记录
//!
//! 把一次计算的输出归约为一行制表符分隔的汇总记录，并追加到汇总文件。
//!
//! ## 列格式
//! ```text
//! name  kpoints  shortbond(.3)  toten(.4)  cpu(.0)  maxforce(.4)  pressure(.2)  drift(.4)
//! ```
//!
//! ## 依赖关系
//! - 被 `sweep/driver.rs` 和 `commands/report.rs` 使用
//! - 使用 `parsers::RunOutput`

use crate::error::{Result, SweepError};
use crate::parsers::RunOutput;

use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// 残余力（漂移）的计算方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DriftMode {
    /// max(Σfx, Σfy, Σfz)
    #[default]
    Corrected,
    /// max(Σfz, Σfy, Σfz)，与旧版汇总文件逐字节一致
    Legacy,
}

impl DriftMode {
    /// 由各方向受力之和得到漂移值
    pub fn drift(self, sums: [f64; 3]) -> f64 {
        let [fx, fy, fz] = sums;
        let vector = match self {
            DriftMode::Corrected => [fx, fy, fz],
            DriftMode::Legacy => [fz, fy, fz],
        };
        vector.into_iter().fold(f64::NEG_INFINITY, f64::max)
    }
}

/// 一行汇总记录，字段顺序即列顺序
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryRecord {
    pub name: String,
    pub kpoints: usize,
    pub shortest_bond: f64,
    pub total_energy: f64,
    pub cpu_time: f64,
    pub max_force: f64,
    pub pressure: f64,
    pub drift: f64,
}

impl SummaryRecord {
    /// 格式化为汇总行（不含换行符）
    pub fn to_line(&self) -> String {
        format!(
            "{}\t{}\t{:.3}\t{:.4}\t{:.0}\t{:.4}\t{:.2}\t{:.4}",
            self.name,
            self.kpoints,
            self.shortest_bond,
            self.total_energy,
            self.cpu_time,
            self.max_force,
            self.pressure,
            self.drift
        )
    }
}

/// 从计算输出归约出汇总记录（使用最后一个离子步）
///
/// 同时返回最短键两端的原子序号（从 0 开始）。
pub fn reduce(
    name: &str,
    run: &impl RunOutput,
    drift_mode: DriftMode,
) -> Result<(SummaryRecord, (usize, usize))> {
    let last = run
        .final_step()
        .ok_or_else(|| SweepError::InvalidFormat("No ionic steps".to_string()))?;

    let (shortest_bond, i, j) = last
        .structure
        .shortest_bond()
        .ok_or_else(|| SweepError::InvalidFormat("Structure has no atoms".to_string()))?;

    let pressure = last
        .pressure()
        .ok_or_else(|| SweepError::InvalidFormat("No stress tensor".to_string()))?;

    let (cpu_time, _wall_time) = run.time_spent();

    let record = SummaryRecord {
        name: name.to_string(),
        kpoints: run.num_kpoints(),
        shortest_bond,
        total_energy: last.total_energy,
        cpu_time,
        max_force: last.max_force(),
        pressure,
        drift: drift_mode.drift(last.force_sums()),
    };

    Ok((record, (i, j)))
}

/// 追加写入的汇总文件句柄，离开作用域即关闭
pub struct SummaryFile {
    path: PathBuf,
    file: File,
}

impl SummaryFile {
    /// 以追加模式打开（不存在则创建）
    pub fn open(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| SweepError::FileWriteError {
                path: path.display().to_string(),
                source: e,
            })?;

        Ok(SummaryFile {
            path: path.to_path_buf(),
            file,
        })
    }

    /// 追加一行并立即落盘
    pub fn append(&mut self, record: &SummaryRecord) -> Result<()> {
        writeln!(self.file, "{}", record.to_line())
            .and_then(|_| self.file.flush())
            .map_err(|e| SweepError::FileWriteError {
                path: self.path.display().to_string(),
                source: e,
            })
    }
}

/// 读取已有的汇总文件（无表头，制表符分隔）
pub fn read_summary(path: &Path) -> Result<Vec<SummaryRecord>> {
    if !path.exists() {
        return Err(SweepError::FileNotFound {
            path: path.display().to_string(),
        });
    }

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .trim(csv::Trim::All)
        .from_path(path)?;

    let mut records = Vec::new();
    for row in reader.deserialize() {
        let record: SummaryRecord = row?;
        records.push(record);
    }

    Ok(records)
}
