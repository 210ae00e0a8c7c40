//! # VASP 离子步数据模型
//!
//! 存储 vasprun.xml 中每个离子弛豫步的结构、力、应力、能量与耗时。
//!
//! ## 依赖关系
//! - 被 `parsers/vasprun.rs` 构造
//! - 被 `sweep/summary.rs` 使用

use super::structure::Crystal;

/// 单个离子步快照
#[derive(Debug, Clone, PartialEq)]
pub struct IonicStep {
    /// 该步的结构
    pub structure: Crystal,

    /// 每原子受力 (eV/Å，笛卡尔)
    pub forces: Vec<[f64; 3]>,

    /// 应力张量 (kB)
    pub stress: Option<[[f64; 3]; 3]>,

    /// 自由能 TOTEN (eV)
    pub total_energy: f64,

    /// 该步 CPU 时间 (s)
    pub cpu_time: f64,

    /// 该步墙钟时间 (s)
    pub wall_time: f64,
}

impl IonicStep {
    /// 压力 (kB)，即应力张量迹的 1/3
    pub fn pressure(&self) -> Option<f64> {
        self.stress
            .map(|s| (s[0][0] + s[1][1] + s[2][2]) / 3.0)
    }

    /// 各方向受力之和 [Σfx, Σfy, Σfz]
    pub fn force_sums(&self) -> [f64; 3] {
        self.forces.iter().fold([0.0; 3], |acc, f| {
            [acc[0] + f[0], acc[1] + f[1], acc[2] + f[2]]
        })
    }

    /// 每原子受力平方模的最大值
    pub fn max_force(&self) -> f64 {
        self.forces
            .iter()
            .map(|f| f[0] * f[0] + f[1] * f[1] + f[2] * f[2])
            .fold(0.0, f64::max)
    }
}
