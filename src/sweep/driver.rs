//! # 立方晶胞晶格常数扫描
//!
//! 为每个晶格常数构造一个步骤，交给 `BatchJob` 顺序执行，
//! 并在每步完成后解析 vasprun.xml、追加一行汇总记录。
//!
//! ## 用法
//! ```text
//! volsweep run --range 5.2:5.8:0.05 --basedir ./ --workdir $SCRATCH --vasp-cmd vasp.x
//! ```
//!
//! ## 依赖关系
//! - 被 `commands/run.rs` 调用
//! - 使用 `batch/`, `parsers/vasprun.rs`, `sweep/summary.rs`

use super::step::LatticeStep;
use super::summary::{self, DriftMode, SummaryFile, SummaryRecord};
use crate::batch::{BatchJob, BatchStep, JobConfig, RunOptions, RunReport, TemplateSet};
use crate::error::{Result, SweepError};
use crate::parsers::{vasprun, RunOutput};
use crate::utils::output;

/// 汇总文件中扫描参数的标签
pub const PARAM_NAME: &str = "VOL";

/// 晶格常数扫描作业
pub struct LatticeSweep {
    job: BatchJob<LatticeStep>,
    drift_mode: DriftMode,
}

impl LatticeSweep {
    /// 每个晶格常数对应一个步骤（序号从 1 开始），所有步骤共用
    /// `basedir` 中不带序号的模板文件。构造时不修改任何文件。
    pub fn new(lattice_parameters: &[f64], mut config: JobConfig) -> Result<Self> {
        let templates = TemplateSet::shared(&config.basedir)?;
        config.param_name = PARAM_NAME.to_string();

        let mut job = BatchJob::new(config);
        for (idx, &param) in lattice_parameters.iter().enumerate() {
            job.add_step(LatticeStep::new(idx + 1, param, templates.clone()));
        }

        Ok(LatticeSweep {
            job,
            drift_mode: DriftMode::default(),
        })
    }

    pub fn with_drift_mode(mut self, drift_mode: DriftMode) -> Self {
        self.drift_mode = drift_mode;
        self
    }

    pub fn steps(&self) -> &[LatticeStep] {
        self.job.steps()
    }

    pub fn config(&self) -> &JobConfig {
        self.job.config()
    }

    /// 打印运行前报告
    pub fn print_info(&self) {
        self.job.print_info();
    }

    /// 解析某步的 vasprun.xml 并追加汇总行
    ///
    /// 任何解析或归约失败都返回 `SweepError::OutputUnparsable`，
    /// 由调用方决定终止还是继续。
    pub fn update_summary(
        &self,
        step: &LatticeStep,
        summary: &mut SummaryFile,
    ) -> Result<SummaryRecord> {
        let path = step.output_file(&self.config().basedir, "vasprun.xml");
        let run = vasprun::parse_vasprun(&path)?;

        let (record, (i, j)) =
            summary::reduce(&step.name(), &run, self.drift_mode).map_err(|e| {
                SweepError::OutputUnparsable {
                    path: path.display().to_string(),
                    reason: e.to_string(),
                }
            })?;

        if let Some(last) = run.final_step() {
            let structure = &last.structure;
            output::print_info(&format!(
                "{}: {} ionic step(s), {}, V = {:.3} Å³, shortest bond {:.3} Å (atoms {}-{})",
                record.name,
                run.ionic_steps.len(),
                structure.formula(),
                structure.lattice.volume().abs(),
                record.shortest_bond,
                i + 1,
                j + 1
            ));
        }

        summary.append(&record)?;
        Ok(record)
    }

    /// 顺序执行所有步骤
    pub fn start(&self, options: &RunOptions) -> Result<RunReport> {
        if options.dry_run {
            return self.job.start(options, |step| Ok(step.name()));
        }

        let mut summary = SummaryFile::open(&self.config().summary_file)?;

        self.job.start(options, |step| {
            let record = self.update_summary(step, &mut summary)?;
            Ok(format!(
                "{}: E = {:.4} eV, P = {:.2} kB, max force {:.4}",
                record.name, record.total_energy, record.pressure, record.max_force
            ))
        })
    }
}
