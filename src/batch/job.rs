//! # 批处理作业
//!
//! 按序号顺序执行一组 `BatchStep`：准备工作目录、调用预处理钩子、
//! 运行模拟程序、取回输出文件，再交给调用方的完成回调。
//!
//! ## 依赖关系
//! - 被 `sweep/driver.rs` 使用
//! - 使用 `batch/runner.rs`, `batch/step.rs`
//! - 使用 `utils/output.rs`

use super::runner::{self, ProcessResult, RunReport};
use super::step::BatchStep;
use crate::error::{Result, SweepError};
use crate::utils::output;

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// 每步运行后取回 `basedir` 的输出文件
pub const OUTPUT_FILES: [&str; 4] = ["vasprun.xml", "OUTCAR", "OSZICAR", "CONTCAR"];

/// 缺失即视为本步失败的输出文件
pub const PRIMARY_OUTPUT: &str = "vasprun.xml";

/// 模拟程序 stdout/stderr 的日志文件名
pub const RUN_LOG: &str = "vasp.out";

/// 作业级配置
#[derive(Debug, Clone)]
pub struct JobConfig {
    /// 存放模板与收集输出的目录
    pub basedir: PathBuf,
    /// 运行模拟程序的目录
    pub workdir: PathBuf,
    /// 模拟程序命令（经 `sh -c` 执行）
    pub vasp_cmd: String,
    /// 汇总文件路径
    pub summary_file: PathBuf,
    /// 扫描参数标签
    pub param_name: String,
}

impl JobConfig {
    pub fn new(basedir: impl Into<PathBuf>, workdir: impl Into<PathBuf>, vasp_cmd: &str) -> Self {
        let basedir = basedir.into();
        JobConfig {
            summary_file: basedir.join("summary.txt"),
            basedir,
            workdir: workdir.into(),
            vasp_cmd: vasp_cmd.to_string(),
            param_name: "PARAM".to_string(),
        }
    }
}

/// 步骤失败时的处理策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// 立即终止整个作业
    #[default]
    Abort,
    /// 记录失败并继续后续步骤
    Continue,
}

/// 运行选项
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// 只打印计划，不执行
    pub dry_run: bool,
    /// 从该序号开始执行（之前的步骤跳过）
    pub first_step: usize,
    pub policy: FailurePolicy,
}

impl Default for RunOptions {
    fn default() -> Self {
        RunOptions {
            dry_run: false,
            first_step: 1,
            policy: FailurePolicy::Abort,
        }
    }
}

/// 批处理作业
pub struct BatchJob<S> {
    config: JobConfig,
    steps: Vec<S>,
}

impl<S: BatchStep + fmt::Display> BatchJob<S> {
    pub fn new(config: JobConfig) -> Self {
        BatchJob {
            config,
            steps: Vec::new(),
        }
    }

    pub fn config(&self) -> &JobConfig {
        &self.config
    }

    /// 添加步骤
    pub fn add_step(&mut self, step: S) {
        self.steps.push(step);
    }

    /// 按添加顺序返回全部步骤
    pub fn steps(&self) -> &[S] {
        &self.steps
    }

    /// 生成运行前报告
    pub fn info_report(&self) -> String {
        let mut lines = vec![
            format!("Parameter:     {}", self.config.param_name),
            format!("Base dir:      {}", self.config.basedir.display()),
            format!("Work dir:      {}", self.config.workdir.display()),
            format!("Command:       {}", self.config.vasp_cmd),
            format!("Summary file:  {}", self.config.summary_file.display()),
            format!("Steps:         {}", self.steps.len()),
            String::new(),
        ];

        for step in &self.steps {
            lines.push(format!("Step {}: {}", step.index(), step));
            if let Some(info) = step.preprocess_info() {
                lines.push(info);
            }
        }

        lines.join("\n")
    }

    /// 打印运行前报告
    pub fn print_info(&self) {
        output::print_header(&format!("Batch Job ({} steps)", self.steps.len()));
        println!("{}", self.info_report());
        output::print_separator();
    }

    /// 顺序执行所有步骤
    ///
    /// 每步执行完成后调用 `on_complete`；执行或回调返回错误时按
    /// `options.policy` 决定终止或继续。
    pub fn start<F>(&self, options: &RunOptions, mut on_complete: F) -> Result<RunReport>
    where
        F: FnMut(&S) -> Result<String>,
    {
        let mut report = RunReport::default();

        for step in &self.steps {
            let name = step.name();

            if step.index() < options.first_step {
                output::print_skip(&format!("Step {} ({})", step.index(), name));
                report.merge(ProcessResult::Skipped(name));
                continue;
            }

            if options.dry_run {
                output::print_dry(&format!(
                    "Step {} ({}): would run '{}' in {}",
                    step.index(),
                    name,
                    self.config.vasp_cmd,
                    self.config.workdir.display()
                ));
                report.merge(ProcessResult::Skipped(name));
                continue;
            }

            output::print_step(step.index(), &step.to_string());

            match self.execute(step).and_then(|_| on_complete(step)) {
                Ok(msg) => {
                    output::print_success(&msg);
                    report.merge(ProcessResult::Success(name));
                }
                Err(e) => match options.policy {
                    FailurePolicy::Abort => {
                        return Err(SweepError::Aborted {
                            index: step.index(),
                            reason: e.to_string(),
                        });
                    }
                    FailurePolicy::Continue => {
                        output::print_warning(&format!("Step {} failed: {}", step.index(), e));
                        report.merge(ProcessResult::Failed(name, e.to_string()));
                    }
                },
            }
        }

        Ok(report)
    }

    /// 执行单个步骤：复制模板、预处理、运行、取回输出
    fn execute(&self, step: &S) -> Result<()> {
        let workdir = &self.config.workdir;

        fs::create_dir_all(workdir).map_err(|e| SweepError::FileWriteError {
            path: workdir.display().to_string(),
            source: e,
        })?;

        for (name, src) in step.templates().iter() {
            copy_file(src, &workdir.join(name))?;
        }

        step.preprocess(workdir)?;

        // 上一步（或上一次扫描）的输出不能冒充本步结果
        for name in OUTPUT_FILES {
            remove_stale(&workdir.join(name))?;
            remove_stale(&step.output_file(&self.config.basedir, name))?;
        }

        runner::run_command(&self.config.vasp_cmd, workdir, &workdir.join(RUN_LOG))?;

        for name in OUTPUT_FILES {
            let src = workdir.join(name);
            if src.is_file() {
                copy_file(&src, &step.output_file(&self.config.basedir, name))?;
            } else if name == PRIMARY_OUTPUT {
                return Err(SweepError::OutputUnparsable {
                    path: src.display().to_string(),
                    reason: "command exited without writing it".to_string(),
                });
            } else {
                output::print_warning(&format!("Step {}: no {} produced", step.index(), name));
            }
        }

        Ok(())
    }
}

/// 复制文件；源与目标为同一文件时什么也不做
fn copy_file(src: &Path, dst: &Path) -> Result<()> {
    if is_same_file(src, dst) {
        return Ok(());
    }

    fs::copy(src, dst).map_err(|e| SweepError::FileWriteError {
        path: dst.display().to_string(),
        source: e,
    })?;

    Ok(())
}

/// 删除文件；文件不存在时什么也不做
fn remove_stale(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(SweepError::FileWriteError {
            path: path.display().to_string(),
            source: e,
        }),
    }
}

fn is_same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::template::{tests::write_templates, TemplateSet};
    use std::cell::RefCell;

    struct EchoStep {
        index: usize,
        templates: TemplateSet,
    }

    impl fmt::Display for EchoStep {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "echo {}", self.index)
        }
    }

    impl BatchStep for EchoStep {
        fn index(&self) -> usize {
            self.index
        }

        fn name(&self) -> String {
            format!("step{}", self.index)
        }

        fn templates(&self) -> &TemplateSet {
            &self.templates
        }

        fn preprocess(&self, workdir: &Path) -> Result<()> {
            fs::write(workdir.join("STEP"), self.index.to_string()).map_err(|e| {
                SweepError::FileWriteError {
                    path: "STEP".to_string(),
                    source: e,
                }
            })
        }
    }

    fn job(n: usize) -> (tempfile::TempDir, BatchJob<EchoStep>) {
        let dir = tempfile::tempdir().unwrap();
        let basedir = dir.path().join("base");
        fs::create_dir(&basedir).unwrap();
        write_templates(&basedir);

        let config = JobConfig::new(&basedir, dir.path().join("work"), "cat STEP > vasprun.xml");
        let mut job = BatchJob::new(config);
        let templates = TemplateSet::shared(&basedir).unwrap();
        for index in 1..=n {
            job.add_step(EchoStep {
                index,
                templates: templates.clone(),
            });
        }
        (dir, job)
    }

    #[test]
    fn test_steps_run_in_order_and_outputs_collected() {
        let (_dir, job) = job(3);
        let seen = RefCell::new(Vec::new());

        let report = job
            .start(&RunOptions::default(), |s| {
                seen.borrow_mut().push(s.index());
                Ok(s.name())
            })
            .unwrap();

        assert_eq!(*seen.borrow(), vec![1, 2, 3]);
        assert_eq!(report.success, 3);

        let basedir = &job.config().basedir;
        for i in 1..=3 {
            let out = fs::read_to_string(basedir.join(format!("vasprun.xml.{}", i))).unwrap();
            assert_eq!(out, i.to_string());
        }
        assert!(job.config().workdir.join("INCAR").exists());
        assert!(job.config().workdir.join(RUN_LOG).exists());
    }

    #[test]
    fn test_first_step_skips_earlier_steps() {
        let (_dir, job) = job(3);
        let options = RunOptions {
            first_step: 2,
            ..RunOptions::default()
        };

        let report = job.start(&options, |s| Ok(s.name())).unwrap();
        assert_eq!(report.skipped, 1);
        assert_eq!(report.success, 2);
        assert!(!job.config().basedir.join("vasprun.xml.1").exists());
    }

    #[test]
    fn test_dry_run_touches_nothing() {
        let (_dir, job) = job(2);
        let options = RunOptions {
            dry_run: true,
            ..RunOptions::default()
        };

        let report = job
            .start(&options, |_| -> Result<String> {
                panic!("no step should complete")
            })
            .unwrap();
        assert_eq!(report.skipped, 2);
        assert!(!job.config().workdir.exists());
    }

    #[test]
    fn test_abort_stops_before_later_steps() {
        let (_dir, job) = job(4);
        let seen = RefCell::new(Vec::new());

        let err = job
            .start(&RunOptions::default(), |s| {
                seen.borrow_mut().push(s.index());
                if s.index() == 2 {
                    Err(SweepError::Other("unparsable".to_string()))
                } else {
                    Ok(s.name())
                }
            })
            .unwrap_err();

        assert!(matches!(err, SweepError::Aborted { index: 2, .. }));
        assert_eq!(*seen.borrow(), vec![1, 2]);
        assert!(!job.config().basedir.join("vasprun.xml.3").exists());
    }

    #[test]
    fn test_continue_policy_records_failure() {
        let (_dir, job) = job(3);
        let options = RunOptions {
            policy: FailurePolicy::Continue,
            ..RunOptions::default()
        };

        let report = job
            .start(&options, |s| {
                if s.index() == 2 {
                    Err(SweepError::Other("unparsable".to_string()))
                } else {
                    Ok(s.name())
                }
            })
            .unwrap();

        assert_eq!(report.success, 2);
        assert_eq!(report.failed, 1);
        assert_eq!(report.failures[0].0, "step2");
    }

    #[test]
    fn test_basedir_as_workdir_keeps_templates() {
        let dir = tempfile::tempdir().unwrap();
        write_templates(dir.path());
        let config = JobConfig::new(dir.path(), dir.path(), "touch vasprun.xml");
        let mut job = BatchJob::new(config);
        job.add_step(EchoStep {
            index: 1,
            templates: TemplateSet::shared(dir.path()).unwrap(),
        });

        job.start(&RunOptions::default(), |s| Ok(s.name())).unwrap();
        let incar = fs::read_to_string(dir.path().join("INCAR")).unwrap();
        assert_eq!(incar, "ISTART = 0\nIBRION = 2\n");
    }

    #[test]
    fn test_missing_output_fails_step() {
        let (_dir, mut job) = job(3);
        job.config.vasp_cmd = "if [ \"$(cat STEP)\" = 1 ]; then cat STEP > vasprun.xml; fi".to_string();

        // 上一次扫描留下的第 2 步结果
        let stale = job.config().basedir.join("vasprun.xml.2");
        fs::write(&stale, "old").unwrap();

        let seen = RefCell::new(Vec::new());
        let err = job
            .start(&RunOptions::default(), |s| {
                seen.borrow_mut().push(s.index());
                Ok(s.name())
            })
            .unwrap_err();

        assert!(matches!(err, SweepError::Aborted { index: 2, .. }));
        assert_eq!(*seen.borrow(), vec![1]);
        assert!(!stale.exists());
        assert!(!job.config().workdir.join("vasprun.xml").exists());
    }

    #[test]
    fn test_missing_secondary_output_only_warns() {
        let (_dir, job) = job(1);
        job.start(&RunOptions::default(), |s| Ok(s.name())).unwrap();
        assert!(job.config().basedir.join("vasprun.xml.1").exists());
        assert!(!job.config().basedir.join("OUTCAR.1").exists());
    }

    #[test]
    fn test_info_report_lists_steps() {
        let (_dir, job) = job(2);
        let report = job.info_report();
        assert!(report.contains("Step 1: echo 1"));
        assert!(report.contains("Step 2: echo 2"));
        assert!(report.contains("Steps:         2"));
    }
}
