//! # run 子命令 CLI 定义
//!
//! 执行立方晶胞晶格常数扫描
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/run.rs`

use clap::Args;
use std::path::PathBuf;

/// run 子命令参数
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Lattice parameters to test (comma-separated, e.g. '5.20,5.25')
    #[arg(long, value_delimiter = ',')]
    pub params: Vec<f64>,

    /// Lattice parameter range 'start:stop:step' (stop excluded, e.g. '5.2:5.8:0.05')
    #[arg(long)]
    pub range: Option<String>,

    /// Directory holding the INCAR/KPOINTS/POTCAR/POSCAR templates
    #[arg(long, default_value = ".")]
    pub basedir: PathBuf,

    /// Directory where VASP runs (defaults to $SCRATCH, then to basedir)
    #[arg(long, env = "SCRATCH")]
    pub workdir: Option<PathBuf>,

    /// Command used to run VASP (executed through 'sh -c')
    #[arg(long, default_value = "vasp.x")]
    pub vasp_cmd: String,

    /// Summary file (defaults to 'summary.txt' in basedir)
    #[arg(long)]
    pub summary_file: Option<PathBuf>,

    /// First step to execute (1-based; earlier steps are skipped)
    #[arg(long, default_value_t = 1)]
    pub first_step: usize,

    // ─────────────────────────────────────────────────────────────
    // Execution control
    // ─────────────────────────────────────────────────────────────
    /// Only print the plan, do not run VASP
    #[arg(long, default_value_t = false)]
    pub dry_run: bool,

    /// Continue with the next step when a run cannot be parsed
    #[arg(long, default_value_t = false)]
    pub keep_going: bool,

    /// Compute drift as max(Σfz, Σfy, Σfz) like older summary files
    #[arg(long, default_value_t = false)]
    pub legacy_drift: bool,
}
