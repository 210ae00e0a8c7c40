//! # report 命令实现
//!
//! 读取扫描汇总文件，按晶格常数排序显示，并用最小二乘抛物线
//! E(a) 估计平衡晶格常数。
//!
//! ## 功能
//! - 终端表格输出（ΔE 相对最低能量）
//! - 抛物线拟合估计平衡晶格常数
//! - 可选绘制 E(a) 曲线
//!
//! ## 依赖关系
//! - 使用 `cli/report.rs` 定义的参数
//! - 使用 `sweep/summary.rs` 读取汇总文件
//! - 使用 `utils/output.rs`

use crate::cli::report::ReportArgs;
use crate::error::{Result, SweepError};
use crate::sweep::summary::{read_summary, SummaryRecord};
use crate::utils::output;

use std::path::Path;
use tabled::{Table, Tabled};

/// 报告表格行
#[derive(Debug, Clone, Tabled)]
struct ReportRow {
    #[tabled(rename = "a (Å)")]
    lattice: String,
    #[tabled(rename = "E (eV)")]
    energy: String,
    #[tabled(rename = "ΔE (eV)")]
    delta_e: String,
    #[tabled(rename = "P (kB)")]
    pressure: String,
    #[tabled(rename = "Bond (Å)")]
    bond: String,
    #[tabled(rename = "k-points")]
    kpoints: usize,
}

/// 执行 report 命令
pub fn execute(args: ReportArgs) -> Result<()> {
    output::print_header("Lattice Parameter Sweep Report");

    let records = read_summary(&args.summary_file)?;
    if records.is_empty() {
        output::print_warning("Summary file contains no records.");
        return Ok(());
    }

    let points = energy_curve(&records)?;
    output::print_info(&format!(
        "Loaded {} records from '{}'",
        points.len(),
        args.summary_file.display()
    ));

    let min_energy = points
        .iter()
        .map(|(_, r)| r.total_energy)
        .fold(f64::INFINITY, f64::min);

    let rows: Vec<ReportRow> = points
        .iter()
        .map(|(a, r)| ReportRow {
            lattice: format!("{:.3}", a),
            energy: format!("{:.4}", r.total_energy),
            delta_e: format!("{:.4}", r.total_energy - min_energy),
            pressure: format!("{:.2}", r.pressure),
            bond: format!("{:.3}", r.shortest_bond),
            kpoints: r.kpoints,
        })
        .collect();

    println!("{}", Table::new(&rows));

    let xy: Vec<(f64, f64)> = points.iter().map(|(a, r)| (*a, r.total_energy)).collect();
    let fit = fit_parabola(&xy);
    match fit {
        Some(p) => match p.minimum() {
            Some((a0, e0)) => output::print_success(&format!(
                "Equilibrium lattice parameter (parabolic fit): a0 = {:.4} Å, E0 = {:.4} eV",
                a0, e0
            )),
            None => output::print_warning("E(a) has no minimum in the fitted parabola."),
        },
        None => {
            output::print_warning("At least 3 distinct lattice parameters are needed for a fit.")
        }
    }

    if let Some(ref plot_path) = args.plot {
        plot_energy_curve(&xy, fit.as_ref(), plot_path)?;
        output::print_success(&format!("E(a) plot saved to '{}'", plot_path.display()));
    }

    Ok(())
}

/// 由步骤名还原晶格常数，并按晶格常数排序
fn energy_curve(records: &[SummaryRecord]) -> Result<Vec<(f64, &SummaryRecord)>> {
    let mut points = records
        .iter()
        .map(|r| {
            r.name
                .parse::<f64>()
                .map(|a| (a, r))
                .map_err(|_| {
                    SweepError::InvalidFormat(format!(
                        "Step name '{}' is not a lattice parameter",
                        r.name
                    ))
                })
        })
        .collect::<Result<Vec<_>>>()?;

    points.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
    Ok(points)
}

/// E(a) = c0 + c1 (a - x0) + c2 (a - x0)^2
#[derive(Debug, Clone, Copy, PartialEq)]
struct Parabola {
    x0: f64,
    c: [f64; 3],
}

impl Parabola {
    fn eval(&self, a: f64) -> f64 {
        let t = a - self.x0;
        self.c[0] + self.c[1] * t + self.c[2] * t * t
    }

    /// 开口向上时返回极小点 (a0, E0)
    fn minimum(&self) -> Option<(f64, f64)> {
        if self.c[2] <= 0.0 {
            return None;
        }
        let a0 = self.x0 - self.c[1] / (2.0 * self.c[2]);
        Some((a0, self.eval(a0)))
    }
}

/// 最小二乘抛物线拟合（x 以均值为中心以改善条件数）
fn fit_parabola(points: &[(f64, f64)]) -> Option<Parabola> {
    let mut distinct: Vec<f64> = points.iter().map(|p| p.0).collect();
    distinct.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    distinct.dedup_by(|a, b| (*a - *b).abs() < 1e-12);
    if distinct.len() < 3 {
        return None;
    }

    let n = points.len() as f64;
    let x0 = points.iter().map(|p| p.0).sum::<f64>() / n;

    // 正规方程 S * c = r
    let mut s = [0.0; 5];
    let mut r = [0.0; 3];
    for &(x, y) in points {
        let t = x - x0;
        let mut tk = 1.0;
        for k in 0..5 {
            s[k] += tk;
            if k < 3 {
                r[k] += tk * y;
            }
            tk *= t;
        }
    }

    let m = [[s[0], s[1], s[2]], [s[1], s[2], s[3]], [s[2], s[3], s[4]]];
    let det = det3(&m);
    if det.abs() < 1e-300 {
        return None;
    }

    let mut c = [0.0; 3];
    for (i, ci) in c.iter_mut().enumerate() {
        let mut mi = m;
        for row in 0..3 {
            mi[row][i] = r[row];
        }
        *ci = det3(&mi) / det;
    }

    Some(Parabola { x0, c })
}

fn det3(m: &[[f64; 3]; 3]) -> f64 {
    m[0][0] * (m[1][1] * m[2][2] - m[1][2] * m[2][1])
        - m[0][1] * (m[1][0] * m[2][2] - m[1][2] * m[2][0])
        + m[0][2] * (m[1][0] * m[2][1] - m[1][1] * m[2][0])
}

/// 绘制 E(a) 曲线
fn plot_energy_curve(
    points: &[(f64, f64)],
    fit: Option<&Parabola>,
    output_path: &Path,
) -> Result<()> {
    use plotters::prelude::*;

    let x_min = points.iter().map(|p| p.0).fold(f64::INFINITY, f64::min);
    let x_max = points.iter().map(|p| p.0).fold(f64::NEG_INFINITY, f64::max);
    let y_min = points.iter().map(|p| p.1).fold(f64::INFINITY, f64::min);
    let y_max = points.iter().map(|p| p.1).fold(f64::NEG_INFINITY, f64::max);
    let x_margin = ((x_max - x_min).abs() * 0.1).max(0.01);
    let y_margin = ((y_max - y_min).abs() * 0.1).max(0.001);

    let root = BitMapBackend::new(output_path, (800, 600)).into_drawing_area();
    root.fill(&WHITE)
        .map_err(|e| SweepError::Other(e.to_string()))?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Lattice Parameter Sweep", ("sans-serif", 24))
        .margin(20)
        .x_label_area_size(40)
        .y_label_area_size(70)
        .build_cartesian_2d(
            (x_min - x_margin)..(x_max + x_margin),
            (y_min - y_margin)..(y_max + y_margin),
        )
        .map_err(|e| SweepError::Other(e.to_string()))?;

    chart
        .configure_mesh()
        .x_desc("Lattice parameter (Å)")
        .y_desc("Total energy (eV)")
        .draw()
        .map_err(|e| SweepError::Other(e.to_string()))?;

    // 数据点
    chart
        .draw_series(
            points
                .iter()
                .map(|(x, y)| Circle::new((*x, *y), 5, RED.filled())),
        )
        .map_err(|e| SweepError::Other(e.to_string()))?
        .label("VASP")
        .legend(|(x, y)| Circle::new((x + 10, y), 5, RED.filled()));

    // 拟合曲线
    if let Some(p) = fit {
        let samples = 200;
        chart
            .draw_series(LineSeries::new(
                (0..=samples).map(|i| {
                    let a = x_min + (x_max - x_min) * i as f64 / samples as f64;
                    (a, p.eval(a))
                }),
                BLUE.stroke_width(2),
            ))
            .map_err(|e| SweepError::Other(e.to_string()))?
            .label("Parabolic fit")
            .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], BLUE.stroke_width(2)));
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperRight)
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()
        .map_err(|e| SweepError::Other(e.to_string()))?;

    root.present()
        .map_err(|e| SweepError::Other(e.to_string()))?;

    Ok(())
}
