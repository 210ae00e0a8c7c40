//! # VASP vasprun.xml 解析器
//!
//! 按行扫描 vasprun.xml，提取 k 点数、元素列表以及每个离子步
//! (`<calculation>`) 的结构、受力、应力、能量与耗时。
//!
//! ## vasprun.xml 片段
//! ```text
//! <kpoints>
//!  <varray name="kpointlist" >
//!   <v>  0.0 0.0 0.0 </v>
//! </kpoints>
//! <calculation>
//!  <scstep> ... <i name="e_fr_energy"> ... </scstep>
//!  <structure> <varray name="basis" > / <varray name="positions" > </structure>
//!  <varray name="forces" >
//!  <varray name="stress" >
//!  <energy> <i name="e_fr_energy">  -10.84 </i> </energy>
//!  <time name="totalsc">  4.79  5.02</time>
//! </calculation>
//! </modeling>
//! ```
//!
//! ## 依赖关系
//! - 被 `sweep/summary.rs` 使用
//! - 使用 `models/`
//! - 使用 `regex` crate

use super::RunOutput;
use crate::error::{Result, SweepError};
use crate::models::{Atom, Crystal, IonicStep, Lattice};

use regex::Regex;
use std::fs;
use std::path::Path;

/// 解析后的 vasprun.xml
#[derive(Debug, Clone)]
pub struct Vasprun {
    /// 按离子顺序的元素符号
    pub species: Vec<String>,
    /// 不可约 k 点数
    pub num_kpoints: usize,
    /// 离子步列表
    pub ionic_steps: Vec<IonicStep>,
}

impl RunOutput for Vasprun {
    fn final_step(&self) -> Option<&IonicStep> {
        self.ionic_steps.last()
    }

    fn num_kpoints(&self) -> usize {
        self.num_kpoints
    }

    fn time_spent(&self) -> (f64, f64) {
        self.ionic_steps
            .iter()
            .fold((0.0, 0.0), |(cpu, wall), s| (cpu + s.cpu_time, wall + s.wall_time))
    }
}

/// 需要读取的数值 varray，其余（如 selective 的 T/F）整块跳过
const NUMERIC_VARRAYS: [&str; 5] = ["kpointlist", "basis", "positions", "forces", "stress"];

/// 当前 `<calculation>` 中累积的数据
#[derive(Default)]
struct CalculationBuilder {
    basis: Option<[[f64; 3]; 3]>,
    positions: Option<Vec<[f64; 3]>>,
    forces: Option<Vec<[f64; 3]>>,
    stress: Option<[[f64; 3]; 3]>,
    energy: Option<f64>,
    time: Option<(f64, f64)>,
}

struct Patterns {
    varray_start: Regex,
    row: Regex,
    atoms_start: Regex,
    atom_row: Regex,
    energy: Regex,
    totalsc: Regex,
}

impl Patterns {
    fn new() -> Self {
        // 模式均为常量
        Patterns {
            varray_start: Regex::new(r#"<varray\b[^>]*\bname="(\w+)""#).unwrap(),
            row: Regex::new(r"<v[^>]*>([^<]*)</v>").unwrap(),
            atoms_start: Regex::new(r#"<array\s+name="atoms""#).unwrap(),
            atom_row: Regex::new(r"<rc>\s*<c>\s*([A-Za-z]+)\s*</c>").unwrap(),
            energy: Regex::new(r#"<i\s+name="e_fr_energy"\s*>\s*(\S+)\s*</i>"#).unwrap(),
            totalsc: Regex::new(r#"<time\s+name="totalsc"\s*>\s*(\S+)\s+(\S+)\s*</time>"#)
                .unwrap(),
        }
    }
}

/// 解析 vasprun.xml 文件
///
/// 任何失败（文件不存在、文件不完整、数值格式错误）都归为
/// `SweepError::OutputUnparsable`。
pub fn parse_vasprun(path: &Path) -> Result<Vasprun> {
    let label = path.display().to_string();
    let content = fs::read_to_string(path).map_err(|e| SweepError::OutputUnparsable {
        path: label.clone(),
        reason: e.to_string(),
    })?;

    parse_vasprun_content(&content, &label)
}

/// 从字符串内容解析 vasprun.xml
pub fn parse_vasprun_content(content: &str, label: &str) -> Result<Vasprun> {
    let unparsable = |reason: String| SweepError::OutputUnparsable {
        path: label.to_string(),
        reason,
    };

    let patterns = Patterns::new();

    let mut species: Vec<String> = Vec::new();
    let mut num_kpoints: Option<usize> = None;
    let mut ionic_steps: Vec<IonicStep> = Vec::new();

    let mut calc: Option<CalculationBuilder> = None;
    let mut varray: Option<(String, Vec<Vec<f64>>)> = None;
    let mut in_atoms = false;
    let mut complete = false;

    for (lineno, line) in content.lines().enumerate() {
        let trimmed = line.trim();

        // varray 行优先处理
        if varray.is_some() {
            if trimmed.starts_with("</varray>") {
                let (name, rows) = varray.take().unwrap_or_default();
                match (name.as_str(), calc.as_mut()) {
                    ("kpointlist", None) => num_kpoints = Some(rows.len()),
                    ("basis", Some(c)) => c.basis = Some(to_matrix(&rows).map_err(&unparsable)?),
                    ("positions", Some(c)) => {
                        c.positions = Some(to_vectors(&rows).map_err(&unparsable)?)
                    }
                    ("forces", Some(c)) => c.forces = Some(to_vectors(&rows).map_err(&unparsable)?),
                    ("stress", Some(c)) => c.stress = Some(to_matrix(&rows).map_err(&unparsable)?),
                    _ => {}
                }
                continue;
            }

            let wanted = varray
                .as_ref()
                .is_some_and(|(name, _)| NUMERIC_VARRAYS.contains(&name.as_str()));
            if !wanted {
                continue;
            }

            if let Some(caps) = patterns.row.captures(trimmed) {
                let values: std::result::Result<Vec<f64>, _> = caps[1]
                    .split_whitespace()
                    .map(|s| s.parse::<f64>())
                    .collect();
                let values = values.map_err(|_| {
                    unparsable(format!("Malformed vector at line {}", lineno + 1))
                })?;
                if let Some((_, rows)) = varray.as_mut() {
                    rows.push(values);
                }
            }
            continue;
        }

        if let Some(caps) = patterns.varray_start.captures(trimmed) {
            varray = Some((caps[1].to_string(), Vec::new()));
            continue;
        }

        if patterns.atoms_start.is_match(trimmed) {
            in_atoms = true;
            continue;
        }

        if in_atoms {
            if trimmed.starts_with("</array>") {
                in_atoms = false;
            } else if let Some(caps) = patterns.atom_row.captures(trimmed) {
                species.push(caps[1].to_string());
            }
            continue;
        }

        if trimmed.starts_with("<calculation>") {
            calc = Some(CalculationBuilder::default());
            continue;
        }

        if trimmed.starts_with("</calculation>") {
            if let Some(c) = calc.take() {
                ionic_steps.push(finish_step(c, &species).map_err(&unparsable)?);
            }
            continue;
        }

        if let Some(c) = calc.as_mut() {
            // scstep 中也有 e_fr_energy，保留最后一个即离子步能量
            if let Some(caps) = patterns.energy.captures(trimmed) {
                let e = caps[1].parse::<f64>().map_err(|_| {
                    unparsable(format!("Malformed energy at line {}", lineno + 1))
                })?;
                c.energy = Some(e);
                continue;
            }

            if let Some(caps) = patterns.totalsc.captures(trimmed) {
                let cpu = caps[1].parse::<f64>();
                let wall = caps[2].parse::<f64>();
                match (cpu, wall) {
                    (Ok(cpu), Ok(wall)) => c.time = Some((cpu, wall)),
                    _ => {
                        return Err(unparsable(format!(
                            "Malformed timing at line {}",
                            lineno + 1
                        )))
                    }
                }
                continue;
            }
        }

        if trimmed.starts_with("</modeling>") {
            complete = true;
        }
    }

    if !complete {
        return Err(unparsable("File is incomplete (missing </modeling>)".to_string()));
    }

    if ionic_steps.is_empty() {
        return Err(unparsable("No ionic steps found".to_string()));
    }

    let num_kpoints = num_kpoints.ok_or_else(|| unparsable("No k-point list found".to_string()))?;

    Ok(Vasprun {
        species,
        num_kpoints,
        ionic_steps,
    })
}

/// 由累积的数据构造离子步
fn finish_step(c: CalculationBuilder, species: &[String]) -> std::result::Result<IonicStep, String> {
    let basis = c.basis.ok_or("Ionic step without lattice basis")?;
    let positions = c.positions.ok_or("Ionic step without positions")?;
    let total_energy = c.energy.ok_or("Ionic step without energy")?;
    let forces = c.forces.ok_or("Ionic step without forces")?;
    let (cpu_time, wall_time) = c.time.ok_or("Ionic step without totalsc timing")?;

    if !species.is_empty() && species.len() != positions.len() {
        return Err(format!(
            "{} positions for {} atoms",
            positions.len(),
            species.len()
        ));
    }

    if forces.len() != positions.len() {
        return Err(format!(
            "{} forces for {} atoms",
            forces.len(),
            positions.len()
        ));
    }

    let atoms = positions
        .into_iter()
        .enumerate()
        .map(|(i, p)| {
            let element = species.get(i).map(String::as_str).unwrap_or("X");
            Atom::new(element, p)
        })
        .collect();

    Ok(IonicStep {
        structure: Crystal::new(Lattice::from_vectors(basis), atoms),
        forces,
        stress: c.stress,
        total_energy,
        cpu_time,
        wall_time,
    })
}

fn to_vectors(rows: &[Vec<f64>]) -> std::result::Result<Vec<[f64; 3]>, String> {
    rows.iter()
        .map(|r| {
            if r.len() < 3 {
                Err(format!("Expected 3 components, found {}", r.len()))
            } else {
                Ok([r[0], r[1], r[2]])
            }
        })
        .collect()
}

fn to_matrix(rows: &[Vec<f64>]) -> std::result::Result<[[f64; 3]; 3], String> {
    let vectors = to_vectors(rows)?;
    if vectors.len() != 3 {
        return Err(format!("Expected 3x3 matrix, found {} rows", vectors.len()));
    }
    Ok([vectors[0], vectors[1], vectors[2]])
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// 两个离子步的金刚石 Si 算例（第二步为最终步）
    pub(crate) const SI_VASPRUN: &str = r#"<?xml version="1.0" encoding="ISO-8859-1"?>
<modeling>
 <generator>
  <i name="program" type="string">vasp </i>
  <i name="version" type="string">5.2.12  </i>
 </generator>
 <kpoints>
  <varray name="kpointlist" >
   <v>       0.00000000       0.00000000       0.00000000 </v>
   <v>       0.25000000       0.00000000       0.00000000 </v>
   <v>       0.25000000       0.25000000       0.00000000 </v>
  </varray>
  <varray name="weights" >
   <v>       0.12500000 </v>
   <v>       0.50000000 </v>
   <v>       0.37500000 </v>
  </varray>
 </kpoints>
 <parameters>
  <i name="PREC" type="string">accurate</i>
 </parameters>
 <atominfo>
  <atoms>       2 </atoms>
  <types>       1 </types>
  <array name="atoms" >
   <dimension dim="1">ion</dimension>
   <field type="string">element</field>
   <field type="int">atomtype</field>
   <set>
    <rc><c>Si</c><c>   1</c></rc>
    <rc><c>Si</c><c>   1</c></rc>
   </set>
  </array>
  <array name="atomtypes" >
   <set>
    <rc><c>   2</c><c>Si</c><c>     28.08500000</c></rc>
   </set>
  </array>
 </atominfo>
 <structure name="initialpos" >
  <crystal>
   <varray name="basis" >
    <v>       5.00000000       0.00000000       0.00000000 </v>
    <v>       0.00000000       5.00000000       0.00000000 </v>
    <v>       0.00000000       0.00000000       5.00000000 </v>
   </varray>
  </crystal>
  <varray name="positions" >
   <v>       0.00000000       0.00000000       0.00000000 </v>
   <v>       0.25000000       0.25000000       0.25000000 </v>
  </varray>
 </structure>
 <calculation>
  <scstep>
   <time name="total">    1.00    1.10</time>
   <energy>
    <i name="e_fr_energy">     -9.00000000 </i>
   </energy>
  </scstep>
  <structure>
   <crystal>
    <varray name="basis" >
     <v>       5.40000000       0.00000000       0.00000000 </v>
     <v>       0.00000000       5.40000000       0.00000000 </v>
     <v>       0.00000000       0.00000000       5.40000000 </v>
    </varray>
    <varray name="rec_basis" >
     <v>       0.18518519       0.00000000       0.00000000 </v>
     <v>       0.00000000       0.18518519       0.00000000 </v>
     <v>       0.00000000       0.00000000       0.18518519 </v>
    </varray>
   </crystal>
   <varray name="positions" >
    <v>       0.00000000       0.00000000       0.00000000 </v>
    <v>       0.25000000       0.25000000       0.25000000 </v>
   </varray>
  </structure>
  <varray name="forces" >
   <v>       0.10000000      -0.20000000       0.30000000 </v>
   <v>      -0.10000000       0.20000000      -0.30000000 </v>
  </varray>
  <varray name="stress" >
   <v>       9.00000000       0.00000000       0.00000000 </v>
   <v>       0.00000000       9.00000000       0.00000000 </v>
   <v>       0.00000000       0.00000000       9.00000000 </v>
  </varray>
  <energy>
   <i name="e_fr_energy">    -10.50000000 </i>
   <i name="e_wo_entrp">    -10.50000000 </i>
  </energy>
  <time name="totalsc">   10.20   11.00</time>
 </calculation>
 <calculation>
  <scstep>
   <energy>
    <i name="e_fr_energy">    -10.70000000 </i>
   </energy>
  </scstep>
  <structure>
   <crystal>
    <varray name="basis" >
     <v>       5.40000000       0.00000000       0.00000000 </v>
     <v>       0.00000000       5.40000000       0.00000000 </v>
     <v>       0.00000000       0.00000000       5.40000000 </v>
    </varray>
   </crystal>
   <varray name="positions" >
    <v>       0.00000000       0.00000000       0.00000000 </v>
    <v>       0.24000000       0.25000000       0.25000000 </v>
   </varray>
  </structure>
  <varray name="forces" >
   <v>       0.01000000       0.02000000      -0.50000000 </v>
   <v>       0.03000000      -0.02000000       0.40000000 </v>
  </varray>
  <varray name="stress" >
   <v>      -4.50000000       0.00000000       0.00000000 </v>
   <v>       0.00000000      -4.50000000       0.00000000 </v>
   <v>       0.00000000       0.00000000      -4.50000000 </v>
  </varray>
  <energy>
   <i name="e_fr_energy">    -10.84123456 </i>
  </energy>
  <time name="totalsc">   20.40   21.00</time>
 </calculation>
</modeling>
"#;

    #[test]
    fn test_parse_two_ionic_steps() {
        let run = parse_vasprun_content(SI_VASPRUN, "vasprun.xml").unwrap();
        assert_eq!(run.species, vec!["Si", "Si"]);
        assert_eq!(run.num_kpoints(), 3);
        assert_eq!(run.ionic_steps.len(), 2);

        let last = run.final_step().unwrap();
        assert!((last.total_energy - (-10.84123456)).abs() < 1e-12);
        assert_eq!(last.structure.atoms.len(), 2);
        assert_eq!(last.structure.atoms[1].position, [0.24, 0.25, 0.25]);
        assert!((last.pressure().unwrap() + 4.5).abs() < 1e-12);
    }

    #[test]
    fn test_ionic_energy_not_scf_energy() {
        let run = parse_vasprun_content(SI_VASPRUN, "vasprun.xml").unwrap();
        assert!((run.ionic_steps[0].total_energy - (-10.5)).abs() < 1e-12);
    }

    #[test]
    fn test_initial_structure_ignored() {
        let run = parse_vasprun_content(SI_VASPRUN, "vasprun.xml").unwrap();
        let volume = run.ionic_steps[0].structure.lattice.volume();
        assert!((volume - 5.4f64.powi(3)).abs() < 1e-9);
    }

    #[test]
    fn test_time_spent_accumulates() {
        let run = parse_vasprun_content(SI_VASPRUN, "vasprun.xml").unwrap();
        let (cpu, wall) = run.time_spent();
        assert!((cpu - 30.6).abs() < 1e-9);
        assert!((wall - 32.0).abs() < 1e-9);
    }

    #[test]
    fn test_truncated_file_is_unparsable() {
        let cut = SI_VASPRUN.find(" <calculation>").unwrap();
        let err = parse_vasprun_content(&SI_VASPRUN[..cut + 200], "vasprun.xml").unwrap_err();
        assert!(matches!(err, SweepError::OutputUnparsable { .. }));
    }

    #[test]
    fn test_no_ionic_steps_is_unparsable() {
        let content = "<?xml version=\"1.0\"?>\n<modeling>\n</modeling>\n";
        let err = parse_vasprun_content(content, "vasprun.xml").unwrap_err();
        assert!(matches!(err, SweepError::OutputUnparsable { .. }));
    }

    #[test]
    fn test_overflowed_number_is_unparsable() {
        let broken = SI_VASPRUN.replace("0.03000000      -0.02000000", "********      -0.02000000");
        let err = parse_vasprun_content(&broken, "vasprun.xml").unwrap_err();
        assert!(matches!(err, SweepError::OutputUnparsable { .. }));
    }

    #[test]
    fn test_selective_dynamics_is_skipped() {
        let block = r#"   <varray name="positions" >
    <v>       0.00000000       0.00000000       0.00000000 </v>
    <v>       0.24000000       0.25000000       0.25000000 </v>
   </varray>
"#;
        let selective = format!(
            "{}{}",
            block,
            r#"   <varray type="logical" name="selective" >
    <v type="logical" >  T  T  T </v>
    <v type="logical" >  F  T  T </v>
   </varray>
   <varray name="selective" type="logical" >
    <v type="logical" >  T  T  T </v>
    <v type="logical" >  F  F  F </v>
   </varray>
"#
        );
        assert!(SI_VASPRUN.contains(block));
        let content = SI_VASPRUN.replace(block, &selective);

        let run = parse_vasprun_content(&content, "vasprun.xml").unwrap();
        let last = run.final_step().unwrap();
        assert_eq!(last.structure.atoms[1].position, [0.24, 0.25, 0.25]);
        assert_eq!(last.forces[0], [0.01, 0.02, -0.5]);
    }

    #[test]
    fn test_missing_forces_is_unparsable() {
        let start = SI_VASPRUN.rfind("  <varray name=\"forces\" >").unwrap();
        let end = start + SI_VASPRUN[start..].find("</varray>\n").unwrap() + "</varray>\n".len();
        let content = format!("{}{}", &SI_VASPRUN[..start], &SI_VASPRUN[end..]);

        let err = parse_vasprun_content(&content, "vasprun.xml").unwrap_err();
        assert!(
            matches!(err, SweepError::OutputUnparsable { ref reason, .. } if reason.contains("forces"))
        );
    }

    #[test]
    fn test_missing_kpoints_is_unparsable() {
        let content = SI_VASPRUN.replace("name=\"kpointlist\"", "name=\"kpointlist_unused\"");
        let err = parse_vasprun_content(&content, "vasprun.xml").unwrap_err();
        assert!(
            matches!(err, SweepError::OutputUnparsable { ref reason, .. } if reason.contains("k-point"))
        );
    }

    #[test]
    fn test_missing_file_is_unparsable() {
        let err = parse_vasprun(Path::new("/nonexistent/vasprun.xml.1")).unwrap_err();
        assert!(matches!(err, SweepError::OutputUnparsable { .. }));
    }
}
