//! # 晶体结构数据模型
//!
//! 定义晶格、原子与晶体结构，提供分数/笛卡尔坐标变换与最短键长搜索。
//!
//! ## 依赖关系
//! - 被 `parsers/vasprun.rs` 和 `models/calculation.rs` 使用
//! - 无外部模块依赖

/// 晶格参数表示
#[derive(Debug, Clone, PartialEq)]
pub struct Lattice {
    /// 晶格向量矩阵 (3x3)，行向量表示 a, b, c
    /// [[a1, a2, a3], [b1, b2, b3], [c1, c2, c3]]
    pub matrix: [[f64; 3]; 3],
}

impl Lattice {
    /// 从晶格向量矩阵创建
    pub fn from_vectors(matrix: [[f64; 3]; 3]) -> Self {
        Lattice { matrix }
    }

    /// 立方晶格
    pub fn cubic(a: f64) -> Self {
        Lattice::from_vectors([[a, 0.0, 0.0], [0.0, a, 0.0], [0.0, 0.0, a]])
    }

    /// 计算晶格体积
    pub fn volume(&self) -> f64 {
        let a = self.matrix[0];
        let b = self.matrix[1];
        let c = self.matrix[2];

        // 行列式计算
        a[0] * (b[1] * c[2] - b[2] * c[1]) - a[1] * (b[0] * c[2] - b[2] * c[0])
            + a[2] * (b[0] * c[1] - b[1] * c[0])
    }

    /// 分数坐标转笛卡尔坐标
    pub fn to_cartesian(&self, frac: [f64; 3]) -> [f64; 3] {
        let m = self.matrix;
        [
            frac[0] * m[0][0] + frac[1] * m[1][0] + frac[2] * m[2][0],
            frac[0] * m[0][1] + frac[1] * m[1][1] + frac[2] * m[2][1],
            frac[0] * m[0][2] + frac[1] * m[1][2] + frac[2] * m[2][2],
        ]
    }
}

/// 原子信息
#[derive(Debug, Clone, PartialEq)]
pub struct Atom {
    /// 元素符号
    pub element: String,

    /// 分数坐标 [x, y, z]
    pub position: [f64; 3],
}

impl Atom {
    pub fn new(element: impl Into<String>, position: [f64; 3]) -> Self {
        Atom {
            element: element.into(),
            position,
        }
    }
}

/// 晶体结构
#[derive(Debug, Clone, PartialEq)]
pub struct Crystal {
    /// 晶格
    pub lattice: Lattice,

    /// 原子列表
    pub atoms: Vec<Atom>,
}

impl Crystal {
    pub fn new(lattice: Lattice, atoms: Vec<Atom>) -> Self {
        Crystal { lattice, atoms }
    }

    /// 计算化学式
    pub fn formula(&self) -> String {
        use std::collections::BTreeMap;
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();

        for atom in &self.atoms {
            *counts.entry(atom.element.as_str()).or_insert(0) += 1;
        }

        counts
            .into_iter()
            .map(|(el, count)| {
                if count == 1 {
                    el.to_string()
                } else {
                    format!("{}{}", el, count)
                }
            })
            .collect::<Vec<_>>()
            .join("")
    }

    /// 查找最短键长，返回 (距离, 原子 i, 原子 j)，i <= j
    ///
    /// 在 27 个相邻周期像中取最小值，包括原子与自身的周期像，
    /// 因此单原子晶胞也有定义。空晶胞返回 `None`。
    pub fn shortest_bond(&self) -> Option<(f64, usize, usize)> {
        let n = self.atoms.len();
        let mut best: Option<(f64, usize, usize)> = None;

        for i in 0..n {
            for j in i..n {
                let fi = self.atoms[i].position;
                let fj = self.atoms[j].position;
                let df = [fj[0] - fi[0], fj[1] - fi[1], fj[2] - fi[2]];

                for na in -1..=1 {
                    for nb in -1..=1 {
                        for nc in -1..=1 {
                            if i == j && na == 0 && nb == 0 && nc == 0 {
                                continue;
                            }
                            let shifted = [
                                df[0] + na as f64,
                                df[1] + nb as f64,
                                df[2] + nc as f64,
                            ];
                            let d = self.lattice.to_cartesian(shifted);
                            let dist = (d[0] * d[0] + d[1] * d[1] + d[2] * d[2]).sqrt();

                            if best.map_or(true, |(b, _, _)| dist < b) {
                                best = Some((dist, i, j));
                            }
                        }
                    }
                }
            }
        }

        best
    }
}
