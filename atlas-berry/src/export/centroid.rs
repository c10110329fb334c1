//! 结构质心.
//!
//! 对每个结构分别计算双侧质心与左半球质心, 单位为物理距离
//! (体素索引 * 该轴分辨率). 输出列顺序为 ap, ml, dv,
//! 分别对应体数据的第 0, 2, 1 轴.

use std::io::{self, Write};
use std::iter;
use std::path::Path;

use log::{debug, info};

use super::{write_atomic, Outcome};
use crate::atlas::AtlasSource;
use crate::consts::{CENTROID_SENTINEL, ROOT_STRUCTURE};
use crate::data::StructureMask;
use crate::error::{AtlasError, ExportError, WithPath};

/// 质心表表头.
pub const CENTROID_HEADER: [&str; 7] = [
    "structure_name",
    "ap",
    "ml",
    "dv",
    "ap-lh",
    "ml-lh",
    "dv-lh",
];

/// 物理坐标.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Position {
    /// 前后 (anterior-posterior), 体数据第 0 轴.
    pub ap: f32,

    /// 内外侧 (medial-lateral), 体数据第 2 轴.
    pub ml: f32,

    /// 背腹 (dorsal-ventral), 体数据第 1 轴.
    pub dv: f32,
}

impl Position {
    /// 由按 (axis 0, axis 1, axis 2) 排列的平均体素索引和分辨率得到物理坐标.
    #[inline]
    pub fn from_mean_index(mean: [f64; 3], resolution: [f64; 3]) -> Self {
        Self {
            ap: (mean[0] * resolution[0]) as f32,
            ml: (mean[2] * resolution[2]) as f32,
            dv: (mean[1] * resolution[1]) as f32,
        }
    }
}

/// 一个结构的质心.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Centroid {
    /// 结构 (或其左半部分) 没有任何体素.
    Empty,

    /// 双侧与左半球质心.
    Located {
        /// 双侧质心.
        bilateral: Position,

        /// 左半球质心.
        left: Position,
    },
}

/// 质心表中的一行.
#[derive(Clone, Debug, PartialEq)]
pub struct CentroidRecord {
    /// 结构缩写.
    pub structure: String,

    /// 质心.
    pub centroid: Centroid,
}

impl CentroidRecord {
    /// 除结构名外的六个字段. 空结构每个字段都是占位值 `-1`,
    /// 否则保留三位小数.
    pub fn fields(&self) -> [String; 6] {
        match self.centroid {
            Centroid::Empty => std::array::from_fn(|_| CENTROID_SENTINEL.to_string()),
            Centroid::Located { bilateral: b, left: l } => {
                [b.ap, b.ml, b.dv, l.ap, l.ml, l.dv].map(|v| format!("{v:.3}"))
            }
        }
    }
}

/// 由结构掩码计算质心. 双侧与左半球任一为空时, 结果为 [`Centroid::Empty`].
pub fn centroid_of(mask: &StructureMask, resolution: [f64; 3]) -> Centroid {
    match (mask.mean_index(), mask.left_mean_index()) {
        (Some(full), Some(left)) => Centroid::Located {
            bilateral: Position::from_mean_index(full, resolution),
            left: Position::from_mean_index(left, resolution),
        },
        _ => Centroid::Empty,
    }
}

/// 依次计算 `root` 及其全部后代结构的质心. `root` 总在第一行.
pub fn compute_centroids<A: AtlasSource + ?Sized>(
    atlas: &A,
) -> Result<Vec<CentroidRecord>, AtlasError> {
    let tree = atlas.structures();
    let root = tree
        .get(ROOT_STRUCTURE)
        .ok_or_else(|| AtlasError::UnknownStructure(ROOT_STRUCTURE.to_owned()))?;
    let all: Vec<_> = iter::once(root).chain(tree.descendants(ROOT_STRUCTURE)?).collect();
    let resolution = atlas.resolution();

    let mut records = Vec::with_capacity(all.len());
    for (i, structure) in all.iter().enumerate() {
        let mask = atlas.structure_mask(structure.id)?;
        let centroid = centroid_of(&mask, resolution);
        debug!(
            "[{}/{}] `{}`: {:?}",
            i + 1,
            all.len(),
            structure.acronym,
            centroid
        );
        records.push(CentroidRecord {
            structure: structure.acronym.clone(),
            centroid,
        });
    }

    let empty = records
        .iter()
        .filter(|r| r.centroid == Centroid::Empty)
        .count();
    info!("computed {} centroids, {empty} empty", records.len());
    Ok(records)
}

/// 以 CSV 格式写出质心表.
pub fn write_centroid_table<W: Write>(records: &[CentroidRecord], mut w: W) -> io::Result<()> {
    writeln!(w, "{}", CENTROID_HEADER.join(","))?;
    for r in records {
        writeln!(w, "{},{}", csv_field(&r.structure), r.fields().join(","))?;
    }
    w.flush()
}

/// 计算并写出 `mesh_centers.csv`. 文件已存在时整体跳过, 不做任何计算.
pub fn write_centroids<A: AtlasSource + ?Sized, P: AsRef<Path>>(
    atlas: &A,
    path: P,
) -> Result<Outcome, ExportError> {
    let path = path.as_ref();
    if path.exists() {
        info!("{} exists, skipping", path.display());
        return Ok(Outcome::Skipped);
    }
    let records = compute_centroids(atlas)?;
    let mut buf = Vec::with_capacity(64 * (records.len() + 1));
    write_centroid_table(&records, &mut buf).with_path(path)?;
    write_atomic(path, &buf)?;
    info!("wrote {}", path.display());
    Ok(Outcome::Done)
}

/// 含有逗号, 引号或换行的字段加引号, 内部引号写两次.
fn csv_field(s: &str) -> String {
    if s.contains(|c: char| matches!(c, ',' | '"' | '\n' | '\r')) {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atlas::fixture::open_atlas;
    use crate::data::StructureMask;
    use ndarray::Array3;
    use std::fs;

    #[test]
    fn test_sentinel_when_left_empty() {
        let mut data = Array3::from_elem((2, 2, 4), false);
        data[(1, 1, 3)] = true;
        let c = centroid_of(&StructureMask::new(data), [1.0; 3]);
        assert_eq!(c, Centroid::Empty);

        let r = CentroidRecord {
            structure: "X".into(),
            centroid: c,
        };
        assert_eq!(r.fields().join(","), "-1,-1,-1,-1,-1,-1");
    }

    #[test]
    fn test_axis_permutation_and_units() {
        let mut data = Array3::from_elem((4, 4, 4), false);
        data[(1, 2, 0)] = true;
        let c = centroid_of(&StructureMask::new(data), [10.0, 20.0, 30.0]);
        let expected = Position {
            ap: 10.0,
            ml: 0.0,
            dv: 40.0,
        };
        assert_eq!(
            c,
            Centroid::Located {
                bilateral: expected,
                left: expected
            }
        );
    }

    #[test]
    fn test_fields_three_decimals() {
        let p = Position {
            ap: 1.0 / 3.0,
            ml: 2.0,
            dv: 1234.5678,
        };
        let r = CentroidRecord {
            structure: "A".into(),
            centroid: Centroid::Located {
                bilateral: p,
                left: p,
            },
        };
        assert_eq!(
            r.fields(),
            ["0.333", "2.000", "1234.568", "0.333", "2.000", "1234.568"].map(String::from)
        );
    }

    #[test]
    fn test_fixture_atlas() {
        let dir = tempfile::tempdir().unwrap();
        let atlas = open_atlas(dir.path());
        let records = compute_centroids(&atlas).unwrap();

        let names: Vec<_> = records.iter().map(|r| r.structure.as_str()).collect();
        assert_eq!(names, vec!["root", "A", "B", "C"]);

        // A 只在左半球: 双侧质心与左半球质心相同.
        // 体素 (1, 1, 0), (3, 2, 2), 分辨率 (10, 20, 25).
        let Centroid::Located { bilateral, left } = records[1].centroid else {
            panic!("A should not be empty");
        };
        assert_eq!(bilateral, left);
        assert_eq!(
            bilateral,
            Position {
                ap: 20.0,
                ml: 25.0,
                dv: 30.0
            }
        );

        // root 两侧都有体素.
        assert_ne!(records[0].centroid, Centroid::Empty);
        // B 只在右半球, C 没有体素.
        assert_eq!(records[2].centroid, Centroid::Empty);
        assert_eq!(records[3].centroid, Centroid::Empty);
    }

    #[test]
    fn test_write_centroids_once() {
        let dir = tempfile::tempdir().unwrap();
        let atlas = open_atlas(&dir.path().join("atlas"));
        let path = dir.path().join("mesh_centers.csv");

        assert_eq!(write_centroids(&atlas, &path).unwrap(), Outcome::Done);
        let text = fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines[0], "structure_name,ap,ml,dv,ap-lh,ml-lh,dv-lh");
        assert_eq!(lines[2], "A,20.000,25.000,30.000,20.000,25.000,30.000");
        assert_eq!(lines[4], "C,-1,-1,-1,-1,-1,-1");
        assert_eq!(lines.len(), 5);

        fs::write(&path, "already here").unwrap();
        assert_eq!(write_centroids(&atlas, &path).unwrap(), Outcome::Skipped);
        assert_eq!(fs::read_to_string(&path).unwrap(), "already here");
    }

    #[test]
    fn test_csv_field_quoting() {
        assert_eq!(csv_field("CA1"), "CA1");
        assert_eq!(csv_field("a,b"), "\"a,b\"");
        assert_eq!(csv_field("say \"hi\""), "\"say \"\"hi\"\"\"");
    }
}
