//! 转换结果.

use atlas_berry::convert::Step;
use atlas_berry::pipeline::StageReport;
use atlas_berry::ConversionReport;
use std::io::{self, Write};

const S4: &str = "    ";

fn steps_to_display(steps: &[Step]) -> String {
    if steps.is_empty() {
        "/".to_string()
    } else {
        steps.iter().map(Step::to_string).collect::<Vec<_>>().join(", ")
    }
}

/// 将一个网格阶段的结果写进 `w` 中.
fn describe_stage_into<W: Write>(stage: &str, r: &StageReport, w: &mut W) -> io::Result<()> {
    writeln!(
        w,
        "{S4}{stage}: {} done, {} skipped, {} failed",
        r.done.len(),
        r.skipped.len(),
        r.failed.len()
    )?;
    for f in r.failed.iter() {
        writeln!(w, "{S4}{S4}`{}`: {}", f.structure, f.error)?;
    }
    Ok(())
}

/// 一次转换的最终结果.
pub struct ConversionResult {
    name: String,
    report: ConversionReport,
}

impl ConversionResult {
    pub fn new(name: &str, report: ConversionReport) -> Self {
        Self {
            name: name.to_owned(),
            report,
        }
    }

    /// 没有任何步骤或网格失败.
    #[inline]
    pub fn is_success(&self) -> bool {
        self.report.is_success()
    }

    /// 将结果写进 `w` 中.
    pub fn describe_into<W: Write>(&self, w: &mut W) -> io::Result<()> {
        let r = &self.report;
        writeln!(w, "Atlas `{}`:", self.name)?;
        writeln!(w, "{S4}Done: {}", steps_to_display(&r.done))?;
        writeln!(w, "{S4}Skipped (already present): {}", steps_to_display(&r.skipped))?;
        for (step, e) in r.failed.iter() {
            writeln!(w, "{S4}Failed `{step}`: {e}")?;
        }
        if let Some(m) = r.meshes.as_ref() {
            writeln!(w, "Meshes:")?;
            describe_stage_into("copy", &m.copy, w)?;
            describe_stage_into("repair", &m.repair, w)?;
            describe_stage_into("bisect", &m.bisect, w)?;
            describe_stage_into("cleanup", &m.cleanup, w)?;
        }
        write!(
            w,
            "Result: {}",
            if self.is_success() { "ok" } else { "FAILED" }
        )
    }

    /// 打印结果.
    pub fn analyze(&self) {
        utils::sep();
        let mut buf = Vec::with_capacity(512);
        match self.describe_into(&mut buf) {
            Ok(()) => println!("{}", String::from_utf8_lossy(&buf)),
            Err(e) => eprintln!("cannot describe the result: {e}"),
        }
        utils::sep();
    }
}

#[cfg(test)]
mod tests {
    use super::ConversionResult;
    use atlas_berry::convert::Step;
    use atlas_berry::error::ExportError;
    use atlas_berry::pipeline::{AssetFailure, PipelineReport, StageReport};
    use atlas_berry::{ConversionReport, MeshError};

    #[test]
    fn test_describe_failures() {
        let report = ConversionReport {
            done: vec![Step::Meta, Step::Reference],
            skipped: vec![Step::Annotation],
            failed: vec![(Step::Structures, ExportError::MissingPath("structures.json".into()))],
            meshes: Some(PipelineReport {
                bisect: StageReport {
                    done: vec!["500".into()],
                    failed: vec![AssetFailure {
                        structure: "600".into(),
                        error: MeshError::Empty("600.obj".into()),
                    }],
                    ..Default::default()
                },
                ..Default::default()
            }),
        };
        let result = ConversionResult::new("tiny", report);
        assert!(!result.is_success());

        let mut buf = Vec::new();
        result.describe_into(&mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("Done: meta, reference"));
        assert!(text.contains("Skipped (already present): annotation"));
        assert!(text.contains("Failed `structures`"));
        assert!(text.contains("bisect: 1 done, 0 skipped, 1 failed"));
        assert!(text.contains("`600`: `600.obj` contains no faces"));
        assert!(text.ends_with("Result: FAILED"));
    }

    #[test]
    fn test_describe_success() {
        let result = ConversionResult::new("tiny", ConversionReport::default());
        assert!(result.is_success());
        let mut buf = Vec::new();
        result.describe_into(&mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("Done: /"));
        assert!(!text.contains("Meshes:"));
    }
}
