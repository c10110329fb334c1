//! 将 BrainGlobe 图谱转换为实时 3D 前端可直接加载的资源包.

use std::path::PathBuf;
use std::process::ExitCode;

use atlas_berry::ConvertOptions;
use clap::{ArgAction, Parser};
use log::{error, LevelFilter};
use simple_logger::SimpleLogger;

mod result;
mod runner;

/// 命令行参数.
#[derive(Parser, Debug)]
#[command(name = "atlas2engine", version)]
#[command(about = "Convert a BrainGlobe atlas into an engine-ready asset bundle")]
pub struct Args {
    /// Atlas name, e.g. `allen_mouse_25um`
    atlas_name: String,

    /// Atlas directory (default: newest `~/.brainglobe/<ATLAS_NAME>_v*`)
    #[arg(long)]
    atlas_root: Option<PathBuf>,

    /// Output root (default: `$ATLAS_DATA_PATH`, then `$HOME/dataset/atlas`)
    #[arg(long)]
    data_path: Option<PathBuf>,

    /// Do not recalculate mesh normals
    #[arg(long)]
    no_normals: bool,

    /// Apply Laplacian smoothing to meshes
    #[arg(long)]
    smoothing: bool,

    /// Skip reference.bytes and annotation.bytes
    #[arg(long)]
    skip_volumes: bool,

    /// Skip mesh_centers.csv
    #[arg(long)]
    skip_centroids: bool,

    /// Skip meta.json and structures.json
    #[arg(long)]
    skip_meta: bool,

    /// Skip the mesh pipeline
    #[arg(long)]
    skip_meshes: bool,

    /// Keep intermediate files in the mesh folder
    #[arg(long)]
    no_cleanup: bool,

    /// More logging (-v debug, -vv trace); `RUST_LOG` overrides
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

impl Args {
    /// 转换选项.
    pub fn options(&self) -> ConvertOptions {
        ConvertOptions {
            volumes: !self.skip_volumes,
            centroids: !self.skip_centroids,
            meta: !self.skip_meta,
            meshes: !self.skip_meshes,
            normals: !self.no_normals,
            smoothing: self.smoothing,
            cleanup: !self.no_cleanup,
        }
    }

    fn level(&self) -> LevelFilter {
        match self.verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }
}

fn main() -> ExitCode {
    let args = Args::parse();
    if let Err(e) = SimpleLogger::new().with_level(args.level()).env().init() {
        eprintln!("cannot install logger: {e}");
    }

    match runner::run(&args) {
        Ok(result) => {
            result.analyze();
            if result.is_success() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Args;
    use clap::{CommandFactory, Parser};

    #[test]
    fn test_cli_definition() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_flags_to_options() {
        let args = Args::parse_from(["atlas2engine", "allen_mouse_25um"]);
        let o = args.options();
        assert!(o.volumes && o.centroids && o.meta && o.meshes && o.normals && o.cleanup);
        assert!(!o.smoothing);
        assert_eq!(args.level(), log::LevelFilter::Info);

        let args = Args::parse_from([
            "atlas2engine",
            "allen_mouse_25um",
            "--no-normals",
            "--smoothing",
            "--skip-volumes",
            "--no-cleanup",
            "-vv",
        ]);
        let o = args.options();
        assert!(!o.normals && o.smoothing && !o.volumes && !o.cleanup);
        assert!(o.centroids && o.meshes);
        assert_eq!(args.level(), log::LevelFilter::Trace);
    }
}
