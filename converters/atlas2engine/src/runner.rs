//! 程序运行函数.

use anyhow::{Context, Result};
use atlas_berry::{AtlasSource, Conversion};
use log::info;
use utils::loader;

use crate::result::ConversionResult;
use crate::Args;

/// 实际运行.
pub fn run(args: &Args) -> Result<ConversionResult> {
    let data_path = match &args.data_path {
        Some(p) => p.clone(),
        None => loader::data_path_from_env_or_home().with_context(|| {
            format!(
                "cannot determine the output root; pass --data-path or set ${}",
                loader::DATA_PATH_ENV
            )
        })?,
    };

    let atlas = loader::open_atlas(&args.atlas_name, args.atlas_root.as_deref())
        .with_context(|| format!("cannot open atlas `{}`", args.atlas_name))?;
    info!(
        "atlas `{}`: shape {:?}, resolution {:?}",
        atlas.name(),
        atlas.metadata().shape(),
        atlas.resolution()
    );

    let conversion = Conversion::new(&atlas, &data_path, args.options());
    let report = conversion
        .run()
        .with_context(|| format!("cannot write into {}", conversion.layout().root().display()))?;
    Ok(ConversionResult::new(atlas.name(), report))
}
