//! Build-time optimization of emitted pages.
use std::collections::BTreeSet;

use eyre::{Result, WrapErr, bail};
use url::Url;

use crate::{
    core::{
        compilation::{Compilation, RunMode},
        pipeline::ResourcePipeline,
    },
    ports::file_system::{FileSystem, confine},
};

/// Fold the optimize phase over every page the graph says was emitted and
/// write each result back in place. Returns how many files were rewritten.
///
/// Pages whose artifact is missing from the output dir are skipped with a
/// warning; any optimizer failure aborts the run.
pub async fn optimize_output(
    compilation: &Compilation,
    pipeline: &ResourcePipeline,
    file_system: &dyn FileSystem,
) -> Result<usize> {
    if compilation.mode != RunMode::Build {
        bail!("Optimization only runs in build mode, not {}", compilation.mode);
    }

    let output_dir = &compilation.context.output_dir;
    let outputs: BTreeSet<&str> = compilation
        .graph
        .nodes()
        .iter()
        .map(|node| node.output_path.as_str())
        .filter(|path| !path.is_empty())
        .collect();

    let mut optimized = 0;
    for output_path in outputs {
        let file = confine(output_dir, output_path)
            .wrap_err_with(|| format!("Invalid output path {output_path}"))?;
        if !file_system.exists(&file).await {
            tracing::warn!("Skipping {}: not found in output dir", file.display());
            continue;
        }

        let url = Url::from_file_path(&file)
            .map_err(|()| eyre::eyre!("Cannot build file URL for {}", file.display()))?;
        let body = file_system
            .read_to_string(&file)
            .await
            .wrap_err_with(|| format!("Failed to read {}", file.display()))?;
        let result = pipeline.optimize(&url, body).await?;
        file_system
            .write(&file, &result)
            .await
            .wrap_err_with(|| format!("Failed to write {}", file.display()))?;

        tracing::debug!("Optimized {}", file.display());
        optimized += 1;
    }

    tracing::info!("Optimized {} output files", optimized);
    Ok(optimized)
}
