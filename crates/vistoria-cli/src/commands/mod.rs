pub mod check;
pub mod completion;
pub mod list;
pub mod run;
pub mod serve;

use std::path::{Path, PathBuf};

/// Expand scenario arguments: files are taken as-is, directories are
/// searched for `*.json`.
pub fn discover_scenarios(paths: &[PathBuf]) -> anyhow::Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    for path in paths {
        if path.is_dir() {
            found.extend(scenarios_in_dir(path)?);
        } else {
            found.push(path.clone());
        }
    }
    Ok(found)
}

pub fn scenarios_in_dir(dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let pattern = dir.join("*.json");
    let pattern = pattern
        .to_str()
        .ok_or_else(|| anyhow::anyhow!("non-UTF-8 path: {}", dir.display()))?;

    let mut files: Vec<PathBuf> = glob::glob(pattern)?
        .filter_map(std::result::Result::ok)
        .collect();
    files.sort();
    Ok(files)
}
