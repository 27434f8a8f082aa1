//! CLI command implementations.

mod check;
mod outline;
mod refs;

use std::fs::read_to_string;
use std::path::Path;

use buildout::parser::{parse, Parse};
use miette::{miette, IntoDiagnostic, Result};

pub use check::{run_check, CheckArgs};
pub use outline::{run_outline, OutlineArgs};
pub use refs::{run_refs, RefsArgs};

/// Reads and parses one profile.
fn load_profile(path: &Path) -> Result<(String, Parse)> {
    let content = read_to_string(path)
        .into_diagnostic()
        .map_err(|e| miette!("Failed to read profile {}: {}", path.display(), e))?;
    log::debug!("parsing {} ({} bytes)", path.display(), content.len());
    let parsed = parse(&content);
    Ok((content, parsed))
}

#[cfg(test)]
mod test_support {
    use std::fs::write;
    use std::path::PathBuf;

    use tempfile::TempDir;

    /// Writes `content` to a profile file inside a fresh temporary directory.
    pub fn profile(content: &str) -> (TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("buildout.cfg");
        write(&path, content).unwrap();
        (dir, path)
    }
}
