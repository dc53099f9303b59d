//! Resolution of the bundled domain and problem files

use std::path::{Path, PathBuf};

use tracing::debug;

/// Directory holding the bundled PDDL files, relative to the install location
pub const PDDL_DIR: &str = "pddl";

pub const DEFAULT_DOMAIN_FILE: &str = "pick_place_domain.pddl";

pub const DEFAULT_PROBLEM_FILE: &str = "pick_place_problem_01.pddl";

/// Default domain file
pub fn default_domain_path() -> PathBuf {
    resolve_bundled(DEFAULT_DOMAIN_FILE)
}

/// Default problem file
pub fn default_problem_path() -> PathBuf {
    resolve_bundled(DEFAULT_PROBLEM_FILE)
}

/// Locate a bundled file
///
/// Candidates are the executable's directory, the crate source directory and
/// the working directory. The first existing one wins; otherwise the
/// executable-relative path is returned without further checks.
pub fn resolve_bundled(file_name: &str) -> PathBuf {
    let candidates = candidate_dirs();
    resolve_in(&candidates, file_name)
}

fn candidate_dirs() -> Vec<PathBuf> {
    let mut dirs = Vec::new();
    if let Some(exe_dir) = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
    {
        dirs.push(exe_dir);
    }
    dirs.push(PathBuf::from(env!("CARGO_MANIFEST_DIR")));
    if let Ok(cwd) = std::env::current_dir() {
        dirs.push(cwd);
    }
    dirs
}

fn resolve_in(base_dirs: &[PathBuf], file_name: &str) -> PathBuf {
    for base in base_dirs {
        let candidate = base.join(PDDL_DIR).join(file_name);
        if candidate.exists() {
            debug!(?candidate, "resolve_bundled: found");
            return candidate;
        }
    }

    let fallback = base_dirs
        .first()
        .cloned()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(PDDL_DIR)
        .join(file_name);
    debug!(?fallback, "resolve_bundled: no candidate exists, using fallback");
    fallback
}
