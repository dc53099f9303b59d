//! Socket listener helpers for the service side

use std::io;
use std::os::unix::net::UnixStream as StdUnixStream;
use std::path::{Path, PathBuf};

use eyre::{Context, Result, bail};
use tokio::net::UnixListener;
use tracing::{debug, info, warn};

/// Bind the service socket at `socket_path`
///
/// A leftover socket file from a dead service is replaced. A socket that
/// still accepts connections belongs to a live service and is left alone.
pub fn create_listener_at(socket_path: &Path) -> Result<(UnixListener, PathBuf)> {
    debug!(?socket_path, "create_listener_at: called");

    if let Some(parent) = socket_path.parent() {
        std::fs::create_dir_all(parent).with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    if StdUnixStream::connect(socket_path).is_ok() {
        bail!("A planning service is already listening on {}", socket_path.display());
    }
    cleanup_socket(socket_path);

    let listener =
        UnixListener::bind(socket_path).with_context(|| format!("Failed to bind {}", socket_path.display()))?;
    info!(?socket_path, "Planning service socket bound");

    Ok((listener, socket_path.to_path_buf()))
}

/// Remove the socket file; a missing file is not an error
pub fn cleanup_socket(socket_path: &Path) {
    match std::fs::remove_file(socket_path) {
        Ok(()) => debug!(?socket_path, "cleanup_socket: removed"),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => warn!(?socket_path, error = %e, "Failed to remove socket file"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_create_listener_creates_parent_dir() {
        let temp = TempDir::new().unwrap();
        let socket_path = temp.path().join("subdir").join("planner.sock");

        let (_, path) = create_listener_at(&socket_path).unwrap();
        assert_eq!(path, socket_path);
        assert!(socket_path.exists());
    }

    #[tokio::test]
    async fn test_create_listener_removes_stale_socket() {
        let temp = TempDir::new().unwrap();
        let socket_path = temp.path().join("planner.sock");

        // Create a stale file
        std::fs::write(&socket_path, "stale").unwrap();

        assert!(create_listener_at(&socket_path).is_ok());
    }

    #[tokio::test]
    async fn test_create_listener_replaces_dead_service_socket() {
        let temp = TempDir::new().unwrap();
        let socket_path = temp.path().join("planner.sock");

        // Dropping the listener leaves the socket file behind with nobody accepting
        let (dead, _) = create_listener_at(&socket_path).unwrap();
        drop(dead);
        assert!(socket_path.exists());

        assert!(create_listener_at(&socket_path).is_ok());
    }

    #[tokio::test]
    async fn test_create_listener_refuses_live_socket() {
        let temp = TempDir::new().unwrap();
        let socket_path = temp.path().join("planner.sock");

        let (_live, _) = create_listener_at(&socket_path).unwrap();
        let err = create_listener_at(&socket_path).unwrap_err();

        assert!(err.to_string().contains("already listening"), "unexpected error: {err}");
        assert!(socket_path.exists());
    }

    #[test]
    fn test_cleanup_socket_removes_file() {
        let temp = TempDir::new().unwrap();
        let socket_path = temp.path().join("planner.sock");

        std::fs::write(&socket_path, "test").unwrap();
        assert!(socket_path.exists());

        cleanup_socket(&socket_path);
        assert!(!socket_path.exists());
    }

    #[test]
    fn test_cleanup_socket_handles_missing_file() {
        let temp = TempDir::new().unwrap();

        // Should not panic
        cleanup_socket(&temp.path().join("nonexistent.sock"));
    }
}
