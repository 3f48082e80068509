//! Run-scoped extraction directory.
//!
//! Every live workspace is recorded in a process-wide [`CleanupRegistry`].
//! Dropping the workspace removes it; a signal listener installed with
//! [`install_signal_cleanup`] purges whatever is still registered before the
//! process exits on SIGINT, SIGTERM or SIGHUP. A purged registry stays
//! closed, so nothing is written into a workspace after it was removed.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::{fs, process, thread};

use tempfile::TempDir;
use tracing::{debug, warn};

use crate::repository::display_path;
use crate::{Error, Result};

static LIVE_WORKSPACES: CleanupRegistry = CleanupRegistry::new();
static SIGNAL_CLEANUP_INSTALLED: AtomicBool = AtomicBool::new(false);

/// Private directory holding the content extracted during one run.
#[derive(Debug)]
pub struct EphemeralWorkspace {
    dir: Option<TempDir>,
    path: PathBuf,
    registry: &'static CleanupRegistry,
}

impl EphemeralWorkspace {
    /// Create a workspace under the system temporary directory.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Workspace`] when the directory cannot be created.
    pub fn acquire() -> Result<Self> {
        Self::acquire_in(std::env::temp_dir())
    }

    /// Create a workspace under `parent`.
    ///
    /// The directory is named after the current process and readable only by
    /// its owner.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Workspace`] when the directory cannot be created or
    /// its permissions cannot be restricted, and [`Error::Terminating`] once
    /// signal cleanup has started.
    pub fn acquire_in(parent: impl AsRef<Path>) -> Result<Self> {
        Self::acquire_registered(parent.as_ref(), &LIVE_WORKSPACES)
    }

    fn acquire_registered(parent: &Path, registry: &'static CleanupRegistry) -> Result<Self> {
        let workspace_err = |source| Error::Workspace {
            path: display_path(parent),
            source,
        };

        let dir = tempfile::Builder::new()
            .prefix(&format!("wadiff-{}-", process::id()))
            .tempdir_in(parent)
            .map_err(workspace_err)?;
        restrict_to_owner(dir.path()).map_err(workspace_err)?;

        let path = dir.path().to_path_buf();
        if !registry.register(&path) {
            return Err(Error::Terminating {
                path: display_path(&path),
            });
        }
        debug!(path = %path.display(), "acquired workspace");

        Ok(Self {
            dir: Some(dir),
            path,
            registry,
        })
    }

    /// Location of the workspace directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write `contents` to `target` inside the workspace, creating parent
    /// directories as needed.
    ///
    /// The write cannot interleave with signal cleanup.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Terminating`] when the workspace has been purged, and
    /// [`Error::Io`] when a directory or the file cannot be written.
    pub fn store(&self, target: &Path, contents: &[u8]) -> Result<()> {
        let written = self.registry.while_open(|| {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent).map_err(|source| Error::Io {
                    path: display_path(parent),
                    source,
                })?;
            }
            fs::write(target, contents).map_err(|source| Error::Io {
                path: display_path(target),
                source,
            })
        });
        written.unwrap_or_else(|| {
            Err(Error::Terminating {
                path: display_path(&self.path),
            })
        })
    }

    /// Remove the workspace and everything inside it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] when the directory exists but cannot be removed.
    pub fn release(mut self) -> Result<()> {
        self.release_inner()
    }

    fn release_inner(&mut self) -> Result<()> {
        let Some(dir) = self.dir.take() else {
            return Ok(());
        };

        self.registry.unregister(&self.path);
        match dir.close() {
            Ok(()) => {
                debug!(path = %self.path.display(), "released workspace");
                Ok(())
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(Error::Io {
                path: display_path(&self.path),
                source,
            }),
        }
    }
}

impl Drop for EphemeralWorkspace {
    fn drop(&mut self) {
        if let Err(err) = self.release_inner() {
            warn!(error = %err, "failed to remove workspace");
        }
    }
}

#[cfg(unix)]
fn restrict_to_owner(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o700))
}

#[cfg(not(unix))]
fn restrict_to_owner(_path: &Path) -> io::Result<()> {
    Ok(())
}

/// Directories to remove if the process is terminated by a signal.
#[derive(Debug, Default)]
pub struct CleanupRegistry {
    state: Mutex<Registered>,
}

#[derive(Debug, Default)]
struct Registered {
    paths: Vec<PathBuf>,
    closed: bool,
}

impl CleanupRegistry {
    /// An empty, open registry.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: Mutex::new(Registered {
                paths: Vec::new(),
                closed: false,
            }),
        }
    }

    /// Record a directory for cleanup. Returns `false` once the registry
    /// has been purged.
    pub fn register(&self, path: &Path) -> bool {
        let mut state = self.lock();
        if state.closed {
            return false;
        }
        state.paths.push(path.to_path_buf());
        true
    }

    /// Forget a directory that has been released normally.
    pub fn unregister(&self, path: &Path) {
        self.lock().paths.retain(|live| live != path);
    }

    /// Run `f` unless the registry has been purged. A purge waits for `f`
    /// to finish.
    pub fn while_open<T>(&self, f: impl FnOnce() -> T) -> Option<T> {
        let state = self.lock();
        if state.closed {
            return None;
        }
        let result = f();
        drop(state);
        Some(result)
    }

    /// Close the registry and remove every recorded directory. Returns how
    /// many were removed.
    pub fn purge(&self) -> usize {
        let mut state = self.lock();
        state.closed = true;
        let mut removed = 0;
        for path in std::mem::take(&mut state.paths) {
            match fs::remove_dir_all(&path) {
                Ok(()) => removed += 1,
                Err(err) if err.kind() == io::ErrorKind::NotFound => (),
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "failed to purge workspace");
                }
            }
        }
        removed
    }

    fn lock(&self) -> MutexGuard<'_, Registered> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Install the termination-signal listener. Later calls are no-ops.
///
/// # Errors
///
/// Returns [`Error::Signal`] when the runtime or signal streams cannot be created.
pub fn install_signal_cleanup() -> Result<()> {
    if SIGNAL_CLEANUP_INSTALLED.swap(true, Ordering::SeqCst) {
        return Ok(());
    }

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|source| Error::Signal { source })?;
    let listener = {
        let _guard = runtime.enter();
        signals::Listener::new().map_err(|source| Error::Signal { source })?
    };

    thread::Builder::new()
        .name("wadiff-signals".into())
        .spawn(move || {
            let signal = runtime.block_on(listener.recv());
            warn!(signal, "terminated by signal, removing workspace");
            LIVE_WORKSPACES.purge();
            process::exit(128 + signal);
        })
        .map_err(|source| Error::Signal { source })?;
    Ok(())
}

#[cfg(unix)]
mod signals {
    use std::io;

    use tokio::signal::unix::{signal, Signal, SignalKind};

    pub struct Listener {
        interrupt: Signal,
        terminate: Signal,
        hangup: Signal,
    }

    impl Listener {
        pub fn new() -> io::Result<Self> {
            Ok(Self {
                interrupt: signal(SignalKind::interrupt())?,
                terminate: signal(SignalKind::terminate())?,
                hangup: signal(SignalKind::hangup())?,
            })
        }

        /// Wait for the next signal and return its number.
        pub async fn recv(mut self) -> i32 {
            tokio::select! {
                _ = self.interrupt.recv() => 2,
                _ = self.terminate.recv() => 15,
                _ = self.hangup.recv() => 1,
            }
        }
    }
}

#[cfg(not(unix))]
mod signals {
    use std::io;

    pub struct Listener;

    impl Listener {
        pub fn new() -> io::Result<Self> {
            Ok(Self)
        }

        /// Wait for Ctrl-C and return the conventional interrupt number.
        pub async fn recv(self) -> i32 {
            let _ = tokio::signal::ctrl_c().await;
            2
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acquire_creates_private_directory_and_release_removes_it() -> Result<()> {
        let parent = TempDir::new().expect("tempdir");
        let workspace = EphemeralWorkspace::acquire_in(parent.path())?;
        let path = workspace.path().to_path_buf();

        assert!(path.is_dir());
        assert!(path.starts_with(parent.path()));
        let name = path.file_name().and_then(|n| n.to_str()).expect("utf-8 name");
        assert!(name.starts_with(&format!("wadiff-{}-", process::id())));
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(&path).expect("metadata").permissions().mode();
            assert_eq!(mode & 0o777, 0o700);
        }

        fs::write(path.join("e1m1-HEAD.wad"), b"PWAD").expect("write extracted file");
        workspace.release()?;
        assert!(!path.exists());
        Ok(())
    }

    #[test]
    fn drop_removes_directory_on_early_exit() -> Result<()> {
        let parent = TempDir::new().expect("tempdir");
        let path = {
            let workspace = EphemeralWorkspace::acquire_in(parent.path())?;
            fs::create_dir(workspace.path().join("maps")).expect("create subdir");
            workspace.path().to_path_buf()
        };
        assert!(!path.exists());
        Ok(())
    }

    #[test]
    fn release_of_vanished_directory_is_a_no_op() -> Result<()> {
        let parent = TempDir::new().expect("tempdir");
        let workspace = EphemeralWorkspace::acquire_in(parent.path())?;
        fs::remove_dir_all(workspace.path()).expect("remove behind the workspace's back");
        workspace.release()
    }

    #[test]
    fn store_creates_parent_directories() -> Result<()> {
        let parent = TempDir::new().expect("tempdir");
        let workspace = EphemeralWorkspace::acquire_in(parent.path())?;
        let target = workspace.path().join("maps/ep1/e1m1-HEAD.wad");

        workspace.store(&target, b"PWAD")?;
        assert_eq!(fs::read(&target).expect("read stored file"), b"PWAD");
        workspace.release()
    }

    #[test]
    fn purge_removes_registered_directories_and_closes_registry() -> Result<()> {
        let parent = TempDir::new().expect("tempdir");
        let workspace = EphemeralWorkspace::acquire_in(parent.path())?;
        let path = workspace.path().to_path_buf();
        fs::write(path.join("e1m1-HEAD.wad"), b"PWAD").expect("write extracted file");

        let registry = CleanupRegistry::new();
        assert!(registry.register(&path));
        assert!(registry.register(&parent.path().join("never-created")));
        assert_eq!(registry.purge(), 1);
        assert!(!path.exists());

        assert!(!registry.register(&parent.path().join("late")));
        assert_eq!(registry.while_open(|| ()), None);
        workspace.release()
    }

    #[test]
    fn purged_workspace_refuses_writes_and_stays_removed() -> Result<()> {
        static REGISTRY: CleanupRegistry = CleanupRegistry::new();
        let parent = TempDir::new().expect("tempdir");
        let workspace = EphemeralWorkspace::acquire_registered(parent.path(), &REGISTRY)?;
        let path = workspace.path().to_path_buf();
        workspace.store(&path.join("maps/e1m1-HEAD.wad"), b"PWAD")?;

        assert_eq!(REGISTRY.purge(), 1);
        let late = workspace.store(&path.join("maps/e1m2-HEAD.wad"), b"PWAD");
        assert!(matches!(late, Err(Error::Terminating { .. })));
        assert!(!path.exists());

        let again = EphemeralWorkspace::acquire_registered(parent.path(), &REGISTRY);
        assert!(matches!(again, Err(Error::Terminating { .. })));
        workspace.release()
    }

    #[test]
    fn missing_parent_is_a_workspace_error() {
        let parent = TempDir::new().expect("tempdir");
        let result = EphemeralWorkspace::acquire_in(parent.path().join("absent"));
        assert!(matches!(result, Err(Error::Workspace { .. })));
    }

    #[test]
    fn signal_cleanup_installs_once() -> Result<()> {
        install_signal_cleanup()?;
        install_signal_cleanup()
    }
}
