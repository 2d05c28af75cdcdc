//! ToolSage — wrap any MCP tool server as a natural-language expert.
//!
//! Two engines share one data contract, the expert descriptor:
//! - `discovery` connects to a peer, enumerates its capabilities, has the
//!   planner author an identity + guidance, and persists the descriptor.
//! - `serve` loads a descriptor, reconnects the peer, and answers
//!   natural-language queries through a single entry point.
//!
//! `peer` is the stdio JSON-RPC client both engines talk through; `planner`
//! is the language-model capability; `expert` is the persisted contract.

pub mod discovery;
pub mod expert;
pub mod peer;
pub mod planner;
pub mod serve;

/// Return the platform-standard data directory for ToolSage.
///
/// - macOS: `~/Library/Application Support/com.toolsage.app/`
/// - Windows: `{FOLDERID_RoamingAppData}\toolsage\`
/// - Linux: `$XDG_DATA_HOME/com.toolsage.app/` (fallback `~/.local/share/...`)
///
/// Falls back to `~/.toolsage/` only if none of the above can be resolved.
pub fn data_dir() -> std::path::PathBuf {
    if let Some(dir) = dirs::data_dir() {
        return dir.join("com.toolsage.app");
    }
    dirs::home_dir()
        .unwrap_or_else(|| std::path::PathBuf::from("."))
        .join(".toolsage")
}

/// Default directory for persisted expert descriptors.
pub fn experts_dir() -> std::path::PathBuf {
    data_dir().join("experts")
}

/// Initialize the tracing subscriber — writes structured logs to the app
/// data directory. Stdout is never a log sink: at serve time it carries the
/// JSON-RPC transport, and a stray log line there corrupts the protocol.
///
/// On each startup:
/// 1. Rotates existing logs (toolsage.log → toolsage.log.1 → .2 → .3, keeps last 3).
/// 2. Opens a fresh toolsage.log with a line-flushing writer for crash resilience.
/// 3. Logs a startup banner with the data directory path for discoverability.
pub fn init_tracing() {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let log_dir = data_dir();
    let _ = std::fs::create_dir_all(&log_dir);

    let log_path = log_dir.join("toolsage.log");

    // Rotate: toolsage.log.2 → .3, .1 → .2, toolsage.log → .1
    rotate_log_file(&log_path, 3);

    let log_file = match std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
    {
        Ok(file) => file,
        Err(e) => {
            eprintln!(
                "warning: cannot open {}: {e}; logging disabled",
                log_path.display()
            );
            return;
        }
    };

    let flushing_writer = FlushingWriter::new(log_file);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("toolsage=info,warn"));

    fmt::fmt()
        .with_env_filter(filter)
        .with_writer(flushing_writer)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(false)
        .init();

    // Startup banner — makes it easy to find the right log file
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        data_dir = %log_dir.display(),
        log_file = %log_path.display(),
        pid = std::process::id(),
        "=== ToolSage starting ==="
    );
}

/// Rotate log files: `toolsage.log` → `toolsage.log.1` → `.2` → … → `.{keep}`.
///
/// Oldest file beyond `keep` is deleted. Missing files in the chain are skipped.
fn rotate_log_file(base_path: &std::path::Path, keep: u32) {
    // Delete the oldest
    let oldest = format!("{}.{keep}", base_path.display());
    let _ = std::fs::remove_file(&oldest);

    // Shift: .{n-1} → .{n}
    for i in (1..keep).rev() {
        let from = format!("{}.{i}", base_path.display());
        let to = format!("{}.{}", base_path.display(), i + 1);
        let _ = std::fs::rename(&from, &to);
    }

    // Current → .1
    if base_path.exists() {
        let to = format!("{}.1", base_path.display());
        let _ = std::fs::rename(base_path, &to);
    }
}

/// A writer that wraps `std::fs::File` and flushes after every write.
///
/// `tracing-subscriber` buffers log output internally. Without explicit
/// flushing, log entries may sit in OS buffers and be lost on crash.
/// This wrapper ensures each log line is on disk immediately.
#[derive(Clone)]
struct FlushingWriter {
    file: std::sync::Arc<std::sync::Mutex<std::fs::File>>,
}

impl FlushingWriter {
    fn new(file: std::fs::File) -> Self {
        Self {
            file: std::sync::Arc::new(std::sync::Mutex::new(file)),
        }
    }
}

impl std::io::Write for FlushingWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let mut f = self
            .file
            .lock()
            .map_err(|e| std::io::Error::other(format!("lock poisoned: {e}")))?;
        let n = std::io::Write::write(&mut *f, buf)?;
        std::io::Write::flush(&mut *f)?;
        Ok(n)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        let mut f = self
            .file
            .lock()
            .map_err(|e| std::io::Error::other(format!("lock poisoned: {e}")))?;
        std::io::Write::flush(&mut *f)
    }
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for FlushingWriter {
    type Writer = FlushingWriter;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rotate_log_file_shifts_chain() {
        let tmp = tempfile::TempDir::new().unwrap();
        let base = tmp.path().join("toolsage.log");
        std::fs::write(&base, "current").unwrap();
        std::fs::write(format!("{}.1", base.display()), "one").unwrap();

        rotate_log_file(&base, 3);

        assert!(!base.exists());
        assert_eq!(
            std::fs::read_to_string(format!("{}.1", base.display())).unwrap(),
            "current"
        );
        assert_eq!(
            std::fs::read_to_string(format!("{}.2", base.display())).unwrap(),
            "one"
        );
    }

    #[test]
    fn test_experts_dir_is_under_data_dir() {
        assert!(experts_dir().starts_with(data_dir()));
    }
}
