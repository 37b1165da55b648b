//! Upload progress reporting.
//!
//! Reports observable progress while a batch of statements is uploaded,
//! one event per settled chunk. Progress is emitted on **stderr** so
//! stdout remains parseable for scripts.

use std::io::Write;

/// Cumulative progress of one upload batch.
///
/// `total` is fixed when the batch starts; `completed` advances by the
/// size of each settled chunk and never exceeds `total`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct BatchProgress {
    pub completed: u64,
    pub total: u64,
}

/// Receives batch progress. Implementations write to stderr (human or
/// JSON); the engine calls [`report`](ProgressReporter::report) once per
/// settled chunk.
pub trait ProgressReporter: Send + Sync {
    fn report(&self, progress: BatchProgress);
}

/// Human-friendly progress on stderr: "upload  50 / 120 statements".
pub struct StderrProgress;

impl ProgressReporter for StderrProgress {
    fn report(&self, progress: BatchProgress) {
        let line = format!(
            "upload  {} / {} statements\n",
            format_number(progress.completed),
            format_number(progress.total)
        );
        let _ = std::io::stderr().lock().write_all(line.as_bytes());
        let _ = std::io::stderr().lock().flush();
    }
}

/// Machine progress: one line-delimited JSON object per settled chunk.
pub struct JsonProgress;

impl ProgressReporter for JsonProgress {
    fn report(&self, progress: BatchProgress) {
        let obj = serde_json::json!({
            "event": "progress",
            "completed": progress.completed,
            "total": progress.total
        });
        if let Ok(line) = serde_json::to_string(&obj) {
            let _ = writeln!(std::io::stderr().lock(), "{}", line);
            let _ = std::io::stderr().lock().flush();
        }
    }
}

/// Silent reporter for `--progress off` and non-interactive runs.
pub struct NoProgress;

impl ProgressReporter for NoProgress {
    fn report(&self, _progress: BatchProgress) {}
}

fn format_number(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Progress channel selection for the CLI: off, human, or JSON (both on
/// stderr).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ProgressMode {
    Off,
    Human,
    Json,
}

impl ProgressMode {
    /// Human progress when stderr is a terminal, otherwise off.
    pub fn default_for_tty() -> Self {
        if atty::is(atty::Stream::Stderr) {
            ProgressMode::Human
        } else {
            ProgressMode::Off
        }
    }

    /// Build a reporter for this mode. Caller passes it to the ingest call.
    pub fn reporter(&self) -> Box<dyn ProgressReporter> {
        match self {
            ProgressMode::Off => Box::new(NoProgress),
            ProgressMode::Human => Box::new(StderrProgress),
            ProgressMode::Json => Box::new(JsonProgress),
        }
    }
}
