//! Session sink: mirror the shared source into a file and print run output.

use std::io::Write;
use std::path::PathBuf;

use gomer_core::InboundSink;
use tracing::{info, warn};

/// Mirrors `codeUpdate`s into `path` and prints `runResult`s to `out`.
///
/// Callbacks run on the router's task, so the file write blocks it. Shared
/// sources are a single Go file of a few kilobytes; the write is not moved
/// off the executor.
pub struct SessionSink<W> {
    path: PathBuf,
    out: W,
}

impl<W: Write + Send> SessionSink<W> {
    pub fn new(path: PathBuf, out: W) -> Self {
        Self { path, out }
    }

    #[cfg(test)]
    fn into_output(self) -> W {
        self.out
    }
}

impl<W: Write + Send> InboundSink for SessionSink<W> {
    fn on_code_update(&mut self, go_code: String) {
        // A failed write leaves the previous contents; the next update retries.
        match std::fs::write(&self.path, go_code.as_bytes()) {
            Ok(()) => info!(path = %self.path.display(), bytes = go_code.len(), "source updated"),
            Err(e) => warn!(path = %self.path.display(), error = %e, "failed to write source"),
        }
    }

    fn on_run_result(&mut self, output: String) {
        let written = self
            .out
            .write_all(output.as_bytes())
            .and_then(|()| {
                if output.ends_with('\n') {
                    Ok(())
                } else {
                    self.out.write_all(b"\n")
                }
            })
            .and_then(|()| self.out.flush());
        if let Err(e) = written {
            warn!(error = %e, "failed to print run result");
        }
    }
}
