//! Interactive yes/no prompt on the controlling terminal.

use std::io::{self, BufRead, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use s3sync_engine::Confirm;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Reads the answer from stdin. The question goes to stderr so `--json`
/// output on stdout stays parseable.
pub struct TerminalPrompt {
    cancel: Arc<AtomicBool>,
}

impl TerminalPrompt {
    pub fn new(cancel: Arc<AtomicBool>) -> Self {
        Self { cancel }
    }
}

impl Confirm for TerminalPrompt {
    fn confirm(&self, question: &str) -> bool {
        if self.cancel.load(Ordering::SeqCst) {
            return false;
        }
        eprint!("\n{question} (yes/no): ");
        let _ = io::stderr().flush();

        // Read on a helper thread so Ctrl-C can abandon the question.
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let mut line = String::new();
            let read = io::stdin().lock().read_line(&mut line).map(|n| (n, line));
            let _ = tx.send(read);
        });

        loop {
            if self.cancel.load(Ordering::SeqCst) {
                eprintln!();
                return false;
            }
            match rx.recv_timeout(POLL_INTERVAL) {
                Ok(Ok((0, _))) => {
                    eprintln!();
                    return false;
                }
                Ok(Ok((_, line))) => return is_yes(&line),
                Ok(Err(err)) => {
                    tracing::warn!("cannot read answer: {err}");
                    return false;
                }
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => return false,
            }
        }
    }
}

/// Only an explicit `y` or `yes` counts.
pub fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_only_explicit_yes() {
        assert!(is_yes("y\n"));
        assert!(is_yes("  YES "));
        assert!(!is_yes(""));
        assert!(!is_yes("yep"));
        assert!(!is_yes("n"));
    }

    #[test]
    fn cancelled_prompt_answers_no_without_reading() {
        let prompt = TerminalPrompt::new(Arc::new(AtomicBool::new(true)));
        assert!(!prompt.confirm("Proceed?"));
    }
}
