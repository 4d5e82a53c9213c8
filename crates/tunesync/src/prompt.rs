//! Terminal yes/no prompt for the compatibility gate.
//!
//! The answer is read on a helper thread so that a shutdown request can
//! abandon the question; a blocking read on stdin cannot be interrupted.

use std::cell::RefCell;
use std::io::{self, BufRead, BufReader, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use tracing::{info, warn};
use tunesync_core::{ApiVersion, CompatibilityPrompt};

/// How often a pending question checks for shutdown.
const SHUTDOWN_POLL: Duration = Duration::from_millis(100);

/// Asks on a writer and reads the answer from a line-based reader.
///
/// Anything but an answer starting with `y` counts as "no", including a
/// closed input. Raising `shutdown` while waiting abandons the question.
pub struct LinePrompt<R, W> {
    input: RefCell<Option<R>>,
    output: RefCell<W>,
    shutdown: Arc<AtomicBool>,
}

/// Prompt bound to the process's stdin and stderr.
pub type StdinPrompt = LinePrompt<BufReader<io::Stdin>, io::Stderr>;

impl StdinPrompt {
    /// Prompt on the terminal.
    pub fn stdin(shutdown: Arc<AtomicBool>) -> Self {
        Self::new(BufReader::new(io::stdin()), io::stderr(), shutdown)
    }
}

impl<R, W> LinePrompt<R, W>
where
    R: BufRead + Send + 'static,
    W: Write,
{
    /// Create a prompt over `input` and `output`.
    pub const fn new(input: R, output: W, shutdown: Arc<AtomicBool>) -> Self {
        Self {
            input: RefCell::new(Some(input)),
            output: RefCell::new(output),
            shutdown,
        }
    }

    fn ask(&self, question: &str) -> io::Result<Option<bool>> {
        {
            let mut output = self.output.borrow_mut();
            write!(output, "{question} [y/N] ")?;
            output.flush()?;
        }

        // The input is handed to the reader thread; a second question sees
        // a closed input.
        let Some(mut input) = self.input.borrow_mut().take() else {
            return Ok(Some(false));
        };

        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let mut line = String::new();
            let result = input.read_line(&mut line).map(|_| line);
            let _ = tx.send(result);
        });

        loop {
            if self.shutdown.load(Ordering::SeqCst) {
                info!("Shutdown requested, question left unanswered");
                return Ok(None);
            }
            match rx.recv_timeout(SHUTDOWN_POLL) {
                Ok(line) => return line.map(|l| Some(parse_answer(&l))),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => return Ok(Some(false)),
            }
        }
    }
}

impl<R, W> CompatibilityPrompt for LinePrompt<R, W>
where
    R: BufRead + Send + 'static,
    W: Write,
{
    fn confirm_force_enable(&self, host: ApiVersion, expected: ApiVersion) -> Option<bool> {
        let question = format!(
            "Host API version {host} is invalid. Expected {expected} for native module support. Force enable?"
        );
        self.ask(&question).unwrap_or_else(|e| {
            warn!("Couldn't read answer, keeping native module disabled: {}", e);
            Some(false)
        })
    }
}

fn parse_answer(line: &str) -> bool {
    line.trim_start()
        .chars()
        .next()
        .is_some_and(|c| c.eq_ignore_ascii_case(&'y'))
}
