//! Console input helpers for the interactive session.

use std::io::{self, BufRead};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

/// Reads one line from stdin.
///
/// Returns `None` on end of input.
pub fn read_line() -> io::Result<Option<String>> {
    let mut line = String::new();
    let bytes = io::stdin().lock().read_line(&mut line)?;
    if bytes == 0 {
        Ok(None)
    } else {
        Ok(Some(line))
    }
}

/// Reads one line from stdin, racing a timer against the blocking read.
///
/// A background thread performs the blocking read and sends the result
/// over a channel; if nothing arrives within `timeout`, returns
/// `Ok(None)` and leaves the thread parked on stdin. UI convenience
/// only — the caller treats a timeout as session end.
pub fn read_line_with_timeout(timeout: Duration) -> io::Result<Option<String>> {
    let (tx, rx) = mpsc::channel();

    thread::spawn(move || {
        let mut line = String::new();
        let result = io::stdin().lock().read_line(&mut line).map(|bytes| {
            if bytes == 0 { None } else { Some(line) }
        });
        let _ = tx.send(result);
    });

    match rx.recv_timeout(timeout) {
        Ok(Ok(line)) => Ok(line),
        Ok(Err(e)) => Err(e),
        Err(_) => Ok(None),
    }
}
