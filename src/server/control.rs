//! Standard-input control surface.

use std::io::BufRead;
use std::thread::{self, JoinHandle};

use tracing::{info, warn};

use crate::server::Shutdown;

/// True for `exit` in any ASCII case, surrounding whitespace ignored.
pub fn is_exit_command(line: &str) -> bool {
    line.trim().eq_ignore_ascii_case("exit")
}

/// Watches `input` line by line and triggers `shutdown` on `exit`.
///
/// End of input stops the watcher without shutting the server down.
pub fn watch_input<R: BufRead>(input: R, shutdown: &Shutdown) {
    for line in input.lines() {
        match line {
            Ok(line) if is_exit_command(&line) => {
                info!("Shutting down the server");
                shutdown.trigger();
                return;
            }
            Ok(_) => {}
            Err(e) => {
                warn!(error = %e, "Could not read from standard input");
                return;
            }
        }
    }
}

/// Runs [`watch_input`] over stdin on a plain OS thread, so a pending read
/// never holds up runtime shutdown.
pub fn spawn_stdin_watcher(shutdown: Shutdown) -> std::io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("stdin-control".to_string())
        .spawn(move || watch_input(std::io::stdin().lock(), &shutdown))
}
