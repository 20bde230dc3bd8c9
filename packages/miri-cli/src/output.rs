use crate::exit_codes;
use serde::Serialize;
use std::io::Write;

/// Print a value as pretty JSON on stdout and return the exit code to use.
pub fn print_json<T: Serialize>(value: &T) -> i32 {
    let json = match serde_json::to_string_pretty(value) {
        Ok(json) => json,
        Err(e) => {
            eprintln!("Error: JSON serialization failed: {}", e);
            return exit_codes::EXECUTION_ERROR;
        }
    };

    let stdout = std::io::stdout();
    let mut handle = stdout.lock();
    match handle
        .write_all(json.as_bytes())
        .and_then(|_| handle.write_all(b"\n"))
    {
        Ok(()) => exit_codes::SUCCESS,
        Err(e) => {
            eprintln!("Error: Failed to write to stdout: {}", e);
            exit_codes::EXECUTION_ERROR
        }
    }
}
