//! Output mode flags shared by every command.
//!
//! `main` exports the global flags as environment variables so commands
//! can check them without threading them through every call.

use serde::Serialize;

pub const JSON_ENV: &str = "FOLDBATCH_JSON";
pub const QUIET_ENV: &str = "FOLDBATCH_QUIET";

fn flag(name: &str) -> bool {
    std::env::var(name).map(|v| v == "1").unwrap_or(false)
}

/// Machine-readable output requested.
pub fn is_json() -> bool {
    flag(JSON_ENV)
}

/// Non-essential output suppressed.
pub fn is_quiet() -> bool {
    flag(QUIET_ENV) || is_json()
}

/// Print a value as pretty JSON on stdout.
pub fn print_json<T: Serialize + ?Sized>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{s}"),
        Err(e) => eprintln!("  Error: could not serialize output: {e}"),
    }
}
