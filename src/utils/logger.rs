use colored::Colorize;

/// Console logger for generator progress and diagnostics.
///
/// All output goes to stderr so generated table text on stdout
/// (if redirected) stays clean.
#[derive(Debug)]
pub struct Logger {}

impl Logger {
    pub fn info<T: ToString>(message: T) {
        eprintln!("{} {}", "[INFO]".green(), message.to_string());
    }

    pub fn warn<T: ToString>(message: T) {
        eprintln!("{} {}", "[WARN]".yellow(), message.to_string());
    }
}
