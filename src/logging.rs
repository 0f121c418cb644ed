//! Tracing subscriber setup.

use tracing::Level;

/// Installs a stderr fmt subscriber at DEBUG or INFO.
///
/// Returns `false` when a global subscriber was already installed, in which
/// case nothing changes.
pub fn init(debug: bool) -> bool {
    let level = if debug { Level::DEBUG } else { Level::INFO };

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        init(true);
        assert!(!init(false));
    }
}
