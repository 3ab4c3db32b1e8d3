// llama-launcher/src/telemetry.rs

use tracing_subscriber::{fmt, EnvFilter};

/// `RUST_LOG` wins when set; otherwise `-v` enables info and `-vv` debug.
/// Logs go to stderr so they never interleave with the generated command.
pub fn init_tracing(verbosity: u8) {
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| default_directive(verbosity).into());

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(env_filter))
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .compact()
        .finish();

    let _ = tracing::subscriber::set_global_default(subscriber);
}

fn default_directive(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbosity_levels() {
        assert_eq!(default_directive(0), "warn");
        assert_eq!(default_directive(1), "info");
        assert_eq!(default_directive(5), "debug");
    }
}
