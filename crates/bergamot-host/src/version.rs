//! Version information for the native host.

/// Host version from Cargo.toml
pub const HOST_VERSION: &str = env!("CARGO_PKG_VERSION");

/// User-Agent sent on every request to the companion process.
pub fn user_agent() -> String {
    format!("bergamot-native-host/{}", HOST_VERSION)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_agent_carries_version() {
        assert_eq!(
            user_agent(),
            format!("bergamot-native-host/{}", env!("CARGO_PKG_VERSION"))
        );
    }
}
