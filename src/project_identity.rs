//! Central project identity contract.
//!
//! This module is the single source of truth for runtime identity values.

pub const DISPLAY_NAME: &str = "Safenix";
pub const BINARY_NAME: &str = "safenix";
pub const STABLE_PROJECT_ID: &str = "safenix";
pub const CONFIG_DIR_NAME: &str = "safenix";
pub const ENV_PREFIX: &str = "SAFENIX";
pub const SETTINGS_FILE_BASENAME: &str = "settings.kdl";

pub fn env_key(suffix: &str) -> String {
    format!("{}_{}", ENV_PREFIX, suffix)
}

pub fn cli_with(args: &str) -> String {
    format!("{} {}", BINARY_NAME, args)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_key_uses_prefix() {
        assert_eq!(env_key("CONFIG"), "SAFENIX_CONFIG");
    }

    #[test]
    fn cli_with_prefixes_binary() {
        assert_eq!(cli_with("add htop"), "safenix add htop");
    }
}
