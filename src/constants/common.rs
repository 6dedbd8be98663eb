// Common constants used throughout the codebase

/// Project name
pub const PROJECT_NAME: &str = "safenix";

/// Project organization (reverse domain notation)
pub const PROJECT_QUALIFIER: &str = "org";
pub const PROJECT_ORG: &str = "safenix";

/// Document edited when nothing else is configured
pub const DEFAULT_TARGET: &str = "/etc/nixos/configuration.nix";

/// Attribute path of the system package list
pub const PACKAGE_LIST_PATH: &[&str] = &["environment", "systemPackages"];

/// Attribute path under which service blocks live
pub const SERVICES_NAMESPACE: &[&str] = &["services"];

/// Attribute path under which user accounts live
pub const USERS_NAMESPACE: &[&str] = &["users", "users"];

/// Indentation step used when a document gives no better hint
pub const DEFAULT_INDENT_UNIT: usize = 2;

/// Backup file infix: `configuration.nix.bak.<timestamp>`
pub const BACKUP_SUFFIX: &str = "bak";

/// Backups kept per document before the oldest are pruned
pub const MAX_BACKUPS: usize = 5;

/// Sidecar locks older than this are reported when reclaimed
pub const LOCK_TIMEOUT_SECONDS: u64 = 300;
