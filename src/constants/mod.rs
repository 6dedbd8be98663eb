pub mod common;

pub use common::{
    BACKUP_SUFFIX, DEFAULT_INDENT_UNIT, DEFAULT_TARGET, LOCK_TIMEOUT_SECONDS, MAX_BACKUPS,
    PACKAGE_LIST_PATH, PROJECT_NAME, PROJECT_ORG, PROJECT_QUALIFIER, SERVICES_NAMESPACE,
    USERS_NAMESPACE,
};
