pub mod conflicts;
pub mod mutator;
pub mod query;
pub mod types;
pub mod validator;

pub use conflicts::{Conflict, ConflictKind, ConflictRule, RuleTable, Subject};
pub use mutator::{MutationOutcome, Splice, apply_edit};
pub use types::{AttrValue, EditRequest};
pub use validator::validate;
