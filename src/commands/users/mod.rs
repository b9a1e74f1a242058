//! Account registry commands.

pub mod change_role_command;
pub mod create_user_command;
pub mod set_user_active_command;
pub mod update_user_command;

pub use change_role_command::ChangeRoleCommand;
pub use create_user_command::CreateUserCommand;
pub use set_user_active_command::SetUserActiveCommand;
pub use update_user_command::UpdateUserCommand;

use lazy_static::lazy_static;
use regex::Regex;
use tracing::{error, warn};
use validator::ValidationError;

use crate::{errors::ServiceError, metrics};

lazy_static! {
    static ref USERNAME_PATTERN: Regex =
        Regex::new(r"^[a-zA-Z0-9_]+$").expect("username pattern compiles");
}

pub(crate) fn validate_username(username: &str) -> Result<(), ValidationError> {
    if USERNAME_PATTERN.is_match(username) {
        Ok(())
    } else {
        let mut err = ValidationError::new("username");
        err.message = Some("Username may only contain letters, digits and underscores".into());
        Err(err)
    }
}

/// Emails compare case-insensitively; they are stored lowercase.
pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Empty strings clear optional profile fields.
pub(crate) fn optional_text(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

pub(crate) fn failed(operation: &'static str, err: ServiceError) -> ServiceError {
    metrics::record_registry_failure("user", operation, &err);
    match &err {
        ServiceError::DatabaseError(_) | ServiceError::InternalError(_) => {
            error!(operation, error = %err, "User operation failed")
        }
        _ => warn!(operation, error = %err, "User operation rejected"),
    }
    err
}
