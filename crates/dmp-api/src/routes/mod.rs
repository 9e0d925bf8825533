//! # API Route Modules
//!
//! - `frameworks`: framework catalogue, status updates, application stats,
//!   and the suppliers interested in each framework.
//! - `suppliers`: supplier directory, contact details, and framework
//!   interest and declarations.
//! - `services`: published services, imported and edited under schema
//!   validation.
//! - `drafts`: draft services edited page by page under relaxed
//!   validation and completed under strict validation.
//! - `users`: accounts and password authentication.
//! - `audit`: the audit event log.

pub mod audit;
pub mod drafts;
pub mod frameworks;
pub mod services;
pub mod suppliers;
pub mod users;

use std::str::FromStr;

use crate::error::AppError;

/// Parse an identifier taken from the URL path.
pub(crate) fn parse_id<T: FromStr>(raw: &str, label: &str) -> Result<T, AppError> {
    raw.parse::<T>()
        .map_err(|_| AppError::BadRequest(format!("invalid {label} id: {raw}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use dmp_core::SupplierId;

    #[test]
    fn path_ids_parse() {
        assert_eq!(parse_id::<SupplierId>("12", "supplier").unwrap(), SupplierId(12));
        assert!(matches!(
            parse_id::<SupplierId>("twelve", "supplier"),
            Err(AppError::BadRequest(ref m)) if m.contains("twelve")
        ));
    }
}
