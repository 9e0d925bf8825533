//! # Domain Vocabularies
//!
//! Closed sets of lifecycle states and classifications used across the
//! catalogue. Each enum has exactly one wire spelling per variant
//! (kebab- or snake-case, matching the public API contract), and a
//! `FromStr` that rejects anything else with
//! [`ValidationError::InvalidStatus`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $kind:literal, $rename:literal {
            $($(#[$vmeta:meta])* $variant:ident => $wire:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(rename_all = $rename)]
        pub enum $name {
            $($(#[$vmeta])* $variant),+
        }

        impl $name {
            /// Every variant, in declaration order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Return the wire representation.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $wire),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = ValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($wire => Ok($name::$variant),)+
                    other => Err(ValidationError::InvalidStatus {
                        kind: $kind,
                        value: other.to_string(),
                    }),
                }
            }
        }
    };
}

wire_enum!(
    /// Lifecycle of a procurement framework.
    FrameworkStatus, "framework status", "lowercase" {
        /// Announced, not yet accepting applications.
        Coming => "coming",
        /// Suppliers may register interest and submit drafts.
        Open => "open",
        /// Applications closed, evaluation under way.
        Pending => "pending",
        /// Awards made, agreements being signed.
        Standstill => "standstill",
        /// Services are purchasable.
        Live => "live",
        /// Framework closed for good.
        Expired => "expired",
    }
);

wire_enum!(
    /// Lifecycle of a draft service.
    DraftStatus, "draft status", "kebab-case" {
        NotSubmitted => "not-submitted",
        Submitted => "submitted",
    }
);

wire_enum!(
    /// Visibility of a published service.
    ServiceStatus, "service status", "lowercase" {
        Published => "published",
        Enabled => "enabled",
        Disabled => "disabled",
    }
);

wire_enum!(
    /// Account role. Supplier accounts are bound to a supplier id.
    UserRole, "user role", "kebab-case" {
        Buyer => "buyer",
        Supplier => "supplier",
        Admin => "admin",
        AdminCcsCategory => "admin-ccs-category",
        AdminCcsSourcing => "admin-ccs-sourcing",
    }
);

wire_enum!(
    /// Kinds of audited mutations.
    AuditType, "audit type", "snake_case" {
        FrameworkUpdate => "framework_update",
        SupplierUpdate => "supplier_update",
        ContactUpdate => "contact_update",
        RegisterFrameworkInterest => "register_framework_interest",
        AnswerSelectionQuestions => "answer_selection_questions",
        ImportService => "import_service",
        UpdateService => "update_service",
        CreateDraftService => "create_draft_service",
        UpdateDraftService => "update_draft_service",
        CompleteDraftService => "complete_draft_service",
        DeleteDraftService => "delete_draft_service",
        CreateUser => "create_user",
    }
);

impl FrameworkStatus {
    /// Whether suppliers may register interest and edit drafts.
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Open)
    }
}
