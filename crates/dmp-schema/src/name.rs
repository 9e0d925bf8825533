//! # Schema Names
//!
//! The closed catalogue of schemas the registry loads. Each name maps to
//! `<name>.json` in the schema directory.

use std::fmt;
use std::str::FromStr;

use crate::error::SchemaValidationError;

/// A schema known to the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SchemaName {
    ServicesGCloud4,
    ServicesGCloud5,
    ServicesGCloud6Iaas,
    ServicesGCloud6Saas,
    ServicesGCloud6Paas,
    ServicesGCloud6Scs,
    ServicesGCloud7Iaas,
    ServicesGCloud7Saas,
    ServicesGCloud7Paas,
    ServicesGCloud7Scs,
    ServicesDosDigitalOutcomes,
    ServicesDosDigitalSpecialists,
    ServicesDosUserResearchStudios,
    ServicesDosUserResearchParticipants,
    ServicesUpdate,
    Users,
    UsersAuth,
    Suppliers,
    NewSupplier,
    ContactInformation,
}

impl SchemaName {
    /// Every schema, in load order.
    pub const ALL: [SchemaName; 20] = [
        Self::ServicesGCloud4,
        Self::ServicesGCloud5,
        Self::ServicesGCloud6Iaas,
        Self::ServicesGCloud6Saas,
        Self::ServicesGCloud6Paas,
        Self::ServicesGCloud6Scs,
        Self::ServicesGCloud7Iaas,
        Self::ServicesGCloud7Saas,
        Self::ServicesGCloud7Paas,
        Self::ServicesGCloud7Scs,
        Self::ServicesDosDigitalOutcomes,
        Self::ServicesDosDigitalSpecialists,
        Self::ServicesDosUserResearchStudios,
        Self::ServicesDosUserResearchParticipants,
        Self::ServicesUpdate,
        Self::Users,
        Self::UsersAuth,
        Self::Suppliers,
        Self::NewSupplier,
        Self::ContactInformation,
    ];

    /// The registry name, e.g. `"services-g-cloud-7-iaas"`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ServicesGCloud4 => "services-g-cloud-4",
            Self::ServicesGCloud5 => "services-g-cloud-5",
            Self::ServicesGCloud6Iaas => "services-g-cloud-6-iaas",
            Self::ServicesGCloud6Saas => "services-g-cloud-6-saas",
            Self::ServicesGCloud6Paas => "services-g-cloud-6-paas",
            Self::ServicesGCloud6Scs => "services-g-cloud-6-scs",
            Self::ServicesGCloud7Iaas => "services-g-cloud-7-iaas",
            Self::ServicesGCloud7Saas => "services-g-cloud-7-saas",
            Self::ServicesGCloud7Paas => "services-g-cloud-7-paas",
            Self::ServicesGCloud7Scs => "services-g-cloud-7-scs",
            Self::ServicesDosDigitalOutcomes => {
                "services-digital-outcomes-and-specialists-digital-outcomes"
            }
            Self::ServicesDosDigitalSpecialists => {
                "services-digital-outcomes-and-specialists-digital-specialists"
            }
            Self::ServicesDosUserResearchStudios => {
                "services-digital-outcomes-and-specialists-user-research-studios"
            }
            Self::ServicesDosUserResearchParticipants => {
                "services-digital-outcomes-and-specialists-user-research-participants"
            }
            Self::ServicesUpdate => "services-update",
            Self::Users => "users",
            Self::UsersAuth => "users-auth",
            Self::Suppliers => "suppliers",
            Self::NewSupplier => "new-supplier",
            Self::ContactInformation => "contact-information",
        }
    }

    /// File name inside the schema directory.
    pub fn file_name(&self) -> String {
        format!("{}.json", self.as_str())
    }

    /// The service schema for a framework slug and lot slug.
    ///
    /// G-Cloud 4 and 5 have one schema for every lot. Later frameworks
    /// have one schema per lot. Returns `None` for combinations with no
    /// schema.
    pub fn for_service(framework_slug: &str, lot: &str) -> Option<SchemaName> {
        let name = match framework_slug {
            "g-cloud-4" => Self::ServicesGCloud4,
            "g-cloud-5" => Self::ServicesGCloud5,
            "g-cloud-6" => match lot {
                "iaas" => Self::ServicesGCloud6Iaas,
                "saas" => Self::ServicesGCloud6Saas,
                "paas" => Self::ServicesGCloud6Paas,
                "scs" => Self::ServicesGCloud6Scs,
                _ => return None,
            },
            "g-cloud-7" => match lot {
                "iaas" => Self::ServicesGCloud7Iaas,
                "saas" => Self::ServicesGCloud7Saas,
                "paas" => Self::ServicesGCloud7Paas,
                "scs" => Self::ServicesGCloud7Scs,
                _ => return None,
            },
            "digital-outcomes-and-specialists" => match lot {
                "digital-outcomes" => Self::ServicesDosDigitalOutcomes,
                "digital-specialists" => Self::ServicesDosDigitalSpecialists,
                "user-research-studios" => Self::ServicesDosUserResearchStudios,
                "user-research-participants" => Self::ServicesDosUserResearchParticipants,
                _ => return None,
            },
            _ => return None,
        };
        Some(name)
    }
}

impl fmt::Display for SchemaName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SchemaName {
    type Err = SchemaValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|name| name.as_str() == s)
            .ok_or_else(|| SchemaValidationError::UnknownSchema(s.to_string()))
    }
}
