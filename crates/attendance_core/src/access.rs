//! Caller capability gate for mutating operations.
//!
//! Credential checks live at the auth boundary; core only receives the
//! resulting capability and checks it at the entry of every mutation.

use std::error::Error;
use std::fmt::{Display, Formatter};

/// What the caller was granted by the auth boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Signed-in administrator.
    Admin,
    /// Public kiosk view: single status edits only.
    Kiosk,
    /// No grant.
    Anonymous,
}

/// Mutating operations guarded by `Capability`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mutation {
    AddCategory,
    DeleteCategory,
    AddPerson,
    DeletePerson,
    InitializeMonth,
    SetStatus,
    BulkSetStatus,
    ResetMonth,
}

impl Mutation {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AddCategory => "add_category",
            Self::DeleteCategory => "delete_category",
            Self::AddPerson => "add_person",
            Self::DeletePerson => "delete_person",
            Self::InitializeMonth => "initialize_month",
            Self::SetStatus => "set_status",
            Self::BulkSetStatus => "bulk_set_status",
            Self::ResetMonth => "reset_month",
        }
    }
}

pub const CAPABILITY_ADMIN: &str = "admin";
pub const CAPABILITY_KIOSK: &str = "kiosk";
pub const CAPABILITY_ANONYMOUS: &str = "anonymous";

impl Capability {
    /// Maps the session check of the auth boundary.
    pub fn from_session(authenticated: bool) -> Self {
        if authenticated {
            Self::Admin
        } else {
            Self::Anonymous
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Admin => CAPABILITY_ADMIN,
            Self::Kiosk => CAPABILITY_KIOSK,
            Self::Anonymous => CAPABILITY_ANONYMOUS,
        }
    }

    pub fn allows(self, mutation: Mutation) -> bool {
        match self {
            Self::Admin => true,
            Self::Kiosk => matches!(mutation, Mutation::SetStatus | Mutation::InitializeMonth),
            Self::Anonymous => false,
        }
    }

    /// Fails with `AccessDenied` unless `mutation` is allowed.
    pub fn require(self, mutation: Mutation) -> Result<(), AccessDenied> {
        if self.allows(mutation) {
            return Ok(());
        }
        Err(AccessDenied {
            capability: self,
            mutation,
        })
    }
}

/// Parses a capability name as sent by the host (`admin|kiosk|anonymous`).
pub fn parse_capability(value: &str) -> Result<Capability, CapabilityParseError> {
    let normalized = value.trim();
    if normalized.is_empty() {
        return Err(CapabilityParseError::Empty);
    }
    match normalized {
        CAPABILITY_ADMIN => Ok(Capability::Admin),
        CAPABILITY_KIOSK => Ok(Capability::Kiosk),
        CAPABILITY_ANONYMOUS => Ok(Capability::Anonymous),
        other => Err(CapabilityParseError::Unsupported(other.to_string())),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CapabilityParseError {
    Empty,
    Unsupported(String),
}

impl Display for CapabilityParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "capability value must not be empty"),
            Self::Unsupported(value) => write!(f, "capability is unsupported: {value}"),
        }
    }
}

impl Error for CapabilityParseError {}

/// A mutation was attempted without the required capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessDenied {
    pub capability: Capability,
    pub mutation: Mutation,
}

impl Display for AccessDenied {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "capability `{}` may not {}",
            self.capability.as_str(),
            self.mutation.as_str()
        )
    }
}

impl Error for AccessDenied {}

#[cfg(test)]
mod tests {
    use super::{parse_capability, Capability, CapabilityParseError, Mutation};

    const ALL_MUTATIONS: [Mutation; 8] = [
        Mutation::AddCategory,
        Mutation::DeleteCategory,
        Mutation::AddPerson,
        Mutation::DeletePerson,
        Mutation::InitializeMonth,
        Mutation::SetStatus,
        Mutation::BulkSetStatus,
        Mutation::ResetMonth,
    ];

    #[test]
    fn admin_may_perform_every_mutation() {
        for mutation in ALL_MUTATIONS {
            assert!(Capability::Admin.allows(mutation), "{}", mutation.as_str());
        }
    }

    #[test]
    fn anonymous_is_denied_everything() {
        for mutation in ALL_MUTATIONS {
            let denied = Capability::Anonymous
                .require(mutation)
                .expect_err("anonymous must be denied");
            assert_eq!(denied.mutation, mutation);
        }
    }

    #[test]
    fn kiosk_may_only_edit_single_statuses_and_open_the_month() {
        let allowed: Vec<_> = ALL_MUTATIONS
            .into_iter()
            .filter(|mutation| Capability::Kiosk.allows(*mutation))
            .collect();
        assert_eq!(allowed, vec![Mutation::InitializeMonth, Mutation::SetStatus]);
    }

    #[test]
    fn from_session_maps_auth_boundary_flag() {
        assert_eq!(Capability::from_session(true), Capability::Admin);
        assert_eq!(Capability::from_session(false), Capability::Anonymous);
    }

    #[test]
    fn parses_known_capabilities_and_rejects_others() {
        assert_eq!(parse_capability(" kiosk ").unwrap(), Capability::Kiosk);
        assert_eq!(parse_capability("").unwrap_err(), CapabilityParseError::Empty);
        assert_eq!(
            parse_capability("Admin").unwrap_err(),
            CapabilityParseError::Unsupported("Admin".to_string())
        );
    }
}
