/*!
 * # Access Policy
 *
 * The one table that decides who may do what. Every guarded route names a
 * `{resource, action}` pair; the caller's role either grants the matching
 * `resource:action` permission, a `resource:*` wildcard, or `*`.
 */

use lazy_static::lazy_static;
use std::collections::HashMap;
use std::fmt;
use tracing::warn;

use super::{AuthError, Subject};
use crate::models::profile::UserType;

/// Caller role, derived from the bearer token and the profile's `user_type`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Guest,
    Client,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Guest => "guest",
            Role::Client => "client",
            Role::Admin => "admin",
        }
    }
}

impl From<UserType> for Role {
    fn from(user_type: UserType) -> Self {
        match user_type {
            UserType::Admin => Role::Admin,
            UserType::Client => Role::Client,
            UserType::Guest => Role::Guest,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    Rates,
    Quotes,
    Tracking,
    PaymentOptions,
    PaymentProofs,
    /// The caller's own profile
    Profile,
    /// Shipments addressed to the caller
    OwnShipments,
    Shipments,
    TrackingEvents,
    Profiles,
    Analytics,
}

impl Resource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Resource::Rates => "rates",
            Resource::Quotes => "quotes",
            Resource::Tracking => "tracking",
            Resource::PaymentOptions => "payment_options",
            Resource::PaymentProofs => "payment_proofs",
            Resource::Profile => "profile",
            Resource::OwnShipments => "own_shipments",
            Resource::Shipments => "shipments",
            Resource::TrackingEvents => "tracking_events",
            Resource::Profiles => "profiles",
            Resource::Analytics => "analytics",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Read,
    List,
    Create,
    Update,
    Delete,
    Review,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Read => "read",
            Action::List => "list",
            Action::Create => "create",
            Action::Update => "update",
            Action::Delete => "delete",
            Action::Review => "review",
        }
    }
}

/// What a guarded route requires
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessRule {
    pub resource: Resource,
    pub action: Action,
}

impl AccessRule {
    pub const fn new(resource: Resource, action: Action) -> Self {
        Self { resource, action }
    }

    pub fn permission(&self) -> String {
        format!("{}:{}", self.resource.as_str(), self.action.as_str())
    }
}

const GUEST_PERMISSIONS: &[&str] = &[
    "rates:create",
    "quotes:create",
    "quotes:read",
    "tracking:read",
    "payment_options:read",
    "payment_proofs:create",
];

const CLIENT_PERMISSIONS: &[&str] = &["profile:*", "own_shipments:read", "own_shipments:list"];

lazy_static! {
    static ref POLICY: HashMap<Role, Vec<&'static str>> = {
        let mut policy = HashMap::new();
        policy.insert(Role::Guest, GUEST_PERMISSIONS.to_vec());
        policy.insert(
            Role::Client,
            GUEST_PERMISSIONS
                .iter()
                .chain(CLIENT_PERMISSIONS)
                .copied()
                .collect(),
        );
        policy.insert(Role::Admin, vec!["*"]);
        policy
    };
}

/// Whether `role` holds the permission `rule` requires
pub fn role_allows(role: Role, rule: AccessRule) -> bool {
    let wanted = rule.permission();
    let wildcard = format!("{}:*", rule.resource.as_str());

    POLICY
        .get(&role)
        .map(|granted| {
            granted
                .iter()
                .any(|p| *p == "*" || *p == wanted || *p == wildcard)
        })
        .unwrap_or(false)
}

/// Evaluates `{subject, resource, action}`.
///
/// Guests that fall outside the policy get 401 so clients know to sign in;
/// signed-in callers get 403.
pub fn authorize(subject: &Subject, rule: AccessRule) -> Result<(), AuthError> {
    if role_allows(subject.role, rule) {
        return Ok(());
    }

    warn!(
        role = %subject.role,
        user_id = ?subject.user_id,
        permission = %rule.permission(),
        "access denied"
    );

    if subject.is_guest() {
        Err(AuthError::MissingAuth)
    } else {
        Err(AuthError::InsufficientPermissions)
    }
}
