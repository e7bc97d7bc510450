//! Ownership references and the catalogue of owned collections.
//!
//! Every non-root entity points at exactly one owner through a
//! `(reference_type, reference_id)` pair. Storage engines index every
//! collection on that pair so that "delete everything owned by X" is a
//! single bulk call per collection.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::KeelError;

/// Kind of entity that can own records in other collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReferenceType {
    Organization,
    Environment,
    Api,
    Application,
    Group,
    Plan,
    Page,
    Rating,
    User,
    Integration,
}

impl ReferenceType {
    pub const ALL: &'static [ReferenceType] = &[
        ReferenceType::Organization,
        ReferenceType::Environment,
        ReferenceType::Api,
        ReferenceType::Application,
        ReferenceType::Group,
        ReferenceType::Plan,
        ReferenceType::Page,
        ReferenceType::Rating,
        ReferenceType::User,
        ReferenceType::Integration,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Organization => "ORGANIZATION",
            Self::Environment => "ENVIRONMENT",
            Self::Api => "API",
            Self::Application => "APPLICATION",
            Self::Group => "GROUP",
            Self::Plan => "PLAN",
            Self::Page => "PAGE",
            Self::Rating => "RATING",
            Self::User => "USER",
            Self::Integration => "INTEGRATION",
        }
    }
}

impl fmt::Display for ReferenceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReferenceType {
    type Err = KeelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| KeelError::Validation {
                message: format!("unknown reference type: {s}"),
            })
    }
}

/// Pointer from an owned record to its owner.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Reference {
    pub reference_type: ReferenceType,
    pub reference_id: String,
}

impl Reference {
    pub fn new(reference_type: ReferenceType, reference_id: impl Into<String>) -> Self {
        Self {
            reference_type,
            reference_id: reference_id.into(),
        }
    }

    pub fn organization(id: impl Into<String>) -> Self {
        Self::new(ReferenceType::Organization, id)
    }

    pub fn environment(id: impl Into<String>) -> Self {
        Self::new(ReferenceType::Environment, id)
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.reference_type, self.reference_id)
    }
}

/// Every independently stored collection an aggregate can own.
///
/// The first six have dedicated repositories with richer models; the rest
/// are handled uniformly as [`OwnedRecord`](super::record::OwnedRecord)s.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    Environment,
    User,
    Role,
    Membership,
    Token,
    AccessPoint,
    Alert,
    Api,
    ApiCategoryOrder,
    ApiHeader,
    ApiKey,
    ApiQualityRule,
    Application,
    AsyncJob,
    Audit,
    Category,
    Command,
    CustomUserField,
    Dashboard,
    Dictionary,
    Entrypoint,
    Event,
    Flow,
    GenericNotificationConfig,
    Group,
    IdentityProvider,
    IdentityProviderActivation,
    Integration,
    Invitation,
    Media,
    Metadata,
    NotificationTemplate,
    Page,
    PageRevision,
    Parameter,
    Plan,
    PortalMenuLink,
    PortalNotificationConfig,
    Rating,
    RatingAnswer,
    ScoringReport,
    ScoringRuleset,
    SharedPolicyGroup,
    SharedPolicyGroupHistory,
    Subscription,
    Tag,
    Tenant,
    Theme,
    Workflow,
}

impl Collection {
    /// Collections backed by a dedicated repository.
    pub const TYPED: &'static [Collection] = &[
        Collection::Environment,
        Collection::User,
        Collection::Role,
        Collection::Membership,
        Collection::Token,
        Collection::AccessPoint,
    ];

    /// Collections stored as generic owned records.
    pub const GENERIC: &'static [Collection] = &[
        Collection::Alert,
        Collection::Api,
        Collection::ApiCategoryOrder,
        Collection::ApiHeader,
        Collection::ApiKey,
        Collection::ApiQualityRule,
        Collection::Application,
        Collection::AsyncJob,
        Collection::Audit,
        Collection::Category,
        Collection::Command,
        Collection::CustomUserField,
        Collection::Dashboard,
        Collection::Dictionary,
        Collection::Entrypoint,
        Collection::Event,
        Collection::Flow,
        Collection::GenericNotificationConfig,
        Collection::Group,
        Collection::IdentityProvider,
        Collection::IdentityProviderActivation,
        Collection::Integration,
        Collection::Invitation,
        Collection::Media,
        Collection::Metadata,
        Collection::NotificationTemplate,
        Collection::Page,
        Collection::PageRevision,
        Collection::Parameter,
        Collection::Plan,
        Collection::PortalMenuLink,
        Collection::PortalNotificationConfig,
        Collection::Rating,
        Collection::RatingAnswer,
        Collection::ScoringReport,
        Collection::ScoringRuleset,
        Collection::SharedPolicyGroup,
        Collection::SharedPolicyGroupHistory,
        Collection::Subscription,
        Collection::Tag,
        Collection::Tenant,
        Collection::Theme,
        Collection::Workflow,
    ];

    /// Storage table name.
    pub fn table(&self) -> &'static str {
        match self {
            Self::Environment => "environment",
            Self::User => "user",
            Self::Role => "role",
            Self::Membership => "membership",
            Self::Token => "token",
            Self::AccessPoint => "access_point",
            Self::Alert => "alert",
            Self::Api => "api",
            Self::ApiCategoryOrder => "api_category_order",
            Self::ApiHeader => "api_header",
            Self::ApiKey => "api_key",
            Self::ApiQualityRule => "api_quality_rule",
            Self::Application => "application",
            Self::AsyncJob => "async_job",
            Self::Audit => "audit",
            Self::Category => "category",
            Self::Command => "command",
            Self::CustomUserField => "custom_user_field",
            Self::Dashboard => "dashboard",
            Self::Dictionary => "dictionary",
            Self::Entrypoint => "entrypoint",
            Self::Event => "event",
            Self::Flow => "flow",
            Self::GenericNotificationConfig => "generic_notification_config",
            Self::Group => "group",
            Self::IdentityProvider => "identity_provider",
            Self::IdentityProviderActivation => "identity_provider_activation",
            Self::Integration => "integration",
            Self::Invitation => "invitation",
            Self::Media => "media",
            Self::Metadata => "metadata",
            Self::NotificationTemplate => "notification_template",
            Self::Page => "page",
            Self::PageRevision => "page_revision",
            Self::Parameter => "parameter",
            Self::Plan => "plan",
            Self::PortalMenuLink => "portal_menu_link",
            Self::PortalNotificationConfig => "portal_notification_config",
            Self::Rating => "rating",
            Self::RatingAnswer => "rating_answer",
            Self::ScoringReport => "scoring_report",
            Self::ScoringRuleset => "scoring_ruleset",
            Self::SharedPolicyGroup => "shared_policy_group",
            Self::SharedPolicyGroupHistory => "shared_policy_group_history",
            Self::Subscription => "subscription",
            Self::Tag => "tag",
            Self::Tenant => "tenant",
            Self::Theme => "theme",
            Self::Workflow => "workflow",
        }
    }

    pub fn is_typed(&self) -> bool {
        Self::TYPED.contains(self)
    }

    /// The reference type a record of this collection becomes when it owns
    /// records of its own.
    pub fn as_owner(&self) -> Option<ReferenceType> {
        match self {
            Self::Environment => Some(ReferenceType::Environment),
            Self::Api => Some(ReferenceType::Api),
            Self::Application => Some(ReferenceType::Application),
            Self::Group => Some(ReferenceType::Group),
            Self::Plan => Some(ReferenceType::Plan),
            Self::Page => Some(ReferenceType::Page),
            Self::Rating => Some(ReferenceType::Rating),
            Self::User => Some(ReferenceType::User),
            Self::Integration => Some(ReferenceType::Integration),
            _ => None,
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table())
    }
}
