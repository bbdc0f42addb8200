//! Account classification of a visiting user.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::repository::{BusinessProfileRepository, RepositoryError};

/// Who is looking at the catalogue. Exactly one applies per request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountClassification {
    Guest,
    Individual,
    BusinessUnverified,
    BusinessVerified,
}

impl AccountClassification {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Guest => "guest",
            Self::Individual => "individual",
            Self::BusinessUnverified => "business_unverified",
            Self::BusinessVerified => "business_verified",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "guest" => Some(Self::Guest),
            "individual" => Some(Self::Individual),
            "business_unverified" => Some(Self::BusinessUnverified),
            "business_verified" => Some(Self::BusinessVerified),
            _ => None,
        }
    }
}

impl fmt::Display for AccountClassification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    #[default]
    Pending,
    Verified,
    Rejected,
}

impl VerificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Verified => "verified",
            Self::Rejected => "rejected",
        }
    }

    /// Unknown values are treated as pending.
    pub fn parse(value: &str) -> Self {
        match value {
            "verified" => Self::Verified,
            "rejected" => Self::Rejected,
            _ => Self::Pending,
        }
    }
}

/// Business profile linked to an authenticated user.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusinessProfile {
    pub user_id: Uuid,
    pub company_name: String,
    pub gstin: Option<String>,
    pub verification_status: VerificationStatus,
}

/// Derives the classification from the session user and their business profile, if any.
pub fn classify(user_id: Option<Uuid>, profile: Option<&BusinessProfile>) -> AccountClassification {
    match (user_id, profile) {
        (None, _) => AccountClassification::Guest,
        (Some(_), None) => AccountClassification::Individual,
        (Some(_), Some(p)) if p.verification_status == VerificationStatus::Verified => {
            AccountClassification::BusinessVerified
        }
        (Some(_), Some(_)) => AccountClassification::BusinessUnverified,
    }
}

/// Resolves the classification of the current caller.
#[async_trait]
pub trait ClassificationProvider: Send + Sync {
    async fn classify(&self, user_id: Option<Uuid>) -> Result<AccountClassification, RepositoryError>;
}

/// Classifies callers by looking up their business profile.
pub struct ProfileClassificationProvider {
    profiles: Arc<dyn BusinessProfileRepository>,
}

impl ProfileClassificationProvider {
    pub fn new(profiles: Arc<dyn BusinessProfileRepository>) -> Self { Self { profiles } }
}

#[async_trait]
impl ClassificationProvider for ProfileClassificationProvider {
    async fn classify(&self, user_id: Option<Uuid>) -> Result<AccountClassification, RepositoryError> {
        let Some(id) = user_id else { return Ok(AccountClassification::Guest) };
        let profile = self.profiles.find_by_user(id).await?;
        Ok(classify(Some(id), profile.as_ref()))
    }
}
