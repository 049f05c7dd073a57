/*
 * Responsibility
 * - Onboarding profile の request/response DTO
 * - request は「送られてきた項目だけ」を ProfileChanges に変換する (null/欠落は更新しない)
 * - response は Datastore の row を形式チェックする契約
 */
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::repos::{ProfileChanges, ProfileRow};

/// PUT /v1/onboarding body.
///
/// Every field is optional and `null` means "not provided".
/// `id`, `api_keys`, `created_at`, `updated_at` are not fields here, so serde drops them.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateProfileRequest {
    pub full_name: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub secondary_email: Option<String>,
    pub address: Option<String>,
    pub linkedin_url: Option<String>,
    pub github_username: Option<String>,
    pub skills: Option<Vec<String>>,
    pub career_preferences: Option<Value>,
    pub education: Option<Value>,
    pub onboarding_completed: Option<bool>,
    pub profile_photo_url: Option<String>,
    pub govt_id_url: Option<String>,
}

impl UpdateProfileRequest {
    pub fn validate(&self) -> Result<(), &'static str> {
        if let Some(email) = &self.secondary_email
            && !looks_like_email(email)
        {
            return Err("secondary_email must be a valid email address");
        }
        Ok(())
    }

    /// Only the provided fields, ready to be written.
    pub fn into_changes(self) -> ProfileChanges {
        let mut changes = ProfileChanges::new();

        if let Some(v) = self.full_name {
            changes.set("full_name", v);
        }
        if let Some(v) = self.date_of_birth {
            changes.set("date_of_birth", v.format("%Y-%m-%d").to_string());
        }
        if let Some(v) = self.secondary_email {
            changes.set("secondary_email", v);
        }
        if let Some(v) = self.address {
            changes.set("address", v);
        }
        if let Some(v) = self.linkedin_url {
            changes.set("linkedin_url", v);
        }
        if let Some(v) = self.github_username {
            changes.set("github_username", v);
        }
        if let Some(v) = self.skills {
            changes.set("skills", v);
        }
        if let Some(v) = self.career_preferences {
            changes.set("career_preferences", v);
        }
        if let Some(v) = self.education {
            changes.set("education", v);
        }
        if let Some(v) = self.onboarding_completed {
            changes.set("onboarding_completed", v);
        }
        if let Some(v) = self.profile_photo_url {
            changes.set("profile_photo_url", v);
        }
        if let Some(v) = self.govt_id_url {
            changes.set("govt_id_url", v);
        }

        changes
    }
}

// local@domain.tld, no whitespace
fn looks_like_email(s: &str) -> bool {
    if s.chars().any(char::is_whitespace) {
        return false;
    }
    match s.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain
                    .split_once('.')
                    .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty())
                && !domain.ends_with('.')
        }
        None => false,
    }
}

/// GET/PUT /v1/onboarding response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileResponse {
    pub id: String,
    pub full_name: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub secondary_email: Option<String>,
    pub address: Option<String>,
    pub linkedin_url: Option<String>,
    pub github_username: Option<String>,
    pub skills: Option<Vec<String>>,
    pub career_preferences: Option<Value>,
    pub education: Option<Value>,
    #[serde(default)]
    pub onboarding_completed: bool,
    pub profile_photo_url: Option<String>,
    pub govt_id_url: Option<String>,
    pub api_keys: Option<Value>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl TryFrom<ProfileRow> for ProfileResponse {
    type Error = serde_json::Error;

    fn try_from(row: ProfileRow) -> Result<Self, Self::Error> {
        serde_json::from_value(Value::Object(row))
    }
}
