//! User record and role model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::{Error, Result};

/// Role of an authenticated principal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "aluno")]
    Student,
    #[serde(rename = "professor")]
    Professor,
    #[serde(rename = "admin")]
    Admin,
}

impl Role {
    /// Wire name used by the backend (`userType`)
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Student => "aluno",
            Role::Professor => "professor",
            Role::Admin => "admin",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Role::Student => "Student",
            Role::Professor => "Professor",
            Role::Admin => "Admin",
        };
        f.write_str(label)
    }
}

/// Role-specific attributes, tagged on the wire by `userType`.
///
/// The variant decides which fields exist: a student never carries
/// `subjects` and a professor never carries guardians.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "userType")]
pub enum RoleProfile {
    #[serde(rename = "aluno")]
    Student {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        class: Option<String>,
        #[serde(
            rename = "guardian",
            default,
            deserialize_with = "one_or_many",
            skip_serializing_if = "Vec::is_empty"
        )]
        guardians: Vec<String>,
    },
    #[serde(rename = "professor")]
    Professor {
        #[serde(default)]
        subjects: Vec<String>,
    },
    #[serde(rename = "admin")]
    Admin,
}

impl RoleProfile {
    /// Build a student profile; one or two guardians are required
    pub fn student(class: impl Into<String>, guardians: Vec<String>) -> Result<Self> {
        let guardians: Vec<String> = guardians
            .into_iter()
            .map(|g| g.trim().to_string())
            .filter(|g| !g.is_empty())
            .collect();

        if guardians.is_empty() || guardians.len() > 2 {
            return Err(Error::Invalid(format!(
                "A student needs 1 or 2 guardians, got {}",
                guardians.len()
            )));
        }

        Ok(RoleProfile::Student {
            class: Some(class.into().trim().to_string()),
            guardians,
        })
    }

    /// Build a professor profile from a comma separated subject list
    pub fn professor_from_list(subjects: &str) -> Self {
        RoleProfile::Professor {
            subjects: subjects
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
        }
    }

    pub fn role(&self) -> Role {
        match self {
            RoleProfile::Student { .. } => Role::Student,
            RoleProfile::Professor { .. } => Role::Professor,
            RoleProfile::Admin => Role::Admin,
        }
    }
}

/// Profile of an authenticated principal as returned by the backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    pub email: String,
    pub name: String,
    #[serde(flatten)]
    pub profile: RoleProfile,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub school: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<u32>,
    /// Relative image reference, e.g. `images/avatar.jpg`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_image: Option<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default, deserialize_with = "lenient_timestamp", skip_serializing_if = "Option::is_none")]
    pub last_login: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient_timestamp", skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient_timestamp", skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

fn default_active() -> bool {
    true
}

impl UserRecord {
    pub fn role(&self) -> Role {
        self.profile.role()
    }

    pub fn has_role(&self, roles: &[Role]) -> bool {
        roles.contains(&self.role())
    }

    /// Post authoring is open to professors and admins
    pub fn can_author_posts(&self) -> bool {
        self.has_role(&[Role::Professor, Role::Admin])
    }

    /// User management is admin only
    pub fn can_manage_users(&self) -> bool {
        self.role() == Role::Admin
    }
}

/// Accept either `"name"` or `["a", "b"]` (older records store a single guardian)
fn one_or_many<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match Option::<OneOrMany>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(OneOrMany::One(value)) => vec![value],
        Some(OneOrMany::Many(values)) => values,
    })
}

/// Timestamps arrive as RFC 3339, empty strings, or not at all
fn lenient_timestamp<'de, D>(deserializer: D) -> std::result::Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.and_then(|s| {
        DateTime::parse_from_rfc3339(&s)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }))
}
