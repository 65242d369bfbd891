use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::nullable;
use crate::errors::DomainError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub i64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DepartmentId(pub i64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VendorId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for DepartmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for VendorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Role a user acts as once selected. Unrecognized wire values decode to `Unknown`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Requester,
    Manager,
    Finance,
    Legal,
    Admin,
    #[default]
    #[serde(other)]
    Unknown,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Requester => "requester",
            Self::Manager => "manager",
            Self::Finance => "finance",
            Self::Legal => "legal",
            Self::Admin => "admin",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "requester" => Ok(Self::Requester),
            "manager" => Ok(Self::Manager),
            "finance" => Ok(Self::Finance),
            "legal" => Ok(Self::Legal),
            "admin" => Ok(Self::Admin),
            other => Err(DomainError::UnknownValue { kind: "role", value: other.to_owned() }),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    #[serde(default, deserialize_with = "nullable::or_default")]
    pub name: String,
    #[serde(default, deserialize_with = "nullable::or_default")]
    pub email: String,
    #[serde(default, deserialize_with = "nullable::or_default")]
    pub role: Role,
    #[serde(default)]
    pub department_id: Option<DepartmentId>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Department {
    pub id: DepartmentId,
    #[serde(default, deserialize_with = "nullable::or_default")]
    pub name: String,
    #[serde(default)]
    pub manager_id: Option<UserId>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vendor {
    pub id: VendorId,
    #[serde(default, deserialize_with = "nullable::or_default")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub is_new_vendor: bool,
}

/// SQLite booleans arrive as `0`/`1`; JSON clients send `true`/`false`.
fn lenient_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Int(i64),
    }

    Ok(match Option::<Flag>::deserialize(deserializer)? {
        Some(Flag::Bool(value)) => value,
        Some(Flag::Int(value)) => value != 0,
        None => false,
    })
}

/// Reference data every dashboard needs to resolve ids into names.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Directory {
    pub users: Vec<User>,
    pub departments: Vec<Department>,
    pub vendors: Vec<Vendor>,
}

impl Directory {
    pub fn user(&self, id: UserId) -> Option<&User> {
        self.users.iter().find(|user| user.id == id)
    }

    pub fn vendor(&self, id: VendorId) -> Option<&Vendor> {
        self.vendors.iter().find(|vendor| vendor.id == id)
    }

    pub fn department(&self, id: DepartmentId) -> Option<&Department> {
        self.departments.iter().find(|department| department.id == id)
    }

    /// First user holding `role`, in directory order.
    pub fn first_with_role(&self, role: Role) -> Option<&User> {
        self.users.iter().find(|user| user.role == role)
    }

    pub fn department_manager(&self, id: DepartmentId) -> Option<&User> {
        let manager_id = self.department(id)?.manager_id?;
        self.user(manager_id)
    }
}

#[cfg(test)]
mod tests {
    use super::{Role, User, Vendor};

    #[test]
    fn unknown_roles_decode_without_failing() {
        let user: User = serde_json::from_str(
            r#"{"id": 9, "name": "Pat", "email": "pat@company.com", "role": "auditor"}"#,
        )
        .expect("user should decode");

        assert_eq!(user.role, Role::Unknown);
        assert_eq!(user.department_id, None);
    }

    #[test]
    fn vendor_novelty_accepts_sqlite_integers() {
        let vendor: Vendor =
            serde_json::from_str(r#"{"id": 1, "name": "Snyk", "is_new_vendor": 1}"#)
                .expect("vendor should decode");
        assert!(vendor.is_new_vendor);

        let vendor: Vendor = serde_json::from_str(r#"{"id": 3, "name": "GitHub"}"#)
            .expect("vendor without flag should decode");
        assert!(!vendor.is_new_vendor);
    }

    #[test]
    fn role_parsing_rejects_unknown_values() {
        assert_eq!("Finance".parse::<Role>().ok(), Some(Role::Finance));
        assert!("auditor".parse::<Role>().is_err());
    }
}
