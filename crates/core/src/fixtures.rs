//! Deterministic demo directory: one requester, a manager, finance and legal approvers, and
//! an admin, with a mix of new and established vendors.

use crate::domain::directory::{
    Department, DepartmentId, Directory, Role, User, UserId, Vendor, VendorId,
};

pub const REQUESTER: UserId = UserId(1);
pub const MANAGER: UserId = UserId(2);
pub const FINANCE: UserId = UserId(3);
pub const LEGAL: UserId = UserId(4);
pub const ADMIN: UserId = UserId(5);

pub const ENGINEERING: DepartmentId = DepartmentId(1);

/// A vendor flagged as new, so requests against it route through legal.
pub const NEW_VENDOR: VendorId = VendorId(1);
/// An established vendor; no legal step.
pub const EXISTING_VENDOR: VendorId = VendorId(3);

pub fn demo_directory() -> Directory {
    let users = vec![
        user(REQUESTER, "Alice Chen", "alice@company.com", Role::Requester, Some(1)),
        user(MANAGER, "Bob Smith", "bob@company.com", Role::Manager, Some(1)),
        user(FINANCE, "Fiona Davis", "fiona@company.com", Role::Finance, Some(2)),
        user(LEGAL, "Lily Johnson", "lily@company.com", Role::Legal, Some(3)),
        user(ADMIN, "Admin User", "admin@company.com", Role::Admin, None),
    ];

    let departments = vec![
        Department { id: ENGINEERING, name: "Engineering".to_owned(), manager_id: Some(MANAGER) },
        Department { id: DepartmentId(2), name: "Finance".to_owned(), manager_id: Some(FINANCE) },
        Department { id: DepartmentId(3), name: "Legal".to_owned(), manager_id: Some(LEGAL) },
    ];

    let vendors = [
        ("Snyk", true),
        ("DataDog", true),
        ("GitHub", false),
        ("AWS", false),
        ("Slack", false),
        ("Zoom", false),
    ]
    .into_iter()
    .zip(1_i64..)
    .map(|((name, is_new_vendor), id)| Vendor {
        id: VendorId(id),
        name: name.to_owned(),
        is_new_vendor,
    })
    .collect();

    Directory { users, departments, vendors }
}

fn user(id: UserId, name: &str, email: &str, role: Role, department: Option<i64>) -> User {
    User {
        id,
        name: name.to_owned(),
        email: email.to_owned(),
        role,
        department_id: department.map(DepartmentId),
    }
}
