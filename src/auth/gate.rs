use crate::errors::AppError;
use crate::models::user::Role;

use super::Principal;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    Login,
    ManageEmployees,
    ManageProjects,
    ManageProfile,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Denial {
    NotAuthenticated,
    AccessDenied(&'static str),
}

impl From<Denial> for AppError {
    fn from(denial: Denial) -> Self {
        match denial {
            Denial::NotAuthenticated => AppError::Unauthenticated("Not authenticated".to_string()),
            Denial::AccessDenied(reason) => AppError::Forbidden(reason.to_string()),
        }
    }
}

/// Role policy. Employee accounts can register but are refused at login.
pub fn permits(role: Role, capability: Capability) -> bool {
    match capability {
        Capability::Login => match role {
            Role::Admin | Role::SuperAdmin | Role::Client => true,
            Role::Employee => false,
        },
        Capability::ManageEmployees => match role {
            Role::Admin | Role::SuperAdmin => true,
            Role::Employee | Role::Client => false,
        },
        Capability::ManageProjects | Capability::ManageProfile => match role {
            Role::Admin | Role::SuperAdmin | Role::Employee | Role::Client => true,
        },
    }
}

fn denial_reason(capability: Capability) -> &'static str {
    match capability {
        Capability::Login => "Access denied. Only admin accounts can login.",
        Capability::ManageEmployees => "Access denied. Admin privileges required.",
        Capability::ManageProjects | Capability::ManageProfile => "Access denied.",
    }
}

pub fn authorize(principal: Option<&Principal>, capability: Capability) -> Result<(), Denial> {
    let principal = principal.ok_or(Denial::NotAuthenticated)?;
    check_role(principal.user.role, capability)
}

pub fn check_role(role: Role, capability: Capability) -> Result<(), Denial> {
    if permits(role, capability) {
        Ok(())
    } else {
        Err(Denial::AccessDenied(denial_reason(capability)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::User;
    use chrono::Utc;

    fn principal(role: Role) -> Principal {
        let now = Utc::now();
        Principal {
            user: User {
                id: 1,
                name: "P".into(),
                email: "p@x.io".into(),
                password: "hash".into(),
                role,
                avatar: None,
                created_at: now,
                updated_at: now,
            },
            session_token: "t".into(),
        }
    }

    #[test]
    fn unauthenticated_is_rejected_for_everything() {
        for cap in [
            Capability::Login,
            Capability::ManageEmployees,
            Capability::ManageProjects,
            Capability::ManageProfile,
        ] {
            assert_eq!(authorize(None, cap), Err(Denial::NotAuthenticated));
        }
    }

    #[test]
    fn employee_role_cannot_login() {
        assert_eq!(
            check_role(Role::Employee, Capability::Login),
            Err(Denial::AccessDenied("Access denied. Only admin accounts can login."))
        );
        for role in [Role::Admin, Role::SuperAdmin, Role::Client] {
            assert!(check_role(role, Capability::Login).is_ok());
        }
    }

    #[test]
    fn only_admins_manage_employees() {
        assert!(authorize(Some(&principal(Role::Admin)), Capability::ManageEmployees).is_ok());
        assert!(authorize(Some(&principal(Role::SuperAdmin)), Capability::ManageEmployees).is_ok());
        assert_eq!(
            authorize(Some(&principal(Role::Client)), Capability::ManageEmployees),
            Err(Denial::AccessDenied("Access denied. Admin privileges required."))
        );
        assert!(authorize(Some(&principal(Role::Employee)), Capability::ManageEmployees).is_err());
    }

    #[test]
    fn any_authenticated_role_manages_projects() {
        for role in [Role::Admin, Role::SuperAdmin, Role::Employee, Role::Client] {
            assert!(authorize(Some(&principal(role)), Capability::ManageProjects).is_ok());
        }
    }
}
