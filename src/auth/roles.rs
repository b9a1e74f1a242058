//! Role predicates.
//!
//! Permission checks are plain functions of the immutable [`UserRole`] value;
//! they never need the database or the user row.

use crate::entities::user::UserRole;

impl UserRole {
    pub fn is_client(self) -> bool {
        self == UserRole::Client
    }

    pub fn is_employee(self) -> bool {
        self == UserRole::Employee
    }

    pub fn is_admin(self) -> bool {
        self == UserRole::Admin
    }

    /// Employees and admins.
    pub fn is_staff(self) -> bool {
        self.is_employee() || self.is_admin()
    }

    pub fn can_manage_users(self) -> bool {
        self.is_staff()
    }

    pub fn can_manage_vehicles(self) -> bool {
        self.is_staff()
    }

    /// Admins may edit anyone; employees may edit clients only.
    pub fn can_modify_user(self, target: UserRole) -> bool {
        self.is_admin() || (self.is_employee() && target.is_client())
    }

    pub fn can_delete_user(self, _target: UserRole) -> bool {
        self.is_admin()
    }

    pub fn can_change_role(self) -> bool {
        self.is_admin()
    }
}
