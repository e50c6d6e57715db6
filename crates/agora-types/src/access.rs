//! Ownership decisions shared by the repositories and the HTTP layer.

/// Outcome of checking a subject against the owner of a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Allow,
    Deny,
}

impl Access {
    pub fn is_allowed(self) -> bool {
        matches!(self, Access::Allow)
    }
}

/// A subject may mutate a row only when it is the row's owner.
pub fn authorize(subject_id: i64, owner_id: i64) -> Access {
    if subject_id == owner_id {
        Access::Allow
    } else {
        Access::Deny
    }
}
