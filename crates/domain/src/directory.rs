//! Directory principals and the ranked group-to-role table.

use crate::account::Role;

/// Identity attributes read from the directory during one login
/// attempt. Never persisted; the account row keeps its own copy of
/// the fields it cares about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryPrincipal {
    /// Canonical login name the entry was found under.
    pub login_name: String,
    /// Human-readable name, falling back to the entry's common name.
    pub display_name: String,
    /// Mail attribute if the entry carries one.
    pub email: Option<String>,
    /// Organizational department if present.
    pub department: Option<String>,
    /// Job title if present.
    pub title: Option<String>,
    /// Employee number if present.
    pub employee_number: Option<String>,
    /// Distinguished names of the groups the entry belongs to.
    pub groups: Vec<String>,
}

/// Ranked list of (group common name, role) pairs, evaluated in
/// priority order.
///
/// Membership entries arrive as full distinguished names; matching is
/// on the leading `cn=` component so the table does not have to know
/// where in the tree the groups live. The first table entry matched
/// wins; when nothing matches, the documented default (`Viewer`)
/// applies.
#[derive(Debug, Clone)]
pub struct GroupRoleMap {
    ranked: Vec<(String, Role)>,
    default_role: Role,
}

impl GroupRoleMap {
    /// Creates a mapping from an ordered list of (group common name,
    /// role) pairs. Earlier entries take priority.
    #[must_use]
    pub fn new(ranked: Vec<(String, Role)>, default_role: Role) -> Self {
        Self {
            ranked,
            default_role,
        }
    }

    /// Standard OpMetrics group mapping, most senior group first.
    #[must_use]
    pub fn standard() -> Self {
        Self::new(
            vec![
                ("OPM_Administrators".to_owned(), Role::Administrator),
                ("OPM_Managers".to_owned(), Role::Manager),
                ("OPM_Officers".to_owned(), Role::Officer),
                ("OPM_Viewers".to_owned(), Role::Viewer),
            ],
            Role::Viewer,
        )
    }

    /// Resolves an application role from a group-membership list of
    /// distinguished names.
    #[must_use]
    pub fn resolve(&self, groups: &[String]) -> Role {
        for (group_cn, role) in &self.ranked {
            if groups.iter().any(|member| {
                leading_cn(member).is_some_and(|cn| cn.eq_ignore_ascii_case(group_cn))
            }) {
                return *role;
            }
        }

        self.default_role
    }
}

/// Value of the leading `cn=` component of a distinguished name.
fn leading_cn(dn: &str) -> Option<&str> {
    let rdn = dn.split(',').next()?.trim();
    let (attribute, value) = rdn.split_once('=')?;
    attribute
        .trim()
        .eq_ignore_ascii_case("cn")
        .then(|| value.trim())
}
