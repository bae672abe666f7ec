//! The closed action set.

use serde::{Deserialize, Serialize};

/// What a subject is trying to do to a resource.
///
/// `Manage` is the CRUD wildcard: a manage grant covers read, create,
/// update, destroy and manage queries. It deliberately does **not** cover
/// `Join`, `Participate`, `Access` or `Request` — those are granted (and
/// denied) only by their own rules, so e.g. an organization admin still
/// fails the join-eligibility check for an organization they belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Read,
    Create,
    Update,
    Destroy,
    Manage,
    Join,
    Participate,
    Access,
    Request,
}

impl Action {
    /// Whether a rule granted for `granted` applies to this queried action.
    pub fn covered_by(self, granted: Action) -> bool {
        if self == granted {
            return true;
        }
        granted == Action::Manage
            && matches!(
                self,
                Action::Read | Action::Create | Action::Update | Action::Destroy
            )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Read => "read",
            Action::Create => "create",
            Action::Update => "update",
            Action::Destroy => "destroy",
            Action::Manage => "manage",
            Action::Join => "join",
            Action::Participate => "participate",
            Action::Access => "access",
            Action::Request => "request",
        }
    }
}

impl core::fmt::Display for Action {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}
