//! Rule table entries.
//!
//! Each rule binds an effect and an action to a predicate over resource
//! descriptors. The table is fixed once an ability is built; predicates
//! capture the subject's derived facts by value, so a rule never reads
//! shared state.

use serde::{Deserialize, Serialize};

use crate::action::Action;
use crate::resource::Resource;

/// Predicate over the queried resource descriptor.
pub type Predicate = Box<dyn Fn(&Resource) -> bool + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Effect {
    Allow,
    Deny,
}

/// One entry in the rule table.
///
/// The id is a stable token identifying the rule for audit logs and
/// decision explanations (e.g. `"org.admin.read_analytics"`).
pub struct Rule {
    id: &'static str,
    effect: Effect,
    action: Action,
    predicate: Predicate,
}

impl Rule {
    pub fn allow(
        id: &'static str,
        action: Action,
        predicate: impl Fn(&Resource) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            id,
            effect: Effect::Allow,
            action,
            predicate: Box::new(predicate),
        }
    }

    pub fn deny(
        id: &'static str,
        action: Action,
        predicate: impl Fn(&Resource) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            id,
            effect: Effect::Deny,
            action,
            predicate: Box::new(predicate),
        }
    }

    pub fn id(&self) -> &'static str {
        self.id
    }

    pub fn effect(&self) -> Effect {
        self.effect
    }

    pub fn matches(&self, action: Action, resource: &Resource) -> bool {
        action.covered_by(self.action) && (self.predicate)(resource)
    }
}

impl core::fmt::Debug for Rule {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Rule")
            .field("id", &self.id)
            .field("effect", &self.effect)
            .field("action", &self.action)
            .finish_non_exhaustive()
    }
}
