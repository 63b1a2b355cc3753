use serde::Deserialize;
use tracing::debug;
use wiki::UserReference;
use wiki::reference::DocumentReference;

use crate::services::AuthorizationChecker;

/// One allow or deny rule.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AccessRule {
    /// User the rule applies to; every user when absent.
    #[serde(default)]
    pub user: Option<String>,
    /// `*`, a space pattern such as `Private.*`, or a document reference.
    /// Targets without a wiki part match documents of any wiki.
    pub target: String,
    pub allow: bool,
}

impl AccessRule {
    fn applies_to(&self, user: &UserReference, reference: &DocumentReference) -> bool {
        if self.user.as_deref().is_some_and(|u| u != user.as_str()) {
            return false;
        }
        if self.target == "*" {
            return true;
        }

        let serialized = reference.to_string();
        let subject = if self.target.contains(':') {
            serialized.as_str()
        } else {
            serialized.split_once(':').map(|(_, local)| local).unwrap_or(&serialized)
        };
        match self.target.strip_suffix('*') {
            Some(prefix) => subject.starts_with(prefix),
            None => subject == self.target,
        }
    }
}

/// View rights from an ordered rule list: the first matching rule decides,
/// documents no rule matches are visible.
#[derive(Debug, Clone, Default)]
pub struct AccessRules {
    rules: Vec<AccessRule>,
}

impl AccessRules {
    pub fn new(rules: Vec<AccessRule>) -> Self {
        AccessRules { rules }
    }

    pub fn allow_all() -> Self {
        Self::default()
    }

    pub fn deny(mut self, user: Option<&str>, target: &str) -> Self {
        self.rules.push(AccessRule {
            user: user.map(str::to_string),
            target: target.to_string(),
            allow: false,
        });
        self
    }

    pub fn allow(mut self, user: Option<&str>, target: &str) -> Self {
        self.rules.push(AccessRule {
            user: user.map(str::to_string),
            target: target.to_string(),
            allow: true,
        });
        self
    }

    pub fn rules(&self) -> &[AccessRule] {
        &self.rules
    }
}

impl AuthorizationChecker for AccessRules {
    fn has_view_access(&self, user: &UserReference, reference: &DocumentReference) -> bool {
        let decision = self
            .rules
            .iter()
            .find(|rule| rule.applies_to(user, reference))
            .map(|rule| rule.allow)
            .unwrap_or(true);
        if !decision {
            debug!(%user, document = %reference, "view denied");
        }
        decision
    }
}
