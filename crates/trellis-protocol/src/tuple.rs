//! Relationship tuples evaluated by the policy engine.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Build a namespaced `"user:<id>"` reference.
pub fn user_ref(id: &str) -> String {
    format!("user:{id}")
}

/// Build a namespaced `"<type>:<id>"` object reference.
pub fn object_ref(object_type: &str, id: &str) -> String {
    format!("{object_type}:{id}")
}

/// A subject-relation-object assertion submitted to the policy engine.
///
/// `user` and `object` are namespaced `"type:id"` strings; `user:*` is a
/// valid wildcard subject. Tuples are built fresh for every check and
/// dropped immediately after; nothing caches them locally.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AccessTuple {
    /// Subject reference, e.g. `user:alice`.
    pub user: String,
    /// Relation name, e.g. `can_buy`.
    pub relation: String,
    /// Object reference, e.g. `asset:nvda`.
    pub object: String,
    /// Optional condition with contextual attributes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<TupleCondition>,
}

impl AccessTuple {
    /// Build an unconditioned tuple.
    pub fn new(
        user: impl Into<String>,
        relation: impl Into<String>,
        object: impl Into<String>,
    ) -> Self {
        Self {
            user: user.into(),
            relation: relation.into(),
            object: object.into(),
            condition: None,
        }
    }
}

impl fmt::Display for AccessTuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}@{}", self.user, self.relation, self.object)
    }
}

/// Named condition attached to a tuple, carrying contextual attributes
/// consumed by conditional policy rules (e.g. `current_time`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TupleCondition {
    /// Condition name as declared in the authorization model.
    pub name: String,
    /// Attribute map evaluated by the condition.
    #[serde(default)]
    pub context: Map<String, Value>,
}

/// Input to the permission predicate: a tuple whose subject may still be
/// implicit (`user: None` resolves the current session subject).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationSpec {
    /// Explicit subject reference, or `None` to use the session subject.
    pub user: Option<String>,
    /// Relation name to check.
    pub relation: String,
    /// Object reference to check against.
    pub object: String,
    /// Optional condition forwarded onto the built tuple.
    pub condition: Option<TupleCondition>,
}

impl RelationSpec {
    /// Spec for the current session subject.
    pub fn new(relation: impl Into<String>, object: impl Into<String>) -> Self {
        Self {
            user: None,
            relation: relation.into(),
            object: object.into(),
            condition: None,
        }
    }

    /// Pin an explicit subject reference.
    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    /// Attach a named condition with contextual attributes.
    pub fn with_condition(mut self, name: impl Into<String>, context: Map<String, Value>) -> Self {
        self.condition = Some(TupleCondition {
            name: name.into(),
            context,
        });
        self
    }

    /// Materialize the tuple for a resolved subject.
    pub fn into_tuple(self, user: String) -> AccessTuple {
        AccessTuple {
            user,
            relation: self.relation,
            object: self.object,
            condition: self.condition,
        }
    }
}
