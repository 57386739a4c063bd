//! Determinism Rules
//!
//! A rule bans a set of fully-qualified API prefixes inside orchestrator
//! code. Rules are stateless; the engine evaluates them per call site.

use crate::domain::diagnostic::Severity;
use crate::domain::symbol::path_starts_with;
use serde::{Deserialize, Serialize};

pub const GUID_RULE_ID: &str = "DF0102";
pub const TIMER_RULE_ID: &str = "DF0103";
pub const UNDETERMINED_VERSION_ID: &str = "DF0001";

pub const DETERMINISTIC_MESSAGE: &str =
    "'{symbol}' violates the orchestrator deterministic code constraint.";
pub const DETERMINISTIC_DESCRIPTION: &str = "Orchestrator functions are replayed to rebuild their state and must produce the same result every time. Move the call into a step, or use the deterministic API offered by the orchestration context.";

const LEGACY_TIMER_MESSAGE: &str = "'{symbol}' violates the orchestrator deterministic code constraint. Use 'ctx.create_timer' to schedule a durable timer instead.";
const CURRENT_TIMER_MESSAGE: &str = "'{symbol}' violates the orchestrator deterministic code constraint. Use 'ctx.wait' to schedule a durable timer instead.";

/// Which runtime generation a message is written for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RuleVariant {
    Legacy,
    Current,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageTemplate {
    Uniform(String),
    Versioned { legacy: String, current: String },
}

impl MessageTemplate {
    /// `None` when the template is versioned and no variant is known.
    pub fn select(&self, variant: Option<RuleVariant>) -> Option<&str> {
        match (self, variant) {
            (MessageTemplate::Uniform(text), _) => Some(text),
            (MessageTemplate::Versioned { legacy, .. }, Some(RuleVariant::Legacy)) => Some(legacy),
            (MessageTemplate::Versioned { current, .. }, Some(RuleVariant::Current)) => {
                Some(current)
            }
            (MessageTemplate::Versioned { .. }, None) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    pub id: String,
    pub title: String,
    pub description: String,
    pub banned_prefixes: Vec<String>,
    pub message: MessageTemplate,
    pub severity: Severity,
}

impl Rule {
    pub fn new<S: AsRef<str>>(
        id: impl Into<String>,
        title: impl Into<String>,
        banned_prefixes: &[S],
        message: MessageTemplate,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: DETERMINISTIC_DESCRIPTION.to_string(),
            banned_prefixes: banned_prefixes
                .iter()
                .map(|p| p.as_ref().to_string())
                .collect(),
            message,
            severity: Severity::Warning,
        }
    }

    pub fn guid() -> Self {
        Rule::new(
            GUID_RULE_ID,
            "Random UUID generation is not allowed in orchestrator functions",
            &[
                "uuid::Uuid::new_v4",
                "uuid::Uuid::now_v7",
                "uuid::Uuid::now_v6",
                "uuid::Uuid::now_v1",
            ],
            MessageTemplate::Uniform(DETERMINISTIC_MESSAGE.to_string()),
        )
    }

    pub fn timer() -> Self {
        Rule::new(
            TIMER_RULE_ID,
            "Thread sleeps and task delays are not allowed in orchestrator functions",
            &[
                "tokio::time::sleep",
                "tokio::time::sleep_until",
                "async_std::task::sleep",
                "std::thread::sleep",
            ],
            MessageTemplate::Versioned {
                legacy: LEGACY_TIMER_MESSAGE.to_string(),
                current: CURRENT_TIMER_MESSAGE.to_string(),
            },
        )
    }

    /// The banned prefix `symbol` falls under, if any.
    pub fn matches(&self, symbol: &str) -> Option<&str> {
        self.banned_prefixes
            .iter()
            .find(|prefix| path_starts_with(symbol, prefix))
            .map(|p| p.as_str())
    }

    pub fn requires_version(&self) -> bool {
        matches!(self.message, MessageTemplate::Versioned { .. })
    }

    pub fn format_message(&self, variant: Option<RuleVariant>, symbol: &str) -> Option<String> {
        self.message
            .select(variant)
            .map(|template| template.replace("{symbol}", symbol))
    }
}

/// Rules registered for a run, in registration order.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl RuleSet {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn builtin() -> Self {
        Self::empty().with_rule(Rule::guid()).with_rule(Rule::timer())
    }

    /// Later registrations with the same id replace earlier ones.
    pub fn with_rule(mut self, rule: Rule) -> Self {
        self.register(rule);
        self
    }

    pub fn register(&mut self, rule: Rule) {
        if let Some(existing) = self.rules.iter_mut().find(|r| r.id == rule.id) {
            *existing = rule;
        } else {
            self.rules.push(rule);
        }
    }

    pub fn disable(&mut self, ids: &[String]) {
        self.rules.retain(|r| !ids.contains(&r.id));
    }

    pub fn get(&self, id: &str) -> Option<&Rule> {
        self.rules.iter().find(|r| r.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn any_requires_version(&self) -> bool {
        self.rules.iter().any(Rule::requires_version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guid_rule_matches_only_uuid_constructors() {
        let rule = Rule::guid();
        assert_eq!(rule.matches("uuid::Uuid::new_v4"), Some("uuid::Uuid::new_v4"));
        assert_eq!(rule.matches("uuid::Uuid::new_v5"), None);
        assert_eq!(rule.matches("my_app::ids::new_v4"), None);
    }

    #[test]
    fn test_timer_messages_differ_only_by_variant() {
        let rule = Rule::timer();
        let legacy = rule
            .format_message(Some(RuleVariant::Legacy), "std::thread::sleep")
            .unwrap();
        let current = rule
            .format_message(Some(RuleVariant::Current), "std::thread::sleep")
            .unwrap();
        assert!(legacy.contains("ctx.create_timer"));
        assert!(current.contains("ctx.wait"));
        assert!(legacy.starts_with("'std::thread::sleep' violates"));
        assert_eq!(rule.format_message(None, "std::thread::sleep"), None);
    }

    #[test]
    fn test_uniform_message_ignores_variant() {
        let rule = Rule::guid();
        assert!(!rule.requires_version());
        assert_eq!(
            rule.format_message(None, "uuid::Uuid::new_v4"),
            rule.format_message(Some(RuleVariant::Legacy), "uuid::Uuid::new_v4")
        );
    }

    #[test]
    fn test_registry_replace_and_disable() {
        let mut rules = RuleSet::builtin();
        assert_eq!(rules.len(), 2);
        assert!(rules.any_requires_version());

        rules.register(Rule::new(
            GUID_RULE_ID,
            "custom",
            &["uuid::Uuid"],
            MessageTemplate::Uniform("{symbol}".to_string()),
        ));
        assert_eq!(rules.len(), 2);
        assert_eq!(rules.get(GUID_RULE_ID).map(|r| r.title.as_str()), Some("custom"));

        rules.disable(&[TIMER_RULE_ID.to_string()]);
        assert!(rules.get(TIMER_RULE_ID).is_none());
        assert!(!rules.any_requires_version());
    }
}
