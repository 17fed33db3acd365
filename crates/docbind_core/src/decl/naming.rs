// -----------------------------------------------------------------------------
// NamePolicy

/// How declared field names turn into document keys.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum NameStrategy {
    /// Keep the declared name exactly as written.
    #[default]
    Keep,
    /// Replace underscores with hyphens.
    Kebab,
}

/// A final transformation applied after the strategy.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum NameModifier {
    #[default]
    None,
    Lowercase,
    Uppercase,
}

/// The combined key-computation rule of one section.
///
/// An explicit per-field key override bypasses the policy entirely.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NamePolicy {
    pub strategy: NameStrategy,
    pub modifier: NameModifier,
}

impl NamePolicy {
    pub const fn new(strategy: NameStrategy, modifier: NameModifier) -> Self {
        Self { strategy, modifier }
    }

    /// Computes the document key for a declared field name.
    pub fn apply(&self, name: &str) -> String {
        let renamed = match self.strategy {
            NameStrategy::Keep => name.to_owned(),
            NameStrategy::Kebab => name.replace('_', "-"),
        };
        match self.modifier {
            NameModifier::None => renamed,
            NameModifier::Lowercase => renamed.to_lowercase(),
            NameModifier::Uppercase => renamed.to_uppercase(),
        }
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use super::{NameModifier, NamePolicy, NameStrategy};

    #[test]
    fn default_policy_keeps_names() {
        assert_eq!(NamePolicy::default().apply("retry_count"), "retry_count");
    }

    #[test]
    fn kebab_replaces_underscores() {
        let policy = NamePolicy::new(NameStrategy::Kebab, NameModifier::None);
        assert_eq!(policy.apply("retry_count"), "retry-count");
        assert_eq!(policy.apply("plain"), "plain");
    }

    #[test]
    fn modifiers_apply_after_the_strategy() {
        let policy = NamePolicy::new(NameStrategy::Kebab, NameModifier::Uppercase);
        assert_eq!(policy.apply("retry_count"), "RETRY-COUNT");

        let policy = NamePolicy::new(NameStrategy::Keep, NameModifier::Lowercase);
        assert_eq!(policy.apply("MixedCase"), "mixedcase");
    }
}
