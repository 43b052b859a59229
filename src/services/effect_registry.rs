//! Registry of terminal effects, keyed by the name a form refers to.

use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::ports::TerminalEffect;

#[derive(Clone, Default)]
pub struct EffectRegistry {
    effects: HashMap<String, Arc<dyn TerminalEffect>>,
}

impl EffectRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an effect under its own name, replacing any previous one.
    pub fn register(&mut self, effect: Arc<dyn TerminalEffect>) {
        self.effects.insert(effect.name().to_string(), effect);
    }

    pub fn with(mut self, effect: Arc<dyn TerminalEffect>) -> Self {
        self.register(effect);
        self
    }

    pub fn resolve(&self, key: &str) -> DomainResult<Arc<dyn TerminalEffect>> {
        self.effects
            .get(key)
            .cloned()
            .ok_or_else(|| DomainError::EffectNotRegistered(key.to_string()))
    }

    pub fn contains(&self, key: &str) -> bool {
        self.effects.contains_key(key)
    }

    /// Registered keys, sorted.
    pub fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.effects.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }
}

impl std::fmt::Debug for EffectRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EffectRegistry").field("effects", &self.keys()).finish()
    }
}
