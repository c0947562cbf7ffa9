//! Placeholder Substitution
//!
//! Resolves placeholders whose values reference other keys of the same
//! lookup. Every key is a placeholder: if a key's text occurs anywhere inside
//! another key's value, that occurrence is replaced by the key's value.
//!
//! The sweep is bounded to a fixed number of rounds and has no cycle
//! detection. Matching is plain substring matching, so a key such as `KEY`
//! also fires inside `%KEY%` or `MONKEY`. Generated paths depend on this
//! exact behavior.
//!
//! Callers go through [`PlaceholderResolver`] so a stricter resolver can be
//! dropped in without touching the lookup builder.

use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::control::Layer;

/// Number of substitution rounds applied to each job lookup.
pub const DEFAULT_ROUNDS: usize = 3;

/// Shape of a placeholder token, used to report leftovers.
static TOKEN_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"%[A-Za-z0-9_]+%").expect("token pattern is valid"));

/// Resolves placeholder references inside a lookup, in place.
pub trait PlaceholderResolver {
    fn resolve(&self, lookup: &mut Layer);
}

/// Substring substitution repeated for a fixed number of rounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundedSubstitution {
    rounds: usize,
}

impl BoundedSubstitution {
    /// Creates a resolver running `rounds` full sweeps.
    pub fn new(rounds: usize) -> Self {
        Self { rounds }
    }

    /// Returns the number of sweeps.
    pub fn rounds(&self) -> usize {
        self.rounds
    }
}

impl Default for BoundedSubstitution {
    fn default() -> Self {
        Self::new(DEFAULT_ROUNDS)
    }
}

impl PlaceholderResolver for BoundedSubstitution {
    fn resolve(&self, lookup: &mut Layer) {
        resolve_placeholders(lookup, self.rounds);
    }
}

/// Runs `rounds` substitution sweeps over `lookup`.
///
/// Each sweep visits keys in insertion order. For every key, each *other*
/// value containing the key's text has all occurrences replaced by the key's
/// current value. Empty keys are skipped.
///
/// # Example
///
/// ```
/// use slurm_workflow_utils::control::Layer;
/// use slurm_workflow_utils::lookup::resolve_placeholders;
///
/// let mut lookup = Layer::new();
/// lookup.insert("%ROOT%".to_string(), "/scratch".to_string());
/// lookup.insert("%OUT%".to_string(), "%ROOT%/run".to_string());
///
/// resolve_placeholders(&mut lookup, 3);
/// assert_eq!(lookup["%OUT%"], "/scratch/run");
/// ```
pub fn resolve_placeholders(lookup: &mut Layer, rounds: usize) {
    for round in 0..rounds {
        for i in 0..lookup.len() {
            let Some((token, replacement)) = lookup
                .get_index(i)
                .map(|(k, v)| (k.clone(), v.clone()))
            else {
                continue;
            };

            if token.is_empty() {
                continue;
            }

            for j in 0..lookup.len() {
                if j == i {
                    continue;
                }
                if let Some((_, value)) = lookup.get_index_mut(j) {
                    if value.contains(&token) {
                        *value = value.replace(&token, &replacement);
                    }
                }
            }
        }
        debug!("Placeholder round {} complete", round + 1);
    }
}

/// Lists `%TOKEN%`-shaped strings still present in the lookup's values,
/// in order of first appearance.
pub fn unresolved_placeholders(lookup: &Layer) -> Vec<String> {
    let mut tokens: Vec<String> = Vec::new();

    for value in lookup.values() {
        for found in TOKEN_PATTERN.find_iter(value) {
            let token = found.as_str();
            if !tokens.iter().any(|t| t == token) {
                tokens.push(token.to_string());
            }
        }
    }

    tokens
}
