//! Preceding/following context for Objects.

use docmine_shared::Object;

/// Phrases that make a preceding unit refer back to something else.
const ABOVE_FILTERS: [&str; 2] = ["as above", "above table"];
/// Phrases that make a following unit refer forward to something else.
const BELOW_FILTERS: [&str; 2] = ["as below", "below table"];

/// Windowed context lookup over a file's unified element stream.
#[derive(Debug, Clone, Copy)]
pub struct ContextResolver {
    radius: usize,
}

impl Default for ContextResolver {
    fn default() -> Self {
        Self { radius: 1 }
    }
}

impl ContextResolver {
    pub fn new(radius: usize) -> Self {
        Self { radius }
    }

    pub fn radius(&self) -> usize {
        self.radius
    }

    /// Nearest unit before `position` within the radius that does not
    /// itself point upwards; empty if none survives.
    pub fn above(&self, units: &[String], position: usize) -> String {
        let end = position.min(units.len());
        let start = position.saturating_sub(self.radius).min(end);
        units[start..end]
            .iter()
            .rev()
            .find(|unit| !mentions_any(unit, &ABOVE_FILTERS))
            .cloned()
            .unwrap_or_default()
    }

    /// Nearest unit after `position` within the radius that does not itself
    /// point downwards; empty if none survives.
    pub fn below(&self, units: &[String], position: usize) -> String {
        if units.is_empty() {
            return String::new();
        }
        let start = position.saturating_add(1).min(units.len());
        let end = position
            .saturating_add(self.radius)
            .min(units.len() - 1)
            .saturating_add(1)
            .max(start);
        units[start..end]
            .iter()
            .find(|unit| !mentions_any(unit, &BELOW_FILTERS))
            .cloned()
            .unwrap_or_default()
    }

    /// Fill `above`/`below` of every Object from its own file's units.
    pub fn resolve(&self, objects: &mut [Object], units: &[String]) {
        for object in objects {
            object.above = self.above(units, object.position);
            object.below = self.below(units, object.position);
        }
    }
}

fn mentions_any(unit: &str, phrases: &[&str]) -> bool {
    phrases.iter().any(|phrase| unit.contains(phrase))
}
