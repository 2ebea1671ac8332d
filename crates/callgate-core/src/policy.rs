use std::collections::BTreeSet;

use callgate_types::{Address, Selector};

/// Policy Store: keyed map (target, selector) → allowed.
///
/// Absent keys read as `false` (default-deny). Storing `false` deletes the
/// entry, so the store only ever holds allowed pairs and enumerates them in
/// (target, selector) order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PolicyStore {
    allowed: BTreeSet<(Address, Selector)>,
}

impl PolicyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Unconditional upsert. Never fails.
    pub fn set(&mut self, target: Address, selector: Selector, allowed: bool) {
        if allowed {
            self.allowed.insert((target, selector));
        } else {
            self.allowed.remove(&(target, selector));
        }
    }

    /// Whether the pair is allowed. Unknown pairs are not.
    pub fn get(&self, target: &Address, selector: Selector) -> bool {
        self.allowed.contains(&(*target, selector))
    }

    /// One result per input selector, in input order.
    pub fn get_batch(&self, target: &Address, selectors: &[Selector]) -> Vec<bool> {
        selectors.iter().map(|s| self.get(target, *s)).collect()
    }

    /// All allowed pairs.
    pub fn entries(&self) -> impl Iterator<Item = (Address, Selector)> + '_ {
        self.allowed.iter().copied()
    }

    /// Allowed selectors of a single target.
    pub fn selectors_for(&self, target: &Address) -> Vec<Selector> {
        self.allowed
            .range((*target, Selector::new([0; 4]))..=(*target, Selector::new([0xff; 4])))
            .map(|(_, selector)| *selector)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.allowed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.allowed.is_empty()
    }
}
