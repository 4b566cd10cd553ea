/// Tier table: the merge progression.
///
/// Tiers are pure data. A piece never changes tier; a merge destroys two
/// pieces of tier `T` and creates one of `successor(T)`. A tier with no
/// successor is terminal: same-tier contact there is plain collision.
///
/// The table is built and validated by `config` at load time, so every
/// `TierId` handed out by the table is guaranteed to resolve.

use std::fmt;

/// Index into the tier table. Ordered by position in the table.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct TierId(pub usize);

impl fmt::Display for TierId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Tier {
    /// Identifier as written in the config (e.g. "A").
    pub name: String,
    /// Collision radius (half the configured size).
    pub radius: f32,
    /// Points awarded when two pieces of this tier merge.
    pub score: u32,
    /// Merge target. `None` = terminal.
    pub next: Option<TierId>,
}

impl Tier {
    pub fn is_terminal(&self) -> bool {
        self.next.is_none()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct TierTable {
    tiers: Vec<Tier>,
}

impl TierTable {
    /// Wrap an already-validated tier list. Successor ids must be in range.
    pub(crate) fn from_validated(tiers: Vec<Tier>) -> Self {
        debug_assert!(tiers
            .iter()
            .all(|t| t.next.map_or(true, |n| n.0 < tiers.len())));
        TierTable { tiers }
    }

    pub fn len(&self) -> usize {
        self.tiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiers.is_empty()
    }

    pub fn get(&self, id: TierId) -> &Tier {
        &self.tiers[id.0]
    }

    pub fn successor(&self, id: TierId) -> Option<TierId> {
        self.tiers.get(id.0).and_then(|t| t.next)
    }

    pub fn radius(&self, id: TierId) -> f32 {
        self.get(id).radius
    }

    pub fn score(&self, id: TierId) -> u32 {
        self.get(id).score
    }

    pub fn name(&self, id: TierId) -> &str {
        &self.get(id).name
    }

    pub fn find(&self, name: &str) -> Option<TierId> {
        self.tiers.iter().position(|t| t.name == name).map(TierId)
    }

    pub fn iter(&self) -> impl Iterator<Item = (TierId, &Tier)> {
        self.tiers.iter().enumerate().map(|(i, t)| (TierId(i), t))
    }
}
