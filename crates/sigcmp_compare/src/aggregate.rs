//! Signal → group → component roll-up.
//!
//! A group is the first two dotted segments of a signal name and a
//! component the first segment. Each level ORs the divergence vectors of
//! its children, so the order signals arrive in does not affect the result.

use crate::diff::{DivergenceVector, LaneDiff};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use sigcmp_core::{component_of, group_of};

/// Anything that can be placed in reporting order
pub trait Ranked {
    /// Identifier used as tie-breaker
    fn id(&self) -> &str;
    /// Earliest divergent sample, if any
    fn first_divergence(&self) -> Option<usize>;
}

/// Sort by ascending first divergence, ties by id; equal entries last, by id
#[must_use]
pub fn reporting_order<'a, T, I>(items: I) -> Vec<&'a T>
where
    T: Ranked + 'a,
    I: IntoIterator<Item = &'a T>,
{
    let mut out: Vec<&T> = items.into_iter().collect();
    out.sort_by(|a, b| {
        let key = |r: &&T| (r.first_divergence().is_none(), r.first_divergence().unwrap_or(0));
        key(a).cmp(&key(b)).then_with(|| a.id().cmp(b.id()))
    });
    out
}

/// Comparison outcome of one lane pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalResult {
    /// Lane name in the reference trace
    pub name: String,
    /// Lane name it resolved to in the other trace
    pub resolved_name: String,
    /// Group the signal belongs to
    pub group: String,
    /// Per-element and collapsed divergence
    pub diff: LaneDiff,
    /// Number of divergent samples
    pub divergent_sample_count: usize,
    /// True when no sample diverges
    pub is_equal: bool,
}

impl SignalResult {
    /// Build from a lane diff
    #[must_use]
    pub fn new(name: impl Into<String>, resolved_name: impl Into<String>, diff: LaneDiff) -> Self {
        let name = name.into();
        let count = diff.collapsed.count();
        Self {
            group: group_of(&name).to_string(),
            resolved_name: resolved_name.into(),
            name,
            diff,
            divergent_sample_count: count,
            is_equal: count == 0,
        }
    }

    /// Collapsed per-sample divergence
    #[must_use]
    pub fn divergence(&self) -> &DivergenceVector {
        &self.diff.collapsed
    }
}

impl Ranked for SignalResult {
    fn id(&self) -> &str {
        &self.name
    }

    fn first_divergence(&self) -> Option<usize> {
        self.diff.collapsed.first()
    }
}

/// Roll-up of the signals sharing a group id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupResult {
    /// Group id (first two segments)
    pub id: String,
    /// Owning component id
    pub component: String,
    /// OR of member divergence vectors
    pub divergence: DivergenceVector,
    /// Number of divergent samples
    pub divergent_sample_count: usize,
    /// True when no sample diverges
    pub is_equal: bool,
    /// Member signal names in arrival order
    pub signals: Vec<String>,
}

/// Roll-up of the groups sharing a component id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentResult {
    /// Component id (first segment)
    pub id: String,
    /// OR of group divergence vectors
    pub divergence: DivergenceVector,
    /// Number of divergent samples
    pub divergent_sample_count: usize,
    /// True when no sample diverges
    pub is_equal: bool,
    /// Member group ids in arrival order
    pub groups: Vec<String>,
}

impl Ranked for ComponentResult {
    fn id(&self) -> &str {
        &self.id
    }

    fn first_divergence(&self) -> Option<usize> {
        self.divergence.first()
    }
}

/// Complete three-level result tree
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultTree {
    /// Signal results keyed by reference name
    pub signals: IndexMap<String, SignalResult>,
    /// Group results keyed by group id
    pub groups: IndexMap<String, GroupResult>,
    /// Component results keyed by component id
    pub components: IndexMap<String, ComponentResult>,
}

impl ResultTree {
    /// AND of every component's equality
    #[must_use]
    pub fn passed(&self) -> bool {
        self.components.values().all(|c| c.is_equal)
    }

    /// Signals in reporting order
    #[must_use]
    pub fn ordered_signals(&self) -> Vec<&SignalResult> {
        reporting_order(self.signals.values())
    }

    /// Components in reporting order
    #[must_use]
    pub fn ordered_components(&self) -> Vec<&ComponentResult> {
        reporting_order(self.components.values())
    }
}

/// Incremental builder for a [`ResultTree`]
#[derive(Debug, Clone, Default)]
pub struct Aggregator {
    sample_count: usize,
    signals: IndexMap<String, SignalResult>,
    groups: IndexMap<String, (DivergenceVector, Vec<String>)>,
}

impl Aggregator {
    /// Create an aggregator for vectors of `sample_count` samples
    #[must_use]
    pub fn new(sample_count: usize) -> Self {
        Self {
            sample_count,
            ..Self::default()
        }
    }

    /// Fold one signal result into its group
    pub fn push(&mut self, signal: SignalResult) {
        let len = self.sample_count;
        let (vector, members) = self
            .groups
            .entry(signal.group.clone())
            .or_insert_with_key(|id| (DivergenceVector::zeros(id.clone(), len), Vec::new()));
        vector.merge(signal.divergence());
        members.push(signal.name.clone());
        self.signals.insert(signal.name.clone(), signal);
    }

    /// Number of signals folded so far
    #[must_use]
    pub fn len(&self) -> usize {
        self.signals.len()
    }

    /// Check if no signal has been folded
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.signals.is_empty()
    }

    /// Roll groups into components and produce the tree
    #[must_use]
    pub fn finish(self) -> ResultTree {
        let len = self.sample_count;
        let mut components: IndexMap<String, ComponentResult> = IndexMap::new();
        let mut groups = IndexMap::with_capacity(self.groups.len());

        for (id, (divergence, signals)) in self.groups {
            let component = component_of(&id).to_string();
            let entry = components.entry(component.clone()).or_insert_with(|| ComponentResult {
                id: component.clone(),
                divergence: DivergenceVector::zeros(component.clone(), len),
                divergent_sample_count: 0,
                is_equal: true,
                groups: Vec::new(),
            });
            entry.divergence.merge(&divergence);
            entry.groups.push(id.clone());

            let count = divergence.count();
            groups.insert(
                id.clone(),
                GroupResult {
                    id,
                    component,
                    divergence,
                    divergent_sample_count: count,
                    is_equal: count == 0,
                    signals,
                },
            );
        }

        for component in components.values_mut() {
            component.divergent_sample_count = component.divergence.count();
            component.is_equal = component.divergent_sample_count == 0;
        }

        ResultTree {
            signals: self.signals,
            groups,
            components,
        }
    }
}

/// Aggregate a batch of signal results
#[must_use]
pub fn aggregate(signals: impl IntoIterator<Item = SignalResult>, sample_count: usize) -> ResultTree {
    let mut aggregator = Aggregator::new(sample_count);
    for signal in signals {
        aggregator.push(signal);
    }
    aggregator.finish()
}
