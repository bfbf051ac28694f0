//! Signal name resolution across traces.
//!
//! Lane names in two builds of the same algorithm often differ only in a
//! leading prefix (`Algo.CAM.Lane.Signal` vs `Algo2.CAM.Lane.Signal`). A name
//! is matched to the candidate sharing the longest run of trailing dotted
//! segments with it.

use sigcmp_core::{SEPARATOR, trailing_matches};
use tracing::warn;

/// Resolve `name` against `candidates`.
///
/// Returns `None` when no candidate shares even the last segment. When
/// several candidates tie at the best score, an exact name wins, otherwise
/// the first one in iteration order; the tie is logged.
#[must_use]
pub fn resolve<'a, I>(name: &str, candidates: I) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    let query: Vec<&str> = name.split(SEPARATOR).collect();
    pick(name, candidates.into_iter().map(|c| (c, score(&query, c))))
}

fn score(query: &[&str], candidate: &str) -> usize {
    trailing_matches(query.iter().copied(), candidate.split(SEPARATOR))
}

fn pick<'a>(name: &str, scored: impl Iterator<Item = (&'a str, usize)>) -> Option<&'a str> {
    let mut best = 0;
    let mut winners: Vec<&'a str> = Vec::new();
    for (candidate, score) in scored {
        if score == 0 || score < best {
            continue;
        }
        if score > best {
            best = score;
            winners.clear();
        }
        winners.push(candidate);
    }

    match winners.as_slice() {
        [] => None,
        [only] => Some(*only),
        tied => {
            let chosen = tied.iter().copied().find(|c| *c == name).unwrap_or(tied[0]);
            warn!(
                signal = name,
                candidates = ?tied,
                chosen,
                "ambiguous signal resolution"
            );
            Some(chosen)
        }
    }
}

/// Candidate catalog split once for repeated lookups
#[derive(Debug, Clone, Default)]
pub struct Resolver {
    names: Vec<String>,
    segments: Vec<Vec<String>>,
}

impl Resolver {
    /// Build from candidate names in catalog order
    pub fn new<I, S>(candidates: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = candidates.into_iter().map(Into::into).collect();
        let segments = names
            .iter()
            .map(|n| n.split(SEPARATOR).map(str::to_string).collect())
            .collect();
        Self { names, segments }
    }

    /// Resolve a name against the catalog
    #[must_use]
    pub fn resolve(&self, name: &str) -> Option<&str> {
        let query: Vec<&str> = name.split(SEPARATOR).collect();
        let scored = self.names.iter().zip(&self.segments).map(|(n, segs)| {
            let score = trailing_matches(query.iter().copied(), segs.iter().map(String::as_str));
            (n.as_str(), score)
        });
        pick(name, scored)
    }

    /// Number of candidates
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Check if there are no candidates
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
