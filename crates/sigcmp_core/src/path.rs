//! Dotted hierarchical signal names.
//!
//! `Component.Group.Structure.Signal`: the first segment names the
//! component, the first two name the group. The hierarchy is used for
//! reporting only and has no on-disk meaning.

/// Hierarchy separator
pub const SEPARATOR: char = '.';

/// First segment of a dotted name
#[must_use]
pub fn component_of(name: &str) -> &str {
    name.split(SEPARATOR).next().unwrap_or(name)
}

/// First two segments of a dotted name (the whole name if it has fewer)
#[must_use]
pub fn group_of(name: &str) -> &str {
    match name.match_indices(SEPARATOR).nth(1) {
        Some((idx, _)) => &name[..idx],
        None => name,
    }
}

/// Count equal segments walking inward from the rightmost one
#[must_use]
pub fn trailing_matches<'a, 'b, A, B>(left: A, right: B) -> usize
where
    A: DoubleEndedIterator<Item = &'a str>,
    B: DoubleEndedIterator<Item = &'b str>,
{
    left.rev()
        .zip(right.rev())
        .take_while(|(l, r)| l == r)
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_hierarchy() {
        assert_eq!(component_of("Algo.CAM.Lane.Signal"), "Algo");
        assert_eq!(group_of("Algo.CAM.Lane.Signal"), "Algo.CAM");
    }

    #[test]
    fn test_path_short_names() {
        assert_eq!(group_of("Single"), "Single");
        assert_eq!(component_of("Single"), "Single");
        assert_eq!(group_of("A.B"), "A.B");
        assert_eq!(component_of("A.B"), "A");
    }

    #[test]
    fn test_trailing_matches() {
        let count = trailing_matches(
            "Algo2.CAM.Lane.Signal".split('.'),
            "Algo.CAM.Lane.Signal".split('.'),
        );
        assert_eq!(count, 3);

        assert_eq!(trailing_matches("A.B".split('.'), "X.Y".split('.')), 0);
        assert_eq!(trailing_matches("A.B".split('.'), "A.B".split('.')), 2);
        assert_eq!(trailing_matches("B".split('.'), "X.A.B".split('.')), 1);
    }
}
