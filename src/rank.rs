use std::cmp::Ordering;

use crate::models::Device;

/// Order devices best first: most maintainers, then short name, then codename.
///
/// Every ranked view (CSV rows, top lists) goes through this comparator.
pub fn rank(a: &Device, b: &Device) -> Ordering {
    b.maintainer_count
        .cmp(&a.maintainer_count)
        .then_with(|| a.short_name.cmp(&b.short_name))
        .then_with(|| a.codename.cmp(&b.codename))
}

pub fn sort_ranked(devices: &mut [Device]) {
    devices.sort_by(rank);
}

/// The `n` best devices, best first.
pub fn top_n<'a>(devices: impl IntoIterator<Item = &'a Device>, n: usize) -> Vec<&'a Device> {
    let mut ranked: Vec<&Device> = devices.into_iter().collect();
    ranked.sort_by(|a, b| rank(a, b));
    ranked.truncate(n);
    ranked
}

/// Pairs of neighbours in a ranked slice that only the codename tells apart.
pub fn find_rank_ties(ranked: &[Device]) -> Vec<(&Device, &Device)> {
    ranked
        .windows(2)
        .filter(|w| w[0].short_name == w[1].short_name)
        .map(|w| (&w[0], &w[1]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::tests::device;

    #[test]
    fn test_more_maintainers_first() {
        let mut devices = vec![device("a", 1, &[16]), device("b", 5, &[16]), device("c", 3, &[16])];
        sort_ranked(&mut devices);
        let order: Vec<&str> = devices.iter().map(|d| d.codename.as_str()).collect();
        assert_eq!(order, vec!["b", "c", "a"]);
    }

    #[test]
    fn test_tie_broken_by_short_name() {
        let mut devices = vec![device("zulu", 2, &[16]), device("alpha", 2, &[16])];
        sort_ranked(&mut devices);
        assert_eq!(devices[0].codename, "alpha");
        assert_eq!(rank(&devices[0], &devices[1]), Ordering::Less);
    }

    #[test]
    fn test_top_n_includes_unmaintained_last() {
        let devices = vec![device("none", 0, &[16]), device("some", 1, &[14]), device("many", 4, &[17])];
        let top: Vec<&str> = top_n(&devices, 10).iter().map(|d| d.codename.as_str()).collect();
        assert_eq!(top, vec!["many", "some", "none"]);
        assert_eq!(top_n(&devices, 2).len(), 2);
    }

    #[test]
    fn test_find_rank_ties() {
        let mut a = device("a", 1, &[16]);
        let mut b = device("b", 1, &[16]);
        a.short_name = "Acme Same".to_string();
        b.short_name = "Acme Same".to_string();
        let mut devices = vec![b, a, device("c", 1, &[16])];
        sort_ranked(&mut devices);
        let ties = find_rank_ties(&devices);
        assert_eq!(ties.len(), 1);
        assert_eq!(ties[0].0.codename, "a");
        assert_ne!(rank(ties[0].0, ties[0].1), Ordering::Equal);
    }
}
