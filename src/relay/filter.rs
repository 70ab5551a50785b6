//! Pure selection functions over the relay catalog: filtering, country and
//! city enumeration for browsing, and the multi-select index grammar.

use std::collections::BTreeSet;

use super::{Relay, TunnelProtocol};
use crate::relay::catalog::Catalog;

/// Filter the catalog by optional country, city, and protocol constraints.
///
/// Country and city are case-insensitive substring matches, protocol is an
/// exact match; absent filters impose no constraint. Catalog order is
/// preserved.
pub fn filter(
    catalog: &Catalog,
    country: Option<&str>,
    city: Option<&str>,
    protocol: Option<TunnelProtocol>,
) -> Vec<Relay> {
    catalog
        .relays()
        .iter()
        .filter(|r| matches_substring(&r.country, country))
        .filter(|r| matches_substring(&r.city, city))
        .filter(|r| protocol.map_or(true, |p| r.protocol == p))
        .cloned()
        .collect()
}

fn matches_substring(value: &str, needle: Option<&str>) -> bool {
    match needle {
        Some(n) => value.to_lowercase().contains(&n.to_lowercase()),
        None => true,
    }
}

/// Distinct countries in the catalog, sorted for display.
pub fn countries(catalog: &Catalog) -> Vec<String> {
    let mut seen = BTreeSet::new();
    let mut out = Vec::new();
    for relay in catalog.relays() {
        if seen.insert(relay.country.as_str()) {
            out.push(relay.country.clone());
        }
    }
    out.sort();
    out
}

/// Cities within a country (exact match) with per-city server counts,
/// sorted by city name.
pub fn cities(catalog: &Catalog, country: &str) -> Vec<(String, usize)> {
    let mut counts: Vec<(String, usize)> = Vec::new();
    for relay in catalog.relays() {
        if relay.country != country {
            continue;
        }
        match counts.iter_mut().find(|(city, _)| city == &relay.city) {
            Some((_, n)) => *n += 1,
            None => counts.push((relay.city.clone(), 1)),
        }
    }
    counts.sort();
    counts
}

/// Number of servers in a country (exact match).
pub fn country_server_count(catalog: &Catalog, country: &str) -> usize {
    catalog
        .relays()
        .iter()
        .filter(|r| r.country == country)
        .count()
}

/// Parse a multi-select expression into ascending 0-based indices.
///
/// The grammar is a comma-separated list of 1-based integers and inclusive
/// ranges `a-b`, e.g. `1,3,5-8,10`. The literal `all` (any case) selects
/// every index. Out-of-range tokens, ranges with an out-of-range endpoint,
/// and malformed tokens are silently dropped; duplicates collapse.
pub fn parse_selection(expression: &str, len: usize) -> Vec<usize> {
    let expression = expression.trim();
    if expression.eq_ignore_ascii_case("all") {
        return (0..len).collect();
    }

    let mut picked = BTreeSet::new();
    for token in expression.split(',') {
        let token = token.trim();
        if let Some((start, end)) = token.split_once('-') {
            let (Ok(start), Ok(end)) = (start.trim().parse::<usize>(), end.trim().parse::<usize>())
            else {
                continue;
            };
            if (1..=len).contains(&start) && (1..=len).contains(&end) {
                picked.extend(start..=end);
            }
        } else if let Ok(n) = token.parse::<usize>() {
            if (1..=len).contains(&n) {
                picked.insert(n);
            }
        }
    }

    picked.into_iter().map(|n| n - 1).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_catalog() -> Catalog {
        let mk = |country: &str, city: &str, hostname: &str| Relay {
            country: country.to_string(),
            city: city.to_string(),
            hostname: hostname.to_string(),
            protocol: TunnelProtocol::classify(hostname),
        };
        Catalog::from_relays(vec![
            mk("Sweden", "Malmo", "se-mma-wg-001"),
            mk("Sweden", "Malmo", "se-mma-ovpn-101"),
            mk("Sweden", "Gothenburg", "se-got-wg-001"),
            mk("United States", "New York", "us-nyc-wg-301"),
            mk("Germany", "Berlin", "de-ber-ovpn-001"),
        ])
    }

    #[test]
    fn test_filter_without_constraints_is_identity() {
        let catalog = sample_catalog();
        let all = filter(&catalog, None, None, None);
        assert_eq!(all, catalog.relays());
    }

    #[test]
    fn test_filter_country_substring_case_insensitive() {
        let catalog = sample_catalog();
        let swedish = filter(&catalog, Some("SWED"), None, None);
        assert_eq!(swedish.len(), 3);
        assert!(swedish.iter().all(|r| r.country == "Sweden"));

        let states = filter(&catalog, Some("united"), None, None);
        assert_eq!(states.len(), 1);
        assert_eq!(states[0].hostname, "us-nyc-wg-301");
    }

    #[test]
    fn test_filters_compose_with_and() {
        let catalog = sample_catalog();
        let wg_malmo = filter(
            &catalog,
            Some("sweden"),
            Some("malmo"),
            Some(TunnelProtocol::WireGuard),
        );
        assert_eq!(wg_malmo.len(), 1);
        assert_eq!(wg_malmo[0].hostname, "se-mma-wg-001");
    }

    #[test]
    fn test_countries_distinct_and_sorted() {
        let catalog = sample_catalog();
        assert_eq!(
            countries(&catalog),
            vec!["Germany", "Sweden", "United States"]
        );
    }

    #[test]
    fn test_cities_with_counts() {
        let catalog = sample_catalog();
        assert_eq!(
            cities(&catalog, "Sweden"),
            vec![("Gothenburg".to_string(), 1), ("Malmo".to_string(), 2)]
        );
        assert!(cities(&catalog, "Norway").is_empty());
    }

    #[test]
    fn test_country_server_count() {
        let catalog = sample_catalog();
        assert_eq!(country_server_count(&catalog, "Sweden"), 3);
        assert_eq!(country_server_count(&catalog, "Norway"), 0);
    }

    #[test]
    fn test_parse_selection_singles_and_ranges() {
        assert_eq!(parse_selection("1,3,5-7", 10), vec![0, 2, 4, 5, 6]);
    }

    #[test]
    fn test_parse_selection_out_of_range_dropped() {
        assert!(parse_selection("0,99", 10).is_empty());
        // A range with one endpoint out of bounds is dropped whole.
        assert!(parse_selection("8-12", 10).is_empty());
    }

    #[test]
    fn test_parse_selection_all() {
        assert_eq!(parse_selection("all", 4), vec![0, 1, 2, 3]);
        assert_eq!(parse_selection("ALL", 2), vec![0, 1]);
    }

    #[test]
    fn test_parse_selection_duplicates_collapse() {
        assert_eq!(parse_selection("3,1,3,2-3", 5), vec![0, 1, 2]);
    }

    #[test]
    fn test_parse_selection_malformed_tokens_dropped() {
        assert_eq!(parse_selection("1, x, 2-, 4", 5), vec![0, 3]);
        assert!(parse_selection("", 5).is_empty());
    }
}
