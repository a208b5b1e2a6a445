//! Scoring and result shaping for each search mode.
//!
//! The storage engine supplies raw per-page relevance scores; everything that
//! decides *ordering* lives here so it can be tested without an index.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::role::Role;

/// Maximum number of hits returned by `general`, `headings` and `weighted`.
pub const RESULT_LIMIT: usize = 20;

/// Maximum number of pages returned by `topics`.
pub const TOPIC_PAGE_LIMIT: usize = 10;

/// Topic multipliers in priority order; the first role present wins.
const TOPIC_MULTIPLIERS: [(Role, f64); 4] = [
    (Role::Heading1, 3.0),
    (Role::Heading2, 2.5),
    (Role::Heading3, 2.0),
    (Role::Bold, 1.5),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Relevance against the full page text.
    General,
    /// General relevance, restricted to pages that contain a heading.
    Headings,
    /// Unbounded general search re-ranked by structural role.
    Topics,
    /// Multi-field relevance with fixed per-role weights.
    Weighted,
}

impl Mode {
    pub const ALL: [Mode; 4] = [Mode::General, Mode::Headings, Mode::Topics, Mode::Weighted];

    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::General => "general",
            Mode::Headings => "headings",
            Mode::Topics => "topics",
            Mode::Weighted => "weighted",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Unknown search mode: '{0}' (expected one of: general, headings, topics, weighted)")]
pub struct UnknownMode(pub String);

impl FromStr for Mode {
    type Err = UnknownMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Mode::ALL
            .into_iter()
            .find(|mode| mode.as_str() == wanted)
            .ok_or_else(|| UnknownMode(s.to_string()))
    }
}

/// A scored match attributable to one page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hit {
    pub page_number: usize,
    pub raw_score: f64,
    pub adjusted_score: f64,
    pub roles_present: BTreeSet<Role>,
}

impl Hit {
    pub fn new(page_number: usize, raw_score: f64, roles_present: BTreeSet<Role>) -> Self {
        Hit {
            page_number,
            raw_score,
            adjusted_score: raw_score,
            roles_present,
        }
    }
}

/// Per-role relevance of one page, as reported by the storage engine.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldScores {
    pub page_number: usize,
    pub roles_present: BTreeSet<Role>,
    pub scores: BTreeMap<Role, f64>,
}

/// Sort descending by adjusted score; ties by ascending page number.
pub fn sort_hits(hits: &mut [Hit]) {
    hits.sort_by(|a, b| {
        b.adjusted_score
            .total_cmp(&a.adjusted_score)
            .then(a.page_number.cmp(&b.page_number))
    });
}

/// `general`: engine relevance only, top [`RESULT_LIMIT`].
pub fn rank_general(mut hits: Vec<Hit>) -> Vec<Hit> {
    sort_hits(&mut hits);
    hits.truncate(RESULT_LIMIT);
    hits
}

/// `headings`: content relevance AND at least one heading role on the page.
pub fn rank_headings(hits: Vec<Hit>) -> Vec<Hit> {
    let filtered = hits
        .into_iter()
        .filter(|hit| hit.roles_present.iter().any(Role::is_heading))
        .collect();
    rank_general(filtered)
}

/// Weighted sum of per-field relevance. Missing fields contribute zero and
/// negative engine scores are clamped, so adding a matching field can only
/// raise the total.
pub fn weighted_score(scores: &BTreeMap<Role, f64>) -> f64 {
    scores
        .iter()
        .filter_map(|(role, score)| role.weight().map(|w| f64::from(w) * score.max(0.0)))
        .sum()
}

/// `weighted`: combined multi-field score, top [`RESULT_LIMIT`].
pub fn rank_weighted(pages: Vec<FieldScores>) -> Vec<Hit> {
    let hits = pages
        .into_iter()
        .map(|page| {
            let score = weighted_score(&page.scores);
            Hit::new(page.page_number, score, page.roles_present)
        })
        .collect();
    rank_general(hits)
}

/// Multiplier for the highest-priority structural role on a page.
pub fn topic_multiplier(roles: &BTreeSet<Role>) -> f64 {
    TOPIC_MULTIPLIERS
        .iter()
        .find(|(role, _)| roles.contains(role))
        .map(|(_, m)| *m)
        .unwrap_or(1.0)
}

/// `topics`: re-rank an unbounded general result set by structural role.
///
/// Every hit's score is multiplied by [`topic_multiplier`]. The page score
/// is the *last* hit seen for that page, not the maximum. Pages are then
/// ordered by that score (stable in first-seen order) and the hits of the top
/// [`TOPIC_PAGE_LIMIT`] pages are returned, keeping their original order.
pub fn rank_topics(mut hits: Vec<Hit>) -> Vec<Hit> {
    sort_hits(&mut hits);

    let mut page_order: Vec<usize> = Vec::new();
    let mut page_score: HashMap<usize, f64> = HashMap::new();
    let mut page_hits: HashMap<usize, Vec<Hit>> = HashMap::new();

    for mut hit in hits {
        hit.adjusted_score = hit.raw_score * topic_multiplier(&hit.roles_present);
        if !page_hits.contains_key(&hit.page_number) {
            page_order.push(hit.page_number);
        }
        page_score.insert(hit.page_number, hit.adjusted_score);
        page_hits.entry(hit.page_number).or_default().push(hit);
    }

    let mut ranked: Vec<(usize, f64)> = page_order
        .into_iter()
        .map(|page| (page, page_score[&page]))
        .collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));

    ranked
        .into_iter()
        .take(TOPIC_PAGE_LIMIT)
        .flat_map(|(page, _)| page_hits.remove(&page).unwrap_or_default())
        .collect()
}

/// Hits of one page, as presented to the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageGroup {
    pub page_number: usize,
    pub roles_present: BTreeSet<Role>,
    pub best_score: f64,
    pub hits: Vec<Hit>,
}

/// Group hits by page and order groups by their best adjusted score.
///
/// Groups with equal best scores keep first-seen order; hits within a group
/// keep engine order.
pub fn group_by_page(hits: Vec<Hit>) -> Vec<PageGroup> {
    let mut groups: Vec<PageGroup> = Vec::new();

    for hit in hits {
        match groups.iter_mut().find(|g| g.page_number == hit.page_number) {
            Some(group) => {
                group.best_score = group.best_score.max(hit.adjusted_score);
                group.hits.push(hit);
            }
            None => groups.push(PageGroup {
                page_number: hit.page_number,
                roles_present: hit.roles_present.clone(),
                best_score: hit.adjusted_score,
                hits: vec![hit],
            }),
        }
    }

    groups.sort_by(|a, b| b.best_score.total_cmp(&a.best_score));
    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roles(list: &[Role]) -> BTreeSet<Role> {
        list.iter().copied().collect()
    }

    fn hit(page: usize, score: f64, list: &[Role]) -> Hit {
        Hit::new(page, score, roles(list))
    }

    fn pages(hits: &[Hit]) -> Vec<usize> {
        hits.iter().map(|h| h.page_number).collect()
    }

    // =====================================================================
    // Mode
    // =====================================================================

    #[test]
    fn test_mode_parse() {
        assert_eq!("general".parse::<Mode>(), Ok(Mode::General));
        assert_eq!("Weighted".parse::<Mode>(), Ok(Mode::Weighted));
        assert_eq!(
            "bogus".parse::<Mode>(),
            Err(UnknownMode("bogus".to_string()))
        );
    }

    // =====================================================================
    // general / headings
    // =====================================================================

    #[test]
    fn test_rank_general_sorts_and_limits() {
        let hits: Vec<Hit> = (1..=30).map(|p| hit(p, p as f64, &[Role::Body])).collect();
        let ranked = rank_general(hits);
        assert_eq!(ranked.len(), RESULT_LIMIT);
        assert_eq!(ranked[0].page_number, 30);
        assert_eq!(ranked[19].page_number, 11);
        assert!(ranked.iter().all(|h| h.adjusted_score == h.raw_score));
    }

    #[test]
    fn test_rank_general_ties_by_page() {
        let ranked = rank_general(vec![hit(5, 1.0, &[]), hit(2, 1.0, &[])]);
        assert_eq!(pages(&ranked), vec![2, 5]);
    }

    #[test]
    fn test_rank_headings_requires_heading_role() {
        let hits = vec![
            hit(1, 5.0, &[Role::Body]),
            hit(2, 4.0, &[Role::Heading3, Role::Body]),
            hit(3, 3.0, &[Role::Title, Role::Bold]),
            hit(4, 6.0, &[Role::Heading1]),
        ];
        assert_eq!(pages(&rank_headings(hits)), vec![4, 2]);
    }

    // =====================================================================
    // weighted
    // =====================================================================

    #[test]
    fn test_weighted_score_applies_role_weights() {
        let scores: BTreeMap<Role, f64> = [(Role::Title, 1.0), (Role::Body, 2.0)].into();
        assert_eq!(weighted_score(&scores), 7.0 + 6.0);
    }

    #[test]
    fn test_weighted_score_ignores_unweighted_and_negative() {
        let scores: BTreeMap<Role, f64> = [
            (Role::Footnote, 10.0),
            (Role::Heading1, -1.0),
            (Role::Bold, 0.5),
        ]
        .into();
        assert_eq!(weighted_score(&scores), 2.0);
    }

    #[test]
    fn test_weighted_score_monotonic_in_matching_fields() {
        let mut scores: BTreeMap<Role, f64> = BTreeMap::new();
        let mut previous = weighted_score(&scores);
        for role in Role::ALL {
            scores.insert(role, 0.25);
            let current = weighted_score(&scores);
            assert!(current >= previous, "adding {role} lowered the score");
            previous = current;
        }
    }

    #[test]
    fn test_rank_weighted_orders_by_combined_score() {
        let pages_in = vec![
            FieldScores {
                page_number: 1,
                roles_present: roles(&[Role::Body]),
                scores: [(Role::Body, 1.0)].into(),
            },
            FieldScores {
                page_number: 2,
                roles_present: roles(&[Role::Heading1]),
                scores: [(Role::Heading1, 1.0)].into(),
            },
        ];
        let ranked = rank_weighted(pages_in);
        assert_eq!(pages(&ranked), vec![2, 1]);
        assert_eq!(ranked[0].raw_score, 6.0);
        assert_eq!(ranked[1].raw_score, 3.0);
    }

    // =====================================================================
    // topics
    // =====================================================================

    #[test]
    fn test_topic_multiplier_priority() {
        assert_eq!(topic_multiplier(&roles(&[Role::Bold, Role::Heading1])), 3.0);
        assert_eq!(topic_multiplier(&roles(&[Role::Heading2, Role::Heading3])), 2.5);
        assert_eq!(topic_multiplier(&roles(&[Role::Heading3])), 2.0);
        assert_eq!(topic_multiplier(&roles(&[Role::Bold, Role::Body])), 1.5);
        assert_eq!(topic_multiplier(&roles(&[Role::Title, Role::Body])), 1.0);
        assert_eq!(topic_multiplier(&roles(&[])), 1.0);
    }

    #[test]
    fn test_topics_heading1_outranks_body_at_equal_score() {
        let hits = vec![hit(1, 2.0, &[Role::Body]), hit(2, 2.0, &[Role::Heading1])];
        let ranked = rank_topics(hits);
        assert_eq!(pages(&ranked), vec![2, 1]);
        assert_eq!(ranked[0].adjusted_score, 6.0);
        assert_eq!(ranked[0].raw_score, 2.0);
        assert_eq!(ranked[1].adjusted_score, 2.0);
    }

    #[test]
    fn test_topics_last_write_wins_per_page() {
        // Engine order is by raw score, so the weaker hit on page 1 comes
        // last and determines the page score.
        let hits = vec![
            hit(1, 10.0, &[Role::Body]),
            hit(2, 4.0, &[Role::Body]),
            hit(1, 1.0, &[Role::Body]),
        ];
        let ranked = rank_topics(hits);
        assert_eq!(pages(&ranked), vec![2, 1, 1]);
        assert_eq!(ranked[1].adjusted_score, 10.0);
        assert_eq!(ranked[2].adjusted_score, 1.0);
    }

    #[test]
    fn test_topics_limits_pages_not_hits() {
        let mut hits: Vec<Hit> = (1..=15).map(|p| hit(p, p as f64, &[Role::Body])).collect();
        hits.push(hit(15, 0.5, &[Role::Heading1]));
        hits.push(hit(14, 14.0, &[Role::Body]));
        let ranked = rank_topics(hits);

        let distinct: BTreeSet<usize> = ranked.iter().map(|h| h.page_number).collect();
        assert_eq!(distinct.len(), TOPIC_PAGE_LIMIT);
        // Page 15's last hit scored 0.5 * 3.0, which pushes it out.
        assert!(!distinct.contains(&15));
        assert_eq!(ranked.iter().filter(|h| h.page_number == 14).count(), 2);
    }

    #[test]
    fn test_topics_empty() {
        assert!(rank_topics(Vec::new()).is_empty());
    }

    // =====================================================================
    // group_by_page
    // =====================================================================

    #[test]
    fn test_group_by_page_orders_by_best_score() {
        let mut a = hit(1, 1.0, &[Role::Body]);
        a.adjusted_score = 1.0;
        let mut b = hit(2, 2.0, &[Role::Heading2]);
        b.adjusted_score = 2.0;
        let mut c = hit(1, 3.0, &[Role::Body]);
        c.adjusted_score = 3.0;

        let groups = group_by_page(vec![a, b, c]);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].page_number, 1);
        assert_eq!(groups[0].best_score, 3.0);
        assert_eq!(
            groups[0].hits.iter().map(|h| h.raw_score).collect::<Vec<_>>(),
            vec![1.0, 3.0]
        );
        assert_eq!(groups[1].page_number, 2);
        assert!(groups[1].roles_present.contains(&Role::Heading2));
    }

    #[test]
    fn test_group_by_page_stable_on_ties() {
        let groups = group_by_page(vec![hit(9, 1.0, &[]), hit(3, 1.0, &[])]);
        assert_eq!(
            groups.iter().map(|g| g.page_number).collect::<Vec<_>>(),
            vec![9, 3]
        );
    }

    #[test]
    fn test_group_by_page_empty() {
        assert!(group_by_page(Vec::new()).is_empty());
    }
}
