//! Source-type-balanced working set selection.
//!
//! Plain top-K by distance lets one verbose source type (usually chat)
//! crowd out the others. The selector guarantees up to
//! `max_per_source_type` slots to every source type present, then
//! backfills by relevance, then restores global distance order.
//!
//! Selection, for a pool already sorted by ascending distance:
//!
//! 1. Group candidates by source type, keeping each group's order.
//! 2. Guaranteed slots are handed out rank by rank: the best candidate of
//!    every type (types in name order), then the second best of every type,
//!    and so on up to `max_per_source_type` ranks. Handing out stops when
//!    `target_count` candidates are selected.
//! 3. Remaining slots are backfilled from unselected candidates in their
//!    original order.
//! 4. The selection is sorted by ascending distance; equal distances keep
//!    their original retrieval order.
//!
//! When the guarantees fit within `target_count` (the default 4 per type and
//! 10 total with up to two source types), step 2 is simply "the first
//! `min(group size, max_per_source_type)` of every group".

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use groundwork_core::{defaults, Candidate, RetrievalConfig, SourceType};

/// Slot limits for the selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiversityConfig {
    /// Guaranteed slots per source type.
    pub max_per_source_type: usize,
    /// Working set size.
    pub target_count: usize,
}

impl Default for DiversityConfig {
    fn default() -> Self {
        Self {
            max_per_source_type: defaults::MAX_CHUNKS_PER_SOURCE_TYPE,
            target_count: defaults::MAX_CHUNKS_TO_PROCESS,
        }
    }
}

impl From<&RetrievalConfig> for DiversityConfig {
    fn from(config: &RetrievalConfig) -> Self {
        Self {
            max_per_source_type: config.max_chunks_per_source_type,
            target_count: config.max_chunks_to_process,
        }
    }
}

/// Builds the bounded, diversity-adjusted working set.
#[derive(Debug, Clone, Default)]
pub struct DiversitySelector {
    config: DiversityConfig,
}

impl DiversitySelector {
    pub fn new(config: DiversityConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> DiversityConfig {
        self.config
    }

    /// Select the working set from `candidates` (ascending distance order).
    pub fn select(&self, candidates: Vec<Candidate>) -> Vec<Candidate> {
        let DiversityConfig {
            max_per_source_type,
            target_count,
        } = self.config;
        let pool_size = candidates.len();

        // Indices into `candidates`, grouped per type, types in name order.
        let mut groups: BTreeMap<&'static str, Vec<usize>> = BTreeMap::new();
        for (index, candidate) in candidates.iter().enumerate() {
            groups
                .entry(candidate.source_type.as_str())
                .or_default()
                .push(index);
        }

        let mut selected = vec![false; pool_size];
        let mut picked: Vec<usize> = Vec::with_capacity(target_count.min(pool_size));

        'guarantee: for rank in 0..max_per_source_type {
            let mut any_at_rank = false;
            for group in groups.values() {
                if let Some(&index) = group.get(rank) {
                    any_at_rank = true;
                    if picked.len() >= target_count {
                        break 'guarantee;
                    }
                    selected[index] = true;
                    picked.push(index);
                }
            }
            if !any_at_rank {
                break;
            }
        }
        let guaranteed = picked.len();

        for index in 0..pool_size {
            if picked.len() >= target_count {
                break;
            }
            if !selected[index] {
                selected[index] = true;
                picked.push(index);
            }
        }

        picked.sort_by(|&a, &b| {
            candidates[a]
                .distance
                .total_cmp(&candidates[b].distance)
                .then(a.cmp(&b))
        });

        debug!(
            subsystem = "search",
            component = "diversity",
            input_count = pool_size,
            guaranteed,
            backfilled = picked.len() - guaranteed,
            result_count = picked.len(),
            source_types = groups.len(),
            "Working set selected"
        );

        let mut slots: Vec<Option<Candidate>> = candidates.into_iter().map(Some).collect();
        picked
            .into_iter()
            .filter_map(|index| slots[index].take())
            .collect()
    }
}

/// Count of candidates per source type, keyed by source type name.
pub fn source_type_distribution(candidates: &[Candidate]) -> BTreeMap<String, usize> {
    let mut distribution = BTreeMap::new();
    for candidate in candidates {
        *distribution
            .entry(candidate.source_type.as_str().to_string())
            .or_insert(0) += 1;
    }
    distribution
}

/// Distinct source types in order of first appearance.
pub fn source_types_found(candidates: &[Candidate]) -> Vec<SourceType> {
    let mut found = Vec::new();
    for candidate in candidates {
        if !found.contains(&candidate.source_type) {
            found.push(candidate.source_type);
        }
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use uuid::Uuid;

    fn candidate(source_type: SourceType, source_id: &str, distance: f64) -> Candidate {
        Candidate {
            id: Uuid::new_v4(),
            project_id: 1,
            source_type,
            source_id: source_id.to_string(),
            text: format!("text for {}", source_id),
            metadata: json!({}),
            distance,
        }
    }

    fn selector(max_per_source_type: usize, target_count: usize) -> DiversitySelector {
        DiversitySelector::new(DiversityConfig {
            max_per_source_type,
            target_count,
        })
    }

    fn ids(candidates: &[Candidate]) -> Vec<&str> {
        candidates.iter().map(|c| c.source_id.as_str()).collect()
    }

    fn count_of(candidates: &[Candidate], source_type: SourceType) -> usize {
        candidates
            .iter()
            .filter(|c| c.source_type == source_type)
            .count()
    }

    /// Deterministic pseudo-random pools for property checks.
    fn pool(seed: u64, size: usize) -> Vec<Candidate> {
        let types = [
            SourceType::Code,
            SourceType::Chat,
            SourceType::Issue,
            SourceType::Document,
        ];
        let mut state = seed;
        let mut out: Vec<Candidate> = (0..size)
            .map(|i| {
                state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
                let st = types[((state >> 33) % 4) as usize];
                let distance = ((state >> 40) % 100) as f64 / 100.0;
                candidate(st, &format!("c{}", i), distance)
            })
            .collect();
        out.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        out
    }

    #[test]
    fn test_weak_source_type_still_represented() {
        let mut input: Vec<Candidate> = (1..=5)
            .map(|i| candidate(SourceType::Code, &format!("code{}", i), i as f64 / 10.0))
            .collect();
        input.push(candidate(SourceType::Chat, "chat1", 0.9));

        let out = selector(4, 10).select(input);

        assert_eq!(out.len(), 6);
        assert_eq!(ids(&out), vec!["code1", "code2", "code3", "code4", "code5", "chat1"]);
        assert_eq!(out.last().unwrap().source_type, SourceType::Chat);
    }

    #[test]
    fn test_guarantee_beats_global_rank() {
        // 12 near chat chunks would fill the whole set under plain top-K.
        let mut input: Vec<Candidate> = (0..12)
            .map(|i| candidate(SourceType::Chat, &format!("chat{}", i), 0.01 * i as f64))
            .collect();
        input.extend(
            (0..3).map(|i| candidate(SourceType::Code, &format!("code{}", i), 0.5 + 0.1 * i as f64)),
        );

        let out = selector(4, 10).select(input);

        assert_eq!(out.len(), 10);
        assert_eq!(count_of(&out, SourceType::Code), 3);
        assert_eq!(count_of(&out, SourceType::Chat), 7);
        assert_eq!(ids(&out)[..7], ["chat0", "chat1", "chat2", "chat3", "chat4", "chat5", "chat6"]);
    }

    #[test]
    fn test_small_pool_returned_whole() {
        let input = vec![
            candidate(SourceType::Issue, "i1", 0.3),
            candidate(SourceType::Code, "c1", 0.1),
        ];
        let out = selector(4, 10).select(input);
        assert_eq!(ids(&out), vec!["c1", "i1"]);
    }

    #[test]
    fn test_empty_pool() {
        assert!(selector(4, 10).select(vec![]).is_empty());
    }

    #[test]
    fn test_zero_target_selects_nothing() {
        let input = vec![candidate(SourceType::Code, "c1", 0.1)];
        assert!(selector(4, 0).select(input).is_empty());
    }

    #[test]
    fn test_zero_guarantee_is_plain_top_k() {
        let input = pool(7, 30);
        let expected: Vec<String> = input.iter().take(10).map(|c| c.source_id.clone()).collect();
        let out = selector(0, 10).select(input);
        let got: Vec<String> = out.iter().map(|c| c.source_id.clone()).collect();
        assert_eq!(got, expected);
    }

    #[test]
    fn test_guarantees_over_target_are_rank_major_by_type_name() {
        // 4 types x 4 guaranteed = 16 > target 6: ranks are filled across
        // types in name order (chat, code, document, issue) before depth.
        let mut input = Vec::new();
        for (st, base) in [
            (SourceType::Code, 0.0),
            (SourceType::Chat, 0.1),
            (SourceType::Issue, 0.2),
            (SourceType::Document, 0.3),
        ] {
            for rank in 0..4 {
                input.push(candidate(st, &format!("{}{}", st, rank), base + rank as f64));
            }
        }
        input.sort_by(|a, b| a.distance.total_cmp(&b.distance));

        let out = selector(4, 6).select(input);

        assert_eq!(out.len(), 6);
        for st in [SourceType::Code, SourceType::Chat, SourceType::Issue, SourceType::Document] {
            assert!(count_of(&out, st) >= 1, "{} missing", st);
        }
        // Rank 1 goes to the first two type names: chat and code.
        assert_eq!(count_of(&out, SourceType::Chat), 2);
        assert_eq!(count_of(&out, SourceType::Code), 2);
    }

    #[test]
    fn test_equal_distance_keeps_retrieval_order() {
        let input = vec![
            candidate(SourceType::Code, "first", 0.5),
            candidate(SourceType::Chat, "second", 0.5),
            candidate(SourceType::Code, "third", 0.5),
        ];
        let out = selector(4, 10).select(input);
        assert_eq!(ids(&out), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_output_sorted_and_bounded_for_many_pools() {
        for seed in 0..50u64 {
            for (k, target) in [(1, 5), (2, 10), (4, 10), (3, 4), (10, 10)] {
                let input = pool(seed, 30);
                let pool_size = input.len();
                let out = selector(k, target).select(input.clone());

                assert!(out.windows(2).all(|w| w[0].distance <= w[1].distance));
                assert_eq!(out.len(), target.min(pool_size));

                // No duplicates, and everything comes from the pool.
                let mut seen = std::collections::HashSet::new();
                assert!(out.iter().all(|c| seen.insert(c.id)));
                assert!(out.iter().all(|c| input.iter().any(|p| p.id == c.id)));

                // More than k of a type only happens when backfill was needed,
                // which means every type present got min(k, group size) slots
                // or the target was already reached by guarantees.
                let over_quota = [
                    SourceType::Code,
                    SourceType::Chat,
                    SourceType::Issue,
                    SourceType::Document,
                ]
                .iter()
                .any(|&st| count_of(&out, st) > k);
                if over_quota {
                    for st in [SourceType::Code, SourceType::Chat, SourceType::Issue, SourceType::Document] {
                        let available = count_of(&input, st);
                        assert!(count_of(&out, st) >= available.min(k));
                    }
                }
            }
        }
    }

    #[test]
    fn test_distribution_helpers() {
        let set = vec![
            candidate(SourceType::Code, "a", 0.1),
            candidate(SourceType::Chat, "b", 0.2),
            candidate(SourceType::Code, "c", 0.3),
        ];
        let distribution = source_type_distribution(&set);
        assert_eq!(distribution.get("code"), Some(&2));
        assert_eq!(distribution.get("chat"), Some(&1));
        assert_eq!(source_types_found(&set), vec![SourceType::Code, SourceType::Chat]);
    }

    #[test]
    fn test_config_from_retrieval_config() {
        let config = DiversityConfig::from(&RetrievalConfig::default());
        assert_eq!(config.max_per_source_type, 4);
        assert_eq!(config.target_count, 10);
    }
}
