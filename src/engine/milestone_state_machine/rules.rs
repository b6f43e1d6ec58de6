// ==========================================
// 里程碑状态机 - 转换图（纯函数）
// ==========================================
// DRAFT → IN_PROGRESS → SUBMITTED → VERIFIED → CLOSED
//                  ↑__________|  (退回返工)
// ==========================================

use crate::domain::types::MilestoneState;
use std::collections::{HashSet, VecDeque};

/// 允许的有向边（未列出的一律拒绝）
pub const ALLOWED_EDGES: &[(MilestoneState, MilestoneState)] = &[
    (MilestoneState::Draft, MilestoneState::InProgress),
    (MilestoneState::InProgress, MilestoneState::Submitted),
    (MilestoneState::Submitted, MilestoneState::Verified),
    (MilestoneState::Submitted, MilestoneState::InProgress),
    (MilestoneState::Verified, MilestoneState::Closed),
];

pub struct TransitionRules;

impl TransitionRules {
    pub fn is_allowed(from: MilestoneState, to: MilestoneState) -> bool {
        ALLOWED_EDGES.contains(&(from, to))
    }

    /// 从某状态出发的直接后继
    pub fn next_states(from: MilestoneState) -> Vec<MilestoneState> {
        ALLOWED_EDGES
            .iter()
            .filter(|(f, _)| *f == from)
            .map(|(_, t)| *t)
            .collect()
    }

    /// 从 start 经允许边可达的全部状态（不含 start 自身，除非存在回路）
    pub fn reachable_from(start: MilestoneState) -> HashSet<MilestoneState> {
        let mut seen = HashSet::new();
        let mut queue = VecDeque::from([start]);

        while let Some(state) = queue.pop_front() {
            for next in Self::next_states(state) {
                if seen.insert(next) {
                    queue.push_back(next);
                }
            }
        }
        seen
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use MilestoneState::*;

    #[test]
    fn test_listed_edges_are_allowed() {
        for (from, to) in ALLOWED_EDGES {
            assert!(TransitionRules::is_allowed(*from, *to));
        }
    }

    #[test]
    fn test_unlisted_edges_are_rejected() {
        let mut rejected = 0;
        for from in MilestoneState::ALL {
            for to in MilestoneState::ALL {
                if !ALLOWED_EDGES.contains(&(from, to)) {
                    assert!(!TransitionRules::is_allowed(from, to), "{} -> {}", from, to);
                    rejected += 1;
                }
            }
        }
        assert_eq!(rejected, 25 - ALLOWED_EDGES.len());
    }

    #[test]
    fn test_draft_has_no_direct_jump_to_verified_or_closed() {
        let direct = TransitionRules::next_states(Draft);
        assert_eq!(direct, vec![InProgress]);
        assert!(!direct.contains(&Verified));
        assert!(!direct.contains(&Closed));
    }

    #[test]
    fn test_reachability_from_draft() {
        let reachable = TransitionRules::reachable_from(Draft);
        assert!(reachable.contains(&Closed));
        assert!(!reachable.contains(&Draft));
    }

    #[test]
    fn test_closed_is_terminal() {
        assert!(TransitionRules::next_states(Closed).is_empty());
        assert!(TransitionRules::reachable_from(Closed).is_empty());
        assert!(Closed.is_terminal());
    }

    #[test]
    fn test_rework_edge_allows_resubmission() {
        assert!(TransitionRules::is_allowed(Submitted, InProgress));
        assert!(TransitionRules::reachable_from(Submitted).contains(&Submitted));
    }
}
