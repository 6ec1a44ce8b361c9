//! Clustering policies over an explicit candidate-edge list.
//!
//! Policies are pure reductions: node `i` is the `i`-th record and carries
//! only its retailer. Every node ends up in exactly one group and no group
//! holds two nodes from the same retailer.

use serde::Serialize;
use std::collections::{BTreeMap, HashSet, VecDeque};
use tracing::{debug, warn};

/// A candidate match between two records from different retailers
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MatchEdge {
    pub a: usize,
    pub b: usize,
    /// Similarity on a 0..=100 scale, at or above the match threshold
    pub score: f64,
}

impl MatchEdge {
    /// Endpoints are stored in ascending order
    pub fn new(a: usize, b: usize, score: f64) -> Self {
        let (a, b) = if a <= b { (a, b) } else { (b, a) };
        Self { a, b, score }
    }
}

/// Data-quality counters from one clustering run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ClusteringReport {
    /// Same-retailer collisions that had to be resolved
    pub retailer_conflicts: usize,
    /// Records split off into their own singleton clusters
    pub ejected: Vec<usize>,
}

/// Groups of node indices, each sorted ascending; groups ordered by first member
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClusterAssignment {
    pub groups: Vec<Vec<usize>>,
    pub report: ClusteringReport,
}

/// Trait for turning candidate edges into clusters
pub trait ClusterPolicy: Send + Sync {
    fn name(&self) -> &'static str;

    /// `retailers[i]` is the retailer of node `i`
    fn assign(&self, retailers: &[&str], edges: &[MatchEdge]) -> ClusterAssignment;
}

/// Transitive clustering: connected components of the candidate graph.
///
/// A–B and B–C both matching puts A, B and C together even when A–C does
/// not. When a component holds several records from one retailer, that
/// retailer keeps only the record with the highest-scoring edge (lowest
/// index on ties); the rest become singletons and the remainder is
/// re-split into components.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConnectedComponents;

impl ClusterPolicy for ConnectedComponents {
    fn name(&self) -> &'static str {
        "connected_components"
    }

    fn assign(&self, retailers: &[&str], edges: &[MatchEdge]) -> ClusterAssignment {
        let adjacency = build_adjacency(retailers, edges);
        let mut active = vec![true; retailers.len()];
        let mut report = ClusteringReport::default();
        let mut groups = Vec::new();

        let mut pending = components(&adjacency, &active, 0..retailers.len());
        while let Some(component) = pending.pop() {
            let ejected = resolve_retailer_conflicts(&component, retailers, &adjacency, &active, &mut report);
            if ejected.is_empty() {
                groups.push(component);
                continue;
            }

            for &node in &ejected {
                active[node] = false;
                groups.push(vec![node]);
            }
            report.ejected.extend_from_slice(&ejected);

            // Ejected records may have been bridges; split what is left
            let survivors: Vec<usize> = component.into_iter().filter(|n| active[*n]).collect();
            pending.extend(components(&adjacency, &active, survivors));
        }

        groups.sort_by_key(|g| g[0]);
        report.ejected.sort_unstable();
        ClusterAssignment { groups, report }
    }
}

/// Complete-linkage clustering: a record joins a cluster only when it has a
/// candidate edge to every current member. Edges are taken best first.
#[derive(Debug, Clone, Copy, Default)]
pub struct StrictPairwise;

impl ClusterPolicy for StrictPairwise {
    fn name(&self) -> &'static str {
        "strict_pairwise"
    }

    fn assign(&self, retailers: &[&str], edges: &[MatchEdge]) -> ClusterAssignment {
        let n = retailers.len();
        let mut valid: Vec<MatchEdge> = edges.iter().copied().filter(|e| is_valid_edge(retailers, e)).collect();
        let linked: HashSet<(usize, usize)> = valid.iter().map(|e| (e.a, e.b)).collect();
        valid.sort_by(|x, y| y.score.total_cmp(&x.score).then((x.a, x.b).cmp(&(y.a, y.b))));

        let mut cluster_of: Vec<usize> = (0..n).collect();
        let mut members: Vec<Vec<usize>> = (0..n).map(|i| vec![i]).collect();
        let mut report = ClusteringReport::default();

        for edge in valid {
            let (ca, cb) = (cluster_of[edge.a], cluster_of[edge.b]);
            if ca == cb {
                continue;
            }

            let shares_retailer = members[ca]
                .iter()
                .any(|x| members[cb].iter().any(|y| retailers[*x] == retailers[*y]));
            if shares_retailer {
                report.retailer_conflicts += 1;
                debug!(a = edge.a, b = edge.b, score = edge.score, "Skipping edge joining same-retailer records");
                continue;
            }

            let fully_linked = members[ca].iter().all(|x| {
                members[cb].iter().all(|y| linked.contains(&(*x.min(y), *x.max(y))))
            });
            if !fully_linked {
                continue;
            }

            let (keep, absorb) = (ca.min(cb), ca.max(cb));
            let moved = std::mem::take(&mut members[absorb]);
            for node in &moved {
                cluster_of[*node] = keep;
            }
            members[keep].extend(moved);
        }

        let mut groups: Vec<Vec<usize>> = members
            .into_iter()
            .filter(|g| !g.is_empty())
            .map(|mut g| {
                g.sort_unstable();
                g
            })
            .collect();
        groups.sort_by_key(|g| g[0]);
        ClusterAssignment { groups, report }
    }
}

fn is_valid_edge(retailers: &[&str], edge: &MatchEdge) -> bool {
    let n = retailers.len();
    if edge.a == edge.b || edge.a >= n || edge.b >= n {
        return false;
    }
    if retailers[edge.a] == retailers[edge.b] {
        debug!(a = edge.a, b = edge.b, "Ignoring same-retailer edge");
        return false;
    }
    true
}

fn build_adjacency(retailers: &[&str], edges: &[MatchEdge]) -> Vec<Vec<(usize, f64)>> {
    let mut adjacency = vec![Vec::new(); retailers.len()];
    for edge in edges.iter().filter(|e| is_valid_edge(retailers, e)) {
        adjacency[edge.a].push((edge.b, edge.score));
        adjacency[edge.b].push((edge.a, edge.score));
    }
    adjacency
}

/// Connected components among active nodes, each sorted ascending
fn components(
    adjacency: &[Vec<(usize, f64)>],
    active: &[bool],
    starts: impl IntoIterator<Item = usize>,
) -> Vec<Vec<usize>> {
    let mut visited = vec![false; adjacency.len()];
    let mut found = Vec::new();

    for start in starts {
        if !active[start] || visited[start] {
            continue;
        }
        visited[start] = true;
        let mut component = vec![start];
        let mut queue = VecDeque::from([start]);
        while let Some(node) = queue.pop_front() {
            for &(next, _) in &adjacency[node] {
                if active[next] && !visited[next] {
                    visited[next] = true;
                    component.push(next);
                    queue.push_back(next);
                }
            }
        }
        component.sort_unstable();
        found.push(component);
    }
    found
}

/// Pick one record per retailer inside a component; returns the rest
fn resolve_retailer_conflicts(
    component: &[usize],
    retailers: &[&str],
    adjacency: &[Vec<(usize, f64)>],
    active: &[bool],
    report: &mut ClusteringReport,
) -> Vec<usize> {
    let mut by_retailer: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
    for &node in component {
        by_retailer.entry(retailers[node]).or_default().push(node);
    }

    let best_edge = |node: usize| {
        adjacency[node]
            .iter()
            .filter(|(other, _)| active[*other])
            .map(|(_, score)| *score)
            .fold(f64::NEG_INFINITY, f64::max)
    };

    let mut ejected = Vec::new();
    for (retailer, members) in by_retailer {
        if members.len() < 2 {
            continue;
        }
        let Some(keep) = members
            .iter()
            .copied()
            .max_by(|&x, &y| best_edge(x).total_cmp(&best_edge(y)).then(y.cmp(&x)))
        else {
            continue;
        };

        let rejected: Vec<usize> = members.into_iter().filter(|n| *n != keep).collect();
        report.retailer_conflicts += 1;
        warn!(
            retailer,
            kept = keep,
            rejected = ?rejected,
            "Cluster held several records from one retailer; keeping the highest-scoring match"
        );
        ejected.extend(rejected);
    }
    ejected.sort_unstable();
    ejected
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edge(a: usize, b: usize, score: f64) -> MatchEdge {
        MatchEdge::new(a, b, score)
    }

    fn assert_retailer_exclusive(retailers: &[&str], assignment: &ClusterAssignment) {
        let mut seen = vec![0usize; retailers.len()];
        for group in &assignment.groups {
            let mut group_retailers = HashSet::new();
            for &node in group {
                seen[node] += 1;
                assert!(group_retailers.insert(retailers[node]), "group {group:?} repeats a retailer");
            }
        }
        assert!(seen.iter().all(|count| *count == 1), "every node must appear exactly once");
    }

    #[test]
    fn test_edge_endpoints_are_ordered() {
        let e = MatchEdge::new(5, 2, 90.0);
        assert_eq!((e.a, e.b), (2, 5));
    }

    #[test]
    fn test_matching_is_transitive() {
        // A-B = 85, B-C = 82; A-C = 60 is below threshold and never becomes an edge
        let retailers = ["Shoprite", "Checkers", "PicknPay"];
        let edges = [edge(0, 1, 85.0), edge(1, 2, 82.0)];

        let assignment = ConnectedComponents.assign(&retailers, &edges);
        assert_eq!(assignment.groups, vec![vec![0, 1, 2]]);
        assert_eq!(assignment.report, ClusteringReport::default());
    }

    #[test]
    fn test_unmatched_records_are_singletons() {
        let retailers = ["Shoprite", "Checkers", "PicknPay"];
        let assignment = ConnectedComponents.assign(&retailers, &[edge(0, 2, 91.0)]);
        assert_eq!(assignment.groups, vec![vec![0, 2], vec![1]]);
    }

    #[test]
    fn test_same_retailer_edges_are_ignored() {
        let retailers = ["Shoprite", "Shoprite"];
        let assignment = ConnectedComponents.assign(&retailers, &[edge(0, 1, 99.0)]);
        assert_eq!(assignment.groups, vec![vec![0], vec![1]]);
    }

    /// Authoritative tie-break: when a cluster would hold two records from
    /// one retailer, the record with the highest-scoring edge stays and the
    /// other becomes its own singleton cluster.
    #[test]
    fn test_retailer_conflict_keeps_highest_scoring_record() {
        let retailers = ["Shoprite", "Checkers", "Checkers"];
        let edges = [edge(0, 1, 90.0), edge(0, 2, 85.0)];

        let assignment = ConnectedComponents.assign(&retailers, &edges);
        assert_eq!(assignment.groups, vec![vec![0, 1], vec![2]]);
        assert_eq!(assignment.report.retailer_conflicts, 1);
        assert_eq!(assignment.report.ejected, vec![2]);
    }

    #[test]
    fn test_retailer_conflict_tie_keeps_first_seen() {
        let retailers = ["Shoprite", "Checkers", "Checkers"];
        let edges = [edge(0, 2, 88.0), edge(0, 1, 88.0)];

        let assignment = ConnectedComponents.assign(&retailers, &edges);
        assert_eq!(assignment.groups, vec![vec![0, 1], vec![2]]);
        assert_eq!(assignment.report.ejected, vec![2]);
    }

    #[test]
    fn test_ejecting_a_bridge_resplits_the_component() {
        // 0 -95- 1 -90- 2 -85- 3 -88- 4, with 1 and 3 both from Checkers
        let retailers = ["Shoprite", "Checkers", "PicknPay", "Checkers", "Woolworths"];
        let edges = [
            edge(0, 1, 95.0),
            edge(1, 2, 90.0),
            edge(2, 3, 85.0),
            edge(3, 4, 88.0),
        ];

        let assignment = ConnectedComponents.assign(&retailers, &edges);
        assert_eq!(assignment.groups, vec![vec![0, 1, 2], vec![3], vec![4]]);
        assert_eq!(assignment.report.ejected, vec![3]);
        assert_retailer_exclusive(&retailers, &assignment);
    }

    #[test]
    fn test_strict_pairwise_requires_every_pair() {
        let retailers = ["Shoprite", "Checkers", "PicknPay"];
        let chain = [edge(0, 1, 85.0), edge(1, 2, 82.0)];
        let assignment = StrictPairwise.assign(&retailers, &chain);
        assert_eq!(assignment.groups, vec![vec![0, 1], vec![2]]);

        let triangle = [edge(0, 1, 85.0), edge(1, 2, 82.0), edge(0, 2, 81.0)];
        let assignment = StrictPairwise.assign(&retailers, &triangle);
        assert_eq!(assignment.groups, vec![vec![0, 1, 2]]);
    }

    #[test]
    fn test_strict_pairwise_counts_retailer_conflicts() {
        let retailers = ["Shoprite", "Checkers", "Checkers"];
        let edges = [edge(0, 1, 90.0), edge(0, 2, 85.0)];

        let assignment = StrictPairwise.assign(&retailers, &edges);
        assert_eq!(assignment.groups, vec![vec![0, 1], vec![2]]);
        assert_eq!(assignment.report.retailer_conflicts, 1);
    }

    #[test]
    fn test_no_cluster_repeats_a_retailer() {
        let names = ["Shoprite", "Checkers", "PicknPay", "Woolworths"];
        let retailers: Vec<&str> = (0..40).map(|i| names[i % names.len()]).collect();

        // Deterministic pseudo-random dense graph
        let mut state: u64 = 0x2545_f491_4f6c_dd1d;
        let mut edges = Vec::new();
        for a in 0..retailers.len() {
            for b in (a + 1)..retailers.len() {
                state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
                if (state >> 33) % 7 == 0 {
                    edges.push(edge(a, b, 80.0 + ((state >> 40) % 20) as f64));
                }
            }
        }

        assert_retailer_exclusive(&retailers, &ConnectedComponents.assign(&retailers, &edges));
        assert_retailer_exclusive(&retailers, &StrictPairwise.assign(&retailers, &edges));
    }
}
