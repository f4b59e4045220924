//! Behaviour every [`Graph`] backend must share.
//!
//! Backends run the suite with
//! `crate::suite::graph_conformance_tests!(<expr building a fresh graph>)`
//! inside their test module.

use std::num::NonZeroU32;
use std::thread;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, TimeZone, Utc};
use uuid::Uuid;

use linkdex_core::partition;
use linkdex_core::{Edge, Graph, GraphError, IdRange, Link};

fn utc(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
}

fn far_future() -> DateTime<Utc> {
    Utc::now() + Duration::days(365)
}

fn all_links(graph: &dyn Graph, before: DateTime<Utc>) -> Vec<Link> {
    let full = IdRange::full();
    let mut it = graph.links(full.from, full.to, before).unwrap();
    let links: Vec<Link> = it.by_ref().collect();
    assert!(it.error().is_none());
    it.close().unwrap();
    links
}

fn all_edges(graph: &dyn Graph) -> Vec<Edge> {
    let full = IdRange::full();
    let mut it = graph.edges(full.from, full.to, far_future()).unwrap();
    let edges: Vec<Edge> = it.by_ref().collect();
    assert!(it.error().is_none());
    it.close().unwrap();
    edges
}

/// Let the wall clock move past timestamps stamped so far.
fn tick() {
    thread::sleep(StdDuration::from_millis(5));
}

pub(crate) fn upsert_link_assigns_id_and_is_findable(graph: &dyn Graph) {
    let stored = graph
        .upsert_link(&Link::new("https://example.com", utc(2025, 1, 1)))
        .unwrap();
    assert!(!stored.id.is_nil());

    let found = graph.find_link(stored.id).unwrap();
    assert_eq!(found, stored);
}

pub(crate) fn upsert_link_ignores_caller_supplied_id(graph: &dyn Graph) {
    let mut link = Link::new("https://example.com", utc(2025, 1, 1));
    link.id = Uuid::new_v4();
    let stored = graph.upsert_link(&link).unwrap();
    assert_ne!(stored.id, link.id);
}

pub(crate) fn upsert_existing_url_keeps_id_and_latest_retrieved_at(graph: &dyn Graph) {
    let first = graph
        .upsert_link(&Link::new("https://a", utc(2025, 1, 2)))
        .unwrap();
    let older = graph
        .upsert_link(&Link::new("https://a", utc(2025, 1, 1)))
        .unwrap();
    assert_eq!(older.id, first.id);
    assert_eq!(older.retrieved_at, utc(2025, 1, 2));

    let newer = graph
        .upsert_link(&Link::new("https://a", utc(2025, 1, 3)))
        .unwrap();
    assert_eq!(newer.id, first.id);
    assert_eq!(graph.find_link(first.id).unwrap().retrieved_at, utc(2025, 1, 3));
    assert_eq!(all_links(graph, far_future()).len(), 1);
}

pub(crate) fn find_missing_link_is_not_found(graph: &dyn Graph) {
    let id = Uuid::new_v4();
    let err = graph.find_link(id).unwrap_err();
    assert!(matches!(err, GraphError::NotFound(missing) if missing == id));
}

pub(crate) fn upsert_edge_with_unknown_endpoint_fails(graph: &dyn Graph) {
    let known = graph
        .upsert_link(&Link::new("https://known", utc(2025, 1, 1)))
        .unwrap();
    let unknown = Uuid::new_v4();

    for edge in [Edge::new(known.id, unknown), Edge::new(unknown, known.id)] {
        let err = graph.upsert_edge(&edge).unwrap_err();
        assert!(matches!(err, GraphError::UnknownEdgeEndpoint { .. }));
    }
    assert!(all_edges(graph).is_empty());
}

pub(crate) fn upsert_edge_twice_keeps_one_edge_and_advances_updated_at(graph: &dyn Graph) {
    let a = graph.upsert_link(&Link::new("https://a", utc(2025, 1, 1))).unwrap();
    let b = graph.upsert_link(&Link::new("https://b", utc(2025, 1, 1))).unwrap();

    let first = graph.upsert_edge(&Edge::new(a.id, b.id)).unwrap();
    assert!(!first.id.is_nil());
    tick();
    let second = graph.upsert_edge(&Edge::new(a.id, b.id)).unwrap();

    assert_eq!(second.id, first.id);
    assert!(second.updated_at > first.updated_at);
    let edges = all_edges(graph);
    assert_eq!(edges.len(), 1);
    assert_eq!(edges[0].updated_at, second.updated_at);
}

pub(crate) fn remove_stale_edges_only_prunes_old_edges_from_source(graph: &dyn Graph) {
    let a = graph.upsert_link(&Link::new("https://a", utc(2025, 1, 1))).unwrap();
    let b = graph.upsert_link(&Link::new("https://b", utc(2025, 1, 1))).unwrap();
    let c = graph.upsert_link(&Link::new("https://c", utc(2025, 1, 1))).unwrap();

    let stale = graph.upsert_edge(&Edge::new(a.id, b.id)).unwrap();
    let refreshed = graph.upsert_edge(&Edge::new(a.id, c.id)).unwrap();
    let other_source = graph.upsert_edge(&Edge::new(b.id, c.id)).unwrap();

    tick();
    let cutoff = Utc::now();
    tick();
    graph.upsert_edge(&Edge::new(a.id, c.id)).unwrap();

    graph.remove_stale_edges(a.id, cutoff).unwrap();

    let mut remaining: Vec<Uuid> = all_edges(graph).into_iter().map(|e| e.id).collect();
    remaining.sort_unstable();
    let mut expected = vec![refreshed.id, other_source.id];
    expected.sort_unstable();
    assert_eq!(remaining, expected);
    assert!(!remaining.contains(&stale.id));
}

pub(crate) fn remove_stale_edges_without_edges_is_noop(graph: &dyn Graph) {
    graph.remove_stale_edges(Uuid::new_v4(), far_future()).unwrap();

    let a = graph.upsert_link(&Link::new("https://a", utc(2025, 1, 1))).unwrap();
    graph.remove_stale_edges(a.id, far_future()).unwrap();
    assert_eq!(graph.find_link(a.id).unwrap(), a);
}

pub(crate) fn links_respects_range_and_cutoff(graph: &dyn Graph) {
    let mut stored = Vec::new();
    for (i, day) in [1, 2, 3, 4, 5, 6].into_iter().enumerate() {
        stored.push(
            graph
                .upsert_link(&Link::new(format!("https://example.com/{i}"), utc(2025, 1, day)))
                .unwrap(),
        );
    }
    let mut ids: Vec<Uuid> = stored.iter().map(|l| l.id).collect();
    ids.sort_unstable();

    // [ids[1], ids[4]) contains ids[1], ids[2], ids[3].
    let cutoff = utc(2025, 1, 4);
    let mut got: Vec<Uuid> = graph
        .links(ids[1], ids[4], cutoff)
        .unwrap()
        .map(|l| l.id)
        .collect();
    got.sort_unstable();

    let mut expected: Vec<Uuid> = stored
        .iter()
        .filter(|l| l.id >= ids[1] && l.id < ids[4] && l.retrieved_at < cutoff)
        .map(|l| l.id)
        .collect();
    expected.sort_unstable();
    assert_eq!(got, expected);

    // Empty range.
    assert_eq!(graph.links(ids[2], ids[2], far_future()).unwrap().count(), 0);
}

pub(crate) fn links_partition_covers_every_link_once(graph: &dyn Graph) {
    let now = utc(2025, 1, 1);
    for i in 0..40 {
        graph
            .upsert_link(&Link::new(format!("https://example.com/{i}"), now))
            .unwrap();
    }

    for parts in 1..=8 {
        let mut seen: Vec<Uuid> = partition::ranges(NonZeroU32::new(parts).unwrap())
            .into_iter()
            .flat_map(|r| {
                graph
                    .links(r.from, r.to, far_future())
                    .unwrap()
                    .map(|l| l.id)
                    .collect::<Vec<_>>()
            })
            .collect();
        assert_eq!(seen.len(), 40);
        seen.sort_unstable();
        seen.dedup();
        assert_eq!(seen.len(), 40);
    }
}

pub(crate) fn edges_are_sharded_by_source_link(graph: &dyn Graph) {
    let a = graph.upsert_link(&Link::new("https://a", utc(2025, 1, 1))).unwrap();
    let b = graph.upsert_link(&Link::new("https://b", utc(2025, 1, 1))).unwrap();
    let (lo, hi) = if a.id < b.id { (a, b) } else { (b, a) };

    let from_lo = graph.upsert_edge(&Edge::new(lo.id, hi.id)).unwrap();
    let from_hi = graph.upsert_edge(&Edge::new(hi.id, lo.id)).unwrap();

    // A range holding only the lower source yields only its outgoing edge,
    // whatever the edge ids are.
    let only_lo: Vec<Edge> = graph
        .edges(lo.id, hi.id, far_future())
        .unwrap()
        .collect();
    assert_eq!(only_lo, vec![from_lo.clone()]);

    let only_hi: Vec<Edge> = graph
        .edges(hi.id, IdRange::full().to, far_future())
        .unwrap()
        .collect();
    assert_eq!(only_hi, vec![from_hi.clone()]);

    // Edges updated at or after the cutoff are excluded.
    let before_any = from_lo.updated_at.min(from_hi.updated_at);
    let full = IdRange::full();
    assert_eq!(graph.edges(full.from, full.to, before_any).unwrap().count(), 0);
}

pub(crate) fn extreme_cutoffs_bound_every_timestamp(graph: &dyn Graph) {
    let a = graph.upsert_link(&Link::new("https://a", utc(2025, 1, 1))).unwrap();
    let b = graph
        .upsert_link(&Link::new("https://b", DateTime::<Utc>::MIN_UTC))
        .unwrap();
    graph.upsert_edge(&Edge::new(a.id, b.id)).unwrap();
    graph.upsert_edge(&Edge::new(b.id, a.id)).unwrap();

    let full = IdRange::full();
    assert_eq!(all_links(graph, DateTime::<Utc>::MAX_UTC).len(), 2);
    assert!(all_links(graph, DateTime::<Utc>::MIN_UTC).is_empty());
    assert_eq!(
        graph
            .edges(full.from, full.to, DateTime::<Utc>::MAX_UTC)
            .unwrap()
            .count(),
        2
    );
    assert_eq!(
        graph
            .edges(full.from, full.to, DateTime::<Utc>::MIN_UTC)
            .unwrap()
            .count(),
        0
    );

    graph.remove_stale_edges(a.id, DateTime::<Utc>::MAX_UTC).unwrap();
    let left = all_edges(graph);
    assert_eq!(left.len(), 1);
    assert_eq!(left[0].src, b.id);
}

pub(crate) fn iterator_close_is_idempotent(graph: &dyn Graph) {
    for i in 0..3 {
        graph
            .upsert_link(&Link::new(format!("https://example.com/{i}"), utc(2025, 1, 1)))
            .unwrap();
    }

    let full = IdRange::full();
    let mut it = graph.links(full.from, full.to, far_future()).unwrap();
    assert!(it.next().is_some());
    it.close().unwrap();
    it.close().unwrap();
    assert!(it.next().is_none());
    assert!(it.error().is_none());
}

pub(crate) fn end_to_end_link_and_edge_scenario(graph: &dyn Graph) {
    let t0 = utc(2025, 1, 1);
    let t1 = utc(2025, 1, 2);

    let l1 = graph.upsert_link(&Link::new("http://a", t1)).unwrap();
    let again = graph.upsert_link(&Link::new("http://a", t0)).unwrap();
    assert_eq!(again.id, l1.id);
    assert_eq!(graph.find_link(l1.id).unwrap().retrieved_at, t1);

    let l2 = graph.upsert_link(&Link::new("http://b", t0)).unwrap();
    assert_ne!(l2.id, l1.id);

    let e1 = graph.upsert_edge(&Edge::new(l1.id, l2.id)).unwrap();
    tick();
    let e1_again = graph.upsert_edge(&Edge::new(l1.id, l2.id)).unwrap();
    assert_eq!(e1_again.id, e1.id);
    assert!(e1_again.updated_at > e1.updated_at);

    // [L1, L1 + 1) holds exactly L1.
    let next = Uuid::from_u128(l1.id.as_u128() + 1);
    let edges: Vec<Edge> = graph
        .edges(l1.id, next, Utc::now() + Duration::seconds(1))
        .unwrap()
        .collect();
    assert_eq!(edges.len(), 1);
    assert_eq!(edges[0].id, e1.id);
}

macro_rules! graph_conformance_tests {
    ($make:expr) => {
        mod conformance {
            #[allow(unused_imports)]
            use super::*;

            fn graph() -> impl linkdex_core::Graph {
                $make
            }

            #[test]
            fn upsert_link_assigns_id_and_is_findable() {
                crate::suite::upsert_link_assigns_id_and_is_findable(&graph());
            }

            #[test]
            fn upsert_link_ignores_caller_supplied_id() {
                crate::suite::upsert_link_ignores_caller_supplied_id(&graph());
            }

            #[test]
            fn upsert_existing_url_keeps_id_and_latest_retrieved_at() {
                crate::suite::upsert_existing_url_keeps_id_and_latest_retrieved_at(&graph());
            }

            #[test]
            fn find_missing_link_is_not_found() {
                crate::suite::find_missing_link_is_not_found(&graph());
            }

            #[test]
            fn upsert_edge_with_unknown_endpoint_fails() {
                crate::suite::upsert_edge_with_unknown_endpoint_fails(&graph());
            }

            #[test]
            fn upsert_edge_twice_keeps_one_edge_and_advances_updated_at() {
                crate::suite::upsert_edge_twice_keeps_one_edge_and_advances_updated_at(&graph());
            }

            #[test]
            fn remove_stale_edges_only_prunes_old_edges_from_source() {
                crate::suite::remove_stale_edges_only_prunes_old_edges_from_source(&graph());
            }

            #[test]
            fn remove_stale_edges_without_edges_is_noop() {
                crate::suite::remove_stale_edges_without_edges_is_noop(&graph());
            }

            #[test]
            fn links_respects_range_and_cutoff() {
                crate::suite::links_respects_range_and_cutoff(&graph());
            }

            #[test]
            fn links_partition_covers_every_link_once() {
                crate::suite::links_partition_covers_every_link_once(&graph());
            }

            #[test]
            fn edges_are_sharded_by_source_link() {
                crate::suite::edges_are_sharded_by_source_link(&graph());
            }

            #[test]
            fn extreme_cutoffs_bound_every_timestamp() {
                crate::suite::extreme_cutoffs_bound_every_timestamp(&graph());
            }

            #[test]
            fn iterator_close_is_idempotent() {
                crate::suite::iterator_close_is_idempotent(&graph());
            }

            #[test]
            fn end_to_end_link_and_edge_scenario() {
                crate::suite::end_to_end_link_and_edge_scenario(&graph());
            }
        }
    };
}

pub(crate) use graph_conformance_tests;
