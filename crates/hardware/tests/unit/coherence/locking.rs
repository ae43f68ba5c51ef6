//! Set Lock Tests.
//!
//! Two lookups that map to the same set contend for its directory lock. A
//! non-blocking loser retries after a randomized backoff; a blocking loser
//! fails immediately. Neither may disturb the winner's transient tag.

use mcsim_core::MemorySystem;
use mcsim_core::coherence::{Phase, Reply};
use mcsim_core::common::NodeId;
use mcsim_core::config::MemoryConfig;

fn system() -> (MemorySystem, NodeId, u64, u64) {
    let config = MemoryConfig::default();
    let ms = MemorySystem::new(&config, 1, 7);
    let l1d = ms.l1_data(0);
    let a = 0x4000;
    let b = a + config.l1_d.sets as u64 * config.l1_d.line_size;
    (ms, l1d, a, b)
}

fn advance(ms: &mut MemorySystem, cycles: usize) {
    for _ in 0..cycles {
        ms.advance_one_cycle();
    }
}

fn transient_tags(ms: &MemorySystem, node: NodeId) -> Vec<u64> {
    ms.cache(node)
        .unwrap()
        .slots()
        .filter_map(|(_, _, block, _)| block.transient_tag)
        .collect()
}

#[test]
fn same_set_lookups_map_to_one_set() {
    let (ms, l1d, a, b) = system();
    let cache = ms.cache(l1d).unwrap();
    assert_eq!(cache.set_index(a), cache.set_index(b));
    assert_ne!(cache.block_addr(a), cache.block_addr(b));
}

#[test]
fn concurrent_non_blocking_lookup_retries_without_corrupting_winner() {
    let (mut ms, l1d, a, b) = system();
    let first = ms.find_and_lock(l1d, a, false, true, false);
    let second = ms.find_and_lock(l1d, b, false, true, false);
    advance(&mut ms, 1);

    let set = ms.cache(l1d).unwrap().set_index(a);
    assert_eq!(ms.cache(l1d).unwrap().lock(set).holder, Some(first));
    let loser = ms.transaction(second).unwrap();
    assert!(loser.is_retry);
    assert_eq!(loser.phase, Phase::Locking);
    assert_eq!(transient_tags(&ms, l1d), vec![a]);

    advance(&mut ms, 20);
    assert_eq!(ms.external_reply(first), Some(Reply::OK));
    assert_eq!(ms.external_reply(second), None);
    assert_eq!(ms.transaction(first).unwrap().phase, Phase::Held);
    assert_eq!(transient_tags(&ms, l1d), vec![a]);

    assert!(ms.release(first));
    advance(&mut ms, 20);
    assert_eq!(ms.external_reply(second), Some(Reply::OK));
    assert_eq!(ms.cache(l1d).unwrap().lock(set).holder, Some(second));
    assert_eq!(transient_tags(&ms, l1d), vec![b]);
}

#[test]
fn blocking_lookup_fails_on_contention() {
    let (mut ms, l1d, a, b) = system();
    let first = ms.find_and_lock(l1d, a, false, true, false);
    let second = ms.find_and_lock(l1d, b, true, true, false);
    advance(&mut ms, 3);

    assert_eq!(ms.external_reply(second), Some(Reply::ERROR));
    assert!(ms.transaction(second).is_none());
    assert_eq!(ms.external_reply(first), Some(Reply::OK));
}

#[test]
fn retried_lookup_is_counted_once() {
    let (mut ms, l1d, a, b) = system();
    let first = ms.find_and_lock(l1d, a, false, true, false);
    let _second = ms.find_and_lock(l1d, b, false, false, false);
    advance(&mut ms, 30);

    let stats = ms.cache_stats(l1d).unwrap();
    assert_eq!(stats.accesses, 2);
    assert_eq!(stats.reads, 1);
    assert_eq!(stats.writes, 1);
    assert!(ms.release(first));
}

#[test]
fn release_rejects_unknown_or_unheld_transactions() {
    let (mut ms, l1d, a, _) = system();
    let tx = ms.find_and_lock(l1d, a, false, true, false);
    assert!(!ms.release(tx), "not locked before its start event runs");
    advance(&mut ms, 3);
    assert!(ms.release(tx));
    assert!(!ms.release(tx));
}
