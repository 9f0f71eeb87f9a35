//! Property-based tests for change detection, the interrupt latch and
//! publish ordering.

use proptest::prelude::*;

use sensornode_core::{
    ChangeDetector, InterruptLatch, Item, ItemKind, LatchState, MetricRecord, PublishSet,
};

const STALE_MS: u64 = 300_000;

fn arb_light_record() -> impl Strategy<Value = MetricRecord<u16>> {
    (any::<u16>(), 0..1_000_000u64).prop_map(|(last_value, last_sent_at)| MetricRecord {
        last_value,
        valid: true,
        last_sent_at,
    })
}

fn arb_item() -> impl Strategy<Value = Item> {
    prop_oneof![
        any::<u16>().prop_map(Item::Light),
        (-40.0f32..85.0).prop_map(Item::Temperature),
        (0.0f32..100.0).prop_map(Item::Humidity),
        any::<bool>().prop_map(Item::Motion),
    ]
}

proptest! {
    #[test]
    fn quiet_reading_leaves_baseline(
        record in arb_light_record(),
        threshold in 0u16..50,
        delta in 0u16..50,
        up in any::<bool>(),
        elapsed in 0..STALE_MS,
    ) {
        let delta = delta.min(threshold);
        let value = if up {
            record.last_value.saturating_add(delta)
        } else {
            record.last_value.saturating_sub(delta)
        };

        let detector = ChangeDetector::new(threshold, STALE_MS);
        let eval = detector.evaluate(value, &record, record.last_sent_at + elapsed);

        prop_assert!(!eval.dirty);
        prop_assert_eq!(eval.record, record);
    }

    #[test]
    fn dirty_reading_becomes_valid_baseline(
        record in arb_light_record(),
        value in any::<u16>(),
        now in 0..2_000_000u64,
    ) {
        let detector = ChangeDetector::new(2u16, STALE_MS);
        let eval = detector.evaluate(value, &record, now);

        if eval.dirty {
            prop_assert_eq!(eval.record, MetricRecord { last_value: value, valid: true, last_sent_at: now });
        } else {
            prop_assert_eq!(eval.record, record);
        }
    }

    #[test]
    fn missing_baseline_is_always_dirty(value in -1000.0f32..1000.0, now in any::<u64>()) {
        let detector = ChangeDetector::new(0.2f32, STALE_MS);
        prop_assert!(detector.evaluate(value, &MetricRecord::default(), now).dirty);
    }

    #[test]
    fn stale_baseline_is_always_dirty(
        record in arb_light_record(),
        extra in 0..1_000_000u64,
    ) {
        let detector = ChangeDetector::new(u16::MAX, STALE_MS);
        let eval = detector.evaluate(record.last_value, &record, record.last_sent_at + STALE_MS + extra);

        prop_assert!(eval.dirty);
    }

    #[test]
    fn latch_clears_only_for_latest_level(edges in prop::collection::vec(any::<bool>(), 1..16)) {
        let latch = InterruptLatch::new();
        for level in &edges {
            latch.on_edge(*level);
        }

        let seen = latch.snapshot();
        prop_assert!(seen.pending);

        // Acknowledging the other level must not clear the edge
        prop_assert!(!latch.acknowledge(!seen.level));
        prop_assert!(latch.snapshot().pending);

        prop_assert!(latch.acknowledge(seen.level));
        prop_assert_eq!(latch.snapshot(), LatchState { level: seen.level, pending: false });
    }

    #[test]
    fn publish_order_is_fixed(items in prop::collection::vec(arb_item(), 0..12)) {
        let mut set = PublishSet::new();
        for item in &items {
            set.insert(*item);
        }

        let kinds: Vec<ItemKind> = set.iter().map(Item::kind).collect();
        let mut sorted = kinds.clone();
        sorted.sort();
        sorted.dedup();
        prop_assert_eq!(kinds, sorted);

        // Last write per kind wins
        for item in &items {
            let last = items.iter().rev().find(|i| i.kind() == item.kind());
            prop_assert_eq!(set.iter().find(|i| i.kind() == item.kind()), last);
        }
    }
}
