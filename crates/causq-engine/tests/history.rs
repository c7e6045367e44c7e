use super::*;
use causq_model::TypeId;

#[test]
fn record_is_one_cache_line() {
    assert_eq!(size_of::<TypeflowHistory>(), 64);
    assert_eq!(align_of::<TypeflowHistory>(), 64);
}

#[test]
fn add_type_appends_and_dedupes() {
    let mut h = TypeflowHistory::new();
    assert!(!h.any());
    assert!(h.add_type(TypeId(5), 2));
    assert!(h.any());
    assert!(!h.add_type(TypeId(5), 9), "re-adding must not change");
    assert!(h.add_type(TypeId(6), 3));
    assert_eq!(h.count(), 2);
    assert_eq!(
        h.iter().collect::<Vec<_>>(),
        vec![(TypeId(5), 2), (TypeId(6), 3)]
    );
    assert!(h.contains(TypeId(5)));
    assert!(!h.contains(TypeId(7)));
    assert!(!h.is_saturated());
}

#[test]
fn capacity_overflow_saturates() {
    let mut h = TypeflowHistory::new();
    for i in 0..SATURATION_CUTOFF {
        assert!(h.add_type(TypeId(i as u16), i as u8));
    }
    assert!(!h.is_saturated());
    assert_eq!(h.count(), SATURATION_CUTOFF);

    // One past capacity: the record saturates and stops storing types.
    assert!(h.add_type(TypeId(100), 7));
    assert!(h.is_saturated());
    assert_eq!(h.saturated_dist(), Some(7));
    assert_eq!(h.count(), SATURATION_CUTOFF);
    assert!(!h.contains(TypeId(100)));
    assert!(h.any());
}

#[test]
fn duplicates_never_saturate() {
    let mut h = TypeflowHistory::new();
    for i in 0..SATURATION_CUTOFF {
        h.add_type(TypeId(i as u16), 0);
    }
    for i in 0..SATURATION_CUTOFF {
        assert!(!h.add_type(TypeId(i as u16), 0));
    }
    assert!(!h.is_saturated());
}

#[test]
fn method_history_byte_encoding() {
    assert!(!MethodHistory::UNREACHED.is_reached());
    assert_eq!(MethodHistory::UNREACHED.distance(), None);
    assert_eq!(MethodHistory::UNREACHED.raw(), 255);

    let at3 = MethodHistory::at(3);
    assert!(at3.is_reached());
    assert_eq!(at3.distance(), Some(3));
    assert_eq!(at3.raw(), 3);

    assert_eq!(MethodHistory::at(DIST_CAP).raw(), 254);
    assert_eq!(MethodHistory::default(), MethodHistory::UNREACHED);
}
