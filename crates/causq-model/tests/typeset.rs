use super::*;

fn bitset(n: usize, bits: &[usize]) -> Bitset {
    let mut set = Bitset::new(n);
    for &b in bits {
        set.insert(b);
    }
    set
}

#[test]
fn popcount_one_compresses_to_single() {
    let one = bitset(50, &[17]);
    let set = TypeSet::from_bitset(&one);
    assert!(matches!(set, TypeSet::Single(TypeId(17))));
    assert_eq!(set.count(), 1);
    assert!(set.contains(TypeId(17)));
    assert!(!set.contains(TypeId(16)));
}

#[test]
fn larger_sets_stay_bitsets() {
    let two = bitset(50, &[17, 40]);
    let set = TypeSet::from_bitset(&two);
    assert!(matches!(set, TypeSet::Many(_)));
    assert_eq!(set.count(), 2);

    let empty = bitset(50, &[]);
    assert!(matches!(TypeSet::from_bitset(&empty), TypeSet::Many(_)));
}

#[test]
fn iteration_is_ascending_for_both_forms() {
    let many = bitset(100, &[5, 63, 64, 99]);
    let collected: Vec<_> = TypeSet::from_bitset(&many).iter().collect();
    assert_eq!(
        collected,
        vec![TypeId(5), TypeId(63), TypeId(64), TypeId(99)]
    );

    let single = TypeSet::Single(TypeId(9));
    assert_eq!(single.iter().collect::<Vec<_>>(), vec![TypeId(9)]);
    assert_eq!(single.next_after(TypeId(9)), None);
}

#[test]
fn superset_dispatches_on_both_tags() {
    let many = bitset(20, &[1, 2, 3]);
    let many = TypeSet::from_bitset(&many);
    let empty = bitset(20, &[]);
    let empty = TypeSet::from_bitset(&empty);

    // single vs single
    assert!(TypeSet::Single(TypeId(4)).is_superset(TypeSet::Single(TypeId(4))));
    assert!(!TypeSet::Single(TypeId(4)).is_superset(TypeSet::Single(TypeId(5))));
    // single vs many: only the empty set is covered
    assert!(TypeSet::Single(TypeId(4)).is_superset(empty));
    assert!(!TypeSet::Single(TypeId(1)).is_superset(many));
    // many vs single
    assert!(many.is_superset(TypeSet::Single(TypeId(2))));
    assert!(!many.is_superset(TypeSet::Single(TypeId(9))));
    // many vs many
    let sub = bitset(20, &[1, 3]);
    assert!(many.is_superset(TypeSet::from_bitset(&sub)));
}
