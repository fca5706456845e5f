use super::*;

#[test]
fn duplicates_coalesce_in_first_seen_order() {
    let mut q = InvalidationQueue::default();
    q.record(Invalidation::Rotation);
    q.record(Invalidation::Parameter("a".to_owned()));
    q.record(Invalidation::Rotation);
    q.record(Invalidation::Parameter("b".to_owned()));
    assert_eq!(
        q.drain(),
        vec![
            Invalidation::Rotation,
            Invalidation::Parameter("a".to_owned()),
            Invalidation::Parameter("b".to_owned()),
        ]
    );
    assert!(q.is_empty());
}

#[test]
fn suppression_nests() {
    let mut q = InvalidationQueue::default();
    q.suppress();
    q.suppress();
    q.record(Invalidation::Formula);
    assert!(!q.release());
    assert!(q.is_suppressed());
    assert!(q.release());
    assert!(!q.is_suppressed());
    assert!(q.is_empty());
    assert!(!q.release());
}
