//! Properties of the ancestry order over the whole bundled database.

use archspec::MicroarchDatabase;

#[test]
fn order_is_irreflexive_and_reflexive_non_strict() {
    let db = MicroarchDatabase::global();
    for target in db.targets() {
        let again = db.get(target.name()).unwrap();
        assert!(!(target < again), "{target} < {target}");
        assert!(target <= again, "{target} <= {target}");
        assert!(target >= again);
    }
}

#[test]
fn ancestors_are_less_than_descendants() {
    let db = MicroarchDatabase::global();
    for target in db.targets() {
        for name in target.ancestors() {
            let ancestor = db.get(name).unwrap();
            assert!(ancestor < target, "{ancestor} should be < {target}");
            assert!(target > ancestor);
            assert!(!(target < ancestor));
        }
    }
}

#[test]
fn order_is_antisymmetric() {
    let db = MicroarchDatabase::global();
    let targets: Vec<_> = db.targets().collect();
    for a in &targets {
        for b in &targets {
            if a < b {
                assert!(!(b < a), "{a} and {b} are both less than each other");
            }
        }
    }
}

#[test]
fn different_families_are_incomparable() {
    let db = MicroarchDatabase::global();
    let haswell = db.get("haswell").unwrap();
    let m1 = db.get("m1").unwrap();
    assert_eq!(haswell.partial_cmp(&m1), None);
    assert!(!(haswell < m1) && !(haswell > m1) && haswell != m1);
}

#[test]
fn every_descriptor_belongs_to_a_root() {
    let db = MicroarchDatabase::global();
    for target in db.targets() {
        let family = db.get(target.family()).unwrap();
        assert!(family.parent_names().is_empty(), "{target}: {family}");
        let generic = db.get(target.generic()).unwrap();
        assert!(generic.is_generic() || generic.name() == family.name());
    }
}

#[test]
fn has_feature_is_stable_across_queries() {
    let db = MicroarchDatabase::global();
    let skx = db.get("skylake_avx512").unwrap();
    let first: Vec<bool> = ["avx512", "sse4.2", "avx512f", "neon"]
        .iter()
        .map(|f| skx.has_feature(f))
        .collect();
    let second: Vec<bool> = ["neon", "avx512f", "sse4.2", "avx512"]
        .iter()
        .rev()
        .map(|f| skx.has_feature(f))
        .collect();
    assert_eq!(first, second);
    assert_eq!(first, vec![true, true, true, false]);
}
