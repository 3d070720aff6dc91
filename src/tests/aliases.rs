use std::sync::Arc;

use crate::aliases::{AliasBinding, AliasRegistry, AliasState};
use crate::errors::AppError;
use crate::store::DocumentStore;

use super::MemoryStore;

const G1: &str = "elasticbook-20240101000000";
const G2: &str = "elasticbook-20240102000000";
const G3: &str = "elasticbook-20240103000000";

fn setup(generations: &[&str]) -> (Arc<MemoryStore>, AliasRegistry) {
    let store = Arc::new(MemoryStore::new());
    for generation in generations {
        store.create_index(generation).unwrap();
    }
    let dyn_store: Arc<dyn DocumentStore> = store.clone();
    (store, AliasRegistry::new(dyn_store, "elasticbookdefault"))
}

#[test]
pub fn test_switch_default_moves_alias() {
    let (store, registry) = setup(&[G1, G2]);
    assert!(registry.add_alias(G1, "elasticbookdefault").unwrap());

    assert!(registry.switch_default(G2).unwrap());

    assert_eq!(
        registry.resolve("elasticbookdefault").unwrap(),
        AliasState::Bound(G2.to_string())
    );
    assert!(store.index_exists(G1).unwrap());
    assert_eq!(
        store.alias_calls(),
        vec![
            format!("add:{G1}:elasticbookdefault"),
            format!("remove:{G1}:elasticbookdefault"),
            format!("add:{G2}:elasticbookdefault"),
        ]
    );
}

#[test]
pub fn test_switch_default_to_current_holder() {
    let (store, registry) = setup(&[G1]);
    registry.add_alias(G1, "elasticbookdefault").unwrap();

    assert!(registry.switch_default(G1).unwrap());
    assert_eq!(store.alias_calls().len(), 1);
}

#[test]
pub fn test_switch_default_unknown_generation() {
    let (store, registry) = setup(&[G1]);
    registry.add_alias(G1, "elasticbookdefault").unwrap();

    assert!(matches!(
        registry.switch_default(G3),
        Err(AppError::UnknownGeneration(name)) if name == G3
    ));
    // nothing was removed
    assert_eq!(
        registry.resolve("elasticbookdefault").unwrap(),
        AliasState::Bound(G1.to_string())
    );
    assert_eq!(store.alias_calls().len(), 1);
}

#[test]
pub fn test_switch_default_partial_swap() {
    let (store, registry) = setup(&[G1, G2]);
    registry.add_alias(G1, "elasticbookdefault").unwrap();
    store.reject_alias_adds(true);

    match registry.switch_default(G2) {
        Err(AppError::PartialSwap {
            alias,
            generation,
            removed,
            ..
        }) => {
            assert_eq!(alias, "elasticbookdefault");
            assert_eq!(generation, G2);
            assert_eq!(removed, vec![G1.to_string()]);
        }
        other => panic!("expected PartialSwap, got {other:?}"),
    }

    assert_eq!(
        registry.resolve("elasticbookdefault").unwrap(),
        AliasState::Unbound
    );
}

#[test]
pub fn test_failed_add_without_removal_is_not_partial() {
    let (store, registry) = setup(&[G1]);
    store.reject_alias_adds(true);

    assert!(matches!(
        registry.switch_default(G1),
        Err(AppError::StoreUnavailable { .. })
    ));
}

#[test]
pub fn test_switch_repairs_inconsistent_default() {
    let (store, registry) = setup(&[G1, G2, G3]);
    store.force_alias(G1, "elasticbookdefault");
    store.force_alias(G2, "elasticbookdefault");

    assert_eq!(
        registry.resolve("elasticbookdefault").unwrap(),
        AliasState::Inconsistent(vec![G1.to_string(), G2.to_string()])
    );

    registry.switch_default(G3).unwrap();
    assert_eq!(
        registry.bindings_for("elasticbookdefault").unwrap(),
        vec![G3.to_string()]
    );
}

#[test]
pub fn test_add_alias_conflict() {
    let (store, registry) = setup(&[G1, G2]);

    assert!(registry.add_alias(G1, "work").unwrap());
    assert!(!registry.add_alias(G2, "work").unwrap());
    assert_eq!(registry.bindings_for("work").unwrap(), vec![G1.to_string()]);

    // already bound to the same generation, no second store call
    assert!(registry.add_alias(G1, "work").unwrap());
    assert_eq!(store.alias_calls(), vec![format!("add:{G1}:work")]);
}

#[test]
pub fn test_add_alias_to_missing_index() {
    let (_, registry) = setup(&[]);
    assert!(matches!(
        registry.add_alias(G1, "work"),
        Err(AppError::NotFound { kind: "index", .. })
    ));
}

#[test]
pub fn test_remove_alias() {
    let (_, registry) = setup(&[G1, G2]);
    registry.add_alias(G1, "work").unwrap();

    assert!(matches!(
        registry.remove_alias(G2, "work"),
        Err(AppError::NotFound { kind: "alias", .. })
    ));

    assert!(registry.remove_alias(G1, "work").unwrap());
    assert_eq!(registry.resolve("work").unwrap(), AliasState::Unbound);

    assert!(matches!(
        registry.remove_alias(G1, "work"),
        Err(AppError::NotFound { .. })
    ));
}

#[test]
pub fn test_unalias_everywhere() {
    let (store, registry) = setup(&[G1, G2, G3]);
    store.force_alias(G1, "old");
    store.force_alias(G3, "old");
    registry.add_alias(G2, "keep").unwrap();

    assert_eq!(registry.unalias("old").unwrap(), 2);
    assert_eq!(registry.unalias("old").unwrap(), 0);
    assert_eq!(registry.alias_names().unwrap(), vec!["keep".to_string()]);
}

#[test]
pub fn test_listing_and_summaries() {
    let (store, registry) = setup(&[G2, G1]);
    registry.add_alias(G2, "elasticbookdefault").unwrap();
    registry.add_alias(G1, "elasticbook").unwrap();
    registry.add_alias(G2, "work").unwrap();
    store
        .index_document(G2, "bookmark", &serde_json::json!({ "id": "1" }))
        .unwrap();

    assert_eq!(
        registry.list_aliases().unwrap(),
        vec![
            AliasBinding {
                generation: G1.to_string(),
                alias: "elasticbook".to_string(),
            },
            AliasBinding {
                generation: G2.to_string(),
                alias: "elasticbookdefault".to_string(),
            },
            AliasBinding {
                generation: G2.to_string(),
                alias: "work".to_string(),
            },
        ]
    );
    assert_eq!(
        registry.alias_names().unwrap(),
        vec!["elasticbook", "elasticbookdefault", "work"]
    );

    let summaries = registry.summaries().unwrap();
    assert_eq!(summaries.len(), 2);
    assert_eq!(summaries[0].name, G1);
    assert_eq!(summaries[0].documents, 0);
    assert_eq!(summaries[0].aliases, vec!["elasticbook".to_string()]);
    assert_eq!(summaries[1].documents, 1);
    assert_eq!(
        summaries[1].aliases,
        vec!["elasticbookdefault".to_string(), "work".to_string()]
    );
}
