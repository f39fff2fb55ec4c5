//! Card repository integration tests
//!
//! The central property: after any completed sequence of card operations,
//! each category's stored count equals the number of cards referencing it.

mod common;

use common::repository;

use std::sync::Arc;

use cardfolio_core::repository::{
    CardRepository, DeleteCategoryMode, MovePhase, RepositoryError,
};
use cardfolio_domain::{
    CardPatch, Category, CategoryPatch, ContactFields, NewCard, NewCategory,
};

fn owner() -> String {
    "user-1".to_string()
}

fn named_card(repo: &CardRepository, name: &str, category: &Category) -> cardfolio_domain::Card {
    repo.add_card(NewCard {
        user_id: owner(),
        category_id: Some(category.id.clone()),
        category_name: Some(category.name.clone()),
        fields: ContactFields {
            name: Some(name.to_string()),
            ..Default::default()
        },
        ..Default::default()
    })
    .unwrap()
}

fn count_of(repo: &CardRepository, category_id: &str) -> i64 {
    repo.get_user_categories(&owner())
        .unwrap()
        .into_iter()
        .find(|c| c.id == category_id)
        .unwrap()
        .card_count
}

fn reference_count(repo: &CardRepository, category_id: &str) -> usize {
    repo.get_cards_by_category(&category_id.to_string(), &owner())
        .unwrap()
        .len()
}

#[test]
fn default_category_is_created_once() {
    let repo = repository();
    let first = repo.create_default_category(&owner()).unwrap();
    let second = repo.create_default_category(&owner()).unwrap();
    assert_eq!(first.id, second.id);
    assert!(first.is_default);

    let categories = repo.get_user_categories(&owner()).unwrap();
    assert_eq!(categories.len(), 1);
    assert_eq!(categories[0].card_count, 0);
}

#[test]
fn default_category_is_per_owner() {
    let repo = repository();
    let mine = repo.create_default_category(&owner()).unwrap();
    let theirs = repo.create_default_category(&"user-2".to_string()).unwrap();
    assert_ne!(mine.id, theirs.id);
}

#[test]
fn add_card_requires_owner_before_any_write() {
    let repo = repository();
    let err = repo
        .add_card(NewCard {
            user_id: "   ".to_string(),
            ..Default::default()
        })
        .unwrap_err();
    assert!(matches!(err, RepositoryError::MissingOwner));
    assert!(repo.get_all_user_cards(&owner()).unwrap().is_empty());
}

#[test]
fn add_card_rejects_unknown_category() {
    let repo = repository();
    let err = repo
        .add_card(NewCard {
            user_id: owner(),
            category_id: Some("ghost".to_string()),
            ..Default::default()
        })
        .unwrap_err();
    assert!(matches!(err, RepositoryError::CategoryNotFound(_)));
}

#[test]
fn counters_track_reference_counts_through_add_move_delete() {
    let repo = repository();
    let general = repo.create_default_category(&owner()).unwrap();
    let clients = repo
        .add_category(
            &owner(),
            NewCategory {
                name: "Clients".into(),
                icon: "💼".into(),
                color: "#0EA5E9".into(),
                order: 1,
            },
        )
        .unwrap();

    let a = named_card(&repo, "A", &general);
    let b = named_card(&repo, "B", &general);
    named_card(&repo, "C", &clients);

    repo.move_card(&a.id, Some(&general.id), &clients.id).unwrap();
    repo.delete_card(&b.id).unwrap();

    for category in [&general, &clients] {
        assert_eq!(
            count_of(&repo, &category.id) as usize,
            reference_count(&repo, &category.id),
            "count drifted for {}",
            category.name
        );
    }
    assert_eq!(count_of(&repo, &general.id), 0);
    assert_eq!(count_of(&repo, &clients.id), 2);
}

#[test]
fn move_round_trip_restores_both_counters() {
    let repo = repository();
    let general = repo.create_default_category(&owner()).unwrap();
    let clients = repo
        .add_category(
            &owner(),
            NewCategory {
                name: "Clients".into(),
                icon: "💼".into(),
                color: "#0EA5E9".into(),
                order: 1,
            },
        )
        .unwrap();
    let card = named_card(&repo, "A", &general);

    let before = (count_of(&repo, &general.id), count_of(&repo, &clients.id));
    repo.move_card(&card.id, Some(&general.id), &clients.id).unwrap();
    let moved = repo.move_card(&card.id, Some(&clients.id), &general.id).unwrap();

    assert_eq!(moved.category_id.as_deref(), Some(general.id.as_str()));
    let after = (count_of(&repo, &general.id), count_of(&repo, &clients.id));
    assert_eq!(before, after);
}

#[test]
fn move_to_unknown_destination_changes_nothing() {
    let repo = repository();
    let general = repo.create_default_category(&owner()).unwrap();
    let card = named_card(&repo, "A", &general);

    let err = repo
        .move_card(&card.id, Some(&general.id), &"ghost".to_string())
        .unwrap_err();
    assert!(matches!(err, RepositoryError::CategoryNotFound(_)));
    assert_eq!(count_of(&repo, &general.id), 1);
    assert_eq!(
        repo.get_card_by_id(&card.id)
            .unwrap()
            .unwrap()
            .category_id
            .as_deref(),
        Some(general.id.as_str())
    );
}

#[test]
fn resume_move_completes_remaining_phases() {
    let store = Arc::new(cardfolio_store::MemoryStore::new());
    let repo = CardRepository::new(store.clone());
    let general = repo.create_default_category(&owner()).unwrap();
    let clients = repo
        .add_category(
            &owner(),
            NewCategory {
                name: "Clients".into(),
                icon: "💼".into(),
                color: "#0EA5E9".into(),
                order: 1,
            },
        )
        .unwrap();
    let card = named_card(&repo, "A", &general);

    // A crash after the re-point: the card already references the
    // destination but neither counter has been touched.
    use cardfolio_store::DocumentStore;
    store
        .update(
            "cards",
            &card.id,
            serde_json::json!({ "categoryId": clients.id }),
        )
        .unwrap();

    repo.resume_move(
        &card.id,
        Some(&general.id),
        &clients.id,
        MovePhase::DecrementSource,
    )
    .unwrap();
    assert_eq!(count_of(&repo, &general.id), 0);
    assert_eq!(count_of(&repo, &clients.id), 1);
    assert_eq!(
        reference_count(&repo, &clients.id),
        count_of(&repo, &clients.id) as usize
    );
}

#[test]
fn delete_card_twice_reports_not_found() {
    let repo = repository();
    let general = repo.create_default_category(&owner()).unwrap();
    let card = named_card(&repo, "A", &general);
    repo.delete_card(&card.id).unwrap();
    assert!(matches!(
        repo.delete_card(&card.id),
        Err(RepositoryError::CardNotFound(_))
    ));
}

#[test]
fn delete_category_deleting_cards_leaves_no_references() {
    let repo = repository();
    repo.create_default_category(&owner()).unwrap();
    let clients = repo
        .add_category(
            &owner(),
            NewCategory {
                name: "Clients".into(),
                icon: "💼".into(),
                color: "#0EA5E9".into(),
                order: 1,
            },
        )
        .unwrap();
    named_card(&repo, "A", &clients);
    named_card(&repo, "B", &clients);

    repo.delete_category(&clients.id, DeleteCategoryMode::DeleteCards)
        .unwrap();

    assert!(repo.get_all_user_cards(&owner()).unwrap().is_empty());
    assert!(repo
        .get_user_categories(&owner())
        .unwrap()
        .iter()
        .all(|c| c.id != clients.id));
}

#[test]
fn delete_category_moving_cards_repoints_and_counts() {
    let repo = repository();
    let general = repo.create_default_category(&owner()).unwrap();
    let clients = repo
        .add_category(
            &owner(),
            NewCategory {
                name: "Clients".into(),
                icon: "💼".into(),
                color: "#0EA5E9".into(),
                order: 1,
            },
        )
        .unwrap();
    named_card(&repo, "A", &clients);
    named_card(&repo, "B", &clients);
    named_card(&repo, "C", &general);

    repo.delete_category(&clients.id, DeleteCategoryMode::MoveTo(general.id.clone()))
        .unwrap();

    let cards = repo.get_all_user_cards(&owner()).unwrap();
    assert_eq!(cards.len(), 3);
    assert!(cards
        .iter()
        .all(|c| c.category_id.as_deref() == Some(general.id.as_str())));
    assert_eq!(count_of(&repo, &general.id), 3);
}

#[test]
fn delete_category_rejects_moving_into_itself() {
    let repo = repository();
    repo.create_default_category(&owner()).unwrap();
    let clients = repo
        .add_category(
            &owner(),
            NewCategory {
                name: "Clients".into(),
                icon: "💼".into(),
                color: "#0EA5E9".into(),
                order: 1,
            },
        )
        .unwrap();
    assert!(matches!(
        repo.delete_category(&clients.id, DeleteCategoryMode::MoveTo(clients.id.clone())),
        Err(RepositoryError::InvalidMoveTarget)
    ));
}

#[test]
fn default_category_cannot_be_deleted_or_renamed() {
    let repo = repository();
    let general = repo.create_default_category(&owner()).unwrap();

    assert!(matches!(
        repo.delete_category(&general.id, DeleteCategoryMode::DeleteCards),
        Err(RepositoryError::DefaultCategoryProtected)
    ));
    assert!(matches!(
        repo.update_category(
            &general.id,
            CategoryPatch {
                name: Some("Misc".into()),
                ..Default::default()
            }
        ),
        Err(RepositoryError::DefaultCategoryProtected)
    ));

    // Color and order stay editable.
    let updated = repo
        .update_category(
            &general.id,
            CategoryPatch {
                color: Some("#111827".into()),
                ..Default::default()
            },
        )
        .unwrap();
    assert_eq!(updated.color, "#111827");
    assert_eq!(updated.name, general.name);
}

#[test]
fn update_card_patches_and_stamps_updated_at() {
    let repo = repository();
    let general = repo.create_default_category(&owner()).unwrap();
    let card = named_card(&repo, "A", &general);

    let updated = repo
        .update_card(
            &card.id,
            CardPatch {
                fields: Some(ContactFields {
                    name: Some("A. Person".into()),
                    email: Some("a@acme.example".into()),
                    ..Default::default()
                }),
                ..Default::default()
            },
        )
        .unwrap();
    assert_eq!(updated.fields.name.as_deref(), Some("A. Person"));
    assert!(updated.updated_at.is_some());
    // Untouched metadata survives the patch.
    assert_eq!(updated.category_id, card.category_id);
}

#[test]
fn favorites_query_only_returns_favorites() {
    let repo = repository();
    let general = repo.create_default_category(&owner()).unwrap();
    let a = named_card(&repo, "A", &general);
    named_card(&repo, "B", &general);

    repo.set_favorite(&a.id, true).unwrap();
    let favorites = repo.get_favorite_cards(&owner()).unwrap();
    assert_eq!(favorites.len(), 1);
    assert_eq!(favorites[0].id, a.id);
}

#[test]
fn recent_cards_respects_limit_and_order() {
    let repo = repository();
    let general = repo.create_default_category(&owner()).unwrap();
    for name in ["A", "B", "C", "D", "E", "F", "G"] {
        named_card(&repo, name, &general);
    }
    let recent = repo.get_recent_cards(&owner(), 5).unwrap();
    assert_eq!(recent.len(), 5);
    for pair in recent.windows(2) {
        assert!(pair[0].created_at >= pair[1].created_at);
    }
}

#[test]
fn queries_are_scoped_by_owner() {
    let repo = repository();
    let general = repo.create_default_category(&owner()).unwrap();
    named_card(&repo, "Mine", &general);

    let other_default = repo.create_default_category(&"user-2".to_string()).unwrap();
    repo.add_card(NewCard {
        user_id: "user-2".to_string(),
        category_id: Some(other_default.id.clone()),
        ..Default::default()
    })
    .unwrap();

    let mine = repo.get_all_user_cards(&owner()).unwrap();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].fields.name.as_deref(), Some("Mine"));
}

#[test]
fn works_identically_over_arc_dyn_store() {
    // The repository only sees `dyn DocumentStore`; exercise it through a
    // second instance sharing the same backend.
    let store = Arc::new(cardfolio_store::MemoryStore::new());
    let repo_a = CardRepository::new(store.clone());
    let repo_b = CardRepository::new(store);

    let general = repo_a.create_default_category(&owner()).unwrap();
    named_card(&repo_a, "A", &general);
    assert_eq!(reference_count(&repo_b, &general.id), 1);
}
