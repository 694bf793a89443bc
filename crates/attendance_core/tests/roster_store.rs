use attendance_core::model::roster::COLOR_PALETTE;
use attendance_core::repo::roster_repo::CATEGORIES_COLLECTION;
use attendance_core::{
    DocumentStore, RepoError, RosterRepository, SqliteDocumentStore, StoreRosterRepository,
    ValidationError,
};

#[test]
fn categories_list_in_creation_order_with_cyclic_palette() {
    let store = SqliteDocumentStore::open_in_memory().unwrap();
    let repo = StoreRosterRepository::new(&store);

    let created = (0..8)
        .map(|index| repo.add_category(&format!("Group {index}")).unwrap())
        .collect::<Vec<_>>();

    let roster = repo.load_roster().unwrap();
    let names: Vec<_> = roster.categories.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(
        names,
        vec![
            "Group 0", "Group 1", "Group 2", "Group 3", "Group 4", "Group 5", "Group 6",
            "Group 7"
        ]
    );
    for (index, category) in created.iter().take(7).enumerate() {
        assert_eq!(category.color, COLOR_PALETTE[index]);
    }
    assert_eq!(created[7].color, created[0].color);
    assert!(created.iter().all(|c| c.id.starts_with("cat_")));
}

#[test]
fn names_are_trimmed_and_blank_names_write_nothing() {
    let store = SqliteDocumentStore::open_in_memory().unwrap();
    let repo = StoreRosterRepository::new(&store);

    let err = repo.add_category("   ").unwrap_err();
    assert!(matches!(
        err,
        RepoError::Validation(ValidationError::EmptyCategoryName)
    ));
    assert!(repo.load_roster().unwrap().categories.is_empty());

    let category = repo.add_category("  Youth  ").unwrap();
    assert_eq!(category.name, "Youth");

    let err = repo.add_person(&category.id, "\t").unwrap_err();
    assert!(matches!(
        err,
        RepoError::Validation(ValidationError::EmptyPersonName)
    ));
    let roster = repo.load_roster().unwrap();
    assert!(roster.categories[0].people.is_empty());
}

#[test]
fn people_are_appended_and_removed_within_their_category() {
    let store = SqliteDocumentStore::open_in_memory().unwrap();
    let repo = StoreRosterRepository::new(&store);
    let youth = repo.add_category("Youth").unwrap();
    let elders = repo.add_category("Elders").unwrap();

    let ali = repo.add_person(&youth.id, " Ali ").unwrap();
    let budi = repo.add_person(&youth.id, "Budi").unwrap();
    let citra = repo.add_person(&elders.id, "Citra").unwrap();
    assert_eq!(ali.name, "Ali");
    assert!(ali.id.starts_with("user_"));

    repo.delete_person(&youth.id, &ali.id).unwrap();

    let roster = repo.load_roster().unwrap();
    let youth_people: Vec<_> = roster
        .category(&youth.id)
        .unwrap()
        .people
        .iter()
        .map(|p| p.id.clone())
        .collect();
    assert_eq!(youth_people, vec![budi.id.clone()]);
    assert!(roster.contains_person(&citra.id));
    assert_eq!(roster.person_count(), 2);
}

#[test]
fn missing_ids_report_not_found() {
    let store = SqliteDocumentStore::open_in_memory().unwrap();
    let repo = StoreRosterRepository::new(&store);
    let youth = repo.add_category("Youth").unwrap();

    assert!(matches!(
        repo.add_person("cat_missing", "Ali").unwrap_err(),
        RepoError::CategoryNotFound(id) if id == "cat_missing"
    ));
    assert!(matches!(
        repo.delete_category("cat_missing").unwrap_err(),
        RepoError::CategoryNotFound(_)
    ));
    assert!(matches!(
        repo.delete_person(&youth.id, "user_missing").unwrap_err(),
        RepoError::PersonNotFound { person_id, .. } if person_id == "user_missing"
    ));
}

#[test]
fn deleting_a_category_removes_its_people() {
    let store = SqliteDocumentStore::open_in_memory().unwrap();
    let repo = StoreRosterRepository::new(&store);
    let youth = repo.add_category("Youth").unwrap();
    let ali = repo.add_person(&youth.id, "Ali").unwrap();

    repo.delete_category(&youth.id).unwrap();

    let roster = repo.load_roster().unwrap();
    assert!(roster.categories.is_empty());
    assert!(!roster.contains_person(&ali.id));
    assert!(store.get(CATEGORIES_COLLECTION, &youth.id).unwrap().is_none());
}

#[test]
fn category_documents_keep_the_persisted_layout() {
    let store = SqliteDocumentStore::open_in_memory().unwrap();
    let repo = StoreRosterRepository::new(&store);
    let youth = repo.add_category("Youth").unwrap();
    let ali = repo.add_person(&youth.id, "Ali").unwrap();

    let body = store.get(CATEGORIES_COLLECTION, &youth.id).unwrap().unwrap();
    assert_eq!(body["name"], "Youth");
    assert_eq!(body["color"], COLOR_PALETTE[0]);
    assert_eq!(body["users"][0]["id"], ali.id.as_str());
    assert_eq!(body["users"][0]["name"], "Ali");
    assert_eq!(body["createdAt"].as_i64(), Some(youth.created_at));
}

#[test]
fn concurrent_person_adds_on_one_category_are_all_kept() {
    let store = SqliteDocumentStore::open_in_memory().unwrap();
    let youth = StoreRosterRepository::new(&store)
        .add_category("Youth")
        .unwrap();

    std::thread::scope(|scope| {
        for writer in 0..8 {
            let store = &store;
            let category_id = youth.id.as_str();
            scope.spawn(move || {
                let repo = StoreRosterRepository::new(store);
                for index in 0..5 {
                    repo.add_person(category_id, &format!("Person {writer}-{index}"))
                        .unwrap();
                }
            });
        }
    });

    let roster = StoreRosterRepository::new(&store).load_roster().unwrap();
    assert_eq!(roster.person_count(), 40);
}

#[test]
fn concurrent_category_adds_take_distinct_palette_slots() {
    let store = SqliteDocumentStore::open_in_memory().unwrap();

    std::thread::scope(|scope| {
        for index in 0..COLOR_PALETTE.len() {
            let store = &store;
            scope.spawn(move || {
                StoreRosterRepository::new(store)
                    .add_category(&format!("Group {index}"))
                    .unwrap();
            });
        }
    });

    let roster = StoreRosterRepository::new(&store).load_roster().unwrap();
    let mut colors = roster
        .categories
        .iter()
        .map(|category| category.color.as_str())
        .collect::<Vec<_>>();
    colors.sort_unstable();
    colors.dedup();
    assert_eq!(colors.len(), COLOR_PALETTE.len());
}
