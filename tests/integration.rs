//! End-to-end tests over the library API: syllabus ingestion, the JSON
//! store, the SQLite index, note projection, and diagram derivation,
//! all against a temporary data directory.

use std::collections::BTreeMap;
use std::fs;

use tempfile::TempDir;

use study_harness::collab::{OutlineStructurer, StructureGenerator};
use study_harness::config::Config;
use study_harness::error::Error;
use study_harness::models::{Difficulty, Hierarchy, Module, Question, QuestionType, Topic};
use study_harness::store::SubjectStore;
use study_harness::{db, diagram, kb, notes};

fn test_config(tmp: &TempDir) -> Config {
    let mut cfg = Config::minimal();
    cfg.store.data_dir = tmp.path().join("data");
    cfg.db.path = tmp.path().join("data").join("memory.db");
    cfg
}

fn sample_hierarchy() -> Hierarchy {
    let mut m1 = Module::new("Module 1: Physical Layer", 1);
    let mut signals = Topic::new("Signals", "Analog and digital signals", &m1.id);
    signals.key_points = vec![
        "Amplitude".to_string(),
        "Frequency".to_string(),
        "Phase".to_string(),
    ];
    m1.topics.push(signals);
    m1.topics.push(Topic::new("Encoding", "", &m1.id));

    let mut m2 = Module::new("Module 2: Transport Layer", 2);
    m2.topics.push(Topic::new("TCP", "Reliable byte streams", &m2.id));

    Hierarchy {
        title: "Computer Networks".to_string(),
        description: "Networking fundamentals".to_string(),
        modules: vec![m1, m2],
    }
}

#[test]
fn create_then_load_round_trips() {
    let tmp = TempDir::new().unwrap();
    let store = SubjectStore::from_config(&test_config(&tmp));

    let created = store
        .create("Computer Networks", sample_hierarchy())
        .unwrap();
    assert_eq!(created.slug, "computer_networks");
    assert!(created.is_current);

    let loaded = store.load("Computer Networks").unwrap();
    assert_eq!(loaded.hierarchy, created.hierarchy);
    assert_eq!(
        loaded.hierarchy.modules[0].topics[0].key_points,
        vec!["Amplitude", "Frequency", "Phase"]
    );
    assert_eq!(store.current().unwrap().as_deref(), Some("Computer Networks"));
}

#[test]
fn duplicate_subject_and_slug_collisions_rejected() {
    let tmp = TempDir::new().unwrap();
    let store = SubjectStore::from_config(&test_config(&tmp));

    store
        .create("Computer Networks", sample_hierarchy())
        .unwrap();

    let same_name = store.create("Computer Networks", sample_hierarchy());
    assert!(matches!(same_name, Err(Error::DuplicateSubject(_))));

    // A different name mapping to the same folder slug is a collision too.
    let same_slug = store.create("computer   networks!", sample_hierarchy());
    assert!(matches!(same_slug, Err(Error::DuplicateSubject(_))));

    assert_eq!(store.list().unwrap().len(), 1);
}

#[test]
fn load_of_missing_subject_is_not_found() {
    let tmp = TempDir::new().unwrap();
    let store = SubjectStore::from_config(&test_config(&tmp));
    assert!(matches!(store.load("Nope"), Err(Error::NotFound(_))));
}

#[test]
fn corrupt_document_is_reported_not_swallowed() {
    let tmp = TempDir::new().unwrap();
    let store = SubjectStore::from_config(&test_config(&tmp));
    let created = store
        .create("Computer Networks", sample_hierarchy())
        .unwrap();

    let doc = store
        .subject_dir(&created.slug)
        .join("syllabus")
        .join("syllabus.json");
    fs::write(&doc, "{ not json").unwrap();

    let err = store.load("Computer Networks").unwrap_err();
    assert!(matches!(err, Error::CorruptStore { .. }));
}

#[test]
fn stray_temp_file_does_not_break_loads() {
    let tmp = TempDir::new().unwrap();
    let store = SubjectStore::from_config(&test_config(&tmp));
    let created = store
        .create("Computer Networks", sample_hierarchy())
        .unwrap();

    // Simulate a crash between temp write and rename.
    let syllabus_dir = store.subject_dir(&created.slug).join("syllabus");
    fs::write(syllabus_dir.join("syllabus.json.tmp"), "half-written garbage").unwrap();

    let loaded = store.load("Computer Networks").unwrap();
    assert_eq!(loaded.hierarchy, created.hierarchy);
}

#[tokio::test]
async fn index_queries_follow_syllabus_order_not_alphabetical() {
    let tmp = TempDir::new().unwrap();
    let cfg = test_config(&tmp);
    let store = SubjectStore::from_config(&cfg);

    // Orders 2, 1, 3 with names whose alphabetical order differs.
    let mut zebra = Module::new("Zebra", 2);
    zebra.topics.push(Topic::new("Z-topic", "", &zebra.id));
    let mut apple = Module::new("Apple", 1);
    apple.topics.push(Topic::new("A-topic", "", &apple.id));
    let mut mango = Module::new("Mango", 3);
    mango.topics.push(Topic::new("M-topic", "", &mango.id));
    let hierarchy = Hierarchy {
        title: "Ordering".to_string(),
        description: String::new(),
        modules: vec![zebra, apple, mango],
    };

    let subject = store.create("Ordering", hierarchy).unwrap();
    let pool = db::connect(&cfg).await.unwrap();
    db::run_migrations(&pool).await.unwrap();
    store.save(&subject, &pool).await.unwrap();

    let hits = kb::query_topics(&pool, &kb::TopicFilter::default())
        .await
        .unwrap();
    pool.close().await;

    let modules: Vec<&str> = hits.iter().map(|h| h.module_name.as_str()).collect();
    assert_eq!(modules, vec!["Apple", "Zebra", "Mango"]);
}

#[tokio::test]
async fn save_replaces_index_rows_instead_of_accumulating() {
    let tmp = TempDir::new().unwrap();
    let cfg = test_config(&tmp);
    let store = SubjectStore::from_config(&cfg);

    let mut subject = store
        .create("Computer Networks", sample_hierarchy())
        .unwrap();
    let pool = db::connect(&cfg).await.unwrap();
    db::run_migrations(&pool).await.unwrap();
    store.save(&subject, &pool).await.unwrap();

    // Rename a topic and drop another, then save again.
    subject.hierarchy.modules[0].topics[0].name = "Signals and Media".to_string();
    subject.hierarchy.modules[0].topics.truncate(1);
    store.save(&subject, &pool).await.unwrap();

    let hits = kb::query_topics(&pool, &kb::TopicFilter::default())
        .await
        .unwrap();
    pool.close().await;

    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].topic.name, "Signals and Media");
    assert!(hits.iter().all(|h| h.topic.name != "Encoding"));
}

#[tokio::test]
async fn index_failure_after_document_write_surfaces_index_sync() {
    let tmp = TempDir::new().unwrap();
    let cfg = test_config(&tmp);
    let store = SubjectStore::from_config(&cfg);

    let mut subject = store
        .create("Computer Networks", sample_hierarchy())
        .unwrap();
    let pool = db::connect(&cfg).await.unwrap();
    db::run_migrations(&pool).await.unwrap();
    store.save(&subject, &pool).await.unwrap();

    // Take the index away, then save a renamed topic. The document is
    // written before the index update, so the write sticks and the
    // failure is reported as a sync problem, not a store write.
    pool.close().await;
    subject.hierarchy.modules[0].topics[0].name = "Signals and Media".to_string();

    let err = store.save(&subject, &pool).await.unwrap_err();
    assert!(matches!(err, Error::IndexSync { .. }));

    let loaded = store.load("Computer Networks").unwrap();
    assert_eq!(
        loaded.hierarchy.modules[0].topics[0].name,
        "Signals and Media"
    );
}

#[tokio::test]
async fn delete_removes_documents_and_index_rows() {
    let tmp = TempDir::new().unwrap();
    let cfg = test_config(&tmp);
    let store = SubjectStore::from_config(&cfg);

    let subject = store
        .create("Computer Networks", sample_hierarchy())
        .unwrap();
    let pool = db::connect(&cfg).await.unwrap();
    db::run_migrations(&pool).await.unwrap();
    store.save(&subject, &pool).await.unwrap();

    let question = Question::new(
        "TCP",
        "What does the three-way handshake establish?",
        "Sequence numbers for both directions.",
        QuestionType::OpenEnded,
        Difficulty::Medium,
    );
    kb::add_question(&pool, "Computer Networks", &question)
        .await
        .unwrap();

    store.delete("Computer Networks", &pool).await.unwrap();
    // Idempotent: deleting again is a no-op.
    store.delete("Computer Networks", &pool).await.unwrap();

    let hits = kb::query_topics(&pool, &kb::TopicFilter::default())
        .await
        .unwrap();
    let questions = kb::query_questions(&pool, &kb::QuestionFilter::default())
        .await
        .unwrap();
    pool.close().await;

    assert!(hits.is_empty());
    assert!(questions.is_empty());
    assert!(store.list().unwrap().is_empty());
    assert!(!store.subject_dir(&subject.slug).exists());
}

#[test]
fn notes_projection_is_idempotent_and_marked_complete() {
    let tmp = TempDir::new().unwrap();
    let store = SubjectStore::from_config(&test_config(&tmp));
    let subject = store
        .create("Computer Networks", sample_hierarchy())
        .unwrap();

    let rendered = notes::project(&subject.hierarchy, &BTreeMap::new());
    let notes_root = store.notes_dir(&subject.slug);

    notes::write_notes(&notes_root, &rendered, false).unwrap();
    assert!(notes::is_complete(&notes_root));

    let topic_doc = notes_root
        .join("1. Module 1 - Physical Layer")
        .join("1. Signals.md");
    let first = fs::read_to_string(&topic_doc).unwrap();

    notes::write_notes(&notes_root, &rendered, false).unwrap();
    let second = fs::read_to_string(&topic_doc).unwrap();
    assert_eq!(first, second);

    // Key points keep syllabus order in the document.
    let amp = first.find("Amplitude").unwrap();
    let freq = first.find("Frequency").unwrap();
    let phase = first.find("Phase").unwrap();
    assert!(amp < freq && freq < phase);
}

#[test]
fn clean_projection_removes_orphans_plain_does_not() {
    let tmp = TempDir::new().unwrap();
    let store = SubjectStore::from_config(&test_config(&tmp));
    let mut subject = store
        .create("Computer Networks", sample_hierarchy())
        .unwrap();
    let notes_root = store.notes_dir(&subject.slug);

    let rendered = notes::project(&subject.hierarchy, &BTreeMap::new());
    notes::write_notes(&notes_root, &rendered, false).unwrap();

    let orphan = notes_root
        .join("1. Module 1 - Physical Layer")
        .join("2. Encoding.md");
    assert!(orphan.exists());

    subject.hierarchy.modules[0].topics.truncate(1);
    let rendered = notes::project(&subject.hierarchy, &BTreeMap::new());

    notes::write_notes(&notes_root, &rendered, false).unwrap();
    assert!(orphan.exists(), "plain projection must not delete orphans");

    notes::write_notes(&notes_root, &rendered, true).unwrap();
    assert!(!orphan.exists(), "clean projection must delete orphans");
    assert!(notes::is_complete(&notes_root));
}

#[test]
fn diagram_derivation_is_stable_across_store_round_trip() {
    let tmp = TempDir::new().unwrap();
    let store = SubjectStore::from_config(&test_config(&tmp));
    let subject = store
        .create("Computer Networks", sample_hierarchy())
        .unwrap();

    let before = diagram::hierarchy_graph(&subject.hierarchy).script;
    let loaded = store.load("Computer Networks").unwrap();
    let after = diagram::hierarchy_graph(&loaded.hierarchy).script;
    assert_eq!(before, after);
}

#[tokio::test]
async fn syllabus_text_to_queryable_topics() {
    let tmp = TempDir::new().unwrap();
    let cfg = test_config(&tmp);
    let store = SubjectStore::from_config(&cfg);

    let syllabus = "\
Networking fundamentals for undergraduates.

Module 1: Physical Layer
- Signals: Analog and digital signals
- Transmission media

Module 2: Transport Layer
- TCP: Reliable byte streams
- UDP: Datagrams
";
    let hierarchy = OutlineStructurer
        .generate_structure(syllabus, "Computer Networks")
        .unwrap();
    let subject = store.create("Computer Networks", hierarchy).unwrap();

    let pool = db::connect(&cfg).await.unwrap();
    db::run_migrations(&pool).await.unwrap();
    store.save(&subject, &pool).await.unwrap();

    let hits = kb::query_topics(
        &pool,
        &kb::TopicFilter {
            subject: None,
            module: None,
            text: Some("byte streams".to_string()),
        },
    )
    .await
    .unwrap();
    pool.close().await;

    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].topic.name, "TCP");
    assert_eq!(hits[0].module_name, "Module 2: Transport Layer");
}
