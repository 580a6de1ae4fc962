//! Hierarchy store: one JSON document per subject plus a small subject
//! index document.
//!
//! The on-disk layout follows `data/subjects/<slug>/`:
//!
//! ```text
//! data/subjects/
//! ├── subjects.json              subject index (name → slug, flags)
//! └── computer_networks/
//!     ├── syllabus/syllabus.json the authoritative hierarchy document
//!     ├── questions/bank.json    optional question bank
//!     ├── notes/                 projected markdown tree
//!     ├── mindmaps/              derived diagram scripts
//!     └── animations/            rendered animation scripts
//! ```
//!
//! The JSON document is the single source of truth; the SQLite knowledge
//! base is re-derived from it on every save. Documents are written with
//! temp-then-rename so a crash mid-write never leaves a half-written
//! file. This protects a single writer only: two processes saving the
//! same subject race last-writer-wins, an accepted limitation.
//!
//! Every load re-validates the document. Manual edits to `syllabus.json`
//! are a supported workflow, so loads treat the file as untrusted input
//! and fail with `CorruptStore` rather than coercing bad fields.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::warn;

use crate::collab::{self, OutlineStructurer, StructureGenerator};
use crate::config::Config;
use crate::db;
use crate::error::{Error, Result};
use crate::kb;
use crate::models::{Hierarchy, Question, Subject, Topic};

/// Derive a filesystem-safe folder slug from a subject name.
///
/// Lowercases and collapses every run of non-alphanumeric characters to
/// a single underscore: "Algorithm Analysis & Design" →
/// "algorithm_analysis_design". Pure and deterministic; collisions are
/// detected at `create` time.
pub fn folder_slug(name: &str) -> String {
    let mut slug = String::new();
    let mut pending_sep = false;
    for ch in name.trim().chars() {
        if ch.is_alphanumeric() {
            if pending_sep && !slug.is_empty() {
                slug.push('_');
            }
            pending_sep = false;
            for lower in ch.to_lowercase() {
                slug.push(lower);
            }
        } else {
            pending_sep = true;
        }
    }
    slug
}

/// One row of the subject index document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexEntry {
    pub slug: String,
    #[serde(default)]
    pub has_question_bank: bool,
    #[serde(default)]
    pub is_current: bool,
}

type SubjectIndex = BTreeMap<String, IndexEntry>;

const INDEX_DOC: &str = "subject index";

/// Write-temp-then-rename. The rename is atomic on POSIX filesystems,
/// so readers either see the old document or the new one.
pub(crate) fn atomic_write(path: &Path, contents: &str) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    fs::write(&tmp, contents)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

pub struct SubjectStore {
    data_dir: PathBuf,
}

impl SubjectStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.store.data_dir.clone())
    }

    fn subjects_root(&self) -> PathBuf {
        self.data_dir.join("subjects")
    }

    fn index_path(&self) -> PathBuf {
        self.subjects_root().join("subjects.json")
    }

    pub fn subject_dir(&self, slug: &str) -> PathBuf {
        self.subjects_root().join(slug)
    }

    pub fn notes_dir(&self, slug: &str) -> PathBuf {
        self.subject_dir(slug).join("notes")
    }

    pub fn mindmaps_dir(&self, slug: &str) -> PathBuf {
        self.subject_dir(slug).join("mindmaps")
    }

    pub fn animations_dir(&self, slug: &str) -> PathBuf {
        self.subject_dir(slug).join("animations")
    }

    fn syllabus_path(&self, slug: &str) -> PathBuf {
        self.subject_dir(slug).join("syllabus").join("syllabus.json")
    }

    fn bank_path(&self, slug: &str) -> PathBuf {
        self.subject_dir(slug).join("questions").join("bank.json")
    }

    fn solutions_path(&self, slug: &str) -> PathBuf {
        self.subject_dir(slug).join("questions").join("solutions.json")
    }

    fn load_index(&self) -> Result<SubjectIndex> {
        let path = self.index_path();
        if !path.exists() {
            return Ok(SubjectIndex::new());
        }
        let raw = fs::read_to_string(&path)
            .map_err(|e| Error::corrupt(INDEX_DOC, format!("unreadable: {}", e)))?;
        serde_json::from_str(&raw).map_err(|e| Error::corrupt(INDEX_DOC, e.to_string()))
    }

    fn write_index(&self, index: &SubjectIndex) -> Result<()> {
        let json = serde_json::to_string_pretty(index).map_err(|e| Error::StoreWrite {
            subject: INDEX_DOC.to_string(),
            source: e.into(),
        })?;
        atomic_write(&self.index_path(), &json).map_err(|e| Error::StoreWrite {
            subject: INDEX_DOC.to_string(),
            source: e,
        })
    }

    /// Register a new subject and write its initial hierarchy document.
    ///
    /// Fails with `DuplicateSubject` if the name or its folder slug
    /// collides with an existing subject; nothing is written in that
    /// case. The new subject becomes the current one.
    pub fn create(&self, name: &str, hierarchy: Hierarchy) -> Result<Subject> {
        let slug = folder_slug(name);
        if slug.is_empty() {
            return Err(Error::validation(
                "name",
                "subject name produces an empty folder slug",
            ));
        }

        let report = hierarchy.validate()?;
        for (topic, prereq) in &report.dangling_prerequisites {
            warn!(%topic, %prereq, "dangling prerequisite reference");
        }

        let mut index = self.load_index()?;
        if index.contains_key(name) || index.values().any(|e| e.slug == slug) {
            return Err(Error::DuplicateSubject(name.to_string()));
        }

        for sub in ["syllabus", "questions", "notes", "mindmaps", "animations"] {
            fs::create_dir_all(self.subject_dir(&slug).join(sub)).map_err(|e| {
                Error::StoreWrite {
                    subject: name.to_string(),
                    source: e,
                }
            })?;
        }

        self.write_document(name, &slug, &hierarchy)?;

        for entry in index.values_mut() {
            entry.is_current = false;
        }
        index.insert(
            name.to_string(),
            IndexEntry {
                slug: slug.clone(),
                has_question_bank: false,
                is_current: true,
            },
        );
        self.write_index(&index)?;

        Ok(Subject {
            name: name.to_string(),
            slug,
            hierarchy,
            has_question_bank: false,
            is_current: true,
        })
    }

    /// Load a subject's hierarchy, re-validating the document as
    /// untrusted input. Dangling prerequisite references are warned
    /// about, never dropped; structural violations fail the load.
    pub fn load(&self, name: &str) -> Result<Subject> {
        let index = self.load_index()?;
        let entry = index
            .get(name)
            .ok_or_else(|| Error::NotFound(name.to_string()))?;

        let path = self.syllabus_path(&entry.slug);
        let raw = fs::read_to_string(&path)
            .map_err(|e| Error::corrupt(name, format!("{}: {}", path.display(), e)))?;
        let hierarchy: Hierarchy =
            serde_json::from_str(&raw).map_err(|e| Error::corrupt(name, e.to_string()))?;

        let report = hierarchy.validate().map_err(|e| match e {
            Error::Validation { field, reason } => {
                Error::corrupt(name, format!("field '{}': {}", field, reason))
            }
            other => other,
        })?;
        for (topic, prereq) in &report.dangling_prerequisites {
            warn!(subject = %name, %topic, %prereq, "dangling prerequisite reference");
        }

        Ok(Subject {
            name: name.to_string(),
            slug: entry.slug.clone(),
            hierarchy,
            has_question_bank: entry.has_question_bank,
            is_current: entry.is_current,
        })
    }

    /// Persist a subject's hierarchy and re-derive its knowledge-base
    /// rows in the same logical operation.
    ///
    /// A failed document write surfaces `StoreWrite` and leaves the
    /// previous document intact. A failed index update after a
    /// successful write surfaces `IndexSync`: the document on disk is
    /// correct, the index is stale until the next save.
    pub async fn save(&self, subject: &Subject, pool: &SqlitePool) -> Result<()> {
        let report = subject.hierarchy.validate()?;
        for (topic, prereq) in &report.dangling_prerequisites {
            warn!(subject = %subject.name, %topic, %prereq, "dangling prerequisite reference");
        }

        let index = self.load_index()?;
        if !index.contains_key(&subject.name) {
            return Err(Error::NotFound(subject.name.clone()));
        }

        self.write_document(&subject.name, &subject.slug, &subject.hierarchy)?;

        kb::upsert_topics(pool, &subject.name, &subject.hierarchy)
            .await
            .map_err(|e| Error::IndexSync {
                subject: subject.name.clone(),
                source: e,
            })
    }

    fn write_document(&self, name: &str, slug: &str, hierarchy: &Hierarchy) -> Result<()> {
        let json = serde_json::to_string_pretty(hierarchy).map_err(|e| Error::StoreWrite {
            subject: name.to_string(),
            source: e.into(),
        })?;
        atomic_write(&self.syllabus_path(slug), &json).map_err(|e| Error::StoreWrite {
            subject: name.to_string(),
            source: e,
        })
    }

    /// Remove a subject's folder, index entry, and knowledge-base rows.
    /// Idempotent: deleting an absent subject is a no-op.
    pub async fn delete(&self, name: &str, pool: &SqlitePool) -> Result<()> {
        let mut index = self.load_index()?;
        if let Some(entry) = index.remove(name) {
            let dir = self.subject_dir(&entry.slug);
            if dir.exists() {
                fs::remove_dir_all(&dir).map_err(|e| Error::StoreWrite {
                    subject: name.to_string(),
                    source: e,
                })?;
            }
            self.write_index(&index)?;
        }

        kb::prune_subject(pool, name)
            .await
            .map_err(|e| Error::IndexSync {
                subject: name.to_string(),
                source: e,
            })
    }

    /// Mark a subject as the current one. The flag lives in the subject
    /// index document; this is the single write point for it.
    pub fn select(&self, name: &str) -> Result<()> {
        let mut index = self.load_index()?;
        if !index.contains_key(name) {
            return Err(Error::NotFound(name.to_string()));
        }
        for (subject, entry) in index.iter_mut() {
            entry.is_current = subject == name;
        }
        self.write_index(&index)
    }

    /// The currently selected subject name, if any. This is the single
    /// read point for the selection flag.
    pub fn current(&self) -> Result<Option<String>> {
        let index = self.load_index()?;
        Ok(index
            .iter()
            .find(|(_, entry)| entry.is_current)
            .map(|(name, _)| name.clone()))
    }

    pub fn list(&self) -> Result<Vec<(String, IndexEntry)>> {
        Ok(self.load_index()?.into_iter().collect())
    }

    /// Attach a question bank document to a subject and flip its index
    /// flag.
    pub fn set_question_bank(&self, name: &str, questions: &[Question]) -> Result<()> {
        let mut index = self.load_index()?;
        let entry = index
            .get_mut(name)
            .ok_or_else(|| Error::NotFound(name.to_string()))?;
        for q in questions {
            q.validate()?;
        }
        let json = serde_json::to_string_pretty(questions).map_err(|e| Error::StoreWrite {
            subject: name.to_string(),
            source: e.into(),
        })?;
        let slug = entry.slug.clone();
        atomic_write(&self.bank_path(&slug), &json).map_err(|e| Error::StoreWrite {
            subject: name.to_string(),
            source: e,
        })?;
        entry.has_question_bank = true;
        self.write_index(&index)
    }

    pub fn load_question_bank(&self, name: &str) -> Result<Vec<Question>> {
        let index = self.load_index()?;
        let entry = index
            .get(name)
            .ok_or_else(|| Error::NotFound(name.to_string()))?;
        let path = self.bank_path(&entry.slug);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let raw = fs::read_to_string(&path)
            .map_err(|e| Error::corrupt(name, format!("{}: {}", path.display(), e)))?;
        serde_json::from_str(&raw).map_err(|e| Error::corrupt(name, e.to_string()))
    }

    /// Exam-derived solutions per topic id, used by the note projector.
    pub fn load_solutions(
        &self,
        name: &str,
    ) -> Result<BTreeMap<String, Vec<crate::notes::Solution>>> {
        let index = self.load_index()?;
        let entry = index
            .get(name)
            .ok_or_else(|| Error::NotFound(name.to_string()))?;
        let path = self.solutions_path(&entry.slug);
        if !path.exists() {
            return Ok(BTreeMap::new());
        }
        let raw = fs::read_to_string(&path)
            .map_err(|e| Error::corrupt(name, format!("{}: {}", path.display(), e)))?;
        serde_json::from_str(&raw).map_err(|e| Error::corrupt(name, e.to_string()))
    }

    pub fn save_solutions(
        &self,
        name: &str,
        solutions: &BTreeMap<String, Vec<crate::notes::Solution>>,
    ) -> Result<()> {
        let index = self.load_index()?;
        let entry = index
            .get(name)
            .ok_or_else(|| Error::NotFound(name.to_string()))?;
        let json = serde_json::to_string_pretty(solutions).map_err(|e| Error::StoreWrite {
            subject: name.to_string(),
            source: e.into(),
        })?;
        atomic_write(&self.solutions_path(&entry.slug), &json).map_err(|e| Error::StoreWrite {
            subject: name.to_string(),
            source: e,
        })
    }

    /// Resolve the subject to operate on: an explicit name, or the
    /// current selection.
    pub fn resolve(&self, name: Option<&str>) -> Result<String> {
        match name {
            Some(n) => Ok(n.to_string()),
            None => self
                .current()?
                .ok_or_else(|| Error::NotFound("<no subject selected>".to_string())),
        }
    }
}

pub async fn run_create(
    config: &Config,
    name: &str,
    syllabus_file: &Path,
    description: Option<String>,
) -> anyhow::Result<()> {
    let raw = fs::read_to_string(syllabus_file)?;

    let structurer = OutlineStructurer;
    let mut hierarchy = collab::with_timeout(
        config.collaborator.timeout_secs,
        "generate_structure",
        async { structurer.generate_structure(&raw, name) },
    )
    .await?;

    if let Some(desc) = description {
        hierarchy.description = desc;
    }

    // A malformed collaborator return must never reach the store as a
    // validation error; it is a corrupt-input failure for this subject.
    if let Err(Error::Validation { field, reason }) = hierarchy.validate() {
        return Err(Error::corrupt(name, format!("field '{}': {}", field, reason)).into());
    }

    let store = SubjectStore::from_config(config);
    let subject = store.create(name, hierarchy)?;

    let pool = db::connect(config).await?;
    db::run_migrations(&pool).await?;
    kb::upsert_topics(&pool, &subject.name, &subject.hierarchy)
        .await
        .map_err(|e| Error::IndexSync {
            subject: subject.name.clone(),
            source: e,
        })?;
    pool.close().await;

    println!("create-subject {}", name);
    println!("  modules: {}", subject.hierarchy.modules.len());
    println!("  topics: {}", subject.hierarchy.topic_count());
    println!("  folder: {}", store.subject_dir(&subject.slug).display());
    println!("  selected as current subject");
    println!("ok");
    Ok(())
}

pub fn run_list(config: &Config) -> anyhow::Result<()> {
    let store = SubjectStore::from_config(config);
    let subjects = store.list()?;

    if subjects.is_empty() {
        println!("No subjects found. Create one with 'stu subject create'.");
        return Ok(());
    }

    println!("{:<40} {:<30} {:<6} {}", "SUBJECT", "FOLDER", "QBANK", "CURRENT");
    for (name, entry) in subjects {
        println!(
            "{:<40} {:<30} {:<6} {}",
            name,
            entry.slug,
            if entry.has_question_bank { "yes" } else { "no" },
            if entry.is_current { "*" } else { "" }
        );
    }
    Ok(())
}

pub fn run_select(config: &Config, name: &str) -> anyhow::Result<()> {
    let store = SubjectStore::from_config(config);
    store.select(name)?;
    println!("Selected subject: {}", name);
    Ok(())
}

pub async fn run_delete(config: &Config, name: &str) -> anyhow::Result<()> {
    let store = SubjectStore::from_config(config);
    let pool = db::connect(config).await?;
    db::run_migrations(&pool).await?;
    store.delete(name, &pool).await?;
    pool.close().await;
    println!("Deleted subject: {}", name);
    Ok(())
}

pub async fn run_add_topic(
    config: &Config,
    subject: Option<&str>,
    module: &str,
    name: &str,
    summary: &str,
    key_points: Option<&str>,
) -> anyhow::Result<()> {
    let store = SubjectStore::from_config(config);
    let subject_name = store.resolve(subject)?;
    let mut subject = store.load(&subject_name)?;

    let module = subject
        .hierarchy
        .find_module_mut(module)
        .ok_or_else(|| Error::NotFound(format!("{} / module '{}'", subject_name, module)))?;

    let mut topic = Topic::new(name, summary, &module.id);
    if let Some(kps) = key_points {
        topic.key_points = kps
            .split(',')
            .map(|kp| kp.trim().to_string())
            .filter(|kp| !kp.is_empty())
            .collect();
    }
    module.topics.push(topic);

    let pool = db::connect(config).await?;
    db::run_migrations(&pool).await?;
    store.save(&subject, &pool).await?;
    pool.close().await;

    println!("Topic '{}' added to subject '{}'.", name, subject_name);
    Ok(())
}

/// Import a question bank from a JSON file: attach it to the subject's
/// document tree and index every question in the knowledge base.
pub async fn run_import_bank(
    config: &Config,
    subject: Option<&str>,
    file: &Path,
) -> anyhow::Result<()> {
    let raw = fs::read_to_string(file)?;
    let questions: Vec<Question> = serde_json::from_str(&raw)?;

    let store = SubjectStore::from_config(config);
    let subject_name = store.resolve(subject)?;
    store.set_question_bank(&subject_name, &questions)?;

    let pool = db::connect(config).await?;
    db::run_migrations(&pool).await?;
    for q in &questions {
        kb::add_question(&pool, &subject_name, q).await?;
    }
    pool.close().await;

    let total = store.load_question_bank(&subject_name)?.len();
    println!("import-bank {}", subject_name);
    println!("  questions imported: {}", questions.len());
    println!("  bank size: {}", total);
    println!("ok");
    Ok(())
}
