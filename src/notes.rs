//! Note projector: renders a subject's hierarchy into a directory of
//! markdown documents.
//!
//! Projection is a pure function of the hierarchy plus optional
//! exam-derived solutions: [`project`] produces `(relative path,
//! content)` pairs and [`write_notes`] puts them on disk. Re-running on
//! an unchanged hierarchy yields byte-identical output.
//!
//! Removed topics leave orphaned documents behind unless clean mode is
//! requested; regeneration never deletes files on its own. A
//! `.complete` marker written after the last document distinguishes a
//! finished run from a partially written directory.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::db;
use crate::error::Error;
use crate::models::{Hierarchy, Module, Topic};
use crate::store::SubjectStore;

/// Name of the marker file that closes a successful projection run.
pub const COMPLETE_MARKER: &str = ".complete";

/// An exam-derived answer attached to a topic, appended to its note.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Solution {
    pub question: String,
    pub answer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<String>,
    #[serde(default)]
    pub marks: u32,
}

/// One document produced by projection, with a path relative to the
/// subject's notes directory.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedNote {
    pub path: PathBuf,
    pub content: String,
}

/// Directory name for a module: `<order>. <name>` with characters that
/// break paths replaced.
fn module_dir_name(module: &Module) -> String {
    let safe = module.name.replace(':', " -").replace('/', "-");
    format!("{}. {}", module.order, safe.trim())
}

/// File name for a topic: `<position>. <name>.md`, keeping only
/// path-safe characters. The 1-based position keeps files distinct even
/// when two topics in a module share a name.
fn topic_file_name(position: usize, topic: &Topic) -> String {
    let safe: String = topic
        .name
        .replace('/', "-")
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '-' | '_'))
        .collect();
    format!("{}. {}.md", position, safe.trim())
}

fn one_line(text: &str) -> &str {
    text.lines().next().unwrap_or("").trim()
}

fn render_root_index(hierarchy: &Hierarchy) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# {}", hierarchy.title);
    if !hierarchy.description.trim().is_empty() {
        let _ = writeln!(out, "\n{}", hierarchy.description.trim());
    }
    let _ = writeln!(out, "\n## Modules\n");
    for module in hierarchy.modules_in_order() {
        let line = module
            .description
            .as_deref()
            .map(one_line)
            .filter(|d| !d.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("{} topics", module.topics.len()));
        let _ = writeln!(
            out,
            "{}. [{}]({}/) — {}",
            module.order,
            module.name,
            module_dir_name(module),
            line
        );
    }
    out
}

fn render_module_index(module: &Module) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# {}", module.name);
    if let Some(desc) = module.description.as_deref() {
        if !desc.trim().is_empty() {
            let _ = writeln!(out, "\n{}", desc.trim());
        }
    }
    let _ = writeln!(out, "\n## Topics\n");
    for (i, topic) in module.topics.iter().enumerate() {
        let _ = writeln!(
            out,
            "{}. [{}]({}) — {}",
            i + 1,
            topic.name,
            topic_file_name(i + 1, topic),
            one_line(&topic.summary)
        );
    }
    out
}

fn render_topic(topic: &Topic, solutions: &[Solution]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# {}", topic.name);
    if !topic.summary.trim().is_empty() {
        let _ = writeln!(out, "\n{}", topic.summary.trim());
    }

    if !topic.key_points.is_empty() {
        let _ = writeln!(out, "\n## Key Points\n");
        for kp in &topic.key_points {
            let _ = writeln!(out, "- {}", kp);
        }
    }

    if !topic.subtopics.is_empty() {
        let _ = writeln!(out, "\n## Subtopics\n");
        for sub in &topic.subtopics {
            let _ = writeln!(out, "- {}", sub);
        }
    }

    if !topic.mnemonics.is_empty() {
        let _ = writeln!(out, "\n## Mnemonics\n");
        for m in &topic.mnemonics {
            let _ = writeln!(out, "- {}", m);
        }
    }

    if !topic.questions.is_empty() {
        let _ = writeln!(out, "\n## Practice Questions\n");
        for q in &topic.questions {
            let _ = writeln!(out, "- {}", q);
        }
    }

    for diagram in &topic.mermaid_diagrams {
        let _ = writeln!(out, "\n## Diagram ({})\n", diagram.kind);
        let _ = writeln!(out, "```mermaid\n{}\n```", diagram.script.trim_end());
    }

    if !solutions.is_empty() {
        let _ = writeln!(out, "\n## Solutions\n");
        for sol in solutions {
            let header = match &sol.year {
                Some(year) => format!("### Q ({}, {} marks): {}", year, sol.marks, sol.question),
                None => format!("### Q ({} marks): {}", sol.marks, sol.question),
            };
            let _ = writeln!(out, "{}\n", header);
            let _ = writeln!(out, "{}\n", sol.answer.trim());
            let _ = writeln!(out, "---");
        }
    }

    out
}

/// Render the full document set for a hierarchy: one root index, one
/// index per module, one document per topic. Deterministic: iteration
/// follows module order and topic insertion order.
pub fn project(
    hierarchy: &Hierarchy,
    solutions: &BTreeMap<String, Vec<Solution>>,
) -> Vec<RenderedNote> {
    let mut notes = Vec::new();

    notes.push(RenderedNote {
        path: PathBuf::from("README.md"),
        content: render_root_index(hierarchy),
    });

    for module in hierarchy.modules_in_order() {
        let dir = PathBuf::from(module_dir_name(module));
        notes.push(RenderedNote {
            path: dir.join("README.md"),
            content: render_module_index(module),
        });

        for (i, topic) in module.topics.iter().enumerate() {
            let topic_solutions = solutions
                .get(&topic.id)
                .map(Vec::as_slice)
                .unwrap_or_default();
            notes.push(RenderedNote {
                path: dir.join(topic_file_name(i + 1, topic)),
                content: render_topic(topic, topic_solutions),
            });
        }
    }

    notes
}

/// Write a projected document set under `notes_root`.
///
/// With `clean`, the directory is removed first so orphaned documents
/// from deleted topics disappear; otherwise they are left in place.
/// The completion marker is removed before writing and re-created after
/// the last document, so an interrupted run is detectable.
pub fn write_notes(notes_root: &Path, notes: &[RenderedNote], clean: bool) -> io::Result<()> {
    if clean && notes_root.exists() {
        fs::remove_dir_all(notes_root)?;
    }
    fs::create_dir_all(notes_root)?;

    let marker = notes_root.join(COMPLETE_MARKER);
    if marker.exists() {
        fs::remove_file(&marker)?;
    }

    for note in notes {
        let path = notes_root.join(&note.path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, &note.content)?;
    }

    fs::write(&marker, "complete\n")?;
    Ok(())
}

/// True when the last projection run under `notes_root` finished.
pub fn is_complete(notes_root: &Path) -> bool {
    notes_root.join(COMPLETE_MARKER).exists()
}

pub async fn run_notes(
    config: &Config,
    subject: Option<&str>,
    clean: bool,
) -> anyhow::Result<()> {
    let store = SubjectStore::from_config(config);
    let subject_name = store.resolve(subject)?;
    let subject = store.load(&subject_name)?;
    let solutions = store.load_solutions(&subject_name)?;

    let notes = project(&subject.hierarchy, &solutions);
    let notes_root = store.notes_dir(&subject.slug);
    let clean = clean || config.notes.always_clean;
    write_notes(&notes_root, &notes, clean).map_err(|e| Error::StoreWrite {
        subject: subject_name.clone(),
        source: e,
    })?;

    // Keep the index aligned with what was just projected.
    let pool = db::connect(config).await?;
    db::run_migrations(&pool).await?;
    store.save(&subject, &pool).await?;
    pool.close().await;

    println!("notes {}", subject_name);
    println!("  documents: {}", notes.len());
    println!("  directory: {}", notes_root.display());
    if clean {
        println!("  mode: clean (orphaned documents removed)");
    }
    println!("ok");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DiagramScript, Module, Topic};

    fn sample() -> Hierarchy {
        let mut m1 = Module::new("Module 1: Basics", 1);
        let mut t1 = Topic::new("OSI Model", "Layered networking model.", &m1.id);
        t1.key_points = vec!["Layer 1".into(), "Layer 7".into()];
        t1.mnemonics.push("Please Do Not Throw Sausage Pizza Away".into());
        m1.topics.push(t1);

        let mut m2 = Module::new("Module 2: Transport", 2);
        let t2 = Topic::new("TCP", "Reliable transport.", &m2.id);
        m2.topics.push(t2);

        Hierarchy {
            title: "Computer Networks".into(),
            description: "Networking fundamentals".into(),
            modules: vec![m1, m2],
        }
    }

    #[test]
    fn projection_is_idempotent() {
        let h = sample();
        let a = project(&h, &BTreeMap::new());
        let b = project(&h, &BTreeMap::new());
        assert_eq!(a, b);
    }

    #[test]
    fn projection_emits_one_doc_per_entity() {
        let h = sample();
        let notes = project(&h, &BTreeMap::new());
        // 1 root index + 2 module indexes + 2 topic documents
        assert_eq!(notes.len(), 5);
        assert_eq!(notes[0].path, PathBuf::from("README.md"));
    }

    #[test]
    fn modules_are_projected_in_order() {
        let mut h = sample();
        h.modules.swap(0, 1);
        let notes = project(&h, &BTreeMap::new());
        let root = &notes[0].content;
        let basics = root.find("Module 1: Basics").unwrap();
        let transport = root.find("Module 2: Transport").unwrap();
        assert!(basics < transport);
    }

    #[test]
    fn key_points_keep_stored_order() {
        let h = sample();
        let notes = project(&h, &BTreeMap::new());
        let topic_doc = notes
            .iter()
            .find(|n| n.path.to_string_lossy().contains("OSI Model"))
            .unwrap();
        let l1 = topic_doc.content.find("- Layer 1").unwrap();
        let l7 = topic_doc.content.find("- Layer 7").unwrap();
        assert!(l1 < l7);
    }

    #[test]
    fn solutions_section_appended_when_present() {
        let h = sample();
        let topic_id = h.modules[0].topics[0].id.clone();
        let mut solutions = BTreeMap::new();
        solutions.insert(
            topic_id,
            vec![Solution {
                question: "Explain the OSI model.".into(),
                answer: "Seven layers.".into(),
                year: Some("2023".into()),
                marks: 13,
            }],
        );
        let notes = project(&h, &solutions);
        let topic_doc = notes
            .iter()
            .find(|n| n.path.to_string_lossy().contains("OSI Model"))
            .unwrap();
        assert!(topic_doc.content.contains("## Solutions"));
        assert!(topic_doc.content.contains("2023"));
        assert!(topic_doc.content.contains("Seven layers."));
    }

    #[test]
    fn diagram_scripts_are_embedded() {
        let mut h = sample();
        h.modules[0].topics[0].mermaid_diagrams.push(DiagramScript {
            kind: "flowchart".into(),
            script: "graph TD\n    a --> b".into(),
        });
        let notes = project(&h, &BTreeMap::new());
        let topic_doc = notes
            .iter()
            .find(|n| n.path.to_string_lossy().contains("OSI Model"))
            .unwrap();
        assert!(topic_doc.content.contains("```mermaid"));
        assert!(topic_doc.content.contains("a --> b"));
    }

    #[test]
    fn colliding_topic_names_get_distinct_files() {
        let mut h = sample();
        let module_id = h.modules[0].id.clone();
        h.modules[0]
            .topics
            .push(Topic::new("OSI Model", "Duplicate name.", &module_id));
        let notes = project(&h, &BTreeMap::new());
        let paths: Vec<_> = notes
            .iter()
            .filter(|n| n.path.to_string_lossy().contains("OSI Model"))
            .map(|n| n.path.clone())
            .collect();
        assert_eq!(paths.len(), 2);
        assert_ne!(paths[0], paths[1]);
    }

    #[test]
    fn write_is_idempotent_and_marks_completion() {
        let dir = tempfile::tempdir().unwrap();
        let h = sample();
        let notes = project(&h, &BTreeMap::new());

        write_notes(dir.path(), &notes, false).unwrap();
        assert!(is_complete(dir.path()));
        let first: BTreeMap<PathBuf, String> = notes
            .iter()
            .map(|n| {
                let p = dir.path().join(&n.path);
                (n.path.clone(), fs::read_to_string(p).unwrap())
            })
            .collect();

        write_notes(dir.path(), &notes, false).unwrap();
        for (rel, content) in &first {
            let again = fs::read_to_string(dir.path().join(rel)).unwrap();
            assert_eq!(&again, content);
        }
    }

    #[test]
    fn orphans_survive_unless_clean() {
        let dir = tempfile::tempdir().unwrap();
        let mut h = sample();
        let notes = project(&h, &BTreeMap::new());
        write_notes(dir.path(), &notes, false).unwrap();

        // Drop the second module; its documents are now orphaned.
        h.modules.pop();
        let fewer = project(&h, &BTreeMap::new());
        write_notes(dir.path(), &fewer, false).unwrap();
        assert!(dir.path().join("2. Module 2 - Transport").exists());

        write_notes(dir.path(), &fewer, true).unwrap();
        assert!(!dir.path().join("2. Module 2 - Transport").exists());
        assert!(is_complete(dir.path()));
    }

    #[test]
    fn module_dir_name_strips_path_breakers() {
        let m = Module::new("Module 1: TCP/IP", 1);
        assert_eq!(module_dir_name(&m), "1. Module 1 - TCP-IP");
    }
}
