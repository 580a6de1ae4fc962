//! Collaborator interfaces: the seams where external systems (AI
//! structuring, answer retrieval, animation rendering) plug into the
//! core.
//!
//! The core never talks to a network or renderer directly. Each
//! capability is a trait the caller injects, so every operation can be
//! exercised with a deterministic implementation. External calls go
//! through [`with_timeout`]; nothing in the core blocks indefinitely on
//! a collaborator.

use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::models::{AnimationScript, Hierarchy, Module, Topic};

/// Turns raw syllabus text into a structured hierarchy.
pub trait StructureGenerator {
    fn generate_structure(&self, raw_syllabus_text: &str, subject_name: &str)
        -> Result<Hierarchy>;
}

/// Answers a question against an ingested corpus (video transcript,
/// question-bank PDF). The corpus id is opaque to the core.
pub trait AnswerRetriever {
    fn retrieve_answer(&self, corpus_id: &str, question_text: &str) -> Result<String>;
}

/// Renders an animation script to a media file and returns its path.
pub trait AnimationRenderer {
    fn render(&self, script: &AnimationScript) -> Result<PathBuf>;
}

/// Bound a collaborator call by a caller-supplied timeout. A slow
/// collaborator produces `CollaboratorTimeout`, never a hang.
pub async fn with_timeout<T, F>(seconds: u64, operation: &str, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(Duration::from_secs(seconds), fut).await {
        Ok(result) => result,
        Err(_) => Err(Error::CollaboratorTimeout {
            operation: operation.to_string(),
            seconds,
        }),
    }
}

/// Deterministic, offline structure generator: parses a plain-text
/// syllabus outline into modules and topics.
///
/// Recognized shapes, line by line:
/// - `Module 1: Name` / `Unit 2 - Name` / `## Name` start a new module;
/// - `- Topic` or `* Topic` bullets add a topic to the current module,
///   with an optional `: summary` after the name;
/// - the first non-bullet line before any module becomes the subject
///   description; other prose lines are ignored.
///
/// Bullets before the first module header go into an implicit
/// "Module 1: Overview".
pub struct OutlineStructurer;

fn module_header(line: &str) -> Option<String> {
    if let Some(rest) = line.strip_prefix("## ") {
        let name = rest.trim();
        if !name.is_empty() {
            return Some(name.to_string());
        }
        return None;
    }

    let lower = line.to_lowercase();
    if lower.starts_with("module") || lower.starts_with("unit") {
        let name = line.trim();
        if !name.is_empty() {
            return Some(name.to_string());
        }
    }
    None
}

fn topic_bullet(line: &str) -> Option<(String, String)> {
    let rest = line
        .strip_prefix("- ")
        .or_else(|| line.strip_prefix("* "))?;
    let rest = rest.trim();
    if rest.is_empty() {
        return None;
    }
    let (name, summary) = match rest.split_once(':') {
        Some((n, s)) => (n.trim(), s.trim()),
        None => (rest, ""),
    };
    if name.is_empty() {
        return None;
    }
    Some((name.to_string(), summary.to_string()))
}

impl StructureGenerator for OutlineStructurer {
    fn generate_structure(
        &self,
        raw_syllabus_text: &str,
        subject_name: &str,
    ) -> Result<Hierarchy> {
        let mut hierarchy = Hierarchy::new(subject_name, "");
        let mut current: Option<Module> = None;
        let mut next_order: i64 = 1;

        for raw_line in raw_syllabus_text.lines() {
            let line = raw_line.trim();
            if line.is_empty() {
                continue;
            }

            if let Some(name) = module_header(line) {
                if let Some(module) = current.take() {
                    hierarchy.modules.push(module);
                }
                current = Some(Module::new(name, next_order));
                next_order += 1;
                continue;
            }

            if let Some((name, summary)) = topic_bullet(line) {
                let module = current.get_or_insert_with(|| {
                    let m = Module::new("Module 1: Overview", next_order);
                    next_order += 1;
                    m
                });
                module.topics.push(Topic::new(name, summary, &module.id));
                continue;
            }

            if hierarchy.description.is_empty() && current.is_none() {
                hierarchy.description = line.to_string();
            }
        }

        if let Some(module) = current.take() {
            hierarchy.modules.push(module);
        }

        if hierarchy.topic_count() == 0 {
            return Err(Error::Collaborator {
                operation: "generate_structure".to_string(),
                reason: format!(
                    "no modules or topics recognized in syllabus text for '{}'",
                    subject_name
                ),
            });
        }

        Ok(hierarchy)
    }
}

/// Canned retriever for tests and offline use: returns the same answer
/// for every question.
pub struct StaticRetriever {
    pub answer: String,
}

impl AnswerRetriever for StaticRetriever {
    fn retrieve_answer(&self, _corpus_id: &str, _question_text: &str) -> Result<String> {
        Ok(self.answer.clone())
    }
}

/// Renderer that serializes the script itself as JSON instead of
/// producing media, so animation flows work without a codec stack.
pub struct ScriptFileRenderer {
    pub out_dir: PathBuf,
}

impl AnimationRenderer for ScriptFileRenderer {
    fn render(&self, script: &AnimationScript) -> Result<PathBuf> {
        script.validate()?;
        let file_name = format!("{}.json", crate::store::folder_slug(&script.title));
        let path = self.out_dir.join(file_name);
        let json = serde_json::to_string_pretty(script).map_err(|e| Error::Collaborator {
            operation: "render_animation".to_string(),
            reason: e.to_string(),
        })?;
        std::fs::create_dir_all(&self.out_dir).map_err(|e| Error::Collaborator {
            operation: "render_animation".to_string(),
            reason: e.to_string(),
        })?;
        std::fs::write(&path, json).map_err(|e| Error::Collaborator {
            operation: "render_animation".to_string(),
            reason: e.to_string(),
        })?;
        Ok(path)
    }
}
