//! Exam patterns and exam-driven importance scoring.
//!
//! Patterns live as standalone JSON documents under
//! `data/exam_patterns/<name>.json` and are re-validated on every load
//! (overlapping section ranges are rejected). Analyzed questions from
//! past papers feed [`apply_importance`], which turns per-module
//! question frequency into topic importance scores.

use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::db;
use crate::error::Error;
use crate::models::{
    Difficulty, ExamPattern, ExamSection, Hierarchy, Provenance, Question, QuestionType,
};
use crate::store::{self, SubjectStore};

/// A question extracted from a past paper by the analysis collaborator,
/// before it becomes a knowledge-base [`Question`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalyzedQuestion {
    pub number: u32,
    pub text: String,
    #[serde(default)]
    pub year: String,
    #[serde(default)]
    pub marks: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub part: Option<String>,
    /// Model answer, when the paper analysis produced one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
}

pub fn patterns_dir(config: &Config) -> PathBuf {
    config.store.data_dir.join("exam_patterns")
}

pub fn save_pattern(config: &Config, pattern: &ExamPattern) -> crate::error::Result<()> {
    pattern.validate()?;
    let path = patterns_dir(config).join(format!("{}.json", pattern.name));
    let json = serde_json::to_string_pretty(pattern).map_err(|e| Error::StoreWrite {
        subject: pattern.name.clone(),
        source: e.into(),
    })?;
    store::atomic_write(&path, &json).map_err(|e| Error::StoreWrite {
        subject: pattern.name.clone(),
        source: e,
    })
}

pub fn load_pattern(config: &Config, name: &str) -> anyhow::Result<ExamPattern> {
    let path = patterns_dir(config).join(format!("{}.json", name));
    if !path.exists() {
        anyhow::bail!(
            "Exam pattern '{}' not found. Register it with 'stu exam configure'.",
            name
        );
    }
    let raw = fs::read_to_string(&path)?;
    let pattern: ExamPattern = serde_json::from_str(&raw)
        .map_err(|e| Error::corrupt(name, format!("exam pattern: {}", e)))?;
    pattern.validate()?;
    Ok(pattern)
}

/// The section covering a given question number, if any.
pub fn section_for<'a>(pattern: &'a ExamPattern, number: u32) -> Option<&'a ExamSection> {
    pattern
        .sections
        .iter()
        .find(|s| s.question_range[0] <= number && number <= s.question_range[1])
}

/// The module a question number maps to, per the pattern's module
/// mapping (a soft link by module name).
pub fn module_for<'a>(pattern: &'a ExamPattern, number: u32) -> Option<&'a str> {
    pattern
        .module_mapping
        .iter()
        .find(|(_, numbers)| numbers.contains(&number))
        .map(|(name, _)| name.as_str())
}

/// Update topic importance scores from past-paper question frequency.
///
/// Questions are attributed to modules through the pattern's module
/// mapping; each module's count is normalized by the maximum count, and
/// every topic in that module receives the module's score. Returns the
/// number of topics updated.
pub fn apply_importance(
    hierarchy: &mut Hierarchy,
    pattern: &ExamPattern,
    questions: &[AnalyzedQuestion],
) -> usize {
    let mut counts: std::collections::BTreeMap<&str, usize> = std::collections::BTreeMap::new();
    for q in questions {
        if let Some(module) = module_for(pattern, q.number) {
            *counts.entry(module).or_insert(0) += 1;
        }
    }

    let max = counts.values().copied().max().unwrap_or(0);
    if max == 0 {
        return 0;
    }

    let mut updated = 0;
    for module in hierarchy.modules.iter_mut() {
        let Some(count) = counts.get(module.name.as_str()) else {
            continue;
        };
        let score = (*count as f64 / max as f64).clamp(0.0, 1.0);
        for topic in module.topics.iter_mut() {
            topic.importance_score = score;
            updated += 1;
        }
    }
    updated
}

/// Convert an analyzed question into a knowledge-base record with
/// provenance. The answer is filled in later by a retrieval
/// collaborator; open-ended until then.
pub fn to_question(
    analyzed: &AnalyzedQuestion,
    pattern: &ExamPattern,
    paper: &str,
    answer: &str,
) -> Question {
    let topic = module_for(pattern, analyzed.number)
        .unwrap_or("Unknown")
        .to_string();
    let difficulty = match section_for(pattern, analyzed.number) {
        Some(s) if s.marks_per_question >= 10 => Difficulty::Hard,
        Some(s) if s.marks_per_question >= 5 => Difficulty::Medium,
        _ => Difficulty::Easy,
    };
    let mut q = Question::new(
        topic,
        analyzed.text.clone(),
        answer,
        QuestionType::OpenEnded,
        difficulty,
    );
    q.provenance = Some(Provenance {
        paper: paper.to_string(),
        year: analyzed.year.clone(),
        part: analyzed.part.clone(),
        marks: analyzed.marks,
    });
    q
}

/// Attach answered questions to their module's topics as note
/// solutions, keyed by topic id. A question lands on the topic whose
/// name appears in its text, falling back to the module's first topic.
pub fn collect_solutions(
    hierarchy: &Hierarchy,
    pattern: &ExamPattern,
    questions: &[AnalyzedQuestion],
) -> std::collections::BTreeMap<String, Vec<crate::notes::Solution>> {
    let mut solutions: std::collections::BTreeMap<String, Vec<crate::notes::Solution>> =
        std::collections::BTreeMap::new();

    for q in questions {
        let Some(answer) = q.answer.as_deref().filter(|a| !a.trim().is_empty()) else {
            continue;
        };
        let Some(module_name) = module_for(pattern, q.number) else {
            continue;
        };
        let Some(module) = hierarchy
            .modules
            .iter()
            .find(|m| m.name == module_name)
        else {
            continue;
        };

        let lower = q.text.to_lowercase();
        let topic = module
            .topics
            .iter()
            .find(|t| lower.contains(&t.name.to_lowercase()))
            .or_else(|| module.topics.first());
        let Some(topic) = topic else {
            continue;
        };

        solutions
            .entry(topic.id.clone())
            .or_default()
            .push(crate::notes::Solution {
                question: q.text.clone(),
                answer: answer.to_string(),
                year: if q.year.is_empty() {
                    None
                } else {
                    Some(q.year.clone())
                },
                marks: q.marks,
            });
    }

    solutions
}

pub fn run_exam_configure(config: &Config, file: &std::path::Path) -> anyhow::Result<()> {
    let raw = fs::read_to_string(file)?;
    let pattern: ExamPattern = serde_json::from_str(&raw)?;
    save_pattern(config, &pattern)?;

    println!("exam configure {}", pattern.name);
    println!("  sections: {}", pattern.sections.len());
    println!("  mapped modules: {}", pattern.module_mapping.len());
    println!(
        "  saved: {}",
        patterns_dir(config)
            .join(format!("{}.json", pattern.name))
            .display()
    );
    println!("ok");
    Ok(())
}

pub async fn run_exam_apply(
    config: &Config,
    pattern_name: &str,
    questions_file: &std::path::Path,
    paper: &str,
    subject: Option<&str>,
) -> anyhow::Result<()> {
    let pattern = load_pattern(config, pattern_name)?;
    let raw = fs::read_to_string(questions_file)?;
    let questions: Vec<AnalyzedQuestion> = serde_json::from_str(&raw)?;

    let store = SubjectStore::from_config(config);
    let subject_name = store.resolve(subject)?;
    let mut subject = store.load(&subject_name)?;

    let updated = apply_importance(&mut subject.hierarchy, &pattern, &questions);

    let pool = db::connect(config).await?;
    db::run_migrations(&pool).await?;
    store.save(&subject, &pool).await?;

    let mut stored = 0;
    for analyzed in &questions {
        let q = to_question(
            analyzed,
            &pattern,
            paper,
            analyzed.answer.as_deref().unwrap_or(""),
        );
        if q.validate().is_ok() {
            crate::kb::add_question(&pool, &subject_name, &q).await?;
            stored += 1;
        }
    }
    pool.close().await;

    // Answered questions also become per-topic solutions, appended to
    // any already on disk and surfaced by the next notes run.
    let new_solutions = collect_solutions(&subject.hierarchy, &pattern, &questions);
    let solution_count: usize = new_solutions.values().map(Vec::len).sum();
    if solution_count > 0 {
        let mut all = store.load_solutions(&subject_name)?;
        for (topic_id, mut entries) in new_solutions {
            all.entry(topic_id).or_default().append(&mut entries);
        }
        store.save_solutions(&subject_name, &all)?;
    }

    println!("exam apply {} ({})", pattern_name, subject_name);
    println!("  analyzed questions: {}", questions.len());
    println!("  questions stored: {}", stored);
    println!("  topics rescored: {}", updated);
    println!("  solutions attached: {}", solution_count);
    println!("ok");
    Ok(())
}
