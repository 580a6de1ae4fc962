//! Core data models: the Subject → Module → Topic hierarchy and its
//! satellite records (questions, mnemonics, exam patterns, animation
//! scripts).
//!
//! Serialization shapes are fixed: the hierarchy document round-trips
//! through serde unchanged up to key order, so manually edited JSON can
//! be re-validated on load without being silently rewritten. Validation
//! never partially constructs an invalid entity: `validate` reports the
//! first offending field and leaves the caller's input untouched.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};

/// The full Module/Topic tree for one subject, as persisted in
/// `syllabus/syllabus.json`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Hierarchy {
    pub title: String,
    pub description: String,
    pub modules: Vec<Module>,
}

/// Ordered grouping of topics within a subject. Owned exclusively by
/// one subject; `order` defines its sequence and must be unique.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Module {
    pub id: String,
    pub name: String,
    pub order: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub topics: Vec<Topic>,
}

/// Leaf unit of content. `key_points` order is meaningful (display
/// order); `prerequisites` are weak references to other topic ids and
/// may dangle or form cycles.
///
/// The optional collections (`mnemonics`, `questions`, `subtopics`,
/// `prerequisites`) are omitted from serialized documents when empty:
/// a hand-written `"prerequisites": []` parses fine but the key is
/// normalized away on the next save.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Topic {
    pub id: String,
    pub name: String,
    pub summary: String,
    #[serde(default)]
    pub key_points: Vec<String>,
    pub module_id: String,
    #[serde(default)]
    pub importance_score: f64,
    #[serde(default)]
    pub mermaid_diagrams: Vec<DiagramScript>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mnemonics: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub questions: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subtopics: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub prerequisites: Vec<String>,
}

/// An opaque diagram script attached to a topic (kind tag + script
/// text). The script grammar is a rendering concern.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DiagramScript {
    #[serde(rename = "type")]
    pub kind: String,
    pub script: String,
}

impl Topic {
    pub fn new(name: impl Into<String>, summary: impl Into<String>, module_id: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            summary: summary.into(),
            key_points: Vec::new(),
            module_id: module_id.to_string(),
            importance_score: 0.0,
            mermaid_diagrams: Vec::new(),
            mnemonics: Vec::new(),
            questions: Vec::new(),
            subtopics: Vec::new(),
            prerequisites: Vec::new(),
        }
    }
}

impl Module {
    pub fn new(name: impl Into<String>, order: i64) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            order,
            description: None,
            topics: Vec::new(),
        }
    }
}

/// Outcome of validating a hierarchy. Dangling prerequisite references
/// are tolerated but reported here, never silently dropped.
#[derive(Debug, Default)]
pub struct ValidationReport {
    /// Pairs of (topic id, unresolved prerequisite id).
    pub dangling_prerequisites: Vec<(String, String)>,
}

impl Hierarchy {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            modules: Vec::new(),
        }
    }

    /// Validate structural invariants: non-empty names, unique module
    /// orders, globally unique topic ids, topic/module ownership links,
    /// importance scores in [0, 1]. Returns a report of dangling
    /// prerequisite references on success.
    pub fn validate(&self) -> Result<ValidationReport> {
        if self.title.trim().is_empty() {
            return Err(Error::validation("title", "must not be empty"));
        }

        let mut seen_orders = std::collections::HashSet::new();
        let mut topic_ids = std::collections::HashSet::new();

        for module in &self.modules {
            if module.name.trim().is_empty() {
                return Err(Error::validation(
                    "modules.name",
                    format!("module '{}' has an empty name", module.id),
                ));
            }
            if module.order < 0 {
                return Err(Error::validation(
                    "modules.order",
                    format!("module '{}' has negative order {}", module.name, module.order),
                ));
            }
            if !seen_orders.insert(module.order) {
                return Err(Error::validation(
                    "modules.order",
                    format!("order {} is used by more than one module", module.order),
                ));
            }

            for topic in &module.topics {
                if topic.name.trim().is_empty() {
                    return Err(Error::validation(
                        "topics.name",
                        format!("topic '{}' has an empty name", topic.id),
                    ));
                }
                if topic.module_id != module.id {
                    return Err(Error::validation(
                        "topics.module_id",
                        format!(
                            "topic '{}' references module '{}' but is owned by '{}'",
                            topic.name, topic.module_id, module.id
                        ),
                    ));
                }
                if !(0.0..=1.0).contains(&topic.importance_score) {
                    return Err(Error::validation(
                        "topics.importance_score",
                        format!(
                            "topic '{}' has importance {} outside [0, 1]",
                            topic.name, topic.importance_score
                        ),
                    ));
                }
                if !topic_ids.insert(topic.id.as_str()) {
                    return Err(Error::validation(
                        "topics.id",
                        format!("topic id '{}' appears more than once", topic.id),
                    ));
                }
            }
        }

        // Prerequisites are weak references: unresolved ids are reported,
        // not rejected. Cycles are permitted.
        let mut report = ValidationReport::default();
        for module in &self.modules {
            for topic in &module.topics {
                for prereq in &topic.prerequisites {
                    if !topic_ids.contains(prereq.as_str()) {
                        report
                            .dangling_prerequisites
                            .push((topic.id.clone(), prereq.clone()));
                    }
                }
            }
        }

        Ok(report)
    }

    /// Modules sorted by their `order` field. The stored vector keeps
    /// insertion order; display and projection always go through here.
    pub fn modules_in_order(&self) -> Vec<&Module> {
        let mut mods: Vec<&Module> = self.modules.iter().collect();
        mods.sort_by_key(|m| m.order);
        mods
    }

    pub fn topic_count(&self) -> usize {
        self.modules.iter().map(|m| m.topics.len()).sum()
    }

    pub fn find_module_mut(&mut self, name: &str) -> Option<&mut Module> {
        self.modules
            .iter_mut()
            .find(|m| m.name.eq_ignore_ascii_case(name))
    }
}

/// A subject as returned by the hierarchy store: the registered name
/// plus the loaded tree and its index metadata.
#[derive(Debug, Clone)]
pub struct Subject {
    pub name: String,
    pub slug: String,
    pub hierarchy: Hierarchy,
    pub has_question_bank: bool,
    pub is_current: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    MultipleChoice,
    OpenEnded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            other => Err(Error::validation(
                "difficulty",
                format!("'{}' is not one of easy, medium, hard", other),
            )),
        }
    }
}

impl QuestionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionType::MultipleChoice => "multiple_choice",
            QuestionType::OpenEnded => "open_ended",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "multiple_choice" => Ok(QuestionType::MultipleChoice),
            "open_ended" => Ok(QuestionType::OpenEnded),
            other => Err(Error::validation(
                "type",
                format!("'{}' is not one of multiple_choice, open_ended", other),
            )),
        }
    }
}

/// Where a question came from, when it was extracted from a past paper.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Provenance {
    pub paper: String,
    pub year: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub part: Option<String>,
    #[serde(default)]
    pub marks: u32,
}

/// A practice question. `topic` is a soft link: a topic name or an
/// external-source tag (for example a video URL); it may or may not
/// resolve to a live topic.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Question {
    pub id: String,
    pub topic: String,
    pub question: String,
    pub answer: String,
    #[serde(rename = "type")]
    pub qtype: QuestionType,
    #[serde(default)]
    pub options: Vec<String>,
    pub difficulty: Difficulty,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provenance: Option<Provenance>,
}

impl Question {
    pub fn new(
        topic: impl Into<String>,
        question: impl Into<String>,
        answer: impl Into<String>,
        qtype: QuestionType,
        difficulty: Difficulty,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            topic: topic.into(),
            question: question.into(),
            answer: answer.into(),
            qtype,
            options: Vec::new(),
            difficulty,
            provenance: None,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.question.trim().is_empty() {
            return Err(Error::validation("question", "must not be empty"));
        }
        if self.topic.trim().is_empty() {
            return Err(Error::validation("topic", "must not be empty"));
        }
        if self.qtype == QuestionType::MultipleChoice && self.options.len() < 2 {
            return Err(Error::validation(
                "options",
                "multiple-choice questions need at least two options",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MnemonicTechnique {
    Acronym,
    Other,
}

/// A memory aid for a topic, with an explanation mapping each unit of
/// the mnemonic back to its referent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Mnemonic {
    pub topic: String,
    pub technique: MnemonicTechnique,
    pub content: String,
    pub explanation: String,
}

/// One aspect row of a two-concept comparison.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DifferenceRow {
    pub aspect: String,
    pub concept_a_value: String,
    pub concept_b_value: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DifferenceTable {
    pub concept_a: String,
    pub concept_b: String,
    pub differences: Vec<DifferenceRow>,
}

/// One section of an exam pattern (e.g. "Part A", questions 1-10,
/// 2 marks each).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExamSection {
    pub name: String,
    /// Inclusive question-number range [start, end].
    pub question_range: [u32; 2],
    pub marks_per_question: u32,
    #[serde(default)]
    pub has_choice: bool,
}

/// The structure of an exam: ordered sections plus a mapping from
/// module name to the question numbers it covers (a soft link).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExamPattern {
    pub name: String,
    pub sections: Vec<ExamSection>,
    #[serde(default)]
    pub module_mapping: std::collections::BTreeMap<String, Vec<u32>>,
}

impl ExamPattern {
    /// Section ranges must be well-formed and must not overlap.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::validation("name", "must not be empty"));
        }
        for section in &self.sections {
            let [start, end] = section.question_range;
            if start == 0 || end < start {
                return Err(Error::validation(
                    "sections.question_range",
                    format!(
                        "section '{}' has invalid range [{}, {}]",
                        section.name, start, end
                    ),
                ));
            }
        }
        for (i, a) in self.sections.iter().enumerate() {
            for b in self.sections.iter().skip(i + 1) {
                if a.question_range[0] <= b.question_range[1]
                    && b.question_range[0] <= a.question_range[1]
                {
                    return Err(Error::validation(
                        "sections.question_range",
                        format!(
                            "sections '{}' and '{}' have overlapping question ranges",
                            a.name, b.name
                        ),
                    ));
                }
            }
        }
        Ok(())
    }
}

/// A single draw instruction inside an animation frame. Rendering is
/// an external collaborator concern; these are purely descriptive.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DrawCommand {
    Circle {
        center: [i32; 2],
        radius: i32,
        color: String,
    },
    Text {
        content: String,
        position: [i32; 2],
    },
    Line {
        from: [i32; 2],
        to: [i32; 2],
        color: String,
    },
    Rectangle {
        top_left: [i32; 2],
        bottom_right: [i32; 2],
        color: String,
    },
    Arrow {
        from: [i32; 2],
        to: [i32; 2],
        color: String,
    },
}

/// One animation frame: how long it is shown (in frame counts at the
/// script's frame rate) and what it draws, in order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Frame {
    pub duration_frames: u32,
    pub commands: Vec<DrawCommand>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnimationScript {
    pub title: String,
    pub topic: String,
    pub fps: u32,
    pub frames: Vec<Frame>,
}

impl AnimationScript {
    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(Error::validation("title", "must not be empty"));
        }
        if self.fps == 0 {
            return Err(Error::validation("fps", "must be >= 1"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_hierarchy() -> Hierarchy {
        let mut module = Module::new("M1", 1);
        let mut topic = Topic::new("OSI Model", "Layered networking model", &module.id);
        topic.key_points = vec!["Layer 1".into(), "Layer 7".into()];
        module.topics.push(topic);
        Hierarchy {
            title: "Computer Networks".into(),
            description: "Networking fundamentals".into(),
            modules: vec![module],
        }
    }

    #[test]
    fn valid_hierarchy_passes() {
        let report = sample_hierarchy().validate().unwrap();
        assert!(report.dangling_prerequisites.is_empty());
    }

    #[test]
    fn document_round_trip_is_identity() {
        let h = sample_hierarchy();
        let json = serde_json::to_string_pretty(&h).unwrap();
        let parsed: Hierarchy = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, h);
        assert_eq!(serde_json::to_string_pretty(&parsed).unwrap(), json);
    }

    #[test]
    fn duplicate_module_order_rejected() {
        let mut h = sample_hierarchy();
        h.modules.push(Module::new("M2", 1));
        let err = h.validate().unwrap_err();
        assert!(matches!(err, Error::Validation { ref field, .. } if field == "modules.order"));
    }

    #[test]
    fn duplicate_topic_id_rejected() {
        let mut h = sample_hierarchy();
        let mut m2 = Module::new("M2", 2);
        let mut dup = Topic::new("Copy", "", &m2.id);
        dup.id = h.modules[0].topics[0].id.clone();
        m2.topics.push(dup);
        h.modules.push(m2);
        let err = h.validate().unwrap_err();
        assert!(matches!(err, Error::Validation { ref field, .. } if field == "topics.id"));
    }

    #[test]
    fn mismatched_module_id_rejected() {
        let mut h = sample_hierarchy();
        h.modules[0].topics[0].module_id = "elsewhere".into();
        assert!(h.validate().is_err());
    }

    #[test]
    fn importance_out_of_range_rejected() {
        let mut h = sample_hierarchy();
        h.modules[0].topics[0].importance_score = 1.5;
        let err = h.validate().unwrap_err();
        assert!(matches!(
            err,
            Error::Validation { ref field, .. } if field == "topics.importance_score"
        ));
    }

    #[test]
    fn dangling_prerequisite_reported_not_rejected() {
        let mut h = sample_hierarchy();
        h.modules[0].topics[0]
            .prerequisites
            .push("no-such-topic".into());
        let report = h.validate().unwrap();
        assert_eq!(report.dangling_prerequisites.len(), 1);
        assert_eq!(report.dangling_prerequisites[0].1, "no-such-topic");
    }

    #[test]
    fn prerequisite_cycle_is_tolerated() {
        let mut h = sample_hierarchy();
        let module_id = h.modules[0].id.clone();
        let t1_id = h.modules[0].topics[0].id.clone();
        let mut t2 = Topic::new("TCP", "Transport", &module_id);
        let t2_id = t2.id.clone();
        t2.prerequisites.push(t1_id.clone());
        h.modules[0].topics[0].prerequisites.push(t2_id);
        h.modules[0].topics.push(t2);
        let report = h.validate().unwrap();
        assert!(report.dangling_prerequisites.is_empty());
    }

    #[test]
    fn explicit_empty_collections_are_normalized_away_on_save() {
        let h = sample_hierarchy();
        let mut value = serde_json::to_value(&h).unwrap();
        value["modules"][0]["topics"][0]["prerequisites"] = serde_json::json!([]);
        value["modules"][0]["topics"][0]["mnemonics"] = serde_json::json!([]);

        let parsed: Hierarchy = serde_json::from_value(value).unwrap();
        assert_eq!(parsed, h);

        let out = serde_json::to_string_pretty(&parsed).unwrap();
        assert!(!out.contains("\"prerequisites\""));
        assert!(!out.contains("\"mnemonics\""));
    }

    #[test]
    fn key_point_order_survives_round_trip() {
        let h = sample_hierarchy();
        let json = serde_json::to_string(&h).unwrap();
        let parsed: Hierarchy = serde_json::from_str(&json).unwrap();
        assert_eq!(
            parsed.modules[0].topics[0].key_points,
            vec!["Layer 1".to_string(), "Layer 7".to_string()]
        );
    }

    #[test]
    fn modules_in_order_sorts_by_order_field() {
        let mut h = Hierarchy::new("S", "");
        h.modules.push(Module::new("B", 2));
        h.modules.push(Module::new("A", 1));
        h.modules.push(Module::new("C", 3));
        let names: Vec<&str> = h.modules_in_order().iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["A", "B", "C"]);
    }

    #[test]
    fn mcq_needs_options() {
        let q = Question::new(
            "OSI Model",
            "How many layers?",
            "7",
            QuestionType::MultipleChoice,
            Difficulty::Easy,
        );
        let err = q.validate().unwrap_err();
        assert!(matches!(err, Error::Validation { ref field, .. } if field == "options"));
    }

    #[test]
    fn question_tags_round_trip() {
        let mut q = Question::new(
            "OSI Model",
            "How many layers?",
            "7",
            QuestionType::MultipleChoice,
            Difficulty::Hard,
        );
        q.options = vec!["5".into(), "7".into()];
        let json = serde_json::to_value(&q).unwrap();
        assert_eq!(json["type"], "multiple_choice");
        assert_eq!(json["difficulty"], "hard");
        let back: Question = serde_json::from_value(json).unwrap();
        assert_eq!(back, q);
    }

    #[test]
    fn overlapping_exam_sections_rejected() {
        let pattern = ExamPattern {
            name: "University2024".into(),
            sections: vec![
                ExamSection {
                    name: "Part A".into(),
                    question_range: [1, 10],
                    marks_per_question: 2,
                    has_choice: false,
                },
                ExamSection {
                    name: "Part B".into(),
                    question_range: [10, 16],
                    marks_per_question: 13,
                    has_choice: true,
                },
            ],
            module_mapping: Default::default(),
        };
        assert!(pattern.validate().is_err());
    }

    #[test]
    fn adjacent_exam_sections_allowed() {
        let pattern = ExamPattern {
            name: "University2024".into(),
            sections: vec![
                ExamSection {
                    name: "Part A".into(),
                    question_range: [1, 10],
                    marks_per_question: 2,
                    has_choice: false,
                },
                ExamSection {
                    name: "Part B".into(),
                    question_range: [11, 16],
                    marks_per_question: 13,
                    has_choice: true,
                },
            ],
            module_mapping: Default::default(),
        };
        assert!(pattern.validate().is_ok());
    }

    #[test]
    fn draw_command_tagging() {
        let cmd = DrawCommand::Circle {
            center: [100, 200],
            radius: 30,
            color: "#ff0000".into(),
        };
        let json = serde_json::to_value(&cmd).unwrap();
        assert_eq!(json["kind"], "circle");
        let back: DrawCommand = serde_json::from_value(json).unwrap();
        assert_eq!(back, cmd);
    }
}
