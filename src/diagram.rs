//! Diagram derivation: relationship graphs and mindmaps from a
//! hierarchy, serialized as mermaid scripts.
//!
//! Node identifiers are derived from entity UUIDs, not display names,
//! so repeated derivation on an unchanged hierarchy is byte-stable.
//! Prerequisite references are an explicit edge list over stored ids:
//! derivation walks that list with a visited-edge set, so cycles are
//! emitted once and never traversed.

use std::collections::{HashMap, HashSet};
use std::fmt::Write as _;

use tracing::warn;

use crate::config::Config;
use crate::error::Error;
use crate::models::{Hierarchy, Topic};
use crate::store::SubjectStore;

/// Result of a graph derivation: the script plus how many prerequisite
/// references could not be resolved (each one is skipped, not drawn).
#[derive(Debug, Clone)]
pub struct DiagramReport {
    pub script: String,
    pub dangling: usize,
}

/// Stable node identifier: prefix plus the first eight hex characters
/// of the entity UUID.
fn node_id(prefix: &str, entity_id: &str) -> String {
    let short: String = entity_id
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .take(8)
        .collect();
    format!("{}_{}", prefix, short)
}

/// Strip characters that break mermaid label syntax.
fn sanitize_label(text: &str) -> String {
    text.chars()
        .filter(|c| !matches!(c, '(' | ')' | '[' | ']'))
        .map(|c| match c {
            '"' => '\'',
            '\n' => ' ',
            other => other,
        })
        .collect()
}

fn truncate_label(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let head: String = text.chars().take(max.saturating_sub(3)).collect();
    format!("{}...", head)
}

/// Derive the relationship graph for a hierarchy as a mermaid
/// `graph TD` script: one node per module and topic, a containment edge
/// per topic, and a labeled edge per resolved prerequisite reference.
pub fn hierarchy_graph(hierarchy: &Hierarchy) -> DiagramReport {
    let mut script = String::from("graph TD\n");

    // Topic id → node id, for resolving prerequisite references.
    let mut topic_nodes: HashMap<&str, String> = HashMap::new();
    for module in &hierarchy.modules {
        for topic in &module.topics {
            topic_nodes.insert(topic.id.as_str(), node_id("t", &topic.id));
        }
    }

    for module in hierarchy.modules_in_order() {
        let _ = writeln!(
            script,
            "    {}[\"{}\"]",
            node_id("m", &module.id),
            sanitize_label(&module.name)
        );
        for topic in &module.topics {
            let _ = writeln!(
                script,
                "    {}[\"{}\"]",
                topic_nodes[topic.id.as_str()],
                sanitize_label(&topic.name)
            );
        }
    }

    let mut emitted: HashSet<(String, String)> = HashSet::new();
    let mut dangling = 0usize;

    for module in hierarchy.modules_in_order() {
        let module_node = node_id("m", &module.id);
        for topic in &module.topics {
            let topic_node = &topic_nodes[topic.id.as_str()];
            if emitted.insert((module_node.clone(), topic_node.clone())) {
                let _ = writeln!(script, "    {} --> {}", module_node, topic_node);
            }
        }
    }

    for module in hierarchy.modules_in_order() {
        for topic in &module.topics {
            let topic_node = &topic_nodes[topic.id.as_str()];
            for prereq in &topic.prerequisites {
                match topic_nodes.get(prereq.as_str()) {
                    Some(prereq_node) => {
                        if emitted.insert((prereq_node.clone(), topic_node.clone())) {
                            let _ = writeln!(
                                script,
                                "    {} -- prereq --> {}",
                                prereq_node, topic_node
                            );
                        }
                    }
                    None => {
                        dangling += 1;
                        warn!(
                            topic = %topic.name,
                            prereq = %prereq,
                            "skipping dangling prerequisite edge"
                        );
                    }
                }
            }
        }
    }

    DiagramReport { script, dangling }
}

/// Derive a mermaid `mindmap` script over the whole hierarchy: root,
/// modules, topics, then key points truncated to `max_label`.
pub fn mindmap_script(hierarchy: &Hierarchy, max_label: usize) -> String {
    let mut script = String::from("mindmap\n");
    let _ = writeln!(script, "  root(({}))", sanitize_label(&hierarchy.title));
    for module in hierarchy.modules_in_order() {
        let _ = writeln!(script, "    {}", sanitize_label(&module.name));
        for topic in &module.topics {
            let _ = writeln!(script, "      {}", sanitize_label(&topic.name));
            for kp in &topic.key_points {
                let _ = writeln!(
                    script,
                    "        {}",
                    truncate_label(&sanitize_label(kp), max_label)
                );
            }
        }
    }
    script
}

/// Single-topic mindmap, used for the per-topic `<name>_mermaid.md`
/// files alongside the notes.
pub fn topic_mindmap(topic: &Topic, max_label: usize) -> String {
    let mut script = String::from("mindmap\n");
    let _ = writeln!(script, "  root(({}))", sanitize_label(&topic.name));
    for kp in &topic.key_points {
        let _ = writeln!(
            script,
            "    {}",
            truncate_label(&sanitize_label(kp), max_label)
        );
    }
    script
}

/// File name for a topic's standalone mindmap script. The module order
/// and 1-based topic position keep same-named topics (which are
/// allowed) from overwriting each other's files.
fn topic_mindmap_file_name(module_order: i64, position: usize, topic_name: &str) -> String {
    format!(
        "{}.{}. {}_mindmap.mmd",
        module_order,
        position,
        crate::store::folder_slug(topic_name)
    )
}

/// Which script `stu diagram` derives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagramKind {
    Graph,
    Mindmap,
}

impl DiagramKind {
    pub fn parse(s: &str) -> anyhow::Result<Self> {
        match s {
            "graph" => Ok(DiagramKind::Graph),
            "mindmap" => Ok(DiagramKind::Mindmap),
            other => anyhow::bail!("Unknown diagram kind: '{}'. Use graph or mindmap.", other),
        }
    }
}

pub fn run_diagram(
    config: &Config,
    subject: Option<&str>,
    kind: DiagramKind,
) -> anyhow::Result<()> {
    let store = SubjectStore::from_config(config);
    let subject_name = store.resolve(subject)?;
    let subject = store.load(&subject_name)?;

    let (file_name, script, dangling) = match kind {
        DiagramKind::Graph => {
            let report = hierarchy_graph(&subject.hierarchy);
            ("hierarchy.mmd", report.script, report.dangling)
        }
        DiagramKind::Mindmap => (
            "mindmap.mmd",
            mindmap_script(&subject.hierarchy, config.diagram.mindmap_max_label),
            0,
        ),
    };

    let out_dir = store.mindmaps_dir(&subject.slug);
    std::fs::create_dir_all(&out_dir).map_err(|e| Error::StoreWrite {
        subject: subject_name.clone(),
        source: e,
    })?;
    let out_path = out_dir.join(file_name);
    std::fs::write(&out_path, &script).map_err(|e| Error::StoreWrite {
        subject: subject_name.clone(),
        source: e,
    })?;

    // Mindmap mode also emits one small script per topic. File names
    // carry the module order and topic position so same-named topics
    // do not overwrite each other.
    let mut per_topic = 0;
    if kind == DiagramKind::Mindmap {
        for module in subject.hierarchy.modules_in_order() {
            for (i, topic) in module.topics.iter().enumerate() {
                let script = topic_mindmap(topic, config.diagram.mindmap_max_label);
                let name = topic_mindmap_file_name(module.order, i + 1, &topic.name);
                std::fs::write(out_dir.join(name), script).map_err(|e| Error::StoreWrite {
                    subject: subject_name.clone(),
                    source: e,
                })?;
                per_topic += 1;
            }
        }
    }

    println!("diagram {}", subject_name);
    println!("  script: {}", out_path.display());
    if per_topic > 0 {
        println!("  topic mindmaps: {}", per_topic);
    }
    if dangling > 0 {
        println!("  warning: {} dangling prerequisite reference(s) skipped", dangling);
    }
    println!("ok");
    Ok(())
}
