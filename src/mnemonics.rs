//! Mnemonic generation and example difference tables.

use crate::models::{DifferenceRow, DifferenceTable, Mnemonic, MnemonicTechnique};

/// Build an acronym mnemonic from a topic's key points: first letter of
/// each point, uppercased, with an explanation mapping letters back to
/// their referents.
pub fn acronym_mnemonic(topic: &str, key_points: &[String]) -> Mnemonic {
    let letters: String = key_points
        .iter()
        .filter_map(|point| point.trim().chars().next())
        .flat_map(|c| c.to_uppercase())
        .collect();

    let explanation = if key_points.is_empty() {
        "No key points provided".to_string()
    } else {
        format!("Each letter represents: {}", key_points.join(", "))
    };

    Mnemonic {
        topic: topic.to_string(),
        technique: MnemonicTechnique::Acronym,
        content: letters,
        explanation,
    }
}

/// Built-in example comparison tables, keyed by a short tag.
pub fn example_difference(key: &str) -> Option<DifferenceTable> {
    let row = |aspect: &str, a: &str, b: &str| DifferenceRow {
        aspect: aspect.to_string(),
        concept_a_value: a.to_string(),
        concept_b_value: b.to_string(),
    };

    match key {
        "tcp_vs_udp" => Some(DifferenceTable {
            concept_a: "TCP".into(),
            concept_b: "UDP".into(),
            differences: vec![
                row("Connection", "Connection-oriented", "Connectionless"),
                row("Reliability", "Reliable", "Unreliable"),
                row("Speed", "Slower", "Faster"),
                row("Use Case", "File transfer, Email", "Streaming, Gaming"),
            ],
        }),
        "stack_vs_queue" => Some(DifferenceTable {
            concept_a: "Stack".into(),
            concept_b: "Queue".into(),
            differences: vec![
                row(
                    "Order",
                    "LIFO (Last In First Out)",
                    "FIFO (First In First Out)",
                ),
                row("Operations", "Push, Pop", "Enqueue, Dequeue"),
                row("Use Case", "Function calls, Undo", "Task scheduling, BFS"),
            ],
        }),
        _ => None,
    }
}

pub fn run_mnemonic(topic: &str, key_points: &str) -> anyhow::Result<()> {
    let points: Vec<String> = key_points
        .split(',')
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .collect();
    let mnemonic = acronym_mnemonic(topic, &points);

    println!("Topic: {}", mnemonic.topic);
    println!("Technique: acronym");
    println!("Mnemonic: {}", mnemonic.content);
    println!("Explanation: {}", mnemonic.explanation);
    Ok(())
}

pub fn run_difference(example: &str) -> anyhow::Result<()> {
    let Some(diff) = example_difference(example) else {
        println!("Example '{}' not found.", example);
        println!("Available examples: tcp_vs_udp, stack_vs_queue");
        return Ok(());
    };

    println!("{} vs {}", diff.concept_a, diff.concept_b);
    for row in &diff.differences {
        println!(
            "  {:<12} {:<30} {}",
            row.aspect, row.concept_a_value, row.concept_b_value
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acronym_from_first_letters() {
        let points = vec![
            "Please".to_string(),
            "do".to_string(),
            "not".to_string(),
            "throw".to_string(),
        ];
        let m = acronym_mnemonic("OSI Model", &points);
        assert_eq!(m.content, "PDNT");
        assert_eq!(m.technique, MnemonicTechnique::Acronym);
        assert!(m.explanation.contains("Please, do, not, throw"));
    }

    #[test]
    fn empty_key_points_yield_empty_acronym() {
        let m = acronym_mnemonic("OSI Model", &[]);
        assert_eq!(m.content, "");
        assert_eq!(m.explanation, "No key points provided");
    }

    #[test]
    fn known_examples_exist() {
        assert!(example_difference("tcp_vs_udp").is_some());
        assert!(example_difference("stack_vs_queue").is_some());
        assert!(example_difference("apples_vs_oranges").is_none());
    }
}
