//! # Study Harness CLI (`stu`)
//!
//! The `stu` binary is the primary interface for Study Harness. It
//! provides commands for store initialization, syllabus ingestion,
//! knowledge-base queries, note projection, diagram derivation, and
//! exam-driven importance scoring.
//!
//! ## Usage
//!
//! ```bash
//! stu --config ./config/stu.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `stu init` | Create the subject store and SQLite knowledge base |
//! | `stu subject create <name>` | Ingest a syllabus file into a new subject |
//! | `stu subject list` | List stored subjects |
//! | `stu subject select <name>` | Make a subject the current one |
//! | `stu subject delete <name>` | Remove a subject and its index rows |
//! | `stu topic add` | Add a topic to a module of the current subject |
//! | `stu topic list` | Query indexed topics |
//! | `stu question add` | Store a practice question |
//! | `stu question import` | Import a question-bank JSON file |
//! | `stu question list` | Query stored questions |
//! | `stu notes` | Project the hierarchy to markdown notes |
//! | `stu diagram` | Derive a mermaid graph or mindmap |
//! | `stu mnemonic` | Build an acronym mnemonic from key points |
//! | `stu diff <example>` | Print a built-in difference table |
//! | `stu exam configure` | Register an exam pattern |
//! | `stu exam apply` | Score topics from analyzed past-paper questions |
//! | `stu animation <kind>` | Emit a built-in animation script |
//!
//! ## Examples
//!
//! ```bash
//! # Initialize the store
//! stu init
//!
//! # Ingest a syllabus
//! stu subject create "Computer Networks" --syllabus cn_syllabus.txt
//!
//! # Query topics mentioning TCP
//! stu topic list --text TCP
//!
//! # Rebuild the notes tree from scratch
//! stu notes --clean
//!
//! # Derive the relationship graph
//! stu diagram --kind graph
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use study_harness::{animate, config, db, diagram, exam, kb, mnemonics, notes, store};

/// Study Harness CLI for local-first exam preparation: syllabus
/// ingestion, a queryable knowledge base, notes, and diagrams.
///
/// All commands accept a `--config` flag pointing to a TOML
/// configuration file. When the file is missing, built-in defaults are
/// used (store under `./data`).
#[derive(Parser)]
#[command(
    name = "stu",
    about = "Study Harness — a local-first study companion for exam preparation",
    version,
    long_about = "Study Harness ingests a raw syllabus into a structured subject hierarchy, \
    persists it as JSON documents mirrored into a SQLite knowledge base, and derives markdown \
    notes, mermaid diagrams, mnemonics, and exam-driven importance scores from the stored \
    structure."
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/stu.toml`. Store, database, notes, and
    /// collaborator settings are read from this file.
    #[arg(long, global = true, default_value = "./config/stu.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Initialize the subject store and knowledge base.
    ///
    /// Creates the data directory, the subjects folder, the SQLite
    /// database file, and all required tables. Idempotent.
    Init,

    /// Manage subjects (create, list, select, delete).
    Subject {
        #[command(subcommand)]
        action: SubjectAction,
    },

    /// Manage topics of the current subject.
    Topic {
        #[command(subcommand)]
        action: TopicAction,
    },

    /// Manage practice questions in the knowledge base.
    Question {
        #[command(subcommand)]
        action: QuestionAction,
    },

    /// Project the current subject to a markdown notes tree.
    ///
    /// Writes one folder per module and one document per topic, in
    /// syllabus order, plus index documents. Re-running replaces the
    /// projected documents in place; a completion marker is written
    /// last so interrupted runs are detectable.
    Notes {
        /// Subject name (defaults to the current subject).
        #[arg(long)]
        subject: Option<String>,

        /// Delete the notes tree before projecting, removing documents
        /// for topics that no longer exist.
        #[arg(long)]
        clean: bool,
    },

    /// Derive a mermaid diagram from the current subject.
    Diagram {
        /// Subject name (defaults to the current subject).
        #[arg(long)]
        subject: Option<String>,

        /// Diagram kind: `graph` (relationship graph) or `mindmap`.
        #[arg(long, default_value = "graph")]
        kind: String,
    },

    /// Build an acronym mnemonic from a list of key points.
    Mnemonic {
        /// Topic the mnemonic is for.
        topic: String,

        /// Comma-separated key points.
        #[arg(long)]
        key_points: String,
    },

    /// Print a built-in difference table.
    ///
    /// Available examples: `tcp_vs_udp`, `stack_vs_queue`.
    Diff {
        /// Example key.
        example: String,
    },

    /// Manage exam patterns and apply them to a subject.
    Exam {
        #[command(subcommand)]
        action: ExamAction,
    },

    /// Emit a built-in animation script for the current subject.
    ///
    /// The script is written as declarative frame data under the
    /// subject's animations folder; rendering to media is left to an
    /// external renderer.
    Animation {
        /// Animation kind: `tcp_handshake` or `stack_operations`.
        kind: String,

        /// Subject name (defaults to the current subject).
        #[arg(long)]
        subject: Option<String>,
    },
}

/// Subject management subcommands.
#[derive(Subcommand)]
enum SubjectAction {
    /// Create a subject from a syllabus file.
    ///
    /// Parses the syllabus outline into modules and topics, validates
    /// the result, writes the subject's document tree, and indexes
    /// every topic in the knowledge base. The new subject becomes the
    /// current one.
    Create {
        /// Subject name (also the display title of the hierarchy).
        name: String,

        /// Path to the raw syllabus text file.
        #[arg(long)]
        syllabus: PathBuf,

        /// Optional description; defaults to the first prose line of
        /// the syllabus.
        #[arg(long)]
        description: Option<String>,
    },

    /// List stored subjects.
    List,

    /// Make a subject the current one.
    Select {
        /// Subject name.
        name: String,
    },

    /// Delete a subject: its document tree, index entry, and
    /// knowledge-base rows. Deleting a missing subject is a no-op.
    Delete {
        /// Subject name.
        name: String,
    },
}

/// Topic management subcommands.
#[derive(Subcommand)]
enum TopicAction {
    /// Add a topic to a module of a subject.
    Add {
        /// Topic name.
        name: String,

        /// Module name (matched case-insensitively).
        #[arg(long)]
        module: String,

        /// One-line summary.
        #[arg(long, default_value = "")]
        summary: String,

        /// Comma-separated key points.
        #[arg(long)]
        key_points: Option<String>,

        /// Subject name (defaults to the current subject).
        #[arg(long)]
        subject: Option<String>,
    },

    /// Query indexed topics, in syllabus order.
    List {
        /// Filter by subject name.
        #[arg(long)]
        subject: Option<String>,

        /// Filter by module name (exact match).
        #[arg(long)]
        module: Option<String>,

        /// Substring match against topic name or summary.
        #[arg(long)]
        text: Option<String>,
    },
}

/// Question management subcommands.
#[derive(Subcommand)]
enum QuestionAction {
    /// Store a practice question.
    Add {
        /// Question text.
        question: String,

        /// Topic the question belongs to.
        #[arg(long)]
        topic: String,

        /// Model answer.
        #[arg(long, default_value = "")]
        answer: String,

        /// Difficulty: `easy`, `medium`, or `hard`.
        #[arg(long, default_value = "medium")]
        difficulty: String,

        /// Question type: `multiple_choice` or `open_ended`.
        #[arg(long = "type", default_value = "open_ended")]
        qtype: String,

        /// Answer options (repeatable; required for multiple choice).
        #[arg(long = "option")]
        options: Vec<String>,

        /// Subject name (defaults to the current subject).
        #[arg(long)]
        subject: Option<String>,
    },

    /// Import a question bank from a JSON file.
    ///
    /// Attaches the bank to the subject's document tree, flips its
    /// question-bank flag, and indexes every question.
    Import {
        /// Path to a JSON array of questions.
        file: PathBuf,

        /// Subject name (defaults to the current subject).
        #[arg(long)]
        subject: Option<String>,
    },

    /// Query stored questions.
    List {
        /// Filter by subject name.
        #[arg(long)]
        subject: Option<String>,

        /// Filter by topic name.
        #[arg(long)]
        topic: Option<String>,

        /// Filter by difficulty: `easy`, `medium`, or `hard`.
        #[arg(long)]
        difficulty: Option<String>,

        /// Filter by type: `multiple_choice` or `open_ended`.
        #[arg(long = "type")]
        qtype: Option<String>,
    },
}

/// Exam pattern subcommands.
#[derive(Subcommand)]
enum ExamAction {
    /// Register an exam pattern from a JSON file.
    ///
    /// The pattern describes the paper's sections (question ranges,
    /// marks) and a module mapping. Overlapping section ranges are
    /// rejected.
    Configure {
        /// Path to the pattern JSON file.
        file: PathBuf,
    },

    /// Apply analyzed past-paper questions to a subject.
    ///
    /// Rescores topic importance from per-module question frequency and
    /// stores the questions in the knowledge base with provenance.
    Apply {
        /// Name of a registered exam pattern.
        pattern: String,

        /// Path to a JSON file with analyzed questions.
        #[arg(long)]
        questions: PathBuf,

        /// Paper label recorded as provenance (e.g. `CN May 2023`).
        #[arg(long)]
        paper: String,

        /// Subject name (defaults to the current subject).
        #[arg(long)]
        subject: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    // Commands that work without a store.
    match &cli.command {
        Commands::Mnemonic { topic, key_points } => {
            return mnemonics::run_mnemonic(topic, key_points);
        }
        Commands::Diff { example } => {
            return mnemonics::run_difference(example);
        }
        _ => {}
    }

    // A missing config file falls back to defaults so `stu init` works
    // in a fresh directory. A present-but-invalid file is still an error.
    let cfg = if cli.config.exists() {
        config::load_config(&cli.config)?
    } else {
        config::Config::minimal()
    };

    match cli.command {
        Commands::Init => {
            db::run_init(&cfg).await?;
        }
        Commands::Subject { action } => match action {
            SubjectAction::Create {
                name,
                syllabus,
                description,
            } => {
                store::run_create(&cfg, &name, &syllabus, description).await?;
            }
            SubjectAction::List => {
                store::run_list(&cfg)?;
            }
            SubjectAction::Select { name } => {
                store::run_select(&cfg, &name)?;
            }
            SubjectAction::Delete { name } => {
                store::run_delete(&cfg, &name).await?;
            }
        },
        Commands::Topic { action } => match action {
            TopicAction::Add {
                name,
                module,
                summary,
                key_points,
                subject,
            } => {
                store::run_add_topic(
                    &cfg,
                    subject.as_deref(),
                    &module,
                    &name,
                    &summary,
                    key_points.as_deref(),
                )
                .await?;
            }
            TopicAction::List {
                subject,
                module,
                text,
            } => {
                kb::run_list_topics(&cfg, subject, module, text).await?;
            }
        },
        Commands::Question { action } => match action {
            QuestionAction::Add {
                question,
                topic,
                answer,
                difficulty,
                qtype,
                options,
                subject,
            } => {
                kb::run_add_question(
                    &cfg,
                    subject.as_deref(),
                    &topic,
                    &question,
                    &answer,
                    &difficulty,
                    &qtype,
                    options,
                )
                .await?;
            }
            QuestionAction::Import { file, subject } => {
                store::run_import_bank(&cfg, subject.as_deref(), &file).await?;
            }
            QuestionAction::List {
                subject,
                topic,
                difficulty,
                qtype,
            } => {
                kb::run_list_questions(&cfg, subject, topic, difficulty, qtype).await?;
            }
        },
        Commands::Notes { subject, clean } => {
            notes::run_notes(&cfg, subject.as_deref(), clean).await?;
        }
        Commands::Diagram { subject, kind } => {
            let kind = diagram::DiagramKind::parse(&kind)?;
            diagram::run_diagram(&cfg, subject.as_deref(), kind)?;
        }
        Commands::Exam { action } => match action {
            ExamAction::Configure { file } => {
                exam::run_exam_configure(&cfg, &file)?;
            }
            ExamAction::Apply {
                pattern,
                questions,
                paper,
                subject,
            } => {
                exam::run_exam_apply(&cfg, &pattern, &questions, &paper, subject.as_deref())
                    .await?;
            }
        },
        Commands::Animation { kind, subject } => {
            let kind = animate::AnimationKind::parse(&kind)?;
            animate::run_animation(&cfg, subject.as_deref(), kind)?;
        }
        Commands::Mnemonic { .. } | Commands::Diff { .. } => unreachable!(),
    }

    Ok(())
}
