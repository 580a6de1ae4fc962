//! # Study Harness
//!
//! A local-first study companion for exam preparation.
//!
//! Study Harness ingests a raw syllabus into a structured subject
//! hierarchy (subject, modules, topics), persists it as JSON documents
//! on disk, mirrors it into a SQLite knowledge base for querying, and
//! derives markdown notes and mermaid diagrams from the stored
//! structure.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//! │  Syllabus    │──▶│  Hierarchy   │──▶│  JSON store   │
//! │  (raw text)  │   │  (validated) │   │ data/subjects │
//! └──────────────┘   └──────┬───────┘   └──────┬───────┘
//!                           │                  │
//!            ┌──────────────┼──────────────┐   ▼
//!            ▼              ▼              ▼ ┌──────────┐
//!      ┌──────────┐   ┌──────────┐  ┌───────┐│  SQLite   │
//!      │  Notes   │   │ Diagrams │  │ Exams ││  index    │
//!      │ markdown │   │ mermaid  │  │ score │└──────────┘
//!      └──────────┘   └──────────┘  └───────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! stu init                                  # create store + database
//! stu subject create "Computer Networks" --syllabus cn.txt
//! stu topic list                            # query the knowledge base
//! stu notes                                 # project markdown notes
//! stu diagram --kind mindmap                # derive a mermaid mindmap
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types and validation |
//! | [`store`] | Subject store: JSON documents, index, atomic writes |
//! | [`db`] | SQLite connection and schema |
//! | [`kb`] | Knowledge-base index: topic and question queries |
//! | [`notes`] | Markdown note projection |
//! | [`diagram`] | Mermaid graph and mindmap derivation |
//! | [`mnemonics`] | Acronym mnemonics and difference tables |
//! | [`exam`] | Exam patterns and importance scoring |
//! | [`animate`] | Declarative animation scripts |
//! | [`collab`] | Collaborator traits and timeout wrapper |
//! | [`error`] | Error taxonomy |

pub mod animate;
pub mod collab;
pub mod config;
pub mod db;
pub mod diagram;
pub mod error;
pub mod exam;
pub mod kb;
pub mod mnemonics;
pub mod models;
pub mod notes;
pub mod store;
