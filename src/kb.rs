//! Knowledge base: a query-optimized SQLite mirror of topics and
//! questions across all subjects.
//!
//! The index is a pure derived cache. `upsert_topics` does a full
//! replace per subject inside one transaction, so topics removed from
//! the hierarchy disappear from the index in the same save. Index rows
//! are never used to resurrect a subject: a row that fails to decode is
//! dropped with a warning, not repaired.

use anyhow::Result;
use chrono::Utc;
use sqlx::{Row, SqlitePool};
use tracing::warn;

use crate::config::Config;
use crate::db;
use crate::models::{Difficulty, Hierarchy, Question, QuestionType, Topic};

/// Filters for [`query_topics`]. All fields are optional and combine
/// with AND; `text` is a substring match on topic name and summary.
#[derive(Debug, Default, Clone)]
pub struct TopicFilter {
    pub subject: Option<String>,
    pub module: Option<String>,
    pub text: Option<String>,
}

/// Filters for [`query_questions`].
#[derive(Debug, Default, Clone)]
pub struct QuestionFilter {
    pub subject: Option<String>,
    pub topic: Option<String>,
    pub difficulty: Option<Difficulty>,
    pub qtype: Option<QuestionType>,
}

/// One topic as returned by the index, with its position in the
/// hierarchy it came from.
#[derive(Debug, Clone)]
pub struct TopicHit {
    pub subject: String,
    pub module_name: String,
    pub module_order: i64,
    pub topic_order: i64,
    pub topic: Topic,
}

/// Replace all index rows for one subject's topics with the current
/// hierarchy. Full replace, not merge: rows for deleted topics vanish.
pub async fn upsert_topics(
    pool: &SqlitePool,
    subject: &str,
    hierarchy: &Hierarchy,
) -> sqlx::Result<()> {
    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM topics WHERE subject = ?")
        .bind(subject)
        .execute(&mut *tx)
        .await?;

    for module in hierarchy.modules_in_order() {
        for (topic_order, topic) in module.topics.iter().enumerate() {
            let data = serde_json::to_string(topic)
                .map_err(|e| sqlx::Error::Encode(Box::new(e)))?;
            sqlx::query(
                r#"
                INSERT INTO topics
                    (subject, id, module_id, module_name, module_order, topic_order, name, summary, data)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(subject)
            .bind(&topic.id)
            .bind(&module.id)
            .bind(&module.name)
            .bind(module.order)
            .bind(topic_order as i64)
            .bind(&topic.name)
            .bind(&topic.summary)
            .bind(&data)
            .execute(&mut *tx)
            .await?;
        }
    }

    tx.commit().await?;
    Ok(())
}

/// Drop all index rows for a subject (topics and questions). Used on
/// subject deletion and whenever the index diverges from the store.
pub async fn prune_subject(pool: &SqlitePool, subject: &str) -> sqlx::Result<()> {
    sqlx::query("DELETE FROM topics WHERE subject = ?")
        .bind(subject)
        .execute(pool)
        .await?;
    sqlx::query("DELETE FROM questions WHERE subject = ?")
        .bind(subject)
        .execute(pool)
        .await?;
    Ok(())
}

/// Query topics ordered by module order, then topic insertion order:
/// the source hierarchy's pedagogical sequence, never alphabetical.
pub async fn query_topics(pool: &SqlitePool, filter: &TopicFilter) -> Result<Vec<TopicHit>> {
    let rows = sqlx::query(
        r#"
        SELECT subject, module_name, module_order, topic_order, data
        FROM topics
        WHERE (?1 IS NULL OR subject = ?1)
          AND (?2 IS NULL OR module_name = ?2)
          AND (?3 IS NULL OR name LIKE '%' || ?3 || '%' OR summary LIKE '%' || ?3 || '%')
        ORDER BY subject, module_order, topic_order
        "#,
    )
    .bind(&filter.subject)
    .bind(&filter.module)
    .bind(&filter.text)
    .fetch_all(pool)
    .await?;

    let mut hits = Vec::with_capacity(rows.len());
    for row in rows {
        let data: String = row.get("data");
        match serde_json::from_str::<Topic>(&data) {
            Ok(topic) => hits.push(TopicHit {
                subject: row.get("subject"),
                module_name: row.get("module_name"),
                module_order: row.get("module_order"),
                topic_order: row.get("topic_order"),
                topic,
            }),
            Err(e) => {
                // Divergent cache row: drop it from the result, never
                // reconstruct a topic from a bad index entry.
                warn!(error = %e, "skipping undecodable topic index row");
            }
        }
    }
    Ok(hits)
}

/// Store a question in the index. Questions are independent records,
/// not hierarchy children; `topic` is a soft link by name or source tag.
pub async fn add_question(pool: &SqlitePool, subject: &str, question: &Question) -> Result<()> {
    question.validate()?;
    let data = serde_json::to_string(question)?;
    sqlx::query(
        r#"
        INSERT OR REPLACE INTO questions (id, subject, topic, difficulty, qtype, data, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&question.id)
    .bind(subject)
    .bind(&question.topic)
    .bind(question.difficulty.as_str())
    .bind(question.qtype.as_str())
    .bind(&data)
    .bind(Utc::now().timestamp())
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn query_questions(
    pool: &SqlitePool,
    filter: &QuestionFilter,
) -> Result<Vec<Question>> {
    let rows = sqlx::query(
        r#"
        SELECT data
        FROM questions
        WHERE (?1 IS NULL OR subject = ?1)
          AND (?2 IS NULL OR topic = ?2)
          AND (?3 IS NULL OR difficulty = ?3)
          AND (?4 IS NULL OR qtype = ?4)
        ORDER BY created_at, id
        "#,
    )
    .bind(&filter.subject)
    .bind(&filter.topic)
    .bind(filter.difficulty.map(|d| d.as_str()))
    .bind(filter.qtype.map(|t| t.as_str()))
    .fetch_all(pool)
    .await?;

    let mut questions = Vec::with_capacity(rows.len());
    for row in rows {
        let data: String = row.get("data");
        match serde_json::from_str::<Question>(&data) {
            Ok(q) => questions.push(q),
            Err(e) => warn!(error = %e, "skipping undecodable question index row"),
        }
    }
    Ok(questions)
}

pub async fn run_list_topics(
    config: &Config,
    subject: Option<String>,
    module: Option<String>,
    text: Option<String>,
) -> Result<()> {
    let pool = db::connect(config).await?;
    db::run_migrations(&pool).await?;
    let filter = TopicFilter {
        subject,
        module,
        text,
    };
    let hits = query_topics(&pool, &filter).await?;
    pool.close().await;

    if hits.is_empty() {
        println!("No topics found.");
        return Ok(());
    }

    println!("{:<30} {:<30} {:<40} {}", "SUBJECT", "MODULE", "TOPIC", "IMPORTANCE");
    for hit in &hits {
        println!(
            "{:<30} {:<30} {:<40} {:.2}",
            hit.subject, hit.module_name, hit.topic.name, hit.topic.importance_score
        );
    }
    println!("{} topics", hits.len());
    Ok(())
}

#[allow(clippy::too_many_arguments)]
pub async fn run_add_question(
    config: &Config,
    subject: Option<&str>,
    topic: &str,
    question: &str,
    answer: &str,
    difficulty: &str,
    qtype: &str,
    options: Vec<String>,
) -> Result<()> {
    let store = crate::store::SubjectStore::from_config(config);
    let subject_name = store.resolve(subject)?;

    let difficulty = Difficulty::parse(difficulty)?;
    let qtype = QuestionType::parse(qtype)?;
    let mut q = Question::new(topic, question, answer, qtype, difficulty);
    q.options = options;

    let pool = db::connect(config).await?;
    db::run_migrations(&pool).await?;
    add_question(&pool, &subject_name, &q).await?;
    pool.close().await;

    println!("Question added for topic '{}' in subject '{}'.", topic, subject_name);
    Ok(())
}

pub async fn run_list_questions(
    config: &Config,
    subject: Option<String>,
    topic: Option<String>,
    difficulty: Option<String>,
    qtype: Option<String>,
) -> Result<()> {
    let filter = QuestionFilter {
        subject,
        topic,
        difficulty: difficulty.as_deref().map(Difficulty::parse).transpose()?,
        qtype: qtype.as_deref().map(QuestionType::parse).transpose()?,
    };

    let pool = db::connect(config).await?;
    db::run_migrations(&pool).await?;
    let questions = query_questions(&pool, &filter).await?;
    pool.close().await;

    if questions.is_empty() {
        println!("No questions found.");
        return Ok(());
    }

    for q in &questions {
        println!("[{}|{}] {}: {}", q.difficulty.as_str(), q.qtype.as_str(), q.topic, q.question);
        for opt in &q.options {
            println!("    - {}", opt);
        }
        println!("    answer: {}", q.answer);
    }
    println!("{} questions", questions.len());
    Ok(())
}
