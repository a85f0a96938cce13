//! Few-Shot Example Selection
//!
//! Optional question/SQL pairs included in the generation prompt to steer the
//! oracle toward the idioms of the schema actually in use.
//!
//! # Selection Policy (`SchemaExamples`)
//! 1. Office-hours queue schema (`student_request`, `ta` and `person` all
//!    present): the fixed two-example domain set.
//! 2. Any other non-empty schema: a `LIMIT 10` listing of the first table and
//!    a count on the second table, or on the first when it is the only one.
//! 3. Empty schema: no examples.
//!
//! Selection is a pure function of the `SchemaDescription`.

use std::fmt::Write;

use crate::schema::SchemaDescription;

/// Tables that identify the office-hours queue schema
pub const QUEUE_FINGERPRINT: [&str; 3] = ["student_request", "ta", "person"];

/// A single illustrative question and its SQL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Example {
    pub question: String,
    pub sql: String,
}

impl Example {
    pub fn new(question: impl Into<String>, sql: impl Into<String>) -> Self {
        Self { question: question.into(), sql: sql.into() }
    }
}

/// Ordered examples, at most two
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExampleSet {
    examples: Vec<Example>,
}

impl ExampleSet {
    #[must_use]
    pub const fn new(examples: Vec<Example>) -> Self {
        Self { examples }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.examples.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.examples.len()
    }

    #[must_use]
    pub fn examples(&self) -> &[Example] {
        &self.examples
    }

    /// Render as a prompt section; empty sets render as nothing
    #[must_use]
    pub fn render(&self) -> String {
        if self.examples.is_empty() {
            return String::new();
        }

        let mut out = String::from("Here are some example questions and their SQL queries:\n\n");
        for example in &self.examples {
            let _ = writeln!(out, "Question: {}", example.question);
            let _ = writeln!(out, "SQL: {}", example.sql);
            out.push('\n');
        }
        out
    }
}

/// Produces the examples for a schema
pub trait ExampleStrategy {
    fn produce(&self, schema: &SchemaDescription) -> ExampleSet;
}

/// Fingerprint-or-generic selection over the structured schema
#[derive(Debug, Clone, Copy, Default)]
pub struct SchemaExamples;

impl ExampleStrategy for SchemaExamples {
    fn produce(&self, schema: &SchemaDescription) -> ExampleSet {
        if matches_queue_fingerprint(schema) {
            return queue_examples();
        }

        let mut names = schema.table_names();
        let Some(first) = names.next() else {
            return ExampleSet::default();
        };

        let listing = Example::new(
            format!("Show me the first 10 rows from {first}"),
            format!("SELECT * FROM {first} LIMIT 10;"),
        );

        let count_target = names.next().unwrap_or(first);
        let count = Example::new(
            format!("How many rows are in {count_target}?"),
            format!("SELECT COUNT(*) FROM {count_target};"),
        );

        ExampleSet::new(vec![listing, count])
    }
}

/// Whether the schema is the office-hours queue
///
/// Each fingerprint identifier must appear within some table name, so
/// `student_requests` or `ta_assignment` still count. Column names are not
/// considered.
#[must_use]
pub fn matches_queue_fingerprint(schema: &SchemaDescription) -> bool {
    QUEUE_FINGERPRINT
        .iter()
        .all(|id| schema.table_names().any(|table| table.contains(id)))
}

/// The fixed office-hours queue examples
#[must_use]
pub fn queue_examples() -> ExampleSet {
    ExampleSet::new(vec![
        Example::new(
            "How many student requests are still waiting?",
            "SELECT COUNT(*) FROM student_request WHERE status = 'waiting';",
        ),
        Example::new(
            "Which TAs have helped the most students?",
            "SELECT p.name, COUNT(sr.id) AS helped FROM ta t \
             JOIN person p ON p.id = t.person_id \
             JOIN student_request sr ON sr.ta_id = t.id \
             GROUP BY p.name ORDER BY helped DESC;",
        ),
    ])
}
