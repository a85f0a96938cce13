//! Prompt Construction
//!
//! Builds the two prompts of a question cycle: SQL generation and answer
//! generation. Output is a pure function of the inputs.
//!
//! SQL prompt layout, in order:
//! 1. Instruction line
//! 2. Rendered schema
//! 3. Rendered examples (only when present and non-empty)
//! 4. Safety rules
//! 5. The question and the `SQL Query:` cue

use crate::fewshot::ExampleSet;
use crate::schema::SchemaDescription;

/// Rules appended to every SQL generation prompt
pub const SAFETY_RULES: &str = "IMPORTANT SECURITY RULES:
- ONLY generate SELECT queries
- NEVER generate INSERT, UPDATE, DELETE, DROP, ALTER, or any data-modifying statements
- Return ONLY the SQL query, with no additional text or markdown formatting.";

/// Everything needed for one SQL generation prompt
///
/// Built fresh per question and consumed by `into_prompt`.
#[derive(Debug)]
pub struct PromptContext<'a> {
    schema: &'a SchemaDescription,
    examples: Option<ExampleSet>,
    question: &'a str,
    dialect: &'a str,
}

impl<'a> PromptContext<'a> {
    pub fn new(
        question: &'a str,
        schema: &'a SchemaDescription,
        examples: Option<ExampleSet>,
        dialect: &'a str,
    ) -> Self {
        Self { schema, examples, question, dialect }
    }

    /// Render the SQL generation prompt
    #[must_use]
    pub fn into_prompt(self) -> String {
        let mut prompt = format!(
            "Given the following database schema, generate a {} SQL query to answer the user's question.\n\n",
            self.dialect
        );

        prompt.push_str(&self.schema.render());

        if let Some(examples) = self.examples.filter(|e| !e.is_empty()) {
            prompt.push('\n');
            prompt.push_str(&examples.render());
        }

        prompt.push('\n');
        prompt.push_str(SAFETY_RULES);
        prompt.push_str("\n\nUser's Question: ");
        prompt.push_str(self.question);
        prompt.push_str("\n\nSQL Query:");
        prompt
    }
}

/// Render the answer generation prompt from formatted results
#[must_use]
pub fn answer_prompt(question: &str, results: &str) -> String {
    format!(
        "Based on the following database query results, provide a clear and concise natural \
         language answer to the user's question.\n\n\
         User's Question: {question}\n\n\
         Database Results:\n{results}\n\n\
         Answer:"
    )
}
