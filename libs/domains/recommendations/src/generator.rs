//! Recommendation message generation.
//!
//! Uses the configured language model when available; otherwise, or on any
//! client error, synthesizes a deterministic templated message. The fallback
//! path is total: it never fails, for any well-formed input.

use domain_enrollments::Course;
use std::sync::Arc;
use tracing::warn;

use crate::llm::ChatCompletionClient;

const DESCRIPTION_PREVIEW_CHARS: usize = 100;

/// Inputs for one recommendation message.
#[derive(Debug, Clone)]
pub struct GenerationContext {
    pub student_name: String,
    pub completed_course_name: String,
    pub grade: f64,
    /// Names of the student's most recent approved completions.
    pub recent_completions: Vec<String>,
    /// Catalog courses the student has not touched, in catalog order.
    pub candidates: Vec<Course>,
}

#[derive(Clone, Default)]
pub struct RecommendationGenerator {
    client: Option<Arc<dyn ChatCompletionClient>>,
}

impl RecommendationGenerator {
    /// Generator without a language model; always uses the fallback.
    pub fn without_client() -> Self {
        Self { client: None }
    }

    pub fn with_client(client: Arc<dyn ChatCompletionClient>) -> Self {
        Self {
            client: Some(client),
        }
    }

    /// Produce the recommendation message.
    ///
    /// Client output is returned verbatim; absence or failure of the client
    /// falls back to the deterministic template.
    pub async fn generate(&self, ctx: &GenerationContext) -> String {
        if let Some(client) = &self.client {
            let prompt = Self::build_prompt(ctx);
            match client.complete(&prompt).await {
                Ok(text) => return text,
                Err(e) => {
                    warn!(error = %e, "Language model failed, using fallback message");
                }
            }
        }

        Self::fallback(ctx)
    }

    fn build_prompt(ctx: &GenerationContext) -> String {
        let recent = if ctx.recent_completions.is_empty() {
            "none".to_string()
        } else {
            ctx.recent_completions.join(", ")
        };

        let candidates = if ctx.candidates.is_empty() {
            "none, the catalog is exhausted".to_string()
        } else {
            ctx.candidates
                .iter()
                .map(|c| format!("- {} ({}): {}", c.name, c.code, c.description))
                .collect::<Vec<_>>()
                .join("\n")
        };

        format!(
            "You are an academic advisor. A student just completed a course.\n\
             \n\
             Student: {student}\n\
             Completed course: {course}\n\
             Final grade: {grade:.1} out of 10\n\
             Recently completed courses: {recent}\n\
             \n\
             Available courses:\n{candidates}\n\
             \n\
             Write a short, friendly email body that congratulates the student \
             in a tone matching their grade and recommends one of the available \
             courses to take next. Do not invent courses.",
            student = ctx.student_name,
            course = ctx.completed_course_name,
            grade = ctx.grade,
        )
    }

    /// Deterministic fallback template. Total by construction.
    fn fallback(ctx: &GenerationContext) -> String {
        let greeting = if ctx.grade >= 9.0 {
            format!(
                "Congratulations {name}! Your grade of {grade:.1} in {course} was exceptional!",
                name = ctx.student_name,
                grade = ctx.grade,
                course = ctx.completed_course_name,
            )
        } else if ctx.grade >= 7.0 {
            format!(
                "Congratulations {name}! Great job completing {course} with a grade of {grade:.1}.",
                name = ctx.student_name,
                grade = ctx.grade,
                course = ctx.completed_course_name,
            )
        } else {
            format!(
                "Hi {name}, you finished {course} with a grade of {grade:.1}. \
                 Keep working at it, the next one will go better!",
                name = ctx.student_name,
                grade = ctx.grade,
                course = ctx.completed_course_name,
            )
        };

        let recommendation = match ctx.candidates.first() {
            Some(course) => format!(
                "We think \"{}\" would be a great next step: {}",
                course.name,
                truncate_description(&course.description),
            ),
            None => {
                "You have completed every course in our catalog. Congratulations on going all the way!"
                    .to_string()
            }
        };

        format!("{greeting}\n\n{recommendation}")
    }
}

fn truncate_description(description: &str) -> String {
    if description.chars().count() <= DESCRIPTION_PREVIEW_CHARS {
        return description.to_string();
    }
    let preview: String = description.chars().take(DESCRIPTION_PREVIEW_CHARS).collect();
    format!("{preview}...")
}
