//! Prompt construction for the three suggestion kinds.

use curriculum::aggregate::EvaluationRecord;
use curriculum::BloomLevel;

use crate::backend::CompletionRequest;
use crate::config::AssistConfig;

/// Characters of a CLO description quoted per summary line.
pub const SUMMARY_DESCRIPTION_CHARS: usize = 40;

/// Builds completion requests with the temperatures from [`AssistConfig`].
#[derive(Debug, Clone)]
pub struct PromptBuilder<'a> {
    config: &'a AssistConfig,
}

impl<'a> PromptBuilder<'a> {
    pub fn new(config: &'a AssistConfig) -> Self {
        Self { config }
    }

    /// Ask for a one-sentence CLO description at `level`.
    pub fn description(
        &self,
        level: BloomLevel,
        course_name: &str,
        course_description: &str,
    ) -> CompletionRequest {
        let prompt = format!(
            "Write one Course Learning Outcome (CLO) description for a university course.\n\
             \n\
             Course name: {course_name}\n\
             Course description: {course_description}\n\
             Bloom's taxonomy level: {level}\n\
             \n\
             Begin with an action verb that fits the {level} level, keep it to a single \
             measurable sentence and return only the sentence with no label."
        );

        CompletionRequest::user(prompt)
            .with_system("You design university curricula.")
            .with_temperature(self.config.description_temperature)
            .with_max_tokens(self.config.max_tokens)
    }

    /// Ask which Bloom level `description` belongs to.
    pub fn bloom_level(&self, description: &str) -> CompletionRequest {
        let levels: Vec<&str> = BloomLevel::ALL.iter().map(BloomLevel::as_str).collect();
        let prompt = format!(
            "Classify this Course Learning Outcome by Bloom's taxonomy level.\n\
             Levels: {}.\n\
             \n\
             CLO description: \"{}\"\n\
             \n\
             Answer with the level name only, for example: Applying",
            levels.join(", "),
            description
        );

        CompletionRequest::user(prompt)
            .with_temperature(self.config.bloom_temperature)
            .with_max_tokens(self.config.max_tokens)
    }

    /// Ask for a short review summary of evaluation results.
    pub fn summary(&self, records: &[EvaluationRecord]) -> CompletionRequest {
        let data = records
            .iter()
            .map(summary_line)
            .collect::<Vec<_>>()
            .join("\n");
        let prompt = format!(
            "Summarize these Course Learning Outcome achievement results for an academic \
             review report in 2-3 sentences. Name the strongest outcomes and the ones that \
             need improvement, and keep the tone constructive.\n\
             \n\
             Data:\n{}",
            data
        );

        CompletionRequest::user(prompt)
            .with_system("You advise faculty on course performance.")
            .with_temperature(self.config.summary_temperature)
            .with_max_tokens(self.config.max_tokens)
    }
}

/// `CLO1 (first 40 chars...): 95% achieved`
pub fn summary_line(record: &EvaluationRecord) -> String {
    let excerpt: String = record
        .description
        .chars()
        .take(SUMMARY_DESCRIPTION_CHARS)
        .collect();
    format!("{} ({}...): {} achieved", record.clo_id, excerpt, record.achievement)
}

#[cfg(test)]
mod tests {
    use super::*;
    use curriculum::{Achievement, CloId};

    fn record(id: &str, description: &str, achievement: i64) -> EvaluationRecord {
        EvaluationRecord {
            clo_id: CloId::from(id),
            description: description.to_string(),
            achievement: Achievement::clamped(achievement),
        }
    }

    #[test]
    fn test_summary_line_truncates_on_chars() {
        let long = "Phân tích và thiết kế hệ thống phần mềm theo hướng đối tượng";
        let line = summary_line(&record("CLO2", long, 88));
        let excerpt: String = long.chars().take(40).collect();
        assert_eq!(line, format!("CLO2 ({}...): 88% achieved", excerpt));

        let short = summary_line(&record("CLO1", "Explain X", 95));
        assert_eq!(short, "CLO1 (Explain X...): 95% achieved");
    }

    #[test]
    fn test_temperatures() {
        let config = AssistConfig::default();
        let builder = PromptBuilder::new(&config);

        let description = builder.description(BloomLevel::Analyzing, "Databases", "Relational design");
        assert_eq!(description.temperature, Some(0.7));
        let text = description.last_user_message().unwrap();
        assert!(text.contains("Course name: Databases"));
        assert!(text.contains("Bloom's taxonomy level: Analyzing"));

        let bloom = builder.bloom_level("Design a schema");
        assert_eq!(bloom.temperature, Some(0.2));
        assert!(bloom
            .last_user_message()
            .unwrap()
            .contains("Remembering, Understanding, Applying, Analyzing, Evaluating, Creating"));

        let summary = builder.summary(&[record("CLO1", "Explain X", 95), record("CLO2", "Build Y", 60)]);
        assert_eq!(summary.temperature, Some(0.6));
        assert!(summary
            .last_user_message()
            .unwrap()
            .ends_with("CLO1 (Explain X...): 95% achieved\nCLO2 (Build Y...): 60% achieved"));
    }
}
