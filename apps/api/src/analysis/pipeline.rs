//! The analysis pipeline shared by the synchronous endpoint and the
//! background scheduler: two sequential completion calls (cover letter,
//! then structured improvement report) plus response normalization.

use serde::Serialize;

use crate::analysis::normalize::{normalize_analysis, AnalysisOutcome};
use crate::analysis::prompts;
use crate::extract::extract_joined_text;
use crate::llm::{CompletionBackend, LlmError, ANALYSIS_TEMPERATURE, COVER_LETTER_TEMPERATURE};

/// The full analysis payload: written into the task record on the async
/// path and returned directly on the sync path. A parse failure of the
/// improvement report is carried inside `resume_improvements`, not raised.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub resume_improvements: AnalysisOutcome,
    pub cover_letter_draft: String,
}

/// Runs the two completion calls against résumé and vacancy text.
pub async fn analyze_texts(
    llm: &dyn CompletionBackend,
    resume: &str,
    vacancy: &str,
) -> Result<AnalysisReport, LlmError> {
    let letter = llm
        .complete(
            &prompts::cover_letter_messages(resume, vacancy),
            COVER_LETTER_TEMPERATURE,
        )
        .await?;

    let raw_analysis = llm
        .complete(
            &prompts::improvement_messages(resume, vacancy),
            ANALYSIS_TEMPERATURE,
        )
        .await?;

    Ok(AnalysisReport {
        resume_improvements: normalize_analysis(&raw_analysis),
        cover_letter_draft: letter,
    })
}

/// Extracts text from both PDF documents and runs the analysis. A failed
/// extraction degrades to empty text for that document; the pipeline
/// continues rather than aborting.
pub async fn analyze_documents(
    llm: &dyn CompletionBackend,
    resume_pdf: &[u8],
    vacancy_pdf: &[u8],
) -> Result<AnalysisReport, LlmError> {
    let resume_text = extract_joined_text(resume_pdf);
    let vacancy_text = extract_joined_text(vacancy_pdf);

    analyze_texts(llm, &resume_text, &vacancy_text).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::normalize::ResumeAnalysis;
    use crate::llm::PromptMessage;
    use async_trait::async_trait;

    /// Stub backend that answers by temperature: the structured-extraction
    /// call gets `analysis`, the cover-letter call gets `letter`.
    struct StubBackend {
        letter: &'static str,
        analysis: &'static str,
    }

    #[async_trait]
    impl CompletionBackend for StubBackend {
        async fn complete(
            &self,
            _messages: &[PromptMessage],
            temperature: f32,
        ) -> Result<String, LlmError> {
            if (temperature - ANALYSIS_TEMPERATURE).abs() < f32::EPSILON {
                Ok(self.analysis.to_string())
            } else {
                Ok(self.letter.to_string())
            }
        }
    }

    #[tokio::test]
    async fn test_analyze_texts_parses_fenced_analysis() {
        let stub = StubBackend {
            letter: "Уважаемая команда, ...",
            analysis: "```json\n{\"missing_skills\": [\"sql\"]}\n```",
        };

        let report = analyze_texts(&stub, "резюме", "вакансия").await.unwrap();

        assert_eq!(report.cover_letter_draft, "Уважаемая команда, ...");
        assert_eq!(
            report.resume_improvements,
            AnalysisOutcome::Parsed(ResumeAnalysis {
                missing_skills: vec!["sql".to_string()],
                ..Default::default()
            })
        );
    }

    #[tokio::test]
    async fn test_analyze_texts_surfaces_parse_failure_as_value() {
        let stub = StubBackend {
            letter: "letter",
            analysis: "the model rambled instead of answering",
        };

        let report = analyze_texts(&stub, "r", "v").await.unwrap();

        assert_eq!(
            report.resume_improvements,
            AnalysisOutcome::Unparsed {
                error: "Failed to parse JSON".to_string(),
                raw: "the model rambled instead of answering".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_analyze_documents_degrades_on_corrupt_pdfs() {
        let stub = StubBackend {
            letter: "letter from empty input",
            analysis: "{}",
        };

        // Neither blob is a valid PDF; extraction degrades to empty text
        // and the completion calls still run.
        let report = analyze_documents(&stub, b"garbage", &[]).await.unwrap();

        assert_eq!(report.cover_letter_draft, "letter from empty input");
        assert_eq!(
            report.resume_improvements,
            AnalysisOutcome::Parsed(ResumeAnalysis::default())
        );
    }
}
