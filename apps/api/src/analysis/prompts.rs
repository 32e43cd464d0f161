//! Prompt construction for the two analysis calls.
//!
//! The prompts are in Russian and instruct the model to stay strictly
//! within the facts present in the résumé. This is a prompt-level
//! constraint only; the service does not verify it mechanically.

use crate::llm::PromptMessage;

const COVER_LETTER_SYSTEM: &str = "Ты карьерный консультант. Составь короткое \
сопроводительное письмо на русском языке, строго на основе текста резюме и \
описания вакансии. Не добавляй ничего, чего нет в резюме.";

/// Builds the cover-letter prompt: consultant persona as the system
/// message, followed by one user message with the interpolated texts.
/// The ~200-word bound is enforced by instruction only.
pub fn cover_letter_messages(resume: &str, vacancy: &str) -> Vec<PromptMessage> {
    let user = format!(
        "Резюме:\n{resume}\n\n\
         Вакансия:\n{vacancy}\n\n\
         Составь сопроводительное письмо (до 200 слов)."
    );

    vec![
        PromptMessage::system(COVER_LETTER_SYSTEM),
        PromptMessage::user(user),
    ]
}

/// Builds the structured-improvement prompt. The model is instructed to
/// emit JSON matching the [`ResumeAnalysis`](crate::analysis::normalize::ResumeAnalysis)
/// schema and not to fabricate facts absent from the résumé.
pub fn improvement_messages(resume: &str, vacancy: &str) -> Vec<PromptMessage> {
    let prompt = format!(
        "Ты карьерный консультант. Проанализируй следующее резюме на соответствие вакансии. \
         Верни результат в формате JSON со следующей структурой:\n\n\
         {{\n\
         \x20 \"missing_skills\": [\"...\"],\n\
         \x20 \"suggested_rewordings\": [\n\
         \x20   {{\"original\": \"...\", \"suggested\": \"...\"}}\n\
         \x20 ],\n\
         \x20 \"block_order_suggestions\": [\n\
         \x20   {{\"block\": \"...\", \"action\": \"move_up|add|remove\"}}\n\
         \x20 ]\n\
         }}\n\n\
         Не добавляй ничего, чего нет в резюме. Не придумывай факты.\n\n\
         Резюме:\n{resume}\n\nВакансия:\n{vacancy}"
    );

    vec![PromptMessage::user(prompt)]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::Role;

    #[test]
    fn test_cover_letter_system_precedes_user() {
        let messages = cover_letter_messages("опыт работы", "требования");
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::System);
        assert_eq!(messages[1].role, Role::User);
        assert!(messages[1].text.contains("опыт работы"));
        assert!(messages[1].text.contains("требования"));
    }

    #[test]
    fn test_improvement_prompt_is_single_user_message() {
        let messages = improvement_messages("резюме", "вакансия");
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].role, Role::User);
        assert!(messages[0].text.contains("missing_skills"));
        assert!(messages[0].text.contains("move_up|add|remove"));
        assert!(messages[0].text.contains("резюме"));
    }
}
