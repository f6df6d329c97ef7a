use std::env;

use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::ContentGenError;

#[derive(Clone, Debug)]
pub struct ContentGenConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
}

impl ContentGenConfig {
    #[must_use]
    pub fn from_env() -> Option<Self> {
        let api_key = env::var("STUDY_AI_API_KEY").ok()?;
        if api_key.trim().is_empty() {
            return None;
        }
        let base_url =
            env::var("STUDY_AI_BASE_URL").unwrap_or_else(|_| "https://api.openai.com/v1".into());
        let model = env::var("STUDY_AI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".into());
        Some(Self {
            base_url,
            api_key,
            model,
        })
    }
}

/// A lesson plus quiz questions produced by the generation provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedTopicContent {
    pub lesson_body: String,
    pub questions: Vec<GeneratedQuestion>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedQuestion {
    pub prompt: String,
    pub answer: String,
    pub explanation: String,
}

/// Drafts seed content for a topic via an OpenAI-compatible endpoint.
/// Unconfigured deployments keep the service disabled; nothing in the
/// study flows depends on it.
#[derive(Clone)]
pub struct ContentGenService {
    client: Client,
    config: Option<ContentGenConfig>,
}

impl ContentGenService {
    #[must_use]
    pub fn from_env() -> Self {
        Self::new(ContentGenConfig::from_env())
    }

    #[must_use]
    pub fn new(config: Option<ContentGenConfig>) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    #[must_use]
    pub fn enabled(&self) -> bool {
        self.config.is_some()
    }

    /// Generate a lesson body and quiz questions for one topic.
    ///
    /// # Errors
    ///
    /// Returns `ContentGenError` when the service is disabled, the request
    /// fails, or the response contains nothing usable.
    pub async fn generate_topic(
        &self,
        grade: u8,
        subject: &str,
        topic: &str,
    ) -> Result<GeneratedTopicContent, ContentGenError> {
        let config = self.config.as_ref().ok_or(ContentGenError::Disabled)?;

        let url = format!("{}/chat/completions", config.base_url.trim_end_matches('/'));
        let prompt = format!(
            "Write study material for grade {grade} {subject}, topic \"{topic}\".\n\
             Reply in exactly this plain-text layout with no markdown:\n\
             LESSON:\n\
             <three short paragraphs a learner can read in two minutes>\n\
             then five blocks, one per quiz question:\n\
             QUESTION: <a question answerable in one short phrase>\n\
             ANSWER: <the shortest correct answer, without the '|' character>\n\
             EXPLAIN: <one sentence shown after a wrong answer>"
        );
        let payload = GenerationRequest {
            model: config.model.clone(),
            messages: vec![PromptMessage {
                role: "user",
                content: prompt,
            }],
            temperature: 0.2,
        };

        let response = self
            .client
            .post(url)
            .bearer_auth(&config.api_key)
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ContentGenError::HttpStatus(response.status()));
        }

        let body: GenerationResponse = response.json().await?;
        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or(ContentGenError::EmptyResponse)?;

        let parsed = parse_generated(&content);
        if parsed.lesson_body.is_empty() && parsed.questions.is_empty() {
            return Err(ContentGenError::EmptyResponse);
        }
        Ok(parsed)
    }
}

/// Splits the provider's plain-text reply into a lesson body and question
/// blocks. Lines outside any recognized section are dropped; a question
/// block without both a prompt and an answer is dropped.
fn parse_generated(content: &str) -> GeneratedTopicContent {
    let mut lesson_lines: Vec<&str> = Vec::new();
    let mut questions = Vec::new();
    let mut in_lesson = false;
    let mut draft: Option<GeneratedQuestion> = None;

    for line in content.lines() {
        let line = line.trim();
        if let Some(rest) = line.strip_prefix("LESSON:") {
            in_lesson = true;
            let rest = rest.trim();
            if !rest.is_empty() {
                lesson_lines.push(rest);
            }
        } else if let Some(rest) = line.strip_prefix("QUESTION:") {
            in_lesson = false;
            push_complete(&mut questions, draft.take());
            draft = Some(GeneratedQuestion {
                prompt: rest.trim().to_string(),
                answer: String::new(),
                explanation: String::new(),
            });
        } else if let Some(rest) = line.strip_prefix("ANSWER:") {
            if let Some(draft) = draft.as_mut() {
                draft.answer = rest.trim().to_string();
            }
        } else if let Some(rest) = line.strip_prefix("EXPLAIN:") {
            if let Some(draft) = draft.as_mut() {
                draft.explanation = rest.trim().to_string();
            }
        } else if in_lesson {
            lesson_lines.push(line);
        }
    }
    push_complete(&mut questions, draft.take());

    GeneratedTopicContent {
        lesson_body: lesson_lines.join("\n").trim().to_string(),
        questions,
    }
}

fn push_complete(questions: &mut Vec<GeneratedQuestion>, draft: Option<GeneratedQuestion>) {
    if let Some(question) = draft {
        if !question.prompt.is_empty() && !question.answer.is_empty() {
            questions.push(question);
        }
    }
}

#[derive(Debug, Serialize)]
struct GenerationRequest {
    model: String,
    messages: Vec<PromptMessage>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct PromptMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct GenerationResponse {
    choices: Vec<GenerationChoice>,
}

#[derive(Debug, Deserialize)]
struct GenerationChoice {
    message: GeneratedMessage,
}

#[derive(Debug, Deserialize)]
struct GeneratedMessage {
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn a_well_formed_reply_parses_into_lesson_and_questions() {
        let reply = "LESSON:\n\
                     Fractions name parts of a whole.\n\
                     \n\
                     The bottom number counts the parts.\n\
                     QUESTION: What is 1/2 + 1/4?\n\
                     ANSWER: 3/4\n\
                     EXPLAIN: Quarters add up.\n\
                     QUESTION: How many quarters make a whole?\n\
                     ANSWER: 4\n";

        let parsed = parse_generated(reply);
        assert!(parsed.lesson_body.starts_with("Fractions name"));
        assert!(parsed.lesson_body.contains("bottom number"));
        assert_eq!(parsed.questions.len(), 2);
        assert_eq!(parsed.questions[0].answer, "3/4");
        assert_eq!(parsed.questions[0].explanation, "Quarters add up.");
        assert_eq!(parsed.questions[1].explanation, "");
    }

    #[test]
    fn a_question_without_an_answer_is_dropped() {
        let reply = "QUESTION: unanswerable?\nQUESTION: What is 2+2?\nANSWER: 4\n";
        let parsed = parse_generated(reply);
        assert_eq!(parsed.questions.len(), 1);
        assert_eq!(parsed.questions[0].prompt, "What is 2+2?");
    }

    #[test]
    fn chatter_outside_the_layout_is_ignored() {
        let reply = "Sure! Here you go.\nLESSON:\nShort.\nHope that helps!";
        let parsed = parse_generated(reply);
        assert_eq!(parsed.lesson_body, "Short.\nHope that helps!");
        assert!(parsed.questions.is_empty());
    }

    #[test]
    fn disabled_service_reports_disabled() {
        let service = ContentGenService::new(None);
        assert!(!service.enabled());
    }
}
