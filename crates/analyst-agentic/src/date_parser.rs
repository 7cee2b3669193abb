//! LLM date fallback
//!
//! Implements the date resolver's [`NaturalDateParser`] seam for phrases
//! the deterministic cascade cannot handle.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;

use analyst_data::request::DateRange;
use analyst_resolver::dates::NaturalDateParser;

use crate::llm::{strip_code_fence, LlmClient};

/// LLM-backed natural-language date parser.
pub struct LlmDateParser {
    client: Arc<dyn LlmClient>,
}

impl LlmDateParser {
    pub fn new(client: Arc<dyn LlmClient>) -> Self {
        Self { client }
    }
}

#[derive(Deserialize)]
struct DateReply {
    start_date: NaiveDate,
    end_date: NaiveDate,
}

#[async_trait]
impl NaturalDateParser for LlmDateParser {
    async fn parse_range(&self, text: &str, today: NaiveDate) -> anyhow::Result<DateRange> {
        let system = format!(
            r#"You are a date parsing expert. Convert the user's natural language date description into a precise range. The current date is {today}. Respond with ONLY a JSON object of the form {{"start_date": "YYYY-MM-DD", "end_date": "YYYY-MM-DD"}}."#,
        );
        let response = self.client.chat_json(&system, text).await?;
        let reply: DateReply = serde_json::from_str(strip_code_fence(&response))?;
        Ok(DateRange::new(reply.start_date, reply.end_date)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    struct Fixed(&'static str);

    #[async_trait]
    impl LlmClient for Fixed {
        async fn chat(&self, _system: &str, _user: &str) -> Result<String> {
            Ok(self.0.to_string())
        }

        async fn chat_json(&self, _system: &str, _user: &str) -> Result<String> {
            Ok(self.0.to_string())
        }

        fn model_name(&self) -> &str {
            "fixed"
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 15).unwrap()
    }

    #[tokio::test]
    async fn test_parses_iso_pair() {
        let parser = LlmDateParser::new(Arc::new(Fixed(
            "{\"start_date\": \"2024-11-01\", \"end_date\": \"2024-11-30\"}",
        )));
        let range = parser.parse_range("all of november", today()).await.unwrap();
        assert_eq!(range.start(), NaiveDate::from_ymd_opt(2024, 11, 1).unwrap());
        assert_eq!(range.end(), NaiveDate::from_ymd_opt(2024, 11, 30).unwrap());
    }

    #[tokio::test]
    async fn test_inverted_range_is_error() {
        let parser = LlmDateParser::new(Arc::new(Fixed(
            "{\"start_date\": \"2024-12-01\", \"end_date\": \"2024-01-01\"}",
        )));
        assert!(parser.parse_range("nonsense", today()).await.is_err());
    }

    #[tokio::test]
    async fn test_garbage_reply_is_error() {
        let parser = LlmDateParser::new(Arc::new(Fixed("the weather was nice")));
        assert!(parser.parse_range("whenever", today()).await.is_err());
    }
}
