use std::time::Duration;

use async_trait::async_trait;
use finagent_models::ToolOutput;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use super::{single_field_schema, text_argument, ToolCapability, ToolInputSchema};
use crate::error::ToolError;

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "PascalCase", default)]
struct InstantAnswer {
    heading: String,
    abstract_text: String,
    abstract_source: String,
    #[serde(rename = "AbstractURL")]
    abstract_url: String,
    related_topics: Vec<RelatedTopic>,
}

/// Either a single topic or a named group of topics.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RelatedTopic {
    Topic {
        #[serde(rename = "Text")]
        text: String,
        #[serde(rename = "FirstURL")]
        first_url: String,
    },
    Group {
        #[serde(rename = "Topics")]
        topics: Vec<RelatedTopic>,
    },
}

impl RelatedTopic {
    fn flatten<'a>(&'a self, out: &mut Vec<(&'a str, &'a str)>) {
        match self {
            RelatedTopic::Topic { text, first_url } => out.push((text, first_url)),
            RelatedTopic::Group { topics } => topics.iter().for_each(|t| t.flatten(out)),
        }
    }
}

/// Web search over the DuckDuckGo Instant Answer API.
///
/// Every result line carries its source URL so agents can cite it.
pub struct WebSearchTool {
    client: Client,
    base_url: String,
    max_results: usize,
}

impl WebSearchTool {
    pub fn new(base_url: &str, max_results: usize, timeout: Duration) -> Result<Self, ToolError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            max_results,
        })
    }

    async fn search(&self, query: &str) -> Result<String, ToolError> {
        let url = format!("{}/", self.base_url);
        debug!(%query, "Web search");

        let response = self
            .client
            .get(&url)
            .query(&[
                ("q", query),
                ("format", "json"),
                ("no_html", "1"),
                ("skip_disambig", "1"),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ToolError::Status {
                status: status.as_u16(),
                url,
            });
        }

        // DuckDuckGo answers with a javascript content type, so decode by hand.
        let body = response.text().await?;
        let answer: InstantAnswer =
            serde_json::from_str(&body).map_err(|e| ToolError::Malformed(e.to_string()))?;

        let mut lines = Vec::new();
        if !answer.abstract_text.is_empty() {
            let source = if answer.abstract_source.is_empty() {
                "source"
            } else {
                answer.abstract_source.as_str()
            };
            let heading = if answer.heading.is_empty() {
                String::new()
            } else {
                format!("{}: ", answer.heading)
            };
            lines.push(format!(
                "- {heading}{} [{source}]({})",
                answer.abstract_text, answer.abstract_url
            ));
        }

        let mut related = Vec::new();
        answer
            .related_topics
            .iter()
            .for_each(|t| t.flatten(&mut related));
        lines.extend(
            related
                .into_iter()
                .filter(|(text, _)| !text.is_empty())
                .map(|(text, url)| format!("- {text} [source]({url})")),
        );

        if lines.is_empty() {
            return Err(ToolError::NoResults(query.to_string()));
        }
        lines.truncate(self.max_results);
        Ok(lines.join("\n"))
    }
}

#[async_trait]
impl ToolCapability for WebSearchTool {
    fn name(&self) -> &str {
        "web_search"
    }

    fn description(&self) -> &str {
        "Search the web for recent news and background on a company or topic. \
         Results include source links."
    }

    fn input_schema(&self) -> ToolInputSchema {
        ToolInputSchema::Structured(single_field_schema("query", "Search terms"))
    }

    async fn invoke(&self, input: &Value) -> Result<ToolOutput, ToolError> {
        let query = text_argument(input, "query")?;
        self.search(&query).await.map(ToolOutput::Text)
    }
}
