//! arXiv 文献检索
//!
//! 调用 arXiv Atom API（`search_query` + `max_results`），用正则抽取 entry 的日期、标题、作者与摘要，
//! 格式化为 `Published / Title / Authors / Summary` 文本块。无缓存、无限流；HTTP 失败原样上抛。

use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use serde_json::Value;

use crate::config::ArxivSection;
use crate::tools::{Tool, ToolError};

/// 没有检索到任何条目时返回的文本
pub const NO_RESULT: &str = "No good Arxiv Result was found";

static ENTRY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<entry>(.*?)</entry>").expect("entry regex"));
static ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<id>(.*?)</id>").expect("id regex"));
static UPDATED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<updated>(.*?)</updated>").expect("updated regex"));
static TITLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<title[^>]*>(.*?)</title>").expect("title regex"));
static SUMMARY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<summary[^>]*>(.*?)</summary>").expect("summary regex"));
static AUTHOR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<author>\s*<name>(.*?)</name>").expect("author regex")
});
static NUMERIC_ENTITY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&#(x[0-9a-fA-F]+|[0-9]+);").expect("entity regex"));

/// 文献检索能力：关键词进，格式化文本出
#[async_trait]
pub trait LiteratureSearch: Send + Sync {
    async fn search(&self, keywords: &str) -> Result<String, ToolError>;
}

/// 单篇论文
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArxivPaper {
    /// 最近更新日期（YYYY-MM-DD）
    pub published: String,
    pub title: String,
    pub authors: Vec<String>,
    pub summary: String,
}

impl ArxivPaper {
    fn format(&self, summary_chars_max: usize) -> String {
        let summary: String = self.summary.chars().take(summary_chars_max).collect();
        format!(
            "Published: {}\nTitle: {}\nAuthors: {}\nSummary: {}",
            self.published,
            self.title,
            self.authors.join(", "),
            summary
        )
    }
}

/// arXiv 检索工具
pub struct ArxivSearch {
    client: Client,
    base_url: String,
    top_k_results: usize,
    max_query_len: usize,
    doc_content_chars_max: usize,
}

impl ArxivSearch {
    pub fn new(config: &ArxivSection) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("scribe/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "arXiv client build failed, falling back to defaults");
                Client::new()
            });
        Self {
            client,
            base_url: config.base_url.clone(),
            top_k_results: config.top_k_results,
            max_query_len: config.max_query_len,
            doc_content_chars_max: config.doc_content_chars_max,
        }
    }

    /// 检索并返回论文列表
    pub async fn fetch_papers(&self, query: &str) -> Result<Vec<ArxivPaper>, ToolError> {
        let query: String = query.trim().chars().take(self.max_query_len).collect();
        let max_results = self.top_k_results.to_string();
        tracing::info!(query = %query, "arxiv search");

        let resp = self
            .client
            .get(&self.base_url)
            .query(&[
                ("search_query", query.as_str()),
                ("start", "0"),
                ("max_results", max_results.as_str()),
            ])
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(ToolError::Api(format!("arXiv HTTP {}", resp.status())));
        }
        let body = resp.text().await?;
        let papers = parse_feed(&body)?;
        Ok(papers.into_iter().take(self.top_k_results).collect())
    }

    /// 检索并格式化为文本块；无结果时返回 NO_RESULT
    pub async fn get_arxiv_article_information(&self, query: &str) -> Result<String, ToolError> {
        let papers = self.fetch_papers(query).await?;
        if papers.is_empty() {
            tracing::warn!("arxiv search returned no entries");
            return Ok(NO_RESULT.to_string());
        }
        Ok(papers
            .iter()
            .map(|p| p.format(self.doc_content_chars_max))
            .collect::<Vec<_>>()
            .join("\n\n"))
    }
}

#[async_trait]
impl LiteratureSearch for ArxivSearch {
    async fn search(&self, keywords: &str) -> Result<String, ToolError> {
        self.get_arxiv_article_information(keywords).await
    }
}

#[async_trait]
impl Tool for ArxivSearch {
    fn name(&self) -> &str {
        "ArxivSearch"
    }

    fn description(&self) -> &str {
        "Search arXiv for papers. Returns published date, title, authors and summary of the top results. Args: {\"query\": \"English keywords\"}"
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "query": { "type": "string", "description": "the search query (English keywords)" }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, args: Value) -> Result<String, ToolError> {
        let query = args
            .get("query")
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .trim();
        if query.is_empty() {
            return Err(ToolError::InvalidArgs("Missing query".to_string()));
        }
        self.get_arxiv_article_information(query).await
    }
}

/// 解析 Atom feed；arXiv 对非法查询会返回一条 id 指向 api/errors 的 entry
pub fn parse_feed(xml: &str) -> Result<Vec<ArxivPaper>, ToolError> {
    let mut papers = Vec::new();
    for entry in ENTRY_RE.captures_iter(xml) {
        let entry = &entry[1];
        if let Some(id) = capture(&ID_RE, entry) {
            if id.contains("api/errors") {
                let detail = capture(&SUMMARY_RE, entry).unwrap_or_default();
                return Err(ToolError::Api(format!("arXiv query error: {}", clean_text(&detail))));
            }
        }

        let published = capture(&UPDATED_RE, entry)
            .map(|s| format_date(s.trim()))
            .unwrap_or_default();
        let title = capture(&TITLE_RE, entry).map(|s| clean_text(&s)).unwrap_or_default();
        let summary = capture(&SUMMARY_RE, entry).map(|s| clean_text(&s)).unwrap_or_default();
        let authors = AUTHOR_RE
            .captures_iter(entry)
            .map(|c| clean_text(&c[1]))
            .collect();

        papers.push(ArxivPaper {
            published,
            title,
            authors,
            summary,
        });
    }
    Ok(papers)
}

fn capture(re: &Regex, text: &str) -> Option<String> {
    re.captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// RFC 3339 时间戳取日期部分；解析失败时保留原文
fn format_date(raw: &str) -> String {
    chrono::DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.date_naive().to_string())
        .unwrap_or_else(|_| raw.to_string())
}

/// 反转义 XML 实体并压缩空白（标题与摘要在 feed 中带硬换行）
fn clean_text(raw: &str) -> String {
    // 数字实体先于 &amp; 处理，避免 &amp;#233; 被二次解码
    let numeric = NUMERIC_ENTITY_RE.replace_all(raw, |c: &regex::Captures| {
        let code = &c[1];
        let value = match code.strip_prefix('x') {
            Some(hex) => u32::from_str_radix(hex, 16).ok(),
            None => code.parse::<u32>().ok(),
        };
        value
            .and_then(char::from_u32)
            .map(String::from)
            .unwrap_or_else(|| c[0].to_string())
    });
    let unescaped = numeric
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&");
    unescaped.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title type="html">ArXiv Query: search_query=contrastive</title>
  <entry>
    <id>http://arxiv.org/abs/2002.05709v3</id>
    <updated>2020-07-01T00:09:08Z</updated>
    <published>2020-02-13T18:50:45Z</published>
    <title>A Simple Framework for Contrastive Learning of Visual
  Representations</title>
    <summary>  This paper presents SimCLR: a simple framework for contrastive
learning of visual representations &amp; more.
</summary>
    <author>
      <name>Ting Chen</name>
    </author>
    <author>
      <name>Geoffrey Hinton</name>
    </author>
  </entry>
  <entry>
    <id>http://arxiv.org/abs/1911.05722v3</id>
    <updated>2020-03-23T17:58:31Z</updated>
    <title>Momentum Contrast for Unsupervised Visual Representation Learning</title>
    <summary>We present Momentum Contrast (MoCo).</summary>
    <author>
      <name>Kaiming He</name>
    </author>
  </entry>
</feed>"#;

    fn section(base_url: String) -> ArxivSection {
        ArxivSection {
            base_url,
            doc_content_chars_max: 26,
            ..ArxivSection::default()
        }
    }

    #[test]
    fn test_parse_feed() {
        let papers = parse_feed(FEED).unwrap();
        assert_eq!(papers.len(), 2);
        assert_eq!(papers[0].published, "2020-07-01");
        assert_eq!(
            papers[0].title,
            "A Simple Framework for Contrastive Learning of Visual Representations"
        );
        assert_eq!(papers[0].authors, vec!["Ting Chen", "Geoffrey Hinton"]);
        assert!(papers[0].summary.ends_with("visual representations & more."));
        assert_eq!(papers[1].authors, vec!["Kaiming He"]);
    }

    #[test]
    fn test_clean_text_decodes_entities() {
        assert_eq!(
            clean_text("Poincar&#233;\n  maps &#x2014; R&amp;D&#39;s &lt;x&gt;"),
            "Poincaré maps — R&D's <x>"
        );
        // 转义过的 & 不会再被当作数字实体
        assert_eq!(clean_text("&amp;#233; &#xFFFFFFFF;"), "&#233; &#xFFFFFFFF;");
    }

    #[test]
    fn test_parse_error_entry() {
        let xml = r#"<feed><entry><id>http://arxiv.org/api/errors#incorrect_id_format</id>
<title>Error</title><summary>incorrect id format</summary></entry></feed>"#;
        let err = parse_feed(xml).unwrap_err();
        assert!(matches!(err, ToolError::Api(msg) if msg.contains("incorrect id format")));
    }

    #[tokio::test]
    async fn test_search_formats_and_truncates() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/query"))
            .and(query_param("search_query", "contrastive learning"))
            .and(query_param("max_results", "3"))
            .respond_with(ResponseTemplate::new(200).set_body_string(FEED))
            .expect(1)
            .mount(&mock_server)
            .await;

        let search = ArxivSearch::new(&section(format!("{}/api/query", mock_server.uri())));
        let text = search.search("contrastive learning").await.unwrap();

        let blocks: Vec<&str> = text.split("\n\n").collect();
        assert_eq!(blocks.len(), 2);
        assert_eq!(
            blocks[0],
            "Published: 2020-07-01\nTitle: A Simple Framework for Contrastive Learning of Visual Representations\nAuthors: Ting Chen, Geoffrey Hinton\nSummary: This paper presents SimCLR"
        );
        assert!(blocks[1].starts_with("Published: 2020-03-23\nTitle: Momentum Contrast"));
    }

    #[tokio::test]
    async fn test_search_without_entries() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<feed></feed>"))
            .mount(&mock_server)
            .await;

        let search = ArxivSearch::new(&section(mock_server.uri()));
        assert_eq!(search.search("nothing").await.unwrap(), NO_RESULT);
    }

    #[tokio::test]
    async fn test_search_http_error_propagates() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&mock_server)
            .await;

        let search = ArxivSearch::new(&section(mock_server.uri()));
        let err = search.search("anything").await.unwrap_err();
        assert!(matches!(err, ToolError::Api(msg) if msg.contains("503")));
    }

    #[tokio::test]
    async fn test_execute_requires_query() {
        let search = ArxivSearch::new(&ArxivSection::default());
        let err = search.execute(serde_json::json!({})).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidArgs(_)));
    }
}
