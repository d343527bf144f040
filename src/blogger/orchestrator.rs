//! 博客编排器：写作者 → 批评者 → arXiv 检索 → 写作者改进
//!
//! 固定执行一轮三步（Init → Drafted → Critiqued → Revised），每步通过 event_tx 推送占位与面板内容。
//! 空输出与批评格式不符只会降级为占位文本；LLM 或检索的传输错误直接上抛，流程中断。

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::agent::{Agent, AgentMessage, MessageHook, OutputFormat};
use crate::blogger::critique::{parse_critique, CritiqueResult};
use crate::blogger::events::{BloggerEvent, Stage};
use crate::blogger::prompts::{
    self, critique_summary, improvement_request, CRITIC_NAME, LITERATURE_PLACEHOLDER, WRITER_NAME,
};
use crate::config::AppConfig;
use crate::core::ScribeError;
use crate::llm::LlmClient;
use crate::tools::LiteratureSearch;

/// 改进请求的发送者
pub const IMPROVEMENT_SENDER: &str = "critic";

/// 编排状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BloggerPhase {
    Init,
    Drafted,
    Critiqued,
    Revised,
}

/// 编排器构造参数
#[derive(Clone)]
pub struct BloggerOptions {
    pub writer_prompt: String,
    pub critic_prompt: String,
    pub critic_prefix: String,
    /// 写作者的输出格式（插件调用解析）
    pub writer_format: Option<Arc<dyn OutputFormat>>,
    pub max_turn: usize,
    pub keep_history_across_runs: bool,
    pub max_context_turns: usize,
}

impl BloggerOptions {
    pub fn from_config(cfg: &AppConfig) -> Self {
        Self {
            writer_prompt: prompts::writer_prompt(),
            critic_prompt: prompts::critic_prompt(),
            critic_prefix: cfg.blogger.critic_prefix.clone(),
            writer_format: None,
            max_turn: cfg.blogger.max_turn,
            keep_history_across_runs: cfg.blogger.keep_history_across_runs,
            max_context_turns: cfg.app.max_context_turns,
        }
    }

    pub fn with_writer_format(mut self, format: Arc<dyn OutputFormat>) -> Self {
        self.writer_format = Some(format);
        self
    }
}

/// 写作者 + 批评者 + 文献检索
pub struct Blogger {
    writer: Agent,
    critic: Agent,
    literature: Arc<dyn LiteratureSearch>,
    llm: Arc<dyn LlmClient>,
    max_turn: usize,
    keep_history_across_runs: bool,
    phase: BloggerPhase,
}

fn emit(event_tx: Option<&mpsc::UnboundedSender<BloggerEvent>>, event: BloggerEvent) {
    if let Some(tx) = event_tx {
        let _ = tx.send(event);
    }
}

impl Blogger {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        literature: Arc<dyn LiteratureSearch>,
        options: BloggerOptions,
    ) -> Self {
        let mut writer = Agent::new(
            WRITER_NAME,
            options.writer_prompt,
            llm.clone(),
            options.max_context_turns,
        );
        if let Some(format) = options.writer_format {
            writer = writer.with_output_format(format);
        }
        let critic = Agent::new(
            CRITIC_NAME,
            options.critic_prompt,
            llm.clone(),
            options.max_context_turns,
        )
        .with_hook(MessageHook::prefix(options.critic_prefix, [WRITER_NAME]));

        Self {
            writer,
            critic,
            literature,
            llm,
            max_turn: options.max_turn,
            keep_history_across_runs: options.keep_history_across_runs,
            phase: BloggerPhase::Init,
        }
    }

    pub fn phase(&self) -> BloggerPhase {
        self.phase
    }

    /// 累计 token 用量（prompt, completion, total）
    pub fn token_usage(&self) -> (u64, u64, u64) {
        self.llm.token_usage()
    }

    /// 用话题生成初始请求并运行
    pub async fn write_about(
        &mut self,
        topic: &str,
        event_tx: Option<&mpsc::UnboundedSender<BloggerEvent>>,
    ) -> Result<AgentMessage, ScribeError> {
        let message = AgentMessage::new("user", prompts::topic_request(topic));
        self.forward(message, event_tx).await
    }

    /// 执行三步流程，返回写作者改进后的消息（内容可能为空）
    pub async fn forward(
        &mut self,
        message: AgentMessage,
        event_tx: Option<&mpsc::UnboundedSender<BloggerEvent>>,
    ) -> Result<AgentMessage, ScribeError> {
        if !self.keep_history_across_runs {
            self.writer.reset();
            self.critic.reset();
        }
        self.phase = BloggerPhase::Init;
        tracing::debug!(max_turn = self.max_turn, "blogger run: single fixed pass");

        // Step 1：写作者生成初稿
        emit(event_tx, BloggerEvent::started(Stage::Draft));
        let draft = self.writer.call(message).await?;
        tracing::info!(chars = draft.content.chars().count(), "draft generated");
        emit(event_tx, BloggerEvent::finished(Stage::Draft, &draft.content));
        self.phase = BloggerPhase::Drafted;

        // Step 2：批评者反馈 + 文献检索
        emit(event_tx, BloggerEvent::started(Stage::Critique));
        let reply = self.critic.call(draft).await?;
        let (critique, literature, critique_message) = if reply.is_empty() {
            tracing::warn!("critic reply is empty, skipping literature lookup");
            (CritiqueResult::missing(), LITERATURE_PLACEHOLDER.to_string(), reply)
        } else {
            let critique = parse_critique(&reply.content);
            if !critique.parse_succeeded() {
                tracing::warn!(
                    suggestions = critique.suggestions.is_found(),
                    keywords = critique.keywords.is_found(),
                    "critic reply does not follow the template"
                );
            }
            let literature = self
                .literature
                .search(critique.keywords_or_placeholder())
                .await?;
            let summary = critique_summary(critique.suggestions_or_placeholder(), &literature);
            (critique, literature, reply.with_content(summary))
        };
        emit(
            event_tx,
            BloggerEvent::finished(Stage::Critique, &critique_message.content),
        );
        self.phase = BloggerPhase::Critiqued;

        // Step 3：写作者根据反馈改进；只传入新构造的改进请求
        emit(event_tx, BloggerEvent::started(Stage::Revision));
        let improvement = AgentMessage::new(
            IMPROVEMENT_SENDER,
            improvement_request(critique.suggestions_or_placeholder(), &literature),
        );
        let revised = self.writer.call(improvement).await?;
        tracing::info!(chars = revised.content.chars().count(), "revision generated");
        emit(event_tx, BloggerEvent::finished(Stage::Revision, &revised.content));
        self.phase = BloggerPhase::Revised;

        let (prompt_tokens, completion_tokens, total_tokens) = self.token_usage();
        tracing::info!(prompt_tokens, completion_tokens, total_tokens, "blogger run finished");

        Ok(revised)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blogger::critique::{KEYWORDS_PLACEHOLDER, SUGGESTIONS_PLACEHOLDER};
    use crate::llm::MockLlmClient;
    use crate::memory::Message;
    use crate::tools::ToolError;
    use async_trait::async_trait;
    use std::sync::Mutex;

    const CRITIC_REPLY: &str =
        "1. 批评建议：\n- 补充实验数据\n2. 推荐的关键词：\n- self-supervised learning, SimCLR";

    #[derive(Default)]
    struct FakeLiterature {
        queries: Mutex<Vec<String>>,
        fail: bool,
    }

    #[async_trait]
    impl LiteratureSearch for FakeLiterature {
        async fn search(&self, keywords: &str) -> Result<String, ToolError> {
            self.queries.lock().unwrap().push(keywords.to_string());
            if self.fail {
                return Err(ToolError::Api("arXiv HTTP 503".to_string()));
            }
            Ok(format!("Title: paper about {keywords}"))
        }
    }

    fn options() -> BloggerOptions {
        BloggerOptions {
            writer_prompt: prompts::DEFAULT_WRITER_PROMPT.to_string(),
            critic_prompt: prompts::DEFAULT_CRITIC_PROMPT.to_string(),
            critic_prefix: "请批评：".to_string(),
            writer_format: None,
            max_turn: 2,
            keep_history_across_runs: false,
            max_context_turns: 10,
        }
    }

    fn blogger(llm: &Arc<MockLlmClient>, literature: &Arc<FakeLiterature>) -> Blogger {
        Blogger::new(llm.clone(), literature.clone(), options())
    }

    fn system_prompt(call: &[Message]) -> &str {
        &call[0].content
    }

    fn collect(mut rx: mpsc::UnboundedReceiver<BloggerEvent>) -> Vec<BloggerEvent> {
        let mut events = Vec::new();
        while let Ok(ev) = rx.try_recv() {
            events.push(ev);
        }
        events
    }

    #[tokio::test]
    async fn test_happy_path_calls_and_events() {
        let llm = Arc::new(MockLlmClient::with_replies(["初稿", CRITIC_REPLY, "终稿"]));
        let literature = Arc::new(FakeLiterature::default());
        let mut blogger = blogger(&llm, &literature);
        let (tx, rx) = mpsc::unbounded_channel();

        let result = blogger.write_about("Self-Supervised Learning", Some(&tx)).await.unwrap();
        assert_eq!(result.sender, WRITER_NAME);
        assert_eq!(result.content, "终稿");
        assert_eq!(blogger.phase(), BloggerPhase::Revised);

        let calls = llm.calls();
        assert_eq!(calls.len(), 3);
        assert_eq!(system_prompt(&calls[0]), prompts::DEFAULT_WRITER_PROMPT);
        assert_eq!(system_prompt(&calls[1]), prompts::DEFAULT_CRITIC_PROMPT);
        assert_eq!(system_prompt(&calls[2]), prompts::DEFAULT_WRITER_PROMPT);
        // 批评者收到加了前缀的初稿
        assert_eq!(calls[1].last().unwrap().content, "请批评：初稿");

        assert_eq!(
            *literature.queries.lock().unwrap(),
            vec!["self-supervised learning, SimCLR".to_string()]
        );

        let final_request = &calls[2].last().unwrap().content;
        assert!(final_request.contains("批评建议：\n- 补充实验数据"));
        assert!(final_request
            .contains("推荐文献：\nTitle: paper about self-supervised learning, SimCLR"));

        let events = collect(rx);
        let panels: Vec<_> = events.iter().filter(|e| e.is_panel_update()).collect();
        assert_eq!(panels.len(), 3);
        assert_eq!(panels[0].stage(), Some(Stage::Draft));
        assert_eq!(panels[1].stage(), Some(Stage::Critique));
        assert_eq!(panels[2].stage(), Some(Stage::Revision));
        assert_eq!(
            *panels[1],
            BloggerEvent::StageCompleted {
                stage: Stage::Critique,
                text: "**批评和文献推荐**:\n\n**批评建议**:\n- 补充实验数据\n\n**推荐的文献**:\nTitle: paper about self-supervised learning, SimCLR".to_string()
            }
        );
        assert_eq!(events.len(), 6);
        assert_eq!(events[0], BloggerEvent::started(Stage::Draft));
    }

    #[tokio::test]
    async fn test_empty_draft_still_runs_critic() {
        let llm = Arc::new(MockLlmClient::with_replies(["", CRITIC_REPLY, "终稿"]));
        let literature = Arc::new(FakeLiterature::default());
        let mut blogger = blogger(&llm, &literature);
        let (tx, rx) = mpsc::unbounded_channel();

        let result = blogger.write_about("x", Some(&tx)).await.unwrap();
        assert_eq!(result.content, "终稿");
        assert_eq!(llm.call_count(), 3);

        let events = collect(rx);
        assert!(matches!(
            events[1],
            BloggerEvent::StageEmpty { stage: Stage::Draft, .. }
        ));
    }

    #[tokio::test]
    async fn test_malformed_critique_uses_placeholders() {
        let llm = Arc::new(MockLlmClient::with_replies(["初稿", "写得不错", "终稿"]));
        let literature = Arc::new(FakeLiterature::default());
        let mut blogger = blogger(&llm, &literature);

        blogger.write_about("x", None).await.unwrap();

        assert_eq!(*literature.queries.lock().unwrap(), vec![KEYWORDS_PLACEHOLDER.to_string()]);
        let calls = llm.calls();
        let final_request = &calls[2].last().unwrap().content;
        assert!(final_request.contains(SUGGESTIONS_PLACEHOLDER));
    }

    #[tokio::test]
    async fn test_all_empty_outputs() {
        let llm = Arc::new(MockLlmClient::with_replies(["", "", ""]));
        let literature = Arc::new(FakeLiterature::default());
        let mut blogger = blogger(&llm, &literature);
        let (tx, rx) = mpsc::unbounded_channel();

        let result = blogger.write_about("x", Some(&tx)).await.unwrap();
        assert!(result.is_empty());
        assert_eq!(llm.call_count(), 3);
        assert!(literature.queries.lock().unwrap().is_empty());

        let calls = llm.calls();
        let final_request = &calls[2].last().unwrap().content;
        assert!(final_request.contains(LITERATURE_PLACEHOLDER));

        let panels: Vec<_> = collect(rx).into_iter().filter(|e| e.is_panel_update()).collect();
        assert_eq!(panels.len(), 3);
        assert!(panels
            .iter()
            .all(|e| matches!(e, BloggerEvent::StageEmpty { .. })));
    }

    #[tokio::test]
    async fn test_whitespace_critique_still_runs_lookup() {
        let llm = Arc::new(MockLlmClient::with_replies(["初稿", " \n ", "终稿"]));
        let literature = Arc::new(FakeLiterature::default());
        let mut blogger = blogger(&llm, &literature);

        blogger.write_about("x", None).await.unwrap();

        // 只有空字符串才算空回复；纯空白仍按格式不符处理
        assert_eq!(*literature.queries.lock().unwrap(), vec![KEYWORDS_PLACEHOLDER.to_string()]);
        let calls = llm.calls();
        assert!(calls[2].last().unwrap().content.contains(SUGGESTIONS_PLACEHOLDER));
    }

    /// 固定 token 统计的客户端，回复全部交给内部 Mock
    struct MeteredLlm(MockLlmClient);

    #[async_trait]
    impl LlmClient for MeteredLlm {
        async fn complete(&self, messages: &[Message]) -> Result<String, crate::llm::LlmError> {
            self.0.complete(messages).await
        }

        fn token_usage(&self) -> (u64, u64, u64) {
            (120, 30, 150)
        }
    }

    #[tokio::test]
    async fn test_token_usage_from_client() {
        let llm = Arc::new(MeteredLlm(MockLlmClient::with_replies(["初稿", CRITIC_REPLY, "终稿"])));
        let literature = Arc::new(FakeLiterature::default());
        let mut blogger = Blogger::new(llm.clone(), literature, options());

        blogger.write_about("x", None).await.unwrap();
        assert_eq!(blogger.token_usage(), (120, 30, 150));
        assert_eq!(llm.0.call_count(), 3);

        let plain = Blogger::new(
            Arc::new(MockLlmClient::new()),
            Arc::new(FakeLiterature::default()),
            options(),
        );
        assert_eq!(plain.token_usage(), (0, 0, 0));
    }

    #[tokio::test]
    async fn test_literature_error_interrupts_run() {
        let llm = Arc::new(MockLlmClient::with_replies(["初稿", CRITIC_REPLY, "终稿"]));
        let literature = Arc::new(FakeLiterature {
            fail: true,
            ..Default::default()
        });
        let mut blogger = blogger(&llm, &literature);

        let err = blogger.write_about("x", None).await.unwrap_err();
        assert!(matches!(err, ScribeError::Tool(_)));
        assert_eq!(llm.call_count(), 2);
        assert_eq!(blogger.phase(), BloggerPhase::Drafted);
    }

    #[tokio::test]
    async fn test_llm_error_propagates() {
        let llm = Arc::new(MockLlmClient::new());
        llm.push_error("timeout");
        let literature = Arc::new(FakeLiterature::default());
        let mut blogger = blogger(&llm, &literature);

        let err = blogger.write_about("x", None).await.unwrap_err();
        assert!(matches!(err, ScribeError::Llm(_)));
    }

    #[tokio::test]
    async fn test_memory_reset_between_runs() {
        let llm = Arc::new(MockLlmClient::with_replies([
            "初稿1", CRITIC_REPLY, "终稿1", "初稿2", CRITIC_REPLY, "终稿2",
        ]));
        let literature = Arc::new(FakeLiterature::default());
        let mut blogger = blogger(&llm, &literature);

        blogger.write_about("a", None).await.unwrap();
        blogger.write_about("b", None).await.unwrap();

        let calls = llm.calls();
        // 第二次运行的首个写作者请求只有 system + 话题
        assert_eq!(calls[3].len(), 2);
        // 改进请求前，写作者记忆中仍有本轮初稿
        assert_eq!(calls[5][2], Message::assistant("初稿2"));
    }
}
