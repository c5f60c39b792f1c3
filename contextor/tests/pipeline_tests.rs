use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use ai_llm_service::error_handler::{
    HttpError, Provider, ProviderError, ProviderErrorKind, StatusCode,
};
use ai_llm_service::{AiLlmError, ChatMessage, LlmProfile, TextStream};
use contextor::{
    ChatFrame, ChatFuture, ChatModel, ContextorConfig, RagChat, SessionStore, Speaker,
};
use futures::StreamExt;
use rag_store::{Document, EmbedFuture, EmbeddingsProvider, RagConfig, RagError, RagStore};

const DIM: usize = 16;

#[derive(Default)]
struct HashEmbedder {
    broken: AtomicBool,
}

impl EmbeddingsProvider for HashEmbedder {
    fn embed<'a>(&'a self, text: &'a str) -> EmbedFuture<'a, Vec<f32>> {
        Box::pin(async move {
            if self.broken.load(Ordering::SeqCst) {
                return Err(RagError::Provider(AiLlmError::Provider(ProviderError::new(
                    Provider::Ollama,
                    ProviderErrorKind::Decode("connection reset".into()),
                ))));
            }
            let mut v = vec![0.0; DIM];
            for w in text.split_whitespace() {
                let w = w.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase();
                let h = w.bytes().fold(7usize, |h, b| h.wrapping_mul(31).wrapping_add(b as usize));
                v[h % DIM] += 1.0;
            }
            Ok(v)
        })
    }
}

#[derive(Clone)]
enum Script {
    /// Answers from the system prompt: mentions blue if the context does.
    Grounded,
    Tokens(Vec<&'static str>),
    /// Emits the tokens, then fails.
    FailAfter(Vec<&'static str>),
    MissingKey,
    /// The rewrite call fails with an upstream status.
    RewriteUnavailable,
}

struct FakeChat {
    script: Script,
    rewrite_reply: String,
    rewrite_calls: AtomicUsize,
    stream_calls: AtomicUsize,
    last_rewrite_messages: Mutex<Vec<ChatMessage>>,
}

impl FakeChat {
    fn new(script: Script) -> Arc<Self> {
        Arc::new(Self {
            script,
            rewrite_reply: "What color is the sky?".into(),
            rewrite_calls: AtomicUsize::new(0),
            stream_calls: AtomicUsize::new(0),
            last_rewrite_messages: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> usize {
        self.rewrite_calls.load(Ordering::SeqCst) + self.stream_calls.load(Ordering::SeqCst)
    }
}

fn unavailable() -> AiLlmError {
    AiLlmError::Provider(ProviderError::new(
        Provider::OpenAI,
        ProviderErrorKind::HttpStatus(HttpError {
            status: StatusCode::SERVICE_UNAVAILABLE,
            url: "http://llm/v1/chat/completions".into(),
            snippet: "overloaded".into(),
        }),
    ))
}

fn missing_key() -> AiLlmError {
    AiLlmError::Provider(ProviderError::new(
        Provider::OpenAI,
        ProviderErrorKind::MissingApiKey,
    ))
}

impl ChatModel for FakeChat {
    fn complete<'a>(
        &'a self,
        profile: LlmProfile,
        messages: &'a [ChatMessage],
    ) -> ChatFuture<'a, String> {
        Box::pin(async move {
            assert_eq!(profile, LlmProfile::Rewrite);
            self.rewrite_calls.fetch_add(1, Ordering::SeqCst);
            *self.last_rewrite_messages.lock().unwrap() = messages.to_vec();
            match self.script {
                Script::MissingKey => Err(missing_key()),
                Script::RewriteUnavailable => Err(unavailable()),
                _ => Ok(self.rewrite_reply.clone()),
            }
        })
    }

    fn stream<'a>(
        &'a self,
        profile: LlmProfile,
        messages: &'a [ChatMessage],
    ) -> ChatFuture<'a, TextStream> {
        Box::pin(async move {
            assert_eq!(profile, LlmProfile::Chat);
            self.stream_calls.fetch_add(1, Ordering::SeqCst);
            let items: Vec<Result<String, AiLlmError>> = match &self.script {
                Script::Grounded | Script::RewriteUnavailable => {
                    let tokens = if messages[0].content.contains("blue") {
                        vec!["The sky ", "is blue", "."]
                    } else {
                        vec!["I don't know."]
                    };
                    tokens.into_iter().map(|t| Ok(t.to_string())).collect()
                }
                Script::Tokens(t) => t.iter().map(|t| Ok(t.to_string())).collect(),
                Script::FailAfter(t) => t
                    .iter()
                    .map(|t| Ok(t.to_string()))
                    .chain(std::iter::once(Err(AiLlmError::Provider(ProviderError::new(
                        Provider::OpenAI,
                        ProviderErrorKind::Decode("connection reset".into()),
                    )))))
                    .collect(),
                Script::MissingKey => return Err(missing_key()),
            };
            Ok(Box::pin(futures::stream::iter(items)) as TextStream)
        })
    }
}

fn rag_config() -> RagConfig {
    RagConfig {
        chunk_size: 200,
        chunk_overlap: 20,
        top_k: 2,
        embed_batch: 4,
        embed_concurrency: 2,
        expected_dim: None,
    }
}

fn service(chat: Arc<FakeChat>, buffer: usize) -> Arc<RagChat> {
    service_with(chat, Arc::new(HashEmbedder::default()), buffer)
}

fn service_with(chat: Arc<FakeChat>, embedder: Arc<HashEmbedder>, buffer: usize) -> Arc<RagChat> {
    let store = Arc::new(RagStore::new(rag_config(), embedder).unwrap());
    let cfg = ContextorConfig {
        stream_buffer: buffer,
        ..ContextorConfig::default()
    };
    let sessions = Arc::new(SessionStore::new(cfg.session_ttl, cfg.history_max_turns));
    Arc::new(RagChat::new(cfg, store, sessions, chat))
}

async fn upload(chat: &RagChat, name: &str, pages: &[&str]) {
    let doc = Document::from_pages(
        name,
        name.as_bytes(),
        pages.iter().map(|p| p.to_string()).collect(),
    );
    chat.store().ingest(&doc).await.unwrap();
}

async fn frames(svc: &Arc<RagChat>, session: &str, question: &str) -> Vec<ChatFrame> {
    svc.chat_stream(session.into(), question.into())
        .collect()
        .await
}

fn assert_well_formed(frames: &[ChatFrame]) {
    assert_eq!(frames.iter().filter(|f| f.is_end()).count(), 1);
    assert!(frames.last().is_some_and(ChatFrame::is_end));
    assert!(frames.iter().filter(|f| matches!(f, ChatFrame::Error(_))).count() <= 1);
}

fn text_of(frames: &[ChatFrame]) -> String {
    frames
        .iter()
        .filter_map(|f| match f {
            ChatFrame::Token(t) => Some(t.as_str()),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn chat_without_document_reports_and_ends() {
    let chat = FakeChat::new(Script::Grounded);
    let svc = service(chat.clone(), 8);

    let out = frames(&svc, "s1", "What color is the sky?").await;
    assert_eq!(
        out,
        vec![
            ChatFrame::Error(
                "No document has been processed. Please upload a PDF first.".into()
            ),
            ChatFrame::End,
        ]
    );
    assert_eq!(chat.calls(), 0);
}

#[tokio::test]
async fn grounded_answer_is_streamed_and_recorded() {
    let chat = FakeChat::new(Script::Grounded);
    let svc = service(chat.clone(), 8);
    upload(&svc, "sky.pdf", &["The sky is blue."]).await;

    let out = frames(&svc, "s1", "What color is the sky?").await;
    assert_well_formed(&out);
    assert!(out.iter().all(|f| !matches!(f, ChatFrame::Error(_))));
    assert!(text_of(&out).contains("blue"));
    assert_eq!(out.len(), 4);
    // first turn needs no rewrite
    assert_eq!(chat.rewrite_calls.load(Ordering::SeqCst), 0);

    let history = svc.sessions().history("s1").await;
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].speaker, Speaker::User);
    assert_eq!(history[0].text, "What color is the sky?");
    assert_eq!(history[1].text, "The sky is blue.");
}

#[tokio::test]
async fn follow_up_is_rewritten_with_history() {
    let chat = FakeChat::new(Script::Grounded);
    let svc = service(chat.clone(), 8);
    upload(&svc, "sky.pdf", &["The sky is blue."]).await;

    let first = svc.ask("s1", "Tell me about the sky").await;
    assert!(first.error.is_none());
    assert_eq!(first.standalone_question.as_deref(), Some("Tell me about the sky"));

    let second = svc.ask("s1", "And its color?").await;
    assert!(second.error.is_none());
    assert_eq!(chat.rewrite_calls.load(Ordering::SeqCst), 1);
    assert_eq!(second.standalone_question.as_deref(), Some("What color is the sky?"));
    assert_eq!(second.context.len(), 1);
    assert_eq!(second.context[0].page, 1);

    let sent = chat.last_rewrite_messages.lock().unwrap().clone();
    assert_eq!(sent.len(), 4);
    assert_eq!(sent[3].content, "And its color?");

    // another session starts clean
    let other = svc.ask("s2", "And its color?").await;
    assert_eq!(other.standalone_question.as_deref(), Some("And its color?"));
    assert_eq!(chat.rewrite_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn mid_stream_failure_keeps_tokens_and_skips_history() {
    let chat = FakeChat::new(Script::FailAfter(vec!["partial "]));
    let svc = service(chat, 8);
    upload(&svc, "sky.pdf", &["The sky is blue."]).await;

    let out = frames(&svc, "s1", "What color is the sky?").await;
    assert_well_formed(&out);
    assert_eq!(out[0], ChatFrame::Token("partial ".into()));
    match &out[1] {
        ChatFrame::Error(msg) => {
            assert!(msg.starts_with("An error occurred while generating the response"))
        }
        other => panic!("expected an error frame, got {other:?}"),
    }
    assert!(svc.sessions().history("s1").await.is_empty());
}

#[tokio::test]
async fn missing_credential_is_an_in_band_configuration_error() {
    let chat = FakeChat::new(Script::MissingKey);
    let svc = service(chat, 8);
    upload(&svc, "sky.pdf", &["The sky is blue."]).await;

    let out = frames(&svc, "s1", "What color is the sky?").await;
    assert_well_formed(&out);
    assert_eq!(out.len(), 2);
    assert!(matches!(&out[0], ChatFrame::Error(m) if m.starts_with("configuration error")));

    let outcome = svc.ask("s1", "What color is the sky?").await;
    assert_eq!(outcome.error_kind, Some("configuration"));
    assert!(outcome.answer.is_empty());
}

#[tokio::test]
async fn empty_answer_is_a_generation_error() {
    let chat = FakeChat::new(Script::Tokens(vec!["", ""]));
    let svc = service(chat, 8);
    upload(&svc, "sky.pdf", &["The sky is blue."]).await;

    let outcome = svc.ask("s1", "What color is the sky?").await;
    assert_eq!(outcome.error_kind, Some("generation"));
}

#[tokio::test]
async fn retrieval_sees_only_the_latest_upload() {
    let chat = FakeChat::new(Script::Grounded);
    let svc = service(chat, 8);
    upload(&svc, "sky.pdf", &["The sky is blue."]).await;
    upload(&svc, "grass.pdf", &["Grass is green.", "Trees are tall."]).await;

    let outcome = svc.ask("s1", "What color is the sky?").await;
    assert!(outcome.error.is_none());
    assert!(!outcome.context.is_empty());
    assert!(outcome.context.iter().all(|c| !c.text.contains("sky")));
    assert!(outcome.answer.contains("don't know"));
}

#[tokio::test]
async fn dropped_consumer_stops_the_turn() {
    let chat = FakeChat::new(Script::Tokens(vec!["tok "; 100]));
    let svc = service(chat, 1);
    upload(&svc, "sky.pdf", &["The sky is blue."]).await;

    let mut stream = svc.chat_stream("s1".into(), "What color is the sky?".into());
    assert_eq!(stream.next().await, Some(ChatFrame::Token("tok ".into())));
    drop(stream);

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(svc.sessions().history("s1").await.is_empty());
}

#[tokio::test]
async fn failed_rewrite_is_one_error_frame_and_not_recorded() {
    let chat = FakeChat::new(Script::RewriteUnavailable);
    let svc = service(chat.clone(), 8);
    upload(&svc, "sky.pdf", &["The sky is blue."]).await;

    // first turn has no history, so no rewrite call
    let first = svc.ask("s1", "Tell me about the sky").await;
    assert!(first.error.is_none());
    let streams_before = chat.stream_calls.load(Ordering::SeqCst);

    let out = frames(&svc, "s1", "And its color?").await;
    assert_well_formed(&out);
    assert_eq!(out.len(), 2);
    match &out[0] {
        ChatFrame::Error(msg) => {
            assert!(msg.starts_with("An error occurred while generating the response"));
            assert!(msg.contains("503"));
        }
        other => panic!("expected an error frame, got {other:?}"),
    }
    assert_eq!(chat.rewrite_calls.load(Ordering::SeqCst), 1);
    assert_eq!(chat.stream_calls.load(Ordering::SeqCst), streams_before);
    assert_eq!(svc.sessions().history("s1").await.len(), 2);
}

#[tokio::test]
async fn failed_query_embedding_is_an_embedding_error() {
    let chat = FakeChat::new(Script::Grounded);
    let embedder = Arc::new(HashEmbedder::default());
    let svc = service_with(chat.clone(), embedder.clone(), 8);
    upload(&svc, "sky.pdf", &["The sky is blue."]).await;
    embedder.broken.store(true, Ordering::SeqCst);

    let out = frames(&svc, "s1", "What color is the sky?").await;
    assert_well_formed(&out);
    assert_eq!(out.len(), 2);
    assert!(matches!(&out[0], ChatFrame::Error(m) if m.starts_with("embedding failed")));
    assert_eq!(chat.stream_calls.load(Ordering::SeqCst), 0);
    assert!(svc.sessions().history("s1").await.is_empty());

    let outcome = svc.ask("s1", "What color is the sky?").await;
    assert_eq!(outcome.error_kind, Some("embedding"));
    assert!(svc.sessions().history("s1").await.is_empty());
}
