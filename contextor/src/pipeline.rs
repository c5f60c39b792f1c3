//! Chat orchestration: history-aware retrieval, then a streamed answer.
//!
//! Each request runs as its own producer task feeding a bounded channel:
//!
//! ```text
//! NoDocument ─────────────────────────────┐
//! Retrieving ─ok→ Generating ─ok→ Done ───┤→ End
//!      └─err──────────┴─err→ Failed ──────┘
//! ```
//!
//! A stream carries exactly one [`ChatFrame::End`], preceded by at most one
//! [`ChatFrame::Error`].

use std::sync::Arc;
use std::time::Instant;

use futures::StreamExt;
use rag_store::{IngestReport, RagHit, RagStore, Retriever};
use rag_store::extract::pdf_to_document_blocking;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info, warn};

use crate::api_types::{AskOutcome, UsedChunk};
use crate::cfg::ContextorConfig;
use crate::error::ContextorError;
use crate::frame::ChatFrame;
use crate::generate::AnswerGenerator;
use crate::llm::ChatModel;
use crate::retriever::HistoryAwareRetriever;
use crate::rewrite::QueryRewriter;
use crate::session::SessionStore;

/// What a finished turn produced.
struct Turn {
    standalone: String,
    hits: Vec<RagHit>,
}

/// The RAG chat service shared by all requests.
pub struct RagChat {
    cfg: ContextorConfig,
    store: Arc<RagStore>,
    sessions: Arc<SessionStore>,
    rewriter: QueryRewriter,
    generator: AnswerGenerator,
}

impl RagChat {
    pub fn new(
        cfg: ContextorConfig,
        store: Arc<RagStore>,
        sessions: Arc<SessionStore>,
        chat: Arc<dyn ChatModel>,
    ) -> Self {
        Self {
            rewriter: QueryRewriter::new(chat.clone()),
            generator: AnswerGenerator::new(chat, cfg.max_ctx_chars),
            cfg,
            store,
            sessions,
        }
    }

    pub fn config(&self) -> &ContextorConfig {
        &self.cfg
    }

    pub fn store(&self) -> &Arc<RagStore> {
        &self.store
    }

    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    /// Extracts, chunks and embeds a PDF, then makes it the current document.
    /// On error the previous document stays current.
    pub async fn ingest_pdf(
        &self,
        bytes: Vec<u8>,
        name: String,
    ) -> Result<IngestReport, ContextorError> {
        let started = Instant::now();
        let doc = pdf_to_document_blocking(bytes, name)
            .await
            .map_err(ContextorError::from_ingest)?;
        let report = self
            .store
            .ingest(&doc)
            .await
            .map_err(ContextorError::from_ingest)?;
        info!(
            document = %report.document.name,
            generation = report.generation,
            chunks = report.chunks,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "upload processed"
        );
        Ok(report)
    }

    /// Starts a chat turn and returns its frames.
    ///
    /// The turn runs on its own task. Dropping the returned stream stops the
    /// task at its next send.
    pub fn chat_stream(
        self: &Arc<Self>,
        session_id: String,
        question: String,
    ) -> ReceiverStream<ChatFrame> {
        let (tx, rx) = mpsc::channel(self.cfg.stream_buffer);
        let this = Arc::clone(self);
        tokio::spawn(async move {
            if let Err(e) = this.produce(&tx, &session_id, &question).await {
                let _ = tx.send(ChatFrame::Error(e.to_string())).await;
            }
            let _ = tx.send(ChatFrame::End).await;
        });
        ReceiverStream::new(rx)
    }

    /// Runs one turn to completion and collects its output.
    pub async fn ask(&self, session_id: &str, question: &str) -> AskOutcome {
        let (tx, mut rx) = mpsc::channel(self.cfg.stream_buffer);
        let produce = async move {
            let result = self.produce(&tx, session_id, question).await;
            drop(tx);
            result
        };
        let collect = async {
            let mut answer = String::new();
            while let Some(frame) = rx.recv().await {
                if let ChatFrame::Token(t) = frame {
                    answer.push_str(&t);
                }
            }
            answer
        };
        let (result, answer) = tokio::join!(produce, collect);

        let mut outcome = AskOutcome {
            session_id: session_id.to_string(),
            answer,
            error: None,
            error_kind: None,
            standalone_question: None,
            context: Vec::new(),
        };
        match result {
            Ok(Some(turn)) => {
                outcome.standalone_question = Some(turn.standalone);
                outcome.context = turn.hits.iter().map(UsedChunk::from_hit).collect();
            }
            Ok(None) => {}
            Err(e) => {
                outcome.error_kind = Some(e.kind());
                outcome.error = Some(e.to_string());
            }
        }
        outcome
    }

    /// Sends answer tokens to `tx`. `Ok(None)` means the receiver went away.
    async fn produce(
        &self,
        tx: &mpsc::Sender<ChatFrame>,
        session_id: &str,
        question: &str,
    ) -> Result<Option<Turn>, ContextorError> {
        let started = Instant::now();
        // snapshot once; a concurrent upload does not affect this turn
        let Some(retriever) = self.store.retriever().await else {
            debug!(session = %session_id, "chat without a document");
            return Err(ContextorError::NoDocument);
        };
        let generation = retriever.index().generation();
        let retriever: Arc<dyn Retriever> = Arc::new(retriever);

        let history = self.sessions.history(session_id).await;
        let retrieval = HistoryAwareRetriever::new(self.rewriter.clone(), retriever)
            .retrieve(&history, question, self.store.config().top_k)
            .await
            .inspect_err(|e| warn!(session = %session_id, error = %e, "retrieval failed"))?;

        let mut fragments = self
            .generator
            .generate_streaming(&retrieval.standalone, &retrieval.hits, &history)
            .await?;

        let mut answer = String::new();
        while let Some(fragment) = fragments.next().await {
            let fragment = fragment
                .inspect_err(|e| warn!(session = %session_id, error = %e, "generation failed"))?;
            answer.push_str(&fragment);
            if tx.send(ChatFrame::Token(fragment)).await.is_err() {
                debug!(session = %session_id, "client went away");
                return Ok(None);
            }
        }

        self.sessions.append(session_id, question, &answer).await;
        info!(
            session = %session_id,
            generation,
            history_turns = history.len(),
            hits = retrieval.hits.len(),
            answer_chars = answer.chars().count(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "chat turn completed"
        );
        Ok(Some(Turn {
            standalone: retrieval.standalone,
            hits: retrieval.hits,
        }))
    }
}
