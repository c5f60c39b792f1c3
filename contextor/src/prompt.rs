//! Prompt builders: rewrite instruction, grounding instruction and the
//! budgeted context block.

use ai_llm_service::ChatMessage;
use rag_store::RagHit;

use crate::session::{ChatTurn, Speaker};

/// Instruction for turning a follow-up into a standalone question.
pub const CONTEXTUALIZE_SYSTEM: &str = "Given a chat history and the latest user question \
which might reference context in the chat history, formulate a standalone question \
which can be understood without the chat history. Do NOT answer the question, \
just reformulate it if needed and otherwise return it as is.";

/// Grounding instruction; the context block is appended after a blank line.
pub const QA_SYSTEM: &str = "You are an assistant for question-answering tasks. \
Use the following pieces of retrieved context to answer the question. \
If you don't know the answer, just say that you don't know. \
Use three sentences maximum and keep the answer concise.";

/// Retrieved chunks in ranked order, each labelled with its page, cut to at
/// most `max_chars` bytes.
///
/// # Example
/// ```
/// # use contextor::prompt::build_context;
/// assert_eq!(build_context(&[], 100), "");
/// ```
pub fn build_context(hits: &[RagHit], max_chars: usize) -> String {
    let mut out = String::new();
    let mut budget = max_chars;

    for (i, h) in hits.iter().enumerate() {
        let header = if i == 0 {
            format!("[page {}]\n", h.chunk.page)
        } else {
            format!("\n\n[page {}]\n", h.chunk.page)
        };
        let text = h.chunk.text.trim();

        if header.len() >= budget {
            break;
        }
        out.push_str(&header);
        budget -= header.len();

        if text.len() > budget {
            out.push_str(safe_truncate(text, budget));
            break;
        }
        out.push_str(text);
        budget -= text.len();
    }

    out
}

/// [`QA_SYSTEM`] followed by the context block.
pub fn qa_system(hits: &[RagHit], max_chars: usize) -> String {
    format!("{QA_SYSTEM}\n\n{}", build_context(hits, max_chars))
}

/// `system`, then the history as alternating messages, then `question`.
pub fn to_messages(system: &str, history: &[ChatTurn], question: &str) -> Vec<ChatMessage> {
    let mut msgs = Vec::with_capacity(history.len() + 2);
    msgs.push(ChatMessage::system(system));
    msgs.extend(history.iter().map(|t| match t.speaker {
        Speaker::User => ChatMessage::user(t.text.as_str()),
        Speaker::Assistant => ChatMessage::assistant(t.text.as_str()),
    }));
    msgs.push(ChatMessage::user(question));
    msgs
}

fn safe_truncate(s: &str, max: usize) -> &str {
    if s.len() <= max {
        s
    } else {
        let mut end = max;
        while end > 0 && !s.is_char_boundary(end) {
            end -= 1;
        }
        &s[..end]
    }
}
