//! Chat frames and their SSE wire form.

use std::fmt;

/// Payload that closes every chat stream.
pub const END_OF_STREAM: &str = "[END_OF_STREAM]";
/// Prefix of error payloads.
pub const ERROR_PREFIX: &str = "[ERROR] ";

/// One element of a streamed chat answer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChatFrame {
    Token(String),
    Error(String),
    End,
}

impl ChatFrame {
    /// Single-line payload: line breaks become `<br>`.
    pub fn payload(&self) -> String {
        match self {
            ChatFrame::Token(text) => escape_breaks(text),
            ChatFrame::Error(msg) => format!("{ERROR_PREFIX}{}", escape_breaks(msg)),
            ChatFrame::End => END_OF_STREAM.to_string(),
        }
    }

    /// Full SSE frame: `data: <payload>\n\n`.
    pub fn encode(&self) -> String {
        format!("data: {}\n\n", self.payload())
    }

    pub fn is_end(&self) -> bool {
        matches!(self, ChatFrame::End)
    }
}

impl fmt::Display for ChatFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.payload())
    }
}

fn escape_breaks(s: &str) -> String {
    s.replace("\r\n", "<br>")
        .replace('\n', "<br>")
        .replace('\r', "<br>")
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn wire_forms() {
        assert_eq!(ChatFrame::Token("hi".into()).encode(), "data: hi\n\n");
        assert_eq!(
            ChatFrame::Error("boom".into()).encode(),
            "data: [ERROR] boom\n\n"
        );
        assert_eq!(ChatFrame::End.encode(), "data: [END_OF_STREAM]\n\n");
    }

    #[test]
    fn line_breaks_are_escaped_once() {
        assert_eq!(
            ChatFrame::Token("a\r\nb\nc\rd".into()).payload(),
            "a<br>b<br>c<br>d"
        );
    }

    proptest! {
        #[test]
        fn payload_never_contains_line_breaks(text in "[a-z\r\n ]{0,64}") {
            let p = ChatFrame::Token(text.clone()).payload();
            prop_assert!(!p.contains('\n') && !p.contains('\r'));
            let p = ChatFrame::Error(text).payload();
            prop_assert!(!p.contains('\n') && !p.contains('\r'));
        }
    }
}
