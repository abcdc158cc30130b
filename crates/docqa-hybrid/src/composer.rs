use std::sync::Arc;

use tracing::debug;

use docqa_core::error::{Error, Result};
use docqa_core::traits::Generator;
use docqa_core::types::FileTypeMode;

pub const DOCUMENT_SYSTEM_PROMPT: &str =
    "You are a helpful assistant. Answer the question based only on the provided context.";

pub const TABULAR_SYSTEM_PROMPT: &str = "You are a helpful assistant. The context consists of rows from a table, \
one row per passage. Answer the question based only on the provided context.";

const PASSAGE_SEPARATOR: &str = "\n\n";

pub fn system_prompt(mode: FileTypeMode) -> &'static str {
    match mode {
        FileTypeMode::Document => DOCUMENT_SYSTEM_PROMPT,
        FileTypeMode::Tabular => TABULAR_SYSTEM_PROMPT,
    }
}

/// Join passages with a blank line, keeping whole passages while they fit in `max_chars`.
/// A first passage that alone exceeds the bound is cut at a character boundary.
pub fn build_context(passages: &[&str], max_chars: usize) -> String {
    let mut context = String::new();
    let mut used = 0usize;
    for passage in passages {
        let len = passage.chars().count();
        if context.is_empty() {
            if len > max_chars {
                context.extend(passage.chars().take(max_chars));
                break;
            }
            context.push_str(passage);
            used = len;
            continue;
        }
        let needed = PASSAGE_SEPARATOR.len() + len;
        if used + needed > max_chars {
            break;
        }
        context.push_str(PASSAGE_SEPARATOR);
        context.push_str(passage);
        used += needed;
    }
    context
}

/// Frames retrieved passages for the generator.
pub struct AnswerComposer {
    generator: Arc<dyn Generator>,
    max_context_chars: usize,
}

impl AnswerComposer {
    pub fn new(generator: Arc<dyn Generator>, max_context_chars: usize) -> Self {
        Self { generator, max_context_chars }
    }

    /// `passages` are in fused order. An empty list still reaches the generator.
    pub fn compose(&self, question: &str, passages: &[&str], mode: FileTypeMode) -> Result<String> {
        let context = build_context(passages, self.max_context_chars);
        debug!(%mode, passages = passages.len(), context_chars = context.chars().count(), "composing answer");
        match self.generator.generate(system_prompt(mode), question, &context) {
            Ok(text) => Ok(text),
            Err(e @ (Error::Timeout { .. } | Error::Generation(_))) => Err(e),
            Err(other) => Err(Error::generation(other)),
        }
    }
}
