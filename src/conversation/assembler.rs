//! Assembly of a streamed reply
//!
//! Pure state machine: it never renders anything itself. The session feeds it
//! chunks and forwards the partial views it returns.

/// Appended to the partial text while the reply is still arriving
pub const TYPING_INDICATOR: char = '▌';

/// Recorded as the assistant turn when generation fails
pub const FALLBACK_TEXT: &str = "Lo siento, hubo un error de conexión.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssemblerState {
    Idle,
    Accumulating,
    Finalized,
}

/// Terminal result of one assembly
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Finalized {
    /// Every non-empty chunk, concatenated in arrival order
    Answer(String),
    /// The fixed fallback text; the partial buffer is discarded
    Fallback,
}

impl Finalized {
    pub fn text(&self) -> &str {
        match self {
            Finalized::Answer(text) => text,
            Finalized::Fallback => FALLBACK_TEXT,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Finalized::Fallback)
    }
}

#[derive(Debug)]
pub struct ResponseAssembler {
    state: AssemblerState,
    buffer: String,
    chunks: usize,
    result: Option<Finalized>,
}

impl Default for ResponseAssembler {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseAssembler {
    pub fn new() -> Self {
        Self {
            state: AssemblerState::Idle,
            buffer: String::new(),
            chunks: 0,
            result: None,
        }
    }

    pub fn state(&self) -> AssemblerState {
        self.state
    }

    /// Number of non-empty chunks accepted so far
    pub fn chunk_count(&self) -> usize {
        self.chunks
    }

    /// Accept the next chunk and return the updated partial view.
    ///
    /// Empty chunks are skipped and yield `None`, as does anything arriving
    /// after finalization.
    pub fn push_chunk(&mut self, chunk: &str) -> Option<String> {
        if self.state == AssemblerState::Finalized || chunk.is_empty() {
            return None;
        }
        self.state = AssemblerState::Accumulating;
        self.buffer.push_str(chunk);
        self.chunks += 1;
        Some(self.partial_view())
    }

    /// Text received so far followed by the typing indicator
    pub fn partial_view(&self) -> String {
        let mut view = String::with_capacity(self.buffer.len() + TYPING_INDICATOR.len_utf8());
        view.push_str(&self.buffer);
        view.push(TYPING_INDICATOR);
        view
    }

    /// The stream is exhausted.
    ///
    /// A stream that produced no text at all finalizes with the fallback, so a
    /// finalized reply is never empty.
    pub fn finish(&mut self) -> Finalized {
        self.finalize(|buffer| {
            if buffer.is_empty() {
                Finalized::Fallback
            } else {
                Finalized::Answer(buffer)
            }
        })
    }

    /// The request failed, before or during streaming.
    pub fn fail(&mut self) -> Finalized {
        self.finalize(|_| Finalized::Fallback)
    }

    fn finalize(&mut self, outcome: impl FnOnce(String) -> Finalized) -> Finalized {
        if let Some(result) = &self.result {
            return result.clone();
        }
        let result = outcome(std::mem::take(&mut self.buffer));
        self.state = AssemblerState::Finalized;
        self.result = Some(result.clone());
        result
    }
}
