//! Accumulates streamed fragments into a complete response while the
//! renderer shows the text so far.

use futures::StreamExt;

use crate::client::FragmentStream;
use crate::render::Renderer;
use crate::Result;

/// Concatenates response fragments in arrival order.
///
/// Every [`push`](StreamSink::push) hands the whole text accumulated so far to
/// the renderer; nothing is buffered beyond the concatenation.
#[derive(Debug, Default, Clone)]
pub struct StreamSink {
    text: String,
    fragments: usize,
}

impl StreamSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a fragment and shows the updated text.
    pub fn push<R: Renderer + ?Sized>(&mut self, fragment: &str, renderer: &mut R) {
        self.text.push_str(fragment);
        self.fragments += 1;
        renderer.update_response(&self.text);
    }

    /// The text accumulated so far.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// How many fragments have been pushed.
    pub fn fragments(&self) -> usize {
        self.fragments
    }

    /// The complete text.
    pub fn finish(self) -> String {
        self.text
    }

    /// Pushes every fragment of `stream` and returns the complete text.
    ///
    /// The first error ends consumption; the partial text is dropped.
    pub async fn consume<R: Renderer + ?Sized>(
        mut self,
        mut stream: FragmentStream,
        renderer: &mut R,
    ) -> Result<String> {
        while let Some(fragment) = stream.next().await {
            self.push(&fragment?, renderer);
        }
        Ok(self.finish())
    }
}
