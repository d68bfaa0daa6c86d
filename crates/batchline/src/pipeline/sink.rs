use async_trait::async_trait;
use tokio::io::{AsyncWrite, AsyncWriteExt, BufWriter};
use crate::error::PipelineError;

/// Where the pipeline writes its output lines.
///
/// The pipeline is the only writer and calls [`LineSink::write_line`] in
/// input order. A line is written whole or not at all from the pipeline's
/// point of view; [`LineSink::flush`] is called once at the end of every run,
/// including failed and cancelled ones.
#[async_trait]
pub trait LineSink: Send {
    async fn write_line(&mut self, line: &str) -> Result<(), PipelineError>;

    async fn flush(&mut self) -> Result<(), PipelineError>;
}

/// A [`LineSink`] over any async writer, terminating each line with `\n`.
pub struct TextLineSink<W: AsyncWrite> {
    writer: BufWriter<W>,
    scratch: Vec<u8>,
}

impl<W> TextLineSink<W>
where W: AsyncWrite + Unpin + Send
{
    pub fn new(writer: W) -> Self {
        Self {
            writer: BufWriter::new(writer),
            scratch: Vec::new(),
        }
    }

    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}

#[async_trait]
impl<W> LineSink for TextLineSink<W>
where W: AsyncWrite + Unpin + Send
{
    async fn write_line(&mut self, line: &str) -> Result<(), PipelineError> {
        // line and terminator go out in a single write
        self.scratch.clear();
        self.scratch.extend_from_slice(line.as_bytes());
        self.scratch.push(b'\n');
        self.writer
            .write_all(&self.scratch)
            .await
            .map_err(PipelineError::io("writing output"))
    }

    async fn flush(&mut self) -> Result<(), PipelineError> {
        self.writer
            .flush()
            .await
            .map_err(PipelineError::io("flushing output"))
    }
}

/// Collects lines in memory.
#[async_trait]
impl LineSink for Vec<String> {
    async fn write_line(&mut self, line: &str) -> Result<(), PipelineError> {
        self.push(line.to_string());
        Ok(())
    }

    async fn flush(&mut self) -> Result<(), PipelineError> {
        Ok(())
    }
}
