use std::collections::VecDeque;
use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use crate::error::PipelineError;

/// Where the pipeline reads its lines from.
///
/// The pipeline is the only reader. [`LineSource::read_line`] may block on
/// I/O; end of input is reported as `Ok(false)`, never as an error.
#[async_trait]
pub trait LineSource: Send {
    /// Reads the next line into `line` without its line terminator.
    ///
    /// `line` is cleared first. Returns `false` once the input is exhausted.
    async fn read_line(&mut self, line: &mut String) -> Result<bool, PipelineError>;
}

/// A [`LineSource`] over any buffered async reader.
///
/// Both `\n` and `\r\n` terminators are stripped. A final line without a
/// terminator is still returned.
pub struct TextLineSource<R> {
    reader: R,
}

impl<R> TextLineSource<R>
where R: AsyncBufRead + Unpin + Send
{
    pub fn new(reader: R) -> Self {
        Self { reader }
    }

    pub fn into_inner(self) -> R {
        self.reader
    }
}

#[async_trait]
impl<R> LineSource for TextLineSource<R>
where R: AsyncBufRead + Unpin + Send
{
    async fn read_line(&mut self, line: &mut String) -> Result<bool, PipelineError> {
        line.clear();
        let read = self
            .reader
            .read_line(line)
            .await
            .map_err(PipelineError::io("reading input"))?;
        if read == 0 {
            return Ok(false);
        }
        if line.ends_with('\n') {
            line.pop();
            if line.ends_with('\r') {
                line.pop();
            }
        }
        Ok(true)
    }
}

/// In-memory lines, consumed front to back.
#[async_trait]
impl LineSource for VecDeque<String> {
    async fn read_line(&mut self, line: &mut String) -> Result<bool, PipelineError> {
        line.clear();
        match self.pop_front() {
            Some(next) => {
                line.push_str(&next);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::BufReader;

    async fn collect(source: &mut impl LineSource) -> Vec<String> {
        let mut lines = vec![];
        let mut line = String::new();
        while source.read_line(&mut line).await.unwrap() {
            lines.push(line.clone());
        }
        lines
    }

    #[tokio::test]
    async fn test_strips_terminators() {
        let input: &[u8] = b"first\r\nsecond\n\nlast";
        let mut source = TextLineSource::new(BufReader::new(input));
        assert_eq!(collect(&mut source).await, vec!["first", "second", "", "last"]);
    }

    #[tokio::test]
    async fn test_empty_input_has_no_lines() {
        let input: &[u8] = b"";
        let mut source = TextLineSource::new(BufReader::new(input));
        let mut line = String::from("stale");
        assert!(!source.read_line(&mut line).await.unwrap());
        assert!(line.is_empty());
    }

    #[tokio::test]
    async fn test_in_memory_source() {
        let mut source: VecDeque<String> = ["a", "b"].into_iter().map(String::from).collect();
        assert_eq!(collect(&mut source).await, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_invalid_utf8_is_an_io_error() {
        let input: &[u8] = &[0xff, 0xfe, b'\n'];
        let mut source = TextLineSource::new(BufReader::new(input));
        let mut line = String::new();
        assert!(matches!(source.read_line(&mut line).await, Err(PipelineError::Io { .. })));
    }
}
