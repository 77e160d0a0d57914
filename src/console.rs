//! Operator console.
//!
//! Interactive sessions read the operator's choices line by line. The console
//! is normally attached to the standard input and output, but any stream can
//! be used.

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, Lines};

/// Operator console.
pub struct Console {
    lines: Lines<BufReader<Box<dyn AsyncRead + Unpin + Send>>>,
    output: Box<dyn AsyncWrite + Unpin + Send>,
}

impl std::fmt::Debug for Console {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
        f.debug_struct("Console").finish_non_exhaustive()
    }
}

impl Console {
    /// Creates a console on the standard input and output.
    pub fn stdio() -> Console {
        Console::new(tokio::io::stdin(), tokio::io::stdout())
    }

    /// Creates a console on the given streams.
    pub fn new(
        input: impl AsyncRead + Unpin + Send + 'static,
        output: impl AsyncWrite + Unpin + Send + 'static,
    ) -> Console {
        let input: Box<dyn AsyncRead + Unpin + Send> = Box::new(input);
        Console {
            lines: BufReader::new(input).lines(),
            output: Box::new(output),
        }
    }

    /// Writes text to the console.
    pub async fn print(&mut self, text: &str) -> Result<()> {
        self.output.write_all(text.as_bytes()).await?;
        self.output.flush().await?;
        Ok(())
    }

    /// Shows a prompt and reads the answer.
    ///
    /// Returns `None` when the input is closed.
    pub async fn prompt(&mut self, message: &str) -> Result<Option<String>> {
        self.print(message).await?;
        Ok(self
            .lines
            .next_line()
            .await?
            .map(|line| line.trim().to_string()))
    }
}
