use std::fmt::Display;
use std::io::{self, Write};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Stdin};

const RULE_WIDTH: usize = 70;

pub type Terminal = Console<BufReader<Stdin>, io::Stdout>;

/// Line-oriented prompts and output
///
/// Reads answers from any async line source so the flow can be driven from
/// byte buffers in tests.
pub struct Console<R, W> {
    input: R,
    output: W,
}

impl Terminal {
    pub fn stdio() -> Self {
        Console::new(BufReader::new(tokio::io::stdin()), io::stdout())
    }
}

impl<R, W> Console<R, W>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// Print `label`, then read one trimmed line. End of input reads as an empty answer.
    pub async fn prompt(&mut self, label: &str) -> io::Result<String> {
        write!(self.output, "{}", label)?;
        self.output.flush()?;

        let mut answer = String::new();
        self.input.read_line(&mut answer).await?;
        Ok(answer.trim().to_string())
    }

    pub fn line(&mut self, text: impl Display) -> io::Result<()> {
        writeln!(self.output, "{}", text)
    }

    pub fn blank(&mut self) -> io::Result<()> {
        writeln!(self.output)
    }

    /// Title framed by `=` rules, with blank lines around it
    pub fn header(&mut self, title: &str) -> io::Result<()> {
        let rule = "=".repeat(RULE_WIDTH);
        writeln!(self.output, "\n{}\n{}\n{}\n", rule, title, rule)
    }

    pub fn rule(&mut self, ch: char) -> io::Result<()> {
        writeln!(self.output, "{}", ch.to_string().repeat(RULE_WIDTH))
    }

    pub fn into_output(self) -> W {
        self.output
    }
}
