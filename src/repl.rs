use std::io::{self, Write};

use rustyline::{error::ReadlineError, DefaultEditor};
use thiserror::Error;
use tracing::info;

use crate::{advice::Advisor, ui::Printer};

const QUIT_COMMAND: &str = "quit";

#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ReplError {
    #[error("Input/output error: {0}.")]
    Io(#[from] io::Error),
    #[error("{0}.")]
    Readline(#[from] ReadlineError),
}

#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Line(String),
    Interrupted,
    Eof,
}

/// Source of user input, one line per call.
pub trait LineReader {
    fn read_line(&mut self, prompt: &str) -> Result<Input, ReadlineError>;
}

impl LineReader for DefaultEditor {
    #[inline]
    fn read_line(&mut self, prompt: &str) -> Result<Input, ReadlineError> {
        match self.readline(prompt) {
            Ok(line) => {
                if !line.trim().is_empty() {
                    self.add_history_entry(line.as_str())?;
                }
                Ok(Input::Line(line))
            }
            Err(ReadlineError::Interrupted) => Ok(Input::Interrupted),
            Err(ReadlineError::Eof) => Ok(Input::Eof),
            Err(err) => Err(err),
        }
    }
}

/// Everything one interactive run needs, owned by the loop itself.
#[non_exhaustive]
pub struct Session<R, W> {
    reader: R,
    printer: Printer<W>,
    advisor: Advisor,
}

impl<R: LineReader, W: Write> Session<R, W> {
    #[inline]
    #[must_use]
    pub fn new(reader: R, printer: Printer<W>, advisor: Advisor) -> Self {
        Self {
            reader,
            printer,
            advisor,
        }
    }

    #[cfg(test)]
    fn into_parts(self) -> (R, Printer<W>) {
        (self.reader, self.printer)
    }

    /// Reads questions until the user quits, closes the input or presses
    /// Ctrl-C at the prompt. Service failures are shown inline and do not
    /// end the loop.
    ///
    /// An interrupt signal outside the line editor is not seen here; the
    /// binary handles it for the whole process.
    #[inline]
    pub async fn run(&mut self) -> Result<(), ReplError> {
        self.printer.print_welcome()?;
        let prompt = self.printer.input_prompt();

        loop {
            match self.reader.read_line(&prompt)? {
                Input::Line(line) if is_quit(&line) => {
                    self.printer.print_farewell()?;
                    break;
                }
                Input::Line(line) if line.trim().is_empty() => {}
                Input::Line(line) => {
                    answer(&self.advisor, &mut self.printer, &line).await?;
                }
                Input::Interrupted => {
                    info!("interrupted at the prompt");
                    self.printer.print_interrupted_farewell()?;
                    break;
                }
                Input::Eof => {
                    self.printer.print_farewell()?;
                    break;
                }
            }
        }

        Ok(())
    }
}

/// Answers a single question without entering the loop.
#[inline]
pub async fn ask_once<W: Write>(
    advisor: &Advisor,
    printer: &mut Printer<W>,
    question: &str,
) -> Result<(), ReplError> {
    answer(advisor, printer, question).await
}

#[inline]
#[must_use]
pub fn is_quit(line: &str) -> bool {
    line.trim().eq_ignore_ascii_case(QUIT_COMMAND)
}

async fn answer<W: Write>(
    advisor: &Advisor,
    printer: &mut Printer<W>,
    input: &str,
) -> Result<(), ReplError> {
    let turn = advisor.advise(input).await;
    info!(
        topic = %turn.topic,
        failed = turn.outcome.is_failed(),
        "turn finished"
    );
    printer.print_outcome(&turn.outcome)?;
    Ok(())
}
