use std::io::{self, IsTerminal as _, Write};

use crossterm::{
    execute,
    style::{
        Attribute, Color, Print, ResetColor, SetAttribute, SetForegroundColor,
    },
};
use termimad::MadSkin;

use crate::advice::Outcome;

const WELCOME: &str = "Welcome to your Gardening Guide Assistant! How Can I Help You? (Type 'quit' to exit)";
const FAREWELL: &str = "Thank you for using the Gardening Guide Assistant.";
const INPUT_PROMPT: &str = "Type your question here or type 'quit' to exit: ";
const RESPONSE_HEADER: &str = "ASSISTANT RESPONSE:";

/// Writes everything the user sees. Without color, text is written as is.
#[non_exhaustive]
pub struct Printer<W> {
    out: W,
    color: bool,
    skin: MadSkin,
}

impl<W: Write> Printer<W> {
    #[inline]
    #[must_use]
    pub fn new(out: W, color: bool) -> Self {
        Self {
            out,
            color,
            skin: MadSkin::default(),
        }
    }

    #[inline]
    #[must_use]
    pub fn into_inner(self) -> W {
        self.out
    }

    // Cannot be a `const fn` because the escape codes are only known once
    // we know whether color is enabled.
    #[inline]
    #[must_use]
    pub fn input_prompt(&self) -> String {
        if self.color {
            format!(
                "{}{INPUT_PROMPT}{}",
                SetForegroundColor(Color::Yellow),
                ResetColor
            )
        } else {
            INPUT_PROMPT.to_owned()
        }
    }

    #[inline]
    pub fn print_welcome(&mut self) -> io::Result<()> {
        self.print_line(Color::Green, WELCOME)
    }

    #[inline]
    pub fn print_farewell(&mut self) -> io::Result<()> {
        self.print_line(Color::Green, FAREWELL)
    }

    /// Farewell after Ctrl-C, moved off the line the user was typing on.
    #[inline]
    pub fn print_interrupted_farewell(&mut self) -> io::Result<()> {
        writeln!(self.out)?;
        self.print_farewell()
    }

    #[inline]
    pub fn print_app_message(&mut self, message: &str) -> io::Result<()> {
        self.print_line(Color::Blue, message)
    }

    #[inline]
    pub fn print_outcome(&mut self, outcome: &Outcome) -> io::Result<()> {
        if self.color {
            execute!(
                self.out,
                Print("\n"),
                SetForegroundColor(Color::Cyan),
                SetAttribute(Attribute::Bold),
                Print(RESPONSE_HEADER),
                ResetColor,
                SetAttribute(Attribute::Reset),
                Print("\n\n"),
            )?;
            match *outcome {
                Outcome::Completion(ref text) => {
                    write!(self.out, "{}", self.skin.term_text(text))?;
                    self.out.flush()
                }
                Outcome::Failed(ref text) => self.print_line(Color::Red, text),
            }
        } else {
            writeln!(self.out, "\n{RESPONSE_HEADER}\n")?;
            writeln!(self.out, "{}", outcome.text())?;
            self.out.flush()
        }
    }

    fn print_line(&mut self, color: Color, text: &str) -> io::Result<()> {
        if self.color {
            execute!(
                self.out,
                SetForegroundColor(color),
                Print(text),
                ResetColor,
                Print("\n"),
            )
        } else {
            writeln!(self.out, "{text}")?;
            self.out.flush()
        }
    }
}

/// Reports an error that ends the program on stderr.
#[inline]
pub fn print_error_message(message: &str) -> io::Result<()> {
    let mut stderr = io::stderr();
    if stderr.is_terminal() {
        execute!(
            stderr,
            SetForegroundColor(Color::Red),
            SetAttribute(Attribute::Bold),
            Print("Error: "),
            ResetColor,
            SetAttribute(Attribute::Reset),
            Print(message),
            Print("\n"),
        )
    } else {
        writeln!(stderr, "Error: {message}")
    }
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "Tests should panic on failure.")]
mod tests {
    use super::*;

    fn plain() -> Printer<Vec<u8>> {
        Printer::new(Vec::new(), false)
    }

    fn output(printer: Printer<Vec<u8>>) -> String {
        String::from_utf8(printer.into_inner()).unwrap()
    }

    #[test]
    fn plain_outcome_is_verbatim() {
        let mut printer = plain();

        printer
            .print_outcome(&Outcome::Completion("Mulch *well*.".to_owned()))
            .unwrap();

        assert_eq!(output(printer), "\nASSISTANT RESPONSE:\n\nMulch *well*.\n");
    }

    #[test]
    fn plain_messages_have_no_escape_codes() {
        let mut printer = plain();
        assert_eq!(printer.input_prompt(), INPUT_PROMPT);

        printer.print_welcome().unwrap();
        printer.print_interrupted_farewell().unwrap();

        assert_eq!(output(printer), format!("{WELCOME}\n\n{FAREWELL}\n"));
    }

    #[test]
    fn colored_output_uses_escape_codes() {
        let mut printer = Printer::new(Vec::new(), true);
        assert!(printer.input_prompt().contains(INPUT_PROMPT));
        assert_ne!(printer.input_prompt(), INPUT_PROMPT);

        printer
            .print_outcome(&Outcome::Failed("An error occurred: nope".to_owned()))
            .unwrap();

        let text = output(printer);
        assert!(text.contains('\u{1b}'));
        assert!(text.contains("An error occurred: nope"));
    }
}
