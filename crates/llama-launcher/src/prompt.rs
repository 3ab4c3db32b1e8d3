//! Interactive input.
//!
//! Everything the session asks the user goes through [`Prompter`], so the
//! advisory loops can be driven by a script in tests and by a terminal in
//! the binary.

use crate::error::{LaunchError, Result};
use std::fmt::Display;
use std::str::FromStr;

pub trait Prompter {
    /// Free-text input. Empty input yields `default` when one is given,
    /// otherwise the empty string.
    fn input(&mut self, label: &str, default: Option<&str>, description: Option<&str>) -> Result<String>;

    fn confirm(&mut self, label: &str, default: bool, description: Option<&str>) -> Result<bool>;

    fn say(&mut self, message: &str);

    /// Advisory warnings. Kept separate from [`Prompter::say`] so callers can
    /// tell whether an advisory fired.
    fn warn(&mut self, message: &str);
}

/// Ask for a number until the input parses. Unparseable input never aborts
/// the session, it only earns a friendlier re-prompt.
pub fn prompt_number<P, T>(
    prompter: &mut P,
    label: &str,
    default: T,
    description: Option<&str>,
    expected: &'static str,
) -> Result<T>
where
    P: Prompter + ?Sized,
    T: FromStr + Display,
{
    let default = default.to_string();
    let mut description = description;
    loop {
        let raw = prompter.input(label, Some(&default), description)?;
        match parse_number::<T>(&raw, expected) {
            Ok(value) => return Ok(value),
            Err(e) => {
                prompter.warn(&format!("{}. Please enter a whole number.", e));
                description = None;
            }
        }
    }
}

pub fn parse_number<T: FromStr>(raw: &str, expected: &'static str) -> Result<T> {
    raw.trim().parse::<T>().map_err(|_| LaunchError::Parse {
        input: raw.trim().to_string(),
        expected,
    })
}

#[cfg(feature = "cli")]
pub use terminal::TerminalPrompter;

#[cfg(feature = "cli")]
mod terminal {
    use super::Prompter;
    use crate::error::Result;
    use dialoguer::console::style;
    use dialoguer::theme::ColorfulTheme;
    use dialoguer::{Confirm, Input};

    pub struct TerminalPrompter {
        theme: ColorfulTheme,
    }

    impl TerminalPrompter {
        pub fn new() -> Self {
            Self {
                theme: ColorfulTheme::default(),
            }
        }

        fn describe(description: Option<&str>) {
            if let Some(text) = description {
                println!("\n{}", style(format!("# {}", text)).dim());
            }
        }
    }

    impl Default for TerminalPrompter {
        fn default() -> Self {
            Self::new()
        }
    }

    impl Prompter for TerminalPrompter {
        fn input(&mut self, label: &str, default: Option<&str>, description: Option<&str>) -> Result<String> {
            Self::describe(description);
            let mut input = Input::<String>::with_theme(&self.theme)
                .with_prompt(label)
                .allow_empty(true);
            if let Some(d) = default {
                input = input.default(d.to_string());
            }
            Ok(input.interact_text()?.trim().to_string())
        }

        fn confirm(&mut self, label: &str, default: bool, description: Option<&str>) -> Result<bool> {
            Self::describe(description);
            Ok(Confirm::with_theme(&self.theme)
                .with_prompt(label)
                .default(default)
                .interact()?)
        }

        fn say(&mut self, message: &str) {
            println!("{}", message);
        }

        fn warn(&mut self, message: &str) {
            println!("\n{}", style(message).yellow().bold());
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::Prompter;
    use crate::error::{LaunchError, Result};
    use std::collections::VecDeque;

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum Answer {
        Text(String),
        Yes,
        No,
        /// Accept whatever default the prompt offers.
        Default,
        Interrupt,
    }

    pub fn text(s: &str) -> Answer {
        Answer::Text(s.to_string())
    }

    /// Replays a fixed list of answers and records what it was asked.
    #[derive(Debug, Default)]
    pub struct ScriptedPrompter {
        answers: VecDeque<Answer>,
        pub asked: Vec<String>,
        pub said: Vec<String>,
        pub warnings: Vec<String>,
    }

    impl ScriptedPrompter {
        pub fn new(answers: Vec<Answer>) -> Self {
            Self {
                answers: answers.into(),
                ..Default::default()
            }
        }

        pub fn remaining(&self) -> usize {
            self.answers.len()
        }

        fn next(&mut self, label: &str) -> Answer {
            self.asked.push(label.to_string());
            self.answers
                .pop_front()
                .unwrap_or_else(|| panic!("script ran out of answers at prompt '{}'", label))
        }
    }

    impl Prompter for ScriptedPrompter {
        fn input(&mut self, label: &str, default: Option<&str>, _description: Option<&str>) -> Result<String> {
            match self.next(label) {
                Answer::Text(s) if s.is_empty() => Ok(default.unwrap_or_default().to_string()),
                Answer::Text(s) => Ok(s),
                Answer::Default => Ok(default.unwrap_or_default().to_string()),
                Answer::Interrupt => Err(LaunchError::Interrupted),
                other => panic!("prompt '{}' expected text, script had {:?}", label, other),
            }
        }

        fn confirm(&mut self, label: &str, default: bool, _description: Option<&str>) -> Result<bool> {
            match self.next(label) {
                Answer::Yes => Ok(true),
                Answer::No => Ok(false),
                Answer::Default => Ok(default),
                Answer::Interrupt => Err(LaunchError::Interrupted),
                other => panic!("confirm '{}' expected yes/no, script had {:?}", label, other),
            }
        }

        fn say(&mut self, message: &str) {
            self.said.push(message.to_string());
        }

        fn warn(&mut self, message: &str) {
            self.warnings.push(message.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;

    #[test]
    fn test_prompt_number_uses_default_on_empty() {
        let mut prompter = ScriptedPrompter::new(vec![text("")]);
        let n: u32 = prompt_number(&mut prompter, "GPU Layers (-ngl)", 99u32, None, "layer count").unwrap();
        assert_eq!(n, 99);
        assert!(prompter.warnings.is_empty());
    }

    #[test]
    fn test_prompt_number_reprompts_on_garbage() {
        let mut prompter = ScriptedPrompter::new(vec![text("lots"), text("12")]);
        let n: u32 = prompt_number(&mut prompter, "Batch Size (-b)", 2048u32, None, "batch size").unwrap();
        assert_eq!(n, 12);
        assert_eq!(prompter.warnings.len(), 1);
        assert!(prompter.warnings[0].contains("'lots' is not a valid batch size"));
    }

    #[test]
    fn test_prompt_number_rejects_out_of_range_port() {
        let mut prompter = ScriptedPrompter::new(vec![text("70000"), text("9000")]);
        let port: u16 = prompt_number(&mut prompter, "Port (--port)", 8080u16, None, "port").unwrap();
        assert_eq!(port, 9000);
    }

    #[test]
    fn test_interrupt_propagates() {
        let mut prompter = ScriptedPrompter::new(vec![Answer::Interrupt]);
        let result: Result<u32> = prompt_number(&mut prompter, "Parallel Slots (-np)", 1u32, None, "slot count");
        assert!(matches!(result, Err(LaunchError::Interrupted)));
    }

    #[test]
    fn test_parse_number_trims() {
        assert_eq!(parse_number::<i64>(" 4096 ", "context size").unwrap(), 4096);
        assert_eq!(parse_number::<i64>("-1", "predict length").unwrap(), -1);
        assert!(parse_number::<u32>("-1", "layer count").is_err());
    }
}
