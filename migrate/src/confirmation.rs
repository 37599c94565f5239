//! Operator confirmation for destructive steps
//!
//! Only an explicit typed `yes` proceeds. No flag or default answer can stand in
//! for it.

use std::io::{BufRead, IsTerminal};

use dialoguer::Input;
use error_stack::ResultExt;

use crate::error::{Error, Result};

/// Source of the operator's yes/no answer
pub trait ConfirmationGate {
    /// Ask `prompt`; true only for an affirmative answer
    fn confirm(&mut self, prompt: &str) -> Result<bool>;
}

/// Whether a typed answer counts as confirmation
pub fn is_affirmative(answer: &str) -> bool {
    answer.trim().eq_ignore_ascii_case("yes")
}

/// Reads the answer from the terminal, or one line of piped stdin
pub struct TerminalGate;

impl ConfirmationGate for TerminalGate {
    fn confirm(&mut self, prompt: &str) -> Result<bool> {
        let prompt = format!("{prompt} (yes/no)");
        let answer = if std::io::stdin().is_terminal() {
            Input::<String>::new()
                .with_prompt(prompt)
                .allow_empty(true)
                .interact_text()
                .change_context(unreadable())?
        } else {
            read_line_answer(&prompt, &mut std::io::stdin().lock())?
        };
        Ok(is_affirmative(&answer))
    }
}

/// Show `prompt` and take the next line of `input`; end of input reads as empty
fn read_line_answer(prompt: &str, input: &mut impl BufRead) -> Result<String> {
    println!("{prompt}");
    let mut answer = String::new();
    input.read_line(&mut answer).change_context(unreadable())?;
    Ok(answer)
}

fn unreadable() -> Error {
    Error::InvalidState("could not read confirmation".to_string())
}

/// Replays canned answers and records the prompts it was shown
#[cfg(test)]
pub struct ScriptedGate {
    answers:     std::collections::VecDeque<String>,
    pub prompts: Vec<String>,
}

#[cfg(test)]
impl ScriptedGate {
    pub fn answering(answers: &[&str]) -> Self {
        Self {
            answers: answers.iter().map(ToString::to_string).collect(),
            prompts: Vec::new(),
        }
    }
}

#[cfg(test)]
impl ConfirmationGate for ScriptedGate {
    fn confirm(&mut self, prompt: &str) -> Result<bool> {
        self.prompts.push(prompt.to_string());
        Ok(self.answers.pop_front().is_some_and(|answer| is_affirmative(&answer)))
    }
}
