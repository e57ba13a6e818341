//! User interface implementations

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Result, anyhow};
use console::{Term, style};
use dialoguer::{Input, theme::ColorfulTheme};
use indicatif::{ProgressBar, ProgressStyle};

use flowkeys_runtime::deps::{InputInterrupted, MessageStyle, ProgressIndicator, UserInterface};

const YES_ANSWERS: &[&str] = &["y", "yes", "是"];
const NO_ANSWERS: &[&str] = &["n", "no", "否"];

/// Interpret a yes/no answer. An empty answer selects `default`;
/// unrecognised answers yield `None`.
pub fn parse_confirmation(answer: &str, default: bool) -> Option<bool> {
    let answer = answer.trim().to_lowercase();
    if answer.is_empty() {
        return Some(default);
    }
    if YES_ANSWERS.contains(&answer.as_str()) {
        return Some(true);
    }
    if NO_ANSWERS.contains(&answer.as_str()) {
        return Some(false);
    }
    None
}

fn prompt_error(error: dialoguer::Error) -> anyhow::Error {
    match error {
        dialoguer::Error::IO(io) if io.kind() == std::io::ErrorKind::Interrupted => {
            anyhow::Error::new(InputInterrupted)
        }
        other => anyhow!("Failed to get input: {}", other),
    }
}

/// Production UI implementation using console, dialoguer and indicatif
pub struct RealUserInterface;

impl UserInterface for RealUserInterface {
    fn create_spinner(&self) -> Box<dyn ProgressIndicator> {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        Box::new(RealProgressIndicator { pb })
    }

    fn print(&self, message: &str) {
        println!("{message}");
    }

    fn print_styled(&self, message: &str, msg_style: MessageStyle) {
        let styled = match msg_style {
            MessageStyle::Normal => message.to_string(),
            MessageStyle::Bold => style(message).bold().to_string(),
            MessageStyle::Cyan => style(message).cyan().to_string(),
            MessageStyle::Green => style(message).green().to_string(),
            MessageStyle::Red => style(message).red().to_string(),
            MessageStyle::Yellow => style(message).yellow().to_string(),
            MessageStyle::Warning => style(message).yellow().bold().to_string(),
            MessageStyle::Error => style(message).red().bold().to_string(),
            MessageStyle::Success => style(message).green().bold().to_string(),
        };
        println!("{styled}");
    }

    fn is_interactive(&self) -> bool {
        Term::stdout().is_term()
    }

    fn prompt_input(&self, prompt: &str, default: Option<&str>) -> Result<String> {
        let theme = ColorfulTheme::default();
        let mut input = Input::<String>::with_theme(&theme)
            .with_prompt(prompt)
            .allow_empty(true);

        if let Some(default_val) = default {
            input = input.default(default_val.to_string());
        }

        input
            .interact_text()
            .map(|value| value.trim().to_string())
            .map_err(prompt_error)
    }

    fn prompt_confirm(&self, prompt: &str, default: bool) -> Result<bool> {
        let theme = ColorfulTheme::default();
        let suffix = if default { "[Y/n]" } else { "[y/N]" };

        loop {
            let answer = Input::<String>::with_theme(&theme)
                .with_prompt(format!("{prompt} {suffix}"))
                .allow_empty(true)
                .interact_text()
                .map_err(prompt_error)?;

            if let Some(confirmed) = parse_confirmation(&answer, default) {
                return Ok(confirmed);
            }
            self.print_styled("Please answer y or n", MessageStyle::Error);
        }
    }
}

struct RealProgressIndicator {
    pb: ProgressBar,
}

impl ProgressIndicator for RealProgressIndicator {
    fn set_message(&self, message: &str) {
        self.pb.set_message(message.to_string());
    }

    fn enable_steady_tick(&self, duration: Duration) {
        self.pb.enable_steady_tick(duration);
    }

    fn finish_and_clear(&self) {
        self.pb.finish_and_clear();
    }
}

// Test implementations for mocking

/// Test UI implementation that captures output and replays scripted answers
pub struct TestUserInterface {
    /// Every printed line, styled or not
    pub output: Arc<Mutex<Vec<String>>>,
    /// Styled lines with their style
    pub styled_output: Arc<Mutex<Vec<(String, MessageStyle)>>>,
    /// Prompts shown, in order
    pub prompts: Arc<Mutex<Vec<String>>>,
    inputs: Mutex<VecDeque<String>>,
}

impl TestUserInterface {
    /// Scripted answer that simulates Ctrl-C at a prompt
    pub const INTERRUPT: &'static str = "<ctrl-c>";

    /// Create a UI with no scripted answers
    pub fn new() -> Self {
        Self::with_inputs(Vec::<String>::new())
    }

    /// Create a UI that answers prompts from `inputs`, in order
    pub fn with_inputs<I, S>(inputs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            output: Arc::new(Mutex::new(Vec::new())),
            styled_output: Arc::new(Mutex::new(Vec::new())),
            prompts: Arc::new(Mutex::new(Vec::new())),
            inputs: Mutex::new(inputs.into_iter().map(Into::into).collect()),
        }
    }

    /// Captured output lines
    pub fn get_output(&self) -> Vec<String> {
        self.output.lock().map(|o| o.clone()).unwrap_or_default()
    }

    /// Captured styled output lines
    pub fn get_styled_output(&self) -> Vec<(String, MessageStyle)> {
        self.styled_output
            .lock()
            .map(|o| o.clone())
            .unwrap_or_default()
    }

    /// Prompts shown so far
    pub fn get_prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }

    /// Whether any output line contains `needle`
    pub fn output_contains(&self, needle: &str) -> bool {
        self.get_output().iter().any(|line| line.contains(needle))
    }

    fn next_input(&self, prompt: &str) -> Result<Option<String>> {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }
        let next = self
            .inputs
            .lock()
            .map_err(|_| anyhow!("scripted input lock poisoned"))?
            .pop_front();
        match next {
            Some(answer) if answer == Self::INTERRUPT => Err(anyhow::Error::new(InputInterrupted)),
            other => Ok(other),
        }
    }
}

impl Default for TestUserInterface {
    fn default() -> Self {
        Self::new()
    }
}

impl UserInterface for TestUserInterface {
    fn create_spinner(&self) -> Box<dyn ProgressIndicator> {
        Box::new(TestProgressIndicator {
            messages: Arc::new(Mutex::new(Vec::new())),
        })
    }

    fn print(&self, message: &str) {
        if let Ok(mut output) = self.output.lock() {
            output.push(message.to_string());
        }
    }

    fn print_styled(&self, message: &str, style: MessageStyle) {
        // Add to both styled output and regular output for easier testing
        if let Ok(mut styled) = self.styled_output.lock() {
            styled.push((message.to_string(), style));
        }
        self.print(message);
    }

    fn is_interactive(&self) -> bool {
        false
    }

    fn prompt_input(&self, prompt: &str, default: Option<&str>) -> Result<String> {
        match self.next_input(prompt)? {
            Some(answer) => Ok(answer.trim().to_string()),
            None => default
                .map(ToString::to_string)
                .ok_or_else(|| anyhow!("no scripted input for prompt: {}", prompt)),
        }
    }

    fn prompt_confirm(&self, prompt: &str, default: bool) -> Result<bool> {
        loop {
            let answer = self
                .next_input(prompt)?
                .ok_or_else(|| anyhow!("no scripted input for prompt: {}", prompt))?;
            if let Some(confirmed) = parse_confirmation(&answer, default) {
                return Ok(confirmed);
            }
            self.print_styled("Please answer y or n", MessageStyle::Error);
        }
    }
}

struct TestProgressIndicator {
    messages: Arc<Mutex<Vec<String>>>,
}

impl ProgressIndicator for TestProgressIndicator {
    fn set_message(&self, message: &str) {
        if let Ok(mut messages) = self.messages.lock() {
            messages.push(message.to_string());
        }
    }

    fn enable_steady_tick(&self, _duration: Duration) {}

    fn finish_and_clear(&self) {}
}

#[cfg(test)]
#[path = "ui_tests.rs"]
mod tests;
