use std::fmt::Display;

use crossterm::tty::IsTty;
use inquire::ui::{Attributes, Color, RenderConfig, StyleSheet, Styled};

use super::TERMINAL_STDERR;

/// Disables all prompts if set to `1`
pub const PAWMATCH_NO_PROMPT_VAR: &str = "_PAWMATCH_NO_PROMPT";

#[derive(Debug, Clone)]
pub struct Confirm {
    pub default: Option<bool>,
}

#[derive(Clone)]
pub struct Select<T> {
    pub options: Vec<T>,
}

#[derive(Clone)]
pub struct MultiSelect<T> {
    pub options: Vec<T>,
    /// Indices of the options that start out selected
    pub selected: Vec<usize>,
}

#[derive(Debug, Clone)]
pub struct Text {
    pub default: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Dialog<'a, Type> {
    pub message: &'a str,
    pub help_message: Option<&'a str>,
    pub typed: Type,
}

impl Dialog<'_, Confirm> {
    pub async fn prompt(self) -> inquire::error::InquireResult<bool> {
        let message = self.message.to_owned();
        let help_message: Option<String> = self.help_message.map(ToOwned::to_owned);
        let default = self.typed.default;

        run_blocking(move || {
            let _stderr_lock = TERMINAL_STDERR.lock();

            let mut dialog = inquire::Confirm::new(&message).with_render_config(pawmatch_theme());

            if let Some(default) = default {
                dialog = dialog.with_default(default);
            }

            if let Some(ref help_message) = help_message {
                dialog = dialog.with_help_message(help_message);
            }

            dialog.prompt()
        })
        .await
    }
}

impl Dialog<'_, Text> {
    /// Prompt for a non-empty line of text
    pub async fn prompt(self) -> inquire::error::InquireResult<String> {
        let message = self.message.to_owned();
        let help_message: Option<String> = self.help_message.map(ToOwned::to_owned);
        let default = self.typed.default;

        run_blocking(move || {
            let _stderr_lock = TERMINAL_STDERR.lock();

            let mut dialog = inquire::Text::new(&message)
                .with_render_config(pawmatch_theme())
                .with_validator(inquire::required!());

            if let Some(ref default) = default {
                dialog = dialog.with_default(default);
            }

            if let Some(ref help_message) = help_message {
                dialog = dialog.with_help_message(help_message);
            }

            dialog.prompt()
        })
        .await
    }
}

struct Choice(usize, String);
impl Display for Choice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.1.fmt(f)
    }
}

fn choices<T: Display>(options: &[T]) -> Vec<Choice> {
    options
        .iter()
        .map(ToString::to_string)
        .enumerate()
        .map(|(id, value)| Choice(id, value))
        .collect()
}

impl<T: Display> Dialog<'_, Select<T>> {
    pub async fn prompt(self) -> inquire::error::InquireResult<T> {
        let message = self.message.to_owned();
        let help_message = self.help_message.map(ToOwned::to_owned);
        let mut options = self.typed.options;
        let choices = choices(&options);

        let Choice(id, _) = run_blocking(move || {
            let _stderr_lock = TERMINAL_STDERR.lock();

            let mut dialog =
                inquire::Select::new(&message, choices).with_render_config(pawmatch_theme());

            if let Some(ref help_message) = help_message {
                dialog = dialog.with_help_message(help_message);
            }

            dialog.prompt()
        })
        .await?;

        Ok(options.remove(id))
    }
}

impl<T: Display> Dialog<'_, MultiSelect<T>> {
    /// Returns the indices of the selected options
    pub async fn prompt(self) -> inquire::error::InquireResult<Vec<usize>> {
        let message = self.message.to_owned();
        let help_message = self.help_message.map(ToOwned::to_owned);
        let choices = choices(&self.typed.options);
        let selected = self.typed.selected;

        let chosen = run_blocking(move || {
            let _stderr_lock = TERMINAL_STDERR.lock();

            let mut dialog = inquire::MultiSelect::new(&message, choices)
                .with_render_config(pawmatch_theme())
                .with_default(&selected);

            if let Some(ref help_message) = help_message {
                dialog = dialog.with_help_message(help_message);
            }

            dialog.prompt()
        })
        .await?;

        Ok(chosen.into_iter().map(|Choice(id, _)| id).collect())
    }
}

impl Dialog<'_, ()> {
    /// True if stderr and stdin are ttys
    pub fn can_prompt() -> bool {
        if std::env::var(PAWMATCH_NO_PROMPT_VAR).is_ok_and(|v| v == "1") {
            return false;
        }
        std::io::stderr().is_tty() && std::io::stdin().is_tty()
    }
}

/// Run a blocking prompt without stalling the async runtime
async fn run_blocking<T: Send + 'static>(
    f: impl FnOnce() -> inquire::error::InquireResult<T> + Send + 'static,
) -> inquire::error::InquireResult<T> {
    match tokio::task::spawn_blocking(f).await {
        Ok(result) => result,
        Err(e) => Err(inquire::InquireError::Custom(Box::new(e))),
    }
}

pub fn pawmatch_theme() -> RenderConfig<'static> {
    let mut render_config = RenderConfig::default_colored();

    render_config.answered_prompt_prefix = Styled::new(">").with_fg(Color::LightMagenta);
    render_config.highlighted_option_prefix = Styled::new(">").with_fg(Color::LightMagenta);
    render_config.prompt_prefix = Styled::new("?").with_fg(Color::LightMagenta);
    render_config.prompt = StyleSheet::new().with_attr(Attributes::BOLD);
    render_config.help_message = Styled::new("").with_fg(Color::LightCyan).style;
    render_config.answer = Styled::new("").with_fg(Color::LightMagenta).style;

    render_config
}
