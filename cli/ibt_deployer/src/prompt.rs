//! Line-oriented prompts and the question script that turns answers into a
//! [`DeploymentConfig`].
//!
//! Generic over the reader and writer so the script runs headlessly in tests.

use std::fmt::Display;
use std::io::{BufRead, Write};

use crate::errors::{DeployerError, Result};
use crate::templates::{
    self, ConfigOverrides, Template, DEFAULT_DECIMALS, DEFAULT_INITIAL_SUPPLY, TEMPLATES,
};
use crate::types::DeploymentConfig;

const DEFAULT_TOKEN_NAME: &str = "Test Stablecoin";
const DEFAULT_TOKEN_SYMBOL: &str = "TSC";
const DEFAULT_RATE_PERCENT: f64 = 5.0;

pub struct Prompter<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Prompter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    pub fn say(&mut self, line: impl Display) -> Result<()> {
        writeln!(self.output, "{line}")?;
        Ok(())
    }

    /// Print `question` and read one trimmed line. End of input reads as empty.
    pub fn ask(&mut self, question: &str) -> Result<String> {
        write!(self.output, "{question}")?;
        self.output.flush()?;
        let mut line = String::new();
        self.input.read_line(&mut line)?;
        Ok(line.trim().to_string())
    }

    /// Empty answers become `None`.
    pub fn ask_optional(&mut self, question: &str) -> Result<Option<String>> {
        let answer = self.ask(question)?;
        Ok((!answer.is_empty()).then_some(answer))
    }

    /// Empty answers fall back to `default`; anything else must parse.
    pub fn ask_parsed<T>(&mut self, question: &str, field: &str, default: T) -> Result<T>
    where
        T: std::str::FromStr,
    {
        match self.ask_optional(question)? {
            None => Ok(default),
            Some(answer) => answer.parse().map_err(|_| {
                DeployerError::Configuration(format!("Invalid {field}: {answer:?}"))
            }),
        }
    }

    /// `y`/`yes` and `n`/`no` in any case; anything else takes `default`.
    pub fn confirm(&mut self, question: &str, default: bool) -> Result<bool> {
        let answer = self.ask(question)?.to_ascii_lowercase();
        Ok(match answer.as_str() {
            "y" | "yes" => true,
            "n" | "no" => false,
            _ => default,
        })
    }

    #[cfg(test)]
    pub fn into_output(self) -> W {
        self.output
    }
}

/// Ask for a template (or custom fields) and resolve the answers.
pub fn collect_config<R: BufRead, W: Write>(
    prompter: &mut Prompter<R, W>,
) -> Result<DeploymentConfig> {
    let template = select_template(prompter)?;
    let overrides = match template {
        Some(template) => template_overrides(prompter, template)?,
        None => custom_overrides(prompter)?,
    };
    templates::resolve(template, overrides)
}

fn select_template<R: BufRead, W: Write>(
    prompter: &mut Prompter<R, W>,
) -> Result<Option<&'static Template>> {
    prompter.say("")?;
    prompter.say("Available templates:")?;
    for (i, t) in TEMPLATES.iter().enumerate() {
        prompter.say(format!(
            "{}. {} ({} - {} decimals, {}% APY)",
            i + 1,
            t.token_symbol,
            t.token_name,
            t.decimals,
            t.rate_percent()
        ))?;
    }
    let custom = TEMPLATES.len() + 1;
    prompter.say(format!("{custom}. Custom configuration"))?;

    let choice = prompter.ask(&format!("\nSelect template (1-{custom}): "))?;
    if choice == custom.to_string() {
        return Ok(None);
    }
    let template = Template::from_menu_choice(&choice);
    if template.is_none() {
        prompter.say("Invalid choice, using custom configuration")?;
    }
    Ok(template)
}

fn custom_overrides<R: BufRead, W: Write>(
    prompter: &mut Prompter<R, W>,
) -> Result<ConfigOverrides> {
    prompter.say("")?;
    prompter.say("Custom token configuration")?;

    let token_name = prompter
        .ask_optional("Token Name (e.g., \"My Stablecoin\"): ")?
        .unwrap_or_else(|| DEFAULT_TOKEN_NAME.to_string());
    let token_symbol = prompter
        .ask_optional("Token Symbol (e.g., \"MSC\"): ")?
        .unwrap_or_else(|| DEFAULT_TOKEN_SYMBOL.to_string());
    let decimals = prompter.ask_parsed(
        &format!("Decimals (6 for USDC-style, 18 for ETH-style) [default: {DEFAULT_DECIMALS}]: "),
        "decimals",
        DEFAULT_DECIMALS,
    )?;
    let initial_supply = prompter.ask_optional(&format!(
        "Initial Supply (number of tokens) [default: {DEFAULT_INITIAL_SUPPLY}]: "
    ))?;
    let rate_percent = prompter.ask_parsed(
        &format!("Interest Rate (% APY, e.g., 5 for 5%) [default: {DEFAULT_RATE_PERCENT}]: "),
        "interest rate",
        DEFAULT_RATE_PERCENT,
    )?;
    let recipient = ask_recipient(prompter)?;

    Ok(ConfigOverrides {
        token_name: Some(token_name),
        token_symbol: Some(token_symbol),
        decimals: Some(decimals),
        initial_supply,
        rate_percent: Some(rate_percent),
        recipient,
        ..Default::default()
    })
}

fn template_overrides<R: BufRead, W: Write>(
    prompter: &mut Prompter<R, W>,
    template: &Template,
) -> Result<ConfigOverrides> {
    prompter.say("")?;
    prompter.say(format!("Using template: {}", template.token_name))?;
    prompter.say(format!("   Symbol: {}", template.token_symbol))?;
    prompter.say(format!("   Decimals: {}", template.decimals))?;
    prompter.say(format!("   Default Supply: {}", template.initial_supply))?;
    prompter.say(format!("   Interest Rate: {}%", template.rate_percent()))?;

    let mut overrides = ConfigOverrides::default();
    if !prompter.confirm("\nUse default values? (y/n) [default: y]: ", true)? {
        overrides.initial_supply = prompter.ask_optional(&format!(
            "Initial Supply [default: {}]: ",
            template.initial_supply
        ))?;
        overrides.rate_percent = Some(prompter.ask_parsed(
            &format!("Interest Rate (% APY) [default: {}]: ", template.rate_percent()),
            "interest rate",
            template.rate_percent(),
        )?);
    }
    overrides.recipient = ask_recipient(prompter)?;
    Ok(overrides)
}

fn ask_recipient<R: BufRead, W: Write>(prompter: &mut Prompter<R, W>) -> Result<Option<String>> {
    prompter.ask_optional("Recipient Public Key (leave empty to use deployer wallet): ")
}
