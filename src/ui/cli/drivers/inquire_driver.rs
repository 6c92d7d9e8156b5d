use std::fmt::Display;
use std::str::FromStr;

use anyhow::Result;
use inquire::validator::Validation;
use inquire::{Confirm, CustomType, CustomUserError, Select, Text};

use crate::ui::cli::drivers::PromptDriver;

pub struct InquireDriver;

/// Rejects values outside `[min, max]`; either bound may be open.
fn within<T>(
    min: Option<T>,
    max: Option<T>,
) -> impl Fn(&T) -> Result<Validation, CustomUserError> + Clone + 'static
where
    T: PartialOrd + Display + Copy + 'static,
{
    move |x: &T| {
        let message = match (min, max) {
            (Some(lo), Some(hi)) if *x < lo || *x > hi => format!("Must be between {lo} and {hi}"),
            (Some(lo), None) if *x < lo => format!("Must be ≥ {lo}"),
            (None, Some(hi)) if *x > hi => format!("Must be ≤ {hi}"),
            _ => return Ok(Validation::Valid),
        };
        Ok(Validation::Invalid(message.into()))
    }
}

fn ask_number<T>(title: &str, help: &str, default: T, min: Option<T>, max: Option<T>) -> Result<T>
where
    T: Clone + Copy + FromStr + Display + PartialOrd + 'static,
{
    Ok(CustomType::<T>::new(title)
        .with_default(default)
        .with_help_message(help)
        .with_validator(within(min, max))
        .prompt()?)
}

impl PromptDriver for InquireDriver {
    fn ask_bool(&self, title: &str, help: &str, default: bool) -> Result<bool> {
        Ok(Confirm::new(title)
            .with_default(default)
            .with_help_message(help)
            .prompt()?)
    }

    fn ask_string(&self, title: &str, help: &str, default: &str) -> Result<String> {
        Ok(Text::new(title)
            .with_initial_value(default)
            .with_help_message(help)
            .prompt()?)
    }

    fn ask_u64(
        &self,
        title: &str,
        help: &str,
        default: u64,
        min: Option<u64>,
        max: Option<u64>,
    ) -> Result<u64> {
        ask_number(title, help, default, min, max)
    }

    fn ask_f64(
        &self,
        title: &str,
        help: &str,
        default: f64,
        min: Option<f64>,
        max: Option<f64>,
    ) -> Result<f64> {
        ask_number(title, help, default, min, max)
    }

    fn ask_choice(&self, title: &str, help: &str, options: &[String]) -> Result<usize> {
        let mut select = Select::new(title, options.to_vec());
        if !help.is_empty() {
            select = select.with_help_message(help);
        }
        Ok(select.raw_prompt()?.index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_valid<T>(v: &(impl Fn(&T) -> Result<Validation, CustomUserError>), x: T) -> bool {
        matches!(v(&x), Ok(Validation::Valid))
    }

    #[test]
    fn bounds_are_inclusive_and_optional() {
        let ph = within(Some(0.0), Some(14.0));
        assert!(is_valid(&ph, 0.0));
        assert!(is_valid(&ph, 14.0));
        assert!(!is_valid(&ph, 14.1));

        let label = within(None, Some(1u64));
        assert!(is_valid(&label, 0));
        assert!(!is_valid(&label, 2));

        let open = within::<f64>(None, None);
        assert!(is_valid(&open, -1e9));
    }
}
