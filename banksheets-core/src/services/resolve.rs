//! Duplicate resolution policies
//!
//! A resolver answers one question per duplicate group: how many of the new
//! staged copies to keep. The interactive resolver turns that into a
//! request/response exchange with a [`ResponseSource`] so the prompting
//! front end (terminal, tests) is swappable.

use std::collections::VecDeque;

use crate::domain::result::{Error, Result};
use crate::domain::DuplicateGroup;

/// Decides how many new copies of a duplicate group survive
pub trait DuplicateResolver {
    /// Keep count for `group`, within `0..=group.entry_count()`
    fn keep_count(&mut self, group: &DuplicateGroup) -> Result<usize>;
}

/// Keep one new copy when nothing matching is committed yet, otherwise none
#[derive(Debug, Default, Clone, Copy)]
pub struct AutomaticResolver;

impl DuplicateResolver for AutomaticResolver {
    fn keep_count(&mut self, group: &DuplicateGroup) -> Result<usize> {
        Ok(if group.committed_count == 0 { 1 } else { 0 })
    }
}

/// Where interactive answers come from
pub trait ResponseSource {
    /// Ask for a keep count. `None` means no answer (end of input or the
    /// user backed out) and cancels the batch.
    fn ask(&mut self, group: &DuplicateGroup) -> Result<Option<String>>;

    /// Told about a rejected response before the question is asked again
    fn rejected(&mut self, _response: &str, _error: &Error) {}
}

/// Asks a [`ResponseSource`] until it gives a valid keep count
pub struct InteractiveResolver<S> {
    source: S,
}

impl<S: ResponseSource> InteractiveResolver<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    pub fn into_inner(self) -> S {
        self.source
    }
}

impl<S: ResponseSource> DuplicateResolver for InteractiveResolver<S> {
    fn keep_count(&mut self, group: &DuplicateGroup) -> Result<usize> {
        loop {
            let Some(response) = self.source.ask(group)? else {
                return Err(Error::Cancelled(format!("no answer for {}", group.key)));
            };

            match parse_keep_response(&response, group.entry_count()) {
                Ok(keep) => return Ok(keep),
                Err(e) => self.source.rejected(&response, &e),
            }
        }
    }
}

/// The question shown for a group
pub fn prompt_text(group: &DuplicateGroup) -> String {
    format!(
        "Input number of new copies to keep (max: {})",
        group.entry_count()
    )
}

/// Parse a typed keep count; anything but a whole number in
/// `0..=entry_count` is `InvalidUserResponse`
pub fn parse_keep_response(input: &str, entry_count: usize) -> Result<usize> {
    let input = input.trim();
    let value: i64 = input.parse().map_err(|_| {
        Error::InvalidUserResponse(format!("'{}' is not a whole number", input))
    })?;

    if value < 0 || value as u64 > entry_count as u64 {
        return Err(Error::InvalidUserResponse(format!(
            "{} is outside 0..={}",
            value, entry_count
        )));
    }

    Ok(value as usize)
}

/// Canned answers, handy for tests and non-terminal front ends
#[derive(Debug, Default)]
pub struct ScriptedResponses {
    responses: VecDeque<String>,
    /// Every question asked, as prompt text
    pub prompts: Vec<String>,
    /// Rejected responses with the rejection message
    pub rejections: Vec<(String, String)>,
}

impl ScriptedResponses {
    pub fn new<I, T>(responses: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self {
            responses: responses.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }
}

impl ResponseSource for ScriptedResponses {
    fn ask(&mut self, group: &DuplicateGroup) -> Result<Option<String>> {
        self.prompts.push(prompt_text(group));
        Ok(self.responses.pop_front())
    }

    fn rejected(&mut self, response: &str, error: &Error) {
        self.rejections
            .push((response.to_string(), error.to_string()));
    }
}
