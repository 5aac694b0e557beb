//! Ordered pandoc argument list with flag lookup and removal.
//!
//! Two flag spellings are understood:
//!
//! * short: `-k value` (two tokens)
//! * long:  `--key=value` (one token, non-empty value)
//!
//! Long flags written as two tokens (`--to html`) are not recognised; the
//! settings files have always used the `=` form.

use serde::{Deserialize, Serialize};

/// Ordered collection of command-line tokens.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArgVector(Vec<String>);

impl ArgVector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Value of the first matching flag, scanning left to right.
    ///
    /// A short-flag match captures the *next* token as its value before that
    /// token is tested as a flag itself. A trailing short flag with no
    /// following token yields `None`.
    pub fn get(&self, short: &[&str], long: &[&str]) -> Option<&str> {
        let mut capture_next = false;
        for arg in &self.0 {
            if !short.is_empty() {
                if capture_next {
                    return Some(arg.as_str());
                }
                if matches_short(arg, short) {
                    capture_next = true;
                    continue;
                }
            }
            if let Some(value) = long_value(arg, long) {
                return Some(value);
            }
        }
        None
    }

    /// Filtered copy with every matching flag removed.
    ///
    /// A matched short flag is always dropped. Its value token is dropped too,
    /// unless `values` is given and the token is not one of them, in which
    /// case the value token is kept. Matched long flags are dropped whole.
    pub fn remove(&self, short: &[&str], long: &[&str], values: Option<&[&str]>) -> ArgVector {
        let mut kept = Vec::with_capacity(self.0.len());
        let mut capture_next = false;
        for arg in &self.0 {
            if !short.is_empty() {
                if capture_next {
                    capture_next = false;
                    if let Some(values) = values {
                        if !values.contains(&arg.as_str()) {
                            kept.push(arg.clone());
                        }
                    }
                    continue;
                }
                if matches_short(arg, short) {
                    capture_next = true;
                    continue;
                }
            }
            if long_value(arg, long).is_some() {
                continue;
            }
            kept.push(arg.clone());
        }
        ArgVector(kept)
    }

    pub fn push(&mut self, arg: impl Into<String>) {
        self.0.push(arg.into());
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<String> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, String> {
        self.0.iter()
    }
}

impl From<Vec<String>> for ArgVector {
    fn from(v: Vec<String>) -> Self {
        Self(v)
    }
}

impl From<&[String]> for ArgVector {
    fn from(v: &[String]) -> Self {
        Self(v.to_vec())
    }
}

impl<S: Into<String>> FromIterator<S> for ArgVector {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

impl<S: Into<String>> Extend<S> for ArgVector {
    fn extend<I: IntoIterator<Item = S>>(&mut self, iter: I) {
        self.0.extend(iter.into_iter().map(Into::into));
    }
}

impl<'a> IntoIterator for &'a ArgVector {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

fn matches_short(arg: &str, names: &[&str]) -> bool {
    arg.strip_prefix('-')
        .is_some_and(|name| !name.starts_with('-') && names.contains(&name))
}

fn long_value<'a>(arg: &'a str, names: &[&str]) -> Option<&'a str> {
    let body = arg.strip_prefix("--")?;
    let (name, value) = body.split_once('=')?;
    (names.contains(&name) && !value.is_empty()).then_some(value)
}
