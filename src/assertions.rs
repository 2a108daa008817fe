// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Accumulating assertion sets for conformance checks.
//!
//! A check makes many independent comparisons against one captured round
//! trip. Failures are collected instead of short-circuiting so a single run
//! reports every mismatch at once. Assertions come in two tiers:
//! error-level failures decide the check outcome, warning-level failures are
//! reported but informative only (behavior that differs across conforming
//! controllers without being wrong).

use std::collections::BTreeMap;
use std::fmt;

/// Header map shape shared by captured requests and responses.
///
/// Keys are lowercase; values keep their arrival order. Insertion order of
/// keys is irrelevant for comparison.
pub type Headers = BTreeMap<String, Vec<String>>;

/// Template used by [`AssertionSet::equals`] when none is given.
pub const DEFAULT_EQUALS_TEMPLATE: &str = "expected '{}' but was '{}'";

/// An ordered accumulation of assertion failures.
///
/// Each failed comparison appends one formatted message; passing
/// comparisons leave the set untouched.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct AssertionSet(Vec<String>);

impl AssertionSet {
    /// Create an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Assert `actual == expected`, rendering failures through `template`.
    ///
    /// The template's first two `{}` placeholders receive the expected and
    /// actual values, in that order. An empty template falls back to
    /// [`DEFAULT_EQUALS_TEMPLATE`].
    pub fn equals<A, E>(&mut self, actual: &A, expected: &E, template: &str)
    where
        A: PartialEq<E> + fmt::Display + ?Sized,
        E: fmt::Display + ?Sized,
    {
        if actual != expected {
            self.0
                .push(render(template, &expected.to_string(), &actual.to_string()));
        }
    }

    /// Assert structural equality of values that only implement `Debug`.
    ///
    /// Comparisons are between freshly decoded values, so equality is
    /// always structural, never identity.
    pub fn deep_equals<A, E>(&mut self, actual: &A, expected: &E, template: &str)
    where
        A: PartialEq<E> + fmt::Debug + ?Sized,
        E: fmt::Debug + ?Sized,
    {
        if actual != expected {
            self.0.push(render(
                template,
                &format!("{expected:?}"),
                &format!("{actual:?}"),
            ));
        }
    }

    /// Assert that every expected header key is present.
    ///
    /// Value-blind: used for headers such as `user-agent` whose value is
    /// nondeterministic.
    pub fn contains_headers(&mut self, actual: &Headers, expected: &[&str]) {
        for key in expected {
            if !actual.contains_key(*key) {
                let present: Vec<&str> = actual.keys().map(String::as_str).collect();
                self.0.push(format!(
                    "expected headers to contain '{key}' but contained '{present:?}'"
                ));
            }
        }
    }

    /// Assert the header set contains exactly the expected keys and nothing more.
    pub fn contains_exact_headers(&mut self, actual: &Headers, expected: &[&str]) {
        self.contains_headers(actual, expected);
        if actual.len() != expected.len() {
            let present: Vec<&str> = actual.keys().map(String::as_str).collect();
            self.0.push(format!(
                "expected headers to only contain '{expected:?}' but contained '{present:?}'"
            ));
        }
    }

    /// Record an already-formatted failure.
    pub fn push(&mut self, failure: impl Into<String>) {
        self.0.push(failure.into());
    }

    /// Number of recorded failures.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when no failure has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over the recorded failure messages.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

/// Substitute the first two `{}` placeholders of a template.
fn render(template: &str, expected: &str, actual: &str) -> String {
    let template = if template.is_empty() {
        DEFAULT_EQUALS_TEMPLATE
    } else {
        template
    };

    let mut out = String::with_capacity(template.len() + expected.len() + actual.len());
    let mut rest = template;
    for value in [expected, actual] {
        match rest.split_once("{}") {
            Some((head, tail)) => {
                out.push_str(head);
                out.push_str(value);
                rest = tail;
            }
            // Template with fewer placeholders than values; keep what we have.
            None => break,
        }
    }
    out.push_str(rest);
    out
}

/// The two-tier assertion outcome of one check.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Assertions {
    /// Failures that decide the check outcome
    pub errors: AssertionSet,
    /// Failures that are reported but never fail the check
    pub warnings: AssertionSet,
}

impl Assertions {
    /// Create an empty outcome.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// True iff the error tier is empty. Warnings never fail a check.
    #[must_use]
    pub fn passed(&self) -> bool {
        self.errors.is_empty()
    }
}

impl fmt::Display for Assertions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, failure) in self.errors.iter().enumerate() {
            writeln!(f, "\tERROR {n}) Assertion failed: {failure}", n = i + 1)?;
        }
        for (i, failure) in self.warnings.iter().enumerate() {
            writeln!(f, "\tWARN  {n}) Assertion failed: {failure}", n = i + 1)?;
        }
        Ok(())
    }
}
