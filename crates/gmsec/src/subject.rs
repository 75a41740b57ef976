// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Dotted subjects and subscription patterns.
//!
//! ```text
//! pattern              subject                  match
//! GMSEC.*.HB           GMSEC.SAT1.HB            yes   (* = exactly one element)
//! GMSEC.>              GMSEC.SAT1.HB            yes   (> = one or more trailing)
//! GMSEC.>              GMSEC                    no
//! GMSEC.SAT1.+         GMSEC.SAT1               yes   (+ = zero or more trailing)
//! ```
//!
//! Wildcards are only meaningful in patterns; `>` and `+` only as the last
//! element.

use crate::error::{Error, Result};

fn is_element_char(c: u8, lenient: bool) -> bool {
    c.is_ascii_uppercase()
        || c.is_ascii_digit()
        || c == b'-'
        || c == b'_'
        || (lenient && c.is_ascii_lowercase())
}

fn check(subject: &str, subscription: bool, lenient: bool) -> Result<()> {
    if subject.is_empty() {
        return Err(Error::EmptySubject);
    }
    if subject.contains("..") {
        return Err(Error::InvalidSubject(format!(
            "{} -- Subject has '..' (is it missing an element?)",
            subject
        )));
    }

    let elements: Vec<&str> = subject.split('.').collect();
    let last = elements.len() - 1;
    let mut problems = String::new();
    for (i, element) in elements.iter().enumerate() {
        if element.is_empty() {
            problems.push_str(&format!("\n\telement {} cannot be empty", i));
            continue;
        }
        if subscription && (*element == "*" || (i == last && (*element == ">" || *element == "+")))
        {
            continue;
        }
        if !element.bytes().all(|c| is_element_char(c, lenient)) {
            problems.push_str(&format!(
                "\n\tSubject element \"{}\" contains illegal character",
                element
            ));
        }
    }

    if problems.is_empty() {
        Ok(())
    } else {
        Err(Error::InvalidSubject(format!("{}{}", subject, problems)))
    }
}

/// Check a publish subject (no wildcards).
pub fn validate_subject(subject: &str, lenient: bool) -> Result<()> {
    check(subject, false, lenient)
}

/// Check a subscription pattern (wildcards allowed).
pub fn validate_pattern(pattern: &str, lenient: bool) -> Result<()> {
    check(pattern, true, lenient)
}

/// Lenient publish-subject check.
pub fn is_valid_subject(subject: &str) -> bool {
    validate_subject(subject, true).is_ok()
}

/// Does `subject` match subscription `pattern`?
pub fn matches(pattern: &str, subject: &str) -> bool {
    if pattern.is_empty() || subject.is_empty() {
        return false;
    }
    let mut pat = pattern.split('.');
    let mut sub = subject.split('.').peekable();

    loop {
        match (pat.next(), sub.peek()) {
            (Some(">"), Some(_)) | (Some("+"), _) => return true,
            (Some("*"), Some(_)) => {}
            (Some(p), Some(s)) if p == *s => {}
            (None, None) => return true,
            _ => return false,
        }
        sub.next();
    }
}
