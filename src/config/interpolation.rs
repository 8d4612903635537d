// Copyright 2026 The Parapet Project
// SPDX-License-Identifier: Apache-2.0

use super::error::ConfigError;

/// Resolves `${VAR_NAME}` references from the process environment.
///
/// A `${` with no closing brace, or `${}`, is kept literally.
pub fn resolve_variables(input: &str) -> Result<String, ConfigError> {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch != '$' || chars.peek() != Some(&'{') {
            result.push(ch);
            continue;
        }
        chars.next();

        let mut name = String::new();
        let mut closed = false;
        for c in chars.by_ref() {
            if c == '}' {
                closed = true;
                break;
            }
            name.push(c);
        }

        if !closed || name.is_empty() {
            result.push_str("${");
            result.push_str(&name);
            if closed {
                result.push('}');
            }
            continue;
        }

        let value = std::env::var(&name)
            .map_err(|_| ConfigError::UndefinedVariable { name: name.clone() })?;
        result.push_str(&value);
    }

    Ok(result)
}

/// Interpolate an optional field; empty results count as unset.
pub fn resolve_optional(input: Option<&str>) -> Result<Option<String>, ConfigError> {
    match input {
        Some(raw) => {
            let value = resolve_variables(raw)?;
            Ok(if value.is_empty() { None } else { Some(value) })
        }
        None => Ok(None),
    }
}
