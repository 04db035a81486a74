// SPDX-License-Identifier: MIT
// Copyright (c) Microsoft Corporation.

//! Form parameters sent in request bodies.

use std::collections::BTreeMap;

/// A set of form fields, each of which may carry multiple values.
///
/// Fields are kept sorted by name so the encoded body is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormParameters {
    fields: BTreeMap<String, Vec<String>>,
}

impl FormParameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `name` to the single `value`, replacing any existing values.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(name.into(), vec![value.into()]);
    }

    /// Append `value` to the values of `name`.
    pub fn add(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields
            .entry(name.into())
            .or_default()
            .push(value.into());
    }

    /// The first value of `name`, if any.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    /// All values of `name`, in insertion order.
    pub fn get_all(&self, name: &str) -> &[String] {
        self.fields.get(name).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<Vec<String>> {
        self.fields.remove(name)
    }

    /// The number of distinct field names.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterate over every `(name, value)` pair, sorted by name.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().flat_map(|(name, values)| {
            values
                .iter()
                .map(move |value| (name.as_str(), value.as_str()))
        })
    }

    /// Encode as `application/x-www-form-urlencoded`.
    pub fn encode(&self) -> String {
        let mut serializer = url::form_urlencoded::Serializer::new(String::new());
        serializer.extend_pairs(self.iter());
        serializer.finish()
    }

    /// Decode an `application/x-www-form-urlencoded` body.
    pub fn decode(body: &[u8]) -> Self {
        let mut parameters = Self::new();
        for (name, value) in url::form_urlencoded::parse(body) {
            parameters.add(name, value);
        }
        parameters
    }
}

impl<N, V> FromIterator<(N, V)> for FormParameters
where
    N: Into<String>,
    V: Into<String>,
{
    fn from_iter<T: IntoIterator<Item = (N, V)>>(iter: T) -> Self {
        let mut parameters = Self::new();
        for (name, value) in iter {
            parameters.add(name, value);
        }
        parameters
    }
}
