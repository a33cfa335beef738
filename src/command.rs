use serde::Serialize;
use std::collections::BTreeMap;

/// Marker for the per-use-case error tag enumerations.
pub trait ErrorTag: Copy + Ord + std::fmt::Debug + Serialize {}

impl<T> ErrorTag for T where T: Copy + Ord + std::fmt::Debug + Serialize {}

/// Validation errors of one use case, several messages per tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ErrorMap<K: ErrorTag> {
    errors: BTreeMap<K, Vec<String>>,
}

impl<K: ErrorTag> Default for ErrorMap<K> {
    fn default() -> Self {
        Self {
            errors: BTreeMap::new(),
        }
    }
}

impl<K: ErrorTag> ErrorMap<K> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single<S: ToString>(tag: K, message: S) -> Self {
        let mut map = Self::new();
        map.add(tag, message);
        map
    }

    pub fn add<S: ToString>(&mut self, tag: K, message: S) {
        self.errors
            .entry(tag)
            .or_insert_with(Vec::new)
            .push(message.to_string());
    }

    pub fn merge(&mut self, other: ErrorMap<K>) {
        for (tag, messages) in other.errors {
            self.errors.entry(tag).or_insert_with(Vec::new).extend(messages);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn contains(&self, tag: K) -> bool {
        self.errors.contains_key(&tag)
    }

    pub fn get(&self, tag: K) -> &[String] {
        self.errors.get(&tag).map_or(&[], |messages| messages.as_slice())
    }

    pub fn tags(&self) -> impl Iterator<Item = K> + '_ {
        self.errors.keys().copied()
    }

    /// `Ok(value)` when nothing was recorded, the map itself otherwise.
    pub fn into_result<T>(self, value: T) -> SimpleResult<T, K> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }
}

pub type SimpleResult<T, K> = Result<T, ErrorMap<K>>;

/// A single unit of work.
///
/// `execute` validates its own preconditions and only touches the store once
/// they hold. Validation and conflict failures come back as the inner
/// `ErrorMap`; the outer error is reserved for persistence failures.
pub trait Command {
    type Success;
    type Tag: ErrorTag;

    fn execute(&self) -> anyhow::Result<SimpleResult<Self::Success, Self::Tag>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
    #[serde(rename_all = "SCREAMING_SNAKE_CASE")]
    enum Tag {
        StartTime,
        Overlap,
    }

    #[test]
    fn keeps_several_messages_per_tag() {
        let mut errors = ErrorMap::new();
        errors.add(Tag::StartTime, "required");
        errors.add(Tag::StartTime, "must be before end time");
        errors.add(Tag::Overlap, "conflicts with 3");

        assert_eq!(errors.get(Tag::StartTime).len(), 2);
        assert!(errors.contains(Tag::Overlap));
        assert_eq!(errors.tags().collect::<Vec<_>>(), vec![Tag::StartTime, Tag::Overlap]);
    }

    #[test]
    fn empty_map_is_success() {
        let errors: ErrorMap<Tag> = ErrorMap::new();
        assert_eq!(errors.into_result(7), Ok(7));

        let errors = ErrorMap::single(Tag::Overlap, "taken");
        assert!(errors.into_result(7).is_err());
    }

    #[test]
    fn serializes_as_tag_keyed_object() {
        let mut errors = ErrorMap::single(Tag::Overlap, "taken");
        errors.merge(ErrorMap::single(Tag::Overlap, "again"));
        let json = serde_json::to_string(&errors).unwrap();
        assert_eq!(json, r#"{"OVERLAP":["taken","again"]}"#);
    }
}
