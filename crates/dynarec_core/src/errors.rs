//! Per-record validation messages.

/// Message added by presence validations.
pub const BLANK: &str = "can't be blank";

/// Message added by uniqueness validations.
pub const TAKEN: &str = "has already been taken";

/// Field name to ordered messages, in the order fields first failed.
///
/// # Example
///
/// ```rust
/// use dynarec_core::Errors;
///
/// let mut errors = Errors::new();
/// errors.add("first_name", "can't be blank");
/// assert_eq!(errors.full_messages(), vec!["First name can't be blank"]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Errors {
    messages: Vec<(String, Vec<String>)>,
}

impl Errors {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a message for a field.
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        let field = field.into();
        let message = message.into();
        match self.messages.iter_mut().find(|(f, _)| *f == field) {
            Some((_, list)) => list.push(message),
            None => self.messages.push((field, vec![message])),
        }
    }

    /// Messages for a field; empty if it has none.
    pub fn get(&self, field: &str) -> &[String] {
        self.messages
            .iter()
            .find(|(f, _)| f == field)
            .map_or(&[][..], |(_, list)| list.as_slice())
    }

    /// Whether a field has any message.
    pub fn contains(&self, field: &str) -> bool {
        !self.get(field).is_empty()
    }

    /// Whether there are no messages at all.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Total number of messages.
    pub fn len(&self) -> usize {
        self.messages.iter().map(|(_, list)| list.len()).sum()
    }

    /// Removes every message.
    pub fn clear(&mut self) {
        self.messages.clear();
    }

    /// Iterates fields with their messages.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.messages
            .iter()
            .map(|(f, list)| (f.as_str(), list.as_slice()))
    }

    /// `"<Humanized field> <message>"` for every message.
    pub fn full_messages(&self) -> Vec<String> {
        self.iter()
            .flat_map(|(field, list)| {
                let name = humanize(field);
                list.iter().map(move |m| format!("{name} {m}"))
            })
            .collect()
    }
}

/// `first_name` -> `First name`, `user_id` -> `User`.
fn humanize(field: &str) -> String {
    let base = field.strip_suffix("_id").filter(|b| !b.is_empty()).unwrap_or(field);
    let spaced = base.replace('_', " ");
    let mut chars = spaced.trim().chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_and_get() {
        let mut errors = Errors::new();
        assert!(errors.is_empty());
        errors.add("age", "too old");
        errors.add("name", BLANK);
        errors.add("age", "too weird");
        assert_eq!(errors.get("age"), ["too old", "too weird"]);
        assert!(errors.get("email").is_empty());
        assert_eq!(errors.len(), 3);
        let fields: Vec<_> = errors.iter().map(|(f, _)| f).collect();
        assert_eq!(fields, vec!["age", "name"]);
        errors.clear();
        assert!(errors.is_empty());
    }

    #[test]
    fn humanized_full_messages() {
        let mut errors = Errors::new();
        errors.add("date_of_birth", BLANK);
        errors.add("owner_id", TAKEN);
        assert_eq!(
            errors.full_messages(),
            vec![
                "Date of birth can't be blank".to_string(),
                "Owner has already been taken".to_string(),
            ]
        );
    }
}
