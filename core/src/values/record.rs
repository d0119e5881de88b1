use super::value::Value;

/// Ordered string-keyed fields; the target of attribute access and
/// single-level attribute assignment.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Record {
    fields: Vec<(String, Value)>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insertion, used to seed library records.
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value)
    }

    /// Insert or replace a field, keeping the original position on replace.
    /// Returns the previous value, if any.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        let name = name.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(field, _)| *field == name) {
            Some((_, slot)) => Some(core::mem::replace(slot, value)),
            None => {
                self.fields.push((name, value));
                None
            }
        }
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    /// See [`Value::size`]. Field names count their byte length.
    pub fn size(&self) -> usize {
        1 + self
            .fields
            .iter()
            .map(|(name, value)| name.len() + value.size())
            .sum::<usize>()
    }
}

impl FromIterator<(String, Value)> for Record {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        let mut record = Record::new();
        for (name, value) in iter {
            record.set(name, value);
        }
        record
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_replaces_in_place() {
        let mut record = Record::new().with_field("x", 1).with_field("y", 2);
        assert_eq!(record.set("x", 10), Some(Value::Int(1)));
        assert_eq!(record.keys().collect::<Vec<_>>(), vec!["x", "y"]);
        assert_eq!(record.get("x"), Some(&Value::Int(10)));
    }

    #[test]
    fn test_missing_field() {
        let record = Record::new().with_field("x", 1);
        assert_eq!(record.get("z"), None);
        assert_eq!(record.len(), 1);
    }

    #[test]
    fn test_from_iter_deduplicates() {
        let record: Record = vec![
            ("a".to_string(), Value::Int(1)),
            ("a".to_string(), Value::Int(2)),
        ]
        .into_iter()
        .collect();
        assert_eq!(record.len(), 1);
        assert_eq!(record.get("a"), Some(&Value::Int(2)));
    }
}
