use serde::{Deserialize, Deserializer};

/// A JSON patch field that distinguishes an omitted key from an explicit `null`.
///
/// Use with `#[serde(default)]` so missing keys land on [`Patch::Omitted`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Patch<T> {
    Omitted,
    Null,
    Value(T),
}

impl<T> Default for Patch<T> {
    fn default() -> Self {
        Patch::Omitted
    }
}

impl<T> Patch<T> {
    /// `None` when omitted, `Some(None)` when cleared, `Some(Some(v))` when set.
    pub fn into_change(self) -> Option<Option<T>> {
        match self {
            Patch::Omitted => None,
            Patch::Null => Some(None),
            Patch::Value(value) => Some(Some(value)),
        }
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Patch<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Option::<T>::deserialize(deserializer).map(|value| match value {
            Some(value) => Patch::Value(value),
            None => Patch::Null,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize)]
    struct Body {
        #[serde(default)]
        salary: Patch<String>,
    }

    #[test]
    fn distinguishes_missing_null_and_value() {
        let omitted: Body = serde_json::from_str("{}").unwrap();
        assert_eq!(omitted.salary, Patch::Omitted);

        let cleared: Body = serde_json::from_str(r#"{"salary":null}"#).unwrap();
        assert_eq!(cleared.salary.into_change(), Some(None));

        let set: Body = serde_json::from_str(r#"{"salary":"50k"}"#).unwrap();
        assert_eq!(set.salary.into_change(), Some(Some("50k".to_string())));
    }
}
