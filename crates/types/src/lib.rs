/// Errors that can occur when creating validated text types.
#[derive(Debug, thiserror::Error)]
pub enum TextError {
    /// The input text was empty or contained only whitespace
    #[error("Text cannot be empty")]
    Empty,
}

/// A string type that guarantees meaningful content.
///
/// This type wraps a `String` and ensures it contains at least one non-whitespace character.
/// Unlike a trimming constructor, the content is stored exactly as given: model output is kept
/// verbatim so that a well-formed response survives normalisation unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NonEmptyText(String);

impl NonEmptyText {
    /// Creates a new `NonEmptyText` from the given input.
    ///
    /// # Arguments
    ///
    /// * `input` - Any type that can be converted to a string reference
    ///
    /// # Returns
    ///
    /// Returns `Ok(NonEmptyText)` if the input has non-whitespace content,
    /// or `Err(TextError::Empty)` if it's empty or contains only whitespace.
    pub fn new(input: impl AsRef<str>) -> Result<Self, TextError> {
        let input = input.as_ref();
        if input.trim().is_empty() {
            return Err(TextError::Empty);
        }
        Ok(Self(input.to_owned()))
    }

    /// Returns the inner string as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the wrapper and returns the owned string.
    pub fn into_string(self) -> String {
        self.0
    }
}

impl std::fmt::Display for NonEmptyText {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for NonEmptyText {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for NonEmptyText {
    type Error = TextError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if value.trim().is_empty() {
            return Err(TextError::Empty);
        }
        Ok(Self(value))
    }
}

impl serde::Serialize for NonEmptyText {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for NonEmptyText {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        NonEmptyText::try_from(s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_empty_and_whitespace() {
        assert!(NonEmptyText::new("").is_err());
        assert!(NonEmptyText::new("  \n\t ").is_err());
    }

    #[test]
    fn test_preserves_content_verbatim() {
        let text = NonEmptyText::new("  padded value\n").unwrap();
        assert_eq!(text.as_str(), "  padded value\n");
        assert_eq!(text.into_string(), "  padded value\n");
    }

    #[test]
    fn test_deserialize_rejects_blank_string() {
        let ok: NonEmptyText = serde_json::from_str("\"hello\"").unwrap();
        assert_eq!(ok.as_str(), "hello");

        let err = serde_json::from_str::<NonEmptyText>("\"   \"");
        assert!(err.is_err());
    }

    #[test]
    fn test_serialize_as_plain_string() {
        let text = NonEmptyText::new("Flask").unwrap();
        assert_eq!(serde_json::to_string(&text).unwrap(), "\"Flask\"");
    }
}
