use std::fmt;

/// A container image split into `repository:tag`.
///
/// The repository keeps any registry host prefix (`gcr.io/x`), which is what
/// the registry policy classifies on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageReference {
    pub repository: String,
    pub tag: String,
}

#[derive(Debug, PartialEq, Eq)]
pub enum ParseError {
    MissingRepository,
    MissingTag,
    DigestNotAllowed,
}

impl std::error::Error for ParseError {}
impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::DigestNotAllowed => write!(f, "digest references are not allowed"),
            ParseError::MissingRepository => write!(f, "repository is missing"),
            ParseError::MissingTag => write!(f, "tag is missing"),
        }
    }
}

impl fmt::Display for ImageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.repository, self.tag)
    }
}

impl ImageReference {
    /// Splits on the first colon. Digest references are rejected.
    pub fn parse(s: &str) -> Result<Self, ParseError> {
        if s.contains('@') {
            return Err(ParseError::DigestNotAllowed);
        }

        let (repository, tag) = s.split_once(':').ok_or(ParseError::MissingTag)?;

        if repository.is_empty() {
            return Err(ParseError::MissingRepository);
        }
        if tag.is_empty() {
            return Err(ParseError::MissingTag);
        }

        Ok(Self {
            repository: repository.to_string(),
            tag: tag.to_string(),
        })
    }

    /// Same repository, different tag.
    pub fn with_tag(&self, tag: &str) -> Self {
        Self {
            repository: self.repository.clone(),
            tag: tag.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_repository_and_tag() {
        let reference = ImageReference::parse("acme/app:1.0").unwrap();
        assert_eq!(reference.repository, "acme/app");
        assert_eq!(reference.tag, "1.0");
        assert_eq!(reference.to_string(), "acme/app:1.0");
    }

    #[test]
    fn test_parse_keeps_registry_host_in_repository() {
        let reference = ImageReference::parse("gcr.io/x:1").unwrap();
        assert_eq!(reference.repository, "gcr.io/x");
        assert_eq!(reference.tag, "1");
    }

    #[test]
    fn test_parse_splits_on_first_colon() {
        let reference = ImageReference::parse("nginx:1.25:extra").unwrap();
        assert_eq!(reference.repository, "nginx");
        assert_eq!(reference.tag, "1.25:extra");
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(ImageReference::parse("nginx"), Err(ParseError::MissingTag));
        assert_eq!(ImageReference::parse("nginx:"), Err(ParseError::MissingTag));
        assert_eq!(ImageReference::parse(":1.0"), Err(ParseError::MissingRepository));
        assert_eq!(
            ImageReference::parse("nginx@sha256:abcdef"),
            Err(ParseError::DigestNotAllowed)
        );
    }

    #[test]
    fn test_with_tag() {
        let reference = ImageReference::parse("acme/app:1.0").unwrap();
        assert_eq!(reference.with_tag("1.1").to_string(), "acme/app:1.1");
    }
}
