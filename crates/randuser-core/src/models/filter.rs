use serde::{Deserialize, Serialize};

/// Nationality codes the generator accepts for the `nat` parameter.
pub const NATIONALITIES: [&str; 21] = [
    "AU", "BR", "CA", "CH", "DE", "DK", "ES", "FI", "FR", "GB", "IE", "IN", "IR", "MX", "NL", "NO",
    "NZ", "RS", "TR", "UA", "US",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
        }
    }

    /// Parse a filter value. Blank or unrecognized input means "any".
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "male" | "m" => Some(Gender::Male),
            "female" | "f" => Some(Gender::Female),
            _ => None,
        }
    }

    /// Cycle any -> male -> female -> any, for form inputs.
    pub fn cycle(current: Option<Self>) -> Option<Self> {
        match current {
            None => Some(Gender::Male),
            Some(Gender::Male) => Some(Gender::Female),
            Some(Gender::Female) => None,
        }
    }
}

impl std::fmt::Display for Gender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Filters applied to every fetch issued for one list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserFilter {
    pub gender: Option<Gender>,
    pub nationality: Option<String>,
}

impl UserFilter {
    /// Build a filter from free-form input; blank values mean "no filter".
    pub fn new(gender: Option<&str>, nationality: Option<&str>) -> Self {
        Self {
            gender: gender.and_then(Gender::parse),
            nationality: nationality
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_uppercase),
        }
    }

    pub fn gender_param(&self) -> Option<&str> {
        self.gender.as_ref().map(Gender::as_str)
    }

    pub fn nationality_param(&self) -> Option<&str> {
        self.nationality.as_deref()
    }

    /// Short label for status lines, e.g. "female / DE" or "any / any".
    pub fn label(&self) -> String {
        format!(
            "{} / {}",
            self.gender_param().unwrap_or("any"),
            self.nationality_param().unwrap_or("any")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gender_parse() {
        assert_eq!(Gender::parse("male"), Some(Gender::Male));
        assert_eq!(Gender::parse("FEMALE"), Some(Gender::Female));
        assert_eq!(Gender::parse(" f "), Some(Gender::Female));
        assert_eq!(Gender::parse(""), None);
        assert_eq!(Gender::parse("robot"), None);
    }

    #[test]
    fn test_gender_cycle() {
        assert_eq!(Gender::cycle(None), Some(Gender::Male));
        assert_eq!(Gender::cycle(Some(Gender::Male)), Some(Gender::Female));
        assert_eq!(Gender::cycle(Some(Gender::Female)), None); // Wraps around
    }

    #[test]
    fn test_filter_blank_values_are_absent() {
        let filter = UserFilter::new(Some(""), Some("  "));
        assert_eq!(filter, UserFilter::default());
        assert_eq!(filter.label(), "any / any");
    }

    #[test]
    fn test_filter_normalizes_nationality() {
        let filter = UserFilter::new(Some("female"), Some("de"));
        assert_eq!(filter.gender_param(), Some("female"));
        assert_eq!(filter.nationality_param(), Some("DE"));
        assert_eq!(filter.label(), "female / DE");
    }
}
