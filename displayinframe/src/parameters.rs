use wiki::Parameters;
use wiki::reference::EntityType;

use crate::error::MacroExecutionError;

/// Parameters of one display-in-frame call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InclusionParameters {
    pub reference: String,
    pub reference_type: EntityType,
    /// Heading id of the only section to display.
    pub section: Option<String>,
    pub exclude_first_heading: bool,
}

impl InclusionParameters {
    pub fn new(reference: impl Into<String>) -> Self {
        InclusionParameters {
            reference: reference.into(),
            reference_type: EntityType::Document,
            section: None,
            exclude_first_heading: false,
        }
    }

    pub fn with_type(mut self, reference_type: EntityType) -> Self {
        self.reference_type = reference_type;
        self
    }

    pub fn with_section(mut self, section: impl Into<String>) -> Self {
        self.section = Some(section.into());
        self
    }

    pub fn excluding_first_heading(mut self, exclude: bool) -> Self {
        self.exclude_first_heading = exclude;
        self
    }

    /// Build from raw macro parameters. Names are matched case-insensitively;
    /// `page="A/B"` is shorthand for `reference="A/B" type="page"`.
    pub fn from_parameters(parameters: &Parameters) -> Result<Self, MacroExecutionError> {
        let mut reference = None;
        let mut page = None;
        let mut reference_type = None;
        let mut section = None;
        let mut exclude_first_heading = false;

        for (name, value) in parameters {
            match name.to_ascii_lowercase().as_str() {
                "reference" => reference = Some(value.clone()),
                "page" => page = Some(value.clone()),
                "type" => {
                    reference_type = Some(
                        value
                            .parse::<EntityType>()
                            .map_err(MacroExecutionError::InvalidParameters)?,
                    )
                }
                "section" => section = Some(value.clone()).filter(|s| !s.is_empty()),
                "excludefirstheading" => exclude_first_heading = parse_bool(name, value)?,
                _ => {
                    return Err(MacroExecutionError::InvalidParameters(format!(
                        "Unknown parameter [{}]",
                        name
                    )));
                }
            }
        }

        let (reference, reference_type) = match (reference, page) {
            (Some(_), Some(_)) => {
                return Err(MacroExecutionError::InvalidParameters(
                    "The 'reference' and 'page' parameters cannot be used together.".to_string(),
                ));
            }
            (Some(reference), None) => (reference, reference_type.unwrap_or_default()),
            (None, Some(page)) => (page, EntityType::Page),
            (None, None) => {
                return Err(MacroExecutionError::InvalidParameters(
                    "You must specify a 'reference' parameter pointing to the document to display."
                        .to_string(),
                ));
            }
        };

        Ok(InclusionParameters {
            reference,
            reference_type,
            section,
            exclude_first_heading,
        })
    }
}

fn parse_bool(name: &str, value: &str) -> Result<bool, MacroExecutionError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" => Ok(true),
        "false" => Ok(false),
        other => Err(MacroExecutionError::InvalidParameters(format!(
            "Invalid value [{}] for parameter [{}]: expected true or false",
            other, name
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> Parameters {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn defaults() {
        let parsed = InclusionParameters::from_parameters(&params(&[("reference", "A.B")])).unwrap();
        assert_eq!(parsed, InclusionParameters::new("A.B"));
    }

    #[test]
    fn all_parameters() {
        let parsed = InclusionParameters::from_parameters(&params(&[
            ("reference", "A"),
            ("type", "space"),
            ("section", "HIntro"),
            ("excludeFirstHeading", "TRUE"),
        ]))
        .unwrap();
        assert_eq!(
            parsed,
            InclusionParameters::new("A")
                .with_type(EntityType::Space)
                .with_section("HIntro")
                .excluding_first_heading(true)
        );
    }

    #[test]
    fn page_parameter_implies_page_type() {
        let parsed = InclusionParameters::from_parameters(&params(&[("page", "A/B")])).unwrap();
        assert_eq!(parsed.reference_type, EntityType::Page);
    }

    #[test]
    fn rejects_bad_input() {
        for bad in [
            params(&[]),
            params(&[("reference", "A"), ("page", "B")]),
            params(&[("reference", "A"), ("colour", "red")]),
            params(&[("reference", "A"), ("excludefirstheading", "maybe")]),
            params(&[("reference", "A"), ("type", "attachment")]),
        ] {
            assert!(
                matches!(
                    InclusionParameters::from_parameters(&bad),
                    Err(MacroExecutionError::InvalidParameters(_))
                ),
                "accepted {:?}",
                bad
            );
        }
    }
}
