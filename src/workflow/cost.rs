use super::WorkflowError;

/// Which cost field a value belongs to, used in error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CostField {
    Estimated,
    Actual,
}

impl CostField {
    pub fn label(self) -> &'static str {
        match self {
            CostField::Estimated => "Estimated cost",
            CostField::Actual => "Actual cost",
        }
    }
}

/// Parses a cost as entered by staff.
///
/// Blank input clears the field (`Ok(None)`). Anything that is not a finite,
/// non-negative number is rejected.
pub fn parse_cost(field: CostField, raw: &str) -> Result<Option<f64>, WorkflowError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    let value: f64 = trimmed
        .parse()
        .map_err(|_| WorkflowError::CostFormat { field })?;

    if !value.is_finite() || value < 0.0 {
        return Err(WorkflowError::CostFormat { field });
    }

    Ok(Some(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn blank_clears() {
        assert_eq!(parse_cost(CostField::Estimated, "").unwrap(), None);
        assert_eq!(parse_cost(CostField::Estimated, "   ").unwrap(), None);
    }

    #[test]
    fn numeric_is_kept_as_is() {
        assert_eq!(parse_cost(CostField::Actual, "150.5").unwrap(), Some(150.5));
        assert_eq!(parse_cost(CostField::Actual, " 0 ").unwrap(), Some(0.0));
    }

    #[test]
    fn garbage_is_rejected_with_field_name() {
        let err = parse_cost(CostField::Estimated, "abc").unwrap_err();
        assert_matches!(
            err,
            WorkflowError::CostFormat {
                field: CostField::Estimated
            }
        );
        assert_eq!(err.to_string(), "Estimated cost must be a valid number");
    }

    #[test]
    fn negative_and_non_finite_are_rejected() {
        assert!(parse_cost(CostField::Actual, "-1").is_err());
        assert!(parse_cost(CostField::Actual, "NaN").is_err());
        assert!(parse_cost(CostField::Actual, "inf").is_err());
    }
}
