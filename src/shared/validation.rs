//! Validation Utilities

use validator::ValidationErrors;

/// Flatten `validator` errors into a single `field: message` line.
///
/// Only the first failing field is reported; fields are visited in name
/// order so the message is stable across runs.
pub fn validation_message(errors: &ValidationErrors) -> String {
    let field_errors = errors.field_errors();
    let mut fields: Vec<_> = field_errors.iter().collect();
    fields.sort_by(|a, b| a.0.cmp(b.0));

    fields
        .into_iter()
        .find_map(|(field, errs)| {
            errs.first().map(|e| {
                let message = e
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| e.code.to_string());
                format!("{}: {}", field, message)
            })
        })
        .unwrap_or_else(|| "Validation failed".into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[derive(Validate)]
    struct Probe {
        #[validate(length(min = 1, message = "must not be empty"))]
        content: String,
        #[validate(range(min = 1))]
        page: i64,
    }

    #[test]
    fn test_reports_first_field_by_name() {
        let errors = Probe { content: String::new(), page: 0 }.validate().unwrap_err();
        assert_eq!(validation_message(&errors), "content: must not be empty");
    }

    #[test]
    fn test_falls_back_to_code() {
        let errors = Probe { content: "ok".into(), page: 0 }.validate().unwrap_err();
        assert_eq!(validation_message(&errors), "page: range");
    }
}
