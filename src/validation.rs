use serde_json::{Map, Value};
use std::borrow::Cow;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::error::{AppError, FieldViolation};
use crate::models::{Audience, GenerationRequest, Style, Topic};

/// Field order used when reporting violations.
const FIELD_ORDER: [&str; 3] = ["topic", "audience", "style"];

/// Raw generation body as sent by the client, before membership checks.
#[derive(Debug, Default, Validate)]
pub struct GenerationPayload {
    #[validate(
        required(message = "Invalid topic selected"),
        custom(function = "known_topic")
    )]
    pub topic: Option<String>,

    #[validate(
        required(message = "Invalid audience selected"),
        custom(function = "known_audience")
    )]
    pub audience: Option<String>,

    #[validate(custom(function = "known_style"))]
    pub style: Option<String>,
}

fn membership<T: std::str::FromStr>(
    value: &str,
    code: &'static str,
    message: &'static str,
) -> Result<(), ValidationError> {
    value
        .parse::<T>()
        .map(|_| ())
        .map_err(|_| ValidationError::new(code).with_message(Cow::Borrowed(message)))
}

fn known_topic(value: &str) -> Result<(), ValidationError> {
    membership::<Topic>(value, "topic", "Invalid topic selected")
}

fn known_audience(value: &str) -> Result<(), ValidationError> {
    membership::<Audience>(value, "audience", "Invalid audience selected")
}

fn known_style(value: &str) -> Result<(), ValidationError> {
    membership::<Style>(value, "style", "Invalid style selected")
}

impl GenerationPayload {
    /// Parses a request body. An empty body is treated as an empty object.
    ///
    /// Only a JSON object is accepted. A field holding anything other than a
    /// string is kept in its JSON form so it fails that field's own check.
    pub fn from_slice(body: &[u8]) -> Result<Self, AppError> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }

        let mut fields = serde_json::from_slice::<Map<String, Value>>(body).map_err(|_| {
            AppError::Validation(vec![FieldViolation::body(
                "body",
                "Request body must be a JSON object",
                None,
            )])
        })?;

        Ok(Self {
            topic: field_text(fields.remove("topic")),
            audience: field_text(fields.remove("audience")),
            style: field_text(fields.remove("style")),
        })
    }

    fn raw_value(&self, field: &str) -> Option<String> {
        match field {
            "topic" => self.topic.clone(),
            "audience" => self.audience.clone(),
            "style" => self.style.clone(),
            _ => None,
        }
    }

    fn violations(&self, errors: &ValidationErrors) -> Vec<FieldViolation> {
        let mut violations: Vec<FieldViolation> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                let field = field.to_string();
                errs.iter()
                    .take(1)
                    .map(|err| {
                        let message = err
                            .message
                            .clone()
                            .unwrap_or(Cow::Borrowed("Invalid value"))
                            .into_owned();
                        FieldViolation::body(field.clone(), message, self.raw_value(&field))
                    })
                    .collect::<Vec<_>>()
            })
            .collect();

        violations.sort_by_key(|v| {
            FIELD_ORDER
                .iter()
                .position(|name| *name == v.field)
                .unwrap_or(FIELD_ORDER.len())
        });
        violations
    }

    /// Checks every field and converts to a typed request.
    pub fn into_request(self) -> Result<GenerationRequest, AppError> {
        if let Err(errors) = self.validate() {
            return Err(AppError::Validation(self.violations(&errors)));
        }

        let topic = self.topic.as_deref().and_then(|v| v.parse::<Topic>().ok());
        let audience = self.audience.as_deref().and_then(|v| v.parse::<Audience>().ok());
        let style = match self.style.as_deref() {
            Some(value) => Some(value.parse::<Style>().map_err(|_| invalid("style", &self))?),
            None => None,
        };

        match (topic, audience) {
            (Some(topic), Some(audience)) => Ok(GenerationRequest {
                topic,
                audience,
                style,
            }),
            (None, _) => Err(invalid("topic", &self)),
            (_, None) => Err(invalid("audience", &self)),
        }
    }
}

fn field_text(value: Option<Value>) -> Option<String> {
    match value? {
        Value::Null => None,
        Value::String(text) => Some(text),
        other => Some(other.to_string()),
    }
}

fn invalid(field: &'static str, payload: &GenerationPayload) -> AppError {
    AppError::Validation(vec![FieldViolation::body(
        field,
        format!("Invalid {field} selected"),
        payload.raw_value(field),
    )])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn violations(body: &str) -> Vec<FieldViolation> {
        match GenerationPayload::from_slice(body.as_bytes()).and_then(GenerationPayload::into_request) {
            Err(AppError::Validation(details)) => details,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_valid_request() {
        let request = GenerationPayload::from_slice(
            br#"{"topic":"leadership-trends","audience":"executives","style":"casual"}"#,
        )
        .and_then(GenerationPayload::into_request)
        .unwrap();

        assert_eq!(request.topic, Topic::LeadershipTrends);
        assert_eq!(request.audience, Audience::Executives);
        assert_eq!(request.style, Some(Style::Casual));
    }

    #[test]
    fn test_style_is_optional() {
        let request = GenerationPayload::from_slice(
            br#"{"topic":"management-insights","audience":"entrepreneurs"}"#,
        )
        .and_then(GenerationPayload::into_request)
        .unwrap();
        assert_eq!(request.style, None);
    }

    #[test]
    fn test_invalid_topic() {
        let details = violations(r#"{"topic":"invalid-topic","audience":"executives"}"#);
        assert_eq!(details.len(), 1);
        assert_eq!(details[0].field, "topic");
        assert_eq!(details[0].message, "Invalid topic selected");
        assert_eq!(details[0].value.as_deref(), Some("invalid-topic"));
    }

    #[test]
    fn test_every_bad_field_is_reported_in_order() {
        let details = violations(r#"{"style":"loud","audience":"pirates"}"#);
        let fields: Vec<_> = details.iter().map(|d| d.field.as_str()).collect();
        assert_eq!(fields, vec!["topic", "audience", "style"]);
    }

    #[test]
    fn test_empty_body_reports_required_fields() {
        let details = violations("");
        let fields: Vec<_> = details.iter().map(|d| d.field.as_str()).collect();
        assert_eq!(fields, vec!["topic", "audience"]);
    }

    #[test]
    fn test_malformed_json() {
        let details = violations("{not json");
        assert_eq!(details.len(), 1);
        assert_eq!(details[0].field, "body");
        assert_eq!(details[0].message, "Request body must be a JSON object");
    }

    #[test]
    fn test_non_string_field_is_reported_on_that_field() {
        let details = violations(r#"{"topic": 5, "audience": "executives"}"#);
        assert_eq!(details.len(), 1);
        assert_eq!(details[0].field, "topic");
        assert_eq!(details[0].message, "Invalid topic selected");
        assert_eq!(details[0].value.as_deref(), Some("5"));
    }

    #[test]
    fn test_null_style_is_absent() {
        let request = GenerationPayload::from_slice(
            br#"{"topic":"leadership-trends","audience":"executives","style":null}"#,
        )
        .and_then(GenerationPayload::into_request)
        .unwrap();
        assert_eq!(request.style, None);
    }

    #[test]
    fn test_only_objects_are_accepted() {
        for body in [
            r#"["behavioral-psychology","executives",null]"#,
            r#""behavioral-psychology""#,
            "42",
        ] {
            let details = violations(body);
            assert_eq!(details.len(), 1, "{body}");
            assert_eq!(details[0].field, "body");
        }
    }
}
