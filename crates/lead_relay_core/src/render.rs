use askama::Template;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;

use crate::contract::LeadPayload;
use crate::error::RelayError;

pub const PLACEHOLDER: &str = "N/A";
pub const DEFAULT_SOURCE: &str = "website";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeadField {
    pub label: &'static str,
    pub value: String,
}

/// Rendered notification. `text` and `html` are produced from the same `fields`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeadNotification {
    pub subject: String,
    pub fields: Vec<LeadField>,
    pub text: String,
    pub html: String,
}

#[derive(Template)]
#[template(
    source = "New lead received\n\n{% for field in fields %}{{ field.label }}: {{ field.value }}\n{% endfor %}",
    ext = "txt"
)]
struct TextBody<'a> {
    fields: &'a [LeadField],
}

#[derive(Template)]
#[template(
    source = "<h2>New Lead Received</h2>\n<ul>\n{% for field in fields %}  <li><strong>{{ field.label }}:</strong> {{ field.value }}</li>\n{% endfor %}</ul>\n",
    ext = "html"
)]
struct HtmlBody<'a> {
    fields: &'a [LeadField],
}

/// Empty and absent values both fall back to `placeholder`.
pub fn display_or<'a>(value: Option<&'a str>, placeholder: &'a str) -> &'a str {
    match value {
        Some(text) if !text.is_empty() => text,
        _ => placeholder,
    }
}

pub fn iso_timestamp(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn subject_for(lead: &LeadPayload) -> String {
    format!(
        "New lead from {}",
        display_or(lead.page_from.as_deref(), DEFAULT_SOURCE)
    )
}

pub fn lead_id_display(id: Option<&Value>) -> String {
    match id {
        None | Some(Value::Null) => PLACEHOLDER.to_string(),
        Some(Value::String(text)) => display_or(Some(text), PLACEHOLDER).to_string(),
        Some(other) => other.to_string(),
    }
}

pub fn lead_fields(lead: &LeadPayload, fallback_time: DateTime<Utc>) -> Vec<LeadField> {
    let field = |label: &'static str, value: &Option<String>| LeadField {
        label,
        value: display_or(value.as_deref(), PLACEHOLDER).to_string(),
    };
    let submitted_at = match lead.created_at.as_deref() {
        Some(created_at) if !created_at.is_empty() => created_at.to_string(),
        _ => iso_timestamp(fallback_time),
    };

    vec![
        field("Name", &lead.user_name),
        field("Email", &lead.email),
        field("Phone", &lead.phone_number),
        field("City", &lead.city),
        field("Course", &lead.course_of_interest),
        field("Preferred Colleges", &lead.preferred_colleges),
        field("Source", &lead.page_from),
        field("Message", &lead.message),
        LeadField {
            label: "Submitted At",
            value: submitted_at,
        },
        LeadField {
            label: "Lead ID",
            value: lead_id_display(lead.id.as_ref()),
        },
    ]
}

impl LeadNotification {
    pub fn render(lead: &LeadPayload, fallback_time: DateTime<Utc>) -> Result<Self, RelayError> {
        let fields = lead_fields(lead, fallback_time);
        let text = TextBody { fields: &fields }
            .render()
            .map_err(|error| RelayError::Render(error.to_string()))?;
        let html = HtmlBody { fields: &fields }
            .render()
            .map_err(|error| RelayError::Render(error.to_string()))?;

        Ok(Self {
            subject: subject_for(lead),
            fields,
            text,
            html,
        })
    }

    pub fn field(&self, label: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|field| field.label == label)
            .map(|field| field.value.as_str())
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn fixed_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 9, 30, 0)
            .single()
            .expect("valid timestamp")
    }

    fn full_lead() -> LeadPayload {
        LeadPayload {
            id: Some(Value::from("lead-77")),
            user_name: Some("Asha Rao".to_string()),
            email: Some("asha@example.com".to_string()),
            phone_number: Some("9876543210".to_string()),
            city: Some("Pune".to_string()),
            course_of_interest: Some("MBA".to_string()),
            preferred_colleges: Some("IIM Ahmedabad, XLRI".to_string()),
            message: Some("Please call after 6pm".to_string()),
            page_from: Some("mba-landing".to_string()),
            created_at: Some("2026-02-28T18:00:00.000Z".to_string()),
        }
    }

    #[test]
    fn display_or_collapses_empty_to_placeholder() {
        assert_eq!(display_or(None, PLACEHOLDER), "N/A");
        assert_eq!(display_or(Some(""), PLACEHOLDER), "N/A");
        assert_eq!(display_or(Some(" "), PLACEHOLDER), " ");
        assert_eq!(display_or(Some("Pune"), PLACEHOLDER), "Pune");
    }

    #[test]
    fn subject_defaults_to_website() {
        assert_eq!(subject_for(&LeadPayload::default()), "New lead from website");
        assert_eq!(subject_for(&full_lead()), "New lead from mba-landing");
    }

    #[test]
    fn text_and_html_carry_same_fields_in_order() {
        let notification =
            LeadNotification::render(&full_lead(), fixed_time()).expect("render should work");

        let labels: Vec<&str> = notification.fields.iter().map(|f| f.label).collect();
        assert_eq!(
            labels,
            vec![
                "Name",
                "Email",
                "Phone",
                "City",
                "Course",
                "Preferred Colleges",
                "Source",
                "Message",
                "Submitted At",
                "Lead ID",
            ]
        );

        let mut text_cursor = 0;
        let mut html_cursor = 0;
        for field in &notification.fields {
            let text_line = format!("{}: {}\n", field.label, field.value);
            let html_item = format!(
                "<li><strong>{}:</strong> {}</li>",
                field.label, field.value
            );

            let text_pos = notification.text[text_cursor..]
                .find(&text_line)
                .unwrap_or_else(|| panic!("text body missing {text_line:?}"));
            let html_pos = notification.html[html_cursor..]
                .find(&html_item)
                .unwrap_or_else(|| panic!("html body missing {html_item:?}"));
            text_cursor += text_pos + text_line.len();
            html_cursor += html_pos + html_item.len();
        }
        assert!(notification.html.starts_with("<h2>New Lead Received</h2>"));
    }

    #[test]
    fn absent_fields_render_placeholder_in_both_bodies() {
        let lead = LeadPayload {
            user_name: Some("Ravi".to_string()),
            city: Some(String::new()),
            ..LeadPayload::default()
        };

        let notification =
            LeadNotification::render(&lead, fixed_time()).expect("render should work");

        for label in ["Email", "Phone", "City", "Course", "Message", "Lead ID"] {
            assert_eq!(notification.field(label), Some("N/A"));
            assert!(notification.text.contains(&format!("{label}: N/A\n")));
            assert!(notification
                .html
                .contains(&format!("<li><strong>{label}:</strong> N/A</li>")));
        }
        assert_eq!(notification.field("Name"), Some("Ravi"));
    }

    #[test]
    fn missing_created_at_uses_fallback_time() {
        let notification = LeadNotification::render(&LeadPayload::default(), fixed_time())
            .expect("render should work");

        assert_eq!(
            notification.field("Submitted At"),
            Some("2026-03-01T09:30:00.000Z")
        );
    }

    #[test]
    fn numeric_lead_id_renders_as_number() {
        let lead = LeadPayload {
            id: Some(Value::from(0)),
            ..LeadPayload::default()
        };

        assert_eq!(lead_id_display(lead.id.as_ref()), "0");
        assert_eq!(lead_id_display(Some(&Value::from(""))), "N/A");
        assert_eq!(lead_id_display(Some(&Value::Null)), "N/A");
    }

    #[test]
    fn html_body_escapes_markup_but_text_keeps_it() {
        let lead = LeadPayload {
            message: Some("<b>call me</b> & soon".to_string()),
            ..LeadPayload::default()
        };

        let notification =
            LeadNotification::render(&lead, fixed_time()).expect("render should work");

        assert!(notification.text.contains("Message: <b>call me</b> & soon\n"));
        assert!(notification.html.contains("&lt;b&gt;call me&lt;"));
        assert!(!notification.html.contains("<b>call me"));
    }
}
