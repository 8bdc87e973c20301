use serde::Serialize;

use crate::error::{Error, Result};
use crate::sources::IssueRecord;

const TEMPLATE_NAME: &str = "message";

#[derive(Serialize)]
struct MessageContext<'a> {
    status_line: &'a str,
    id: u64,
    title: String,
    link: &'a str,
}

/// Renders announcement text for an issue from an `upon` template.
///
/// Available variables: `status_line`, `id`, `title` (HTML-escaped) and `link`.
pub struct MessageRenderer {
    engine: upon::Engine<'static>,
    status_line: String,
}

impl MessageRenderer {
    pub fn new(template: &str, status_line: &str) -> Result<Self> {
        let mut engine = upon::Engine::new();
        engine
            .add_template(TEMPLATE_NAME, template.to_string())
            .map_err(|e| Error::Template(format!("invalid message template: {e}")))?;
        Ok(Self {
            engine,
            status_line: status_line.to_string(),
        })
    }

    pub fn render(&self, record: &IssueRecord) -> Result<String> {
        let ctx = MessageContext {
            status_line: &self.status_line,
            id: record.id,
            title: escape_html(&record.title),
            link: &record.link,
        };
        self.engine
            .template(TEMPLATE_NAME)
            .render(&ctx)
            .to_string()
            .map_err(|e| Error::Template(format!("failed to render issue #{}: {e}", record.id)))
    }
}

/// Escape the characters Telegram's HTML parse mode treats as markup.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_MESSAGE_TEMPLATE;

    fn record(id: u64, title: &str) -> IssueRecord {
        IssueRecord {
            id,
            title: title.to_string(),
            link: format!("<a href=\"https://rm.example.com/issues/{id}\">Issue #{id}</a>"),
        }
    }

    #[test]
    fn test_default_layout() {
        let renderer = MessageRenderer::new(DEFAULT_MESSAGE_TEMPLATE, "New issue:").unwrap();
        let text = renderer.render(&record(11, "Printer on fire")).unwrap();
        assert_eq!(
            text,
            "New issue:\nPrinter on fire\n<a href=\"https://rm.example.com/issues/11\">Issue #11</a>\n"
        );
    }

    #[test]
    fn test_title_is_escaped_link_is_not() {
        let renderer = MessageRenderer::new(DEFAULT_MESSAGE_TEMPLATE, "New issue:").unwrap();
        let text = renderer.render(&record(3, "a < b && c > d")).unwrap();
        assert!(text.contains("a &lt; b &amp;&amp; c &gt; d"));
        assert!(text.contains("<a href="));
    }

    #[test]
    fn test_custom_template() {
        let renderer = MessageRenderer::new("<b>{{ status_line }}</b> #{{ id }}: {{ title }}", "New").unwrap();
        let text = renderer.render(&record(5, "Crash")).unwrap();
        assert_eq!(text, "<b>New</b> #5: Crash");
    }

    #[test]
    fn test_invalid_template_rejected() {
        let err = MessageRenderer::new("{{ title ", "New").err().unwrap();
        assert!(err.to_string().contains("invalid message template"));
    }

    #[test]
    fn test_unknown_variable_fails_render() {
        let renderer = MessageRenderer::new("{{ assignee }}", "New").unwrap();
        let err = renderer.render(&record(5, "Crash")).unwrap_err();
        assert!(err.to_string().contains("issue #5"));
    }

    #[test]
    fn test_escape_html_plain_text_unchanged() {
        assert_eq!(escape_html("Ошибка входа"), "Ошибка входа");
    }
}
