use super::{
    script_channel, Document, DocumentError, HostCapabilities, ReadyState, ScriptElement,
    ScriptHandle, ScriptLoadControl,
};
use std::sync::{Mutex, MutexGuard};

/// How an [`HtmlDocument`] settles external script loads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HostMode {
    /// Mark external scripts complete as soon as they are appended; the
    /// rendered page fetches them natively
    #[default]
    Immediate,
    /// Queue load controls so an embedding host can drive them
    Deferred,
}

/// Document model that collects head scripts and renders them as HTML
#[derive(Debug, Default)]
pub struct HtmlDocument {
    title: Option<String>,
    capabilities: HostCapabilities,
    mode: HostMode,
    head: Mutex<Vec<ScriptElement>>,
    pending: Mutex<Vec<ScriptLoadControl>>,
}

impl HtmlDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_capabilities(mut self, capabilities: HostCapabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn with_mode(mut self, mode: HostMode) -> Self {
        self.mode = mode;
        self
    }

    /// Script elements in append order
    pub fn elements(&self) -> Vec<ScriptElement> {
        self.lock_head().clone()
    }

    /// Sources of all inline scripts in append order
    pub fn inline_sources(&self) -> Vec<String> {
        self.lock_head()
            .iter()
            .filter_map(|element| match element {
                ScriptElement::Inline { source } => Some(source.clone()),
                ScriptElement::External { .. } => None,
            })
            .collect()
    }

    /// Drain load controls queued in [`HostMode::Deferred`]
    pub fn take_pending(&self) -> Vec<ScriptLoadControl> {
        std::mem::take(&mut *self.pending.lock().unwrap_or_else(|e| e.into_inner()))
    }

    /// Render the document with every appended script in its head
    pub fn render(&self) -> String {
        let mut html = String::from("<!DOCTYPE html>\n<html>\n<head>\n");
        if let Some(title) = &self.title {
            html.push_str(&format!("<title>{}</title>\n", escape_attribute(title)));
        }

        for element in self.lock_head().iter() {
            match element {
                ScriptElement::Inline { source } => {
                    html.push_str("<script type=\"text/javascript\">");
                    html.push_str(&escape_inline_script(source));
                    html.push_str("</script>\n");
                }
                ScriptElement::External { url } => {
                    html.push_str(&format!(
                        "<script type=\"text/javascript\" src=\"{}\"></script>\n",
                        escape_attribute(url)
                    ));
                }
            }
        }

        html.push_str("</head>\n<body>\n</body>\n</html>\n");
        html
    }

    fn lock_head(&self) -> MutexGuard<'_, Vec<ScriptElement>> {
        self.head.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Document for HtmlDocument {
    fn capabilities(&self) -> HostCapabilities {
        self.capabilities
    }

    fn append_inline(&self, source: &str) -> Result<(), DocumentError> {
        self.lock_head().push(ScriptElement::Inline {
            source: source.to_string(),
        });
        Ok(())
    }

    fn append_external(&self, url: &str) -> Result<ScriptHandle, DocumentError> {
        self.lock_head().push(ScriptElement::External {
            url: url.to_string(),
        });

        let (handle, control) = script_channel(url);
        match self.mode {
            HostMode::Immediate => control.set_state(ReadyState::Complete),
            HostMode::Deferred => {
                control.set_state(ReadyState::Loading);
                self.pending
                    .lock()
                    .unwrap_or_else(|e| e.into_inner())
                    .push(control);
            }
        }

        Ok(handle)
    }
}

/// Keep inline source from closing its own `<script>` element early
fn escape_inline_script(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut rest = source;

    while let Some(idx) = rest.find('<') {
        out.push_str(&rest[..idx]);
        let tail = &rest[idx..];
        let lowered = tail
            .get(..8)
            .map(|head| head.to_ascii_lowercase())
            .unwrap_or_default();

        if lowered == "</script" {
            out.push_str("<\\/");
            rest = &tail[2..];
        } else if tail.starts_with("<!--") {
            out.push_str("<\\!--");
            rest = &tail[4..];
        } else {
            out.push('<');
            rest = &tail[1..];
        }
    }

    out.push_str(rest);
    out
}

fn escape_attribute(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inline_scripts_render_in_order() {
        let doc = HtmlDocument::new().with_title("demo");
        doc.append_inline("var a = 1;").unwrap();
        doc.append_inline("var b = 2;").unwrap();

        let html = doc.render();
        let a = html.find("var a = 1;").unwrap();
        let b = html.find("var b = 2;").unwrap();
        assert!(a < b);
        assert!(html.contains("<title>demo</title>"));
        assert_eq!(doc.inline_sources(), vec!["var a = 1;", "var b = 2;"]);
    }

    #[test]
    fn test_inline_escape_closing_tag() {
        let doc = HtmlDocument::new();
        doc.append_inline("document.write('</SCRIPT><!-- x');").unwrap();

        let html = doc.render();
        assert!(html.contains("document.write('<\\/SCRIPT><\\!-- x');"));
        assert_eq!(html.matches("</script>").count(), 1);
    }

    #[test]
    fn test_escape_handles_multibyte_text() {
        assert_eq!(escape_inline_script("a<é"), "a<é");
        assert_eq!(escape_inline_script("日本<b>"), "日本<b>");
    }

    #[test]
    fn test_external_script_immediate_mode_completes() {
        let doc = HtmlDocument::new();
        let handle = doc.append_external("https://cdn.example/lib.js?a=1&b=2").unwrap();

        assert_eq!(handle.ready_state(), ReadyState::Complete);
        assert!(doc
            .render()
            .contains("src=\"https://cdn.example/lib.js?a=1&amp;b=2\""));
    }

    #[test]
    fn test_external_script_deferred_mode_queues_control() {
        let doc = HtmlDocument::new().with_mode(HostMode::Deferred);
        let handle = doc.append_external("/lib.js").unwrap();

        assert_eq!(handle.ready_state(), ReadyState::Loading);
        let pending = doc.take_pending();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].url(), "/lib.js");

        pending[0].set_state(ReadyState::Loaded);
        assert_eq!(handle.ready_state(), ReadyState::Loaded);
        assert!(doc.take_pending().is_empty());
    }
}
