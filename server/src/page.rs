//! The single HTML page: form, result area and audio player.

/// Target languages offered in the form.
pub const TARGET_LANGUAGES: &[(&str, &str)] = &[
    ("en", "English"),
    ("fr", "French"),
    ("de", "German"),
    ("es", "Spanish"),
    ("hi", "Hindi"),
];

const TONES: &[(&str, &str)] = &[("neutral", "Neutral"), ("formal", "Formal"), ("casual", "Casual")];

/// Values rendered into the page.
#[derive(Debug, Clone, Default)]
pub struct PageView {
    pub input_text: String,
    pub target_lang: String,
    pub tone: String,
    pub result: String,
    pub error_kind: Option<&'static str>,
    pub audio_file: Option<String>,
    pub audio_mime: Option<&'static str>,
}

pub fn render(view: &PageView) -> String {
    let mut html = String::with_capacity(2048);
    html.push_str(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>Translate &amp; Speak</title>
<style>
body { font-family: sans-serif; max-width: 40rem; margin: 2rem auto; padding: 0 1rem; }
textarea { width: 100%; min-height: 8rem; }
.result { margin-top: 1.5rem; padding: 1rem; background: #f4f4f4; white-space: pre-wrap; }
.result.error { background: #fde8e8; color: #8a1c1c; }
</style>
</head>
<body>
<h1>Translate &amp; Speak</h1>
<form method="post" action="/">
<label for="input_text">Text</label>
<textarea id="input_text" name="input_text" required>"#,
    );
    html.push_str(&escape_html(&view.input_text));
    html.push_str("</textarea>\n<label for=\"target_lang\">Translate to</label>\n<select id=\"target_lang\" name=\"target_lang\">\n");
    for (code, name) in TARGET_LANGUAGES {
        push_option(&mut html, code, name, *code == view.target_lang);
    }
    html.push_str("</select>\n<label for=\"tone\">Tone</label>\n<select id=\"tone\" name=\"tone\">\n");
    for (value, name) in TONES {
        push_option(&mut html, value, name, *value == view.tone);
    }
    html.push_str("</select>\n<button type=\"submit\">Translate</button>\n</form>\n");

    if !view.result.is_empty() {
        match view.error_kind {
            Some(kind) => html.push_str(&format!(
                "<div class=\"result error\" data-error-kind=\"{}\">",
                escape_html(kind)
            )),
            None => html.push_str("<div class=\"result\">"),
        }
        html.push_str(&escape_html(&view.result));
        html.push_str("</div>\n");
    }

    if let Some(audio) = &view.audio_file {
        let src = escape_html(audio);
        let mime = view.audio_mime.unwrap_or("audio/mpeg");
        html.push_str(&format!(
            "<audio controls><source src=\"{src}\" type=\"{mime}\"></audio>\n<p><a href=\"{src}\" download>Download audio</a></p>\n"
        ));
    }

    html.push_str("</body>\n</html>\n");
    html
}

fn push_option(html: &mut String, value: &str, label: &str, selected: bool) {
    html.push_str(&format!(
        "<option value=\"{}\"{}>{}</option>\n",
        escape_html(value),
        if selected { " selected" } else { "" },
        escape_html(label)
    ));
}

pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_view_renders_form_without_result() {
        let html = render(&PageView::default());
        assert!(html.contains("name=\"input_text\""));
        assert!(html.contains("name=\"target_lang\""));
        assert!(html.contains("name=\"tone\""));
        assert!(!html.contains("class=\"result"));
        assert!(!html.contains("<audio"));
    }

    #[test]
    fn result_and_audio_are_rendered() {
        let view = PageView {
            input_text: "Hello".into(),
            target_lang: "de".into(),
            tone: "formal".into(),
            result: "Hallo".into(),
            audio_file: Some("/static/output.mp3".into()),
            ..Default::default()
        };
        let html = render(&view);
        assert!(html.contains("<div class=\"result\">Hallo</div>"));
        assert!(html.contains(
            "<audio controls><source src=\"/static/output.mp3\" type=\"audio/mpeg\"></audio>"
        ));
        assert!(html.contains("<a href=\"/static/output.mp3\" download>"));
        assert!(html.contains("<option value=\"de\" selected>German</option>"));
        assert!(html.contains("<option value=\"formal\" selected>Formal</option>"));
    }

    #[test]
    fn error_is_marked_with_its_kind() {
        let view = PageView {
            result: "Error: Detected language 'ru' is not supported.".into(),
            error_kind: Some("unsupported_language"),
            ..Default::default()
        };
        let html = render(&view);
        assert!(html.contains("data-error-kind=\"unsupported_language\""));
        assert!(html.contains("Error: Detected language &#39;ru&#39; is not supported."));
    }

    #[test]
    fn user_text_is_escaped() {
        assert_eq!(
            escape_html(r#"<b>"Tom & Jerry's"</b>"#),
            "&lt;b&gt;&quot;Tom &amp; Jerry&#39;s&quot;&lt;/b&gt;"
        );
    }
}
