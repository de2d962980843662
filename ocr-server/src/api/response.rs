//! Response formatting for the upload routes.
//!
//! Clients that list `application/json` anywhere in `Accept` (any case) get
//! the [`UploadResponse`] JSON document. Everyone else, including clients
//! that send no `Accept` header, gets a small HTML page.

use axum::{
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{Html, IntoResponse, Response},
    Json,
};

use crate::models::UploadResponse;

const PAGE_STYLE: &str = r#"
        code {
            background: #dadada;
            padding: 2px 6px;
            font-family: 'SFMono-Regular', Consolas, 'Liberation Mono', Menlo, monospace;
            font-size: 0.85em;
            font-weight: 600;
            border-radius: 5px;
        }
        pre {
            background: #dadada;
            padding: 16px;
            overflow: auto;
            font-family: 'SFMono-Regular', Consolas, 'Liberation Mono', Menlo, monospace;
            font-size: 0.85em;
            line-height: 1.45;
            border-radius: 5px;
        }
        pre code {
            background: transparent;
            padding: 0;
            font-size: inherit;
            color: inherit;
            font-weight: normal;
        }"#;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseFormat {
    Json,
    Html,
}

impl ResponseFormat {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        if wants_json(headers) {
            Self::Json
        } else {
            Self::Html
        }
    }
}

/// True when any `Accept` value contains `application/json`, ignoring case.
pub fn wants_json(headers: &HeaderMap) -> bool {
    headers
        .get_all(header::ACCEPT)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .any(|v| v.to_ascii_lowercase().contains("application/json"))
}

/// Escape `&`, `<` and `>` for embedding in HTML text.
pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn page(body: &str) -> String {
    format!(
        r#"<!doctype html>
<html>
<head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>OCR Server</title>
    <style>{PAGE_STYLE}
    </style>
</head>
<body>
{body}
</body>
</html>
"#
    )
}

/// Landing page: curl usage plus a browser upload form.
pub fn index_page(port: u16) -> String {
    page(&format!(
        r#"    <h1>OCR Server</h1>
    <h3>Upload an image via <code>upload</code> API:</h3>
    <pre><code>curl -H "Accept: application/json" \
  -X POST http://&lt;YOUR IP&gt;:{port}/upload \
  -F "file=@01.png"</code></pre>
    <hr>
    <h3>File Upload</h3>
    <form action="/upload" method="post" enctype="multipart/form-data">
        <label>
            Choose file:
            <input type="file" name="file" required>
        </label>
        <br><br>
        <input type="submit" value="Upload file">
    </form>"#
    ))
}

pub fn result_page(text: &str) -> String {
    page(&format!(
        "    <h2>OCR Result:</h2>\n    <pre>{}</pre>",
        html_escape(text)
    ))
}

pub fn message_page(message: &str) -> String {
    page(&format!(
        "    <h2>OCR Server</h2>\n    <p>{}</p>",
        html_escape(message)
    ))
}

/// Outcome of an upload, rendered in the negotiated format.
#[derive(Debug, Clone)]
pub struct UploadReply {
    pub status: StatusCode,
    pub format: ResponseFormat,
    pub body: UploadResponse,
}

impl UploadReply {
    pub fn new(status: StatusCode, format: ResponseFormat, body: UploadResponse) -> Self {
        Self {
            status,
            format,
            body,
        }
    }
}

impl IntoResponse for UploadReply {
    fn into_response(self) -> Response {
        match self.format {
            ResponseFormat::Json => (self.status, Json(self.body)).into_response(),
            ResponseFormat::Html => {
                let html = if self.body.success {
                    result_page(&self.body.ocr_result)
                } else {
                    message_page(&self.body.message)
                };
                let mut response = (self.status, Html(html)).into_response();
                response.headers_mut().insert(
                    header::CONTENT_TYPE,
                    HeaderValue::from_static("text/html; charset=utf-8"),
                );
                response
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers_with_accept(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::ACCEPT, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_negotiation_is_case_insensitive_substring() {
        assert_eq!(
            ResponseFormat::from_headers(&headers_with_accept("Application/JSON")),
            ResponseFormat::Json
        );
        assert_eq!(
            ResponseFormat::from_headers(&headers_with_accept(
                "text/html, application/json;q=0.9"
            )),
            ResponseFormat::Json
        );
        assert_eq!(
            ResponseFormat::from_headers(&headers_with_accept("text/html")),
            ResponseFormat::Html
        );
    }

    #[test]
    fn test_missing_accept_defaults_to_html() {
        assert_eq!(
            ResponseFormat::from_headers(&HeaderMap::new()),
            ResponseFormat::Html
        );
    }

    #[test]
    fn test_html_escape() {
        assert_eq!(
            html_escape("a < b && c > d"),
            "a &lt; b &amp;&amp; c &gt; d"
        );
        assert_eq!(html_escape("&lt;"), "&amp;lt;");
    }

    #[test]
    fn test_result_page_escapes_text() {
        let html = result_page("<script>alert(1)</script>\n");
        assert!(html.contains("&lt;script&gt;"));
        assert!(!html.contains("<script>"));
    }

    #[test]
    fn test_index_page_mentions_port_and_form() {
        let html = index_page(8123);
        assert!(html.contains(":8123/upload"));
        assert!(html.contains("File Upload"));
        assert!(html.contains(r#"name="file""#));
    }
}
