//! Cookie-bearing redirect rewrite.
//!
//! Some intermediaries drop `Set-Cookie` on `3xx` responses, which breaks the
//! login callback. A redirect that sets cookies is turned into a `200` page
//! that carries the cookies and navigates client-side.

use axum::body::Body;
use axum::http::{header, HeaderValue, Response, StatusCode};

use crate::proxy::ProxyError;

/// True for a `3xx` response carrying both `Set-Cookie` and `Location`.
pub fn is_cookie_redirect<B>(response: &Response<B>) -> bool {
    response.status().is_redirection()
        && response.headers().contains_key(header::SET_COOKIE)
        && response.headers().contains_key(header::LOCATION)
}

/// Rewrite a cookie-bearing redirect; other responses pass through untouched.
pub fn rewrite_cookie_redirect(response: Response<Body>) -> Result<Response<Body>, ProxyError> {
    if !is_cookie_redirect(&response) {
        return Ok(response);
    }
    let headers = response.headers();
    let location = headers
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("/")
        .to_string();

    let mut builder = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, HeaderValue::from_static("text/html; charset=utf-8"))
        .header(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    for cookie in headers.get_all(header::SET_COOKIE) {
        builder = builder.header(header::SET_COOKIE, cookie.clone());
    }
    Ok(builder.body(Body::from(redirect_page(&location)))?)
}

fn redirect_page(location: &str) -> String {
    let attr = escape_html(location);
    // serde_json string literal; `<` escaped so the script element cannot be closed early
    let script = serde_json::Value::String(location.to_string())
        .to_string()
        .replace('<', "\\u003c");
    format!(
        "<!DOCTYPE html>\n<html><head><meta charset=\"utf-8\">\
         <meta http-equiv=\"refresh\" content=\"0;url={attr}\">\
         <script>window.location.replace({script});</script>\
         </head><body><a href=\"{attr}\">Continue</a></body></html>\n"
    )
}

fn escape_html(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
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
