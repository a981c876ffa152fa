//! Module-file access gate.
//!
//! Published package files are untrusted user content. They may be read
//! straight from object storage by `fetch()`-style consumers, but a browser
//! must never navigate to them as a same-origin document: navigations go to
//! the frontend, which renders the file inside its own sandbox.

use axum::http::Method;

use crate::http::request::RequestContext;

/// Decide whether a request may read a module file directly from storage.
pub fn can_access_module_file(ctx: &RequestContext) -> bool {
    if ctx.method != Method::GET && ctx.method != Method::HEAD {
        return false;
    }

    if ctx
        .accept
        .as_deref()
        .is_some_and(|accept| accept.starts_with("text/html"))
    {
        return false;
    }

    match ctx.sec_fetch_dest.as_deref() {
        None | Some("empty") => true,
        Some("image") | Some("video") => ctx.sec_fetch_site.as_deref() == Some("same-origin"),
        Some(_) => false,
    }
}
