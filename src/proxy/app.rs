//! App-backend mode: frontend and API services.

use std::time::Duration;

use axum::body::Body;
use axum::http::Request;
use url::Url;

use crate::http::request::RequestContext;
use crate::proxy::cache::CacheKey;
use crate::proxy::forward::{authority, backend_uri, set_forwarding_headers, strip_hop_by_hop};
use crate::proxy::redirect::rewrite_cookie_redirect;
use crate::proxy::{mark_private, CacheStatus, ProxyClient, ProxyError, ProxyOutcome};
use crate::routing::PathRewrite;

impl ProxyClient {
    /// Forward `request` to an app backend rooted at `base`.
    ///
    /// Requests without credentials or a session cookie share the edge cache;
    /// all others bypass it and their responses are marked `private, no-store`.
    pub async fn proxy_to_backend(
        &self,
        ctx: &RequestContext,
        request: Request<Body>,
        base: &Url,
        rewrite: PathRewrite,
    ) -> Result<ProxyOutcome, ProxyError> {
        let path = rewrite.apply(&ctx.path);
        let uri = backend_uri(base, &path, ctx.query.as_deref())?;

        let (mut parts, body) = request.into_parts();
        strip_hop_by_hop(&mut parts.headers);
        set_forwarding_headers(&mut parts.headers, ctx, &authority(base))?;

        let eligible = self.session.is_cache_eligible(ctx);
        let cache = self.cache.as_ref().filter(|_| eligible && ctx.is_read());
        let key = CacheKey::new(&parts.method, &uri);

        if let Some(hit) = cache.and_then(|c| c.get(&key)) {
            tracing::debug!(uri = %uri, "Edge cache hit");
            return Ok(ProxyOutcome {
                response: hit.to_response(ctx.if_none_match.as_deref()),
                cache: CacheStatus::Hit,
                elapsed: Duration::ZERO,
            });
        }

        parts.uri = uri;
        let (response, elapsed) = self.send(Request::from_parts(parts, body)).await?;
        let mut response = rewrite_cookie_redirect(response)?;

        let (response, status) = match cache {
            Some(cache) => cache.store_response(key, response).await?,
            None => {
                if !eligible {
                    mark_private(&mut response);
                }
                (response, CacheStatus::Bypass)
            }
        };

        Ok(ProxyOutcome {
            response,
            cache: status,
            elapsed,
        })
    }
}
