// Nonce discovery: walks an alignment and classifies per-pair differences
// into typed nonces. Grounded on `nonces_helper.py`'s diff logic, rewritten
// against the typed `HttpRequest`/`HttpResponse` derived views instead of
// repeated ad hoc parsing.

use std::collections::HashSet;

use indexmap::IndexSet;

use crate::http::Pair;
use crate::matcher::Alignment;

use super::types::{Nonce, NonceKind, Origin, UrlComponent};

/// The two nonce sets produced by a single alignment pass.
pub struct NonceSets {
    pub request_nonces: IndexSet<Nonce>,
    pub response_nonces: IndexSet<Nonce>,
}

/// Walk `alignment` (indices into `a` and `b`) and emit request/response
/// nonces, deduplicated against a single `found_nonces` set spanning both
/// sides and every pair in the alignment. Every emitted nonce's
/// `origin_pair` is the recorded (`a`) side, since that's the trace the
/// Replayer mirrors and the Dynamic Pruner shrinks.
pub fn find_nonces(a: &[Pair], b: &[Pair], alignment: &Alignment) -> NonceSets {
    let mut found_nonces: HashSet<String> = HashSet::new();
    let mut request_nonces = IndexSet::new();
    let mut response_nonces = IndexSet::new();

    for &(i, j) in alignment {
        let p = &a[i];
        let q = &b[j];

        for nonce in request_diffs(p, q) {
            if found_nonces.insert(nonce.value.clone()) {
                request_nonces.insert(nonce);
            }
        }
        for nonce in response_diffs(p, q) {
            if found_nonces.insert(nonce.value.clone()) {
                response_nonces.insert(nonce);
            }
        }
    }

    NonceSets { request_nonces, response_nonces }
}

fn request_diffs(p: &Pair, q: &Pair) -> Vec<Nonce> {
    let mut out = Vec::new();
    let (pr, qr) = (&p.request, &q.request);

    if pr.url != qr.url {
        out.extend(url_pair_diffs(&pr.url, &qr.url, p, Origin::Request, NonceKind::Url));
    }

    let auth_p = pr.header("authorization");
    let auth_q = qr.header("authorization");
    if auth_p != auth_q {
        if let Some(value) = auth_p {
            if let Some(token) = value.split_whitespace().nth(1) {
                if !token.is_empty() {
                    out.push(Nonce::new(Origin::Request, p.clone(), token, NonceKind::Authorization, None));
                }
            }
        }
    } else {
        let cookies_p = pr.cookies();
        let cookies_q = qr.cookies();
        if cookies_p != cookies_q {
            for (name, value) in &cookies_p {
                if !value.is_empty() && matches!(cookies_q.get(name), Some(v) if v != value) {
                    out.push(Nonce::new(Origin::Request, p.clone(), value.clone(), NonceKind::Cookie, Some(name.clone())));
                }
            }
        }
    }

    out
}

fn response_diffs(p: &Pair, q: &Pair) -> Vec<Nonce> {
    let mut out = Vec::new();
    let (pres, qres) = (&p.response, &q.response);

    if pres.json_content().is_some() && qres.json_content().is_some() {
        let flat_p = pres.flattened_json();
        let flat_q: std::collections::HashMap<_, _> = qres.flattened_json().into_iter().collect();
        for (key, value) in flat_p {
            if !value.is_empty() && matches!(flat_q.get(&key), Some(v) if v != &value) {
                out.push(Nonce::new(Origin::Response, p.clone(), value, NonceKind::Json, Some(key)));
            }
        }
    }

    let form_p = pres.url_encoded_content();
    let form_q = qres.url_encoded_content();
    if !form_p.is_empty() || !form_q.is_empty() {
        for (key, value) in &form_p {
            if !value.is_empty() && matches!(form_q.get(key), Some(v) if v != value) {
                out.push(Nonce::new(Origin::Response, p.clone(), value.clone(), NonceKind::FormUrlEncoded, Some(key.clone())));
            }
        }
    }

    let hidden_p = pres.hidden_inputs();
    let hidden_q = qres.hidden_inputs();
    for (locator, value) in &hidden_p {
        if !value.is_empty() && matches!(hidden_q.get(locator), Some(v) if v != value) {
            out.push(Nonce::new(Origin::Response, p.clone(), value.clone(), NonceKind::HtmlHiddenInput, Some(locator.clone())));
        }
    }

    let cookies_p = pres.set_cookies();
    let cookies_q = qres.set_cookies();
    for (name, value) in &cookies_p {
        if !value.is_empty() && matches!(cookies_q.get(name), Some(v) if v != value) {
            out.push(Nonce::new(Origin::Response, p.clone(), value.clone(), NonceKind::SetCookie, Some(name.clone())));
        }
    }

    let status_p_3xx = (300..400).contains(&pres.status_code);
    let status_q_3xx = (300..400).contains(&qres.status_code);
    if status_p_3xx && status_q_3xx {
        let loc_p = pres.header("location");
        let loc_q = qres.header("location");
        if loc_p != loc_q {
            if let (Some(lp), Some(lq)) = (loc_p, loc_q) {
                out.extend(url_pair_diffs(lp, lq, p, Origin::Response, NonceKind::Location));
            }
        }
    } else if pres.status_code == 200 && qres.status_code == 302 {
        if let (Some(meta), Some(loc)) = (pres.meta_refresh_url(), qres.header("location")) {
            out.extend(url_pair_diffs(&meta, loc, p, Origin::Response, NonceKind::Location));
        }
    } else if pres.status_code == 302 && qres.status_code == 200 {
        if let (Some(loc), Some(meta)) = (pres.header("location"), qres.meta_refresh_url()) {
            out.extend(url_pair_diffs(loc, &meta, p, Origin::Response, NonceKind::MetaRedirect));
        }
    }

    out
}

/// Component-wise diff of two URLs as plain strings: fragment, then every
/// query key present in the first (missing in the second is skipped), then
/// path segments positionally up to the shorter path. Used for both
/// request-vs-request URL diffs and the `location`/meta-refresh response
/// nonce kinds, which only ever have a raw URL string to work with.
fn url_pair_diffs(first: &str, second: &str, origin_pair: &Pair, origin: Origin, kind_fn: impl Fn(UrlComponent) -> NonceKind) -> Vec<Nonce> {
    let mut out = Vec::new();
    let (ua, ub) = match (url::Url::parse(first), url::Url::parse(second)) {
        (Ok(ua), Ok(ub)) => (ua, ub),
        _ => return out,
    };

    let frag_a = ua.fragment().unwrap_or("");
    let frag_b = ub.fragment().unwrap_or("");
    if frag_a != frag_b && !frag_a.is_empty() {
        out.push(Nonce::new(origin, origin_pair.clone(), frag_a, kind_fn(UrlComponent::Fragment), None));
    }

    let query_a = crate::http::parse_kv_pairs(ua.query().unwrap_or(""), '&');
    let query_b = crate::http::parse_kv_pairs(ub.query().unwrap_or(""), '&');
    for (name, value) in &query_a {
        if !value.is_empty() && matches!(query_b.get(name), Some(v) if v != value) {
            out.push(Nonce::new(origin, origin_pair.clone(), value.clone(), kind_fn(UrlComponent::Query), Some(name.clone())));
        }
    }

    let segs_a: Vec<&str> = ua.path_segments().map(|s| s.collect()).unwrap_or_default();
    let segs_b: Vec<&str> = ub.path_segments().map(|s| s.collect()).unwrap_or_default();
    for (idx, (sa, sb)) in segs_a.iter().zip(segs_b.iter()).enumerate() {
        if sa != sb && !sa.is_empty() {
            out.push(Nonce::new(origin, origin_pair.clone(), *sa, kind_fn(UrlComponent::Path), Some(idx.to_string())));
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{HttpRequest, HttpResponse};
    use indexmap::IndexMap;

    fn req(method: &str, url: &str) -> HttpRequest {
        HttpRequest::new(method, url, "HTTP/1.1", IndexMap::new(), Vec::new())
    }

    fn json_response(body: &str) -> HttpResponse {
        let mut headers = IndexMap::new();
        headers.insert("content-type".to_string(), "application/json".to_string());
        HttpResponse::new(200, "OK", "HTTP/1.1", headers, Vec::new(), body.as_bytes().to_vec())
    }

    #[test]
    fn json_body_diff_becomes_response_nonce() {
        let p = Pair::new(req("GET", "http://a.com/"), json_response(r#"{"tok":"OLD"}"#));
        let q = Pair::new(req("GET", "http://a.com/"), json_response(r#"{"tok":"NEW"}"#));
        let sets = find_nonces(&[p], &[q], &vec![(0, 0)]);
        assert_eq!(sets.response_nonces.len(), 1);
        let n = sets.response_nonces.iter().next().unwrap();
        assert_eq!(n.value, "OLD");
        assert_eq!(n.key.as_deref(), Some("|tok"));
    }

    #[test]
    fn path_segment_diff_becomes_request_nonce() {
        let p = Pair::new(req("GET", "http://a.com/session/ABC123"), HttpResponse::new(200, "OK", "HTTP/1.1", IndexMap::new(), Vec::new(), Vec::new()));
        let q = Pair::new(req("GET", "http://a.com/session/XYZ789"), HttpResponse::new(200, "OK", "HTTP/1.1", IndexMap::new(), Vec::new(), Vec::new()));
        let sets = find_nonces(&[p], &[q], &vec![(0, 0)]);
        assert_eq!(sets.request_nonces.len(), 1);
        let n = sets.request_nonces.iter().next().unwrap();
        assert_eq!(n.value, "ABC123");
        assert!(matches!(n.kind, NonceKind::Url(UrlComponent::Path)));
    }
}
