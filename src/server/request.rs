use crate::context::RequestParts;
use http::Method;
use may_minihttp::Request;
use std::collections::HashMap;
use std::io::Read;
use tracing::debug;

/// Extract the pieces of a `may_minihttp::Request` the dispatcher needs.
///
/// Header names are lowercased here so every downstream lookup is
/// case-insensitive. The query string is stripped from the path; matching
/// operates on path segments only. `may_minihttp` does not expose the TCP
/// peer address, so `peer_addr` stays empty.
pub(crate) fn parse_request(mut req: Request) -> RequestParts {
    let method = Method::from_bytes(req.method().as_bytes()).unwrap_or(Method::GET);
    let raw_path = req.path().to_string();
    let path = raw_path.split('?').next().unwrap_or("/").to_string();

    let headers: HashMap<String, String> = req
        .headers()
        .iter()
        .map(|h| {
            (
                h.name.to_ascii_lowercase(),
                String::from_utf8_lossy(h.value).to_string(),
            )
        })
        .collect();

    let mut buf = Vec::new();
    let body = match req.body().read_to_end(&mut buf) {
        Ok(n) if n > 0 => Some(buf),
        _ => None,
    };

    debug!(
        method = %method,
        path = %path,
        header_count = headers.len(),
        body_bytes = body.as_ref().map_or(0, Vec::len),
        "request parsed"
    );

    RequestParts {
        method,
        path,
        headers,
        body,
        peer_addr: None,
    }
}
