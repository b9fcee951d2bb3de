use crate::context::{ContentType, ResponseParts};
use may_minihttp::Response;

fn status_reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        204 => "No Content",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        429 => "Too Many Requests",
        500 => "Internal Server Error",
        _ => "OK",
    }
}

/// Map accumulated response state onto the wire response.
///
/// `may_minihttp` only accepts static header lines, hence the fixed
/// content-type mapping. A handler that wrote nothing produces an empty
/// 200.
pub(crate) fn write_response(res: &mut Response, parts: &ResponseParts) {
    let status = parts.status.unwrap_or(200);
    res.status_code(status as usize, status_reason(status));
    match parts.content_type {
        ContentType::Json => res.header("Content-Type: application/json"),
        ContentType::Text => res.header("Content-Type: text/plain"),
    };
    if let Some(body) = &parts.body {
        res.body_vec(body.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reasons_cover_dispatch_statuses() {
        assert_eq!(status_reason(200), "OK");
        assert_eq!(status_reason(404), "Not Found");
        assert_eq!(status_reason(429), "Too Many Requests");
        assert_eq!(status_reason(500), "Internal Server Error");
        assert_eq!(status_reason(299), "OK");
    }
}
