use crate::context::RawParams;
use crate::handler::{ErasedHandler, ParamKind};
use crate::ids::RouteId;
use crate::params::{ParamSpec, ParamType};
use crate::rate::RateLimiter;
use http::Method;
use std::sync::Arc;

/// One pattern segment. Parameter segments bind the corresponding request
/// segment unconditionally; literals must match exactly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Segment {
    Literal(String),
    Param(String),
}

/// A registered endpoint: pattern, method, handler, declared parameter
/// types, and optional rate-limiter binding.
pub struct Route {
    pub id: RouteId,
    pub pattern: String,
    pub method: Method,
    pub websocket: bool,
    pub(crate) segments: Vec<Segment>,
    pub(crate) handler: ErasedHandler,
    pub(crate) param_specs: Arc<[ParamSpec]>,
    pub(crate) limiter: Option<Arc<RateLimiter>>,
}

impl Route {
    pub(crate) fn new(
        method: Method,
        pattern: &str,
        websocket: bool,
        handler: ErasedHandler,
    ) -> Self {
        let id = RouteId::derive(&method, pattern);
        let (segments, specs) = parse_pattern(pattern);
        Self {
            id,
            pattern: pattern.to_string(),
            method,
            websocket,
            segments,
            handler,
            param_specs: specs.into(),
            limiter: None,
        }
    }

    /// Declared path parameters, in pattern order.
    #[must_use]
    pub fn param_specs(&self) -> &[ParamSpec] {
        &self.param_specs
    }

    /// Parameter descriptors of the registered handler.
    #[must_use]
    pub fn param_kinds(&self) -> &[ParamKind] {
        self.handler.param_kinds()
    }

    #[must_use]
    pub fn is_rate_limited(&self) -> bool {
        self.limiter.is_some()
    }

    /// Walk request segments pairwise against the pattern. Returns the bound
    /// parameters on success. The caller has already checked the method and
    /// segment count.
    pub(crate) fn bind_segments(&self, request_segments: &[&str]) -> Option<RawParams> {
        let mut params = RawParams::new();
        for (pattern_seg, request_seg) in self.segments.iter().zip(request_segments) {
            match pattern_seg {
                Segment::Param(name) => {
                    params.push((name.clone(), (*request_seg).to_string()));
                }
                Segment::Literal(lit) => {
                    if lit != request_seg {
                        return None;
                    }
                }
            }
        }
        Some(params)
    }
}

/// Post-registration configuration handle for a route.
pub struct RouteHandle<'r> {
    pub(crate) route: &'r mut Route,
}

impl RouteHandle<'_> {
    /// Attach a shared rate limiter; the route then requires a token per
    /// client before dispatch.
    pub fn rate_limit(self, limiter: &Arc<RateLimiter>) -> Self {
        self.route.limiter = Some(Arc::clone(limiter));
        self
    }

    #[must_use]
    pub fn id(&self) -> RouteId {
        self.route.id
    }
}

/// Split a path into segments, ignoring leading and trailing slashes.
pub(crate) fn split_path(path: &str) -> Vec<&str> {
    path.trim_matches('/').split('/').collect()
}

/// Parse a pattern into segments plus the `:name{type}` declarations.
fn parse_pattern(pattern: &str) -> (Vec<Segment>, Vec<ParamSpec>) {
    let mut segments = Vec::new();
    let mut specs = Vec::new();
    for part in split_path(pattern) {
        if let Some(decl) = part.strip_prefix(':') {
            let (name, ty) = match (decl.find('{'), decl.rfind('}')) {
                (Some(start), Some(end)) if start < end => {
                    (&decl[..start], ParamType::parse(&decl[start + 1..end]))
                }
                _ => (decl, ParamType::String),
            };
            segments.push(Segment::Param(name.to_string()));
            specs.push(ParamSpec {
                name: name.to_string(),
                ty,
            });
        } else {
            segments.push(Segment::Literal(part.to_string()));
        }
    }
    (segments, specs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_typed_and_untyped_params() {
        let (segments, specs) = parse_pattern("/users/:id{int}/posts/:slug");
        assert_eq!(segments.len(), 4);
        assert_eq!(segments[1], Segment::Param("id".to_string()));
        assert_eq!(segments[3], Segment::Param("slug".to_string()));
        assert_eq!(
            specs,
            vec![
                ParamSpec {
                    name: "id".to_string(),
                    ty: ParamType::Int
                },
                ParamSpec {
                    name: "slug".to_string(),
                    ty: ParamType::String
                },
            ]
        );
    }

    #[test]
    fn unknown_type_suffix_defaults_to_string() {
        let (_, specs) = parse_pattern("/things/:key{uuid}");
        assert_eq!(specs[0].ty, ParamType::String);
    }

    #[test]
    fn split_ignores_surrounding_slashes() {
        assert_eq!(split_path("/a/b/"), vec!["a", "b"]);
        assert_eq!(split_path("/"), vec![""]);
    }
}
