use http::Method;
use roto::{Ctx, Dispatcher, Outcome, RequestParts, Router, ServiceRegistry};
use serde_json::{json, Value};
use std::sync::Arc;

fn dispatch(router: Router, method: Method, path: &str) -> (Outcome, Ctx) {
    let dispatcher = Dispatcher::new(Arc::new(router), Arc::new(ServiceRegistry::new()));
    let ctx = Ctx::new(RequestParts::new(method, path));
    let outcome = dispatcher.dispatch(&ctx);
    (outcome, ctx)
}

fn body_json(ctx: &Ctx) -> Value {
    let parts = ctx.response_parts();
    serde_json::from_slice(&parts.body.unwrap()).unwrap()
}

#[test]
fn first_registered_route_wins_on_overlap() {
    let mut router = Router::new();
    router.get("/users/:id", |ctx: Ctx| {
        ctx.ok().json(json!({ "route": "param", "id": ctx.param("id").as_str() }));
    });
    router.get("/users/me", |ctx: Ctx| {
        ctx.ok().json(json!({ "route": "literal" }));
    });

    let (outcome, ctx) = dispatch(router, Method::GET, "/users/me");
    assert_eq!(outcome, Outcome::Served);
    // The param route shadows the later literal: "me" binds as :id.
    assert_eq!(
        body_json(&ctx),
        json!({ "route": "param", "id": "me" })
    );
}

#[test]
fn literal_registered_first_takes_precedence() {
    let mut router = Router::new();
    router.get("/users/me", |ctx: Ctx| {
        ctx.ok().json(json!({ "route": "literal" }));
    });
    router.get("/users/:id", |ctx: Ctx| {
        ctx.ok().json(json!({ "route": "param" }));
    });

    let (_, ctx) = dispatch(router, Method::GET, "/users/me");
    assert_eq!(body_json(&ctx), json!({ "route": "literal" }));
}

#[test]
fn segment_count_mismatch_never_matches() {
    let mut router = Router::new();
    router.get("/a/b", |ctx: Ctx| {
        ctx.ok().message("matched");
    });
    let (short, _) = dispatch(router, Method::GET, "/a");

    let mut router = Router::new();
    router.get("/a/b", |ctx: Ctx| {
        ctx.ok().message("matched");
    });
    let (long, _) = dispatch(router, Method::GET, "/a/b/c");

    assert_eq!(short, Outcome::NotFound);
    assert_eq!(long, Outcome::NotFound);
}

#[test]
fn method_mismatch_is_not_found() {
    let mut router = Router::new();
    router.get("/things", |ctx: Ctx| {
        ctx.ok().message("listed");
    });
    let (outcome, ctx) = dispatch(router, Method::POST, "/things");
    assert_eq!(outcome, Outcome::NotFound);
    assert_eq!(ctx.response_status(), Some(404));
}

#[test]
fn trailing_slash_is_ignored() {
    let mut router = Router::new();
    router.get("/users/:id", |ctx: Ctx| {
        ctx.ok().json(json!({ "id": ctx.param("id").as_str() }));
    });
    let (outcome, ctx) = dispatch(router, Method::GET, "/users/42/");
    assert_eq!(outcome, Outcome::Served);
    assert_eq!(body_json(&ctx), json!({ "id": "42" }));
}

#[test]
fn not_found_writes_fixed_body() {
    let (outcome, ctx) = dispatch(Router::new(), Method::GET, "/nope");
    assert_eq!(outcome, Outcome::NotFound);
    assert_eq!(ctx.response_status(), Some(404));
    assert_eq!(
        body_json(&ctx),
        json!({ "error": "Not Found", "method": "GET", "path": "/nope" })
    );
}

#[test]
fn typed_param_coerces_through_dispatch() {
    let mut router = Router::new();
    router.get("/users/:id{int}", |ctx: Ctx| {
        ctx.ok().json(json!({
            "id": ctx.param("id").as_i64(),
            "strict_ok": ctx.try_param("id").is_ok(),
        }));
    });
    let (_, ctx) = dispatch(router, Method::GET, "/users/42");
    assert_eq!(body_json(&ctx), json!({ "id": 42, "strict_ok": true }));
}

#[test]
fn failed_coercion_degrades_to_zero_and_is_observable() {
    let mut router = Router::new();
    router.get("/users/:id{int}", |ctx: Ctx| {
        ctx.ok().json(json!({
            "id": ctx.param("id").as_i64(),
            "strict_ok": ctx.try_param("id").is_ok(),
        }));
    });
    let (outcome, ctx) = dispatch(router, Method::GET, "/users/abc");
    // Lenient access degrades silently; strict access reports the failure.
    assert_eq!(outcome, Outcome::Served);
    assert_eq!(body_json(&ctx), json!({ "id": 0, "strict_ok": false }));
}

#[test]
fn multiple_params_bind_in_pattern_order() {
    let mut router = Router::new();
    router.get("/orgs/:org/repos/:repo{int}", |ctx: Ctx| {
        ctx.ok().json(json!({
            "org": ctx.param("org").as_str(),
            "repo": ctx.param("repo").as_i64(),
        }));
    });
    let (_, ctx) = dispatch(router, Method::GET, "/orgs/acme/repos/7");
    assert_eq!(body_json(&ctx), json!({ "org": "acme", "repo": 7 }));
}

#[test]
fn health_route_reports_ok() {
    let mut router = Router::new();
    router.health();
    let (outcome, ctx) = dispatch(router, Method::GET, "/health");
    assert_eq!(outcome, Outcome::Served);
    assert_eq!(body_json(&ctx), json!({ "status": "ok" }));
}
