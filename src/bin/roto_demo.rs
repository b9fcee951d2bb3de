use clap::Parser;
use roto::{App, Ctx, Dep, RateLimiter, Router};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Demo dispatcher server")]
struct Args {
    /// Address to listen on
    #[arg(long, env = "ROTO_ADDR", default_value = "127.0.0.1:8080")]
    addr: String,
}

struct Greeting {
    salutation: String,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let mut router = Router::new();
    router.use_middleware(roto::logging());

    router.get("/hello", |ctx: Ctx| {
        ctx.ok().json(json!({ "message": "Hello, World!" }));
    });

    router.post("/echo", |ctx: Ctx| match ctx.decode_body::<Value>() {
        Ok(body) => ctx.ok().body(&body),
        Err(err) => ctx.error(&err.to_string(), 400),
    });

    router.get("/users/:id{int}", |ctx: Ctx| {
        ctx.ok().json(json!({ "id": ctx.param("id").as_i64() }));
    });

    router.get("/greet/:name", |ctx: Ctx, greeting: Dep<Greeting>| {
        let name = ctx.param("name");
        ctx.ok().message(&format!(
            "{}, {}!",
            greeting.salutation,
            name.as_str().unwrap_or("stranger")
        ));
    });

    let limiter = Arc::new(RateLimiter::new(5.0, 3.0));
    router
        .get("/limited", |ctx: Ctx| {
            ctx.ok().message("you got a token");
        })
        .rate_limit(&limiter);

    router.health();
    router.list_routes();

    let mut app = App::new(router);
    app.register(Greeting {
        salutation: "Hello".to_string(),
    });
    app.on_start(|| info!("demo server starting"));
    app.on_stop(|| info!("demo server stopped"));
    app.start(&args.addr)
}
