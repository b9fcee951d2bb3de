use roto::{AppService, Ctx, Dispatcher, HttpServer, Router, ServiceRegistry};
use serde_json::{json, Value};
use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::Arc;
use std::time::Duration;

fn free_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

fn send(addr: &str, request: &str) -> (u16, String) {
    let mut stream = TcpStream::connect(addr).unwrap();
    stream
        .set_read_timeout(Some(Duration::from_secs(2)))
        .unwrap();
    stream.write_all(request.as_bytes()).unwrap();

    let mut reader = BufReader::new(stream);
    let mut status_line = String::new();
    reader.read_line(&mut status_line).unwrap();
    let status: u16 = status_line
        .split_whitespace()
        .nth(1)
        .unwrap()
        .parse()
        .unwrap();

    let mut content_length = 0usize;
    loop {
        let mut line = String::new();
        reader.read_line(&mut line).unwrap();
        if line == "\r\n" || line == "\n" || line.is_empty() {
            break;
        }
        if let Some(rest) = line.to_ascii_lowercase().strip_prefix("content-length:") {
            content_length = rest.trim().parse().unwrap();
        }
    }

    let mut body = vec![0u8; content_length];
    reader.read_exact(&mut body).unwrap();
    (status, String::from_utf8(body).unwrap())
}

fn get(addr: &str, path: &str) -> (u16, String) {
    send(
        addr,
        &format!("GET {path} HTTP/1.1\r\nHost: {addr}\r\nConnection: close\r\n\r\n"),
    )
}

fn post_json(addr: &str, path: &str, body: &str) -> (u16, String) {
    send(
        addr,
        &format!(
            "POST {path} HTTP/1.1\r\nHost: {addr}\r\nContent-Type: application/json\r\n\
             Content-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        ),
    )
}

#[test]
fn serves_requests_end_to_end() {
    may::config().set_stack_size(0x8000);

    let mut router = Router::new();
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
    router.health();

    let dispatcher = Arc::new(Dispatcher::new(
        Arc::new(router),
        Arc::new(ServiceRegistry::new()),
    ));

    let port = free_port();
    let addr = format!("127.0.0.1:{port}");
    let handle = HttpServer(AppService::new(dispatcher))
        .start(addr.as_str())
        .unwrap();
    handle.wait_ready().unwrap();

    let (status, body) = get(&addr, "/hello");
    assert_eq!(status, 200);
    assert_eq!(
        serde_json::from_str::<Value>(&body).unwrap(),
        json!({ "message": "Hello, World!" })
    );

    let (status, body) = get(&addr, "/users/42");
    assert_eq!(status, 200);
    assert_eq!(
        serde_json::from_str::<Value>(&body).unwrap(),
        json!({ "id": 42 })
    );

    let (status, body) = post_json(&addr, "/echo", r#"{"a":1,"b":[true,null]}"#);
    assert_eq!(status, 200);
    assert_eq!(
        serde_json::from_str::<Value>(&body).unwrap(),
        json!({ "a": 1, "b": [true, null] })
    );

    let (status, _) = post_json(&addr, "/echo", "not json");
    assert_eq!(status, 400);

    let (status, body) = get(&addr, "/bye");
    assert_eq!(status, 404);
    assert_eq!(
        serde_json::from_str::<Value>(&body).unwrap(),
        json!({ "error": "Not Found", "method": "GET", "path": "/bye" })
    );

    let (status, body) = get(&addr, "/health");
    assert_eq!(status, 200);
    assert_eq!(
        serde_json::from_str::<Value>(&body).unwrap(),
        json!({ "status": "ok" })
    );

    handle.stop();
}
