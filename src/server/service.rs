use super::request::parse_request;
use super::response::write_response;
use crate::context::Ctx;
use crate::dispatcher::Dispatcher;
use may_minihttp::{HttpService, Request, Response};
use std::io;
use std::sync::Arc;
use tracing::debug;

/// Per-connection service: parse, dispatch, write.
#[derive(Clone)]
pub struct AppService {
    dispatcher: Arc<Dispatcher>,
}

impl AppService {
    #[must_use]
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self { dispatcher }
    }
}

impl HttpService for AppService {
    fn call(&mut self, req: Request, res: &mut Response) -> io::Result<()> {
        let ctx = Ctx::new(parse_request(req));
        let outcome = self.dispatcher.dispatch(&ctx);
        debug!(
            request_id = %ctx.request_id(),
            outcome = ?outcome,
            status = ctx.response_status(),
            "dispatch complete"
        );
        write_response(res, &ctx.response_parts());
        Ok(())
    }
}
