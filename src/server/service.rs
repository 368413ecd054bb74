use may_minihttp::{HttpService, Request, Response};
use std::io;

use super::request::parse_request;
use super::response::write_api_response;
use crate::routes::FormApp;

/// `may_minihttp` service fronting a [`FormApp`]
///
/// Cloned once per connection; clones share the same pipeline and CORS policy.
#[derive(Clone)]
pub struct FormService {
    app: FormApp,
}

impl FormService {
    pub fn new(app: FormApp) -> Self {
        Self { app }
    }
}

impl HttpService for FormService {
    fn call(&mut self, req: Request, res: &mut Response) -> io::Result<()> {
        let incoming = parse_request(req).into_incoming();
        let response = self.app.handle(&incoming);
        write_api_response(res, &response);
        Ok(())
    }
}
