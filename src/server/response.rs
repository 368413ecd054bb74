use may_minihttp::Response;

use crate::routes::ApiResponse;

pub(crate) fn status_reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        204 => "No Content",
        400 => "Bad Request",
        404 => "Not Found",
        405 => "Method Not Allowed",
        500 => "Internal Server Error",
        _ => "OK",
    }
}

/// Write an [`ApiResponse`] onto the raw response
///
/// `Content-Length` and `Date` are added by `may_minihttp` itself.
pub fn write_api_response(res: &mut Response, response: &ApiResponse) {
    res.status_code(response.status as usize, status_reason(response.status));
    for header in &response.headers {
        res.header(header.line);
    }
    res.body_vec(response.body_bytes());
}
