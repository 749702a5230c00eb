use bench_util::{byte_body, empty_body, OK_BODY};
use bytes::Bytes;
use http_body_util::Full;
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::{Method, Request, Response, StatusCode};
use std::convert::Infallible;

fn with_status(status: StatusCode) -> Response<Full<Bytes>> {
    let mut resp = Response::new(empty_body());
    *resp.status_mut() = status;
    resp
}

/// `GET /` answers `ok`. The request body is never read.
pub async fn echo<B>(incoming: Request<B>) -> Result<Response<Full<Bytes>>, Infallible> {
    match incoming.uri().path() {
        "" | "/" => {
            if incoming.method() == Method::GET {
                let mut resp = Response::new(byte_body(OK_BODY));
                resp.headers_mut()
                    .insert(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
                Ok(resp)
            } else {
                Ok(with_status(StatusCode::METHOD_NOT_ALLOWED))
            }
        }
        _ => Ok(with_status(StatusCode::NOT_FOUND)),
    }
}
