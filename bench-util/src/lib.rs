pub mod drain;
pub mod tls;

use bytes::Bytes;
use http_body_util::Full;

/// Body the echo server answers `GET /` with.
pub const OK_BODY: &[u8] = b"ok";

#[inline]
pub fn empty_body() -> Full<Bytes> {
    Full::new(Bytes::new())
}

#[inline]
pub fn byte_body<B: Into<Bytes>>(bytes: B) -> Full<Bytes> {
    Full::new(bytes.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use hyper::body::Body;

    #[test]
    fn empty_body_has_no_data() {
        assert!(empty_body().is_end_stream());
        assert_eq!(Some(0), empty_body().size_hint().exact());
    }
}
