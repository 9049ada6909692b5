use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};

/// 1x1 transparent GIF89a.
pub const PIXEL_GIF: &[u8] = &[
    0x47, 0x49, 0x46, 0x38, 0x39, 0x61, 0x01, 0x00, 0x01, 0x00, 0x80, 0x00, 0x00, 0x00, 0x00,
    0x00, 0xff, 0xff, 0xff, 0x21, 0xf9, 0x04, 0x01, 0x00, 0x00, 0x00, 0x00, 0x2c, 0x00, 0x00,
    0x00, 0x00, 0x01, 0x00, 0x01, 0x00, 0x00, 0x02, 0x02, 0x44, 0x01, 0x00, 0x3b,
];

pub const PIXEL_CONTENT_TYPE: &str = "image/gif";

// every fetch has to reach the server to be counted
const CACHE_CONTROL_HEADER_VALUE: &str = "no-cache, max-age=0";

pub fn pixel_response() -> Response {
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, PIXEL_CONTENT_TYPE),
            (header::CACHE_CONTROL, CACHE_CONTROL_HEADER_VALUE),
        ],
        PIXEL_GIF,
    )
        .into_response()
}
