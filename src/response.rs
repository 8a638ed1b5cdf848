//! Maps preview outcomes onto an HTTP-shaped response: status, headers, body.

use std::time::SystemTime;

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use time::macros::format_description;
use time::{OffsetDateTime, PrimitiveDateTime};

use crate::asset::unix_seconds;
use crate::dispatch::Preview;
use crate::error::PreviewError;
use crate::raw::RawAsset;

/// Escape everything in RFC 5987 filenames except alphanumerics and `-._~`.
const FILENAME_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    /// `?inline=true` on the request.
    pub inline: bool,
    /// Raw `If-Modified-Since` header value.
    pub if_modified_since: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseBody {
    Empty,
    Bytes(Vec<u8>),
    /// Stream the original file.
    File(RawAsset),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewResponse {
    pub status: u16,
    pub headers: Vec<(&'static str, String)>,
    pub body: ResponseBody,
}

impl PreviewResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

pub fn respond(result: Result<Preview, PreviewError>, ctx: &RequestContext) -> PreviewResponse {
    match result {
        Ok(Preview::Rendered(preview)) => success(
            ctx,
            &preview.name,
            preview.content_type,
            preview.modified,
            ResponseBody::Bytes(preview.bytes),
        ),
        Ok(Preview::Original(raw)) => {
            let (name, content_type, modified) = (raw.name.clone(), raw.content_type, raw.modified);
            success(ctx, &name, content_type, modified, ResponseBody::File(raw))
        }
        Err(PreviewError::PermissionDenied) => PreviewResponse {
            status: 202,
            headers: Vec::new(),
            body: ResponseBody::Empty,
        },
        Err(err) => failure(&err),
    }
}

fn success(
    ctx: &RequestContext,
    name: &str,
    content_type: &str,
    modified: SystemTime,
    body: ResponseBody,
) -> PreviewResponse {
    let mut headers = vec![
        ("Cache-Control", "private".to_string()),
        ("Content-Disposition", content_disposition(name, ctx.inline)),
    ];
    if let Some(date) = format_http_date(modified) {
        headers.push(("Last-Modified", date));
    }

    if not_modified_since(ctx.if_modified_since.as_deref(), modified) {
        return PreviewResponse {
            status: 304,
            headers,
            body: ResponseBody::Empty,
        };
    }

    headers.push(("Content-Type", content_type.to_string()));
    PreviewResponse {
        status: 200,
        headers,
        body,
    }
}

fn failure(err: &PreviewError) -> PreviewResponse {
    let status = err.status_code();
    if status >= 500 {
        log::error!(target: "media_preview::response", "preview failed: {}", err);
    } else {
        log::debug!(target: "media_preview::response", "preview rejected: {}", err);
    }
    PreviewResponse {
        status,
        headers: vec![("Content-Type", "text/plain; charset=utf-8".to_string())],
        body: ResponseBody::Bytes(format!("{} {}", status, reason_phrase(status)).into_bytes()),
    }
}

pub fn content_disposition(name: &str, inline: bool) -> String {
    if inline {
        "inline".to_string()
    } else {
        format!(
            "attachment; filename*=utf-8''{}",
            utf8_percent_encode(name, FILENAME_ENCODE_SET)
        )
    }
}

/// IMF-fixdate, e.g. `Sun, 06 Nov 1994 08:49:37 GMT`.
pub fn format_http_date(t: SystemTime) -> Option<String> {
    let fmt = format_description!(
        "[weekday repr:short], [day] [month repr:short] [year] [hour]:[minute]:[second] GMT"
    );
    OffsetDateTime::from(t).format(&fmt).ok()
}

pub fn parse_http_date(value: &str) -> Option<i64> {
    let fmt = format_description!(
        "[weekday repr:short], [day] [month repr:short] [year] [hour]:[minute]:[second] GMT"
    );
    PrimitiveDateTime::parse(value.trim(), &fmt)
        .ok()
        .map(|dt| dt.assume_utc().unix_timestamp())
}

/// True when the client copy is at least as new as `modified` at second precision.
fn not_modified_since(header: Option<&str>, modified: SystemTime) -> bool {
    let Some(since) = header.and_then(parse_http_date) else {
        return false;
    };
    unix_seconds(modified) <= since
}

fn reason_phrase(status: u16) -> &'static str {
    match status {
        400 => "Bad Request",
        403 => "Forbidden",
        404 => "Not Found",
        415 => "Unsupported Media Type",
        501 => "Not Implemented",
        _ => "Internal Server Error",
    }
}
