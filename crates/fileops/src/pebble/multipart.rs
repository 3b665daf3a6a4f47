//! `multipart/form-data` bodies, as used by Pebble's file read and write
//! calls.

use fileops_common::{Error, Result};

/// One part of a multipart body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Part {
    pub name: String,
    pub filename: Option<String>,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

impl Part {
    pub fn field(name: impl Into<String>, content_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            filename: None,
            content_type: Some(content_type.into()),
            data,
        }
    }

    pub fn file(name: impl Into<String>, filename: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            filename: Some(filename.into()),
            content_type: Some("application/octet-stream".to_string()),
            data,
        }
    }
}

pub fn new_boundary() -> String {
    format!("fileops-{}", uuid::Uuid::new_v4().simple())
}

pub fn content_type(boundary: &str) -> String {
    format!("multipart/form-data; boundary={}", boundary)
}

/// Extract the boundary from a `multipart/...` content type.
pub fn boundary_from_content_type(value: &str) -> Option<String> {
    let media_type = value.split(';').next()?.trim();
    if !media_type.to_ascii_lowercase().starts_with("multipart/") {
        return None;
    }
    header_params(value)
        .into_iter()
        .find_map(|(key, value)| (key == "boundary").then_some(value))
}

/// Parameters of a `type; key=value; key="quoted"` header value.
///
/// Keys are lowercased. Quoted values may contain `;` and have their
/// backslash escapes undone.
fn header_params(header: &str) -> Vec<(String, String)> {
    let mut params = Vec::new();
    let mut chars = header.chars().peekable();
    // The media type or disposition type comes first
    for c in chars.by_ref() {
        if c == ';' {
            break;
        }
    }

    loop {
        while chars.peek().map_or(false, |c| c.is_whitespace() || *c == ';') {
            chars.next();
        }
        if chars.peek().is_none() {
            return params;
        }

        let mut key = String::new();
        while let Some(&c) = chars.peek() {
            if c == '=' || c == ';' {
                break;
            }
            key.push(c);
            chars.next();
        }

        let mut value = String::new();
        if chars.next_if_eq(&'=').is_some() {
            while chars.next_if(|c| c.is_whitespace()).is_some() {}
            if chars.next_if_eq(&'"').is_some() {
                while let Some(c) = chars.next() {
                    match c {
                        '\\' => value.extend(chars.next()),
                        '"' => break,
                        other => value.push(other),
                    }
                }
                while chars.next_if(|c| *c != ';').is_some() {}
            } else {
                while let Some(c) = chars.next_if(|c| *c != ';') {
                    value.push(c);
                }
                value = value.trim_end().to_string();
            }
        }
        params.push((key.trim().to_ascii_lowercase(), value));
    }
}

pub fn encode(boundary: &str, parts: &[Part]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
        let mut disposition = format!("Content-Disposition: form-data; name=\"{}\"", escape(&part.name));
        if let Some(filename) = &part.filename {
            disposition.push_str(&format!("; filename=\"{}\"", escape(filename)));
        }
        body.extend_from_slice(disposition.as_bytes());
        body.extend_from_slice(b"\r\n");
        if let Some(content_type) = &part.content_type {
            body.extend_from_slice(format!("Content-Type: {}\r\n", content_type).as_bytes());
        }
        body.extend_from_slice(b"\r\n");
        body.extend_from_slice(&part.data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", boundary).as_bytes());
    body
}

fn escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|window| window == needle)
}

pub fn decode(boundary: &str, body: &[u8]) -> Result<Vec<Part>> {
    let delimiter = format!("--{}", boundary).into_bytes();
    let separator = [b"\r\n".as_slice(), delimiter.as_slice()].concat();

    let start = find(body, &delimiter)
        .ok_or_else(|| Error::protocol("multipart body has no opening boundary"))?;
    let mut rest = &body[start + delimiter.len()..];
    let mut parts = Vec::new();

    loop {
        if rest.starts_with(b"--") {
            return Ok(parts);
        }
        rest = rest
            .strip_prefix(b"\r\n".as_slice())
            .ok_or_else(|| Error::protocol("malformed multipart boundary line"))?;
        let end = find(rest, &separator)
            .ok_or_else(|| Error::protocol("multipart body is truncated"))?;
        parts.push(decode_part(&rest[..end])?);
        rest = &rest[end + separator.len()..];
    }
}

fn decode_part(raw: &[u8]) -> Result<Part> {
    let split = find(raw, b"\r\n\r\n")
        .ok_or_else(|| Error::protocol("multipart part has no header terminator"))?;
    let headers = std::str::from_utf8(&raw[..split])
        .map_err(|e| Error::protocol(format!("multipart headers are not UTF-8: {}", e)))?;
    let data = raw[split + 4..].to_vec();

    let mut name = None;
    let mut filename = None;
    let mut content_type = None;
    for line in headers.split("\r\n") {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        if key.trim().eq_ignore_ascii_case("content-disposition") {
            for (k, v) in header_params(value) {
                match k.as_str() {
                    "name" => name = Some(v),
                    "filename" => filename = Some(v),
                    _ => {}
                }
            }
        } else if key.trim().eq_ignore_ascii_case("content-type") {
            content_type = Some(value.trim().to_string());
        }
    }

    Ok(Part {
        name: name.ok_or_else(|| Error::protocol("multipart part has no name"))?,
        filename,
        content_type,
        data,
    })
}
