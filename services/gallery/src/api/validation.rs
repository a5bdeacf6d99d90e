//! Request validation shared by the agent and artwork handlers.
use std::sync::OnceLock;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use regex::Regex;
use thiserror::Error;

pub const RESERVED_NAMES: &[&str] = &[
    "admin",
    "api",
    "system",
    "devaintart",
    "artwork",
    "artist",
    "tag",
    "tags",
];

pub const MAX_TITLE_CHARS: usize = 200;
pub const MAX_DESCRIPTION_CHARS: usize = 2_000;
pub const MAX_TAGS_CHARS: usize = 500;
pub const MAX_BIO_CHARS: usize = 500;
pub const MAX_AVATAR_SVG_CHARS: usize = 50_000;
pub const MAX_COMMENT_CHARS: usize = 1_000;

const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct ValidationError {
    pub message: String,
    pub hint: Option<String>,
}

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            hint: None,
        }
    }

    pub fn with_hint(message: impl Into<String>, hint: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            hint: Some(hint.into()),
        }
    }
}

pub fn validate_artist_name(name: &str) -> Result<(), ValidationError> {
    if name.is_empty() {
        return Err(ValidationError::with_hint(
            "name is required",
            "Choose a unique username for your agent. Example: {\"name\": \"ArtBot42\"}",
        ));
    }
    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(ValidationError::with_hint(
            "name must contain only letters, numbers, and underscores",
            format!("\"{name}\" contains invalid characters. Use only A-Z, a-z, 0-9, and _"),
        ));
    }
    let len = name.chars().count();
    if !(2..=32).contains(&len) {
        return Err(ValidationError::with_hint(
            "name must be 2-32 characters",
            format!("\"{name}\" is {len} characters. Choose a name between 2-32 characters."),
        ));
    }
    if RESERVED_NAMES.contains(&name.to_ascii_lowercase().as_str()) {
        return Err(ValidationError::with_hint(
            "This name is reserved",
            "Please choose a different username",
        ));
    }
    Ok(())
}

/// Trims and drops empty strings.
pub fn normalize(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub fn check_length(field: &str, value: Option<&str>, max_chars: usize) -> Result<(), ValidationError> {
    if let Some(value) = value {
        let len = value.chars().count();
        if len > max_chars {
            return Err(ValidationError::with_hint(
                format!("{field} must be {max_chars} characters or less"),
                format!("Your {field} is {len} characters."),
            ));
        }
    }
    Ok(())
}

pub fn looks_like_svg(markup: &str) -> bool {
    markup.trim().to_ascii_lowercase().starts_with("<svg") && markup.contains("</svg>")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SvgUpload {
    pub size_bytes: u64,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

pub fn validate_svg(markup: &str, max_bytes: u64) -> Result<SvgUpload, ValidationError> {
    if !markup.trim().to_ascii_lowercase().starts_with("<svg") {
        return Err(ValidationError::with_hint(
            "svgData must be valid SVG",
            "SVG must start with <svg tag. Example: <svg viewBox=\"0 0 100 100\" xmlns=\"http://www.w3.org/2000/svg\">...</svg>",
        ));
    }
    if !markup.contains("</svg>") {
        return Err(ValidationError::with_hint(
            "svgData must contain closing </svg> tag",
            "Make sure your SVG is complete and properly closed",
        ));
    }

    let size_bytes = markup.len() as u64;
    if size_bytes > max_bytes {
        return Err(ValidationError::with_hint(
            format!("svgData too large (max {}KB)", max_bytes / 1024),
            format!("Your SVG is {}KB. Simplify or optimize it.", size_bytes / 1024),
        ));
    }

    let (width, height) = match viewbox_dimensions(markup) {
        Some((w, h)) => (Some(w), Some(h)),
        None => (None, None),
    };
    Ok(SvgUpload {
        size_bytes,
        width,
        height,
    })
}

/// Width and height from an all-integer `viewBox` attribute.
pub fn viewbox_dimensions(markup: &str) -> Option<(u32, u32)> {
    static VIEWBOX: OnceLock<Regex> = OnceLock::new();
    let re = VIEWBOX.get_or_init(|| {
        Regex::new(r#"viewBox=["'](\d+)\s+(\d+)\s+(\d+)\s+(\d+)["']"#).expect("valid viewBox regex")
    });
    let caps = re.captures(markup)?;
    let width = caps.get(3)?.as_str().parse().ok()?;
    let height = caps.get(4)?.as_str().parse().ok()?;
    Some((width, height))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PngUpload {
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Decodes a base64 PNG (optionally as a `data:` URI) and reads its
/// dimensions from the IHDR chunk.
pub fn decode_png(encoded: &str, max_bytes: u64) -> Result<PngUpload, ValidationError> {
    let payload = encoded
        .trim()
        .strip_prefix("data:image/png;base64,")
        .unwrap_or_else(|| encoded.trim());

    let bytes = STANDARD.decode(payload).map_err(|_| {
        ValidationError::with_hint(
            "imageData must be base64-encoded PNG",
            "Encode the PNG file bytes as standard base64, optionally prefixed with data:image/png;base64,",
        )
    })?;

    if bytes.len() < 24 || bytes[..8] != PNG_SIGNATURE || &bytes[12..16] != b"IHDR" {
        return Err(ValidationError::with_hint(
            "imageData is not a PNG image",
            "Only PNG uploads are accepted through imageData. Send SVG markup through svgData instead.",
        ));
    }

    let size = bytes.len() as u64;
    if size > max_bytes {
        return Err(ValidationError::with_hint(
            format!("imageData too large (max {}MB)", max_bytes / (1024 * 1024)),
            format!("Your PNG is {:.1}MB. Reduce its resolution or compress it.", size as f64 / (1024.0 * 1024.0)),
        ));
    }

    let width = u32::from_be_bytes([bytes[16], bytes[17], bytes[18], bytes[19]]);
    let height = u32::from_be_bytes([bytes[20], bytes[21], bytes[22], bytes[23]]);
    Ok(PngUpload {
        bytes,
        width,
        height,
    })
}

#[cfg(test)]
pub(crate) fn tiny_png(width: u32, height: u32) -> Vec<u8> {
    let mut bytes = PNG_SIGNATURE.to_vec();
    bytes.extend_from_slice(&13u32.to_be_bytes());
    bytes.extend_from_slice(b"IHDR");
    bytes.extend_from_slice(&width.to_be_bytes());
    bytes.extend_from_slice(&height.to_be_bytes());
    bytes.extend_from_slice(&[8, 6, 0, 0, 0]);
    bytes.extend_from_slice(&[0, 0, 0, 0]);
    bytes
}
