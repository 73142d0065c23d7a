//! Classification of the configured Excel path/link.
//!
//! Editors paste whatever SharePoint gave them: a server-relative path, a
//! "copy link" URL (either the `/:x:/r/` form with an embedded file id or an
//! opaque `/:x:/s/` token), or the URL of the file open in Excel for the web.
//! Each shape is downloaded through a different REST endpoint.

use crate::error::{Result, ScoreError};
use crate::platform::quote_odata;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use lazy_static::lazy_static;
use regex::Regex;
use uuid::Uuid;

lazy_static! {
    static ref ABSOLUTE_URL: Regex =
        Regex::new(r"^(?i)(https?)://([^/?#]+)([^?#]*)(?:\?([^#]*))?").unwrap();
    static ref SHARE_LINK_PATH: Regex = Regex::new(r"^/:([A-Za-z]{1,2}):/([A-Za-z])/(.*)$").unwrap();
    static ref EMBEDDED_FILE_ID: Regex = Regex::new(r"^[wW]([0-9a-fA-F]{32})$").unwrap();
    static ref EDITOR_PAGE: Regex =
        Regex::new(r"(?i)/_layouts/15/(doc|wopiframe|xlviewer)\.aspx$").unwrap();
}

/// Where a workbook lives, reduced to what its download endpoint needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileLocator {
    /// `/sites/class/Shared Documents/grades.xlsx`, already percent-decoded.
    ServerRelativePath { path: String },
    /// `/:x:/r/...?d=w<hex>` sharing link.
    ShareLinkById { file_id: Uuid },
    /// Opaque sharing link; resolved through the shares API.
    ShareLinkOpaque { link: String },
    /// `/_layouts/15/Doc.aspx?sourcedoc={GUID}`.
    EditorLink { file_id: Uuid },
}

impl FileLocator {
    /// Classify a raw locator. `site_host` restricts absolute URLs to the
    /// tenant the component runs in.
    pub fn classify(raw: &str, site_host: Option<&str>) -> Result<FileLocator> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(unresolvable(raw, "empty locator"));
        }

        if raw.starts_with('/') {
            let path = raw.split(['?', '#']).next().unwrap_or_default();
            return Ok(FileLocator::ServerRelativePath {
                path: decode(raw, path)?,
            });
        }

        let caps = ABSOLUTE_URL
            .captures(raw)
            .ok_or_else(|| unresolvable(raw, "not a path or http(s) URL"))?;
        let host = &caps[2];
        let path = caps.get(3).map_or("", |m| m.as_str());
        let query = caps.get(4).map_or("", |m| m.as_str());

        if let Some(site_host) = site_host {
            if !host.eq_ignore_ascii_case(site_host) {
                return Err(unresolvable(raw, "link points outside the site's tenant"));
            }
        }

        if EDITOR_PAGE.is_match(path) {
            let source = query_param(query, "sourcedoc")
                .ok_or_else(|| unresolvable(raw, "editor link without sourcedoc"))?;
            let source = decode(raw, &source)?;
            let file_id = Uuid::parse_str(source.trim_matches(|c| c == '{' || c == '}'))
                .map_err(|_| unresolvable(raw, "sourcedoc is not a GUID"))?;
            return Ok(FileLocator::EditorLink { file_id });
        }

        if let Some(share) = SHARE_LINK_PATH.captures(path) {
            let mode = share[2].to_ascii_lowercase();
            let rest = &share[3];
            if mode == "r" {
                if let Some(embedded) = query_param(query, "d") {
                    if let Some(hex) = EMBEDDED_FILE_ID.captures(&embedded) {
                        let file_id = Uuid::parse_str(&hex[1])
                            .map_err(|_| unresolvable(raw, "malformed embedded file id"))?;
                        return Ok(FileLocator::ShareLinkById { file_id });
                    }
                }
                if rest.is_empty() {
                    return Err(unresolvable(raw, "sharing link without a path"));
                }
                return Ok(FileLocator::ServerRelativePath {
                    path: decode(raw, &format!("/{}", rest))?,
                });
            }
            if rest.is_empty() {
                return Err(unresolvable(raw, "sharing link without a token"));
            }
            return Ok(FileLocator::ShareLinkOpaque {
                link: raw.to_string(),
            });
        }

        if path.is_empty() || path == "/" {
            return Err(unresolvable(raw, "URL carries no file path"));
        }
        Ok(FileLocator::ServerRelativePath {
            path: decode(raw, path)?,
        })
    }

    /// REST endpoint returning the raw file bytes.
    pub fn download_url(&self, site_url: &str) -> String {
        let site_url = site_url.trim_end_matches('/');
        match self {
            FileLocator::ServerRelativePath { path } => format!(
                "{}/_api/web/GetFileByServerRelativeUrl('{}')/$value",
                site_url,
                quote_odata(path)
            ),
            FileLocator::ShareLinkById { file_id } | FileLocator::EditorLink { file_id } => {
                format!(
                    "{}/_api/web/GetFileById('{}')/$value",
                    site_url,
                    file_id.hyphenated()
                )
            }
            FileLocator::ShareLinkOpaque { link } => format!(
                "{}/_api/v2.0/shares/{}/driveItem/content",
                site_url,
                sharing_token(link)
            ),
        }
    }
}

/// Encode a sharing URL the way the shares API expects: `u!` + unpadded
/// base64url of the link.
pub fn sharing_token(link: &str) -> String {
    format!("u!{}", URL_SAFE_NO_PAD.encode(link.as_bytes()))
}

fn query_param(query: &str, name: &str) -> Option<String> {
    query.split('&').find_map(|pair| {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        if key.eq_ignore_ascii_case(name) {
            Some(value.to_string())
        } else {
            None
        }
    })
}

fn decode(raw: &str, value: &str) -> Result<String> {
    urlencoding::decode(value)
        .map(|s| s.into_owned())
        .map_err(|_| unresolvable(raw, "invalid percent-encoding"))
}

fn unresolvable(raw: &str, why: &str) -> ScoreError {
    ScoreError::Unresolvable(format!("{} ({})", raw, why))
}
