use crate::error::{Result, ScoreError};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Properties an editor sets on the web part.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WebPartProperties {
    /// Free text shown under the header.
    pub description: String,

    /// Server-relative path, sharing link or editor link of the grade workbook.
    pub excel_file_path: String,

    /// Overrides the default page title when set.
    pub header_title: Option<String>,

    /// Restrict rows to the viewer's own account.
    pub personalize: bool,
}

impl Default for WebPartProperties {
    fn default() -> Self {
        WebPartProperties {
            description: String::new(),
            excel_file_path: String::new(),
            header_title: None,
            personalize: true,
        }
    }
}

impl WebPartProperties {
    /// Read properties from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Reject properties the component cannot render with.
    pub fn validate(&self) -> Result<()> {
        if self.excel_file_path.trim().is_empty() {
            return Err(ScoreError::Config(
                "excel_file_path must be set to a path or sharing link".to_string(),
            ));
        }
        Ok(())
    }

    pub fn title(&self) -> &str {
        match self.header_title.as_deref() {
            Some(title) if !title.trim().is_empty() => title,
            _ => crate::strings::DEFAULT_TITLE,
        }
    }
}

/// The signed-in user as known to the hosting page, before any REST call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserContext {
    pub display_name: String,
    pub email: String,
    pub login_name: String,
}

/// Ambient page context handed to the component by whatever embeds it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageContext {
    /// Absolute URL of the site, e.g. `https://contoso.sharepoint.com/sites/class`.
    pub site_url: String,

    /// Server-relative URL of the page hosting the component.
    pub page_url: String,

    pub user: UserContext,
}

impl PageContext {
    pub fn site_url(&self) -> &str {
        self.site_url.trim_end_matches('/')
    }

    /// Host part of the site URL, used to tell tenant links from foreign ones.
    pub fn site_host(&self) -> Option<&str> {
        let rest = self
            .site_url
            .strip_prefix("https://")
            .or_else(|| self.site_url.strip_prefix("http://"))?;
        let host = rest.split('/').next().unwrap_or_default();
        if host.is_empty() { None } else { Some(host) }
    }
}

/// Runtime knobs of the component that are not editor-facing.
#[derive(Debug, Clone)]
pub struct ShellSettings {
    /// Simulated loading latency before the table appears.
    pub load_delay: Duration,
}

impl Default for ShellSettings {
    fn default() -> Self {
        ShellSettings {
            load_delay: Duration::from_millis(1000),
        }
    }
}

/// Everything the server binary needs to start.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub listen: String,
    pub access_token: Option<String>,
    pub context: PageContext,
    pub properties: WebPartProperties,
    pub shell: ShellSettings,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn properties_default_to_personalised() {
        let props: WebPartProperties =
            serde_json::from_str(r#"{"excel_file_path": "/sites/a/b.xlsx"}"#).unwrap();
        assert!(props.personalize);
        assert_eq!(props.description, "");
        assert!(props.validate().is_ok());
    }

    #[test]
    fn blank_path_is_rejected() {
        let props = WebPartProperties {
            excel_file_path: "  ".into(),
            ..Default::default()
        };
        assert!(matches!(props.validate(), Err(ScoreError::Config(_))));
    }

    #[test]
    fn title_override_falls_back_when_blank() {
        let mut props = WebPartProperties::default();
        assert_eq!(props.title(), crate::strings::DEFAULT_TITLE);
        props.header_title = Some(" ".into());
        assert_eq!(props.title(), crate::strings::DEFAULT_TITLE);
        props.header_title = Some("三年二班".into());
        assert_eq!(props.title(), "三年二班");
    }

    #[test]
    fn site_host_is_extracted() {
        let ctx = PageContext {
            site_url: "https://contoso.sharepoint.com/sites/class/".into(),
            ..Default::default()
        };
        assert_eq!(ctx.site_host(), Some("contoso.sharepoint.com"));
        assert_eq!(ctx.site_url(), "https://contoso.sharepoint.com/sites/class");
    }
}
