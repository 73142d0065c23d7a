#![cfg(not(tarpaulin_include))]

use clap::Parser;
use score_display::app;
use score_display::config::{PageContext, ServerConfig, ShellSettings, UserContext, WebPartProperties};
use std::path::PathBuf;
use std::time::Duration;

/// Serve the student score display for one SharePoint page.
#[derive(Parser, Debug)]
#[command(name = "score-display", version)]
struct Args {
    /// Absolute URL of the SharePoint site
    #[arg(long, env = "SCORE_SITE_URL")]
    site_url: String,

    /// Server-relative URL of the hosting page
    #[arg(long, env = "SCORE_PAGE_URL", default_value = "")]
    page_url: String,

    /// Viewer fallback fields, used when the current-user lookup fails
    #[arg(long, env = "SCORE_USER_NAME", default_value = "")]
    user_name: String,
    #[arg(long, env = "SCORE_USER_EMAIL", default_value = "")]
    user_email: String,
    #[arg(long, env = "SCORE_LOGIN_NAME", default_value = "")]
    login_name: String,

    /// JSON file with web part properties
    #[arg(long, env = "SCORE_PROPERTIES")]
    properties: Option<PathBuf>,

    /// Excel path or link; overrides the properties file
    #[arg(long, env = "SCORE_EXCEL")]
    excel: Option<String>,

    #[arg(long)]
    description: Option<String>,

    #[arg(long)]
    title: Option<String>,

    /// Show every row instead of only the viewer's own
    #[arg(long)]
    show_all: bool,

    /// Bearer token forwarded to the SharePoint REST API
    #[arg(long, env = "SCORE_ACCESS_TOKEN", hide_env_values = true)]
    access_token: Option<String>,

    #[arg(long, env = "SCORE_LISTEN", default_value = "127.0.0.1:3000")]
    listen: String,

    /// Simulated loading delay in milliseconds
    #[arg(long, default_value_t = 1000)]
    load_delay_ms: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut properties = match &args.properties {
        Some(path) => WebPartProperties::from_file(path)?,
        None => WebPartProperties::default(),
    };
    if let Some(excel) = args.excel {
        properties.excel_file_path = excel;
    }
    if let Some(description) = args.description {
        properties.description = description;
    }
    if args.title.is_some() {
        properties.header_title = args.title;
    }
    if args.show_all {
        properties.personalize = false;
    }

    let config = ServerConfig {
        listen: args.listen,
        access_token: args.access_token,
        context: PageContext {
            site_url: args.site_url,
            page_url: args.page_url,
            user: UserContext {
                display_name: args.user_name,
                email: args.user_email,
                login_name: args.login_name,
            },
        },
        properties,
        shell: ShellSettings {
            load_delay: Duration::from_millis(args.load_delay_ms),
        },
    };

    app::run(config).await
}
