//! The score display component.
//!
//! [`ScoreDisplay`] ties the pieces together behind an explicit
//! `init / render / destroy` lifecycle. Everything it needs from the host
//! (HTTP capability, page context, properties) is passed in at construction.
//!
//! Each `render` takes a ticket from a generation counter. A render whose
//! ticket is no longer current when it finishes (because another render
//! started or `destroy` ran) drops its result instead of writing it.

use crate::cell::Row;
use crate::config::{PageContext, ShellSettings, WebPartProperties};
use crate::downloader;
use crate::error::{Result, ScoreError};
use crate::filter::{self, FilterQuery};
use crate::identity::{ViewerIdentity, resolve_identity};
use crate::loader::{self, Dataset};
use crate::locator::FileLocator;
use crate::platform::{SiteClient, SiteHttp};
use crate::render::{self, PageView, Panel, TableMarkup};
use crate::stats::{self, Summary};
use crate::strings;
use log::{debug, error, info, warn};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Visible state of the component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "message", rename_all = "lowercase")]
pub enum ViewState {
    Loading,
    Ready,
    Error(String),
}

/// How a call to [`ScoreDisplay::render`] ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderOutcome {
    Ready { rows: usize },
    Failed,
    /// A newer render or `destroy` invalidated this one; nothing was written.
    Superseded,
}

/// Identity of the hosting page.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PageMetadata {
    /// File stem of the page, e.g. `Grades` for `.../SitePages/Grades.aspx`.
    pub name: String,
    pub item_id: Option<i64>,
    pub title: Option<String>,
}

impl PageMetadata {
    /// Identifier used in export file names.
    pub fn identifier(&self) -> Option<String> {
        if !self.name.is_empty() {
            Some(self.name.clone())
        } else {
            self.item_id.map(|id| id.to_string())
        }
    }
}

/// Fetch the list item behind the hosting page. A component not hosted on a
/// page (empty page URL) gets empty metadata.
pub async fn resolve_page_metadata<H: SiteHttp>(
    client: &SiteClient<H>,
    context: &PageContext,
) -> Result<PageMetadata> {
    let page_url = context.page_url.trim();
    if page_url.is_empty() {
        return Ok(PageMetadata::default());
    }
    let item = client.page_item(page_url).await?;
    let file = page_url.rsplit('/').next().unwrap_or_default();
    let name = file.rsplit_once('.').map_or(file, |(stem, _)| stem);
    Ok(PageMetadata {
        name: name.to_string(),
        item_id: item.id,
        title: item.title,
    })
}

/// The filtered rows plus what is derived from them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilteredView {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
    pub summary: Summary,
}

/// Payload of the table endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct TableResponse {
    pub table: TableMarkup,
    pub summary: Summary,
}

/// A file ready to hand to the browser.
#[derive(Debug, Clone)]
pub struct Export {
    pub filename: String,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

struct Loaded {
    /// Rows visible to this viewer, before any search.
    rows: Vec<Row>,
    columns: Vec<String>,
    subjects: Vec<String>,
    identity: ViewerIdentity,
    page: PageMetadata,
}

struct Inner {
    properties: WebPartProperties,
    state: ViewState,
    loaded: Option<Loaded>,
}

pub struct ScoreDisplay<H> {
    client: SiteClient<H>,
    context: PageContext,
    settings: ShellSettings,
    generation: AtomicU64,
    inner: Mutex<Inner>,
}

impl<H: SiteHttp> ScoreDisplay<H> {
    pub fn new(
        http: H,
        context: PageContext,
        properties: WebPartProperties,
        settings: ShellSettings,
    ) -> Self {
        let client = SiteClient::new(http, context.site_url());
        ScoreDisplay {
            client,
            context,
            settings,
            generation: AtomicU64::new(0),
            inner: Mutex::new(Inner {
                properties,
                state: ViewState::Loading,
                loaded: None,
            }),
        }
    }

    fn inner(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_current(&self, ticket: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == ticket
    }

    /// Check the properties before the first render.
    pub fn init(&self) -> Result<()> {
        let inner = self.inner();
        inner.properties.validate()?;
        info!(
            "score display initialised for {} (workbook {})",
            self.context.page_url, inner.properties.excel_file_path
        );
        Ok(())
    }

    /// Load everything and move to Ready or Error.
    pub async fn render(&self) -> RenderOutcome {
        let ticket = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let properties = {
            let mut inner = self.inner();
            inner.state = ViewState::Loading;
            inner.loaded = None;
            inner.properties.clone()
        };
        debug!("render #{} started", ticket);

        let identity = async {
            Ok::<_, ScoreError>(resolve_identity(&self.client, &self.context).await)
        };
        let (page, identity) = match tokio::try_join!(
            resolve_page_metadata(&self.client, &self.context),
            identity
        ) {
            Ok(pair) => pair,
            Err(e) => {
                error!("render #{}: initialisation failed: {}", ticket, e);
                return self.fail(ticket, strings::INIT_FAILED);
            }
        };
        if !self.is_current(ticket) {
            return RenderOutcome::Superseded;
        }

        let dataset = match self.load_dataset(&properties).await {
            Ok(dataset) => dataset,
            Err(e) => {
                error!("render #{}: loading grades failed: {}", ticket, e);
                return self.fail(ticket, strings::LOAD_FAILED);
            }
        };

        if dataset.is_empty() {
            debug!("render #{}: workbook has no data rows", ticket);
        }
        let columns = dataset.columns();
        let rows = if properties.personalize {
            let prefix = identity.account_prefix();
            if prefix.is_empty() {
                warn!("viewer has no email; no rows will be shown");
            }
            filter::filter_by_owner(&dataset.rows, &dataset.headers, prefix)
        } else {
            dataset.rows
        };
        let subjects = filter::subject_columns(&rows, &columns);

        tokio::time::sleep(self.settings.load_delay).await;

        let mut inner = self.inner();
        if !self.is_current(ticket) {
            debug!("render #{} superseded, dropping result", ticket);
            return RenderOutcome::Superseded;
        }
        let count = rows.len();
        info!(
            "render #{}: {} rows visible to {}",
            ticket, count, identity.display_name
        );
        inner.loaded = Some(Loaded {
            rows,
            columns,
            subjects,
            identity,
            page,
        });
        inner.state = ViewState::Ready;
        RenderOutcome::Ready { rows: count }
    }

    async fn load_dataset(&self, properties: &WebPartProperties) -> Result<Dataset> {
        let locator = FileLocator::classify(&properties.excel_file_path, self.context.site_host())?;
        debug!("workbook locator classified as {:?}", locator);
        loader::load(&self.client, &locator).await
    }

    fn fail(&self, ticket: u64, message: &str) -> RenderOutcome {
        let mut inner = self.inner();
        if !self.is_current(ticket) {
            return RenderOutcome::Superseded;
        }
        inner.state = ViewState::Error(message.to_string());
        inner.loaded = None;
        RenderOutcome::Failed
    }

    /// Invalidate in-flight renders and drop all loaded data.
    pub fn destroy(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        let mut inner = self.inner();
        inner.loaded = None;
        inner.state = ViewState::Loading;
        debug!("score display destroyed");
    }

    pub fn state(&self) -> ViewState {
        self.inner().state.clone()
    }

    pub fn properties(&self) -> WebPartProperties {
        self.inner().properties.clone()
    }

    /// Replace the properties. Takes effect on the next render.
    pub fn update_properties(&self, properties: WebPartProperties) -> Result<()> {
        properties.validate()?;
        self.inner().properties = properties;
        Ok(())
    }

    pub fn identity(&self) -> Option<ViewerIdentity> {
        self.inner().loaded.as_ref().map(|l| l.identity.clone())
    }

    /// Rows matching the query, or `None` until a render succeeded.
    pub fn view(&self, query: &FilterQuery) -> Option<FilteredView> {
        let inner = self.inner();
        let loaded = inner.loaded.as_ref()?;
        let rows = filter::apply(&loaded.rows, query);
        let summary = stats::summarize(&rows, stats::average_column(&loaded.columns));
        Some(FilteredView {
            columns: loaded.columns.clone(),
            rows,
            summary,
        })
    }

    pub fn table(&self, query: &FilterQuery) -> Option<TableResponse> {
        let view = self.view(query)?;
        Some(TableResponse {
            table: render::render_table(&view.columns, &view.rows),
            summary: view.summary,
        })
    }

    pub fn export_csv(&self, query: &FilterQuery) -> Result<Export> {
        let (view, page_id) = self.export_source(query)?;
        let text = downloader::to_csv(&view.columns, &view.rows)?;
        Ok(Export {
            filename: downloader::export_filename(page_id.as_deref(), "csv"),
            content_type: "text/csv; charset=utf-8",
            bytes: text.into_bytes(),
        })
    }

    pub fn export_xlsx(&self, query: &FilterQuery) -> Result<Export> {
        let (view, page_id) = self.export_source(query)?;
        let bytes = downloader::to_xlsx(&view.columns, &view.rows)?;
        Ok(Export {
            filename: downloader::export_filename(page_id.as_deref(), "xlsx"),
            content_type: "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            bytes,
        })
    }

    fn export_source(&self, query: &FilterQuery) -> Result<(FilteredView, Option<String>)> {
        let page_id = {
            let inner = self.inner();
            let loaded = inner
                .loaded
                .as_ref()
                .ok_or_else(|| ScoreError::Export("no grades loaded".to_string()))?;
            loaded.page.identifier()
        };
        let view = self
            .view(query)
            .ok_or_else(|| ScoreError::Export("no grades loaded".to_string()))?;
        Ok((view, page_id))
    }

    /// The whole page in its current state.
    pub fn page(&self) -> Result<String> {
        let view = {
            let inner = self.inner();
            let properties = &inner.properties;
            let (panel, error_message) = match &inner.state {
                ViewState::Loading => (Panel::Loading, String::new()),
                ViewState::Ready => (Panel::Ready, String::new()),
                ViewState::Error(message) => (Panel::Error, message.clone()),
            };
            let (table, summary, subjects, viewer) = match &inner.loaded {
                Some(loaded) => (
                    render::render_table(&loaded.columns, &loaded.rows),
                    stats::summarize(&loaded.rows, stats::average_column(&loaded.columns)),
                    loaded.subjects.clone(),
                    loaded.identity.display_name.clone(),
                ),
                None => (TableMarkup::default(), Summary::default(), Vec::new(), String::new()),
            };
            PageView {
                title: properties.title().to_string(),
                description: properties.description.clone(),
                panel,
                error_message,
                subjects,
                table,
                summary,
                viewer,
            }
        };
        render::render_page(&view)
    }
}
