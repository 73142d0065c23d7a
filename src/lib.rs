/*!
# Score Display

A student grade viewer for SharePoint pages, built in Rust.

## Overview

The component reads a grade workbook that an editor points it at, shows the
rows that belong to the signed-in student, lets the viewer search and filter
them, and exports what is visible as CSV or XLSX.

## Architecture

### Platform Layer
- **Technologies**: SharePoint REST API, reqwest
- **Key Components**:
  - Site HTTP capability - the only way the component reaches the network
  - Site client - current user, groups, permission mask, page item, file bytes

### Component Layer
- **Core Components**:
  - File Locator - Classifies server-relative paths, sharing links and editor links
  - Spreadsheet Loader - Downloads the workbook and decodes its first sheet
  - Identity Resolver - Resolves the viewer with fallback to the page context
  - Row Filter - Ownership, search and subject filters
  - Table Renderer - Escaped header/body markup and the page skeleton
  - Exporter - CSV and XLSX downloads
  - Host Shell - `init / render / destroy` lifecycle and Loading/Ready/Error states

### Web Layer
- **Technologies**: axum, handlebars
- Page, table, export and property endpoints around one component instance

## Modules

- **cell**: Cell values and rows
- **config**: Web part properties, page context and server settings
- **error**: Error taxonomy
- **platform**: HTTP capability and SharePoint REST client
- **locator**: Excel path/link classification
- **loader**: Workbook download and decoding
- **identity**: Viewer identity and account prefix
- **filter**: Row filters
- **stats**: Summary figures
- **render**: HTML rendering
- **downloader**: Export functionality (CSV, XLSX)
- **shell**: The component itself
- **app**: Routing (requires the `web` feature)

## REST API Endpoints

- `/` - The page in its current state
- `/api/status` - Loading, ready or error
- `/api/table?search=&subject=` - Filtered table markup and summary
- `/api/export/csv`, `/api/export/xlsx` - Downloads of the filtered rows
- `/api/render` - Start a fresh render
- `/api/properties` - Read or replace the web part properties
*/

pub mod cell;
pub mod config;
pub mod downloader;
pub mod error;
pub mod filter;
pub mod identity;
pub mod loader;
pub mod locator;
pub mod platform;
pub mod render;
pub mod shell;
pub mod stats;
pub mod strings;

#[cfg(feature = "web")]
pub mod app;

pub use cell::{CellValue, Row};
pub use error::{Result, ScoreError};
pub use locator::FileLocator;
pub use shell::{RenderOutcome, ScoreDisplay, ViewState};
