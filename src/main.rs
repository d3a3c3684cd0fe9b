//! Amnesia Anchor CLI
//!
//! Describes text ranges of XHTML documents as selectors, and anchors stored
//! selectors against single documents or extracted page text.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use amnesia_anchor::anchoring::html;
use amnesia_anchor::anchoring::pdf::TEXT_LAYER_CLASS;
use amnesia_anchor::anchoring::TextRange;
use amnesia_anchor::{
    trim_range, Anchor, AnchorConfig, AnchorError, Document, NodeId, PageSource, PageView,
    PdfAnchorer, Selector, TextTree,
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(
    name = "amnesia-anchor",
    version,
    about = "Annotation anchoring for EPUB and PDF text"
)]
struct Cli {
    /// Characters of context captured around quotes
    #[arg(long, global = true, env = "ANCHOR_CONTEXT_LEN")]
    context_len: Option<usize>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print selectors for a character range of an XHTML document
    Describe {
        file: PathBuf,
        start: usize,
        end: usize,
    },
    /// Resolve a JSON array of selectors against an XHTML document
    Anchor { file: PathBuf, selectors: PathBuf },
    /// Resolve selectors against a JSON array of page texts
    AnchorPages { pages: PathBuf, selectors: PathBuf },
}

#[derive(Serialize)]
struct AnchoredRange {
    start: usize,
    end: usize,
    text: String,
}

#[derive(Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
enum PageAnchor {
    Anchored {
        page: usize,
        start: usize,
        end: usize,
        text: String,
    },
    Placeholder { page: usize },
}

/// Pages held in memory, each rendered as a text layer of its own
struct StaticPages {
    pages: Vec<String>,
    document: Arc<Document>,
    layers: Vec<NodeId>,
}

impl StaticPages {
    fn new(pages: Vec<String>) -> Self {
        let mut document = Document::new("div");
        let mut layers = Vec::with_capacity(pages.len());
        for text in &pages {
            let container = document.add_element(document.root(), "div");
            document.set_attribute(container, "class", "page");
            let layer = document.add_element(container, "div");
            document.set_attribute(layer, "class", TEXT_LAYER_CLASS);
            document.add_text(layer, text);
            layers.push(layer);
        }
        Self {
            pages,
            document: Arc::new(document),
            layers,
        }
    }
}

#[async_trait]
impl PageSource for StaticPages {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    async fn page_text(&self, page_index: usize) -> amnesia_anchor::Result<String> {
        self.pages
            .get(page_index)
            .cloned()
            .ok_or(AnchorError::InvalidPage(page_index))
    }

    fn document(&self) -> Arc<Document> {
        self.document.clone()
    }

    fn page_view(&self, page_index: usize) -> PageView {
        match self.layers.get(page_index) {
            Some(&layer) => PageView::Rendered { layer },
            None => PageView::Pending,
        }
    }
}

/// First element named `tag` in document order
fn find_element(doc: &Document, node: NodeId, tag: &str) -> Option<NodeId> {
    if doc.tag_name(node) == Some(tag) {
        return Some(node);
    }
    doc.children(node)
        .iter()
        .find_map(|&child| find_element(doc, child, tag))
}

fn load_document(path: &Path) -> Result<(Document, NodeId)> {
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let doc = Document::parse_xml(&source)
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    let root = find_element(&doc, doc.root(), "body").unwrap_or(doc.root());
    Ok((doc, root))
}

fn load_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&source).with_context(|| format!("Invalid JSON in {}", path.display()))
}

fn describe(file: &Path, start: usize, end: usize, config: &AnchorConfig) -> Result<String> {
    let (doc, root) = load_document(file)?;
    let range = TextRange::from_offsets(root, start, end).to_range(&doc)?;
    let range = trim_range(&doc, &range)?;
    let selectors = html::describe(&doc, root, &range, config)?;
    Ok(serde_json::to_string_pretty(&selectors)?)
}

fn anchor(file: &Path, selectors: &Path, config: &AnchorConfig) -> Result<String> {
    let (doc, root) = load_document(file)?;
    let selectors: Vec<Selector> = load_json(selectors)?;
    let range = html::anchor_with(&doc, root, &selectors, config)?;
    let position = html::position_from_range(&doc, root, &range)?;
    let anchored = AnchoredRange {
        start: usize::try_from(position.start)?,
        end: usize::try_from(position.end)?,
        text: range.to_text(&doc)?,
    };
    Ok(serde_json::to_string_pretty(&anchored)?)
}

async fn anchor_pages(pages: &Path, selectors: &Path, config: AnchorConfig) -> Result<String> {
    let pages: Vec<String> = load_json(pages)?;
    let selectors: Vec<Selector> = load_json(selectors)?;
    let anchorer = PdfAnchorer::new(StaticPages::new(pages), config);

    let result = match anchorer.anchor_rendered(&selectors).await? {
        Anchor::Range { page_index, range } => {
            let document = anchorer.source().document();
            PageAnchor::Anchored {
                page: page_index,
                start: range.start.offset,
                end: range.end.offset,
                text: range.to_text(document.as_ref())?,
            }
        }
        Anchor::Placeholder(placeholder) => PageAnchor::Placeholder {
            page: placeholder.page_index,
        },
    };
    Ok(serde_json::to_string_pretty(&result)?)
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "amnesia_anchor=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let mut config = AnchorConfig::from_env();
    if let Some(context_len) = cli.context_len {
        config = config.with_context_len(context_len);
    }
    tracing::debug!("Using {:?}", config);

    let output = match cli.command {
        Command::Describe { file, start, end } => describe(&file, start, end, &config)?,
        Command::Anchor { file, selectors } => anchor(&file, &selectors, &config)?,
        Command::AnchorPages { pages, selectors } => {
            anchor_pages(&pages, &selectors, config).await?
        }
    };
    println!("{}", output);
    Ok(())
}
