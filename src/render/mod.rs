//! Render pipeline: formula source in, cached PNG reference out
//!
//! ```text
//! name check -> validate -> derive key -> cache lookup
//!                                          |- hit:  touch, done
//!                                          '- miss: write .tex -> latex -> dvipng -> rename .part -> populate
//! ```
//!
//! Concurrent misses for the same key are serialized on a per-key lock and
//! the second caller finds the image already written. The miss branch runs
//! on its own task, so it completes even when the caller goes away.

pub mod document;
pub mod key;
pub mod request;
pub mod validate;

pub use document::{DocumentBuilder, LatexDocument};
pub use key::CacheKey;
pub use request::RenderRequest;
pub use validate::Validator;

use crate::cache::{CacheStore, INTERMEDIATE_EXTS, PARTIAL_EXT};
use crate::config::RenderConfig;
use crate::error::{TracMathError, TracMathResult};
use crate::html;
use crate::toolchain::{Invocation, ProcessToolchain, Toolchain};
use dashmap::DashMap;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{Mutex, OnceCell};
use tracing::{debug, error, info, warn};

/// Macro name handled by the pipeline
pub const MACRO_NAME: &str = "latex";

/// URL path under which cached images are served
pub const ROUTE_PREFIX: &str = "/tracmath";

/// A formula available in the cache
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedImage {
    /// Cache file name (`<key>.png`)
    pub image_name: String,
    /// Original source, used as alt text
    pub alt: String,
    /// Equation label, if the source has one
    pub label: Option<String>,
    /// Whether the image was already cached
    pub cached: bool,
}

type InFlightMap = DashMap<String, Arc<Mutex<()>>>;

/// Renders formulas into the cache
pub struct Renderer {
    config: Arc<RenderConfig>,
    store: CacheStore,
    validator: Validator,
    document: Arc<dyn DocumentBuilder>,
    toolchain: Arc<dyn Toolchain>,
    template_digest: String,
    base_url: String,
    in_flight: Arc<InFlightMap>,
    ready: OnceCell<()>,
}

impl Renderer {
    /// Create a renderer using real subprocesses and the configured preamble
    pub fn new(config: RenderConfig) -> Self {
        let store = CacheStore::new(config.cache_dir.clone(), config.max_png);
        let validator = Validator::new(config.denylist.clone());
        let toolchain = Arc::new(ProcessToolchain::from_config(&config));
        let document: Arc<dyn DocumentBuilder> =
            Arc::new(LatexDocument::new(config.preamble.clone()));
        let template_digest = key::digest_text(&document.build(""));

        Self {
            config: Arc::new(config),
            store,
            validator,
            document,
            toolchain,
            template_digest,
            base_url: String::new(),
            in_flight: Arc::new(DashMap::new()),
            ready: OnceCell::new(),
        }
    }

    /// Replace the toolchain
    pub fn with_toolchain(mut self, toolchain: Arc<dyn Toolchain>) -> Self {
        self.toolchain = toolchain;
        self
    }

    /// Replace the document builder; keys follow the new template
    pub fn with_document_builder(mut self, document: Arc<dyn DocumentBuilder>) -> Self {
        self.template_digest = key::digest_text(&document.build(""));
        self.document = document;
        self
    }

    /// Prefix for generated image URLs (e.g. `https://wiki.example.org`)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Cache backing this renderer
    pub fn store(&self) -> &CacheStore {
        &self.store
    }

    /// Render settings in use
    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Cache key for a request under the current settings
    pub fn key_for(&self, request: &RenderRequest) -> CacheKey {
        CacheKey::derive(
            request.stripped(),
            &self.template_digest,
            self.config.mag_factor,
        )
    }

    /// Render a macro invocation to an HTML fragment
    ///
    /// Never fails: errors become an error box.
    pub async fn render_html(&self, macro_name: &str, content: &str) -> String {
        match self.render(macro_name, content).await {
            Ok(image) => self.image_html(&image),
            Err(e) => self.error_html(&e),
        }
    }

    /// `<img>` fragment for a rendered formula
    pub fn image_html(&self, image: &RenderedImage) -> String {
        html::image_tag(
            &self.image_url(&image.image_name),
            &image.alt,
            image.label.as_deref(),
        )
    }

    /// Error box for a failed render
    pub fn error_html(&self, err: &TracMathError) -> String {
        error!("{}", err);
        html::error_box(&err.to_string())
    }

    /// URL under which an image is served
    pub fn image_url(&self, image_name: &str) -> String {
        format!("{}{}/{}", self.base_url, ROUTE_PREFIX, image_name)
    }

    /// Render a macro invocation into the cache
    pub async fn render(&self, macro_name: &str, content: &str) -> TracMathResult<RenderedImage> {
        if macro_name != MACRO_NAME {
            return Err(TracMathError::UnknownMacro(macro_name.to_string()));
        }

        // Rejected source must not touch the filesystem, cache dir included
        self.validator.validate(content)?;
        self.ensure_ready().await?;

        let request = RenderRequest::new(content);
        let key = self.key_for(&request);
        let image_name = key.image_name();

        let cached = self.lookup(&image_name).await;
        if !cached {
            self.fill(&request, &key).await?;
        }

        Ok(RenderedImage {
            image_name,
            alt: request.source,
            label: request.label,
            cached,
        })
    }

    /// Check the cache directory and binaries, once per renderer
    async fn ensure_ready(&self) -> TracMathResult<()> {
        self.ready
            .get_or_try_init(|| async {
                self.store.ensure_dir().await?;
                check_binary("latex", &self.config.latex_cmd)?;
                check_binary("dvipng", &self.config.dvipng_cmd)?;
                Ok::<(), TracMathError>(())
            })
            .await
            .map(|_| ())
    }

    /// Cache hit check; a hit refreshes the image's mtime
    async fn lookup(&self, image_name: &str) -> bool {
        if !self.store.contains(image_name).await {
            return false;
        }

        match self.store.touch(image_name).await {
            Ok(()) => {
                debug!("Cache hit: {}", image_name);
                true
            }
            Err(e) => {
                // Evicted between the check and the touch
                debug!("Cache hit lost: {}", e);
                false
            }
        }
    }

    /// Miss-fill on a detached task
    ///
    /// The build keeps running if the caller is dropped, so a cancelled
    /// request never leaves a half-written image or a stale lock behind.
    async fn fill(&self, request: &RenderRequest, key: &CacheKey) -> TracMathResult<()> {
        let job = BuildJob {
            config: Arc::clone(&self.config),
            store: self.store.clone(),
            document: Arc::clone(&self.document),
            toolchain: Arc::clone(&self.toolchain),
            in_flight: Arc::clone(&self.in_flight),
            request: request.clone(),
            key: key.clone(),
        };

        tokio::spawn(job.run())
            .await
            .map_err(|e| TracMathError::Internal(format!("render task failed: {e}")))?
    }
}

/// Per-key lock slot, removed from the map once nobody else holds it
struct InFlightSlot {
    map: Arc<InFlightMap>,
    key: String,
    lock: Arc<Mutex<()>>,
}

impl InFlightSlot {
    fn enter(map: Arc<InFlightMap>, key: String) -> Self {
        let lock = map.entry(key.clone()).or_default().clone();
        Self { map, key, lock }
    }
}

impl Drop for InFlightSlot {
    fn drop(&mut self) {
        // Map entry plus ours means nobody else is waiting
        self.map
            .remove_if(&self.key, |_, lock| Arc::strong_count(lock) <= 2);
    }
}

/// One miss-fill, owning everything it needs
struct BuildJob {
    config: Arc<RenderConfig>,
    store: CacheStore,
    document: Arc<dyn DocumentBuilder>,
    toolchain: Arc<dyn Toolchain>,
    in_flight: Arc<InFlightMap>,
    request: RenderRequest,
    key: CacheKey,
}

impl BuildJob {
    async fn run(self) -> TracMathResult<()> {
        let slot = InFlightSlot::enter(Arc::clone(&self.in_flight), self.key.to_string());
        let _guard = slot.lock.lock().await;

        if self.store.contains(&self.key.image_name()).await {
            debug!("Rendered concurrently: {}", self.key);
            return Ok(());
        }
        self.build().await
    }

    async fn build(&self) -> TracMathResult<()> {
        let tex_name = self.key.artifact_name("tex");
        let tex_path = self.store.path_for(&tex_name);
        let document = self.document.build(self.request.stripped());

        tokio::fs::write(&tex_path, document)
            .await
            .map_err(|e| TracMathError::Build {
                path: tex_path.clone(),
                source: e,
            })?;

        let finished = match self.typeset(&tex_name).await {
            Ok(()) => {
                self.store
                    .promote(&self.key.artifact_name(PARTIAL_EXT), &self.key.image_name())
                    .await
            }
            Err(e) => Err(e),
        };
        if let Err(e) = finished {
            self.discard().await;
            return Err(e);
        }

        info!("Rendered {}", self.key.image_name());
        self.maintain().await;
        Ok(())
    }

    async fn typeset(&self, tex_name: &str) -> TracMathResult<()> {
        let dir = self.store.dir();

        let latex = Invocation::new(
            &self.config.latex_cmd,
            vec!["-interaction=nonstopmode".to_string(), tex_name.to_string()],
            dir,
        );
        self.toolchain.run(&latex).await?;

        let dvipng = Invocation::new(
            &self.config.dvipng_cmd,
            rasterize_args(&self.key, self.config.mag_factor),
            dir,
        );
        self.toolchain.run(&dvipng).await
    }

    /// Remove a failed render's image and intermediates
    async fn discard(&self) {
        let names = std::iter::once(self.key.image_name())
            .chain(INTERMEDIATE_EXTS.iter().map(|ext| self.key.artifact_name(ext)));
        for name in names {
            if let Err(e) = self.store.remove(&name).await {
                warn!("Failed to clean up after failed render: {}", e);
            }
        }
    }

    /// Sweep garbage and enforce the entry limit, sparing other in-flight builds
    async fn maintain(&self) {
        let busy: HashSet<String> = self
            .in_flight
            .iter()
            .map(|entry| entry.key().clone())
            .filter(|k| k != self.key.as_str())
            .collect();

        if let Err(e) = self.store.populate_except(&busy).await {
            warn!("Cache maintenance failed: {}", e);
        }
    }
}

/// dvipng arguments: tight bounding box, transparent background, full anti-aliasing
///
/// Output goes to `<key>.part` and is moved into place only on success.
fn rasterize_args(key: &CacheKey, mag_factor: u32) -> Vec<String> {
    [
        "-T",
        "tight",
        "-x",
        &mag_factor.to_string(),
        "-z",
        "9",
        "-bg",
        "Transparent",
        "-o",
        &key.artifact_name(PARTIAL_EXT),
        &key.artifact_name("dvi"),
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// A binary given as a path must exist; bare names are looked up on `PATH` at spawn time
fn check_binary(tool: &'static str, path: &Path) -> TracMathResult<()> {
    if path.components().count() > 1 && !path.exists() {
        return Err(TracMathError::BinaryNotFound {
            tool,
            path: PathBuf::from(path),
        });
    }
    Ok(())
}
