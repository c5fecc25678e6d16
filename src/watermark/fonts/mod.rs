//! Font resolution for watermark text.
//!
//! Resolution never fails. Candidates are tried in order and the first file
//! that both exists and parses wins:
//!
//! 1. the operator-configured custom font path
//! 2. a fixed list of well-known per-OS font files
//! 3. every `.otf/.ttf/.ttc` under the system font root, in walk order
//! 4. the built-in bitmap face
//!
//! Collections (`.ttc`) are always opened at face index 0.
//!
//! Two strategies implement [`FontResolver`]: [`ScanningResolver`] probes
//! the filesystem on every call, [`CachedResolver`] does it once per process
//! and serves the result behind a read-mostly lock.

pub mod bitmap;

use ab_glyph::{Font, FontVec, PxScale, ScaleFont};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

pub use bitmap::BitmapFont;

/// Environment variable that overrides the configured custom font path.
pub const CUSTOM_FONT_ENV: &str = "INKMARK_CUSTOM_FONT_PATH";

/// Default root scanned for font files.
pub const DEFAULT_SYSTEM_FONT_ROOT: &str = "/usr/share/fonts";

/// Well-known CJK-capable font files, checked in order.
pub const KNOWN_FONT_PATHS: &[&str] = &[
    // Container image bundled font
    "/usr/share/fonts/chinese/LXGWWenKai-Regular.ttf",
    // Windows
    "C:/Windows/Fonts/msyh.ttc",
    "C:/Windows/Fonts/msyhbd.ttc",
    "C:/Windows/Fonts/simhei.ttf",
    "C:/Windows/Fonts/simsun.ttc",
    "C:/Windows/Fonts/simkai.ttf",
    "C:/Windows/Fonts/STZHONGS.TTF",
    // macOS
    "/System/Library/Fonts/PingFang.ttc",
    "/System/Library/Fonts/STHeiti Light.ttc",
    "/Library/Fonts/Arial Unicode.ttf",
];

/// How often the filesystem is probed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FontStrategy {
    /// Scan on every resolve
    PerCall,
    /// Scan once, reuse for the life of the process
    #[default]
    Cached,
}

/// Where to look for fonts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FontSearchConfig {
    pub custom_path: Option<PathBuf>,
    pub known_paths: Vec<PathBuf>,
    pub system_root: PathBuf,
}

impl Default for FontSearchConfig {
    fn default() -> Self {
        Self {
            custom_path: None,
            known_paths: KNOWN_FONT_PATHS.iter().map(PathBuf::from).collect(),
            system_root: PathBuf::from(DEFAULT_SYSTEM_FONT_ROOT),
        }
    }
}

impl FontSearchConfig {
    /// Defaults plus the custom path from [`CUSTOM_FONT_ENV`], if set.
    pub fn from_env() -> Self {
        let custom_path = std::env::var(CUSTOM_FONT_ENV)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from);

        Self {
            custom_path,
            ..Self::default()
        }
    }
}

/// A font file that was read and parsed successfully.
pub struct LoadedFont {
    pub path: PathBuf,
    /// Parsed face; owns the only copy of the file bytes.
    pub face: FontVec,
}

impl LoadedFont {
    /// Raw file bytes, for document embedding.
    pub fn data(&self) -> &[u8] {
        self.face.as_slice()
    }
}

impl std::fmt::Debug for LoadedFont {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedFont")
            .field("path", &self.path)
            .field("bytes", &self.data().len())
            .finish()
    }
}

/// The face a handle draws with.
#[derive(Debug, Clone)]
pub enum Typeface {
    Outline(Arc<LoadedFont>),
    Builtin,
}

/// A resolved font at a given pixel size.
#[derive(Debug, Clone)]
pub struct FontHandle {
    typeface: Typeface,
    size: f32,
}

impl FontHandle {
    pub fn new(typeface: Typeface, size: f32) -> Self {
        Self { typeface, size }
    }

    pub fn builtin(size: f32) -> Self {
        Self::new(Typeface::Builtin, size)
    }

    pub fn typeface(&self) -> &Typeface {
        &self.typeface
    }

    pub fn size(&self) -> f32 {
        self.size
    }

    pub fn is_builtin(&self) -> bool {
        matches!(self.typeface, Typeface::Builtin)
    }

    pub fn source_path(&self) -> Option<&Path> {
        match &self.typeface {
            Typeface::Outline(font) => Some(&font.path),
            Typeface::Builtin => None,
        }
    }

    /// Width and height of `text` on one line, in pixels.
    ///
    /// Width is the kerned advance sum, height is ascent minus descent.
    pub fn measure(&self, text: &str) -> (u32, u32) {
        match &self.typeface {
            Typeface::Outline(font) => {
                let scaled = font.face.as_scaled(PxScale::from(self.size));
                let mut width = 0.0f32;
                let mut prev: Option<ab_glyph::GlyphId> = None;

                for c in text.chars() {
                    let id = scaled.glyph_id(c);
                    if let Some(prev) = prev {
                        width += scaled.kern(prev, id);
                    }
                    width += scaled.h_advance(id);
                    prev = Some(id);
                }

                (width.ceil().max(1.0) as u32, scaled.height().ceil().max(1.0) as u32)
            }
            Typeface::Builtin => {
                let (w, h) = BitmapFont::for_size(self.size).measure(text);
                (w.max(1), h.max(1))
            }
        }
    }
}

/// Font availability report for diagnostics.
#[derive(Debug, Clone, Serialize)]
pub struct FontReport {
    pub custom_font: Option<FontPathStatus>,
    pub predefined_fonts: Vec<FontPathStatus>,
    pub dynamic_fonts: Vec<PathBuf>,
    pub all_fonts_in_system: Vec<PathBuf>,
    pub resolved: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FontPathStatus {
    pub path: PathBuf,
    pub exists: bool,
}

/// Font lookup strategy.
pub trait FontResolver: Send + Sync {
    /// Resolve a font for drawing at `size`. Always succeeds.
    fn resolve(&self, size: f32) -> FontHandle;

    /// Describe which candidates exist on this host.
    fn report(&self) -> FontReport;
}

/// Probes the filesystem on every call.
#[derive(Debug, Clone, Default)]
pub struct ScanningResolver {
    config: FontSearchConfig,
}

impl ScanningResolver {
    pub fn new(config: FontSearchConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &FontSearchConfig {
        &self.config
    }

    /// Walk the candidate list and return the first font that loads.
    pub fn find_font(&self) -> Option<Arc<LoadedFont>> {
        if let Some(custom) = &self.config.custom_path {
            let exists = custom.is_file();
            tracing::debug!(path = %custom.display(), exists, "checking custom font");
            if exists {
                if let Some(font) = load_font(custom) {
                    return Some(Arc::new(font));
                }
            }
        }

        for path in &self.config.known_paths {
            let exists = path.is_file();
            tracing::debug!(path = %path.display(), exists, "checking predefined font");
            if exists {
                if let Some(font) = load_font(path) {
                    return Some(Arc::new(font));
                }
            }
        }

        let scanned = find_font_files(&self.config.system_root);
        tracing::debug!(
            root = %self.config.system_root.display(),
            found = scanned.len(),
            "scanned system font root"
        );
        for path in &scanned {
            if let Some(font) = load_font(path) {
                return Some(Arc::new(font));
            }
        }

        tracing::warn!("no usable font file found, using built-in bitmap face");
        None
    }
}

impl FontResolver for ScanningResolver {
    fn resolve(&self, size: f32) -> FontHandle {
        match self.find_font() {
            Some(font) => FontHandle::new(Typeface::Outline(font), size),
            None => FontHandle::builtin(size),
        }
    }

    fn report(&self) -> FontReport {
        let custom_font = self.config.custom_path.as_ref().map(|p| FontPathStatus {
            path: p.clone(),
            exists: p.is_file(),
        });

        let predefined_fonts = self
            .config
            .known_paths
            .iter()
            .map(|p| FontPathStatus {
                path: p.clone(),
                exists: p.is_file(),
            })
            .collect();

        FontReport {
            custom_font,
            predefined_fonts,
            dynamic_fonts: find_font_files(&self.config.system_root),
            all_fonts_in_system: list_files(&self.config.system_root),
            resolved: self.find_font().map(|f| f.path.clone()),
        }
    }
}

/// Resolves once, then serves the same face to every caller.
#[derive(Debug, Default)]
pub struct CachedResolver {
    inner: ScanningResolver,
    // Outer None: not resolved yet. Inner None: fell back to built-in.
    resolved: RwLock<Option<Option<Arc<LoadedFont>>>>,
}

impl CachedResolver {
    pub fn new(config: FontSearchConfig) -> Self {
        Self {
            inner: ScanningResolver::new(config),
            resolved: RwLock::new(None),
        }
    }

    fn cached_font(&self) -> Option<Arc<LoadedFont>> {
        if let Some(cached) = self.resolved.read().as_ref() {
            return cached.clone();
        }

        let mut slot = self.resolved.write();
        if let Some(cached) = slot.as_ref() {
            return cached.clone();
        }
        let found = self.inner.find_font();
        *slot = Some(found.clone());
        found
    }

    /// Forget the cached face; the next resolve scans again.
    pub fn invalidate(&self) {
        *self.resolved.write() = None;
    }
}

impl FontResolver for CachedResolver {
    fn resolve(&self, size: f32) -> FontHandle {
        match self.cached_font() {
            Some(font) => FontHandle::new(Typeface::Outline(font), size),
            None => FontHandle::builtin(size),
        }
    }

    fn report(&self) -> FontReport {
        let mut report = self.inner.report();
        report.resolved = self.cached_font().map(|f| f.path.clone());
        report
    }
}

/// Build the resolver for a strategy.
pub fn build_resolver(config: FontSearchConfig, strategy: FontStrategy) -> Arc<dyn FontResolver> {
    match strategy {
        FontStrategy::PerCall => Arc::new(ScanningResolver::new(config)),
        FontStrategy::Cached => Arc::new(CachedResolver::new(config)),
    }
}

static DEFAULT_RESOLVER: OnceLock<Arc<dyn FontResolver>> = OnceLock::new();

/// Process-wide cached resolver configured from the environment.
pub fn default_resolver() -> Arc<dyn FontResolver> {
    DEFAULT_RESOLVER
        .get_or_init(|| build_resolver(FontSearchConfig::from_env(), FontStrategy::Cached))
        .clone()
}

/// Read and parse a font file at face index 0. Failures are logged, not returned.
pub fn load_font(path: &Path) -> Option<LoadedFont> {
    let data = match std::fs::read(path) {
        Ok(data) => data,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "failed to read font file");
            return None;
        }
    };

    match FontVec::try_from_vec_and_index(data, 0) {
        Ok(face) => {
            tracing::info!(path = %path.display(), "loaded font");
            Some(LoadedFont {
                path: path.to_path_buf(),
                face,
            })
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "failed to parse font file");
            None
        }
    }
}

fn is_font_file(path: &Path) -> bool {
    matches!(
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .as_deref(),
        Some("ttf" | "otf" | "ttc")
    )
}

/// Every font file under `root`, depth-first, entries sorted per directory.
pub fn find_font_files(root: &Path) -> Vec<PathBuf> {
    list_files(root)
        .into_iter()
        .filter(|p| is_font_file(p))
        .collect()
}

/// Every regular file under `root`. Unreadable directories are skipped.
pub fn list_files(root: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    let mut stack = vec![root.to_path_buf()];

    while let Some(dir) = stack.pop() {
        let Ok(entries) = std::fs::read_dir(&dir) else {
            continue;
        };
        let mut entries: Vec<PathBuf> = entries.flatten().map(|e| e.path()).collect();
        entries.sort();

        let mut subdirs = Vec::new();
        for path in entries {
            if path.is_dir() {
                subdirs.push(path);
            } else if path.is_file() {
                files.push(path);
            }
        }
        // Reverse so the stack pops subdirectories in sorted order.
        stack.extend(subdirs.into_iter().rev());
    }

    files
}
