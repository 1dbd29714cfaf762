//! Font handles and the font/metrics cache.
//!
//! Fonts are acquired through a [`FontSource`] and memoized by [`FontKey`] in a [`FontCache`].
//! The cache is shared across render sessions: reads take a shared lock, population and
//! invalidation take the write lock.
//!
//! ## Invalidation
//!
//! A cache is bound to one configuration *instance* via [`FontCache::configure`]. Binding a
//! different instance (by `Arc` identity, not value) clears every entry, so handles obtained
//! before the change are never returned again.

use crate::style::{DEFAULT_FONT_FAMILY, FontSlant, FontWeight, ResolvedStyle};
use parking_lot::RwLock;
use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, Weak};

const MONOSPACE_FAMILIES: &[&str] = &[
    "monospace",
    "menlo",
    "monaco",
    "courier",
    "courier new",
    "consolas",
    "sf mono",
    "dejavu sans mono",
];

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FontKey {
    family: String,
    weight: FontWeight,
    size_bits: u32,
    italic: bool,
}

impl FontKey {
    pub fn new(family: impl Into<String>, weight: FontWeight, size: f32, italic: bool) -> Self {
        // Normalise -0.0 and NaN so equal-looking sizes hash alike.
        let size = if size.is_finite() && size > 0.0 {
            size
        } else {
            0.0
        };
        Self {
            family: family.into(),
            weight,
            size_bits: size.to_bits(),
            italic,
        }
    }

    pub fn from_style(style: &ResolvedStyle) -> Self {
        Self::new(
            style.font_family.clone(),
            style.font_weight,
            style.font_size,
            style.slant == FontSlant::Italic,
        )
    }

    pub fn family(&self) -> &str {
        &self.family
    }

    pub fn weight(&self) -> FontWeight {
        self.weight
    }

    pub fn size(&self) -> f32 {
        f32::from_bits(self.size_bits)
    }

    pub fn italic(&self) -> bool {
        self.italic
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FontMetrics {
    pub line_height: f32,
    pub ascent: f32,
    pub descent: f32,
    /// Advance of one terminal column; wide glyphs take two.
    pub advance: f32,
}

impl FontMetrics {
    /// Typical proportions of a text face at `size` points.
    pub fn proportional(size: f32, monospace: bool) -> Self {
        Self {
            line_height: size * 1.2,
            ascent: size * 0.8,
            descent: size * 0.2,
            advance: if monospace { size * 0.6 } else { size * 0.5 },
        }
    }
}

#[derive(Debug)]
pub struct FontFace {
    key: FontKey,
    resolved_family: String,
    substituted: bool,
    metrics: FontMetrics,
}

impl FontFace {
    pub fn new(key: FontKey, resolved_family: impl Into<String>, metrics: FontMetrics) -> Self {
        Self {
            key,
            resolved_family: resolved_family.into(),
            substituted: false,
            metrics,
        }
    }

    /// A stand-in face for `key` using the default family.
    pub fn substitute(key: FontKey) -> Self {
        let metrics = FontMetrics::proportional(key.size(), false);
        Self {
            key,
            resolved_family: DEFAULT_FONT_FAMILY.to_string(),
            substituted: true,
            metrics,
        }
    }

    pub fn key(&self) -> &FontKey {
        &self.key
    }

    pub fn resolved_family(&self) -> &str {
        &self.resolved_family
    }

    pub fn is_substitute(&self) -> bool {
        self.substituted
    }

    pub fn metrics(&self) -> FontMetrics {
        self.metrics
    }
}

/// Shared handle to a cached face. Equal keys yield the same instance until invalidation.
#[derive(Clone, Debug)]
pub struct FontHandle(Arc<FontFace>);

impl FontHandle {
    pub fn face(&self) -> &FontFace {
        &self.0
    }

    pub fn ptr_eq(&self, other: &FontHandle) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl std::ops::Deref for FontHandle {
    type Target = FontFace;

    fn deref(&self) -> &FontFace {
        &self.0
    }
}

/// Where faces come from. Implementations must be cheap to query repeatedly but may be
/// expensive to construct.
pub trait FontSource: Send + Sync {
    /// The face for `key`, or `None` if the family is unavailable.
    fn load(&self, key: &FontKey) -> Option<FontFace>;

    /// Face used when [`FontSource::load`] fails.
    fn fallback(&self, key: &FontKey) -> FontFace {
        FontFace::substitute(key.clone())
    }
}

/// Font source with a fixed family list and synthetic metrics.
#[derive(Clone, Debug)]
pub struct BuiltinFontSource {
    families: Vec<String>,
}

impl Default for BuiltinFontSource {
    fn default() -> Self {
        Self::with_families([
            DEFAULT_FONT_FAMILY,
            "Helvetica",
            "Helvetica-Bold",
            "Helvetica Neue",
            "Arial",
            "Georgia",
            "Times New Roman",
            "sans-serif",
            "serif",
            "monospace",
            "Menlo",
            "Courier",
            "Courier New",
        ])
    }
}

impl BuiltinFontSource {
    pub fn with_families<I, S>(families: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            families: families.into_iter().map(Into::into).collect(),
        }
    }

    pub fn families(&self) -> &[String] {
        &self.families
    }
}

impl FontSource for BuiltinFontSource {
    fn load(&self, key: &FontKey) -> Option<FontFace> {
        let family = self
            .families
            .iter()
            .find(|f| f.eq_ignore_ascii_case(key.family()))?;
        let metrics = FontMetrics::proportional(key.size(), is_monospace_family(family));
        Some(FontFace::new(key.clone(), family.clone(), metrics))
    }
}

pub fn is_monospace_family(family: &str) -> bool {
    let lower = family.to_ascii_lowercase();
    MONOSPACE_FAMILIES.contains(&lower.as_str())
}

#[cfg(feature = "system-fonts")]
pub use system::SystemFontSource;

#[cfg(feature = "system-fonts")]
mod system {
    use super::{FontFace, FontKey, FontMetrics, FontSource};
    use fontdb::{Database, Family, Query, Stretch, Style, Weight};

    /// Faces from the platform font database.
    pub struct SystemFontSource {
        db: Database,
    }

    impl SystemFontSource {
        pub fn new() -> Self {
            let mut db = Database::new();
            db.load_system_fonts();
            tracing::debug!(faces = db.len(), "Loaded system fonts");
            Self { db }
        }

        pub fn from_database(db: Database) -> Self {
            Self { db }
        }
    }

    impl Default for SystemFontSource {
        fn default() -> Self {
            Self::new()
        }
    }

    impl FontSource for SystemFontSource {
        fn load(&self, key: &FontKey) -> Option<FontFace> {
            let family = match key.family() {
                "monospace" => Family::Monospace,
                "serif" => Family::Serif,
                "sans-serif" | "System" => Family::SansSerif,
                name => Family::Name(name),
            };
            let families = [family];
            let query = Query {
                families: &families,
                weight: Weight(key.weight().0),
                stretch: Stretch::Normal,
                style: if key.italic() {
                    Style::Italic
                } else {
                    Style::Normal
                },
            };
            let id = self.db.query(&query)?;
            let face = self.db.face(id)?;
            let resolved = face
                .families
                .first()
                .map(|(name, _)| name.clone())
                .unwrap_or_else(|| key.family().to_string());
            let metrics = FontMetrics::proportional(key.size(), face.monospaced);
            Some(FontFace::new(key.clone(), resolved, metrics))
        }
    }
}

struct CacheState {
    entries: HashMap<FontKey, FontHandle>,
    bound: Option<Weak<dyn Any + Send + Sync>>,
    generation: u64,
}

pub struct FontCache {
    source: Arc<dyn FontSource>,
    state: RwLock<CacheState>,
}

impl Default for FontCache {
    fn default() -> Self {
        Self::new(Arc::new(BuiltinFontSource::default()))
    }
}

impl std::fmt::Debug for FontCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.read();
        f.debug_struct("FontCache")
            .field("entries", &state.entries.len())
            .field("generation", &state.generation)
            .finish()
    }
}

impl FontCache {
    pub fn new(source: Arc<dyn FontSource>) -> Self {
        Self {
            source,
            state: RwLock::new(CacheState {
                entries: HashMap::new(),
                bound: None,
                generation: 0,
            }),
        }
    }

    /// Binds the cache to `config`. Returns `true` if this cleared the cache.
    pub fn configure<T: Any + Send + Sync>(&self, config: &Arc<T>) -> bool {
        let same = {
            let state = self.state.read();
            state
                .bound
                .as_ref()
                .is_some_and(|w| std::ptr::addr_eq(w.as_ptr(), Arc::as_ptr(config)))
        };
        if same {
            return false;
        }

        let weak: Weak<dyn Any + Send + Sync> = {
            let strong: Arc<dyn Any + Send + Sync> = config.clone();
            Arc::downgrade(&strong)
        };
        let mut state = self.state.write();
        let had_binding = state.bound.is_some();
        state.bound = Some(weak);
        if had_binding || !state.entries.is_empty() {
            Self::clear_locked(&mut state);
            return true;
        }
        false
    }

    /// Drops every entry, e.g. after the platform's installed fonts changed.
    pub fn invalidate(&self) {
        let mut state = self.state.write();
        Self::clear_locked(&mut state);
    }

    fn clear_locked(state: &mut CacheState) {
        state.entries.clear();
        state.generation += 1;
        tracing::debug!(generation = state.generation, "Font cache invalidated");
    }

    pub fn font_for(&self, style: &ResolvedStyle) -> FontHandle {
        self.font_for_key(FontKey::from_style(style))
    }

    pub fn font_for_key(&self, key: FontKey) -> FontHandle {
        if let Some(handle) = self.state.read().entries.get(&key) {
            return handle.clone();
        }

        let face = match self.source.load(&key) {
            Some(face) => face,
            None => {
                let face = self.source.fallback(&key);
                tracing::warn!(
                    family = key.family(),
                    substitute = face.resolved_family(),
                    "Font family unavailable, substituting"
                );
                face
            }
        };

        let mut state = self.state.write();
        // Another writer may have populated the key while the lock was released.
        state
            .entries
            .entry(key)
            .or_insert_with(|| FontHandle(Arc::new(face)))
            .clone()
    }

    pub fn metrics_for(&self, font: &FontHandle) -> FontMetrics {
        font.metrics()
    }

    pub fn len(&self) -> usize {
        self.state.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Incremented on every invalidation.
    pub fn generation(&self) -> u64 {
        self.state.read().generation
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSource {
        inner: BuiltinFontSource,
        loads: AtomicUsize,
    }

    impl FontSource for CountingSource {
        fn load(&self, key: &FontKey) -> Option<FontFace> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            self.inner.load(key)
        }
    }

    fn style(family: &str, size: f32) -> ResolvedStyle {
        ResolvedStyle {
            font_family: family.to_string(),
            font_size: size,
            ..ResolvedStyle::default()
        }
    }

    #[test]
    fn equal_styles_share_one_handle() {
        let source = Arc::new(CountingSource {
            inner: BuiltinFontSource::default(),
            loads: AtomicUsize::new(0),
        });
        let cache = FontCache::new(source.clone());

        let a = cache.font_for(&style("Helvetica", 14.0));
        let b = cache.font_for(&style("Helvetica", 14.0));
        assert!(a.ptr_eq(&b));
        assert_eq!(source.loads.load(Ordering::SeqCst), 1);

        let c = cache.font_for(&style("Helvetica", 15.0));
        assert!(!a.ptr_eq(&c));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn non_font_attributes_do_not_split_entries() {
        let cache = FontCache::default();
        let mut colored = style("Menlo", 12.0);
        colored.color = ratatui::style::Color::Red;
        colored.underline = true;
        let a = cache.font_for(&style("Menlo", 12.0));
        let b = cache.font_for(&colored);
        assert!(a.ptr_eq(&b));
    }

    #[test]
    fn missing_family_is_substituted_and_cached() {
        let source = Arc::new(CountingSource {
            inner: BuiltinFontSource::default(),
            loads: AtomicUsize::new(0),
        });
        let cache = FontCache::new(source.clone());

        let a = cache.font_for(&style("No Such Font", 12.0));
        assert!(a.is_substitute());
        assert_eq!(a.resolved_family(), DEFAULT_FONT_FAMILY);
        let b = cache.font_for(&style("No Such Font", 12.0));
        assert!(a.ptr_eq(&b));
        assert_eq!(source.loads.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn configuration_change_invalidates_handles() {
        let cache = FontCache::default();
        let first = Arc::new(String::from("config"));
        assert!(!cache.configure(&first));
        let before = cache.font_for(&style("Helvetica", 12.0));

        assert!(!cache.configure(&first));
        assert!(before.ptr_eq(&cache.font_for(&style("Helvetica", 12.0))));

        // Value-equal but a different instance.
        let second = Arc::new(String::from("config"));
        assert!(cache.configure(&second));
        assert_eq!(cache.generation(), 1);
        let after = cache.font_for(&style("Helvetica", 12.0));
        assert!(!before.ptr_eq(&after));
    }

    #[test]
    fn metrics_scale_with_size_and_family() {
        let cache = FontCache::default();
        let body = cache.font_for(&style("Helvetica", 10.0));
        let code = cache.font_for(&style("Menlo", 10.0));
        let m = cache.metrics_for(&body);
        assert!((m.line_height - 12.0).abs() < 1e-4);
        assert!((m.ascent + m.descent - 10.0).abs() < 1e-4);
        assert!(cache.metrics_for(&code).advance > m.advance);
    }

    #[test]
    fn concurrent_readers_share_handles() {
        let source = Arc::new(CountingSource {
            inner: BuiltinFontSource::default(),
            loads: AtomicUsize::new(0),
        });
        let cache = FontCache::new(source.clone());
        let sizes = [10.0, 12.0, 14.0];

        let handles = std::thread::scope(|s| {
            let workers = (0..8)
                .map(|_| {
                    s.spawn(|| {
                        let mut seen = Vec::new();
                        for _ in 0..50 {
                            for size in sizes {
                                seen.push(cache.font_for(&style("Menlo", size)));
                            }
                        }
                        seen
                    })
                })
                .collect::<Vec<_>>();
            workers
                .into_iter()
                .flat_map(|w| w.join().unwrap())
                .collect::<Vec<_>>()
        });

        assert_eq!(cache.len(), sizes.len());
        for handle in &handles {
            assert!(handle.ptr_eq(&cache.font_for_key(handle.key().clone())));
        }
        // Racing misses may load a key more than once, but only one handle is kept.
        let loads = source.loads.load(Ordering::SeqCst);
        assert!((sizes.len()..=sizes.len() * 8).contains(&loads), "{loads}");
    }

    #[test]
    fn invalidation_races_with_readers() {
        let cache = FontCache::default();
        std::thread::scope(|s| {
            for _ in 0..4 {
                s.spawn(|| {
                    for i in 0..200 {
                        let size = 10.0 + (i % 5) as f32;
                        let font = cache.font_for(&style("Helvetica", size));
                        assert_eq!(font.key().size(), size);
                    }
                });
            }
            s.spawn(|| {
                for _ in 0..20 {
                    cache.invalidate();
                }
            });
        });

        assert_eq!(cache.generation(), 20);
        let a = cache.font_for(&style("Helvetica", 11.0));
        assert!(a.ptr_eq(&cache.font_for(&style("Helvetica", 11.0))));
    }
}
