//! The unit the View Definer hands to the Snapshot Engine: an immutable
//! definition of a build root plus its resolved environment.

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::hash::Hash;
use std::hash::Hasher;

use camino::Utf8Path;
use camino::Utf8PathBuf;
use rustc_hash::FxHasher;

/// How a view's set of source files was determined.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ViewType {
    /// A build root describing exactly one module was found on disk.
    SingleModule,
    /// A build root describing several modules (a workspace manifest) was
    /// found on disk.
    MultiModule,
    /// No build root covers the file; its containing directory is treated as
    /// a throwaway, single-file view.
    AdHoc,
    /// The view was defined explicitly (e.g. a CLI invocation naming files
    /// directly) rather than discovered by walking the workspace.
    CommandLineArgs,
    /// The file isn't part of any module at all.
    NoModule,
}

/// The resolved build environment a view's analysis runs under.
///
/// Two views with identical roots but different environments (a different
/// compiler version, a different set of build tags) are different views --
/// every field here feeds [`ViewDefinition::definition_hash`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResolvedEnv {
    pub compiler_version: String,
    pub os: String,
    pub arch: String,
    pub build_tags: BTreeSet<String>,
    pub env_overrides: BTreeMap<String, String>,
}

impl ResolvedEnv {
    /// The environment of the toolchain running this process, with no build
    /// tags or overrides applied.
    #[must_use]
    pub fn host() -> Self {
        Self {
            compiler_version: String::new(),
            os: std::env::consts::OS.to_string(),
            arch: std::env::consts::ARCH.to_string(),
            build_tags: BTreeSet::new(),
            env_overrides: BTreeMap::new(),
        }
    }

    fn hash_into<H: Hasher>(&self, hasher: &mut H) {
        self.compiler_version.hash(hasher);
        self.os.hash(hasher);
        self.arch.hash(hasher);
        for tag in &self.build_tags {
            tag.hash(hasher);
        }
        for (key, value) in &self.env_overrides {
            key.hash(hasher);
            value.hash(hasher);
        }
    }
}

/// A view's immutable definition: everything that determines whether two
/// discovery passes produced "the same" view.
///
/// `root` is the build root a view was discovered from (a manifest
/// directory, or a file's own directory for ad hoc views); `folder` is the
/// workspace folder it was discovered under, used to decide which open files
/// the view covers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ViewDefinition {
    pub root: Utf8PathBuf,
    pub folder: Utf8PathBuf,
    pub view_type: ViewType,
    pub env: ResolvedEnv,
}

impl ViewDefinition {
    /// A hash of `(root, type discriminant, sorted env entries)`, stable
    /// across discovery passes as long as nothing about the view actually
    /// changed. Reconciliation compares these to decide which existing views
    /// survive a re-discovery and which get retired.
    #[must_use]
    pub fn definition_hash(&self) -> u64 {
        let mut hasher = FxHasher::default();
        self.root.as_str().hash(&mut hasher);
        self.view_type.hash(&mut hasher);
        self.env.hash_into(&mut hasher);
        hasher.finish()
    }
}

/// A stable identifier for a live view, assigned once at creation and held
/// for the view's lifetime even as its definition is replaced by a later
/// reconciliation pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ViewId(u64);

impl ViewId {
    #[must_use]
    pub fn from_raw(id: u64) -> Self {
        Self(id)
    }

    #[must_use]
    pub fn as_raw(self) -> u64 {
        self.0
    }
}

/// The root of one independently analyzable world: a set of source files, a
/// resolved build environment, and the metadata graph built from them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct View {
    pub id: ViewId,
    pub definition: ViewDefinition,
}

impl View {
    #[must_use]
    pub fn new(id: ViewId, definition: ViewDefinition) -> Self {
        Self { id, definition }
    }

    /// Build an ad hoc, single-file view rooted at `folder` -- used when an
    /// open file isn't covered by any discovered build root, and by tests
    /// that don't need real discovery.
    #[must_use]
    pub fn ad_hoc(folder: Utf8PathBuf) -> Self {
        Self {
            id: ViewId(0),
            definition: ViewDefinition {
                root: folder.clone(),
                folder,
                view_type: ViewType::AdHoc,
                env: ResolvedEnv::host(),
            },
        }
    }

    #[must_use]
    pub fn root(&self) -> &Utf8Path {
        &self.definition.root
    }

    #[must_use]
    pub fn view_type(&self) -> ViewType {
        self.definition.view_type
    }

    #[must_use]
    pub fn env(&self) -> &ResolvedEnv {
        &self.definition.env
    }

    /// Whether `path` lives under this view's folder.
    #[must_use]
    pub fn covers(&self, path: &Utf8Path) -> bool {
        path.starts_with(&self.definition.folder)
    }
}
