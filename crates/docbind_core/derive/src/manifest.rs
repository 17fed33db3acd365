//! Resolves the path generated code must use to reach `docbind_core`.
//!
//! The derive cannot assume how the invoking crate names its
//! dependencies, so it scans the invoker's `Cargo.toml` once and caches
//! the parsed manifest keyed by path and modified time.

use std::collections::BTreeMap;
use std::env;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};
use std::time::SystemTime;

use toml_edit::{Document, Item, Table};

const CORE_NAME: &str = "docbind_core";
const FACADE_NAME: &str = "docbind";

/// A parsed `Cargo.toml` of the crate a macro is expanding in.
///
/// # Resolution rules
///
/// 1. If the invoking crate depends on `docbind_core`, generated code
///    uses `::docbind_core`.
/// 2. If it depends on the facade crate `docbind`, generated code uses
///    `::docbind::core`.
/// 3. The same two steps repeat for `dev-dependencies`.
/// 4. Otherwise `::docbind_core` is emitted and left to the compiler.
///
/// `docbind_core` declares `extern crate self as docbind_core;` so that
/// rule 1 also covers expansion inside the core crate itself.
#[derive(Debug)]
struct Manifest {
    manifest: Document<Box<str>>,
    modified_time: SystemTime,
}

impl Manifest {
    #[inline(never)]
    fn manifest_path() -> PathBuf {
        env::var_os("CARGO_MANIFEST_DIR")
            .map(|dir| {
                let mut path = PathBuf::from(dir);
                path.push("Cargo.toml");
                assert!(
                    path.exists(),
                    "cargo manifest does not exist at {}",
                    path.display(),
                );
                path
            })
            .expect("CARGO_MANIFEST_DIR should be set by cargo")
    }

    #[inline(never)]
    fn modified_time(path: &Path) -> Result<SystemTime, std::io::Error> {
        std::fs::metadata(path).and_then(|metadata| metadata.modified())
    }

    #[inline(never)]
    fn read(path: &Path) -> Document<Box<str>> {
        let manifest = std::fs::read_to_string(path)
            .unwrap_or_else(|_| panic!("unable to read cargo manifest {}", path.display()))
            .into_boxed_str();
        Document::parse(manifest)
            .unwrap_or_else(|_| panic!("failed to parse cargo manifest {}", path.display()))
    }

    fn find_in_deps(deps: &Table) -> Option<syn::Path> {
        if deps.contains_key(CORE_NAME) {
            return syn::parse_str(&format!("::{CORE_NAME}")).ok();
        }
        if deps.contains_key(FACADE_NAME) {
            return syn::parse_str(&format!("::{FACADE_NAME}::core")).ok();
        }
        None
    }

    fn core_path(&self) -> syn::Path {
        for deps_table in ["dependencies", "dev-dependencies"] {
            if let Some(Item::Table(deps)) = self.manifest.get(deps_table)
                && let Some(path) = Self::find_in_deps(deps)
            {
                return path;
            }
        }
        syn::parse_str(&format!("::{CORE_NAME}")).expect("crate name parses as a path")
    }

    /// Runs `func` against the cached manifest of the invoking crate,
    /// re-reading it when the file changed on disk.
    fn shared<R>(func: impl FnOnce(&Self) -> R) -> R {
        static MANIFESTS: RwLock<BTreeMap<PathBuf, Manifest>> = RwLock::new(BTreeMap::new());

        let manifest_path = Self::manifest_path();
        let modified_time = Self::modified_time(&manifest_path)
            .expect("the cargo manifest should have a modified time");

        let manifests = MANIFESTS.read().unwrap_or_else(PoisonError::into_inner);

        if let Some(manifest) = manifests.get(&manifest_path)
            && manifest.modified_time == modified_time
        {
            return func(manifest);
        }

        drop(manifests);

        let manifest = Manifest {
            manifest: Self::read(&manifest_path),
            modified_time,
        };

        let result = func(&manifest);

        MANIFESTS
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(manifest_path, manifest);

        result
    }
}

/// The path generated code uses to reach `docbind_core`.
///
/// Reading and locking the manifest cache is not free; callers resolve
/// once per macro invocation and pass the path along.
pub(crate) fn core_path() -> syn::Path {
    Manifest::shared(Manifest::core_path)
}
