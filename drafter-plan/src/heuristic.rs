//! Deterministic bucketing of changed paths.
//!
//! `heuristic_groups(paths)` classifies each path into a bucket, in priority
//! order: tests, docs, a language cluster (qualified by the top-level
//! directory when nested), the top-level directory, and finally `root`.

use std::collections::BTreeMap;
use std::path::Path;

use drafter_core::GroupPlan;

// ---------------------------------------------------------------------------
// Tables
// ---------------------------------------------------------------------------

const TEST_SEGMENTS: &[&str] = &["test", "tests", "__tests__"];

const DOC_EXTENSIONS: &[&str] = &["md", "rst", "txt", "adoc"];

/// Extension clusters, checked in order.
const CLUSTERS: &[(&str, &[&str])] = &[
    ("python", &["py", "pyx", "pyi"]),
    ("javascript", &["js", "jsx", "mjs", "cjs"]),
    ("typescript", &["ts", "tsx"]),
    ("web_styles", &["css", "scss", "sass", "less"]),
    ("web_markup", &["html", "htm", "xml"]),
    ("config", &["json", "yaml", "yml", "toml", "ini", "cfg", "conf"]),
    ("shell", &["sh", "bash", "zsh", "fish"]),
    ("java", &["java", "kt", "scala"]),
    ("cpp", &["c", "cpp", "cc", "cxx", "h", "hpp", "hxx"]),
    ("go", &["go"]),
    ("rust", &["rs"]),
    ("ruby", &["rb", "rake"]),
    ("php", &["php"]),
    ("sql", &["sql"]),
];

// ---------------------------------------------------------------------------
// Buckets
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
enum Bucket {
    Tests,
    Docs,
    Cluster {
        dir: Option<String>,
        cluster: &'static str,
    },
    Directory(String),
    Root,
}

impl Bucket {
    fn classify(path: &str) -> Self {
        let parts: Vec<&str> = path.split('/').filter(|p| !p.is_empty()).collect();
        let name = parts.last().copied().unwrap_or(path);
        let top = (parts.len() > 1).then(|| parts[0].to_string());

        if is_test_path(&parts, name) {
            return Bucket::Tests;
        }

        let ext = Path::new(name)
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        let ext = ext.as_deref();

        if ext.is_some_and(|e| DOC_EXTENSIONS.contains(&e)) {
            return Bucket::Docs;
        }
        if let Some(cluster) = ext.and_then(cluster_for) {
            return Bucket::Cluster { dir: top, cluster };
        }
        match top {
            Some(dir) => Bucket::Directory(dir),
            None => Bucket::Root,
        }
    }

    fn key(&self) -> String {
        match self {
            Bucket::Tests => "tests".to_string(),
            Bucket::Docs => "docs".to_string(),
            Bucket::Cluster { dir: Some(dir), cluster } => format!("{dir}_{cluster}"),
            Bucket::Cluster { dir: None, cluster } => cluster.to_string(),
            Bucket::Directory(dir) => dir.clone(),
            Bucket::Root => "root".to_string(),
        }
    }

    fn rank(key: &str) -> u8 {
        match key {
            "tests" => 0,
            "docs" => 1,
            _ => 2,
        }
    }
}

fn is_test_path(parts: &[&str], name: &str) -> bool {
    let stem = Path::new(name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(name);
    parts.iter().any(|p| TEST_SEGMENTS.contains(p))
        || name.starts_with("test_")
        || stem.ends_with("_test")
        || name.contains(".test.")
        || name.contains(".spec.")
}

fn cluster_for(ext: &str) -> Option<&'static str> {
    CLUSTERS
        .iter()
        .find(|(_, exts)| exts.contains(&ext))
        .map(|(cluster, _)| *cluster)
}

/// Title for a bucket key. Derived from the key alone, so a directory that
/// shares a key with a reserved bucket gets that bucket's title.
fn title_for_key(key: &str) -> String {
    match key {
        "tests" => return "Test Updates".to_string(),
        "docs" => return "Documentation Updates".to_string(),
        "root" => return "Root Configuration".to_string(),
        _ => {}
    }
    for (cluster, _) in CLUSTERS {
        if key == *cluster {
            return format!("{} Changes", title_case(cluster));
        }
        if let Some(dir) = key
            .strip_suffix(cluster)
            .and_then(|rest| rest.strip_suffix('_'))
            .filter(|dir| !dir.is_empty())
        {
            return format!("{}: {} Changes", title_case(dir), title_case(cluster));
        }
    }
    format!("{} Changes", title_case(key))
}

/// Underscores become spaces; each alphabetic run is capitalized.
fn title_case(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut in_word = false;
    for c in raw.replace('_', " ").chars() {
        if c.is_alphabetic() {
            if in_word {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            in_word = true;
        } else {
            out.push(c);
            in_word = false;
        }
    }
    out
}

/// Group paths into heuristic buckets: tests first, docs second, the rest by key.
pub fn heuristic_groups<S: AsRef<str>>(paths: &[S]) -> Vec<GroupPlan> {
    let mut buckets: BTreeMap<(u8, String), Vec<String>> = BTreeMap::new();

    for path in paths {
        let path = path.as_ref();
        let key = Bucket::classify(path).key();
        buckets
            .entry((Bucket::rank(&key), key))
            .or_default()
            .push(path.to_string());
    }

    buckets
        .into_iter()
        .map(|((_, key), mut files)| {
            files.sort();
            files.dedup();
            GroupPlan::new(title_for_key(&key), files)
        })
        .collect()
}
