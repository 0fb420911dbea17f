//! Path canonicalization for the rule graph.
//!
//! Every path stored in the rule store goes through [`normalize_filename`]
//! first, so rule lookups are plain string comparisons. None of these
//! functions touch the filesystem.

/// Canonicalize one or more path fragments into a single path.
///
/// Fragments are joined with `/`; a fragment that is absolute resets the
/// accumulator. `.` components are dropped, `..` collapses against a
/// preceding non-`..` component, repeated slashes are squeezed, and a leading
/// `/` is preserved. An empty result is reported as `.`.
pub fn normalize_filename(parts: &[&str]) -> String {
    let mut absolute = false;
    let mut comps: Vec<&str> = Vec::new();

    for part in parts {
        if part.starts_with('/') {
            absolute = true;
            comps.clear();
        }
        for comp in part.split('/') {
            match comp {
                "" | "." => {}
                ".." => match comps.last() {
                    Some(&"..") => comps.push(".."),
                    Some(_) => {
                        comps.pop();
                    }
                    // ".." at the root of an absolute path stays at the root
                    None if absolute => {}
                    None => comps.push(".."),
                },
                other => comps.push(other),
            }
        }
    }

    if absolute {
        format!("/{}", comps.join("/"))
    } else if comps.is_empty() {
        ".".to_string()
    } else {
        comps.join("/")
    }
}

/// Split a path into `(directory, stem, extension)`.
///
/// The directory keeps its trailing slash (empty when there is none), the
/// extension starts at the *last* dot of the base name and includes it, and
/// the stem is what remains. A dot in the first position of the base name
/// (a hidden file) does not start an extension.
pub fn split_filename(path: &str) -> (String, String, String) {
    let (dir, base) = match path.rfind('/') {
        Some(idx) => (&path[..=idx], &path[idx + 1..]),
        None => ("", path),
    };
    match base.rfind('.') {
        Some(dot) if dot > 0 => (dir.to_string(), base[..dot].to_string(), base[dot..].to_string()),
        _ => (dir.to_string(), base.to_string(), String::new()),
    }
}

/// Whether an output path should pull in an automatic parent-directory rule.
///
/// Absolute paths and paths escaping upward are left alone; only relative
/// paths that actually live in a subdirectory qualify.
pub fn needs_parent_dir(path: &str) -> bool {
    path.contains('/') && !path.starts_with('/') && !path.starts_with("../")
}

/// The parent directory of a path, without a trailing slash.
pub fn parent_dir(path: &str) -> Option<&str> {
    path.rfind('/').map(|idx| &path[..idx])
}

/// Whether a path escapes its base: absolute, or reaching `..` upward after
/// normalization.
pub fn escapes_base(path: &str) -> bool {
    if path.starts_with('/') {
        return true;
    }
    let normalized = normalize_filename(&[path]);
    normalized == ".." || normalized.starts_with("../")
}
