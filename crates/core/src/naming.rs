//! Shadow storage naming convention.
//!
//! Uploaded names are partitioned into subdirectories keyed by the first two
//! characters of the basename, so no single directory grows unbounded.
//! The layout is load-bearing: existing archives on disk use it verbatim.

/// Number of leading basename characters used as the partition directory.
const PARTITION_PREFIX_CHARS: usize = 2;

/// Map a relative upload name to its partitioned location.
///
/// Convention: `{dir/}{prefix}/{basename}` where `prefix` is the first two
/// characters of `basename` (or the whole basename when shorter).
///
/// # Examples
///
/// ```
/// use signbank_core::naming::shadow_path;
///
/// assert_eq!(shadow_path("glossvideo/HELLO.mp4"), "glossvideo/HE/HELLO.mp4");
/// assert_eq!(shadow_path("HELLO.mp4"), "HE/HELLO.mp4");
/// assert_eq!(shadow_path("glossvideo/a"), "glossvideo/a/a");
/// ```
pub fn shadow_path(relative_name: &str) -> String {
    let (dir, basename) = match relative_name.rfind('/') {
        Some(idx) => (&relative_name[..idx], &relative_name[idx + 1..]),
        None => ("", relative_name),
    };

    let prefix_end = basename
        .char_indices()
        .nth(PARTITION_PREFIX_CHARS)
        .map_or(basename.len(), |(idx, _)| idx);
    let prefix = &basename[..prefix_end];

    let mut name = String::with_capacity(relative_name.len() + prefix.len() + 1);
    if !dir.is_empty() {
        name.push_str(dir);
        name.push('/');
    }
    name.push_str(prefix);
    name.push('/');
    name.push_str(basename);
    name
}

/// Storage name for a freshly uploaded file.
///
/// Any directory components the client sent are dropped; only the basename
/// is placed under `upload_dir` and then partitioned.
pub fn upload_name(upload_dir: &str, original_filename: &str) -> String {
    let basename = original_filename
        .rsplit(&['/', '\\'][..])
        .next()
        .unwrap_or(original_filename);
    let upload_dir = upload_dir.trim_matches('/');

    if upload_dir.is_empty() {
        shadow_path(basename)
    } else {
        shadow_path(&format!("{upload_dir}/{basename}"))
    }
}

/// `name` with `_{n}` inserted before the extension of its basename.
///
/// Used to find a free storage name when an upload collides with a file
/// that belongs to someone else. The partition directory is left alone.
pub fn numbered_name(name: &str, n: u32) -> String {
    let base_start = name.rfind('/').map_or(0, |idx| idx + 1);
    let base = &name[base_start..];
    let leading_dots = base.len() - base.trim_start_matches('.').len();
    let split = base[leading_dots..]
        .rfind('.')
        .map_or(name.len(), |dot| base_start + leading_dots + dot);
    format!("{}_{n}{}", &name[..split], &name[split..])
}
