//! Part-name arithmetic for relationship targets

/// Directory of a part (`xl/workbook.xml` -> `xl`, `a.xml` -> ``)
pub fn parent_dir(part: &str) -> &str {
    part.rfind('/').map_or("", |i| &part[..i])
}

/// Relationships part belonging to a part (`xl/workbook.xml` -> `xl/_rels/workbook.xml.rels`)
pub fn rels_path_for(part: &str) -> String {
    let dir = parent_dir(part);
    let file = part.rsplit('/').next().unwrap_or(part);
    if dir.is_empty() {
        format!("_rels/{}.rels", file)
    } else {
        format!("{}/_rels/{}.rels", dir, file)
    }
}

/// Resolve a relationship target against the part that owns the relationship
///
/// Absolute targets (`/xl/...`) are taken from the package root; `..` and
/// `.` segments are folded.
pub fn resolve_target(owner_part: &str, target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return normalize(absolute);
    }
    let base = parent_dir(owner_part);
    if base.is_empty() {
        normalize(target)
    } else {
        normalize(&format!("{}/{}", base, target))
    }
}

/// Express `part` as a target relative to the part owning the relationship
pub fn relative_target(owner_part: &str, part: &str) -> String {
    let base = parent_dir(owner_part);
    if base.is_empty() {
        return part.to_string();
    }
    match part.strip_prefix(base).and_then(|rest| rest.strip_prefix('/')) {
        Some(rest) => rest.to_string(),
        None => format!("/{}", part),
    }
}

fn normalize(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split(['/', '\\']) {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }
    segments.join("/")
}
