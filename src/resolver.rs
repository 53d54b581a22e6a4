// src/resolver.rs
//
// Route pattern <-> file path mapping.
//
//   "/"                    -> <root>/index.tsx        id "/"
//   "/blog/[slug]"         -> <root>/blog/$slug.tsx   id "/blog/$slug"
//   "/docs/[...rest]"      -> <root>/docs/$.tsx       id "/docs/$"
//
// Nothing in here fails: a malformed segment is kept as a literal.

/// One segment of a bracket-annotated route pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment<'a> {
    Literal(&'a str),
    /// `[name]`
    Dynamic(&'a str),
    /// `[...name]`
    CatchAll(&'a str),
}

impl<'a> Segment<'a> {
    pub fn parse(raw: &'a str) -> Self {
        let Some(inner) = raw.strip_prefix('[').and_then(|s| s.strip_suffix(']')) else {
            return Segment::Literal(raw);
        };
        // only one bracket pair per segment; `[[...x]]` and friends stay literal
        if inner.is_empty() || inner.contains(['[', ']']) {
            return Segment::Literal(raw);
        }
        match inner.strip_prefix("...") {
            Some("") => Segment::Literal(raw),
            Some(name) => Segment::CatchAll(name),
            None => Segment::Dynamic(inner),
        }
    }

    /// Flat, dollar-annotated form of this segment.
    pub fn to_flat(self) -> String {
        match self {
            Segment::Literal(s) => s.to_string(),
            Segment::Dynamic(name) => format!("${name}"),
            Segment::CatchAll(_) => "$".to_string(),
        }
    }

    pub fn param(self) -> Option<&'a str> {
        match self {
            Segment::Dynamic(name) | Segment::CatchAll(name) => Some(name),
            Segment::Literal(_) => None,
        }
    }
}

pub fn segments(pattern: &str) -> impl Iterator<Item = Segment<'_>> {
    pattern.split('/').filter(|s| !s.is_empty()).map(Segment::parse)
}

/// Parameter names (left to right) and whether any segment is a catch-all.
pub fn extract_params(pattern: &str) -> (Vec<String>, bool) {
    let mut params = Vec::new();
    let mut is_catch_all = false;
    for segment in segments(pattern) {
        if let Segment::CatchAll(_) = segment {
            is_catch_all = true;
        }
        if let Some(name) = segment.param() {
            params.push(name.to_string());
        }
    }
    (params, is_catch_all)
}

/// Target file for `pattern` under `route_root` ("src/app", "routes", ...).
pub fn target_file_path(pattern: &str, route_root: &str, extension: &str) -> String {
    let root = normalize_separators(route_root);
    let root = root.trim_end_matches('/');
    let mut mapped: Vec<String> = segments(pattern).map(Segment::to_flat).collect();

    let file_name = match mapped.pop() {
        Some(stem) => format!("{stem}.{extension}"),
        None => format!("index.{extension}"),
    };

    let mut parts: Vec<&str> = Vec::with_capacity(mapped.len() + 2);
    if !root.is_empty() {
        parts.push(root);
    }
    parts.extend(mapped.iter().map(String::as_str));
    parts.push(&file_name);
    parts.join("/")
}

/// Route identifier registered with the router for `pattern`.
pub fn route_id(pattern: &str) -> String {
    let mapped: Vec<String> = segments(pattern).map(Segment::to_flat).collect();
    format!("/{}", mapped.join("/"))
}

/// Route identifier for a file living under a `routes/` directory.
pub fn route_path_from_file(file_path: &str) -> String {
    route_path_from_file_in(file_path, "routes")
}

/// Route identifier for `file_path`, where `route_root` marks the start of the
/// route tree. Without the marker the identifier falls back to "/".
pub fn route_path_from_file_in(file_path: &str, route_root: &str) -> String {
    let path = format!("/{}", normalize_separators(file_path).trim_start_matches('/'));
    let marker = format!(
        "/{}/",
        normalize_separators(route_root).trim_matches('/')
    );

    let Some(start) = path.find(&marker) else {
        return "/".to_string();
    };
    let relative = &path[start + marker.len()..];

    let without_ext = match relative.rsplit_once('/') {
        Some((dir, file)) => format!("{dir}/{}", strip_extension(file)),
        None => strip_extension(relative).to_string(),
    };
    normalize_route_id(&without_ext)
}

/// Idempotent clean-up of a route identifier: leading slash, `/index`
/// collapse, no trailing slash, empty -> "/".
pub fn normalize_route_id(id: &str) -> String {
    let mut id = normalize_separators(id);
    if id == "index" {
        id.clear();
    } else if let Some(stripped) = id.strip_suffix("/index") {
        id = stripped.to_string();
    }
    let trimmed = id.trim_end_matches('/');
    if trimmed.is_empty() {
        return "/".to_string();
    }
    if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    }
}

pub fn normalize_separators(path: &str) -> String {
    path.replace('\\', "/")
}

fn strip_extension(file: &str) -> &str {
    match file.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => file,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn segment_kinds() {
        assert_eq!(Segment::parse("blog"), Segment::Literal("blog"));
        assert_eq!(Segment::parse("[slug]"), Segment::Dynamic("slug"));
        assert_eq!(Segment::parse("[...rest]"), Segment::CatchAll("rest"));
        assert_eq!(Segment::parse("[slug"), Segment::Literal("[slug"));
        assert_eq!(Segment::parse("[]"), Segment::Literal("[]"));
        assert_eq!(Segment::parse("[...]"), Segment::Literal("[...]"));
        assert_eq!(Segment::parse("[[...opt]]"), Segment::Literal("[[...opt]]"));
    }

    #[test]
    fn root_maps_to_index() {
        assert_eq!(target_file_path("/", "src/app", "tsx"), "src/app/index.tsx");
        assert_eq!(target_file_path("", "app", "tsx"), "app/index.tsx");
        assert_eq!(route_id("/"), "/");
    }

    #[test]
    fn dynamic_and_catch_all_segments() {
        assert_eq!(
            target_file_path("/posts/[id]", "src/app", "tsx"),
            "src/app/posts/$id.tsx"
        );
        assert_eq!(
            target_file_path("/docs/[...slug]", "app", "tsx"),
            "app/docs/$.tsx"
        );
        assert_eq!(
            target_file_path("/shop/[category]/[item]", "app", "tsx"),
            "app/shop/$category/$item.tsx"
        );
        assert_eq!(route_id("/shop/[category]/[item]"), "/shop/$category/$item");
        assert_eq!(route_id("/docs/[...slug]"), "/docs/$");
    }

    #[test]
    fn params_follow_segment_order() {
        assert_eq!(
            extract_params("/[org]/repos/[...path]"),
            (vec!["org".to_string(), "path".to_string()], true)
        );
        assert_eq!(extract_params("/about"), (Vec::new(), false));
        assert_eq!(extract_params("/[broken"), (Vec::new(), false));
    }

    #[test]
    fn malformed_segments_pass_through() {
        assert_eq!(target_file_path("/a/[b", "app", "tsx"), "app/a/[b.tsx");
        assert_eq!(route_id("/a/[b"), "/a/[b");
    }

    #[test]
    fn windows_root_is_normalized() {
        assert_eq!(
            target_file_path("/about", "src\\app\\", "tsx"),
            "src/app/about.tsx"
        );
    }

    #[test]
    fn route_path_from_file_examples() {
        assert_eq!(route_path_from_file("src/routes/index.tsx"), "/");
        assert_eq!(route_path_from_file("src/routes/about.tsx"), "/about");
        assert_eq!(route_path_from_file("src/routes/posts/$id.tsx"), "/posts/$id");
        assert_eq!(route_path_from_file("src/routes/blog/posts/index.tsx"), "/blog/posts");
        assert_eq!(route_path_from_file("src\\routes\\about.tsx"), "/about");
        assert_eq!(route_path_from_file("src/components/Button.tsx"), "/");
        assert_eq!(route_path_from_file("src/routes/api/users.ts"), "/api/users");
        assert_eq!(route_path_from_file("src/routes/$.tsx"), "/$");
        assert_eq!(route_path_from_file("routes/about.tsx"), "/about");
    }

    #[test]
    fn marker_must_be_a_whole_component() {
        assert_eq!(route_path_from_file("src/myroutes/about.tsx"), "/");
        assert_eq!(route_path_from_file_in("src/app/blog/$slug.tsx", "src/app"), "/blog/$slug");
    }

    #[test]
    fn forward_then_inverse_round_trips() {
        let target = target_file_path("/blog/posts", "src/routes", "tsx");
        assert_eq!(target, "src/routes/blog/posts.tsx");
        assert_eq!(route_path_from_file(&target), "/blog/posts");

        for pattern in ["/", "/about", "/posts/[id]", "/docs/[...slug]"] {
            let target = target_file_path(pattern, "src/app", "tsx");
            assert_eq!(route_path_from_file_in(&target, "src/app"), route_id(pattern));
        }
    }

    #[test]
    fn normalization_is_idempotent() {
        for raw in ["", "/", "index", "/index", "about", "/blog/index", "/posts/$id/", "/$"] {
            let once = normalize_route_id(raw);
            assert_eq!(normalize_route_id(&once), once, "input {raw:?}");
        }
        assert_eq!(normalize_route_id("/blog/index"), "/blog");
        assert_eq!(normalize_route_id("index"), "/");
    }
}
