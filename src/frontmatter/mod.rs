use std::collections::HashMap;

/// Leading metadata of a page. Values keep their YAML shape
/// (string, number, bool, sequence, mapping).
pub type Frontmatter = HashMap<String, serde_yaml::Value>;

const DELIMITER: &str = "---";

/// Locate a leading `---` block and return `(raw_yaml, body)`.
/// The body starts on the line after the closing delimiter.
pub fn split_frontmatter_body(content: &str) -> Option<(&str, &str)> {
    let first_end = content.find('\n')?;
    if content[..first_end].trim_end() != DELIMITER {
        return None;
    }

    let yaml_start = first_end + 1;
    let mut pos = yaml_start;
    loop {
        let line_end = content[pos..].find('\n').map(|i| pos + i);
        let line = &content[pos..line_end.unwrap_or(content.len())];
        if line.trim_end() == DELIMITER {
            let raw = &content[yaml_start..pos];
            let body = match line_end {
                Some(end) => &content[end + 1..],
                None => "",
            };
            return Some((raw, body));
        }
        match line_end {
            Some(end) => pos = end + 1,
            None => return None,
        }
    }
}

/// Parse YAML frontmatter into a key/value map.
/// Anything that is not a mapping yields an empty map.
pub fn parse_frontmatter(raw: &str) -> Frontmatter {
    if raw.trim().is_empty() {
        return Frontmatter::new();
    }

    let value: serde_yaml::Value = match serde_yaml::from_str(raw) {
        Ok(v) => v,
        Err(e) => {
            log::warn!("[frontmatter] Ignoring unparsable frontmatter: {}", e);
            return Frontmatter::new();
        }
    };

    let mapping = match value {
        serde_yaml::Value::Mapping(m) => m,
        _ => return Frontmatter::new(),
    };

    mapping
        .into_iter()
        .filter_map(|(key, value)| yaml_key_to_string(&key).map(|k| (k, value)))
        .collect()
}

fn yaml_key_to_string(key: &serde_yaml::Value) -> Option<String> {
    match key {
        serde_yaml::Value::String(s) => Some(s.clone()),
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        serde_yaml::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Separate frontmatter from the document body.
/// Without a well-formed header the text comes back unchanged with an empty map.
pub fn split_frontmatter(content: &str) -> (Frontmatter, &str) {
    match split_frontmatter_body(content) {
        Some((raw, body)) => (parse_frontmatter(raw), body),
        None => (Frontmatter::new(), content),
    }
}
