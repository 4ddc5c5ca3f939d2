//! Inline `style` strings: `key: value;` declarations.

/// Value of `key` in an inline style, trimmed.
pub fn style_value<'a>(style: &'a str, key: &str) -> Option<&'a str> {
    for decl in style.split(';') {
        let d = decl.trim();
        if d.is_empty() {
            continue;
        }
        if let Some((k, v)) = d.split_once(':') {
            if k.trim() == key {
                return Some(v.trim());
            }
        }
    }
    None
}

/// Append `addition` to `existing`, inserting `;` when `existing` lacks a
/// trailing separator.
pub fn splice_style(existing: &str, addition: &str) -> String {
    let head = existing.trim_end();
    let tail = addition.trim();
    if head.is_empty() {
        return tail.to_string();
    }
    if tail.is_empty() {
        return head.to_string();
    }
    if head.ends_with(';') {
        format!("{head} {tail}")
    } else {
        format!("{head}; {tail}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup() {
        let s = "width: 300px; display:none;";
        assert_eq!(style_value(s, "display"), Some("none"));
        assert_eq!(style_value(s, "height"), None);
    }

    #[test]
    fn splice() {
        assert_eq!(splice_style("color: red", "display: none;"), "color: red; display: none;");
        assert_eq!(splice_style("color: red;", "display: none;"), "color: red; display: none;");
        assert_eq!(splice_style("", "display: none;"), "display: none;");
    }
}
