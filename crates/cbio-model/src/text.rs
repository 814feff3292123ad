//! `{placeholder}` substitution shared by value templates and manifests.

/// Substitute every `{name}` in `template` with the value returned by `lookup`.
///
/// `{{` and `}}` produce literal braces. Returns the offending placeholder when
/// `lookup` has no value for it or a brace is left unbalanced.
pub fn format_placeholders<F>(template: &str, mut lookup: F) -> Result<String, String>
where
    F: FnMut(&str) -> Option<String>,
{
    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                out.push('{');
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                out.push('}');
            }
            '{' => {
                let mut name = String::new();
                let mut closed = false;
                for inner in chars.by_ref() {
                    if inner == '}' {
                        closed = true;
                        break;
                    }
                    name.push(inner);
                }
                if !closed {
                    return Err(format!("{{{name}"));
                }
                match lookup(name.trim()) {
                    Some(value) => out.push_str(&value),
                    None => return Err(format!("{{{name}}}")),
                }
            }
            '}' => return Err("}".to_string()),
            other => out.push(other),
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substitutes_and_escapes() {
        let out = format_placeholders("{{id}}={value}", |name| {
            (name == "value").then(|| "P1".to_string())
        });
        assert_eq!(out.as_deref(), Ok("{id}=P1"));
    }

    #[test]
    fn reports_unknown_placeholder() {
        let out = format_placeholders("study: {study_id}", |_| None);
        assert_eq!(out, Err("{study_id}".to_string()));
    }

    #[test]
    fn reports_unbalanced_braces() {
        assert!(format_placeholders("open {value", |_| Some(String::new())).is_err());
        assert!(format_placeholders("close }", |_| None).is_err());
    }
}
