//! Message templates with named `{Placeholder}` holes

use crate::error::FormatError;
use crate::state::StructuredState;

/// Render `template`, replacing each `{Name}` with the display text of the
/// state entry called `Name`.
///
/// `{{` and `}}` produce literal braces. Anything after `:` or `,` inside a
/// hole is a format hint and is ignored. Unknown names and unbalanced braces
/// are formatting errors.
pub fn render(template: &str, state: &StructuredState) -> Result<String, FormatError> {
    let mut output = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                output.push('{');
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                output.push('}');
            }
            '{' => {
                let mut hole = String::new();
                loop {
                    match chars.next() {
                        Some('}') => break,
                        Some(ch) => hole.push(ch),
                        None => {
                            return Err(FormatError::new(format!(
                                "unterminated placeholder '{{{}'",
                                hole
                            )))
                        }
                    }
                }
                let name = hole
                    .split([':', ','])
                    .next()
                    .unwrap_or_default()
                    .trim();
                let value = state.get(name).ok_or_else(|| {
                    FormatError::new(format!("no value supplied for placeholder '{}'", name))
                })?;
                output.push_str(&value.display_text());
            }
            '}' => return Err(FormatError::new("unmatched '}' in template")),
            other => output.push(other),
        }
    }

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::StateValue;

    fn state() -> StructuredState {
        StructuredState::new()
            .with("OrderId", StateValue::opaque(42))
            .with("User", StateValue::opaque("abc123"))
    }

    #[test]
    fn test_render_placeholders() {
        let rendered = render("Order {OrderId} placed by {User}", &state()).unwrap();
        assert_eq!(rendered, "Order 42 placed by abc123");
    }

    #[test]
    fn test_format_hints_are_ignored() {
        let rendered = render("Order {OrderId:D8}", &state()).unwrap();
        assert_eq!(rendered, "Order 42");
    }

    #[test]
    fn test_escaped_braces() {
        let rendered = render("{{literal}} {User}", &state()).unwrap();
        assert_eq!(rendered, "{literal} abc123");
    }

    #[test]
    fn test_missing_placeholder_fails() {
        let err = render("Hello {Nobody}", &state()).unwrap_err();
        assert!(err.message.contains("Nobody"));
    }

    #[test]
    fn test_unbalanced_braces_fail() {
        assert!(render("Hello {User", &state()).is_err());
        assert!(render("Hello }", &state()).is_err());
    }
}
