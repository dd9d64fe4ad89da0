//! PostgreSQL array literal parsing
//!
//! The extraction queries aggregate child collections with `array_agg` and
//! ship each array as its textual literal form (`{a,"b,c",NULL}`). This
//! module decodes that encoding: comma-delimited elements inside braces,
//! double-quote quoting with backslash escapes, and a bare `NULL` sentinel
//! for null elements.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ArrayLiteralError {
    #[error("array literal must be enclosed in braces: {0:?}")]
    MissingBraces(String),

    #[error("unterminated quoted element in array literal")]
    UnterminatedQuote,

    #[error("unexpected quote inside array element")]
    UnexpectedQuote,

    #[error("unexpected character {0:?} after quoted element")]
    TrailingCharacter(char),

    #[error("empty unquoted element in array literal")]
    EmptyElement,
}

/// Parse an array literal into its elements; `None` marks a null element.
pub fn parse_array_literal(text: &str) -> Result<Vec<Option<String>>, ArrayLiteralError> {
    let inner = text
        .strip_prefix('{')
        .and_then(|rest| rest.strip_suffix('}'))
        .ok_or_else(|| ArrayLiteralError::MissingBraces(text.to_string()))?;

    if inner.is_empty() {
        return Ok(Vec::new());
    }

    let mut elements = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    let mut chars = inner.chars();

    while let Some(c) = chars.next() {
        match c {
            '"' => {
                if quoted || !current.is_empty() {
                    return Err(ArrayLiteralError::UnexpectedQuote);
                }
                quoted = true;
                loop {
                    match chars.next() {
                        Some('\\') => current
                            .push(chars.next().ok_or(ArrayLiteralError::UnterminatedQuote)?),
                        Some('"') => break,
                        Some(inner_char) => current.push(inner_char),
                        None => return Err(ArrayLiteralError::UnterminatedQuote),
                    }
                }
            }
            ',' => elements.push(finish_element(&mut current, &mut quoted)?),
            '\\' => {
                if quoted {
                    return Err(ArrayLiteralError::TrailingCharacter(c));
                }
                current.push(chars.next().ok_or(ArrayLiteralError::UnterminatedQuote)?);
            }
            other => {
                if quoted {
                    return Err(ArrayLiteralError::TrailingCharacter(other));
                }
                current.push(other);
            }
        }
    }
    elements.push(finish_element(&mut current, &mut quoted)?);

    Ok(elements)
}

fn finish_element(
    current: &mut String,
    quoted: &mut bool,
) -> Result<Option<String>, ArrayLiteralError> {
    let text = std::mem::take(current);
    let was_quoted = std::mem::take(quoted);

    if was_quoted {
        return Ok(Some(text));
    }
    if text.eq_ignore_ascii_case("NULL") {
        return Ok(None);
    }
    if text.is_empty() {
        return Err(ArrayLiteralError::EmptyElement);
    }
    Ok(Some(text))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn some(values: &[&str]) -> Vec<Option<String>> {
        values.iter().map(|v| Some(v.to_string())).collect()
    }

    #[test]
    fn test_empty_array() {
        assert_eq!(parse_array_literal("{}").unwrap(), Vec::new());
    }

    #[test]
    fn test_plain_elements() {
        assert_eq!(
            parse_array_literal("{highway,residential}").unwrap(),
            some(&["highway", "residential"])
        );
    }

    #[test]
    fn test_single_element() {
        assert_eq!(parse_array_literal("{42}").unwrap(), some(&["42"]));
    }

    #[test]
    fn test_quoted_element_with_comma_and_brace() {
        assert_eq!(
            parse_array_literal(r#"{"a,b","c}d"}"#).unwrap(),
            some(&["a,b", "c}d"])
        );
    }

    #[test]
    fn test_quoted_element_with_escapes() {
        assert_eq!(
            parse_array_literal(r#"{"say \"hi\"","back\\slash"}"#).unwrap(),
            some(&[r#"say "hi""#, r"back\slash"])
        );
    }

    #[test]
    fn test_quoted_empty_string() {
        assert_eq!(parse_array_literal(r#"{""}"#).unwrap(), some(&[""]));
    }

    #[test]
    fn test_null_sentinel() {
        assert_eq!(
            parse_array_literal("{a,NULL,b}").unwrap(),
            vec![Some("a".to_string()), None, Some("b".to_string())]
        );
    }

    #[test]
    fn test_quoted_null_is_a_string() {
        assert_eq!(parse_array_literal(r#"{"NULL"}"#).unwrap(), some(&["NULL"]));
    }

    #[test]
    fn test_missing_braces() {
        assert!(matches!(
            parse_array_literal("a,b"),
            Err(ArrayLiteralError::MissingBraces(_))
        ));
        assert!(matches!(
            parse_array_literal("{a,b"),
            Err(ArrayLiteralError::MissingBraces(_))
        ));
    }

    #[test]
    fn test_unterminated_quote() {
        assert_eq!(
            parse_array_literal(r#"{"abc}"#),
            Err(ArrayLiteralError::UnterminatedQuote)
        );
    }

    #[test]
    fn test_quote_in_the_middle_of_an_element() {
        assert_eq!(
            parse_array_literal(r#"{ab"c"}"#),
            Err(ArrayLiteralError::UnexpectedQuote)
        );
    }

    #[test]
    fn test_garbage_after_quoted_element() {
        assert_eq!(
            parse_array_literal(r#"{"a"b}"#),
            Err(ArrayLiteralError::TrailingCharacter('b'))
        );
    }

    #[test]
    fn test_empty_unquoted_element() {
        assert_eq!(
            parse_array_literal("{a,,b}"),
            Err(ArrayLiteralError::EmptyElement)
        );
    }
}
