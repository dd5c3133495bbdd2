/// Template parsing
///
/// Character-level, brace-aware parser that turns template text into
/// segments of literal and parameter parts, plus the inline-parameter
/// sub-parser for `{name:constraint(args)=default?}` spans.
///
/// All functions are **pure**: same input → same output, no side effects.

use std::borrow::Cow;

use super::pattern::{ParameterKind, ParameterPart, PathSegment, RoutePatternPart};
use crate::error::TemplateErrorKind;
use crate::values::eq_ignore_case;

const INVALID_NAME_CHARS: [char; 5] = ['/', '{', '}', '?', '*'];

/// Result of the inline-parameter sub-parser
///
/// Optional-with-default is representable here; assembly rejects it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineParameter {
    pub name: String,
    pub catch_all: bool,
    pub encode_slashes: bool,
    pub optional: bool,
    pub constraints: Vec<String>,
    pub default: Option<String>,
}

impl InlineParameter {
    fn kind(&self) -> ParameterKind {
        match (self.catch_all, self.encode_slashes, self.optional) {
            (true, true, _) => ParameterKind::CatchAll,
            (true, false, _) => ParameterKind::GreedyCatchAll,
            (false, _, true) => ParameterKind::Optional,
            (false, _, false) if self.default.is_some() => ParameterKind::DefaultValued,
            _ => ParameterKind::Standard,
        }
    }
}

/// Collapses doubled delimiters (`::`, `==`, `??`) into one character
///
/// # Examples
///
/// ```
/// use rhtmx_routing::route::parser::collapse_doubled;
///
/// assert_eq!(collapse_doubled("a::b"), "a:b");
/// assert_eq!(collapse_doubled("x==y??"), "x=y?");
/// assert_eq!(collapse_doubled("plain"), "plain");
/// ```
pub fn collapse_doubled(text: &str) -> Cow<'_, str> {
    if !(text.contains("::") || text.contains("==") || text.contains("??")) {
        return Cow::Borrowed(text);
    }

    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if matches!(c, ':' | '=' | '?') && chars.peek() == Some(&c) {
            chars.next();
        }
        out.push(c);
    }
    Cow::Owned(out)
}

/// Collapses doubled delimiters inside the argument list of a clause only
fn collapse_arguments(clause: &str) -> String {
    match clause.find('(') {
        Some(open) => format!("{}{}", &clause[..open], collapse_doubled(&clause[open..])),
        None => clause.to_string(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ClauseState {
    Start,
    ParsingName,
    InsideParenthesis,
    End,
}

/// Parses the text between `{` and `}` (braces already unescaped)
///
/// **Pure function**: text → `InlineParameter`
///
/// # Grammar
///
/// - `*` or `**` prefix: single or greedy catch-all
/// - name runs to the first `:` or `=`
/// - `:` starts a constraint clause; parentheses protect `:`, `=` and `)`
///   while a closing `)` is still ahead
/// - `=` starts the default, which runs to the end
/// - an odd run of trailing `?` marks the parameter optional; inside
///   parentheses and defaults `::`, `==` and `??` stand for one character
///
/// # Examples
///
/// ```
/// use rhtmx_routing::route::parser::parse_inline_parameter;
///
/// let p = parse_inline_parameter("id:int:range(1,10)=5");
/// assert_eq!(p.name, "id");
/// assert_eq!(p.constraints, vec!["int", "range(1,10)"]);
/// assert_eq!(p.default.as_deref(), Some("5"));
///
/// let p = parse_inline_parameter("**path");
/// assert!(p.catch_all && !p.encode_slashes);
///
/// let p = parse_inline_parameter("name?");
/// assert!(p.optional);
/// ```
pub fn parse_inline_parameter(text: &str) -> InlineParameter {
    let (catch_all, encode_slashes, rest) = if let Some(rest) = text.strip_prefix("**") {
        (true, false, rest)
    } else if let Some(rest) = text.strip_prefix('*') {
        (true, true, rest)
    } else {
        (false, true, text)
    };

    let trailing_marks = rest.chars().rev().take_while(|c| *c == '?').count();
    let optional = trailing_marks % 2 == 1;
    let rest = if optional { &rest[..rest.len() - 1] } else { rest };

    let chars: Vec<char> = rest.chars().collect();
    let name_end = chars
        .iter()
        .position(|c| *c == ':' || *c == '=')
        .unwrap_or(chars.len());
    let name: String = chars[..name_end].iter().collect();

    let (constraints, default_start) = parse_constraints(&chars, name_end);
    let default = default_start.map(|start| {
        let raw: String = chars[start..].iter().collect();
        collapse_doubled(&raw).into_owned()
    });

    InlineParameter {
        name,
        catch_all,
        encode_slashes,
        optional,
        constraints,
        default,
    }
}

/// Runs the constraint state machine from `start`
///
/// Returns the clauses and the index where the default value begins, if
/// an `=` terminated the clauses.
fn parse_constraints(chars: &[char], start: usize) -> (Vec<String>, Option<usize>) {
    let text = |from: usize, to: usize| chars[from..to].iter().collect::<String>();
    let at = |i: usize| chars.get(i).copied();

    let mut clauses = Vec::new();
    let mut state = ClauseState::Start;
    let mut clause_start = start;
    let mut index = start;
    let mut default_start = None;

    while state != ClauseState::End {
        let current = at(index);
        match state {
            ClauseState::Start => match current {
                None => state = ClauseState::End,
                Some(':') => {
                    state = ClauseState::ParsingName;
                    clause_start = index + 1;
                }
                Some('(') => state = ClauseState::InsideParenthesis,
                Some('=') => {
                    state = ClauseState::End;
                    default_start = Some(index + 1);
                }
                Some(_) => {}
            },
            ClauseState::ParsingName => match current {
                None => {
                    state = ClauseState::End;
                    push_clause(&mut clauses, text(clause_start, index));
                }
                Some(':') => {
                    push_clause(&mut clauses, text(clause_start, index));
                    clause_start = index + 1;
                }
                Some('(') => state = ClauseState::InsideParenthesis,
                Some('=') => {
                    state = ClauseState::End;
                    push_clause(&mut clauses, text(clause_start, index));
                    default_start = Some(index + 1);
                }
                Some(_) => {}
            },
            ClauseState::InsideParenthesis => match current {
                None => {
                    state = ClauseState::End;
                    clauses.push(collapse_arguments(&text(clause_start, index)));
                }
                Some(c @ (':' | '=' | '?')) if at(index + 1) == Some(c) => {
                    index += 1;
                }
                Some(')') => match at(index + 1) {
                    None => {
                        state = ClauseState::End;
                        clauses.push(collapse_arguments(&text(clause_start, index + 1)));
                    }
                    Some(':') => {
                        state = ClauseState::Start;
                        clauses.push(collapse_arguments(&text(clause_start, index + 1)));
                        clause_start = index + 1;
                    }
                    Some('=') => {
                        state = ClauseState::End;
                        clauses.push(collapse_arguments(&text(clause_start, index + 1)));
                        default_start = Some(index + 2);
                    }
                    Some(_) => {}
                },
                Some(c @ (':' | '=')) => {
                    match chars[index + 1..].iter().position(|x| *x == ')') {
                        Some(offset) => {
                            // Skip ahead so the `)` is examined next.
                            index += offset;
                        }
                        None => {
                            clauses.push(collapse_arguments(&text(clause_start, index)));
                            if c == ':' {
                                state = ClauseState::ParsingName;
                                clause_start = index + 1;
                            } else {
                                state = ClauseState::End;
                                default_start = Some(index + 1);
                            }
                        }
                    }
                }
                Some(_) => {}
            },
            ClauseState::End => {}
        }
        index += 1;
    }

    (clauses, default_start)
}

fn push_clause(clauses: &mut Vec<String>, clause: String) {
    if !clause.is_empty() {
        clauses.push(clause);
    }
}

/// Cursor over template characters
struct Scanner {
    chars: Vec<char>,
    index: usize,
}

impl Scanner {
    fn new(text: &str) -> Self {
        Self {
            chars: text.chars().collect(),
            index: 0,
        }
    }

    fn current(&self) -> Option<char> {
        self.chars.get(self.index).copied()
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.index + 1).copied()
    }

    fn advance(&mut self) {
        self.index += 1;
    }
}

/// Strips the optional `~/` or `/` prefix
fn strip_template_prefix(template: &str) -> Result<&str, TemplateErrorKind> {
    if let Some(rest) = template.strip_prefix("~/") {
        Ok(rest)
    } else if template.starts_with('~') {
        Err(TemplateErrorKind::InvalidTilde)
    } else {
        Ok(template.strip_prefix('/').unwrap_or(template))
    }
}

/// Parses template text into segments
///
/// Syntax and structural rules are enforced here; defaults, explicit
/// policies and required values are merged by the pattern builder.
///
/// # Examples
///
/// ```
/// use rhtmx_routing::route::parser::parse_segments;
///
/// assert!(parse_segments("").unwrap().is_empty());
/// assert_eq!(parse_segments("~/a/{b}/").unwrap().len(), 2);
/// assert!(parse_segments("a//b").is_err());
/// ```
pub fn parse_segments(template: &str) -> Result<Vec<PathSegment>, TemplateErrorKind> {
    let text = strip_template_prefix(template)?;
    let mut scanner = Scanner::new(text);
    let mut segments = Vec::new();
    let mut names: Vec<String> = Vec::new();

    while scanner.current().is_some() {
        if scanner.current() == Some('/') {
            return Err(TemplateErrorKind::ConsecutiveSeparators);
        }

        let segment = parse_segment(&mut scanner, &mut names)?;
        segments.push(validate_segment(segment)?);

        // Skip the separator; a trailing `/` ends the loop.
        scanner.advance();
    }

    validate_catch_all_position(&segments)?;
    Ok(segments)
}

fn parse_segment(
    scanner: &mut Scanner,
    names: &mut Vec<String>,
) -> Result<PathSegment, TemplateErrorKind> {
    let mut parts = Vec::new();

    loop {
        match scanner.current() {
            None | Some('/') => break,
            Some('{') if scanner.peek() != Some('{') => {
                let parameter = parse_parameter(scanner)?;
                if names.iter().any(|n| eq_ignore_case(n, &parameter.name)) {
                    return Err(TemplateErrorKind::RepeatedParameter(parameter.name));
                }
                names.push(parameter.name.clone());
                parts.push(RoutePatternPart::Parameter(parameter));
            }
            Some(_) => parts.push(RoutePatternPart::Literal(parse_literal(scanner)?)),
        }
    }

    Ok(PathSegment { parts })
}

/// Reads literal text up to the next `/`, end, or unescaped `{`
fn parse_literal(scanner: &mut Scanner) -> Result<String, TemplateErrorKind> {
    let mut literal = String::new();

    loop {
        match scanner.current() {
            None | Some('/') => break,
            Some('{') if scanner.peek() == Some('{') => {
                literal.push('{');
                scanner.advance();
                scanner.advance();
            }
            Some('{') => break,
            Some('}') if scanner.peek() == Some('}') => {
                literal.push('}');
                scanner.advance();
                scanner.advance();
            }
            Some('}') => return Err(TemplateErrorKind::MismatchedParameter),
            Some(c) => {
                literal.push(c);
                scanner.advance();
            }
        }
    }

    if literal.contains('?') {
        return Err(TemplateErrorKind::InvalidLiteral(literal));
    }
    Ok(literal)
}

/// Reads a `{...}` span starting at its opening brace
fn parse_parameter(scanner: &mut Scanner) -> Result<ParameterPart, TemplateErrorKind> {
    scanner.advance();
    let mut inside = String::new();

    loop {
        match scanner.current() {
            None => return Err(TemplateErrorKind::MismatchedParameter),
            Some('{') => match scanner.peek() {
                Some('{') => {
                    inside.push('{');
                    scanner.advance();
                    scanner.advance();
                }
                Some(_) => return Err(TemplateErrorKind::UnescapedBrace),
                None => return Err(TemplateErrorKind::MismatchedParameter),
            },
            Some('}') if scanner.peek() == Some('}') => {
                inside.push('}');
                scanner.advance();
                scanner.advance();
            }
            Some('}') => {
                scanner.advance();
                break;
            }
            Some(c) => {
                inside.push(c);
                scanner.advance();
            }
        }
    }

    let inline = parse_inline_parameter(&inside);
    if inline.name.is_empty() || inline.name.contains(&INVALID_NAME_CHARS[..]) {
        return Err(TemplateErrorKind::InvalidParameterName(inline.name));
    }
    if inline.catch_all && inline.optional {
        return Err(TemplateErrorKind::CatchAllCannotBeOptional(inline.name));
    }

    Ok(ParameterPart {
        kind: inline.kind(),
        name: inline.name,
        default: inline.default,
        inline_policies: inline.constraints,
    })
}

/// Per-segment rules; turns the `.` before a trailing optional into a separator
fn validate_segment(mut segment: PathSegment) -> Result<PathSegment, TemplateErrorKind> {
    let count = segment.parts.len();

    if count > 1 {
        if let Some(catch_all) = segment
            .parts
            .iter()
            .filter_map(RoutePatternPart::as_parameter)
            .find(|p| p.is_catch_all())
        {
            return Err(TemplateErrorKind::CatchAllInMultiPartSegment(
                catch_all.name.clone(),
            ));
        }

        let optional_at = segment
            .parts
            .iter()
            .position(|part| part.as_parameter().is_some_and(ParameterPart::is_optional));

        if let Some(i) = optional_at {
            let name = segment.parts[i]
                .as_parameter()
                .map(|p| p.name.clone())
                .unwrap_or_default();

            if i != count - 1 {
                return Err(TemplateErrorKind::OptionalMustBeLast(name));
            }

            match segment.parts[i - 1].clone() {
                RoutePatternPart::Literal(text) if text == "." => {
                    segment.parts[i - 1] = RoutePatternPart::Separator(text);
                }
                RoutePatternPart::Literal(text) => {
                    return Err(TemplateErrorKind::OptionalMustFollowPeriod {
                        parameter: name,
                        preceding: text,
                    });
                }
                RoutePatternPart::Separator(_) => {}
                RoutePatternPart::Parameter(previous) => {
                    return Err(TemplateErrorKind::OptionalMustFollowPeriod {
                        parameter: name,
                        preceding: format!("{{{}}}", previous.name),
                    });
                }
            }
        }
    }

    let consecutive = segment
        .parts
        .windows(2)
        .any(|pair| pair[0].is_parameter() && pair[1].is_parameter());
    if consecutive {
        return Err(TemplateErrorKind::ConsecutiveParameters);
    }

    Ok(segment)
}

fn validate_catch_all_position(segments: &[PathSegment]) -> Result<(), TemplateErrorKind> {
    let last = segments.len().saturating_sub(1);
    segments
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != last)
        .flat_map(|(_, segment)| segment.parts.iter())
        .filter_map(RoutePatternPart::as_parameter)
        .find(|p| p.is_catch_all())
        .map_or(Ok(()), |p| {
            Err(TemplateErrorKind::CatchAllMustBeLast(p.name.clone()))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_inline_name_only() {
        let p = parse_inline_parameter("controller");
        assert_eq!(p.name, "controller");
        assert!(p.constraints.is_empty());
        assert_eq!(p.default, None);
        assert!(!p.optional);
    }

    #[test]
    fn test_inline_regex_with_delimiters_inside_parentheses() {
        let p = parse_inline_parameter(r"p1:regex(^\d{3}-\d{3}:\d{4}$)");
        assert_eq!(p.constraints, vec![r"regex(^\d{3}-\d{3}:\d{4}$)"]);
    }

    #[test]
    fn test_inline_unclosed_parenthesis_runs_to_terminator() {
        let p = parse_inline_parameter("p1:regex(abc:int");
        assert_eq!(p.constraints, vec!["regex(abc", "int"]);

        let p = parse_inline_parameter("p1:regex(abc=def");
        assert_eq!(p.constraints, vec!["regex(abc"]);
        assert_eq!(p.default.as_deref(), Some("def"));
    }

    #[test]
    fn test_inline_closing_parenthesis_followed_by_default() {
        let p = parse_inline_parameter("p1:range(1,5)=3");
        assert_eq!(p.constraints, vec!["range(1,5)"]);
        assert_eq!(p.default.as_deref(), Some("3"));
    }

    #[test]
    fn test_inline_parenthesis_not_followed_by_terminator_is_kept() {
        let p = parse_inline_parameter("p1:regex(a)b)");
        assert_eq!(p.constraints, vec!["regex(a)b)"]);
    }

    #[test]
    fn test_inline_default_may_contain_colon() {
        let p = parse_inline_parameter("p1=a:b");
        assert!(p.constraints.is_empty());
        assert_eq!(p.default.as_deref(), Some("a:b"));
    }

    #[test]
    fn test_inline_doubled_delimiters_are_literal() {
        let p = parse_inline_parameter("p1:regex(a::b==c)");
        assert_eq!(p.constraints, vec!["regex(a:b=c)"]);

        let p = parse_inline_parameter("p1=what??");
        assert!(!p.optional);
        assert_eq!(p.default.as_deref(), Some("what?"));

        let p = parse_inline_parameter("p1:regex(x::y");
        assert_eq!(p.constraints, vec!["regex(x:y"]);
    }

    #[test]
    fn test_inline_optional_with_constraint() {
        let p = parse_inline_parameter("id:int?");
        assert!(p.optional);
        assert_eq!(p.constraints, vec!["int"]);
    }

    #[test]
    fn test_inline_empty_clauses_are_dropped() {
        let p = parse_inline_parameter("id::int:");
        assert_eq!(p.constraints, vec!["int"]);
    }

    #[test]
    fn test_segments_escaped_braces() {
        let segments = parse_segments("{{p}}/x").unwrap();
        assert_eq!(
            segments[0].parts,
            vec![RoutePatternPart::Literal("{p}".to_string())]
        );
    }

    #[test]
    fn test_segments_mismatched_braces() {
        assert_eq!(
            parse_segments("{p").unwrap_err(),
            TemplateErrorKind::MismatchedParameter
        );
        assert_eq!(
            parse_segments("p}").unwrap_err(),
            TemplateErrorKind::MismatchedParameter
        );
        assert_eq!(
            parse_segments("{p{q}").unwrap_err(),
            TemplateErrorKind::UnescapedBrace
        );
    }

    #[test]
    fn test_segments_tilde() {
        assert!(parse_segments("~/a").is_ok());
        assert_eq!(parse_segments("~a").unwrap_err(), TemplateErrorKind::InvalidTilde);
    }

    #[test]
    fn test_segments_separator_for_trailing_optional() {
        let segments = parse_segments("{name}.{ext?}").unwrap();
        assert!(matches!(segments[0].parts[1], RoutePatternPart::Separator(_)));

        assert!(matches!(
            parse_segments("{name}-{ext?}").unwrap_err(),
            TemplateErrorKind::OptionalMustFollowPeriod { .. }
        ));
        assert!(matches!(
            parse_segments("{ext?}.x").unwrap_err(),
            TemplateErrorKind::OptionalMustBeLast(_)
        ));
    }
}
