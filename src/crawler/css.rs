//! Stylesheet flattening and CSS link extraction
//!
//! A stylesheet is walked depth-first (stylesheet, then `@media` blocks, then
//! style rules, then declarations) while the current media query and selector
//! are carried down. The result is a flat list of [`Declaration`]s which
//! [`CssExtractor`]s inspect for references.

use cssparser::{ParseError, Parser, ParserInput, SourcePosition, Token};
use std::collections::HashSet;
use thiserror::Error;

/// Media query text used outside of any `@media` block
pub const DEFAULT_MEDIA: &str = "all";

/// One property declaration with the context it appeared in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    pub media: String,
    pub selector: String,
    /// Property name, lowercased
    pub property: String,
    pub value: String,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CssError {
    #[error("Malformed stylesheet at line {line}, column {column}")]
    Malformed { line: u32, column: u32 },
}

/// Produces candidate references from flattened declarations
pub trait CssExtractor: Send + Sync {
    fn extract(&self, declarations: &[Declaration]) -> Vec<String>;
}

/// Extracts `url(...)` references from `background-image` declarations
///
/// ```
/// use roundabout::crawler::{flatten_stylesheet, BackgroundImageExtractor, CssExtractor};
///
/// let declarations = flatten_stylesheet("body { background-image: url(/img/bg.png) }").unwrap();
/// assert_eq!(
///     BackgroundImageExtractor.extract(&declarations),
///     vec!["/img/bg.png".to_string()]
/// );
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct BackgroundImageExtractor;

impl CssExtractor for BackgroundImageExtractor {
    fn extract(&self, declarations: &[Declaration]) -> Vec<String> {
        let mut seen = HashSet::new();
        declarations
            .iter()
            .filter(|d| d.property == "background-image")
            .flat_map(|d| url_arguments(&d.value))
            .filter(|url| seen.insert(url.clone()))
            .collect()
    }
}

/// Text between the parentheses of every `url(...)` in `value`, unquoted
pub fn url_arguments(value: &str) -> Vec<String> {
    let lower = value.to_ascii_lowercase();
    let mut urls = Vec::new();
    let mut offset = 0;

    while let Some(found) = lower[offset..].find("url(") {
        let open = offset + found + "url(".len();
        let Some(len) = value[open..].find(')') else {
            break;
        };

        let inner = value[open..open + len]
            .trim()
            .trim_matches(|c| c == '"' || c == '\'')
            .trim();
        if !inner.is_empty() {
            urls.push(inner.to_string());
        }
        offset = open + len + 1;
    }

    urls
}

/// Flattens a stylesheet into its declarations
///
/// Unknown at-rules are skipped. Grouping rules other than `@media`
/// (`@supports`, `@layer`, `@document`) are descended into without changing
/// the media context. A stray `}` or an unterminated string or URL makes the
/// whole stylesheet malformed.
pub fn flatten_stylesheet(css: &str) -> Result<Vec<Declaration>, CssError> {
    let mut input = ParserInput::new(css);
    let mut parser = Parser::new(&mut input);
    let mut declarations = Vec::new();

    visit_rules(&mut parser, DEFAULT_MEDIA, &mut declarations)?;

    Ok(declarations)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Terminator {
    Block,
    Semicolon,
    Eof,
}

fn visit_rules<'i>(
    parser: &mut Parser<'i, '_>,
    media: &str,
    out: &mut Vec<Declaration>,
) -> Result<(), CssError> {
    loop {
        let start = parser.position();
        let token = match parser.next() {
            Ok(token) => token.clone(),
            Err(_) => return Ok(()),
        };

        match token {
            Token::AtKeyword(name) => {
                let after_name = parser.position();
                let (prelude, terminator) = read_until_terminator(parser, after_name)?;
                if terminator != Terminator::Block {
                    continue;
                }

                let name = name.to_ascii_lowercase();
                match name.as_str() {
                    "media" => {
                        let media = if prelude.is_empty() { DEFAULT_MEDIA } else { prelude };
                        nested(parser, |p| visit_rules(p, media, out))?;
                    }
                    "supports" | "layer" | "document" | "-moz-document" => {
                        nested(parser, |p| visit_rules(p, media, out))?;
                    }
                    _ => {
                        tracing::trace!("Skipping @{} block", name);
                        skip_block(parser)?;
                    }
                }
            }
            Token::CurlyBracketBlock => {
                nested(parser, |p| visit_declarations(p, media, "", out))?;
            }
            Token::CloseCurlyBracket | Token::BadUrl(_) | Token::BadString(_) => {
                return Err(malformed(parser));
            }
            Token::CDO | Token::CDC | Token::Semicolon => {}
            _ => {
                let (selector, terminator) = read_until_terminator(parser, start)?;
                if terminator == Terminator::Block {
                    nested(parser, |p| visit_declarations(p, media, selector, out))?;
                }
            }
        }
    }
}

fn visit_declarations<'i>(
    parser: &mut Parser<'i, '_>,
    media: &str,
    selector: &str,
    out: &mut Vec<Declaration>,
) -> Result<(), CssError> {
    loop {
        let start = parser.position();
        let token = match parser.next() {
            Ok(token) => token.clone(),
            Err(_) => return Ok(()),
        };

        match token {
            Token::Semicolon => {}
            Token::CurlyBracketBlock => skip_block(parser)?,
            Token::CloseCurlyBracket | Token::BadUrl(_) | Token::BadString(_) => {
                return Err(malformed(parser));
            }
            Token::AtKeyword(_) => {
                let after_name = parser.position();
                let (_, terminator) = read_until_terminator(parser, after_name)?;
                if terminator == Terminator::Block {
                    skip_block(parser)?;
                }
            }
            _ => {
                let (text, terminator) = read_until_terminator(parser, start)?;
                if terminator == Terminator::Block {
                    // nested style rule
                    nested(parser, |p| visit_declarations(p, media, text, out))?;
                    continue;
                }

                if let Some((property, value)) = text.split_once(':') {
                    let property = property.trim();
                    if !property.is_empty() {
                        out.push(Declaration {
                            media: media.to_string(),
                            selector: selector.to_string(),
                            property: property.to_ascii_lowercase(),
                            value: value.trim().to_string(),
                        });
                    }
                }
            }
        }
    }
}

/// Consumes tokens up to `{`, `;` or the end of input
///
/// Returns the trimmed source text from `start` up to the terminator. When
/// the terminator is a block the parser is left at its start, and the caller
/// must either enter it or call [`skip_block`].
fn read_until_terminator<'i>(
    parser: &mut Parser<'i, '_>,
    start: SourcePosition,
) -> Result<(&'i str, Terminator), CssError> {
    loop {
        let token = match parser.next() {
            Ok(token) => token.clone(),
            Err(_) => return Ok((parser.slice_from(start).trim(), Terminator::Eof)),
        };

        let (terminator, symbol) = match token {
            Token::CurlyBracketBlock => (Terminator::Block, '{'),
            Token::Semicolon => (Terminator::Semicolon, ';'),
            Token::CloseCurlyBracket | Token::BadUrl(_) | Token::BadString(_) => {
                return Err(malformed(parser));
            }
            _ => continue,
        };

        // the slice ends just past the terminator
        let text = parser.slice_from(start);
        let text = text.strip_suffix(symbol).unwrap_or(text);
        return Ok((text.trim(), terminator));
    }
}

/// Consumes a block without looking at its contents
fn skip_block(parser: &mut Parser<'_, '_>) -> Result<(), CssError> {
    nested(parser, |block| {
        while block.next().is_ok() {}
        Ok(())
    })
}

fn nested<'i, F>(parser: &mut Parser<'i, '_>, visit: F) -> Result<(), CssError>
where
    F: for<'tt> FnOnce(&mut Parser<'i, 'tt>) -> Result<(), CssError>,
{
    let location = parser.current_source_location();
    parser
        .parse_nested_block(|block| Ok::<_, ParseError<'i, ()>>(visit(block)))
        .unwrap_or(Err(CssError::Malformed {
            line: location.line,
            column: location.column,
        }))
}

fn malformed(parser: &Parser<'_, '_>) -> CssError {
    let location = parser.current_source_location();
    CssError::Malformed {
        line: location.line,
        column: location.column,
    }
}
