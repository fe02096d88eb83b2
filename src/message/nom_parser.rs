//! Nom-based IRC line parser.
//!
//! Splits one line into borrowed components; [`super::Message`] owns the
//! result.

use nom::{
    bytes::complete::{take_till, take_while1},
    character::complete::{char, space0},
    combinator::opt,
    error::{context, VerboseError, VerboseErrorKind},
    sequence::preceded,
    IResult,
};

use crate::error::MessageParseError;

type ParseResult<I, O> = IResult<I, O, VerboseError<I>>;

/// IRCv3 message tags (the part after `@`). Kept only to be skipped.
fn parse_tags(input: &str) -> ParseResult<&str, &str> {
    context(
        "parsing IRCv3 message tags",
        preceded(char('@'), take_till(|c: char| c == ' ')),
    )(input)
}

/// Message prefix (the part after `:` and before the first space).
fn parse_prefix(input: &str) -> ParseResult<&str, &str> {
    context(
        "parsing message prefix",
        preceded(char(':'), take_while1(|c: char| c != ' ')),
    )(input)
}

/// Command name: a word or a three-digit numeric.
fn parse_command(input: &str) -> ParseResult<&str, &str> {
    context(
        "parsing IRC command",
        take_while1(|c: char| c.is_ascii_alphanumeric()),
    )(input)
}

/// Parameters, the last of which may be a `:`-prefixed trailing argument.
fn parse_params(mut rest: &str) -> Vec<&str> {
    let mut params = Vec::new();

    loop {
        let trimmed = rest.trim_start_matches(' ');
        if trimmed.len() == rest.len() && !params.is_empty() {
            // No separator after the previous parameter.
            break;
        }
        rest = trimmed;

        if rest.is_empty() {
            break;
        }
        if let Some(trailing) = rest.strip_prefix(':') {
            params.push(trailing);
            break;
        }

        let end = rest.find(' ').unwrap_or(rest.len());
        params.push(&rest[..end]);
        rest = &rest[end..];
    }

    params
}

/// A parsed IRC line with borrowed string slices.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedMessage<'a> {
    /// Prefix without the leading `:`, if present.
    pub prefix: Option<&'a str>,
    /// The command name or numeric.
    pub command: &'a str,
    /// Command parameters, including trailing.
    pub params: Vec<&'a str>,
}

impl<'a> ParsedMessage<'a> {
    /// Parse one line (without its line ending).
    ///
    /// IRC message format:
    /// ```text
    /// [@tags] [:prefix] <command> [params...] [:trailing]
    /// ```
    pub fn parse(input: &'a str) -> Result<Self, MessageParseError> {
        let line = input.trim_end_matches(['\r', '\n']);
        if line.trim().is_empty() {
            return Err(MessageParseError::EmptyMessage);
        }

        let header = |i: &'a str| -> ParseResult<&'a str, (Option<&'a str>, &'a str)> {
            let (i, _) = opt(parse_tags)(i)?;
            let (i, _) = space0::<_, VerboseError<&str>>(i)?;
            let (i, prefix) = opt(parse_prefix)(i)?;
            let (i, _) = space0::<_, VerboseError<&str>>(i)?;
            let (i, command) = parse_command(i)?;
            Ok((i, (prefix, command)))
        };

        match header(line) {
            Ok((rest, (prefix, command))) => Ok(ParsedMessage {
                prefix,
                command,
                params: parse_params(rest),
            }),
            Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => {
                let mut position = line.len();
                let mut ctx = "parsing IRC line";
                for (error_input, kind) in &e.errors {
                    position = line.len() - error_input.len();
                    if let VerboseErrorKind::Context(c) = kind {
                        ctx = *c;
                        break;
                    }
                }
                Err(MessageParseError::ParseContext {
                    position,
                    context: ctx,
                })
            }
            Err(nom::Err::Incomplete(_)) => Err(MessageParseError::ParseContext {
                position: line.len(),
                context: "incomplete input",
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_command() {
        let msg = ParsedMessage::parse("PING").unwrap();
        assert_eq!(msg.command, "PING");
        assert!(msg.prefix.is_none());
        assert!(msg.params.is_empty());
    }

    #[test]
    fn test_parse_with_prefix() {
        let msg = ParsedMessage::parse(":nick!user@host PRIVMSG #channel :Hello, world!").unwrap();
        assert_eq!(msg.prefix, Some("nick!user@host"));
        assert_eq!(msg.command, "PRIVMSG");
        assert_eq!(msg.params, vec!["#channel", "Hello, world!"]);
    }

    #[test]
    fn test_parse_with_tags() {
        let msg = ParsedMessage::parse("@time=2023-01-01T00:00:00Z :nick PRIVMSG #ch :Hi").unwrap();
        assert_eq!(msg.prefix, Some("nick"));
        assert_eq!(msg.params, vec!["#ch", "Hi"]);
    }

    #[test]
    fn test_parse_with_crlf() {
        let msg = ParsedMessage::parse("PING :server\r\n").unwrap();
        assert_eq!(msg.params, vec!["server"]);
    }

    #[test]
    fn test_parse_numeric_with_middle_params() {
        let msg = ParsedMessage::parse(":irc.example 322 me #rust 42 :Rust talk").unwrap();
        assert_eq!(msg.command, "322");
        assert_eq!(msg.params, vec!["me", "#rust", "42", "Rust talk"]);
    }

    #[test]
    fn test_parse_collapses_repeated_spaces() {
        let msg = ParsedMessage::parse(":srv  NOTICE   *  :hi there").unwrap();
        assert_eq!(msg.command, "NOTICE");
        assert_eq!(msg.params, vec!["*", "hi there"]);
    }

    #[test]
    fn test_parse_empty_trailing() {
        let msg = ParsedMessage::parse("PRIVMSG #channel :").unwrap();
        assert_eq!(msg.params, vec!["#channel", ""]);
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(
            ParsedMessage::parse("   "),
            Err(MessageParseError::EmptyMessage)
        );
        assert!(matches!(
            ParsedMessage::parse(":prefix-only"),
            Err(MessageParseError::ParseContext { .. })
        ));
        assert!(ParsedMessage::parse("!!! garbage").is_err());
    }
}
