//! Parsing of selection expressions into toggle and set events.
//!
//! An expression is a comma-separated list of selectors over global line
//! indices, as printed by `partial-stage show`.
//!
//! # Selector syntax
//!
//! - `N` - toggle line N
//! - `N..M` - toggle lines N through M (inclusive) to one value
//! - `N:on`, `N..M:on` - include
//! - `N:off`, `N..M:off` - exclude
//!
//! # Examples
//!
//! ```
//! use partial_stage::parse::{parse_selectors, Action, Selector};
//!
//! let selectors = parse_selectors("2,5..7:on").unwrap();
//! assert_eq!(selectors, vec![
//!     Selector { start: 2, end: 2, action: Action::Toggle },
//!     Selector { start: 5, end: 7, action: Action::Include },
//! ]);
//! ```

use error_set::error_set;
use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::tag,
    character::complete::digit1,
    combinator::{all_consuming, map_res, opt, value},
    sequence::preceded,
};

error_set! {
    /// Errors from parsing selection expressions
    ParseError := {
        /// Selector is not `N`, `N..M`, optionally followed by `:on`/`:off`
        #[display("Invalid selector '{value}': expected N, N..M, N:on or N..M:off")]
        InvalidSelector { value: String },
        /// Range has start greater than end
        #[display("Invalid range {start}..{end}: start must be <= end")]
        InvalidRange { start: usize, end: usize },
        /// Nothing to select
        #[display("No selectors provided")]
        EmptySelection,
    }
}

/// What a selector does to the lines it covers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Invert (one target value for a whole range)
    Toggle,
    Include,
    Exclude,
}

/// A range of global indices and what to do with it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selector {
    pub start: usize,
    /// Inclusive; equal to `start` for a single line
    pub end: usize,
    pub action: Action,
}

/// Parse a comma-separated selection expression.
///
/// # Errors
///
/// Returns [`ParseError`] if:
/// - A selector is malformed or a number does not fit
/// - A range is inverted
/// - The expression contains no selectors
pub fn parse_selectors(input: &str) -> Result<Vec<Selector>, ParseError> {
    let selectors = input
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(parse_selector)
        .collect::<Result<Vec<_>, _>>()?;

    if selectors.is_empty() {
        return Err(ParseError::EmptySelection);
    }

    Ok(selectors)
}

fn parse_selector(input: &str) -> Result<Selector, ParseError> {
    let (_, selector) = all_consuming(selector)
        .parse(input)
        .map_err(|_| ParseError::InvalidSelector {
            value: input.to_string(),
        })?;

    if selector.start > selector.end {
        return Err(ParseError::InvalidRange {
            start: selector.start,
            end: selector.end,
        });
    }

    Ok(selector)
}

fn index(input: &str) -> IResult<&str, usize> {
    map_res(digit1, str::parse::<usize>).parse(input)
}

fn action(input: &str) -> IResult<&str, Action> {
    opt(alt((
        value(Action::Include, tag(":on")),
        value(Action::Exclude, tag(":off")),
    )))
    .map(|action| action.unwrap_or(Action::Toggle))
    .parse(input)
}

fn selector(input: &str) -> IResult<&str, Selector> {
    (index, opt(preceded(tag(".."), index)), action)
        .map(|(start, end, action)| Selector {
            start,
            end: end.unwrap_or(start),
            action,
        })
        .parse(input)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use similar_asserts::assert_eq;

    fn sel(start: usize, end: usize, action: Action) -> Selector {
        Selector { start, end, action }
    }

    #[test]
    fn parse_single_toggle() {
        assert_eq!(parse_selectors("3").unwrap(), vec![sel(3, 3, Action::Toggle)]);
    }

    #[test]
    fn parse_range_toggle() {
        assert_eq!(
            parse_selectors("2..6").unwrap(),
            vec![sel(2, 6, Action::Toggle)]
        );
    }

    #[test]
    fn parse_explicit_actions() {
        assert_eq!(
            parse_selectors("0:on, 4..9:off ,12").unwrap(),
            vec![
                sel(0, 0, Action::Include),
                sel(4, 9, Action::Exclude),
                sel(12, 12, Action::Toggle),
            ]
        );
    }

    #[test]
    fn parse_equal_range() {
        assert_eq!(
            parse_selectors("10..10").unwrap(),
            vec![sel(10, 10, Action::Toggle)]
        );
    }

    #[test]
    fn parse_inverted_range() {
        assert!(matches!(
            parse_selectors("15..10"),
            Err(ParseError::InvalidRange { start: 15, end: 10 })
        ));
    }

    #[test]
    fn parse_rejects_negative_and_garbage() {
        for input in ["-3", "a", "3..", "..3", "3:maybe", "3 4", "1..2..3"] {
            assert!(
                matches!(
                    parse_selectors(input),
                    Err(ParseError::InvalidSelector { .. })
                ),
                "{}",
                input
            );
        }
    }

    #[test]
    fn parse_rejects_overflow() {
        assert!(matches!(
            parse_selectors("99999999999999999999999999"),
            Err(ParseError::InvalidSelector { .. })
        ));
    }

    #[test]
    fn parse_empty() {
        assert!(matches!(parse_selectors(""), Err(ParseError::EmptySelection)));
        assert!(matches!(parse_selectors(" , "), Err(ParseError::EmptySelection)));
    }
}
