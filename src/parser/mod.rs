use nom::{
    branch::alt,
    bytes::complete::{tag, tag_no_case, take_while1},
    character::complete::{char, digit0, digit1, one_of},
    combinator::{all_consuming, map, map_res, opt, recognize, value},
    sequence::{pair, preceded, tuple},
    IResult,
};
use serde::{Deserialize, Serialize};

use crate::storage::{Direction, LogEntry, Timestamp};

/// One parsed input line.
///
/// Lines whose first token is not a known command never become a `Command`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Command {
    /// `1 <ts>;<type>;<severity>`
    Add(LogEntry),
    /// `1` with a payload that does not carry three `;`-separated fields.
    /// Nothing is stored, but the line is still answered.
    MalformedAdd(Option<String>),
    /// `2 <type>`
    MeanByType(Option<String>),
    /// `3 BEFORE|AFTER <ts>`
    MeanInRange { direction: Direction, pivot: Timestamp },
    /// `4 BEFORE|AFTER <type> <ts>`
    MeanInRangeByType {
        direction: Direction,
        log_type: Option<String>,
        pivot: Timestamp,
    },
}

/// Strip carriage returns and split on single spaces. Runs of spaces give
/// empty tokens; tabs stay inside their token.
pub fn tokenize(line: &str) -> Vec<String> {
    line.replace('\r', "")
        .split(' ')
        .map(str::to_owned)
        .collect()
}

/// Parse one input line. `None` means the line is not a command and must
/// produce no output.
pub fn parse_command(line: &str) -> Option<Command> {
    let tokens = tokenize(line);
    let arg = |i: usize| tokens.get(i).map(String::as_str);

    match arg(0)? {
        "1" => Some(parse_add(arg(1))),
        "2" => Some(Command::MeanByType(arg(1).map(str::to_owned))),
        "3" => {
            let direction = parse_direction(arg(1)?)?;
            Some(Command::MeanInRange {
                direction,
                pivot: arg(2).map_or(Timestamp::NotANumber, parse_timestamp),
            })
        }
        "4" => {
            let direction = parse_direction(arg(1)?)?;
            Some(Command::MeanInRangeByType {
                direction,
                log_type: arg(2).map(str::to_owned),
                pivot: arg(3).map_or(Timestamp::NotANumber, parse_timestamp),
            })
        }
        _ => None,
    }
}

fn parse_add(payload: Option<&str>) -> Command {
    let Some(payload) = payload else {
        return Command::MalformedAdd(None);
    };

    // Fields past the third are ignored.
    let mut fields = payload.split(';');
    match (fields.next(), fields.next(), fields.next()) {
        (Some(ts), Some(log_type), Some(severity)) => Command::Add(LogEntry {
            timestamp: parse_timestamp(ts),
            log_type: log_type.to_owned(),
            severity: parse_severity(severity),
        }),
        _ => Command::MalformedAdd(Some(payload.to_owned())),
    }
}

fn direction(input: &str) -> IResult<&str, Direction> {
    alt((
        value(Direction::Before, tag("BEFORE")),
        value(Direction::After, tag("AFTER")),
    ))(input)
}

/// `BEFORE` or `AFTER`, case-sensitive, nothing else on the token.
pub fn parse_direction(token: &str) -> Option<Direction> {
    all_consuming(direction)(token).ok().map(|(_, d)| d)
}

fn radix_digits(radix: u32) -> impl Fn(&str) -> IResult<&str, f64> {
    move |input: &str| {
        map(take_while1(|c: char| c.is_digit(radix)), |digits: &str| {
            digits
                .chars()
                .filter_map(|c| c.to_digit(radix))
                .fold(0.0, |acc, d| acc * f64::from(radix) + f64::from(d))
        })(input)
    }
}

/// Unsigned `0x`, `0o` or `0b` literal.
fn radix_literal(input: &str) -> IResult<&str, f64> {
    alt((
        preceded(tag_no_case("0x"), radix_digits(16)),
        preceded(tag_no_case("0o"), radix_digits(8)),
        preceded(tag_no_case("0b"), radix_digits(2)),
    ))(input)
}

fn number(input: &str) -> IResult<&str, f64> {
    alt((
        infinity,
        radix_literal,
        map_res(decimal, |text: &str| text.parse::<f64>()),
    ))(input)
}

/// Parse a timestamp token.
///
/// Surrounding whitespace is ignored and blank text reads as `0`. The rest
/// must be one whole numeric literal: signed decimal with optional fraction
/// and exponent, `Infinity`, or an unsigned `0x`/`0o`/`0b` integer. There is
/// no range limit; anything else is [`Timestamp::NotANumber`].
pub fn parse_timestamp(text: &str) -> Timestamp {
    let text = text.trim();
    if text.is_empty() {
        return Timestamp::At(0.0);
    }
    match all_consuming(number)(text) {
        Ok((_, ts)) => Timestamp::from(ts),
        Err(_) => Timestamp::NotANumber,
    }
}

fn decimal(input: &str) -> IResult<&str, &str> {
    recognize(tuple((
        opt(one_of("+-")),
        alt((
            recognize(pair(digit1, opt(pair(char('.'), digit0)))),
            recognize(pair(char('.'), digit1)),
        )),
        opt(tuple((one_of("eE"), opt(one_of("+-")), digit1))),
    )))(input)
}

fn infinity(input: &str) -> IResult<&str, f64> {
    map(pair(opt(one_of("+-")), tag("Infinity")), |(sign, _)| {
        if sign == Some('-') {
            f64::NEG_INFINITY
        } else {
            f64::INFINITY
        }
    })(input)
}

fn severity(input: &str) -> IResult<&str, f64> {
    alt((infinity, map_res(decimal, |text: &str| text.parse::<f64>())))(input)
}

/// Parse the longest floating-point prefix of a severity token, after
/// leading whitespace. Trailing garbage is ignored; no numeric prefix at all
/// gives NaN.
pub fn parse_severity(text: &str) -> f64 {
    severity(text.trim_start())
        .map(|(_, severity)| severity)
        .unwrap_or(f64::NAN)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_command() {
        let command = parse_command("1 100;error;5.0").unwrap();
        assert_eq!(command, Command::Add(LogEntry::new(100, "error", 5.0)));
    }

    #[test]
    fn test_add_ignores_extra_fields_and_strips_carriage_returns() {
        let command = parse_command("1 -3;warn;2.5;extra\r").unwrap();
        assert_eq!(command, Command::Add(LogEntry::new(-3, "warn", 2.5)));
    }

    #[test]
    fn test_add_with_empty_type() {
        let command = parse_command("1 7;;1").unwrap();
        assert_eq!(command, Command::Add(LogEntry::new(7, "", 1.0)));
    }

    #[test]
    fn test_malformed_add() {
        assert_eq!(parse_command("1"), Some(Command::MalformedAdd(None)));
        assert_eq!(
            parse_command("1 100;error"),
            Some(Command::MalformedAdd(Some("100;error".to_string())))
        );
    }

    #[test]
    fn test_mean_by_type_keeps_tabs() {
        assert_eq!(
            parse_command("2 \terror\t"),
            Some(Command::MeanByType(Some("\terror\t".to_string())))
        );
        assert_eq!(parse_command("2"), Some(Command::MeanByType(None)));
        // Double space leaves an empty type token.
        assert_eq!(
            parse_command("2  error"),
            Some(Command::MeanByType(Some(String::new())))
        );
    }

    #[test]
    fn test_range_commands() {
        assert_eq!(
            parse_command("3 BEFORE 100"),
            Some(Command::MeanInRange {
                direction: Direction::Before,
                pivot: Timestamp::At(100.0),
            })
        );
        assert_eq!(
            parse_command("4 AFTER warn 100"),
            Some(Command::MeanInRangeByType {
                direction: Direction::After,
                log_type: Some("warn".to_string()),
                pivot: Timestamp::At(100.0),
            })
        );
    }

    #[test]
    fn test_missing_pivot_is_nan() {
        match parse_command("3 AFTER") {
            Some(Command::MeanInRange { pivot, .. }) => assert!(pivot.is_nan()),
            other => panic!("unexpected parse: {other:?}"),
        }
    }

    #[test]
    fn test_unrecognized_lines() {
        assert_eq!(parse_command(""), None);
        assert_eq!(parse_command("5 error"), None);
        assert_eq!(parse_command(" 2 error"), None);
        assert_eq!(parse_command("3 before 100"), None);
        assert_eq!(parse_command("3 BEFOREX 100"), None);
        assert_eq!(parse_command("4"), None);
    }

    #[test]
    fn test_parse_timestamp() {
        assert_eq!(parse_timestamp("42"), Timestamp::At(42.0));
        assert_eq!(parse_timestamp("+42"), Timestamp::At(42.0));
        assert_eq!(parse_timestamp("-42"), Timestamp::At(-42.0));
        assert_eq!(parse_timestamp(" 0 "), Timestamp::At(0.0));
        assert_eq!(parse_timestamp(""), Timestamp::At(0.0));
        assert!(parse_timestamp("abc").is_nan());
        assert!(parse_timestamp("12abc").is_nan());
        assert!(parse_timestamp("1e").is_nan());
        assert!(parse_timestamp("-0x10").is_nan());
        assert!(parse_timestamp("0x").is_nan());
    }

    #[test]
    fn test_parse_timestamp_without_range_limit() {
        assert_eq!(
            parse_timestamp("10000000000000000000"),
            Timestamp::At(1e19)
        );
        assert_eq!(parse_timestamp("150.5"), Timestamp::At(150.5));
        assert_eq!(parse_timestamp(".5"), Timestamp::At(0.5));
        assert_eq!(parse_timestamp("7."), Timestamp::At(7.0));
        assert_eq!(parse_timestamp("1e3"), Timestamp::At(1000.0));
        assert_eq!(parse_timestamp("-2.5E-1"), Timestamp::At(-0.25));
        assert_eq!(parse_timestamp("1e400"), Timestamp::At(f64::INFINITY));
        assert_eq!(parse_timestamp("-Infinity"), Timestamp::At(f64::NEG_INFINITY));
        assert_eq!(parse_timestamp("0x1F"), Timestamp::At(31.0));
        assert_eq!(parse_timestamp("0o17"), Timestamp::At(15.0));
        assert_eq!(parse_timestamp("0b101"), Timestamp::At(5.0));
    }

    #[test]
    fn test_parse_severity() {
        assert_eq!(parse_severity("5.0"), 5.0);
        assert_eq!(parse_severity(" -2.5"), -2.5);
        assert_eq!(parse_severity(".5"), 0.5);
        assert_eq!(parse_severity("3."), 3.0);
        assert_eq!(parse_severity("1e3"), 1000.0);
        assert_eq!(parse_severity("5.0abc"), 5.0);
        assert_eq!(parse_severity("2e"), 2.0);
        assert_eq!(parse_severity("-Infinity"), f64::NEG_INFINITY);
        assert!(parse_severity("abc").is_nan());
        assert!(parse_severity("").is_nan());
        assert!(parse_severity("inf").is_nan());
    }
}
