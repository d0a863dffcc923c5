use crate::error::{ParseDslError, ParseErrorKind};
use crate::layout::{
    BuiltinFlag, DimensionDomain, DimensionKind, PermutationDimension, BUILTIN_NAME_PREFIX,
};
use crate::parse::{BlockLine, Span};
use crate::raster::{CullMode, FillMode, FrontFace, RasterState};
use nom::branch::alt;
use nom::bytes::complete::{tag, take_while};
use nom::character::complete::{char, digit1, multispace0, satisfy};
use nom::combinator::{map, map_res, opt, recognize};
use nom::multi::separated_list0;
use nom::sequence::{delimited, pair, preceded, separated_pair};
use nom::IResult;

fn identifier(input: Span) -> IResult<Span, Span> {
    recognize(pair(
        satisfy(|c: char| c.is_ascii_alphabetic() || c == '_'),
        take_while(|c: char| c.is_ascii_alphanumeric() || c == '_'),
    ))(input)
}

fn integer(input: Span) -> IResult<Span, i64> {
    map_res(recognize(pair(opt(char('-')), digit1)), |s: Span| {
        s.fragment().parse::<i64>()
    })(input)
}

/// `NAME : type`, shared by permutation and builtin declarations.
fn decl_header(input: Span) -> IResult<Span, (Span, Span)> {
    separated_pair(
        identifier,
        delimited(multispace0, char(':'), multispace0),
        identifier,
    )(input)
}

fn enum_set(input: Span) -> IResult<Span, Vec<i64>> {
    delimited(
        pair(char('{'), multispace0),
        separated_list0(delimited(multispace0, char(','), multispace0), integer),
        pair(multispace0, char('}')),
    )(input)
}

fn int_range(input: Span) -> IResult<Span, (i64, i64)> {
    delimited(
        pair(char('['), multispace0),
        separated_pair(
            integer,
            delimited(multispace0, tag(".."), multispace0),
            integer,
        ),
        pair(multispace0, char(']')),
    )(input)
}

fn attr_tag(input: Span) -> IResult<Span, Span> {
    delimited(
        pair(char('['), multispace0),
        identifier,
        pair(multispace0, char(']')),
    )(input)
}

enum TailItem<'a> {
    Default(i64),
    Range(i64, i64),
    Attr(Span<'a>),
    Separator,
}

/// One item of the declaration tail: `= default`, `[lo..hi]`, `[attr]`,
/// or a `;`/`,` separator, in any order. Ranges win over attributes by
/// backtracking on the shared `[` opener.
fn tail_item(input: Span) -> IResult<Span, TailItem> {
    preceded(
        multispace0,
        alt((
            map(
                preceded(pair(char('='), multispace0), integer),
                TailItem::Default,
            ),
            map(int_range, |(min, max)| TailItem::Range(min, max)),
            map(attr_tag, TailItem::Attr),
            map(alt((char(';'), char(','))), |_| TailItem::Separator),
        )),
    )(input)
}

/// Parses one `NAME: bool|enum|int ...` permutation declaration and
/// validates its default against the declared domain.
pub(crate) fn permutation_line(line: &BlockLine) -> Result<PermutationDimension, ParseDslError> {
    let span = Span::new(line.text);
    let (rest, (name, keyword)) = decl_header(span).map_err(|err| lex_error(line, err))?;
    let name = name.fragment().to_string();

    let (mut rest, enum_values) = match *keyword.fragment() {
        "enum" => {
            let (rest, values) =
                preceded(multispace0, enum_set)(rest).map_err(|err| lex_error(line, err))?;
            if values.is_empty() {
                return Err(ParseDslError::EmptyEnum(name));
            }
            (rest, Some(values))
        }
        "bool" | "int" => (rest, None),
        _ => {
            return Err(ParseDslError::ParserError {
                row: line.number,
                kind: ParseErrorKind::ValueType,
            })
        }
    };

    let mut default = None;
    let mut range = None;
    let mut domain = DimensionDomain::Multi;
    while !rest.fragment().trim().is_empty() {
        let (next, item) = tail_item(rest).map_err(|err| lex_error(line, err))?;
        rest = next;
        match item {
            TailItem::Default(value) => default = Some(value),
            TailItem::Range(min, max) => range = Some((min, max)),
            TailItem::Attr(attr) => {
                domain = match *attr.fragment() {
                    "multi" => DimensionDomain::Multi,
                    "feature" => DimensionDomain::Feature,
                    _ => {
                        return Err(ParseDslError::ParserError {
                            row: line.number,
                            kind: ParseErrorKind::Attribute,
                        })
                    }
                }
            }
            TailItem::Separator => {}
        }
    }

    let kind = if let Some(values) = enum_values {
        DimensionKind::Enum(values)
    } else if *keyword.fragment() == "int" {
        let (min, max) = range.ok_or_else(|| ParseDslError::MissingRange(name.clone()))?;
        DimensionKind::Int { min, max }
    } else {
        DimensionKind::Bool
    };

    let default_value = match &kind {
        DimensionKind::Bool => default.unwrap_or(0),
        DimensionKind::Enum(values) => default.unwrap_or(values[0]),
        DimensionKind::Int { min, .. } => default.unwrap_or(*min),
    };
    if !kind.contains(default_value) {
        return Err(ParseDslError::DefaultOutOfDomain {
            name,
            value: default_value,
        });
    }

    Ok(PermutationDimension {
        name,
        kind,
        default_value,
        domain,
    })
}

/// Parses one `AE_BUILTIN_*: bool;` declaration.
pub(crate) fn builtin_line(line: &BlockLine) -> Result<BuiltinFlag, ParseDslError> {
    let span = Span::new(line.text);
    let (rest, (name, keyword)) = decl_header(span).map_err(|err| lex_error(line, err))?;
    let name = name.fragment().to_string();
    if !name.starts_with(BUILTIN_NAME_PREFIX) {
        return Err(ParseDslError::BuiltinPrefix(name));
    }
    if *keyword.fragment() != "bool" {
        return Err(ParseDslError::ParserError {
            row: line.number,
            kind: ParseErrorKind::ValueType,
        });
    }
    let trailing = rest.fragment().trim();
    if !trailing.is_empty() && trailing != ";" {
        return Err(ParseDslError::LexerError {
            offset: rest.location_offset(),
            row: line.number,
            col: rest.get_column(),
        });
    }
    Ok(BuiltinFlag {
        name,
        default_value: 0,
    })
}

/// Applies one `key = value` raster line to `state`. Unknown keys append
/// a warning and leave the state untouched.
pub(crate) fn raster_line(
    line: &BlockLine,
    state: &mut RasterState,
    warnings: &mut Vec<String>,
) -> Result<(), ParseDslError> {
    let text = line.text.trim_end_matches(';').trim_end();
    let Some((key, value)) = text.split_once('=') else {
        return Err(ParseDslError::LexerError {
            offset: 0,
            row: line.number,
            col: 1,
        });
    };
    let key = key.trim();
    let value = value.trim();

    match key {
        "fill" | "fill_mode" => {
            state.fill_mode = match value {
                "solid" => FillMode::Solid,
                "wireframe" => FillMode::Wireframe,
                _ => return Err(value_error(line, ParseErrorKind::FillMode)),
            }
        }
        "cull" | "cull_mode" => {
            state.cull_mode = match value {
                "none" => CullMode::None,
                "front" => CullMode::Front,
                "back" => CullMode::Back,
                _ => return Err(value_error(line, ParseErrorKind::CullMode)),
            }
        }
        "front_face" | "frontface" => {
            state.front_face = match value {
                "ccw" => FrontFace::CounterClockwise,
                "cw" => FrontFace::Clockwise,
                _ => return Err(value_error(line, ParseErrorKind::FrontFace)),
            }
        }
        "depth_bias" => {
            state.depth_bias = value
                .parse::<i32>()
                .map_err(|_| value_error(line, ParseErrorKind::Int))?;
        }
        "depth_bias_clamp" => {
            state.depth_bias_clamp = value
                .parse::<f32>()
                .map_err(|_| value_error(line, ParseErrorKind::Float))?;
        }
        "slope_scaled_depth_bias" | "slope_depth_bias" => {
            state.slope_scaled_depth_bias = value
                .parse::<f32>()
                .map_err(|_| value_error(line, ParseErrorKind::Float))?;
        }
        "depth_clip" => {
            state.depth_clip_enable =
                parse_bool(value).ok_or_else(|| value_error(line, ParseErrorKind::Bool))?;
        }
        "conservative" | "conservative_raster" => {
            state.conservative_raster =
                parse_bool(value).ok_or_else(|| value_error(line, ParseErrorKind::Bool))?;
        }
        _ => warnings.push(format!(
            "ignoring unknown raster_state key `{}` on line {}",
            key, line.number
        )),
    }
    Ok(())
}

fn parse_bool(value: &str) -> Option<bool> {
    match value {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => None,
    }
}

fn value_error(line: &BlockLine, kind: ParseErrorKind) -> ParseDslError {
    ParseDslError::ParserError {
        row: line.number,
        kind,
    }
}

fn lex_error(line: &BlockLine, err: nom::Err<nom::error::Error<Span>>) -> ParseDslError {
    match err {
        nom::Err::Error(e) | nom::Err::Failure(e) => ParseDslError::LexerError {
            offset: e.input.location_offset(),
            row: line.number,
            col: e.input.get_column(),
        },
        nom::Err::Incomplete(_) => ParseDslError::LexerError {
            offset: 0,
            row: line.number,
            col: 0,
        },
    }
}
