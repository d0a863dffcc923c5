use crate::error::ParseDslError;
use crate::layout::{BuiltinLayout, PermutationLayout};
use crate::raster::RasterState;
use crate::rules::RuleSet;
use nom_locate::LocatedSpan;

mod line;
mod rules;

pub(crate) type Span<'a> = LocatedSpan<&'a str>;

const BLOCK_MARKER: &str = "@altina";

/// One normalized declaration line with its 1-based source line number.
#[derive(Debug, Clone, Copy)]
pub(crate) struct BlockLine<'a> {
    pub number: u32,
    pub text: &'a str,
}

/// Everything the annotation blocks of one shader source declare.
#[derive(Debug, Clone, Default)]
pub struct ShaderDsl {
    pub permutations: PermutationLayout,
    pub builtins: BuiltinLayout,
    pub rules: RuleSet,
    pub raster_state: Option<RasterState>,
    /// Non-fatal notes, currently only ignored `raster_state` keys.
    pub warnings: Vec<String>,
}

struct Block<'a> {
    text: &'a str,
    first_line: u32,
}

/// Scans a whole shader source for `@altina` annotation blocks and parses
/// every present block. Blocks may appear in any order and are all
/// optional; a source without any parses to an empty [`ShaderDsl`].
///
/// The scan is textual, so blocks work equally inside `//` line comments
/// and `/* */` comment spans with `*` line prefixes.
pub fn parse_shader_dsl(source: &str) -> Result<ShaderDsl, ParseDslError> {
    let mut out = ShaderDsl::default();

    let perm = extract_block(source, "perm")?;
    let builtin = extract_block(source, "builtins")?;
    let raster = extract_block(source, "raster_state")?;
    let rule = extract_block(source, "rules")?;

    if let Some(block) = perm {
        for decl in normalize_block(&block) {
            let dim = line::permutation_line(&decl)?;
            if out.permutations.index_of(&dim.name).is_some() {
                return Err(ParseDslError::DuplicateName(dim.name));
            }
            out.permutations.dimensions.push(dim);
        }
    }

    if let Some(block) = builtin {
        for decl in normalize_block(&block) {
            let flag = line::builtin_line(&decl)?;
            if out.builtins.index_of(&flag.name).is_some() {
                return Err(ParseDslError::DuplicateName(flag.name));
            }
            out.builtins.builtins.push(flag);
        }
    }

    if let Some(block) = raster {
        let mut state = RasterState::default();
        for decl in normalize_block(&block) {
            line::raster_line(&decl, &mut state, &mut out.warnings)?;
        }
        out.raster_state = Some(state);
    }

    if let Some(block) = rule {
        let lines = normalize_block(&block);
        let text = lines
            .iter()
            .map(|decl| decl.text)
            .collect::<Vec<_>>()
            .join("\n");
        out.rules = rules::parse_rules(&text, &out.permutations, &out.builtins)?;
    }

    Ok(out)
}

/// Finds the first `@altina <name> { ... }` block and returns its brace
/// contents. The name scan restarts after every marker, so unrelated
/// `@altina` tags never shadow the wanted block.
fn extract_block<'a>(
    source: &'a str,
    name: &'static str,
) -> Result<Option<Block<'a>>, ParseDslError> {
    let bytes = source.as_bytes();
    let mut pos = 0;
    while let Some(found) = source[pos..].find(BLOCK_MARKER) {
        let marker_end = pos + found + BLOCK_MARKER.len();
        let mut scan = marker_end;
        while scan < bytes.len() && bytes[scan].is_ascii_whitespace() {
            scan += 1;
        }
        let ident_start = scan;
        while scan < bytes.len() && (bytes[scan].is_ascii_alphanumeric() || bytes[scan] == b'_') {
            scan += 1;
        }
        if ident_start == scan || &source[ident_start..scan] != name {
            pos = marker_end;
            continue;
        }
        while scan < bytes.len() && bytes[scan] != b'{' {
            scan += 1;
        }
        if scan == bytes.len() {
            return Err(ParseDslError::UnterminatedBlock(name));
        }
        let content_start = scan + 1;
        let mut depth = 1usize;
        scan += 1;
        while scan < bytes.len() && depth > 0 {
            match bytes[scan] {
                b'{' => depth += 1,
                b'}' => depth -= 1,
                _ => {}
            }
            scan += 1;
        }
        if depth != 0 {
            return Err(ParseDslError::UnterminatedBlock(name));
        }
        let content_end = scan - 1;
        let first_line =
            source[..content_start].bytes().filter(|&b| b == b'\n').count() as u32 + 1;
        return Ok(Some(Block {
            text: &source[content_start..content_end],
            first_line,
        }));
    }
    Ok(None)
}

/// Strips comment framing from each block line: leading `//` or `*`, any
/// inline `//` or `/*` trailer, and surrounding whitespace. Empty lines
/// drop out entirely.
fn normalize_block<'a>(block: &Block<'a>) -> Vec<BlockLine<'a>> {
    let mut lines = Vec::new();
    for (index, raw) in block.text.split('\n').enumerate() {
        let mut text = raw.trim();
        if let Some(rest) = text.strip_prefix("//") {
            text = rest.trim_start();
        } else if let Some(rest) = text.strip_prefix('*') {
            text = rest.trim_start();
        }
        let cut = match (text.find("//"), text.find("/*")) {
            (Some(line_at), Some(span_at)) => Some(line_at.min(span_at)),
            (line_at, span_at) => line_at.or(span_at),
        };
        if let Some(at) = cut {
            text = text[..at].trim_end();
        }
        if text.is_empty() {
            continue;
        }
        lines.push(BlockLine {
            number: block.first_line + index as u32,
            text,
        });
    }
    lines
}
