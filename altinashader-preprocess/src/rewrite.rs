use crate::PreprocessError;
use altinashader_common::{temp, TargetBackend};
use std::fs;
use std::path::{Path, PathBuf};

const MARKER_PREFIX: &str = "AE_PER_";

const GROUP_COUNT: usize = 3;
const KIND_COUNT: usize = 4;

/// Dx11 register bases per group, so PerFrame, PerDraw, and PerMaterial
/// resources occupy disjoint flat ranges without explicit spaces.
const DX11_CBUFFER_BASE: [u32; GROUP_COUNT] = [0, 4, 8];
const DX11_SRV_BASE: [u32; GROUP_COUNT] = [0, 16, 32];
const DX11_UAV_BASE: [u32; GROUP_COUNT] = [0, 4, 8];
const DX11_SAMPLER_BASE: [u32; GROUP_COUNT] = [0, 4, 8];

/// Logical update-frequency group a marker binds its resource into. The
/// discriminant doubles as the register space on space-qualified backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingGroup {
    PerFrame = 0,
    PerDraw,
    PerMaterial,
}

impl BindingGroup {
    pub const ALL: [BindingGroup; GROUP_COUNT] = [
        BindingGroup::PerFrame,
        BindingGroup::PerDraw,
        BindingGroup::PerMaterial,
    ];

    pub fn index(self) -> usize {
        self as usize
    }
}

/// Resource kind a marker declares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingKind {
    CBuffer = 0,
    Srv,
    Uav,
    Sampler,
}

impl BindingKind {
    pub fn index(self) -> usize {
        self as usize
    }

    fn register_letter(self) -> char {
        match self {
            BindingKind::CBuffer => 'b',
            BindingKind::Srv => 't',
            BindingKind::Uav => 'u',
            BindingKind::Sampler => 's',
        }
    }

    fn dx11_base(self, group: BindingGroup) -> u32 {
        match self {
            BindingKind::CBuffer => DX11_CBUFFER_BASE[group.index()],
            BindingKind::Srv => DX11_SRV_BASE[group.index()],
            BindingKind::Uav => DX11_UAV_BASE[group.index()],
            BindingKind::Sampler => DX11_SAMPLER_BASE[group.index()],
        }
    }
}

/// Slot counters per (group, kind) pair plus which groups were touched.
/// Fresh per rewrite pass; mutated only in left-to-right marker order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AutoBindingLayout {
    group_used: [bool; GROUP_COUNT],
    counts: [[u32; KIND_COUNT]; GROUP_COUNT],
}

impl AutoBindingLayout {
    pub fn group_used(&self, group: BindingGroup) -> bool {
        self.group_used[group.index()]
    }

    pub fn count(&self, group: BindingGroup, kind: BindingKind) -> u32 {
        self.counts[group.index()][kind.index()]
    }

    fn allocate(&mut self, group: BindingGroup, kind: BindingKind) -> u32 {
        let slot = &mut self.counts[group.index()][kind.index()];
        let index = *slot;
        *slot += 1;
        self.group_used[group.index()] = true;
        index
    }
}

/// Result of rewriting one source text in memory.
#[derive(Debug, Clone)]
pub struct RewrittenSource {
    pub text: String,
    /// True when at least one marker was replaced.
    pub applied: bool,
    pub layout: AutoBindingLayout,
    /// Markers that were recognized but kept as written.
    pub warnings: Vec<String>,
}

/// Result of [`apply_auto_bindings`] over a source file.
#[derive(Debug, Clone)]
pub struct RewriteOutput {
    pub applied: bool,
    /// Path compilation should consume: a temp copy when applied, the
    /// original file otherwise.
    pub source_path: PathBuf,
    pub layout: AutoBindingLayout,
    pub warnings: Vec<String>,
}

struct Marker<'a> {
    /// Byte offset one past the closing parenthesis.
    end: usize,
    group: BindingGroup,
    kind: BindingKind,
    args: &'a str,
}

/// Replaces every `AE_PER_<GROUP>_<KIND>(args)` marker in `source` with a
/// backend-appropriate register declaration. Slot indices start at zero
/// and increase independently per (group, kind) pair in scan order.
///
/// Text that merely resembles a marker is copied through unchanged. A
/// recognized marker with unusable arguments is also kept as written, but
/// records a warning and still consumes its slot index.
pub fn rewrite_source(source: &str, backend: TargetBackend) -> RewrittenSource {
    let mut text = String::with_capacity(source.len() + 256);
    let mut layout = AutoBindingLayout::default();
    let mut warnings = Vec::new();
    let mut applied = false;

    let mut cursor = 0;
    while cursor < source.len() {
        let Some(found) = source[cursor..].find(MARKER_PREFIX) else {
            text.push_str(&source[cursor..]);
            break;
        };
        let found = cursor + found;
        text.push_str(&source[cursor..found]);

        let Some(marker) = parse_marker(source, found) else {
            // Lookalike without marker shape. Copy one byte and rescan.
            text.push_str(&source[found..found + 1]);
            cursor = found + 1;
            continue;
        };

        match build_replacement(&marker, backend, &mut layout, &mut warnings) {
            Some(replacement) => {
                text.push_str(&replacement);
                applied = true;
            }
            None => text.push_str(&source[found..marker.end]),
        }
        cursor = marker.end;
    }

    RewrittenSource {
        text,
        applied,
        layout,
        warnings,
    }
}

/// Runs [`rewrite_source`] over the file at `source_path`. When a marker
/// was applied, the rewritten text lands in a fresh temp file opened with
/// a `#line 1` directive so compiler diagnostics still name the original
/// file, and that temp path is returned for compilation.
pub fn apply_auto_bindings(
    source_path: &Path,
    backend: TargetBackend,
) -> Result<RewriteOutput, PreprocessError> {
    let source = fs::read_to_string(source_path)
        .map_err(|e| PreprocessError::IOError(source_path.to_path_buf(), e))?;

    let rewritten = rewrite_source(&source, backend);
    if !rewritten.applied {
        return Ok(RewriteOutput {
            applied: false,
            source_path: source_path.to_path_buf(),
            layout: rewritten.layout,
            warnings: rewritten.warnings,
        });
    }

    let extension = source_path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("hlsl");
    let temp_path = temp::alloc_artifact_path(source_path, "autobind", extension);

    let mut contents = String::with_capacity(rewritten.text.len() + 128);
    #[cfg(feature = "line_directives")]
    contents.mark_line(1, &source_path.to_string_lossy().replace('\\', "/"));
    contents.push_str(&rewritten.text);

    fs::write(&temp_path, contents)
        .map_err(|e| PreprocessError::IOError(temp_path.clone(), e))?;

    Ok(RewriteOutput {
        applied: true,
        source_path: temp_path,
        layout: rewritten.layout,
        warnings: rewritten.warnings,
    })
}

#[cfg(feature = "line_directives")]
trait SourceOutput {
    fn push_line(&mut self, str: &str);
    fn mark_line(&mut self, line_no: usize, comment: &str) {
        self.push_line(&format!("#line {} \"{}\"", line_no, comment))
    }
}

#[cfg(feature = "line_directives")]
impl SourceOutput for String {
    fn push_line(&mut self, str: &str) {
        self.push_str(str);
        self.push('\n');
    }
}

fn parse_marker(text: &str, start: usize) -> Option<Marker<'_>> {
    let mut cursor = start + MARKER_PREFIX.len();

    let group_len = text[cursor..].find('_')?;
    let group = match &text[cursor..cursor + group_len] {
        "FRAME" => BindingGroup::PerFrame,
        "DRAW" => BindingGroup::PerDraw,
        "MATERIAL" => BindingGroup::PerMaterial,
        _ => return None,
    };
    cursor += group_len + 1;

    let kind_len = text[cursor..].find(|c: char| c == '(' || c.is_ascii_whitespace())?;
    let kind = match &text[cursor..cursor + kind_len] {
        "CBUFFER" => BindingKind::CBuffer,
        "SRV" => BindingKind::Srv,
        "UAV" => BindingKind::Uav,
        "SAMPLER" => BindingKind::Sampler,
        _ => return None,
    };
    cursor += kind_len;

    let bytes = text.as_bytes();
    while cursor < bytes.len() && bytes[cursor].is_ascii_whitespace() {
        cursor += 1;
    }
    if cursor >= bytes.len() || bytes[cursor] != b'(' {
        return None;
    }

    let open = cursor;
    let mut depth = 0usize;
    let mut close = None;
    for (at, &byte) in bytes.iter().enumerate().skip(open + 1) {
        match byte {
            b'(' => depth += 1,
            b')' => {
                if depth == 0 {
                    close = Some(at);
                    break;
                }
                depth -= 1;
            }
            _ => {}
        }
    }
    let close = close?;

    Some(Marker {
        end: close + 1,
        group,
        kind,
        args: &text[open + 1..close],
    })
}

fn build_replacement(
    marker: &Marker,
    backend: TargetBackend,
    layout: &mut AutoBindingLayout,
    warnings: &mut Vec<String>,
) -> Option<String> {
    let index = layout.allocate(marker.group, marker.kind);
    let register = register_suffix(backend, marker.kind, index, marker.group);
    let args = marker.args.trim();

    match marker.kind {
        BindingKind::CBuffer => {
            if args.is_empty() {
                warnings.push(String::from("auto-binding CBUFFER marker is missing its name"));
                return None;
            }
            Some(format!("cbuffer {args} : {register}"))
        }
        BindingKind::Sampler => {
            if let Some((type_name, name)) = split_args(args) {
                return Some(format!("{type_name} {name} : {register}"));
            }
            if args.is_empty() {
                warnings.push(String::from("auto-binding SAMPLER marker is missing its name"));
                return None;
            }
            Some(format!("SamplerState {args} : {register}"))
        }
        BindingKind::Srv | BindingKind::Uav => {
            let Some((type_name, name)) = split_args(args) else {
                warnings.push(String::from(
                    "auto-binding SRV and UAV markers take a (Type, Name) pair",
                ));
                return None;
            };
            Some(format!("{type_name} {name} : {register}"))
        }
    }
}

fn register_suffix(
    backend: TargetBackend,
    kind: BindingKind,
    index: u32,
    group: BindingGroup,
) -> String {
    let letter = kind.register_letter();
    if backend.uses_register_spaces() {
        format!("register({letter}{index}, space{})", group.index())
    } else {
        format!("register({letter}{})", kind.dx11_base(group) + index)
    }
}

/// Splits `Type, Name` at the first comma outside `<>`, `()`, and `[]`
/// nesting, so template arguments never break the pair apart.
fn split_args(args: &str) -> Option<(&str, &str)> {
    let mut angle = 0u32;
    let mut paren = 0u32;
    let mut bracket = 0u32;
    for (at, byte) in args.bytes().enumerate() {
        match byte {
            b'<' => angle += 1,
            b'>' => angle = angle.saturating_sub(1),
            b'(' => paren += 1,
            b')' => paren = paren.saturating_sub(1),
            b'[' => bracket += 1,
            b']' => bracket = bracket.saturating_sub(1),
            b',' if angle == 0 && paren == 0 && bracket == 0 => {
                let type_name = args[..at].trim();
                let name = args[at + 1..].trim();
                if type_name.is_empty() || name.is_empty() {
                    return None;
                }
                return Some((type_name, name));
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn srv_marker_rewrites_to_a_spaced_register() {
        let out = rewrite_source("AE_PER_DRAW_SRV(Texture2D, AlbedoMap)", TargetBackend::Dx12);
        assert_eq!(out.text, "Texture2D AlbedoMap : register(t0, space1)");
        assert!(out.applied);
        assert!(out.warnings.is_empty());
        assert_eq!(out.layout.count(BindingGroup::PerDraw, BindingKind::Srv), 1);
        assert!(out.layout.group_used(BindingGroup::PerDraw));
        assert!(!out.layout.group_used(BindingGroup::PerFrame));
    }

    #[test]
    fn dx11_registers_add_per_group_bases() {
        let source = "\
AE_PER_FRAME_CBUFFER(SceneConstants)
AE_PER_DRAW_CBUFFER(ObjectConstants)
AE_PER_MATERIAL_SRV(Texture2D, Albedo)
AE_PER_DRAW_SAMPLER(LinearClamp)
";
        let out = rewrite_source(source, TargetBackend::Dx11);
        assert_eq!(
            out.text,
            "\
cbuffer SceneConstants : register(b0)
cbuffer ObjectConstants : register(b4)
Texture2D Albedo : register(t32)
SamplerState LinearClamp : register(s4)
"
        );
    }

    #[test]
    fn indices_increase_per_group_and_kind() {
        let source = "\
AE_PER_DRAW_SRV(Texture2D, First)
AE_PER_DRAW_SRV(Texture2D, Second)
AE_PER_DRAW_UAV(RWTexture2D<float4>, Output)
AE_PER_FRAME_SRV(Texture2D, Shadow)
";
        let out = rewrite_source(source, TargetBackend::Vulkan);
        assert_eq!(
            out.text,
            "\
Texture2D First : register(t0, space1)
Texture2D Second : register(t1, space1)
RWTexture2D<float4> Output : register(u0, space1)
Texture2D Shadow : register(t0, space0)
"
        );
        assert_eq!(out.layout.count(BindingGroup::PerDraw, BindingKind::Srv), 2);
        assert_eq!(out.layout.count(BindingGroup::PerDraw, BindingKind::Uav), 1);
        assert_eq!(out.layout.count(BindingGroup::PerFrame, BindingKind::Srv), 1);
    }

    #[test]
    fn sampler_accepts_an_explicit_type() {
        let out = rewrite_source(
            "AE_PER_FRAME_SAMPLER(SamplerComparisonState, ShadowSampler)",
            TargetBackend::Dx11,
        );
        assert_eq!(
            out.text,
            "SamplerComparisonState ShadowSampler : register(s0)"
        );
    }

    #[test]
    fn template_arguments_never_split_the_pair() {
        let out = rewrite_source(
            "AE_PER_DRAW_UAV(RWStructuredBuffer<TVertex<float, 3> >, Vertices)",
            TargetBackend::Dx12,
        );
        assert_eq!(
            out.text,
            "RWStructuredBuffer<TVertex<float, 3> > Vertices : register(u0, space1)"
        );
    }

    #[test]
    fn cbuffer_body_after_the_marker_survives() {
        let source = "AE_PER_FRAME_CBUFFER(SceneConstants)\n{\n    float4x4 ViewProjection;\n};\n";
        let out = rewrite_source(source, TargetBackend::Dx12);
        assert_eq!(
            out.text,
            "cbuffer SceneConstants : register(b0, space0)\n{\n    float4x4 ViewProjection;\n};\n"
        );
    }

    #[test]
    fn marker_with_wrong_arity_is_kept_and_warned() {
        let source = "AE_PER_DRAW_SRV(OnlyOneArg)";
        let out = rewrite_source(source, TargetBackend::Dx12);
        assert_eq!(out.text, source);
        assert!(!out.applied);
        assert_eq!(out.warnings.len(), 1);
        // The slot is consumed even though nothing was replaced.
        assert_eq!(out.layout.count(BindingGroup::PerDraw, BindingKind::Srv), 1);
    }

    #[test]
    fn lookalike_prefixes_are_copied_through() {
        for source in [
            "AE_PER_CALL_SRV(Texture2D, X)",
            "AE_PER_FRAME_TEXTURE(Texture2D, X)",
            "AE_PER_FRAME_SRV missing parens",
            "#define AE_PER_",
        ] {
            let out = rewrite_source(source, TargetBackend::Dx12);
            assert_eq!(out.text, source);
            assert!(!out.applied);
            assert!(out.warnings.is_empty());
            assert_eq!(out.layout, AutoBindingLayout::default());
        }
    }

    #[test]
    fn source_without_markers_reports_not_applied() {
        let source = "float4 main() : SV_Target { return 0; }";
        let out = rewrite_source(source, TargetBackend::Vulkan);
        assert_eq!(out.text, source);
        assert!(!out.applied);
    }

    #[test]
    fn repeat_rewrites_allocate_identically() {
        let source = "\
AE_PER_FRAME_CBUFFER(Scene)
AE_PER_DRAW_SRV(Texture2D, Albedo)
AE_PER_DRAW_SAMPLER(Linear)
";
        let first = rewrite_source(source, TargetBackend::Vulkan);
        let second = rewrite_source(source, TargetBackend::Vulkan);
        assert_eq!(first.layout, second.layout);
        assert_eq!(first.text, second.text);
    }

    #[test]
    fn applied_rewrite_lands_in_a_line_directed_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let source_path = dir.path().join("lit.hlsl");
        fs::write(
            &source_path,
            "AE_PER_DRAW_SRV(Texture2D, AlbedoMap)\nfloat4 main() : SV_Target { return 0; }\n",
        )
        .unwrap();

        let out = apply_auto_bindings(&source_path, TargetBackend::Dx12).unwrap();
        assert!(out.applied);
        assert_ne!(out.source_path, source_path);

        let written = fs::read_to_string(&out.source_path).unwrap();
        #[cfg(feature = "line_directives")]
        assert!(written.starts_with("#line 1 \""));
        assert!(written.contains("Texture2D AlbedoMap : register(t0, space1)"));

        temp::remove_artifact(&out.source_path);
    }

    #[test]
    fn unapplied_rewrite_keeps_the_original_path() {
        let dir = tempfile::tempdir().unwrap();
        let source_path = dir.path().join("plain.hlsl");
        fs::write(&source_path, "float4 main() : SV_Target { return 0; }\n").unwrap();

        let out = apply_auto_bindings(&source_path, TargetBackend::Dx12).unwrap();
        assert!(!out.applied);
        assert_eq!(out.source_path, source_path);
    }

    #[test]
    fn missing_source_file_is_an_io_error() {
        let err = apply_auto_bindings(Path::new("/nonexistent/shader.hlsl"), TargetBackend::Dx12)
            .unwrap_err();
        assert!(matches!(err, PreprocessError::IOError(..)));
    }
}
