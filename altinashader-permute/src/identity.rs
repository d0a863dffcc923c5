use crate::layout::{BuiltinLayout, BuiltinValues, PermutationLayout, PermutationValues};
use altinashader_common::ShaderStage;
use std::fmt;

const FNV_OFFSET: u64 = 14695981039346656037;
const FNV_PRIME: u64 = 1099511628211;

/// Stable 64-bit identity of one compiled shader variant, used as the cache
/// key for compiled bytecode. Zero is the invalid identity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct PermutationId(pub u64);

impl PermutationId {
    pub fn is_valid(self) -> bool {
        self.0 != 0
    }
}

impl fmt::Display for PermutationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

struct Fnv1a(u64);

impl Fnv1a {
    fn new() -> Self {
        Fnv1a(FNV_OFFSET)
    }

    fn update(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            self.0 ^= u64::from(byte);
            self.0 = self.0.wrapping_mul(FNV_PRIME);
        }
    }

    fn separator(&mut self, byte: u8) {
        self.0 ^= u64::from(byte);
        self.0 = self.0.wrapping_mul(FNV_PRIME);
    }
}

/// Folds `(path, entry, stage, name=value pairs)` into a stable fingerprint.
///
/// Strings contribute their UTF-8 bytes and integers their decimal text,
/// with `|`, `=`, and `;` separators so distinct inputs cannot collide by
/// concatenation alone. Builtins are folded in only when `builtins` is
/// `Some`. A length mismatch between a layout and its values yields the
/// invalid identity.
pub fn permutation_id(
    shader_path: &str,
    entry_point: &str,
    stage: ShaderStage,
    layout: &PermutationLayout,
    values: &PermutationValues,
    builtins: Option<(&BuiltinLayout, &BuiltinValues)>,
) -> PermutationId {
    if layout.dimensions.len() != values.len() {
        return PermutationId::default();
    }
    if let Some((builtin_layout, builtin_values)) = builtins {
        if builtin_layout.builtins.len() != builtin_values.len() {
            return PermutationId::default();
        }
    }

    let mut hash = Fnv1a::new();
    hash.update(shader_path.as_bytes());
    hash.separator(b'|');
    hash.update(entry_point.as_bytes());
    hash.separator(b'|');
    hash.update(stage.index().to_string().as_bytes());
    hash.separator(b'|');

    for (dim, &value) in layout.dimensions.iter().zip(values.as_slice()) {
        hash.update(dim.name.as_bytes());
        hash.separator(b'=');
        hash.update(value.to_string().as_bytes());
        hash.separator(b';');
    }

    if let Some((builtin_layout, builtin_values)) = builtins {
        for (flag, &value) in builtin_layout.builtins.iter().zip(builtin_values.as_slice()) {
            hash.update(flag.name.as_bytes());
            hash.separator(b'=');
            hash.update(value.to_string().as_bytes());
            hash.separator(b';');
        }
    }

    PermutationId(hash.0)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::layout::{
        BuiltinFlag, DimensionDomain, DimensionKind, PermutationDimension, PermutationValues,
    };

    fn layout() -> PermutationLayout {
        PermutationLayout {
            dimensions: vec![
                PermutationDimension {
                    name: "USE_FOG".into(),
                    kind: DimensionKind::Bool,
                    default_value: 0,
                    domain: DimensionDomain::Multi,
                },
                PermutationDimension {
                    name: "SHADING_MODEL".into(),
                    kind: DimensionKind::Enum(vec![0, 1, 2]),
                    default_value: 2,
                    domain: DimensionDomain::Multi,
                },
            ],
        }
    }

    #[test]
    fn identical_inputs_hash_identically() {
        let layout = layout();
        let values = layout.default_values();
        let a = permutation_id(
            "shaders/lit.hlsl",
            "VSMain",
            ShaderStage::Vertex,
            &layout,
            &values,
            None,
        );
        let b = permutation_id(
            "shaders/lit.hlsl",
            "VSMain",
            ShaderStage::Vertex,
            &layout,
            &values,
            None,
        );
        assert!(a.is_valid());
        assert_eq!(a, b);
    }

    #[test]
    fn flipping_one_value_changes_the_hash() {
        let layout = layout();
        let off = layout.default_values();
        let mut on = layout.default_values();
        on.set(0, 1);
        let a = permutation_id(
            "shaders/lit.hlsl",
            "VSMain",
            ShaderStage::Vertex,
            &layout,
            &off,
            None,
        );
        let b = permutation_id(
            "shaders/lit.hlsl",
            "VSMain",
            ShaderStage::Vertex,
            &layout,
            &on,
            None,
        );
        assert_ne!(a, b);
    }

    #[test]
    fn stage_and_entry_contribute() {
        let layout = layout();
        let values = layout.default_values();
        let vertex = permutation_id(
            "shaders/lit.hlsl",
            "Main",
            ShaderStage::Vertex,
            &layout,
            &values,
            None,
        );
        let pixel = permutation_id(
            "shaders/lit.hlsl",
            "Main",
            ShaderStage::Pixel,
            &layout,
            &values,
            None,
        );
        let other_entry = permutation_id(
            "shaders/lit.hlsl",
            "MainAlt",
            ShaderStage::Vertex,
            &layout,
            &values,
            None,
        );
        assert_ne!(vertex, pixel);
        assert_ne!(vertex, other_entry);
    }

    #[test]
    fn builtin_values_contribute_when_present() {
        let layout = layout();
        let values = layout.default_values();
        let builtin_layout = BuiltinLayout {
            builtins: vec![BuiltinFlag {
                name: "AE_BUILTIN_REVERSE_Z".into(),
                default_value: 0,
            }],
        };
        let off = builtin_layout.default_values();
        let mut on = builtin_layout.default_values();
        on.set(0, 1);

        let without = permutation_id(
            "shaders/lit.hlsl",
            "Main",
            ShaderStage::Pixel,
            &layout,
            &values,
            None,
        );
        let with_off = permutation_id(
            "shaders/lit.hlsl",
            "Main",
            ShaderStage::Pixel,
            &layout,
            &values,
            Some((&builtin_layout, &off)),
        );
        let with_on = permutation_id(
            "shaders/lit.hlsl",
            "Main",
            ShaderStage::Pixel,
            &layout,
            &values,
            Some((&builtin_layout, &on)),
        );
        assert_ne!(without, with_off);
        assert_ne!(with_off, with_on);
    }

    #[test]
    fn mismatched_lengths_yield_the_invalid_id() {
        let layout = layout();
        let short = PermutationValues(vec![0]);
        let id = permutation_id(
            "shaders/lit.hlsl",
            "Main",
            ShaderStage::Vertex,
            &layout,
            &short,
            None,
        );
        assert!(!id.is_valid());
        assert_eq!(id, PermutationId(0));
    }

    #[test]
    fn display_is_fixed_width_hex() {
        assert_eq!(PermutationId(0x1234).to_string(), "0000000000001234");
    }
}
