use altinashader_common::ShaderDefine;

/// Prefix applied to permutation dimension names when generating
/// preprocessor defines.
pub const PERMUTATION_DEFINE_PREFIX: &str = "AE_PERM_";

/// Required name prefix for builtin flags. Doubles as the default define
/// prefix, so builtin defines are never prefixed twice.
pub const BUILTIN_NAME_PREFIX: &str = "AE_BUILTIN_";

/// How a permutation dimension's legal values are declared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DimensionKind {
    /// 0 or 1.
    Bool,
    /// An explicit set of allowed integer values, in declaration order.
    Enum(Vec<i64>),
    /// An inclusive integer range.
    Int { min: i64, max: i64 },
}

impl DimensionKind {
    /// Whether `value` lies in the declared domain.
    pub fn contains(&self, value: i64) -> bool {
        match self {
            DimensionKind::Bool => value == 0 || value == 1,
            DimensionKind::Enum(values) => values.contains(&value),
            DimensionKind::Int { min, max } => value >= *min && value <= *max,
        }
    }
}

/// Whether a dimension participates in exhaustive variant enumeration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DimensionDomain {
    /// Enumerated over its full value domain by [`expand_multi_values`].
    ///
    /// [`expand_multi_values`]: crate::expand_multi_values
    #[default]
    Multi,
    /// Held at its default during enumeration and toggled per feature
    /// request by the caller.
    Feature,
}

/// A single named compile-time variable of the permutation space.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermutationDimension {
    pub name: String,
    pub kind: DimensionKind,
    pub default_value: i64,
    pub domain: DimensionDomain,
}

/// Ordered set of permutation dimensions.
///
/// Declaration order is significant: it fixes define generation order,
/// identity hash order, and expansion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PermutationLayout {
    pub dimensions: Vec<PermutationDimension>,
}

impl PermutationLayout {
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.dimensions.iter().position(|dim| dim.name == name)
    }

    /// Values with every dimension at its declared default.
    pub fn default_values(&self) -> PermutationValues {
        PermutationValues(self.dimensions.iter().map(|dim| dim.default_value).collect())
    }

    /// Preprocessor defines `<prefix>NAME=value` in layout order.
    ///
    /// Returns an empty list when `values` does not match this layout.
    pub fn defines(&self, values: &PermutationValues, prefix: &str) -> Vec<ShaderDefine> {
        if self.dimensions.len() != values.len() {
            return Vec::new();
        }
        self.dimensions
            .iter()
            .zip(values.as_slice())
            .map(|(dim, value)| {
                ShaderDefine::new(format!("{}{}", prefix, dim.name), value.to_string())
            })
            .collect()
    }
}

/// An engine-controlled boolean input that rule expressions may condition on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltinFlag {
    pub name: String,
    pub default_value: i64,
}

/// Ordered set of builtin flags, names unique within the layout.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuiltinLayout {
    pub builtins: Vec<BuiltinFlag>,
}

impl BuiltinLayout {
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.builtins.iter().position(|flag| flag.name == name)
    }

    pub fn default_values(&self) -> BuiltinValues {
        BuiltinValues(self.builtins.iter().map(|flag| flag.default_value).collect())
    }

    /// Preprocessor defines for builtin flags. Names already carrying
    /// `prefix` are passed through unchanged.
    pub fn defines(&self, values: &BuiltinValues, prefix: &str) -> Vec<ShaderDefine> {
        if self.builtins.len() != values.len() {
            return Vec::new();
        }
        self.builtins
            .iter()
            .zip(values.as_slice())
            .map(|(flag, value)| {
                let name = if flag.name.starts_with(prefix) {
                    flag.name.clone()
                } else {
                    format!("{}{}", prefix, flag.name)
                };
                ShaderDefine::new(name, value.to_string())
            })
            .collect()
    }
}

/// Concrete values for every dimension of a layout, in layout order.
///
/// Only construction functions produce these, so the length always matches
/// the layout the values were built for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermutationValues(pub(crate) Vec<i64>);

impl PermutationValues {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<i64> {
        self.0.get(index).copied()
    }

    /// Overwrites one dimension's value. Panics when `index` is out of
    /// bounds, like slice indexing.
    pub fn set(&mut self, index: usize, value: i64) {
        self.0[index] = value;
    }

    pub fn as_slice(&self) -> &[i64] {
        &self.0
    }
}

/// Concrete values for every flag of a builtin layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltinValues(pub(crate) Vec<i64>);

impl BuiltinValues {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<i64> {
        self.0.get(index).copied()
    }

    pub fn set(&mut self, index: usize, value: i64) {
        self.0[index] = value;
    }

    pub fn as_slice(&self) -> &[i64] {
        &self.0
    }
}
