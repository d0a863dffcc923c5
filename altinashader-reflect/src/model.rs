/// Resource category a shader binding was declared as.
///
/// Both compiler backends normalize into this set; the RHI layout builder
/// refines it further with the declared access.
#[repr(u32)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ShaderResourceType {
    ConstantBuffer = 0,
    #[default]
    Texture,
    Sampler,
    StorageBuffer,
    StorageTexture,
    AccelerationStructure,
}

/// Whether the shader can write through the binding.
#[repr(u32)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ResourceAccess {
    #[default]
    ReadOnly = 0,
    ReadWrite,
}

/// One bound resource slot.
///
/// `register`/`space` mirror the HLSL declaration; `set`/`binding` carry the
/// same numbers under descriptor-set terminology so consumers pick whichever
/// vocabulary their API speaks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceBinding {
    pub name: String,
    pub ty: ShaderResourceType,
    pub access: ResourceAccess,
    pub set: u32,
    pub binding: u32,
    pub register: u32,
    pub space: u32,
}

/// A constant buffer field, flattened.
///
/// Nested struct fields carry dotted names and offsets cumulative from the
/// buffer start. Array fields record an element count and stride instead of
/// being expanded per element.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConstantBufferMember {
    pub name: String,
    pub offset: u32,
    pub size: u32,
    pub element_count: u32,
    pub element_stride: u32,
}

/// Layout of one constant buffer, members included.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConstantBuffer {
    pub name: String,
    pub size_bytes: u32,
    pub set: u32,
    pub binding: u32,
    pub register: u32,
    pub space: u32,
    pub members: Vec<ConstantBufferMember>,
}

/// Backend-agnostic reflection of one compiled shader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderReflection {
    pub resources: Vec<ResourceBinding>,
    pub constant_buffers: Vec<ConstantBuffer>,
    /// Size of the push constant block, zero when absent.
    pub push_constant_bytes: u32,
    /// Compute/mesh dispatch group size, `[1, 1, 1]` for other stages.
    pub thread_group_size: [u32; 3],
}

impl Default for ShaderReflection {
    fn default() -> Self {
        ShaderReflection {
            resources: Vec::new(),
            constant_buffers: Vec::new(),
            push_constant_bytes: 0,
            thread_group_size: [1, 1, 1],
        }
    }
}
