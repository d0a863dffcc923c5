//! Builds RHI bind group and pipeline layout descriptions from reflection.
//!
//! The layouts carry FNV-1a hashes so the renderer can dedupe pipeline
//! layouts across shaders without comparing entry lists.

use bitflags::bitflags;
use rustc_hash::FxHashMap;

use altinashader_common::ShaderStage;

use crate::model::{ResourceAccess, ShaderReflection, ShaderResourceType};

bitflags! {
    /// Pipeline stages a binding is visible to.
    pub struct StageFlags: u8 {
        const NONE = 0;
        const VERTEX = 1 << 0;
        const PIXEL = 1 << 1;
        const COMPUTE = 1 << 2;
        const GEOMETRY = 1 << 3;
        const HULL = 1 << 4;
        const DOMAIN = 1 << 5;
        const MESH = 1 << 6;
        const AMPLIFICATION = 1 << 7;
        const ALL = 0b1111_1111;
        const ALL_GRAPHICS = Self::ALL.bits & !Self::COMPUTE.bits;
    }
}

impl From<ShaderStage> for StageFlags {
    fn from(stage: ShaderStage) -> Self {
        match stage {
            ShaderStage::Vertex => StageFlags::VERTEX,
            ShaderStage::Pixel => StageFlags::PIXEL,
            ShaderStage::Compute => StageFlags::COMPUTE,
            ShaderStage::Geometry => StageFlags::GEOMETRY,
            ShaderStage::Hull => StageFlags::HULL,
            ShaderStage::Domain => StageFlags::DOMAIN,
            ShaderStage::Mesh => StageFlags::MESH,
            ShaderStage::Amplification => StageFlags::AMPLIFICATION,
            // Libraries can export entry points for any stage.
            ShaderStage::Library => StageFlags::ALL,
        }
    }
}

/// How a binding slot is accessed by the RHI.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RhiBindingType {
    ConstantBuffer = 0,
    SampledTexture,
    StorageTexture,
    SampledBuffer,
    StorageBuffer,
    Sampler,
    AccelerationStructure,
}

/// One slot in a bind group layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BindGroupLayoutEntry {
    pub binding: u32,
    pub ty: RhiBindingType,
    pub visibility: StageFlags,
    pub array_count: u32,
    pub has_dynamic_offset: bool,
}

/// All slots of one descriptor set, sorted by binding index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindGroupLayoutDesc {
    pub set_index: u32,
    pub entries: Vec<BindGroupLayoutEntry>,
    pub layout_hash: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PushConstantRange {
    pub offset: u32,
    pub size: u32,
    pub visibility: StageFlags,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineLayoutDesc {
    pub push_constants: Vec<PushConstantRange>,
    pub layout_hash: u64,
}

/// The complete binding interface of one compiled shader.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShaderBindingLayout {
    pub bind_group_layouts: Vec<BindGroupLayoutDesc>,
    pub pipeline_layout: PipelineLayoutDesc,
}

const HASH_OFFSET: u64 = 1469598103934665603;
const HASH_PRIME: u64 = 1099511628211;

fn hash_combine(seed: u64, value: u64) -> u64 {
    (seed ^ value).wrapping_mul(HASH_PRIME)
}

fn build_layout_hash(entries: &[BindGroupLayoutEntry], set_index: u32) -> u64 {
    let mut hash = hash_combine(HASH_OFFSET, u64::from(set_index));
    for entry in entries {
        hash = hash_combine(hash, u64::from(entry.binding));
        hash = hash_combine(hash, entry.ty as u64);
        hash = hash_combine(hash, u64::from(entry.visibility.bits()));
        hash = hash_combine(hash, u64::from(entry.array_count));
        hash = hash_combine(hash, u64::from(entry.has_dynamic_offset));
    }
    hash
}

fn build_pipeline_hash(layouts: &[BindGroupLayoutDesc], push_constants: &[PushConstantRange]) -> u64 {
    let mut hash = HASH_OFFSET;
    for layout in layouts {
        hash = hash_combine(hash, u64::from(layout.set_index));
        hash = hash_combine(hash, layout.layout_hash);
    }
    for range in push_constants {
        hash = hash_combine(hash, u64::from(range.offset));
        hash = hash_combine(hash, u64::from(range.size));
        hash = hash_combine(hash, u64::from(range.visibility.bits()));
    }
    hash
}

fn binding_type(ty: ShaderResourceType, access: ResourceAccess) -> RhiBindingType {
    match ty {
        ShaderResourceType::ConstantBuffer => RhiBindingType::ConstantBuffer,
        ShaderResourceType::Texture => RhiBindingType::SampledTexture,
        ShaderResourceType::Sampler => RhiBindingType::Sampler,
        ShaderResourceType::StorageBuffer => match access {
            ResourceAccess::ReadWrite => RhiBindingType::StorageBuffer,
            ResourceAccess::ReadOnly => RhiBindingType::SampledBuffer,
        },
        ShaderResourceType::StorageTexture => match access {
            ResourceAccess::ReadWrite => RhiBindingType::StorageTexture,
            ResourceAccess::ReadOnly => RhiBindingType::SampledTexture,
        },
        ShaderResourceType::AccelerationStructure => RhiBindingType::AccelerationStructure,
    }
}

/// Derives the bind group layouts and pipeline layout for a shader.
///
/// Every resource is visible to the given stage only, except library
/// shaders which are visible everywhere. Sets are emitted in ascending
/// order with their entries sorted by binding index, so equal interfaces
/// produce equal hashes regardless of declaration order.
pub fn build_binding_layout(reflection: &ShaderReflection, stage: ShaderStage) -> ShaderBindingLayout {
    let visibility = StageFlags::from(stage);

    let mut groups: FxHashMap<u32, Vec<BindGroupLayoutEntry>> = FxHashMap::default();
    for resource in &reflection.resources {
        groups
            .entry(resource.set)
            .or_default()
            .push(BindGroupLayoutEntry {
                binding: resource.binding,
                ty: binding_type(resource.ty, resource.access),
                visibility,
                array_count: 1,
                has_dynamic_offset: false,
            });
    }

    let mut bind_group_layouts: Vec<BindGroupLayoutDesc> = groups
        .into_iter()
        .map(|(set_index, mut entries)| {
            entries.sort_by_key(|entry| entry.binding);
            let layout_hash = build_layout_hash(&entries, set_index);
            BindGroupLayoutDesc {
                set_index,
                entries,
                layout_hash,
            }
        })
        .collect();
    bind_group_layouts.sort_by_key(|layout| layout.set_index);

    let mut pipeline_layout = PipelineLayoutDesc::default();
    if reflection.push_constant_bytes > 0 {
        pipeline_layout.push_constants.push(PushConstantRange {
            offset: 0,
            size: reflection.push_constant_bytes,
            visibility,
        });
    }
    pipeline_layout.layout_hash =
        build_pipeline_hash(&bind_group_layouts, &pipeline_layout.push_constants);

    ShaderBindingLayout {
        bind_group_layouts,
        pipeline_layout,
    }
}
