//! Normalized shader reflection and RHI binding layouts.
//!
//! Reflection arrives from two very different sources: DXIL containers
//! introspected through the D3D12 reflection interfaces, and JSON
//! side-files emitted by `slangc`. Both are normalized into the same
//! [`ShaderReflection`] model, which [`build_binding_layout`] turns into
//! hashed bind group and pipeline layout descriptions for the RHI.

mod error;
pub mod json;
mod layout;
mod model;
mod slang;

#[cfg(windows)]
mod dxil;

pub use error::{JsonError, SlangReflectError};
pub use layout::{
    build_binding_layout, BindGroupLayoutDesc, BindGroupLayoutEntry, PipelineLayoutDesc,
    PushConstantRange, RhiBindingType, ShaderBindingLayout, StageFlags,
};
pub use model::{
    ConstantBuffer, ConstantBufferMember, ResourceAccess, ResourceBinding, ShaderReflection,
    ShaderResourceType,
};
pub use slang::reflection_from_json;

#[cfg(windows)]
pub use dxil::reflect_dxil;
#[cfg(windows)]
pub use error::DxilReflectError;
